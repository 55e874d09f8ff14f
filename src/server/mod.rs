//! Development server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeDir;

use crate::commands::build;
use crate::helpers::decode_path;
use crate::Site;

/// Message telling browsers to reload
const RELOAD: &str = "reload";

/// Script injected before `</body>` of every HTML page while watching
const LIVE_RELOAD_SCRIPT: &str = r#"<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
"#;

struct PreviewState {
    public_dir: PathBuf,
    /// Site root the output is served under
    root: String,
    reloads: broadcast::Sender<()>,
    live_reload: bool,
}

/// Preview server options
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub ip: String,
    pub port: u16,
    /// Rebuild on changes and reload connected browsers
    pub watch: bool,
    pub open: bool,
    pub include_drafts: bool,
}

/// Serve `public_dir`, rebuilding on changes when watching
pub async fn start(site: &Site, options: &ServeOptions) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reloads, _) = broadcast::channel::<()>(16);

    let state = Arc::new(PreviewState {
        public_dir: site.public_dir.clone(),
        root: site.config.root.clone(),
        reloads: reloads.clone(),
        live_reload: options.watch,
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;

    let url = format!("http://{}:{}{}", options.ip, options.port, site.config.root);
    println!("Server running at {}", url);
    if options.watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if options.open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if options.watch {
        let site = site.clone();
        let include_drafts = options.include_drafts;
        // The debouncer blocks on a std channel, keep it off the runtime threads
        tokio::task::spawn_blocking(move || {
            // No connected browser is not an error
            let notify_browsers = || {
                let _ = reloads.send(());
            };
            if let Err(e) = build::watch_with(&site, include_drafts, notify_browsers) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<PreviewState>>,
) -> impl IntoResponse {
    let reloads = state.reloads.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, reloads))
}

/// Forward reload signals to one browser until either side goes away
async fn forward_reloads(mut socket: WebSocket, mut reloads: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        let open = tokio::select! {
            signal = reloads.recv() => match signal {
                Ok(()) => socket.send(Message::Text(RELOAD.to_string())).await.is_ok(),
                Err(RecvError::Lagged(_)) => true,
                Err(RecvError::Closed) => false,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => socket.send(Message::Pong(data)).await.is_ok(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => false,
                Some(Ok(_)) => true,
            },
        };
        if !open {
            break;
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler(
    State(state): State<Arc<PreviewState>>,
    mut request: Request<Body>,
) -> Response {
    let path = match strip_root(request.uri().path(), &state.root) {
        Some(path) => path,
        None => return (StatusCode::NOT_FOUND, "Not found").into_response(),
    };
    let file_path = resolve_file(&state.public_dir, &path);

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html && state.live_reload {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        if path != request.uri().path() {
            match path.parse::<axum::http::Uri>() {
                Ok(uri) => *request.uri_mut() = uri,
                Err(_) => return (StatusCode::BAD_REQUEST, "Bad request").into_response(),
            }
        }
        // Serve static file using tower-http
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Request path relative to the site root, or `None` outside of it
fn strip_root(path: &str, root: &str) -> Option<String> {
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Map a request path onto a file under `public_dir`
fn resolve_file(public_dir: &Path, request_path: &str) -> PathBuf {
    let decoded = decode_path(request_path);
    let clean_path = decoded.trim_start_matches('/');

    // Never leave the output directory
    if Path::new(clean_path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return public_dir.join("index.html");
    }

    let candidate = public_dir.join(clean_path);
    if clean_path.is_empty() || candidate.is_dir() {
        candidate.join("index.html")
    } else if candidate.exists() {
        candidate
    } else {
        let with_html = public_dir.join(format!("{}.html", clean_path));
        if with_html.exists() {
            with_html
        } else {
            candidate
        }
    }
}

/// Insert the live reload script before the closing body tag
fn inject_live_reload(html: &str) -> String {
    match html.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], LIVE_RELOAD_SCRIPT, &html[at..]),
        None => format!("{}{}", html, LIVE_RELOAD_SCRIPT),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
