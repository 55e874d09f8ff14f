//! CLI entry point for folio

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::commands::{self, list::ListKind};
use folio::highlight::Algorithm;
use folio::server::{self, ServeOptions};
use folio::Site;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "A small static blog generator", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// File name (without extension); derived from the title by default
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// Build the static site
    #[command(alias = "b")]
    Build {
        /// Include posts marked as drafts
        #[arg(long)]
        drafts: bool,

        /// Write output here instead of public_dir
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rebuild when files change
        #[arg(short, long)]
        watch: bool,
    },

    /// Build, then serve the output locally
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,

        /// Include posts marked as drafts
        #[arg(long)]
        drafts: bool,
    },

    /// Delete the public folder
    Clean,

    /// List site information
    List {
        #[arg(value_enum, default_value = "posts")]
        kind: ListKind,
    },

    /// Validate posts, theme and highlighter without building
    Check,

    /// Manage the vendored syntax highlighter
    Highlight {
        #[command(subcommand)]
        action: HighlightAction,
    },
}

#[derive(Subcommand)]
enum HighlightAction {
    /// Check the recorded checksum against the vendored script
    Verify,

    /// Recompute the checksum and record it in _config.yml
    Update {
        /// Copy this file over the vendored script first
        #[arg(long)]
        from: Option<PathBuf>,

        /// Digest algorithm (sha256, sha384, sha512); keeps the current one by default
        #[arg(long)]
        algorithm: Option<Algorithm>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "folio=debug,info"
    } else {
        "folio=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            commands::init::init_site(&target_dir)?;
            println!("Initialized empty site in {:?}", target_dir);
        }

        Commands::New { title, slug } => {
            let site = Site::new(&base_dir)?;
            let path = commands::new::create_post(&site, &title, slug.as_deref())?;
            println!("Created: {:?}", path);
        }

        Commands::Build {
            drafts,
            output,
            watch,
        } => {
            let mut site = Site::new(&base_dir)?;
            if let Some(output) = output {
                site = site.with_public_dir(output);
            }
            site.build(drafts)?;
            println!("Built successfully!");

            if watch {
                commands::build::watch(&site, drafts)?;
            }
        }

        Commands::Serve {
            port,
            ip,
            open,
            r#static,
            drafts,
        } => {
            let site = Site::new(&base_dir)?;

            // Build first
            site.build(drafts)?;

            let options = ServeOptions {
                ip,
                port,
                watch: !r#static,
                open,
                include_drafts: drafts,
            };
            server::start(&site, &options).await?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { kind } => {
            let site = Site::new(&base_dir)?;
            commands::list::run(&site, kind)?;
        }

        Commands::Check => {
            let site = Site::new(&base_dir)?;
            commands::check::run(&site)?;
        }

        Commands::Highlight { action } => {
            let site = Site::new(&base_dir)?;
            match action {
                HighlightAction::Verify => commands::highlight::verify(&site)?,
                HighlightAction::Update { from, algorithm } => {
                    commands::highlight::update(&site, from.as_deref(), algorithm)?
                }
            }
        }
    }

    Ok(())
}
