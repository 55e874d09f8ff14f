//! Build the static site

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::content::ContentLoader;
use crate::generator::Generator;
use crate::highlight::Highlighter;
use crate::Site;

/// Build the site: load and validate every post, check the vendored
/// highlighter, then render everything into `public_dir`
pub fn run(site: &Site, include_drafts: bool) -> Result<()> {
    let start = Instant::now();

    let posts = ContentLoader::new(site)
        .with_drafts(include_drafts)
        .load_posts()?;
    tracing::info!("Loaded {} posts", posts.len());

    if let Some(verified) = Highlighter::new(site).verify()? {
        tracing::info!(
            "Highlighter {:?} matches {}",
            verified.script,
            verified.integrity
        );
    }

    let generator = Generator::new(site)?;
    let pages = generator.generate(&posts)?;

    tracing::info!(
        "Generated {} pages into {:?} in {:.2}s",
        pages,
        site.public_dir,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Paths whose changes trigger a rebuild
pub fn watched_paths(site: &Site) -> Vec<PathBuf> {
    let mut paths = vec![
        site.source_dir.clone(),
        site.static_dir.clone(),
        site.templates_dir.clone(),
        site.config_path.clone(),
    ];
    if let Some(theme_dir) = &site.theme_dir {
        paths.push(theme_dir.clone());
    }
    paths.retain(|p| p.exists());
    paths
}

/// Whether a changed path should trigger a rebuild
pub fn is_relevant_change(site: &Site, path: &Path) -> bool {
    if path.starts_with(&site.public_dir) {
        return false;
    }
    let path_str = path.to_string_lossy();
    !path_str.contains("/.git")
        && !path_str.ends_with(".DS_Store")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

/// Reload the site after a batch of changes and rebuild it.
/// Returns `false` when nothing relevant changed or the rebuild failed;
/// the previous output is left in place then.
pub fn rebuild_on_change(site: &mut Site, include_drafts: bool, changed: &[PathBuf]) -> bool {
    let relevant: Vec<_> = changed
        .iter()
        .filter(|p| is_relevant_change(site, p))
        .collect();
    if relevant.is_empty() {
        return false;
    }
    for path in &relevant {
        tracing::info!("File changed: {}", path.display());
    }

    *site = match site.reload() {
        Ok(reloaded) => reloaded,
        Err(e) => {
            tracing::error!("Failed to reload configuration: {:#}", e);
            return false;
        }
    };

    match run(site, include_drafts) {
        Ok(()) => {
            tracing::info!("Rebuilt successfully");
            true
        }
        Err(e) => {
            tracing::error!("Rebuild failed: {:#}", e);
            false
        }
    }
}

/// Rebuild whenever the sources change, calling `on_rebuild` after every
/// successful build. Blocks until the watcher stops.
pub fn watch_with<F>(site: &Site, include_drafts: bool, mut on_rebuild: F) -> Result<()>
where
    F: FnMut(),
{
    let (tx, rx) = channel();

    // Editors emit bursts of events for a single save; the debouncer
    // delivers them as one batch once the burst is over
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for path in watched_paths(site) {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    let mut site = site.clone();
    for result in rx {
        match result {
            Ok(events) => {
                let changed: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                if rebuild_on_change(&mut site, include_drafts, &changed) {
                    on_rebuild();
                }
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        }
    }

    Ok(())
}

/// `build --watch`
pub fn watch(site: &Site, include_drafts: bool) -> Result<()> {
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");
    watch_with(site, include_drafts, || {})
}
