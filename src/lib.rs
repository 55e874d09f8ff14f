//! folio: a small static blog generator
//!
//! Posts are Markdown files with a front-matter block, rendered through
//! Tera templates. Templates come from the built-in defaults, an optional
//! theme vendored under `themes/<name>/` and the site's own `templates/`
//! directory, in that order of precedence.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod highlight;
pub mod server;
pub mod templates;
pub mod theme;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Path of `_config.yml` (may not exist yet)
    pub config_path: PathBuf,
    /// Content directory
    pub source_dir: PathBuf,
    /// Directory holding the posts, inside `source_dir`
    pub posts_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the output
    pub static_dir: PathBuf,
    /// Site-level template overrides
    pub templates_dir: PathBuf,
    /// Theme submodule directory, when a theme is configured
    pub theme_dir: Option<PathBuf>,
}

impl Site {
    /// Open the site rooted at `base_dir`, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
            config::SiteConfig::default()
        };

        let source_dir = base_dir.join(&config.source_dir);
        let posts_dir = source_dir.join(&config.posts_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let templates_dir = base_dir.join(&config.templates_dir);
        let theme_dir = if config.has_theme() {
            Some(base_dir.join("themes").join(config.theme.trim()))
        } else {
            None
        };

        Ok(Self {
            config,
            base_dir,
            config_path,
            source_dir,
            posts_dir,
            public_dir,
            static_dir,
            templates_dir,
            theme_dir,
        })
    }

    /// Write output somewhere other than the configured `public_dir`
    pub fn with_public_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        let dir = dir.as_ref();
        self.public_dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        };
        self
    }

    /// Re-read the configuration, keeping the output directory in use
    pub fn reload(&self) -> Result<Self> {
        let mut site = Site::new(&self.base_dir)?;
        site.public_dir = self.public_dir.clone();
        Ok(site)
    }

    /// Load the configured theme, if any
    pub fn theme(&self) -> Result<Option<theme::Theme>, theme::ThemeError> {
        match &self.theme_dir {
            Some(dir) => theme::Theme::load(self.config.theme.trim(), dir).map(Some),
            None => Ok(None),
        }
    }

    /// Build the site into `public_dir`
    pub fn build(&self, include_drafts: bool) -> Result<()> {
        commands::build::run(self, include_drafts)
    }

    /// Remove the generated output
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
