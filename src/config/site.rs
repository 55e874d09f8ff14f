//! Site configuration (_config.yml)

use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,
    pub permalink: String,

    // Directory
    pub source_dir: String,
    pub posts_dir: String,
    pub public_dir: String,
    pub static_dir: String,
    pub templates_dir: String,
    pub tag_dir: String,
    pub archive_dir: String,

    // Listing
    pub per_page: usize,
    pub feed_limit: usize,
    pub date_format: String,

    // Extensions
    pub theme: String,
    #[serde(default)]
    pub theme_config: HashMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),
            permalink: ":year/:month/:day/:title/".to_string(),

            source_dir: "content".to_string(),
            posts_dir: "posts".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            templates_dir: "templates".to_string(),
            tag_dir: "tags".to_string(),
            archive_dir: "archives".to_string(),

            per_page: 10,
            feed_limit: 20,
            date_format: "%Y-%m-%d".to_string(),

            theme: String::new(),
            theme_config: HashMap::new(),
            highlight: HighlightConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse {:?}: {}", path, e))?;
        config.check()?;
        Ok(config)
    }

    /// Reject values that would make every build fail later on
    fn check(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(anyhow!("per_page must be greater than zero"));
        }
        if !self.root.starts_with('/') || !self.root.ends_with('/') {
            return Err(anyhow!(
                "root must start and end with '/', got {:?}",
                self.root
            ));
        }
        // An empty directory would render over the home page
        for (key, value) in [("archive_dir", &self.archive_dir), ("tag_dir", &self.tag_dir)] {
            if value.trim_matches('/').trim().is_empty() {
                return Err(anyhow!("{} must not be empty", key));
            }
        }
        let bad_format = StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error));
        if bad_format {
            return Err(anyhow!("invalid date_format {:?}", self.date_format));
        }
        Ok(())
    }

    /// Whether a theme submodule is configured
    pub fn has_theme(&self) -> bool {
        !self.theme.trim().is_empty()
    }
}

/// Vendored syntax highlighter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    /// Highlighter library, relative to `static_dir`
    pub script: String,
    /// Recorded checksum of `script`, e.g. `sha384-...`
    pub integrity: String,
    /// Script that activates the highlighter on page load, relative to `static_dir`
    pub activation: String,
    /// Optional stylesheet, relative to `static_dir`
    pub stylesheet: Option<String>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: false,
            script: "js/highlight.min.js".to_string(),
            integrity: String::new(),
            activation: "js/highlight-init.js".to_string(),
            stylesheet: None,
        }
    }
}
