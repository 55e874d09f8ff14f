//! Theme loader - locates the theme submodule, its configuration and assets
//!
//! A theme lives at `themes/<name>/` and may contain:
//! - `theme.yml`: default theme configuration
//! - `templates/`: Tera templates replacing the built-in ones
//! - `static/`: assets copied to the output directory

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Theme lookup errors
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error(
        "theme {name:?} not found at {}; initialize it with `git submodule update --init --recursive`",
        .dir.display()
    )]
    NotFound { name: String, dir: PathBuf },

    #[error(
        "theme {name:?} at {} is empty; initialize it with `git submodule update --init --recursive`",
        .dir.display()
    )]
    Empty { name: String, dir: PathBuf },

    #[error("failed to read theme config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid theme config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A loaded theme
#[derive(Debug, Clone)]
pub struct Theme {
    name: String,
    dir: PathBuf,
    /// Theme configuration (IndexMap preserves YAML key order for menu items)
    config: IndexMap<String, serde_yaml::Value>,
}

impl Theme {
    /// Load the theme named `name` from `dir`
    pub fn load<P: AsRef<Path>>(name: &str, dir: P) -> Result<Self, ThemeError> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.is_dir() {
            return Err(ThemeError::NotFound {
                name: name.to_string(),
                dir,
            });
        }

        // An uninitialized submodule checks out as an empty directory
        let is_empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true);
        if is_empty {
            return Err(ThemeError::Empty {
                name: name.to_string(),
                dir,
            });
        }

        let mut config = IndexMap::new();
        let config_path = dir.join("theme.yml");
        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|source| ThemeError::Read {
                path: config_path.clone(),
                source,
            })?;
            if !content.trim().is_empty() {
                config = serde_yaml::from_str(&content).map_err(|source| ThemeError::Config {
                    path: config_path.clone(),
                    source,
                })?;
            }
            tracing::debug!("Loaded theme config from {:?}", config_path);
        }

        Ok(Self {
            name: name.to_string(),
            dir,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get theme configuration
    pub fn config(&self) -> &IndexMap<String, serde_yaml::Value> {
        &self.config
    }

    /// Directory of template overrides shipped by the theme
    pub fn templates_dir(&self) -> PathBuf {
        self.dir.join("templates")
    }

    /// Directory of static assets shipped by the theme
    pub fn static_dir(&self) -> PathBuf {
        self.dir.join("static")
    }
}

/// Copy every file under `source_dir` into `dest_dir`, skipping anything
/// below a path component starting with '.' (e.g. `.git`).
/// Returns the number of files copied.
pub fn copy_assets(source_dir: &Path, dest_dir: &Path) -> anyhow::Result<usize> {
    if !source_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(source_dir)?;
        let hidden = relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let dest = dest_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        tracing::debug!("Copied: {:?} -> {:?}", path, dest);
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_theme_mentions_submodule() {
        let dir = TempDir::new().unwrap();
        let err = Theme::load("hyde", dir.path().join("themes/hyde")).unwrap_err();
        assert!(matches!(err, ThemeError::NotFound { .. }));
        assert!(err.to_string().contains("git submodule update --init"));
    }

    #[test]
    fn test_uninitialized_submodule() {
        let dir = TempDir::new().unwrap();
        let theme_dir = dir.path().join("themes/hyde");
        fs::create_dir_all(&theme_dir).unwrap();
        let err = Theme::load("hyde", &theme_dir).unwrap_err();
        assert!(matches!(err, ThemeError::Empty { .. }));
    }

    #[test]
    fn test_load_theme_config_keeps_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("theme.yml"),
            "menu:\n  Home: /\n  About: /about/\nzebra: 1\nalpha: 2\n",
        )
        .unwrap();
        let theme = Theme::load("t", dir.path()).unwrap();
        let keys: Vec<_> = theme.config().keys().cloned().collect();
        assert_eq!(keys, vec!["menu", "zebra", "alpha"]);
        assert_eq!(theme.templates_dir(), dir.path().join("templates"));
    }

    #[test]
    fn test_invalid_theme_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("theme.yml"), "menu: [unclosed\n").unwrap();
        assert!(matches!(
            Theme::load("t", dir.path()).unwrap_err(),
            ThemeError::Config { .. }
        ));
    }

    #[test]
    fn test_copy_assets_skips_hidden() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("css")).unwrap();
        fs::create_dir_all(src.path().join(".git")).unwrap();
        fs::write(src.path().join("css/site.css"), "body{}").unwrap();
        fs::write(src.path().join(".git/HEAD"), "ref").unwrap();

        let copied = copy_assets(src.path(), dest.path()).unwrap();
        assert_eq!(copied, 1);
        assert!(dest.path().join("css/site.css").exists());
        assert!(!dest.path().join(".git").exists());
    }
}
