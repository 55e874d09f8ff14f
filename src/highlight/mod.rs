//! Vendored syntax highlighter
//!
//! The highlighter library is a file checked into the site's static
//! directory. Its checksum is recorded in `_config.yml` under
//! `highlight.integrity`; builds refuse to run when the two disagree, and the
//! same value is emitted as the `integrity` attribute of the script tag.

mod integrity;

use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use integrity::{Algorithm, Integrity};

use crate::config::SiteConfig;
use crate::helpers::{script_tag, stylesheet_tag, url_for};
use crate::Site;

lazy_static! {
    static ref SECTION_RE: Regex = Regex::new(r"^highlight:\s*(#.*)?$").expect("valid regex");
    static ref INLINE_SECTION_RE: Regex =
        Regex::new(r"^highlight:\s*[^\s#]").expect("valid regex");
    static ref TOP_LEVEL_RE: Regex = Regex::new(r"^[^\s#]").expect("valid regex");
    static ref INTEGRITY_RE: Regex =
        Regex::new(r"^(?P<indent>[ \t]+)integrity:(?P<value>[^#]*?)(?P<comment>\s+#.*)?$")
            .expect("valid regex");
}

/// Why the vendored highlighter is not consistent with the configuration
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("no checksum recorded in highlight.integrity (run `folio highlight update`)")]
    NotRecorded,

    #[error("recorded checksum {value:?} is malformed: {reason}")]
    Malformed { value: String, reason: String },

    #[error("vendored file {} is missing", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "checksum mismatch for {}: recorded {recorded}, actual {actual} (run `folio highlight update`)",
        .path.display()
    )]
    Mismatch {
        path: PathBuf,
        recorded: String,
        actual: String,
    },
}

/// Outcome of a successful verification
#[derive(Debug, Clone)]
pub struct Verified {
    pub script: PathBuf,
    pub integrity: Integrity,
}

/// Vendored highlighter files of a site
pub struct Highlighter<'a> {
    site: &'a Site,
}

impl<'a> Highlighter<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    fn config(&self) -> &crate::config::HighlightConfig {
        &self.site.config.highlight
    }

    /// Path of the vendored library on disk
    pub fn script_path(&self) -> PathBuf {
        self.site.static_dir.join(&self.config().script)
    }

    /// Path of the activation script on disk
    pub fn activation_path(&self) -> Option<PathBuf> {
        let activation = self.config().activation.trim();
        if activation.is_empty() {
            None
        } else {
            Some(self.site.static_dir.join(activation))
        }
    }

    /// Check the vendored files exist and the recorded checksum matches.
    /// Returns `Ok(None)` when the highlighter is disabled.
    pub fn verify(&self) -> Result<Option<Verified>, IntegrityError> {
        if !self.config().enable {
            return Ok(None);
        }

        let recorded = self.config().integrity.trim();
        if recorded.is_empty() {
            return Err(IntegrityError::NotRecorded);
        }
        let recorded: Integrity =
            recorded
                .parse()
                .map_err(|reason| IntegrityError::Malformed {
                    value: recorded.to_string(),
                    reason,
                })?;

        let script = self.script_path();
        let bytes = read_vendored(&script)?;
        if !recorded.matches(&bytes) {
            return Err(IntegrityError::Mismatch {
                path: script,
                recorded: recorded.to_string(),
                actual: Integrity::compute(recorded.algorithm, &bytes).to_string(),
            });
        }

        if let Some(activation) = self.activation_path() {
            if !activation.is_file() {
                return Err(IntegrityError::MissingFile(activation));
            }
        }
        if let Some(stylesheet) = &self.config().stylesheet {
            let path = self.site.static_dir.join(stylesheet);
            if !path.is_file() {
                return Err(IntegrityError::MissingFile(path));
            }
        }

        Ok(Some(Verified {
            script,
            integrity: recorded,
        }))
    }

    /// Re-vendor the library (optionally copying a new file over it) and
    /// record its checksum in the site configuration file. Nothing is
    /// written unless the rewritten configuration parses back to the new
    /// value.
    pub fn update(&self, from: Option<&Path>, algorithm: Option<Algorithm>) -> Result<Integrity> {
        let script = self.script_path();

        if let Some(from) = from {
            if !from.is_file() {
                bail!("{:?} is not a file", from);
            }
        }

        // Keep the algorithm already in use unless asked otherwise
        let algorithm = algorithm
            .or_else(|| {
                self.config()
                    .integrity
                    .parse::<Integrity>()
                    .ok()
                    .map(|i| i.algorithm)
            })
            .unwrap_or_default();

        let bytes = read_vendored(from.unwrap_or(&script))?;
        let integrity = Integrity::compute(algorithm, &bytes);

        let config_path = &self.site.config_path;
        let text = if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            String::new()
        };
        let updated = rewrite_integrity(&text, &integrity.to_string())?;
        check_rewritten(&updated, &integrity)
            .map_err(|e| anyhow!("Refusing to rewrite {:?}: {}", config_path, e))?;

        if let Some(from) = from {
            if let Some(parent) = script.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(from, &script)
                .map_err(|e| anyhow!("Failed to copy {:?} to {:?}: {}", from, script, e))?;
            tracing::info!("Vendored {:?} as {:?}", from, script);
        }

        fs::write(config_path, updated)?;
        tracing::info!("Recorded {} in {:?}", integrity, config_path);

        Ok(integrity)
    }
}

/// The rewritten configuration must still load and carry the new checksum
fn check_rewritten(text: &str, integrity: &Integrity) -> Result<()> {
    let config: SiteConfig = if text.trim().is_empty() {
        SiteConfig::default()
    } else {
        serde_yaml::from_str(text)?
    };
    let recorded = config.highlight.integrity.trim();
    if recorded != integrity.to_string() {
        bail!("highlight.integrity would read {:?}", recorded);
    }
    Ok(())
}

fn read_vendored(path: &Path) -> Result<Vec<u8>, IntegrityError> {
    if !path.is_file() {
        return Err(IntegrityError::MissingFile(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| IntegrityError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Tags injected into the page head: stylesheet, library, activation script
pub fn head_tags(config: &SiteConfig) -> String {
    let highlight = &config.highlight;
    if !highlight.enable {
        return String::new();
    }

    let mut tags = Vec::new();
    if let Some(stylesheet) = &highlight.stylesheet {
        tags.push(stylesheet_tag(&url_for(config, stylesheet)));
    }
    let integrity = Some(highlight.integrity.trim()).filter(|s| !s.is_empty());
    tags.push(script_tag(&url_for(config, &highlight.script), integrity));
    if !highlight.activation.trim().is_empty() {
        tags.push(script_tag(&url_for(config, &highlight.activation), None));
    }
    tags.join("\n")
}

/// Set `highlight.integrity` in the YAML text, leaving every other line
/// (comments included) untouched. Adds the key, or the whole section, when
/// missing. Only the block style `highlight:` section can be edited.
pub fn rewrite_integrity(text: &str, value: &str) -> Result<String> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    if let Some(line) = lines.iter().find(|l| INLINE_SECTION_RE.is_match(l)) {
        bail!(
            "`{}` is written inline; use a block `highlight:` section with one key per line",
            line.trim_end()
        );
    }

    let start = match lines
        .iter()
        .position(|l| SECTION_RE.is_match(l.trim_end_matches(['\r', '\n'])))
    {
        Some(start) => start,
        None => {
            let mut out = text.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!("highlight:\n  integrity: {}\n", value));
            return Ok(out);
        }
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| TOP_LEVEL_RE.is_match(l))
        .map(|i| start + 1 + i)
        .unwrap_or(lines.len());

    let target = (start + 1..end)
        .find(|&i| INTEGRITY_RE.is_match(lines[i].trim_end_matches(['\r', '\n'])));

    let mut out = String::with_capacity(text.len() + value.len());
    match target {
        Some(target) => {
            for (i, line) in lines.iter().enumerate() {
                if i != target {
                    out.push_str(line);
                    continue;
                }
                let content = line.trim_end_matches(['\r', '\n']);
                let eol = &line[content.len()..];
                match INTEGRITY_RE.captures(content) {
                    Some(caps) => {
                        let indent = caps.name("indent").map_or("  ", |m| m.as_str());
                        let comment = caps.name("comment").map_or("", |m| m.as_str());
                        out.push_str(&format!("{}integrity: {}{}{}", indent, value, comment, eol));
                    }
                    None => out.push_str(line),
                }
            }
        }
        None => {
            let indent = lines[start + 1..end]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| &l[..l.len() - l.trim_start().len()])
                .unwrap_or("  ");
            for (i, line) in lines.iter().enumerate() {
                out.push_str(line);
                if i == start {
                    if !line.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&format!("{}integrity: {}\n", indent, value));
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIBRARY: &[u8] = b"/*! highlight.js */ var hljs = {};";

    fn site_with_highlighter(integrity: &str) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        let js = dir.path().join("static/js");
        fs::create_dir_all(&js).unwrap();
        fs::write(js.join("highlight.min.js"), LIBRARY).unwrap();
        fs::write(
            js.join("highlight-init.js"),
            "document.addEventListener('DOMContentLoaded', () => hljs.highlightAll());",
        )
        .unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            format!(
                "title: Test\n\nhighlight:\n  enable: true # vendored\n  integrity: {}   # keep me\n\nper_page: 5\n",
                integrity
            ),
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_verify_matching_checksum() {
        let recorded = Integrity::compute(Algorithm::Sha384, LIBRARY).to_string();
        let (_dir, site) = site_with_highlighter(&recorded);
        let verified = Highlighter::new(&site).verify().unwrap().unwrap();
        assert_eq!(verified.integrity.to_string(), recorded);
    }

    #[test]
    fn test_verify_mismatch() {
        let stale = Integrity::compute(Algorithm::Sha384, b"old release").to_string();
        let (_dir, site) = site_with_highlighter(&stale);
        let err = Highlighter::new(&site).verify().unwrap_err();
        assert!(matches!(err, IntegrityError::Mismatch { .. }));
        assert!(err.to_string().contains("highlight.min.js"));
    }

    #[test]
    fn test_verify_missing_file_and_malformed_value() {
        let recorded = Integrity::compute(Algorithm::Sha384, LIBRARY).to_string();
        let (dir, site) = site_with_highlighter(&recorded);
        fs::remove_file(dir.path().join("static/js/highlight-init.js")).unwrap();
        assert!(matches!(
            Highlighter::new(&site).verify().unwrap_err(),
            IntegrityError::MissingFile(_)
        ));

        let (_dir, site) = site_with_highlighter("sha384-tooshort");
        assert!(matches!(
            Highlighter::new(&site).verify().unwrap_err(),
            IntegrityError::Malformed { .. }
        ));
    }

    #[test]
    fn test_disabled_highlighter_is_not_checked() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(Highlighter::new(&site).verify().unwrap().is_none());
        assert_eq!(head_tags(&site.config), "");
    }

    #[test]
    fn test_update_fixes_mismatch_and_keeps_comments() {
        let stale = Integrity::compute(Algorithm::Sha256, b"old release").to_string();
        let (dir, site) = site_with_highlighter(&stale);

        let release = dir.path().join("download.js");
        fs::write(&release, b"var hljs = {version: 11};").unwrap();
        let recorded = Highlighter::new(&site).update(Some(&release), None).unwrap();
        // algorithm of the previous value is kept
        assert_eq!(recorded.algorithm, Algorithm::Sha256);

        let text = fs::read_to_string(dir.path().join("_config.yml")).unwrap();
        assert!(text.contains(&format!("  integrity: {}   # keep me\n", recorded)));
        assert!(text.contains("enable: true # vendored"));

        let site = Site::new(dir.path()).unwrap();
        assert!(Highlighter::new(&site).verify().is_ok());
    }

    #[test]
    fn test_rewrite_adds_missing_key() {
        let text = "highlight:\n    enable: true\ntitle: x\n";
        let out = rewrite_integrity(text, "sha384-abc").unwrap();
        assert_eq!(
            out,
            "highlight:\n    integrity: sha384-abc\n    enable: true\ntitle: x\n"
        );
    }

    #[test]
    fn test_rewrite_adds_missing_section() {
        let out = rewrite_integrity("title: x", "sha384-abc").unwrap();
        assert_eq!(out, "title: x\nhighlight:\n  integrity: sha384-abc\n");
    }

    #[test]
    fn test_rewrite_ignores_other_sections() {
        let text = "other:\n  integrity: keep\nhighlight:\n  integrity: old\n";
        let out = rewrite_integrity(text, "new").unwrap();
        assert_eq!(out, "other:\n  integrity: keep\nhighlight:\n  integrity: new\n");
    }

    #[test]
    fn test_update_refuses_inline_section() {
        let dir = TempDir::new().unwrap();
        let js = dir.path().join("static/js");
        fs::create_dir_all(&js).unwrap();
        fs::write(js.join("highlight.min.js"), LIBRARY).unwrap();
        fs::write(js.join("highlight-init.js"), "init();").unwrap();
        let original = "title: Test\nhighlight: {enable: true, integrity: sha384-AAAA}\n";
        fs::write(dir.path().join("_config.yml"), original).unwrap();
        let site = Site::new(dir.path()).unwrap();

        let release = dir.path().join("download.js");
        fs::write(&release, b"var hljs = {version: 12};").unwrap();
        let err = Highlighter::new(&site)
            .update(Some(&release), None)
            .unwrap_err();
        assert!(err.to_string().contains("inline"));

        // neither the configuration nor the vendored file changed
        let text = fs::read_to_string(dir.path().join("_config.yml")).unwrap();
        assert_eq!(text, original);
        assert_eq!(fs::read(js.join("highlight.min.js")).unwrap(), LIBRARY);
        assert!(Site::new(dir.path()).is_ok());
    }

    #[test]
    fn test_rewritten_config_must_parse_back() {
        let integrity = Integrity::compute(Algorithm::Sha384, LIBRARY);
        let good = rewrite_integrity("title: x\n", &integrity.to_string()).unwrap();
        assert!(check_rewritten(&good, &integrity).is_ok());

        // a quoted key is not recognised, the appended section duplicates it
        let quoted = "\"highlight\":\n  enable: true\n";
        let text = rewrite_integrity(quoted, &integrity.to_string()).unwrap();
        assert!(check_rewritten(&text, &integrity).is_err());
    }

    #[test]
    fn test_head_tags() {
        let mut config = SiteConfig::default();
        config.highlight.enable = true;
        config.highlight.integrity = "sha384-abc".to_string();
        config.highlight.stylesheet = Some("css/hl.css".to_string());
        let tags = head_tags(&config);
        let lines: Vec<_> = tags.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"<link rel="stylesheet" href="/css/hl.css">"#);
        assert_eq!(
            lines[1],
            r#"<script src="/js/highlight.min.js" integrity="sha384-abc" crossorigin="anonymous"></script>"#
        );
        assert_eq!(lines[2], r#"<script src="/js/highlight-init.js"></script>"#);
    }
}
