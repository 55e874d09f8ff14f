//! Tera templates
//!
//! The built-in templates are embedded in the binary. A theme's
//! `templates/` directory and then the site's own `templates/` directory are
//! layered on top: a file with the same relative name replaces the earlier
//! one, so a site can override a single partial (for instance
//! `partials/head_extra.html`) without forking the theme.

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as _;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::helpers;

/// Built-in templates, by name
const BUILTIN: &[(&str, &str)] = &[
    ("layout.html", include_str!("default/layout.html")),
    ("index.html", include_str!("default/index.html")),
    ("post.html", include_str!("default/post.html")),
    ("archive.html", include_str!("default/archive.html")),
    ("tags.html", include_str!("default/tags.html")),
    ("tag.html", include_str!("default/tag.html")),
    ("partials/head.html", include_str!("default/partials/head.html")),
    (
        "partials/head_extra.html",
        include_str!("default/partials/head_extra.html"),
    ),
    (
        "partials/header.html",
        include_str!("default/partials/header.html"),
    ),
    (
        "partials/footer.html",
        include_str!("default/partials/footer.html"),
    ),
    (
        "partials/post_meta.html",
        include_str!("default/partials/post_meta.html"),
    ),
    ("partials/pager.html", include_str!("default/partials/pager.html")),
];

/// Template renderer with the override chain applied
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Built-in templates only
    pub fn new() -> Result<Self> {
        Self::with_overrides(&[])
    }

    /// Built-in templates overridden by each directory in turn
    pub fn with_overrides(dirs: &[PathBuf]) -> Result<Self> {
        let mut tera = Tera::default();

        // Values are escaped explicitly in the templates; rendered post HTML
        // must pass through untouched
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(BUILTIN.to_vec())?;

        for dir in dirs {
            let files = template_files(dir)?;
            if files.is_empty() {
                continue;
            }
            tracing::debug!("Loading {} template override(s) from {:?}", files.len(), dir);
            tera.add_template_files(files)
                .map_err(|e| anyhow!("Failed to load templates from {:?}: {}", dir, e))?;
        }

        // Register custom filters
        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(template_name, context)
            .map_err(|e| anyhow!("Failed to render {}: {}", template_name, describe(&e)))
    }
}

/// Tera nests the useful message in the error's source chain
fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}

/// `*.html` files under `dir`, named by their path relative to it
fn template_files(dir: &Path) -> Result<Vec<(PathBuf, Option<String>)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_html = path.extension().map(|e| e == "html").unwrap_or(false);
        if !path.is_file() || !is_html {
            continue;
        }
        let name = path
            .strip_prefix(dir)?
            .to_string_lossy()
            .replace('\\', "/");
        files.push((path.to_path_buf(), Some(name)));
    }
    files.sort();
    Ok(files)
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(helpers::strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    Ok(tera::Value::String(helpers::truncate(
        &s,
        length,
        Some(&omission),
    )))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub home: String,
    pub archive: String,
    pub tags_index: String,
    pub feed: String,
    pub tags: Vec<TagLink>,
    pub post_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub date: String,
    pub date_iso: String,
    pub authors: Vec<String>,
    pub tags: Vec<TagLink>,
    /// Plain text from front matter; escape it in templates
    pub description: Option<String>,
    /// Rendered HTML before `<!-- more -->`
    pub excerpt: Option<String>,
    pub content: String,
    pub path: String,
    pub permalink: String,
    pub draft: bool,
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub per_page: usize,
    pub total: usize,
    pub current: usize,
    pub current_url: String,
    pub prev_link: String,
    pub next_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYearData {
    pub year: i32,
    pub posts: Vec<PostData>,
}

/// Theme configuration as exposed to templates
pub type ThemeData = IndexMap<String, serde_yaml::Value>;
