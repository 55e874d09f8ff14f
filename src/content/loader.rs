//! Content loader - loads posts from the content directory

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::validate::{self, ContentError, ContentErrors};
use super::{FrontMatter, MarkdownRenderer, Post};
use crate::Site;

/// Result of walking the content store: the posts that loaded and
/// every file that did not
#[derive(Debug, Default)]
pub struct Scan {
    pub posts: Vec<Post>,
    pub errors: Vec<ContentError>,
    /// Markdown files seen, drafts included
    pub files: usize,
}

impl Scan {
    /// Fail if any file failed
    pub fn into_posts(self) -> Result<Vec<Post>> {
        if self.errors.is_empty() {
            Ok(self.posts)
        } else {
            Err(ContentErrors(self.errors).into())
        }
    }
}

/// Loads posts from `<source_dir>/<posts_dir>`
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
    include_drafts: bool,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            renderer: MarkdownRenderer::new(),
            include_drafts: false,
        }
    }

    /// Keep posts marked `draft: true`
    pub fn with_drafts(mut self, include_drafts: bool) -> Self {
        self.include_drafts = include_drafts;
        self
    }

    /// Load all posts, failing if any post is malformed
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        self.scan()?.into_posts()
    }

    /// Walk the posts directory, collecting posts and per-file errors
    pub fn scan(&self) -> Result<Scan> {
        let mut scan = Scan::default();
        let posts_dir = &self.site.posts_dir;
        if !posts_dir.exists() {
            tracing::warn!("Posts directory not found: {:?}", posts_dir);
            return Ok(scan);
        }

        let mut paths: Vec<_> = WalkDir::new(posts_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_markdown_file(p))
            .collect();
        paths.sort();

        for path in paths {
            scan.files += 1;
            match self.load_post(&path) {
                Ok(post) => {
                    if post.draft && !self.include_drafts {
                        tracing::debug!("Skipping draft {:?}", path);
                        continue;
                    }
                    scan.posts.push(post);
                }
                Err(e) => scan.errors.push(e),
            }
        }

        // Newest first; ties keep a stable order by title
        scan.posts
            .sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.title.cmp(&b.title)));

        scan.errors.extend(find_collisions(&scan.posts));

        for (title, sources) in validate::duplicate_titles(&scan.posts) {
            tracing::warn!(
                "Duplicate title {:?} used by: {}",
                title,
                sources.join(", ")
            );
        }

        Ok(scan)
    }

    /// Load a single post from a file
    pub fn load_post(&self, path: &Path) -> Result<Post, ContentError> {
        let content = fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_post(path, &content)
    }

    fn parse_post(&self, path: &Path, content: &str) -> Result<Post, ContentError> {
        let (fm, body) =
            FrontMatter::parse(content).map_err(|source| ContentError::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?;

        let issues = validate::validate(&fm);
        let date = match (issues.is_empty(), fm.parse_date()) {
            (true, Some(date)) => date,
            _ => {
                return Err(ContentError::Invalid {
                    path: path.to_path_buf(),
                    issues,
                })
            }
        };

        // Calculate source path relative to the content dir
        let source = path
            .strip_prefix(&self.site.source_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        // The file name is the slug unless front-matter sets one
        let slug = match fm.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => slug::slugify(s),
            _ => slug::slugify(
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("untitled"),
            ),
        };
        let post_path = self.generate_permalink(&date, &slug);
        let permalink = crate::helpers::absolute_url(&self.site.config, &post_path);

        // Split excerpt and render markdown
        let (excerpt_md, full_md) = MarkdownRenderer::split_excerpt(body);
        let content_html = self.renderer.render(&full_md);
        let excerpt_html = excerpt_md.as_deref().map(|e| self.renderer.render(e));

        let title = fm.title.unwrap_or_default().trim().to_string();
        let mut post = Post::new(title, date, source);
        post.authors = fm.authors.iter().map(|a| a.trim().to_string()).collect();
        post.tags = dedup_tags(fm.tags);
        post.description = fm.description.filter(|d| !d.trim().is_empty());
        post.content = content_html;
        post.excerpt = excerpt_html;
        post.path = post_path;
        post.permalink = permalink;
        post.slug = slug;
        post.draft = fm.draft;
        post.extra = fm.extra;

        Ok(post)
    }

    /// Generate the URL path based on the config pattern
    fn generate_permalink(&self, date: &DateTime<FixedOffset>, slug: &str) -> String {
        let pattern = &self.site.config.permalink;

        let result = pattern
            .replace(":year", &date.format("%Y").to_string())
            .replace(":month", &date.format("%m").to_string())
            .replace(":day", &date.format("%d").to_string())
            .replace(":i_month", &date.format("%-m").to_string())
            .replace(":i_day", &date.format("%-d").to_string())
            .replace(":title", slug)
            .replace(":slug", slug);

        let result = result.trim_start_matches('/');
        let result = if result.ends_with('/') || result.ends_with(".html") {
            result.to_string()
        } else {
            format!("{}/", result)
        };

        format!("{}{}", self.site.config.root, result)
    }
}

/// Two posts must never be written to the same place
fn find_collisions(posts: &[Post]) -> Vec<ContentError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut errors = Vec::new();
    for post in posts {
        if let Some(first) = seen.insert(&post.path, &post.source) {
            errors.push(ContentError::PathCollision {
                first: first.to_string(),
                second: post.source.clone(),
                output: post.path.clone(),
            });
        }
    }
    errors
}

/// Drop empty labels and repeats, keeping first occurrence
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !result.contains(&tag) {
            result.push(tag);
        }
    }
    result
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}
