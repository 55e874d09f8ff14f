//! Post model

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Post title
    pub title: String,

    /// Publication date
    pub date: DateTime<FixedOffset>,

    /// Author names, in front-matter order
    pub authors: Vec<String>,

    /// Post tags
    pub tags: Vec<String>,

    /// Summary for listings and feeds
    pub description: Option<String>,

    /// Rendered HTML content
    pub content: String,

    /// Rendered excerpt (before <!-- more -->)
    pub excerpt: Option<String>,

    /// Source file path (relative to the content directory)
    pub source: String,

    /// URL path (starts and ends with '/')
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    /// Slug (URL-friendly name)
    pub slug: String,

    /// Whether the post is a draft
    pub draft: bool,

    /// Custom front-matter fields
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Post {
    /// Create a new post with minimal required fields
    pub fn new(title: String, date: DateTime<FixedOffset>, source: String) -> Self {
        let slug = slug::slugify(&title);
        Self {
            title,
            date,
            authors: Vec::new(),
            tags: Vec::new(),
            description: None,
            content: String::new(),
            excerpt: None,
            source,
            path: String::new(),
            permalink: String::new(),
            slug,
            draft: false,
            extra: HashMap::new(),
        }
    }

    /// Authors to display, falling back to the site author
    pub fn display_authors(&self, site_author: &str) -> Vec<String> {
        if self.authors.is_empty() && !site_author.is_empty() {
            vec![site_author.to_string()]
        } else {
            self.authors.clone()
        }
    }
}

/// A tag with the number of posts carrying it
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub count: usize,
}

impl Tag {
    pub fn new(name: &str, root: &str, tag_dir: &str) -> Self {
        let slug = slug::slugify(name);
        let path = format!(
            "{}{}/{}/",
            root,
            tag_dir.trim_matches('/'),
            slug
        );
        Self {
            name: name.to_string(),
            slug,
            path,
            count: 0,
        }
    }
}

/// Collect tags across posts, sorted by name
pub fn collect_tags(posts: &[Post], root: &str, tag_dir: &str) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for post in posts {
        for name in &post.tags {
            if name.trim().is_empty() {
                continue;
            }
            match tags.iter_mut().find(|t| t.name == *name) {
                Some(tag) => tag.count += 1,
                None => {
                    let mut tag = Tag::new(name, root, tag_dir);
                    tag.count = 1;
                    tags.push(tag);
                }
            }
        }
    }
    tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::frontmatter::parse_date_string;

    fn post(title: &str, tags: &[&str]) -> Post {
        let mut p = Post::new(
            title.to_string(),
            parse_date_string("2024-01-01").unwrap(),
            format!("posts/{}.md", title),
        );
        p.tags = tags.iter().map(|t| t.to_string()).collect();
        p
    }

    #[test]
    fn test_tag_paths() {
        let tag = Tag::new("Rust Lang", "/blog/", "tags");
        assert_eq!(tag.slug, "rust-lang");
        assert_eq!(tag.path, "/blog/tags/rust-lang/");
    }

    #[test]
    fn test_collect_tags_counts() {
        let posts = vec![post("a", &["rust", "web"]), post("b", &["rust", ""])];
        let tags = collect_tags(&posts, "/", "tags");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "rust");
        assert_eq!(tags[0].count, 2);
        assert_eq!(tags[1].name, "web");
        assert_eq!(tags[1].count, 1);
    }

    #[test]
    fn test_display_authors_fallback() {
        let mut p = post("a", &[]);
        assert_eq!(p.display_authors("Site Owner"), vec!["Site Owner"]);
        p.authors = vec!["Ada".to_string()];
        assert_eq!(p.display_authors("Site Owner"), vec!["Ada"]);
    }
}
