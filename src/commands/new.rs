//! Create a new post

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::Site;

/// Front matter written into a fresh post
#[derive(Serialize)]
struct Scaffold<'a> {
    title: &'a str,
    date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    authors: Vec<&'a str>,
    tags: Vec<String>,
    description: &'a str,
}

/// Create a new post under the posts directory, returning its path
pub fn create_post(site: &Site, title: &str, slug: Option<&str>) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() {
        bail!("A post needs a non-empty title");
    }

    let slug = slug::slugify(slug.unwrap_or(title));
    if slug.is_empty() {
        bail!("Cannot derive a file name from {:?}; pass --slug", title);
    }

    let file_path = site.posts_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        bail!("File already exists: {:?}", file_path);
    }

    let now = chrono::Local::now();
    let author = site.config.author.trim();
    let scaffold = Scaffold {
        title,
        date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        authors: if author.is_empty() { vec![] } else { vec![author] },
        tags: Vec::new(),
        description: "",
    };
    let front_matter = serde_yaml::to_string(&scaffold)
        .map_err(|e| anyhow!("Failed to write front matter: {}", e))?;
    let content = format!("---\n{}---\n\n", front_matter);

    fs::create_dir_all(&site.posts_dir)?;
    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
