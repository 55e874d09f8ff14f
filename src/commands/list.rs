//! List site content

use anyhow::Result;
use clap::ValueEnum;
use std::collections::BTreeMap;

use crate::content::{collect_tags, ContentLoader, Post};
use crate::Site;

/// What to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    Posts,
    Tags,
    Authors,
}

/// Print the listing to stdout
pub fn run(site: &Site, kind: ListKind) -> Result<()> {
    let posts = ContentLoader::new(site).with_drafts(true).load_posts()?;
    for line in render(site, &posts, kind) {
        println!("{}", line);
    }
    Ok(())
}

/// Lines of the listing, header first
pub fn render(site: &Site, posts: &[Post], kind: ListKind) -> Vec<String> {
    let mut lines = Vec::new();
    match kind {
        ListKind::Posts => {
            lines.push(format!("Posts ({}):", posts.len()));
            for post in posts {
                lines.push(format!(
                    "  {} - {}{} [{}]",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    if post.draft { " (draft)" } else { "" },
                    post.source
                ));
            }
        }
        ListKind::Tags => {
            let mut tags = collect_tags(posts, &site.config.root, &site.config.tag_dir);
            tags.sort_by(|a, b| b.count.cmp(&a.count));
            lines.push(format!("Tags ({}):", tags.len()));
            for tag in tags {
                lines.push(format!("  {} ({})", tag.name, tag.count));
            }
        }
        ListKind::Authors => {
            let mut authors: BTreeMap<String, usize> = BTreeMap::new();
            for post in posts {
                for author in post.display_authors(&site.config.author) {
                    *authors.entry(author).or_insert(0) += 1;
                }
            }
            lines.push(format!("Authors ({}):", authors.len()));
            for (author, count) in authors {
                lines.push(format!("  {} ({})", author, count));
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Site, Vec<Post>) {
        let dir = TempDir::new().unwrap();
        let posts_dir = dir.path().join("content/posts");
        fs::create_dir_all(&posts_dir).unwrap();
        fs::write(dir.path().join("_config.yml"), "author: Site Owner\n").unwrap();
        fs::write(
            posts_dir.join("a.md"),
            "---\ntitle: A\ndate: 2024-01-01\ntags: [rust, web]\nauthors: [Ada]\n---\n",
        )
        .unwrap();
        fs::write(
            posts_dir.join("b.md"),
            "---\ntitle: B\ndate: 2024-02-01\ntags: rust\ndraft: true\n---\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();
        let posts = ContentLoader::new(&site).with_drafts(true).load_posts().unwrap();
        (dir, site, posts)
    }

    #[test]
    fn test_list_posts() {
        let (_dir, site, posts) = fixture();
        let lines = render(&site, &posts, ListKind::Posts);
        assert_eq!(lines[0], "Posts (2):");
        assert_eq!(lines[1], "  2024-02-01 - B (draft) [posts/b.md]");
    }

    #[test]
    fn test_list_tags_by_count() {
        let (_dir, site, posts) = fixture();
        let lines = render(&site, &posts, ListKind::Tags);
        assert_eq!(lines, vec!["Tags (2):", "  rust (2)", "  web (1)"]);
    }

    #[test]
    fn test_list_authors_falls_back_to_site_author() {
        let (_dir, site, posts) = fixture();
        let lines = render(&site, &posts, ListKind::Authors);
        assert_eq!(lines, vec!["Authors (2):", "  Ada (1)", "  Site Owner (1)"]);
    }
}
