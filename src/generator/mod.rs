//! Generator module - writes the static site using the Tera templates

use anyhow::{anyhow, Result};
use chrono::Datelike;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;
use walkdir::WalkDir;

use crate::content::{collect_tags, Post, Tag};
use crate::helpers::{self, escape_xml, full_url_for, strip_html, strip_invalid_xml_chars};
use crate::highlight;
use crate::templates::{
    ArchiveYearData, NavPost, PaginationData, PostData, SiteData, TagLink, TemplateRenderer,
    ThemeData,
};
use crate::theme::{copy_assets, Theme};
use crate::Site;

/// Static site generator
pub struct Generator<'a> {
    site: &'a Site,
    theme: Option<Theme>,
    renderer: TemplateRenderer,
}

/// Shared pieces of every page context
struct Common {
    site: SiteData,
    theme: ThemeData,
    head_extra: String,
    tags: Vec<Tag>,
}

impl<'a> Generator<'a> {
    /// Locate the theme and load the template chain
    pub fn new(site: &'a Site) -> Result<Self> {
        let theme = site.theme()?;

        let mut dirs = Vec::new();
        if let Some(theme) = &theme {
            tracing::info!("Using theme {:?}", theme.name());
            dirs.push(theme.templates_dir());
        }
        dirs.push(site.templates_dir.clone());
        let renderer = TemplateRenderer::with_overrides(&dirs)?;

        Ok(Self {
            site,
            theme,
            renderer,
        })
    }

    /// Generate the entire site. `posts` must be sorted newest first.
    pub fn generate(&self, posts: &[Post]) -> Result<usize> {
        fs::create_dir_all(&self.site.public_dir)
            .map_err(|e| anyhow!("Failed to create {:?}: {}", self.site.public_dir, e))?;

        let common = self.build_common(posts);
        let mut written = 0;

        written += self.generate_index_pages(posts, &common)?;
        written += self.generate_post_pages(posts, &common)?;
        written += self.generate_archive_page(posts, &common)?;
        written += self.generate_tag_pages(posts, &common)?;
        self.generate_atom_feed(posts)?;
        self.generate_search_index(posts)?;

        // Site assets are copied last so they replace theme assets
        let mut assets = 0;
        if let Some(theme) = &self.theme {
            assets += copy_assets(&theme.static_dir(), &self.site.public_dir)?;
        }
        assets += copy_assets(&self.site.static_dir, &self.site.public_dir)?;
        assets += self.copy_content_assets()?;
        tracing::info!("Wrote {} pages and copied {} assets", written, assets);

        Ok(written)
    }

    fn build_common(&self, posts: &[Post]) -> Common {
        let config = &self.site.config;
        let tags = collect_tags(posts, &config.root, &config.tag_dir);

        let site = SiteData {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
            home: config.root.clone(),
            archive: self.archive_path(),
            tags_index: self.tags_index_path(),
            feed: helpers::url_for(config, "atom.xml"),
            tags: tags.iter().map(tag_link).collect(),
            post_count: posts.len(),
        };

        Common {
            site,
            theme: self.build_theme_data(),
            head_extra: highlight::head_tags(config),
            tags,
        }
    }

    /// Theme defaults from `theme.yml`, overridden by the site's `theme_config`
    fn build_theme_data(&self) -> ThemeData {
        let mut data = self
            .theme
            .as_ref()
            .map(|t| t.config().clone())
            .unwrap_or_default();
        for (key, value) in &self.site.config.theme_config {
            data.insert(key.clone(), value.clone());
        }
        data
    }

    fn base_context(&self, common: &Common, page_title: &str, current_path: &str) -> Context {
        let mut context = Context::new();
        context.insert("site", &common.site);
        context.insert("theme", &common.theme);
        context.insert("head_extra", &common.head_extra);
        context.insert("page_title", page_title);
        context.insert("current_path", current_path);
        context.insert(
            "generator",
            &format!("folio {}", env!("CARGO_PKG_VERSION")),
        );
        context
    }

    fn post_data(&self, post: &Post, common: &Common, with_content: bool) -> PostData {
        let config = &self.site.config;
        let tags = post
            .tags
            .iter()
            .map(|name| match common.tags.iter().find(|t| t.name == *name) {
                Some(tag) => tag_link(tag),
                None => tag_link(&Tag::new(name, &config.root, &config.tag_dir)),
            })
            .collect();

        PostData {
            title: post.title.clone(),
            date: post.date.format(&config.date_format).to_string(),
            date_iso: post.date.to_rfc3339(),
            authors: post.display_authors(&config.author),
            tags,
            description: post
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            excerpt: post.excerpt.clone(),
            content: if with_content {
                post.content.clone()
            } else {
                String::new()
            },
            path: post.path.clone(),
            permalink: post.permalink.clone(),
            draft: post.draft,
            extra: post.extra.clone(),
        }
    }

    /// Generate index pages with pagination
    fn generate_index_pages(&self, posts: &[Post], common: &Common) -> Result<usize> {
        let per_page = self.site.config.per_page;
        // An empty site still gets a home page
        let total_pages = posts.len().div_ceil(per_page).max(1);

        for page_num in 1..=total_pages {
            let start = (page_num - 1) * per_page;
            let end = (start + per_page).min(posts.len());
            let page_posts: Vec<PostData> = posts[start..end]
                .iter()
                .map(|p| self.post_data(p, common, true))
                .collect();

            let pagination = PaginationData {
                per_page,
                total: total_pages,
                current: page_num,
                current_url: self.index_path(page_num),
                prev_link: if page_num > 1 {
                    self.index_path(page_num - 1)
                } else {
                    String::new()
                },
                next_link: if page_num < total_pages {
                    self.index_path(page_num + 1)
                } else {
                    String::new()
                },
            };

            let mut context = self.base_context(common, "", &pagination.current_url);
            context.insert("posts", &page_posts);
            context.insert("pagination", &pagination);

            let html = self.renderer.render("index.html", &context)?;
            self.write_page(&pagination.current_url, &html)?;
        }

        Ok(total_pages)
    }

    /// Generate individual post pages
    fn generate_post_pages(&self, posts: &[Post], common: &Common) -> Result<usize> {
        let nav = |post: &Post| NavPost {
            title: post.title.clone(),
            path: post.path.clone(),
        };

        for (i, post) in posts.iter().enumerate() {
            let mut context = self.base_context(common, &post.title, &post.path);
            context.insert("post", &self.post_data(post, common, true));

            // Posts are newest first: the previous post is the older one
            if let Some(prev) = posts.get(i + 1) {
                context.insert("prev_post", &nav(prev));
            }
            if i > 0 {
                context.insert("next_post", &nav(&posts[i - 1]));
            }

            let html = self.renderer.render("post.html", &context)?;
            self.write_page(&post.path, &html)?;
        }

        Ok(posts.len())
    }

    /// Generate the archive page, grouped by year
    fn generate_archive_page(&self, posts: &[Post], common: &Common) -> Result<usize> {
        let mut years_map: BTreeMap<i32, Vec<PostData>> = BTreeMap::new();
        for post in posts {
            years_map
                .entry(post.date.year())
                .or_default()
                .push(self.post_data(post, common, false));
        }

        // Newest year first
        let archive_years: Vec<ArchiveYearData> = years_map
            .into_iter()
            .rev()
            .map(|(year, posts)| ArchiveYearData { year, posts })
            .collect();

        let path = self.archive_path();
        let mut context = self.base_context(common, "Archives", &path);
        context.insert("archive_years", &archive_years);

        let html = self.renderer.render("archive.html", &context)?;
        self.write_page(&path, &html)?;
        Ok(1)
    }

    /// Generate the tag listing and one page per tag
    fn generate_tag_pages(&self, posts: &[Post], common: &Common) -> Result<usize> {
        let index_path = self.tags_index_path();
        let context = self.base_context(common, "Tags", &index_path);
        let html = self.renderer.render("tags.html", &context)?;
        self.write_page(&index_path, &html)?;
        let mut written = 1;

        let mut seen = HashSet::new();
        for tag in &common.tags {
            if tag.slug.is_empty() {
                tracing::warn!("Tag {:?} has no usable slug, skipping its page", tag.name);
                continue;
            }
            if !seen.insert(tag.slug.as_str()) {
                tracing::warn!(
                    "Tag {:?} shares the page {} with another tag",
                    tag.name,
                    tag.path
                );
                continue;
            }

            let tag_posts: Vec<PostData> = posts
                .iter()
                .filter(|p| p.tags.iter().any(|t| slug::slugify(t) == tag.slug))
                .map(|p| self.post_data(p, common, false))
                .collect();

            let page_title = format!("Tag: {}", tag.name);
            let mut context = self.base_context(common, &page_title, &tag.path);
            context.insert("tag", &tag_link(tag));
            context.insert("posts", &tag_posts);

            let html = self.renderer.render("tag.html", &context)?;
            self.write_page(&tag.path, &html)?;
            written += 1;
        }

        tracing::debug!("Generated {} tag pages", written - 1);
        Ok(written)
    }

    /// Generate the Atom feed
    fn generate_atom_feed(&self, posts: &[Post]) -> Result<()> {
        let config = &self.site.config;
        let home = full_url_for(config, "");
        let updated = posts
            .first()
            .map(|p| p.date.to_rfc3339())
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        let mut feed = String::new();
        feed.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        feed.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        if !config.subtitle.is_empty() {
            feed.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&config.subtitle)
            ));
        }
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            escape_xml(&full_url_for(config, "atom.xml"))
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", escape_xml(&home)));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", escape_xml(&home)));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }
        feed.push_str("  <generator>folio</generator>\n");

        let base_url = config.url.trim_end_matches('/');
        for post in posts.iter().take(config.feed_limit) {
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!(
                "    <link href=\"{}\"/>\n",
                escape_xml(&post.permalink)
            ));
            feed.push_str(&format!("    <id>{}</id>\n", escape_xml(&post.permalink)));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                post.date.to_rfc3339()
            ));
            feed.push_str(&format!("    <updated>{}</updated>\n", post.date.to_rfc3339()));
            for author in post.display_authors(&config.author) {
                feed.push_str(&format!(
                    "    <author><name>{}</name></author>\n",
                    escape_xml(&author)
                ));
            }
            for tag in &post.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            if let Some(description) = &post.description {
                feed.push_str(&format!(
                    "    <summary>{}</summary>\n",
                    escape_xml(&strip_invalid_xml_chars(description))
                ));
            }
            let content = post.excerpt.as_ref().unwrap_or(&post.content);
            let content = strip_invalid_xml_chars(&absolute_urls(content, base_url));
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content.replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        let output_path = self.site.public_dir.join("atom.xml");
        fs::write(&output_path, feed)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated atom.xml");
        Ok(())
    }

    /// Generate the search index (JSON)
    fn generate_search_index(&self, posts: &[Post]) -> Result<()> {
        let search_data: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "title": p.title,
                    "url": p.path,
                    "date": p.date.format("%Y-%m-%d").to_string(),
                    "tags": p.tags,
                    "content": strip_html(&p.content),
                })
            })
            .collect();

        let output_path = self.site.public_dir.join("search.json");
        fs::write(&output_path, serde_json::to_string_pretty(&search_data)?)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated search.json");
        Ok(())
    }

    /// Copy non-Markdown files kept next to the posts (images etc.)
    fn copy_content_assets(&self) -> Result<usize> {
        let source_dir = &self.site.source_dir;
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
            if !path.is_file() || is_markdown(path) {
                continue;
            }
            let relative = path.strip_prefix(source_dir)?;
            if relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            {
                continue;
            }

            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }
        Ok(copied)
    }

    fn index_path(&self, page_num: usize) -> String {
        if page_num == 1 {
            self.site.config.root.clone()
        } else {
            format!("{}page/{}/", self.site.config.root, page_num)
        }
    }

    fn archive_path(&self) -> String {
        dir_path(&self.site.config.root, &self.site.config.archive_dir)
    }

    fn tags_index_path(&self) -> String {
        dir_path(&self.site.config.root, &self.site.config.tag_dir)
    }

    /// Write a page for a rooted URL path
    fn write_page(&self, rooted_path: &str, html: &str) -> Result<()> {
        let output_path = output_file(&self.site.public_dir, &self.site.config.root, rooted_path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, html)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

fn tag_link(tag: &Tag) -> TagLink {
    TagLink {
        name: tag.name.clone(),
        path: tag.path.clone(),
        count: tag.count,
    }
}

fn dir_path(root: &str, dir: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        root.to_string()
    } else {
        format!("{}{}/", root, dir)
    }
}

/// File under `public_dir` for a URL path carrying the site root.
/// Directory-style paths get an `index.html`.
fn output_file(public_dir: &Path, root: &str, rooted_path: &str) -> PathBuf {
    let relative = rooted_path
        .strip_prefix(root)
        .unwrap_or(rooted_path)
        .trim_start_matches('/');
    if relative.is_empty() || relative.ends_with('/') {
        public_dir.join(relative).join("index.html")
    } else {
        public_dir.join(relative)
    }
}

/// Rewrite root-relative links in HTML to absolute URLs
fn absolute_urls(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
        .replace("href='/", &format!("href='{}/", base_url))
        .replace("src='/", &format!("src='{}/", base_url))
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentLoader;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn build(dir: &Path) -> Site {
        let site = Site::new(dir).unwrap();
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        Generator::new(&site).unwrap().generate(&posts).unwrap();
        site
    }

    #[test]
    fn test_output_file() {
        let public = Path::new("/out");
        assert_eq!(
            output_file(public, "/", "/"),
            PathBuf::from("/out/index.html")
        );
        assert_eq!(
            output_file(public, "/blog/", "/blog/2024/05/01/hi/"),
            PathBuf::from("/out/2024/05/01/hi/index.html")
        );
        assert_eq!(
            output_file(public, "/", "/about.html"),
            PathBuf::from("/out/about.html")
        );
    }

    #[test]
    fn test_generate_site() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_config.yml", "title: Notes\nper_page: 1\n");
        write(
            dir.path(),
            "content/posts/first.md",
            "---\ntitle: First Post\ndate: 2023-03-01\ntags: [rust]\n---\nHello **world**.\n",
        );
        write(
            dir.path(),
            "content/posts/second.md",
            "---\ntitle: Second Post\ndate: 2024-03-01\ntags: [rust, web]\nauthors: Ada\n---\nAgain.\n",
        );
        write(dir.path(), "content/posts/img/cat.png", "png");
        write(dir.path(), "static/css/style.css", "body{}");

        let site = build(dir.path());
        let public = &site.public_dir;

        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Second Post"));
        assert!(!index.contains("First Post"));
        assert!(index.contains("/page/2/"));

        let page2 = fs::read_to_string(public.join("page/2/index.html")).unwrap();
        assert!(page2.contains("First Post"));

        let post = fs::read_to_string(public.join("2024/03/01/second/index.html")).unwrap();
        assert!(post.contains("<title>Second Post | Notes</title>"));
        assert!(post.contains("by Ada"));
        assert!(post.contains("/2023/03/01/first/"));

        let archive = fs::read_to_string(public.join("archives/index.html")).unwrap();
        assert!(archive.find("2024").unwrap() < archive.find("2023").unwrap());

        let tag = fs::read_to_string(public.join("tags/rust/index.html")).unwrap();
        assert!(tag.contains("First Post") && tag.contains("Second Post"));
        assert!(public.join("tags/web/index.html").exists());
        assert!(public.join("tags/index.html").exists());

        let feed = fs::read_to_string(public.join("atom.xml")).unwrap();
        assert!(feed.contains("<title>Second Post</title>"));
        assert!(feed.contains("http://example.com/2024/03/01/second/"));

        let search: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(public.join("search.json")).unwrap())
                .unwrap();
        assert_eq!(search.as_array().unwrap().len(), 2);

        assert!(public.join("css/style.css").exists());
        assert!(public.join("posts/img/cat.png").exists());
        assert!(!public.join("posts/first.md").exists());
    }

    #[test]
    fn test_empty_site_has_home_page() {
        let dir = TempDir::new().unwrap();
        let site = build(dir.path());
        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("No posts yet."));
    }

    #[test]
    fn test_theme_templates_and_config() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_config.yml",
            "theme: plain\ntheme_config:\n  accent: red\n",
        );
        write(
            dir.path(),
            "themes/plain/theme.yml",
            "accent: blue\nfooter_note: made with plain\n",
        );
        write(
            dir.path(),
            "themes/plain/templates/partials/footer.html",
            "<footer>{{ theme.footer_note }} / {{ theme.accent }}</footer>",
        );
        write(dir.path(), "themes/plain/static/css/style.css", "theme");
        write(dir.path(), "static/css/style.css", "site");

        let site = build(dir.path());
        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("<footer>made with plain / red</footer>"));
        assert_eq!(
            fs::read_to_string(site.public_dir.join("css/style.css")).unwrap(),
            "site"
        );
    }

    #[test]
    fn test_missing_theme_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "_config.yml", "theme: gone\n");
        let site = Site::new(dir.path()).unwrap();
        let err = Generator::new(&site).err().unwrap().to_string();
        assert!(err.contains("git submodule update --init --recursive"));
    }

    #[test]
    fn test_description_is_escaped_in_listings() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "content/posts/vec.md",
            "---\ntitle: Vectors\ndate: 2024-01-01\ndescription: 'Why Vec<script>alert(1)</script> & friends'\n---\nBody.\n",
        );
        write(
            dir.path(),
            "content/posts/more.md",
            "---\ntitle: More\ndate: 2023-01-01\n---\nShort *intro*.\n\n<!-- more -->\n\nRest.\n",
        );

        let site = build(dir.path());
        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(index.contains("Why Vec&lt;script&gt;alert(1)"));
        assert!(index.contains("&amp; friends"));
        assert!(!index.contains("<script>alert(1)"));
        // the rendered excerpt stays HTML
        assert!(index.contains("<em>intro</em>"));
    }
}
