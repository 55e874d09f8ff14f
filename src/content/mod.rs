//! Content module - posts, front-matter and Markdown processing

pub mod frontmatter;
pub mod loader;
mod markdown;
mod post;
pub mod validate;

pub use frontmatter::{FrontMatter, FrontMatterError};
pub use loader::{ContentLoader, Scan};
pub use markdown::MarkdownRenderer;
pub use post::{collect_tags, Post, Tag};
pub use validate::{ContentError, ContentErrors, Issue};
