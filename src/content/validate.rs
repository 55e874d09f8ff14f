//! Well-formedness checks for post front-matter

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use super::frontmatter::{parse_date_string, FrontMatterError};
use super::{FrontMatter, Post};

/// A single problem with a post's metadata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    #[error("missing `title`")]
    MissingTitle,

    #[error("`title` is empty")]
    EmptyTitle,

    #[error("missing `date`")]
    MissingDate,

    #[error("`date` is not a calendar date: {0:?}")]
    InvalidDate(String),

    #[error("author #{0} is empty")]
    EmptyAuthor(usize),
}

/// Why a post could not be loaded
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },

    #[error("{}: {}", .path.display(), join_issues(.issues))]
    Invalid { path: PathBuf, issues: Vec<Issue> },

    #[error("{first} and {second} would both be written to {output}")]
    PathCollision {
        first: String,
        second: String,
        output: String,
    },
}

/// Every post that failed, reported together
#[derive(Error, Debug)]
#[error("{} content error(s):{}", .0.len(), list_errors(.0))]
pub struct ContentErrors(pub Vec<ContentError>);

fn list_errors(errors: &[ContentError]) -> String {
    errors.iter().map(|e| format!("\n  - {}", e)).collect()
}

fn join_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check the fields every post must carry
pub fn validate(fm: &FrontMatter) -> Vec<Issue> {
    let mut issues = Vec::new();

    match fm.title.as_deref() {
        None => issues.push(Issue::MissingTitle),
        Some(title) if title.trim().is_empty() => issues.push(Issue::EmptyTitle),
        Some(_) => {}
    }

    match fm.date.as_deref() {
        None => issues.push(Issue::MissingDate),
        Some(date) if parse_date_string(date).is_none() => {
            issues.push(Issue::InvalidDate(date.to_string()))
        }
        Some(_) => {}
    }

    for (i, author) in fm.authors.iter().enumerate() {
        if author.trim().is_empty() {
            issues.push(Issue::EmptyAuthor(i + 1));
        }
    }

    issues
}

/// Titles used by more than one post, with the sources using them
pub fn duplicate_titles(posts: &[Post]) -> Vec<(String, Vec<String>)> {
    let mut by_title: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for post in posts {
        by_title
            .entry(post.title.trim().to_lowercase())
            .or_default()
            .push(post.source.clone());
    }

    by_title
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fm(yaml: &str) -> FrontMatter {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_front_matter() {
        let fm = fm("title: Hi\ndate: 2024-02-29\nauthors: [Ada]\n");
        assert!(validate(&fm).is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let issues = validate(&FrontMatter::default());
        assert_eq!(issues, vec![Issue::MissingTitle, Issue::MissingDate]);
    }

    #[test]
    fn test_empty_title_and_bad_date() {
        let issues = validate(&fm("title: '  '\ndate: 2023-02-30\n"));
        assert_eq!(
            issues,
            vec![
                Issue::EmptyTitle,
                Issue::InvalidDate("2023-02-30".to_string())
            ]
        );
    }

    #[test]
    fn test_empty_author_entry() {
        let issues = validate(&fm("title: T\ndate: 2024-01-01\nauthors: [Ada, '']\n"));
        assert_eq!(issues, vec![Issue::EmptyAuthor(2)]);
    }

    #[test]
    fn test_content_errors_display() {
        let errors = ContentErrors(vec![ContentError::Invalid {
            path: PathBuf::from("content/posts/a.md"),
            issues: vec![Issue::MissingTitle, Issue::MissingDate],
        }]);
        let message = errors.to_string();
        assert!(message.starts_with("1 content error(s):"));
        assert!(message.contains("content/posts/a.md: missing `title`; missing `date`"));
    }

    #[test]
    fn test_duplicate_titles() {
        let date = parse_date_string("2024-01-01").unwrap();
        let posts = vec![
            Post::new("Draft".to_string(), date, "posts/draft.md".to_string()),
            Post::new("draft ".to_string(), date, "posts/draft-2.md".to_string()),
            Post::new("Other".to_string(), date, "posts/other.md".to_string()),
        ];
        let dups = duplicate_titles(&posts);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].1, vec!["posts/draft.md", "posts/draft-2.md"]);
    }
}
