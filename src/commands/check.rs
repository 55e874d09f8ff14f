//! Validate the site without building it

use anyhow::{bail, Result};

use crate::content::{validate, ContentLoader};
use crate::highlight::Highlighter;
use crate::Site;

/// Problems found in a site
#[derive(Debug, Default)]
pub struct Report {
    pub files: usize,
    pub posts: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every post (drafts included), the theme and the vendored highlighter
pub fn inspect(site: &Site) -> Result<Report> {
    let mut report = Report::default();

    let scan = ContentLoader::new(site).with_drafts(true).scan()?;
    report.files = scan.files;
    report.posts = scan.posts.len();
    report
        .errors
        .extend(scan.errors.iter().map(|e| e.to_string()));

    for (title, sources) in validate::duplicate_titles(&scan.posts) {
        report.warnings.push(format!(
            "title {:?} is used by {}",
            title,
            sources.join(", ")
        ));
    }
    for post in &scan.posts {
        if post.authors.is_empty() && site.config.author.is_empty() {
            report
                .warnings
                .push(format!("{}: no authors and no site author", post.source));
        }
    }

    if let Err(e) = site.theme() {
        report.errors.push(e.to_string());
    }

    match Highlighter::new(site).verify() {
        Ok(Some(_)) | Ok(None) => {}
        Err(e) => report.errors.push(format!("highlighter: {}", e)),
    }

    Ok(report)
}

/// Print the report; fails when any error was found
pub fn run(site: &Site) -> Result<()> {
    let report = inspect(site)?;

    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    for error in &report.errors {
        println!("error: {}", error);
    }

    if !report.is_ok() {
        bail!(
            "{} error(s) in {} file(s) checked",
            report.errors.len(),
            report.files
        );
    }
    println!(
        "{} post(s) checked, {} warning(s)",
        report.posts,
        report.warnings.len()
    );
    Ok(())
}
