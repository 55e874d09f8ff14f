//! End-to-end builds of small fixture sites

use folio::highlight::{Algorithm, Highlighter, Integrity, IntegrityError};
use folio::Site;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const HIGHLIGHTER: &str = "/* highlight.js */ var hljs = { highlightAll: function () {} };\n";

fn highlighted_site(integrity: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "_config.yml",
        &format!(
            "title: Fixture\nhighlight:\n  enable: true\n  script: js/highlight.min.js # vendored\n  integrity: {}\n  activation: js/highlight-init.js\n",
            integrity
        ),
    );
    write(dir.path(), "static/js/highlight.min.js", HIGHLIGHTER);
    write(dir.path(), "static/js/highlight-init.js", "hljs.highlightAll();\n");
    write(
        dir.path(),
        "content/posts/code.md",
        "---\ntitle: Code Sample\ndate: 2024-06-01\n---\n```rust\nfn main() {}\n```\n",
    );
    dir
}

#[test]
fn minimal_site_builds() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "content/posts/hello.md",
        "---\ntitle: Hello Fixture\ndate: 2024-05-01\nauthors: [Ada Lovelace]\ntags: [intro]\ndescription: A first post\n---\nBody text.\n",
    );

    let site = Site::new(dir.path()).unwrap();
    site.build(false).unwrap();

    let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
    assert!(index.contains("Hello Fixture"));
    assert!(index.contains("A first post"));

    let post = fs::read_to_string(site.public_dir.join("2024/05/01/hello/index.html")).unwrap();
    assert!(post.contains("Hello Fixture"));
    assert!(post.contains("Ada Lovelace"));
    assert!(post.contains("<p>Body text.</p>"));
}

#[test]
fn toml_front_matter_builds() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "content/posts/toml.md",
        "+++\ntitle = \"From TOML\"\ndate = 2024-02-03T10:00:00Z\ntags = [\"config\"]\n+++\nBody.\n",
    );
    let site = Site::new(dir.path()).unwrap();
    site.build(false).unwrap();
    assert!(site
        .public_dir
        .join("2024/02/03/toml/index.html")
        .exists());
}

#[test]
fn malformed_front_matter_fails() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "content/posts/good.md",
        "---\ntitle: Good\ndate: 2024-05-01\n---\n",
    );
    write(
        dir.path(),
        "content/posts/broken.md",
        "---\ntitle: [unclosed\ndate: 2024-05-01\n---\n",
    );

    let site = Site::new(dir.path()).unwrap();
    let err = site.build(false).unwrap_err().to_string();
    assert!(err.contains("broken.md"));
    assert!(!site.public_dir.join("index.html").exists());
}

#[test]
fn missing_title_and_bad_date_fail() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "content/posts/untitled.md",
        "---\ndate: 2024-05-01\n---\n",
    );
    write(
        dir.path(),
        "content/posts/undated.md",
        "---\ntitle: Undated\ndate: 2024-13-45\n---\n",
    );

    let site = Site::new(dir.path()).unwrap();
    let err = site.build(false).unwrap_err().to_string();
    assert!(err.contains("2 content error(s)"));
    assert!(err.contains("missing `title`"));
    assert!(err.contains("2024-13-45"));
}

#[test]
fn highlighter_tags_are_injected() {
    let integrity = Integrity::compute(Algorithm::Sha384, HIGHLIGHTER.as_bytes()).to_string();
    let dir = highlighted_site(&integrity);

    let site = Site::new(dir.path()).unwrap();
    site.build(false).unwrap();

    let post = fs::read_to_string(site.public_dir.join("2024/06/01/code/index.html")).unwrap();
    assert!(post.contains(&format!(
        r#"<script src="/js/highlight.min.js" integrity="{}" crossorigin="anonymous"></script>"#,
        integrity
    )));
    assert!(post.contains(r#"<script src="/js/highlight-init.js"></script>"#));
    assert!(post.contains(r#"<code class="language-rust">"#));
    assert!(site.public_dir.join("js/highlight.min.js").exists());
}

#[test]
fn checksum_mismatch_fails_until_updated() {
    let stale = Integrity::compute(Algorithm::Sha384, b"an older release").to_string();
    let dir = highlighted_site(&stale);

    let site = Site::new(dir.path()).unwrap();
    let err = site.build(false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IntegrityError>(),
        Some(IntegrityError::Mismatch { .. })
    ));

    Highlighter::new(&site).update(None, None).unwrap();
    let config = fs::read_to_string(dir.path().join("_config.yml")).unwrap();
    assert!(config.contains("# vendored"));

    let site = site.reload().unwrap();
    site.build(false).unwrap();
}

#[test]
fn missing_highlighter_file_fails() {
    let integrity = Integrity::compute(Algorithm::Sha384, HIGHLIGHTER.as_bytes()).to_string();
    let dir = highlighted_site(&integrity);
    fs::remove_file(dir.path().join("static/js/highlight.min.js")).unwrap();

    let site = Site::new(dir.path()).unwrap();
    let err = site.build(false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IntegrityError>(),
        Some(IntegrityError::MissingFile(_))
    ));
}

#[test]
fn site_override_beats_theme_snippet() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_config.yml", "theme: minimal\n");
    write(
        dir.path(),
        "themes/minimal/templates/partials/head_extra.html",
        "<!-- theme snippet -->",
    );
    write(
        dir.path(),
        "templates/partials/head_extra.html",
        "<!-- site snippet -->{{ head_extra }}",
    );
    write(
        dir.path(),
        "content/posts/a.md",
        "---\ntitle: A\ndate: 2024-01-01\n---\n",
    );

    let site = Site::new(dir.path()).unwrap();
    site.build(false).unwrap();
    let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
    assert!(index.contains("<!-- site snippet -->"));
    assert!(!index.contains("<!-- theme snippet -->"));
}

#[test]
fn uninitialized_theme_submodule_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "_config.yml", "theme: hyde\n");
    fs::create_dir_all(dir.path().join("themes/hyde")).unwrap();

    let site = Site::new(dir.path()).unwrap();
    let err = site.build(false).unwrap_err().to_string();
    assert!(err.contains("git submodule update --init --recursive"));
}
