//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# Site
title: My Blog
subtitle: ''
description: ''
author: ''
language: en

# URL
url: http://example.com
root: /
permalink: :year/:month/:day/:title/

# Directory
source_dir: content
posts_dir: posts
public_dir: public
static_dir: static
templates_dir: templates
tag_dir: tags
archive_dir: archives

# Listing
per_page: 10
feed_limit: 20
date_format: '%Y-%m-%d'

# Theme, vendored as a git submodule under themes/<name>
theme: ''
theme_config: {}

# Client-side syntax highlighter, vendored under static_dir.
# Run `folio highlight update --from <file>` to vendor a new version.
highlight:
  enable: false
  script: js/highlight.min.js
  integrity: ''
  activation: js/highlight-init.js
"#;

const ACTIVATION_SCRIPT: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  if (window.hljs) {
    window.hljs.highlightAll();
  }
});
"#;

const HEAD_EXTRA_OVERRIDE: &str = r#"{# Site override of the theme's header snippet. #}
{{ head_extra }}
"#;

const GITIGNORE: &str = "public/\n";

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.join(CONFIG_FILE).exists() {
        bail!("{:?} already contains a {}", target_dir, CONFIG_FILE);
    }

    fs::create_dir_all(target_dir.join("content/posts"))?;
    fs::create_dir_all(target_dir.join("static/js"))?;
    fs::create_dir_all(target_dir.join("templates/partials"))?;
    fs::create_dir_all(target_dir.join("themes"))?;

    fs::write(target_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;
    fs::write(
        target_dir.join("static/js/highlight-init.js"),
        ACTIVATION_SCRIPT,
    )?;
    fs::write(
        target_dir.join("templates/partials/head_extra.html"),
        HEAD_EXTRA_OVERRIDE,
    )?;
    if !target_dir.join(".gitignore").exists() {
        fs::write(target_dir.join(".gitignore"), GITIGNORE)?;
    }

    let now = chrono::Local::now();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
tags: [welcome]
---

Welcome to your new blog. Posts live in `content/posts/`; each one starts
with a front-matter block.

<!-- more -->

## Quick Start

```bash
$ folio new "My New Post"
$ folio serve
$ folio build
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(target_dir.join("content/posts/hello-world.md"), sample_post)?;

    tracing::debug!("Initialized site skeleton in {:?}", target_dir);
    Ok(())
}
