//! Clean the public directory

use anyhow::{bail, Result};
use std::fs;

use crate::Site;

/// Delete the generated output
pub fn run(site: &Site) -> Result<()> {
    if !site.public_dir.exists() {
        tracing::debug!("Nothing to clean at {:?}", site.public_dir);
        return Ok(());
    }

    // `..` and symlinks must not sneak past the checks
    let public_dir = site.public_dir.canonicalize()?;
    let base_dir = site.base_dir.canonicalize()?;
    if base_dir.starts_with(&public_dir) {
        bail!(
            "Refusing to delete {:?}: it contains the site itself",
            site.public_dir
        );
    }

    let mut protected = vec![&site.source_dir, &site.static_dir, &site.templates_dir];
    if let Some(theme_dir) = &site.theme_dir {
        protected.push(theme_dir);
    }
    for dir in protected {
        if dir.exists() && dir.canonicalize()?.starts_with(&public_dir) {
            bail!(
                "Refusing to delete {:?}: it contains {:?}",
                site.public_dir,
                dir
            );
        }
    }

    fs::remove_dir_all(&public_dir)?;
    tracing::info!("Deleted: {:?}", site.public_dir);

    Ok(())
}
