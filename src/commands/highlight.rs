//! `folio highlight verify|update`

use anyhow::Result;
use std::path::Path;

use crate::highlight::{Algorithm, Highlighter};
use crate::Site;

/// Compare the recorded checksum with the vendored script
pub fn verify(site: &Site) -> Result<()> {
    match Highlighter::new(site).verify()? {
        Some(verified) => println!(
            "OK {} {}",
            verified.integrity,
            verified.script.display()
        ),
        None => println!("Highlighter is disabled (highlight.enable: false)"),
    }
    Ok(())
}

/// Re-vendor the script and record its checksum in `_config.yml`
pub fn update(site: &Site, from: Option<&Path>, algorithm: Option<Algorithm>) -> Result<()> {
    let highlighter = Highlighter::new(site);
    let integrity = highlighter.update(from, algorithm)?;
    println!(
        "Recorded {} for {}",
        integrity,
        highlighter.script_path().display()
    );
    if !site.config.highlight.enable {
        tracing::warn!("highlight.enable is false; the script tags will not be emitted");
    }
    Ok(())
}
