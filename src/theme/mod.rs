//! Theme module - theme submodule lookup and asset copying

mod loader;

pub use loader::{copy_assets, Theme, ThemeError};
