//! Subcommands driven from the CLI

pub mod build;
pub mod check;
pub mod clean;
pub mod highlight;
pub mod init;
pub mod list;
pub mod new;
