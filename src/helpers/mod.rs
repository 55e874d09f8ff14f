//! Helper functions shared by the generator, the templates and the server

mod html;
mod url;

pub use html::*;
pub use url::*;
