//! URL helper functions

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a URL path (slashes are kept)
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, encode_path(path))
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Absolute URL for a path that already carries the root
pub fn absolute_url(config: &SiteConfig, rooted_path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    if rooted_path.starts_with('/') {
        format!("{}{}", base, rooted_path)
    } else {
        format!("{}/{}", base, rooted_path)
    }
}

/// Percent-encode a URL path, keeping '/' separators
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Decode a request path into a string
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, "about/"), "/blog/about/");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/about/"),
            "https://example.com/blog/about/"
        );
    }

    #[test]
    fn test_absolute_url() {
        let config = test_config();
        assert_eq!(
            absolute_url(&config, "/blog/2024/01/01/hi/"),
            "https://example.com/blog/2024/01/01/hi/"
        );
    }

    #[test]
    fn test_encode_and_decode_path() {
        assert_eq!(encode_path("js/my lib.js"), "js/my%20lib.js");
        assert_eq!(decode_path("/tags/c%2B%2B/"), "/tags/c++/");
        assert_eq!(decode_path("/caf%C3%A9/"), "/café/");
    }
}
