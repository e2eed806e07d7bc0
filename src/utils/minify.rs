//! HTML minification.
//!
//! Thin wrapper over the `minify_html` crate with automatic enable/disable
//! based on `SiteConfig`.

use crate::config::SiteConfig;
use std::borrow::Cow;

/// Minify HTML based on config.
///
/// Returns `Cow::Borrowed` if minify is disabled, `Cow::Owned` if minified.
pub fn minify<'a>(html: &'a [u8], config: &SiteConfig) -> Cow<'a, [u8]> {
    if !config.build.minify {
        Cow::Borrowed(html)
    } else {
        Cow::Owned(minify_inner(html))
    }
}

fn minify_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    minify_html::minify(html, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    fn config_with_minify(enabled: bool) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.build.minify = enabled;
        config
    }

    #[test]
    fn test_minify_basic() {
        let html = b"<html>\n  <head>\n  </head>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>";
        let result = minify(html, &config_with_minify(true));
        let result_str = String::from_utf8_lossy(&result);

        assert!(!result_str.contains("\n  "));
        assert!(result_str.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_minify_preserves_content() {
        let html = b"<p>Hello World</p>";
        let result = minify(html, &config_with_minify(true));

        assert!(String::from_utf8_lossy(&result).contains("Hello World"));
    }

    #[test]
    fn test_minify_enabled_shrinks() {
        let html = b"<html>\n  <body>\n  </body>\n</html>";

        let minified = minify(html, &config_with_minify(true));
        let not_minified = minify(html, &config_with_minify(false));

        assert!(minified.len() < not_minified.len());
        assert_eq!(&*not_minified, html);
    }

    #[test]
    fn test_minify_disabled_is_borrowed() {
        let html = b"<html>\n  <body>\n  </body>\n</html>";
        let result = minify(html, &config_with_minify(false));

        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, html);
    }
}
