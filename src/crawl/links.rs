// src/crawl/links.rs
// =============================================================================
// Turns href attributes into absolute URLs.
//
// Category menus and "next" buttons usually carry relative links
// ("/en/3-brakes?page=2"). We resolve them against the page they were found
// on, the same way a browser does.
// =============================================================================

use url::Url;

// Resolves a link (possibly relative) to an absolute URL
//
// Returns None for empty values, in-page anchors and non-navigational
// schemes (mailto:, tel:, javascript:)
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    // Already absolute? Then the base doesn't matter.
    if let Ok(url) = Url::parse(href) {
        return Some(url.to_string());
    }

    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_link() {
        let result = resolve_href("https://shop.test/en/", "https://other.test/x");
        assert_eq!(result, Some("https://other.test/x".to_string()));
    }

    #[test]
    fn test_resolve_relative_link() {
        let result = resolve_href("https://shop.test/en/3-brakes", "?page=2");
        assert_eq!(
            result,
            Some("https://shop.test/en/3-brakes?page=2".to_string())
        );
    }

    #[test]
    fn test_skip_anchor_and_empty() {
        assert_eq!(resolve_href("https://shop.test/", "#top"), None);
        assert_eq!(resolve_href("https://shop.test/", "   "), None);
    }

    #[test]
    fn test_skip_javascript() {
        assert_eq!(resolve_href("https://shop.test/", "javascript:void(0)"), None);
    }
}
