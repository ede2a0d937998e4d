// src/crawl/discover.rs
// =============================================================================
// Finds the category listing pages to crawl.
//
// How it works:
// 1. Load the storefront root page
// 2. Select every link in the category menu
// 3. Resolve each href to an absolute URL, dropping empty ones
//
// Discovery never fails the run. If the root page can't be loaded we log
// the problem and return whatever we found (possibly nothing), and the
// crawl simply has nothing to do.
// =============================================================================

use std::collections::HashSet;
use tracing::{info, warn};

use super::error::CrawlError;
use super::links::resolve_href;
use super::profile::SiteProfile;
use crate::dom::DomPort;

// Returns category URLs in menu order
//
// Duplicates are kept; the orchestrator decides whether to collapse them.
pub async fn discover_categories(
    session: &mut dyn DomPort,
    root_url: &str,
    profile: &SiteProfile,
) -> Vec<String> {
    info!(root = root_url, "Extracting category URLs");

    match try_discover(session, root_url, profile).await {
        Ok(categories) => {
            info!(count = categories.len(), "Category discovery finished");
            categories
        }
        Err(err) => {
            warn!(error = %err, "Error extracting category URLs");
            Vec::new()
        }
    }
}

async fn try_discover(
    session: &mut dyn DomPort,
    root_url: &str,
    profile: &SiteProfile,
) -> Result<Vec<String>, CrawlError> {
    let failure = |source| CrawlError::DiscoveryFailure {
        url: root_url.to_string(),
        source,
    };

    session.navigate(root_url).await.map_err(failure)?;
    let links = session
        .query_all(&profile.category_link)
        .map_err(failure)?;

    let base = session.current_url().unwrap_or(root_url).to_string();
    let mut categories = Vec::new();
    for link in links {
        if let Some(url) = link.attr("href").and_then(|href| resolve_href(&base, href)) {
            info!(category = %url, "Found category URL");
            categories.push(url);
        }
    }

    Ok(categories)
}

// Drops repeated category URLs, keeping the first occurrence
pub fn dedupe_categories(categories: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::testing::{menu_html, StaticSite};
    use crate::dom::SessionFactory;

    const ROOT: &str = "https://shop.test/en/";

    #[tokio::test]
    async fn test_discovers_menu_links() {
        let site = StaticSite::new().page(
            ROOT,
            &menu_html(&["/en/3-brakes", "https://shop.test/en/4-wheels", ""]),
        );
        let mut session = site.open().await.unwrap();

        let categories =
            discover_categories(session.as_mut(), ROOT, &SiteProfile::default()).await;

        assert_eq!(
            categories,
            vec![
                "https://shop.test/en/3-brakes".to_string(),
                "https://shop.test/en/4-wheels".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_discovery_is_idempotent() {
        let site = StaticSite::new().page(ROOT, &menu_html(&["/a", "/b", "/c"]));
        let mut session = site.open().await.unwrap();
        let profile = SiteProfile::default();

        let mut first = discover_categories(session.as_mut(), ROOT, &profile).await;
        let mut second = discover_categories(session.as_mut(), ROOT, &profile).await;
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_root_yields_nothing() {
        let site = StaticSite::new().failing(ROOT);
        let mut session = site.open().await.unwrap();

        let categories =
            discover_categories(session.as_mut(), ROOT, &SiteProfile::default()).await;
        assert!(categories.is_empty());
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let urls = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(dedupe_categories(urls), vec!["a".to_string(), "b".to_string()]);
    }
}
