// src/crawl/profile.rs
// =============================================================================
// Everything that is specific to one storefront lives here:
// - which CSS selectors locate categories, products and the "next" link
// - which attribute carries the part number
// - the competitor label written into every row
// - pacing and safety limits for page traversal
//
// The defaults describe the Mustang Clinic storefront (a PrestaShop theme).
// Another shop can be crawled by passing a JSON profile with --profile.
//
// Rust concepts:
// - #[serde(default)]: missing JSON fields fall back to Default::default()
// - impl Default: one place that defines the stock configuration
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dom::{parse_selector, DomError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Label written to the COMPETITOR column
    pub competitor: String,
    /// Links in the category menu on the root page
    pub category_link: String,
    /// One element per product on a listing page
    pub product: String,
    /// Product name, relative to the product element
    pub name: String,
    /// Displayed price, relative to the product element
    pub price: String,
    /// Attribute on the product element holding the part number
    pub part_number_attr: String,
    /// Stock-status label, relative to the product element
    pub availability: String,
    /// The pagination "next page" link
    pub next_link: String,
    /// Safety cap on pages walked per category
    pub max_pages_per_category: usize,
    /// Longest wait for products to render after a page load
    pub settle_ms: u64,
    /// How often to re-check while waiting
    pub poll_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        SiteProfile {
            competitor: "Mustang Clinic".to_string(),
            category_link: "li[id^='cat_id_'] a".to_string(),
            product: "article.product-miniature".to_string(),
            name: ".product-title a".to_string(),
            price: ".price".to_string(),
            part_number_attr: "data-id-product".to_string(),
            availability: ".pl-availability".to_string(),
            next_link: "a.next.js-search-link".to_string(),
            max_pages_per_category: 500,
            settle_ms: 2000,
            poll_ms: 250,
        }
    }
}

impl SiteProfile {
    /// Reads a profile from a JSON file. Fields left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read site profile {}", path.display()))?;
        let profile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid site profile {}", path.display()))?;
        Ok(profile)
    }

    /// Checks every selector up front so a typo fails before any crawling.
    pub fn validate(&self) -> Result<(), DomError> {
        for selector in [
            &self.category_link,
            &self.product,
            &self.name,
            &self.price,
            &self.availability,
            &self.next_link,
        ] {
            parse_selector(selector)?;
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin; 1ms is the floor
        Duration::from_millis(self.poll_ms.max(1))
    }
}
