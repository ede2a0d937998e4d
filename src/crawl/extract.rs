// src/crawl/extract.rs
// =============================================================================
// Turns one product element from a listing page into a ProductRecord, or
// explains why it was skipped.
//
// Rules:
// 1. Name and price are required. If either element is missing, the
//    product is skipped as an extraction error.
// 2. The part number is an attribute of the product element. A missing or
//    empty attribute leaves PART_NUMBER empty; the row is still written.
// 3. Availability is read leniently: a missing label counts as empty.
// 4. An empty availability means the product is skipped. A row without a
//    stock status is not useful downstream.
//
// Values are carried through as displayed. Prices are not parsed.
//
// Rust concepts:
// - Enums with data: Extraction is either a record or a skip reason
// - The ? operator inside a helper that returns Result
// =============================================================================

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::profile::SiteProfile;
use crate::dom::ElementView;

/// One row of the export.
///
/// Only extract_product builds these, which keeps `inventory` non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ProductRecord {
    pub competitor: String,
    pub name: String,
    pub url: String,
    pub price: String,
    pub part_number: String,
    pub inventory: String,
}

/// Why a product element did not become a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// A required field could not be read
    #[error("extraction-error: {0}")]
    ExtractionError(String),
    /// The element was fine but had no stock-status label
    #[error("missing-availability")]
    MissingAvailability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(ProductRecord),
    Skip(SkipReason),
}

// Extracts a ProductRecord from a product element
//
// Parameters:
//   product: the element matched by profile.product, live in its page
//   page_url: the listing page the element was found on
//   profile: selectors and competitor label
pub fn extract_product(product: ElementView<'_>, page_url: &str, profile: &SiteProfile) -> Extraction {
    let (name, price) = match read_required_fields(product, profile) {
        Ok(fields) => fields,
        Err(reason) => {
            warn!(page = page_url, %reason, "Error scraping a product");
            return Extraction::Skip(SkipReason::ExtractionError(reason));
        }
    };

    let part_number = product
        .attr(&profile.part_number_attr)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if part_number.is_empty() {
        debug!(page = page_url, %name, "product has no part number");
    }

    let inventory = match product.select_first(&profile.availability) {
        Ok(Some(label)) => label.text(),
        Ok(None) => String::new(),
        Err(e) => {
            debug!(page = page_url, error = %e, "availability lookup failed; treating as empty");
            String::new()
        }
    };

    if inventory.is_empty() {
        info!(part_number = %part_number, "Skipping product with missing availability");
        return Extraction::Skip(SkipReason::MissingAvailability);
    }

    debug!(%name, %price, %inventory, "Scraped product");

    Extraction::Record(ProductRecord {
        competitor: profile.competitor.clone(),
        name,
        url: page_url.to_string(),
        price,
        part_number,
        inventory,
    })
}

// Reads the name and price, failing with a description of what was missing
fn read_required_fields(
    product: ElementView<'_>,
    profile: &SiteProfile,
) -> Result<(String, String), String> {
    let name = required_text(product, &profile.name)?;
    let price = required_text(product, &profile.price)?;
    Ok((name, price))
}

fn required_text(product: ElementView<'_>, selector: &str) -> Result<String, String> {
    match product.select_first(selector) {
        Ok(Some(element)) => Ok(element.text()),
        Ok(None) => Err(format!("no element matching '{}'", selector)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::testing::{listing_html, product_html};
    use crate::dom::{inspect_all, select_in_document};

    const PAGE: &str = "https://shop.test/en/3-brakes";

    // Extracts every product on a page, the way the traverser does
    fn extract_page(html: &str, profile: &SiteProfile) -> Vec<Extraction> {
        let products = select_in_document(html, &profile.product).unwrap();
        inspect_all(&products, |product| extract_product(product, PAGE, profile)).unwrap()
    }

    #[test]
    fn test_complete_product_becomes_record() {
        let html = listing_html(&[product_html("7", Some("Brake Pad"), "€ 19,90", Some("In stock"))], None);

        let results = extract_page(&html, &SiteProfile::default());
        assert_eq!(
            results,
            vec![Extraction::Record(ProductRecord {
                competitor: "Mustang Clinic".to_string(),
                name: "Brake Pad".to_string(),
                url: PAGE.to_string(),
                price: "€ 19,90".to_string(),
                part_number: "7".to_string(),
                inventory: "In stock".to_string(),
            })]
        );
    }

    #[test]
    fn test_skip_accounting_on_mixed_page() {
        // 5 products: 2 valid, 2 without availability, 1 without a name
        let html = listing_html(
            &[
                product_html("1", Some("A"), "10", Some("In stock")),
                product_html("2", Some("B"), "20", None),
                product_html("3", None, "30", Some("In stock")),
                product_html("4", Some("D"), "40", Some("2-3 days")),
                product_html("5", Some("E"), "50", Some("   ")),
            ],
            None,
        );

        let results = extract_page(&html, &SiteProfile::default());

        let records: Vec<&ProductRecord> = results
            .iter()
            .filter_map(|r| match r {
                Extraction::Record(rec) => Some(rec),
                Extraction::Skip(_) => None,
            })
            .collect();
        let skips: Vec<&SkipReason> = results
            .iter()
            .filter_map(|r| match r {
                Extraction::Skip(reason) => Some(reason),
                Extraction::Record(_) => None,
            })
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].part_number, "1");
        assert_eq!(records[1].part_number, "4");
        assert!(records.iter().all(|r| !r.inventory.is_empty()));

        assert_eq!(skips.len(), 3);
        assert_eq!(
            skips
                .iter()
                .filter(|s| ***s == SkipReason::MissingAvailability)
                .count(),
            2
        );
        assert!(matches!(skips[1], SkipReason::ExtractionError(_)));
    }

    #[test]
    fn test_missing_part_number_keeps_product() {
        let html = r#"<html><body>
            <article class="product-miniature">
                <h3 class="product-title"><a>No id</a></h3>
                <span class="price">5</span>
                <span class="pl-availability">In stock</span>
            </article>
            <article class="product-miniature" data-id-product="  ">
                <h3 class="product-title"><a>Blank id</a></h3>
                <span class="price">6</span>
                <span class="pl-availability">In stock</span>
            </article>
        </body></html>"#;

        let results = extract_page(html, &SiteProfile::default());

        assert_eq!(results.len(), 2);
        for (result, name) in results.iter().zip(["No id", "Blank id"]) {
            match result {
                Extraction::Record(record) => {
                    assert_eq!(record.name, name);
                    assert_eq!(record.part_number, "");
                    assert_eq!(record.inventory, "In stock");
                }
                Extraction::Skip(reason) => panic!("unexpected skip: {}", reason),
            }
        }
    }

    #[test]
    fn test_table_row_products_are_extracted() {
        let html = r#"<html><body><table>
            <tr class="product" data-id-product="9">
                <td class="name"><a>Pad</a></td><td class="price">12,00 €</td><td class="stock">In stock</td>
            </tr>
            <tr class="product" data-id-product="10">
                <td class="name"><a>Disc</a></td><td class="price">30,00 €</td><td class="stock"></td>
            </tr>
        </table></body></html>"#;
        let profile = SiteProfile {
            competitor: "Rival".to_string(),
            product: "tr.product".to_string(),
            name: ".name a".to_string(),
            price: ".price".to_string(),
            availability: ".stock".to_string(),
            ..Default::default()
        };

        let results = extract_page(html, &profile);

        assert_eq!(
            results,
            vec![
                Extraction::Record(ProductRecord {
                    competitor: "Rival".to_string(),
                    name: "Pad".to_string(),
                    url: PAGE.to_string(),
                    price: "12,00 €".to_string(),
                    part_number: "9".to_string(),
                    inventory: "In stock".to_string(),
                }),
                Extraction::Skip(SkipReason::MissingAvailability),
            ]
        );
    }

    #[test]
    fn test_skip_reason_labels() {
        assert_eq!(SkipReason::MissingAvailability.to_string(), "missing-availability");
        assert!(SkipReason::ExtractionError("x".into())
            .to_string()
            .starts_with("extraction-error"));
    }
}
