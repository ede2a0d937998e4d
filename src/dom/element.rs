// src/dom/element.rs
// =============================================================================
// Handles to HTML elements that can cross task boundaries.
//
// The `scraper` crate gives us ElementRef<'a>, which borrows from the parsed
// Html document. Html isn't Send, so it can't live across an .await inside a
// tokio task. A DomElement therefore keeps:
// - the page source it was found in (shared, not copied)
// - the element's node id inside that page
// - its visible text and attributes, read up front
//
// Parsing the same source twice yields the same tree, so the node id points
// at the same element again. Sub-queries re-parse the *whole* page and run
// against the live element, never against a copy of its markup: table rows,
// cells and list options only parse correctly inside their parents.
//
// inspect_all() parses a page once for a whole batch of elements, which is
// how the crawler reads every product on a listing page.
//
// Rust concepts:
// - Lifetimes: why ElementRef<'a> can't outlive the document
// - Arc<str>: cheap shared ownership of one page body
// - Closures: running code while a borrowed view is alive
// =============================================================================

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;

use super::DomError;

/// A matched element, detached from the parsed document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomElement {
    source: Arc<str>,
    node: NodeId,
    text: String,
    attrs: HashMap<String, String>,
}

impl DomElement {
    fn snapshot(source: &Arc<str>, element: ElementRef<'_>) -> Self {
        let attrs = element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        DomElement {
            source: Arc::clone(source),
            node: element.id(),
            text: collapse_whitespace(element.text()),
            attrs,
        }
    }

    /// Visible text with runs of whitespace collapsed and the ends trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw attribute value, exactly as written in the markup.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// First descendant matching `selector`, if any.
    pub fn select_first(&self, selector: &str) -> Result<Option<DomElement>, DomError> {
        Ok(self.select_all(selector)?.into_iter().next())
    }

    /// Every descendant matching `selector`, in document order.
    ///
    /// Only descendants are searched, never the element itself.
    pub fn select_all(&self, selector: &str) -> Result<Vec<DomElement>, DomError> {
        let document = Html::parse_document(&self.source);
        let view = self.resolve(&document)?;
        Ok(view
            .select_all(selector)?
            .into_iter()
            .map(|found| DomElement::snapshot(&self.source, found.0))
            .collect())
    }

    // Finds this element again inside a parse of its own source
    fn resolve<'a>(&self, document: &'a Html) -> Result<ElementView<'a>, DomError> {
        document
            .tree
            .get(self.node)
            .and_then(ElementRef::wrap)
            .map(ElementView)
            .ok_or(DomError::StaleElement)
    }
}

/// A live element inside a parsed page.
///
/// Only exists inside inspect_all(), while the page is parsed.
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a>(ElementRef<'a>);

impl<'a> ElementView<'a> {
    pub fn text(&self) -> String {
        collapse_whitespace(self.0.text())
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    pub fn select_first(&self, selector: &str) -> Result<Option<ElementView<'a>>, DomError> {
        let selector = parse_selector(selector)?;
        Ok(self.0.select(&selector).next().map(ElementView))
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<ElementView<'a>>, DomError> {
        let selector = parse_selector(selector)?;
        Ok(self.0.select(&selector).map(ElementView).collect())
    }
}

// Runs `f` on a live view of every element
//
// Parameters:
//   elements: handles, usually all from one query_all() call
//   f: called once per element, in order
//
// Returns: whatever `f` returned for each element
//
// Consecutive elements sharing a page source share one parse, so a whole
// listing page costs a single parse no matter how many products it holds.
pub fn inspect_all<T>(
    elements: &[DomElement],
    mut f: impl FnMut(ElementView<'_>) -> T,
) -> Result<Vec<T>, DomError> {
    let mut results = Vec::with_capacity(elements.len());
    let mut rest = elements;

    while let Some(first) = rest.first() {
        let same_page = rest
            .iter()
            .take_while(|element| Arc::ptr_eq(&element.source, &first.source))
            .count();
        let (batch, tail) = rest.split_at(same_page);

        let document = Html::parse_document(&first.source);
        for element in batch {
            results.push(f(element.resolve(&document)?));
        }
        rest = tail;
    }

    Ok(results)
}

// Parses a CSS selector, turning scraper's error into a DomError
//
// The error type from scraper borrows the input string, so we format it
// right away instead of returning it.
pub fn parse_selector(selector: &str) -> Result<Selector, DomError> {
    Selector::parse(selector).map_err(|e| DomError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

// Runs `selector` against a full HTML document
//
// Parameters:
//   source: the page HTML as returned by the server
//   selector: CSS selector
//
// Returns: handles to every match, in document order
//
// Both the HTTP session and the in-memory test site go through here, so
// they agree on parsing rules.
pub fn select_in_document(
    source: impl Into<Arc<str>>,
    selector: &str,
) -> Result<Vec<DomElement>, DomError> {
    let source = source.into();
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(&source);
    Ok(document
        .select(&selector)
        .map(|element| DomElement::snapshot(&source, element))
        .collect())
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"
        <article class="product-miniature" data-id-product="42">
            <h3 class="product-title"><a href="/p/42">  Brake   Pad
                Set </a></h3>
            <span class="price">€ 19,90</span>
        </article>
    "#;

    const TABLE: &str = r#"<html><body><table>
        <tr class="product" data-id-product="9">
            <td class="name"><a>Pad</a></td><td class="price">12,00 €</td><td class="stock">In stock</td>
        </tr>
        <tr class="product" data-id-product="10">
            <td class="name"><a>Disc</a></td><td class="price">30,00 €</td><td class="stock"></td>
        </tr>
    </table></body></html>"#;

    #[test]
    fn test_text_is_trimmed_and_collapsed() {
        let items = select_in_document(PRODUCT, ".product-title a").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text(), "Brake Pad Set");
    }

    #[test]
    fn test_attr_reads_raw_value() {
        let items = select_in_document(PRODUCT, "article.product-miniature").unwrap();
        assert_eq!(items[0].attr("data-id-product"), Some("42"));
        assert_eq!(items[0].attr("data-missing"), None);
    }

    #[test]
    fn test_scoped_select_searches_descendants() {
        let article = select_in_document(PRODUCT, "article").unwrap().remove(0);

        let price = article.select_first(".price").unwrap().unwrap();
        assert_eq!(price.text(), "€ 19,90");

        // The article itself must not match its own sub-query
        assert!(article.select_first("article").unwrap().is_none());
        assert!(article.select_first(".pl-availability").unwrap().is_none());
    }

    #[test]
    fn test_scoped_select_inside_table_rows() {
        let rows = select_in_document(TABLE, "tr.product").unwrap();
        assert_eq!(rows.len(), 2);

        let name = rows[0].select_first(".name a").unwrap().unwrap();
        assert_eq!(name.text(), "Pad");
        assert_eq!(rows[0].select_all("td").unwrap().len(), 3);

        // Handles returned by a sub-query can be queried again
        let cell = rows[1].select_first("td.name").unwrap().unwrap();
        assert_eq!(cell.select_first("a").unwrap().unwrap().text(), "Disc");
    }

    #[test]
    fn test_inspect_all_sees_live_elements() {
        let rows = select_in_document(TABLE, "tr.product").unwrap();

        let stock = inspect_all(&rows, |row| {
            let id = row.attr("data-id-product").unwrap_or_default().to_string();
            let stock = row
                .select_first(".stock")
                .unwrap()
                .map(|cell| cell.text())
                .unwrap_or_default();
            (id, stock)
        })
        .unwrap();

        assert_eq!(
            stock,
            vec![
                ("9".to_string(), "In stock".to_string()),
                ("10".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_inspect_all_handles_elements_from_several_pages() {
        let mut items = select_in_document(PRODUCT, "article").unwrap();
        items.extend(select_in_document(TABLE, "tr.product").unwrap());

        let ids = inspect_all(&items, |element| element.attr("data-id-product").map(str::to_string)).unwrap();
        assert_eq!(
            ids,
            vec![Some("42".to_string()), Some("9".to_string()), Some("10".to_string())]
        );
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let err = select_in_document(PRODUCT, "a[[").unwrap_err();
        assert!(matches!(err, DomError::InvalidSelector { .. }));

        let rows = select_in_document(TABLE, "tr").unwrap();
        let err = inspect_all(&rows, |row| row.select_first("td[[").map(|_| ())).unwrap();
        assert!(matches!(err[0], Err(DomError::InvalidSelector { .. })));
    }
}
