// src/dom/testing.rs
// =============================================================================
// An in-memory storefront for tests.
//
// StaticSite maps URLs to HTML bodies. Sessions opened from it behave like
// HttpSession, but never touch the network. URLs can be marked as failing
// to simulate load errors, and every navigation is recorded so tests can
// assert which pages were visited and how often. A URL can also trigger a
// cancellation token, to interrupt a run at a known point.
// =============================================================================

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{select_in_document, DomElement, DomError, DomPort, SessionFactory};

#[derive(Default)]
struct SiteData {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
    visits: Mutex<Vec<String>>,
    closed: Mutex<usize>,
}

#[derive(Clone, Default)]
pub struct StaticSite {
    data: Arc<SiteData>,
    refuse_sessions: bool,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        Arc::get_mut(&mut self.data)
            .expect("configure the site before opening sessions")
            .pages
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        Arc::get_mut(&mut self.data)
            .expect("configure the site before opening sessions")
            .failing
            .insert(url.to_string());
        self
    }

    /// Cancels `token` as soon as a session starts loading `url`.
    pub fn cancel_on_visit(mut self, url: &str, token: &CancellationToken) -> Self {
        Arc::get_mut(&mut self.data)
            .expect("configure the site before opening sessions")
            .cancel_on = Some((url.to_string(), token.clone()));
        self
    }

    /// Makes open() fail, as if no browser could be started.
    pub fn refusing_sessions(mut self) -> Self {
        self.refuse_sessions = true;
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.data.visits.lock().unwrap().clone()
    }

    pub fn visit_count(&self, url: &str) -> usize {
        self.visits().iter().filter(|v| v.as_str() == url).count()
    }

    pub fn closed_sessions(&self) -> usize {
        *self.data.closed.lock().unwrap()
    }
}

#[async_trait]
impl SessionFactory for StaticSite {
    async fn open(&self) -> Result<Box<dyn DomPort>, DomError> {
        if self.refuse_sessions {
            return Err(DomError::SessionUnavailable("refused by test".to_string()));
        }
        Ok(Box::new(StaticSession {
            data: Arc::clone(&self.data),
            current: None,
        }))
    }
}

struct StaticSession {
    data: Arc<SiteData>,
    current: Option<(String, Arc<str>)>,
}

#[async_trait]
impl DomPort for StaticSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DomError> {
        self.data.visits.lock().unwrap().push(url.to_string());
        if let Some((trigger, token)) = &self.data.cancel_on {
            if trigger == url {
                token.cancel();
            }
        }
        // Yield so concurrent workers actually interleave
        tokio::task::yield_now().await;

        if self.data.failing.contains(url) {
            return Err(DomError::Navigation {
                url: url.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        match self.data.pages.get(url) {
            Some(body) => {
                self.current = Some((url.to_string(), Arc::from(body.as_str())));
                Ok(())
            }
            None => Err(DomError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|(url, _)| url.as_str())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<DomElement>, DomError> {
        let (_, body) = self.current.as_ref().ok_or(DomError::NotLoaded)?;
        select_in_document(Arc::clone(body), selector)
    }

    async fn close(&mut self) {
        *self.data.closed.lock().unwrap() += 1;
    }
}

// Builders for the storefront markup the default site profile expects

pub fn product_html(id: &str, name: Option<&str>, price: &str, availability: Option<&str>) -> String {
    let name = name
        .map(|n| format!(r#"<h3 class="product-title"><a href="/p/{id}">{n}</a></h3>"#))
        .unwrap_or_default();
    let availability = availability
        .map(|a| format!(r#"<span class="pl-availability">{a}</span>"#))
        .unwrap_or_default();
    format!(
        r#"<article class="product-miniature" data-id-product="{id}">{name}<span class="price">{price}</span>{availability}</article>"#
    )
}

pub fn listing_html(products: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a class="next js-search-link" href="{href}">Next</a>"#))
        .unwrap_or_default();
    format!(
        "<html><body><section id=\"products\">{}</section><nav>{}</nav></body></html>",
        products.join(""),
        next
    )
}

pub fn menu_html(category_hrefs: &[&str]) -> String {
    let items: String = category_hrefs
        .iter()
        .enumerate()
        .map(|(i, href)| format!(r#"<li id="cat_id_{i}"><a href="{href}">Category {i}</a></li>"#))
        .collect();
    format!("<html><body><ul class=\"menu\">{items}</ul></body></html>")
}
