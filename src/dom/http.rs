// src/dom/http.rs
// =============================================================================
// A DomPort backed by plain HTTP requests.
//
// Key functionality:
// - GET the page with reqwest (timeout + browser-like user agent)
// - Keep the body as the "current page"
// - Answer selector queries by parsing the body with scraper
// - Categorize transport errors (timeout vs. connection vs. status)
//
// The server-rendered HTML is the whole page here, so there is nothing to
// wait for after navigation: wait_for checks once and returns.
//
// Rust concepts:
// - Implementing a trait for our own struct
// - Builder pattern: reqwest::Client::builder()
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{select_in_document, DomElement, DomError, DomPort, SessionFactory};

const USER_AGENT: &str = concat!("shelf-scout/", env!("CARGO_PKG_VERSION"));

// The page currently "open" in a session
#[derive(Debug)]
struct LoadedPage {
    url: String,
    body: Arc<str>,
}

/// One browsing session: a client plus whatever page it last loaded.
pub struct HttpSession {
    client: Client,
    current: Option<LoadedPage>,
}

#[async_trait]
impl DomPort for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), DomError> {
        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // After redirects, relative links must resolve against where we
        // actually ended up
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| categorize_error(url, e))?;

        self.current = Some(LoadedPage {
            url: final_url,
            body: body.into(),
        });
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|page| page.url.as_str())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<DomElement>, DomError> {
        let page = self.current.as_ref().ok_or(DomError::NotLoaded)?;
        select_in_document(Arc::clone(&page.body), selector)
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        _timeout: Duration,
        _poll: Duration,
    ) -> Result<bool, DomError> {
        Ok(!self.query_all(selector)?.is_empty())
    }

    async fn close(&mut self) {
        self.current = None;
    }
}

/// Hands out one HttpSession per worker, each with its own client.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    timeout: Duration,
}

impl HttpSessionFactory {
    pub fn new(timeout: Duration) -> Self {
        HttpSessionFactory { timeout }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn open(&self) -> Result<Box<dyn DomPort>, DomError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| DomError::SessionUnavailable(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client,
            current: None,
        }))
    }
}

// Sorts reqwest failures into the DomError variants the crawler logs
fn categorize_error(url: &str, error: reqwest::Error) -> DomError {
    if error.is_timeout() {
        DomError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        DomError::Navigation {
            url: url.to_string(),
            reason: "connection failed".to_string(),
        }
    } else if error.is_redirect() {
        DomError::Navigation {
            url: url.to_string(),
            reason: "too many redirects".to_string(),
        }
    } else {
        DomError::Navigation {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}
