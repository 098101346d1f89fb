//! Test utilities: mock implementations of core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. State sits
//! behind `Arc<Mutex<_>>` so tests can assert on recorded calls after the
//! system under test has consumed clones.

use std::sync::{Arc, Mutex};

use crate::error::ScrapeError;
use crate::site::SiteDescriptor;
use crate::traits::Fetch;

/// Mock fetcher that routes by URL substring and records every call.
///
/// Routes are checked in registration order; the first whose fragment is
/// contained in the requested URL wins. Unrouted URLs return an empty page.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<Vec<(String, Result<String, ScrapeError>)>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for any URL containing `fragment`.
    pub fn with_page(self, fragment: &str, html: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), Ok(html.to_string())));
        self
    }

    /// Fail any URL containing `fragment` with `error`.
    pub fn with_failure(self, fragment: &str, error: ScrapeError) -> Self {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), Err(error)));
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Fetch for MockFetcher {
    async fn fetch(&self, url: &str, _site: &SiteDescriptor) -> Result<String, ScrapeError> {
        self.calls.lock().unwrap().push(url.to_string());
        let routes = self.routes.lock().unwrap();
        for (fragment, response) in routes.iter() {
            if url.contains(fragment.as_str()) {
                return response.clone();
            }
        }
        Ok("<html><body></body></html>".to_string())
    }
}

/// A minimal single-field site descriptor for controller tests.
pub fn test_site(name: &str, max_pages: u32) -> SiteDescriptor {
    use crate::select::Selector;
    use crate::site::FieldSelectors;
    use std::time::Duration;

    SiteDescriptor {
        name: name.to_string(),
        base_url: format!("https://{}.example.com", name.to_lowercase()),
        search_url_template: format!(
            "https://{}.example.com/search?q={{job_title}}&l={{location}}",
            name.to_lowercase()
        ),
        fields: FieldSelectors {
            container: Selector::new("div", "job"),
            title: Some(Selector::new("h2", "title")),
            company: Some(Selector::new("span", "company")),
            location: Some(Selector::new("span", "loc")),
            description: Some(Selector::new("div", "desc")),
            url: None,
            date: None,
            skills: None,
        },
        pagination_param: "page".to_string(),
        max_pages,
        min_delay: Duration::from_millis(10),
        page_delay: Duration::from_millis(10),
        user_agents: Vec::new(),
        referer: None,
        cookies: Vec::new(),
        detail: None,
    }
}

/// A result-page body with one `div.job` card per (title, company) pair.
pub fn jobs_page(entries: &[(&str, &str)]) -> String {
    let cards: String = entries
        .iter()
        .map(|(title, company)| {
            format!(
                concat!(
                    r#"<div class="job">"#,
                    r#"<h2 class="title"><a href="/jobs/{}">{}</a></h2>"#,
                    r#"<span class="company">{}</span>"#,
                    r#"</div>"#
                ),
                title.to_lowercase().replace(' ', "-"),
                title,
                company
            )
        })
        .collect();
    format!("<html><body>{cards}</body></html>")
}
