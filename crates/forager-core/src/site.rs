//! Static per-job-board configuration.
//!
//! A [`SiteDescriptor`] is the only thing that changes when a board reshuffles
//! its markup: selectors here are expected maintenance, not code. Descriptors
//! are built once at startup and never mutated.

use std::time::Duration;

use crate::select::Selector;

/// Selector table for the fields of one board's result cards.
///
/// `container` locates one job listing; the rest are searched inside it.
/// A `None` entry means the board doesn't expose that field in the card —
/// the extractor treats misses as absent, never as failures.
#[derive(Debug, Clone)]
pub struct FieldSelectors {
    pub container: Selector,
    pub title: Option<Selector>,
    pub company: Option<Selector>,
    pub location: Option<Selector>,
    pub description: Option<Selector>,
    pub url: Option<Selector>,
    pub date: Option<Selector>,
    pub skills: Option<Selector>,
}

/// Recipe for one forged session cookie: `name=<prefix><random alnum>`.
#[derive(Debug, Clone)]
pub struct CookieSpec {
    pub name: String,
    pub prefix: String,
    pub random_len: usize,
}

impl CookieSpec {
    pub fn new(name: &str, prefix: &str, random_len: usize) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            random_len,
        }
    }
}

/// Optional per-site enrichment step: fetch the posting's own page and pull
/// a fuller description out of it. Selectors are tried in order; the first
/// match wins. This replaces per-site special-casing in the crawl loop —
/// boards that don't need it simply leave it unset.
#[derive(Debug, Clone)]
pub struct DetailPage {
    pub description: Vec<Selector>,
}

/// Immutable configuration for one job board.
#[derive(Debug, Clone)]
pub struct SiteDescriptor {
    pub name: String,
    pub base_url: String,
    /// Search URL with `{job_title}` / `{location}` placeholders.
    pub search_url_template: String,
    pub fields: FieldSelectors,
    /// Query parameter carrying the page number; empty for single-page.
    pub pagination_param: String,
    pub max_pages: u32,
    /// Base inter-request delay enforced by the rate limiter. Boards with
    /// aggressive bot detection get a larger base.
    pub min_delay: Duration,
    /// Pause between result pages, on top of the rate limiter.
    pub page_delay: Duration,
    /// Site-specific user-agent pool; empty means use the builtin pool.
    pub user_agents: Vec<String>,
    pub referer: Option<String>,
    /// Synthetic cookies sent to look like an established session.
    pub cookies: Vec<CookieSpec>,
    pub detail: Option<DetailPage>,
}

/// The boards this crawler ships with.
pub fn default_sites() -> Vec<SiteDescriptor> {
    vec![linkedin(), simplyhired(), dice()]
}

fn linkedin() -> SiteDescriptor {
    SiteDescriptor {
        name: "LinkedIn".to_string(),
        base_url: "https://www.linkedin.com".to_string(),
        // f_TPR=r86400 restricts results to the last 24 hours.
        search_url_template:
            "https://www.linkedin.com/jobs/search?keywords={job_title}&location={location}&f_TPR=r86400"
                .to_string(),
        fields: FieldSelectors {
            container: Selector::new("div", "base-card relative"),
            title: Some(Selector::new("h3", "base-search-card__title")),
            company: Some(Selector::new("h4", "base-search-card__subtitle")),
            location: Some(Selector::new("span", "job-search-card__location")),
            description: Some(Selector::new("div", "jobs-description-content")),
            url: Some(Selector::new("a", "base-card__full-link")),
            date: Some(Selector::new("time", "")),
            skills: None,
        },
        pagination_param: "start".to_string(),
        max_pages: 2,
        min_delay: Duration::from_secs(30),
        page_delay: Duration::from_secs(3),
        user_agents: vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0".to_string(),
        ],
        referer: Some("https://www.linkedin.com/feed/".to_string()),
        cookies: vec![
            CookieSpec::new("li_at", "", 32),
            CookieSpec::new("JSESSIONID", "ajax:", 24),
            CookieSpec::new("lidc", "b=", 16),
        ],
        detail: Some(DetailPage {
            description: vec![
                Selector::new("div", "jobs-description-content"),
                Selector::new("div", "jobs-box__html-content"),
                Selector::new("div", "description__text"),
                Selector::new("div", "show-more-less-html__markup"),
                Selector::new("section", "description"),
            ],
        }),
    }
}

fn simplyhired() -> SiteDescriptor {
    SiteDescriptor {
        name: "SimplyHired".to_string(),
        base_url: "https://www.simplyhired.com".to_string(),
        search_url_template: "https://www.simplyhired.com/search?q={job_title}&l={location}"
            .to_string(),
        fields: FieldSelectors {
            container: Selector::new("div", "searchSerpJob"),
            title: Some(Selector::new("a", "chakra-button css-1djbb1k")),
            company: Some(Selector::new("span", "companyName")),
            location: Some(Selector::new("span", "searchSerpJobLocation")),
            description: Some(Selector::new("div", "viewJobBodyJobFullDescriptionContent")),
            url: Some(Selector::new("a", "chakra-button css-1djbb1k")),
            date: Some(Selector::new("p", "css-5yilgw")),
            skills: None,
        },
        pagination_param: "pn".to_string(),
        max_pages: 2,
        min_delay: Duration::from_secs(6),
        page_delay: Duration::from_secs(6),
        user_agents: Vec::new(),
        referer: Some("https://www.simplyhired.com/".to_string()),
        cookies: vec![
            CookieSpec::new("csrf", "", 32),
            CookieSpec::new("shk", "", 16),
            CookieSpec::new("_cfuvid", "", 32),
        ],
        detail: Some(DetailPage {
            description: vec![
                Selector::new("div", "viewJobBodyJobFullDescriptionContent"),
                Selector::new("div", "viewjob-description"),
                Selector::new("div", "jobDescriptionSection"),
            ],
        }),
    }
}

fn dice() -> SiteDescriptor {
    SiteDescriptor {
        name: "Dice".to_string(),
        base_url: "https://www.dice.com".to_string(),
        search_url_template: "https://www.dice.com/jobs?q={job_title}&location={location}"
            .to_string(),
        fields: FieldSelectors {
            container: Selector::new("a", "job-search-job-detail-link"),
            // The card link carries the title text itself.
            title: Some(Selector::new("a", "job-search-job-detail-link")),
            company: Some(Selector::new("div", "company-name-rating")),
            location: Some(Selector::new("div", "location")),
            description: Some(Selector::new("div", "jobDescriptionHtml")),
            url: Some(Selector::new("a", "job-search-job-detail-link")),
            date: Some(Selector::new("div", "posted-date")),
            skills: Some(Selector::new("div", "skills")),
        },
        pagination_param: "page".to_string(),
        max_pages: 2,
        min_delay: Duration::from_secs(5),
        page_delay: Duration::from_secs(5),
        user_agents: Vec::new(),
        referer: Some("https://www.dice.com/".to_string()),
        cookies: vec![
            CookieSpec::new("dice.search-id", "", 16),
            CookieSpec::new("dice.visitor-id", "", 24),
        ],
        detail: Some(DetailPage {
            description: vec![
                Selector::new("div", "jobDescriptionHtml"),
                Selector::new("div", "job-description"),
            ],
        }),
    }
}
