//! Crawl orchestration: sites × pages → fetch → select → extract → dedupe.
//!
//! One worker task per site descriptor runs that site's page loop; a
//! semaphore bounds how many sites crawl at once. Workers share only the
//! run-wide job budget (an atomic counter) and the fetcher handle — rate
//! limit state lives inside the fetch layer, keyed by site name. Records
//! from a single site keep their page/container discovery order; cross-site
//! order is completion order and is not part of the contract.
//!
//! Nothing here is crawl-fatal: a site whose pages keep failing is logged
//! and abandoned while the remaining sites keep producing records.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dedupe::dedupe;
use crate::dom::Document;
use crate::extract::{extract_record, skills_from_description};
use crate::models::{JobRecord, SearchQuery};
use crate::rng::{RandomSource, XorShiftRandom, shuffle};
use crate::select::{first_match, select};
use crate::site::{DetailPage, SiteDescriptor};
use crate::text::{clean_text, extract_text};
use crate::traits::Fetch;
use crate::urls::{format_search_url, page_url};

/// Floor for the per-site share of the job budget, so every site yields
/// something even on tight budgets.
const MIN_SITE_QUOTA: usize = 5;

/// Upper bound of the jitter added to inter-page pauses.
const PAGE_JITTER: Duration = Duration::from_secs(2);

/// Run-level crawl tuning.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard cap on records per run, across all sites.
    pub max_jobs: usize,
    /// How many sites crawl concurrently.
    pub concurrency: usize,
    /// Pause between site starts — serialized runs space sites out,
    /// concurrent runs stagger their openings.
    pub site_delay: Duration,
    /// Randomize site order each cycle to avoid a fixed request signature.
    pub shuffle_sites: bool,
    /// Override every descriptor's `max_pages` when set.
    pub max_pages: Option<u32>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_jobs: 100,
            concurrency: 2,
            site_delay: Duration::from_secs(15),
            shuffle_sites: true,
            max_pages: None,
        }
    }
}

/// Sequences one crawl cycle over a set of site descriptors.
///
/// Generic over the fetch layer so tests run against a mock. Exposes a
/// single operation: run a cycle, get deduplicated records back.
pub struct CrawlController<F: Fetch> {
    fetcher: F,
    sites: Vec<SiteDescriptor>,
    config: CrawlConfig,
    rng: Arc<dyn RandomSource>,
}

impl<F: Fetch + 'static> CrawlController<F> {
    pub fn new(fetcher: F, sites: Vec<SiteDescriptor>, config: CrawlConfig) -> Self {
        Self::with_rng(fetcher, sites, config, Arc::new(XorShiftRandom::new()))
    }

    pub fn with_rng(
        fetcher: F,
        sites: Vec<SiteDescriptor>,
        config: CrawlConfig,
        rng: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            fetcher,
            sites,
            config,
            rng,
        }
    }

    /// Run one crawl cycle and return deduplicated records.
    ///
    /// Cancelling `cancel` interrupts every sleep and in-flight fetch;
    /// whatever was collected so far is still returned.
    pub async fn run_cycle(
        &self,
        query: &SearchQuery,
        cancel: CancellationToken,
    ) -> Vec<JobRecord> {
        let mut sites: Vec<SiteDescriptor> = self
            .sites
            .iter()
            .filter(|site| match &query.target_site {
                Some(target) => site.name.eq_ignore_ascii_case(target),
                None => true,
            })
            .cloned()
            .collect();

        if sites.is_empty() {
            tracing::warn!("no sites match the crawl query; nothing to do");
            return Vec::new();
        }

        if query.target_site.is_none() && self.config.shuffle_sites {
            shuffle(&mut sites, self.rng.as_ref());
            tracing::debug!("randomized site processing order");
        }

        let quota = std::cmp::max(MIN_SITE_QUOTA, self.config.max_jobs / sites.len());
        tracing::info!(
            job_title = %query.job_title,
            location = %query.location,
            sites = sites.len(),
            per_site_quota = quota,
            "starting crawl cycle"
        );

        let budget = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut workers = JoinSet::new();

        for (index, site) in sites.into_iter().enumerate() {
            let worker = SiteWorker {
                fetcher: self.fetcher.clone(),
                site,
                query: query.clone(),
                quota,
                max_jobs: self.config.max_jobs,
                max_pages: self.config.max_pages,
                budget: Arc::clone(&budget),
                cancel: cancel.clone(),
                rng: Arc::clone(&self.rng),
            };
            let semaphore = Arc::clone(&semaphore);
            let stagger = if index == 0 {
                Duration::ZERO
            } else {
                self.config.site_delay + self.rng.jitter(self.config.site_delay)
            };
            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (worker.site.name.clone(), Vec::new());
                };
                if !stagger.is_zero() && !sleep_or_cancel(&worker.cancel, stagger).await {
                    return (worker.site.name.clone(), Vec::new());
                }
                worker.run().await
            });
        }

        let mut all = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((site, records)) => {
                    tracing::info!(site = %site, count = records.len(), "site finished");
                    all.extend(records);
                }
                Err(e) => tracing::error!(error = %e, "site worker panicked"),
            }
        }

        let unique = dedupe(all);
        tracing::info!(records = unique.len(), "crawl cycle complete");
        unique
    }
}

/// Per-site page loop. Owns everything it touches except the shared budget.
struct SiteWorker<F: Fetch> {
    fetcher: F,
    site: SiteDescriptor,
    query: SearchQuery,
    quota: usize,
    max_jobs: usize,
    max_pages: Option<u32>,
    budget: Arc<AtomicUsize>,
    cancel: CancellationToken,
    rng: Arc<dyn RandomSource>,
}

impl<F: Fetch> SiteWorker<F> {
    async fn run(self) -> (String, Vec<JobRecord>) {
        let search_url = format_search_url(
            &self.site.search_url_template,
            &self.query.job_title,
            &self.query.location,
        );
        let max_pages = self.max_pages.unwrap_or(self.site.max_pages);
        let mut records = Vec::new();

        'pages: for page in 1..=max_pages {
            if self.cancel.is_cancelled() {
                break;
            }
            let url = page_url(&search_url, &self.site.pagination_param, page);
            tracing::info!(site = %self.site.name, page, url = %url, "fetching results page");

            let html = tokio::select! {
                res = self.fetcher.fetch(&url, &self.site) => match res {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::warn!(
                            site = %self.site.name,
                            page,
                            error = %e,
                            "page fetch failed; stopping pagination for this site"
                        );
                        break 'pages;
                    }
                },
                () = self.cancel.cancelled() => break 'pages,
            };

            let doc = match Document::parse(&html) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(site = %self.site.name, page, error = %e, "skipping unparseable page");
                    continue;
                }
            };

            let containers: Vec<_> =
                select(&doc, doc.root(), &self.site.fields.container).collect();
            tracing::info!(
                site = %self.site.name,
                page,
                containers = containers.len(),
                "matched job containers"
            );

            for container in containers {
                let Some(mut record) =
                    extract_record(&doc, container, &self.site, &self.query)
                else {
                    continue;
                };
                if !self.try_claim() {
                    tracing::info!(site = %self.site.name, "run job budget reached");
                    break 'pages;
                }
                if let Some(detail) = &self.site.detail {
                    self.enrich(&mut record, detail).await;
                }
                tracing::info!(
                    site = %self.site.name,
                    title = %record.title,
                    company = %record.company,
                    location = %record.location,
                    "scraped job"
                );
                records.push(record);
                if records.len() >= self.quota {
                    tracing::info!(site = %self.site.name, quota = self.quota, "site quota reached");
                    break 'pages;
                }
            }

            if self.budget.load(Ordering::SeqCst) >= self.max_jobs {
                break;
            }
            if page < max_pages {
                let pause = self.site.page_delay + self.rng.jitter(PAGE_JITTER);
                if !sleep_or_cancel(&self.cancel, pause).await {
                    break;
                }
            }
        }

        (self.site.name.clone(), records)
    }

    /// Claim one slot of the run-wide budget; false when the run is full.
    fn try_claim(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |claimed| {
                (claimed < self.max_jobs).then_some(claimed + 1)
            })
            .is_ok()
    }

    /// Fetch the posting's own page and pull a fuller description from it.
    /// Best-effort: any failure keeps the card-level description.
    async fn enrich(&self, record: &mut JobRecord, detail: &DetailPage) {
        if !record.source.starts_with("http") {
            return;
        }
        let html = tokio::select! {
            res = self.fetcher.fetch(&record.source, &self.site) => match res {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(
                        site = %self.site.name,
                        url = %record.source,
                        error = %e,
                        "detail fetch failed; keeping card description"
                    );
                    return;
                }
            },
            () = self.cancel.cancelled() => return,
        };
        let Ok(doc) = Document::parse(&html) else {
            tracing::debug!(site = %self.site.name, url = %record.source, "unparseable detail page");
            return;
        };
        for selector in &detail.description {
            if let Some(node) = first_match(&doc, doc.root(), selector) {
                let text = clean_text(&extract_text(&doc, node));
                if !text.is_empty() {
                    record.description = text;
                    if record.skills.is_empty() {
                        record.skills = skills_from_description(&record.description);
                    }
                    return;
                }
            }
        }
    }
}

/// Cancellable sleep; true when the full duration elapsed.
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancel.cancelled() => false,
    }
}
