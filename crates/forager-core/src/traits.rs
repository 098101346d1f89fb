use std::future::Future;

use crate::error::ScrapeError;
use crate::site::SiteDescriptor;

/// Fetches the raw HTML body of a URL on behalf of a site's crawl.
///
/// Implementations own retry, backoff, and rate-limit pacing; callers see
/// either a body or the final taxonomy error after retries are exhausted.
/// The descriptor is passed so the fetch layer can apply per-site pacing,
/// user-agent pools, referers, and cookies.
pub trait Fetch: Send + Sync + Clone {
    fn fetch(
        &self,
        url: &str,
        site: &SiteDescriptor,
    ) -> impl Future<Output = Result<String, ScrapeError>> + Send;
}
