//! Resilient HTTP fetching with retry, backoff, and rate-limit pacing.
//!
//! [`HttpFetcher`] implements the core [`Fetch`] trait. It is generic over a
//! [`Transport`] seam — [`ReqwestTransport`] in production — so the whole
//! retry ladder (429 vs 403 vs transport failures) runs deterministically in
//! tests without sockets.
//!
//! Every attempt first waits on the shared [`RateLimiter`], then sends a
//! browser-shaped request. Outcomes feed back into the limiter: successes
//! shrink a site's backoff, blocking statuses (429/403) extend it and, for
//! 403s, rotate the user agent before the next try.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;

use forager_core::error::ScrapeError;
use forager_core::limiter::RateLimiter;
use forager_core::rng::{RandomSource, XorShiftRandom};
use forager_core::site::SiteDescriptor;
use forager_core::traits::Fetch;

use crate::headers::{browser_headers, cookie_header, pick_user_agent, referer_for};

/// One outgoing page request, fully rendered.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

/// Status + body of one response, however it was obtained.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a single request attempt. Errors are transport-level only; HTTP
/// error statuses come back as a normal [`PageResponse`].
pub trait Transport: Send + Sync + Clone {
    fn send(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageResponse, ScrapeError>> + Send;
}

/// Retry/backoff tuning. Defaults match the pacing the target boards
/// tolerate; tests shrink them.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total attempts per fetch (not additional retries).
    pub max_retries: u32,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Sleep after HTTP 429, scaled by attempt number.
    pub rate_limit_backoff: Duration,
    /// Base sleep after a blocking status (403/999).
    pub blocked_backoff: Duration,
    /// Added to `blocked_backoff` per prior attempt.
    pub blocked_backoff_step: Duration,
    /// Base sleep after a transport failure, scaled by attempt number.
    pub transport_backoff: Duration,
    /// Jitter cap on top of transport backoff.
    pub transport_jitter: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            rate_limit_backoff: Duration::from_secs(60),
            blocked_backoff: Duration::from_secs(120),
            blocked_backoff_step: Duration::from_secs(60),
            transport_backoff: Duration::from_secs(3),
            transport_jitter: Duration::from_secs(5),
        }
    }
}

/// Production transport over a shared `reqwest` client.
///
/// The client keeps a cookie jar (so server-set cookies persist across a
/// site's pages), follows redirects, and transparently decompresses bodies.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &PageRequest) -> Result<PageResponse, ScrapeError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(reqwest::header::USER_AGENT, &request.user_agent);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ScrapeError::Transport(format!("connection failed: {e}"))
            } else {
                ScrapeError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Transport(format!("failed to read response body: {e}")))?;
        Ok(PageResponse { status, body })
    }
}

/// The [`Fetch`] implementation: rate-limited, header-rotating, retrying.
#[derive(Clone)]
pub struct HttpFetcher<T: Transport = ReqwestTransport> {
    transport: T,
    limiter: RateLimiter,
    config: FetcherConfig,
    rng: Arc<dyn RandomSource>,
    /// Rotation index into the user-agent pool; bumped on blocks.
    ua_offset: Arc<AtomicUsize>,
}

impl HttpFetcher<ReqwestTransport> {
    pub fn new(limiter: RateLimiter) -> Result<Self, ScrapeError> {
        Self::with_config(limiter, FetcherConfig::default())
    }

    pub fn with_config(limiter: RateLimiter, config: FetcherConfig) -> Result<Self, ScrapeError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(transport, limiter, config))
    }
}

impl<T: Transport> HttpFetcher<T> {
    /// Wire an explicit transport (tests inject a scripted one here).
    pub fn with_transport(transport: T, limiter: RateLimiter, config: FetcherConfig) -> Self {
        Self {
            transport,
            limiter,
            config,
            rng: Arc::new(XorShiftRandom::new()),
            ua_offset: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Inject the random source for deterministic header jitter.
    pub fn with_rng(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn build_request(&self, url: &str, site: &SiteDescriptor) -> PageRequest {
        let user_agent = pick_user_agent(site, self.ua_offset.load(Ordering::Relaxed));
        let mut headers = browser_headers(self.rng.as_ref());
        if let Some(referer) = referer_for(url, site) {
            headers.push(("Referer".to_string(), referer));
        }
        if let Some(cookies) = cookie_header(site, self.rng.as_ref()) {
            headers.push(("Cookie".to_string(), cookies));
        }
        PageRequest {
            url: url.to_string(),
            user_agent,
            headers,
        }
    }

    /// Sleep matched to the failure kind before the next attempt.
    /// `attempt` is 0-based.
    async fn backoff(&self, error: &ScrapeError, attempt: u32) {
        let pause = match error {
            ScrapeError::RateLimited(_) => self.config.rate_limit_backoff * (attempt + 1),
            ScrapeError::Blocked { .. } => {
                self.config.blocked_backoff + self.config.blocked_backoff_step * attempt
            }
            _ => {
                self.config.transport_backoff * (attempt + 1)
                    + self.rng.jitter(self.config.transport_jitter)
            }
        };
        tracing::debug!(sleep_ms = %pause.as_millis(), error = %error, "backing off before retry");
        tokio::time::sleep(pause).await;
    }
}

impl<T: Transport> Fetch for HttpFetcher<T> {
    async fn fetch(&self, url: &str, site: &SiteDescriptor) -> Result<String, ScrapeError> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = ScrapeError::Transport("no attempts made".to_string());

        for attempt in 0..attempts {
            self.limiter.acquire(&site.name, site.min_delay).await;
            let request = self.build_request(url, site);

            match self.transport.send(&request).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    self.limiter.record_success(&site.name);
                    tracing::debug!(
                        site = %site.name,
                        url = %url,
                        bytes = response.body.len(),
                        "fetched page"
                    );
                    return Ok(response.body);
                }
                Ok(response) => {
                    let error = ScrapeError::from_status(response.status, url);
                    self.limiter.record_failure(&site.name, error.is_blocking());
                    tracing::warn!(
                        site = %site.name,
                        status = response.status,
                        attempt = attempt + 1,
                        "HTTP error response"
                    );
                    if matches!(error, ScrapeError::Blocked { .. }) {
                        // A fresh identity sometimes gets past the block.
                        self.ua_offset.fetch_add(1, Ordering::Relaxed);
                    }
                    last_error = error;
                }
                Err(error) => {
                    self.limiter.record_failure(&site.name, false);
                    tracing::warn!(
                        site = %site.name,
                        attempt = attempt + 1,
                        error = %error,
                        "transport failure"
                    );
                    last_error = error;
                }
            }

            if !last_error.is_retryable() {
                return Err(last_error);
            }
            if attempt + 1 < attempts {
                self.backoff(&last_error, attempt).await;
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use forager_core::rng::FixedRandom;
    use forager_core::testutil::test_site;

    /// Transport that replays a scripted sequence of responses and records
    /// the requests it saw.
    #[derive(Clone, Default)]
    struct ScriptedTransport {
        script: Arc<Mutex<Vec<Result<PageResponse, ScrapeError>>>>,
        requests: Arc<Mutex<Vec<PageRequest>>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<PageResponse, ScrapeError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, request: &PageRequest) -> Result<PageResponse, ScrapeError> {
            self.requests.lock().unwrap().push(request.clone());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(PageResponse {
                    status: 200,
                    body: "<html></html>".to_string(),
                });
            }
            script.remove(0)
        }
    }

    fn ok(body: &str) -> Result<PageResponse, ScrapeError> {
        Ok(PageResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(code: u16) -> Result<PageResponse, ScrapeError> {
        Ok(PageResponse {
            status: code,
            body: String::new(),
        })
    }

    fn fetcher(transport: ScriptedTransport) -> HttpFetcher<ScriptedTransport> {
        let limiter = RateLimiter::with_rng(Arc::new(FixedRandom(0)));
        HttpFetcher::with_transport(transport, limiter, FetcherConfig::default())
            .with_rng(Arc::new(FixedRandom(0)))
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_the_body() {
        let transport = ScriptedTransport::new(vec![ok("<html>jobs</html>")]);
        let f = fetcher(transport);
        let site = test_site("Alpha", 1);

        let body = f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        assert_eq!(body, "<html>jobs</html>");
        let stats = f.limiter().snapshot("Alpha").unwrap();
        assert_eq!(stats.consecutive_successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_rate_limits() {
        let transport =
            ScriptedTransport::new(vec![status(429), status(429), ok("<html>ok</html>")]);
        let f = fetcher(transport.clone());
        let site = test_site("Alpha", 1);

        let body = f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(transport.requests().len(), 3);

        let stats = f.limiter().snapshot("Alpha").unwrap();
        assert_eq!(stats.consecutive_successes, 1);
        assert_eq!(stats.consecutive_failures, 0);
        // Two 429s put the site into backoff; one success isn't a streak.
        assert!(stats.backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_response_rotates_the_user_agent() {
        let transport = ScriptedTransport::new(vec![status(403), ok("<html></html>")]);
        let f = fetcher(transport.clone());
        let site = test_site("Alpha", 1);

        f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].user_agent, requests[1].user_agent);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_return_the_last_error() {
        let transport = ScriptedTransport::new(vec![status(429), status(429), status(429)]);
        let f = fetcher(transport.clone());
        let site = test_site("Alpha", 1);

        let err = f
            .fetch("https://alpha.example.com/search", &site)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::RateLimited(_)));
        assert_eq!(transport.requests().len(), 3);

        let stats = f.limiter().snapshot("Alpha").unwrap();
        assert_eq!(stats.consecutive_failures, 3);
        assert!(stats.backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(ScrapeError::Transport("connection reset".to_string())),
            ok("<html>recovered</html>"),
        ]);
        let f = fetcher(transport);
        let site = test_site("Alpha", 1);

        let body = f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        assert_eq!(body, "<html>recovered</html>");
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_use_the_http_taxonomy() {
        let transport = ScriptedTransport::new(vec![status(500), status(500), status(500)]);
        let f = fetcher(transport);
        let site = test_site("Alpha", 1);

        let err = f
            .fetch("https://alpha.example.com/search", &site)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Http { status: 500, .. }));
        // 5xx is not a blocking status.
        assert!(!f.limiter().snapshot("Alpha").unwrap().backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_carry_browser_headers_and_referer() {
        let transport = ScriptedTransport::new(vec![ok("<html></html>")]);
        let f = fetcher(transport.clone());
        let site = test_site("Alpha", 1);

        f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        let request = &transport.requests()[0];
        assert!(request.user_agent.starts_with("Mozilla/5.0"));
        let names: Vec<&str> = request.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"Accept-Language"));
        assert!(names.contains(&"Sec-Fetch-Mode"));
        assert!(names.contains(&"Referer"));
    }

    #[tokio::test(start_paused = true)]
    async fn forged_cookies_are_attached_when_configured() {
        use forager_core::site::CookieSpec;

        let transport = ScriptedTransport::new(vec![ok("<html></html>")]);
        let f = fetcher(transport.clone());
        let mut site = test_site("Alpha", 1);
        site.cookies = vec![CookieSpec::new("session", "", 12)];

        f.fetch("https://alpha.example.com/search", &site).await.unwrap();
        let request = &transport.requests()[0];
        let cookie = request
            .headers
            .iter()
            .find(|(n, _)| n == "Cookie")
            .map(|(_, v)| v.clone())
            .expect("cookie header");
        assert!(cookie.starts_with("session="));
    }
}
