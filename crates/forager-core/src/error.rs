use thiserror::Error;

/// Error taxonomy for the crawl-and-extract engine.
///
/// A selector that matches nothing is *not* an error — absent fields are
/// modelled as `Option`/empty strings at the extraction layer. Nothing in
/// this enum is crawl-fatal: fetch-level failures are retried, page-level
/// failures abort one site's pagination, and other sites keep running.
#[derive(Error, Debug, Clone)]
pub enum ScrapeError {
    /// DNS/connect/TLS/decode failure — retryable with short backoff.
    #[error("network error: {0}")]
    Transport(String),

    /// Request timed out — retryable.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP 429 — retryable after a long, attempt-scaled delay.
    #[error("rate limited (HTTP 429) at {0}")]
    RateLimited(String),

    /// HTTP 403 or an equivalent blocking status — retryable with
    /// user-agent rotation and an even longer delay.
    #[error("blocked (HTTP {status}) at {url}")]
    Blocked { status: u16, url: String },

    /// Any other non-2xx response — retryable per normal backoff.
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Document failed to parse. The page is skipped, never retried.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// Malformed configuration. The only hard-failure path; surfaces at
    /// startup, before any crawling happens.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScrapeError {
    /// Classify a non-2xx HTTP status into the taxonomy.
    ///
    /// 999 is LinkedIn's nonstandard "request denied" status and is treated
    /// the same as 403.
    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            429 => ScrapeError::RateLimited(url.to_string()),
            403 | 999 => ScrapeError::Blocked {
                status,
                url: url.to_string(),
            },
            _ => ScrapeError::Http {
                status,
                url: url.to_string(),
            },
        }
    }

    /// Returns true if another fetch attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::Transport(_)
                | ScrapeError::Timeout(_)
                | ScrapeError::RateLimited(_)
                | ScrapeError::Blocked { .. }
                | ScrapeError::Http { .. }
        )
    }

    /// Returns true if this outcome should push the site's rate-limit
    /// state into backoff mode.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            ScrapeError::RateLimited(_) | ScrapeError::Blocked { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ScrapeError::from_status(429, "http://x"),
            ScrapeError::RateLimited(_)
        ));
        assert!(matches!(
            ScrapeError::from_status(403, "http://x"),
            ScrapeError::Blocked { status: 403, .. }
        ));
        assert!(matches!(
            ScrapeError::from_status(999, "http://x"),
            ScrapeError::Blocked { status: 999, .. }
        ));
        assert!(matches!(
            ScrapeError::from_status(500, "http://x"),
            ScrapeError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn retryable_errors() {
        assert!(ScrapeError::Transport("reset".into()).is_retryable());
        assert!(ScrapeError::Timeout(30).is_retryable());
        assert!(ScrapeError::RateLimited("http://x".into()).is_retryable());
        assert!(
            ScrapeError::Blocked {
                status: 403,
                url: "http://x".into()
            }
            .is_retryable()
        );
        assert!(!ScrapeError::Parse("bad html".into()).is_retryable());
        assert!(!ScrapeError::Config("no sites".into()).is_retryable());
    }

    #[test]
    fn blocking_errors() {
        assert!(ScrapeError::RateLimited("http://x".into()).is_blocking());
        assert!(
            ScrapeError::Blocked {
                status: 999,
                url: "http://x".into()
            }
            .is_blocking()
        );
        assert!(
            !ScrapeError::Http {
                status: 500,
                url: "http://x".into()
            }
            .is_blocking()
        );
        assert!(!ScrapeError::Transport("connect".into()).is_blocking());
    }
}
