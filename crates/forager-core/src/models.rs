use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One extracted job posting.
///
/// Built once per matched container node and immutable after it reaches
/// the output collection. `source` is the posting's canonical URL when one
/// was discovered, otherwise the site name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub source: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub scraped_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    pub skills: Vec<String>,
    /// Stable digest of site+title+company; survives re-crawls.
    pub job_id: String,
}

impl JobRecord {
    /// Dedup key: lowercased `title|company`.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}",
            self.title.to_lowercase(),
            self.company.to_lowercase()
        )
    }
}

/// What to search for, shared by every site in a crawl cycle.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub job_title: String,
    pub location: String,
    /// When non-empty, records matching none of these (in title or
    /// description, case-insensitive) are dropped at extraction time.
    pub keywords: Vec<String>,
    /// Restrict the crawl to one site by name.
    pub target_site: Option<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            job_title: "Software Developer".to_string(),
            location: "Remote".to_string(),
            keywords: Vec::new(),
            target_site: None,
        }
    }
}

/// Stable job identifier: truncated hex SHA-256 of `site:title:company`.
pub fn job_id(site: &str, title: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(site.as_bytes());
    hasher.update(b":");
    hasher.update(title.as_bytes());
    hasher.update(b":");
    hasher.update(company.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Current local time in the record timestamp format.
pub fn local_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
