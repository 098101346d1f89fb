pub mod crawler;
pub mod dedupe;
pub mod dom;
pub mod error;
pub mod extract;
pub mod limiter;
pub mod models;
pub mod rng;
pub mod select;
pub mod site;
pub mod testutil;
pub mod text;
pub mod traits;
pub mod urls;

pub use crawler::{CrawlConfig, CrawlController};
pub use dedupe::dedupe;
pub use error::ScrapeError;
pub use limiter::RateLimiter;
pub use models::{JobRecord, SearchQuery};
pub use site::{SiteDescriptor, default_sites};
pub use traits::Fetch;
