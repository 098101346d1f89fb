pub mod fetcher;
pub mod headers;

pub use fetcher::{FetcherConfig, HttpFetcher, PageRequest, PageResponse, ReqwestTransport, Transport};
