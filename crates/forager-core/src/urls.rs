//! Link resolution and search-URL construction.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

/// Resolve a crawled link against a site's base URL, the way browsers do.
///
/// Absolute (scheme-prefixed) URLs pass through unchanged; root-relative
/// links are appended to the scheme+host of `base`; other relative links
/// are appended to `base`'s directory. Downstream code compares these
/// against source URLs, so the resolution must stay byte-exact.
pub fn normalize_url(url: &str, base: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    if url.starts_with("http") {
        return url.to_string();
    }

    if url.starts_with('/') {
        let Some(scheme_end) = base.find("://") else {
            return format!("{base}{url}");
        };
        match base[scheme_end + 3..].find('/') {
            Some(path_start) => {
                let host_end = scheme_end + 3 + path_start;
                format!("{}{}", &base[..host_end], url)
            }
            None => format!("{base}{url}"),
        }
    } else {
        // Relative to the base's directory: truncate after the last '/',
        // ignoring the slashes inside "https://".
        match base.rfind('/') {
            Some(pos) if pos > 8 => format!("{}{}", &base[..=pos], url),
            _ if !base.ends_with('/') => format!("{base}/{url}"),
            _ => format!("{base}{url}"),
        }
    }
}

/// Substitute `{job_title}` / `{location}` placeholders, percent-encoded.
pub fn format_search_url(template: &str, job_title: &str, location: &str) -> String {
    template
        .replace("{job_title}", &encode_component(job_title))
        .replace("{location}", &encode_component(location))
}

/// Append the pagination parameter to a search URL. An empty `param`
/// leaves the URL untouched (single-page sites).
pub fn page_url(search_url: &str, param: &str, page: u32) -> String {
    if param.is_empty() {
        return search_url.to_string();
    }
    let separator = if search_url.contains('?') { '&' } else { '?' };
    format!("{search_url}{separator}{param}={page}")
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}
