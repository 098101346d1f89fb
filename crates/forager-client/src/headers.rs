//! Browser-shaped request headers, user agents, and forged cookies.
//!
//! Job boards fingerprint bare HTTP clients aggressively; requests here
//! carry the header set a desktop Chrome session would send, with the
//! fingerprint-ish values (viewport, DPR) randomised per request.

use forager_core::rng::{RandomSource, random_string};
use forager_core::site::SiteDescriptor;
use url::Url;

/// Builtin user-agent pool, used when a site has no pool of its own.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
];

/// Pick a user agent for a site: its own pool when it has one, else the
/// builtin pool. `offset` is the fetcher's rotation index, advanced when a
/// site blocks a request.
pub fn pick_user_agent(site: &SiteDescriptor, offset: usize) -> String {
    let pool: Vec<&str> = if site.user_agents.is_empty() {
        USER_AGENTS.to_vec()
    } else {
        site.user_agents.iter().map(String::as_str).collect()
    };
    pool[offset % pool.len()].to_string()
}

/// The static + randomised header set of a plausible browser navigation.
pub fn browser_headers(rng: &dyn RandomSource) -> Vec<(String, String)> {
    vec![
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
        ("Connection".to_string(), "keep-alive".to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ("Sec-Fetch-Dest".to_string(), "document".to_string()),
        ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
        ("Sec-Fetch-Site".to_string(), "none".to_string()),
        ("Sec-Fetch-User".to_string(), "?1".to_string()),
        ("Cache-Control".to_string(), "max-age=0".to_string()),
        (
            "Viewport-Width".to_string(),
            (1200 + rng.below(400)).to_string(),
        ),
        ("DPR".to_string(), (1 + rng.below(2)).to_string()),
        (
            "Sec-CH-UA".to_string(),
            "\"Chromium\";v=\"110\"".to_string(),
        ),
        ("Sec-CH-UA-Mobile".to_string(), "?0".to_string()),
        ("Sec-CH-UA-Platform".to_string(), "\"Windows\"".to_string()),
    ]
}

/// The site's configured referer, else the scheme+host of the request URL.
pub fn referer_for(url: &str, site: &SiteDescriptor) -> Option<String> {
    if let Some(referer) = &site.referer {
        return Some(referer.clone());
    }
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/", parsed.scheme(), host))
}

/// Render the site's synthetic session cookies as a `Cookie` header value.
pub fn cookie_header(site: &SiteDescriptor, rng: &dyn RandomSource) -> Option<String> {
    if site.cookies.is_empty() {
        return None;
    }
    let rendered: Vec<String> = site
        .cookies
        .iter()
        .map(|spec| {
            format!(
                "{}={}{}",
                spec.name,
                spec.prefix,
                random_string(rng, spec.random_len)
            )
        })
        .collect();
    Some(rendered.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use forager_core::rng::{FixedRandom, XorShiftRandom};
    use forager_core::site::{CookieSpec, default_sites};
    use forager_core::testutil::test_site;

    #[test]
    fn builtin_pool_rotates_by_offset() {
        let site = test_site("Plain", 1);
        let a = pick_user_agent(&site, 0);
        let b = pick_user_agent(&site, 1);
        assert_ne!(a, b);
        assert_eq!(a, pick_user_agent(&site, USER_AGENTS.len()));
    }

    #[test]
    fn site_pool_takes_precedence() {
        let sites = default_sites();
        let linkedin = sites.iter().find(|s| s.name == "LinkedIn").unwrap();
        let ua = pick_user_agent(linkedin, 0);
        assert_eq!(ua, linkedin.user_agents[0]);
    }

    #[test]
    fn browser_headers_cover_the_fingerprint_surface() {
        let rng = XorShiftRandom::seeded(1);
        let headers = browser_headers(&rng);
        let names: Vec<&str> = headers.iter().map(|(n, _)| n.as_str()).collect();
        for expected in [
            "Accept",
            "Accept-Language",
            "Sec-Fetch-Dest",
            "Sec-CH-UA",
            "Viewport-Width",
        ] {
            assert!(names.contains(&expected), "missing header {expected}");
        }
        let viewport: u32 = headers
            .iter()
            .find(|(n, _)| n == "Viewport-Width")
            .map(|(_, v)| v.parse().unwrap())
            .unwrap();
        assert!((1200..1600).contains(&viewport));
    }

    #[test]
    fn referer_prefers_site_configuration() {
        let sites = default_sites();
        let linkedin = sites.iter().find(|s| s.name == "LinkedIn").unwrap();
        assert_eq!(
            referer_for("https://www.linkedin.com/jobs/search?x=1", linkedin).as_deref(),
            Some("https://www.linkedin.com/feed/")
        );
    }

    #[test]
    fn referer_falls_back_to_request_host() {
        let site = test_site("Plain", 1);
        assert_eq!(
            referer_for("https://boards.example.org/search?q=dev", &site).as_deref(),
            Some("https://boards.example.org/")
        );
    }

    #[test]
    fn cookie_header_renders_specs_in_order() {
        let mut site = test_site("Plain", 1);
        site.cookies = vec![
            CookieSpec::new("session", "", 8),
            CookieSpec::new("token", "v2:", 4),
        ];
        let header = cookie_header(&site, &FixedRandom(0)).unwrap();
        let parts: Vec<&str> = header.split("; ").collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("session="));
        assert!(parts[1].starts_with("token=v2:"));
        assert_eq!(parts[1].len(), "token=v2:".len() + 4);
    }

    #[test]
    fn no_cookie_specs_means_no_header() {
        let site = test_site("Plain", 1);
        assert!(cookie_header(&site, &FixedRandom(0)).is_none());
    }
}
