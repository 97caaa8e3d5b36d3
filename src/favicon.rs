/// Interactive favicon resolution
///
/// Every candidate source is probed at once; the first one that decodes to a
/// real image (bigger than a tracking pixel) wins. Losing probes are dropped
/// and left to finish on their own. Wins are cached for the session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::pin::pin;

use futures::future::{Either, select};
use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;
use url::Url;

use crate::config::FaviconConfig;
use crate::domain::{hostname, origin};
use crate::host::{ImageProbe, Timer};

/// Conventional icon locations on the page's own origin
const SAME_ORIGIN_PATHS: [&str; 4] = [
    "/favicon.ico",
    "/apple-touch-icon.png",
    "/apple-touch-icon-precomposed.png",
    "/favicon-32x32.png",
];

/// Candidate icon URLs for a page, or `None` if the URL has no host
///
/// `internal_base` is the extension origin when the host serves its own
/// favicon cache (`<base>/_favicon/?pageUrl=...`).
pub fn favicon_candidates(page_url: &str, internal_base: Option<&str>) -> Option<Vec<String>> {
    let host = hostname(page_url)?;
    let mut candidates = Vec::with_capacity(12);

    if let Some(base) = internal_base {
        let endpoint = format!("{}/_favicon/", base.trim_end_matches('/'));
        if let Ok(url) = Url::parse_with_params(&endpoint, &[("pageUrl", page_url), ("size", "32")]) {
            candidates.push(url.to_string());
        }
    }

    for size in ["32", "64"] {
        candidates.push(format!("https://www.google.com/s2/favicons?domain={}&sz={}", host, size));
    }

    for size in ["32", "64"] {
        let params = [
            ("client", "SOCIAL"),
            ("type", "FAVICON"),
            ("fallback_opts", "TYPE,SIZE,URL"),
            ("url", page_url),
            ("size", size),
        ];
        if let Ok(url) = Url::parse_with_params("https://t3.gstatic.com/faviconV2", &params) {
            candidates.push(url.to_string());
        }
    }

    candidates.push(format!("https://icons.duckduckgo.com/ip3/{}.ico", host));

    if let Some(origin) = origin(page_url) {
        candidates.extend(SAME_ORIGIN_PATHS.iter().map(|path| format!("{}{}", origin, path)));
    }

    Some(candidates)
}

pub struct FaviconResolver<P, T> {
    probe: P,
    timer: T,
    config: FaviconConfig,
    internal_base: Option<String>,
    cache: RefCell<HashMap<String, String>>,
}

impl<P: ImageProbe, T: Timer> FaviconResolver<P, T> {
    pub fn new(probe: P, timer: T, config: FaviconConfig) -> Self {
        FaviconResolver {
            probe,
            timer,
            config,
            internal_base: None,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Also ask the host's internal favicon cache
    pub fn with_internal_base(mut self, base: Option<String>) -> Self {
        self.internal_base = base;
        self
    }

    pub fn default_icon(&self) -> &str {
        &self.config.default_icon
    }

    pub fn cached(&self, page_url: &str) -> Option<String> {
        self.cache.borrow().get(page_url).cloned()
    }

    /// Icon URL for a page; the default icon when nothing usable answers
    pub async fn resolve(&self, page_url: &str) -> String {
        if let Some(hit) = self.cached(page_url) {
            return hit;
        }

        let Some(candidates) = favicon_candidates(page_url, self.internal_base.as_deref()) else {
            debug!("No favicon candidates for {:?}", page_url);
            return self.config.default_icon.clone();
        };

        match self.race(&candidates).await {
            Some(icon) => {
                self.cache.borrow_mut().insert(page_url.to_string(), icon.clone());
                icon
            }
            None => self.config.default_icon.clone(),
        }
    }

    async fn race(&self, candidates: &[String]) -> Option<String> {
        let min = self.config.min_dimension;
        let mut probes: FuturesUnordered<_> = candidates
            .iter()
            .map(|url| async move { (url, self.probe.probe(url).await) })
            .collect();

        let first_usable = pin!(async {
            while let Some((url, outcome)) = probes.next().await {
                match outcome {
                    Ok(size) if size.width > min && size.height > min => return Some(url.clone()),
                    Ok(size) => debug!("Rejecting {}x{} placeholder from {}", size.width, size.height, url),
                    Err(e) => debug!("Favicon candidate failed: {}", e),
                }
            }
            None
        });
        let deadline = pin!(self.timer.sleep(self.config.timeout()));

        match select(first_usable, deadline).await {
            Either::Left((winner, _)) => winner,
            Either::Right(_) => {
                debug!("Favicon probes timed out after {}ms", self.config.timeout_ms);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ICON;
    use crate::error::{Error, Result};
    use crate::host::ImageSize;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::time::Duration;

    /// Succeeds only for URLs containing one of the configured fragments
    struct FakeProbe {
        working: Vec<(String, ImageSize)>,
        calls: Cell<usize>,
    }

    impl FakeProbe {
        fn new(working: &[(&str, u32)]) -> Self {
            FakeProbe {
                working: working
                    .iter()
                    .map(|(fragment, side)| (fragment.to_string(), ImageSize { width: *side, height: *side }))
                    .collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl ImageProbe for FakeProbe {
        async fn probe(&self, url: &str) -> Result<ImageSize> {
            self.calls.set(self.calls.get() + 1);
            self.working
                .iter()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .map(|(_, size)| *size)
                .ok_or_else(|| Error::Probe {
                    url: url.to_string(),
                    reason: "net::ERR_FAILED".to_string(),
                })
        }
    }

    /// Never settles, like a server that accepts the connection and stalls
    struct StalledProbe;

    impl ImageProbe for StalledProbe {
        async fn probe(&self, _url: &str) -> Result<ImageSize> {
            futures::future::pending().await
        }
    }

    struct InstantTimer;

    impl Timer for InstantTimer {
        async fn sleep(&self, _duration: Duration) {}
    }

    struct NeverTimer;

    impl Timer for NeverTimer {
        async fn sleep(&self, _duration: Duration) {
            futures::future::pending::<()>().await
        }
    }

    fn resolver<P: ImageProbe, T: Timer>(probe: P, timer: T) -> FaviconResolver<P, T> {
        FaviconResolver::new(probe, timer, FaviconConfig::default())
    }

    #[test]
    fn test_candidates_cover_every_source() {
        let candidates = favicon_candidates("https://www.example.com/page?q=1", Some("chrome-extension://abc")).unwrap();

        assert_eq!(candidates.len(), 10);
        assert!(candidates[0].starts_with("chrome-extension://abc/_favicon/?pageUrl=https%3A%2F%2Fwww.example.com"));
        assert!(candidates[0].ends_with("&size=32"));
        assert!(candidates.contains(&"https://www.google.com/s2/favicons?domain=www.example.com&sz=64".to_string()));
        assert!(candidates.iter().any(|c| c.starts_with("https://t3.gstatic.com/faviconV2?") && c.ends_with("size=64")));
        assert!(candidates.contains(&"https://icons.duckduckgo.com/ip3/www.example.com.ico".to_string()));
        assert_eq!(candidates.last().unwrap(), "https://www.example.com/favicon-32x32.png");
    }

    #[test]
    fn test_candidates_without_internal_lookup() {
        let candidates = favicon_candidates("http://localhost:8080/", None).unwrap();

        assert_eq!(candidates.len(), 9);
        assert!(candidates.contains(&"http://localhost:8080/favicon.ico".to_string()));
    }

    #[test]
    fn test_candidates_for_unparsable_url() {
        assert_eq!(favicon_candidates("not a url", None), None);
    }

    #[test]
    fn test_resolve_unparsable_url_gives_default() {
        let probe = FakeProbe::new(&[]);
        let resolver = resolver(probe, NeverTimer);

        assert_eq!(block_on(resolver.resolve("::::")), DEFAULT_ICON);
        assert_eq!(resolver.probe.calls.get(), 0);
    }

    #[test]
    fn test_resolve_finds_last_candidate() {
        let resolver = resolver(FakeProbe::new(&[("favicon-32x32.png", 32)]), NeverTimer);

        let icon = block_on(resolver.resolve("https://example.com/"));

        assert_eq!(icon, "https://example.com/favicon-32x32.png");
    }

    #[test]
    fn test_resolve_rejects_tracking_pixels() {
        let resolver = resolver(
            FakeProbe::new(&[("google.com/s2", 1), ("duckduckgo", 2), ("apple-touch-icon.png", 180)]),
            NeverTimer,
        );

        let icon = block_on(resolver.resolve("https://example.com/"));

        assert_eq!(icon, "https://example.com/apple-touch-icon.png");
    }

    #[test]
    fn test_resolve_all_failing_gives_default() {
        let resolver = resolver(FakeProbe::new(&[]), NeverTimer);

        let icon = block_on(resolver.resolve("https://example.com/"));

        assert_eq!(icon, DEFAULT_ICON);
        assert_eq!(resolver.probe.calls.get(), 9);
        assert_eq!(resolver.cached("https://example.com/"), None);
    }

    #[test]
    fn test_resolve_times_out_to_default() {
        let resolver = resolver(StalledProbe, InstantTimer);

        assert_eq!(block_on(resolver.resolve("https://slow.example/")), DEFAULT_ICON);
    }

    #[test]
    fn test_resolve_caches_wins() {
        let resolver = resolver(FakeProbe::new(&[("duckduckgo", 16)]), NeverTimer);

        let first = block_on(resolver.resolve("https://example.com/"));
        let calls = resolver.probe.calls.get();
        let second = block_on(resolver.resolve("https://example.com/"));

        assert_eq!(first, second);
        assert_eq!(resolver.probe.calls.get(), calls);
        assert_eq!(resolver.cached("https://example.com/"), Some(first));
    }

    #[test]
    fn test_resolve_uses_internal_lookup() {
        let resolver = resolver(FakeProbe::new(&[("_favicon", 32)]), NeverTimer)
            .with_internal_base(Some("chrome-extension://abc".to_string()));

        let icon = block_on(resolver.resolve("https://example.com/"));

        assert!(icon.starts_with("chrome-extension://abc/_favicon/"));
    }
}
