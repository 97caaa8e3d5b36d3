/// Background favicon warming
///
/// Fetches each bookmark's icon once from a short, ordered list of services
/// and stores it as a data URL under `favicon-<id>`, so the page can show
/// icons offline. Bulk refreshes run in small parallel batches and leave a
/// human-readable progress line in storage.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use log::{info, warn};
use serde_json::Value;

use crate::bookmark_data::{Bookmark, BookmarkChange};
use crate::config::WarmerConfig;
use crate::domain::{hostname, is_web_url, origin};
use crate::error::{Error, Result};
use crate::host::{BookmarkStore, FaviconFetcher, KeyValueStore};
use crate::storage::{SCAN_STATUS_KEY, favicon_key, load_json};

pub const STATUS_SCANNING: &str = "Scanning...";
pub const STATUS_COMPLETE: &str = "Scan complete.";

/// Services tried in order for one page
pub fn warm_sources(page_url: &str) -> Vec<String> {
    let mut sources = Vec::with_capacity(3);
    if let Some(host) = hostname(page_url) {
        sources.push(format!("https://www.google.com/s2/favicons?domain={}&sz=64", host));
        sources.push(format!("https://icons.duckduckgo.com/ip3/{}.ico", host));
    }
    if let Some(origin) = origin(page_url) {
        sources.push(format!("{}/favicon.ico", origin));
    }
    sources
}

/// Encode an image body as a `data:` URL
pub fn to_data_url(content_type: Option<&str>, body: &[u8]) -> String {
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .filter(|ct| !ct.is_empty())
        .unwrap_or("image/x-icon");
    format!("data:{};base64,{}", mime, STANDARD.encode(body))
}

pub fn progress_status(processed: usize, total: usize) -> String {
    format!("Scanned {} of {} bookmarks.", processed, total)
}

/// Outcome of warming one bookmark
#[derive(Debug, Clone, PartialEq)]
pub enum WarmOutcome {
    Stored(String),
    AlreadyCached,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarmReport {
    pub scanned: usize,
    pub stored: usize,
    pub failed: usize,
}

pub struct FaviconWarmer<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
    config: &'a WarmerConfig,
}

impl<'a, F: FaviconFetcher, S: KeyValueStore> FaviconWarmer<'a, F, S> {
    pub fn new(fetcher: &'a F, store: &'a S, config: &'a WarmerConfig) -> Self {
        FaviconWarmer { fetcher, store, config }
    }

    /// Cached data URL for a bookmark, if one was stored earlier
    pub async fn stored(&self, bookmark_id: &str) -> Result<Option<String>> {
        load_json(self.store, &favicon_key(bookmark_id)).await
    }

    /// Warm one bookmark unless it already has a cached icon
    pub async fn warm(&self, bookmark: &Bookmark) -> WarmOutcome {
        if !is_web_url(&bookmark.url) {
            return WarmOutcome::Skipped;
        }
        match self.stored(&bookmark.id).await {
            Ok(Some(_)) => return WarmOutcome::AlreadyCached,
            Ok(None) => {}
            Err(e) => {
                self.report(&bookmark.url, &e);
                return WarmOutcome::Failed;
            }
        }
        self.refetch(bookmark).await
    }

    /// Fetch and store an icon even if one is cached (the URL changed)
    pub async fn refetch(&self, bookmark: &Bookmark) -> WarmOutcome {
        if !is_web_url(&bookmark.url) {
            return WarmOutcome::Skipped;
        }
        match self.fetch_data_url(&bookmark.url).await {
            Ok(data_url) => {
                let key = favicon_key(&bookmark.id);
                match self.store.set_value(&key, Value::String(data_url.clone())).await {
                    Ok(()) => WarmOutcome::Stored(data_url),
                    Err(e) => {
                        self.report(&bookmark.url, &e);
                        WarmOutcome::Failed
                    }
                }
            }
            Err(e) => {
                self.report(&bookmark.url, &e);
                // Any icon still cached belongs to the previous URL
                if let Err(e) = self.store.remove_value(&favicon_key(&bookmark.id)).await {
                    self.report(&bookmark.url, &e);
                }
                WarmOutcome::Failed
            }
        }
    }

    /// Re-fetch after an edit; a title-only change keeps the cached icon
    pub async fn bookmark_changed<B: BookmarkStore>(
        &self,
        bookmarks: &B,
        id: &str,
        change: &BookmarkChange,
    ) -> Result<WarmOutcome> {
        if !change.url_changed() {
            return Ok(WarmOutcome::Skipped);
        }
        let bookmark = bookmarks.get_node(id).await?.and_then(|node| node.to_bookmark(""));
        Ok(match bookmark {
            Some(bookmark) => self.refetch(&bookmark).await,
            None => WarmOutcome::Skipped,
        })
    }

    /// Warm every bookmark, `batch_size` at a time
    pub async fn refresh_all(&self, bookmarks: &[Bookmark]) -> Result<WarmReport> {
        self.set_status(STATUS_SCANNING).await?;

        let eligible: Vec<&Bookmark> = bookmarks.iter().filter(|b| is_web_url(&b.url)).collect();
        let total = eligible.len();
        let mut report = WarmReport::default();

        for batch in eligible.chunks(self.config.batch_size.max(1)) {
            let outcomes = join_all(batch.iter().map(|bookmark| self.warm(bookmark))).await;
            for outcome in outcomes {
                report.scanned += 1;
                match outcome {
                    WarmOutcome::Stored(_) => report.stored += 1,
                    WarmOutcome::Failed => report.failed += 1,
                    WarmOutcome::AlreadyCached | WarmOutcome::Skipped => {}
                }
            }
            self.set_status(&progress_status(report.scanned, total)).await?;
        }

        self.set_status(STATUS_COMPLETE).await?;
        info!(
            "Favicon scan finished: {} scanned, {} stored, {} failed",
            report.scanned, report.stored, report.failed
        );
        Ok(report)
    }

    async fn fetch_data_url(&self, page_url: &str) -> Result<String> {
        let mut last_error = Error::Fetch {
            url: page_url.to_string(),
            reason: "no favicon source for this URL".to_string(),
        };

        for source in warm_sources(page_url) {
            match self.fetcher.fetch(&source).await {
                Ok(icon) if icon.ok && icon.body.len() >= self.config.min_icon_bytes => {
                    return Ok(to_data_url(icon.content_type.as_deref(), &icon.body));
                }
                Ok(icon) => {
                    last_error = Error::Fetch {
                        url: source,
                        reason: format!("status {} with {} bytes", icon.status, icon.body.len()),
                    };
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    async fn set_status(&self, status: &str) -> Result<()> {
        self.store
            .set_value(SCAN_STATUS_KEY, Value::String(status.to_string()))
            .await
    }

    fn report(&self, page_url: &str, error: &Error) {
        let message = error.to_string();
        if !self.config.is_quiet(&message) {
            warn!("Could not process favicon for {}: {}", page_url, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FetchedIcon, MemoryHost};
    use futures::executor::block_on;
    use std::cell::RefCell;

    /// Serves a fixed body for URLs containing a fragment, 404 otherwise
    struct FakeFetcher {
        serving: Vec<(&'static str, usize)>,
        requested: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(serving: Vec<(&'static str, usize)>) -> Self {
            FakeFetcher {
                serving,
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl FaviconFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedIcon> {
            self.requested.borrow_mut().push(url.to_string());
            if url.contains("cors-blocked") {
                return Err(Error::Fetch {
                    url: url.to_string(),
                    reason: "blocked by CORS policy".to_string(),
                });
            }
            Ok(match self.serving.iter().find(|(fragment, _)| url.contains(fragment)) {
                Some((_, len)) => FetchedIcon {
                    ok: true,
                    status: 200,
                    content_type: Some("image/png; charset=binary".to_string()),
                    body: vec![7u8; *len],
                },
                None => FetchedIcon {
                    ok: false,
                    status: 404,
                    content_type: None,
                    body: Vec::new(),
                },
            })
        }
    }

    /// Keeps every scan status written, in order
    struct StatusLog {
        inner: MemoryHost,
        statuses: RefCell<Vec<String>>,
    }

    impl KeyValueStore for StatusLog {
        async fn get_value(&self, key: &str) -> Result<Option<Value>> {
            self.inner.get_value(key).await
        }

        async fn set_value(&self, key: &str, value: Value) -> Result<()> {
            if key == SCAN_STATUS_KEY {
                if let Value::String(status) = &value {
                    self.statuses.borrow_mut().push(status.clone());
                }
            }
            self.inner.set_value(key, value).await
        }

        async fn remove_value(&self, key: &str) -> Result<()> {
            self.inner.remove_value(key).await
        }
    }

    fn bookmark(id: &str, url: &str) -> Bookmark {
        Bookmark::new(id, "", url, "")
    }

    #[test]
    fn test_warm_sources_order() {
        let sources = warm_sources("https://news.example.org/a/b");

        assert_eq!(
            sources,
            vec![
                "https://www.google.com/s2/favicons?domain=news.example.org&sz=64".to_string(),
                "https://icons.duckduckgo.com/ip3/news.example.org.ico".to_string(),
                "https://news.example.org/favicon.ico".to_string(),
            ]
        );
    }

    #[test]
    fn test_to_data_url() {
        assert_eq!(to_data_url(Some("image/png"), b"abc"), "data:image/png;base64,YWJj");
        assert_eq!(to_data_url(None, b"abc"), "data:image/x-icon;base64,YWJj");
        assert_eq!(to_data_url(Some("image/png; q=1"), b""), "data:image/png;base64,");
    }

    #[test]
    fn test_warm_stops_at_first_good_source() {
        let host = MemoryHost::new();
        let fetcher = FakeFetcher::new(vec![("duckduckgo", 300), ("favicon.ico", 300)]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);

        let outcome = block_on(warmer.warm(&bookmark("7", "https://example.com")));

        assert!(matches!(outcome, WarmOutcome::Stored(ref url) if url.starts_with("data:image/png;base64,")));
        assert_eq!(fetcher.requested.borrow().len(), 2);
        assert!(host.value("favicon-7").is_some());
    }

    #[test]
    fn test_warm_rejects_tiny_bodies() {
        let host = MemoryHost::new();
        let fetcher = FakeFetcher::new(vec![("google.com", 20), ("favicon.ico", 150)]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);

        let outcome = block_on(warmer.warm(&bookmark("7", "https://example.com")));

        assert!(matches!(outcome, WarmOutcome::Stored(_)));
        assert_eq!(fetcher.requested.borrow().len(), 3);
    }

    #[test]
    fn test_warm_skips_cached_and_non_web() {
        let host = MemoryHost::new();
        host.put_value("favicon-1", Value::String("data:image/png;base64,AAAA".to_string()));
        let fetcher = FakeFetcher::new(vec![("google.com", 300)]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);

        assert_eq!(block_on(warmer.warm(&bookmark("1", "https://example.com"))), WarmOutcome::AlreadyCached);
        assert_eq!(block_on(warmer.warm(&bookmark("2", "ftp://example.com"))), WarmOutcome::Skipped);
        assert!(fetcher.requested.borrow().is_empty());
    }

    #[test]
    fn test_warm_failure_is_reported_not_raised() {
        let host = MemoryHost::new();
        let fetcher = FakeFetcher::new(vec![]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);

        assert_eq!(block_on(warmer.warm(&bookmark("1", "https://cors-blocked.example"))), WarmOutcome::Failed);
        assert_eq!(block_on(warmer.warm(&bookmark("2", "https://missing.example"))), WarmOutcome::Failed);
        assert!(host.value("favicon-1").is_none());
    }

    #[test]
    fn test_refetch_failure_drops_stale_icon() {
        let host = MemoryHost::new();
        host.put_value("favicon-1", Value::String("data:image/png;base64,AAAA".to_string()));
        let fetcher = FakeFetcher::new(vec![]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);

        let outcome = block_on(warmer.refetch(&bookmark("1", "https://moved.example")));

        assert_eq!(outcome, WarmOutcome::Failed);
        assert!(host.value("favicon-1").is_none());
    }

    #[test]
    fn test_refresh_all_reports_progress_in_batches() {
        let host = MemoryHost::new();
        host.put_value("favicon-b3", Value::String("data:,".to_string()));
        let fetcher = FakeFetcher::new(vec![("google.com", 300)]);
        let config = WarmerConfig {
            batch_size: 2,
            ..WarmerConfig::default()
        };
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);
        let bookmarks: Vec<Bookmark> = (1..=5)
            .map(|i| bookmark(&format!("b{}", i), &format!("https://site{}.example", i)))
            .chain(std::iter::once(bookmark("x", "javascript:void(0)")))
            .collect();

        let report = block_on(warmer.refresh_all(&bookmarks)).unwrap();

        assert_eq!(report, WarmReport { scanned: 5, stored: 4, failed: 0 });
        assert_eq!(host.value(SCAN_STATUS_KEY), Some(Value::String(STATUS_COMPLETE.to_string())));
        assert_eq!(fetcher.requested.borrow().len(), 4);
    }

    #[test]
    fn test_refresh_all_writes_status_per_batch() {
        let store = StatusLog {
            inner: MemoryHost::new(),
            statuses: RefCell::new(Vec::new()),
        };
        let fetcher = FakeFetcher::new(vec![("google.com", 300)]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &store, &config);
        let bookmarks: Vec<Bookmark> = (1..=12)
            .map(|i| bookmark(&format!("b{}", i), &format!("https://site{}.example", i)))
            .collect();

        block_on(warmer.refresh_all(&bookmarks)).unwrap();

        assert_eq!(
            *store.statuses.borrow(),
            vec![
                "Scanning...".to_string(),
                "Scanned 5 of 12 bookmarks.".to_string(),
                "Scanned 10 of 12 bookmarks.".to_string(),
                "Scanned 12 of 12 bookmarks.".to_string(),
                "Scan complete.".to_string(),
            ]
        );
    }

    #[test]
    fn test_title_change_keeps_cached_icon() {
        let host = MemoryHost::new();
        let id = host.insert_bookmark("Docs", "https://docs.example");
        host.put_value(&favicon_key(&id), Value::String("data:image/png;base64,AAAA".to_string()));
        let fetcher = FakeFetcher::new(vec![]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);
        let renamed = BookmarkChange {
            title: Some("Reference".to_string()),
            url: None,
        };

        let outcome = block_on(warmer.bookmark_changed(&host, &id, &renamed)).unwrap();

        assert_eq!(outcome, WarmOutcome::Skipped);
        assert!(fetcher.requested.borrow().is_empty());
        assert!(host.value(&favicon_key(&id)).is_some());
    }

    #[test]
    fn test_url_change_refetches_icon() {
        let host = MemoryHost::new();
        let id = host.insert_bookmark("Docs", "https://docs.example");
        host.put_value(&favicon_key(&id), Value::String("data:,old".to_string()));
        let fetcher = FakeFetcher::new(vec![("google.com", 300)]);
        let config = WarmerConfig::default();
        let warmer = FaviconWarmer::new(&fetcher, &host, &config);
        let moved = BookmarkChange {
            title: None,
            url: Some("https://docs.example".to_string()),
        };

        let outcome = block_on(warmer.bookmark_changed(&host, &id, &moved)).unwrap();

        assert!(matches!(outcome, WarmOutcome::Stored(_)));
        assert!(matches!(
            host.value(&favicon_key(&id)),
            Some(Value::String(ref url)) if url.starts_with("data:image/png;base64,")
        ));
    }

    #[test]
    fn test_progress_status() {
        assert_eq!(progress_status(5, 12), "Scanned 5 of 12 bookmarks.");
    }
}
