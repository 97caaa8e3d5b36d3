/// Browser adapter: every host capability routed through the `newtab.js` bridge

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::bookmark_data::{BookmarkNode, TopSite};
use crate::error::{Error, Result};
use crate::host::{BookmarkStore, FaviconFetcher, FetchedIcon, ImageProbe, ImageSize, KeyValueStore, Timer, TopSites};

// Import JS bridge functions
#[wasm_bindgen(module = "/newtab.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getBookmarkTree() -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getBookmark(id: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createBookmark(title: &str, url: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateBookmark(id: &str, title: &str, url: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeBookmark(id: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(key: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTopSites() -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn deleteHistoryUrl(url: &str) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn probeImage(url: &str) -> std::result::Result<JsValue, JsValue>;

    async fn sleep(ms: f64);

    #[wasm_bindgen(catch)]
    async fn fetchImage(url: &str) -> std::result::Result<JsValue, JsValue>;

    fn faviconBase() -> Option<String>;
}

#[derive(Deserialize)]
struct RawSize {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIcon {
    ok: bool,
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| Error::host(format!("Failed to parse {}: {:?}", what, e)))
}

fn host_error(action: &str, e: JsValue) -> Error {
    Error::host(format!("{}: {:?}", action, e))
}

/// The running browser, reached through `newtab.js`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChromeHost;

impl ChromeHost {
    pub fn new() -> Self {
        ChromeHost
    }

    /// Extension origin serving the internal favicon cache, Chromium only
    pub fn favicon_base(&self) -> Option<String> {
        faviconBase()
    }
}

impl BookmarkStore for ChromeHost {
    async fn tree(&self) -> Result<Vec<BookmarkNode>> {
        let tree = getBookmarkTree().await.map_err(|e| host_error("Failed to get bookmarks", e))?;
        from_js(tree, "bookmark tree")
    }

    async fn get_node(&self, id: &str) -> Result<Option<BookmarkNode>> {
        let node = getBookmark(id).await.map_err(|e| host_error("Failed to get bookmark", e))?;
        if node.is_null() || node.is_undefined() {
            return Ok(None);
        }
        from_js(node, "bookmark").map(Some)
    }

    async fn create_bookmark(&self, title: &str, url: &str) -> Result<BookmarkNode> {
        let node = createBookmark(title, url)
            .await
            .map_err(|e| host_error("Failed to create bookmark", e))?;
        from_js(node, "bookmark")
    }

    async fn update_bookmark(&self, id: &str, title: &str, url: &str) -> Result<BookmarkNode> {
        let node = updateBookmark(id, title, url)
            .await
            .map_err(|e| host_error("Failed to update bookmark", e))?;
        from_js(node, "bookmark")
    }

    async fn remove_bookmark(&self, id: &str) -> Result<()> {
        removeBookmark(id).await.map_err(|e| host_error("Failed to delete bookmark", e))
    }
}

impl KeyValueStore for ChromeHost {
    async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let stored = getStorage(key).await.map_err(|e| host_error("Failed to get storage", e))?;
        if stored.is_null() || stored.is_undefined() {
            return Ok(None);
        }
        from_js(stored, key).map(Some)
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        // Plain objects, not ES Maps, so storage.local can persist them
        let js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| Error::host(format!("Failed to serialize {}: {:?}", key, e)))?;
        setStorage(key, js).await.map_err(|e| host_error("Failed to save storage", e))
    }

    async fn remove_value(&self, key: &str) -> Result<()> {
        removeStorage(key).await.map_err(|e| host_error("Failed to clear storage", e))
    }
}

impl TopSites for ChromeHost {
    async fn top_sites(&self) -> Result<Vec<TopSite>> {
        let sites = getTopSites().await.map_err(|e| host_error("Failed to get top sites", e))?;
        from_js(sites, "top sites")
    }

    async fn delete_history_url(&self, url: &str) -> Result<()> {
        deleteHistoryUrl(url).await.map_err(|e| host_error("Failed to delete history", e))
    }
}

impl ImageProbe for ChromeHost {
    async fn probe(&self, url: &str) -> Result<ImageSize> {
        let size = probeImage(url).await.map_err(|e| Error::Probe {
            url: url.to_string(),
            reason: format!("{:?}", e),
        })?;
        let RawSize { width, height } = from_js(size, "image size")?;
        Ok(ImageSize { width, height })
    }
}

impl Timer for ChromeHost {
    async fn sleep(&self, duration: Duration) {
        sleep(duration.as_millis() as f64).await;
    }
}

impl FaviconFetcher for ChromeHost {
    async fn fetch(&self, url: &str) -> Result<FetchedIcon> {
        let response = fetchImage(url).await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: format!("{:?}", e),
        })?;
        let RawIcon {
            ok,
            status,
            content_type,
            body,
        } = from_js(response, "favicon response")?;
        Ok(FetchedIcon {
            ok,
            status,
            content_type,
            body,
        })
    }
}
