/// Easy Bookmarks - new tab page extension
/// Built with Rust + WASM + Yew

pub mod bookmark_data;
pub mod chrome;
pub mod config;
pub mod domain;
pub mod drag;
pub mod error;
pub mod favicon;
pub mod favicon_cache;
pub mod host;
pub mod import;
pub mod library;
pub mod operations;
pub mod session;
pub mod storage;
pub mod ui;

use log::{error, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

pub use bookmark_data::{Bookmark, BookmarkChange, BookmarkNode, Group, MostVisitedSite, Theme, TopSite};
pub use chrome::ChromeHost;
pub use config::NewTabConfig;
pub use error::{Error, Result};
pub use favicon::FaviconResolver;
pub use favicon_cache::{FaviconWarmer, WarmOutcome};
pub use host::{BookmarkStore, FaviconFetcher, ImageProbe, KeyValueStore, MemoryHost, Timer, TopSites};
pub use library::{BookmarkLibrary, DropOutcome};

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export the title fallback for JavaScript access
#[wasm_bindgen]
pub fn display_domain(url: &str) -> String {
    domain::display_domain(url)
}

// Start the Yew app for the new tab page
#[wasm_bindgen]
pub fn start_newtab() {
    yew::Renderer::<ui::newtab::NewTab>::new().render();
}

// Background worker entry points. `background.js` registers the browser
// listeners synchronously and forwards each event here once the module loads.
#[wasm_bindgen]
pub fn handle_installed() {
    spawn_local(warm_all(ChromeHost::new()));
}

#[wasm_bindgen]
pub fn handle_bookmark_created(node: JsValue) {
    let node: BookmarkNode = match chrome::from_js(node, "created bookmark") {
        Ok(node) => node,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    if let Some(bookmark) = node.to_bookmark("") {
        spawn_local(warm_created(ChromeHost::new(), bookmark));
    }
}

#[wasm_bindgen]
pub fn handle_bookmark_changed(id: String, change_info: JsValue) {
    let change: BookmarkChange = match chrome::from_js(change_info, "bookmark change") {
        Ok(change) => change,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    if change.url_changed() {
        spawn_local(warm_changed(ChromeHost::new(), id, change));
    }
}

async fn warm_all(host: ChromeHost) {
    let config = NewTabConfig::load(&host).await;
    let library = match BookmarkLibrary::load(&host).await {
        Ok(library) => library,
        Err(e) => {
            error!("Error loading bookmarks for favicon scan: {}", e);
            return;
        }
    };
    let warmer = FaviconWarmer::new(&host, &host, &config.warmer);
    if let Err(e) = warmer.refresh_all(library.bookmarks()).await {
        error!("Favicon scan failed: {}", e);
    }
}

async fn warm_created(host: ChromeHost, bookmark: Bookmark) {
    let config = NewTabConfig::load(&host).await;
    let warmer = FaviconWarmer::new(&host, &host, &config.warmer);
    if let WarmOutcome::Stored(_) = warmer.warm(&bookmark).await {
        info!("Cached favicon for {}", bookmark.url);
    }
}

async fn warm_changed(host: ChromeHost, id: String, change: BookmarkChange) {
    let config = NewTabConfig::load(&host).await;
    let warmer = FaviconWarmer::new(&host, &host, &config.warmer);
    match warmer.bookmark_changed(&host, &id, &change).await {
        Ok(WarmOutcome::Stored(_)) => info!("Re-cached favicon for bookmark {}", id),
        Ok(_) => {}
        Err(e) => error!("Error reading changed bookmark {}: {}", id, e),
    }
}
