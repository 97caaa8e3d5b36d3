/// Platform capabilities consumed by the new tab page
///
/// Browsers differ only in how these are reached (`chrome.*` vs `browser.*`),
/// so the rest of the crate is written against these traits and each host
/// gets a small adapter. `MemoryHost` is the in-process adapter used by tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::Value;

use crate::bookmark_data::{BookmarkNode, TopSite};
use crate::error::{Error, Result};

/// Folder that receives bookmarks created without an explicit parent
pub const DEFAULT_FOLDER_TITLE: &str = "Bookmarks bar";

/// The host's persistent bookmark tree
#[allow(async_fn_in_trait)]
pub trait BookmarkStore {
    async fn tree(&self) -> Result<Vec<BookmarkNode>>;
    async fn get_node(&self, id: &str) -> Result<Option<BookmarkNode>>;
    async fn create_bookmark(&self, title: &str, url: &str) -> Result<BookmarkNode>;
    async fn update_bookmark(&self, id: &str, title: &str, url: &str) -> Result<BookmarkNode>;
    async fn remove_bookmark(&self, id: &str) -> Result<()>;
}

/// The host's extension-local key-value storage
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get_value(&self, key: &str) -> Result<Option<Value>>;
    async fn set_value(&self, key: &str, value: Value) -> Result<()>;
    async fn remove_value(&self, key: &str) -> Result<()>;
}

/// The host's ranked most-visited list
#[allow(async_fn_in_trait)]
pub trait TopSites {
    async fn top_sites(&self) -> Result<Vec<TopSite>>;
    /// There is no native removal; forgetting the URL's history drops it.
    async fn delete_history_url(&self, url: &str) -> Result<()>;
}

/// Decoded dimensions of a probed image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Loads a URL as an image and reports its decoded size
#[allow(async_fn_in_trait)]
pub trait ImageProbe {
    async fn probe(&self, url: &str) -> Result<ImageSize>;
}

#[allow(async_fn_in_trait)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Raw response of a favicon service request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedIcon {
    pub ok: bool,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Plain HTTP GET for favicon bytes
#[allow(async_fn_in_trait)]
pub trait FaviconFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedIcon>;
}

/// In-memory host: a one-folder bookmark tree, a JSON map and a fixed
/// most-visited list
#[derive(Debug)]
pub struct MemoryHost {
    root: RefCell<BookmarkNode>,
    values: RefCell<HashMap<String, Value>>,
    top_sites: RefCell<Vec<TopSite>>,
    forgotten: RefCell<Vec<String>>,
    rejected_urls: RefCell<HashSet<String>>,
    next_id: Cell<u32>,
}

impl MemoryHost {
    pub fn new() -> Self {
        let bar = BookmarkNode::folder("1", DEFAULT_FOLDER_TITLE, Vec::new());
        MemoryHost {
            root: RefCell::new(BookmarkNode::folder("0", "", vec![bar])),
            values: RefCell::new(HashMap::new()),
            top_sites: RefCell::new(Vec::new()),
            forgotten: RefCell::new(Vec::new()),
            rejected_urls: RefCell::new(HashSet::new()),
            next_id: Cell::new(100),
        }
    }

    /// Add a bookmark synchronously, returning its id
    pub fn insert_bookmark(&self, title: &str, url: &str) -> String {
        let id = self.allocate_id();
        let node = BookmarkNode::leaf(&id, title, url);
        let mut root = self.root.borrow_mut();
        if let Some(bar) = root.children.as_mut().and_then(|c| c.first_mut()) {
            bar.children.get_or_insert_with(Vec::new).push(node);
        }
        id
    }

    /// Add a bookmark inside a new sub-folder of the bookmarks bar
    pub fn insert_in_folder(&self, folder: &str, title: &str, url: &str) -> String {
        let id = self.allocate_id();
        let folder_id = self.allocate_id();
        let node = BookmarkNode::folder(&folder_id, folder, vec![BookmarkNode::leaf(&id, title, url)]);
        let mut root = self.root.borrow_mut();
        if let Some(bar) = root.children.as_mut().and_then(|c| c.first_mut()) {
            bar.children.get_or_insert_with(Vec::new).push(node);
        }
        id
    }

    /// Remove a bookmark behind the page's back, as another window would
    pub fn drop_bookmark(&self, id: &str) -> bool {
        remove_node(&mut self.root.borrow_mut(), id)
    }

    pub fn set_top_sites(&self, sites: Vec<TopSite>) {
        *self.top_sites.borrow_mut() = sites;
    }

    /// Make `create_bookmark` fail for this URL
    pub fn reject_url(&self, url: &str) {
        self.rejected_urls.borrow_mut().insert(url.to_string());
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn put_value(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn forgotten_urls(&self) -> Vec<String> {
        self.forgotten.borrow().clone()
    }

    fn allocate_id(&self) -> String {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id.to_string()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

fn find_node<'a>(node: &'a BookmarkNode, id: &str) -> Option<&'a BookmarkNode> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .as_ref()?
        .iter()
        .find_map(|child| find_node(child, id))
}

fn find_node_mut<'a>(node: &'a mut BookmarkNode, id: &str) -> Option<&'a mut BookmarkNode> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .as_mut()?
        .iter_mut()
        .find_map(|child| find_node_mut(child, id))
}

fn remove_node(node: &mut BookmarkNode, id: &str) -> bool {
    let Some(children) = node.children.as_mut() else {
        return false;
    };
    let before = children.len();
    children.retain(|child| child.id != id);
    if children.len() < before {
        return true;
    }
    children.iter_mut().any(|child| remove_node(child, id))
}

impl BookmarkStore for MemoryHost {
    async fn tree(&self) -> Result<Vec<BookmarkNode>> {
        Ok(vec![self.root.borrow().clone()])
    }

    async fn get_node(&self, id: &str) -> Result<Option<BookmarkNode>> {
        Ok(find_node(&self.root.borrow(), id).cloned())
    }

    async fn create_bookmark(&self, title: &str, url: &str) -> Result<BookmarkNode> {
        if self.rejected_urls.borrow().contains(url) {
            return Err(Error::host(format!("Invalid URL: {}", url)));
        }
        let id = self.insert_bookmark(title, url);
        Ok(BookmarkNode::leaf(&id, title, url))
    }

    async fn update_bookmark(&self, id: &str, title: &str, url: &str) -> Result<BookmarkNode> {
        let mut root = self.root.borrow_mut();
        let node = find_node_mut(&mut root, id)
            .filter(|node| node.url.is_some())
            .ok_or_else(|| Error::host(format!("Can't find bookmark for id {}", id)))?;
        node.title = title.to_string();
        node.url = Some(url.to_string());
        Ok(node.clone())
    }

    async fn remove_bookmark(&self, id: &str) -> Result<()> {
        if remove_node(&mut self.root.borrow_mut(), id) {
            Ok(())
        } else {
            Err(Error::host(format!("Can't find bookmark for id {}", id)))
        }
    }
}

impl KeyValueStore for MemoryHost {
    async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.value(key))
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.put_value(key, value);
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

impl TopSites for MemoryHost {
    async fn top_sites(&self) -> Result<Vec<TopSite>> {
        let forgotten = self.forgotten.borrow();
        Ok(self
            .top_sites
            .borrow()
            .iter()
            .filter(|site| !forgotten.contains(&site.url))
            .cloned()
            .collect())
    }

    async fn delete_history_url(&self, url: &str) -> Result<()> {
        self.forgotten.borrow_mut().push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_memory_host_create_update_remove() {
        let host = MemoryHost::new();

        let created = block_on(host.create_bookmark("Rust", "https://rust-lang.org")).unwrap();
        let updated = block_on(host.update_bookmark(&created.id, "Rust!", "https://www.rust-lang.org")).unwrap();

        assert_eq!(updated.title, "Rust!");
        assert_eq!(block_on(host.get_node(&created.id)).unwrap(), Some(updated));

        block_on(host.remove_bookmark(&created.id)).unwrap();
        assert_eq!(block_on(host.get_node(&created.id)).unwrap(), None);
        assert!(block_on(host.remove_bookmark(&created.id)).is_err());
    }

    #[test]
    fn test_memory_host_rejects_configured_url() {
        let host = MemoryHost::new();
        host.reject_url("https://bad.example");

        let result = block_on(host.create_bookmark("Bad", "https://bad.example"));

        assert!(matches!(result, Err(Error::Host(_))));
    }

    #[test]
    fn test_memory_host_forgets_top_sites() {
        let host = MemoryHost::new();
        host.set_top_sites(vec![
            TopSite { url: "https://a.example".to_string(), title: "A".to_string() },
            TopSite { url: "https://b.example".to_string(), title: "B".to_string() },
        ]);

        block_on(host.delete_history_url("https://a.example")).unwrap();
        let sites = block_on(host.top_sites()).unwrap();

        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url, "https://b.example");
    }
}
