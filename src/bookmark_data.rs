/// Data structures for Easy Bookmarks
use serde::{Deserialize, Serialize};

use crate::domain::{display_domain, is_web_url};

/// Default name given to a freshly merged group
pub const DEFAULT_GROUP_NAME: &str = "New Group";

/// A node of the host bookmark tree
///
/// Folders carry `children`; leaves carry `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkNode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    pub fn leaf(id: &str, title: &str, url: &str) -> BookmarkNode {
        BookmarkNode {
            id: id.to_string(),
            title: title.to_string(),
            url: Some(url.to_string()),
            children: None,
        }
    }

    pub fn folder(id: &str, title: &str, children: Vec<BookmarkNode>) -> BookmarkNode {
        BookmarkNode {
            id: id.to_string(),
            title: title.to_string(),
            url: None,
            children: Some(children),
        }
    }

    /// Convert a leaf into a tile bookmark, if its URL is a web page
    pub fn to_bookmark(&self, folder: &str) -> Option<Bookmark> {
        let url = self.url.as_deref().filter(|url| is_web_url(url))?;
        Some(Bookmark::new(&self.id, &self.title, url, folder))
    }
}

/// A bookmark as shown on the new tab page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub folder: String,
}

impl Bookmark {
    /// Build a bookmark; an empty title falls back to the URL's domain
    pub fn new(id: &str, title: &str, url: &str, folder: &str) -> Bookmark {
        let title = if title.is_empty() {
            display_domain(url)
        } else {
            title.to_string()
        };
        Bookmark {
            id: id.to_string(),
            title,
            url: url.to_string(),
            folder: folder.to_string(),
        }
    }
}

/// A user-defined cluster of two or more bookmarks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    pub bookmark_ids: Vec<String>,
}

impl Group {
    pub fn contains(&self, bookmark_id: &str) -> bool {
        self.bookmark_ids.iter().any(|id| id == bookmark_id)
    }
}

/// Fields reported by the host's bookmark-changed event
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookmarkChange {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BookmarkChange {
    pub fn url_changed(&self) -> bool {
        self.url.is_some()
    }
}

/// An entry returned by the host's most-visited API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopSite {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// A most-visited site ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct MostVisitedSite {
    pub url: String,
    /// Custom name if the user set one, else the host title, else the domain
    pub title: String,
    pub original_title: String,
}

/// Colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Anything other than "light" is dark
    pub fn from_stored(value: Option<&str>) -> Theme {
        match value {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }
}

/// Flatten the host tree into web bookmarks, annotated with their folder name
///
/// The host returns a single root whose children are the top-level folders
/// ("Bookmarks bar", "Other bookmarks", ...). Each folder's title becomes the
/// `folder` of its direct bookmark children.
pub fn flatten_tree(tree: &[BookmarkNode]) -> Vec<Bookmark> {
    let mut bookmarks = Vec::new();
    let top_level: &[BookmarkNode] = match tree.first().and_then(|root| root.children.as_deref()) {
        Some(children) => children,
        None => tree,
    };
    collect_bookmarks(top_level, "", &mut bookmarks);
    bookmarks
}

fn collect_bookmarks(nodes: &[BookmarkNode], folder: &str, out: &mut Vec<Bookmark>) {
    for node in nodes {
        if let Some(children) = &node.children {
            collect_bookmarks(children, &node.title, out);
        } else if let Some(bookmark) = node.to_bookmark(folder) {
            out.push(bookmark);
        }
    }
}
