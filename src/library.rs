/// The bookmark library: live bookmarks from the host plus the locally
/// stored groups and orders, and every command the page can issue on them
///
/// Commands mutate the in-memory library first and then persist what they
/// changed. Host failures are returned to the caller, which logs them and
/// keeps its previous state for that item.

use std::collections::{HashMap, HashSet};

use log::{error, info};
use serde_json::Value;

use crate::bookmark_data::{Bookmark, Group, MostVisitedSite, Theme, flatten_tree};
use crate::domain::display_domain;
use crate::drag::DropIntent;
use crate::error::{Error, Result};
use crate::host::{BookmarkStore, KeyValueStore, TopSites};
use crate::import::{import_summary, parse_bookmark_html};
use crate::operations::{
    DisplayItem, DropPosition, apply_order, build_display_list, filter_bookmarks, move_relative, order_bookmarks,
};
use crate::storage::{CUSTOM_NAMES_KEY, LayoutData, THEME_KEY, load_json, save_json};

/// What a committed drop changed
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Unchanged,
    Changed,
    /// Two bookmarks were merged; the page offers to name the new group
    GroupCreated(Group),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkLibrary {
    bookmarks: Vec<Bookmark>,
    layout: LayoutData,
}

impl BookmarkLibrary {
    pub fn new(bookmarks: Vec<Bookmark>, layout: LayoutData) -> Self {
        BookmarkLibrary { bookmarks, layout }
    }

    /// One load cycle: read the tree, order it, load groups and drop
    /// references to bookmarks that no longer exist
    pub async fn load<H: BookmarkStore + KeyValueStore>(host: &H) -> Result<BookmarkLibrary> {
        let tree = host.tree().await?;
        let mut layout = LayoutData::load(host).await?;
        let bookmarks = order_bookmarks(&flatten_tree(&tree), &layout.bookmark_order);

        let live: HashSet<&str> = bookmarks.iter().map(|b| b.id.as_str()).collect();
        if layout.cleanup(&live) {
            layout.save_groups(host).await?;
        }

        info!("Loaded {} bookmarks and {} groups", bookmarks.len(), layout.groups.len());
        Ok(BookmarkLibrary { bookmarks, layout })
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn groups(&self) -> &[Group] {
        &self.layout.groups
    }

    pub fn layout(&self) -> &LayoutData {
        &self.layout
    }

    pub fn get_bookmark(&self, bookmark_id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == bookmark_id)
    }

    pub fn get_group(&self, group_id: &str) -> Option<&Group> {
        self.layout.get_group(group_id)
    }

    pub fn is_grouped(&self, bookmark_id: &str) -> bool {
        self.layout.group_of(bookmark_id).is_some()
    }

    /// Groups, then ungrouped bookmarks
    pub fn display_items(&self) -> Vec<DisplayItem> {
        build_display_list(&self.bookmarks, &self.layout.groups)
    }

    /// Bookmarks that belong to no group, in display order
    pub fn ungrouped(&self) -> Vec<Bookmark> {
        self.display_items()
            .into_iter()
            .filter_map(|item| match item {
                DisplayItem::Bookmark(bookmark) => Some(bookmark),
                DisplayItem::Group(_) => None,
            })
            .collect()
    }

    /// A group's bookmarks in membership order
    pub fn group_members(&self, group_id: &str) -> Vec<Bookmark> {
        self.get_group(group_id)
            .map(|group| {
                group
                    .bookmark_ids
                    .iter()
                    .filter_map(|id| self.get_bookmark(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flat list of matching bookmarks; groups are not shown while searching
    pub fn search(&self, query: &str) -> Vec<Bookmark> {
        filter_bookmarks(&self.bookmarks, query)
    }

    pub async fn create_bookmark<S: BookmarkStore>(&mut self, store: &S, url: &str, title: &str) -> Result<Bookmark> {
        let title = if title.trim().is_empty() {
            display_domain(url)
        } else {
            title.trim().to_string()
        };
        let node = store.create_bookmark(&title, url).await?;
        let bookmark = Bookmark::new(&node.id, &title, url, "");
        self.bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    pub async fn update_bookmark<S: BookmarkStore>(&mut self, store: &S, bookmark_id: &str, title: &str, url: &str) -> Result<()> {
        store.update_bookmark(bookmark_id, title, url).await?;
        if let Some(bookmark) = self.bookmarks.iter_mut().find(|b| b.id == bookmark_id) {
            bookmark.title = title.to_string();
            bookmark.url = url.to_string();
        }
        Ok(())
    }

    /// Delete from the host, then forget the bookmark locally and in groups
    pub async fn delete_bookmark<H: BookmarkStore + KeyValueStore>(&mut self, host: &H, bookmark_id: &str) -> Result<()> {
        host.remove_bookmark(bookmark_id).await?;
        self.forget_bookmark(bookmark_id);
        if self.layout.remove_from_group(bookmark_id) {
            self.layout.save_groups(host).await?;
        }
        Ok(())
    }

    /// Delete several bookmarks; failures are logged and skipped
    ///
    /// Returns how many were deleted. Callers reload afterwards.
    pub async fn delete_bookmarks<S: BookmarkStore>(store: &S, bookmark_ids: &[String]) -> usize {
        let mut deleted = 0;
        for id in bookmark_ids {
            match store.remove_bookmark(id).await {
                Ok(()) => deleted += 1,
                Err(e) => error!("Error deleting bookmark {}: {}", id, e),
            }
        }
        deleted
    }

    /// Merge two distinct bookmarks into a new group
    pub async fn create_group<S: KeyValueStore>(&mut self, store: &S, first_id: &str, second_id: &str) -> Result<Group> {
        for id in [first_id, second_id] {
            if self.get_bookmark(id).is_none() {
                return Err(Error::UnknownBookmark(id.to_string()));
            }
        }
        let group = self.layout.create_group(first_id, second_id)?;
        self.layout.save_groups(store).await?;
        Ok(group)
    }

    pub async fn add_to_group<S: KeyValueStore>(&mut self, store: &S, group_id: &str, bookmark_id: &str) -> Result<bool> {
        let added = self.layout.add_to_group(group_id, bookmark_id)?;
        if added {
            self.layout.save_groups(store).await?;
        }
        Ok(added)
    }

    /// Move a bookmark into a group, out of any group it was in
    pub async fn move_to_group<S: KeyValueStore>(&mut self, store: &S, group_id: &str, bookmark_id: &str) -> Result<bool> {
        if self.get_bookmark(bookmark_id).is_none() {
            return Err(Error::UnknownBookmark(bookmark_id.to_string()));
        }
        let moved = self.layout.move_to_group(group_id, bookmark_id)?;
        if moved {
            self.layout.save_groups(store).await?;
        }
        Ok(moved)
    }

    pub async fn remove_from_group<S: KeyValueStore>(&mut self, store: &S, bookmark_id: &str) -> Result<bool> {
        let changed = self.layout.remove_from_group(bookmark_id);
        if changed {
            self.layout.save_groups(store).await?;
        }
        Ok(changed)
    }

    pub async fn rename_group<S: KeyValueStore>(&mut self, store: &S, group_id: &str, name: &str) -> Result<bool> {
        let renamed = self.layout.rename_group(group_id, name);
        if renamed {
            self.layout.save_groups(store).await?;
        }
        Ok(renamed)
    }

    /// Dissolve a group, keeping its bookmarks
    pub async fn ungroup<S: KeyValueStore>(&mut self, store: &S, group_id: &str) -> Result<bool> {
        if self.layout.remove_group(group_id).is_none() {
            return Ok(false);
        }
        self.layout.save_groups(store).await?;
        Ok(true)
    }

    /// Delete a group, optionally deleting its bookmarks from the host too
    pub async fn delete_group<H: BookmarkStore + KeyValueStore>(
        &mut self,
        host: &H,
        group_id: &str,
        with_bookmarks: bool,
    ) -> Result<bool> {
        let Some(group) = self.layout.remove_group(group_id) else {
            return Ok(false);
        };

        if with_bookmarks {
            for id in &group.bookmark_ids {
                match host.remove_bookmark(id).await {
                    Ok(()) => self.forget_bookmark(id),
                    Err(e) => error!("Error deleting bookmark {}: {}", id, e),
                }
            }
        }

        self.layout.save_groups(host).await?;
        Ok(true)
    }

    /// Move a bookmark before or after another and persist the full order
    pub async fn reorder_bookmarks<S: KeyValueStore>(
        &mut self,
        store: &S,
        dragged_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> Result<bool> {
        let mut ids: Vec<String> = self.bookmarks.iter().map(|b| b.id.clone()).collect();
        if !move_relative(&mut ids, dragged_id, target_id, position) {
            return Ok(false);
        }
        apply_order(&mut self.bookmarks, &ids, |b| b.id.as_str());
        self.layout.bookmark_order = ids;
        self.layout.save_bookmark_order(store).await?;
        Ok(true)
    }

    /// Move a group before or after another and persist groups and group order
    pub async fn reorder_groups<S: KeyValueStore>(
        &mut self,
        store: &S,
        dragged_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> Result<bool> {
        if !self.layout.reorder_groups(dragged_id, target_id, position) {
            return Ok(false);
        }
        self.layout.save_groups(store).await?;
        self.layout.save_group_order(store).await?;
        Ok(true)
    }

    /// Persist the current bookmark and group sequences (leaving edit mode)
    pub async fn save_orders<S: KeyValueStore>(&mut self, store: &S) -> Result<()> {
        self.layout.bookmark_order = self.bookmarks.iter().map(|b| b.id.clone()).collect();
        self.layout.capture_group_order();
        self.layout.save_bookmark_order(store).await?;
        self.layout.save_group_order(store).await
    }

    /// Carry out a completed drag gesture
    pub async fn apply_drop<S: KeyValueStore>(&mut self, store: &S, intent: DropIntent) -> Result<DropOutcome> {
        let changed = match intent {
            DropIntent::CreateGroup { target_id, dragged_id } => {
                let group = self.create_group(store, &target_id, &dragged_id).await?;
                return Ok(DropOutcome::GroupCreated(group));
            }
            DropIntent::AddToGroup { group_id, bookmark_id } => self.move_to_group(store, &group_id, &bookmark_id).await?,
            DropIntent::ReorderBookmarks {
                target_id,
                dragged_id,
                position,
            } => self.reorder_bookmarks(store, &dragged_id, &target_id, position).await?,
            DropIntent::ReorderGroups {
                target_id,
                dragged_id,
                position,
            } => self.reorder_groups(store, &dragged_id, &target_id, position).await?,
        };
        Ok(if changed { DropOutcome::Changed } else { DropOutcome::Unchanged })
    }

    fn forget_bookmark(&mut self, bookmark_id: &str) {
        self.bookmarks.retain(|b| b.id != bookmark_id);
    }
}

/// Result of importing an HTML bookmark file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub found: usize,
    pub added: usize,
}

impl ImportReport {
    pub fn message(&self) -> String {
        import_summary(self.added)
    }
}

/// Create a bookmark for every http(s) anchor in an HTML document
pub async fn import_html<S: BookmarkStore>(store: &S, html: &str) -> Result<ImportReport> {
    let links = parse_bookmark_html(html);
    if links.is_empty() {
        return Err(Error::Import("No valid bookmarks found in the file".to_string()));
    }

    let mut added = 0;
    for link in &links {
        let title = if link.title.is_empty() {
            display_domain(&link.url)
        } else {
            link.title.clone()
        };
        match store.create_bookmark(&title, &link.url).await {
            Ok(_) => added += 1,
            Err(e) => error!("Failed to add bookmark {}: {}", link.url, e),
        }
    }

    info!("Imported {} of {} bookmarks", added, links.len());
    Ok(ImportReport {
        found: links.len(),
        added,
    })
}

async fn load_custom_names<S: KeyValueStore>(store: &S) -> Result<HashMap<String, String>> {
    Ok(load_json(store, CUSTOM_NAMES_KEY).await?.unwrap_or_default())
}

/// The host's top sites with any custom names applied
pub async fn load_most_visited<H: TopSites + KeyValueStore>(host: &H, limit: usize) -> Result<Vec<MostVisitedSite>> {
    let sites = host.top_sites().await?;
    let names = load_custom_names(host).await?;

    Ok(sites
        .into_iter()
        .take(limit)
        .map(|site| {
            let title = names
                .get(&site.url)
                .filter(|name| !name.is_empty())
                .cloned()
                .or_else(|| Some(site.title.clone()).filter(|t| !t.is_empty()))
                .unwrap_or_else(|| display_domain(&site.url));
            MostVisitedSite {
                title,
                original_title: site.title,
                url: site.url,
            }
        })
        .collect())
}

pub async fn rename_most_visited<S: KeyValueStore>(store: &S, url: &str, name: &str) -> Result<()> {
    let mut names = load_custom_names(store).await?;
    names.insert(url.to_string(), name.to_string());
    save_json(store, CUSTOM_NAMES_KEY, &names).await
}

/// Drop a site from the most-visited list by deleting its history
pub async fn remove_most_visited<H: TopSites + KeyValueStore>(host: &H, url: &str) -> Result<()> {
    host.delete_history_url(url).await?;
    let mut names = load_custom_names(host).await?;
    if names.remove(url).is_some() {
        save_json(host, CUSTOM_NAMES_KEY, &names).await?;
    }
    Ok(())
}

pub async fn load_theme<S: KeyValueStore>(store: &S) -> Result<Theme> {
    let stored: Option<Value> = store.get_value(THEME_KEY).await?;
    Ok(Theme::from_stored(stored.as_ref().and_then(Value::as_str)))
}

pub async fn save_theme<S: KeyValueStore>(store: &S, theme: Theme) -> Result<()> {
    store.set_value(THEME_KEY, Value::String(theme.as_str().to_string())).await
}
