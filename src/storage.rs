/// Storage layout for extension-local key-value storage
///
/// Groups and order records are client-side metadata over the host's
/// bookmarks. They may reference bookmarks deleted elsewhere, so every load
/// cycle cleans them against the live bookmark ids.

use std::collections::HashSet;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::bookmark_data::{DEFAULT_GROUP_NAME, Group};
use crate::error::{Error, Result};
use crate::host::KeyValueStore;
use crate::operations::{DropPosition, apply_order, move_relative};

pub const THEME_KEY: &str = "theme";
pub const BOOKMARK_ORDER_KEY: &str = "bookmarkOrder";
pub const GROUP_ORDER_KEY: &str = "groupOrder";
pub const GROUPS_KEY: &str = "bookmarkGroups";
pub const CUSTOM_NAMES_KEY: &str = "mostVisitedCustomNames";
pub const SCAN_STATUS_KEY: &str = "favicon_scan_status";
pub const SETTINGS_KEY: &str = "newtabSettings";

/// Key holding the cached data URL for one bookmark's favicon
pub fn favicon_key(bookmark_id: &str) -> String {
    format!("favicon-{}", bookmark_id)
}

/// Read and decode a JSON value; missing and null both mean `None`
pub async fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore,
{
    match store.get_value(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

pub async fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore,
{
    store.set_value(key, serde_json::to_value(value)?).await
}

/// Groups plus the two persisted order records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutData {
    pub groups: Vec<Group>,
    pub bookmark_order: Vec<String>,
    pub group_order: Vec<String>,
}

impl LayoutData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load groups and orders; groups come back sorted by the group order
    pub async fn load<S: KeyValueStore>(store: &S) -> Result<LayoutData> {
        let mut groups: Vec<Group> = load_json(store, GROUPS_KEY).await?.unwrap_or_default();
        let bookmark_order: Vec<String> = load_json(store, BOOKMARK_ORDER_KEY).await?.unwrap_or_default();
        let group_order: Vec<String> = load_json(store, GROUP_ORDER_KEY).await?.unwrap_or_default();

        apply_order(&mut groups, &group_order, |g| g.id.as_str());

        Ok(LayoutData {
            groups,
            bookmark_order,
            group_order,
        })
    }

    pub async fn save_groups<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        save_json(store, GROUPS_KEY, &self.groups).await
    }

    pub async fn save_bookmark_order<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        save_json(store, BOOKMARK_ORDER_KEY, &self.bookmark_order).await
    }

    pub async fn save_group_order<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        save_json(store, GROUP_ORDER_KEY, &self.group_order).await
    }

    pub fn get_group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// The group a bookmark belongs to, if any
    pub fn group_of(&self, bookmark_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(bookmark_id))
    }

    /// Merge two bookmarks into a new group appended after existing groups
    ///
    /// Both ids leave any group they were in first, so a bookmark never ends
    /// up in two groups.
    pub fn create_group(&mut self, first_id: &str, second_id: &str) -> Result<Group> {
        if first_id == second_id || first_id.is_empty() || second_id.is_empty() {
            return Err(Error::InvalidGroupMembers(first_id.to_string(), second_id.to_string()));
        }

        self.remove_from_group(first_id);
        self.remove_from_group(second_id);

        let group = Group {
            id: format!("group-{}", Uuid::new_v4()),
            name: DEFAULT_GROUP_NAME.to_string(),
            bookmark_ids: vec![first_id.to_string(), second_id.to_string()],
        };
        self.groups.push(group.clone());
        Ok(group)
    }

    /// Append a bookmark to a group; returns false if it was already there
    pub fn add_to_group(&mut self, group_id: &str, bookmark_id: &str) -> Result<bool> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| Error::UnknownGroup(group_id.to_string()))?;

        if group.contains(bookmark_id) {
            return Ok(false);
        }
        group.bookmark_ids.push(bookmark_id.to_string());
        Ok(true)
    }

    /// Move a bookmark into a group, leaving whatever group held it before
    pub fn move_to_group(&mut self, group_id: &str, bookmark_id: &str) -> Result<bool> {
        let target = self
            .get_group(group_id)
            .ok_or_else(|| Error::UnknownGroup(group_id.to_string()))?;
        if target.contains(bookmark_id) {
            return Ok(false);
        }

        self.remove_from_group(bookmark_id);
        self.add_to_group(group_id, bookmark_id)
    }

    /// Drop a bookmark from every group, dissolving groups left with one member
    pub fn remove_from_group(&mut self, bookmark_id: &str) -> bool {
        let mut changed = false;
        for group in &mut self.groups {
            let before = group.bookmark_ids.len();
            group.bookmark_ids.retain(|id| id != bookmark_id);
            changed |= group.bookmark_ids.len() != before;
        }
        self.dissolve_small_groups() || changed
    }

    /// Remove member ids that no longer name a live bookmark
    pub fn cleanup(&mut self, live_ids: &HashSet<&str>) -> bool {
        let mut changed = false;
        for group in &mut self.groups {
            let before = group.bookmark_ids.len();
            group.bookmark_ids.retain(|id| live_ids.contains(id.as_str()));
            changed |= group.bookmark_ids.len() != before;
        }
        self.dissolve_small_groups() || changed
    }

    /// Delete every group with fewer than two members
    pub fn dissolve_small_groups(&mut self) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| {
            let keep = g.bookmark_ids.len() >= 2;
            if !keep {
                debug!("Dissolving group {} ({} members left)", g.id, g.bookmark_ids.len());
            }
            keep
        });
        self.groups.len() != before
    }

    /// Rename a group; blank names are ignored
    pub fn rename_group(&mut self, group_id: &str, new_name: &str) -> bool {
        let name = new_name.trim();
        if name.is_empty() {
            return false;
        }
        self.groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .map(|group| {
                group.name = name.to_string();
            })
            .is_some()
    }

    /// Delete a group record; its bookmarks become ungrouped
    pub fn remove_group(&mut self, group_id: &str) -> Option<Group> {
        let index = self.groups.iter().position(|g| g.id == group_id)?;
        Some(self.groups.remove(index))
    }

    /// Move a group before or after another and refresh the group order
    pub fn reorder_groups(&mut self, dragged_id: &str, target_id: &str, position: DropPosition) -> bool {
        let mut ids: Vec<String> = self.groups.iter().map(|g| g.id.clone()).collect();
        if !move_relative(&mut ids, dragged_id, target_id, position) {
            return false;
        }
        apply_order(&mut self.groups, &ids, |g| g.id.as_str());
        self.group_order = ids;
        true
    }

    /// Snapshot the current group sequence as the stored group order
    pub fn capture_group_order(&mut self) {
        self.group_order = self.groups.iter().map(|g| g.id.clone()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use futures::executor::block_on;
    use serde_json::json;

    fn create_test_group(id: &str, members: &[&str]) -> Group {
        Group {
            id: id.to_string(),
            name: format!("Group {}", id),
            bookmark_ids: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn layout_with(groups: Vec<Group>) -> LayoutData {
        LayoutData {
            groups,
            ..LayoutData::new()
        }
    }

    #[test]
    fn test_favicon_key() {
        assert_eq!(favicon_key("42"), "favicon-42");
    }

    #[test]
    fn test_create_group() {
        let mut layout = LayoutData::new();

        let group = layout.create_group("b", "a").unwrap();

        assert_eq!(group.name, "New Group");
        assert_eq!(group.bookmark_ids, vec!["b".to_string(), "a".to_string()]);
        assert!(group.id.starts_with("group-"));
        assert_eq!(layout.groups, vec![group]);
    }

    #[test]
    fn test_create_group_rejects_same_item() {
        let mut layout = LayoutData::new();

        let result = layout.create_group("a", "a");

        assert!(matches!(result, Err(Error::InvalidGroupMembers(_, _))));
        assert!(layout.groups.is_empty());
    }

    #[test]
    fn test_create_group_pulls_members_out_of_old_groups() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b", "c"])]);

        let group = layout.create_group("c", "d").unwrap();

        assert_eq!(layout.groups.len(), 2);
        assert!(!layout.groups[0].contains("c"));
        assert_eq!(layout.group_of("c").map(|g| g.id.as_str()), Some(group.id.as_str()));
    }

    #[test]
    fn test_add_to_group() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);

        assert!(layout.add_to_group("g1", "c").unwrap());
        assert!(!layout.add_to_group("g1", "c").unwrap());
        assert_eq!(layout.groups[0].bookmark_ids.len(), 3);
        assert!(matches!(layout.add_to_group("nope", "c"), Err(Error::UnknownGroup(_))));
    }

    #[test]
    fn test_move_to_group_leaves_previous_group() {
        let mut layout = layout_with(vec![
            create_test_group("g1", &["a", "b", "c"]),
            create_test_group("g2", &["x", "y"]),
        ]);

        assert!(layout.move_to_group("g2", "c").unwrap());

        assert_eq!(layout.groups[0].bookmark_ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(layout.groups[1].bookmark_ids, vec!["x".to_string(), "y".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_move_to_group_dissolves_pair_it_leaves() {
        let mut layout = layout_with(vec![
            create_test_group("g1", &["a", "b"]),
            create_test_group("g2", &["x", "y"]),
        ]);

        layout.move_to_group("g2", "a").unwrap();

        assert_eq!(layout.groups.len(), 1);
        assert_eq!(layout.groups[0].id, "g2");
        assert!(layout.group_of("b").is_none());
    }

    #[test]
    fn test_remove_from_group_dissolves_pair() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);

        assert!(layout.remove_from_group("a"));

        assert!(layout.groups.is_empty());
        assert!(layout.group_of("b").is_none());
    }

    #[test]
    fn test_remove_from_group_unknown_is_noop() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);

        assert!(!layout.remove_from_group("zzz"));
        assert_eq!(layout.groups.len(), 1);
    }

    #[test]
    fn test_cleanup_drops_dangling_ids() {
        let mut layout = layout_with(vec![
            create_test_group("g1", &["a", "gone", "b"]),
            create_test_group("g2", &["c", "gone-too"]),
        ]);
        let live: HashSet<&str> = ["a", "b", "c"].into_iter().collect();

        assert!(layout.cleanup(&live));

        assert_eq!(layout.groups.len(), 1);
        assert_eq!(layout.groups[0].bookmark_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_cleanup_reports_no_change() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);
        let live: HashSet<&str> = ["a", "b"].into_iter().collect();

        assert!(!layout.cleanup(&live));
    }

    #[test]
    fn test_rename_group() {
        let mut layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);

        assert!(layout.rename_group("g1", "  Reading  "));
        assert_eq!(layout.groups[0].name, "Reading");
        assert!(!layout.rename_group("g1", "   "));
        assert!(!layout.rename_group("missing", "Name"));
    }

    #[test]
    fn test_reorder_groups() {
        let mut layout = layout_with(vec![
            create_test_group("g1", &["a", "b"]),
            create_test_group("g2", &["c", "d"]),
            create_test_group("g3", &["e", "f"]),
        ]);

        assert!(layout.reorder_groups("g3", "g1", DropPosition::Before));

        let ids: Vec<&str> = layout.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g3", "g1", "g2"]);
        assert_eq!(layout.group_order, vec!["g3".to_string(), "g1".to_string(), "g2".to_string()]);
    }

    #[test]
    fn test_load_applies_group_order() {
        let host = MemoryHost::new();
        host.put_value(
            GROUPS_KEY,
            json!([
                {"id": "g1", "name": "One", "bookmarkIds": ["a", "b"]},
                {"id": "g2", "name": "Two", "bookmarkIds": ["c", "d"]},
                {"id": "g3", "name": "Three", "bookmarkIds": ["e", "f"]}
            ]),
        );
        host.put_value(GROUP_ORDER_KEY, json!(["g2"]));

        let layout = block_on(LayoutData::load(&host)).unwrap();

        let ids: Vec<&str> = layout.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g2", "g1", "g3"]);
    }

    #[test]
    fn test_load_empty_store() {
        let host = MemoryHost::new();

        let layout = block_on(LayoutData::load(&host)).unwrap();

        assert_eq!(layout, LayoutData::new());
    }

    #[test]
    fn test_save_groups_round_trips_through_store() {
        let host = MemoryHost::new();
        let layout = layout_with(vec![create_test_group("g1", &["a", "b"])]);

        block_on(layout.save_groups(&host)).unwrap();

        assert_eq!(host.value(GROUPS_KEY).unwrap()[0]["bookmarkIds"], json!(["a", "b"]));
    }
}
