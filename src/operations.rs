/// Ordering and display-list operations over bookmarks and groups

use std::collections::{HashMap, HashSet};

use crate::bookmark_data::{Bookmark, Group};

/// Where a dragged item lands relative to its drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

/// One tile of the default (unfiltered) view
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem {
    Group(Group),
    Bookmark(Bookmark),
}

impl DisplayItem {
    pub fn id(&self) -> &str {
        match self {
            DisplayItem::Group(group) => &group.id,
            DisplayItem::Bookmark(bookmark) => &bookmark.id,
        }
    }
}

/// Stable-sort items by their position in a stored order
///
/// Ids missing from `order` sort after every ranked id and keep their
/// relative input order.
pub fn apply_order<T, F>(items: &mut [T], order: &[String], id_of: F)
where
    F: Fn(&T) -> &str,
{
    if order.is_empty() {
        return;
    }

    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    // sort_by_key is stable, so unranked items stay in enumeration order
    items.sort_by_key(|item| rank.get(id_of(item)).copied().unwrap_or(usize::MAX));
}

/// Sort bookmarks by a stored bookmark order
pub fn order_bookmarks(bookmarks: &[Bookmark], order: &[String]) -> Vec<Bookmark> {
    let mut ordered = bookmarks.to_vec();
    apply_order(&mut ordered, order, |b| b.id.as_str());
    ordered
}

/// Every bookmark id that belongs to some group
pub fn grouped_ids(groups: &[Group]) -> HashSet<&str> {
    groups
        .iter()
        .flat_map(|group| group.bookmark_ids.iter().map(String::as_str))
        .collect()
}

/// Groups first, then the bookmarks that belong to no group
pub fn build_display_list(bookmarks: &[Bookmark], groups: &[Group]) -> Vec<DisplayItem> {
    let grouped = grouped_ids(groups);

    groups
        .iter()
        .cloned()
        .map(DisplayItem::Group)
        .chain(
            bookmarks
                .iter()
                .filter(|bookmark| !grouped.contains(bookmark.id.as_str()))
                .cloned()
                .map(DisplayItem::Bookmark),
        )
        .collect()
}

/// Case-insensitive substring match on title or URL
pub fn filter_bookmarks(bookmarks: &[Bookmark], query: &str) -> Vec<Bookmark> {
    let needle = query.to_lowercase();
    bookmarks
        .iter()
        .filter(|bookmark| {
            bookmark.title.to_lowercase().contains(&needle)
                || bookmark.url.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Move `dragged` so it sits immediately before or after `target`
///
/// Returns false (and leaves `ids` untouched) when either id is missing or
/// both are the same.
pub fn move_relative(ids: &mut Vec<String>, dragged: &str, target: &str, position: DropPosition) -> bool {
    if dragged == target {
        return false;
    }
    let Some(from) = ids.iter().position(|id| id == dragged) else {
        return false;
    };
    if !ids.iter().any(|id| id == target) {
        return false;
    }

    let moved = ids.remove(from);
    // Target index shifts once the dragged id is out of the sequence
    let Some(target_index) = ids.iter().position(|id| id == target) else {
        return false;
    };
    let insert_at = match position {
        DropPosition::Before => target_index,
        DropPosition::After => target_index + 1,
    };
    ids.insert(insert_at, moved);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bm(id: &str) -> Bookmark {
        Bookmark::new(id, &format!("Title {}", id), &format!("https://{}.example.com", id), "")
    }

    fn group(id: &str, members: &[&str]) -> Group {
        Group {
            id: id.to_string(),
            name: "Group".to_string(),
            bookmark_ids: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn ids(bookmarks: &[Bookmark]) -> Vec<&str> {
        bookmarks.iter().map(|b| b.id.as_str()).collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_apply_order_ranked_then_unranked() {
        let bookmarks = vec![bm("id1"), bm("id2"), bm("id3")];

        let ordered = order_bookmarks(&bookmarks, &strings(&["id3", "id1"]));

        assert_eq!(ids(&ordered), vec!["id3", "id1", "id2"]);
    }

    #[test]
    fn test_apply_order_is_stable_for_unranked() {
        let bookmarks = vec![bm("a"), bm("b"), bm("c"), bm("d"), bm("e")];

        let ordered = order_bookmarks(&bookmarks, &strings(&["d", "b"]));

        assert_eq!(ids(&ordered), vec!["d", "b", "a", "c", "e"]);
    }

    #[test]
    fn test_apply_order_ignores_stale_ids() {
        let bookmarks = vec![bm("a"), bm("b")];

        let ordered = order_bookmarks(&bookmarks, &strings(&["gone", "b", "also-gone"]));

        assert_eq!(ids(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_apply_order_empty_order_keeps_input() {
        let bookmarks = vec![bm("c"), bm("a"), bm("b")];

        let ordered = order_bookmarks(&bookmarks, &[]);

        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_build_display_list_groups_first() {
        let bookmarks = vec![bm("1"), bm("2"), bm("3"), bm("4")];
        let groups = vec![group("g1", &["2", "4"])];

        let items = build_display_list(&bookmarks, &groups);
        let item_ids: Vec<&str> = items.iter().map(DisplayItem::id).collect();

        assert_eq!(item_ids, vec!["g1", "1", "3"]);
        assert!(matches!(items[0], DisplayItem::Group(_)));
    }

    #[test]
    fn test_build_display_list_partitions_disjointly() {
        let bookmarks = vec![bm("1"), bm("2"), bm("3"), bm("4"), bm("5")];
        let groups = vec![group("g1", &["1", "3"]), group("g2", &["5", "2"])];

        let items = build_display_list(&bookmarks, &groups);

        for bookmark in &bookmarks {
            let in_groups = groups.iter().filter(|g| g.contains(&bookmark.id)).count();
            let ungrouped = items
                .iter()
                .filter(|item| matches!(item, DisplayItem::Bookmark(b) if b.id == bookmark.id))
                .count();
            assert_eq!(in_groups + ungrouped, 1, "bookmark {} placed {} times", bookmark.id, in_groups + ungrouped);
        }
    }

    #[test]
    fn test_filter_bookmarks_matches_title_or_url() {
        let bookmarks = vec![
            Bookmark::new("1", "Rust Book", "https://doc.rust-lang.org/book", ""),
            Bookmark::new("2", "News", "https://news.ycombinator.com", ""),
            Bookmark::new("3", "Crates", "https://crates.io", ""),
        ];

        assert_eq!(ids(&filter_bookmarks(&bookmarks, "rust")), vec!["1"]);
        assert_eq!(ids(&filter_bookmarks(&bookmarks, "YCOMB")), vec!["2"]);
        assert_eq!(filter_bookmarks(&bookmarks, "nothing").len(), 0);
    }

    #[test]
    fn test_move_relative_before_and_after() {
        let mut order = strings(&["a", "b", "c", "d"]);
        assert!(move_relative(&mut order, "d", "b", DropPosition::Before));
        assert_eq!(order, strings(&["a", "d", "b", "c"]));

        let mut order = strings(&["a", "b", "c", "d"]);
        assert!(move_relative(&mut order, "a", "c", DropPosition::After));
        assert_eq!(order, strings(&["b", "c", "a", "d"]));
    }

    #[test]
    fn test_move_relative_rejects_self_and_unknown() {
        let mut order = strings(&["a", "b"]);

        assert!(!move_relative(&mut order, "a", "a", DropPosition::After));
        assert!(!move_relative(&mut order, "x", "a", DropPosition::After));
        assert!(!move_relative(&mut order, "a", "x", DropPosition::Before));
        assert_eq!(order, strings(&["a", "b"]));
    }
}
