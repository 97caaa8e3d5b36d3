/// Drag-and-drop gesture handling for edit mode
///
/// One gesture at a time: `start` captures the dragged item, each `over`
/// classifies the pointer against the hovered tile, and `drop` turns the last
/// classification into an intent. `drop` and `end` always return to idle.

use crate::operations::DropPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Bookmark,
    Group,
}

/// A tile taking part in a gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    pub kind: ItemKind,
}

impl ItemRef {
    pub fn bookmark(id: &str) -> ItemRef {
        ItemRef {
            id: id.to_string(),
            kind: ItemKind::Bookmark,
        }
    }

    pub fn group(id: &str) -> ItemRef {
        ItemRef {
            id: id.to_string(),
            kind: ItemKind::Group,
        }
    }
}

/// A tile's bounding box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Rect {
        Rect { left, top, width, height }
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Inside the middle half of the box on both axes
    pub fn is_near_center(&self, x: f64, y: f64) -> bool {
        (x - self.center_x()).abs() < self.width * 0.25 && (y - self.center_y()).abs() < self.height * 0.25
    }
}

/// What dropping at the current pointer position would do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverZone {
    ReorderLeft,
    ReorderRight,
    MergeCenter,
}

impl HoverZone {
    /// CSS class for the hover indicator
    pub fn css_class(&self) -> &'static str {
        match self {
            HoverZone::ReorderLeft => "drag-over-left",
            HoverZone::ReorderRight => "drag-over-right",
            HoverZone::MergeCenter => "drag-over-center",
        }
    }
}

/// Classify a pointer position over a target tile
///
/// Only bookmarks merge: a bookmark dropped in the middle of a bookmark makes
/// a group, in the middle of a group joins it. Everything else reorders.
pub fn classify(dragged: ItemKind, rect: &Rect, x: f64, y: f64) -> HoverZone {
    if dragged == ItemKind::Bookmark && rect.is_near_center(x, y) {
        HoverZone::MergeCenter
    } else if x < rect.center_x() {
        HoverZone::ReorderLeft
    } else {
        HoverZone::ReorderRight
    }
}

/// The change a completed gesture asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropIntent {
    CreateGroup {
        target_id: String,
        dragged_id: String,
    },
    AddToGroup {
        group_id: String,
        bookmark_id: String,
    },
    ReorderBookmarks {
        target_id: String,
        dragged_id: String,
        position: DropPosition,
    },
    ReorderGroups {
        target_id: String,
        dragged_id: String,
        position: DropPosition,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hover {
    pub target: ItemRef,
    pub zone: HoverZone,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        dragged: ItemRef,
        hover: Option<Hover>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged(&self) -> Option<&ItemRef> {
        match &self.state {
            DragState::Dragging { dragged, .. } => Some(dragged),
            DragState::Idle => None,
        }
    }

    /// Hover indicator to draw on a tile, if any
    pub fn zone_for(&self, item_id: &str) -> Option<HoverZone> {
        match &self.state {
            DragState::Dragging { hover: Some(hover), .. } if hover.target.id == item_id => Some(hover.zone),
            _ => None,
        }
    }

    /// Begin a gesture; refused while another one is live
    pub fn start(&mut self, item: ItemRef) -> bool {
        if self.is_dragging() {
            return false;
        }
        self.state = DragState::Dragging {
            dragged: item,
            hover: None,
        };
        true
    }

    /// Pointer moved over a tile
    pub fn over(&mut self, target: ItemRef, rect: &Rect, x: f64, y: f64) -> Option<HoverZone> {
        let DragState::Dragging { dragged, hover } = &mut self.state else {
            return None;
        };
        if dragged.id == target.id {
            *hover = None;
            return None;
        }
        let zone = classify(dragged.kind, rect, x, y);
        *hover = Some(Hover { target, zone });
        Some(zone)
    }

    /// Pointer left a tile
    pub fn leave(&mut self, target_id: &str) {
        if let DragState::Dragging { hover, .. } = &mut self.state {
            if hover.as_ref().is_some_and(|h| h.target.id == target_id) {
                *hover = None;
            }
        }
    }

    /// Finish the gesture on `target_id`, yielding the hovered intent
    pub fn drop(&mut self, target_id: &str) -> Option<DropIntent> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging { dragged, hover: Some(hover) } = state else {
            return None;
        };
        if hover.target.id != target_id || hover.target.id == dragged.id {
            return None;
        }
        intent_for(dragged, hover)
    }

    /// Gesture ended (dropped anywhere or cancelled)
    pub fn end(&mut self) {
        self.state = DragState::Idle;
    }
}

fn intent_for(dragged: ItemRef, hover: Hover) -> Option<DropIntent> {
    let Hover { target, zone } = hover;
    match (zone, dragged.kind, target.kind) {
        (HoverZone::MergeCenter, ItemKind::Bookmark, ItemKind::Bookmark) => Some(DropIntent::CreateGroup {
            target_id: target.id,
            dragged_id: dragged.id,
        }),
        (HoverZone::MergeCenter, ItemKind::Bookmark, ItemKind::Group) => Some(DropIntent::AddToGroup {
            group_id: target.id,
            bookmark_id: dragged.id,
        }),
        (HoverZone::MergeCenter, ItemKind::Group, _) => None,
        (reorder, ItemKind::Bookmark, ItemKind::Bookmark) => Some(DropIntent::ReorderBookmarks {
            target_id: target.id,
            dragged_id: dragged.id,
            position: position_of(reorder),
        }),
        (reorder, ItemKind::Group, ItemKind::Group) => Some(DropIntent::ReorderGroups {
            target_id: target.id,
            dragged_id: dragged.id,
            position: position_of(reorder),
        }),
        // Bookmarks and groups live in separate rows
        _ => None,
    }
}

fn position_of(zone: HoverZone) -> DropPosition {
    match zone {
        HoverZone::ReorderLeft => DropPosition::Before,
        _ => DropPosition::After,
    }
}
