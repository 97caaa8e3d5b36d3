/// Per-page interaction state: browse, multi-select for deletion, or edit
/// (drag-and-drop) mode

use std::collections::BTreeSet;

use crate::drag::{DragController, ItemRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Clicking a tile opens it
    #[default]
    Browse,
    /// Clicking a tile toggles its selection
    Select,
    /// Tiles can be dragged to reorder or group
    Edit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    mode: Mode,
    selected: BTreeSet<String>,
    drag: DragController,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == Mode::Edit
    }

    pub fn is_selecting(&self) -> bool {
        self.mode == Mode::Select
    }

    pub fn enter_selection(&mut self) {
        self.end_drag();
        self.mode = Mode::Select;
        self.selected.clear();
    }

    pub fn exit_selection(&mut self) {
        if self.mode == Mode::Select {
            self.mode = Mode::Browse;
        }
        self.selected.clear();
    }

    /// Toggle a bookmark's selection; returns whether it is now selected
    pub fn toggle_selected(&mut self, bookmark_id: &str) -> bool {
        if !self.is_selecting() {
            return false;
        }
        if self.selected.remove(bookmark_id) {
            false
        } else {
            self.selected.insert(bookmark_id.to_string());
            true
        }
    }

    pub fn is_selected(&self, bookmark_id: &str) -> bool {
        self.selected.contains(bookmark_id)
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Enter edit mode, leaving selection mode if it was active
    pub fn enter_edit(&mut self) {
        self.exit_selection();
        self.mode = Mode::Edit;
    }

    /// Leave edit mode; true when the caller should persist the orders
    pub fn exit_edit(&mut self) -> bool {
        self.end_drag();
        if self.mode == Mode::Edit {
            self.mode = Mode::Browse;
            true
        } else {
            false
        }
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragController {
        &mut self.drag
    }

    /// Start dragging a tile; only possible in edit mode with no live gesture
    pub fn begin_drag(&mut self, item: ItemRef) -> bool {
        self.is_editing() && self.drag.start(item)
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }
}
