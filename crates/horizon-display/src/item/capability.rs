//! Capability traits implemented by display items.
//!
//! Each item variant implements only the capabilities it supports. A group
//! header can be expanded but not selected, a record item can be selected but
//! not expanded, a tree item can do both. Every setter returns whether the
//! value changed and bumps the item's version only in that case.

use std::sync::Arc;

/// Identity and revision of an item.
pub trait Versioned {
    /// Monotonic revision, bumped by every changing setter.
    fn version(&self) -> u64;

    /// Process-unique instance id, stable for the item's lifetime.
    fn instance_id(&self) -> u64;
}

/// Tri-state selection. `None` is "partially selected".
pub trait Selectable: Versioned {
    fn selected(&self) -> Option<bool>;
    fn set_selected(&mut self, selected: Option<bool>) -> bool;

    fn is_selected(&self) -> bool {
        self.selected() == Some(true)
    }
}

/// Marker (current row highlight).
pub trait Markable: Versioned {
    fn is_marked(&self) -> bool;
    fn set_marked(&mut self, marked: bool) -> bool;
}

/// Pointer hover and the "active" (actions shown) state.
pub trait Hoverable: Versioned {
    fn is_hovered(&self) -> bool;
    fn set_hovered(&mut self, hovered: bool) -> bool;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool) -> bool;
}

/// In-place editing with a shadow copy of the record being edited.
pub trait Editable<R>: Versioned {
    fn is_editing(&self) -> bool;
    fn editing_contents(&self) -> Option<&Arc<R>>;
    fn set_editing(&mut self, editing: bool, contents: Option<Arc<R>>) -> bool;
}

/// Drag-and-drop presentation.
pub trait Draggable: Versioned {
    fn is_dragged(&self) -> bool;
    fn set_dragged(&mut self, dragged: bool) -> bool;
    fn is_faded(&self) -> bool;
    fn set_faded(&mut self, faded: bool) -> bool;
}

/// Expand/collapse state of groups and tree nodes.
pub trait Expandable: Versioned {
    fn is_expanded(&self) -> bool;
    fn set_expanded(&mut self, expanded: bool) -> bool;

    fn toggle_expanded(&mut self) -> bool {
        let expanded = !self.is_expanded();
        self.set_expanded(expanded)
    }
}

/// Flags maintained by viewport windowing.
pub trait Renderable: Versioned {
    /// Pinned or being edited: must be visited even outside the window.
    fn is_sticky(&self) -> bool;
    fn is_rendered(&self) -> bool;
    fn set_rendered(&mut self, rendered: bool) -> bool;
    fn is_rendered_outside_range(&self) -> bool;
    fn set_rendered_outside_range(&mut self, outside: bool) -> bool;
}
