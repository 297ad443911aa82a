//! Tree record item.

use std::sync::Arc;

use horizon_display_core::set_versioned;

use super::capability::{
    Draggable, Editable, Expandable, Hoverable, Markable, Renderable, Selectable, Versioned,
};
use super::collection_item::CollectionItem;
use super::extra::HasMore;
use super::ItemId;

/// A record item placed in a hierarchy.
///
/// The parent is a non-owning [`ItemId`]; the level is derived from the
/// parent chain by the arena.
#[derive(Debug)]
pub struct TreeItem<R> {
    base: CollectionItem<R>,
    parent: Option<ItemId>,
    node: Option<bool>,
    expanded: bool,
    has_children: bool,
    has_children_by_record_set: bool,
    has_more: HasMore,
    drag_target_node: bool,
}

impl<R> TreeItem<R> {
    /// Wrap a record item. `node` is `Some(true)` for a node, `Some(false)`
    /// for a hidden node and `None` for a leaf.
    pub fn new(base: CollectionItem<R>, node: Option<bool>, has_children: bool) -> Self {
        Self {
            base,
            parent: None,
            node,
            expanded: false,
            has_children,
            has_children_by_record_set: false,
            has_more: HasMore::default(),
            drag_target_node: false,
        }
    }

    /// Initial expand state, without a version bump.
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Initial has-more state, without a version bump.
    pub fn with_has_more(mut self, has_more: HasMore) -> Self {
        self.has_more = has_more;
        self
    }

    pub fn base(&self) -> &CollectionItem<R> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut CollectionItem<R> {
        &mut self.base
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<ItemId>) -> bool {
        set_versioned(&mut self.parent, parent, self.base.version_mut())
    }

    /// Node flag.
    pub fn node(&self) -> Option<bool> {
        self.node
    }

    /// Whether the item can hold children.
    pub fn is_node(&self) -> bool {
        self.node.is_some()
    }

    pub fn set_node(&mut self, node: Option<bool>) -> bool {
        set_versioned(&mut self.node, node, self.base.version_mut())
    }

    /// Declared (or computed) presence of children.
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    pub fn set_has_children(&mut self, has_children: bool) -> bool {
        set_versioned(&mut self.has_children, has_children, self.base.version_mut())
    }

    /// Whether the record set holds children of this record.
    pub fn has_children_by_record_set(&self) -> bool {
        self.has_children_by_record_set
    }

    pub fn set_has_children_by_record_set(&mut self, value: bool) -> bool {
        set_versioned(&mut self.has_children_by_record_set, value, self.base.version_mut())
    }

    pub fn has_more(&self) -> HasMore {
        self.has_more
    }

    pub fn set_has_more(&mut self, has_more: HasMore) -> bool {
        set_versioned(&mut self.has_more, has_more, self.base.version_mut())
    }

    /// Whether a drag session currently targets this node.
    pub fn is_drag_target_node(&self) -> bool {
        self.drag_target_node
    }

    pub fn set_drag_target_node(&mut self, value: bool) -> bool {
        set_versioned(&mut self.drag_target_node, value, self.base.version_mut())
    }
}

impl<R> Versioned for TreeItem<R> {
    fn version(&self) -> u64 {
        self.base.version()
    }

    fn instance_id(&self) -> u64 {
        self.base.instance_id()
    }
}

impl<R> Expandable for TreeItem<R> {
    fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn set_expanded(&mut self, expanded: bool) -> bool {
        set_versioned(&mut self.expanded, expanded, self.base.version_mut())
    }
}

impl<R> Selectable for TreeItem<R> {
    fn selected(&self) -> Option<bool> {
        self.base.selected()
    }

    fn set_selected(&mut self, selected: Option<bool>) -> bool {
        self.base.set_selected(selected)
    }
}

impl<R> Markable for TreeItem<R> {
    fn is_marked(&self) -> bool {
        self.base.is_marked()
    }

    fn set_marked(&mut self, marked: bool) -> bool {
        self.base.set_marked(marked)
    }
}

impl<R> Hoverable for TreeItem<R> {
    fn is_hovered(&self) -> bool {
        self.base.is_hovered()
    }

    fn set_hovered(&mut self, hovered: bool) -> bool {
        self.base.set_hovered(hovered)
    }

    fn is_active(&self) -> bool {
        self.base.is_active()
    }

    fn set_active(&mut self, active: bool) -> bool {
        self.base.set_active(active)
    }
}

impl<R> Editable<R> for TreeItem<R> {
    fn is_editing(&self) -> bool {
        self.base.is_editing()
    }

    fn editing_contents(&self) -> Option<&Arc<R>> {
        self.base.editing_contents()
    }

    fn set_editing(&mut self, editing: bool, contents: Option<Arc<R>>) -> bool {
        self.base.set_editing(editing, contents)
    }
}

impl<R> Draggable for TreeItem<R> {
    fn is_dragged(&self) -> bool {
        self.base.is_dragged()
    }

    fn set_dragged(&mut self, dragged: bool) -> bool {
        self.base.set_dragged(dragged)
    }

    fn is_faded(&self) -> bool {
        self.base.is_faded()
    }

    fn set_faded(&mut self, faded: bool) -> bool {
        self.base.set_faded(faded)
    }
}

impl<R> Renderable for TreeItem<R> {
    fn is_sticky(&self) -> bool {
        self.base.is_sticky()
    }

    fn is_rendered(&self) -> bool {
        self.base.is_rendered()
    }

    fn set_rendered(&mut self, rendered: bool) -> bool {
        self.base.set_rendered(rendered)
    }

    fn is_rendered_outside_range(&self) -> bool {
        self.base.is_rendered_outside_range()
    }

    fn set_rendered_outside_range(&mut self, outside: bool) -> bool {
        self.base.set_rendered_outside_range(outside)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_node() -> TreeItem<&'static str> {
        TreeItem::new(CollectionItem::new(Arc::new("1"), Some(1.into())), Some(true), true)
    }

    #[test]
    fn test_tree_flags_share_base_version() {
        let mut item = create_test_node();
        assert!(item.set_expanded(true));
        assert!(!item.set_expanded(true));
        assert!(item.set_selected(Some(true)));
        assert!(item.set_has_more(HasMore { backward: false, forward: true }));
        assert_eq!(item.version(), 3);
        assert_eq!(item.base().version(), 3);
    }

    #[test]
    fn test_toggle_expanded() {
        let mut item = create_test_node();
        assert!(item.toggle_expanded());
        assert!(item.is_expanded());
        assert!(item.toggle_expanded());
        assert!(!item.is_expanded());
    }
}
