//! Display items and the arena that owns them.
//!
//! Every position of a projection is a [`DisplayItem`]: a record wrapper, a
//! tree node, a group header or one of the tree pseudo-items. Items live in
//! an [`ItemArena`] owned by the projection and are referred to by
//! [`ItemId`]. Parent links between tree items are plain ids, so the arena
//! is the only owner.
//!
//! Removing an item from a projection detaches it first. Detached items stay
//! readable until the projection has emitted its change notifications, then
//! [`ItemArena::collect_garbage`] drops them.

pub mod capability;
mod collection_item;
mod extra;
mod group_item;
mod tree_item;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use slotmap::{new_key_type, SlotMap};

pub use capability::{
    Draggable, Editable, Expandable, Hoverable, Markable, Renderable, Selectable, Versioned,
};
pub use collection_item::CollectionItem;
pub use extra::{HasMore, NodeExtraItem, RootItem};
pub use group_item::{GroupItem, GroupKey};
pub use tree_item::TreeItem;

use crate::record::RecordKey;

new_key_type! {
    /// Identifier of an item inside its projection's arena.
    pub struct ItemId;
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// The variant tag of a [`DisplayItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// A flat record item.
    Record,
    /// A tree record item.
    Tree,
    /// A group header.
    Group,
    /// "Load more backward" row of a node.
    NodeHeader,
    /// "Load more forward" row of a node.
    NodeFooter,
    /// The tree root.
    Root,
}

impl ItemKind {
    /// Whether the kind wraps a source record.
    pub fn is_record(self) -> bool {
        matches!(self, ItemKind::Record | ItemKind::Tree)
    }

    /// Whether the kind is a synthetic item without a record.
    pub fn is_pseudo(self) -> bool {
        !self.is_record()
    }

    /// Short label used by debug output.
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Record => "record",
            ItemKind::Tree => "tree",
            ItemKind::Group => "group",
            ItemKind::NodeHeader => "node-header",
            ItemKind::NodeFooter => "node-footer",
            ItemKind::Root => "root",
        }
    }
}

/// What an item displays.
#[derive(Debug)]
pub enum ItemContents<'a, R> {
    /// A record.
    Record(&'a Arc<R>),
    /// A group key.
    Group(&'a GroupKey),
    /// The root key.
    Root(Option<&'a RecordKey>),
    /// The node a header row belongs to.
    NodeHeader(ItemId),
    /// The node a footer row belongs to.
    NodeFooter(ItemId),
}

/// One position of a projection.
#[derive(Debug)]
pub enum DisplayItem<R> {
    Record(CollectionItem<R>),
    Tree(TreeItem<R>),
    Group(GroupItem),
    NodeHeader(NodeExtraItem),
    NodeFooter(NodeExtraItem),
    Root(RootItem),
}

impl<R> DisplayItem<R> {
    /// The variant tag.
    pub fn kind(&self) -> ItemKind {
        match self {
            DisplayItem::Record(_) => ItemKind::Record,
            DisplayItem::Tree(_) => ItemKind::Tree,
            DisplayItem::Group(_) => ItemKind::Group,
            DisplayItem::NodeHeader(_) => ItemKind::NodeHeader,
            DisplayItem::NodeFooter(_) => ItemKind::NodeFooter,
            DisplayItem::Root(_) => ItemKind::Root,
        }
    }

    fn versioned(&self) -> &dyn Versioned {
        match self {
            DisplayItem::Record(item) => item,
            DisplayItem::Tree(item) => item,
            DisplayItem::Group(item) => item,
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => item,
            DisplayItem::Root(item) => item,
        }
    }

    /// Process-unique instance id.
    pub fn instance_id(&self) -> u64 {
        self.versioned().instance_id()
    }

    /// Current revision.
    pub fn version(&self) -> u64 {
        self.versioned().version()
    }

    /// What the item displays.
    pub fn contents(&self) -> ItemContents<'_, R> {
        match self {
            DisplayItem::Record(item) => ItemContents::Record(item.contents()),
            DisplayItem::Tree(item) => ItemContents::Record(item.base().contents()),
            DisplayItem::Group(item) => ItemContents::Group(item.key()),
            DisplayItem::NodeHeader(item) => ItemContents::NodeHeader(item.node()),
            DisplayItem::NodeFooter(item) => ItemContents::NodeFooter(item.node()),
            DisplayItem::Root(item) => ItemContents::Root(item.key()),
        }
    }

    /// The wrapped record, for record items.
    pub fn record(&self) -> Option<&Arc<R>> {
        self.as_collection_item().map(CollectionItem::contents)
    }

    /// Key of the wrapped record or of the root.
    pub fn key(&self) -> Option<&RecordKey> {
        match self {
            DisplayItem::Record(item) => item.key(),
            DisplayItem::Tree(item) => item.base().key(),
            DisplayItem::Root(item) => item.key(),
            _ => None,
        }
    }

    /// Whether this is a group header.
    pub fn is_group(&self) -> bool {
        matches!(self, DisplayItem::Group(_))
    }

    /// Record view shared by flat and tree items.
    pub fn as_collection_item(&self) -> Option<&CollectionItem<R>> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item.base()),
            _ => None,
        }
    }

    pub fn as_collection_item_mut(&mut self) -> Option<&mut CollectionItem<R>> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item.base_mut()),
            _ => None,
        }
    }

    pub fn as_tree_item(&self) -> Option<&TreeItem<R>> {
        match self {
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_tree_item_mut(&mut self) -> Option<&mut TreeItem<R>> {
        match self {
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupItem> {
        match self {
            DisplayItem::Group(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut GroupItem> {
        match self {
            DisplayItem::Group(item) => Some(item),
            _ => None,
        }
    }

    /// Node header or footer view.
    pub fn as_node_extra(&self) -> Option<&NodeExtraItem> {
        match self {
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_node_extra_mut(&mut self) -> Option<&mut NodeExtraItem> {
        match self {
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => Some(item),
            _ => None,
        }
    }

    pub fn selectable(&self) -> Option<&dyn Selectable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn selectable_mut(&mut self) -> Option<&mut dyn Selectable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn markable_mut(&mut self) -> Option<&mut dyn Markable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn hoverable_mut(&mut self) -> Option<&mut dyn Hoverable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn editable(&self) -> Option<&dyn Editable<R>> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn editable_mut(&mut self) -> Option<&mut dyn Editable<R>> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    pub fn draggable_mut(&mut self) -> Option<&mut dyn Draggable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            _ => None,
        }
    }

    /// Expand state of groups, tree items and the root.
    pub fn expandable(&self) -> Option<&dyn Expandable> {
        match self {
            DisplayItem::Group(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            DisplayItem::Root(item) => Some(item),
            _ => None,
        }
    }

    pub fn expandable_mut(&mut self) -> Option<&mut dyn Expandable> {
        match self {
            DisplayItem::Group(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            DisplayItem::Root(item) => Some(item),
            _ => None,
        }
    }

    pub fn renderable(&self) -> Option<&dyn Renderable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            DisplayItem::Group(item) => Some(item),
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => Some(item),
            DisplayItem::Root(_) => None,
        }
    }

    pub fn renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        match self {
            DisplayItem::Record(item) => Some(item),
            DisplayItem::Tree(item) => Some(item),
            DisplayItem::Group(item) => Some(item),
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => Some(item),
            DisplayItem::Root(_) => None,
        }
    }

    /// Whether the item is selected.
    pub fn is_selected(&self) -> bool {
        self.selectable().is_some_and(|s| s.is_selected())
    }

    /// Whether the item is expanded. Items without expand state are not.
    pub fn is_expanded(&self) -> bool {
        self.expandable().is_some_and(|e| e.is_expanded())
    }

    /// Whether the item is being edited.
    pub fn is_editing(&self) -> bool {
        self.editable().is_some_and(|e| e.is_editing())
    }

    /// Whether the item must be visited outside the viewport window.
    pub fn is_sticky(&self) -> bool {
        self.renderable().is_some_and(|r| r.is_sticky())
    }

    /// The tree parent, for tree items.
    pub fn parent(&self) -> Option<ItemId> {
        match self {
            DisplayItem::Tree(item) => item.parent(),
            _ => None,
        }
    }
}

/// Owner of every item of a projection.
#[derive(Debug)]
pub struct ItemArena<R> {
    items: SlotMap<ItemId, DisplayItem<R>>,
    detached: Vec<ItemId>,
}

impl<R> Default for ItemArena<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ItemArena<R> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            items: SlotMap::with_key(),
            detached: Vec::new(),
        }
    }

    /// Store an item.
    pub fn insert(&mut self, item: DisplayItem<R>) -> ItemId {
        self.items.insert(item)
    }

    pub fn get(&self, id: ItemId) -> Option<&DisplayItem<R>> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut DisplayItem<R>> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of stored items, detached ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mark an item as no longer part of the projection.
    pub fn detach(&mut self, id: ItemId) {
        if self.items.contains_key(id) && !self.detached.contains(&id) {
            self.detached.push(id);
        }
    }

    /// Whether the item has been detached and awaits collection.
    pub fn is_detached(&self, id: ItemId) -> bool {
        self.detached.contains(&id)
    }

    /// Drop every detached item. Returns how many were dropped.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        for id in self.detached.drain(..) {
            if self.items.remove(id).is_some() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Tree parent of an item. Node header and footer rows report their node.
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        match self.items.get(id)? {
            DisplayItem::Tree(item) => item.parent(),
            DisplayItem::NodeHeader(item) | DisplayItem::NodeFooter(item) => Some(item.node()),
            _ => None,
        }
    }

    /// Depth of an item. The root is level 0, its children level 1.
    pub fn level(&self, id: ItemId) -> usize {
        let start = match self.items.get(id) {
            Some(DisplayItem::Tree(item)) => item.parent(),
            Some(DisplayItem::NodeHeader(item)) | Some(DisplayItem::NodeFooter(item)) => {
                return self.level(item.node());
            }
            _ => return 0,
        };
        let mut level = 0;
        let mut current = start;
        let mut guard = self.items.len();
        while let Some(parent) = current {
            level += 1;
            if guard == 0 {
                break;
            }
            guard -= 1;
            current = self.items.get(parent).and_then(DisplayItem::parent);
        }
        level
    }

    /// Whether `ancestor` appears in the parent chain of `id`.
    pub fn is_descendant_of(&self, id: ItemId, ancestor: ItemId) -> bool {
        let mut current = self.parent(id);
        let mut guard = self.items.len();
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if guard == 0 {
                break;
            }
            guard -= 1;
            current = self.parent(parent);
        }
        false
    }

    /// Iterate over every stored item.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &DisplayItem<R>)> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> (ItemArena<&'static str>, ItemId, ItemId, ItemId) {
        let mut arena = ItemArena::new();
        let root = arena.insert(DisplayItem::Root(RootItem::new(None)));
        let mut node = TreeItem::new(CollectionItem::new(Arc::new("1"), Some(1.into())), Some(true), false);
        node.set_parent(Some(root));
        let node = arena.insert(DisplayItem::Tree(node));
        let mut leaf = TreeItem::new(CollectionItem::new(Arc::new("2"), Some(2.into())), None, false);
        leaf.set_parent(Some(node));
        let leaf = arena.insert(DisplayItem::Tree(leaf));
        (arena, root, node, leaf)
    }

    #[test]
    fn test_levels_follow_parent_chain() {
        let (arena, root, node, leaf) = create_test_tree();
        assert_eq!(arena.level(root), 0);
        assert_eq!(arena.level(node), 1);
        assert_eq!(arena.level(leaf), 2);
        assert!(arena.is_descendant_of(leaf, root));
        assert!(!arena.is_descendant_of(root, leaf));
    }

    #[test]
    fn test_detached_items_survive_until_collected() {
        let (mut arena, _, node, leaf) = create_test_tree();
        arena.detach(leaf);
        arena.detach(leaf);
        assert!(arena.get(leaf).is_some());
        assert!(arena.is_detached(leaf));

        assert_eq!(arena.collect_garbage(), 1);
        assert!(arena.get(leaf).is_none());
        assert!(arena.get(node).is_some());
    }

    #[test]
    fn test_capabilities_by_variant() {
        let (mut arena, root, node, _) = create_test_tree();
        let group = arena.insert(DisplayItem::Group(GroupItem::new(GroupKey::from("g1"), true)));

        assert!(arena.get_mut(group).and_then(DisplayItem::selectable_mut).is_none());
        assert!(arena.get(group).is_some_and(DisplayItem::is_expanded));
        assert!(arena.get_mut(node).and_then(DisplayItem::selectable_mut).is_some());
        assert!(arena.get(root).is_some_and(DisplayItem::is_expanded));
        assert_eq!(arena.get(node).map(DisplayItem::kind), Some(ItemKind::Tree));
    }
}
