//! Item construction for the bottom layers of the chain.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::item::{CollectionItem, DisplayItem, Expandable, HasMore, ItemArena, ItemId, TreeItem};
use crate::record::{Record, RecordKey};

/// Expanded and collapsed node keys.
///
/// `expand_all` is the wildcard: every node is expanded except the ones
/// listed in `collapsed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    pub expanded: BTreeSet<RecordKey>,
    pub expand_all: bool,
    pub collapsed: BTreeSet<RecordKey>,
}

impl ExpansionState {
    pub fn is_expanded(&self, key: &RecordKey) -> bool {
        self.expanded.contains(key) || (self.expand_all && !self.collapsed.contains(key))
    }
}

/// Tree settings shared with the tree layers.
#[derive(Debug, Clone, Default)]
pub struct TreeSettings {
    /// The root item, owned by the tree.
    pub root: Option<ItemId>,
    pub root_key: Option<RecordKey>,
    pub parent_property: String,
    pub node_property: Option<String>,
    pub has_children_property: Option<String>,
    pub children_property: Option<String>,
    pub expansion: ExpansionState,
    pub has_more: HashMap<RecordKey, HasMore>,
}

impl TreeSettings {
    /// Parent key declared by a record.
    pub fn parent_key_of<R: Record>(&self, record: &R) -> Option<RecordKey> {
        record.get(&self.parent_property).to_key()
    }

    /// Node flag declared by a record.
    pub fn node_of<R: Record>(&self, record: &R) -> Option<bool> {
        self.node_property
            .as_deref()
            .and_then(|property| record.get(property).to_node_flag())
    }

    /// Declared children flag. Records without the property count as having
    /// children.
    pub fn declared_has_children<R: Record>(&self, record: &R) -> bool {
        match self.has_children_property.as_deref() {
            Some(property) => record.get(property).as_bool().unwrap_or(true),
            None => true,
        }
    }
}

/// Builds record items for the projection.
#[derive(Debug, Clone, Default)]
pub struct ItemFactory {
    pub key_property: Option<String>,
    pub tree: Option<TreeSettings>,
}

impl ItemFactory {
    /// Key of a record: its own identity, else the key property.
    pub fn key_of<R: Record>(&self, record: &R) -> Option<RecordKey> {
        record.id().or_else(|| {
            self.key_property
                .as_deref()
                .and_then(|property| record.get(property).to_key())
        })
    }

    /// Create the item wrapping `record` and store it in `arena`.
    pub fn create<R: Record>(&self, arena: &mut ItemArena<R>, record: Arc<R>) -> ItemId {
        let key = self.key_of(record.as_ref());
        let item = match &self.tree {
            None => DisplayItem::Record(CollectionItem::new(record, key)),
            Some(tree) => {
                let node = tree.node_of(record.as_ref());
                let has_children = tree.declared_has_children(record.as_ref());
                let expanded = key
                    .as_ref()
                    .is_some_and(|key| tree.expansion.is_expanded(key));
                let has_more = key
                    .as_ref()
                    .and_then(|key| tree.has_more.get(key).copied())
                    .unwrap_or_default();
                DisplayItem::Tree(
                    TreeItem::new(CollectionItem::new(record, key), node, has_children)
                        .with_expanded(expanded)
                        .with_has_more(has_more),
                )
            }
        };
        arena.insert(item)
    }

    /// Point an existing item at `record` and re-read its tree state.
    ///
    /// Returns `None` when `id` is not an item this factory would build for
    /// the record, else whether its contents changed.
    pub fn refresh<R: Record>(&self, arena: &mut ItemArena<R>, id: ItemId, record: Arc<R>) -> Option<bool> {
        let item = arena.get_mut(id)?;
        match (&self.tree, item) {
            (None, DisplayItem::Record(item)) => Some(item.set_contents(record)),
            (Some(tree), DisplayItem::Tree(item)) => {
                if tree.node_property.is_some() {
                    item.set_node(tree.node_of(record.as_ref()));
                }
                item.set_has_children(tree.declared_has_children(record.as_ref()));
                let state = item.base().key().map(|key| {
                    let has_more = tree.has_more.get(key).copied().unwrap_or_default();
                    (tree.expansion.is_expanded(key), has_more)
                });
                if let Some((expanded, has_more)) = state {
                    item.set_expanded(expanded);
                    item.set_has_more(has_more);
                }
                Some(item.base_mut().set_contents(record))
            }
            _ => None,
        }
    }

    /// Whether the projection builds a hierarchy.
    pub fn is_tree(&self) -> bool {
        self.tree.is_some()
    }
}
