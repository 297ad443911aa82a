//! Hierarchical projections.
//!
//! A [`Tree`] is a [`Collection`] whose items carry parent references. The
//! hierarchy comes either from a parent-key property (adjacency list) or from
//! children nested inside the records (materialized path). Items below a
//! collapsed node stay in the projection but are filtered out.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_display::collection::Collection;
//! use horizon_display::record::MapRecord;
//! use horizon_display::source::SourceList;
//!
//! let source = Arc::new(SourceList::new(vec![
//!     MapRecord::new().with("id", 1).with("node", true),
//!     MapRecord::new().with("id", 2).with("parent", 1),
//! ]));
//! let mut tree = Collection::builder()
//!     .source(source)
//!     .key_property("id")
//!     .node_property("node")
//!     .build_tree()
//!     .unwrap();
//!
//! assert_eq!(tree.count(false), 1);
//! let node = tree.at(0).unwrap();
//! tree.toggle_expanded(node).unwrap();
//! assert_eq!(tree.count(false), 2);
//! ```

pub(crate) mod hierarchy;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use horizon_display_core::logging::targets;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::item::{DisplayItem, Expandable, HasMore, ItemId};
use crate::record::{Record, RecordKey};
use crate::strategy::{
    ExpansionState, FooterVisibilityFn, NodeFooterStrategy, RootStrategy, StrategyBox, StrategyKind, TreeSettings,
};

/// Tree-only state of a projection.
pub(crate) struct TreeState<R> {
    pub root: ItemId,
    pub root_enumerable: bool,
    pub node_header: bool,
    pub node_footer: bool,
    pub footer_visibility: Option<FooterVisibilityFn<R>>,
    /// Children per `(parent instance id, with_filter)`.
    pub children_memo: HashMap<(u64, bool), Vec<ItemId>>,
    pub has_node: bool,
    pub has_node_with_children: bool,
}

impl<R> TreeState<R> {
    pub fn new(
        root: ItemId,
        root_enumerable: bool,
        node_header: bool,
        node_footer: bool,
        footer_visibility: Option<FooterVisibilityFn<R>>,
    ) -> Self {
        Self {
            root,
            root_enumerable,
            node_header,
            node_footer,
            footer_visibility,
            children_memo: HashMap::new(),
            has_node: false,
            has_node_with_children: false,
        }
    }
}

impl<R: Record> Collection<R> {
    pub(crate) fn tree_settings(&self) -> Option<&TreeSettings> {
        self.factory.tree.as_ref()
    }

    /// Point the root at `key` and rebuild.
    pub(crate) fn apply_root(&mut self, key: Option<RecordKey>) {
        let Some(settings) = self.factory.tree.as_mut() else {
            return;
        };
        if settings.root_key == key {
            return;
        }
        settings.root_key = key.clone();
        let root = settings.root;
        tracing::debug!(target: targets::TREE, ?key, "root changed");
        self.in_session(None, |this| {
            if let Some(id) = root {
                if let Some(DisplayItem::Root(item)) = this.arena.get_mut(id) {
                    item.set_key(key);
                }
            }
            this.re_build(false);
        });
    }

    /// Wrap or unwrap the Root layer.
    pub(crate) fn apply_root_enumerable(&mut self, enumerable: bool) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        if tree.root_enumerable == enumerable {
            return;
        }
        tree.root_enumerable = enumerable;
        self.in_session(None, |this| {
            if enumerable {
                let layer: StrategyBox<R> = Box::new(RootStrategy::new());
                let above = [StrategyKind::NodeHeader, StrategyKind::NodeFooter, StrategyKind::Drag]
                    .into_iter()
                    .find(|kind| this.composer.contains(kind));
                match above {
                    Some(kind) => this.composer.insert_before(&kind, layer),
                    None => this.composer.append(layer),
                };
            } else {
                this.detach_layer(&StrategyKind::Root);
            }
            this.restack();
        });
    }

    /// Update the expansion sets and apply them to every item in one pass.
    pub(crate) fn apply_expansion(&mut self, update: impl FnOnce(&mut ExpansionState)) {
        let Some(settings) = self.factory.tree.as_mut() else {
            return;
        };
        update(&mut settings.expansion);
        let expansion = settings.expansion.clone();
        self.in_session(None, |this| {
            let mut changed = 0;
            for &id in &this.items {
                let Some(item) = this.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) else {
                    continue;
                };
                let expanded = item.base().key().is_some_and(|key| expansion.is_expanded(key));
                if item.set_expanded(expanded) {
                    changed += 1;
                }
            }
            tracing::trace!(target: targets::TREE, changed, "expansion applied");
            if changed > 0 {
                this.restack();
            }
        });
    }
}

/// A hierarchical projection.
///
/// Derefs to [`Collection`] for everything that is not tree specific.
pub struct Tree<R: Record> {
    collection: Collection<R>,
    root: ItemId,
}

impl<R: Record> fmt::Debug for Tree<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("collection", &self.collection)
            .field("root", &self.root)
            .finish()
    }
}

impl<R: Record> Deref for Tree<R> {
    type Target = Collection<R>;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

impl<R: Record> DerefMut for Tree<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.collection
    }
}

impl<R: Record> TryFrom<Collection<R>> for Tree<R> {
    type Error = Error;

    fn try_from(collection: Collection<R>) -> Result<Self> {
        Self::from_collection(collection)
    }
}

impl<R: Record> Tree<R> {
    /// Wrap a projection built with tree options.
    pub fn from_collection(collection: Collection<R>) -> Result<Self> {
        let root = collection
            .tree
            .as_ref()
            .map(|tree| tree.root)
            .ok_or(Error::NotATree { operation: "from_collection" })?;
        Ok(Self { collection, root })
    }

    pub fn into_collection(self) -> Collection<R> {
        self.collection
    }

    fn state(&self) -> Option<&TreeState<R>> {
        self.collection.tree.as_ref()
    }

    fn settings(&self) -> Option<&TreeSettings> {
        self.collection.tree_settings()
    }

    // ---------------------------------------------------------------------
    // Root
    // ---------------------------------------------------------------------

    /// The root item.
    pub fn root(&self) -> ItemId {
        self.root
    }

    /// Key of the root, `None` for the implicit top level.
    pub fn root_key(&self) -> Option<&RecordKey> {
        self.settings().and_then(|settings| settings.root_key.as_ref())
    }

    /// Show the children of `key` at the top level.
    pub fn set_root(&mut self, key: Option<RecordKey>) {
        self.collection.apply_root(key);
    }

    pub fn is_root_enumerable(&self) -> bool {
        self.state().is_some_and(|state| state.root_enumerable)
    }

    /// Show or hide the root item itself.
    pub fn set_root_enumerable(&mut self, enumerable: bool) {
        self.collection.apply_root_enumerable(enumerable);
    }

    /// Level of the root: 1 when it is enumerable, else 0.
    pub fn root_level(&self) -> usize {
        usize::from(self.is_root_enumerable())
    }

    /// Level of an item. Top-level items are one below the root.
    pub fn level(&self, id: ItemId) -> usize {
        self.collection.arena.level(id) + self.root_level()
    }

    /// Parent of an item.
    pub fn parent_of(&self, id: ItemId) -> Option<ItemId> {
        self.collection.arena.parent(id)
    }

    // ---------------------------------------------------------------------
    // Children
    // ---------------------------------------------------------------------

    /// Direct children of `parent`, in projection order.
    ///
    /// With `with_filter`, only children that passed filtering (and are not
    /// below a collapsed node) are returned.
    pub fn children(&mut self, parent: ItemId, with_filter: bool) -> Vec<ItemId> {
        let Some(instance) = self.collection.arena.get(parent).map(DisplayItem::instance_id) else {
            return Vec::new();
        };
        let memo_key = (instance, with_filter);
        if let Some(children) = self.state().and_then(|state| state.children_memo.get(&memo_key)) {
            return children.clone();
        }

        let collection = &self.collection;
        let children: Vec<ItemId> = collection
            .items
            .iter()
            .enumerate()
            .filter(|&(index, &id)| {
                let child = collection
                    .arena
                    .get(id)
                    .and_then(DisplayItem::as_tree_item)
                    .is_some_and(|item| item.parent() == Some(parent));
                child && (!with_filter || collection.filter_map.get(index) == Some(&Some(true)))
            })
            .map(|(_, &id)| id)
            .collect();
        if let Some(state) = self.collection.tree.as_mut() {
            state.children_memo.insert(memo_key, children.clone());
        }
        children
    }

    // ---------------------------------------------------------------------
    // Expansion
    // ---------------------------------------------------------------------

    pub fn is_expanded(&self, id: ItemId) -> bool {
        self.collection.arena.get(id).is_some_and(DisplayItem::is_expanded)
    }

    /// Expand or collapse one node. Returns whether its state changed.
    pub fn set_expanded(&mut self, id: ItemId, expanded: bool) -> Result<bool> {
        let item = self
            .collection
            .arena
            .get(id)
            .and_then(DisplayItem::as_tree_item)
            .ok_or(Error::ItemNotFound)?;
        if item.is_expanded() == expanded {
            return Ok(false);
        }
        let Some(key) = item.base().key().cloned() else {
            self.collection.in_session(None, |this| {
                if let Some(item) = this.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) {
                    item.set_expanded(expanded);
                }
                this.restack();
            });
            return Ok(true);
        };
        self.collection.apply_expansion(|state| {
            if expanded {
                state.collapsed.remove(&key);
                if !state.expand_all {
                    state.expanded.insert(key);
                }
            } else {
                state.expanded.remove(&key);
                if state.expand_all {
                    state.collapsed.insert(key);
                }
            }
        });
        Ok(true)
    }

    /// Flip a node. Returns its new state.
    pub fn toggle_expanded(&mut self, id: ItemId) -> Result<bool> {
        let expanded = !self.is_expanded(id);
        self.set_expanded(id, expanded)?;
        Ok(expanded)
    }

    /// Expand exactly the nodes in `keys`.
    pub fn set_expanded_items(&mut self, keys: impl IntoIterator<Item = RecordKey>) {
        let keys: BTreeSet<RecordKey> = keys.into_iter().collect();
        self.collection.apply_expansion(|state| {
            state.collapsed.retain(|key| !keys.contains(key));
            state.expanded = keys;
        });
    }

    /// Collapse exactly the nodes in `keys`; meaningful with expand-all.
    pub fn set_collapsed_items(&mut self, keys: impl IntoIterator<Item = RecordKey>) {
        let keys: BTreeSet<RecordKey> = keys.into_iter().collect();
        self.collection.apply_expansion(|state| {
            state.expanded.retain(|key| !keys.contains(key));
            state.collapsed = keys;
        });
    }

    /// Turn the expand-all wildcard on or off.
    pub fn set_expand_all(&mut self, expand_all: bool) {
        self.collection.apply_expansion(|state| {
            state.expand_all = expand_all;
            if !expand_all {
                state.collapsed.clear();
            }
        });
    }

    pub fn expanded_items(&self) -> Vec<RecordKey> {
        self.settings()
            .map(|settings| settings.expansion.expanded.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn collapsed_items(&self) -> Vec<RecordKey> {
        self.settings()
            .map(|settings| settings.expansion.collapsed.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the expand-all wildcard is on.
    pub fn is_expand_all(&self) -> bool {
        self.settings().is_some_and(|settings| settings.expansion.expand_all)
    }

    // ---------------------------------------------------------------------
    // Has-more and node flags
    // ---------------------------------------------------------------------

    /// Replace the per-node has-more pairs.
    ///
    /// Items take their pair at once. Node header and footer rows follow
    /// only with `rebuild_node_footers`.
    pub fn set_has_more_storage(&mut self, storage: HashMap<RecordKey, HasMore>, rebuild_node_footers: bool) {
        let Some(settings) = self.collection.factory.tree.as_mut() else {
            return;
        };
        settings.has_more = storage.clone();
        self.collection.in_session(None, |this| {
            for &id in &this.items {
                let Some(item) = this.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) else {
                    continue;
                };
                let has_more = item
                    .base()
                    .key()
                    .and_then(|key| storage.get(key).copied())
                    .unwrap_or_default();
                item.set_has_more(has_more);
            }
            if rebuild_node_footers {
                this.restack();
            }
        });
    }

    pub fn has_more_storage(&self) -> Option<&HashMap<RecordKey, HasMore>> {
        self.settings().map(|settings| &settings.has_more)
    }

    /// Change which nodes get a footer besides the ones with more data.
    pub fn set_footer_visibility(&mut self, visibility: Option<FooterVisibilityFn<R>>) {
        if let Some(state) = self.collection.tree.as_mut() {
            state.footer_visibility = visibility.clone();
        }
        if let Some(layer) = self.collection.composer.get_mut::<NodeFooterStrategy<R>>() {
            layer.set_visibility(visibility);
        }
        self.collection.in_session(None, |this| this.restack());
    }

    /// Whether some top-level item is a node.
    pub fn has_node(&self) -> bool {
        self.state().is_some_and(|state| state.has_node)
    }

    /// Whether some record is a node with children.
    pub fn has_node_with_children(&self) -> bool {
        self.state().is_some_and(|state| state.has_node_with_children)
    }

    // ---------------------------------------------------------------------
    // Record-set relation
    // ---------------------------------------------------------------------

    /// Source records whose parent is `parent`.
    pub fn children_by_record_set(&self, parent: Option<&RecordKey>) -> Vec<Arc<R>> {
        match self.settings() {
            Some(settings) => hierarchy::children_by_record_set(self.collection.source.as_ref(), settings, parent),
            None => Vec::new(),
        }
    }

    /// Depth-first list of the source records below `root`, entering only
    /// nodes that `expansion` expands.
    pub fn record_set_projection(&self, root: Option<&RecordKey>, expansion: &ExpansionState) -> Vec<Arc<R>> {
        let Some(settings) = self.settings() else {
            return Vec::new();
        };
        let factory = &self.collection.factory;
        hierarchy::record_set_projection(
            self.collection.source.as_ref(),
            settings,
            &|record: &R| factory.key_of(record),
            root,
            expansion,
        )
    }

    /// Record after `key` in the record-set projection of the whole tree.
    pub fn next_in_record_set_projection(&self, key: &RecordKey, expansion: &ExpansionState) -> Option<Arc<R>> {
        self.nearby_in_record_set_projection(key, expansion, true)
    }

    /// Record before `key` in the record-set projection of the whole tree.
    pub fn prev_in_record_set_projection(&self, key: &RecordKey, expansion: &ExpansionState) -> Option<Arc<R>> {
        self.nearby_in_record_set_projection(key, expansion, false)
    }

    fn nearby_in_record_set_projection(
        &self,
        key: &RecordKey,
        expansion: &ExpansionState,
        forward: bool,
    ) -> Option<Arc<R>> {
        let projection = self.record_set_projection(self.root_key(), expansion);
        let factory = &self.collection.factory;
        hierarchy::nearby_in_record_set_projection(&projection, &|record: &R| factory.key_of(record), key, forward)
    }
}

static_assertions::assert_impl_all!(Tree<crate::record::MapRecord>: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::record::MapRecord;
    use crate::source::SourceList;

    fn create_test_tree(records: Vec<MapRecord>) -> Tree<MapRecord> {
        Collection::builder()
            .source(Arc::new(SourceList::new(records)))
            .key_property("id")
            .node_property("node")
            .build_tree()
            .unwrap()
    }

    fn create_test_records() -> Vec<MapRecord> {
        vec![
            MapRecord::new().with("id", 1).with("node", true),
            MapRecord::new().with("id", 2).with("parent", 1),
            MapRecord::new().with("id", 3).with("parent", 1),
        ]
    }

    fn ids(tree: &Tree<MapRecord>, items: &[ItemId]) -> Vec<i64> {
        items
            .iter()
            .filter_map(|&id| tree.item(id)?.record()?.get("id").as_int())
            .collect()
    }

    #[test]
    fn test_children_of_root_and_node() {
        let mut tree = create_test_tree(create_test_records());
        let node = tree.at(0).unwrap();
        tree.set_expanded(node, true).unwrap();

        let root = tree.root();
        let top = tree.children(root, true);
        assert_eq!(ids(&tree, &top), vec![1]);
        let children = tree.children(node, true);
        assert_eq!(ids(&tree, &children), vec![2, 3]);
        assert_eq!(tree.level(children[0]), 2);
    }

    #[test]
    fn test_filtered_children_follow_filter_changes() {
        let mut tree = create_test_tree(create_test_records());
        tree.set_expand_all(true);
        let node = tree.at(0).unwrap();
        let children = tree.children(node, true);
        assert_eq!(ids(&tree, &children), vec![2, 3]);

        tree.set_filter(Some(|record: &MapRecord| record.get("id").as_int() != Some(2)));
        let children = tree.children(node, true);
        assert_eq!(ids(&tree, &children), vec![3]);
        assert_eq!(tree.children(node, false).len(), 2);

        tree.set_filter(None::<fn(&MapRecord) -> bool>);
        let children = tree.children(node, true);
        assert_eq!(ids(&tree, &children), vec![2, 3]);
    }

    #[test]
    fn test_collapse_hides_descendants() {
        let mut tree = create_test_tree(create_test_records());
        assert_eq!(tree.count(false), 1);
        let node = tree.at(0).unwrap();
        assert!(tree.toggle_expanded(node).unwrap());
        assert_eq!(tree.count(false), 3);
        assert_eq!(tree.expanded_items(), vec![RecordKey::from(1)]);
        assert!(!tree.toggle_expanded(node).unwrap());
        assert_eq!(tree.count(false), 1);
        assert_eq!(tree.children(node, false).len(), 2);
        assert!(tree.children(node, true).is_empty());
    }

    #[test]
    fn test_expand_all_with_exceptions() {
        let mut records = create_test_records();
        records.push(MapRecord::new().with("id", 4).with("node", true));
        records.push(MapRecord::new().with("id", 5).with("parent", 4));
        let mut tree = create_test_tree(records);
        tree.set_expand_all(true);
        assert_eq!(tree.count(false), 5);
        tree.set_collapsed_items([RecordKey::from(4)]);
        assert_eq!(tree.count(false), 4);
        assert!(tree.is_expand_all());
    }

    #[test]
    fn test_root_enumerable_adds_root_row() {
        let mut tree = create_test_tree(create_test_records());
        assert_eq!(tree.root_level(), 0);
        tree.set_root_enumerable(true);
        assert_eq!(tree.root_level(), 1);
        assert_eq!(tree.at(0).ok(), Some(tree.root()));
        assert_eq!(tree.count(false), 2);
        tree.set_root_enumerable(false);
        assert_eq!(tree.count(false), 1);
    }

    #[test]
    fn test_set_root_shows_subtree() {
        let mut tree = create_test_tree(create_test_records());
        tree.set_root(Some(RecordKey::from(1)));
        let visible = tree.items().to_vec();
        assert_eq!(ids(&tree, &visible), vec![2, 3]);
        assert_eq!(tree.root_key(), Some(&RecordKey::from(1)));
    }

    #[test]
    fn test_node_flags() {
        let tree = create_test_tree(create_test_records());
        assert!(tree.has_node());
        assert!(tree.has_node_with_children());

        let flat = create_test_tree(vec![MapRecord::new().with("id", 1)]);
        assert!(!flat.has_node());
        assert!(!flat.has_node_with_children());
    }

    #[test]
    fn test_has_more_storage_adds_footer() {
        let mut tree: Tree<MapRecord> = Collection::builder()
            .source(Arc::new(SourceList::new(create_test_records())))
            .key_property("id")
            .node_property("node")
            .node_footer(true)
            .expand_all(true)
            .build_tree()
            .unwrap();
        assert_eq!(tree.count(false), 3);

        let storage = HashMap::from([(RecordKey::from(1), HasMore { backward: false, forward: true })]);
        tree.set_has_more_storage(storage, true);
        assert_eq!(tree.count(false), 4);
        let footer = tree.item_at(3).unwrap();
        assert_eq!(footer.kind(), ItemKind::NodeFooter);
    }

    #[test]
    fn test_record_set_navigation() {
        let tree = create_test_tree(create_test_records());
        let expansion = ExpansionState {
            expand_all: true,
            ..ExpansionState::default()
        };
        let next = tree.next_in_record_set_projection(&RecordKey::from(1), &expansion);
        assert_eq!(next.and_then(|record| record.get("id").as_int()), Some(2));
        assert_eq!(tree.children_by_record_set(Some(&RecordKey::from(1))).len(), 2);
    }

    #[test]
    fn test_flat_collection_is_not_a_tree() {
        let collection = Collection::builder()
            .source(Arc::new(SourceList::new(create_test_records())))
            .build()
            .unwrap();
        assert!(matches!(Tree::try_from(collection), Err(Error::NotATree { .. })));
    }
}
