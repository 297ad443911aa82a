//! The flat projection.
//!
//! A [`Collection`] wraps a source collection and exposes its records as a
//! list of display items: grouped, sorted, filtered and optionally decorated
//! by extra strategies (add-in-place row, drag avatar, user layers). The
//! source is never mutated; the projection follows it through
//! [`Collection::on_collection_change`] and friends, usually wired by a
//! [`SourceBinding`](crate::binding::SourceBinding).
//!
//! Every change is applied inside a session. The session snapshots the
//! visible items when it opens and, when it closes, emits the minimal set of
//! [`ProjectionChange`] notifications between `before_change` and
//! `after_change`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_display::collection::Collection;
//! use horizon_display::record::{MapRecord, Record};
//! use horizon_display::source::SourceList;
//!
//! let source = Arc::new(SourceList::new(vec![
//!     MapRecord::new().with("id", "A"),
//!     MapRecord::new().with("id", "B"),
//!     MapRecord::new().with("id", "C"),
//! ]));
//! let projection = Collection::builder()
//!     .source(source)
//!     .key_property("id")
//!     .filter(|record: &MapRecord| record.get("id").as_str() != Some("B"))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(projection.count(true), 2);
//! ```

mod changes;
mod cursor;
mod filter;
mod identity;
mod interaction;
mod options;
mod pipeline;
mod session;
mod state;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use horizon_display_core::Version;

pub use changes::{CurrentChange, ProjectionChange, ProjectionSignals};
pub use filter::{Filter, FilterFn, FilterItem};
pub use options::{CollectionBuilder, CollectionOptions, MultiSelectVisibility, TreeOptions};
pub use pipeline::RecomputeStage;
pub use state::ProjectionState;

use identity::UidCache;
use session::Session;

use crate::enumerator::Enumerator;
use crate::error::{Error, Result};
use crate::item::{DisplayItem, GroupKey, ItemArena, ItemId, RootItem};
use crate::record::{Record, RecordKey};
use crate::source::{ItemChange, MetaData, SourceCollection};
use crate::strategy::{
    AdjacencyListStrategy, Chain, Composer, DirectStrategy, ExpansionState, GroupFn, GroupStrategy,
    ItemFactory, ItemsStrategy, MaterializedPathStrategy, NodeFooterStrategy, NodeHeaderStrategy,
    RootStrategy, SortFn, StrategyBox, StrategyContext, StrategyKind, TreeSettings,
    UserSortStrategy,
};
use crate::tree::TreeState;
use crate::viewport::Viewport;

/// A live projection of a source collection.
pub struct Collection<R: Record> {
    pub(crate) source: Arc<dyn SourceCollection<R>>,
    pub(crate) arena: ItemArena<R>,
    pub(crate) composer: Composer<R>,
    pub(crate) factory: ItemFactory,

    pub(crate) filters: Vec<Filter<R>>,
    pub(crate) sort: Vec<SortFn<R>>,
    pub(crate) group: Option<GroupFn<R>>,
    pub(crate) collapsed_groups: BTreeSet<GroupKey>,
    unique: bool,
    display_property: Option<String>,
    important_properties: Vec<String>,
    compatible_reset: bool,
    multi_select_visibility: MultiSelectVisibility,

    /// Items of the result strategy, before filtering.
    pub(crate) items: Vec<ItemId>,
    pub(crate) filter_map: Vec<Option<bool>>,
    pub(crate) sort_map: Vec<usize>,
    /// Items that passed filtering, in display order.
    pub(crate) visible: Vec<ItemId>,
    filter_memo: HashMap<ItemId, bool>,
    pub(crate) uids: UidCache,

    session: Option<Session>,
    delayed: Vec<ItemChange<R>>,
    source_synchronized: bool,
    rebuild_on_sync: bool,
    recompute_log: Vec<RecomputeStage>,

    version: Version,
    pub(crate) marked_key: Option<RecordKey>,
    hovered: Option<ItemId>,
    active: Option<ItemId>,
    pub(crate) current: Option<ItemId>,
    adding: Option<ItemId>,
    pub(crate) drag_target: Option<ItemId>,
    viewport: Option<Box<dyn Viewport<R>>>,
    pub(crate) tree: Option<TreeState<R>>,
    signals: ProjectionSignals,
}

impl<R: Record> fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("composer", &self.composer)
            .field("items", &self.items.len())
            .field("visible", &self.visible.len())
            .field("version", &self.version.get())
            .field("tree", &self.tree.is_some())
            .finish()
    }
}

impl<R: Record> Collection<R> {
    /// Creates a builder.
    pub fn builder() -> CollectionBuilder<R> {
        CollectionBuilder::new()
    }

    pub(crate) fn new(source: Arc<dyn SourceCollection<R>>, options: CollectionOptions<R>) -> Self {
        let mut arena = ItemArena::new();
        let (settings, tree) = match options.tree {
            Some(tree) => {
                let root = arena.insert(DisplayItem::Root(RootItem::new(tree.root.clone())));
                let settings = TreeSettings {
                    root: Some(root),
                    root_key: tree.root,
                    parent_property: tree.parent_property,
                    node_property: tree.node_property,
                    has_children_property: tree.has_children_property,
                    children_property: tree.children_property,
                    expansion: ExpansionState {
                        expanded: tree.expanded_items,
                        expand_all: tree.expand_all,
                        collapsed: tree.collapsed_items,
                    },
                    has_more: tree.has_more_storage,
                };
                let state = TreeState::new(
                    root,
                    tree.root_enumerable,
                    tree.node_header,
                    tree.node_footer,
                    tree.footer_visibility,
                );
                (Some(settings), Some(state))
            }
            None => (None, None),
        };

        let mut collection = Self {
            source,
            arena,
            composer: Composer::new(),
            factory: ItemFactory {
                key_property: options.key_property,
                tree: settings,
            },
            filters: options.filters,
            sort: options.sort,
            group: options.group,
            collapsed_groups: options.collapsed_groups,
            unique: options.unique,
            display_property: options.display_property,
            important_properties: options.important_item_properties,
            compatible_reset: options.compatible_reset,
            multi_select_visibility: options.multi_select_visibility,
            items: Vec::new(),
            filter_map: Vec::new(),
            sort_map: Vec::new(),
            visible: Vec::new(),
            filter_memo: HashMap::new(),
            uids: UidCache::default(),
            session: None,
            delayed: Vec::new(),
            source_synchronized: true,
            rebuild_on_sync: false,
            recompute_log: Vec::new(),
            version: Version::default(),
            marked_key: None,
            hovered: None,
            active: None,
            current: None,
            adding: None,
            drag_target: None,
            viewport: None,
            tree,
            signals: ProjectionSignals::new(),
        };
        collection.source_synchronized = collection.source.is_event_raising();
        collection.composer = collection.build_composer();
        collection.re_build(true);
        collection.arena.collect_garbage();
        tracing::debug!(
            target: horizon_display_core::logging::targets::COLLECTION,
            kinds = ?collection.composer.kinds(),
            count = collection.visible.len(),
            "projection created"
        );
        collection
    }

    /// Build the strategy stack for the current options.
    ///
    /// Bottom to top: Direct (or MaterializedPath), UserSort, Group, then the
    /// tree layers AdjacencyList, Root, NodeHeader and NodeFooter.
    pub(crate) fn build_composer(&self) -> Composer<R> {
        let mut composer = Composer::new();
        let materialized = self
            .factory
            .tree
            .as_ref()
            .is_some_and(|tree| tree.children_property.is_some());
        if materialized {
            composer.append(Box::new(MaterializedPathStrategy::new()));
        } else {
            composer.append(Box::new(DirectStrategy::new(self.unique)));
        }
        composer.append(Box::new(UserSortStrategy::new(self.sort.clone())));
        let mut group = GroupStrategy::new(self.group.clone());
        group.set_collapsed(self.collapsed_groups.clone());
        composer.append(Box::new(group));

        if let Some(tree) = &self.tree {
            if !materialized {
                composer.append(Box::new(AdjacencyListStrategy::new()));
            }
            if tree.root_enumerable {
                composer.append(Box::new(RootStrategy::new()));
            }
            if tree.node_header {
                composer.append(Box::new(NodeHeaderStrategy::new()));
            }
            if tree.node_footer {
                composer.append(Box::new(NodeFooterStrategy::new(tree.footer_visibility.clone())));
            }
        }
        composer
    }

    /// Run `f` with the whole strategy stack and its context.
    pub(crate) fn with_chain<T>(
        &mut self,
        f: impl FnOnce(&mut Chain<'_, R>, &mut StrategyContext<'_, R>) -> T,
    ) -> T {
        let mut ctx = StrategyContext {
            arena: &mut self.arena,
            source: self.source.as_ref(),
            factory: &self.factory,
            filter_map: &self.filter_map,
        };
        let mut chain = self.composer.chain();
        f(&mut chain, &mut ctx)
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    /// The source collection.
    pub fn source(&self) -> &Arc<dyn SourceCollection<R>> {
        &self.source
    }

    /// Out-of-band metadata of the source.
    pub fn meta_data(&self) -> MetaData {
        self.source.meta_data()
    }

    /// Number of visible items, group headers excluded with `skip_groups`.
    pub fn count(&self, skip_groups: bool) -> usize {
        if !skip_groups {
            return self.visible.len();
        }
        self.visible
            .iter()
            .filter(|&&id| !self.arena.get(id).is_some_and(DisplayItem::is_group))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Visible item at `index`.
    pub fn at(&self, index: usize) -> Result<ItemId> {
        self.visible
            .get(index)
            .copied()
            .ok_or_else(|| Error::out_of_bounds(index, self.visible.len()))
    }

    /// The item behind `id`.
    pub fn item(&self, id: ItemId) -> Option<&DisplayItem<R>> {
        self.arena.get(id)
    }

    /// The visible item at `index`.
    pub fn item_at(&self, index: usize) -> Result<&DisplayItem<R>> {
        let id = self.at(index)?;
        self.arena.get(id).ok_or(Error::ItemNotFound)
    }

    /// Visible items in display order.
    pub fn items(&self) -> &[ItemId] {
        &self.visible
    }

    /// Items of the result strategy, filtered out ones included.
    pub fn all_items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn filter_map(&self) -> &[Option<bool>] {
        &self.filter_map
    }

    pub fn sort_map(&self) -> &[usize] {
        &self.sort_map
    }

    /// A fresh cursor over the visible items.
    pub fn enumerator(&self) -> Enumerator<'_> {
        Enumerator::new(&self.items, &self.filter_map, &self.sort_map)
    }

    /// Position of a visible item.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.visible.iter().position(|&other| other == id)
    }

    fn is_record(&self, id: ItemId) -> bool {
        self.arena.get(id).is_some_and(|item| item.kind().is_record())
    }

    /// First visible record item.
    pub fn first(&self) -> Option<ItemId> {
        self.visible.iter().copied().find(|&id| self.is_record(id))
    }

    /// Last visible record item.
    pub fn last(&self) -> Option<ItemId> {
        self.visible.iter().rev().copied().find(|&id| self.is_record(id))
    }

    /// Next visible record item after `id`. Group headers are skipped.
    pub fn next(&self, id: ItemId) -> Option<ItemId> {
        let index = self.index_of(id)?;
        self.visible[index + 1..].iter().copied().find(|&id| self.is_record(id))
    }

    /// Previous visible record item before `id`. Group headers are skipped.
    pub fn previous(&self, id: ItemId) -> Option<ItemId> {
        let index = self.index_of(id)?;
        self.visible[..index].iter().rev().copied().find(|&id| self.is_record(id))
    }

    /// Record item whose key is `key`. Drag avatars and the add row are not
    /// considered.
    pub fn item_by_source_key(&self, key: &RecordKey) -> Option<ItemId> {
        self.items.iter().copied().find(|&id| {
            self.arena.get(id).and_then(DisplayItem::as_collection_item).is_some_and(|item| {
                item.key() == Some(key)
                    && !item.is_adding()
                    && !crate::item::Draggable::is_dragged(item)
            })
        })
    }

    /// Visible position of the record at `source_index`.
    pub fn index_by_source_index(&mut self, source_index: usize) -> Option<usize> {
        let id = self.with_chain(|chain, _| chain.item_by_source_index(source_index))?;
        self.index_of(id)
    }

    /// Source index of the visible item at `index`.
    pub fn source_index_by_index(&self, index: usize) -> Option<usize> {
        let record = self.arena.get(*self.visible.get(index)?)?.record()?;
        self.source.index_of(record)
    }

    /// Members of the group `key`, filtered out ones included.
    pub fn group_items(&self, key: &GroupKey) -> Vec<ItemId> {
        let Some(start) = self.items.iter().position(|&id| {
            self.arena
                .get(id)
                .and_then(DisplayItem::as_group)
                .is_some_and(|group| group.key() == key)
        }) else {
            return Vec::new();
        };
        self.items[start + 1..]
            .iter()
            .copied()
            .take_while(|&id| !self.arena.get(id).is_some_and(DisplayItem::is_group))
            .collect()
    }

    /// Key of the group the visible item at `index` belongs to.
    pub fn group_by_index(&self, index: usize) -> Option<GroupKey> {
        let index = index.min(self.visible.len().checked_sub(1)?);
        self.visible[..=index]
            .iter()
            .rev()
            .find_map(|&id| self.arena.get(id).and_then(DisplayItem::as_group))
            .map(|group| group.key().clone())
    }

    /// Monotonic revision of the projection.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Bump the revision without changing content.
    pub fn next_version(&mut self) -> u64 {
        self.version.bump()
    }

    pub fn signals(&self) -> &ProjectionSignals {
        &self.signals
    }

    pub fn key_property(&self) -> Option<&str> {
        self.factory.key_property.as_deref()
    }

    pub fn display_property(&self) -> Option<&str> {
        self.display_property.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn multi_select_visibility(&self) -> MultiSelectVisibility {
        self.multi_select_visibility
    }

    pub fn set_multi_select_visibility(&mut self, visibility: MultiSelectVisibility) {
        if self.multi_select_visibility != visibility {
            self.multi_select_visibility = visibility;
            self.version.bump();
        }
    }

    /// Whether the projection builds a hierarchy.
    pub fn is_tree(&self) -> bool {
        self.tree.is_some()
    }

    // ---------------------------------------------------------------------
    // Windowed iteration
    // ---------------------------------------------------------------------

    /// Install (or remove) the viewport strategy used by [`each`](Self::each).
    pub fn set_viewport(&mut self, viewport: Option<Box<dyn Viewport<R>>>) {
        self.viewport = viewport;
        if let Some(viewport) = &mut self.viewport {
            viewport.reset(self.visible.len());
        }
        self.version.bump();
    }

    pub fn viewport(&self) -> Option<&dyn Viewport<R>> {
        self.viewport.as_deref()
    }

    /// Update the installed viewport of type `V`. Bumps the version when
    /// the window moved.
    pub fn with_viewport<V, T>(&mut self, f: impl FnOnce(&mut V) -> T) -> Option<T>
    where
        V: Viewport<R>,
    {
        let viewport = self.viewport.as_mut()?.as_any_mut().downcast_mut::<V>()?;
        let before = viewport.range();
        let result = f(viewport);
        if viewport.range() != before {
            self.version.bump();
        }
        Some(result)
    }

    /// Move the viewport window to `[start, stop)`. Bumps the version when
    /// the window or a rendered flag changed.
    pub fn set_viewport_range(&mut self, start: usize, stop: usize) {
        if let Some(viewport) = &mut self.viewport {
            if viewport.set_range(start, stop, &self.visible, &mut self.arena) {
                self.version.bump();
            }
        }
    }

    /// Forget items kept rendered outside the viewport window.
    pub fn hide_rendered(&mut self) {
        if let Some(viewport) = &mut self.viewport {
            if viewport.hide_rendered(&self.visible, &mut self.arena) {
                self.version.bump();
            }
        }
    }

    /// Visit visible items with their positions, through the viewport when
    /// one is installed.
    pub fn each(&mut self, mut f: impl FnMut(usize, ItemId, &DisplayItem<R>)) {
        match &mut self.viewport {
            Some(viewport) => viewport.each(&self.visible, &mut self.arena, &mut f),
            None => {
                for (index, &id) in self.visible.iter().enumerate() {
                    if let Some(item) = self.arena.get(id) {
                        f(index, id, item);
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Read-only guards
    // ---------------------------------------------------------------------

    /// Always fails: records are added through the source.
    pub fn add(&mut self, _record: R) -> Result<()> {
        Err(Error::read_only("add"))
    }

    /// Always fails: records are removed through the source.
    pub fn remove(&mut self, _id: ItemId) -> Result<()> {
        Err(Error::read_only("remove"))
    }

    /// Always fails: records are replaced through the source.
    pub fn replace(&mut self, _id: ItemId, _record: R) -> Result<()> {
        Err(Error::read_only("replace"))
    }

    /// Always fails: records are moved through the source.
    pub fn move_item(&mut self, _from: usize, _to: usize) -> Result<()> {
        Err(Error::read_only("move"))
    }

    // ---------------------------------------------------------------------
    // Strategies
    // ---------------------------------------------------------------------

    /// Put a user strategy on top of the stack and rebuild.
    pub fn append_strategy(&mut self, strategy: StrategyBox<R>) {
        self.composer.append(strategy);
        self.in_session(None, |this| this.re_build(false));
    }

    /// Remove the first layer of `kind` and rebuild.
    pub fn remove_strategy(&mut self, kind: &StrategyKind) -> Option<StrategyBox<R>> {
        self.in_session(None, |this| {
            let removed = this.detach_layer(kind)?;
            this.re_build(false);
            Some(removed)
        })
    }

    /// Typed access to a layer.
    pub fn strategy<S: ItemsStrategy<R>>(&self) -> Option<&S> {
        self.composer.get::<S>()
    }

    /// Layer kinds, bottom first.
    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.composer.kinds()
    }

    /// Stages run by the last source change, in order.
    pub fn last_recompute(&self) -> &[RecomputeStage] {
        &self.recompute_log
    }
}

static_assertions::assert_impl_all!(Collection<crate::record::MapRecord>: Send);

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::source::SourceList;

    pub(crate) fn create_test_source(keys: &[&str]) -> Arc<SourceList<MapRecord>> {
        Arc::new(SourceList::new(
            keys.iter().map(|key| MapRecord::new().with("id", *key)).collect(),
        ))
    }

    pub(crate) fn keys(collection: &Collection<MapRecord>) -> Vec<String> {
        collection
            .items()
            .iter()
            .map(|&id| match collection.item(id) {
                Some(DisplayItem::Group(group)) => format!("G({})", group.key()),
                Some(item) => item.key().map(ToString::to_string).unwrap_or_default(),
                None => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_flat_projection() {
        let collection = Collection::builder()
            .source(create_test_source(&["A", "B", "C"]))
            .key_property("id")
            .build()
            .unwrap();
        assert_eq!(keys(&collection), vec!["A", "B", "C"]);
        assert_eq!(collection.count(false), 3);
        assert!(matches!(collection.at(3), Err(Error::IndexOutOfBounds { index: 3, count: 3 })));
    }

    #[test]
    fn test_navigation_skips_groups() {
        let collection = Collection::builder()
            .source(create_test_source(&["A", "B", "C"]))
            .key_property("id")
            .group(|record: &MapRecord, _| {
                if record.get("id").as_str() == Some("B") {
                    GroupKey::from("g2")
                } else {
                    GroupKey::from("g1")
                }
            })
            .build()
            .unwrap();
        assert_eq!(keys(&collection), vec!["G(g1)", "A", "C", "G(g2)", "B"]);

        let c = collection.at(2).unwrap();
        let b = collection.at(4).unwrap();
        assert_eq!(collection.next(c), Some(b));
        assert_eq!(collection.previous(b), Some(c));
        assert_eq!(collection.first(), collection.at(1).ok());
        assert_eq!(collection.group_by_index(4), Some(GroupKey::from("g2")));
        assert_eq!(collection.group_items(&GroupKey::from("g1")).len(), 2);
        assert_eq!(collection.count(true), 3);
    }

    #[test]
    fn test_direct_mutation_is_rejected() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A"]))
            .build()
            .unwrap();
        assert!(matches!(collection.add(MapRecord::new()), Err(Error::ReadOnly { operation: "add" })));
        assert!(matches!(collection.move_item(0, 0), Err(Error::ReadOnly { .. })));
    }

    #[test]
    fn test_source_lookups() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A", "B", "C"]))
            .key_property("id")
            .filter(|record: &MapRecord| record.get("id").as_str() != Some("A"))
            .build()
            .unwrap();
        assert_eq!(collection.index_by_source_index(2), Some(1));
        assert_eq!(collection.index_by_source_index(0), None);
        assert_eq!(collection.source_index_by_index(0), Some(1));
        let b = collection.item_by_source_key(&RecordKey::from("B"));
        assert_eq!(b, collection.at(0).ok());
    }
}
