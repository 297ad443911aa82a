//! The items-strategy chain.
//!
//! A projection computes its items through a stack of [`ItemsStrategy`]
//! layers. The bottom layer (Direct or MaterializedPath) wraps the source
//! records, every other layer decorates the layer below it: sorting,
//! grouping, building a hierarchy, inserting pseudo-items. The stack is
//! owned by a [`Composer`].
//!
//! Layers never own the layer below. Instead each call receives the lower
//! part of the stack as a [`Chain`], plus a [`StrategyContext`] giving access
//! to the item arena, the source collection and the item factory.
//!
//! Each layer caches its derived item list until [`ItemsStrategy::invalidate`]
//! is called. [`ItemsStrategy::reset`] also forgets item identities, while
//! [`ItemsStrategy::rebind`] re-reads a replaced source and keeps them.

mod add;
mod adjacency_list;
mod composer;
mod direct;
mod drag;
mod factory;
mod group;
mod materialized_path;
mod node_extra;
mod root;
mod user_sort;

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use add::{AddPosition, AddStrategy};
pub use adjacency_list::AdjacencyListStrategy;
pub use composer::Composer;
pub use direct::DirectStrategy;
pub use drag::{DragPosition, DragStrategy};
pub use factory::{ExpansionState, ItemFactory, TreeSettings};
pub use group::{GroupFn, GroupStrategy};
pub use materialized_path::MaterializedPathStrategy;
pub use node_extra::{FooterVisibilityFn, NodeFooterStrategy, NodeHeaderStrategy};
pub use root::RootStrategy;
pub use user_sort::{sort_by_record, SortFn, SortItem, UserSortStrategy};

use crate::error::{Error, Result};
use crate::item::{ItemArena, ItemId};
use crate::record::Record;
use crate::source::SourceCollection;

/// Identifies a layer of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Direct,
    UserSort,
    Group,
    Add,
    Drag,
    Root,
    AdjacencyList,
    MaterializedPath,
    NodeHeader,
    NodeFooter,
    /// A strategy appended by the owner of the projection.
    Custom(String),
}

/// Shared state a layer may read or update while computing its items.
pub struct StrategyContext<'a, R: Record> {
    pub arena: &'a mut ItemArena<R>,
    pub source: &'a dyn SourceCollection<R>,
    pub factory: &'a ItemFactory,
    /// Filter results of the projection's current items.
    pub filter_map: &'a [Option<bool>],
}

/// Boxed layer.
pub type StrategyBox<R> = Box<dyn ItemsStrategy<R>>;

/// One layer of the items-strategy chain.
///
/// Indices passed to [`display_index`](Self::display_index) are source
/// collection indices; indices returned by it and passed to
/// [`collection_index`](Self::collection_index) are positions in this
/// layer's item list.
pub trait ItemsStrategy<R: Record>: Send + 'static {
    fn kind(&self) -> StrategyKind;

    /// Items produced by this layer.
    fn items<'s>(&'s mut self, source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId];

    fn count(&mut self, source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) -> usize {
        self.items(source, ctx).len()
    }

    /// Item at `index`.
    fn at(&mut self, index: usize, source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) -> Result<ItemId> {
        let items = self.items(source, ctx);
        items
            .get(index)
            .copied()
            .ok_or_else(|| Error::out_of_bounds(index, items.len()))
    }

    /// Apply a source splice. Returns the items that left the projection.
    fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        added: &[Arc<R>],
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Vec<ItemId> {
        self.invalidate(source.reborrow());
        source.splice(start, delete_count, added, ctx)
    }

    /// Apply a source move of `count` records from `from` to `to`.
    fn move_range(
        &mut self,
        from: usize,
        count: usize,
        to: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) {
        self.invalidate(source.reborrow());
        source.move_range(from, count, to, ctx);
    }

    /// Position in this layer of the record at source index `index`.
    fn display_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        let source_position = source.display_index(index, ctx)?;
        let item = source.items(ctx).get(source_position).copied()?;
        self.items(source, ctx).iter().position(|&id| id == item)
    }

    /// Source index of the item at `index` in this layer, if it wraps one.
    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        let item = self.items(source.reborrow(), ctx).get(index).copied()?;
        let source_position = source.items(ctx).iter().position(|&id| id == item)?;
        source.collection_index(source_position, ctx)
    }

    /// Item wrapping the source record at `index`, without materializing.
    fn item_by_source_index(&mut self, index: usize, mut source: Chain<'_, R>) -> Option<ItemId> {
        source.item_by_source_index(index)
    }

    /// Drop derived state. Propagates down the chain.
    fn invalidate(&mut self, source: Chain<'_, R>);

    /// Drop derived state and item identities. Propagates down the chain.
    fn reset(&mut self, source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>);

    /// Re-read a replaced source while keeping the identity of items whose
    /// records are still there. Propagates down the chain.
    fn rebind(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        self.invalidate(source.reborrow());
        source.rebind(ctx);
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The lower part of a strategy stack, seen from one layer.
///
/// An empty chain stands for the raw source collection.
pub struct Chain<'c, R: Record> {
    layers: &'c mut [StrategyBox<R>],
}

impl<'c, R: Record> Chain<'c, R> {
    pub fn new(layers: &'c mut [StrategyBox<R>]) -> Self {
        Self { layers }
    }

    /// Borrow the chain again for a nested call.
    pub fn reborrow(&mut self) -> Chain<'_, R> {
        Chain {
            layers: &mut *self.layers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Items of the top layer. The raw source has none.
    pub fn items(&mut self, ctx: &mut StrategyContext<'_, R>) -> &[ItemId] {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.items(Chain::new(rest), ctx),
            None => &[],
        }
    }

    pub fn count(&mut self, ctx: &mut StrategyContext<'_, R>) -> usize {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.count(Chain::new(rest), ctx),
            None => ctx.source.count(),
        }
    }

    pub fn at(&mut self, index: usize, ctx: &mut StrategyContext<'_, R>) -> Result<ItemId> {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.at(index, Chain::new(rest), ctx),
            None => Err(Error::out_of_bounds(index, 0)),
        }
    }

    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        added: &[Arc<R>],
        ctx: &mut StrategyContext<'_, R>,
    ) -> Vec<ItemId> {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.splice(start, delete_count, added, Chain::new(rest), ctx),
            None => Vec::new(),
        }
    }

    pub fn move_range(&mut self, from: usize, count: usize, to: usize, ctx: &mut StrategyContext<'_, R>) {
        if let Some((top, rest)) = self.layers.split_last_mut() {
            top.move_range(from, count, to, Chain::new(rest), ctx);
        }
    }

    pub fn display_index(&mut self, index: usize, ctx: &mut StrategyContext<'_, R>) -> Option<usize> {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.display_index(index, Chain::new(rest), ctx),
            None => Some(index),
        }
    }

    pub fn collection_index(&mut self, index: usize, ctx: &mut StrategyContext<'_, R>) -> Option<usize> {
        match self.layers.split_last_mut() {
            Some((top, rest)) => top.collection_index(index, Chain::new(rest), ctx),
            None => Some(index),
        }
    }

    pub fn item_by_source_index(&mut self, index: usize) -> Option<ItemId> {
        let (top, rest) = self.layers.split_last_mut()?;
        top.item_by_source_index(index, Chain::new(rest))
    }

    pub fn invalidate(&mut self) {
        if let Some((top, rest)) = self.layers.split_last_mut() {
            top.invalidate(Chain::new(rest));
        }
    }

    pub fn reset(&mut self, ctx: &mut StrategyContext<'_, R>) {
        if let Some((top, rest)) = self.layers.split_last_mut() {
            top.reset(Chain::new(rest), ctx);
        }
    }

    pub fn rebind(&mut self, ctx: &mut StrategyContext<'_, R>) {
        if let Some((top, rest)) = self.layers.split_last_mut() {
            top.rebind(Chain::new(rest), ctx);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::{Chain, ItemFactory, StrategyBox, StrategyContext};
    use crate::item::{DisplayItem, Draggable, ItemArena, ItemId, RootItem};
    use crate::record::{MapRecord, Record};
    use crate::source::{SourceCollection, SourceList};

    /// Arena, source and factory for driving a bare strategy stack.
    pub(crate) struct Fixture {
        pub arena: ItemArena<MapRecord>,
        pub source: SourceList<MapRecord>,
        pub factory: ItemFactory,
        pub filter_map: Vec<Option<bool>>,
    }

    impl Fixture {
        pub fn new(keys: &[&str]) -> Self {
            Self::from_records(keys.iter().map(|key| MapRecord::new().with("id", *key)).collect())
        }

        pub fn from_records(records: Vec<MapRecord>) -> Self {
            Self {
                arena: ItemArena::new(),
                source: SourceList::new(records),
                factory: ItemFactory {
                    key_property: Some("id".into()),
                    tree: None,
                },
                filter_map: Vec::new(),
            }
        }

        /// Switch to tree items with a root item whose key is `None`.
        pub fn with_tree(mut self, settings: super::TreeSettings) -> Self {
            let root = self.arena.insert(DisplayItem::Root(RootItem::new(settings.root_key.clone())));
            self.factory.tree = Some(super::TreeSettings {
                root: Some(root),
                ..settings
            });
            self
        }

        pub fn ctx(&mut self) -> StrategyContext<'_, MapRecord> {
            StrategyContext {
                arena: &mut self.arena,
                source: &self.source,
                factory: &self.factory,
                filter_map: &self.filter_map,
            }
        }

        pub fn with_ctx<T>(&mut self, f: impl FnOnce(&mut StrategyContext<'_, MapRecord>) -> T) -> T {
            let mut ctx = self.ctx();
            f(&mut ctx)
        }

        pub fn items(&mut self, layers: &mut [StrategyBox<MapRecord>]) -> Vec<ItemId> {
            let mut ctx = self.ctx();
            Chain::new(layers).items(&mut ctx).to_vec()
        }

        /// Insert records into the source and return them.
        pub fn insert(&self, index: usize, keys: &[&str]) -> Vec<Arc<MapRecord>> {
            self.source.insert_many(
                index,
                keys.iter().map(|key| MapRecord::new().with("id", *key)).collect(),
            );
            (index..index + keys.len())
                .filter_map(|i| self.source.at(i))
                .collect()
        }

        /// Readable labels: record keys, `G(key)` for groups and
        /// `root`/`header(key)`/`footer(key)` for pseudo-items.
        pub fn labels(&self, items: &[ItemId]) -> Vec<String> {
            items.iter().map(|&id| self.label(id)).collect()
        }

        pub fn label(&self, id: ItemId) -> String {
            match self.arena.get(id) {
                Some(DisplayItem::Group(group)) => format!("G({})", group.key()),
                Some(DisplayItem::Root(_)) => "root".to_string(),
                Some(DisplayItem::NodeHeader(extra)) => format!("header({})", self.label(extra.node())),
                Some(DisplayItem::NodeFooter(extra)) => format!("footer({})", self.label(extra.node())),
                Some(item) => match item.record() {
                    Some(record) if item.as_collection_item().is_some_and(|i| i.is_dragged()) => {
                        format!("avatar({})", record.get("id").as_str().unwrap_or_default())
                    }
                    Some(record) => record.get("id").as_str().unwrap_or_default().to_string(),
                    None => "?".to_string(),
                },
                None => "<gone>".to_string(),
            }
        }
    }
}
