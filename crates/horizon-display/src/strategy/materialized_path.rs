//! Hierarchy from records nesting their children.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, ItemId};
use crate::record::Record;

/// Bottom layer flattening records and their nested children depth-first.
///
/// Used instead of [`DirectStrategy`](super::DirectStrategy) when the tree
/// reads children from a property of each record. Items are identified by
/// their path of indices: `[i]` for the source record at `i`, `[i, j]` for its
/// `j`-th child, and so on. Only items of length-one paths map back to a
/// source index.
#[derive(Debug, Default)]
pub struct MaterializedPathStrategy {
    by_path: HashMap<Vec<usize>, ItemId>,
    cache: Option<Vec<ItemId>>,
    paths: Vec<Vec<usize>>,
}

impl MaterializedPathStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the item at `index` of this layer.
    pub fn path_at(&self, index: usize) -> Option<&[usize]> {
        self.paths.get(index).map(Vec::as_slice)
    }

    fn ensure<R: Record>(&mut self, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let tree = ctx.factory.tree.as_ref();
        let children_property = tree.and_then(|tree| tree.children_property.clone());
        let infer_nodes = tree.is_some_and(|tree| tree.node_property.is_none());
        let root = tree.and_then(|tree| tree.root);

        let mut stack: Vec<(Vec<usize>, Arc<R>, Option<ItemId>)> = (0..ctx.source.count())
            .rev()
            .filter_map(|index| ctx.source.at(index).map(|record| (vec![index], record, root)))
            .collect();
        let mut cache = Vec::new();
        let mut paths = Vec::new();
        let mut seen = HashSet::new();
        while let Some((path, record, parent)) = stack.pop() {
            let children = children_property
                .as_deref()
                .and_then(|property| record.children(property))
                .unwrap_or_default();

            let id = match self.by_path.get(&path) {
                Some(&id) => {
                    if let Some(item) = ctx.arena.get_mut(id).and_then(DisplayItem::as_collection_item_mut) {
                        item.set_contents(record.clone());
                    }
                    id
                }
                None => {
                    let id = ctx.factory.create(ctx.arena, record.clone());
                    self.by_path.insert(path.clone(), id);
                    id
                }
            };
            if let Some(item) = ctx.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) {
                item.set_parent(parent);
                item.set_has_children_by_record_set(!children.is_empty());
                if infer_nodes {
                    item.set_node((!children.is_empty()).then_some(true));
                }
            }

            for (position, child) in children.into_iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(position);
                stack.push((child_path, child, Some(id)));
            }
            seen.insert(path.clone());
            cache.push(id);
            paths.push(path);
        }

        let arena = &mut *ctx.arena;
        self.by_path.retain(|path, id| {
            let keep = seen.contains(path);
            if !keep {
                arena.detach(*id);
            }
            keep
        });
        self.cache = Some(cache);
        self.paths = paths;
    }

    /// Re-key every path through `remap` applied to its first index. Paths
    /// mapped to `None` are released.
    fn remap_roots<R>(&mut self, ctx: &mut StrategyContext<'_, R>, remap: impl Fn(usize) -> Option<usize>)
    where
        R: Record,
    {
        let mut released = Vec::new();
        let by_path = std::mem::take(&mut self.by_path);
        for (mut path, id) in by_path {
            match remap(path[0]) {
                Some(index) => {
                    path[0] = index;
                    self.by_path.insert(path, id);
                }
                None => released.push(id),
            }
        }
        for id in released {
            ctx.arena.detach(id);
        }
        self.cache = None;
    }
}

impl<R: Record> ItemsStrategy<R> for MaterializedPathStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaterializedPath
    }

    fn items<'s>(&'s mut self, _source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId] {
        self.ensure(ctx);
        self.cache.as_deref().unwrap_or(&[])
    }

    fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        added: &[Arc<R>],
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Vec<ItemId> {
        let released: Vec<ItemId> = self
            .by_path
            .iter()
            .filter(|(path, _)| path[0] >= start && path[0] < start + delete_count)
            .map(|(_, &id)| id)
            .collect();
        let end = start + delete_count;
        let added = added.len();
        self.remap_roots(ctx, |index| {
            if index < start {
                Some(index)
            } else if index < end {
                None
            } else {
                Some(index - delete_count + added)
            }
        });
        released
    }

    fn move_range(
        &mut self,
        from: usize,
        count: usize,
        to: usize,
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) {
        let len = ctx.source.count();
        if count == 0 || from + count > len || to + count > len {
            self.cache = None;
            return;
        }
        let mut order: Vec<usize> = (0..len).collect();
        let moved: Vec<usize> = order.drain(from..from + count).collect();
        order.splice(to..to, moved);
        let mut new_index = vec![0; len];
        for (position, &old) in order.iter().enumerate() {
            new_index[old] = position;
        }
        self.remap_roots(ctx, |index| new_index.get(index).copied());
    }

    fn display_index(
        &mut self,
        index: usize,
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(ctx);
        self.paths.iter().position(|path| path.as_slice() == [index])
    }

    fn collection_index(
        &mut self,
        index: usize,
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(ctx);
        match self.paths.get(index)?.as_slice() {
            [root_index] => Some(*root_index),
            _ => None,
        }
    }

    fn item_by_source_index(&mut self, index: usize, _source: Chain<'_, R>) -> Option<ItemId> {
        self.by_path.get([index].as_slice()).copied()
    }

    fn invalidate(&mut self, _source: Chain<'_, R>) {
        self.cache = None;
    }

    fn reset(&mut self, _source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        for (_, id) in self.by_path.drain() {
            ctx.arena.detach(id);
        }
        self.cache = None;
        self.paths.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
