//! Hierarchy from parent-key fields.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use horizon_display_core::logging::targets;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, ItemId};
use crate::record::{Record, RecordKey};

/// Orders the layer below depth-first by parent key.
///
/// Each record names its parent through the tree's parent property. Records
/// whose parent is the root key are top-level. Records whose parent cannot
/// be reached from the root are left out. Group headers are placed before
/// the first item of their group.
#[derive(Debug, Default)]
pub struct AdjacencyListStrategy {
    cache: Option<Vec<ItemId>>,
    /// Position in the layer below of each cached item.
    origin: Vec<usize>,
}

impl AdjacencyListStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure<R: Record>(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let items = source.items(ctx).to_vec();
        let Some(tree) = ctx.factory.tree.as_ref() else {
            self.origin = (0..items.len()).collect();
            self.cache = Some(items);
            return;
        };

        let mut children: HashMap<Option<RecordKey>, Vec<usize>> = HashMap::new();
        let mut keys: Vec<Option<RecordKey>> = vec![None; items.len()];
        let mut group_of: Vec<Option<usize>> = vec![None; items.len()];
        let mut current_group = None;
        for (index, &id) in items.iter().enumerate() {
            let Some(item) = ctx.arena.get(id) else {
                continue;
            };
            if item.is_group() {
                current_group = Some(index);
                continue;
            }
            if let Some(record) = item.record() {
                keys[index] = item.key().cloned();
                group_of[index] = current_group;
                children
                    .entry(tree.parent_key_of(record.as_ref()))
                    .or_default()
                    .push(index);
            }
        }

        let mut order = Vec::with_capacity(items.len());
        let mut parents = Vec::with_capacity(items.len());
        let mut visited = vec![false; items.len()];
        let mut emitted_groups = HashSet::new();
        let mut stack: Vec<(usize, Option<ItemId>)> = children
            .get(&tree.root_key)
            .map(|top| top.iter().rev().map(|&index| (index, tree.root)).collect())
            .unwrap_or_default();
        while let Some((index, parent)) = stack.pop() {
            if visited[index] {
                continue;
            }
            visited[index] = true;
            if let Some(group) = group_of[index] {
                if emitted_groups.insert(group) {
                    order.push(group);
                }
            }
            order.push(index);
            parents.push((items[index], parent));
            if let Some(key) = keys[index].clone() {
                if let Some(kids) = children.get(&Some(key)) {
                    stack.extend(kids.iter().rev().map(|&kid| (kid, Some(items[index]))));
                }
            }
        }

        for (id, parent) in parents {
            let has_record_children = ctx
                .arena
                .get(id)
                .and_then(DisplayItem::key)
                .is_some_and(|key| children.get(&Some(key.clone())).is_some_and(|kids| !kids.is_empty()));
            if let Some(item) = ctx.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) {
                item.set_parent(parent);
                item.set_has_children_by_record_set(has_record_children);
            }
        }

        let omitted = items.len() - order.len();
        if omitted > 0 {
            tracing::trace!(target: targets::STRATEGY, omitted, "unreachable tree items left out");
        }
        self.cache = Some(order.iter().map(|&index| items[index]).collect());
        self.origin = order;
    }
}

impl<R: Record> ItemsStrategy<R> for AdjacencyListStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AdjacencyList
    }

    fn items<'s>(&'s mut self, mut source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId] {
        self.ensure(&mut source, ctx);
        self.cache.as_deref().unwrap_or(&[])
    }

    fn display_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        let source_position = source.display_index(index, ctx)?;
        self.ensure(&mut source, ctx);
        self.origin.iter().position(|&origin| origin == source_position)
    }

    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(&mut source, ctx);
        let source_position = *self.origin.get(index)?;
        source.collection_index(source_position, ctx)
    }

    fn invalidate(&mut self, mut source: Chain<'_, R>) {
        self.cache = None;
        source.invalidate();
    }

    fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        self.cache = None;
        self.origin.clear();
        source.reset(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MapRecord, PropertyValue};
    use crate::strategy::testing::Fixture;
    use crate::strategy::{DirectStrategy, StrategyBox, TreeSettings};

    fn node(id: &str, parent: Option<&str>) -> MapRecord {
        MapRecord::new()
            .with("id", id)
            .with("parent", PropertyValue::from(parent))
            .with("node", true)
    }

    fn create_test_fixture(records: Vec<MapRecord>) -> Fixture {
        Fixture::from_records(records).with_tree(TreeSettings {
            parent_property: "parent".into(),
            node_property: Some("node".into()),
            ..TreeSettings::default()
        })
    }

    fn create_test_layers() -> Vec<StrategyBox<MapRecord>> {
        vec![Box::new(DirectStrategy::new(false)), Box::new(AdjacencyListStrategy::new())]
    }

    #[test]
    fn test_depth_first_order_and_parents() {
        let mut fx = create_test_fixture(vec![
            node("2", Some("1")),
            node("1", None),
            node("3", Some("1")),
            node("4", None),
            node("5", Some("2")),
        ]);
        let mut layers = create_test_layers();
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["1", "2", "5", "3", "4"]);

        let root = fx.factory.tree.as_ref().and_then(|t| t.root);
        assert_eq!(fx.arena.parent(items[0]), root);
        assert_eq!(fx.arena.parent(items[1]), Some(items[0]));
        assert_eq!(fx.arena.level(items[2]), 3);
        let has_children = fx
            .arena
            .get(items[0])
            .and_then(DisplayItem::as_tree_item)
            .is_some_and(|t| t.has_children_by_record_set());
        assert!(has_children);
    }

    #[test]
    fn test_orphans_and_cycles_are_left_out() {
        let mut fx = create_test_fixture(vec![
            node("1", None),
            node("2", Some("missing")),
            node("3", Some("4")),
            node("4", Some("3")),
        ]);
        let mut layers = create_test_layers();
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["1"]);
    }

    #[test]
    fn test_index_translation() {
        let mut fx = create_test_fixture(vec![node("2", Some("1")), node("1", None)]);
        let mut layers = create_test_layers();
        let display = fx.with_ctx(|ctx| Chain::new(&mut layers).display_index(0, ctx));
        let back = fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(0, ctx));
        assert_eq!(display, Some(1));
        assert_eq!(back, Some(1));
    }
}
