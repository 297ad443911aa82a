//! Grouping with synthesized group headers.

use std::any::Any;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use horizon_display_core::logging::targets;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, GroupItem, GroupKey, ItemId};
use crate::record::Record;

/// Maps a record and its position to a group key.
pub type GroupFn<R> = Arc<dyn Fn(&R, usize) -> GroupKey + Send + Sync>;

/// Splits the layer below into groups, each led by a header item.
///
/// Groups appear in the order of their first member. Header items are
/// reused by key while the group exists. Without a handler the layer is
/// transparent.
pub struct GroupStrategy<R> {
    handler: Option<GroupFn<R>>,
    collapsed: BTreeSet<GroupKey>,
    headers: HashMap<GroupKey, ItemId>,
    cache: Option<Vec<ItemId>>,
    /// Position in the layer below of each cached item, `None` for headers.
    origin: Vec<Option<usize>>,
}

impl<R: Record> GroupStrategy<R> {
    pub fn new(handler: Option<GroupFn<R>>) -> Self {
        Self {
            handler,
            collapsed: BTreeSet::new(),
            headers: HashMap::new(),
            cache: None,
            origin: Vec::new(),
        }
    }

    pub fn handler(&self) -> Option<&GroupFn<R>> {
        self.handler.as_ref()
    }

    pub fn set_handler(&mut self, handler: Option<GroupFn<R>>) {
        self.handler = handler;
        self.cache = None;
    }

    /// Keys whose header is created collapsed.
    pub fn set_collapsed(&mut self, collapsed: BTreeSet<GroupKey>) {
        self.collapsed = collapsed;
    }

    /// Header of the group `key`, if the group currently exists.
    pub fn header(&self, key: &GroupKey) -> Option<ItemId> {
        self.headers.get(key).copied()
    }

    pub fn is_grouped(&self) -> bool {
        self.handler.is_some()
    }

    fn ensure(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let items = source.items(ctx).to_vec();
        let Some(handler) = self.handler.clone() else {
            self.origin = (0..items.len()).map(Some).collect();
            self.cache = Some(items);
            return;
        };

        let mut buckets: Vec<(GroupKey, Vec<usize>)> = Vec::new();
        let mut last_bucket: Option<usize> = None;
        for (index, &id) in items.iter().enumerate() {
            let key = ctx
                .arena
                .get(id)
                .and_then(DisplayItem::record)
                .map(|record| handler(record.as_ref(), index));
            // Pseudo-items stay with the group of the previous item.
            let key = match (key, last_bucket) {
                (Some(key), _) => key,
                (None, Some(bucket)) => buckets[bucket].0.clone(),
                (None, None) => GroupKey::Hidden,
            };
            let bucket = match buckets.iter().position(|(existing, _)| *existing == key) {
                Some(bucket) => bucket,
                None => {
                    buckets.push((key, Vec::new()));
                    buckets.len() - 1
                }
            };
            buckets[bucket].1.push(index);
            last_bucket = Some(bucket);
        }

        let mut used = HashSet::new();
        let mut cache = Vec::with_capacity(items.len() + buckets.len());
        let mut origin = Vec::with_capacity(items.len() + buckets.len());
        for (key, members) in buckets {
            let header = match self.headers.get(&key) {
                Some(&header) => header,
                None => {
                    let expanded = !self.collapsed.contains(&key);
                    let header = ctx
                        .arena
                        .insert(DisplayItem::Group(GroupItem::new(key.clone(), expanded)));
                    self.headers.insert(key.clone(), header);
                    header
                }
            };
            used.insert(key);
            cache.push(header);
            origin.push(None);
            for index in members {
                cache.push(items[index]);
                origin.push(Some(index));
            }
        }

        let arena = &mut *ctx.arena;
        self.headers.retain(|key, header| {
            let keep = used.contains(key);
            if !keep {
                arena.detach(*header);
            }
            keep
        });
        tracing::trace!(target: targets::STRATEGY, groups = self.headers.len(), "groups rebuilt");

        self.cache = Some(cache);
        self.origin = origin;
    }
}

impl<R: Record> ItemsStrategy<R> for GroupStrategy<R> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Group
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
        self.origin
            .iter()
            .position(|&origin| origin == Some(source_position))
    }

    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(&mut source, ctx);
        let source_position = (*self.origin.get(index)?)?;
        source.collection_index(source_position, ctx)
    }

    fn invalidate(&mut self, mut source: Chain<'_, R>) {
        self.cache = None;
        source.invalidate();
    }

    fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        for (_, header) in self.headers.drain() {
            ctx.arena.detach(header);
        }
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
    use crate::item::Expandable;
    use crate::record::MapRecord;
    use crate::strategy::testing::Fixture;
    use crate::strategy::{DirectStrategy, StrategyBox};

    fn by_group() -> GroupFn<MapRecord> {
        Arc::new(|record: &MapRecord, _: usize| match record.get("group").as_str() {
            Some(group) => GroupKey::from(group),
            None => GroupKey::Hidden,
        })
    }

    fn create_test_fixture() -> Fixture {
        Fixture::from_records(vec![
            MapRecord::new().with("id", "A").with("group", "g1"),
            MapRecord::new().with("id", "B").with("group", "g2"),
            MapRecord::new().with("id", "C").with("group", "g1"),
        ])
    }

    fn create_test_layers(handler: Option<GroupFn<MapRecord>>) -> Vec<StrategyBox<MapRecord>> {
        vec![Box::new(DirectStrategy::new(false)), Box::new(GroupStrategy::new(handler))]
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(Some(by_group()));
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["G(g1)", "A", "C", "G(g2)", "B"]);
    }

    #[test]
    fn test_headers_have_no_collection_index() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(Some(by_group()));
        let header = fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(0, ctx));
        let member = fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(2, ctx));
        let display = fx.with_ctx(|ctx| Chain::new(&mut layers).display_index(1, ctx));
        assert_eq!(header, None);
        assert_eq!(member, Some(2));
        assert_eq!(display, Some(4));
    }

    #[test]
    fn test_headers_are_reused_and_released() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(Some(by_group()));
        let before = fx.items(&mut layers);

        fx.source.remove(1);
        fx.with_ctx(|ctx| Chain::new(&mut layers).splice(1, 1, &[], ctx));
        let after = fx.items(&mut layers);

        assert_eq!(fx.labels(&after), vec!["G(g1)", "A", "C"]);
        assert_eq!(after[0], before[0]);
        assert!(fx.arena.is_detached(before[3]));
    }

    #[test]
    fn test_collapsed_groups_start_collapsed() {
        let mut fx = create_test_fixture();
        let mut group = GroupStrategy::new(Some(by_group()));
        group.set_collapsed(BTreeSet::from([GroupKey::from("g2")]));
        let mut layers: Vec<StrategyBox<MapRecord>> = vec![Box::new(DirectStrategy::new(false)), Box::new(group)];
        let items = fx.items(&mut layers);
        let expanded: Vec<bool> = [0, 3]
            .iter()
            .map(|&i| fx.arena.get(items[i]).and_then(DisplayItem::as_group).is_some_and(|g| g.is_expanded()))
            .collect();
        assert_eq!(expanded, vec![true, false]);
    }

    #[test]
    fn test_without_handler_is_transparent() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(None);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["A", "B", "C"]);
    }
}
