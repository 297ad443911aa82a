//! Sorting by user comparators.

use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, ItemId};
use crate::record::Record;

/// An item as seen by a sort comparator.
#[derive(Debug)]
pub struct SortItem<'a, R> {
    pub item: ItemId,
    /// The record, for record items.
    pub contents: Option<&'a Arc<R>>,
    /// Position in the layer below.
    pub index: usize,
    pub collection_index: Option<usize>,
}

/// A sort comparator. Comparators are applied in sequence until one of them
/// decides; remaining ties keep the incoming order.
pub type SortFn<R> = Arc<dyn Fn(&SortItem<'_, R>, &SortItem<'_, R>) -> Ordering + Send + Sync>;

/// Wrap a record comparator. Pseudo-items compare equal to everything.
pub fn sort_by_record<R, F>(compare: F) -> SortFn<R>
where
    R: Record,
    F: Fn(&R, &R) -> Ordering + Send + Sync + 'static,
{
    Arc::new(move |a: &SortItem<'_, R>, b: &SortItem<'_, R>| match (a.contents, b.contents) {
        (Some(a), Some(b)) => compare(a, b),
        _ => Ordering::Equal,
    })
}

/// Reorders the layer below with the user comparators.
pub struct UserSortStrategy<R> {
    handlers: Vec<SortFn<R>>,
    cache: Option<Vec<ItemId>>,
    /// Position in the layer below of each cached item.
    order: Vec<usize>,
}

impl<R: Record> UserSortStrategy<R> {
    pub fn new(handlers: Vec<SortFn<R>>) -> Self {
        Self {
            handlers,
            cache: None,
            order: Vec::new(),
        }
    }

    pub fn handlers(&self) -> &[SortFn<R>] {
        &self.handlers
    }

    /// Replace the comparators. The layer must be invalidated afterwards.
    pub fn set_handlers(&mut self, handlers: Vec<SortFn<R>>) {
        self.handlers = handlers;
        self.cache = None;
    }

    fn ensure(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let items = source.items(ctx).to_vec();
        let order: Vec<usize> = if self.handlers.is_empty() {
            (0..items.len()).collect()
        } else {
            let collection_indices: Vec<Option<usize>> = (0..items.len())
                .map(|index| source.collection_index(index, ctx))
                .collect();
            let arena = &*ctx.arena;
            let mut entries: Vec<SortItem<'_, R>> = items
                .iter()
                .enumerate()
                .map(|(index, &item)| SortItem {
                    item,
                    contents: arena.get(item).and_then(DisplayItem::record),
                    index,
                    collection_index: collection_indices[index],
                })
                .collect();
            let handlers = &self.handlers;
            entries.sort_by(|a, b| {
                handlers
                    .iter()
                    .map(|handler| handler(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
            entries.iter().map(|entry| entry.index).collect()
        };
        self.cache = Some(order.iter().map(|&index| items[index]).collect());
        self.order = order;
    }
}

impl<R: Record> ItemsStrategy<R> for UserSortStrategy<R> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UserSort
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
        self.order.iter().position(|&position| position == source_position)
    }

    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(&mut source, ctx);
        let source_position = *self.order.get(index)?;
        source.collection_index(source_position, ctx)
    }

    fn invalidate(&mut self, mut source: Chain<'_, R>) {
        self.cache = None;
        source.invalidate();
    }

    fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        self.cache = None;
        self.order.clear();
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
    use crate::record::MapRecord;
    use crate::strategy::testing::Fixture;
    use crate::strategy::{DirectStrategy, StrategyBox};

    fn by_title() -> SortFn<MapRecord> {
        sort_by_record(|a: &MapRecord, b: &MapRecord| {
            a.get("title").as_str().cmp(&b.get("title").as_str())
        })
    }

    fn create_test_fixture() -> Fixture {
        Fixture::from_records(vec![
            MapRecord::new().with("id", "A").with("title", "b"),
            MapRecord::new().with("id", "B").with("title", "a"),
            MapRecord::new().with("id", "C").with("title", "b"),
            MapRecord::new().with("id", "D").with("title", "a"),
        ])
    }

    fn create_test_layers(handlers: Vec<SortFn<MapRecord>>) -> Vec<StrategyBox<MapRecord>> {
        vec![
            Box::new(DirectStrategy::new(false)),
            Box::new(UserSortStrategy::new(handlers)),
        ]
    }

    #[test]
    fn test_stable_sort() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(vec![by_title()]);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["B", "D", "A", "C"]);

        // Same configuration, same order.
        Chain::new(&mut layers).invalidate();
        assert_eq!(fx.items(&mut layers), items);
    }

    #[test]
    fn test_index_translation() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(vec![by_title()]);
        for source_index in 0..4 {
            let display = fx
                .with_ctx(|ctx| Chain::new(&mut layers).display_index(source_index, ctx))
                .unwrap();
            let back = fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(display, ctx));
            assert_eq!(back, Some(source_index));
        }
    }

    #[test]
    fn test_no_handlers_is_identity() {
        let mut fx = create_test_fixture();
        let mut layers = create_test_layers(Vec::new());
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["A", "B", "C", "D"]);
    }
}
