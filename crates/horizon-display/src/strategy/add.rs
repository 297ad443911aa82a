//! The add-in-place row.

use std::any::Any;

use serde::{Deserialize, Serialize};

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::ItemId;
use crate::record::Record;

/// Where the add-in-place row goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddPosition {
    Top,
    #[default]
    Bottom,
    /// Before the item at this position of the layer below.
    Index(usize),
}

/// Shows one record that is not yet part of the source.
///
/// The item is created and released by the projection; this layer only
/// places it.
#[derive(Debug)]
pub struct AddStrategy {
    item: ItemId,
    position: AddPosition,
    cache: Option<Vec<ItemId>>,
    insert_at: usize,
}

impl AddStrategy {
    pub fn new(item: ItemId, position: AddPosition) -> Self {
        Self {
            item,
            position,
            cache: None,
            insert_at: 0,
        }
    }

    /// The add-in-place item.
    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn position(&self) -> AddPosition {
        self.position
    }

    fn ensure<R: Record>(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let below = source.items(ctx);
        let insert_at = match self.position {
            AddPosition::Top => 0,
            AddPosition::Bottom => below.len(),
            AddPosition::Index(index) => index.min(below.len()),
        };
        let mut items = Vec::with_capacity(below.len() + 1);
        items.extend_from_slice(&below[..insert_at]);
        items.push(self.item);
        items.extend_from_slice(&below[insert_at..]);
        self.insert_at = insert_at;
        self.cache = Some(items);
    }
}

impl<R: Record> ItemsStrategy<R> for AddStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Add
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
        self.ensure(&mut source, ctx);
        let position = source.display_index(index, ctx)?;
        Some(if position >= self.insert_at { position + 1 } else { position })
    }

    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(&mut source, ctx);
        if index == self.insert_at {
            return None;
        }
        let position = if index > self.insert_at { index - 1 } else { index };
        source.collection_index(position, ctx)
    }

    fn invalidate(&mut self, mut source: Chain<'_, R>) {
        self.cache = None;
        source.invalidate();
    }

    fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        self.cache = None;
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
    use std::sync::Arc;

    use super::*;
    use crate::item::{CollectionItem, DisplayItem};
    use crate::record::MapRecord;
    use crate::strategy::testing::Fixture;
    use crate::strategy::{DirectStrategy, StrategyBox};

    fn create_test_layers(fx: &mut Fixture, position: AddPosition) -> Vec<StrategyBox<MapRecord>> {
        let mut adding = CollectionItem::new(Arc::new(MapRecord::new().with("id", "new")), None);
        adding.set_adding(true);
        let item = fx.arena.insert(DisplayItem::Record(adding));
        vec![Box::new(DirectStrategy::new(false)), Box::new(AddStrategy::new(item, position))]
    }

    #[test]
    fn test_positions() {
        let mut fx = Fixture::new(&["A", "B"]);
        for (position, expected) in [
            (AddPosition::Top, vec!["new", "A", "B"]),
            (AddPosition::Bottom, vec!["A", "B", "new"]),
            (AddPosition::Index(1), vec!["A", "new", "B"]),
            (AddPosition::Index(9), vec!["A", "B", "new"]),
        ] {
            let mut layers = create_test_layers(&mut fx, position);
            let items = fx.items(&mut layers);
            assert_eq!(fx.labels(&items), expected, "{position:?}");
        }
    }

    #[test]
    fn test_index_translation_skips_the_row() {
        let mut fx = Fixture::new(&["A", "B"]);
        let mut layers = create_test_layers(&mut fx, AddPosition::Index(1));
        let display: Vec<Option<usize>> = (0..2)
            .map(|i| fx.with_ctx(|ctx| Chain::new(&mut layers).display_index(i, ctx)))
            .collect();
        let collection: Vec<Option<usize>> = (0..3)
            .map(|i| fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(i, ctx)))
            .collect();
        assert_eq!(display, vec![Some(0), Some(2)]);
        assert_eq!(collection, vec![Some(0), None, Some(1)]);
    }
}
