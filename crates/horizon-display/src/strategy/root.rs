//! The enumerable tree root.

use std::any::Any;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::ItemId;
use crate::record::Record;

/// Puts the tree's root item in front of the layer below.
///
/// Transparent for flat projections and trees without a root item.
#[derive(Debug, Default)]
pub struct RootStrategy {
    cache: Option<Vec<ItemId>>,
    with_root: bool,
}

impl RootStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure<R: Record>(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let root = ctx.factory.tree.as_ref().and_then(|tree| tree.root);
        let below = source.items(ctx);
        let mut items = Vec::with_capacity(below.len() + 1);
        items.extend(root);
        items.extend_from_slice(below);
        self.with_root = root.is_some();
        self.cache = Some(items);
    }

    fn offset(&self) -> usize {
        usize::from(self.with_root)
    }
}

impl<R: Record> ItemsStrategy<R> for RootStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Root
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
        source.display_index(index, ctx).map(|position| position + self.offset())
    }

    fn collection_index(
        &mut self,
        index: usize,
        mut source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(&mut source, ctx);
        let position = index.checked_sub(self.offset())?;
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
    use super::*;
    use crate::record::MapRecord;
    use crate::strategy::testing::Fixture;
    use crate::strategy::{DirectStrategy, StrategyBox, TreeSettings};

    fn create_test_layers() -> Vec<StrategyBox<MapRecord>> {
        vec![Box::new(DirectStrategy::new(false)), Box::new(RootStrategy::new())]
    }

    #[test]
    fn test_root_leads_the_items() {
        let mut fx = Fixture::new(&["A", "B"]).with_tree(TreeSettings::default());
        let mut layers = create_test_layers();
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["root", "A", "B"]);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).display_index(1, ctx)), Some(2));
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(0, ctx)), None);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(1, ctx)), Some(0));
    }

    #[test]
    fn test_flat_projection_is_untouched() {
        let mut fx = Fixture::new(&["A", "B"]);
        let mut layers = create_test_layers();
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["A", "B"]);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(0, ctx)), Some(0));
    }
}
