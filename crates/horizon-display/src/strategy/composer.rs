//! Ordered stack of strategies.

use std::fmt;

use super::{Chain, ItemsStrategy, StrategyBox, StrategyKind};
use crate::record::Record;

/// Owner of a projection's strategy stack.
///
/// The first layer is the bottom of the chain, the last one produces the
/// projection's items.
pub struct Composer<R: Record> {
    layers: Vec<StrategyBox<R>>,
}

impl<R: Record> Default for Composer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> fmt::Debug for Composer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer").field("kinds", &self.kinds()).finish()
    }
}

impl<R: Record> Composer<R> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Put a layer on top.
    pub fn append(&mut self, strategy: StrategyBox<R>) -> &mut Self {
        self.layers.push(strategy);
        self
    }

    /// Put a layer at the bottom.
    pub fn prepend(&mut self, strategy: StrategyBox<R>) -> &mut Self {
        self.layers.insert(0, strategy);
        self
    }

    /// Insert a layer right below the first layer of `kind`, or on top if
    /// there is none.
    pub fn insert_before(&mut self, kind: &StrategyKind, strategy: StrategyBox<R>) -> &mut Self {
        match self.position(kind) {
            Some(index) => self.layers.insert(index, strategy),
            None => self.layers.push(strategy),
        }
        self
    }

    /// Remove the first layer of `kind`.
    pub fn remove(&mut self, kind: &StrategyKind) -> Option<StrategyBox<R>> {
        let index = self.position(kind)?;
        Some(self.layers.remove(index))
    }

    pub fn position(&self, kind: &StrategyKind) -> Option<usize> {
        self.layers.iter().position(|layer| layer.kind() == *kind)
    }

    pub fn contains(&self, kind: &StrategyKind) -> bool {
        self.position(kind).is_some()
    }

    /// Layer kinds, bottom first.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.layers.iter().map(|layer| layer.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The whole stack as a chain. Its top layer is the result strategy.
    pub fn chain(&mut self) -> Chain<'_, R> {
        Chain::new(&mut self.layers)
    }

    /// The stack below the first layer of `kind`, and that layer.
    pub fn split_at_kind(
        &mut self,
        kind: &StrategyKind,
    ) -> Option<(&mut StrategyBox<R>, Chain<'_, R>)> {
        let index = self.position(kind)?;
        let (below, rest) = self.layers.split_at_mut(index);
        let layer = rest.first_mut()?;
        Some((layer, Chain::new(below)))
    }

    /// Typed access to the first layer of type `S`.
    pub fn get<S: ItemsStrategy<R>>(&self) -> Option<&S> {
        self.layers
            .iter()
            .find_map(|layer| layer.as_any().downcast_ref::<S>())
    }

    pub fn get_mut<S: ItemsStrategy<R>>(&mut self) -> Option<&mut S> {
        self.layers
            .iter_mut()
            .find_map(|layer| layer.as_any_mut().downcast_mut::<S>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::strategy::{DirectStrategy, GroupStrategy, RootStrategy, UserSortStrategy};

    fn create_test_composer() -> Composer<MapRecord> {
        let mut composer = Composer::new();
        composer
            .append(Box::new(DirectStrategy::new(false)))
            .append(Box::new(UserSortStrategy::<MapRecord>::new(Vec::new())))
            .append(Box::new(GroupStrategy::<MapRecord>::new(None)));
        composer
    }

    #[test]
    fn test_layer_order() {
        let mut composer = create_test_composer();
        composer.append(Box::new(RootStrategy::new()));
        assert_eq!(
            composer.kinds(),
            vec![
                StrategyKind::Direct,
                StrategyKind::UserSort,
                StrategyKind::Group,
                StrategyKind::Root
            ]
        );

        assert!(composer.remove(&StrategyKind::Direct).is_some());
        assert_eq!(composer.position(&StrategyKind::UserSort), Some(0));
        assert!(composer.remove(&StrategyKind::Direct).is_none());
    }

    #[test]
    fn test_typed_lookup() {
        let mut composer = create_test_composer();
        assert!(composer.get::<GroupStrategy<MapRecord>>().is_some());
        assert!(composer.get_mut::<RootStrategy>().is_none());
        assert!(composer.contains(&StrategyKind::UserSort));
    }
}
