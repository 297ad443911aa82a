//! Cursor over a projection's visible items.
//!
//! A projection keeps its items in three parallel pieces: the item list, a
//! filter map telling which items passed filtering, and a sort map giving
//! the display order as a permutation of item indices. The [`Enumerator`]
//! walks the items that passed, in display order, and translates between
//! *positions* (index among visible items) and *internal* indices (index in
//! the item list).

use crate::error::{Error, Result};
use crate::item::ItemId;

/// A cursor over the visible items of a projection.
///
/// # Example
///
/// ```
/// use horizon_display::enumerator::Enumerator;
/// # use horizon_display::item::ItemId;
/// # let items = vec![ItemId::default(); 3];
/// let filter_map = [Some(true), Some(false), Some(true)];
/// let sort_map = [2, 1, 0];
/// let mut enumerator = Enumerator::new(&items, &filter_map, &sort_map);
///
/// assert!(enumerator.move_next());
/// assert_eq!(enumerator.internal_index(), Some(2));
/// assert_eq!(enumerator.count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Enumerator<'a> {
    items: &'a [ItemId],
    filter_map: &'a [Option<bool>],
    sort_map: &'a [usize],
    /// Internal indices of the visible items, in display order.
    internal_map: Vec<usize>,
    position: Option<usize>,
}

impl<'a> Enumerator<'a> {
    /// Create a cursor placed before the first visible item.
    ///
    /// An empty sort map stands for the identity order.
    pub fn new(items: &'a [ItemId], filter_map: &'a [Option<bool>], sort_map: &'a [usize]) -> Self {
        let passed = |index: &usize| filter_map.get(*index).copied().flatten() == Some(true);
        let internal_map = if sort_map.is_empty() {
            (0..items.len()).filter(passed).collect()
        } else {
            sort_map
                .iter()
                .copied()
                .filter(|index| *index < items.len())
                .filter(passed)
                .collect()
        };
        Self {
            items,
            filter_map,
            sort_map,
            internal_map,
            position: None,
        }
    }

    /// Number of visible items.
    pub fn count(&self) -> usize {
        self.internal_map.len()
    }

    /// The item under the cursor.
    pub fn current(&self) -> Option<ItemId> {
        self.items.get(self.internal_index()?).copied()
    }

    /// Position of the cursor among visible items.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Internal index of the item under the cursor.
    pub fn internal_index(&self) -> Option<usize> {
        self.internal_map.get(self.position?).copied()
    }

    /// Move the cursor to `position`.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position >= self.internal_map.len() {
            return Err(Error::PositionOutOfBounds { position });
        }
        self.position = Some(position);
        Ok(())
    }

    /// Place the cursor on `item`. Returns `false` if the item is not visible.
    pub fn set_current(&mut self, item: ItemId) -> bool {
        match self.position_of(item) {
            Some(position) => {
                self.position = Some(position);
                true
            }
            None => false,
        }
    }

    /// Advance to the next visible item.
    pub fn move_next(&mut self) -> bool {
        let next = self.position.map_or(0, |position| position + 1);
        if next >= self.internal_map.len() {
            return false;
        }
        self.position = Some(next);
        true
    }

    /// Step back to the previous visible item.
    pub fn move_previous(&mut self) -> bool {
        match self.position {
            Some(position) if position > 0 => {
                self.position = Some(position - 1);
                true
            }
            _ => false,
        }
    }

    /// Place the cursor before the first item.
    pub fn reset(&mut self) {
        self.position = None;
    }

    /// Visible item at `position`.
    pub fn at(&self, position: usize) -> Option<ItemId> {
        self.items.get(*self.internal_map.get(position)?).copied()
    }

    /// Position of a visible item.
    pub fn position_of(&self, item: ItemId) -> Option<usize> {
        self.internal_map
            .iter()
            .position(|&internal| self.items.get(internal) == Some(&item))
    }

    /// Position of the item at internal index `internal`, if it is visible.
    pub fn position_by_internal(&self, internal: usize) -> Option<usize> {
        self.internal_map.iter().position(|&index| index == internal)
    }

    /// Internal index of the visible item at `position`.
    pub fn internal_by_position(&self, position: usize) -> Option<usize> {
        self.internal_map.get(position).copied()
    }

    /// Whether the item at internal index `internal` passed filtering.
    pub fn is_passed(&self, internal: usize) -> bool {
        self.filter_map.get(internal).copied().flatten() == Some(true)
    }

    /// The sort map the cursor was built from.
    pub fn sort_map(&self) -> &'a [usize] {
        self.sort_map
    }

    /// Visible items in display order.
    pub fn to_vec(&self) -> Vec<ItemId> {
        self.internal_map.iter().map(|&index| self.items[index]).collect()
    }
}

impl Iterator for Enumerator<'_> {
    type Item = ItemId;

    fn next(&mut self) -> Option<ItemId> {
        if self.move_next() {
            self.current()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn create_test_items(count: usize) -> Vec<ItemId> {
        let mut keys: SlotMap<ItemId, ()> = SlotMap::with_key();
        (0..count).map(|_| keys.insert(())).collect()
    }

    #[test]
    fn test_walks_passed_items_in_sort_order() {
        let items = create_test_items(4);
        let filter_map = [Some(true), Some(false), Some(true), None];
        let sort_map = [3, 2, 1, 0];
        let visited: Vec<ItemId> = Enumerator::new(&items, &filter_map, &sort_map).collect();
        assert_eq!(visited, vec![items[2], items[0]]);
    }

    #[test]
    fn test_forward_and_backward() {
        let items = create_test_items(3);
        let filter_map = [Some(true); 3];
        let mut enumerator = Enumerator::new(&items, &filter_map, &[]);
        assert_eq!(enumerator.current(), None);
        assert!(!enumerator.move_previous());

        assert!(enumerator.move_next());
        assert!(enumerator.move_next());
        assert_eq!(enumerator.current(), Some(items[1]));
        assert!(enumerator.move_previous());
        assert_eq!(enumerator.position(), Some(0));

        enumerator.reset();
        assert_eq!(enumerator.position(), None);
    }

    #[test]
    fn test_positions() {
        let items = create_test_items(3);
        let filter_map = [Some(true), Some(false), Some(true)];
        let mut enumerator = Enumerator::new(&items, &filter_map, &[]);

        assert_eq!(Enumerator::count(&enumerator), 2);
        assert_eq!(enumerator.position_of(items[2]), Some(1));
        assert_eq!(enumerator.position_of(items[1]), None);
        assert_eq!(enumerator.internal_by_position(1), Some(2));
        assert_eq!(enumerator.position_by_internal(2), Some(1));

        assert!(enumerator.set_position(1).is_ok());
        assert_eq!(enumerator.current(), Some(items[2]));
        assert!(matches!(
            enumerator.set_position(2),
            Err(Error::PositionOutOfBounds { position: 2 })
        ));
        assert!(enumerator.set_current(items[0]));
        assert!(!enumerator.set_current(items[1]));
    }
}
