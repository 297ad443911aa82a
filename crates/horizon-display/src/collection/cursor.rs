//! The current-item cursor.

use super::{Collection, CurrentChange};
use crate::error::{Error, Result};
use crate::item::{DisplayItem, ItemId, ItemKind};
use crate::record::Record;

impl<R: Record> Collection<R> {
    /// The current item.
    pub fn current(&self) -> Option<ItemId> {
        self.current
    }

    /// Visible position of the current item.
    pub fn current_position(&self) -> Option<usize> {
        self.current.and_then(|id| self.index_of(id))
    }

    /// Move the cursor to `item`. Returns whether it moved.
    ///
    /// Items that are not visible cannot become current.
    pub fn set_current(&mut self, item: Option<ItemId>) -> bool {
        if item == self.current {
            return false;
        }
        if let Some(id) = item {
            if self.index_of(id).is_none() {
                return false;
            }
        }
        let change = CurrentChange {
            new: item,
            old: self.current,
            new_position: item.and_then(|id| self.index_of(id)),
            old_position: self.current_position(),
        };
        self.current = item;
        tracing::trace!(target: horizon_display_core::logging::targets::COLLECTION, ?change, "current changed");
        self.signals.current_changed.emit(change);
        true
    }

    /// Move the cursor to the visible item at `position`.
    pub fn set_current_position(&mut self, position: usize) -> Result<()> {
        let id = *self
            .visible
            .get(position)
            .ok_or(Error::PositionOutOfBounds { position })?;
        self.set_current(Some(id));
        Ok(())
    }

    /// Step to the next record. Without a current item, starts at the first.
    pub fn move_to_next(&mut self) -> bool {
        let target = match self.current {
            Some(id) => self.next(id),
            None => self.first(),
        };
        target.is_some_and(|id| self.set_current(Some(id)))
    }

    /// Step to the previous record. Without a current item, starts at the last.
    pub fn move_to_previous(&mut self) -> bool {
        let target = match self.current {
            Some(id) => self.previous(id),
            None => self.last(),
        };
        target.is_some_and(|id| self.set_current(Some(id)))
    }

    pub fn move_to_first(&mut self) -> bool {
        self.first().is_some_and(|id| self.set_current(Some(id)))
    }

    pub fn move_to_last(&mut self) -> bool {
        self.last().is_some_and(|id| self.set_current(Some(id)))
    }

    /// Step to the parent of the current tree item.
    pub fn move_to_above(&mut self) -> bool {
        let Some(parent) = self.current.and_then(|id| self.arena.parent(id)) else {
            return false;
        };
        if self.arena.get(parent).is_some_and(|item| item.kind() == ItemKind::Root) {
            return false;
        }
        self.set_current(Some(parent))
    }

    /// Step to the first visible child of the current tree item.
    pub fn move_to_below(&mut self) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let child = self.visible.iter().copied().find(|&id| {
            self.arena
                .get(id)
                .and_then(DisplayItem::as_tree_item)
                .is_some_and(|item| item.parent() == Some(current))
        });
        child.is_some_and(|id| self.set_current(Some(id)))
    }

    /// Drop the current item when it left the projection.
    pub(crate) fn sync_current(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        if self.arena.contains(id) && self.index_of(id).is_some() {
            return;
        }
        self.current = None;
        self.signals.current_changed.emit(CurrentChange {
            new: None,
            old: Some(id),
            new_position: None,
            old_position: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::collection::tests::create_test_source;
    use crate::collection::Collection;
    use crate::error::Error;
    use crate::item::GroupKey;
    use crate::record::{MapRecord, Record};

    #[test]
    fn test_cursor_walks_records() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A", "B"]))
            .key_property("id")
            .group(|record: &MapRecord, _| GroupKey::from(record.get("id").as_str().unwrap_or_default()))
            .build()
            .unwrap();
        let positions = Arc::new(Mutex::new(Vec::new()));
        let sink = positions.clone();
        collection
            .signals()
            .current_changed
            .connect(move |change| sink.lock().push(change.new_position));

        assert!(collection.move_to_next());
        assert_eq!(collection.current_position(), Some(1));
        assert!(collection.move_to_next());
        assert_eq!(collection.current_position(), Some(3));
        assert!(!collection.move_to_next());
        assert!(collection.move_to_first());
        assert_eq!(*positions.lock(), vec![Some(1), Some(3), Some(1)]);
    }

    #[test]
    fn test_set_current_position_bounds() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A"]))
            .key_property("id")
            .build()
            .unwrap();
        assert!(matches!(
            collection.set_current_position(4),
            Err(Error::PositionOutOfBounds { position: 4 })
        ));
        collection.set_current_position(0).unwrap();
        assert_eq!(collection.current(), collection.at(0).ok());
    }

    #[test]
    fn test_current_cleared_when_filtered_out() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A", "B"]))
            .key_property("id")
            .build()
            .unwrap();
        collection.set_current_position(0).unwrap();
        collection.set_filter(Some(|record: &MapRecord| record.get("id").as_str() != Some("A")));
        assert_eq!(collection.current(), None);
    }

    #[test]
    fn test_above_and_below_follow_hierarchy() {
        let source = Arc::new(crate::source::SourceList::new(vec![
            MapRecord::new().with("id", "1").with("node", true),
            MapRecord::new().with("id", "2").with("parent", "1"),
        ]));
        let mut collection = Collection::builder()
            .source(source)
            .key_property("id")
            .node_property("node")
            .expand_all(true)
            .build()
            .unwrap();
        collection.move_to_first();
        assert!(collection.move_to_below());
        assert_eq!(collection.current_position(), Some(1));
        assert!(collection.move_to_above());
        assert_eq!(collection.current_position(), Some(0));
        assert!(!collection.move_to_above());
    }
}
