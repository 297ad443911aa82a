//! Source collections consumed by projections.
//!
//! A projection reads its records through [`SourceCollection`] and listens
//! to the change notifications described by [`SourceSignals`]. The engine
//! never mutates a source.
//!
//! [`SourceList<R>`] is the observable in-memory list shipped with the crate.
//! Every mutation method emits exactly one [`CollectionChange`] after the
//! list has been updated, so handlers may read the list freely.
//!
//! # Example
//!
//! ```
//! use horizon_display::record::MapRecord;
//! use horizon_display::source::{ChangeAction, SourceList};
//!
//! let list = SourceList::new(vec![MapRecord::new().with("id", 1)]);
//! list.signals().collection_changed.connect(|change| {
//!     assert_eq!(change.action, ChangeAction::Add);
//! });
//! list.push(MapRecord::new().with("id", 2));
//! assert_eq!(list.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use horizon_display_core::logging::targets;
use horizon_display_core::Signal;
use parking_lot::RwLock;

use crate::record::{PropertyValue, Record};

/// The kind of structural change reported by a source collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// The whole content was replaced.
    Reset,
    /// Records were inserted.
    Add,
    /// Records were removed.
    Remove,
    /// Records were replaced in place.
    Replace,
    /// Records moved to another index.
    Move,
    /// Records changed without moving.
    Change,
}

/// A structural change notification from a source collection.
#[derive(Debug)]
pub struct CollectionChange<R> {
    /// What happened.
    pub action: ChangeAction,
    /// Records that appeared (or were changed).
    pub new_items: Vec<Arc<R>>,
    /// Index of the first new record.
    pub new_index: usize,
    /// Records that disappeared (or were replaced).
    pub old_items: Vec<Arc<R>>,
    /// Index of the first old record.
    pub old_index: usize,
}

impl<R> Clone for CollectionChange<R> {
    fn clone(&self) -> Self {
        Self {
            action: self.action,
            new_items: self.new_items.clone(),
            new_index: self.new_index,
            old_items: self.old_items.clone(),
            old_index: self.old_index,
        }
    }
}

impl<R> CollectionChange<R> {
    /// Build a change notification.
    pub fn new(
        action: ChangeAction,
        new_items: Vec<Arc<R>>,
        new_index: usize,
        old_items: Vec<Arc<R>>,
        old_index: usize,
    ) -> Self {
        Self {
            action,
            new_items,
            new_index,
            old_items,
            old_index,
        }
    }
}

/// A per-record property change notification.
#[derive(Debug)]
pub struct ItemChange<R> {
    /// The record after the change.
    pub item: Arc<R>,
    /// Index of the record in the source.
    pub index: usize,
    /// Names of the changed properties.
    pub properties: Vec<String>,
}

impl<R> Clone for ItemChange<R> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            index: self.index,
            properties: self.properties.clone(),
        }
    }
}

/// Event raising mode switch of a source collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRaising {
    /// Whether change notifications are raised.
    pub enabled: bool,
    /// Whether changes made while disabled are analysed on re-enable.
    pub analyze: bool,
}

/// Signals emitted by an observable source collection.
pub struct SourceSignals<R> {
    /// Structural changes.
    pub collection_changed: Signal<CollectionChange<R>>,
    /// Per-record property changes.
    pub item_changed: Signal<ItemChange<R>>,
    /// Event raising mode switches.
    pub event_raising_changed: Signal<EventRaising>,
}

impl<R> Default for SourceSignals<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SourceSignals<R> {
    /// Create a new set of signals.
    pub fn new() -> Self {
        Self {
            collection_changed: Signal::new(),
            item_changed: Signal::new(),
            event_raising_changed: Signal::new(),
        }
    }
}

/// Out-of-band summary payload of a source (totals, paging info).
pub type MetaData = BTreeMap<String, PropertyValue>;

/// The read contract a projection needs from its source.
pub trait SourceCollection<R: Record>: Send + Sync {
    /// Number of records.
    fn count(&self) -> usize;

    /// Record at `index`.
    fn at(&self, index: usize) -> Option<Arc<R>>;

    /// Index of a record by identity.
    fn index_of(&self, record: &Arc<R>) -> Option<usize> {
        (0..self.count()).find(|&i| self.at(i).is_some_and(|r| Arc::ptr_eq(&r, record)))
    }

    /// Out-of-band metadata.
    fn meta_data(&self) -> MetaData {
        MetaData::new()
    }

    /// Whether the source currently raises change notifications.
    fn is_event_raising(&self) -> bool {
        true
    }

    /// Change notifications, for observable sources.
    fn signals(&self) -> Option<&SourceSignals<R>> {
        None
    }
}

/// An observable list of records.
pub struct SourceList<R> {
    items: RwLock<Vec<Arc<R>>>,
    meta_data: RwLock<MetaData>,
    event_raising: AtomicBool,
    dirty: AtomicBool,
    signals: SourceSignals<R>,
}

impl<R: Record> SourceList<R> {
    /// Create a list from owned records.
    pub fn new(items: Vec<R>) -> Self {
        Self::from_shared(items.into_iter().map(Arc::new).collect())
    }

    /// Create a list from shared records.
    pub fn from_shared(items: Vec<Arc<R>>) -> Self {
        Self {
            items: RwLock::new(items),
            meta_data: RwLock::new(MetaData::new()),
            event_raising: AtomicBool::new(true),
            dirty: AtomicBool::new(false),
            signals: SourceSignals::new(),
        }
    }

    /// Create an empty list.
    pub fn empty() -> Self {
        Self::from_shared(Vec::new())
    }

    /// The list's signals.
    pub fn signals(&self) -> &SourceSignals<R> {
        &self.signals
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<Arc<R>> {
        self.items.read().clone()
    }

    /// Append a record.
    pub fn push(&self, item: R) {
        let index = self.len();
        self.insert(index, item);
    }

    /// Insert a record at `index` (clamped to the length).
    pub fn insert(&self, index: usize, item: R) {
        self.insert_many(index, vec![item]);
    }

    /// Insert several records starting at `index` (clamped to the length).
    pub fn insert_many(&self, index: usize, items: Vec<R>) {
        if items.is_empty() {
            return;
        }
        let added: Vec<Arc<R>> = items.into_iter().map(Arc::new).collect();
        let index = {
            let mut list = self.items.write();
            let index = index.min(list.len());
            list.splice(index..index, added.iter().cloned());
            index
        };
        self.notify(CollectionChange::new(ChangeAction::Add, added, index, Vec::new(), 0));
    }

    /// Remove the record at `index`.
    pub fn remove(&self, index: usize) -> Option<Arc<R>> {
        self.remove_range(index, 1).into_iter().next()
    }

    /// Remove `count` records starting at `index`.
    pub fn remove_range(&self, index: usize, count: usize) -> Vec<Arc<R>> {
        let removed: Vec<Arc<R>> = {
            let mut list = self.items.write();
            if index >= list.len() || count == 0 {
                return Vec::new();
            }
            let end = (index + count).min(list.len());
            list.drain(index..end).collect()
        };
        self.notify(CollectionChange::new(
            ChangeAction::Remove,
            Vec::new(),
            0,
            removed.clone(),
            index,
        ));
        removed
    }

    /// Replace the record at `index`, returning the previous one.
    pub fn replace(&self, index: usize, item: R) -> Option<Arc<R>> {
        let new_item = Arc::new(item);
        let old = {
            let mut list = self.items.write();
            let slot = list.get_mut(index)?;
            std::mem::replace(slot, new_item.clone())
        };
        self.notify(CollectionChange::new(
            ChangeAction::Replace,
            vec![new_item],
            index,
            vec![old.clone()],
            index,
        ));
        Some(old)
    }

    /// Move the record at `from` to `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let moved = {
            let mut list = self.items.write();
            if from >= list.len() || to >= list.len() || from == to {
                return false;
            }
            let item = list.remove(from);
            list.insert(to, item.clone());
            item
        };
        self.notify(CollectionChange::new(
            ChangeAction::Move,
            vec![moved.clone()],
            to,
            vec![moved],
            from,
        ));
        true
    }

    /// Replace the whole content.
    pub fn set_items(&self, items: Vec<R>) {
        let new_items: Vec<Arc<R>> = items.into_iter().map(Arc::new).collect();
        let old_items = std::mem::replace(&mut *self.items.write(), new_items.clone());
        self.notify(CollectionChange::new(ChangeAction::Reset, new_items, 0, old_items, 0));
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.set_items(Vec::new());
    }

    /// Report that properties of the record at `index` changed.
    pub fn notify_item_change(&self, index: usize, properties: &[&str]) {
        let Some(item) = self.items.read().get(index).cloned() else {
            return;
        };
        self.signals.item_changed.emit(ItemChange {
            item,
            index,
            properties: properties.iter().map(|p| p.to_string()).collect(),
        });
    }

    /// Set the out-of-band metadata.
    pub fn set_meta_data(&self, meta_data: MetaData) {
        *self.meta_data.write() = meta_data;
    }

    /// Switch change notifications on or off.
    ///
    /// While disabled, structural changes are applied silently. Re-enabling
    /// with `analyze` reports them as a single reset.
    pub fn set_event_raising(&self, enabled: bool, analyze: bool) {
        let was_enabled = self.event_raising.swap(enabled, Ordering::SeqCst);
        if was_enabled == enabled {
            return;
        }
        tracing::debug!(target: targets::SOURCE, enabled, analyze, "source event raising changed");

        if enabled && analyze && self.dirty.swap(false, Ordering::SeqCst) {
            let items = self.records();
            self.signals.collection_changed.emit(CollectionChange::new(
                ChangeAction::Reset,
                items,
                0,
                Vec::new(),
                0,
            ));
        }
        if enabled {
            self.dirty.store(false, Ordering::SeqCst);
        }
        self.signals
            .event_raising_changed
            .emit(EventRaising { enabled, analyze });
    }

    fn notify(&self, change: CollectionChange<R>) {
        if !self.event_raising.load(Ordering::SeqCst) {
            self.dirty.store(true, Ordering::SeqCst);
            return;
        }
        tracing::trace!(
            target: targets::SOURCE,
            action = ?change.action,
            new_index = change.new_index,
            old_index = change.old_index,
            "source collection changed"
        );
        self.signals.collection_changed.emit(change);
    }
}

impl<R: Record + Clone> SourceList<R> {
    /// Edit the record at `index` in place and report the changed properties.
    pub fn update<F>(&self, index: usize, properties: &[&str], f: F) -> bool
    where
        F: FnOnce(&mut R),
    {
        {
            let mut list = self.items.write();
            let Some(slot) = list.get_mut(index) else {
                return false;
            };
            f(Arc::make_mut(slot));
        }
        self.notify_item_change(index, properties);
        true
    }
}

impl<R: Record> SourceCollection<R> for SourceList<R> {
    fn count(&self) -> usize {
        self.len()
    }

    fn at(&self, index: usize) -> Option<Arc<R>> {
        self.items.read().get(index).cloned()
    }

    fn index_of(&self, record: &Arc<R>) -> Option<usize> {
        self.items.read().iter().position(|r| Arc::ptr_eq(r, record))
    }

    fn meta_data(&self) -> MetaData {
        self.meta_data.read().clone()
    }

    fn is_event_raising(&self) -> bool {
        self.event_raising.load(Ordering::SeqCst)
    }

    fn signals(&self) -> Option<&SourceSignals<R>> {
        Some(&self.signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use parking_lot::Mutex;

    fn create_test_list() -> SourceList<MapRecord> {
        SourceList::new(
            ["A", "B", "C"]
                .into_iter()
                .map(|name| MapRecord::new().with("id", name))
                .collect(),
        )
    }

    fn ids(list: &SourceList<MapRecord>) -> Vec<String> {
        list.records()
            .iter()
            .map(|r| r.get("id").as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn record_actions(list: &SourceList<MapRecord>) -> Arc<Mutex<Vec<(ChangeAction, usize, usize)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        list.signals().collection_changed.connect(move |change| {
            seen_clone
                .lock()
                .push((change.action, change.new_index, change.old_index));
        });
        seen
    }

    #[test]
    fn test_mutations_emit_one_change_each() {
        let list = create_test_list();
        let seen = record_actions(&list);

        list.push(MapRecord::new().with("id", "D"));
        list.remove(0);
        list.move_item(0, 2);
        list.replace(1, MapRecord::new().with("id", "X"));

        assert_eq!(ids(&list), vec!["C", "X", "B"]);
        assert_eq!(
            *seen.lock(),
            vec![
                (ChangeAction::Add, 3, 0),
                (ChangeAction::Remove, 0, 0),
                (ChangeAction::Move, 2, 0),
                (ChangeAction::Replace, 1, 1),
            ]
        );
    }

    #[test]
    fn test_invalid_indices_are_ignored() {
        let list = create_test_list();
        let seen = record_actions(&list);

        assert!(list.remove(10).is_none());
        assert!(!list.move_item(0, 9));
        assert!(list.replace(5, MapRecord::new()).is_none());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_disabled_event_raising_flushes_as_reset() {
        let list = create_test_list();
        let seen = record_actions(&list);

        list.set_event_raising(false, true);
        list.push(MapRecord::new().with("id", "D"));
        list.remove(0);
        assert!(seen.lock().is_empty());

        list.set_event_raising(true, true);
        assert_eq!(*seen.lock(), vec![(ChangeAction::Reset, 0, 0)]);
        assert_eq!(ids(&list), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_update_reports_properties() {
        let list = create_test_list();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        list.signals().item_changed.connect(move |change| {
            seen_clone.lock().push((change.index, change.properties.clone()));
        });

        assert!(list.update(1, &["title"], |r| r.set("title", "changed")));
        assert_eq!(*seen.lock(), vec![(1, vec!["title".to_string()])]);
        assert_eq!(list.at(1).unwrap().get("title").as_str(), Some("changed"));
    }
}
