//! Wiring a projection to the signals of its source.
//!
//! The binding holds the projection weakly: dropping the projection turns
//! the slots into no-ops, dropping the binding disconnects them.
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use horizon_display::binding::SourceBinding;
//! use horizon_display::collection::Collection;
//! use horizon_display::record::MapRecord;
//! use horizon_display::source::SourceList;
//!
//! let source = Arc::new(SourceList::new(vec![MapRecord::new().with("id", "A")]));
//! let projection = Arc::new(Mutex::new(
//!     Collection::builder().source(source.clone()).key_property("id").build().unwrap(),
//! ));
//! let _binding = SourceBinding::bind(source.clone(), &projection);
//!
//! source.push(MapRecord::new().with("id", "B"));
//! assert_eq!(projection.lock().count(false), 2);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_display_core::logging::targets;
use horizon_display_core::ConnectionId;

use crate::collection::Collection;
use crate::record::Record;
use crate::source::{CollectionChange, EventRaising, ItemChange, SourceCollection};
use crate::tree::Tree;

/// Something that follows a source collection.
pub trait SourceObserver<R: Record>: Send + 'static {
    fn on_collection_change(&mut self, change: &CollectionChange<R>);
    fn on_item_change(&mut self, change: &ItemChange<R>);
    fn on_event_raising_change(&mut self, raising: EventRaising);
}

impl<R: Record> SourceObserver<R> for Collection<R> {
    fn on_collection_change(&mut self, change: &CollectionChange<R>) {
        Collection::on_collection_change(self, change);
    }

    fn on_item_change(&mut self, change: &ItemChange<R>) {
        Collection::on_item_change(self, change);
    }

    fn on_event_raising_change(&mut self, raising: EventRaising) {
        Collection::on_event_raising_change(self, raising);
    }
}

impl<R: Record> SourceObserver<R> for Tree<R> {
    fn on_collection_change(&mut self, change: &CollectionChange<R>) {
        Collection::on_collection_change(self, change);
    }

    fn on_item_change(&mut self, change: &ItemChange<R>) {
        Collection::on_item_change(self, change);
    }

    fn on_event_raising_change(&mut self, raising: EventRaising) {
        Collection::on_event_raising_change(self, raising);
    }
}

/// Live connections between a source and one projection.
pub struct SourceBinding<R: Record> {
    source: Arc<dyn SourceCollection<R>>,
    collection_changed: Option<ConnectionId>,
    item_changed: Option<ConnectionId>,
    event_raising_changed: Option<ConnectionId>,
}

impl<R: Record> SourceBinding<R> {
    /// Connect `projection` to the signals of `source`.
    ///
    /// Sources without signals are accepted; the binding is then inert.
    pub fn bind<S, P>(source: Arc<S>, projection: &Arc<Mutex<P>>) -> Self
    where
        S: SourceCollection<R> + 'static,
        P: SourceObserver<R>,
    {
        let source: Arc<dyn SourceCollection<R>> = source;
        let mut binding = Self {
            source: source.clone(),
            collection_changed: None,
            item_changed: None,
            event_raising_changed: None,
        };
        let Some(signals) = source.signals() else {
            tracing::debug!(target: targets::SOURCE, "source has no signals, binding is inert");
            return binding;
        };

        let weak: Weak<Mutex<P>> = Arc::downgrade(projection);
        binding.collection_changed = Some(signals.collection_changed.connect(move |change| {
            if let Some(projection) = weak.upgrade() {
                projection.lock().on_collection_change(change);
            }
        }));
        let weak: Weak<Mutex<P>> = Arc::downgrade(projection);
        binding.item_changed = Some(signals.item_changed.connect(move |change| {
            if let Some(projection) = weak.upgrade() {
                projection.lock().on_item_change(change);
            }
        }));
        let weak: Weak<Mutex<P>> = Arc::downgrade(projection);
        binding.event_raising_changed = Some(signals.event_raising_changed.connect(move |raising| {
            if let Some(projection) = weak.upgrade() {
                projection.lock().on_event_raising_change(*raising);
            }
        }));
        tracing::debug!(target: targets::SOURCE, "projection bound to source");
        binding
    }

    /// Whether the slots are connected.
    pub fn is_connected(&self) -> bool {
        self.collection_changed.is_some()
    }

    /// Disconnect now instead of on drop.
    pub fn unbind(&mut self) {
        let Some(signals) = self.source.signals() else {
            return;
        };
        if let Some(id) = self.collection_changed.take() {
            signals.collection_changed.disconnect(id);
        }
        if let Some(id) = self.item_changed.take() {
            signals.item_changed.disconnect(id);
        }
        if let Some(id) = self.event_raising_changed.take() {
            signals.event_raising_changed.disconnect(id);
        }
    }
}

impl<R: Record> Drop for SourceBinding<R> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::{create_test_source, keys};
    use crate::record::MapRecord;

    fn create_test_binding() -> (
        Arc<crate::source::SourceList<MapRecord>>,
        Arc<Mutex<Collection<MapRecord>>>,
        SourceBinding<MapRecord>,
    ) {
        let source = create_test_source(&["A", "B"]);
        let projection = Arc::new(Mutex::new(
            Collection::builder()
                .source(source.clone())
                .key_property("id")
                .build()
                .unwrap(),
        ));
        let binding = SourceBinding::bind(source.clone(), &projection);
        (source, projection, binding)
    }

    #[test]
    fn test_binding_follows_source() {
        let (source, projection, binding) = create_test_binding();
        assert!(binding.is_connected());
        source.remove(0);
        assert_eq!(keys(&projection.lock()), vec!["B"]);
        source.push(MapRecord::new().with("id", "C"));
        assert_eq!(keys(&projection.lock()), vec!["B", "C"]);
    }

    #[test]
    fn test_drop_disconnects() {
        let (source, projection, binding) = create_test_binding();
        assert_eq!(source.signals().collection_changed.connection_count(), 1);
        drop(binding);
        assert_eq!(source.signals().collection_changed.connection_count(), 0);
        source.push(MapRecord::new().with("id", "C"));
        assert_eq!(projection.lock().count(false), 2);
    }

    #[test]
    fn test_dropped_projection_is_ignored() {
        let (source, projection, _binding) = create_test_binding();
        drop(projection);
        source.push(MapRecord::new().with("id", "C"));
        assert_eq!(source.len(), 3);
    }
}
