//! Outward notifications of a projection.

use horizon_display_core::Signal;

use crate::item::ItemId;
use crate::source::ChangeAction;

/// A change of the projection's visible items.
///
/// Indices are positions among visible items. Notifications of one session
/// are emitted in order and each one is valid for the list left by the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionChange {
    pub action: ChangeAction,
    pub new_items: Vec<ItemId>,
    pub new_index: usize,
    pub old_items: Vec<ItemId>,
    pub old_index: usize,
    /// The record property behind a `Change`, when known.
    pub property: Option<String>,
}

/// A move of the current-item cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentChange {
    pub new: Option<ItemId>,
    pub old: Option<ItemId>,
    pub new_position: Option<usize>,
    pub old_position: Option<usize>,
}

/// Signals emitted by a projection.
///
/// Changes of one session are bracketed by `before_change` and
/// `after_change`. Slots run synchronously while the projection is being
/// mutated and must not call back into it.
pub struct ProjectionSignals {
    pub before_change: Signal<()>,
    pub after_change: Signal<()>,
    pub collection_changed: Signal<ProjectionChange>,
    pub current_changed: Signal<CurrentChange>,
}

impl Default for ProjectionSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectionSignals {
    pub fn new() -> Self {
        Self {
            before_change: Signal::new(),
            after_change: Signal::new(),
            collection_changed: Signal::new(),
            current_changed: Signal::new(),
        }
    }

    /// Emit `changes` inside one before/after bracket. Nothing is emitted
    /// for an empty batch.
    pub fn emit_changes(&self, changes: Vec<ProjectionChange>) {
        if changes.is_empty() {
            return;
        }
        self.before_change.emit(());
        for change in changes {
            self.collection_changed.emit(change);
        }
        self.after_change.emit(());
    }
}

impl std::fmt::Debug for ProjectionSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionSignals")
            .field("collection_changed", &self.collection_changed)
            .field("current_changed", &self.current_changed)
            .finish()
    }
}
