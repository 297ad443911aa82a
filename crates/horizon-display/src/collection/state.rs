//! Serializable projection state.
//!
//! Handlers (sort, group and filter functions) are not part of the state.
//! The owner keeps them on the live projection and
//! [`restore_state`](Collection::restore_state) links the rebuilt strategies
//! to them again.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use horizon_display_core::logging::targets;

use super::Collection;
use crate::error::{Error, Result};
use crate::item::{DisplayItem, GroupKey};
use crate::record::{Record, RecordKey};
use crate::strategy::{Chain, Composer, StrategyContext, StrategyKind};

/// Snapshot of what a projection shows, without its data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionState {
    /// Strategy layers, bottom to top.
    pub kinds: Vec<StrategyKind>,
    pub root_key: Option<RecordKey>,
    pub root_enumerable: bool,
    pub collapsed_groups: BTreeSet<GroupKey>,
    pub expanded_items: BTreeSet<RecordKey>,
    pub collapsed_items: BTreeSet<RecordKey>,
    pub expand_all: bool,
    pub marked_key: Option<RecordKey>,
}

impl ProjectionState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn has_tree_data(&self) -> bool {
        self.root_key.is_some()
            || self.root_enumerable
            || self.expand_all
            || !self.expanded_items.is_empty()
            || !self.collapsed_items.is_empty()
    }
}

impl<R: Record> Collection<R> {
    /// Capture the current state.
    pub fn state(&self) -> ProjectionState {
        let mut state = ProjectionState {
            kinds: self.composer.kinds(),
            collapsed_groups: self.collapsed_groups.clone(),
            marked_key: self.marked_key.clone(),
            ..ProjectionState::default()
        };
        if let (Some(settings), Some(tree)) = (&self.factory.tree, &self.tree) {
            state.root_key = settings.root_key.clone();
            state.root_enumerable = tree.root_enumerable;
            state.expanded_items = settings.expansion.expanded.clone();
            state.collapsed_items = settings.expansion.collapsed.clone();
            state.expand_all = settings.expansion.expand_all;
        }
        state
    }

    /// Apply a captured state and rebuild.
    ///
    /// Layers this projection already has are reused, so items keep their
    /// identity. Missing standard layers are created around the handlers
    /// installed on this projection. Layers listed in the state that neither
    /// exist nor can be created are skipped, and current layers the state
    /// does not list are released.
    pub fn restore_state(&mut self, state: ProjectionState) -> Result<()> {
        if self.tree.is_none() && state.has_tree_data() {
            return Err(Error::NotATree { operation: "restore_state" });
        }

        self.collapsed_groups = state.collapsed_groups;
        self.marked_key = state.marked_key;
        let root_key = state.root_key;
        if let (Some(settings), Some(tree)) = (self.factory.tree.as_mut(), self.tree.as_mut()) {
            settings.root_key = root_key.clone();
            settings.expansion.expanded = state.expanded_items;
            settings.expansion.collapsed = state.collapsed_items;
            settings.expansion.expand_all = state.expand_all;
            tree.root_enumerable = state.root_enumerable;
            if let Some(DisplayItem::Root(root)) = self.arena.get_mut(tree.root) {
                root.set_key(root_key);
            }
        }

        let mut fresh = self.build_composer();
        let mut current = std::mem::replace(&mut self.composer, Composer::new());
        let mut composer = Composer::new();
        for kind in &state.kinds {
            let fresh_layer = fresh.remove(kind);
            match current.remove(kind).or(fresh_layer) {
                Some(layer) => {
                    composer.append(layer);
                }
                None => tracing::warn!(target: targets::STRATEGY, ?kind, "layer not available, skipped"),
            }
        }
        for kind in fresh.kinds() {
            let fresh_layer = fresh.remove(&kind);
            if let Some(layer) = current.remove(&kind).or(fresh_layer) {
                composer.append(layer);
            }
        }
        self.composer = composer;
        self.release_layers(current);
        if !self.composer.contains(&StrategyKind::Add) {
            self.adding = None;
        }
        if !self.composer.contains(&StrategyKind::Drag) {
            self.drag_target = None;
        }
        tracing::debug!(target: targets::COLLECTION, kinds = ?self.composer.kinds(), "state restored");

        self.recompute_log.clear();
        self.in_session(None, |this| {
            this.apply_collapsed_groups();
            this.re_build(false);
        });
        Ok(())
    }
}

impl<R: Record> Collection<R> {
    /// Detach the items of layers that left the stack.
    fn release_layers(&mut self, mut layers: Composer<R>) {
        let mut ctx = StrategyContext {
            arena: &mut self.arena,
            source: self.source.as_ref(),
            factory: &self.factory,
            filter_map: &self.filter_map,
        };
        for kind in layers.kinds() {
            if let Some(mut layer) = layers.remove(&kind) {
                layer.reset(Chain::new(&mut []), &mut ctx);
                tracing::trace!(target: targets::STRATEGY, ?kind, "layer released");
            }
        }
    }
}
