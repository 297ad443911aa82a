//! Per-item presentation state: selection, marker, hover, editing, the
//! add-in-place row and drag-and-drop.

use std::sync::Arc;

use horizon_display_core::logging::targets;

use super::Collection;
use crate::error::{Error, Result};
use crate::item::{DisplayItem, GroupKey, ItemId};
use crate::record::{Record, RecordKey};
use crate::strategy::{
    AddPosition, AddStrategy, Chain, DragPosition, DragStrategy, StrategyBox, StrategyContext, StrategyKind,
};

impl<R: Record> Collection<R> {
    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Select or deselect `items`.
    pub fn set_selected_items(&mut self, items: &[ItemId], selected: bool) {
        self.in_session(None, |this| {
            for &id in items {
                if let Some(item) = this.arena.get_mut(id).and_then(DisplayItem::selectable_mut) {
                    item.set_selected(Some(selected));
                }
            }
        });
    }

    /// Select or deselect every item, filtered out ones included.
    pub fn set_selected_items_all(&mut self, selected: bool) {
        let items = self.items.clone();
        self.set_selected_items(&items, selected);
    }

    /// Flip the selection of every item. Partially selected items become
    /// selected.
    pub fn invert_selected_items_all(&mut self) {
        self.in_session(None, |this| {
            for &id in &this.items {
                if let Some(item) = this.arena.get_mut(id).and_then(DisplayItem::selectable_mut) {
                    let selected = item.selected() != Some(true);
                    item.set_selected(Some(selected));
                }
            }
        });
    }

    /// Selected items in projection order.
    pub fn selected_items(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .copied()
            .filter(|&id| self.arena.get(id).is_some_and(DisplayItem::is_selected))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Marker, hover and active item
    // ---------------------------------------------------------------------

    /// Mark the items whose key is `key`, unmarking the others.
    pub fn set_marked_key(&mut self, key: Option<RecordKey>) {
        self.marked_key = key;
        self.in_session(None, Self::apply_marker);
    }

    pub fn marked_key(&self) -> Option<&RecordKey> {
        self.marked_key.as_ref()
    }

    /// Sync marker flags with the marked key.
    pub(crate) fn apply_marker(&mut self) {
        for &id in &self.items {
            let Some(item) = self.arena.get_mut(id) else {
                continue;
            };
            let marked = self.marked_key.is_some() && item.key() == self.marked_key.as_ref();
            if let Some(markable) = item.markable_mut() {
                markable.set_marked(marked);
            }
        }
    }

    /// Move the hover to `item`.
    pub fn set_hovered_item(&mut self, item: Option<ItemId>) {
        let previous = std::mem::replace(&mut self.hovered, item);
        if previous == item {
            return;
        }
        self.in_session(None, |this| {
            for (id, value) in [(previous, false), (item, true)] {
                let Some(id) = id else {
                    continue;
                };
                if let Some(hoverable) = this.arena.get_mut(id).and_then(DisplayItem::hoverable_mut) {
                    hoverable.set_hovered(value);
                }
            }
        });
    }

    pub fn hovered_item(&self) -> Option<ItemId> {
        self.hovered
    }

    /// Show the item actions of `item`.
    pub fn set_active_item(&mut self, item: Option<ItemId>) {
        let previous = std::mem::replace(&mut self.active, item);
        if previous == item {
            return;
        }
        self.in_session(None, |this| {
            for (id, value) in [(previous, false), (item, true)] {
                let Some(id) = id else {
                    continue;
                };
                if let Some(hoverable) = this.arena.get_mut(id).and_then(DisplayItem::hoverable_mut) {
                    hoverable.set_active(value);
                }
            }
        });
    }

    pub fn active_item(&self) -> Option<ItemId> {
        self.active
    }

    // ---------------------------------------------------------------------
    // Editing and pinning
    // ---------------------------------------------------------------------

    /// Start or stop editing `item` with the shadow record `contents`.
    pub fn set_editing(&mut self, item: ItemId, editing: bool, contents: Option<Arc<R>>) -> Result<bool> {
        if !self.arena.contains(item) {
            return Err(Error::ItemNotFound);
        }
        Ok(self.in_session(None, |this| {
            this.arena
                .get_mut(item)
                .and_then(DisplayItem::editable_mut)
                .is_some_and(|editable| editable.set_editing(editing, contents))
        }))
    }

    /// Whether some item is being edited.
    pub fn is_editing(&self) -> bool {
        self.items
            .iter()
            .any(|&id| self.arena.get(id).is_some_and(DisplayItem::is_editing))
    }

    /// Pin `item` so windowed iteration always visits it.
    pub fn set_pinned(&mut self, item: ItemId, pinned: bool) -> Result<bool> {
        if !self.arena.contains(item) {
            return Err(Error::ItemNotFound);
        }
        Ok(self.in_session(None, |this| {
            this.arena
                .get_mut(item)
                .and_then(DisplayItem::as_collection_item_mut)
                .is_some_and(|base| base.set_pinned(pinned))
        }))
    }

    /// Collapse or expand the group `key`.
    pub fn toggle_group_expanded(&mut self, key: &GroupKey) {
        let mut collapsed = self.collapsed_groups.clone();
        if !collapsed.remove(key) {
            collapsed.insert(key.clone());
        }
        self.set_collapsed_groups(collapsed);
    }

    // ---------------------------------------------------------------------
    // Layer plumbing
    // ---------------------------------------------------------------------

    /// Re-derive the item list after the stack changed.
    pub(crate) fn restack(&mut self) {
        self.composer.chain().invalidate();
        self.re_index();
        self.re_filter(None);
    }

    /// Remove the first layer of `kind` and let it release its items.
    pub(crate) fn detach_layer(&mut self, kind: &StrategyKind) -> Option<StrategyBox<R>> {
        let mut layer = self.composer.remove(kind)?;
        let mut ctx = StrategyContext {
            arena: &mut self.arena,
            source: self.source.as_ref(),
            factory: &self.factory,
            filter_map: &self.filter_map,
        };
        layer.reset(Chain::new(&mut []), &mut ctx);
        Some(layer)
    }

    // ---------------------------------------------------------------------
    // Add-in-place row
    // ---------------------------------------------------------------------

    /// Show `record` as a row being added. Replaces a previous one.
    pub fn set_adding_item(&mut self, record: R, position: AddPosition) -> ItemId {
        self.in_session(None, |this| {
            this.release_adding_item();
            let id = this.factory.create(&mut this.arena, Arc::new(record));
            let root = this.factory.tree.as_ref().and_then(|tree| tree.root);
            if let Some(item) = this.arena.get_mut(id) {
                if let Some(base) = item.as_collection_item_mut() {
                    base.set_adding(true);
                }
                if let Some(node) = item.as_tree_item_mut() {
                    node.set_parent(root);
                }
            }
            let layer: StrategyBox<R> = Box::new(AddStrategy::new(id, position));
            if this.composer.contains(&StrategyKind::Group) {
                this.composer.insert_before(&StrategyKind::Group, layer);
            } else {
                this.composer.append(layer);
            }
            this.adding = Some(id);
            this.restack();
            tracing::debug!(target: targets::COLLECTION, ?position, "adding item shown");
            id
        })
    }

    /// Drop the row being added.
    pub fn reset_adding_item(&mut self) {
        if self.adding.is_none() {
            return;
        }
        self.in_session(None, |this| {
            this.release_adding_item();
            this.restack();
        });
    }

    fn release_adding_item(&mut self) {
        if let Some(id) = self.adding.take() {
            self.detach_layer(&StrategyKind::Add);
            self.arena.detach(id);
        }
    }

    pub fn adding_item(&self) -> Option<ItemId> {
        self.adding
    }

    // ---------------------------------------------------------------------
    // Drag and drop
    // ---------------------------------------------------------------------

    /// Start dragging the records `keys`. `draggable` is the item the drag
    /// started from; its avatar replaces the dragged rows.
    pub fn set_dragged_items(&mut self, draggable: Option<ItemId>, keys: Vec<RecordKey>) {
        self.in_session(None, |this| {
            this.release_drag();
            let start_index = draggable
                .and_then(|id| this.items.iter().position(|&other| other == id))
                .unwrap_or(0);
            tracing::debug!(target: targets::COLLECTION, dragged = keys.len(), start_index, "drag started");
            this.composer
                .append(Box::new(DragStrategy::new(keys, draggable, start_index)));
            this.restack();
        });
    }

    /// Move the avatar to `index` of the visible items.
    ///
    /// In a tree, [`DragPosition::On`] targets the node at `index` instead of
    /// moving the avatar.
    pub fn set_drag_position(&mut self, index: usize, position: DragPosition) {
        if !self.composer.contains(&StrategyKind::Drag) {
            return;
        }
        let target_node = (self.tree.is_some() && position == DragPosition::On)
            .then(|| self.visible.get(index).copied())
            .flatten();
        self.in_session(None, |this| {
            this.set_drag_target(target_node);
            if target_node.is_some() {
                return;
            }
            if let Some(drag) = this.composer.get_mut::<DragStrategy>() {
                drag.set_position(index, position);
            }
            this.restack();
        });
    }

    fn set_drag_target(&mut self, target: Option<ItemId>) {
        if self.drag_target == target {
            return;
        }
        for (id, value) in [(self.drag_target, false), (target, true)] {
            let Some(id) = id else {
                continue;
            };
            if let Some(node) = self.arena.get_mut(id).and_then(DisplayItem::as_tree_item_mut) {
                node.set_drag_target_node(value);
            }
        }
        self.drag_target = target;
    }

    /// The node a tree drag currently targets.
    pub fn drag_target_node(&self) -> Option<ItemId> {
        self.drag_target
    }

    /// End the drag and restore the dragged rows.
    pub fn reset_dragged_items(&mut self) {
        if !self.composer.contains(&StrategyKind::Drag) {
            return;
        }
        self.in_session(None, |this| {
            this.release_drag();
            this.restack();
        });
    }

    fn release_drag(&mut self) {
        self.set_drag_target(None);
        if self.detach_layer(&StrategyKind::Drag).is_some() {
            tracing::debug!(target: targets::COLLECTION, "drag ended");
        }
    }

    /// The avatar standing for the dragged rows.
    pub fn drag_avatar(&self) -> Option<ItemId> {
        self.composer.get::<DragStrategy>()?.avatar()
    }

    /// Keys of the dragged records.
    pub fn dragged_keys(&self) -> &[RecordKey] {
        self.composer
            .get::<DragStrategy>()
            .map(DragStrategy::dragged_keys)
            .unwrap_or_default()
    }
}
