//! Source change handling and the group, sort and filter stages.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use horizon_display_core::logging::{span_names, targets};
use horizon_display_core::PerfSpan;

use super::filter::FilterPass;
use super::session::Session;
use super::{Collection, Filter};
use crate::enumerator::Enumerator;
use crate::item::{DisplayItem, GroupKey, ItemId};
use crate::record::Record;
use crate::source::{ChangeAction, CollectionChange, EventRaising, ItemChange};
use crate::strategy::{GroupFn, GroupStrategy, SortFn, UserSortStrategy};
use crate::tree::hierarchy::{self, NodeState};

/// A recompute stage run in reaction to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecomputeStage {
    /// Identities dropped and everything derived again.
    Rebuild,
    Group,
    Sort,
    /// Filters re-run on the whole projection.
    Filter,
    /// Filters re-run on a source range only.
    FilterRange { start: usize, count: usize },
}

impl<R: Record> Collection<R> {
    // ---------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------

    /// Run `f` inside a change session. Nested calls join the open session.
    pub(crate) fn in_session<T>(&mut self, property: Option<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        if self.session.is_some() {
            return f(self);
        }
        let _perf = PerfSpan::new(span_names::SESSION);
        self.session = Some(Session::start(&self.visible, &self.arena, property));
        let result = f(self);
        self.finish_session();
        result
    }

    fn finish_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let changes = session.diff(&self.visible, &self.arena);
        if let Some(viewport) = &mut self.viewport {
            for change in &changes {
                match change.action {
                    ChangeAction::Add => viewport.on_items_added(change.new_index, change.new_items.len()),
                    ChangeAction::Remove => viewport.on_items_removed(change.old_index, change.old_items.len()),
                    _ => {}
                }
            }
        }
        if !changes.is_empty() {
            self.version.bump();
        }
        self.signals.emit_changes(changes);

        let collected = self.arena.collect_garbage();
        let arena = &self.arena;
        self.filter_memo.retain(|id, _| arena.contains(*id));
        self.uids.retain(|id| arena.contains(id));
        for slot in [&mut self.hovered, &mut self.active, &mut self.drag_target] {
            if slot.is_some_and(|id| !arena.contains(id)) {
                *slot = None;
            }
        }
        if collected > 0 {
            tracing::trace!(target: targets::COLLECTION, collected, "released detached items");
        }
        self.sync_current();
    }

    fn log_stage(&mut self, stage: RecomputeStage) {
        tracing::trace!(target: targets::COLLECTION, ?stage, "recompute");
        self.recompute_log.push(stage);
    }

    // ---------------------------------------------------------------------
    // Stages
    // ---------------------------------------------------------------------

    /// Re-read the result strategy's items.
    pub(crate) fn re_index(&mut self) {
        let items = self.with_chain(|chain, ctx| chain.items(ctx).to_vec());
        self.sort_map = (0..items.len()).collect();
        self.filter_map.resize(items.len(), None);
        self.items = items;
        if self.marked_key.is_some() {
            self.apply_marker();
        }
        if let Some(tree) = &mut self.tree {
            tree.children_memo.clear();
        }
    }

    /// Derive everything again from the source.
    ///
    /// A hard rebuild drops item identities and unique ids. A soft one keeps
    /// the item of every record whose key is still in the source, so its
    /// selection, editing and hover state survive.
    pub(crate) fn re_build(&mut self, hard: bool) {
        let _perf = PerfSpan::new(span_names::REBUILD);
        self.log_stage(RecomputeStage::Rebuild);
        if hard {
            self.uids.clear();
            self.with_chain(|chain, ctx| chain.reset(ctx));
        } else {
            self.with_chain(|chain, ctx| chain.rebind(ctx));
        }
        self.filter_memo.clear();
        self.re_index();
        self.recount_nodes();
        self.re_filter(None);
        tracing::debug!(target: targets::COLLECTION, hard, count = self.items.len(), "projection rebuilt");
    }

    pub(crate) fn re_group(&mut self) {
        self.log_stage(RecomputeStage::Group);
        let collapsed = self.collapsed_groups.clone();
        if let Some(group) = self.composer.get_mut::<GroupStrategy<R>>() {
            group.set_collapsed(collapsed);
        }
        self.composer.chain().invalidate();
        self.re_index();
    }

    pub(crate) fn re_sort(&mut self) {
        let _perf = PerfSpan::new(span_names::SORT);
        self.log_stage(RecomputeStage::Sort);
        self.composer.chain().invalidate();
        self.re_index();
    }

    /// Run the filters. With `dirty`, only those items run the user filters
    /// again. Index-sensitive filters always re-run everywhere.
    pub(crate) fn re_filter(&mut self, dirty: Option<HashSet<ItemId>>) {
        let _perf = PerfSpan::new(span_names::FILTER);
        let dirty = if self.filters.iter().any(Filter::is_index_sensitive) {
            None
        } else {
            dirty
        };
        if dirty.is_none() {
            self.log_stage(RecomputeStage::Filter);
        }
        let pass = FilterPass {
            arena: &self.arena,
            items: &self.items,
            filters: &self.filters,
            tree: self.tree.is_some(),
        };
        self.filter_map = pass.run(&mut self.filter_memo, dirty.as_ref());
        self.refresh_visible();
    }

    /// Re-filter the records at source indices `[start, start + count)`.
    pub(crate) fn re_filter_range(&mut self, start: usize, count: usize) {
        self.log_stage(RecomputeStage::FilterRange { start, count });
        let dirty: HashSet<ItemId> = self.with_chain(|chain, _| {
            (start..start + count)
                .filter_map(|index| chain.item_by_source_index(index))
                .collect()
        });
        self.re_filter(Some(dirty));
    }

    /// Group, sort and filter again around `count` records at `index`.
    pub(crate) fn re_analyze(&mut self, index: usize, count: usize) {
        self.re_group();
        self.re_sort();
        self.re_filter_range(index, count);
    }

    /// Whether anything can hide an item.
    pub(crate) fn is_filtered(&self) -> bool {
        !self.filters.is_empty() || self.tree.is_some() || !self.collapsed_groups.is_empty()
    }

    /// Mark every item as passed, for unfiltered projections.
    fn pass_all(&mut self) {
        self.filter_map = vec![Some(true); self.items.len()];
        self.refresh_visible();
    }

    pub(crate) fn refresh_visible(&mut self) {
        self.visible = Enumerator::new(&self.items, &self.filter_map, &self.sort_map).to_vec();
        if let Some(tree) = &mut self.tree {
            tree.children_memo.clear();
        }
    }

    // ---------------------------------------------------------------------
    // Source notifications
    // ---------------------------------------------------------------------

    /// Follow a structural change of the source.
    ///
    /// Add and replace run group, sort and filter. Remove runs sort, then
    /// filter only when something can hide items. Move runs sort and a full
    /// filter.
    pub fn on_collection_change(&mut self, change: &CollectionChange<R>) {
        let _perf = PerfSpan::new(span_names::SOURCE_CHANGE);
        tracing::debug!(
            target: targets::COLLECTION,
            action = ?change.action,
            new_index = change.new_index,
            new_count = change.new_items.len(),
            old_index = change.old_index,
            old_count = change.old_items.len(),
            "source changed"
        );
        self.recompute_log.clear();
        let nodes = self.snapshot_nodes();
        self.in_session(None, |this| {
            match change.action {
                ChangeAction::Reset => {
                    let hard = change.new_items.is_empty() || !this.is_editing() || this.compatible_reset;
                    this.re_build(hard);
                }
                ChangeAction::Add => {
                    this.splice(change.new_index, 0, &change.new_items);
                    this.re_group();
                    this.re_sort();
                    this.re_filter_range(change.new_index, change.new_items.len());
                }
                ChangeAction::Remove => {
                    this.splice(change.old_index, change.old_items.len(), &[]);
                    this.re_sort();
                    if this.is_filtered() {
                        this.re_filter(None);
                    } else {
                        this.pass_all();
                    }
                }
                ChangeAction::Replace => {
                    this.splice(change.old_index, change.old_items.len(), &change.new_items);
                    this.re_group();
                    this.re_sort();
                    this.re_filter_range(change.new_index, change.new_items.len());
                }
                ChangeAction::Move => {
                    let (from, count, to) = (change.old_index, change.old_items.len(), change.new_index);
                    this.with_chain(|chain, ctx| chain.move_range(from, count, to, ctx));
                    this.re_sort();
                    this.re_filter(None);
                }
                ChangeAction::Change => {
                    for (offset, record) in change.new_items.iter().enumerate() {
                        this.refresh_contents(change.new_index + offset, record);
                    }
                    this.re_group();
                    this.re_sort();
                    this.re_filter_range(change.new_index, change.new_items.len());
                }
            }
            this.after_structural_change(nodes);
        });
    }

    fn splice(&mut self, start: usize, delete_count: usize, added: &[Arc<R>]) {
        let released = self.with_chain(|chain, ctx| chain.splice(start, delete_count, added, ctx));
        for id in released {
            self.arena.detach(id);
        }
    }

    /// Point the item of the record at `index` to `record`. Returns the item.
    fn refresh_contents(&mut self, index: usize, record: &Arc<R>) -> Option<ItemId> {
        let id = self.with_chain(|chain, _| chain.item_by_source_index(index))?;
        let settings = self.factory.tree.as_ref();
        let item = self.arena.get_mut(id)?;
        if let Some(base) = item.as_collection_item_mut() {
            if !base.set_contents(record.clone()) {
                base.bump_version();
            }
        }
        if let (Some(settings), Some(tree_item)) = (settings, item.as_tree_item_mut()) {
            if settings.node_property.is_some() {
                tree_item.set_node(settings.node_of(record.as_ref()));
            }
            tree_item.set_has_children(settings.declared_has_children(record.as_ref()));
        }
        Some(id)
    }

    /// Follow a property change of one record.
    ///
    /// Changes touching an important property re-analyse the record's
    /// position, other changes only notify. While the source is not
    /// raising events the change is queued.
    pub fn on_item_change(&mut self, change: &ItemChange<R>) {
        if !self.source_synchronized {
            tracing::trace!(target: targets::COLLECTION, index = change.index, "item change delayed");
            self.delayed.push(change.clone());
            return;
        }
        self.apply_item_change(change);
    }

    fn apply_item_change(&mut self, change: &ItemChange<R>) {
        let index = self.source.index_of(&change.item).unwrap_or(change.index);
        let important = change.properties.iter().any(|property| self.is_important(property));
        self.recompute_log.clear();
        let nodes = self.snapshot_nodes();
        self.in_session(change.properties.first().cloned(), |this| {
            if this.refresh_contents(index, &change.item).is_none() {
                return;
            }
            if important {
                this.re_analyze(index, 1);
            }
            this.after_structural_change(nodes);
        });
    }

    fn is_important(&self, property: &str) -> bool {
        if self.important_properties.iter().any(|p| p == property) {
            return true;
        }
        self.factory.tree.as_ref().is_some_and(|tree| {
            tree.parent_property == property
                || tree.children_property.as_deref() == Some(property)
                || tree.node_property.as_deref() == Some(property)
        })
    }

    /// Follow an event raising switch of the source.
    pub fn on_event_raising_change(&mut self, raising: EventRaising) {
        if !raising.enabled {
            self.source_synchronized = false;
            self.rebuild_on_sync = !raising.analyze;
            return;
        }
        if self.source_synchronized {
            return;
        }
        self.source_synchronized = true;
        if std::mem::take(&mut self.rebuild_on_sync) {
            self.recompute_log.clear();
            self.in_session(None, |this| this.re_build(true));
        }
        let delayed = std::mem::take(&mut self.delayed);
        tracing::debug!(target: targets::COLLECTION, replayed = delayed.len(), "source synchronized");
        for change in &delayed {
            self.apply_item_change(change);
        }
    }

    /// Whether the source is raising events as seen by the projection.
    pub fn is_source_synchronized(&self) -> bool {
        self.source_synchronized
    }

    // ---------------------------------------------------------------------
    // Hierarchy bookkeeping
    // ---------------------------------------------------------------------

    fn snapshot_nodes(&self) -> Option<HashMap<ItemId, NodeState>> {
        self.tree.as_ref()?;
        Some(hierarchy::snapshot_nodes(&self.arena, &self.items))
    }

    fn after_structural_change(&mut self, before: Option<HashMap<ItemId, NodeState>>) {
        let Some(before) = before else {
            return;
        };
        self.recount_nodes();
        let after = hierarchy::snapshot_nodes(&self.arena, &self.items);
        let changed = hierarchy::bump_changed_nodes(&mut self.arena, &before, &after);
        if changed > 0 {
            tracing::trace!(target: targets::TREE, changed, "node states changed");
        }
    }

    /// Recount the node flags. Bumps the version when one changes.
    pub(crate) fn recount_nodes(&mut self) {
        let Some(tree) = &mut self.tree else {
            return;
        };
        let Some(settings) = &self.factory.tree else {
            return;
        };
        let factory = &self.factory;
        let (has_node, has_node_with_children) = hierarchy::count_node_flags(
            self.source.as_ref(),
            &self.arena,
            &self.items,
            settings,
            &|record: &R| factory.key_of(record),
        );
        if tree.has_node != has_node || tree.has_node_with_children != has_node_with_children {
            tree.has_node = has_node;
            tree.has_node_with_children = has_node_with_children;
            self.version.bump();
        }
    }

    // ---------------------------------------------------------------------
    // Filter, sort and group setters
    // ---------------------------------------------------------------------

    /// Replace every filter.
    pub fn set_filters(&mut self, filters: Vec<Filter<R>>) {
        self.filters = filters;
        self.refilter_all();
    }

    /// Replace every filter with a record filter, or drop them all.
    pub fn set_filter<F>(&mut self, filter: Option<F>)
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.set_filters(filter.map(Filter::by_record).into_iter().collect());
    }

    pub fn add_filter(&mut self, filter: Filter<R>) {
        self.filters.push(filter);
        self.refilter_all();
    }

    /// Remove a filter by identity. Returns whether it was installed.
    pub fn remove_filter(&mut self, filter: &Filter<R>) -> bool {
        let before = self.filters.len();
        self.filters.retain(|installed| !installed.ptr_eq(filter));
        let removed = self.filters.len() != before;
        if removed {
            self.refilter_all();
        }
        removed
    }

    pub fn filters(&self) -> &[Filter<R>] {
        &self.filters
    }

    fn refilter_all(&mut self) {
        self.recompute_log.clear();
        self.filter_memo.clear();
        self.in_session(None, |this| this.re_filter(None));
    }

    /// Replace every comparator.
    pub fn set_sort(&mut self, sort: Vec<SortFn<R>>) {
        self.sort = sort;
        self.apply_sort();
    }

    pub fn add_sort(&mut self, sort: SortFn<R>) {
        self.sort.push(sort);
        self.apply_sort();
    }

    /// Remove a comparator by identity. Returns whether it was installed.
    pub fn remove_sort(&mut self, sort: &SortFn<R>) -> bool {
        let before = self.sort.len();
        self.sort.retain(|installed| !Arc::ptr_eq(installed, sort));
        let removed = self.sort.len() != before;
        if removed {
            self.apply_sort();
        }
        removed
    }

    pub fn sort_handlers(&self) -> &[SortFn<R>] {
        &self.sort
    }

    fn apply_sort(&mut self) {
        let handlers = self.sort.clone();
        if let Some(layer) = self.composer.get_mut::<UserSortStrategy<R>>() {
            layer.set_handlers(handlers);
        }
        self.recompute_log.clear();
        self.in_session(None, |this| {
            this.re_sort();
            this.re_filter(None);
        });
    }

    /// Replace the group function.
    pub fn set_group(&mut self, group: Option<GroupFn<R>>) {
        self.group = group.clone();
        if let Some(layer) = self.composer.get_mut::<GroupStrategy<R>>() {
            layer.set_handler(group);
        }
        self.recompute_log.clear();
        self.in_session(None, |this| {
            this.re_group();
            this.re_sort();
            this.re_filter(None);
        });
    }

    pub fn group_handler(&self) -> Option<&GroupFn<R>> {
        self.group.as_ref()
    }

    /// Collapse exactly the groups in `keys`.
    pub fn set_collapsed_groups(&mut self, keys: impl IntoIterator<Item = GroupKey>) {
        self.collapsed_groups = keys.into_iter().collect();
        self.in_session(None, |this| {
            this.apply_collapsed_groups();
            this.re_filter(None);
        });
    }

    /// Push `collapsed_groups` to the group layer and its live headers.
    pub(crate) fn apply_collapsed_groups(&mut self) {
        let collapsed = self.collapsed_groups.clone();
        let headers: Vec<ItemId> = self
            .items
            .iter()
            .copied()
            .filter(|&id| self.arena.get(id).is_some_and(DisplayItem::is_group))
            .collect();
        for id in headers {
            if let Some(DisplayItem::Group(group)) = self.arena.get_mut(id) {
                let expanded = !collapsed.contains(group.key());
                crate::item::Expandable::set_expanded(group, expanded);
            }
        }
        if let Some(layer) = self.composer.get_mut::<GroupStrategy<R>>() {
            layer.set_collapsed(collapsed);
        }
    }

    pub fn collapsed_groups(&self) -> impl Iterator<Item = &GroupKey> {
        self.collapsed_groups.iter()
    }
}
