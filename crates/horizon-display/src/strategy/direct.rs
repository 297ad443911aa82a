//! One item per source record.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use horizon_display_core::logging::targets;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, ItemId};
use crate::record::{Record, RecordKey};

/// Bottom layer wrapping each source record in an item.
///
/// Items are created lazily the first time the layer's items are read and
/// keep their identity across splices and moves. With `unique` set, only the
/// first record of every key is shown.
#[derive(Debug, Default)]
pub struct DirectStrategy {
    slots: Vec<Option<ItemId>>,
    unique: bool,
    cache: Option<Vec<ItemId>>,
    /// Source index of each cached item.
    origin: Vec<usize>,
}

impl DirectStrategy {
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            ..Self::default()
        }
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn set_unique(&mut self, unique: bool) {
        if self.unique != unique {
            self.unique = unique;
            self.cache = None;
        }
    }

    fn materialize<R: Record>(&mut self, ctx: &mut StrategyContext<'_, R>) {
        let count = ctx.source.count();
        if self.slots.len() > count {
            for id in self.slots.drain(count..).flatten() {
                ctx.arena.detach(id);
            }
        } else {
            self.slots.resize(count, None);
        }
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                if let Some(record) = ctx.source.at(index) {
                    *slot = Some(ctx.factory.create(ctx.arena, record));
                }
            }
        }
    }

    /// Rebuild the slots from the source, reusing items by record key, or by
    /// record identity for records without one.
    fn rebind_slots<R: Record>(&mut self, ctx: &mut StrategyContext<'_, R>) {
        let mut by_key: HashMap<RecordKey, Vec<ItemId>> = HashMap::new();
        let mut unkeyed = Vec::new();
        for id in self.slots.drain(..).flatten() {
            match ctx.arena.get(id).and_then(DisplayItem::key).cloned() {
                Some(key) => by_key.entry(key).or_default().push(id),
                None => unkeyed.push(id),
            }
        }
        for ids in by_key.values_mut() {
            ids.reverse();
        }

        let count = ctx.source.count();
        let mut reused = 0usize;
        for index in 0..count {
            let Some(record) = ctx.source.at(index) else {
                self.slots.push(None);
                continue;
            };
            let candidate = match ctx.factory.key_of(record.as_ref()) {
                Some(key) => by_key.get_mut(&key).and_then(Vec::pop),
                None => unkeyed
                    .iter()
                    .position(|&id| {
                        ctx.arena
                            .get(id)
                            .and_then(DisplayItem::record)
                            .is_some_and(|contents| Arc::ptr_eq(contents, &record))
                    })
                    .map(|position| unkeyed.swap_remove(position)),
            };
            let kept = candidate.filter(|&id| {
                let fits = ctx.factory.refresh(ctx.arena, id, record.clone()).is_some();
                if !fits {
                    ctx.arena.detach(id);
                }
                fits
            });
            let id = match kept {
                Some(id) => {
                    reused += 1;
                    id
                }
                None => ctx.factory.create(ctx.arena, record),
            };
            self.slots.push(Some(id));
        }

        for id in by_key.into_values().flatten().chain(unkeyed) {
            ctx.arena.detach(id);
        }
        self.cache = None;
        self.origin.clear();
        tracing::trace!(target: targets::STRATEGY, count, reused, "direct items rebound");
    }

    fn ensure<R: Record>(&mut self, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        self.materialize(ctx);

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(self.slots.len());
        let mut origin = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(id) = *slot else {
                continue;
            };
            if self.unique {
                let key = ctx.arena.get(id).and_then(DisplayItem::key).cloned();
                if let Some(key) = key {
                    if !seen.insert(key) {
                        continue;
                    }
                }
            }
            items.push(id);
            origin.push(index);
        }
        self.cache = Some(items);
        self.origin = origin;
    }
}

impl<R: Record> ItemsStrategy<R> for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn items<'s>(&'s mut self, _source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId] {
        self.ensure(ctx);
        self.cache.as_deref().unwrap_or(&[])
    }

    fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        added: &[Arc<R>],
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Vec<ItemId> {
        self.cache = None;
        let start = start.min(self.slots.len());
        let end = (start + delete_count).min(self.slots.len());
        let removed: Vec<ItemId> = self
            .slots
            .splice(start..end, std::iter::repeat(None).take(added.len()))
            .flatten()
            .collect();
        for &id in &removed {
            ctx.arena.detach(id);
        }
        removed
    }

    fn move_range(
        &mut self,
        from: usize,
        count: usize,
        to: usize,
        _source: Chain<'_, R>,
        _ctx: &mut StrategyContext<'_, R>,
    ) {
        self.cache = None;
        let len = self.slots.len();
        if count == 0 || from + count > len || to + count > len {
            return;
        }
        let moved: Vec<Option<ItemId>> = self.slots.drain(from..from + count).collect();
        self.slots.splice(to..to, moved);
    }

    fn display_index(
        &mut self,
        index: usize,
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(ctx);
        self.origin.iter().position(|&origin| origin == index)
    }

    fn collection_index(
        &mut self,
        index: usize,
        _source: Chain<'_, R>,
        ctx: &mut StrategyContext<'_, R>,
    ) -> Option<usize> {
        self.ensure(ctx);
        self.origin.get(index).copied()
    }

    fn item_by_source_index(&mut self, index: usize, _source: Chain<'_, R>) -> Option<ItemId> {
        self.slots.get(index).copied().flatten()
    }

    fn invalidate(&mut self, _source: Chain<'_, R>) {
        self.cache = None;
    }

    fn reset(&mut self, _source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        for id in self.slots.drain(..).flatten() {
            ctx.arena.detach(id);
        }
        self.cache = None;
        self.origin.clear();
    }

    fn rebind(&mut self, _source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        self.rebind_slots(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
