//! Filters and the filter pass.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::item::{DisplayItem, ItemArena, ItemId, ItemKind};
use crate::record::Record;

/// An item as seen by a filter.
#[derive(Debug)]
pub struct FilterItem<'a, R> {
    pub id: ItemId,
    pub item: &'a DisplayItem<R>,
    /// Position among the projection's items, before filtering.
    pub index: usize,
    /// For group headers: whether some member passed filtering.
    pub has_members: bool,
}

impl<R> FilterItem<'_, R> {
    /// The record, for record items.
    pub fn record(&self) -> Option<&Arc<R>> {
        self.item.record()
    }
}

/// A filter predicate.
pub type FilterFn<R> = Arc<dyn Fn(&FilterItem<'_, R>) -> bool + Send + Sync>;

/// A filter and whether its result depends on item positions.
///
/// Index-sensitive filters force the whole projection to be re-filtered on
/// every change instead of the changed range only.
pub struct Filter<R> {
    handler: FilterFn<R>,
    index_sensitive: bool,
}

impl<R> Clone for Filter<R> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            index_sensitive: self.index_sensitive,
        }
    }
}

impl<R> fmt::Debug for Filter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("index_sensitive", &self.index_sensitive)
            .finish_non_exhaustive()
    }
}

impl<R: Record> Filter<R> {
    /// A filter over every item, pseudo-items included.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FilterItem<'_, R>) -> bool + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(f),
            index_sensitive: false,
        }
    }

    /// A filter reading [`FilterItem::index`].
    pub fn index_sensitive<F>(f: F) -> Self
    where
        F: Fn(&FilterItem<'_, R>) -> bool + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(f),
            index_sensitive: true,
        }
    }

    /// A filter over records. Group headers pass when they have members,
    /// other pseudo-items always pass.
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::new(move |item: &FilterItem<'_, R>| match item.record() {
            Some(record) => f(record),
            None if item.item.is_group() => item.has_members,
            None => true,
        })
    }

    pub fn is_index_sensitive(&self) -> bool {
        self.index_sensitive
    }

    pub fn matches(&self, item: &FilterItem<'_, R>) -> bool {
        (self.handler)(item)
    }

    /// Whether both values hold the same predicate.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

/// Inputs of one filter pass.
pub(crate) struct FilterPass<'a, R> {
    pub arena: &'a ItemArena<R>,
    pub items: &'a [ItemId],
    pub filters: &'a [Filter<R>],
    /// Hide items whose ancestors are collapsed or filtered out.
    pub tree: bool,
}

impl<R: Record> FilterPass<'_, R> {
    fn user_filters(&self, id: ItemId, item: &DisplayItem<R>, index: usize, has_members: bool) -> bool {
        let view = FilterItem {
            id,
            item,
            index,
            has_members,
        };
        self.filters.iter().all(|filter| filter.matches(&view))
    }

    /// Compute the filter map of `items`.
    ///
    /// Record results are memoized in `memo`. With `dirty` set, only those
    /// items (and items missing from the memo) run the user filters again.
    /// Group headers, collapsed groups and tree ancestry are always
    /// recomputed.
    pub fn run(&self, memo: &mut HashMap<ItemId, bool>, dirty: Option<&HashSet<ItemId>>) -> Vec<Option<bool>> {
        let mut map = vec![None; self.items.len()];
        let mut passed: HashMap<ItemId, bool> = HashMap::with_capacity(self.items.len());

        for (index, &id) in self.items.iter().enumerate() {
            let Some(item) = self.arena.get(id) else {
                continue;
            };
            if item.is_group() {
                continue;
            }
            let stale = dirty.is_none_or(|dirty| dirty.contains(&id));
            let own = match memo.get(&id) {
                Some(&result) if !stale => result,
                _ => {
                    let result = self.user_filters(id, item, index, false);
                    memo.insert(id, result);
                    result
                }
            };
            let result = own && (!self.tree || self.ancestry_visible(id, &passed));
            passed.insert(id, result);
            map[index] = Some(result);
        }

        let mut index = 0;
        while index < self.items.len() {
            let id = self.items[index];
            let Some(DisplayItem::Group(group)) = self.arena.get(id) else {
                index += 1;
                continue;
            };
            let mut end = index + 1;
            while end < self.items.len() && !self.is_group(self.items[end]) {
                end += 1;
            }
            let has_members = map[index + 1..end].contains(&Some(true));
            let header = has_members
                && self
                    .arena
                    .get(id)
                    .is_some_and(|item| self.user_filters(id, item, index, true));
            map[index] = Some(header);
            if !crate::item::Expandable::is_expanded(group) {
                for entry in &mut map[index + 1..end] {
                    if entry.is_some() {
                        *entry = Some(false);
                    }
                }
            }
            index = end;
        }

        memo.retain(|id, _| passed.contains_key(id));
        map
    }

    fn is_group(&self, id: ItemId) -> bool {
        self.arena.get(id).is_some_and(DisplayItem::is_group)
    }

    /// Whether the parent of `id` passed and is expanded.
    fn ancestry_visible(&self, id: ItemId, passed: &HashMap<ItemId, bool>) -> bool {
        let Some(parent) = self.arena.parent(id) else {
            return true;
        };
        let Some(parent_item) = self.arena.get(parent) else {
            return true;
        };
        if parent_item.kind() == ItemKind::Root {
            return true;
        }
        match passed.get(&parent) {
            Some(&parent_passed) => parent_passed && parent_item.is_expanded(),
            None => true,
        }
    }
}
