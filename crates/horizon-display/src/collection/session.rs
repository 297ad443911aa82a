//! Change sessions: snapshot the visible items, diff them afterwards.

use std::collections::{HashMap, HashSet};

use horizon_display_core::logging::targets;

use super::changes::ProjectionChange;
use crate::item::{DisplayItem, ItemArena, ItemId};
use crate::source::ChangeAction;

/// Snapshot of the visible items taken when a batch of changes starts.
#[derive(Debug)]
pub(crate) struct Session {
    before: Vec<ItemId>,
    versions: HashMap<ItemId, u64>,
    property: Option<String>,
}

impl Session {
    pub fn start<R>(visible: &[ItemId], arena: &ItemArena<R>, property: Option<String>) -> Self {
        let versions = visible
            .iter()
            .filter_map(|&id| arena.get(id).map(|item| (id, item.version())))
            .collect();
        Self {
            before: visible.to_vec(),
            versions,
            property,
        }
    }

    /// Notifications turning the snapshot into `after`.
    ///
    /// Removals come first, then moves, additions and changes. Every
    /// notification is valid for the list as left by the previous one.
    /// Ranges never span a group header.
    pub fn diff<R>(&self, after: &[ItemId], arena: &ItemArena<R>) -> Vec<ProjectionChange> {
        let is_group = |id: ItemId| arena.get(id).is_some_and(DisplayItem::is_group);
        let old_set: HashSet<ItemId> = self.before.iter().copied().collect();
        let new_set: HashSet<ItemId> = after.iter().copied().collect();
        let mut changes = Vec::new();
        let mut working = self.before.clone();

        let mut index = 0;
        while index < working.len() {
            if new_set.contains(&working[index]) {
                index += 1;
                continue;
            }
            let mut end = index + 1;
            while end < working.len() && !new_set.contains(&working[end]) && !is_group(working[end]) {
                end += 1;
            }
            let removed: Vec<ItemId> = working.drain(index..end).collect();
            changes.push(ProjectionChange::removed(removed, index));
        }

        let kept: Vec<ItemId> = after.iter().copied().filter(|id| old_set.contains(id)).collect();
        for (position, &id) in kept.iter().enumerate() {
            if working[position] == id {
                continue;
            }
            let Some(from) = working.iter().position(|&other| other == id) else {
                continue;
            };
            working.remove(from);
            working.insert(position, id);
            changes.push(ProjectionChange::moved(id, from, position));
        }

        let mut index = 0;
        while index < after.len() {
            if old_set.contains(&after[index]) {
                index += 1;
                continue;
            }
            let mut end = index + 1;
            while end < after.len() && !old_set.contains(&after[end]) && !is_group(after[end]) {
                end += 1;
            }
            let added = after[index..end].to_vec();
            working.splice(index..index, added.iter().copied());
            changes.push(ProjectionChange::added(added, index));
            index = end;
        }

        let changed = |id: &ItemId| {
            self.versions
                .get(id)
                .is_some_and(|&version| arena.get(*id).is_some_and(|item| item.version() != version))
        };
        let mut index = 0;
        while index < after.len() {
            if !changed(&after[index]) {
                index += 1;
                continue;
            }
            let mut end = index + 1;
            while end < after.len() && changed(&after[end]) && !is_group(after[end]) {
                end += 1;
            }
            changes.push(ProjectionChange::changed(
                after[index..end].to_vec(),
                index,
                self.property.clone(),
            ));
            index = end;
        }

        tracing::trace!(
            target: targets::COLLECTION,
            before = self.before.len(),
            after = after.len(),
            notifications = changes.len(),
            "session diff"
        );
        changes
    }
}

impl ProjectionChange {
    fn removed(items: Vec<ItemId>, index: usize) -> Self {
        Self {
            action: ChangeAction::Remove,
            new_items: Vec::new(),
            new_index: 0,
            old_items: items,
            old_index: index,
            property: None,
        }
    }

    fn added(items: Vec<ItemId>, index: usize) -> Self {
        Self {
            action: ChangeAction::Add,
            new_items: items,
            new_index: index,
            old_items: Vec::new(),
            old_index: 0,
            property: None,
        }
    }

    fn moved(item: ItemId, from: usize, to: usize) -> Self {
        Self {
            action: ChangeAction::Move,
            new_items: vec![item],
            new_index: to,
            old_items: vec![item],
            old_index: from,
            property: None,
        }
    }

    fn changed(items: Vec<ItemId>, index: usize, property: Option<String>) -> Self {
        Self {
            action: ChangeAction::Change,
            new_items: items.clone(),
            new_index: index,
            old_items: items,
            old_index: index,
            property,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::item::{CollectionItem, GroupItem, GroupKey};

    fn create_test_arena(count: usize) -> (ItemArena<&'static str>, Vec<ItemId>) {
        let mut arena = ItemArena::new();
        let ids = (0..count)
            .map(|_| arena.insert(DisplayItem::Record(CollectionItem::new(Arc::new("r"), None))))
            .collect();
        (arena, ids)
    }

    /// Replays the notifications on the snapshot.
    fn apply(before: &[ItemId], changes: &[ProjectionChange]) -> Vec<ItemId> {
        let mut list = before.to_vec();
        for change in changes {
            match change.action {
                ChangeAction::Remove => {
                    list.drain(change.old_index..change.old_index + change.old_items.len());
                }
                ChangeAction::Add => {
                    list.splice(change.new_index..change.new_index, change.new_items.iter().copied());
                }
                ChangeAction::Move => {
                    let id = list.remove(change.old_index);
                    list.insert(change.new_index, id);
                }
                _ => {}
            }
        }
        list
    }

    #[test]
    fn test_diff_replays_to_new_list() {
        let (arena, ids) = create_test_arena(6);
        let before = vec![ids[0], ids[1], ids[2], ids[3]];
        let after = vec![ids[4], ids[2], ids[0], ids[5], ids[3]];
        let session = Session::start(&before, &arena, None);
        let changes = session.diff(&after, &arena);
        assert_eq!(apply(&before, &changes), after);
        assert_eq!(changes[0].action, ChangeAction::Remove);
        assert_eq!(changes[0].old_items, vec![ids[1]]);
    }

    #[test]
    fn test_changes_follow_versions() {
        let (mut arena, ids) = create_test_arena(3);
        let session = Session::start(&ids, &arena, Some("title".into()));
        for &id in &ids[1..] {
            if let Some(item) = arena.get_mut(id).and_then(DisplayItem::selectable_mut) {
                item.set_selected(Some(true));
            }
        }
        let changes = session.diff(&ids, &arena);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, ChangeAction::Change);
        assert_eq!(changes[0].new_index, 1);
        assert_eq!(changes[0].new_items.len(), 2);
        assert_eq!(changes[0].property.as_deref(), Some("title"));
    }

    #[test]
    fn test_ranges_split_at_group_headers() {
        let (mut arena, ids) = create_test_arena(2);
        let group = arena.insert(DisplayItem::Group(GroupItem::new(GroupKey::from("g"), true)));
        let after = vec![ids[0], group, ids[1]];
        let session = Session::start(&[], &arena, None);
        let changes = session.diff(&after, &arena);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].new_items, vec![ids[0]]);
        assert_eq!(changes[1].new_items, vec![group, ids[1]]);
        assert_eq!(changes[1].new_index, 1);
    }
}
