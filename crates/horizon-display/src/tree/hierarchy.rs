//! Hierarchy bookkeeping: node state snapshots, node flags and the
//! parent/child relation read straight from the source records.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::item::{DisplayItem, ItemArena, ItemId};
use crate::record::{Record, RecordKey};
use crate::source::SourceCollection;
use crate::strategy::{ExpansionState, TreeSettings};

/// What a tree item looks like from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeState {
    pub parent: Option<ItemId>,
    pub children: usize,
    pub level: usize,
    pub node: Option<bool>,
    pub expanded: bool,
}

/// Node states of the tree items among `items`.
pub(crate) fn snapshot_nodes<R>(arena: &ItemArena<R>, items: &[ItemId]) -> HashMap<ItemId, NodeState> {
    let mut children: HashMap<ItemId, usize> = HashMap::new();
    for &id in items {
        if let Some(parent) = arena.get(id).and_then(DisplayItem::as_tree_item).and_then(|item| item.parent()) {
            *children.entry(parent).or_default() += 1;
        }
    }
    items
        .iter()
        .filter_map(|&id| {
            let item = arena.get(id)?.as_tree_item()?;
            let state = NodeState {
                parent: item.parent(),
                children: children.get(&id).copied().unwrap_or_default(),
                level: arena.level(id),
                node: item.node(),
                expanded: crate::item::Expandable::is_expanded(item),
            };
            Some((id, state))
        })
        .collect()
}

/// Bump the version of items whose node state changed between `before` and
/// `after`, so the session reports them. Returns how many were bumped.
pub(crate) fn bump_changed_nodes<R>(
    arena: &mut ItemArena<R>,
    before: &HashMap<ItemId, NodeState>,
    after: &HashMap<ItemId, NodeState>,
) -> usize {
    let mut bumped = 0;
    for (id, state) in after {
        let Some(previous) = before.get(id) else {
            continue;
        };
        if previous == state {
            continue;
        }
        if let Some(base) = arena.get_mut(*id).and_then(DisplayItem::as_collection_item_mut) {
            base.bump_version();
            bumped += 1;
        }
    }
    bumped
}

/// `(has_node, has_node_with_children)`.
///
/// The first looks at the top-level items, the second at the source records
/// since items may not exist yet. A row being added below a node counts as
/// a child of that node.
pub(crate) fn count_node_flags<R: Record>(
    source: &dyn SourceCollection<R>,
    arena: &ItemArena<R>,
    items: &[ItemId],
    settings: &TreeSettings,
    key_of: &dyn Fn(&R) -> Option<RecordKey>,
) -> (bool, bool) {
    let has_node = items.iter().any(|&id| {
        arena
            .get(id)
            .and_then(DisplayItem::as_tree_item)
            .is_some_and(|item| item.parent() == settings.root && item.is_node())
    });

    let records = records_of(source);
    let mut has_node_with_children = records.iter().any(|record| {
        if settings.node_of(record.as_ref()).is_none() {
            return false;
        }
        match settings.has_children_property.as_deref() {
            Some(property) => record.get(property).as_bool().unwrap_or(false),
            None => {
                key_of(record.as_ref()).is_some_and(|key| {
                    records
                        .iter()
                        .any(|other| settings.parent_key_of(other.as_ref()).as_ref() == Some(&key))
                })
            }
        }
    });
    if !has_node_with_children {
        has_node_with_children = items.iter().any(|&id| {
            let Some(base) = arena.get(id).and_then(DisplayItem::as_collection_item) else {
                return false;
            };
            base.is_adding() && arena.parent(id).is_some_and(|parent| Some(parent) != settings.root)
        });
    }
    (has_node, has_node_with_children)
}

fn records_of<R: Record>(source: &dyn SourceCollection<R>) -> Vec<Arc<R>> {
    (0..source.count()).filter_map(|index| source.at(index)).collect()
}

/// Records whose parent property names `parent`.
pub(crate) fn children_by_record_set<R: Record>(
    source: &dyn SourceCollection<R>,
    settings: &TreeSettings,
    parent: Option<&RecordKey>,
) -> Vec<Arc<R>> {
    records_of(source)
        .into_iter()
        .filter(|record| settings.parent_key_of(record.as_ref()).as_ref() == parent)
        .collect()
}

/// Depth-first list of the records below `root`, descending only into
/// expanded keys.
pub(crate) fn record_set_projection<R: Record>(
    source: &dyn SourceCollection<R>,
    settings: &TreeSettings,
    key_of: &dyn Fn(&R) -> Option<RecordKey>,
    root: Option<&RecordKey>,
    expansion: &ExpansionState,
) -> Vec<Arc<R>> {
    let records = records_of(source);
    let mut by_parent: HashMap<Option<RecordKey>, Vec<&Arc<R>>> = HashMap::new();
    for record in &records {
        by_parent
            .entry(settings.parent_key_of(record.as_ref()))
            .or_default()
            .push(record);
    }

    let mut projection = Vec::new();
    let mut visited: HashSet<RecordKey> = HashSet::new();
    let mut stack: Vec<&Arc<R>> = by_parent
        .get(&root.cloned())
        .map(|top| top.iter().rev().copied().collect())
        .unwrap_or_default();
    while let Some(record) = stack.pop() {
        projection.push(record.clone());
        let Some(key) = key_of(record.as_ref()) else {
            continue;
        };
        if !expansion.is_expanded(&key) || !visited.insert(key.clone()) {
            continue;
        }
        if let Some(children) = by_parent.get(&Some(key)) {
            stack.extend(children.iter().rev().copied());
        }
    }
    projection
}

/// Record next to `key` in the record-set projection. `forward` picks the
/// direction.
pub(crate) fn nearby_in_record_set_projection<R: Record>(
    projection: &[Arc<R>],
    key_of: &dyn Fn(&R) -> Option<RecordKey>,
    key: &RecordKey,
    forward: bool,
) -> Option<Arc<R>> {
    let position = projection
        .iter()
        .position(|record| key_of(record.as_ref()).as_ref() == Some(key))?;
    let target = if forward { position.checked_add(1)? } else { position.checked_sub(1)? };
    projection.get(target).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::source::SourceList;

    fn create_test_settings() -> TreeSettings {
        TreeSettings {
            parent_property: "parent".into(),
            node_property: Some("node".into()),
            ..TreeSettings::default()
        }
    }

    fn create_test_source() -> SourceList<MapRecord> {
        SourceList::new(vec![
            MapRecord::new().with("id", 1).with("node", true),
            MapRecord::new().with("id", 2).with("parent", 1).with("node", true),
            MapRecord::new().with("id", 3).with("parent", 2),
            MapRecord::new().with("id", 4).with("node", true),
        ])
    }

    fn key_of(record: &MapRecord) -> Option<RecordKey> {
        record.get("id").to_key()
    }

    fn ids(records: &[Arc<MapRecord>]) -> Vec<i64> {
        records.iter().filter_map(|record| record.get("id").as_int()).collect()
    }

    #[test]
    fn test_children_by_record_set() {
        let source = create_test_source();
        let settings = create_test_settings();
        assert_eq!(ids(&children_by_record_set(&source, &settings, None)), vec![1, 4]);
        assert_eq!(ids(&children_by_record_set(&source, &settings, Some(&1.into()))), vec![2]);
    }

    #[test]
    fn test_record_set_projection_honours_expansion() {
        let source = create_test_source();
        let settings = create_test_settings();
        let mut expansion = ExpansionState::default();
        expansion.expanded.insert(1.into());
        let projection = record_set_projection(&source, &settings, &key_of, None, &expansion);
        assert_eq!(ids(&projection), vec![1, 2, 4]);

        expansion.expand_all = true;
        let projection = record_set_projection(&source, &settings, &key_of, None, &expansion);
        assert_eq!(ids(&projection), vec![1, 2, 3, 4]);

        let next = nearby_in_record_set_projection(&projection, &key_of, &3.into(), true);
        assert_eq!(next.and_then(|record| record.get("id").as_int()), Some(4));
        assert!(nearby_in_record_set_projection(&projection, &key_of, &1.into(), false).is_none());
    }

    #[test]
    fn test_node_with_children_by_record_set() {
        let source = create_test_source();
        let settings = create_test_settings();
        let arena: ItemArena<MapRecord> = ItemArena::new();
        let (has_node, with_children) = count_node_flags(&source, &arena, &[], &settings, &key_of);
        assert!(!has_node);
        assert!(with_children);

        let leaves = SourceList::new(vec![MapRecord::new().with("id", 1).with("node", true)]);
        assert!(!count_node_flags(&leaves, &arena, &[], &settings, &key_of).1);
    }
}
