//! Drag-reorder: an avatar stands in for the dragged records.

use std::any::Any;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{CollectionItem, DisplayItem, ItemArena, ItemId, TreeItem};
use crate::record::{Record, RecordKey};

/// Where the avatar goes relative to the hovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPosition {
    Before,
    After,
    /// Onto the item itself. Trees use it to target a node.
    On,
}

/// Hides the dragged records and shows one avatar item at the target slot.
///
/// The avatar clones the item the drag started from. Its slot is tracked as
/// a start index (where the avatar was created) and a target index (where it
/// is shown), both corrected for the dragged records hidden before them.
/// In a tree, descendants of dragged records are hidden as well and the
/// avatar adopts the nearest visible parent of its neighbourhood.
#[derive(Debug)]
pub struct DragStrategy {
    dragged_keys: Vec<RecordKey>,
    draggable: Option<ItemId>,
    start_index: usize,
    target_index: usize,
    avatar: Option<ItemId>,
    hidden_indexes: Vec<usize>,
    cache: Option<Vec<ItemId>>,
}

impl DragStrategy {
    /// Start a drag of `dragged_keys` from `draggable`, currently shown at
    /// `start_index`.
    pub fn new(dragged_keys: Vec<RecordKey>, draggable: Option<ItemId>, start_index: usize) -> Self {
        Self {
            dragged_keys,
            draggable,
            start_index,
            target_index: start_index,
            avatar: None,
            hidden_indexes: Vec::new(),
            cache: None,
        }
    }

    pub fn dragged_keys(&self) -> &[RecordKey] {
        &self.dragged_keys
    }

    pub fn dragged_count(&self) -> usize {
        self.dragged_keys.len()
    }

    /// The avatar item, once the layer has produced its items.
    pub fn avatar(&self) -> Option<ItemId> {
        self.avatar
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// Move the avatar next to the item at `index`. The layer must be
    /// invalidated through the chain afterwards.
    pub fn set_position(&mut self, index: usize, position: DragPosition) {
        self.target_index = if self.target_index < index && position == DragPosition::Before {
            index - 1
        } else if self.target_index > index && position == DragPosition::After {
            index + 1
        } else {
            index
        };
        self.cache = None;
    }

    fn correct(&self, index: usize) -> usize {
        index - self.hidden_indexes.iter().filter(|&&hidden| hidden < index).count()
    }

    fn has_dragged_ancestor<R>(&self, arena: &ItemArena<R>, id: ItemId) -> bool {
        let mut current = arena.parent(id);
        let mut guard = arena.len();
        while let Some(parent) = current {
            let dragged = arena
                .get(parent)
                .and_then(DisplayItem::key)
                .is_some_and(|key| self.dragged_keys.contains(key));
            if dragged {
                return true;
            }
            if guard == 0 {
                break;
            }
            guard -= 1;
            current = arena.parent(parent);
        }
        false
    }

    fn ensure<R: Record>(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.cache.is_some() {
            return;
        }
        let below = source.items(ctx).to_vec();
        let tree = ctx.factory.is_tree();
        let starting_key = self
            .draggable
            .and_then(|id| ctx.arena.get(id))
            .and_then(DisplayItem::key)
            .cloned();

        self.hidden_indexes.clear();
        let mut hidden = HashSet::new();
        let mut items = Vec::with_capacity(below.len() + 1);
        for (index, &id) in below.iter().enumerate() {
            let Some(item) = ctx.arena.get(id) else {
                continue;
            };
            if item.as_collection_item().is_none() {
                items.push(id);
                continue;
            }
            let key = item.key();
            let dragged = key.is_some_and(|key| self.dragged_keys.contains(key));
            if !dragged && !(tree && self.has_dragged_ancestor(ctx.arena, id)) {
                items.push(id);
                continue;
            }
            hidden.insert(id);
            if starting_key.is_some() && key != starting_key.as_ref() {
                self.hidden_indexes.push(index);
            }
        }

        if self.avatar.is_none() {
            self.avatar = self.draggable.and_then(|proto| create_avatar(ctx.arena, proto));
        }
        if let Some(avatar) = self.avatar {
            self.start_index = self.correct(self.start_index);
            items.insert(self.start_index.min(items.len()), avatar);
        }
        self.target_index = self.correct(self.target_index);

        let order = sort_items(
            items.len(),
            self.target_index,
            self.start_index,
            self.avatar.is_some(),
            ctx.filter_map,
        );
        let cache: Vec<ItemId> = order.iter().map(|&index| items[index]).collect();

        if tree {
            if let Some(avatar) = self.avatar {
                let root = ctx.factory.tree.as_ref().and_then(|tree| tree.root);
                let parent = avatar_parent(ctx.arena, &cache, avatar, &hidden).or(root);
                if let Some(item) = ctx.arena.get_mut(avatar).and_then(DisplayItem::as_tree_item_mut) {
                    item.set_parent(parent);
                }
            }
        }
        self.cache = Some(cache);
    }
}

fn create_avatar<R>(arena: &mut ItemArena<R>, proto: ItemId) -> Option<ItemId> {
    let item = {
        let proto = arena.get(proto)?;
        let base = CollectionItem::avatar_of(proto.as_collection_item()?);
        match proto.as_tree_item() {
            Some(node) => DisplayItem::Tree(TreeItem::new(base, node.node(), node.has_children())),
            None => DisplayItem::Record(base),
        }
    };
    Some(arena.insert(item))
}

/// Parent of the item after the avatar, else of the one before it, moved up
/// to the nearest ancestor that is not hidden by the drag.
fn avatar_parent<R>(
    arena: &ItemArena<R>,
    items: &[ItemId],
    avatar: ItemId,
    hidden: &HashSet<ItemId>,
) -> Option<ItemId> {
    let position = items.iter().position(|&id| id == avatar)?;
    let neighbour = items
        .get(position + 1)
        .or_else(|| position.checked_sub(1).and_then(|previous| items.get(previous)))?;
    let mut parent = arena.parent(*neighbour);
    let mut guard = arena.len();
    while let Some(id) = parent {
        if !hidden.contains(&id) || guard == 0 {
            break;
        }
        guard -= 1;
        parent = arena.parent(id);
    }
    parent
}

/// Display order of `count` items with the avatar moved from `start` to
/// `target`.
fn sort_items(
    count: usize,
    target: usize,
    start: usize,
    with_avatar: bool,
    filter_map: &[Option<bool>],
) -> Vec<usize> {
    match count {
        0 => return Vec::new(),
        1 => return vec![0],
        _ => {}
    }
    let mut order: Vec<usize> = (0..count).collect();
    if with_avatar {
        // Both indices may point past the end when the tail was dragged.
        let target = if target < count {
            index_given_filter(target, filter_map)
        } else {
            count - 1
        };
        let start = start.min(count - 1);
        order.remove(start);
        order.insert(target.min(order.len()), start);
    }
    order
}

/// Translate a position among visible items to a position among all items.
fn index_given_filter(visible_index: usize, filter_map: &[Option<bool>]) -> usize {
    if filter_map.is_empty() {
        return visible_index;
    }
    filter_map
        .iter()
        .enumerate()
        .filter(|(_, passed)| **passed == Some(true))
        .nth(visible_index)
        .map_or(0, |(index, _)| index)
}

impl<R: Record> ItemsStrategy<R> for DragStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Drag
    }

    fn items<'s>(&'s mut self, mut source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId] {
        self.ensure(&mut source, ctx);
        self.cache.as_deref().unwrap_or(&[])
    }

    fn invalidate(&mut self, mut source: Chain<'_, R>) {
        self.cache = None;
        source.invalidate();
    }

    fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if let Some(avatar) = self.avatar.take() {
            ctx.arena.detach(avatar);
        }
        self.cache = None;
        source.reset(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MapRecord, PropertyValue};
    use crate::strategy::testing::Fixture;
    use crate::strategy::{AdjacencyListStrategy, DirectStrategy, StrategyBox, TreeSettings};

    /// Build the layers and the drag layer started from the item at `start`.
    fn create_test_layers(fx: &mut Fixture, keys: &[&str], start: usize) -> Vec<StrategyBox<MapRecord>> {
        let mut layers: Vec<StrategyBox<MapRecord>> = vec![Box::new(DirectStrategy::new(false))];
        if fx.factory.is_tree() {
            layers.push(Box::new(AdjacencyListStrategy::new()));
        }
        let below = fx.items(&mut layers);
        fx.filter_map = vec![Some(true); below.len()];
        let dragged = keys.iter().map(|&key| RecordKey::from(key)).collect();
        layers.push(Box::new(DragStrategy::new(dragged, below.get(start).copied(), start)));
        layers
    }

    fn drag_layer(layers: &mut [StrategyBox<MapRecord>]) -> &mut DragStrategy {
        layers
            .last_mut()
            .and_then(|layer| layer.as_any_mut().downcast_mut::<DragStrategy>())
            .unwrap()
    }

    #[test]
    fn test_avatar_moves_before_target() {
        let mut fx = Fixture::new(&["A", "B", "C"]);
        let mut layers = create_test_layers(&mut fx, &["B"], 1);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["A", "avatar(B)", "C"]);

        drag_layer(&mut layers).set_position(0, DragPosition::Before);
        Chain::new(&mut layers).invalidate();
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["avatar(B)", "A", "C"]);
    }

    #[test]
    fn test_position_after() {
        let mut fx = Fixture::new(&["A", "B", "C", "D"]);
        let mut layers = create_test_layers(&mut fx, &["A"], 0);
        drag_layer(&mut layers).set_position(2, DragPosition::After);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["B", "C", "avatar(A)", "D"]);
        assert_eq!(drag_layer(&mut layers).target_index(), 2);
    }

    #[test]
    fn test_hidden_records_shift_the_start() {
        let mut fx = Fixture::new(&["A", "B", "C", "D"]);
        let mut layers = create_test_layers(&mut fx, &["A", "C"], 2);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["B", "avatar(C)", "D"]);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).display_index(0, ctx)), None);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(2, ctx)), Some(3));
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(1, ctx)), None);
    }

    #[test]
    fn test_reset_releases_the_avatar() {
        let mut fx = Fixture::new(&["A", "B"]);
        let mut layers = create_test_layers(&mut fx, &["A"], 0);
        fx.items(&mut layers);
        let avatar = drag_layer(&mut layers).avatar().unwrap();
        fx.with_ctx(|ctx| Chain::new(&mut layers).reset(ctx));
        assert!(fx.arena.is_detached(avatar));
    }

    #[test]
    fn test_tree_hides_descendants() {
        let node = |id: &str, parent: Option<&str>| {
            MapRecord::new()
                .with("id", id)
                .with("parent", PropertyValue::from(parent))
                .with("node", true)
        };
        let mut fx = Fixture::from_records(vec![node("1", None), node("2", Some("1")), node("3", None)])
            .with_tree(TreeSettings {
                parent_property: "parent".into(),
                node_property: Some("node".into()),
                ..TreeSettings::default()
            });
        let mut layers = create_test_layers(&mut fx, &["1"], 0);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["avatar(1)", "3"]);

        let root = fx.factory.tree.as_ref().and_then(|tree| tree.root);
        assert_eq!(fx.arena.parent(items[0]), root);
    }

    #[test]
    fn test_sort_items_clamps_indices() {
        assert_eq!(sort_items(3, 7, 9, true, &[]), vec![0, 1, 2]);
        assert_eq!(sort_items(3, 0, 2, true, &[]), vec![2, 0, 1]);
        assert_eq!(sort_items(1, 0, 0, true, &[]), vec![0]);
        assert_eq!(index_given_filter(1, &[Some(true), Some(false), Some(true)]), 2);
    }
}
