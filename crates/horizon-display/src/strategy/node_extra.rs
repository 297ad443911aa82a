//! "Load more" rows around the children of expanded nodes.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{Chain, ItemsStrategy, StrategyContext, StrategyKind};
use crate::item::{DisplayItem, Expandable, HasMore, ItemArena, ItemId, ItemKind, NodeExtraItem, TreeItem};
use crate::record::Record;

/// Decides whether an expanded node without more forward data still gets a
/// footer row.
pub type FooterVisibilityFn<R> = Arc<dyn Fn(&TreeItem<R>) -> bool + Send + Sync>;

/// Extra rows keyed by their node, plus the derived item list.
#[derive(Debug, Default)]
struct ExtraRows {
    rows: HashMap<ItemId, ItemId>,
    used: HashSet<ItemId>,
    cache: Option<Vec<ItemId>>,
    /// Position in the layer below of each cached item, `None` for rows.
    origin: Vec<Option<usize>>,
}

impl ExtraRows {
    fn begin(&mut self) -> (Vec<ItemId>, Vec<Option<usize>>) {
        self.used.clear();
        (Vec::new(), Vec::new())
    }

    /// The row of `node`, created on first use. Its `has_more` follows the
    /// node.
    fn row_for<R>(&mut self, arena: &mut ItemArena<R>, node: ItemId, kind: ItemKind) -> ItemId {
        let has_more = node_has_more(arena, node);
        self.used.insert(node);
        if let Some(&row) = self.rows.get(&node) {
            if let Some(extra) = arena.get_mut(row).and_then(DisplayItem::as_node_extra_mut) {
                extra.set_has_more(has_more);
            }
            return row;
        }
        let extra = NodeExtraItem::new(node, has_more);
        let row = arena.insert(match kind {
            ItemKind::NodeHeader => DisplayItem::NodeHeader(extra),
            _ => DisplayItem::NodeFooter(extra),
        });
        self.rows.insert(node, row);
        row
    }

    fn finish<R>(&mut self, arena: &mut ItemArena<R>, cache: Vec<ItemId>, origin: Vec<Option<usize>>) {
        let used = &self.used;
        self.rows.retain(|node, row| {
            let keep = used.contains(node);
            if !keep {
                arena.detach(*row);
            }
            keep
        });
        self.cache = Some(cache);
        self.origin = origin;
    }

    fn items(&self) -> &[ItemId] {
        self.cache.as_deref().unwrap_or(&[])
    }

    fn position_of(&self, source_position: usize) -> Option<usize> {
        self.origin
            .iter()
            .position(|&origin| origin == Some(source_position))
    }

    fn source_position(&self, index: usize) -> Option<usize> {
        *self.origin.get(index)?
    }

    fn reset<R>(&mut self, arena: &mut ItemArena<R>) {
        for (_, row) in self.rows.drain() {
            arena.detach(row);
        }
        self.cache = None;
        self.origin.clear();
    }
}

fn node_has_more<R>(arena: &ItemArena<R>, node: ItemId) -> HasMore {
    arena
        .get(node)
        .and_then(DisplayItem::as_tree_item)
        .map(TreeItem::has_more)
        .unwrap_or_default()
}

fn expanded_node<R>(arena: &ItemArena<R>, id: ItemId) -> Option<&TreeItem<R>> {
    arena
        .get(id)
        .and_then(DisplayItem::as_tree_item)
        .filter(|item| item.is_node() && item.is_expanded())
}

/// Inserts a header row right after every expanded node that has more
/// children to load backward.
#[derive(Debug, Default)]
pub struct NodeHeaderStrategy {
    rows: ExtraRows,
}

impl NodeHeaderStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure<R: Record>(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.rows.cache.is_some() {
            return;
        }
        let items = source.items(ctx).to_vec();
        let (mut cache, mut origin) = self.rows.begin();
        for (index, &id) in items.iter().enumerate() {
            cache.push(id);
            origin.push(Some(index));
            let wants_header = expanded_node(ctx.arena, id).is_some_and(|node| node.has_more().backward);
            if wants_header {
                cache.push(self.rows.row_for(ctx.arena, id, ItemKind::NodeHeader));
                origin.push(None);
            }
        }
        self.rows.finish(ctx.arena, cache, origin);
    }
}

/// Inserts a footer row after the last descendant of every expanded node
/// that has more children to load forward, or that the visibility callback
/// accepts.
pub struct NodeFooterStrategy<R> {
    rows: ExtraRows,
    visibility: Option<FooterVisibilityFn<R>>,
}

impl<R: Record> NodeFooterStrategy<R> {
    pub fn new(visibility: Option<FooterVisibilityFn<R>>) -> Self {
        Self {
            rows: ExtraRows::default(),
            visibility,
        }
    }

    pub fn set_visibility(&mut self, visibility: Option<FooterVisibilityFn<R>>) {
        self.visibility = visibility;
        self.rows.cache = None;
    }

    fn wants_footer(&self, arena: &ItemArena<R>, id: ItemId) -> bool {
        expanded_node(arena, id).is_some_and(|node| {
            node.has_more().forward || self.visibility.as_ref().is_some_and(|visible| visible(node))
        })
    }

    fn ensure(&mut self, source: &mut Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
        if self.rows.cache.is_some() {
            return;
        }
        let items = source.items(ctx).to_vec();
        let (mut cache, mut origin) = self.rows.begin();
        // Nodes whose footer is still pending, with their level.
        let mut open: Vec<(usize, ItemId)> = Vec::new();
        for (index, &id) in items.iter().enumerate() {
            let level = match ctx.arena.get(id).map(DisplayItem::kind) {
                Some(ItemKind::NodeHeader | ItemKind::NodeFooter) => ctx.arena.level(id) + 1,
                _ => ctx.arena.level(id),
            };
            while let Some(&(open_level, node)) = open.last() {
                if open_level < level {
                    break;
                }
                open.pop();
                cache.push(self.rows.row_for(ctx.arena, node, ItemKind::NodeFooter));
                origin.push(None);
            }
            cache.push(id);
            origin.push(Some(index));
            if self.wants_footer(ctx.arena, id) {
                open.push((level, id));
            }
        }
        while let Some((_, node)) = open.pop() {
            cache.push(self.rows.row_for(ctx.arena, node, ItemKind::NodeFooter));
            origin.push(None);
        }
        self.rows.finish(ctx.arena, cache, origin);
    }
}

macro_rules! extra_rows_strategy {
    ($kind:expr) => {
        fn kind(&self) -> StrategyKind {
            $kind
        }

        fn items<'s>(&'s mut self, mut source: Chain<'s, R>, ctx: &mut StrategyContext<'_, R>) -> &'s [ItemId] {
            self.ensure(&mut source, ctx);
            self.rows.items()
        }

        fn display_index(
            &mut self,
            index: usize,
            mut source: Chain<'_, R>,
            ctx: &mut StrategyContext<'_, R>,
        ) -> Option<usize> {
            let source_position = source.display_index(index, ctx)?;
            self.ensure(&mut source, ctx);
            self.rows.position_of(source_position)
        }

        fn collection_index(
            &mut self,
            index: usize,
            mut source: Chain<'_, R>,
            ctx: &mut StrategyContext<'_, R>,
        ) -> Option<usize> {
            self.ensure(&mut source, ctx);
            let source_position = self.rows.source_position(index)?;
            source.collection_index(source_position, ctx)
        }

        fn invalidate(&mut self, mut source: Chain<'_, R>) {
            self.rows.cache = None;
            source.invalidate();
        }

        fn reset(&mut self, mut source: Chain<'_, R>, ctx: &mut StrategyContext<'_, R>) {
            self.rows.reset(ctx.arena);
            source.reset(ctx);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

impl<R: Record> ItemsStrategy<R> for NodeHeaderStrategy {
    extra_rows_strategy!(StrategyKind::NodeHeader);
}

impl<R: Record> ItemsStrategy<R> for NodeFooterStrategy<R> {
    extra_rows_strategy!(StrategyKind::NodeFooter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MapRecord, PropertyValue, RecordKey};
    use crate::strategy::testing::Fixture;
    use crate::strategy::{AdjacencyListStrategy, DirectStrategy, StrategyBox, TreeSettings};

    fn node(id: &str, parent: Option<&str>) -> MapRecord {
        MapRecord::new()
            .with("id", id)
            .with("parent", PropertyValue::from(parent))
            .with("node", true)
    }

    fn leaf(id: &str, parent: &str) -> MapRecord {
        MapRecord::new().with("id", id).with("parent", parent)
    }

    fn create_test_fixture(records: Vec<MapRecord>, expanded: &[&str], has_more: &[(&str, HasMore)]) -> Fixture {
        let mut settings = TreeSettings {
            parent_property: "parent".into(),
            node_property: Some("node".into()),
            ..TreeSettings::default()
        };
        settings.expansion.expanded = expanded.iter().map(|&key| RecordKey::from(key)).collect();
        settings.has_more = has_more.iter().map(|&(key, more)| (RecordKey::from(key), more)).collect();
        Fixture::from_records(records).with_tree(settings)
    }

    fn create_test_layers(visibility: Option<FooterVisibilityFn<MapRecord>>) -> Vec<StrategyBox<MapRecord>> {
        vec![
            Box::new(DirectStrategy::new(false)),
            Box::new(AdjacencyListStrategy::new()),
            Box::new(NodeHeaderStrategy::new()),
            Box::new(NodeFooterStrategy::new(visibility)),
        ]
    }

    const BOTH: HasMore = HasMore {
        backward: true,
        forward: true,
    };

    const FORWARD: HasMore = HasMore {
        backward: false,
        forward: true,
    };

    #[test]
    fn test_header_and_footer_wrap_children() {
        let mut fx = create_test_fixture(
            vec![node("1", None), leaf("2", "1"), node("3", None)],
            &["1"],
            &[("1", BOTH), ("3", BOTH)],
        );
        let mut layers = create_test_layers(None);
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["1", "header(1)", "2", "footer(1)", "3"]);
        assert_eq!(fx.arena.parent(items[3]), Some(items[0]));
    }

    #[test]
    fn test_nested_footers_close_innermost_first() {
        let mut fx = create_test_fixture(
            vec![node("1", None), node("2", Some("1")), leaf("4", "2"), node("3", None)],
            &["1", "2"],
            &[("1", FORWARD), ("2", FORWARD)],
        );
        let mut layers = create_test_layers(None);
        let items = fx.items(&mut layers);
        assert_eq!(
            fx.labels(&items),
            vec!["1", "2", "4", "footer(2)", "footer(1)", "3"]
        );
    }

    #[test]
    fn test_visibility_callback_and_index_translation() {
        let mut fx = create_test_fixture(vec![node("1", None), leaf("2", "1")], &["1"], &[]);
        let mut layers = create_test_layers(Some(Arc::new(|_: &TreeItem<MapRecord>| true)));
        let items = fx.items(&mut layers);
        assert_eq!(fx.labels(&items), vec!["1", "2", "footer(1)"]);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(2, ctx)), None);
        assert_eq!(fx.with_ctx(|ctx| Chain::new(&mut layers).collection_index(1, ctx)), Some(1));
    }

    #[test]
    fn test_rows_are_released_with_their_node_state() {
        let mut fx = create_test_fixture(vec![node("1", None), leaf("2", "1")], &["1"], &[("1", FORWARD)]);
        let mut layers = create_test_layers(None);
        let before = fx.items(&mut layers);
        let footer = before[2];

        if let Some(item) = fx.arena.get_mut(before[0]).and_then(DisplayItem::as_tree_item_mut) {
            item.set_expanded(false);
        }
        Chain::new(&mut layers).invalidate();
        let after = fx.items(&mut layers);
        assert_eq!(fx.labels(&after), vec!["1", "2"]);
        assert!(fx.arena.is_detached(footer));
    }
}
