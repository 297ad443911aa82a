//! Text dumps of a projection.
//!
//! ```
//! use std::sync::Arc;
//! use horizon_display::collection::Collection;
//! use horizon_display::debug::{DebugOptions, ProjectionDebug};
//! use horizon_display::record::MapRecord;
//! use horizon_display::source::SourceList;
//!
//! let source = Arc::new(SourceList::new(vec![MapRecord::new().with("id", "A")]));
//! let mut projection = Collection::builder().source(source).key_property("id").build().unwrap();
//!
//! let dump = ProjectionDebug::with_options(DebugOptions::minimal()).format(&mut projection);
//! assert!(dump.contains('A'));
//! ```

use crate::collection::Collection;
use crate::item::{DisplayItem, ItemId};
use crate::record::{PropertyValue, Record};

/// Branch drawing style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Dashes only.
    Compact,
}

/// What [`ProjectionDebug`] prints.
#[derive(Debug, Clone)]
pub struct DebugOptions {
    pub style: TreeStyle,
    /// Print unique ids.
    pub show_uids: bool,
    /// Print item kinds.
    pub show_kinds: bool,
    /// Print item versions.
    pub show_versions: bool,
    /// Print items hidden by filters or collapsed parents.
    pub show_hidden: bool,
    /// Deepest level printed (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_uids: true,
            show_kinds: true,
            show_versions: false,
            show_hidden: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl DebugOptions {
    /// Everything, including hidden items.
    pub fn detailed() -> Self {
        Self {
            show_versions: true,
            show_hidden: true,
            ..Default::default()
        }
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_uids: false,
            show_kinds: false,
            show_versions: false,
            ..Default::default()
        }
    }
}

/// Formats a projection as an indented tree.
#[derive(Debug, Clone, Default)]
pub struct ProjectionDebug {
    options: DebugOptions,
}

impl ProjectionDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DebugOptions) -> Self {
        Self { options }
    }

    /// Format the projection. Takes `&mut` because unique ids are assigned
    /// lazily.
    pub fn format<R: Record>(&self, collection: &mut Collection<R>) -> String {
        let ids: Vec<ItemId> = if self.options.show_hidden {
            collection.all_items().to_vec()
        } else {
            collection.items().to_vec()
        };
        let depths = self.depths(collection, &ids);

        let mut output = format!("Projection ({} items, version {}):\n", ids.len(), collection.version());
        if ids.is_empty() {
            output.push_str("  (empty)\n");
        }
        for (position, (&id, &depth)) in ids.iter().zip(&depths).enumerate() {
            if self.options.max_depth.is_some_and(|max| depth > max) {
                continue;
            }
            let is_last = depths[position + 1..]
                .iter()
                .find(|&&next| next <= depth)
                .is_none_or(|&next| next < depth);
            output.push_str(&self.build_prefix(depth, is_last));
            output.push_str(&self.describe(collection, id));
            output.push('\n');
        }
        output
    }

    fn depths<R: Record>(&self, collection: &Collection<R>, ids: &[ItemId]) -> Vec<usize> {
        let mut grouped = false;
        ids.iter()
            .map(|&id| match collection.item(id) {
                Some(DisplayItem::Group(_)) => {
                    grouped = true;
                    0
                }
                Some(DisplayItem::Record(_)) => usize::from(grouped),
                Some(_) => {
                    let enumerable = collection.tree.as_ref().is_some_and(|tree| tree.root_enumerable);
                    let level = collection.arena.level(id);
                    if enumerable { level } else { level.saturating_sub(1) }
                }
                None => 0,
            })
            .collect()
    }

    fn describe<R: Record>(&self, collection: &mut Collection<R>, id: ItemId) -> String {
        let Some(item) = collection.item(id) else {
            return "(released)".to_string();
        };
        let mut line = label(collection, item);
        let kind = item.kind();
        let version = item.version();
        let selected = item.is_selected();
        if selected {
            line.push_str(" *");
        }
        if self.options.show_uids {
            if let Ok(uid) = collection.item_uid(id) {
                line.push_str(&format!(" [{uid}]"));
            }
        }
        if self.options.show_kinds {
            line.push_str(&format!(" ({kind:?})"));
        }
        if self.options.show_versions {
            line.push_str(&format!(" v{version}"));
        }
        line
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }
        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };
        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

fn label<R: Record>(collection: &Collection<R>, item: &DisplayItem<R>) -> String {
    match item {
        DisplayItem::Group(group) => format!("[{}]", group.key()),
        DisplayItem::Root(root) => match root.key() {
            Some(key) => format!("(root {key})"),
            None => "(root)".to_string(),
        },
        DisplayItem::NodeHeader(_) => "(header)".to_string(),
        DisplayItem::NodeFooter(_) => "(footer)".to_string(),
        DisplayItem::Record(_) | DisplayItem::Tree(_) => {
            let shown = collection
                .display_property()
                .zip(item.record())
                .map(|(property, record)| value_label(&record.get(property)));
            match (shown, item.key()) {
                (Some(text), _) => text,
                (None, Some(key)) => key.to_string(),
                (None, None) => "(record)".to_string(),
            }
        }
    }
}

fn value_label(value: &PropertyValue) -> String {
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    if let Some(number) = value.as_int() {
        return number.to_string();
    }
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collection::tests::create_test_source;
    use crate::item::GroupKey;
    use crate::record::MapRecord;
    use crate::source::SourceList;

    #[test]
    fn test_flat_groups_indent_members() {
        let mut collection = Collection::builder()
            .source(create_test_source(&["A", "B"]))
            .key_property("id")
            .group(|_: &MapRecord, _| GroupKey::from("g"))
            .build()
            .unwrap();
        let dump = ProjectionDebug::with_options(DebugOptions {
            style: TreeStyle::Ascii,
            ..DebugOptions::minimal()
        })
        .format(&mut collection);
        let lines: Vec<&str> = dump.lines().skip(1).collect();
        assert_eq!(lines, vec!["[g]", "+-- A", "`-- B"]);
    }

    #[test]
    fn test_tree_levels_and_uids() {
        let source = Arc::new(SourceList::new(vec![
            MapRecord::new().with("id", 1).with("node", true),
            MapRecord::new().with("id", 2).with("parent", 1),
        ]));
        let mut tree = Collection::builder()
            .source(source)
            .key_property("id")
            .node_property("node")
            .expand_all(true)
            .build()
            .unwrap();
        let dump = ProjectionDebug::new().format(&mut tree);
        let lines: Vec<&str> = dump.lines().skip(1).collect();
        assert_eq!(lines[0], "1 [1] (Tree)");
        assert_eq!(lines[1], "\u{2514}\u{2500}\u{2500} 2 [1:2] (Tree)");
    }

    #[test]
    fn test_empty_projection() {
        let mut collection = Collection::builder()
            .source(create_test_source(&[]))
            .key_property("id")
            .build()
            .unwrap();
        let dump = ProjectionDebug::new().format(&mut collection);
        assert!(dump.ends_with("(empty)\n"));
    }
}
