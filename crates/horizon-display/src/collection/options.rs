//! Projection options and the builder producing them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::filter::Filter;
use super::Collection;
use crate::error::{Error, Result};
use crate::item::{GroupKey, HasMore};
use crate::record::{Record, RecordKey};
use crate::source::SourceCollection;
use crate::strategy::{FooterVisibilityFn, GroupFn, SortFn};
use crate::tree::Tree;

/// When selection checkboxes are shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiSelectVisibility {
    #[default]
    Hidden,
    Visible,
    OnHover,
}

/// Options of a flat projection.
pub struct CollectionOptions<R> {
    /// Property holding each record's key.
    pub key_property: Option<String>,
    /// Property holding each record's caption.
    pub display_property: Option<String>,
    /// Show only the first record of every key.
    pub unique: bool,
    pub filters: Vec<Filter<R>>,
    pub sort: Vec<SortFn<R>>,
    pub group: Option<GroupFn<R>>,
    pub collapsed_groups: BTreeSet<GroupKey>,
    /// Properties whose change moves a record in the projection.
    pub important_item_properties: Vec<String>,
    /// Rebuild from scratch on every source reset.
    pub compatible_reset: bool,
    pub multi_select_visibility: MultiSelectVisibility,
    /// Hierarchy options, for tree projections.
    pub tree: Option<TreeOptions<R>>,
}

impl<R> Default for CollectionOptions<R> {
    fn default() -> Self {
        Self {
            key_property: None,
            display_property: None,
            unique: false,
            filters: Vec::new(),
            sort: Vec::new(),
            group: None,
            collapsed_groups: BTreeSet::new(),
            important_item_properties: Vec::new(),
            compatible_reset: false,
            multi_select_visibility: MultiSelectVisibility::default(),
            tree: None,
        }
    }
}

impl<R> fmt::Debug for CollectionOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("key_property", &self.key_property)
            .field("display_property", &self.display_property)
            .field("unique", &self.unique)
            .field("filters", &self.filters.len())
            .field("sort", &self.sort.len())
            .field("grouped", &self.group.is_some())
            .field("collapsed_groups", &self.collapsed_groups)
            .field("important_item_properties", &self.important_item_properties)
            .field("compatible_reset", &self.compatible_reset)
            .field("tree", &self.tree)
            .finish()
    }
}

/// Hierarchy options of a tree projection.
pub struct TreeOptions<R> {
    /// Property holding the parent key (adjacency list).
    pub parent_property: String,
    /// Property holding the node flag: `true` node, `false` hidden node,
    /// null leaf.
    pub node_property: Option<String>,
    /// Property declaring whether a node has children.
    pub has_children_property: Option<String>,
    /// Property holding nested children. Switches to materialized paths.
    pub children_property: Option<String>,
    /// Key of the root.
    pub root: Option<RecordKey>,
    /// Show the root as the first item.
    pub root_enumerable: bool,
    pub expanded_items: BTreeSet<RecordKey>,
    /// Expand every node except `collapsed_items`.
    pub expand_all: bool,
    pub collapsed_items: BTreeSet<RecordKey>,
    pub has_more_storage: HashMap<RecordKey, HasMore>,
    pub node_header: bool,
    pub node_footer: bool,
    pub footer_visibility: Option<FooterVisibilityFn<R>>,
}

impl<R> Default for TreeOptions<R> {
    fn default() -> Self {
        Self {
            parent_property: "parent".to_string(),
            node_property: None,
            has_children_property: None,
            children_property: None,
            root: None,
            root_enumerable: false,
            expanded_items: BTreeSet::new(),
            expand_all: false,
            collapsed_items: BTreeSet::new(),
            has_more_storage: HashMap::new(),
            node_header: false,
            node_footer: false,
            footer_visibility: None,
        }
    }
}

impl<R> fmt::Debug for TreeOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("parent_property", &self.parent_property)
            .field("node_property", &self.node_property)
            .field("has_children_property", &self.has_children_property)
            .field("children_property", &self.children_property)
            .field("root", &self.root)
            .field("root_enumerable", &self.root_enumerable)
            .field("expanded_items", &self.expanded_items)
            .field("expand_all", &self.expand_all)
            .field("collapsed_items", &self.collapsed_items)
            .field("node_header", &self.node_header)
            .field("node_footer", &self.node_footer)
            .finish()
    }
}

/// Builder for [`Collection`] and [`Tree`] projections.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_display::collection::Collection;
/// use horizon_display::record::{MapRecord, Record};
/// use horizon_display::source::SourceList;
///
/// let source = Arc::new(SourceList::new(vec![
///     MapRecord::new().with("id", 1).with("title", "b"),
///     MapRecord::new().with("id", 2).with("title", "a"),
/// ]));
/// let projection = Collection::builder()
///     .source(source)
///     .key_property("id")
///     .sort(|a: &MapRecord, b: &MapRecord| a.get("title").as_str().cmp(&b.get("title").as_str()))
///     .build()
///     .unwrap();
/// assert_eq!(projection.count(false), 2);
/// ```
pub struct CollectionBuilder<R: Record> {
    source: Option<Arc<dyn SourceCollection<R>>>,
    options: CollectionOptions<R>,
}

impl<R: Record> Default for CollectionBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CollectionBuilder<R> {
    /// Creates a builder with default options and no source.
    pub fn new() -> Self {
        Self {
            source: None,
            options: CollectionOptions::default(),
        }
    }

    /// Sets the source collection.
    pub fn source<S>(mut self, source: Arc<S>) -> Self
    where
        S: SourceCollection<R> + 'static,
    {
        self.source = Some(source);
        self
    }

    /// Sets the source collection from a trait object.
    pub fn shared_source(mut self, source: Arc<dyn SourceCollection<R>>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn key_property(mut self, property: impl Into<String>) -> Self {
        self.options.key_property = Some(property.into());
        self
    }

    pub fn display_property(mut self, property: impl Into<String>) -> Self {
        self.options.display_property = Some(property.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.options.unique = unique;
        self
    }

    /// Adds a record filter.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.options.filters.push(Filter::by_record(f));
        self
    }

    /// Adds a filter that sees every item, pseudo-items included.
    pub fn item_filter(mut self, filter: Filter<R>) -> Self {
        self.options.filters.push(filter);
        self
    }

    /// Adds a record comparator.
    pub fn sort<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &R) -> std::cmp::Ordering + Send + Sync + 'static,
    {
        self.options.sort.push(crate::strategy::sort_by_record(f));
        self
    }

    /// Adds a comparator that sees every item.
    pub fn item_sort(mut self, sort: SortFn<R>) -> Self {
        self.options.sort.push(sort);
        self
    }

    /// Sets the group function.
    pub fn group<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, usize) -> GroupKey + Send + Sync + 'static,
    {
        self.options.group = Some(Arc::new(f));
        self
    }

    pub fn collapsed_groups(mut self, keys: impl IntoIterator<Item = GroupKey>) -> Self {
        self.options.collapsed_groups = keys.into_iter().collect();
        self
    }

    pub fn important_item_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.important_item_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn compatible_reset(mut self, compatible: bool) -> Self {
        self.options.compatible_reset = compatible;
        self
    }

    pub fn multi_select_visibility(mut self, visibility: MultiSelectVisibility) -> Self {
        self.options.multi_select_visibility = visibility;
        self
    }

    /// Turns the projection into a tree with `options`.
    pub fn tree(mut self, options: TreeOptions<R>) -> Self {
        self.options.tree = Some(options);
        self
    }

    fn tree_options(&mut self) -> &mut TreeOptions<R> {
        self.options.tree.get_or_insert_with(TreeOptions::default)
    }

    pub fn parent_property(mut self, property: impl Into<String>) -> Self {
        self.tree_options().parent_property = property.into();
        self
    }

    pub fn node_property(mut self, property: impl Into<String>) -> Self {
        self.tree_options().node_property = Some(property.into());
        self
    }

    pub fn has_children_property(mut self, property: impl Into<String>) -> Self {
        self.tree_options().has_children_property = Some(property.into());
        self
    }

    pub fn children_property(mut self, property: impl Into<String>) -> Self {
        self.tree_options().children_property = Some(property.into());
        self
    }

    pub fn root(mut self, key: impl Into<RecordKey>) -> Self {
        self.tree_options().root = Some(key.into());
        self
    }

    pub fn root_enumerable(mut self, enumerable: bool) -> Self {
        self.tree_options().root_enumerable = enumerable;
        self
    }

    pub fn expanded_items(mut self, keys: impl IntoIterator<Item = RecordKey>) -> Self {
        self.tree_options().expanded_items = keys.into_iter().collect();
        self
    }

    pub fn expand_all(mut self, expand_all: bool) -> Self {
        self.tree_options().expand_all = expand_all;
        self
    }

    pub fn collapsed_items(mut self, keys: impl IntoIterator<Item = RecordKey>) -> Self {
        self.tree_options().collapsed_items = keys.into_iter().collect();
        self
    }

    pub fn has_more_storage(mut self, storage: HashMap<RecordKey, HasMore>) -> Self {
        self.tree_options().has_more_storage = storage;
        self
    }

    pub fn node_header(mut self, enabled: bool) -> Self {
        self.tree_options().node_header = enabled;
        self
    }

    pub fn node_footer(mut self, enabled: bool) -> Self {
        self.tree_options().node_footer = enabled;
        self
    }

    pub fn footer_visibility<F>(mut self, f: F) -> Self
    where
        F: Fn(&crate::item::TreeItem<R>) -> bool + Send + Sync + 'static,
    {
        self.tree_options().footer_visibility = Some(Arc::new(f));
        self
    }

    /// Builds the projection.
    pub fn build(self) -> Result<Collection<R>> {
        let source = self.source.ok_or(Error::MissingSource)?;
        Ok(Collection::new(source, self.options))
    }

    /// Builds a tree projection. Tree options default when none were set.
    pub fn build_tree(mut self) -> Result<Tree<R>> {
        self.tree_options();
        Tree::from_collection(self.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use crate::source::SourceList;

    #[test]
    fn test_missing_source_fails_fast() {
        let result = CollectionBuilder::<MapRecord>::new().key_property("id").build();
        assert!(matches!(result, Err(Error::MissingSource)));
    }

    #[test]
    fn test_tree_setters_enable_tree_options() {
        let builder = CollectionBuilder::<MapRecord>::new()
            .source(Arc::new(SourceList::<MapRecord>::empty()))
            .parent_property("pid")
            .node_footer(true);
        let tree = builder.options.tree.as_ref().unwrap();
        assert_eq!(tree.parent_property, "pid");
        assert!(tree.node_footer);
        assert!(!tree.root_enumerable);
    }
}
