//! Stable unique ids of display items.

use std::collections::HashMap;

use super::Collection;
use crate::error::{Error, Result};
use crate::item::{DisplayItem, ItemId};
use crate::record::Record;

/// Assigned unique ids. Ids of live items never change; a hard rebuild
/// clears the cache.
#[derive(Debug, Default)]
pub(crate) struct UidCache {
    by_item: HashMap<ItemId, String>,
    counts: HashMap<String, usize>,
}

impl UidCache {
    pub fn clear(&mut self) {
        self.by_item.clear();
        self.counts.clear();
    }

    pub fn get(&self, id: ItemId) -> Option<&str> {
        self.by_item.get(&id).map(String::as_str)
    }

    /// Assign `base` to `id`, suffixed with `-N` when another item already
    /// took it.
    pub fn assign(&mut self, id: ItemId, base: String) -> String {
        if let Some(uid) = self.by_item.get(&id) {
            return uid.clone();
        }
        let seen = self.counts.entry(base.clone()).or_insert(0);
        let uid = if *seen == 0 { base } else { format!("{base}-{seen}") };
        *seen += 1;
        self.by_item.insert(id, uid.clone());
        uid
    }

    /// Forget ids of items for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(ItemId) -> bool) {
        self.by_item.retain(|&id, _| keep(id));
    }
}

impl<R: Record> Collection<R> {
    /// Unique id of an item.
    ///
    /// Record items use their key; tree items join the keys of their
    /// ancestors with `:`. Duplicate ids get a `-N` suffix. Pseudo-items use
    /// `group-<key>`, `root`, `<node>-header` and `<node>-footer`.
    pub fn item_uid(&mut self, id: ItemId) -> Result<String> {
        if let Some(uid) = self.uids.get(id) {
            return Ok(uid.to_string());
        }
        let base = self.base_uid(id)?;
        Ok(self.uids.assign(id, base))
    }

    fn base_uid(&mut self, id: ItemId) -> Result<String> {
        let item = self.arena.get(id).ok_or(Error::ItemNotFound)?;
        match item {
            DisplayItem::Group(group) => Ok(format!("group-{}", group.key())),
            DisplayItem::Root(_) => Ok("root".to_string()),
            DisplayItem::NodeHeader(extra) => {
                let node = extra.node();
                Ok(format!("{}-header", self.item_uid(node)?))
            }
            DisplayItem::NodeFooter(extra) => {
                let node = extra.node();
                Ok(format!("{}-footer", self.item_uid(node)?))
            }
            DisplayItem::Record(_) | DisplayItem::Tree(_) => {
                let mut path = vec![self.record_key(id)?];
                let mut parent = self.arena.parent(id);
                while let Some(ancestor) = parent {
                    match self.arena.get(ancestor) {
                        Some(DisplayItem::Tree(_)) => path.push(self.record_key(ancestor)?),
                        _ => break,
                    }
                    parent = self.arena.parent(ancestor);
                }
                path.reverse();
                Ok(path.join(":"))
            }
        }
    }

    fn record_key(&self, id: ItemId) -> Result<String> {
        if let Some(key) = self.arena.get(id).and_then(DisplayItem::key) {
            return Ok(key.to_string());
        }
        match &self.factory.key_property {
            Some(property) => Err(Error::key_not_found(property.clone())),
            None => Err(Error::MissingKeyProperty),
        }
    }

    /// Visible item whose unique id is `uid`.
    pub fn item_by_uid(&mut self, uid: &str) -> Option<ItemId> {
        let visible = self.visible.clone();
        visible
            .into_iter()
            .find(|&id| self.item_uid(id).is_ok_and(|candidate| candidate == uid))
    }
}
