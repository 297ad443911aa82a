//! Tree pseudo-items: the root and the node pagination rows.

use horizon_display_core::{set_versioned, Version};
use serde::{Deserialize, Serialize};

use super::capability::{Expandable, Renderable, Versioned};
use super::{next_instance_id, ItemId};
use crate::record::RecordKey;

/// Whether a node has more children to load in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HasMore {
    pub backward: bool,
    pub forward: bool,
}

impl HasMore {
    pub fn any(self) -> bool {
        self.backward || self.forward
    }
}

/// A "load more" row placed before or after a node's children.
#[derive(Debug)]
pub struct NodeExtraItem {
    node: ItemId,
    instance_id: u64,
    version: Version,
    has_more: HasMore,
    rendered: bool,
}

impl NodeExtraItem {
    pub fn new(node: ItemId, has_more: HasMore) -> Self {
        Self {
            node,
            instance_id: next_instance_id(),
            version: Version::default(),
            has_more,
            rendered: false,
        }
    }

    /// The node the row belongs to.
    pub fn node(&self) -> ItemId {
        self.node
    }

    pub fn has_more(&self) -> HasMore {
        self.has_more
    }

    pub fn set_has_more(&mut self, has_more: HasMore) -> bool {
        set_versioned(&mut self.has_more, has_more, &mut self.version)
    }
}

impl Versioned for NodeExtraItem {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn instance_id(&self) -> u64 {
        self.instance_id
    }
}

impl Renderable for NodeExtraItem {
    fn is_sticky(&self) -> bool {
        false
    }

    fn is_rendered(&self) -> bool {
        self.rendered
    }

    fn set_rendered(&mut self, rendered: bool) -> bool {
        set_versioned(&mut self.rendered, rendered, &mut self.version)
    }

    fn is_rendered_outside_range(&self) -> bool {
        false
    }

    fn set_rendered_outside_range(&mut self, _outside: bool) -> bool {
        false
    }
}

/// The tree root. Always expanded.
#[derive(Debug)]
pub struct RootItem {
    key: Option<RecordKey>,
    instance_id: u64,
    version: Version,
}

impl RootItem {
    pub fn new(key: Option<RecordKey>) -> Self {
        Self {
            key,
            instance_id: next_instance_id(),
            version: Version::default(),
        }
    }

    pub fn key(&self) -> Option<&RecordKey> {
        self.key.as_ref()
    }

    pub fn set_key(&mut self, key: Option<RecordKey>) -> bool {
        set_versioned(&mut self.key, key, &mut self.version)
    }
}

impl Versioned for RootItem {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn instance_id(&self) -> u64 {
        self.instance_id
    }
}

impl Expandable for RootItem {
    fn is_expanded(&self) -> bool {
        true
    }

    fn set_expanded(&mut self, _expanded: bool) -> bool {
        false
    }
}
