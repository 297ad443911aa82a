//! Group header item.

use std::fmt;

use horizon_display_core::{set_versioned, Version};
use serde::{Deserialize, Serialize};

use super::capability::{Expandable, Renderable, Versioned};
use super::next_instance_id;
use crate::record::RecordKey;

/// Key produced by a group function.
///
/// `Hidden` is the reserved catch-all group. Its header is kept in the
/// projection but flagged so consumers can skip drawing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKey {
    Hidden,
    Key(RecordKey),
}

impl GroupKey {
    pub fn is_hidden(&self) -> bool {
        matches!(self, GroupKey::Hidden)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Hidden => f.write_str("<hidden>"),
            GroupKey::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Key(RecordKey::from(s))
    }
}

impl From<i64> for GroupKey {
    fn from(n: i64) -> Self {
        GroupKey::Key(RecordKey::Int(n))
    }
}

impl From<RecordKey> for GroupKey {
    fn from(key: RecordKey) -> Self {
        GroupKey::Key(key)
    }
}

/// Header of a group of items.
#[derive(Debug)]
pub struct GroupItem {
    key: GroupKey,
    instance_id: u64,
    version: Version,
    expanded: bool,
    rendered: bool,
}

impl GroupItem {
    pub fn new(key: GroupKey, expanded: bool) -> Self {
        Self {
            key,
            instance_id: next_instance_id(),
            version: Version::default(),
            expanded,
            rendered: false,
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Whether this is the header of the catch-all group.
    pub fn is_hidden_group(&self) -> bool {
        self.key.is_hidden()
    }
}

impl Versioned for GroupItem {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn instance_id(&self) -> u64 {
        self.instance_id
    }
}

impl Expandable for GroupItem {
    fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn set_expanded(&mut self, expanded: bool) -> bool {
        set_versioned(&mut self.expanded, expanded, &mut self.version)
    }
}

impl Renderable for GroupItem {
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
