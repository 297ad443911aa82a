//! The flat record item.

use std::sync::Arc;

use horizon_display_core::{set_versioned, Version};

use super::capability::{
    Draggable, Editable, Hoverable, Markable, Renderable, Selectable, Versioned,
};
use super::next_instance_id;
use crate::record::RecordKey;

/// A projection item wrapping one record.
///
/// Also used for the drag avatar and the add-in-place row, which wrap records
/// that are not (or not yet) part of the source.
#[derive(Debug)]
pub struct CollectionItem<R> {
    contents: Arc<R>,
    key: Option<RecordKey>,
    instance_id: u64,
    version: Version,
    selected: Option<bool>,
    marked: bool,
    hovered: bool,
    active: bool,
    editing: bool,
    editing_contents: Option<Arc<R>>,
    dragged: bool,
    faded: bool,
    pinned: bool,
    adding: bool,
    rendered: bool,
    rendered_outside_range: bool,
}

impl<R> CollectionItem<R> {
    /// Wrap a record.
    pub fn new(contents: Arc<R>, key: Option<RecordKey>) -> Self {
        Self {
            contents,
            key,
            instance_id: next_instance_id(),
            version: Version::default(),
            selected: Some(false),
            marked: false,
            hovered: false,
            active: false,
            editing: false,
            editing_contents: None,
            dragged: false,
            faded: false,
            pinned: false,
            adding: false,
            rendered: false,
            rendered_outside_range: false,
        }
    }

    /// Create the drag avatar of `proto`: same record, dragged, with the
    /// prototype's selection and marker copied.
    pub fn avatar_of(proto: &CollectionItem<R>) -> Self {
        let mut avatar = Self::new(proto.contents.clone(), proto.key.clone());
        avatar.dragged = true;
        avatar.marked = proto.marked;
        avatar.selected = proto.selected;
        avatar
    }

    /// The wrapped record.
    pub fn contents(&self) -> &Arc<R> {
        &self.contents
    }

    /// Swap the wrapped record (the source replaced it in place).
    pub fn set_contents(&mut self, contents: Arc<R>) -> bool {
        if Arc::ptr_eq(&self.contents, &contents) {
            return false;
        }
        self.contents = contents;
        self.version.bump();
        true
    }

    /// Key of the wrapped record, when one could be extracted.
    pub fn key(&self) -> Option<&RecordKey> {
        self.key.as_ref()
    }

    pub(crate) fn set_key(&mut self, key: Option<RecordKey>) {
        self.key = key;
    }

    /// Whether this is the uncommitted add-in-place row.
    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub(crate) fn set_adding(&mut self, adding: bool) -> bool {
        set_versioned(&mut self.adding, adding, &mut self.version)
    }

    /// Whether the item is pinned for sticky rendering.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Pin or unpin the item.
    pub fn set_pinned(&mut self, pinned: bool) -> bool {
        set_versioned(&mut self.pinned, pinned, &mut self.version)
    }

    pub(crate) fn bump_version(&mut self) -> u64 {
        self.version.bump()
    }

    pub(crate) fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }
}

impl<R> Versioned for CollectionItem<R> {
    fn version(&self) -> u64 {
        self.version.get()
    }

    fn instance_id(&self) -> u64 {
        self.instance_id
    }
}

impl<R> Selectable for CollectionItem<R> {
    fn selected(&self) -> Option<bool> {
        self.selected
    }

    fn set_selected(&mut self, selected: Option<bool>) -> bool {
        set_versioned(&mut self.selected, selected, &mut self.version)
    }
}

impl<R> Markable for CollectionItem<R> {
    fn is_marked(&self) -> bool {
        self.marked
    }

    fn set_marked(&mut self, marked: bool) -> bool {
        set_versioned(&mut self.marked, marked, &mut self.version)
    }
}

impl<R> Hoverable for CollectionItem<R> {
    fn is_hovered(&self) -> bool {
        self.hovered
    }

    fn set_hovered(&mut self, hovered: bool) -> bool {
        set_versioned(&mut self.hovered, hovered, &mut self.version)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) -> bool {
        set_versioned(&mut self.active, active, &mut self.version)
    }
}

impl<R> Editable<R> for CollectionItem<R> {
    fn is_editing(&self) -> bool {
        self.editing
    }

    fn editing_contents(&self) -> Option<&Arc<R>> {
        self.editing_contents.as_ref()
    }

    fn set_editing(&mut self, editing: bool, contents: Option<Arc<R>>) -> bool {
        let contents = if editing { contents } else { None };
        let same_contents = match (&self.editing_contents, &contents) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        if self.editing == editing && same_contents {
            return false;
        }
        self.editing = editing;
        self.editing_contents = contents;
        self.version.bump();
        true
    }
}

impl<R> Draggable for CollectionItem<R> {
    fn is_dragged(&self) -> bool {
        self.dragged
    }

    fn set_dragged(&mut self, dragged: bool) -> bool {
        set_versioned(&mut self.dragged, dragged, &mut self.version)
    }

    fn is_faded(&self) -> bool {
        self.faded
    }

    fn set_faded(&mut self, faded: bool) -> bool {
        set_versioned(&mut self.faded, faded, &mut self.version)
    }
}

impl<R> Renderable for CollectionItem<R> {
    fn is_sticky(&self) -> bool {
        self.pinned || self.editing
    }

    fn is_rendered(&self) -> bool {
        self.rendered
    }

    fn set_rendered(&mut self, rendered: bool) -> bool {
        set_versioned(&mut self.rendered, rendered, &mut self.version)
    }

    fn is_rendered_outside_range(&self) -> bool {
        self.rendered_outside_range
    }

    fn set_rendered_outside_range(&mut self, outside: bool) -> bool {
        set_versioned(&mut self.rendered_outside_range, outside, &mut self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_item() -> CollectionItem<&'static str> {
        CollectionItem::new(Arc::new("A"), Some(RecordKey::from("A")))
    }

    #[test]
    fn test_version_bumps_only_on_change() {
        let mut item = create_test_item();
        assert_eq!(item.version(), 0);

        assert!(item.set_marked(true));
        assert!(!item.set_marked(true));
        assert!(item.set_selected(None));
        assert!(!item.set_selected(None));
        assert!(item.set_hovered(true));
        assert_eq!(item.version(), 3);
    }

    #[test]
    fn test_editing_contents_follow_flag() {
        let mut item = create_test_item();
        let shadow = Arc::new("A*");

        assert!(item.set_editing(true, Some(shadow.clone())));
        assert!(!item.set_editing(true, Some(shadow)));
        assert_eq!(item.editing_contents().map(|c| **c), Some("A*"));
        assert!(item.is_sticky());

        assert!(item.set_editing(false, None));
        assert!(item.editing_contents().is_none());
        assert!(!item.is_sticky());
    }

    #[test]
    fn test_avatar_copies_state() {
        let mut proto = create_test_item();
        proto.set_marked(true);
        proto.set_selected(Some(true));

        let avatar = CollectionItem::avatar_of(&proto);
        assert!(avatar.is_dragged());
        assert!(avatar.is_marked());
        assert!(avatar.is_selected());
        assert_ne!(avatar.instance_id(), proto.instance_id());
        assert!(Arc::ptr_eq(avatar.contents(), proto.contents()));
    }
}
