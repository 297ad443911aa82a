//! Windowed iteration through the installed viewport.

use std::sync::Arc;

use horizon_display::item::Renderable;
use horizon_display::prelude::*;

fn create_projection(count: usize) -> (Arc<SourceList<MapRecord>>, Collection<MapRecord>) {
    let source = Arc::new(SourceList::new(
        (0..count as i64).map(|id| MapRecord::new().with("id", id)).collect(),
    ));
    let projection = Collection::builder()
        .source(source.clone())
        .key_property("id")
        .build()
        .unwrap();
    (source, projection)
}

fn visited(projection: &mut Collection<MapRecord>) -> Vec<usize> {
    let mut indices = Vec::new();
    projection.each(|index, _, _| indices.push(index));
    indices
}

#[test]
fn test_without_viewport_each_visits_everything() {
    let (_, mut projection) = create_projection(4);
    assert_eq!(visited(&mut projection), vec![0, 1, 2, 3]);
}

#[test]
fn test_virtual_scroll_window_and_sticky_items() {
    let (_, mut projection) = create_projection(10);
    projection.set_viewport(Some(Box::new(VirtualScroll::new(3))));
    assert_eq!(visited(&mut projection), vec![0, 1, 2]);

    let pinned = projection.at(7).unwrap();
    projection.set_pinned(pinned, true).unwrap();
    assert_eq!(visited(&mut projection), vec![0, 1, 2, 7]);
    let outside = projection
        .item(pinned)
        .and_then(DisplayItem::renderable)
        .is_some_and(|item| item.is_rendered_outside_range());
    assert!(outside);

    let version = projection.version();
    projection.with_viewport(|viewport: &mut VirtualScroll| viewport.shift_to(5));
    assert!(projection.version() > version);
    assert_eq!(visited(&mut projection), vec![5, 6, 7]);
}

#[test]
fn test_virtual_scroll_follows_insertions_above() {
    let (source, mut projection) = create_projection(10);
    projection.set_viewport(Some(Box::new(VirtualScroll::new(3))));
    projection.with_viewport(|viewport: &mut VirtualScroll| viewport.shift_to(5));

    source.insert(0, MapRecord::new().with("id", 100));
    let record = source.at(0).unwrap();
    projection.on_collection_change(&CollectionChange::new(
        ChangeAction::Add,
        vec![record],
        0,
        Vec::new(),
        0,
    ));
    assert_eq!(projection.count(false), 11);
    assert_eq!(projection.viewport().map(|viewport| viewport.range()), Some(6..9));
}

#[test]
fn test_rendered_scroll_keeps_previous_windows() {
    let (_, mut projection) = create_projection(10);
    projection.set_viewport(Some(Box::new(RenderedScroll::new(3))));
    projection.set_viewport_range(5, 8);
    projection.set_viewport_range(1, 3);
    assert_eq!(visited(&mut projection), vec![1, 2, 5, 6, 7]);

    projection.hide_rendered();
    assert_eq!(visited(&mut projection), vec![1, 2]);
}

#[test]
fn test_unchanged_window_keeps_version() {
    let (_, mut projection) = create_projection(10);
    projection.set_viewport(Some(Box::new(RenderedScroll::new(3))));
    projection.set_viewport_range(0, 3);
    let version = projection.version();

    projection.set_viewport_range(0, 3);
    assert_eq!(projection.version(), version);
    projection.hide_rendered();
    assert_eq!(projection.version(), version);

    projection.set_viewport_range(3, 6);
    assert!(projection.version() > version);
    let version = projection.version();
    projection.hide_rendered();
    assert!(projection.version() > version);
}

#[test]
fn test_virtual_scroll_bumps_only_on_moves() {
    let (_, mut projection) = create_projection(10);
    projection.set_viewport(Some(Box::new(VirtualScroll::new(3))));
    let version = projection.version();

    projection.set_viewport_range(0, 3);
    projection.with_viewport(|viewport: &mut VirtualScroll| viewport.shift_to(0));
    assert_eq!(projection.version(), version);

    projection.set_viewport_range(2, 5);
    assert!(projection.version() > version);
}
