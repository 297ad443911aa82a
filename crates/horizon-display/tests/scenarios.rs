//! End-to-end behaviour of flat projections bound to a live source.

use std::sync::Arc;

use horizon_display::prelude::*;
use parking_lot::Mutex;

fn create_source(ids: &[&str]) -> Arc<SourceList<MapRecord>> {
    Arc::new(SourceList::new(
        ids.iter().map(|&id| MapRecord::new().with("id", id)).collect(),
    ))
}

fn keys(projection: &Collection<MapRecord>) -> Vec<String> {
    projection
        .items()
        .iter()
        .map(|&id| match projection.item(id) {
            Some(DisplayItem::Group(group)) => format!("G({})", group.key()),
            Some(item) => item.key().map(ToString::to_string).unwrap_or_default(),
            None => String::new(),
        })
        .collect()
}

fn bound(
    source: &Arc<SourceList<MapRecord>>,
    projection: Collection<MapRecord>,
) -> (Arc<Mutex<Collection<MapRecord>>>, SourceBinding<MapRecord>) {
    let projection = Arc::new(Mutex::new(projection));
    let binding = SourceBinding::bind(source.clone(), &projection);
    (projection, binding)
}

#[test]
fn test_plain_projection_keeps_source_order() {
    let projection = Collection::builder()
        .source(create_source(&["A", "B", "C"]))
        .key_property("id")
        .build()
        .unwrap();
    assert_eq!(keys(&projection), vec!["A", "B", "C"]);
    assert_eq!(projection.count(false), 3);
}

#[test]
fn test_grouping_buckets_in_input_order() {
    let projection = Collection::builder()
        .source(create_source(&["A", "B", "C"]))
        .key_property("id")
        .group(|record: &MapRecord, _| {
            GroupKey::from(if record.get("id").as_str() == Some("B") { "g2" } else { "g1" })
        })
        .build()
        .unwrap();
    assert_eq!(keys(&projection), vec!["G(g1)", "A", "C", "G(g2)", "B"]);
    assert_eq!(projection.count(true), 3);
}

#[test]
fn test_filter_hides_rejected_records() {
    let projection = Collection::builder()
        .source(create_source(&["A", "B", "C"]))
        .key_property("id")
        .filter(|record: &MapRecord| record.get("id").as_str() != Some("B"))
        .build()
        .unwrap();
    assert_eq!(keys(&projection), vec!["A", "C"]);
    assert_eq!(projection.count(true), 2);
}

#[test]
fn test_drag_session_moves_avatar_and_restores() {
    let mut projection = Collection::builder()
        .source(create_source(&["A", "B", "C"]))
        .key_property("id")
        .build()
        .unwrap();
    let b = projection.at(1).unwrap();
    projection.set_dragged_items(Some(b), vec![RecordKey::from("B")]);
    projection.set_drag_position(0, DragPosition::Before);

    let avatar = projection.drag_avatar().unwrap();
    assert_eq!(projection.at(0).ok(), Some(avatar));
    assert_eq!(keys(&projection), vec!["B", "A", "C"]);
    assert_eq!(projection.index_of(b), None);

    projection.reset_dragged_items();
    assert_eq!(keys(&projection), vec!["A", "B", "C"]);
    assert_eq!(projection.at(1).ok(), Some(b));
}

#[test]
fn test_source_mutations_reach_projection() {
    let source = create_source(&["A", "B", "C"]);
    let projection = Collection::builder()
        .source(source.clone())
        .key_property("id")
        .filter(|record: &MapRecord| record.get("id").as_str() != Some("X"))
        .build()
        .unwrap();
    let (projection, _binding) = bound(&source, projection);

    source.insert(1, MapRecord::new().with("id", "X"));
    assert_eq!(keys(&projection.lock()), vec!["A", "B", "C"]);
    source.push(MapRecord::new().with("id", "D"));
    assert_eq!(keys(&projection.lock()), vec!["A", "B", "C", "D"]);
    source.move_item(0, 4);
    assert_eq!(keys(&projection.lock()), vec!["B", "C", "D", "A"]);
    source.replace(2, MapRecord::new().with("id", "E"));
    assert_eq!(keys(&projection.lock()), vec!["B", "E", "D", "A"]);
    source.remove(1);
    assert_eq!(keys(&projection.lock()), vec!["E", "D", "A"]);
}

#[test]
fn test_one_bracket_per_source_change() {
    let source = create_source(&["A", "C"]);
    let projection = Collection::builder()
        .source(source.clone())
        .key_property("id")
        .group(|record: &MapRecord, _| GroupKey::from(record.get("id").as_str().unwrap_or_default()))
        .build()
        .unwrap();
    let (projection, _binding) = bound(&source, projection);

    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let projection = projection.lock();
        let signals = projection.signals();
        let sink = events.clone();
        signals.before_change.connect(move |_| sink.lock().push("before".to_string()));
        let sink = events.clone();
        signals
            .collection_changed
            .connect(move |change| sink.lock().push(format!("{:?}@{}", change.action, change.new_index)));
        let sink = events.clone();
        signals.after_change.connect(move |_| sink.lock().push("after".to_string()));
    }

    source.insert(1, MapRecord::new().with("id", "B"));
    let events = events.lock();
    assert_eq!(events.first().map(String::as_str), Some("before"));
    assert_eq!(events.last().map(String::as_str), Some("after"));
    assert_eq!(events.iter().filter(|event| *event == "before").count(), 1);
    assert!(events.contains(&"Add@2".to_string()));
    assert_eq!(keys(&projection.lock()), vec!["G(A)", "A", "G(B)", "B", "G(C)", "C"]);
}
