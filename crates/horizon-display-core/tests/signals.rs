//! Integration tests for signals and versioned properties working together.

use std::sync::Arc;

use horizon_display_core::{set_versioned, Property, Signal, Version};
use parking_lot::Mutex;

struct Counter {
    value: Property<i32>,
    version: Mutex<Version>,
    value_changed: Signal<(i32, u64)>,
}

impl Counter {
    fn new() -> Self {
        Self {
            value: Property::new(0),
            version: Mutex::new(Version::default()),
            value_changed: Signal::new(),
        }
    }

    fn set(&self, value: i32) {
        if self.value.set(value) {
            let version = self.version.lock().bump();
            self.value_changed.emit((value, version));
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn unchanged_writes_do_not_notify() {
    init_tracing();
    let counter = Counter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    counter.value_changed.connect(move |&(value, version)| {
        seen_clone.lock().push((value, version));
    });

    counter.set(1);
    counter.set(1);
    counter.set(2);

    assert_eq!(*seen.lock(), vec![(1, 1), (2, 2)]);
}

#[test]
fn versioned_fields_are_monotonic() {
    let mut marked = false;
    let mut version = Version::default();
    let mut history = vec![version.get()];

    for value in [true, true, false, false, true] {
        set_versioned(&mut marked, value, &mut version);
        history.push(version.get());
    }

    assert!(history.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(version.get(), 3);
}
