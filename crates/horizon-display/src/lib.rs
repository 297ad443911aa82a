//! Horizon Display - live projections over observable collections.
//!
//! A projection shows the records of a source collection as an ordered list
//! of display items without ever mutating the source. It supports:
//!
//! - **Grouping** with synthesized group headers
//! - **Sorting** by any number of comparators (stable)
//! - **Filtering**, windowed to the changed range when possible
//! - **Trees** built from a parent-key property or from nested children
//! - **Interaction state**: selection, marker, hover, editing, add-in-place
//!   row and drag sessions
//! - **Windowing** for virtual scrolling
//!
//! Every change is applied inside a session that emits the minimal set of
//! [`ProjectionChange`](collection::ProjectionChange) notifications.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use horizon_display::prelude::*;
//!
//! let source = Arc::new(SourceList::new(vec![
//!     MapRecord::new().with("id", "B"),
//!     MapRecord::new().with("id", "A"),
//! ]));
//! let projection = Collection::builder()
//!     .source(source.clone())
//!     .key_property("id")
//!     .sort(|a: &MapRecord, b: &MapRecord| a.get("id").as_str().cmp(&b.get("id").as_str()))
//!     .build()
//!     .unwrap();
//! let projection = Arc::new(Mutex::new(projection));
//! let _binding = SourceBinding::bind(source.clone(), &projection);
//!
//! source.push(MapRecord::new().with("id", "C"));
//! let projection = projection.lock();
//! let keys: Vec<String> = projection
//!     .items()
//!     .iter()
//!     .filter_map(|&id| projection.item(id)?.key().map(ToString::to_string))
//!     .collect();
//! assert_eq!(keys, vec!["A", "B", "C"]);
//! ```

pub mod binding;
pub mod collection;
pub mod debug;
pub mod enumerator;
pub mod error;
pub mod item;
pub mod prelude;
pub mod record;
pub mod source;
pub mod strategy;
pub mod tree;
pub mod viewport;

pub use binding::SourceBinding;
pub use collection::Collection;
pub use error::{Error, Result};
pub use tree::Tree;

pub use horizon_display_core as core;
