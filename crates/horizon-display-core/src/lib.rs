//! Core systems for Horizon Display.
//!
//! This crate provides the infrastructure the projection engine is built on:
//!
//! - **Signal/Slot System**: Type-safe change notifications
//! - **Property System**: Change-detecting values and version counters
//! - **Logging**: `tracing` targets, timing spans and logging macros
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_display_core::Signal;
//!
//! let count_changed = Signal::<usize>::new();
//! let conn_id = count_changed.connect(|count| {
//!     println!("projection now shows {count} items");
//! });
//!
//! count_changed.emit(3);
//! count_changed.disconnect(conn_id);
//! ```
//!
//! # Version Example
//!
//! ```
//! use horizon_display_core::property::{set_versioned, Version};
//!
//! let mut selected = false;
//! let mut version = Version::default();
//!
//! assert!(set_versioned(&mut selected, true, &mut version));
//! assert!(!set_versioned(&mut selected, true, &mut version));
//! assert_eq!(version.get(), 1);
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::PerfSpan;
pub use property::{set_versioned, Property, Version};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
