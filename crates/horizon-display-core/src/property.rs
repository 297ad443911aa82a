//! Change-detecting values and version counters.
//!
//! Projections and their items expose a monotonic `version` that consumers
//! compare to decide whether to redraw. The rule is strict: a setter bumps the
//! version only when the stored value actually changes. [`Property<T>`]
//! encodes the change test and [`Version`] the counter.
//!
//! # Example
//!
//! ```
//! use horizon_display_core::{Property, Version};
//!
//! let display_property = Property::new(String::from("title"));
//! let mut version = Version::default();
//!
//! if display_property.set(String::from("caption")) {
//!     version.bump();
//! }
//! // Same value again: no change, no bump.
//! if display_property.set(String::from("caption")) {
//!     version.bump();
//! }
//! assert_eq!(version.get(), 1);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value cell that reports whether a write changed it.
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`
/// when `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the current value by reference.
    pub fn with<F, U>(&self, f: F) -> U
    where
        F: FnOnce(&T) -> U,
    {
        f(&self.value.read())
    }

    /// Overwrite the value without comparing.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if it differs from the previous one.
    pub fn set(&self, value: T) -> bool {
        let mut guard = self.value.write();
        if *guard == value {
            return false;
        }
        *guard = value;
        true
    }

    /// Set the value and return the previous one if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut guard = self.value.write();
        if *guard == value {
            return None;
        }
        Some(std::mem::replace(&mut *guard, value))
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &*self.value.read())
            .finish()
    }
}

/// A monotonic revision counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// The current revision.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Advance to the next revision and return it.
    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// Assign `value` to `slot` and bump `version` if it changed.
///
/// Returns whether the slot changed.
pub fn set_versioned<T: PartialEq>(slot: &mut T, value: T, version: &mut Version) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    version.bump();
    true
}
