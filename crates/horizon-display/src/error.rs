//! Error types for the projection engine.

/// Result type alias for projection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying a projection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A projection was built without a source collection.
    #[error("A source collection is required to build a projection")]
    MissingSource,

    /// Unique ids cannot be extracted from the records.
    #[error("Option \"key_property\" must be defined to extract item unique id")]
    MissingKeyProperty,

    /// The record has no usable value under the key property.
    #[error("Record has no value for key property '{property}'")]
    KeyNotFound { property: String },

    /// The projection was asked to mutate itself directly.
    #[error("Projection is read-only: '{operation}' must be applied to the source collection")]
    ReadOnly { operation: &'static str },

    /// Random access past the end of a strategy or projection.
    #[error("Index {index} is out of bounds (count {count})")]
    IndexOutOfBounds { index: usize, count: usize },

    /// Cursor position outside the enumerable range.
    #[error("Position {position} is out of bounds")]
    PositionOutOfBounds { position: usize },

    /// The item id does not belong to this projection.
    #[error("Item does not belong to this projection")]
    ItemNotFound,

    /// A tree-only operation was called on a flat projection.
    #[error("'{operation}' is only available on tree projections")]
    NotATree { operation: &'static str },

    /// A state snapshot could not be encoded or decoded.
    #[error("Projection state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a read-only violation error.
    pub fn read_only(operation: &'static str) -> Self {
        Self::ReadOnly { operation }
    }

    /// Create an out-of-bounds error.
    pub fn out_of_bounds(index: usize, count: usize) -> Self {
        Self::IndexOutOfBounds { index, count }
    }

    /// Create a missing-key error.
    pub fn key_not_found(property: impl Into<String>) -> Self {
        Self::KeyNotFound {
            property: property.into(),
        }
    }
}
