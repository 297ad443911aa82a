//! Commonly used types.
//!
//! ```
//! use horizon_display::prelude::*;
//! ```

// ============================================================================
// Projections
// ============================================================================

pub use crate::collection::{
    Collection, CollectionBuilder, MultiSelectVisibility, ProjectionChange, ProjectionState,
};
pub use crate::tree::Tree;

// ============================================================================
// Sources and records
// ============================================================================

pub use crate::binding::{SourceBinding, SourceObserver};
pub use crate::record::{MapRecord, PropertyValue, Record, RecordKey};
pub use crate::source::{ChangeAction, CollectionChange, SourceCollection, SourceList};

// ============================================================================
// Items and strategies
// ============================================================================

pub use crate::item::{
    DisplayItem, Editable, Expandable, GroupKey, HasMore, ItemId, ItemKind, Markable, Selectable,
};
pub use crate::strategy::{sort_by_record, AddPosition, DragPosition, SortFn, StrategyKind};

// ============================================================================
// Windowing and errors
// ============================================================================

pub use crate::error::{Error, Result};
pub use crate::viewport::{RenderedScroll, VirtualScroll, Viewport};
