//! Logging facilities for Horizon Display.
//!
//! Horizon Display uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_display=debug")
//!         .init();
//! }
//! ```
//!
//! Every subsystem logs under a fixed target from [`targets`], so a filter
//! such as `horizon_display::strategy=trace` narrows output to one layer.

/// Span names used throughout Horizon Display.
pub mod span_names {
    /// Full rebuild of a projection.
    pub const REBUILD: &str = "horizon_display::rebuild";
    /// Source collection change handling.
    pub const SOURCE_CHANGE: &str = "horizon_display::source_change";
    /// Filter pass.
    pub const FILTER: &str = "horizon_display::filter";
    /// Sort pass.
    pub const SORT: &str = "horizon_display::sort";
    /// Change session analysis.
    pub const SESSION: &str = "horizon_display::session";
}

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_display_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_display_core::signal";
    /// Projection target.
    pub const COLLECTION: &str = "horizon_display::collection";
    /// Items-strategy chain target.
    pub const STRATEGY: &str = "horizon_display::strategy";
    /// Tree projection target.
    pub const TREE: &str = "horizon_display::tree";
    /// Viewport windowing target.
    pub const VIEWPORT: &str = "horizon_display::viewport";
    /// Source collection target.
    pub const SOURCE: &str = "horizon_display::source";
    /// Timing spans.
    pub const PERF: &str = "horizon_display::perf";
}

/// A guard that keeps a timing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span for `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_display::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level event on the core target.
#[macro_export]
macro_rules! display_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_display_core", $($arg)*)
    };
}

/// Debug-level event on the core target.
#[macro_export]
macro_rules! display_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_display_core", $($arg)*)
    };
}
