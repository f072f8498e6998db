//! chart-viewport: viewport and coordinate engine for financial time-series charts.
//!
//! This crate owns the windowed-view, coordinate-transform, axis-tick and
//! incremental-fetch model behind a scrollable chart. Rendering backends,
//! input routing and the fetch transport stay outside; they consume point
//! arrays and tick lists and fulfill `PendingFetch` requests.

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{ChartSurface, ChartSurfaceConfig, SurfaceAction};
pub use error::{ChartError, ChartResult};
