pub mod fetch;
pub mod point;
pub mod series;
pub mod sync;
pub mod ticks;
pub mod transform;
pub mod types;
pub mod viewport;

pub use fetch::{
    DeferredOp, FetchLatch, FetchPlan, FetchResponse, FetchSpan, PendingFetch, QueryId,
    QueryIdAllocator, SeriesId,
};
pub use point::{DataPoint, PointDetail, VALUE_NA, is_value_na};
pub use series::{MergeOutcome, MergeSide, SeriesKind, TimeSeries};
pub use sync::{SyncOptions, ViewportArena, ViewportId, align_to, copy_from_master};
pub use ticks::{TimeTick, ValueTick, even_y_ticks, optimized_value_ticks, optimized_y_ticks, x_ticks};
pub use transform::{CoordinateMode, percentage_display, retransform_value};
pub use types::{PixelPoint, Rect, ViewportTuning};
pub use viewport::{PointHit, SeriesViewport, ViewportAction};
