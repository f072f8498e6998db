//! Consumer-side rendering contract.
//!
//! The engine never builds vector paths; it hands a fully materialized
//! snapshot of pixel coordinates and tick lists to whatever backend the
//! host embeds. Snapshots are recomputed in full before being handed out,
//! so a sink always sees a consistent window.

use serde::{Deserialize, Serialize};

use crate::core::ticks::{TimeTick, ValueTick};
use crate::core::types::{PixelPoint, Rect};
use crate::error::{ChartError, ChartResult};

/// One series' drawable state for a single frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesFrame {
    pub bounds: Rect,
    /// Connected polyline / glyph anchor points; non-finite Y marks a gap.
    pub points: Vec<PixelPoint>,
    pub value_ticks: Vec<ValueTick>,
    pub time_ticks: Vec<TimeTick>,
}

impl SeriesFrame {
    pub fn validate(&self) -> ChartResult<()> {
        for point in &self.points {
            if !point.x.is_finite() {
                return Err(ChartError::InvalidData(
                    "frame point X must be finite".to_owned(),
                ));
            }
        }
        for tick in &self.value_ticks {
            if !tick.pixel.is_finite() {
                return Err(ChartError::InvalidData(
                    "value tick pixel must be finite".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

/// Contract implemented by any rendering backend.
pub trait FrameSink {
    fn consume(&mut self, frame: &SeriesFrame) -> ChartResult<()>;
}

/// No-op sink used by tests and headless usage.
///
/// It still validates frame content so tests can catch invalid geometry
/// before a real backend is introduced.
#[derive(Debug, Default)]
pub struct NullSink {
    pub last_point_count: usize,
    pub last_value_tick_count: usize,
    pub last_time_tick_count: usize,
}

impl FrameSink for NullSink {
    fn consume(&mut self, frame: &SeriesFrame) -> ChartResult<()> {
        frame.validate()?;
        self.last_point_count = frame.points.len();
        self.last_value_tick_count = frame.value_ticks.len();
        self.last_time_tick_count = frame.time_ticks.len();
        Ok(())
    }
}
