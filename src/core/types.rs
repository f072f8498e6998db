use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Pixel-space rectangle a viewport draws into.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// One projected data point in pixel space.
///
/// `y` is `VALUE_NA` (positive infinity) for points whose value is the
/// no-data sentinel; renderers skip non-finite coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Tuning controls for windowing, fetch batching and tick snapping.
///
/// The batch minimum and tick epsilon were fixed constants in older chart
/// engines; they are kept adjustable here because no derivation for the
/// exact values is documented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTuning {
    /// Smallest accepted total per-item width (body + gap), in pixels.
    pub min_item_width: f64,
    /// Largest accepted total per-item width (body + gap), in pixels.
    pub max_item_width: f64,
    /// Total per-item width used before any zoom interaction.
    pub default_item_width: f64,
    /// Fraction of the total width carved off as inter-item gap (`width / gap_divisor`).
    pub gap_divisor: f64,
    /// Minimum number of items requested when a pan/zoom runs off loaded data.
    pub fetch_batch_min: usize,
    /// Equality tolerance when snapping axis ticks onto window bounds.
    pub tick_epsilon: f64,
}

impl Default for ViewportTuning {
    fn default() -> Self {
        Self {
            min_item_width: 1.0,
            max_item_width: 64.0,
            default_item_width: 6.0,
            gap_divisor: 5.0,
            fetch_batch_min: 256,
            tick_epsilon: 1e-6,
        }
    }
}

impl ViewportTuning {
    pub fn validate(self) -> ChartResult<Self> {
        if !self.min_item_width.is_finite()
            || !self.max_item_width.is_finite()
            || self.min_item_width < 1.0
            || self.max_item_width < self.min_item_width
        {
            return Err(ChartError::InvalidData(
                "item width bounds must be finite, >= 1 and ordered".to_owned(),
            ));
        }

        if !self.default_item_width.is_finite()
            || self.default_item_width < self.min_item_width
            || self.default_item_width > self.max_item_width
        {
            return Err(ChartError::InvalidData(
                "default item width must lie within the item width bounds".to_owned(),
            ));
        }

        if !self.gap_divisor.is_finite() || self.gap_divisor <= 1.0 {
            return Err(ChartError::InvalidData(
                "gap divisor must be finite and > 1".to_owned(),
            ));
        }

        if self.fetch_batch_min == 0 {
            return Err(ChartError::InvalidData(
                "fetch batch minimum must be > 0".to_owned(),
            ));
        }

        if !self.tick_epsilon.is_finite() || self.tick_epsilon <= 0.0 {
            return Err(ChartError::InvalidData(
                "tick epsilon must be finite and > 0".to_owned(),
            ));
        }

        Ok(self)
    }
}
