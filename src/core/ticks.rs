use serde::{Deserialize, Serialize};

use crate::core::viewport::SeriesViewport;
use crate::error::ChartResult;

/// Y-axis tick: display value plus pixel row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueTick {
    pub value: f64,
    pub pixel: f64,
}

/// X-axis tick: in-window date plus pixel column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeTick {
    pub date: i64,
    pub pixel: f64,
}

/// "Optimized" tick values: steps snapped to round numbers, walked from
/// `max` down toward `min`, with synthetic boundary ticks at exactly the
/// window bounds when no generated tick lands within `epsilon` of them.
///
/// Sub-unit divisions run in a scaled integer domain so repeated
/// subtraction cannot drift.
#[must_use]
pub fn optimized_value_ticks(max: f64, min: f64, columns: usize, epsilon: f64) -> Vec<f64> {
    if !max.is_finite() || !min.is_finite() || columns == 0 {
        return Vec::new();
    }
    if max <= min {
        return vec![max];
    }

    let division = (max - min) / columns as f64;
    // Fixed-point exponent: 0 for divisions >= 1, else enough decimal
    // places to bring the division above 1.
    let exponent = if division >= 1.0 {
        0
    } else {
        -(division.log10().floor() as i32)
    };
    let scale = 10f64.powi(exponent);
    let scaled_division = division * scale;
    let unit = 10f64.powi(scaled_division.log10().floor() as i32);
    let step = (((scaled_division / unit).ceil()) * unit).round().max(1.0) as i64;

    let scaled_max = (max * scale).floor() as i64;
    let scaled_min = min * scale;
    let first = scaled_max - scaled_max.rem_euclid(step);

    let mut ticks = Vec::new();
    let mut cursor = first;
    while cursor as f64 >= scaled_min - epsilon * scale {
        ticks.push(cursor as f64 / scale);
        cursor -= step;
    }

    if ticks.first().map(|tick| (tick - max).abs() > epsilon).unwrap_or(true) {
        ticks.insert(0, max);
    }
    if ticks.last().map(|tick| (tick - min).abs() > epsilon).unwrap_or(true) {
        ticks.push(min);
    }
    ticks
}

/// Optimized Y ticks for a viewport's current window, with display
/// transformation and pixel mapping applied.
pub fn optimized_y_ticks(
    viewport: &SeriesViewport,
    columns: usize,
) -> ChartResult<Vec<ValueTick>> {
    let Some((min, max)) = viewport.window_value_range() else {
        return Ok(Vec::new());
    };
    let epsilon = viewport.tuning().tick_epsilon;
    optimized_value_ticks(max, min, columns, epsilon)
        .into_iter()
        .map(|value| {
            Ok(ValueTick {
                value: viewport.display_value(value)?,
                pixel: viewport.value_to_pixel_y(value),
            })
        })
        .collect()
}

/// "Even division" Y ticks: `columns` equally spaced values from the
/// window maximum down to the minimum, display-transformed per mode.
pub fn even_y_ticks(viewport: &SeriesViewport, columns: usize) -> ChartResult<Vec<ValueTick>> {
    let Some((min, max)) = viewport.window_value_range() else {
        return Ok(Vec::new());
    };
    if columns == 0 {
        return Ok(Vec::new());
    }
    if columns == 1 || max <= min {
        return Ok(vec![ValueTick {
            value: viewport.display_value(max)?,
            pixel: viewport.value_to_pixel_y(max),
        }]);
    }

    let span = max - min;
    let denominator = (columns - 1) as f64;
    (0..columns)
        .map(|index| {
            let value = max - span * (index as f64) / denominator;
            Ok(ValueTick {
                value: viewport.display_value(value)?,
                pixel: viewport.value_to_pixel_y(value),
            })
        })
        .collect()
}

/// X ticks: evenly spaced pixel columns resolved back to the nearest
/// in-window date. The last column clamps to the final loaded date when
/// the search runs past the window end.
#[must_use]
pub fn x_ticks(viewport: &SeriesViewport, columns: usize) -> Vec<TimeTick> {
    let Some(start) = viewport.start_index() else {
        return Vec::new();
    };
    let points = viewport.pixel_points();
    if points.is_empty() || columns == 0 {
        return Vec::new();
    }

    let bounds = viewport.bounds();
    let spacing = if columns > 1 {
        (bounds.width - 1.0) / (columns - 1) as f64
    } else {
        0.0
    };

    let mut ticks: Vec<TimeTick> = Vec::with_capacity(columns);
    for column in 0..columns {
        let x = bounds.left + column as f64 * spacing;
        let last_column = column == columns - 1;
        let past_window_end = points.last().map(|point| x > point.x).unwrap_or(false);

        let date = if last_column && past_window_end {
            match viewport.series().last() {
                Some(point) => point.date,
                None => continue,
            }
        } else {
            let offset = viewport.pixel_offset_at_or_before(x);
            match viewport.series().get(start + offset) {
                Some(point) => point.date,
                None => continue,
            }
        };

        if ticks.last().map(|tick| tick.date == date).unwrap_or(false) {
            continue;
        }
        ticks.push(TimeTick { date, pixel: x });
    }
    ticks
}
