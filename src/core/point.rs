use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{ChartError, ChartResult};

/// Reserved "no data" sentinel.
///
/// A point carrying this value occupies a calendar slot but is skipped by all
/// max/min, cursor and tick logic. It must never enter arithmetic.
pub const VALUE_NA: f64 = f64::INFINITY;

#[must_use]
pub fn is_value_na(value: f64) -> bool {
    value == VALUE_NA
}

/// Per-kind payload carried next to the primary value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PointDetail {
    /// Close-only sample; the primary value is the whole story.
    #[default]
    Close,
    /// OHLC bar; the primary value doubles as the close.
    Ohlc { open: f64, high: f64, low: f64 },
    /// Primary value plus ordered secondary series values (e.g. MA bands).
    Multi {
        values: SmallVec<[f64; 4]>,
        changes: SmallVec<[f64; 4]>,
    },
    /// Traded volume bar.
    Volume {
        turnover: f64,
        exchange_rate: f64,
        is_raise: bool,
    },
}

/// One dated sample of a time series.
///
/// `date` is unix milliseconds; within a series dates are strictly
/// increasing and unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub date: i64,
    pub value: f64,
    pub value_change: f64,
    #[serde(default)]
    pub detail: PointDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<IndexMap<String, serde_json::Value>>,
}

impl DataPoint {
    /// Builds a close-only point.
    pub fn close(date: i64, value: f64) -> ChartResult<Self> {
        validate_value(value, "value")?;
        Ok(Self {
            date,
            value,
            value_change: 0.0,
            detail: PointDetail::Close,
            extra: None,
        })
    }

    /// Builds an OHLC point; the primary value is the close.
    ///
    /// Invariants (unless any leg is the NA sentinel):
    /// - all values finite
    /// - `low <= high`
    /// - `open` and close within `[low, high]`
    pub fn ohlc(date: i64, open: f64, high: f64, low: f64, close: f64) -> ChartResult<Self> {
        for (value, field) in [
            (open, "open"),
            (high, "high"),
            (low, "low"),
            (close, "close"),
        ] {
            validate_value(value, field)?;
        }

        let any_na = [open, high, low, close].into_iter().any(is_value_na);
        if !any_na {
            if low > high {
                return Err(ChartError::InvalidData(
                    "ohlc low must be <= high".to_owned(),
                ));
            }
            if open < low || open > high || close < low || close > high {
                return Err(ChartError::InvalidData(
                    "ohlc open/close must be within low/high range".to_owned(),
                ));
            }
        }

        Ok(Self {
            date,
            value: close,
            value_change: 0.0,
            detail: PointDetail::Ohlc { open, high, low },
            extra: None,
        })
    }

    /// Builds a multi-value point (primary value plus secondary values).
    pub fn multi(date: i64, value: f64, secondary: &[f64]) -> ChartResult<Self> {
        validate_value(value, "value")?;
        for secondary_value in secondary {
            validate_value(*secondary_value, "secondary value")?;
        }

        Ok(Self {
            date,
            value,
            value_change: 0.0,
            detail: PointDetail::Multi {
                values: SmallVec::from_slice(secondary),
                changes: smallvec::smallvec![0.0; secondary.len()],
            },
            extra: None,
        })
    }

    /// Builds a volume bar.
    pub fn volume(
        date: i64,
        volume: f64,
        turnover: f64,
        exchange_rate: f64,
        is_raise: bool,
    ) -> ChartResult<Self> {
        validate_value(volume, "volume")?;
        validate_value(turnover, "turnover")?;
        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(ChartError::InvalidData(
                "exchange rate must be finite and > 0".to_owned(),
            ));
        }

        Ok(Self {
            date,
            value: volume,
            value_change: 0.0,
            detail: PointDetail::Volume {
                turnover,
                exchange_rate,
                is_raise,
            },
            extra: None,
        })
    }

    /// Builds a close-only point from a timestamp and a decimal price.
    pub fn from_decimal_parts(time: DateTime<Utc>, price: Decimal) -> ChartResult<Self> {
        Self::close(datetime_to_unix_millis(time), decimal_to_f64(price, "price")?)
    }

    #[must_use]
    pub fn with_extra(mut self, extra: IndexMap<String, serde_json::Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    #[must_use]
    pub fn is_na(&self) -> bool {
        is_value_na(self.value)
    }

    /// Upper envelope of the point (high for OHLC, the value otherwise).
    #[must_use]
    pub fn high(&self) -> f64 {
        match self.detail {
            PointDetail::Ohlc { high, .. } if !is_value_na(high) => high,
            _ => self.value,
        }
    }

    /// Lower envelope of the point (low for OHLC, the value otherwise).
    #[must_use]
    pub fn low(&self) -> f64 {
        match self.detail {
            PointDetail::Ohlc { low, .. } if !is_value_na(low) => low,
            _ => self.value,
        }
    }

    /// Secondary values carried by multi-value points, empty otherwise.
    #[must_use]
    pub fn secondary_values(&self) -> &[f64] {
        match &self.detail {
            PointDetail::Multi { values, .. } => values,
            _ => &[],
        }
    }

    /// Chained changes of the secondary values, empty otherwise.
    #[must_use]
    pub fn secondary_changes(&self) -> &[f64] {
        match &self.detail {
            PointDetail::Multi { changes, .. } => changes,
            _ => &[],
        }
    }
}

fn validate_value(value: f64, field_name: &str) -> ChartResult<()> {
    if !value.is_finite() && !is_value_na(value) {
        return Err(ChartError::InvalidData(format!(
            "{field_name} must be finite or the NA sentinel"
        )));
    }
    Ok(())
}

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> ChartResult<f64> {
    value.to_f64().ok_or_else(|| {
        ChartError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

#[must_use]
pub fn datetime_to_unix_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_sentinel_is_not_a_valid_arithmetic_value() {
        assert!(is_value_na(VALUE_NA));
        assert!(!is_value_na(0.0));
        assert!(!is_value_na(f64::NEG_INFINITY));
    }

    #[test]
    fn ohlc_rejects_inverted_envelope() {
        let result = DataPoint::ohlc(0, 10.0, 9.0, 11.0, 10.0);
        assert!(result.is_err());
    }

    #[test]
    fn ohlc_accepts_na_gap_bar() {
        let point = DataPoint::ohlc(0, VALUE_NA, VALUE_NA, VALUE_NA, VALUE_NA).expect("gap bar");
        assert!(point.is_na());
        assert!(is_value_na(point.high()));
    }

    #[test]
    fn high_low_fall_back_to_value_for_close_points() {
        let point = DataPoint::close(0, 42.0).expect("point");
        assert_eq!(point.high(), 42.0);
        assert_eq!(point.low(), 42.0);
    }
}
