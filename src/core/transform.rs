use serde::{Deserialize, Serialize};

use crate::core::point::is_value_na;
use crate::error::{ChartError, ChartResult};

/// Coordinate mode under which stored values are interpreted.
///
/// `Linear` and `Log10` are stored-value transforms; `Percentage` is a
/// display-only rebase against a window start value, so its stored values
/// stay linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CoordinateMode {
    #[default]
    Linear,
    Log10,
    Percentage,
}

impl CoordinateMode {
    /// Whether stored values are kept in linear units under this mode.
    #[must_use]
    pub fn stores_linear(self) -> bool {
        !matches!(self, CoordinateMode::Log10)
    }
}

/// Converts one stored value between coordinate modes.
///
/// NA sentinels pass through untouched. Log steps reject non-positive
/// input; every mode pair has a defined rule, so per-value conversion never
/// reports `UnsupportedTransform` (that is reserved for series kinds that
/// do not admit a mode at all).
pub fn retransform_value(value: f64, from: CoordinateMode, to: CoordinateMode) -> ChartResult<f64> {
    if is_value_na(value) {
        return Ok(value);
    }
    if !value.is_finite() {
        return Err(ChartError::InvalidData(
            "transform input must be finite or the NA sentinel".to_owned(),
        ));
    }

    match (from.stores_linear(), to.stores_linear()) {
        // Linear <-> Percentage and identical storage: nothing stored changes.
        (true, true) | (false, false) => Ok(value),
        (true, false) => {
            if value <= 0.0 {
                return Err(ChartError::InvalidData(
                    "log10 transform requires values > 0".to_owned(),
                ));
            }
            Ok(value.log10())
        }
        (false, true) => {
            let raw = 10f64.powf(value);
            if !raw.is_finite() {
                return Err(ChartError::InvalidData(
                    "log10 inverse transform overflowed".to_owned(),
                ));
            }
            Ok(raw)
        }
    }
}

/// Rebases a stored value for percentage display: `(v - base) / base`.
pub fn percentage_display(value: f64, base: f64) -> ChartResult<f64> {
    if is_value_na(value) {
        return Ok(value);
    }
    if !base.is_finite() || base == 0.0 {
        return Err(ChartError::InvalidStartValue);
    }
    Ok((value - base) / base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::point::VALUE_NA;

    #[test]
    fn linear_log_round_trip_is_stable() {
        let original = 1234.5678;
        let logged =
            retransform_value(original, CoordinateMode::Linear, CoordinateMode::Log10).unwrap();
        let back = retransform_value(logged, CoordinateMode::Log10, CoordinateMode::Linear).unwrap();
        assert!((back - original).abs() <= 1e-9);
    }

    #[test]
    fn percentage_is_identity_on_stored_values() {
        let value = 99.25;
        let there =
            retransform_value(value, CoordinateMode::Linear, CoordinateMode::Percentage).unwrap();
        assert_eq!(there, value);
        let back =
            retransform_value(value, CoordinateMode::Percentage, CoordinateMode::Linear).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn log_to_percentage_goes_through_pow_step() {
        let logged = 2.0;
        let stored =
            retransform_value(logged, CoordinateMode::Log10, CoordinateMode::Percentage).unwrap();
        assert!((stored - 100.0).abs() <= 1e-9);
    }

    #[test]
    fn na_passes_through_every_mode_pair() {
        for from in [
            CoordinateMode::Linear,
            CoordinateMode::Log10,
            CoordinateMode::Percentage,
        ] {
            for to in [
                CoordinateMode::Linear,
                CoordinateMode::Log10,
                CoordinateMode::Percentage,
            ] {
                assert!(is_value_na(retransform_value(VALUE_NA, from, to).unwrap()));
            }
        }
    }

    #[test]
    fn log_rejects_non_positive_values() {
        assert!(retransform_value(0.0, CoordinateMode::Linear, CoordinateMode::Log10).is_err());
        assert!(retransform_value(-5.0, CoordinateMode::Linear, CoordinateMode::Log10).is_err());
    }

    #[test]
    fn percentage_display_rebases_against_start() {
        let display = percentage_display(110.0, 100.0).unwrap();
        assert!((display - 0.1).abs() <= 1e-12);
        assert!(percentage_display(1.0, 0.0).is_err());
    }
}
