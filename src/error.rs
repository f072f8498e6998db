use thiserror::Error;

use crate::core::transform::CoordinateMode;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("unsupported coordinate transform: {from:?} -> {to:?}")]
    UnsupportedTransform {
        from: CoordinateMode,
        to: CoordinateMode,
    },

    #[error("percentage mode requires a start value before first layout")]
    InvalidStartValue,
}
