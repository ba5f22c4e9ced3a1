use ndarray::{Array3, ArrayView3, Axis};
use num_complex::Complex32;

/// Common error type for every component of the cube-processing chain.
#[derive(thiserror::Error, Debug)]
pub enum RadarError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("degenerate CFAR region: {0}")]
    DegenerateRegion(String),
    #[error("malformed capture: {0}")]
    Format(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type RadarResult<T> = Result<T, RadarError>;

/// Trait describing one axis transform of the cube builder.
///
/// Stages borrow the cube produced by the previous stage and return a new
/// cube whose transformed axis may be longer (zero-padded FFT).
pub trait ProcessingStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn axis(&self) -> Axis;
    fn execute(&self, data: ArrayView3<Complex32>) -> RadarResult<Array3<Complex32>>;
}

pub(crate) fn invalid<T>(message: impl Into<String>) -> RadarResult<T> {
    Err(RadarError::InvalidParameter(message.into()))
}

pub(crate) fn mismatch<T>(message: impl Into<String>) -> RadarResult<T> {
    Err(RadarError::DimensionMismatch(message.into()))
}
