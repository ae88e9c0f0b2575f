//! Error types for the sba-projection library
//!
//! All errors use the `thiserror` crate for automatic trait implementations.
//! Degenerate geometry (a point at or behind the camera plane) is not an
//! error: those observations are suppressed for the iteration with a zero
//! residual and zero derivative blocks.

use thiserror::Error;

/// Main result type used throughout the sba-projection library
pub type SbaResult<T> = Result<T, SbaError>;

/// Main error type for the sba-projection library
#[derive(Debug, Clone, Error)]
pub enum SbaError {
    /// Non-finite depth reciprocal during linearization.
    ///
    /// This signals corrupted pose or landmark state upstream (NaN values),
    /// not a recoverable per-observation condition. The computation is
    /// aborted rather than returning NaN-contaminated blocks into the
    /// global system.
    #[error("non-finite depth reciprocal: {0}")]
    NonFiniteDepth(String),

    /// Error or Jacobian computation invoked on a placeholder observation
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    /// Invalid input parameters (e.g. out-of-range frame or track indices)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
