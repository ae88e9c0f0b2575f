//! # sba-projection
//!
//! Projection residual and Jacobian engine for sparse bundle adjustment.
//!
//! Cameras observe 3D points; each observation compares a measured pixel
//! location against where the point should appear given the current estimated
//! camera pose and point position. This crate computes, per observation:
//!
//! - the reprojection error (monocular or stereo),
//! - the analytic partial derivatives of that error with respect to the 6
//!   pose parameters and 3 point parameters, differentiated through the
//!   perspective-projection chain under a quaternion rotation
//!   parameterization,
//! - the compressed second-order blocks (`JᵀJ` and `Jᵀr`) an external
//!   nonlinear least-squares solver accumulates into the global normal
//!   equations.
//!
//! The solver itself (iteration control, damping, Schur-complement
//! elimination, sparse factorization) is an external collaborator, as is the
//! maintenance of camera pose state. The engine reads [`PoseFrame`] and
//! [`Landmark`] values and writes only each [`Observation`]'s own residual
//! and block fields, so distinct observations can be evaluated in parallel
//! against a frozen state snapshot.
//!
//! ## Example
//!
//! ```
//! use nalgebra::{UnitQuaternion, Vector2, Vector3};
//! use sba_projection::{CameraIntrinsics, Landmark, Observation, PoseFrame};
//!
//! let intrinsics = CameraIntrinsics::new(100.0, 100.0, 0.0, 0.0);
//! let frame = PoseFrame::from_pose(
//!     Vector3::zeros(),
//!     &UnitQuaternion::identity(),
//!     &intrinsics,
//!     0.0,
//! );
//! let landmark = Landmark::new(0.0, 0.0, 10.0);
//!
//! let mut obs = Observation::new_mono(0, Vector2::new(0.0, 0.0));
//! let cost = obs.compute_error(&frame, &landmark);
//! assert_eq!(cost, 0.0);
//! obs.compute_jacobians(&frame, &landmark).unwrap();
//! ```

pub mod error;
pub mod frame;
pub mod landmark;
pub mod logger;
pub mod observation;
pub mod problem;
pub mod track;

pub use error::{SbaError, SbaResult};
pub use frame::{CameraIntrinsics, PoseFrame};
pub use landmark::Landmark;
pub use logger::{init_logger, init_logger_with_level};
pub use observation::{Measurement, Observation};
pub use problem::Problem;
pub use track::Track;
