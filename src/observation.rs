//! Projection observations: residuals, Jacobians, and the compressed
//! second-order blocks consumed by the outer solver.
//!
//! An [`Observation`] is one measured image location of one landmark from one
//! pose frame. Each solver iteration recomputes, per observation, the
//! reprojection error and the analytic derivative blocks against the
//! then-current [`PoseFrame`] and [`Landmark`] state. The engine never owns
//! or mutates that state; it only reads it and overwrites the observation's
//! own residual and block fields.
//!
//! # Mathematical background
//!
//! For a camera-space point `p = (px, py, pz)` obtained from the frame's
//! world-to-normalized transform, the perspective projection of a directional
//! derivative `dp` follows the quotient rule applied per output row:
//!
//! ```text
//! d(u) = fx · (pz·dp.x − px·dp.z) / pz²
//! d(v) = fy · (pz·dp.y − py·dp.z) / pz²
//! ```
//!
//! The stereo variant adds a third row for the right-camera horizontal
//! coordinate, using the baseline-shifted `px − b` in place of `px`. The same
//! quotient-rule helper serves all three parameter groups:
//!
//! - rotation parameters: `dp = dr_dᵢ · (p_world − t)`, scaled by `q_scale`,
//! - translation parameters: `dp = −column i` of the rotation block,
//! - landmark parameters: `dp = +column i` of the rotation block.
//!
//! The five output blocks are the Gram products `JᵀJ` and gradients `Jᵀr`
//! the external solver accumulates into the global normal equations before
//! Schur elimination of the landmark parameters.

use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector2, Vector3, Vector6};
use tracing::debug;

use crate::error::{SbaError, SbaResult};
use crate::frame::PoseFrame;
use crate::landmark::Landmark;

/// A measured image location, fixed at construction.
///
/// The variant selects the residual shape: 2 components for monocular, 3 for
/// stereo where the third component is the disparity-derived right-camera u.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Monocular keypoint (u, v)
    Mono(Vector2<f64>),
    /// Stereo keypoint (u, v, right-u)
    Stereo(Vector3<f64>),
}

impl Measurement {
    /// Number of residual components: 2 for mono, 3 for stereo.
    pub fn dim(&self) -> usize {
        match self {
            Measurement::Mono(_) => 2,
            Measurement::Stereo(_) => 3,
        }
    }
}

/// One measured image location of one landmark from one pose frame, owning
/// its residual and derivative state.
///
/// The landmark reference is implicit through the owning [`Track`];
/// the frame reference is by stable index into the solver's frame collection.
///
/// [`Track`]: crate::track::Track
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Index of the observing pose frame
    pub frame_idx: usize,
    /// The measured keypoint
    pub measurement: Measurement,
    /// Last computed reprojection error; third component is 0 for mono
    pub residual: Vector3<f64>,
    /// Point-point block JpᵀJp
    pub h_pp: Matrix3<f64>,
    /// Camera-camera block JcᵀJc
    pub h_cc: Matrix6<f64>,
    /// Point-camera cross block JpᵀJc
    pub h_pc: Matrix3x6<f64>,
    /// Camera gradient contribution Jcᵀr
    pub g_cam: Vector6<f64>,
    /// Point gradient contribution Jpᵀr
    pub g_point: Vector3<f64>,
    valid: bool,
}

impl Observation {
    fn with_measurement(frame_idx: usize, measurement: Measurement, valid: bool) -> Self {
        Self {
            frame_idx,
            measurement,
            residual: Vector3::zeros(),
            h_pp: Matrix3::zeros(),
            h_cc: Matrix6::zeros(),
            h_pc: Matrix3x6::zeros(),
            g_cam: Vector6::zeros(),
            g_point: Vector3::zeros(),
            valid,
        }
    }

    /// Create a monocular observation.
    pub fn new_mono(frame_idx: usize, keypoint: Vector2<f64>) -> Self {
        Self::with_measurement(frame_idx, Measurement::Mono(keypoint), true)
    }

    /// Create a stereo observation with keypoint (u, v, right-u).
    pub fn new_stereo(frame_idx: usize, keypoint: Vector3<f64>) -> Self {
        Self::with_measurement(frame_idx, Measurement::Stereo(keypoint), true)
    }

    /// Create an invalid placeholder, not backed by a real measurement.
    ///
    /// Passing a placeholder to the computation operations is a caller
    /// contract violation.
    pub fn placeholder() -> Self {
        Self::with_measurement(0, Measurement::Mono(Vector2::zeros()), false)
    }

    /// Whether this observation is backed by a real measurement.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether this is a stereo observation.
    pub fn is_stereo(&self) -> bool {
        matches!(self.measurement, Measurement::Stereo(_))
    }

    /// Compute the reprojection error against the current frame and landmark
    /// state, overwriting the residual field, and return the squared norm.
    ///
    /// A point at or behind the camera plane (`pz <= 0`) is a degenerate
    /// observation: the residual is zeroed and the cost is 0, suppressing the
    /// observation for this iteration instead of injecting an unbounded or
    /// sign-flipped gradient.
    pub fn compute_error(&mut self, frame: &PoseFrame, landmark: &Landmark) -> f64 {
        debug_assert!(self.valid, "error computation on placeholder observation");
        match self.measurement {
            Measurement::Mono(kp) => {
                let p = frame.w2i * landmark.position;
                if p.z <= 0.0 {
                    debug!(frame = self.frame_idx, pz = p.z, "degenerate projection");
                    self.residual = Vector3::zeros();
                    return 0.0;
                }
                self.residual = Vector3::new(p.x / p.z - kp.x, p.y / p.z - kp.y, 0.0);
                self.residual.fixed_rows::<2>(0).norm_squared()
            }
            Measurement::Stereo(kp) => {
                let p1 = frame.w2i * landmark.position;
                if p1.z <= 0.0 {
                    debug!(frame = self.frame_idx, pz = p1.z, "degenerate projection");
                    self.residual = Vector3::zeros();
                    return 0.0;
                }
                // right-camera horizontal coordinate from the baseline-shifted point
                let shifted =
                    frame.w2n * landmark.position - Vector3::new(frame.baseline, 0.0, 0.0);
                let p2 = frame.k_cam * shifted;
                self.residual = Vector3::new(
                    p1.x / p1.z - kp.x,
                    p1.y / p1.z - kp.y,
                    p2.x / p2.z - kp.z,
                );
                self.residual.norm_squared()
            }
        }
    }

    /// Compute the five Jacobian-derived blocks against the current frame and
    /// landmark state.
    ///
    /// Must be called with the same state used for (or about to be used for)
    /// [`compute_error`](Self::compute_error): the gradient contributions use
    /// the stored residual.
    ///
    /// A point strictly behind the camera zeroes all five blocks, consistent
    /// with the zero-residual policy of the error path, so a suppressed
    /// observation contributes neither gradient nor Hessian mass. A
    /// non-finite depth reciprocal (`pz == 0` or NaN upstream state) is a
    /// fatal precondition violation and fails loudly.
    pub fn compute_jacobians(&mut self, frame: &PoseFrame, landmark: &Landmark) -> SbaResult<()> {
        if !self.valid {
            return Err(SbaError::InvalidObservation(format!(
                "jacobian computation on placeholder observation (frame {})",
                self.frame_idx
            )));
        }

        let pc = frame.w2n * landmark.position;
        let (px, py, pz) = (pc.x, pc.y, pc.z);

        let ipz2 = 1.0 / (pz * pz);
        if !ipz2.is_finite() {
            return Err(SbaError::NonFiniteDepth(format!(
                "frame {}: pz = {pz}",
                self.frame_idx
            )));
        }
        if pz <= 0.0 {
            debug!(frame = self.frame_idx, pz, "degenerate projection, blocks zeroed");
            self.clear_blocks();
            return Ok(());
        }

        let ipz2fx = ipz2 * frame.k_cam[(0, 0)];
        let ipz2fy = ipz2 * frame.k_cam[(1, 1)];
        let b = frame.baseline;
        let stereo = self.is_stereo();

        // quotient-rule projection derivative for one camera-space direction;
        // the right-image row uses the baseline-shifted horizontal coordinate
        let project = |dp: Vector3<f64>| -> Vector3<f64> {
            let du = (pz * dp.x - px * dp.z) * ipz2fx;
            let dv = (pz * dp.y - py * dp.z) * ipz2fy;
            let du_r = if stereo {
                (pz * dp.x - (px - b) * dp.z) * ipz2fx
            } else {
                0.0
            };
            Vector3::new(du, dv, du_r)
        };

        let mut jac_c = Matrix3x6::<f64>::zeros();
        let mut jac_p = Matrix3::<f64>::zeros();

        // rotation parameters: differential rotation applied to (p_world - t),
        // scaled to match the translational derivatives
        let pwt = (landmark.position - frame.trans).xyz();
        for (i, dr) in [&frame.dr_dx, &frame.dr_dy, &frame.dr_dz]
            .into_iter()
            .enumerate()
        {
            jac_c.set_column(3 + i, &(frame.q_scale * project(dr * pwt)));
        }

        let rot = frame.rotation();
        for i in 0..3 {
            let col = rot.column(i).clone_owned();
            // translating the camera is equivalent to translating the point
            // in the opposite direction
            jac_c.set_column(i, &project(-col));
            jac_p.set_column(i, &project(col));
        }

        self.h_pp = jac_p.transpose() * jac_p;
        self.h_cc = jac_c.transpose() * jac_c;
        self.h_pc = jac_p.transpose() * jac_c;
        self.g_cam = jac_c.transpose() * self.residual;
        self.g_point = jac_p.transpose() * self.residual;

        Ok(())
    }

    /// Euclidean norm of the residual: 2 components for mono, 3 for stereo.
    pub fn residual_norm(&self) -> f64 {
        match self.measurement {
            Measurement::Mono(_) => self.residual.fixed_rows::<2>(0).norm(),
            Measurement::Stereo(_) => self.residual.norm(),
        }
    }

    /// Squared norm of the residual: 2 components for mono, 3 for stereo.
    pub fn residual_squared_norm(&self) -> f64 {
        match self.measurement {
            Measurement::Mono(_) => self.residual.fixed_rows::<2>(0).norm_squared(),
            Measurement::Stereo(_) => self.residual.norm_squared(),
        }
    }

    fn clear_blocks(&mut self) {
        self.h_pp = Matrix3::zeros();
        self.h_cc = Matrix6::zeros();
        self.h_pc = Matrix3x6::zeros();
        self.g_cam = Vector6::zeros();
        self.g_point = Vector3::zeros();
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self::placeholder()
    }
}
