//! Camera pose frames for the projection engine.
//!
//! A [`PoseFrame`] carries a camera's estimated pose and intrinsics at the
//! current solver iteration, together with the precomputed derivative
//! matrices the Jacobian computation needs. The engine only ever reads these
//! members; they are maintained by the pose-owning side of the solver and
//! must be mutually consistent (computed from the same orientation and
//! translation at the same iteration).
//!
//! # Conventions
//!
//! World-to-camera: for rotation `R` and camera center `t` in world
//! coordinates, a world point `p` maps to camera coordinates as
//! `p_cam = Rᵀ (p − t)`, i.e. `w2n = [Rᵀ | −Rᵀ t]` acting on homogeneous
//! points. `w2i = K · w2n` adds the intrinsics.
//!
//! Rotation derivatives use the differential-rotation convention: a local
//! (right-multiplied) quaternion increment with vector part `δ` perturbs the
//! camera-space point as `dp_cam/dδᵢ = dr_dᵢ · (p − t)` where
//! `dr_dᵢ = −2[eᵢ]× · Rᵀ`. The constant generators `−2[eᵢ]×` arise because a
//! unit quaternion with vector part `δ` rotates by angle `2|δ|` to first
//! order.

use nalgebra::{Matrix3, Matrix3x4, UnitQuaternion, Vector3, Vector4};

/// Pinhole camera intrinsic parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in x direction (pixels)
    pub fx: f64,
    /// Focal length in y direction (pixels)
    pub fy: f64,
    /// Principal point x coordinate (pixels)
    pub cx: f64,
    /// Principal point y coordinate (pixels)
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create new camera intrinsics.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The 3×3 intrinsic matrix K.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }
}

// Generators of the differential rotation: d(ΔRᵀ)/dδᵢ at δ = 0 is −2[eᵢ]×.
fn dri_dx() -> Matrix3<f64> {
    Matrix3::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, -2.0, 0.0)
}

fn dri_dy() -> Matrix3<f64> {
    Matrix3::new(0.0, 0.0, -2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0)
}

fn dri_dz() -> Matrix3<f64> {
    Matrix3::new(0.0, 2.0, 0.0, -2.0, 0.0, 0.0, 0.0, 0.0, 0.0)
}

/// A camera's estimated pose and intrinsics at the current solver iteration.
///
/// Read-only to the projection engine. All transform and derivative members
/// must be mutually consistent; [`PoseFrame::from_pose`] and
/// [`PoseFrame::update_pose`] maintain that invariant, and a frame assembled
/// from raw precomputed members is accepted as-is without recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    /// 3×4 world-to-normalized-camera transform (rotation + translation)
    pub w2n: Matrix3x4<f64>,
    /// 3×4 world-to-image transform (intrinsics applied)
    pub w2i: Matrix3x4<f64>,
    /// 3×3 intrinsic matrix
    pub k_cam: Matrix3<f64>,
    /// Stereo baseline; 0 for monocular frames
    pub baseline: f64,
    /// Homogeneous camera translation in world coordinates
    pub trans: Vector4<f64>,
    /// Partial derivative of the world-to-camera rotation w.r.t. the
    /// quaternion x generator
    pub dr_dx: Matrix3<f64>,
    /// Partial derivative w.r.t. the quaternion y generator
    pub dr_dy: Matrix3<f64>,
    /// Partial derivative w.r.t. the quaternion z generator
    pub dr_dz: Matrix3<f64>,
    /// Scale applied to rotation-parameter derivatives relative to
    /// translation-parameter derivatives, compensating the differing units of
    /// a quaternion-generator increment and a Euclidean translation increment
    pub q_scale: f64,
}

impl PoseFrame {
    /// Build a mutually consistent frame from a pose estimate.
    ///
    /// # Arguments
    ///
    /// * `translation` - Camera center in world coordinates
    /// * `rotation` - Camera orientation (camera-to-world)
    /// * `intrinsics` - Pinhole intrinsics
    /// * `baseline` - Stereo baseline, 0 for monocular frames
    pub fn from_pose(
        translation: Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
        intrinsics: &CameraIntrinsics,
        baseline: f64,
    ) -> Self {
        let mut frame = Self {
            w2n: Matrix3x4::zeros(),
            w2i: Matrix3x4::zeros(),
            k_cam: intrinsics.matrix(),
            baseline,
            trans: Vector4::new(translation.x, translation.y, translation.z, 1.0),
            dr_dx: Matrix3::zeros(),
            dr_dy: Matrix3::zeros(),
            dr_dz: Matrix3::zeros(),
            q_scale: 1.0,
        };
        frame.update_pose(translation, rotation);
        frame
    }

    /// Override the rotation-derivative scale.
    pub fn with_q_scale(mut self, q_scale: f64) -> Self {
        self.q_scale = q_scale;
        self
    }

    /// Recompute the transform and derivative members for a new pose
    /// estimate, keeping intrinsics and baseline.
    ///
    /// Called by the solver between iterations, never by the engine.
    pub fn update_pose(&mut self, translation: Vector3<f64>, rotation: &UnitQuaternion<f64>) {
        let rt = rotation.to_rotation_matrix().into_inner().transpose();

        self.trans = Vector4::new(translation.x, translation.y, translation.z, 1.0);
        self.w2n.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
        self.w2n.set_column(3, &(-(rt * translation)));
        self.w2i = self.k_cam * self.w2n;

        self.dr_dx = dri_dx() * rt;
        self.dr_dy = dri_dy() * rt;
        self.dr_dz = dri_dz() * rt;
    }

    /// The rotation block of the world-to-normalized transform.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.w2n.fixed_view::<3, 3>(0, 0).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_frame() -> PoseFrame {
        let intrinsics = CameraIntrinsics::new(500.0, 480.0, 320.0, 240.0);
        let rotation = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        PoseFrame::from_pose(Vector3::new(0.5, -1.0, 2.0), &rotation, &intrinsics, 0.0)
    }

    #[test]
    fn test_intrinsic_matrix() {
        let k = CameraIntrinsics::new(500.0, 480.0, 320.0, 240.0).matrix();
        assert_eq!(k[(0, 0)], 500.0);
        assert_eq!(k[(1, 1)], 480.0);
        assert_eq!(k[(0, 2)], 320.0);
        assert_eq!(k[(1, 2)], 240.0);
        assert_eq!(k[(2, 2)], 1.0);
    }

    #[test]
    fn test_w2i_consistent_with_w2n() {
        let frame = test_frame();
        let expected = frame.k_cam * frame.w2n;
        assert_relative_eq!(frame.w2i, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_center_maps_to_origin() {
        let frame = test_frame();
        let center = frame.w2n * frame.trans;
        assert_relative_eq!(center.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_derivative_matches_finite_difference() {
        let intrinsics = CameraIntrinsics::new(500.0, 480.0, 320.0, 240.0);
        let rotation = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let translation = Vector3::new(0.5, -1.0, 2.0);
        let frame = PoseFrame::from_pose(translation, &rotation, &intrinsics, 0.0);

        let p_world = Vector3::new(1.0, 2.0, 8.0);
        let pwt = p_world - translation;

        let eps: f64 = 1e-7;
        for (axis, dr) in [frame.dr_dx, frame.dr_dy, frame.dr_dz].iter().enumerate() {
            let mut v = Vector3::zeros();
            v[axis] = eps;
            // local quaternion increment with vector part v
            let dq = UnitQuaternion::from_quaternion(nalgebra::Quaternion::from_parts(
                (1.0 - eps * eps).sqrt(),
                v,
            ));
            let plus = PoseFrame::from_pose(translation, &(rotation * dq), &intrinsics, 0.0);
            let minus =
                PoseFrame::from_pose(translation, &(rotation * dq.inverse()), &intrinsics, 0.0);

            let p4 = Vector4::new(p_world.x, p_world.y, p_world.z, 1.0);
            let numeric = (plus.w2n * p4 - minus.w2n * p4) / (2.0 * eps);
            let analytic = dr * pwt;
            assert_relative_eq!(analytic, numeric, epsilon = 1e-5);
        }
    }
}
