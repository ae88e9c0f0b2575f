//! End-to-end scenarios for the projection engine: residuals, Jacobian
//! blocks, and problem-level accumulation, mono and stereo.

use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector2, Vector3};
use sba_projection::{CameraIntrinsics, Landmark, Observation, PoseFrame, Problem, SbaError};

fn identity_frame(baseline: f64) -> PoseFrame {
    let intrinsics = CameraIntrinsics::new(100.0, 100.0, 0.0, 0.0);
    PoseFrame::from_pose(
        Vector3::zeros(),
        &UnitQuaternion::identity(),
        &intrinsics,
        baseline,
    )
}

#[test]
fn mono_point_on_axis_projects_exactly() {
    sba_projection::init_logger_with_level(tracing::Level::WARN);
    let frame = identity_frame(0.0);
    let landmark = Landmark::new(0.0, 0.0, 10.0);
    let mut obs = Observation::new_mono(0, Vector2::new(0.0, 0.0));

    let cost = obs.compute_error(&frame, &landmark);
    assert_eq!(cost, 0.0);
    assert_eq!(obs.residual, Vector3::zeros());

    obs.compute_jacobians(&frame, &landmark)
        .expect("pz = 10 > 0, jacobians must be computable");
    assert!(obs.h_cc.iter().all(|v| v.is_finite()));
    assert!(obs.h_pp.iter().all(|v| v.is_finite()));
    assert!(obs.h_pc.iter().all(|v| v.is_finite()));
    assert!(obs.g_cam.iter().all(|v| v.is_finite()));
    assert!(obs.g_point.iter().all(|v| v.is_finite()));
    // perfect measurement: zero residual means zero gradient contributions
    assert_eq!(obs.g_cam.norm(), 0.0);
    assert_eq!(obs.g_point.norm(), 0.0);
    // but the Hessian blocks still carry curvature
    assert!(obs.h_cc.norm() > 0.0);
    assert!(obs.h_pp.norm() > 0.0);
}

#[test]
fn mono_point_behind_camera_is_suppressed() {
    let frame = identity_frame(0.0);
    let landmark = Landmark::new(0.0, 0.0, -5.0);

    // independent of the measured keypoint value
    for kp in [Vector2::new(0.0, 0.0), Vector2::new(55.0, -17.0)] {
        let mut obs = Observation::new_mono(0, kp);
        let cost = obs.compute_error(&frame, &landmark);
        assert_eq!(cost, 0.0);
        assert_eq!(obs.residual, Vector3::zeros());
    }
}

#[test]
fn stereo_observation_round_trip_through_problem() {
    let intrinsics = CameraIntrinsics::new(400.0, 400.0, 320.0, 240.0);
    let baseline = 0.1;
    let rotation = UnitQuaternion::from_euler_angles(0.05, -0.1, 0.02);
    let translation = Vector3::new(0.2, 0.1, -0.3);
    let frame = PoseFrame::from_pose(translation, &rotation, &intrinsics, baseline);
    let landmark = Landmark::new(0.5, -0.2, 4.0);

    // synthesize a perfect stereo measurement from the ground-truth state
    let pc = frame.w2n * landmark.position;
    let u = (400.0 * pc.x + 320.0 * pc.z) / pc.z;
    let v = (400.0 * pc.y + 240.0 * pc.z) / pc.z;
    let right_u = (400.0 * (pc.x - baseline) + 320.0 * pc.z) / pc.z;

    let mut problem = Problem::new();
    let f = problem.add_frame(frame);
    let t = problem.add_landmark(landmark);
    problem
        .add_stereo_observation(f, t, Vector3::new(u, v, right_u))
        .unwrap();

    assert_relative_eq!(problem.total_cost().unwrap(), 0.0, epsilon = 1e-16);
    assert_relative_eq!(problem.rms_cost().unwrap(), 0.0, epsilon = 1e-8);
    problem.linearize().unwrap();

    let obs = &problem.tracks[0].observations[0];
    assert!(obs.is_stereo());
    assert!(obs.h_cc.iter().all(|x| x.is_finite()));
    assert!(obs.h_cc.norm() > 0.0);
}

#[test]
fn perturbed_landmark_increases_cost() {
    let frame = identity_frame(0.0);
    let landmark = Landmark::new(0.0, 0.0, 10.0);
    let mut problem = Problem::new();
    let f = problem.add_frame(frame);
    let t = problem.add_landmark(landmark);
    problem
        .add_mono_observation(f, t, Vector2::new(0.0, 0.0))
        .unwrap();
    assert_eq!(problem.total_cost().unwrap(), 0.0);

    // move the landmark off-axis; the engine reads the new state next call
    problem.tracks[t].landmark = Landmark::new(0.5, 0.0, 10.0);
    let cost = problem.total_cost().unwrap();
    // predicted u = 100·0.5/10 = 5
    assert_relative_eq!(cost, 25.0, epsilon = 1e-10);
    assert_relative_eq!(
        problem.tracks[t].observations[0].residual_norm(),
        5.0,
        epsilon = 1e-10
    );
}

#[test]
fn linearize_reports_corrupted_state() {
    let frame = identity_frame(0.0);
    let mut problem = Problem::new();
    let f = problem.add_frame(frame);
    let t = problem.add_landmark(Landmark::new(0.0, 0.0, f64::NAN));
    problem
        .add_mono_observation(f, t, Vector2::zeros())
        .unwrap();

    assert!(matches!(
        problem.linearize(),
        Err(SbaError::NonFiniteDepth(_))
    ));
}
