//! Bookkeeping container tying pose frames, tracks, and observations
//! together for the external solver.
//!
//! [`Problem`] is the boundary surface the solver drives each iteration: it
//! registers frames, landmarks, and measurements, and evaluates the engine
//! over every observation. It performs no iteration control, damping, Schur
//! elimination, or sparse solving; those belong to the solver that consumes
//! the per-observation blocks.
//!
//! Evaluation is data-parallel across tracks: distinct observations are
//! independent given a frozen snapshot of frame and landmark state, so tracks
//! are farmed out with `rayon` while the frame collection is shared
//! read-only.

use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

use crate::error::{SbaError, SbaResult};
use crate::frame::PoseFrame;
use crate::landmark::Landmark;
use crate::observation::Observation;
use crate::track::Track;

/// Collection of pose frames and tracks of observations.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    /// Camera pose frames, indexed by the observations' `frame_idx`
    pub frames: Vec<PoseFrame>,
    /// One track per landmark
    pub tracks: Vec<Track>,
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pose frame and return its stable index.
    pub fn add_frame(&mut self, frame: PoseFrame) -> usize {
        self.frames.push(frame);
        self.frames.len() - 1
    }

    /// Register a landmark, creating its (empty) track, and return the track
    /// index.
    pub fn add_landmark(&mut self, landmark: Landmark) -> usize {
        self.tracks.push(Track::new(landmark));
        self.tracks.len() - 1
    }

    /// Append a monocular observation of `track_idx` seen from `frame_idx`.
    pub fn add_mono_observation(
        &mut self,
        frame_idx: usize,
        track_idx: usize,
        keypoint: Vector2<f64>,
    ) -> SbaResult<()> {
        self.add_observation(track_idx, Observation::new_mono(frame_idx, keypoint))
    }

    /// Append a stereo observation (u, v, right-u) of `track_idx` seen from
    /// `frame_idx`.
    pub fn add_stereo_observation(
        &mut self,
        frame_idx: usize,
        track_idx: usize,
        keypoint: Vector3<f64>,
    ) -> SbaResult<()> {
        self.add_observation(track_idx, Observation::new_stereo(frame_idx, keypoint))
    }

    fn add_observation(&mut self, track_idx: usize, observation: Observation) -> SbaResult<()> {
        if observation.frame_idx >= self.frames.len() {
            return Err(SbaError::InvalidInput(format!(
                "frame index {} out of range ({} frames)",
                observation.frame_idx,
                self.frames.len()
            )));
        }
        let track = self.tracks.get_mut(track_idx).ok_or_else(|| {
            SbaError::InvalidInput(format!("track index {track_idx} out of range"))
        })?;
        track.add_observation(observation);
        Ok(())
    }

    /// Total number of observations across all tracks.
    pub fn num_observations(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }

    // The container fields are public, so an observation with a stale frame
    // index can be inserted without going through add_observation; every
    // index is re-checked before an evaluation pass.
    fn check_frame_indices(&self) -> SbaResult<()> {
        for track in &self.tracks {
            for obs in &track.observations {
                if obs.frame_idx >= self.frames.len() {
                    return Err(SbaError::InvalidInput(format!(
                        "observation references frame {} but only {} frames are registered",
                        obs.frame_idx,
                        self.frames.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Recompute every observation's residual against the current frame and
    /// landmark state and return the summed squared error.
    ///
    /// All observations are evaluated against the same snapshot; callers must
    /// not mutate frames or landmarks concurrently (read-iteration
    /// isolation).
    pub fn total_cost(&mut self) -> SbaResult<f64> {
        self.check_frame_indices()?;
        let frames = &self.frames;
        Ok(self
            .tracks
            .par_iter_mut()
            .map(|track| {
                let landmark = track.landmark;
                track
                    .observations
                    .iter_mut()
                    .map(|obs| obs.compute_error(&frames[obs.frame_idx], &landmark))
                    .sum::<f64>()
            })
            .sum())
    }

    /// Root-mean-square reprojection error over all observations.
    pub fn rms_cost(&mut self) -> SbaResult<f64> {
        let n = self.num_observations();
        if n == 0 {
            return Ok(0.0);
        }
        Ok((self.total_cost()? / n as f64).sqrt())
    }

    /// Recompute every observation's Jacobian-derived blocks against the
    /// current frame and landmark state.
    ///
    /// Residuals must be current (see [`total_cost`](Self::total_cost)); the
    /// gradient contributions are formed from the stored residuals. The same
    /// read-iteration isolation requirement applies.
    pub fn linearize(&mut self) -> SbaResult<()> {
        self.check_frame_indices()?;
        let frames = &self.frames;
        self.tracks.par_iter_mut().try_for_each(|track| {
            let landmark = track.landmark;
            track
                .observations
                .iter_mut()
                .try_for_each(|obs| obs.compute_jacobians(&frames[obs.frame_idx], &landmark))
        })
    }
}
