//! Tracks: the set of observations of one landmark.

use crate::landmark::Landmark;
use crate::observation::Observation;

/// A landmark together with every observation referencing it.
///
/// Pure aggregation: a track is created when a landmark is first observed and
/// observations are appended as new sightings arrive. Observations are never
/// removed individually; dropping a landmark drops its whole track. The
/// external solver uses tracks to iterate "all observations of this landmark"
/// without a global scan.
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// The landmark's current position estimate
    pub landmark: Landmark,
    /// All observations of the landmark
    pub observations: Vec<Observation>,
}

impl Track {
    /// Create an empty track for a newly observed landmark.
    pub fn new(landmark: Landmark) -> Self {
        Self {
            landmark,
            observations: Vec::new(),
        }
    }

    /// Append a new sighting of the landmark.
    pub fn add_observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Number of observations in the track.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the track has no observations yet.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_track_aggregation() {
        let mut track = Track::new(Landmark::new(1.0, 2.0, 3.0));
        assert!(track.is_empty());

        track.add_observation(Observation::new_mono(0, Vector2::new(10.0, 20.0)));
        track.add_observation(Observation::new_mono(1, Vector2::new(12.0, 19.0)));
        assert_eq!(track.len(), 2);
        assert_eq!(track.observations[1].frame_idx, 1);
    }
}
