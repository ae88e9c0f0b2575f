//! 3D landmark position estimates.

use nalgebra::{Vector3, Vector4};

/// A 3D point's current position estimate, stored homogeneously.
///
/// The last component is a scale/weight, typically 1 for finite points.
/// Landmarks are mutated only by the external solver between iterations;
/// the projection engine reads them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Homogeneous position (x, y, z, w)
    pub position: Vector4<f64>,
}

impl Landmark {
    /// Create a finite landmark from Euclidean coordinates (w = 1).
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector4::new(x, y, z, 1.0),
        }
    }

    /// Create a landmark from homogeneous coordinates.
    pub fn from_homogeneous(position: Vector4<f64>) -> Self {
        Self { position }
    }

    /// The Euclidean part of the position.
    pub fn xyz(&self) -> Vector3<f64> {
        self.position.xyz()
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Landmark::new(0.0, 0.0, 0.0)
    }
}
