//! Rotation of grid-relative velocities to a compass direction.
//!
//! ROMS stores velocity along the grid axes. With `angle` the angle between
//! the XI axis and true east (radians, counter-clockwise), the geographic
//! components are
//!
//! ```text
//! east  = u·cos(a) − v·sin(a)
//! north = u·sin(a) + v·cos(a)
//! ```
//!
//! Projected onto an azimuth θ (degrees clockwise from north) and onto θ − 90°:
//!
//! ```text
//! along =  east·sin(θ) + north·cos(θ) =  u·sin(θ + a) + v·cos(θ + a)
//! cross = −east·cos(θ) + north·sin(θ) = −u·cos(θ + a) + v·sin(θ + a)
//! ```

/// Rotation from grid axes to along/cross components of an azimuth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthRotation {
    sin: f64,
    cos: f64,
}

impl AzimuthRotation {
    /// `azimuth_deg` clockwise from north, `grid_angle` in radians.
    pub fn new(azimuth_deg: f64, grid_angle: f64) -> Self {
        let (sin, cos) = (azimuth_deg.to_radians() + grid_angle).sin_cos();
        Self { sin, cos }
    }

    /// Rotation for velocities already given as east/north.
    pub fn geographic(azimuth_deg: f64) -> Self {
        Self::new(azimuth_deg, 0.0)
    }

    /// `(along, cross)` components of grid velocity `(u, v)`.
    #[inline]
    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        (u * self.sin + v * self.cos, -u * self.cos + v * self.sin)
    }
}

/// `(along, cross)` components of a single velocity sample.
pub fn rotate_to_azimuth(u: f64, v: f64, grid_angle: f64, azimuth_deg: f64) -> (f64, f64) {
    AzimuthRotation::new(azimuth_deg, grid_angle).apply(u, v)
}
