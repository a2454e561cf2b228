//! ROMS terrain-following s-coordinate.
//!
//! Each rho level has a fractional position `s ∈ [-1, 0]` and a stretching
//! value `C(s)` stored in the file (`s_rho`, `Cs_r`). Together with the
//! critical depth `hc`, the bathymetry `h` and the free surface `zeta` they
//! give the level heights `z` (negative below the surface):
//!
//! ```text
//! Vtransform = 1:  z0 = hc·s + (h − hc)·C      z = z0 + ζ·(1 + z0/h)
//! Vtransform = 2:  S  = (hc·s + h·C)/(hc + h)  z = ζ + (ζ + h)·S
//! ```

use crate::io::{GridSource, SourceError};

/// Vertical transformation equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VTransform {
    /// Original ROMS transformation
    Original,
    /// Transformation of Shchepetkin (2005), used by NorKyst
    Shchepetkin,
}

impl VTransform {
    /// Decode the `Vtransform` variable.
    pub fn from_code(code: f64) -> Result<Self, SourceError> {
        match code.round() as i64 {
            1 => Ok(Self::Original),
            2 => Ok(Self::Shchepetkin),
            _ => Err(SourceError::InvalidData(format!("unsupported Vtransform {code}"))),
        }
    }
}

/// s-coordinate parameters of the rho levels, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct SCoordinate {
    s_rho: Vec<f64>,
    cs_r: Vec<f64>,
    hc: f64,
    transform: VTransform,
}

impl SCoordinate {
    pub fn new(s_rho: Vec<f64>, cs_r: Vec<f64>, hc: f64, transform: VTransform) -> Result<Self, SourceError> {
        if s_rho.len() != cs_r.len() {
            return Err(SourceError::InvalidData(format!(
                "s_rho has {} levels but Cs_r has {}",
                s_rho.len(),
                cs_r.len()
            )));
        }
        Ok(Self {
            s_rho,
            cs_r,
            hc,
            transform,
        })
    }

    pub fn n_levels(&self) -> usize {
        self.s_rho.len()
    }

    /// Level heights at a water column with surface `zeta` and depth `h`.
    ///
    /// `z_out` must hold at least `n_levels` values.
    #[inline]
    pub fn z_at_levels_into(&self, zeta: f64, h: f64, z_out: &mut [f64]) {
        debug_assert!(z_out.len() >= self.n_levels(), "Output buffer too small");

        let hc = self.hc;
        for ((z, &s), &cs) in z_out.iter_mut().zip(&self.s_rho).zip(&self.cs_r) {
            *z = match self.transform {
                VTransform::Original => {
                    let z0 = hc * s + (h - hc) * cs;
                    z0 + zeta * (1.0 + z0 / h)
                }
                VTransform::Shchepetkin => {
                    let stretched = (hc * s + h * cs) / (hc + h);
                    zeta + (zeta + h) * stretched
                }
            };
        }
    }

    pub fn z_at_levels(&self, zeta: f64, h: f64) -> Vec<f64> {
        let mut z = vec![0.0; self.n_levels()];
        self.z_at_levels_into(zeta, h, &mut z);
        z
    }
}

/// Vertical levels of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum VerticalLevels {
    /// Fixed depths in metres, positive down (z-level output)
    Fixed(Vec<f64>),
    /// Terrain-following levels
    SCoordinate(SCoordinate),
}

impl VerticalLevels {
    /// Read the vertical coordinate of a dataset.
    ///
    /// A 1-D `depth` variable takes precedence over s-coordinate parameters.
    pub fn from_source(source: &dyn GridSource) -> Result<Self, SourceError> {
        if source.has_variable("depth") && source.layout("depth").is_none() {
            return Ok(Self::Fixed(source.read_values("depth")?));
        }

        let missing = ["s_rho", "Cs_r", "hc"]
            .into_iter()
            .find(|name| !source.has_variable(name));
        if let Some(name) = missing {
            return Err(SourceError::MissingVariable(name.to_string()));
        }

        // ROMS files without Vtransform use the original transformation
        let transform = if source.has_variable("Vtransform") {
            VTransform::from_code(source.read_scalar("Vtransform")?)?
        } else {
            VTransform::Original
        };
        let coordinate = SCoordinate::new(
            source.read_values("s_rho")?,
            source.read_values("Cs_r")?,
            source.read_scalar("hc")?,
            transform,
        )?;
        Ok(Self::SCoordinate(coordinate))
    }

    pub fn n_levels(&self) -> usize {
        match self {
            Self::Fixed(depths) => depths.len(),
            Self::SCoordinate(coordinate) => coordinate.n_levels(),
        }
    }

    /// Whether depths depend on `zeta` and `h`.
    pub fn is_terrain_following(&self) -> bool {
        matches!(self, Self::SCoordinate(_))
    }

    /// Level depths in metres below the instantaneous surface `zeta`
    /// (positive down).
    pub fn depths_into(&self, zeta: f64, h: f64, depth_out: &mut [f64]) {
        match self {
            Self::Fixed(depths) => {
                for (d, &v) in depth_out.iter_mut().zip(depths) {
                    *d = v;
                }
            }
            Self::SCoordinate(coordinate) => {
                coordinate.z_at_levels_into(zeta, h, depth_out);
                for d in depth_out.iter_mut().take(coordinate.n_levels()) {
                    *d = zeta - *d;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;
    use faer::Mat;

    const TOL: f64 = 1e-10;

    fn uniform(n: usize, transform: VTransform) -> SCoordinate {
        let s: Vec<f64> = (0..n).map(|k| -1.0 + (k as f64 + 0.5) / n as f64).collect();
        SCoordinate::new(s.clone(), s, 10.0, transform).unwrap()
    }

    #[test]
    fn test_flat_surface_matches_sigma() {
        // With C(s) = s both transformations reduce to z = s·h
        for transform in [VTransform::Original, VTransform::Shchepetkin] {
            let z = uniform(4, transform).z_at_levels(0.0, 100.0);
            for (zk, expected) in z.iter().zip([-87.5, -62.5, -37.5, -12.5]) {
                assert!((zk - expected).abs() < TOL, "{transform:?}: {zk} vs {expected}");
            }
        }
    }

    #[test]
    fn test_surface_elevation_stretches_column() {
        let coord = uniform(2, VTransform::Shchepetkin);
        let z = coord.z_at_levels(1.0, 100.0);
        // z = ζ + (ζ + h)·s
        assert!((z[0] - (1.0 - 101.0 * 0.75)).abs() < TOL);
        assert!((z[1] - (1.0 - 101.0 * 0.25)).abs() < TOL);
    }

    #[test]
    fn test_original_transform_with_stretching() {
        let coord = SCoordinate::new(vec![-0.5], vec![-0.2], 20.0, VTransform::Original).unwrap();
        let z = coord.z_at_levels(0.5, 200.0);
        let z0 = 20.0 * -0.5 + 180.0 * -0.2;
        assert!((z[0] - (z0 + 0.5 * (1.0 + z0 / 200.0))).abs() < TOL);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SCoordinate::new(vec![-0.5, -0.1], vec![-0.5], 10.0, VTransform::Original).is_err());
        assert!(VTransform::from_code(3.0).is_err());
        assert_eq!(VTransform::from_code(2.0).unwrap(), VTransform::Shchepetkin);
    }

    #[test]
    fn test_levels_from_source() {
        let base = MemorySource::new(Mat::zeros(2, 2), Mat::zeros(2, 2)).unwrap();

        let fixed = base.clone().with_vector("depth", vec![0.0, 5.0, 10.0]);
        let levels = VerticalLevels::from_source(&fixed).unwrap();
        assert!(!levels.is_terrain_following());
        let mut out = [0.0; 3];
        levels.depths_into(2.0, 50.0, &mut out);
        assert_eq!(out, [0.0, 5.0, 10.0]);

        let roms = base
            .clone()
            .with_vector("s_rho", vec![-0.75, -0.25])
            .with_vector("Cs_r", vec![-0.75, -0.25])
            .with_scalar("hc", 10.0)
            .with_scalar("Vtransform", 2.0);
        let levels = VerticalLevels::from_source(&roms).unwrap();
        assert_eq!(levels.n_levels(), 2);
        let mut out = [0.0; 2];
        levels.depths_into(0.0, 40.0, &mut out);
        assert!((out[0] - 30.0).abs() < TOL && (out[1] - 10.0).abs() < TOL);

        // Measured from the raised surface, not from mean sea level
        levels.depths_into(1.0, 100.0, &mut out);
        assert!((out[0] - 75.75).abs() < TOL && (out[1] - 25.25).abs() < TOL, "{out:?}");

        assert!(matches!(
            VerticalLevels::from_source(&base),
            Err(SourceError::MissingVariable(_))
        ));
    }
}
