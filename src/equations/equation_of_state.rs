//! Seawater density from temperature, salinity and pressure.
//!
//! UNESCO EOS-80: the one-atmosphere density of Millero & Poisson (1981)
//! and the secant bulk modulus of Millero et al. (1980).
//!
//! # Units
//!
//! - Temperature: °C
//! - Salinity: PSU
//! - Pressure: dbar, where 1 dbar ≈ 1 m depth
//! - Density: kg/m³
//!
//! Typical Norwegian coastal values are 1020-1028 kg/m³ at the surface,
//! lighter in fjords with river input.

/// Offset between in-situ density and the density anomaly stored by ROMS.
pub const RHO_ANOMALY_OFFSET: f64 = 1000.0;

/// How pressure enters the density computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityModel {
    /// In-situ density with pressure taken as depth in metres
    #[default]
    InSitu,
    /// One-atmosphere density, ignoring depth
    Surface,
}

impl DensityModel {
    /// Density at `depth` metres below the surface.
    pub fn density(&self, temperature: f64, salinity: f64, depth: f64) -> f64 {
        match self {
            Self::InSitu => density(temperature, salinity, depth.max(0.0)),
            Self::Surface => density_surface(temperature, salinity),
        }
    }
}

/// One-atmosphere density.
///
/// # Example
/// ```
/// use norkyst_rs::equations::density_surface;
///
/// // Fresh water near its density maximum
/// assert!((density_surface(4.0, 0.0) - 1000.0).abs() < 0.1);
/// ```
pub fn density_surface(temperature: f64, salinity: f64) -> f64 {
    let t = temperature;
    let s = salinity;

    // Standard mean ocean water
    let rho_w = 999.842594
        + t * (6.793952e-2 + t * (-9.095290e-3 + t * (1.001685e-4 + t * (-1.120083e-6 + t * 6.536336e-9))));

    let a = 8.24493e-1 + t * (-4.0899e-3 + t * (7.6438e-5 + t * (-8.2467e-7 + t * 5.3875e-9)));
    let b = -5.72466e-3 + t * (1.0227e-4 - t * 1.6546e-6);
    let c = 4.8314e-4;

    rho_w + s * (a + b * s.sqrt() + c * s)
}

/// Secant bulk modulus K(S, T, p) in bar, with `pressure` in bar.
pub fn secant_bulk_modulus(temperature: f64, salinity: f64, pressure: f64) -> f64 {
    let t = temperature;
    let s = salinity;
    let s15 = s * s.sqrt();
    let p = pressure;

    let kw = 19652.21 + t * (148.4206 + t * (-2.327105 + t * (1.360477e-2 - t * 5.155288e-5)));
    let k0 = kw
        + s * (54.6746 + t * (-0.603459 + t * (1.09987e-2 - t * 6.1670e-5)))
        + s15 * (7.944e-2 + t * (1.6483e-2 - t * 5.3009e-4));

    let aw = 3.239908 + t * (1.43713e-3 + t * (1.16092e-4 - t * 5.77905e-7));
    let a = aw + s * (2.2838e-3 + t * (-1.0981e-5 - t * 1.6078e-6)) + s15 * 1.91075e-4;

    let bw = 8.50935e-5 + t * (-6.12293e-6 + t * 5.2787e-8);
    let b = bw + s * (-9.9348e-7 + t * (2.0816e-8 + t * 9.1697e-10));

    k0 + p * (a + b * p)
}

/// In-situ density with `pressure` in dbar.
pub fn density(temperature: f64, salinity: f64, pressure: f64) -> f64 {
    let rho = density_surface(temperature, salinity);
    if pressure == 0.0 {
        return rho;
    }
    let p_bar = pressure / 10.0;
    rho / (1.0 - p_bar / secant_bulk_modulus(temperature, salinity, p_bar))
}
