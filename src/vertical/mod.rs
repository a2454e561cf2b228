//! Vertical coordinates of ocean model output.
//!
//! NorKyst history files use ROMS terrain-following s-coordinates; some
//! derived products are interpolated to fixed z-levels and carry a 1-D
//! `depth` coordinate instead. [`VerticalLevels`] covers both and converts
//! to depths below the surface at a single water column.
//!
//! # Example
//!
//! ```
//! use norkyst_rs::vertical::{SCoordinate, VTransform};
//!
//! let s_rho = vec![-0.9, -0.5, -0.1];
//! let cs_r = vec![-0.95, -0.4, -0.02];
//! let coord = SCoordinate::new(s_rho, cs_r, 20.0, VTransform::Shchepetkin).unwrap();
//!
//! // 150 m deep column with 0.3 m surface elevation
//! let z = coord.z_at_levels(0.3, 150.0);
//! assert!(z[0] < -100.0);
//! assert!(z[2] > -10.0);
//! ```

mod s_coordinate;

pub use s_coordinate::{SCoordinate, VTransform, VerticalLevels};
