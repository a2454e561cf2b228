//! Seawater equations.

mod equation_of_state;

pub use equation_of_state::{
    DensityModel, RHO_ANOMALY_OFFSET, density, density_surface, secant_bulk_modulus,
};
