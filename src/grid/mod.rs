//! Horizontal grid geometry.

mod resolver;

pub use resolver::{GridCell, GridCoordinateResolver, GridError, GridPosition, InversionConfig};
