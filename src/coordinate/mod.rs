//! World coordinate handling for FITS data
//!
//! This module provides structures and functionality for reading a
//! header's coordinate description, for parsing world-coordinate shapes
//! and for resolving those shapes into pixel ranges.

mod resolver;
mod shapes;
pub(crate) mod wcs;

#[cfg(test)]
mod tests;

// Re-export key types
pub use self::resolver::ShapeResolver;
pub use self::shapes::{world_to_shapes, PolarizationState, Shape};
pub use self::wcs::{
    AxisKind, CoordinateReference, LinearMatrix, LinearWcs, MatrixForm, PixelConverter,
    SipDistortion,
};
