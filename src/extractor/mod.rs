//! Cutout extraction from FITS containers
//!
//! This module provides the pixel-range request syntax, the
//! N-dimensional array cutout and the assembly of whole requests into
//! output containers.

pub mod assembler;
pub mod cutout;
pub mod pixel_parser;
pub mod region;

#[cfg(test)]
mod tests;

// Public exports
pub use assembler::{CutoutAssembler, CutoutRequest};
pub use cutout::{ArrayCutout, CutoutData};
pub use pixel_parser::parse as parse_pixel_request;
pub use region::{AxisRange, ExtensionRef, RegionSpec};
