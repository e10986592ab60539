//! FITS container parsing module
//!
//! This module provides structures and functions for reading and writing
//! FITS files: the card/header model, the HDU container, and the
//! block-wise reader and writer.

pub mod errors;
pub mod header;
pub mod data;
pub mod extension;
pub mod reader;
pub mod writer;
pub mod keywords;
#[cfg(test)]
mod tests;

pub use errors::{CutoutError, CutoutResult};
pub use header::{Card, Header, Value};
pub use data::DataArray;
pub use extension::{Container, Extension};
pub use reader::FitsReader;
pub use writer::ContainerWriter;
