pub mod fits;
pub mod utils;
pub mod extractor;
pub mod coordinate;
pub mod commands;
pub mod api;

pub use crate::api::CubeCut;

pub use fits::{Container, ContainerWriter, FitsReader};
pub use extractor::{CutoutAssembler, CutoutRequest, RegionSpec};
pub use coordinate::{PixelConverter, Shape};
