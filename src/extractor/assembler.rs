//! Cutout assembly across a multi-extension container
//!
//! This module drives a whole cutout request: it resolves which extensions
//! a request addresses, runs the array cutout on each, rewrites the
//! affected headers and reassembles the results into an output container.
//! Pixel requests address extensions explicitly; world requests scan every
//! data-bearing extension and keep the ones the shapes overlap.

use log::{debug, info};

use crate::coordinate::{world_to_shapes, CoordinateReference, LinearWcs, Shape, ShapeResolver};
use crate::extractor::cutout::{ArrayCutout, CutoutData};
use crate::extractor::pixel_parser;
use crate::extractor::region::{AxisRange, ExtensionRef, RegionSpec};
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::{Container, Extension};
use crate::fits::header::{Header, Value};
use crate::fits::keywords::{self, names};
use crate::utils::logger::Logger;

/// A parsed cutout request, either side of the syntax split
#[derive(Debug, Clone)]
pub enum CutoutRequest {
    /// Bracketed pixel-range specs, applied in order
    Pixel(Vec<RegionSpec>),
    /// World-coordinate shapes, combined onto every data extension
    World(Vec<Shape>),
}

impl CutoutRequest {
    /// Parses raw request strings into one combined request
    ///
    /// A string opening with '[' carries pixel-range syntax; anything
    /// else is read as world-coordinate shape tokens. The two syntaxes
    /// cannot be mixed within one request.
    pub fn parse(tokens: &[String]) -> CutoutResult<CutoutRequest> {
        let mut specs = Vec::new();
        let mut world_tokens = Vec::new();
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.starts_with('[') {
                specs.extend(pixel_parser::parse(trimmed)?);
            } else if !trimmed.is_empty() {
                world_tokens.push(trimmed.to_string());
            }
        }

        match (specs.is_empty(), world_tokens.is_empty()) {
            (false, true) => Ok(CutoutRequest::Pixel(specs)),
            (true, false) => {
                let (shapes, passthrough) = world_to_shapes(&world_tokens)?;
                if !passthrough.is_empty() {
                    return Err(CutoutError::ParseError(format!(
                        "unrecognized cutout token(s): {}", passthrough.join(", "))));
                }
                Ok(CutoutRequest::World(shapes))
            }
            (false, false) => Err(CutoutError::ParseError(
                "cannot mix pixel ranges and world shapes in one request".to_string())),
            (true, true) => Err(CutoutError::ParseError(
                "empty cutout request".to_string())),
        }
    }
}

/// Applies a cutout request to a source container
pub struct CutoutAssembler<'a> {
    /// Logger for recording operations
    logger: &'a Logger,
    /// Array cutout engine
    cutter: ArrayCutout<'a>,
}

impl<'a> CutoutAssembler<'a> {
    /// Creates a new assembler
    ///
    /// # Arguments
    /// * `logger` - Logger for recording operations
    pub fn new(logger: &'a Logger) -> Self {
        CutoutAssembler {
            logger,
            cutter: ArrayCutout::new(logger),
        }
    }

    /// Runs a request against a source container
    ///
    /// # Arguments
    /// * `source` - The loaded source container
    /// * `request` - The parsed request to apply
    ///
    /// # Returns
    /// A new container holding the requested cutouts
    pub fn assemble(&self, source: &Container, request: &CutoutRequest) -> CutoutResult<Container> {
        if source.extension_count() == 0 {
            return Err(CutoutError::SourceAccessError(
                "source container holds no HDUs".to_string()));
        }

        let outputs = match request {
            CutoutRequest::Pixel(specs) => self.apply_pixel_specs(source, specs)?,
            CutoutRequest::World(shapes) => self.apply_world_shapes(source, shapes)?,
        };
        Ok(self.reassemble(source, outputs))
    }

    /// Applies pixel-range specs, one output per addressed extension
    fn apply_pixel_specs(
        &self,
        source: &Container,
        specs: &[RegionSpec],
    ) -> CutoutResult<Vec<Extension>> {
        let mut outputs = Vec::new();
        for spec in specs {
            match &spec.extension {
                ExtensionRef::Index(index) => {
                    if source.by_index(*index).is_none() {
                        return Err(CutoutError::ExtensionNotFound(format!(
                            "extension {} not present, source has {} HDU(s)",
                            index, source.extension_count())));
                    }
                    outputs.push(self.cut_extension(source, *index, &spec.ranges)?);
                }
                ExtensionRef::Name(name, version) => {
                    let index = source
                        .extensions
                        .iter()
                        .position(|ext| ext.matches(name, *version))
                        .ok_or_else(|| {
                            let label = match version {
                                Some(v) => format!("{},{}", name, v),
                                None => name.clone(),
                            };
                            CutoutError::ExtensionNotFound(format!(
                                "no extension named '{}' in the source", label))
                        })?;
                    outputs.push(self.cut_extension(source, index, &spec.ranges)?);
                }
                ExtensionRef::AllData => {
                    self.cut_all_data(source, &spec.ranges, &mut outputs)?;
                }
            }
        }
        Ok(outputs)
    }

    /// Fans one spec out over every data-bearing extension
    ///
    /// Extensions the window misses are skipped; only a complete miss is
    /// an error.
    fn cut_all_data(
        &self,
        source: &Container,
        ranges: &[AxisRange],
        outputs: &mut Vec<Extension>,
    ) -> CutoutResult<()> {
        let indexes = source.data_extension_indexes();
        if indexes.is_empty() {
            return Err(CutoutError::NoContent(
                "source holds no data arrays".to_string()));
        }
        let mut produced = false;
        for index in indexes {
            match self.cut_extension(source, index, ranges) {
                Ok(ext) => {
                    outputs.push(ext);
                    produced = true;
                }
                Err(e) if e.is_no_content() => {
                    info!("Extension {} skipped: {}", index, e);
                }
                Err(e) => return Err(e),
            }
        }
        if !produced {
            return Err(CutoutError::NoContent(
                "requested ranges miss every data extension".to_string()));
        }
        Ok(())
    }

    /// Cuts one extension with the given ranges
    ///
    /// A header-only extension passes through untouched when the ranges do
    /// not constrain anything; windowing a dataless HDU is an error.
    fn cut_extension(
        &self,
        source: &Container,
        index: usize,
        ranges: &[AxisRange],
    ) -> CutoutResult<Extension> {
        let ext = &source.extensions[index];
        let constraining = ranges.iter().any(|r| !r.is_whole());

        let data = match &ext.data {
            Some(data) => data,
            None if !constraining => {
                debug!("Carrying extension {} through without data", index);
                return Ok(carry_extension(ext));
            }
            None if ext.payload.is_some() => {
                return Err(CutoutError::ValidationError(format!(
                    "extension {} holds non-image data and cannot be windowed", index)));
            }
            None => {
                return Err(CutoutError::NoContent(format!(
                    "extension {} has no data to window", index)));
            }
        };

        let reference = CoordinateReference::from_header(&ext.header)?;
        let cut = self.cutter.extract(data, reference.as_ref(), ranges)?;
        info!("Extension {} cut to {:?}", index, cut.data.header_shape());
        Ok(build_output(ext, cut))
    }

    /// Scans every data extension for overlap with the requested shapes
    ///
    /// An extension without a usable coordinate description is skipped, as
    /// is one the shapes miss. Parse and validation problems end the scan.
    fn apply_world_shapes(
        &self,
        source: &Container,
        shapes: &[Shape],
    ) -> CutoutResult<Vec<Extension>> {
        let indexes = source.data_extension_indexes();
        if indexes.is_empty() {
            return Err(CutoutError::NoContent(
                "source holds no data arrays".to_string()));
        }

        let resolver = ShapeResolver::new(self.logger);
        let mut outputs = Vec::new();
        for index in indexes {
            let ext = &source.extensions[index];
            let data = match &ext.data {
                Some(data) => data,
                None => continue,
            };

            let reference = match CoordinateReference::from_header(&ext.header)? {
                Some(reference) => reference,
                None => {
                    debug!("Extension {} has no coordinate description, skipped", index);
                    continue;
                }
            };
            let converter = match LinearWcs::from_reference(&reference) {
                Ok(converter) => converter,
                Err(e) if e.is_no_content() => {
                    debug!("Extension {} skipped: {}", index, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let ranges = match resolver.world_to_pixels(shapes, &reference, &converter) {
                Ok(ranges) => drop_degenerate_axes(ranges, &reference.axis_lengths),
                Err(e) if e.is_no_content() => {
                    info!("Extension {} misses the shapes: {}", index, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.cutter.extract(data, Some(&reference), &ranges) {
                Ok(cut) => {
                    info!("Extension {} cut to {:?}", index, cut.data.header_shape());
                    outputs.push(build_output(ext, cut));
                }
                Err(e) if e.is_no_content() => {
                    info!("Extension {} skipped: {}", index, e);
                }
                Err(e) => return Err(e),
            }
        }

        if outputs.is_empty() {
            return Err(CutoutError::NoContent(
                "no extension overlaps the requested shapes".to_string()));
        }
        Ok(outputs)
    }

    /// Builds the output container around the produced extensions
    ///
    /// A single result stands alone as the new primary HDU. Several
    /// results keep the source's primary header in front of them so the
    /// output stays a well-formed multi-extension file.
    fn reassemble(&self, source: &Container, outputs: Vec<Extension>) -> Container {
        let mut container = Container::new();
        if outputs.len() == 1 {
            container.extensions = outputs;
        } else {
            let mut primary_header = match source.primary() {
                Some(primary) => primary.header.clone(),
                None => Header::new(),
            };
            primary_header.drain_matching(keywords::is_checksum);
            container.extensions.push(Extension::new(primary_header, None, 0));
            container.extensions.extend(outputs);
        }
        let _ = self.logger.log(&format!(
            "Assembled output container with {} HDU(s)", container.extension_count()));
        container
    }
}

/// Clones a header-only extension, stripping stale integrity cards
fn carry_extension(ext: &Extension) -> Extension {
    let mut carried = ext.clone();
    carried.header.drain_matching(keywords::is_checksum);
    carried
}

/// Builds the output extension for one cut, rewriting its header
fn build_output(ext: &Extension, cut: CutoutData) -> Extension {
    let header = sanitize_header(&ext.header, &cut);
    let mut output = Extension::new(header, Some(cut.data), ext.source_index);
    output.payload = None;
    output
}

/// Rewrites a source header for the extracted block
///
/// Checksum cards are dropped since the data they covered changed. The
/// reference pixel cards take their post-cut values, and any transform
/// matrix cards move up next to the axis block so readers that expect
/// them early find them there.
fn sanitize_header(source: &Header, cut: &CutoutData) -> Header {
    let mut header = source.clone();
    header.drain_matching(keywords::is_checksum);

    for (axis0, &crpix) in cut.crpix_after_cut.iter().enumerate() {
        header.set_value(&format!("{}{}", names::CRPIX, axis0 + 1), Value::Real(crpix));
    }

    let matrix_cards = header.drain_matching(keywords::is_matrix_keyword);
    if !matrix_cards.is_empty() {
        let naxis = header.integer(names::NAXIS).unwrap_or(0);
        let anchor = format!("{}{}", names::NAXIS, naxis);
        if naxis > 0 && header.contains(&anchor) {
            header.insert_all_after(&anchor, matrix_cards);
        } else {
            header.insert_all_after(names::NAXIS, matrix_cards);
        }
    }
    header
}

/// Drops resolved ranges on axes a squeeze will remove
///
/// The extraction squeezes single-length source axes before windowing, so
/// ranges produced per declared axis must shed the degenerate entries to
/// line up with what the array will look like.
fn drop_degenerate_axes(ranges: Vec<AxisRange>, axis_lengths: &[usize]) -> Vec<AxisRange> {
    if axis_lengths.iter().all(|&n| n != 1) {
        return ranges;
    }
    ranges
        .into_iter()
        .zip(axis_lengths)
        .filter(|(_, &length)| length != 1)
        .map(|(range, _)| range)
        .collect()
}
