//! FITS structure analysis command
//!
//! This module implements the command for analyzing and displaying
//! the structure of FITS files and their coordinate descriptions.

use clap::ArgMatches;
use log::{debug, info};

use crate::commands::command_traits::Command;
use crate::coordinate::{AxisKind, CoordinateReference};
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::{Container, Extension};
use crate::fits::keywords::KEYWORD_DEFINITIONS;
use crate::fits::FitsReader;
use crate::utils::logger::Logger;

/// Command for analyzing FITS file structure
pub struct AnalyzeCommand<'a> {
    /// Path to the input file
    input_file: String,
    /// Whether to enable verbose output
    verbose: bool,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> AnalyzeCommand<'a> {
    /// Create a new analyze command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    ///
    /// # Returns
    /// A new AnalyzeCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> CutoutResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| CutoutError::GenericError("Missing input file".to_string()))?
            .clone();

        let verbose = args.get_flag("verbose");

        Ok(AnalyzeCommand {
            input_file,
            verbose,
            logger,
        })
    }

    /// Display basic container information
    ///
    /// Shows the number of HDUs and which of them carry data.
    ///
    /// # Arguments
    /// * `container` - The container to analyze
    fn display_container_summary(&self, container: &Container) {
        info!("FITS Analysis Results:");
        info!("  Number of HDUs: {}", container.extension_count());
        info!("  Data-bearing HDUs: {:?}", container.data_extension_indexes());
    }

    /// Display basic HDU information
    ///
    /// Shows the HDU label, pixel type and dimensions.
    ///
    /// # Arguments
    /// * `ext` - The HDU to analyze
    /// * `index` - Index of the HDU in the container
    fn display_extension_summary(&self, ext: &Extension, index: usize) {
        let label = match ext.name() {
            Some(name) => format!("{} v{}", name, ext.version()),
            None if index == 0 => "primary".to_string(),
            None => "unnamed".to_string(),
        };
        info!("\nHDU #{} ({})", index, label);
        info!("  Number of cards: {}", ext.header.len());

        match &ext.data {
            Some(data) => {
                let dims: Vec<String> =
                    data.header_shape().iter().map(|d| d.to_string()).collect();
                info!("  Dimensions: {}", dims.join("x"));
                info!("  Pixel type: BITPIX {}", data.bitpix);
            }
            None if ext.payload.is_some() => info!("  Data: non-image payload"),
            None => info!("  Data: none"),
        }
    }

    /// Display the coordinate description of an HDU, when it has one
    ///
    /// Shows each axis with its type and classification, the linear
    /// matrix form and any distortion or rest frequency declarations.
    ///
    /// # Arguments
    /// * `ext` - The HDU to analyze
    fn display_coordinate_info(&self, ext: &Extension) -> CutoutResult<()> {
        let reference = match CoordinateReference::from_header(&ext.header)? {
            Some(reference) => reference,
            None => return Ok(()),
        };

        info!("  Coordinate axes ({}):", reference.naxis);
        for (i, kind) in reference.axis_kinds().iter().enumerate() {
            let ctype = reference.ctype.get(i).map(String::as_str).unwrap_or("");
            let cunit = reference.cunit.get(i).map(String::as_str).unwrap_or("");
            let unit_note = if cunit.is_empty() {
                String::new()
            } else {
                format!(" [{}]", cunit)
            };
            info!("    Axis {}: {}{} ({})", i + 1, ctype, unit_note, kind_name(*kind));
        }

        if let Some(matrix) = &reference.matrix {
            info!("  Linear matrix: {} form, {} element(s)",
                  matrix.form.prefix(), matrix.elements.len());
        }
        if let Some(sip) = &reference.sip {
            info!("  SIP distortion: {} forward / {} inverse term(s)",
                  sip.a.len() + sip.b.len(), sip.ap.len() + sip.bp.len());
        }
        if let Some(rest) = reference.rest_frequency {
            info!("  Rest frequency: {:.6e} Hz", rest);
        }
        Ok(())
    }

    /// Display a summary of the leading header cards
    ///
    /// Shows detailed information for a subset of cards to avoid
    /// overwhelming output for large headers. Known keywords get their
    /// dictionary description.
    ///
    /// # Arguments
    /// * `ext` - The HDU whose header to summarize
    fn display_card_summary(&self, ext: &Extension) {
        let max_cards = 10;
        info!("  First {} cards:", ext.header.len().min(max_cards));
        for (j, card) in ext.header.cards().iter().take(max_cards).enumerate() {
            match KEYWORD_DEFINITIONS.describe(&card.keyword) {
                Some(text) => debug!("    {}: {} ({})", j, card, text),
                None => debug!("    {}: {}", j, card),
            }
        }

        if ext.header.len() > max_cards {
            info!("    ... ({} more cards)", ext.header.len() - max_cards);
        }
    }
}

/// Human-readable name of an axis classification
fn kind_name(kind: AxisKind) -> &'static str {
    match kind {
        AxisKind::SpatialLon => "longitude",
        AxisKind::SpatialLat => "latitude",
        AxisKind::Spectral => "spectral",
        AxisKind::Time => "time",
        AxisKind::Polarization => "polarization",
        AxisKind::Other => "other",
    }
}

impl<'a> Command for AnalyzeCommand<'a> {
    fn execute(&self) -> CutoutResult<()> {
        info!("Analyzing file: {}", self.input_file);

        if self.verbose {
            debug!("Verbose mode enabled");
        }

        // Create and use FITS reader
        let mut reader = FitsReader::new(self.logger);
        let container = reader.load(&self.input_file)?;

        // Display basic container information
        self.display_container_summary(&container);

        // Process each HDU
        for (i, ext) in container.extensions.iter().enumerate() {
            self.display_extension_summary(ext, i);
            self.display_coordinate_info(ext)?;

            if self.verbose {
                self.display_card_summary(ext);
            }
        }

        // Record the directory in the operation log
        let directory = container
            .extensions
            .iter()
            .enumerate()
            .map(|(i, ext)| {
                let label = match ext.name() {
                    Some(name) => format!("{} v{}", name, ext.version()),
                    None if i == 0 => "primary".to_string(),
                    None => "unnamed".to_string(),
                };
                let summary = match &ext.data {
                    Some(data) => format!("{:?} (BITPIX {})", data.header_shape(), data.bitpix),
                    None => "no data".to_string(),
                };
                (i, label, summary)
            })
            .collect();
        self.logger.print_extension_directory(directory)?;

        debug!("Analysis completed successfully");
        self.logger.log("Analysis completed successfully")?;

        Ok(())
    }
}
