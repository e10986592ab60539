//! Cutout extraction command
//!
//! This module implements the command for extracting cutouts from FITS
//! files, covering both pixel-range and world-coordinate requests, with
//! optional preview rendering of the results.

use clap::ArgMatches;
use log::{info, warn};
use std::path::Path;

use crate::commands::command_traits::Command;
use crate::extractor::{CutoutAssembler, CutoutRequest};
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::Container;
use crate::fits::{ContainerWriter, FitsReader};
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;
use crate::utils::render_utils;

/// Command for extracting cutouts from FITS files
pub struct CutoutCommand<'a> {
    /// Path to the input file
    input_file: String,
    /// Path to the output file
    output_file: String,
    /// Raw cutout specification strings
    cutouts: Vec<String>,
    /// Whether to render previews of the results
    preview: bool,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> CutoutCommand<'a> {
    /// Create a new cutout command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `logger` - Logger for recording operations
    ///
    /// # Returns
    /// A new CutoutCommand instance or an error
    pub fn new(args: &ArgMatches, logger: &'a Logger) -> CutoutResult<Self> {
        info!("Creating new cutout command from arguments");

        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| CutoutError::GenericError("Missing input file".to_string()))?
            .clone();
        info!("Input file: {}", input_file);

        let output_file = args.get_one::<String>("output")
            .ok_or_else(|| CutoutError::GenericError(
                "Missing output file path for cutout".to_string()))?
            .clone();
        info!("Output file: {}", output_file);

        let cutouts: Vec<String> = args
            .get_many::<String>("cutout")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if cutouts.is_empty() {
            return Err(CutoutError::GenericError(
                "Missing cutout specification".to_string()));
        }
        info!("Cutout specifications: {:?}", cutouts);

        let preview = args.get_flag("preview");
        info!("Preview rendering: {}", preview);

        Ok(CutoutCommand {
            input_file,
            output_file,
            cutouts,
            preview,
            logger,
        })
    }

    /// Render a preview image for every data HDU of the result
    ///
    /// A single data HDU previews under the output file's own name; more
    /// than one get the HDU index appended.
    ///
    /// # Arguments
    /// * `container` - The assembled output container
    fn write_previews(&self, container: &Container) -> CutoutResult<()> {
        let indexes = container.data_extension_indexes();
        if indexes.is_empty() {
            warn!("No data HDUs to preview");
            return Ok(());
        }

        let stem = Path::new(&self.output_file).with_extension("");
        let tracker = ProgressTracker::for_extensions(indexes.len() as u64);
        let single = indexes.len() == 1;

        for index in indexes {
            tracker.step(&format!("HDU #{}", index));
            let data = match container.extensions[index].data.as_ref() {
                Some(data) => data,
                None => continue,
            };
            let base = if single {
                stem.display().to_string()
            } else {
                format!("{}_hdu{}", stem.display(), index)
            };
            let written = render_utils::render_quicklook(data, &base)?;
            self.logger.log(&format!("Preview for HDU #{} written to {}", index, written))?;
        }
        tracker.finish();
        Ok(())
    }
}

impl<'a> Command for CutoutCommand<'a> {
    fn execute(&self) -> CutoutResult<()> {
        info!("Extracting cutout from {} to {}", self.input_file, self.output_file);

        // Parse the request before touching the source file
        let request = CutoutRequest::parse(&self.cutouts)?;

        // Load the source container
        let mut reader = FitsReader::new(self.logger);
        let source = reader.load(&self.input_file)?;

        // Run the cutout and write the result
        let assembler = CutoutAssembler::new(self.logger);
        let result = assembler.assemble(&source, &request)?;
        ContainerWriter::write(&result, &self.output_file)?;

        info!("Saved {} HDU(s) to {}", result.extension_count(), self.output_file);

        if self.preview {
            self.write_previews(&result)?;
        }

        self.logger.log("Cutout completed successfully")?;
        Ok(())
    }
}
