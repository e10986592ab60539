use log::info;

use crate::coordinate::CoordinateReference;
use crate::extractor::{CutoutAssembler, CutoutRequest};
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::Container;
use crate::fits::{ContainerWriter, FitsReader};
use crate::utils::logger::Logger;
use crate::utils::render_utils;

/// Main interface to the cubecut library
pub struct CubeCut {
    logger: Logger,
}

impl CubeCut {
    /// Create a new CubeCut instance
    ///
    /// # Arguments
    /// * `log_file` - Optional path to log file, defaults to "cubecut.log"
    ///
    /// # Returns
    /// A CubeCut instance or an error if initialization fails
    pub fn new(log_file: Option<&str>) -> CutoutResult<Self> {
        let log_path = log_file.unwrap_or("cubecut.log");
        let logger = Logger::new(log_path)?;
        Ok(CubeCut { logger })
    }

    /// Analyze a FITS file and return information about its structure
    ///
    /// # Arguments
    /// * `input_path` - Path to the FITS file to analyze
    ///
    /// # Returns
    /// String containing analysis information or an error
    pub fn analyze(&self, input_path: &str) -> CutoutResult<String> {
        // Create a reader and load the file directly
        let mut reader = FitsReader::new(&self.logger);
        let container = reader.load(input_path)?;

        // Format a summary of the file
        let mut result = "FITS Analysis Results:\n".to_string();
        result.push_str(&format!("  Number of HDUs: {}\n", container.extension_count()));

        // Add details for each HDU
        for (i, ext) in container.extensions.iter().enumerate() {
            let label = match ext.name() {
                Some(name) => format!("{} v{}", name, ext.version()),
                None if i == 0 => "primary".to_string(),
                None => "unnamed".to_string(),
            };
            result.push_str(&format!("\nHDU #{} ({})\n", i, label));
            result.push_str(&format!("  Number of cards: {}\n", ext.header.len()));

            if let Some(data) = &ext.data {
                let dims: Vec<String> =
                    data.header_shape().iter().map(|d| d.to_string()).collect();
                result.push_str(&format!("  Dimensions: {}\n", dims.join("x")));
                result.push_str(&format!("  Pixel type: BITPIX {}\n", data.bitpix));
            }

            // Add coordinate info when the header declares axes
            if let Ok(Some(reference)) = CoordinateReference::from_header(&ext.header) {
                let axes: Vec<String> = reference
                    .ctype
                    .iter()
                    .filter(|t| !t.is_empty())
                    .cloned()
                    .collect();
                if !axes.is_empty() {
                    result.push_str(&format!("  Coordinate axes: {}\n", axes.join(", ")));
                }
            }
        }

        Ok(result)
    }

    /// Extract a cutout from a FITS file to memory
    ///
    /// Each request string is either bracketed pixel-range syntax, for
    /// example "[1][100:200,100:200]", or a world-coordinate shape such
    /// as "CIRCLE 150.2 2.43 0.01". Several strings combine into one
    /// request.
    ///
    /// # Arguments
    /// * `input_path` - Path to the input FITS file
    /// * `cutouts` - The cutout specification strings
    ///
    /// # Returns
    /// Result containing the output container or an error
    pub fn cutout(&self, input_path: &str, cutouts: &[String]) -> CutoutResult<Container> {
        info!("Extracting cutout {:?} from {}", cutouts, input_path);

        let request = CutoutRequest::parse(cutouts)?;

        let mut reader = FitsReader::new(&self.logger);
        let source = reader.load(input_path)?;

        let assembler = CutoutAssembler::new(&self.logger);
        assembler.assemble(&source, &request)
    }

    /// Extract a cutout from a FITS file to another file
    ///
    /// # Arguments
    /// * `input_path` - Path to the input FITS file
    /// * `cutouts` - The cutout specification strings
    /// * `output_path` - Path where to save the result
    ///
    /// # Returns
    /// Result indicating success or an error
    pub fn cutout_to_file(&self,
                          input_path: &str,
                          cutouts: &[String],
                          output_path: &str) -> CutoutResult<()> {
        let result = self.cutout(input_path, cutouts)?;
        ContainerWriter::write(&result, output_path)
    }

    /// Extract a cutout and serialize it without touching disk
    ///
    /// # Arguments
    /// * `input_path` - Path to the input FITS file
    /// * `cutouts` - The cutout specification strings
    ///
    /// # Returns
    /// Result containing the serialized FITS bytes or an error
    pub fn cutout_to_buffer(&self,
                            input_path: &str,
                            cutouts: &[String]) -> CutoutResult<Vec<u8>> {
        let result = self.cutout(input_path, cutouts)?;
        ContainerWriter::serialize(&result)
    }

    /// Render the first data HDU of a FITS file as a grayscale preview
    ///
    /// # Arguments
    /// * `input_path` - Path to the input FITS file
    /// * `output_path` - Path for the preview, extension forced to .png
    ///
    /// # Returns
    /// The path actually written, or an error
    pub fn preview(&self, input_path: &str, output_path: &str) -> CutoutResult<String> {
        let mut reader = FitsReader::new(&self.logger);
        let container = reader.load(input_path)?;

        let index = container
            .data_extension_indexes()
            .into_iter()
            .next()
            .ok_or_else(|| CutoutError::NoContent(
                "file holds no data HDU to preview".to_string()))?;
        let data = container.extensions[index]
            .data
            .as_ref()
            .ok_or_else(|| CutoutError::NoContent(
                "file holds no data HDU to preview".to_string()))?;

        render_utils::render_quicklook(data, output_path)
    }
}
