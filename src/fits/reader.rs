//! FITS file reader implementation
//!
//! This module implements the block-wise FITS reader. A file is a sequence
//! of HDUs, each a run of 2880-byte header blocks holding 80-character
//! cards up to the END card, followed by enough 2880-byte data blocks for
//! the data unit the header declares. Gzip-compressed files are detected
//! by magic bytes and decompressed transparently.

use flate2::read::GzDecoder;
use log::{debug, info, warn};
use std::fs::File;
use std::io::Read;

use crate::fits::data::DataArray;
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::{Container, Extension};
use crate::fits::header::{Card, Header};
use crate::fits::keywords::{layout, names};
use crate::utils::logger::Logger;

/// Reader for FITS files
pub struct FitsReader<'a> {
    /// Logger instance
    logger: &'a Logger,
    /// Current file path
    current_file: Option<String>,
}

impl<'a> FitsReader<'a> {
    /// Creates a new FITS reader
    pub fn new(logger: &'a Logger) -> Self {
        FitsReader {
            logger,
            current_file: None,
        }
    }

    /// Loads a FITS file from the given path
    ///
    /// This is the main entry point for loading a file. It opens the file
    /// and delegates to the read() method.
    ///
    /// # Arguments
    /// * `filepath` - Path to the FITS file to load
    ///
    /// # Returns
    /// A container holding every HDU in the file
    pub fn load(&mut self, filepath: &str) -> CutoutResult<Container> {
        info!("Loading FITS file: {}", filepath);
        self.current_file = Some(filepath.to_string());

        let mut file = File::open(filepath).map_err(|e| {
            CutoutError::SourceAccessError(format!("cannot open {}: {}", filepath, e))
        })?;
        self.read(&mut file)
    }

    /// Reads a FITS container from any byte source
    ///
    /// The whole stream is buffered before parsing; cutout work is done in
    /// memory, so block walking over a slice keeps the offset arithmetic
    /// simple.
    ///
    /// # Arguments
    /// * `input` - Byte source positioned at the start of the file
    ///
    /// # Returns
    /// A container holding every HDU in the stream
    pub fn read(&mut self, input: &mut dyn Read) -> CutoutResult<Container> {
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer)?;
        let buffer = self.decompress_if_needed(buffer)?;

        if buffer.len() < layout::BLOCK_SIZE {
            return Err(CutoutError::SourceAccessError(format!(
                "file holds {} bytes, smaller than one block", buffer.len())));
        }

        let mut container = Container::new();
        let mut pos = 0;

        while pos < buffer.len() {
            if is_block_padding(&buffer[pos..]) {
                break;
            }
            let index = container.extension_count();
            let extension = self.read_extension(&buffer, &mut pos, index)?;
            container.extensions.push(extension);
        }

        if container.extensions.is_empty() {
            return Err(CutoutError::SourceAccessError(
                "file contains no HDUs".to_string()));
        }

        let _ = self.logger.log(&format!(
            "Read container with {} HDU(s)", container.extension_count()));
        Ok(container)
    }

    /// Replaces the buffer with its decompressed form when gzip magic
    /// bytes lead the stream
    fn decompress_if_needed(&self, buffer: Vec<u8>) -> CutoutResult<Vec<u8>> {
        if buffer.len() < 2 || buffer[..2] != layout::GZIP_MAGIC {
            return Ok(buffer);
        }
        debug!("Gzip magic detected, decompressing");
        let mut decoder = GzDecoder::new(&buffer[..]);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).map_err(|e| {
            CutoutError::SourceAccessError(format!("gzip decompression failed: {}", e))
        })?;
        Ok(decompressed)
    }

    /// Reads one HDU starting at `pos`, advancing `pos` past its data blocks
    fn read_extension(
        &self,
        buffer: &[u8],
        pos: &mut usize,
        index: usize,
    ) -> CutoutResult<Extension> {
        let header = self.read_header(buffer, pos, index)?;

        // The first HDU must be a primary, later ones proper extensions
        if index == 0 && !header.contains(names::SIMPLE) {
            return Err(CutoutError::SourceAccessError(
                "primary HDU does not start with SIMPLE".to_string()));
        }
        if index > 0 && !header.contains(names::XTENSION) {
            return Err(CutoutError::SourceAccessError(format!(
                "HDU #{} does not start with XTENSION", index)));
        }

        let bitpix = header.required_integer(names::BITPIX)?;
        let axes = header.axis_lengths()?;
        let pcount = header.integer(names::PCOUNT).unwrap_or(0).max(0) as usize;
        let gcount = header.integer(names::GCOUNT).unwrap_or(1).max(1) as usize;

        let element_count: usize = axes.iter().product();
        let data_bytes = if axes.is_empty() || axes.contains(&0) {
            0
        } else {
            (bitpix.unsigned_abs() as usize / 8) * gcount * (pcount + element_count)
        };

        let (data, payload) = if data_bytes == 0 {
            (None, None)
        } else {
            let blocks = data_bytes.div_ceil(layout::BLOCK_SIZE);
            let end = *pos + blocks * layout::BLOCK_SIZE;
            if end > buffer.len() {
                return Err(CutoutError::SourceAccessError(format!(
                    "HDU #{} data unit is truncated ({} of {} bytes present)",
                    index, buffer.len() - *pos, blocks * layout::BLOCK_SIZE)));
            }
            let bytes = buffer[*pos..*pos + data_bytes].to_vec();
            *pos = end;

            if pcount == 0 && gcount == 1 {
                // Regular array: storage order is header order reversed
                let mut shape = axes.clone();
                shape.reverse();
                (Some(DataArray::new(bitpix, shape, bytes)?), None)
            } else {
                // Random groups or heap-carrying extension, kept opaque
                debug!("HDU #{} kept opaque (PCOUNT={}, GCOUNT={})", index, pcount, gcount);
                (None, Some(bytes))
            }
        };

        debug!("Read HDU #{}: BITPIX {}, axes {:?}, {} data byte(s)",
               index, bitpix, axes, data_bytes);
        Ok(Extension { header, data, payload, source_index: index })
    }

    /// Reads header blocks until the END card, advancing `pos`
    fn read_header(&self, buffer: &[u8], pos: &mut usize, index: usize) -> CutoutResult<Header> {
        let mut header = Header::new();
        loop {
            if *pos + layout::BLOCK_SIZE > buffer.len() {
                return Err(CutoutError::SourceAccessError(format!(
                    "HDU #{} header is truncated", index)));
            }
            let block = &buffer[*pos..*pos + layout::BLOCK_SIZE];
            *pos += layout::BLOCK_SIZE;

            for card_index in 0..layout::CARDS_PER_BLOCK {
                let raw = &block[card_index * layout::CARD_SIZE..(card_index + 1) * layout::CARD_SIZE];
                let keyword: String = raw[..8]
                    .iter()
                    .map(|&b| b as char)
                    .collect::<String>()
                    .trim_end()
                    .to_string();
                if keyword == names::END {
                    return Ok(header);
                }
                match Card::from_bytes(raw) {
                    Ok(card) => {
                        // Blank padding cards before END carry nothing worth keeping
                        if !card.keyword.is_empty() || card.comment.is_some() {
                            header.push(card);
                        }
                    }
                    Err(e) => {
                        warn!("HDU #{}: skipping unreadable card ({})", index, e);
                        let text: String = raw.iter().map(|&b| b as char).collect();
                        header.push(Card::commentary(names::COMMENT, text.trim_end()));
                    }
                }
            }
        }
    }
}

/// Whether the remaining bytes are nothing but block padding
fn is_block_padding(rest: &[u8]) -> bool {
    rest.len() < layout::BLOCK_SIZE || rest.iter().all(|&b| b == 0 || b == b' ')
}
