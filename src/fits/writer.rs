//! FITS writing strategies
//!
//! This module handles serializing a container back to disk. Writing a
//! valid file requires careful block management: headers are padded with
//! spaces and data units with zeros to 2880-byte boundaries, and the
//! structural keywords (SIMPLE/XTENSION, BITPIX, NAXIS and friends) are
//! re-derived from the model rather than trusted from carried-over cards,
//! so a cut HDU always declares the shape it actually holds.

use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::extension::{Container, Extension};
use crate::fits::header::{Card, Value};
use crate::fits::keywords::{self, layout, names};

/// Handles writing FITS containers to disk
pub struct ContainerWriter;

impl ContainerWriter {
    /// Write a complete FITS file to disk
    ///
    /// This is the main entry point for file creation. HDUs are written in
    /// container order, the first as the primary.
    pub fn write(container: &Container, output_path: &str) -> CutoutResult<()> {
        info!("Writing FITS container to {}", output_path);

        let file = File::create(output_path).map_err(CutoutError::from)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);
        Self::write_to(container, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize a container into a byte buffer
    pub fn serialize(container: &Container) -> CutoutResult<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_to(container, &mut buffer)?;
        Ok(buffer)
    }

    /// Write every HDU of the container to the given sink
    pub fn write_to<W: Write>(container: &Container, writer: &mut W) -> CutoutResult<()> {
        if container.extensions.is_empty() {
            return Err(CutoutError::GenericError(
                "refusing to write a container with no HDUs".to_string()));
        }
        let total = container.extension_count();
        for (position, extension) in container.extensions.iter().enumerate() {
            Self::write_extension(extension, position, total, writer)?;
        }
        Ok(())
    }

    /// Write one HDU: header blocks, then data blocks
    fn write_extension<W: Write>(
        extension: &Extension,
        position: usize,
        total: usize,
        writer: &mut W,
    ) -> CutoutResult<()> {
        let cards = Self::physical_cards(extension, position, total)?;
        debug!("Writing HDU #{} with {} card(s)", position, cards.len());

        let mut header_bytes = Vec::with_capacity((cards.len() + 1) * layout::CARD_SIZE);
        for card in &cards {
            header_bytes.extend_from_slice(&card.to_bytes());
        }
        let mut end_card = [b' '; layout::CARD_SIZE];
        end_card[..3].copy_from_slice(names::END.as_bytes());
        header_bytes.extend_from_slice(&end_card);
        pad_to_block(&mut header_bytes, b' ');
        writer.write_all(&header_bytes)?;

        let data_bytes: Option<&[u8]> = match (&extension.data, &extension.payload) {
            (Some(data), _) => Some(&data.bytes),
            (None, Some(payload)) => Some(payload),
            (None, None) => None,
        };
        if let Some(bytes) = data_bytes {
            let mut block = bytes.to_vec();
            pad_to_block(&mut block, 0);
            writer.write_all(&block)?;
        }
        Ok(())
    }

    /// Build the physical card sequence for one HDU
    ///
    /// The structural lead-in is derived from the HDU's position and
    /// content; the model's own structural cards are dropped so stale
    /// copies cannot disagree with the data actually written. Everything
    /// else follows in model order.
    fn physical_cards(
        extension: &Extension,
        position: usize,
        total: usize,
    ) -> CutoutResult<Vec<Card>> {
        let header = &extension.header;
        let mut cards = Vec::with_capacity(header.len() + 8);

        if position == 0 {
            cards.push(Card::with_comment(names::SIMPLE, Value::Logical(true),
                                          "conforms to FITS standard"));
        } else {
            let xtension = header.string(names::XTENSION)
                .unwrap_or_else(|| names::IMAGE.to_string());
            cards.push(Card::new(names::XTENSION, Value::Str(xtension)));
        }

        let (bitpix, axes) = Self::structural_shape(extension)?;
        cards.push(Card::new(names::BITPIX, Value::Integer(bitpix)));
        cards.push(Card::new(names::NAXIS, Value::Integer(axes.len() as i64)));
        for (i, &len) in axes.iter().enumerate() {
            let key = format!("{}{}", names::NAXIS, i + 1);
            cards.push(Card::new(&key, Value::Integer(len as i64)));
        }

        if position > 0 {
            // Opaque payloads keep their declared PCOUNT/GCOUNT
            let pcount = if extension.payload.is_some() {
                header.integer(names::PCOUNT).unwrap_or(0)
            } else {
                0
            };
            let gcount = if extension.payload.is_some() {
                header.integer(names::GCOUNT).unwrap_or(1)
            } else {
                1
            };
            cards.push(Card::new(names::PCOUNT, Value::Integer(pcount)));
            cards.push(Card::new(names::GCOUNT, Value::Integer(gcount)));
        } else if total > 1 && !header.contains(names::EXTEND) {
            cards.push(Card::with_comment(names::EXTEND, Value::Logical(true),
                                          "extensions may follow"));
        }

        for card in header.cards() {
            if keywords::is_structural(&card.keyword) {
                continue;
            }
            cards.push(card.clone());
        }
        Ok(cards)
    }

    /// BITPIX and header-order axis lengths an HDU should declare
    fn structural_shape(extension: &Extension) -> CutoutResult<(i64, Vec<usize>)> {
        if let Some(data) = &extension.data {
            return Ok((data.bitpix, data.header_shape()));
        }
        if extension.payload.is_some() {
            // The payload was sized from these cards when it was read
            let bitpix = extension.header.required_integer(names::BITPIX)?;
            return Ok((bitpix, extension.header.axis_lengths()?));
        }
        let bitpix = extension.header.integer(names::BITPIX).unwrap_or(8);
        Ok((bitpix, Vec::new()))
    }
}

/// Pads a buffer with the given byte up to the next block boundary
fn pad_to_block(buffer: &mut Vec<u8>, fill: u8) {
    let remainder = buffer.len() % layout::BLOCK_SIZE;
    if remainder != 0 {
        buffer.resize(buffer.len() + layout::BLOCK_SIZE - remainder, fill);
    }
}
