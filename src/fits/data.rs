//! Raw data array structures and methods
//!
//! This module implements the in-memory model of an HDU data unit: the raw
//! big-endian sample bytes plus the shape needed to interpret them. Shapes
//! are kept in storage order, outermost axis first, so the last shape entry
//! is the axis whose samples are contiguous on disk (axis 1 in header
//! terms). Header axis lists run the other way round and are reversed at
//! the boundary.

use log::debug;

use crate::fits::errors::{CutoutError, CutoutResult};

/// The BITPIX values the format defines
const VALID_BITPIX: [i64; 6] = [8, 16, 32, 64, -32, -64];

/// Represents the data unit of one HDU
///
/// Samples are stored exactly as on disk: big-endian, tightly packed, in
/// storage order. All index arithmetic in the extraction engine works on
/// this struct.
#[derive(Debug, Clone)]
pub struct DataArray {
    /// BITPIX value describing the sample type
    pub bitpix: i64,
    /// Axis lengths in storage order (outermost first)
    pub shape: Vec<usize>,
    /// Raw big-endian sample bytes
    pub bytes: Vec<u8>,
}

impl DataArray {
    /// Creates a data array after validating shape and buffer agreement
    ///
    /// # Arguments
    /// * `bitpix` - BITPIX value, one of 8, 16, 32, 64, -32, -64
    /// * `shape` - Axis lengths in storage order
    /// * `bytes` - Raw sample bytes, exactly `element_count * sample size`
    ///
    /// # Returns
    /// The data array, or an error when bitpix or sizes disagree
    pub fn new(bitpix: i64, shape: Vec<usize>, bytes: Vec<u8>) -> CutoutResult<Self> {
        if !VALID_BITPIX.contains(&bitpix) {
            return Err(CutoutError::UnsupportedBitpix(bitpix));
        }
        let expected = shape.iter().product::<usize>() * (bitpix.unsigned_abs() as usize / 8);
        if bytes.len() != expected {
            return Err(CutoutError::SourceAccessError(format!(
                "data unit holds {} bytes, shape {:?} with BITPIX {} needs {}",
                bytes.len(), shape, bitpix, expected)));
        }
        Ok(DataArray { bitpix, shape, bytes })
    }

    /// Bytes per sample for this array's BITPIX
    pub fn element_size(&self) -> usize {
        self.bitpix.unsigned_abs() as usize / 8
    }

    /// Number of samples in the array
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Axis lengths in header order (axis 1 first)
    pub fn header_shape(&self) -> Vec<usize> {
        let mut shape = self.shape.clone();
        shape.reverse();
        shape
    }

    /// Drops every length-1 axis, keeping at least one axis
    ///
    /// A source cube stored as (1, M, N) collapses to (M, N) before
    /// extraction so requested ranges line up with the axes that carry
    /// actual extent. The byte buffer is untouched.
    pub fn squeeze(&mut self) {
        if self.shape.iter().all(|&len| len == 1) {
            // Fully degenerate array keeps a single axis
            self.shape = vec![1];
            return;
        }
        let before = self.shape.len();
        self.shape.retain(|&len| len != 1);
        if self.shape.len() != before {
            debug!("Squeezed {} degenerate axis(es), shape now {:?}",
                   before - self.shape.len(), self.shape);
        }
    }

    /// Byte strides per axis in storage order
    ///
    /// The last axis has the sample stride; each earlier axis strides over
    /// the full extent of everything after it.
    pub fn byte_strides(&self) -> Vec<usize> {
        let mut strides = vec![0; self.shape.len()];
        let mut stride = self.element_size();
        for axis in (0..self.shape.len()).rev() {
            strides[axis] = stride;
            stride *= self.shape[axis];
        }
        strides
    }

    /// Byte offset of the sample at the given storage-order index
    ///
    /// # Arguments
    /// * `index` - One 0-based position per axis, storage order
    pub fn byte_offset(&self, index: &[usize]) -> CutoutResult<usize> {
        if index.len() != self.shape.len() {
            return Err(CutoutError::GenericError(format!(
                "index rank {} does not match array rank {}",
                index.len(), self.shape.len())));
        }
        let strides = self.byte_strides();
        let mut offset = 0;
        for (axis, (&i, &len)) in index.iter().zip(&self.shape).enumerate() {
            if i >= len {
                return Err(CutoutError::GenericError(format!(
                    "index {} out of bounds for axis {} with length {}", i, axis, len)));
            }
            offset += i * strides[axis];
        }
        Ok(offset)
    }
}
