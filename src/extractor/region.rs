//! Region structures for defining cutout extents
//!
//! This module defines the per-axis range, extension reference and region
//! spec types that describe what a cutout request asks for. Ranges use the
//! file convention: 1-based, both bounds inclusive, listed in header axis
//! order (axis 1 first). Open bounds mean "to the edge of the data".

use std::fmt;

use crate::fits::errors::{CutoutError, CutoutResult};

/// A range along one axis (1-based, inclusive)
///
/// Either bound may be open. A fully open range means the whole axis, and
/// a degenerate range with equal bounds selects a single pixel plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    /// Lower bound, 1-based inclusive; None means from the first pixel
    pub start: Option<i64>,
    /// Upper bound, 1-based inclusive; None means to the last pixel
    pub end: Option<i64>,
}

impl AxisRange {
    /// Creates a closed range after validating the bounds
    ///
    /// # Arguments
    /// * `start` - Lower bound, must be at least 1
    /// * `end` - Upper bound, must not be below `start`
    pub fn new(start: i64, end: i64) -> CutoutResult<Self> {
        if start < 1 {
            return Err(CutoutError::ValidationError(format!(
                "range start {} is below 1", start)));
        }
        if end < start {
            return Err(CutoutError::ValidationError(format!(
                "range {}:{} runs backwards", start, end)));
        }
        Ok(AxisRange { start: Some(start), end: Some(end) })
    }

    /// Creates the fully open range covering a whole axis
    pub fn whole() -> Self {
        AxisRange { start: None, end: None }
    }

    /// Creates a degenerate single-pixel range
    pub fn single(pixel: i64) -> CutoutResult<Self> {
        Self::new(pixel, pixel)
    }

    /// Whether both bounds are open
    pub fn is_whole(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Closes the range against an axis of the given length
    ///
    /// # Returns
    /// The concrete (start, end) pair, still 1-based inclusive
    pub fn resolve(&self, axis_length: usize) -> (i64, i64) {
        let start = self.start.unwrap_or(1);
        let end = self.end.unwrap_or(axis_length as i64);
        (start, end)
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "*"),
            (Some(s), None) => write!(f, "{}:", s),
            (None, Some(e)) => write!(f, ":{}", e),
            (Some(s), Some(e)) if s == e => write!(f, "{}", s),
            (Some(s), Some(e)) => write!(f, "{}:{}", s, e),
        }
    }
}

/// Reference to one HDU in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionRef {
    /// Absolute position, 0 is the primary
    Index(usize),
    /// EXTNAME, optionally qualified with EXTVER
    Name(String, Option<i64>),
    /// Every HDU that carries a data array
    AllData,
}

impl fmt::Display for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionRef::Index(i) => write!(f, "{}", i),
            ExtensionRef::Name(name, None) => write!(f, "{}", name),
            ExtensionRef::Name(name, Some(ver)) => write!(f, "{},{}", name, ver),
            ExtensionRef::AllData => write!(f, "*"),
        }
    }
}

/// A pixel-space cutout request against one extension
///
/// Ranges are listed in header axis order. An empty range list asks for
/// the extension as it stands, data and all.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSpec {
    /// Which extension to cut
    pub extension: ExtensionRef,
    /// Per-axis ranges, axis 1 first; empty means the whole extension
    pub ranges: Vec<AxisRange>,
}

impl RegionSpec {
    /// Creates a region spec
    pub fn new(extension: ExtensionRef, ranges: Vec<AxisRange>) -> Self {
        RegionSpec { extension, ranges }
    }

    /// Creates a spec selecting a whole extension
    pub fn whole_extension(extension: ExtensionRef) -> Self {
        RegionSpec { extension, ranges: Vec::new() }
    }

    /// Whether every listed range is fully open
    pub fn covers_everything(&self) -> bool {
        self.ranges.iter().all(AxisRange::is_whole)
    }
}

impl fmt::Display for RegionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.extension)?;
        if !self.ranges.is_empty() {
            let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
            write!(f, "[{}]", parts.join(","))?;
        }
        Ok(())
    }
}
