//! Core FITS container structures
//!
//! A container is the in-memory form of one FITS file: an ordered list of
//! HDUs, each an `Extension` pairing a header with an optional data array.
//! Index 0 is the primary HDU. Extensions are addressed either by absolute
//! index or by EXTNAME (optionally qualified with EXTVER).

use std::fmt;

use crate::fits::data::DataArray;
use crate::fits::header::Header;
use crate::fits::keywords::names;

/// One header-data unit
#[derive(Debug, Clone)]
pub struct Extension {
    /// Header cards, in file order
    pub header: Header,
    /// Data unit as a regular array, absent for header-only HDUs
    pub data: Option<DataArray>,
    /// Opaque data unit for HDUs the array model does not cover
    /// (random groups, heap-carrying tables); echoed verbatim on write
    pub payload: Option<Vec<u8>>,
    /// Position of this HDU in the source file, 0 for the primary
    pub source_index: usize,
}

impl Extension {
    /// Creates an extension holding a regular array or nothing
    pub fn new(header: Header, data: Option<DataArray>, source_index: usize) -> Self {
        Extension { header, data, payload: None, source_index }
    }

    /// EXTNAME value, trimmed, if present
    pub fn name(&self) -> Option<String> {
        self.header.string(names::EXTNAME)
    }

    /// EXTVER value, defaulting to 1 when EXTNAME is present without it
    pub fn version(&self) -> i64 {
        self.header.integer(names::EXTVER).unwrap_or(1)
    }

    /// Whether this HDU carries a regular data array
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Whether this HDU carries any data unit at all
    pub fn has_content(&self) -> bool {
        self.data.is_some() || self.payload.is_some()
    }

    /// Whether this HDU matches a name and optional version
    ///
    /// Name comparison is case-insensitive, matching common practice for
    /// EXTNAME lookups.
    pub fn matches(&self, name: &str, version: Option<i64>) -> bool {
        let own = match self.name() {
            Some(n) => n,
            None => return false,
        };
        if !own.eq_ignore_ascii_case(name) {
            return false;
        }
        match version {
            Some(v) => self.version() == v,
            None => true,
        }
    }
}

/// Represents a FITS file as an ordered list of HDUs
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// HDUs in file order, the primary first
    pub extensions: Vec<Extension>,
}

impl Container {
    /// Creates an empty container
    pub fn new() -> Self {
        Container { extensions: Vec::new() }
    }

    /// Number of HDUs, the primary included
    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }

    /// The primary HDU, if the container is non-empty
    pub fn primary(&self) -> Option<&Extension> {
        self.extensions.first()
    }

    /// HDU at an absolute index (0 is the primary)
    pub fn by_index(&self, index: usize) -> Option<&Extension> {
        self.extensions.get(index)
    }

    /// First HDU matching a name and optional version
    pub fn by_name(&self, name: &str, version: Option<i64>) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.matches(name, version))
    }

    /// Indexes of every HDU that carries a data array
    pub fn data_extension_indexes(&self) -> Vec<usize> {
        self.extensions
            .iter()
            .enumerate()
            .filter(|(_, ext)| ext.has_data())
            .map(|(i, _)| i)
            .collect()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FITS container:")?;
        writeln!(f, "  Number of HDUs: {}", self.extensions.len())?;
        for (i, ext) in self.extensions.iter().enumerate() {
            let label = match ext.name() {
                Some(name) => format!("{} v{}", name, ext.version()),
                None if i == 0 => "primary".to_string(),
                None => "unnamed".to_string(),
            };
            let shape = match &ext.data {
                Some(data) => format!("{:?} (BITPIX {})", data.header_shape(), data.bitpix),
                None => "no data".to_string(),
            };
            writeln!(f, "  HDU #{}: {}, {}", i, label, shape)?;
        }
        Ok(())
    }
}
