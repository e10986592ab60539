//! FITS keyword constants, classifiers and the keyword dictionary
//!
//! This module defines the keyword names used throughout the cutout code,
//! the classifier functions that drive header sanitization, and a TOML-backed
//! dictionary of keyword descriptions and polarization codes loaded at
//! startup.

use std::collections::HashMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::fits::errors::{CutoutError, CutoutResult};

/// Physical layout constants for the container format
pub mod layout {
    /// Size of one header or data block in bytes
    pub const BLOCK_SIZE: usize = 2880;

    /// Size of one header card image in bytes
    pub const CARD_SIZE: usize = 80;

    /// Cards per header block
    pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

    /// Gzip magic bytes, for transparent decompression
    pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
}

/// Keyword name constants
pub mod names {
    pub const SIMPLE: &str = "SIMPLE";
    pub const XTENSION: &str = "XTENSION";
    pub const BITPIX: &str = "BITPIX";
    pub const NAXIS: &str = "NAXIS";
    pub const PCOUNT: &str = "PCOUNT";
    pub const GCOUNT: &str = "GCOUNT";
    pub const EXTEND: &str = "EXTEND";
    pub const EXTNAME: &str = "EXTNAME";
    pub const EXTVER: &str = "EXTVER";
    pub const END: &str = "END";
    pub const COMMENT: &str = "COMMENT";
    pub const HISTORY: &str = "HISTORY";
    pub const CHECKSUM: &str = "CHECKSUM";
    pub const DATASUM: &str = "DATASUM";
    pub const WCSAXES: &str = "WCSAXES";
    pub const CRPIX: &str = "CRPIX";
    pub const CRVAL: &str = "CRVAL";
    pub const CDELT: &str = "CDELT";
    pub const CTYPE: &str = "CTYPE";
    pub const CUNIT: &str = "CUNIT";
    pub const RESTFRQ: &str = "RESTFRQ";
    pub const RESTFREQ: &str = "RESTFREQ";
    pub const MJDREF: &str = "MJDREF";
    pub const MJDREFI: &str = "MJDREFI";
    pub const MJDREFF: &str = "MJDREFF";
    pub const A_ORDER: &str = "A_ORDER";
    pub const B_ORDER: &str = "B_ORDER";
    pub const AP_ORDER: &str = "AP_ORDER";
    pub const BP_ORDER: &str = "BP_ORDER";

    /// Image extension type string
    pub const IMAGE: &str = "IMAGE";

    /// Commentary keywords carry free text and may repeat
    pub fn is_commentary(keyword: &str) -> bool {
        keyword.is_empty() || keyword == COMMENT || keyword == HISTORY
    }
}

lazy_static! {
    static ref MATRIX_RE: Regex =
        Regex::new(r"^(CD|PC)(\d{1,3})_(\d{1,3})$").unwrap();
    static ref INDEXED_RE: Regex =
        Regex::new(r"^(NAXIS|CRPIX|CRVAL|CDELT|CTYPE|CUNIT|CROTA)(\d{1,3})$").unwrap();
    static ref SIP_COEFF_RE: Regex =
        Regex::new(r"^(A|B|AP|BP)_(\d{1,2})_(\d{1,2})$").unwrap();

    /// Keyword dictionary parsed at startup from the bundled TOML file
    pub static ref KEYWORD_DEFINITIONS: KeywordDefinitions = {
        let content = include_str!("../../fits_keywords.toml");
        KeywordDefinitions::from_str(content).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse keyword definitions: {}", e);
            KeywordDefinitions::default()
        })
    };
}

/// Tells apart the linear coordinate matrix keywords (CDi_j / PCi_j)
pub fn is_matrix_keyword(keyword: &str) -> bool {
    MATRIX_RE.is_match(keyword)
}

/// Parses a matrix keyword into its form prefix and (i, j) axis pair
pub fn parse_matrix_keyword(keyword: &str) -> Option<(&'static str, usize, usize)> {
    let caps = MATRIX_RE.captures(keyword)?;
    let form = if &caps[1] == "CD" { "CD" } else { "PC" };
    let i = caps[2].parse().ok()?;
    let j = caps[3].parse().ok()?;
    Some((form, i, j))
}

/// Parses an indexed axis keyword like NAXIS3 or CRPIX1 into (family, axis)
pub fn parse_indexed_keyword(keyword: &str) -> Option<(String, usize)> {
    let caps = INDEXED_RE.captures(keyword)?;
    let axis = caps[2].parse().ok()?;
    Some((caps[1].to_string(), axis))
}

/// Parses a SIP coefficient keyword like A_2_0 into (family, p, q)
pub fn parse_sip_keyword(keyword: &str) -> Option<(String, u32, u32)> {
    let caps = SIP_COEFF_RE.captures(keyword)?;
    let p = caps[2].parse().ok()?;
    let q = caps[3].parse().ok()?;
    Some((caps[1].to_string(), p, q))
}

/// Structural keywords are re-derived by the writer and never trusted from
/// a sanitized header
pub fn is_structural(keyword: &str) -> bool {
    if matches!(
        keyword,
        names::SIMPLE | names::XTENSION | names::BITPIX | names::NAXIS
            | names::PCOUNT | names::GCOUNT | names::END
    ) {
        return true;
    }
    matches!(parse_indexed_keyword(keyword), Some((family, _)) if family == names::NAXIS)
}

/// Checksum keywords go stale the moment content changes
pub fn is_checksum(keyword: &str) -> bool {
    keyword == names::CHECKSUM || keyword == names::DATASUM
}

/// Container for keyword descriptions and code tables
#[derive(Debug, Default)]
pub struct KeywordDefinitions {
    /// Maps exact keywords to descriptions
    pub keyword_descriptions: HashMap<String, String>,
    /// Maps indexed keyword families (CRPIX, CTYPE, ...) to descriptions
    pub family_descriptions: HashMap<String, String>,
    /// Maps polarization axis codes to state names
    pub polarization_names: HashMap<i32, String>,
    /// Maps polarization state names to axis codes
    pub polarization_codes: HashMap<String, i32>,
}

impl KeywordDefinitions {
    /// Parse keyword definitions from a TOML string
    pub fn from_str(content: &str) -> CutoutResult<Self> {
        let toml_value: toml::Value = match content.parse() {
            Ok(value) => value,
            Err(e) => return Err(CutoutError::GenericError(format!("Failed to parse TOML: {}", e))),
        };

        let mut defs = KeywordDefinitions::default();

        if let Some(table) = toml_value.get("keywords").and_then(|v| v.as_table()) {
            for (k, v) in table {
                if let Some(text) = v.as_str() {
                    defs.keyword_descriptions.insert(k.to_uppercase(), text.to_string());
                }
            }
        }

        if let Some(table) = toml_value.get("keyword_families").and_then(|v| v.as_table()) {
            for (k, v) in table {
                if let Some(text) = v.as_str() {
                    defs.family_descriptions.insert(k.to_uppercase(), text.to_string());
                }
            }
        }

        if let Some(table) = toml_value.get("polarization_codes").and_then(|v| v.as_table()) {
            for (k, v) in table {
                if let (Ok(code), Some(name)) = (k.parse::<i32>(), v.as_str()) {
                    defs.polarization_names.insert(code, name.to_string());
                    defs.polarization_codes.insert(name.to_string(), code);
                }
            }
        }

        Ok(defs)
    }

    /// Description for a keyword, falling back to its indexed family
    pub fn describe(&self, keyword: &str) -> Option<&str> {
        if let Some(text) = self.keyword_descriptions.get(keyword) {
            return Some(text);
        }
        if let Some((family, _)) = parse_indexed_keyword(keyword) {
            return self.family_descriptions.get(&family).map(String::as_str);
        }
        if let Some((form, _, _)) = parse_matrix_keyword(keyword) {
            return self.family_descriptions.get(form).map(String::as_str);
        }
        if let Some((family, _, _)) = parse_sip_keyword(keyword) {
            return self.family_descriptions.get(&family).map(String::as_str);
        }
        None
    }

    /// Polarization code for a state name, if the table knows it
    pub fn polarization_code(&self, state: &str) -> Option<i32> {
        self.polarization_codes.get(state).copied()
    }
}
