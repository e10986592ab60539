//! Parser for bracketed pixel cutout strings
//!
//! The surface syntax is a run of bracket groups. A group holds either an
//! extension token (`0`, `SCI`, `SCI,2`, `*`) or a range list
//! (`100:200,50,3:4`). An extension group followed by a range group binds
//! them together; a range group on its own targets the primary; an
//! extension group on its own selects the whole extension. Several pairs
//! may appear in one string and each becomes its own region spec.
//!
//! Ranges are 1-based and inclusive. A bare integer `n` is the degenerate
//! range `n:n`, `*` leaves the axis unconstrained, and a half-open form
//! like `5:` or `:5` is rejected outright.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::fits::errors::{CutoutError, CutoutResult};
use crate::extractor::region::{AxisRange, ExtensionRef, RegionSpec};

lazy_static! {
    static ref GROUP_RE: Regex = Regex::new(r"\[([^\[\]]*)\]").unwrap();
    static ref CLOSED_RANGE_RE: Regex = Regex::new(r"^(\d+):(\d+)$").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"^\d+$").unwrap();
}

/// What a single bracket group turned out to hold
enum Group {
    Extension(ExtensionRef),
    Ranges(Vec<AxisRange>),
}

/// Parses a pixel cutout string into region specs
///
/// # Arguments
/// * `text` - The bracketed cutout string, e.g. `"[1][100:200,3]"`
///
/// # Returns
/// The region specs in the order their groups appeared
pub fn parse(text: &str) -> CutoutResult<Vec<RegionSpec>> {
    let mut groups = Vec::new();
    let mut consumed = 0;
    for capture in GROUP_RE.captures_iter(text) {
        let whole = capture.get(0).ok_or_else(|| {
            CutoutError::GenericError("bracket group without a match".to_string())
        })?;
        let gap = &text[consumed..whole.start()];
        if !gap.trim().is_empty() {
            return Err(CutoutError::ParseError(format!(
                "unexpected text '{}' between bracket groups in {:?}", gap.trim(), text)));
        }
        consumed = whole.end();
        groups.push(capture[1].trim().to_string());
    }
    if groups.is_empty() {
        return Err(CutoutError::ParseError(format!(
            "no bracket-delimited group in {:?}", text)));
    }
    let tail = &text[consumed..];
    if !tail.trim().is_empty() {
        return Err(CutoutError::ParseError(format!(
            "unexpected trailing text '{}' in {:?}", tail.trim(), text)));
    }

    let mut specs = Vec::new();
    let mut pending: Option<ExtensionRef> = None;
    for group in &groups {
        match classify_group(group, pending.is_some())? {
            Group::Extension(next) => {
                // A dangling extension selects the whole extension
                if let Some(ext) = pending.take() {
                    specs.push(RegionSpec::whole_extension(ext));
                }
                pending = Some(next);
            }
            Group::Ranges(ranges) => {
                let ext = pending.take().unwrap_or(ExtensionRef::Index(0));
                specs.push(RegionSpec::new(ext, ranges));
            }
        }
    }
    if let Some(ext) = pending.take() {
        specs.push(RegionSpec::whole_extension(ext));
    }

    debug!("Parsed {:?} into {} region spec(s)", text, specs.len());
    Ok(specs)
}

/// Decides whether one bracket group is an extension token or a range list
///
/// A group with a colon or a star range is always a range list. A bare
/// integer names an extension when nothing is pending, and a degenerate
/// range when an extension is already waiting for its ranges. A
/// comma-separated group is a range list when it leads with a number and a
/// `name,version` pair otherwise.
fn classify_group(group: &str, extension_pending: bool) -> CutoutResult<Group> {
    if group.is_empty() {
        return Err(CutoutError::ParseError("empty bracket group".to_string()));
    }
    if group == "*" {
        // A leading star fans out over the data extensions; after an
        // extension token it is a whole-axis range instead
        if extension_pending {
            return Ok(Group::Ranges(vec![AxisRange::whole()]));
        }
        return Ok(Group::Extension(ExtensionRef::AllData));
    }
    if group.contains(':') || group.contains('*') {
        return Ok(Group::Ranges(parse_range_list(group)?));
    }
    if INTEGER_RE.is_match(group) {
        if extension_pending {
            return Ok(Group::Ranges(parse_range_list(group)?));
        }
        let index = group.parse::<usize>().map_err(|_| {
            CutoutError::ParseError(format!("extension index '{}' out of range", group))
        })?;
        return Ok(Group::Extension(ExtensionRef::Index(index)));
    }

    let parts: Vec<&str> = group.split(',').map(str::trim).collect();
    if INTEGER_RE.is_match(parts[0]) {
        return Ok(Group::Ranges(parse_range_list(group)?));
    }
    match parts.as_slice() {
        [name] => Ok(Group::Extension(ExtensionRef::Name(name.to_string(), None))),
        [name, version] => {
            let version = version.parse::<i64>().map_err(|_| {
                CutoutError::ParseError(format!(
                    "extension version '{}' is not an integer in '{}'", version, group))
            })?;
            Ok(Group::Extension(ExtensionRef::Name(name.to_string(), Some(version))))
        }
        _ => Err(CutoutError::ParseError(format!(
            "extension token '{}' has too many parts", group))),
    }
}

/// Parses a comma-separated range list
fn parse_range_list(group: &str) -> CutoutResult<Vec<AxisRange>> {
    group.split(',').map(|part| parse_range(part.trim())).collect()
}

/// Parses one range token
fn parse_range(token: &str) -> CutoutResult<AxisRange> {
    if token == "*" {
        return Ok(AxisRange::whole());
    }
    if let Some(caps) = CLOSED_RANGE_RE.captures(token) {
        let start = parse_bound(&caps[1], token)?;
        let end = parse_bound(&caps[2], token)?;
        return AxisRange::new(start, end);
    }
    if INTEGER_RE.is_match(token) {
        return AxisRange::single(parse_bound(token, token)?);
    }
    // Half-open forms like "5:" and ":5" land here as well
    Err(CutoutError::ParseError(format!("incomplete or malformed range '{}'", token)))
}

fn parse_bound(digits: &str, token: &str) -> CutoutResult<i64> {
    digits.parse::<i64>().map_err(|_| {
        CutoutError::ParseError(format!("range bound '{}' overflows in '{}'", digits, token))
    })
}
