//! World-coordinate shape model and parser
//!
//! This module defines the typed shapes a world-coordinate cutout request
//! can carry and the parser turning keyword tokens (`CIRCLE 12 34 0.5`,
//! `BAND 5e-7 8e-7`, ...) into them. Keywords are case-insensitive.
//! Tokens that do not start with a known keyword pass through untouched so
//! an outer resolver can pick them up; only malformed arguments to a
//! recognized keyword are an error here.

use std::fmt;
use log::debug;

use crate::fits::errors::{CutoutError, CutoutResult};

/// Polarization states a Stokes axis can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum PolarizationState {
    I,
    Q,
    U,
    V,
    POLI,
    POLA,
    RR,
    LL,
    RL,
    LR,
    XX,
    YY,
    XY,
    YX,
}

impl PolarizationState {
    /// Axis code for this state (Stokes convention, POLI/POLA local codes)
    pub fn code(&self) -> i32 {
        match self {
            PolarizationState::I => 1,
            PolarizationState::Q => 2,
            PolarizationState::U => 3,
            PolarizationState::V => 4,
            PolarizationState::POLI => 5,
            PolarizationState::POLA => 6,
            PolarizationState::RR => -1,
            PolarizationState::LL => -2,
            PolarizationState::RL => -3,
            PolarizationState::LR => -4,
            PolarizationState::XX => -5,
            PolarizationState::YY => -6,
            PolarizationState::XY => -7,
            PolarizationState::YX => -8,
        }
    }

    /// Parses a state name, case-insensitive
    pub fn parse(name: &str) -> CutoutResult<Self> {
        match name.to_uppercase().as_str() {
            "I" => Ok(PolarizationState::I),
            "Q" => Ok(PolarizationState::Q),
            "U" => Ok(PolarizationState::U),
            "V" => Ok(PolarizationState::V),
            "POLI" => Ok(PolarizationState::POLI),
            "POLA" => Ok(PolarizationState::POLA),
            "RR" => Ok(PolarizationState::RR),
            "LL" => Ok(PolarizationState::LL),
            "RL" => Ok(PolarizationState::RL),
            "LR" => Ok(PolarizationState::LR),
            "XX" => Ok(PolarizationState::XX),
            "YY" => Ok(PolarizationState::YY),
            "XY" => Ok(PolarizationState::XY),
            "YX" => Ok(PolarizationState::YX),
            _ => Err(CutoutError::ValidationError(format!(
                "unknown polarization state '{}'", name))),
        }
    }
}

impl fmt::Display for PolarizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A world-coordinate region shape
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Sky circle, degrees
    Circle { ra: f64, dec: f64, radius: f64 },
    /// Sky polygon, counter-clockwise vertices in degrees
    Polygon { vertices: Vec<(f64, f64)> },
    /// Axis-aligned sky rectangle, degrees
    SkyRange { ra: (f64, f64), dec: (f64, f64) },
    /// Spectral interval, meters
    Band { lower: f64, upper: f64 },
    /// Time interval, MJD
    Time { lower: f64, upper: f64 },
    /// Polarization state list, at least one state
    Polarization { states: Vec<PolarizationState> },
}

impl Shape {
    /// Creates a circle after validating its parameters
    pub fn circle(ra: f64, dec: f64, radius: f64) -> CutoutResult<Self> {
        if !(-90.0..=90.0).contains(&dec) {
            return Err(CutoutError::ValidationError(format!(
                "circle declination {} outside [-90, 90]", dec)));
        }
        if radius <= 0.0 || !radius.is_finite() {
            return Err(CutoutError::ValidationError(format!(
                "circle radius {} must be positive", radius)));
        }
        Ok(Shape::Circle { ra, dec, radius })
    }

    /// Creates a polygon after validating vertex count
    pub fn polygon(vertices: Vec<(f64, f64)>) -> CutoutResult<Self> {
        if vertices.len() < 3 {
            return Err(CutoutError::ValidationError(format!(
                "polygon needs at least 3 vertices, got {}", vertices.len())));
        }
        Ok(Shape::Polygon { vertices })
    }

    /// Creates a sky rectangle
    pub fn sky_range(ra1: f64, ra2: f64, dec1: f64, dec2: f64) -> CutoutResult<Self> {
        let ra = (ra1.min(ra2), ra1.max(ra2));
        let dec = (dec1.min(dec2), dec1.max(dec2));
        if !(-90.0..=90.0).contains(&dec.0) || !(-90.0..=90.0).contains(&dec.1) {
            return Err(CutoutError::ValidationError(format!(
                "range declination bounds {:?} outside [-90, 90]", dec)));
        }
        Ok(Shape::SkyRange { ra, dec })
    }

    /// Creates a spectral interval
    pub fn band(lower: f64, upper: f64) -> CutoutResult<Self> {
        if !(lower.is_finite() && upper.is_finite()) || lower <= 0.0 {
            return Err(CutoutError::ValidationError(format!(
                "band bounds ({}, {}) must be positive and finite", lower, upper)));
        }
        if upper < lower {
            return Err(CutoutError::ValidationError(format!(
                "band interval ({}, {}) runs backwards", lower, upper)));
        }
        Ok(Shape::Band { lower, upper })
    }

    /// Creates a time interval
    pub fn time(lower: f64, upper: f64) -> CutoutResult<Self> {
        if upper < lower {
            return Err(CutoutError::ValidationError(format!(
                "time interval ({}, {}) runs backwards", lower, upper)));
        }
        Ok(Shape::Time { lower, upper })
    }

    /// Creates a polarization state list
    pub fn polarization(states: Vec<PolarizationState>) -> CutoutResult<Self> {
        if states.is_empty() {
            return Err(CutoutError::ValidationError(
                "polarization shape needs at least one state".to_string()));
        }
        Ok(Shape::Polarization { states })
    }
}

/// Parses world-coordinate tokens into shapes
///
/// # Arguments
/// * `tokens` - One token per requested shape
///
/// # Returns
/// The recognized shapes in order, plus the tokens passed through
/// untouched because their leading keyword is not one of ours
pub fn world_to_shapes(tokens: &[String]) -> CutoutResult<(Vec<Shape>, Vec<String>)> {
    let mut shapes = Vec::new();
    let mut passthrough = Vec::new();
    for token in tokens {
        match parse_token(token)? {
            Some(shape) => shapes.push(shape),
            None => {
                debug!("Passing through unrecognized token {:?}", token);
                passthrough.push(token.clone());
            }
        }
    }
    Ok((shapes, passthrough))
}

/// Parses one token, returning None when its keyword is not recognized
fn parse_token(token: &str) -> CutoutResult<Option<Shape>> {
    let mut parts = token.split_whitespace();
    let keyword = match parts.next() {
        Some(word) => word.to_uppercase(),
        None => return Err(CutoutError::ParseError("empty region token".to_string())),
    };
    let args: Vec<&str> = parts.collect();

    let shape = match keyword.as_str() {
        "CIRCLE" => {
            let values = numeric_args(&keyword, &args, 3)?;
            Shape::circle(values[0], values[1], values[2])?
        }
        "POLYGON" => {
            let values = numeric_args_at_least(&keyword, &args, 6)?;
            if values.len() % 2 != 0 {
                return Err(CutoutError::ParseError(format!(
                    "POLYGON needs ra/dec pairs, got {} values", values.len())));
            }
            let vertices = values.chunks(2).map(|pair| (pair[0], pair[1])).collect();
            Shape::polygon(vertices)?
        }
        "RANGE" => {
            let values = numeric_args(&keyword, &args, 4)?;
            Shape::sky_range(values[0], values[1], values[2], values[3])?
        }
        "BAND" | "ENERGY" => {
            let values = numeric_args(&keyword, &args, 2)?;
            Shape::band(values[0], values[1])?
        }
        "TIME" => {
            let values = numeric_args(&keyword, &args, 2)?;
            Shape::time(values[0], values[1])?
        }
        "POLARIZATION" | "POL" => {
            if args.is_empty() {
                return Err(CutoutError::ParseError(
                    "POLARIZATION needs at least one state".to_string()));
            }
            let states = args
                .iter()
                .map(|name| PolarizationState::parse(name))
                .collect::<CutoutResult<Vec<_>>>()?;
            Shape::polarization(states)?
        }
        _ => return Ok(None),
    };
    Ok(Some(shape))
}

/// Parses exactly `count` numeric arguments for a keyword
fn numeric_args(keyword: &str, args: &[&str], count: usize) -> CutoutResult<Vec<f64>> {
    if args.len() != count {
        return Err(CutoutError::ParseError(format!(
            "{} takes {} arguments, got {}", keyword, count, args.len())));
    }
    parse_numbers(keyword, args)
}

/// Parses at least `minimum` numeric arguments for a keyword
fn numeric_args_at_least(keyword: &str, args: &[&str], minimum: usize) -> CutoutResult<Vec<f64>> {
    if args.len() < minimum {
        return Err(CutoutError::ParseError(format!(
            "{} takes at least {} arguments, got {}", keyword, minimum, args.len())));
    }
    parse_numbers(keyword, args)
}

fn parse_numbers(keyword: &str, args: &[&str]) -> CutoutResult<Vec<f64>> {
    args.iter()
        .map(|arg| {
            arg.parse::<f64>().map_err(|_| {
                CutoutError::ParseError(format!(
                    "{} argument '{}' is not a number", keyword, arg))
            })
        })
        .collect()
}
