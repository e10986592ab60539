use crate::coordinate::wcs::{CoordinateReference, PixelConverter};
use crate::fits::errors::CutoutResult;
use crate::fits::header::{Card, Header, Value};
use crate::utils::logger::Logger;

/// Logger writing into the system temp directory
pub fn test_logger(name: &str) -> Logger {
    let path = std::env::temp_dir().join(name);
    Logger::new(path.to_str().unwrap()).unwrap()
}

/// A model header built from keyword/value pairs
pub fn model_header(values: &[(&str, Value)]) -> Header {
    let mut header = Header::new();
    for (keyword, value) in values {
        header.push(Card::new(keyword, value.clone()));
    }
    header
}

/// A reference for an RA/DEC/FREQ/STOKES cube
///
/// The field center sits at pixel (50.5, 50.5) with millidegree pixels,
/// the frequency axis starts at 1.4 GHz in 1 MHz steps and the Stokes
/// axis runs I through V.
pub fn cube_reference() -> CoordinateReference {
    CoordinateReference {
        naxis: 4,
        crpix: vec![50.5, 50.5, 1.0, 1.0],
        crval: vec![150.0, 2.0, 1.4e9, 1.0],
        cdelt: vec![-0.001, 0.001, 1e6, 1.0],
        ctype: vec![
            "RA---TAN".to_string(),
            "DEC--TAN".to_string(),
            "FREQ".to_string(),
            "STOKES".to_string(),
        ],
        cunit: vec!["deg".to_string(), "deg".to_string(), "Hz".to_string(), String::new()],
        matrix: None,
        sip: None,
        rest_frequency: Some(1.420405751768e9),
        time_reference: 0.0,
        axis_lengths: vec![100, 100, 50, 4],
    }
}

/// A reference for a lone dispersion axis
pub fn axis_reference(ctype: &str, cunit: &str, crpix: f64, crval: f64,
                      cdelt: f64, length: usize) -> CoordinateReference {
    CoordinateReference {
        naxis: 1,
        crpix: vec![crpix],
        crval: vec![crval],
        cdelt: vec![cdelt],
        ctype: vec![ctype.to_string()],
        cunit: vec![cunit.to_string()],
        matrix: None,
        sip: None,
        rest_frequency: None,
        time_reference: 0.0,
        axis_lengths: vec![length],
    }
}

/// A sky transform stub for requests that never touch the spatial axes
pub struct FixedConverter;

impl PixelConverter for FixedConverter {
    fn world_to_pixel(&self, _ra: f64, _dec: f64) -> CutoutResult<(f64, f64)> {
        Ok((0.0, 0.0))
    }

    fn pixel_to_world(&self, _x: f64, _y: f64) -> CutoutResult<(f64, f64)> {
        Ok((0.0, 0.0))
    }
}
