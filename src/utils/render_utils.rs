//! Quicklook rendering utilities
//!
//! Utilities for turning a data array into a grayscale preview image.
//! Samples are decoded from their big-endian storage form, stretched
//! between low and high percentiles and written out as PNG.

use std::cmp::Ordering;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use image::GrayImage;
use log::{debug, info};

use crate::fits::data::DataArray;
use crate::fits::errors::{CutoutError, CutoutResult};

/// Percentiles bounding the grayscale stretch
const STRETCH_LOW: f64 = 0.005;
const STRETCH_HIGH: f64 = 0.995;

/// Renders the leading image plane of an array to a PNG file
///
/// Arrays with more than two dimensions contribute their first plane;
/// one-dimensional arrays render as a single pixel row.
///
/// # Arguments
/// * `data` - The array to render
/// * `output_path` - Where to write the preview, extension forced to .png
///
/// # Returns
/// The path actually written
pub fn render_quicklook(data: &DataArray, output_path: &str) -> CutoutResult<String> {
    let (height, width) = plane_dimensions(&data.shape)?;
    let samples = decode_plane(data, height * width)?;

    let (low, high) = stretch_bounds(&samples);
    debug!("Preview stretch bounds: [{:.4e}, {:.4e}]", low, high);
    let span = if high > low { high - low } else { 1.0 };

    let mut image = GrayImage::new(width as u32, height as u32);
    for y in 0..height {
        for x in 0..width {
            let value = samples[y * width + x];
            let level = if value.is_finite() {
                (((value - low) / span) * 255.0).clamp(0.0, 255.0) as u8
            } else {
                0
            };
            image.put_pixel(x as u32, y as u32, image::Luma([level]));
        }
    }

    let path = ensure_png_extension(output_path);
    image.save(&path).map_err(|e| {
        CutoutError::GenericError(format!("failed to save preview {}: {}", path, e))
    })?;
    info!("Wrote {}x{} preview to {}", width, height, path);
    Ok(path)
}

/// Rows and columns of the leading plane
fn plane_dimensions(shape: &[usize]) -> CutoutResult<(usize, usize)> {
    match shape.len() {
        0 => Err(CutoutError::ValidationError(
            "array has no dimensions to render".to_string())),
        1 => Ok((1, shape[0])),
        n => Ok((shape[n - 2], shape[n - 1])),
    }
}

/// Decodes the first `count` samples from big-endian storage
fn decode_plane(data: &DataArray, count: usize) -> CutoutResult<Vec<f64>> {
    let elem = data.element_size();
    let needed = count * elem;
    if count == 0 || data.bytes.len() < needed {
        return Err(CutoutError::ValidationError(
            "array holds no renderable plane".to_string()));
    }

    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let raw = &data.bytes[i * elem..(i + 1) * elem];
        let value = match data.bitpix {
            8 => raw[0] as f64,
            16 => BigEndian::read_i16(raw) as f64,
            32 => BigEndian::read_i32(raw) as f64,
            64 => BigEndian::read_i64(raw) as f64,
            -32 => BigEndian::read_f32(raw) as f64,
            -64 => BigEndian::read_f64(raw),
            other => return Err(CutoutError::UnsupportedBitpix(other)),
        };
        samples.push(value);
    }
    Ok(samples)
}

/// Percentile bounds over the finite samples
///
/// A plane that is entirely non-finite or constant stretches to a flat
/// gray rather than failing.
fn stretch_bounds(samples: &[f64]) -> (f64, f64) {
    let mut finite: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (0.0, 1.0);
    }
    finite.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let last = finite.len() - 1;
    let low = finite[(last as f64 * STRETCH_LOW).round() as usize];
    let high = finite[(last as f64 * STRETCH_HIGH).round() as usize];
    (low, high)
}

/// Ensure a file path has a PNG extension
///
/// # Arguments
/// * `path` - The original file path
///
/// # Returns
/// A String with a .png extension
pub fn ensure_png_extension(path: &str) -> String {
    let path = Path::new(path);
    if let Some(ext) = path.extension() {
        if ext.to_string_lossy().to_lowercase() == "png" {
            return path.to_string_lossy().to_string();
        }
    }

    // Replace or add .png extension
    let stem = path.file_stem().unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{}.png", stem.to_string_lossy())).to_string_lossy().to_string()
}
