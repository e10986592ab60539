//! Shape resolution against a coordinate reference
//!
//! This module turns world-coordinate shapes into concrete per-axis pixel
//! ranges for one extension. Sky shapes are sampled point by point through
//! a `PixelConverter` and reduced to an integer bounding box; spectral and
//! time intervals invert the axis dispersion relation; polarization states
//! look up their codes on the Stokes axis. Every resolved range is clipped
//! to the declared axis extent, and an empty intersection reports
//! no-content so a multi-extension scan can move on.

use log::{debug, trace};

use crate::coordinate::shapes::{PolarizationState, Shape};
use crate::coordinate::wcs::{CoordinateReference, PixelConverter};
use crate::extractor::region::AxisRange;
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::utils::logger::Logger;

/// Speed of light in m/s
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Planck constant in J s
const PLANCK: f64 = 6.626_070_15e-34;

/// Resolves world shapes into pixel ranges for one extension
pub struct ShapeResolver<'a> {
    /// Logger instance
    logger: &'a Logger,
}

impl<'a> ShapeResolver<'a> {
    /// Creates a new resolver
    pub fn new(logger: &'a Logger) -> Self {
        ShapeResolver { logger }
    }

    /// Resolves a set of shapes into one range per data axis
    ///
    /// Axes no shape constrains default to their full declared extent.
    /// When two shapes constrain the same axis the later one wins.
    ///
    /// # Arguments
    /// * `shapes` - The shapes of one request group
    /// * `reference` - The extension's coordinate reference
    /// * `converter` - Sky transform for the spatial shapes
    ///
    /// # Returns
    /// Closed ranges in header axis order, one per data axis
    pub fn world_to_pixels(
        &self,
        shapes: &[Shape],
        reference: &CoordinateReference,
        converter: &dyn PixelConverter,
    ) -> CutoutResult<Vec<AxisRange>> {
        let ndim = reference.axis_lengths.len();
        if ndim == 0 {
            return Err(CutoutError::NoContent(
                "extension declares no data axes".to_string()));
        }

        let mut ranges = Vec::with_capacity(ndim);
        for &length in &reference.axis_lengths {
            ranges.push(AxisRange::new(1, length.max(1) as i64)?);
        }

        for shape in shapes {
            match shape {
                Shape::Circle { .. } | Shape::Polygon { .. } | Shape::SkyRange { .. } => {
                    let ((lon, lat), (x_range, y_range)) =
                        self.resolve_spatial(shape, reference, converter)?;
                    set_axis(&mut ranges, lon, x_range)?;
                    set_axis(&mut ranges, lat, y_range)?;
                }
                Shape::Band { lower, upper } => {
                    let (axis, range) = self.resolve_band(*lower, *upper, reference)?;
                    set_axis(&mut ranges, axis, range)?;
                }
                Shape::Time { lower, upper } => {
                    let (axis, range) = self.resolve_time(*lower, *upper, reference)?;
                    set_axis(&mut ranges, axis, range)?;
                }
                Shape::Polarization { states } => {
                    let (axis, range) = self.resolve_polarization(states, reference)?;
                    set_axis(&mut ranges, axis, range)?;
                }
            }
        }

        let _ = self.logger.log(&format!(
            "Resolved {} shape(s) to ranges {:?}", shapes.len(),
            ranges.iter().map(|r| r.to_string()).collect::<Vec<_>>()));
        Ok(ranges)
    }

    /// Resolves a sky shape to ranges on the spatial axis pair
    fn resolve_spatial(
        &self,
        shape: &Shape,
        reference: &CoordinateReference,
        converter: &dyn PixelConverter,
    ) -> CutoutResult<((usize, usize), (AxisRange, AxisRange))> {
        let (lon, lat) = reference.spatial_axis_pair().ok_or_else(|| {
            CutoutError::NoContent("header declares no spatial axis pair".to_string())
        })?;
        let nx = declared_length(reference, lon)?;
        let ny = declared_length(reference, lat)?;

        let bbox = match shape {
            Shape::Circle { ra, dec, radius } => {
                self.circle_bbox(*ra, *dec, *radius, converter)?
            }
            Shape::Polygon { vertices } => {
                validate_winding(vertices)?;
                sample_bbox(vertices, converter)?
            }
            Shape::SkyRange { ra, dec } => {
                let corners = vec![
                    (ra.0, dec.0),
                    (ra.1, dec.0),
                    (ra.1, dec.1),
                    (ra.0, dec.1),
                ];
                sample_bbox(&corners, converter)?
            }
            _ => {
                return Err(CutoutError::GenericError(
                    "non-spatial shape in spatial resolution".to_string()))
            }
        };

        let x_range = clip_to_axis(bbox.0, bbox.1, nx, "spatial")?;
        let y_range = clip_to_axis(bbox.2, bbox.3, ny, "spatial")?;
        debug!("Sky shape resolved to x {} y {} on axes ({}, {})",
               x_range, y_range, lon, lat);
        Ok(((lon, lat), (x_range, y_range)))
    }

    /// Bounding box for a circle: center plus an isotropic pixel radius
    ///
    /// The radius in pixels comes from transforming the center and a point
    /// offset by the radius along declination.
    fn circle_bbox(
        &self,
        ra: f64,
        dec: f64,
        radius: f64,
        converter: &dyn PixelConverter,
    ) -> CutoutResult<(f64, f64, f64, f64)> {
        let (cx, cy) = converter.world_to_pixel(ra, dec).map_err(|e| {
            no_content_if_sample(e, "circle center does not project onto the data")
        })?;
        let offset_dec = if dec + radius <= 90.0 { dec + radius } else { dec - radius };
        let (ox, oy) = converter.world_to_pixel(ra, offset_dec).map_err(|e| {
            no_content_if_sample(e, "circle edge does not project onto the data")
        })?;
        let pixel_radius = (ox - cx).hypot(oy - cy);
        trace!("Circle center ({:.2}, {:.2}) pixel radius {:.2}", cx, cy, pixel_radius);
        Ok((cx - pixel_radius, cx + pixel_radius, cy - pixel_radius, cy + pixel_radius))
    }

    /// Maps a spectral interval in meters to a pixel range
    fn resolve_band(
        &self,
        lower: f64,
        upper: f64,
        reference: &CoordinateReference,
    ) -> CutoutResult<(usize, AxisRange)> {
        let axis = reference.spectral_axis().ok_or_else(|| {
            CutoutError::NoContent("header declares no spectral axis".to_string())
        })?;
        let length = declared_length(reference, axis)?;
        let ctype = reference.ctype.get(axis - 1).cloned().unwrap_or_default().to_uppercase();
        let cunit = reference.cunit.get(axis - 1).cloned().unwrap_or_default();
        let base = ctype.split('-').next().unwrap_or("").to_string();

        let to_axis_units = |wavelength_m: f64| -> CutoutResult<f64> {
            spectral_value(&base, &cunit, wavelength_m, reference.rest_frequency)
        };
        let p_lo = dispersion_pixel(reference, axis, &ctype, to_axis_units(lower)?)?;
        let p_hi = dispersion_pixel(reference, axis, &ctype, to_axis_units(upper)?)?;

        let range = clip_to_axis(p_lo.min(p_hi), p_lo.max(p_hi), length, "spectral")?;
        debug!("Band [{:.3e}, {:.3e}] m resolved to {} on axis {}", lower, upper, range, axis);
        Ok((axis, range))
    }

    /// Maps an MJD interval to a pixel range on the time axis
    fn resolve_time(
        &self,
        lower: f64,
        upper: f64,
        reference: &CoordinateReference,
    ) -> CutoutResult<(usize, AxisRange)> {
        let axis = reference.time_axis().ok_or_else(|| {
            CutoutError::NoContent("header declares no time axis".to_string())
        })?;
        let length = declared_length(reference, axis)?;
        let increment = reference.axis_increment(axis);
        if increment == 0.0 {
            return Err(CutoutError::ValidationError(
                "time axis increment is zero".to_string()));
        }
        let crpix = reference.crpix.get(axis - 1).copied().unwrap_or(0.0);
        let crval = reference.crval.get(axis - 1).copied().unwrap_or(0.0);
        let cunit = reference.cunit.get(axis - 1).cloned().unwrap_or_default();
        // Axis values count in days unless the unit says seconds
        let scale_days = match cunit.trim() {
            "s" | "sec" => 1.0 / 86400.0,
            _ => 1.0,
        };

        let pixel = |mjd: f64| crpix + ((mjd - reference.time_reference) / scale_days - crval) / increment;
        let p_lo = pixel(lower);
        let p_hi = pixel(upper);
        let range = clip_to_axis(p_lo.min(p_hi), p_lo.max(p_hi), length, "time")?;
        debug!("Time [{}, {}] MJD resolved to {} on axis {}", lower, upper, range, axis);
        Ok((axis, range))
    }

    /// Maps polarization states to the covering pixel range on the Stokes
    /// axis
    ///
    /// States absent from the axis are ignored; only an empty match is an
    /// error.
    fn resolve_polarization(
        &self,
        states: &[PolarizationState],
        reference: &CoordinateReference,
    ) -> CutoutResult<(usize, AxisRange)> {
        let axis = reference.polarization_axis().ok_or_else(|| {
            CutoutError::NoContent("header declares no polarization axis".to_string())
        })?;
        let length = declared_length(reference, axis)?;
        let increment = reference.axis_increment(axis);
        if increment == 0.0 {
            return Err(CutoutError::ValidationError(
                "polarization axis increment is zero".to_string()));
        }
        let crpix = reference.crpix.get(axis - 1).copied().unwrap_or(0.0);
        let crval = reference.crval.get(axis - 1).copied().unwrap_or(0.0);

        let mut pixels = Vec::new();
        for state in states {
            let pixel = crpix + (f64::from(state.code()) - crval) / increment;
            let rounded = pixel.round();
            if (pixel - rounded).abs() > 1e-6 {
                trace!("State {} falls between pixels, ignored", state);
                continue;
            }
            let index = rounded as i64;
            if index < 1 || index > length as i64 {
                trace!("State {} maps to pixel {} outside the axis", state, index);
                continue;
            }
            pixels.push(index);
        }

        let lo = pixels.iter().min().copied().ok_or_else(|| {
            CutoutError::NoContent(
                "no requested polarization state is present on the axis".to_string())
        })?;
        let hi = pixels.iter().max().copied().unwrap_or(lo);
        debug!("Polarization states resolved to {}:{} on axis {}", lo, hi, axis);
        Ok((axis, AxisRange::new(lo, hi)?))
    }
}

/// Overwrites the range for a 1-based axis, refusing axes beyond the data
fn set_axis(ranges: &mut [AxisRange], axis: usize, range: AxisRange) -> CutoutResult<()> {
    if axis == 0 || axis > ranges.len() {
        return Err(CutoutError::NoContent(format!(
            "coordinate axis {} has no data extent", axis)));
    }
    ranges[axis - 1] = range;
    Ok(())
}

/// Declared length of a 1-based axis, no-content when absent or empty
fn declared_length(reference: &CoordinateReference, axis: usize) -> CutoutResult<usize> {
    match reference.axis_length(axis) {
        Some(length) if length > 0 => Ok(length),
        _ => Err(CutoutError::NoContent(format!(
            "axis {} declares no pixels", axis))),
    }
}

/// Transforms a vertex list and reduces it to a pixel bounding box
///
/// Vertices a projection cannot reach are excluded; when every vertex
/// fails the shape misses the data entirely.
fn sample_bbox(
    vertices: &[(f64, f64)],
    converter: &dyn PixelConverter,
) -> CutoutResult<(f64, f64, f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut hits = 0usize;
    for &(ra, dec) in vertices {
        match converter.world_to_pixel(ra, dec) {
            Ok((x, y)) => {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                hits += 1;
            }
            Err(e) => trace!("Vertex ({}, {}) excluded: {}", ra, dec, e),
        }
    }
    if hits == 0 {
        return Err(CutoutError::NoContent(
            "no shape vertex projects onto the data".to_string()));
    }
    Ok((min_x, max_x, min_y, max_y))
}

/// Rejects clockwise polygons
///
/// The signed area is computed on longitude offsets from the first vertex
/// so a polygon straddling the 0/360 seam still gets a meaningful sign.
fn validate_winding(vertices: &[(f64, f64)]) -> CutoutResult<()> {
    let ra0 = vertices[0].0;
    let points: Vec<(f64, f64)> = vertices
        .iter()
        .map(|&(ra, dec)| (wrap_longitude(ra - ra0), dec))
        .collect();
    let mut doubled_area = 0.0;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        doubled_area += x1 * y2 - x2 * y1;
    }
    if doubled_area < 0.0 {
        return Err(CutoutError::ValidationError(
            "polygon vertices wind clockwise, counter-clockwise required".to_string()));
    }
    if doubled_area == 0.0 {
        return Err(CutoutError::ValidationError(
            "polygon encloses no area".to_string()));
    }
    Ok(())
}

/// Floors/ceils a float interval and clips it to [1, length]
fn clip_to_axis(lo: f64, hi: f64, length: usize, what: &str) -> CutoutResult<AxisRange> {
    let start = (lo.floor() as i64).max(1);
    let end = (hi.ceil() as i64).min(length as i64);
    if start > end {
        return Err(CutoutError::NoContent(format!(
            "{} interval [{:.2}, {:.2}] misses the axis extent 1:{}", what, lo, hi, length)));
    }
    AxisRange::new(start, end)
}

/// Converts a requested wavelength in meters into the axis's own quantity
/// and unit
fn spectral_value(
    base: &str,
    cunit: &str,
    wavelength_m: f64,
    rest_frequency: Option<f64>,
) -> CutoutResult<f64> {
    if wavelength_m <= 0.0 {
        return Err(CutoutError::ValidationError(format!(
            "band bound {} must be a positive wavelength in meters", wavelength_m)));
    }
    let value = match base {
        "WAVE" | "AWAV" => wavelength_m / wavelength_unit(cunit),
        "WAVN" => (1.0 / wavelength_m) * wavelength_unit(cunit),
        "FREQ" => (SPEED_OF_LIGHT / wavelength_m) / frequency_unit(cunit),
        "ENER" => (PLANCK * SPEED_OF_LIGHT / wavelength_m) / energy_unit(cunit),
        "VRAD" | "VELO" => {
            let f0 = require_rest_frequency(rest_frequency)?;
            let fraction = 1.0 - (SPEED_OF_LIGHT / wavelength_m) / f0;
            (SPEED_OF_LIGHT * fraction) / velocity_unit(cunit)
        }
        "VOPT" => {
            let f0 = require_rest_frequency(rest_frequency)?;
            let rest_wavelength = SPEED_OF_LIGHT / f0;
            (SPEED_OF_LIGHT * (wavelength_m / rest_wavelength - 1.0)) / velocity_unit(cunit)
        }
        "ZOPT" => {
            let f0 = require_rest_frequency(rest_frequency)?;
            wavelength_m * f0 / SPEED_OF_LIGHT - 1.0
        }
        "BETA" => {
            let f0 = require_rest_frequency(rest_frequency)?;
            1.0 - (SPEED_OF_LIGHT / wavelength_m) / f0
        }
        other => {
            return Err(CutoutError::NoContent(format!(
                "spectral axis type '{}' is not convertible", other)))
        }
    };
    Ok(value)
}

fn require_rest_frequency(rest_frequency: Option<f64>) -> CutoutResult<f64> {
    match rest_frequency {
        Some(f0) if f0 > 0.0 => Ok(f0),
        _ => Err(CutoutError::NoContent(
            "velocity axis needs a rest frequency the header does not declare".to_string())),
    }
}

/// Inverts the axis dispersion relation for one world value
fn dispersion_pixel(
    reference: &CoordinateReference,
    axis: usize,
    ctype: &str,
    world: f64,
) -> CutoutResult<f64> {
    let increment = reference.axis_increment(axis);
    if increment == 0.0 {
        return Err(CutoutError::ValidationError(
            "spectral axis increment is zero".to_string()));
    }
    let crpix = reference.crpix.get(axis - 1).copied().unwrap_or(0.0);
    let crval = reference.crval.get(axis - 1).copied().unwrap_or(0.0);

    if ctype.ends_with("-LOG") {
        if crval <= 0.0 || world <= 0.0 {
            return Err(CutoutError::ValidationError(
                "logarithmic dispersion needs positive reference and target values".to_string()));
        }
        return Ok(crpix + (crval / increment) * (world / crval).ln());
    }
    Ok(crpix + (world - crval) / increment)
}

/// Treats projection sample failures as no-content, passing real errors on
fn no_content_if_sample(error: CutoutError, message: &str) -> CutoutError {
    match error {
        CutoutError::ValidationError(_) => error,
        _ => CutoutError::NoContent(message.to_string()),
    }
}

fn wrap_longitude(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Unit scale factors to meters
fn wavelength_unit(cunit: &str) -> f64 {
    match cunit.trim() {
        "cm" => 1e-2,
        "mm" => 1e-3,
        "um" | "µm" => 1e-6,
        "nm" => 1e-9,
        "Angstrom" | "angstrom" | "A" => 1e-10,
        _ => 1.0,
    }
}

/// Unit scale factors to Hz
fn frequency_unit(cunit: &str) -> f64 {
    match cunit.trim() {
        "kHz" => 1e3,
        "MHz" => 1e6,
        "GHz" => 1e9,
        _ => 1.0,
    }
}

/// Unit scale factors to joules
fn energy_unit(cunit: &str) -> f64 {
    match cunit.trim() {
        "eV" => 1.602_176_634e-19,
        "keV" => 1.602_176_634e-16,
        "MeV" => 1.602_176_634e-13,
        _ => 1.0,
    }
}

/// Unit scale factors to m/s
fn velocity_unit(cunit: &str) -> f64 {
    match cunit.trim() {
        "km/s" => 1e3,
        _ => 1.0,
    }
}
