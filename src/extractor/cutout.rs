//! N-dimensional array cutout engine
//!
//! This module computes where a requested pixel window lands in a source
//! array and copies the overlapping block out, padding whatever the source
//! cannot supply with zeros. Requested ranges arrive in header axis order
//! and are reversed here to match storage order. Missing axes are left
//! unconstrained; a request with more axes than the source has is refused.
//!
//! The coordinate reference travels with the extracted block: reference
//! pixels shift by the cut start on each constrained axis and the
//! distortion reference, when present, is re-centered on the spatial pair.

use log::{debug, trace};

use crate::coordinate::wcs::CoordinateReference;
use crate::extractor::region::AxisRange;
use crate::fits::data::DataArray;
use crate::fits::errors::{CutoutError, CutoutResult};
use crate::utils::logger::Logger;

/// Represents the product of one extraction
///
/// Holds the cut array, the adjusted coordinate reference and the
/// reference pixel vector after the cut. Consumed by the assembler when
/// it builds the output extension.
#[derive(Debug, Clone)]
pub struct CutoutData {
    /// Extracted array, requested shape, zero-padded where needed
    pub data: DataArray,
    /// Coordinate reference rewritten for the cut, when one was supplied
    pub wcs: Option<CoordinateReference>,
    /// Reference pixel per axis after the cut, header axis order
    pub crpix_after_cut: Vec<f64>,
    /// 0-based start actually used per storage axis, for header rewrite
    pub starts: Vec<usize>,
}

/// Performs array cutouts against one source array
pub struct ArrayCutout<'a> {
    /// Logger instance
    logger: &'a Logger,
}

impl<'a> ArrayCutout<'a> {
    /// Creates a new cutout engine
    pub fn new(logger: &'a Logger) -> Self {
        ArrayCutout { logger }
    }

    /// Computes the position and shape of a requested window
    ///
    /// Ranges must already be in storage order (reversed from how the
    /// caller wrote them) and align with the trailing axes of the source
    /// shape; missing leading axes take their full extent. The position
    /// is the window's midpoint sample per axis, the shape its length.
    ///
    /// # Arguments
    /// * `source_shape` - Source axis lengths in storage order
    /// * `ranges` - Requested ranges in storage order
    ///
    /// # Returns
    /// Position and shape vectors in storage order
    pub fn compute_position_and_shape(
        source_shape: &[usize],
        ranges: &[AxisRange],
    ) -> CutoutResult<(Vec<usize>, Vec<usize>)> {
        let windows = resolve_windows(source_shape, ranges)?;
        let position = windows.iter().map(|w| w.start + w.length / 2).collect();
        let shape = windows.iter().map(|w| w.length).collect();
        Ok((position, shape))
    }

    /// Extracts the requested window from a source array
    ///
    /// # Arguments
    /// * `source` - The source array
    /// * `wcs` - Coordinate reference to rewrite for the cut, if any
    /// * `ranges` - Requested ranges in header axis order (axis 1 first)
    ///
    /// # Returns
    /// The extracted block with its adjusted coordinate reference
    pub fn extract(
        &self,
        source: &DataArray,
        wcs: Option<&CoordinateReference>,
        ranges: &[AxisRange],
    ) -> CutoutResult<CutoutData> {
        let mut array = source.clone();
        array.squeeze();

        let mut storage_ranges: Vec<AxisRange> = ranges.to_vec();
        storage_ranges.reverse();
        let windows = resolve_windows(&array.shape, &storage_ranges)?;

        // Clip each window against the source and demand some overlap
        let mut overlap = Vec::with_capacity(windows.len());
        for (axis, window) in windows.iter().enumerate() {
            let dim = array.shape[axis];
            let available = dim.saturating_sub(window.start).min(window.length);
            if available == 0 {
                return Err(CutoutError::NoContent(format!(
                    "requested ranges do not intersect the source array \
                     (axis {} window starts at pixel {} of {})",
                    windows.len() - axis, window.start + 1, dim)));
            }
            overlap.push(available);
        }

        let identity = windows
            .iter()
            .zip(&array.shape)
            .all(|(w, &dim)| w.start == 0 && w.length == dim);

        let shape: Vec<usize> = windows.iter().map(|w| w.length).collect();
        let starts: Vec<usize> = windows.iter().map(|w| w.start).collect();
        let source_shape = array.shape.clone();

        let data = if identity {
            trace!("Window covers the whole array, reusing source bytes");
            array
        } else {
            let bytes = copy_window(&array, &starts, &shape, &overlap);
            DataArray::new(array.bitpix, shape.clone(), bytes)?
        };

        let (wcs, crpix_after_cut) = adjust_reference(wcs, &starts, data.ndim());
        let _ = self.logger.log(&format!(
            "Extracted {:?} block from {:?} source", data.shape, source_shape));
        Ok(CutoutData { data, wcs, crpix_after_cut, starts })
    }
}

/// A concrete per-axis window in storage order, 0-based start
#[derive(Debug, Clone, Copy)]
struct Window {
    start: usize,
    length: usize,
}

/// Aligns storage-order ranges with the trailing axes of the source shape
fn resolve_windows(source_shape: &[usize], ranges: &[AxisRange]) -> CutoutResult<Vec<Window>> {
    if ranges.len() > source_shape.len() {
        let attempted: Vec<String> = ranges
            .iter()
            .map(|r| match (r.start, r.end) {
                (Some(s), Some(e)) => (e - s + 1).to_string(),
                _ => "*".to_string(),
            })
            .collect();
        let source: Vec<String> = source_shape.iter().map(usize::to_string).collect();
        return Err(CutoutError::ValidationError(format!(
            "cutout shape ({}) exceeds source dimensionality ({})",
            attempted.join(","), source.join(","))));
    }

    let offset = source_shape.len() - ranges.len();
    let mut windows = Vec::with_capacity(source_shape.len());
    for (axis, &dim) in source_shape.iter().enumerate() {
        let window = if axis < offset {
            Window { start: 0, length: dim }
        } else {
            let (start, end) = ranges[axis - offset].resolve(dim);
            debug_assert!(start >= 1 && end >= start);
            Window { start: (start - 1) as usize, length: (end - start + 1) as usize }
        };
        trace!("Axis {} window: start {}, length {}", axis, window.start, window.length);
        windows.push(window);
    }
    Ok(windows)
}

/// Copies the overlapping block into a zero-filled buffer of the requested
/// shape
///
/// The innermost storage axis is contiguous, so the copy walks an odometer
/// over the outer overlap coordinates and moves one run per step.
fn copy_window(
    source: &DataArray,
    starts: &[usize],
    shape: &[usize],
    overlap: &[usize],
) -> Vec<u8> {
    let elem = source.element_size();
    let total: usize = shape.iter().product::<usize>() * elem;
    let mut out = vec![0u8; total];

    let src_strides = source.byte_strides();
    let mut dest_strides = vec![0usize; shape.len()];
    let mut stride = elem;
    for axis in (0..shape.len()).rev() {
        dest_strides[axis] = stride;
        stride *= shape[axis];
    }

    let ndim = shape.len();
    let run = overlap[ndim - 1] * elem;
    let outer = &overlap[..ndim - 1];
    let mut index = vec![0usize; outer.len()];

    loop {
        let mut src_off = starts[ndim - 1] * src_strides[ndim - 1];
        let mut dest_off = 0;
        for (axis, &i) in index.iter().enumerate() {
            src_off += (starts[axis] + i) * src_strides[axis];
            dest_off += i * dest_strides[axis];
        }
        out[dest_off..dest_off + run].copy_from_slice(&source.bytes[src_off..src_off + run]);

        // Advance the odometer over the outer axes
        let mut axis = outer.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < outer[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}

/// Rewrites the reference pixel vector for a cut starting at `starts`
///
/// The reference pixel on header axis i drops by the 0-based start of the
/// matching storage axis. When the header declares fewer axes than the
/// array has dimensions the vector is padded with the neutral 1.0 first.
/// A distortion reference, when present, is re-centered on the spatial
/// pair's post-cut values; its polynomials are untouched.
fn adjust_reference(
    wcs: Option<&CoordinateReference>,
    starts: &[usize],
    ndim: usize,
) -> (Option<CoordinateReference>, Vec<f64>) {
    let mut wcs = match wcs {
        Some(reference) => reference.clone(),
        None => return (None, Vec::new()),
    };

    while wcs.crpix.len() < ndim {
        wcs.crpix.push(1.0);
    }
    for axis in 1..=ndim {
        // Header axis i maps to storage axis ndim - i
        let delta = starts[ndim - axis] as f64;
        wcs.crpix[axis - 1] -= delta;
    }
    if let Some(sip) = wcs.sip.as_mut() {
        if wcs.crpix.len() >= 2 {
            sip.crpix = [wcs.crpix[0], wcs.crpix[1]];
        }
    }

    debug!("Reference pixel after cut: {:?}", wcs.crpix);
    let crpix = wcs.crpix.clone();
    (Some(wcs), crpix)
}
