//! Tests for the N-dimensional array cutout engine

extern crate std;

use crate::coordinate::wcs::SipDistortion;
use crate::extractor::cutout::ArrayCutout;
use crate::extractor::region::AxisRange;
use crate::extractor::tests::test_utils::{counting_bytes, simple_reference, test_logger};
use crate::fits::data::DataArray;
use crate::fits::errors::CutoutError;

fn closed(start: i64, end: i64) -> AxisRange {
    AxisRange::new(start, end).unwrap()
}

#[test]
fn test_position_and_shape_with_trailing_range() {
    // A lone range binds to the innermost storage axis; the outer axis
    // keeps its full extent and positions name the window midpoints
    let (position, shape) =
        ArrayCutout::compute_position_and_shape(&[4, 4], &[closed(10, 10)]).unwrap();
    std::assert_eq!(position, vec![2, 9]);
    std::assert_eq!(shape, vec![4, 1]);
}

#[test]
fn test_position_and_shape_with_partial_coverage() {
    let (position, shape) =
        ArrayCutout::compute_position_and_shape(&[10, 20], &[closed(2, 5)]).unwrap();
    std::assert_eq!(position, vec![5, 3]);
    std::assert_eq!(shape, vec![10, 4]);
}

#[test]
fn test_too_many_ranges_lists_both_shapes() {
    let ranges = [closed(1, 56), closed(5, 300), closed(1, 200)];
    match ArrayCutout::compute_position_and_shape(&[4, 4], &ranges) {
        Err(CutoutError::ValidationError(msg)) => {
            std::assert!(msg.contains("(56,296,200)"), "got: {}", msg);
            std::assert!(msg.contains("(4,4)"), "got: {}", msg);
        }
        other => std::panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_extract_interior_window() {
    let logger = test_logger("cutout-interior.log");
    let source = DataArray::new(8, vec![4, 4], counting_bytes(16)).unwrap();

    // Header order: axis 1 (columns) 2:3, axis 2 (rows) 1:2
    let cut = ArrayCutout::new(&logger)
        .extract(&source, None, &[closed(2, 3), closed(1, 2)])
        .unwrap();
    std::assert_eq!(cut.data.shape, vec![2, 2]);
    std::assert_eq!(cut.data.bytes, vec![1, 2, 5, 6]);
    std::assert_eq!(cut.starts, vec![0, 1]);
}

#[test]
fn test_extract_pads_past_the_edge_with_zeros() {
    let logger = test_logger("cutout-pad.log");
    let source = DataArray::new(8, vec![2, 2], counting_bytes(4)).unwrap();

    let cut = ArrayCutout::new(&logger)
        .extract(&source, None, &[closed(1, 3), closed(1, 3)])
        .unwrap();
    std::assert_eq!(cut.data.shape, vec![3, 3]);
    std::assert_eq!(cut.data.bytes, vec![
        0, 1, 0,
        2, 3, 0,
        0, 0, 0,
    ]);
}

#[test]
fn test_extract_missing_window_is_no_content() {
    let logger = test_logger("cutout-miss.log");
    let source = DataArray::new(8, vec![4, 4], counting_bytes(16)).unwrap();

    match ArrayCutout::new(&logger).extract(&source, None, &[closed(10, 12)]) {
        Err(CutoutError::NoContent(msg)) => {
            std::assert!(msg.contains("do not intersect"), "got: {}", msg);
        }
        other => std::panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_extract_identity_window_reuses_bytes() {
    let logger = test_logger("cutout-identity.log");
    let source = DataArray::new(8, vec![4, 4], counting_bytes(16)).unwrap();
    let reference = simple_reference(vec![2.5, 3.5], vec![4, 4]);

    let cut = ArrayCutout::new(&logger)
        .extract(&source, Some(&reference), &[AxisRange::whole(), AxisRange::whole()])
        .unwrap();
    std::assert_eq!(cut.data.bytes, source.bytes);
    std::assert_eq!(cut.starts, vec![0, 0]);
    // A full-extent window still reports the (unchanged) reference pixels
    std::assert_eq!(cut.crpix_after_cut, vec![2.5, 3.5]);
}

#[test]
fn test_extract_shifts_reference_pixels() {
    let logger = test_logger("cutout-crpix.log");
    let source = DataArray::new(8, vec![4, 4], counting_bytes(16)).unwrap();
    let reference = simple_reference(vec![10.0, 20.0], vec![4, 4]);

    let cut = ArrayCutout::new(&logger)
        .extract(&source, Some(&reference), &[closed(3, 4), closed(2, 3)])
        .unwrap();
    std::assert_eq!(cut.crpix_after_cut, vec![8.0, 19.0]);
    std::assert_eq!(cut.wcs.as_ref().unwrap().crpix, vec![8.0, 19.0]);
}

#[test]
fn test_extract_recenters_distortion_reference() {
    let logger = test_logger("cutout-sip.log");
    let source = DataArray::new(8, vec![4, 4], counting_bytes(16)).unwrap();
    let mut reference = simple_reference(vec![10.0, 20.0], vec![4, 4]);
    reference.sip = Some(SipDistortion {
        a: vec![(2, 0, 1e-6)],
        b: vec![(0, 2, 2e-6)],
        ap: Vec::new(),
        bp: Vec::new(),
        crpix: [10.0, 20.0],
    });

    let cut = ArrayCutout::new(&logger)
        .extract(&source, Some(&reference), &[closed(3, 4), closed(2, 3)])
        .unwrap();
    let sip = cut.wcs.unwrap().sip.unwrap();
    std::assert_eq!(sip.crpix, [8.0, 19.0]);
    // The polynomials themselves do not change
    std::assert_eq!(sip.a, vec![(2, 0, 1e-6)]);
}

#[test]
fn test_extract_squeezes_degenerate_source_axes() {
    let logger = test_logger("cutout-squeeze.log");
    // Storage (4, 4, 1): the length-1 axis drops before windowing
    let source = DataArray::new(8, vec![4, 4, 1], counting_bytes(16)).unwrap();

    let cut = ArrayCutout::new(&logger)
        .extract(&source, None, &[closed(2, 3), closed(2, 3)])
        .unwrap();
    std::assert_eq!(cut.data.shape, vec![2, 2]);
    std::assert_eq!(cut.data.bytes, vec![5, 6, 9, 10]);
}

#[test]
fn test_extract_fully_degenerate_source() {
    let logger = test_logger("cutout-degenerate.log");
    let source = DataArray::new(8, vec![1, 1], counting_bytes(1)).unwrap();

    let cut = ArrayCutout::new(&logger)
        .extract(&source, None, &[closed(1, 1)])
        .unwrap();
    std::assert_eq!(cut.data.shape, vec![1]);
    std::assert_eq!(cut.data.bytes, vec![0]);
}

#[test]
fn test_extract_16_bit_samples() {
    let logger = test_logger("cutout-i16.log");
    // 3x3 of big-endian i16 values 0..9
    let bytes: Vec<u8> = (0..9i16).flat_map(|v| v.to_be_bytes()).collect();
    let source = DataArray::new(16, vec![3, 3], bytes).unwrap();

    let cut = ArrayCutout::new(&logger)
        .extract(&source, None, &[closed(2, 3), closed(2, 3)])
        .unwrap();
    let expected: Vec<u8> = [4i16, 5, 7, 8].iter().flat_map(|v| v.to_be_bytes()).collect();
    std::assert_eq!(cut.data.bytes, expected);
}
