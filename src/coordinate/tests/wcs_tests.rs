//! Tests for the coordinate reference model and the linear sky transform

extern crate std;

use crate::coordinate::tests::test_utils::{axis_reference, cube_reference, model_header};
use crate::coordinate::wcs::{
    axis_kind, AxisKind, CoordinateReference, LinearMatrix, LinearWcs, MatrixForm,
    PixelConverter, SipDistortion,
};
use crate::fits::errors::CutoutError;
use crate::fits::header::Value;

#[test]
fn test_axis_kind_classification() {
    std::assert_eq!(axis_kind("RA---TAN"), AxisKind::SpatialLon);
    std::assert_eq!(axis_kind("GLON-CAR"), AxisKind::SpatialLon);
    std::assert_eq!(axis_kind("DEC--TAN"), AxisKind::SpatialLat);
    std::assert_eq!(axis_kind("ELAT"), AxisKind::SpatialLat);
    std::assert_eq!(axis_kind("FREQ-LSR"), AxisKind::Spectral);
    std::assert_eq!(axis_kind("WAVE-LOG"), AxisKind::Spectral);
    std::assert_eq!(axis_kind("VRAD"), AxisKind::Spectral);
    std::assert_eq!(axis_kind("TIME"), AxisKind::Time);
    std::assert_eq!(axis_kind("utc"), AxisKind::Time);
    std::assert_eq!(axis_kind("STOKES"), AxisKind::Polarization);
    std::assert_eq!(axis_kind("LINEAR"), AxisKind::Other);
    std::assert_eq!(axis_kind(""), AxisKind::Other);
}

#[test]
fn test_reference_from_header() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(100)),
        ("NAXIS2", Value::Integer(80)),
        ("CTYPE1", Value::Str("RA---TAN".to_string())),
        ("CTYPE2", Value::Str("DEC--TAN".to_string())),
        ("CRPIX1", Value::Real(50.5)),
        ("CRPIX2", Value::Real(60.5)),
        ("CRVAL1", Value::Real(150.0)),
        ("CRVAL2", Value::Real(2.0)),
        ("CDELT1", Value::Real(-0.001)),
        ("CDELT2", Value::Real(0.001)),
        ("RESTFREQ", Value::Real(1.42e9)),
        ("MJDREFI", Value::Real(58000.0)),
        ("MJDREFF", Value::Real(0.5)),
    ]);

    let reference = CoordinateReference::from_header(&header).unwrap().unwrap();
    std::assert_eq!(reference.naxis, 2);
    std::assert_eq!(reference.crpix, vec![50.5, 60.5]);
    std::assert_eq!(reference.cdelt, vec![-0.001, 0.001]);
    std::assert_eq!(reference.ctype, vec!["RA---TAN", "DEC--TAN"]);
    std::assert_eq!(reference.rest_frequency, Some(1.42e9));
    std::assert_eq!(reference.time_reference, 58000.5);
    std::assert_eq!(reference.axis_lengths, vec![100, 80]);
    std::assert!(reference.matrix.is_none());
    std::assert!(reference.sip.is_none());
    std::assert_eq!(reference.spatial_axis_pair(), Some((1, 2)));
}

#[test]
fn test_reference_absent_without_coordinate_cards() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(100)),
        ("NAXIS2", Value::Integer(80)),
    ]);
    std::assert!(CoordinateReference::from_header(&header).unwrap().is_none());

    let empty = model_header(&[]);
    std::assert!(CoordinateReference::from_header(&empty).unwrap().is_none());
}

#[test]
fn test_wcsaxes_overrides_the_axis_count() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(100)),
        ("NAXIS2", Value::Integer(80)),
        ("WCSAXES", Value::Integer(3)),
        ("CTYPE1", Value::Str("RA---TAN".to_string())),
        ("CTYPE2", Value::Str("DEC--TAN".to_string())),
        ("CTYPE3", Value::Str("FREQ".to_string())),
        ("CRVAL3", Value::Real(1.4e9)),
    ]);
    let reference = CoordinateReference::from_header(&header).unwrap().unwrap();
    std::assert_eq!(reference.naxis, 3);
    std::assert_eq!(reference.spectral_axis(), Some(3));
    // Axes past the header defaults still read sensibly
    std::assert_eq!(reference.crval[2], 1.4e9);
    std::assert_eq!(reference.cdelt[2], 1.0);
}

#[test]
fn test_cd_matrix_takes_precedence() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(10)),
        ("NAXIS2", Value::Integer(10)),
        ("CTYPE1", Value::Str("RA---TAN".to_string())),
        ("CTYPE2", Value::Str("DEC--TAN".to_string())),
        ("CD2_2", Value::Real(0.002)),
        ("CD1_1", Value::Real(-0.002)),
        ("PC1_1", Value::Real(1.0)),
    ]);
    let reference = CoordinateReference::from_header(&header).unwrap().unwrap();
    let matrix = reference.matrix.unwrap();
    std::assert_eq!(matrix.form, MatrixForm::Cd);
    // Elements come back sorted by axis pair
    std::assert_eq!(matrix.elements, vec![(1, 1, -0.002), (2, 2, 0.002)]);
}

#[test]
fn test_matrix_element_defaults_to_identity() {
    let matrix = LinearMatrix {
        form: MatrixForm::Pc,
        elements: vec![(1, 2, 0.5)],
    };
    std::assert_eq!(matrix.element(1, 2), 0.5);
    std::assert_eq!(matrix.element(1, 1), 1.0);
    std::assert_eq!(matrix.element(2, 1), 0.0);
    std::assert_eq!(MatrixForm::Pc.prefix(), "PC");
    std::assert_eq!(MatrixForm::Cd.prefix(), "CD");
}

#[test]
fn test_axis_increment_prefers_cd_diagonal() {
    let mut reference = cube_reference();
    std::assert_eq!(reference.axis_increment(1), -0.001);
    reference.matrix = Some(LinearMatrix {
        form: MatrixForm::Cd,
        elements: vec![(1, 1, -0.002), (2, 2, 0.002)],
    });
    std::assert_eq!(reference.axis_increment(1), -0.002);
    // PC matrices leave CDELT authoritative
    reference.matrix = Some(LinearMatrix {
        form: MatrixForm::Pc,
        elements: vec![(1, 1, 2.0)],
    });
    std::assert_eq!(reference.axis_increment(1), -0.001);
}

#[test]
fn test_sip_read_from_header() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(10)),
        ("NAXIS2", Value::Integer(10)),
        ("CTYPE1", Value::Str("RA---TAN-SIP".to_string())),
        ("CTYPE2", Value::Str("DEC--TAN-SIP".to_string())),
        ("CRPIX1", Value::Real(50.5)),
        ("CRPIX2", Value::Real(60.5)),
        ("A_ORDER", Value::Integer(2)),
        ("A_2_0", Value::Real(1e-5)),
        ("B_ORDER", Value::Integer(2)),
        ("B_0_2", Value::Real(2e-5)),
    ]);
    let reference = CoordinateReference::from_header(&header).unwrap().unwrap();
    let sip = reference.sip.unwrap();
    std::assert_eq!(sip.a, vec![(2, 0, 1e-5)]);
    std::assert_eq!(sip.b, vec![(0, 2, 2e-5)]);
    std::assert_eq!(sip.crpix, [50.5, 60.5]);
}

#[test]
fn test_sip_without_coefficients_is_dropped() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(10)),
        ("NAXIS2", Value::Integer(10)),
        ("CTYPE1", Value::Str("RA---TAN".to_string())),
        ("CTYPE2", Value::Str("DEC--TAN".to_string())),
        ("A_ORDER", Value::Integer(2)),
    ]);
    let reference = CoordinateReference::from_header(&header).unwrap().unwrap();
    std::assert!(reference.sip.is_none());
}

#[test]
fn test_linear_transform_at_the_reference_point() {
    let wcs = LinearWcs::from_reference(&cube_reference()).unwrap();
    let (x, y) = wcs.world_to_pixel(150.0, 2.0).unwrap();
    std::assert!((x - 50.5).abs() < 1e-9);
    std::assert!((y - 50.5).abs() < 1e-9);

    let (x, y) = wcs.world_to_pixel(150.0, 2.001).unwrap();
    std::assert!((x - 50.5).abs() < 1e-9);
    std::assert!((y - 51.5).abs() < 1e-9);
}

#[test]
fn test_linear_transform_round_trip() {
    let wcs = LinearWcs::from_reference(&cube_reference()).unwrap();
    let (x, y) = wcs.world_to_pixel(150.012, 1.991).unwrap();
    let (ra, dec) = wcs.pixel_to_world(x, y).unwrap();
    std::assert!((ra - 150.012).abs() < 1e-9, "ra came back as {}", ra);
    std::assert!((dec - 1.991).abs() < 1e-9, "dec came back as {}", dec);
}

#[test]
fn test_longitude_offsets_shrink_with_declination() {
    let mut reference = cube_reference();
    reference.crval[1] = 60.0;
    let wcs = LinearWcs::from_reference(&reference).unwrap();
    // One raw degree of RA is only half a degree on the sky at dec 60
    let (x, _) = wcs.world_to_pixel(151.0, 60.0).unwrap();
    std::assert!((x - (50.5 - 500.0)).abs() < 0.5, "x came out as {}", x);
}

#[test]
fn test_sip_round_trip_without_inverse_polynomials() {
    let mut reference = cube_reference();
    reference.sip = Some(SipDistortion {
        a: vec![(2, 0, 1e-4)],
        b: vec![(0, 2, 1e-4)],
        ap: Vec::new(),
        bp: Vec::new(),
        crpix: [50.5, 50.5],
    });
    let wcs = LinearWcs::from_reference(&reference).unwrap();

    let (ra, dec) = wcs.pixel_to_world(52.5, 52.5).unwrap();
    let (x, y) = wcs.world_to_pixel(ra, dec).unwrap();
    std::assert!((x - 52.5).abs() < 1e-6, "x came back as {}", x);
    std::assert!((y - 52.5).abs() < 1e-6, "y came back as {}", y);
}

#[test]
fn test_transform_needs_a_spatial_pair() {
    let reference = axis_reference("FREQ", "Hz", 1.0, 1.4e9, 1e6, 50);
    std::assert!(matches!(LinearWcs::from_reference(&reference),
                          Err(CutoutError::NoContent(_))));
}

#[test]
fn test_transform_rejects_a_singular_matrix() {
    let mut reference = cube_reference();
    reference.matrix = Some(LinearMatrix {
        form: MatrixForm::Cd,
        elements: vec![(1, 1, 0.0), (1, 2, 0.0), (2, 1, 0.0), (2, 2, 0.0)],
    });
    std::assert!(matches!(LinearWcs::from_reference(&reference),
                          Err(CutoutError::ValidationError(_))));
}

#[test]
fn test_declination_domain_is_enforced() {
    let wcs = LinearWcs::from_reference(&cube_reference()).unwrap();
    std::assert!(wcs.world_to_pixel(150.0, 95.0).is_err());
    std::assert!(wcs.world_to_pixel(150.0, -95.0).is_err());
}
