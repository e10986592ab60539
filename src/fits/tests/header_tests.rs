//! Tests for header cards and the header model

extern crate std;

use crate::fits::errors::CutoutError;
use crate::fits::header::{Card, Header, Value};
use crate::fits::tests::test_utils::{card_image, model_header};

#[test]
fn test_parse_logical_card() {
    let card = Card::from_bytes(&card_image(
        "SIMPLE  =                    T / file does conform")).unwrap();
    std::assert_eq!(card.keyword, "SIMPLE");
    std::assert_eq!(card.value, Value::Logical(true));
    std::assert_eq!(card.comment.as_deref(), Some("file does conform"));
}

#[test]
fn test_parse_integer_card() {
    let card = Card::from_bytes(&card_image("NAXIS   =                    3")).unwrap();
    std::assert_eq!(card.value.as_integer(), Some(3));
    std::assert!(card.comment.is_none());
}

#[test]
fn test_parse_real_with_fortran_exponent() {
    let card = Card::from_bytes(&card_image("RESTFRQ =         1.420406D+09")).unwrap();
    match card.value {
        Value::Real(v) => std::assert!((v - 1.420406e9).abs() < 1.0),
        other => std::panic!("expected a real value, got {:?}", other),
    }
}

#[test]
fn test_parse_string_with_escaped_quote() {
    let card = Card::from_bytes(&card_image(
        "OBJECT  = 'O''NEIL  '          / target name")).unwrap();
    std::assert_eq!(card.value.as_str(), Some("O'NEIL"));
    std::assert_eq!(card.comment.as_deref(), Some("target name"));
}

#[test]
fn test_parse_commentary_card() {
    let card = Card::from_bytes(&card_image("COMMENT   built from scan 1432")).unwrap();
    std::assert_eq!(card.keyword, "COMMENT");
    std::assert!(card.is_commentary());
    std::assert_eq!(card.value, Value::Undefined);
    std::assert_eq!(card.comment.as_deref(), Some("  built from scan 1432"));
}

#[test]
fn test_parse_card_without_value_indicator() {
    let card = Card::from_bytes(&card_image("WEIRD   some free text")).unwrap();
    std::assert_eq!(card.keyword, "WEIRD");
    std::assert_eq!(card.value, Value::Undefined);
    std::assert!(card.comment.is_some());
}

#[test]
fn test_parse_rejects_wrong_length() {
    let result = Card::from_bytes(b"SIMPLE  = T");
    std::assert!(matches!(result, Err(CutoutError::InvalidCard(_))));
}

#[test]
fn test_parse_rejects_unterminated_string() {
    let result = Card::from_bytes(&card_image("OBJECT  = 'unclosed"));
    std::assert!(matches!(result, Err(CutoutError::InvalidCard(_))));
}

#[test]
fn test_card_image_layout() {
    let card = Card::new("BITPIX", Value::Integer(16));
    let image = card.to_bytes();
    std::assert_eq!(image.len(), 80);
    std::assert_eq!(&image[..8], b"BITPIX  ");
    std::assert_eq!(&image[8..10], b"= ");
    // Fixed format right-justifies the value to column 30
    std::assert_eq!(&image[28..30], b"16");
}

#[test]
fn test_card_round_trip_with_comment() {
    let card = Card::with_comment("EXTVER", Value::Integer(2), "extension version");
    let parsed = Card::from_bytes(&card.to_bytes()).unwrap();
    std::assert_eq!(parsed.keyword, "EXTVER");
    std::assert_eq!(parsed.value.as_integer(), Some(2));
    std::assert_eq!(parsed.comment.as_deref(), Some("extension version"));
}

#[test]
fn test_real_formatting_keeps_decimal_point() {
    let card = Card::new("CRVAL1", Value::Real(45.0));
    let parsed = Card::from_bytes(&card.to_bytes()).unwrap();
    std::assert_eq!(parsed.value.as_real(), Some(45.0));
    let text = card.to_string();
    std::assert!(text.contains("45.0"), "missing decimal point: {}", text);
}

#[test]
fn test_integral_real_reads_as_integer() {
    std::assert_eq!(Value::Real(4.0).as_integer(), Some(4));
    std::assert_eq!(Value::Real(4.5).as_integer(), None);
    std::assert_eq!(Value::Integer(4).as_real(), Some(4.0));
}

#[test]
fn test_header_lookup_uses_first_occurrence() {
    let mut header = Header::new();
    header.push(Card::new("EXTNAME", Value::Str("FIRST".to_string())));
    header.push(Card::new("EXTNAME", Value::Str("SECOND".to_string())));
    std::assert_eq!(header.string("EXTNAME").as_deref(), Some("FIRST"));
    std::assert_eq!(header.len(), 2);
}

#[test]
fn test_set_value_rewrites_in_place() {
    let mut header = model_header(&[
        ("CRPIX1", Value::Real(512.0)),
        ("CRPIX2", Value::Real(512.0)),
    ]);
    header.set_value("CRPIX1", Value::Real(12.0));
    std::assert_eq!(header.real("CRPIX1"), Some(12.0));
    std::assert_eq!(header.position("CRPIX1"), Some(0));
}

#[test]
fn test_set_value_appends_when_missing() {
    let mut header = model_header(&[("NAXIS", Value::Integer(2))]);
    header.set_value("CRPIX3", Value::Real(1.0));
    std::assert_eq!(header.real("CRPIX3"), Some(1.0));
    std::assert_eq!(header.position("CRPIX3"), Some(1));
}

#[test]
fn test_remove_all_drops_every_occurrence() {
    let mut header = model_header(&[
        ("CHECKSUM", Value::Str("abc".to_string())),
        ("DATASUM", Value::Str("123".to_string())),
        ("CHECKSUM", Value::Str("def".to_string())),
    ]);
    std::assert_eq!(header.remove_all("CHECKSUM"), 2);
    std::assert!(!header.contains("CHECKSUM"));
    std::assert!(header.contains("DATASUM"));
}

#[test]
fn test_drain_matching_preserves_order() {
    let mut header = model_header(&[
        ("CD1_1", Value::Real(0.1)),
        ("CTYPE1", Value::Str("RA---TAN".to_string())),
        ("CD1_2", Value::Real(0.2)),
        ("CD2_2", Value::Real(0.3)),
    ]);
    let removed = header.drain_matching(crate::fits::keywords::is_matrix_keyword);
    let keywords: Vec<&str> = removed.iter().map(|c| c.keyword.as_str()).collect();
    std::assert_eq!(keywords, vec!["CD1_1", "CD1_2", "CD2_2"]);
    std::assert_eq!(header.len(), 1);
    std::assert!(header.contains("CTYPE1"));
}

#[test]
fn test_insert_all_after_anchors_run() {
    let mut header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(10)),
        ("NAXIS2", Value::Integer(20)),
        ("OBJECT", Value::Str("M31".to_string())),
    ]);
    header.insert_all_after("NAXIS2", vec![
        Card::new("CD1_1", Value::Real(0.5)),
        Card::new("CD2_2", Value::Real(0.5)),
    ]);
    std::assert_eq!(header.position("CD1_1"), Some(3));
    std::assert_eq!(header.position("CD2_2"), Some(4));
    std::assert_eq!(header.position("OBJECT"), Some(5));
}

#[test]
fn test_axis_lengths() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(3)),
        ("NAXIS1", Value::Integer(300)),
        ("NAXIS2", Value::Integer(200)),
        ("NAXIS3", Value::Integer(4)),
    ]);
    std::assert_eq!(header.axis_lengths().unwrap(), vec![300, 200, 4]);
}

#[test]
fn test_axis_lengths_requires_every_axis_card() {
    let header = model_header(&[
        ("NAXIS", Value::Integer(2)),
        ("NAXIS1", Value::Integer(300)),
    ]);
    std::assert!(matches!(
        header.axis_lengths(),
        Err(CutoutError::SourceAccessError(_))));
}

#[test]
fn test_required_integer_reports_the_keyword() {
    let header = Header::new();
    match header.required_integer("BITPIX") {
        Err(CutoutError::SourceAccessError(msg)) => std::assert!(msg.contains("BITPIX")),
        other => std::panic!("unexpected result: {:?}", other),
    }
}
