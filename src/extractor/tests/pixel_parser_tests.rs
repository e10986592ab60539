//! Tests for the bracketed pixel request syntax

extern crate std;

use crate::extractor::pixel_parser::parse;
use crate::extractor::region::{AxisRange, ExtensionRef};
use crate::fits::errors::CutoutError;

#[test]
fn test_extension_with_ranges() {
    let specs = parse("[1][100:200,100:200]").unwrap();
    std::assert_eq!(specs.len(), 1);
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(1));
    std::assert_eq!(specs[0].ranges, vec![
        AxisRange::new(100, 200).unwrap(),
        AxisRange::new(100, 200).unwrap(),
    ]);
}

#[test]
fn test_bare_ranges_target_the_primary() {
    let specs = parse("[100:200]").unwrap();
    std::assert_eq!(specs.len(), 1);
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(0));
    std::assert_eq!(specs[0].ranges, vec![AxisRange::new(100, 200).unwrap()]);
}

#[test]
fn test_bare_integer_is_a_degenerate_range() {
    let specs = parse("[1][10]").unwrap();
    std::assert_eq!(specs[0].ranges, vec![AxisRange::single(10).unwrap()]);
}

#[test]
fn test_extension_alone_selects_everything() {
    let specs = parse("[3]").unwrap();
    std::assert_eq!(specs.len(), 1);
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(3));
    std::assert!(specs[0].ranges.is_empty());

    let specs = parse("[AMP]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::Name("AMP".to_string(), None));
    std::assert!(specs[0].ranges.is_empty());
}

#[test]
fn test_named_extension() {
    let specs = parse("[SCI][5:6,7]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::Name("SCI".to_string(), None));

    let specs = parse("[SCI,2][*,7]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::Name("SCI".to_string(), Some(2)));
    std::assert_eq!(specs[0].ranges, vec![AxisRange::whole(), AxisRange::single(7).unwrap()]);
}

#[test]
fn test_leading_star_fans_out() {
    let specs = parse("[*][1:2]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::AllData);
    std::assert_eq!(specs[0].ranges, vec![AxisRange::new(1, 2).unwrap()]);

    let specs = parse("[*]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::AllData);
    std::assert!(specs[0].ranges.is_empty());
}

#[test]
fn test_star_after_extension_is_a_whole_axis() {
    let specs = parse("[1][*]").unwrap();
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(1));
    std::assert_eq!(specs[0].ranges, vec![AxisRange::whole()]);
}

#[test]
fn test_several_pairs_in_one_string() {
    let specs = parse("[1][1:2][2][3:4]").unwrap();
    std::assert_eq!(specs.len(), 2);
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(1));
    std::assert_eq!(specs[1].extension, ExtensionRef::Index(2));
    std::assert_eq!(specs[1].ranges, vec![AxisRange::new(3, 4).unwrap()]);
}

#[test]
fn test_leading_ranges_combine_with_a_later_pair() {
    let specs = parse("[500:700][SCI,8][40:58]").unwrap();
    std::assert_eq!(specs.len(), 2);
    std::assert_eq!(specs[0].extension, ExtensionRef::Index(0));
    std::assert_eq!(specs[0].ranges, vec![AxisRange::new(500, 700).unwrap()]);
    std::assert_eq!(specs[1].extension, ExtensionRef::Name("SCI".to_string(), Some(8)));
    std::assert_eq!(specs[1].ranges, vec![AxisRange::new(40, 58).unwrap()]);
}

#[test]
fn test_half_open_ranges_are_rejected() {
    std::assert!(matches!(parse("[1][5:]"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("[1][:5]"), Err(CutoutError::ParseError(_))));
}

#[test]
fn test_backwards_range_is_rejected() {
    std::assert!(matches!(parse("[1][9:5]"), Err(CutoutError::ValidationError(_))));
}

#[test]
fn test_malformed_strings_are_rejected() {
    std::assert!(matches!(parse(""), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("no brackets"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("[]"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("x[1]"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("[1]x"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("[1][a:b]"), Err(CutoutError::ParseError(_))));
}

#[test]
fn test_bad_extension_tokens_are_rejected() {
    std::assert!(matches!(parse("[SCI,x][1:2]"), Err(CutoutError::ParseError(_))));
    std::assert!(matches!(parse("[A,B,C]"), Err(CutoutError::ParseError(_))));
}
