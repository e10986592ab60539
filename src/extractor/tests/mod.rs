//! Tests for the extraction engine


mod cutout_tests;
mod pixel_parser_tests;
