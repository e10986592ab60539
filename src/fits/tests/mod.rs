//! Tests for the FITS container module

mod test_utils;

mod header_tests;
