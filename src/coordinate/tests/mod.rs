//! Tests for coordinate handling

mod test_utils;

mod wcs_tests;
