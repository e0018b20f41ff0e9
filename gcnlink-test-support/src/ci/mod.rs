//! Knobs that CI jobs use to tune test suites through the environment.

pub mod property_test_profile;
