//! Test suites for the Tether CLI runtime.

mod support;
