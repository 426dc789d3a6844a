//! End-to-end tests for the command-line pipeline
//!
//! Tests are organized by topic:
//! - `run` - Console output, figure and JSON report of a short run
