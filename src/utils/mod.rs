//! Utility functions and helpers
//!
//! Application paths and the dual (ring buffer + file) logger.

pub mod app_paths;
pub mod dual_logging;
pub mod logging;
