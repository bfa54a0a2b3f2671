//! Configuration module
//!
//! Settings for the backend connection, the level browser and display.

pub mod config;
