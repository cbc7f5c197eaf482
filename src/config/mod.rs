//! Configuration module
//!
//! Loads the optional TOML config file and merges it with CLI overrides.

mod file;

pub use file::*;
