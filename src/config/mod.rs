//! Configuration module for MCQ Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use mcq_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Trying {} routes per page", config.fetch.routes.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, FetchConfig, HarvesterConfig, OutputConfig, DEFAULT_ERROR_MARKER,
    DEFAULT_ROUTES,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
