//! Configuration module for Nate-Archive
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key has a default, so a minimal file is enough to start.
//!
//! # Example
//!
//! ```no_run
//! use nate_archive::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("nate.toml")).unwrap();
//! println!("Archiving with {} workers", config.archiver.pool_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArchiverConfig, BrowserConfig, Config, FetcherConfig, OutputConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
