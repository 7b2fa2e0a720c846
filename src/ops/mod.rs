//! High-level operations.
//!
//! This module contains the implementation of the CLI commands.

pub mod create;
pub mod inspect;

pub use create::{create, create_with, Backends, CreateOptions, CreateResult};
pub use inspect::{
    clean_patterns, format_clean_patterns, format_info, format_options, info, options_report,
    CleanPatterns, InfoOptions, InfoReport, OptionsReport,
};
