//! Command implementations

pub mod clean_patterns;
pub mod completions;
pub mod create;
pub mod info;
pub mod options;
