//! Build system drivers.

pub mod cmake;

pub use cmake::{BuildOrchestrator, CMakeBuilder, CMakeConfiguration};
