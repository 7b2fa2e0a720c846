//! clhep-recipe - a package recipe for the CLHEP class library
//!
//! This crate resolves build options, models CLHEP's component graph and
//! drives the source/build/package lifecycle that turns a release tarball
//! into a package folder with a consumer-facing description.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

pub use core::{
    descriptor::PackageDescriptor, options::resolve_options, platform::Settings, recipe::Recipe,
};
