//! Core recipe model.
//!
//! - Settings and options of a build configuration
//! - The CLHEP component graph and install layout
//! - The recipe file and the package descriptor driving the lifecycle

pub mod component;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod options;
pub mod platform;
pub mod recipe;

pub use component::{Component, ComponentGraph};
pub use descriptor::{Folders, PackageDescriptor, PackageInfo, RecipeVariant};
pub use error::{ConfigError, PackagingError};
pub use options::{resolve_options, OptionRequest, ResolvedOptions};
pub use platform::{BuildType, Compiler, CppStd, Os, Settings};
pub use recipe::Recipe;
