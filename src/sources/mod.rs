//! Package sources.
//!
//! Fetching release archives and patching the unpacked tree.

pub mod archive;
pub mod patch;

pub use archive::{ArchiveProvider, TarballProvider};
pub use patch::{GitApply, PatchApplier, PatchFile};
