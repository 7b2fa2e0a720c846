//! Recipe options and their normalization.
//!
//! The recipe exposes two options: `shared` and `fPIC`. What the user asks
//! for is an [`OptionRequest`]; [`resolve_options`] validates it against the
//! [`Settings`] and returns an immutable [`ResolvedOptions`] record in which
//! options that do not apply to the configuration are absent.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::platform::{Compiler, CppStd, Settings};

/// Options as requested by the user, before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRequest {
    /// Build shared libraries instead of static archives
    #[serde(default)]
    pub shared: bool,

    /// Explicit position-independent-code request (`None` = recipe default)
    #[serde(default, rename = "fPIC")]
    pub fpic: Option<bool>,
}

impl OptionRequest {
    pub fn shared(shared: bool) -> Self {
        OptionRequest { shared, fpic: None }
    }

    pub fn with_fpic(mut self, fpic: Option<bool>) -> Self {
        self.fpic = fpic;
        self
    }
}

/// Fully specified options for one build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub shared: bool,

    /// Absent on Windows and for shared builds
    #[serde(rename = "fPIC", skip_serializing_if = "Option::is_none")]
    pub fpic: Option<bool>,
}

impl ResolvedOptions {
    /// Whether position-independent code should be requested from CMake.
    pub fn wants_pic(&self) -> bool {
        self.fpic.unwrap_or(false)
    }
}

/// Default value of the `fPIC` option where it applies.
pub const DEFAULT_FPIC: bool = true;

/// Validate settings/options and produce the effective option set.
pub fn resolve_options(
    settings: &Settings,
    request: OptionRequest,
) -> Result<ResolvedOptions, ConfigError> {
    if let Some(cppstd) = settings.cppstd {
        if !cppstd.at_least(CppStd::CXX11) {
            return Err(ConfigError::CppStdTooOld { found: cppstd });
        }
    }

    if settings.compiler == Compiler::Msvc && request.shared {
        return Err(ConfigError::SharedMsvc);
    }

    if settings.os.is_windows() && settings.compiler == Compiler::Gcc {
        return Err(ConfigError::MinGw);
    }

    let fpic = if settings.os.is_windows() || request.shared {
        None
    } else {
        Some(request.fpic.unwrap_or(DEFAULT_FPIC))
    };

    tracing::debug!(
        "resolved options for {}/{}: shared={}, fPIC={:?}",
        settings.os,
        settings.compiler,
        request.shared,
        fpic
    );

    Ok(ResolvedOptions {
        shared: request.shared,
        fpic,
    })
}
