//! Recipe error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::platform::{Compiler, CppStd, Os};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Invalid combination of settings and options.
///
/// Raised synchronously before any download or build starts.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("CLHEP doesn't properly build its shared libs with Visual Studio")]
    #[diagnostic(
        code(clhep::config::shared_msvc),
        help("Build static libraries (drop `--shared`) or use clang-cl")
    )]
    SharedMsvc,

    #[error("CLHEP doesn't support MinGW")]
    #[diagnostic(
        code(clhep::config::mingw),
        help("Use the MSVC toolchain on Windows")
    )]
    MinGw,

    #[error("CLHEP requires at least C++11, but {found} was requested")]
    #[diagnostic(code(clhep::config::cppstd))]
    CppStdTooOld { found: CppStd },

    #[error("no sources for CLHEP version `{version}`")]
    #[diagnostic(code(clhep::config::unknown_version))]
    UnknownVersion {
        version: String,
        available: Vec<String>,
    },

    #[error("invalid recipe: {message}")]
    #[diagnostic(code(clhep::config::recipe))]
    InvalidRecipe { message: String },
}

impl ConfigError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ConfigError::SharedMsvc => diag
                .with_context(format!("compiler: {}, shared: true", Compiler::Msvc))
                .with_suggestion("Build static libraries instead (drop `--shared`)"),
            ConfigError::MinGw => diag
                .with_context(format!("os: {}, compiler: {}", Os::Windows, Compiler::Gcc))
                .with_suggestion("Use `--compiler msvc` on Windows"),
            ConfigError::CppStdTooOld { .. } => {
                diag.with_suggestion(format!("Request {} or newer with `--cppstd`", CppStd::CXX11))
            }
            ConfigError::UnknownVersion { available, .. } => {
                let mut diag = diag;
                if !available.is_empty() {
                    diag = diag.with_context(format!("available versions: {}", available.join(", ")));
                }
                diag.with_suggestion(suggestions::UNKNOWN_VERSION)
                    .with_suggestion("Add a `[versions.\"<version>\"]` entry to the recipe file")
            }
            ConfigError::InvalidRecipe { .. } => diag,
        }
    }
}

/// An expected path was missing while rearranging the installed tree.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PackagingError {
    #[error("library directory not found after install: {}", path.display())]
    #[diagnostic(code(clhep::package::missing_lib_dir))]
    MissingLibDir { path: PathBuf },

    #[error("component `{component}` artifact `{artifact}` not found in {}", dir.display())]
    #[diagnostic(code(clhep::package::missing_artifact))]
    MissingArtifact {
        component: String,
        artifact: String,
        dir: PathBuf,
    },
}

impl PackagingError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            PackagingError::MissingLibDir { .. } => diag
                .with_context("the install step did not produce a `lib` directory")
                .with_suggestion(suggestions::BUILD_FAILED),
            PackagingError::MissingArtifact { component, .. } => diag
                .with_context(format!("`{}` is exported to consumers but was not installed", component))
                .with_suggestion(suggestions::BUILD_FAILED),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_version_diagnostic() {
        let err = ConfigError::UnknownVersion {
            version: "9.9.9.9".to_string(),
            available: vec!["2.4.1.3".to_string(), "2.4.4.0".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("error: no sources for CLHEP version `9.9.9.9`"));
        assert!(output.contains("available versions: 2.4.1.3, 2.4.4.0"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_shared_msvc_message() {
        let output = ConfigError::SharedMsvc.to_diagnostic().format(false);
        assert!(output.contains("Visual Studio"));
        assert!(output.contains("compiler: msvc, shared: true"));
    }
}
