//! Install layout - what survives in the package folder after install.
//!
//! CMake installs more than consumers need: tool binaries, CMake and
//! pkg-config files that would point at the wrong library names, the
//! combined library, and artifacts of both linkage kinds. This module
//! computes what to drop and applies it to an installed tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::core::component::{ComponentGraph, UMBRELLA_BASE};
use crate::core::error::PackagingError;
use crate::core::platform::Os;
use crate::util::fs::{glob_files, remove_dir_all_if_exists};

/// Directory (relative to the package folder) receiving license files.
pub const LICENSE_DIR: &str = "licenses";

/// License files shipped in the CLHEP source directory.
pub const LICENSE_PATTERN: &str = "COPYING*";

/// Glob patterns (relative to `<package>/lib`) removed after install.
///
/// The combined library is always dropped, under its generic and versioned
/// names, since each component library already carries its content. Of the
/// remaining artifacts only the kind matching the build mode is kept.
pub fn artifact_deletion_set(version: &str, shared: bool) -> Vec<String> {
    let static_umbrella = format!("{}{}", UMBRELLA_BASE, crate::core::component::STATIC_SUFFIX);

    let mut patterns = vec![
        format!("*{}.*", UMBRELLA_BASE),
        format!("*{}.*", static_umbrella),
        format!("*{}-{}.*", UMBRELLA_BASE, version),
        format!("*{}-{}.*", static_umbrella, version),
    ];

    if shared {
        patterns.push("*.a".to_string());
    } else {
        patterns.extend(["*.so".to_string(), "*.dylib".to_string()]);
    }

    patterns
}

/// Directories (relative to the package folder) removed after install.
pub fn pruned_dirs(version: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from("bin"),
        Path::new("lib").join(format!("CLHEP-{}", version)),
        Path::new("lib").join("pkgconfig"),
    ]
}

/// Summary of a cleanup pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupReport {
    pub removed_dirs: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,
}

/// Prune an installed tree in place.
pub fn clean_installed_tree(package_dir: &Path, version: &str, shared: bool) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for dir in pruned_dirs(version) {
        let path = package_dir.join(&dir);
        if path.exists() {
            remove_dir_all_if_exists(&path)?;
            tracing::debug!("removed {}", path.display());
            report.removed_dirs.push(dir);
        }
    }

    let lib_dir = package_dir.join("lib");
    if !lib_dir.is_dir() {
        return Err(PackagingError::MissingLibDir { path: lib_dir }.into());
    }

    let patterns = artifact_deletion_set(version, shared);
    for file in glob_files(&lib_dir, &patterns)? {
        fs::remove_file(&file)
            .with_context(|| format!("failed to remove {}", file.display()))?;
        tracing::debug!("removed {}", file.display());
        report.removed_files.push(file);
    }

    tracing::info!(
        "Pruned {} director(ies) and {} file(s) from {}",
        report.removed_dirs.len(),
        report.removed_files.len(),
        package_dir.display()
    );

    Ok(report)
}

/// Check that every exported component library is present in `<package>/lib`.
///
/// Versioned shared-library names (`libfoo.so.1.2`) count as present.
pub fn verify_artifacts(package_dir: &Path, graph: &ComponentGraph, os: Os) -> Result<(), PackagingError> {
    let lib_dir = package_dir.join("lib");
    if !lib_dir.is_dir() {
        return Err(PackagingError::MissingLibDir { path: lib_dir });
    }

    // Windows DLLs land in bin, which is pruned; the import library stays.
    let ext = if os.is_windows() || !graph.is_shared() {
        os.static_lib_extension()
    } else {
        os.shared_lib_extension()
    };

    for component in graph.components() {
        for lib in &component.libs {
            let file = format!("{}{}.{}", os.lib_prefix(), lib, ext);

            let found = lib_dir.join(&file).exists()
                || glob_files(&lib_dir, &[format!("{}.*", file)])
                    .map(|v| !v.is_empty())
                    .unwrap_or(false);

            if !found {
                return Err(PackagingError::MissingArtifact {
                    component: component.key.clone(),
                    artifact: file,
                    dir: lib_dir,
                });
            }
        }
    }

    Ok(())
}

/// Discover linkable library names in `<package>/lib`.
///
/// Used by the flat export mode: `libfoo.a`, `libfoo.so.1` and `foo.lib`
/// all yield `foo`. Results are sorted and deduplicated.
pub fn collect_libs(package_dir: &Path) -> Result<Vec<String>> {
    let lib_dir = package_dir.join("lib");
    if !lib_dir.is_dir() {
        return Ok(Vec::new());
    }

    let re = Regex::new(r"^(?:lib)?(.+?)\.(?:a|so|dylib|lib)(?:\.[0-9.]+)?$")
        .context("invalid library name pattern")?;

    let mut libs = Vec::new();
    for entry in fs::read_dir(&lib_dir)
        .with_context(|| format!("failed to read directory: {}", lib_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(caps) = re.captures(&name) {
            libs.push(caps[1].to_string());
        }
    }

    libs.sort();
    libs.dedup();
    Ok(libs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::Pattern;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_deletion_set_static() {
        let patterns = artifact_deletion_set("2.4.1.3", false);
        assert!(patterns.contains(&"*CLHEP.*".to_string()));
        assert!(patterns.contains(&"*CLHEPS.*".to_string()));
        assert!(patterns.contains(&"*CLHEP-2.4.1.3.*".to_string()));
        assert!(patterns.contains(&"*CLHEPS-2.4.1.3.*".to_string()));
        assert!(patterns.contains(&"*.so".to_string()));
        assert!(patterns.contains(&"*.dylib".to_string()));
        assert!(!patterns.contains(&"*.a".to_string()));
        assert!(!patterns.contains(&"*CLHEP-MatrixS.*".to_string()));
    }

    #[test]
    fn test_deletion_set_shared() {
        let patterns = artifact_deletion_set("2.4.4.0", true);
        assert!(patterns.contains(&"*.a".to_string()));
        assert!(!patterns.contains(&"*.so".to_string()));
        assert!(!patterns.contains(&"*.dylib".to_string()));
    }

    #[test]
    fn test_deletion_set_spares_component_artifacts() {
        for os in [Os::Linux, Os::Macos, Os::Windows, Os::FreeBsd] {
            for shared in [true, false] {
                let graph = ComponentGraph::build("2.4.1.3", shared, os).unwrap();
                let patterns: Vec<Pattern> = artifact_deletion_set("2.4.1.3", shared)
                    .iter()
                    .map(|p| Pattern::new(p).unwrap())
                    .collect();

                for file in graph.artifact_files(os) {
                    for pattern in &patterns {
                        assert!(
                            !pattern.matches(&file),
                            "{} would delete {} ({}, shared={})",
                            pattern,
                            file,
                            os,
                            shared
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_deletion_set_hits_combined_library() {
        let patterns: Vec<Pattern> = artifact_deletion_set("2.4.1.3", false)
            .iter()
            .map(|p| Pattern::new(p).unwrap())
            .collect();

        for file in ["libCLHEPS.a", "libCLHEP-2.4.1.3.a", "libCLHEPS-2.4.1.3.a", "libCLHEP.so"] {
            assert!(patterns.iter().any(|p| p.matches(file)), "{} kept", file);
        }
    }

    #[test]
    fn test_clean_installed_tree() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path();
        touch(pkg, "bin/clhep-config");
        touch(pkg, "lib/CLHEP-2.4.1.3/CLHEPConfig.cmake");
        touch(pkg, "lib/pkgconfig/clhep.pc");
        touch(pkg, "lib/libCLHEP-VectorS-2.4.1.3.a");
        touch(pkg, "lib/libCLHEP-Vector-2.4.1.3.so");
        touch(pkg, "lib/libCLHEPS-2.4.1.3.a");
        touch(pkg, "lib/libCLHEP-2.4.1.3.so");
        touch(pkg, "include/CLHEP/Vector/ThreeVector.h");

        let report = clean_installed_tree(pkg, "2.4.1.3", false).unwrap();

        assert_eq!(report.removed_dirs.len(), 3);
        assert!(!pkg.join("bin").exists());
        assert!(!pkg.join("lib/pkgconfig").exists());
        assert!(pkg.join("lib/libCLHEP-VectorS-2.4.1.3.a").exists());
        assert!(!pkg.join("lib/libCLHEP-Vector-2.4.1.3.so").exists());
        assert!(!pkg.join("lib/libCLHEPS-2.4.1.3.a").exists());
        assert!(!pkg.join("lib/libCLHEP-2.4.1.3.so").exists());
        assert!(pkg.join("include/CLHEP/Vector/ThreeVector.h").exists());
    }

    #[test]
    fn test_clean_requires_lib_dir() {
        let tmp = TempDir::new().unwrap();
        let err = clean_installed_tree(tmp.path(), "2.4.1.3", true).unwrap_err();
        assert!(err.downcast_ref::<PackagingError>().is_some());
        assert!(err.to_string().contains("library directory not found"));
    }

    #[test]
    fn test_verify_artifacts() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path();
        let graph = ComponentGraph::build("2.4.1.3", false, Os::Linux).unwrap();

        for file in graph.artifact_files(Os::Linux) {
            touch(pkg, &format!("lib/{}", file));
        }
        assert!(verify_artifacts(pkg, &graph, Os::Linux).is_ok());

        fs::remove_file(pkg.join("lib/libCLHEP-MatrixS-2.4.1.3.a")).unwrap();
        let err = verify_artifacts(pkg, &graph, Os::Linux).unwrap_err();
        assert!(matches!(err, PackagingError::MissingArtifact { ref component, .. } if component == "matrix"));
    }

    #[test]
    fn test_verify_accepts_versioned_shared_objects() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path();
        let graph = ComponentGraph::build("2.4.1.3", true, Os::Linux).unwrap();

        for file in graph.artifact_files(Os::Linux) {
            touch(pkg, &format!("lib/{}.2", file));
        }
        assert!(verify_artifacts(pkg, &graph, Os::Linux).is_ok());
    }

    #[test]
    fn test_collect_libs() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path();
        touch(pkg, "lib/libCLHEP-Vector-2.4.1.3.so");
        touch(pkg, "lib/libCLHEP-Vector-2.4.1.3.so.1");
        touch(pkg, "lib/libCLHEP-Random-2.4.1.3.a");
        touch(pkg, "lib/CLHEP-Cast-2.4.1.3.lib");
        touch(pkg, "lib/README");
        touch(pkg, "lib/pkgconfig/clhep.pc");

        let libs = collect_libs(pkg).unwrap();
        assert_eq!(
            libs,
            vec![
                "CLHEP-Cast-2.4.1.3",
                "CLHEP-Random-2.4.1.3",
                "CLHEP-Vector-2.4.1.3",
            ]
        );
    }

    #[test]
    fn test_collect_libs_without_lib_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(collect_libs(tmp.path()).unwrap().is_empty());
    }
}
