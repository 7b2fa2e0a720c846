//! Recipe file parsing.
//!
//! A recipe is a TOML file holding package metadata and, per version, where
//! to fetch the sources and which patches to apply. The CLHEP recipe ships
//! with the crate (see [`Recipe::bundled`]); a different file can be loaded
//! to add versions or patches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::util::hash::parse_checksum;

const BUNDLED_RECIPE: &str = include_str!("../../recipes/clhep.toml");

/// A parsed recipe file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: RecipeMetadata,

    /// Sources keyed by version string
    #[serde(default)]
    pub versions: BTreeMap<String, VersionSource>,

    /// Directory patch paths are resolved against
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

/// Package metadata in a recipe file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMetadata {
    /// Package name (must be lowercase [a-z0-9_-])
    pub name: String,

    pub description: String,

    /// SPDX license identifier
    pub license: String,

    #[serde(default)]
    pub homepage: Option<String>,

    /// Where the recipe itself is maintained
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    /// Directory inside the sources holding the top-level CMakeLists.txt
    #[serde(default)]
    pub cmake_subdir: Option<String>,
}

/// Where to fetch one version from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSource {
    /// Download URL of the source tarball
    pub url: String,

    /// SHA256 hash of the tarball
    pub sha256: String,

    /// Directory prefix to strip from the tarball (e.g., "2.4.1.3")
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Patches to apply in order
    #[serde(default)]
    pub patches: Vec<RecipePatch>,
}

/// A patch to apply to the sources before building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipePatch {
    /// Path to patch file, relative to the recipe's directory
    pub file: String,

    /// SHA256 hash of the patch file bytes
    pub sha256: String,
}

impl Recipe {
    /// The CLHEP recipe shipped with this crate.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_RECIPE, Path::new("recipes/clhep.toml"))
    }

    /// Load and parse a recipe file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe file: {}", path.display()))?;

        let mut recipe = Self::parse(&content, path)?;
        recipe.root = path.parent().map(Path::to_path_buf);
        Ok(recipe)
    }

    /// Parse a recipe from TOML content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut recipe: Recipe = toml::from_str(content)
            .with_context(|| format!("failed to parse recipe file: {}", path.display()))?;

        recipe
            .validate()
            .with_context(|| format!("invalid recipe file: {}", path.display()))?;
        recipe.normalize_checksums();
        Ok(recipe)
    }

    /// Store every checksum in the lowercase form hashing produces.
    fn normalize_checksums(&mut self) {
        for source in self.versions.values_mut() {
            if let Some(sha256) = parse_checksum(&source.sha256) {
                source.sha256 = sha256;
            }
            for patch in &mut source.patches {
                if let Some(sha256) = parse_checksum(&patch.sha256) {
                    patch.sha256 = sha256;
                }
            }
        }
    }

    /// Validate the recipe contents.
    pub fn validate(&self) -> Result<()> {
        validate_package_name(&self.package.name)?;

        let version_re = Regex::new(r"^[0-9]+(\.[0-9]+)*$").context("invalid version pattern")?;

        for (version, source) in &self.versions {
            if !version_re.is_match(version) {
                bail!("invalid version '{}': expected dot-separated numbers", version);
            }

            url::Url::parse(&source.url)
                .with_context(|| format!("invalid source URL '{}' for {}", source.url, version))?;

            if parse_checksum(&source.sha256).is_none() {
                bail!(
                    "sha256 for {} must be a 64-character hex string, got '{}'",
                    version,
                    source.sha256
                );
            }

            for patch in &source.patches {
                if parse_checksum(&patch.sha256).is_none() {
                    bail!(
                        "patch sha256 must be a 64-character hex string for '{}', got '{}'",
                        patch.file,
                        patch.sha256
                    );
                }
            }
        }

        Ok(())
    }

    /// Sources for a version, or a configuration error listing what exists.
    pub fn source_for(&self, version: &str) -> Result<&VersionSource, ConfigError> {
        self.versions
            .get(version)
            .ok_or_else(|| ConfigError::UnknownVersion {
                version: version.to_string(),
                available: self.available_versions(),
            })
    }

    /// All versions the recipe knows, in ascending order.
    pub fn available_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.versions.keys().cloned().collect();
        versions.sort_by_key(|v| version_key(v));
        versions
    }

    /// The newest version the recipe knows.
    pub fn latest_version(&self) -> Option<String> {
        self.available_versions().pop()
    }

    /// Absolute paths of the patch files for a version.
    pub fn patch_paths(&self, version: &str) -> Result<Vec<(PathBuf, String)>> {
        let source = self.source_for(version)?;
        let root = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
        Ok(source
            .patches
            .iter()
            .map(|p| (root.join(&p.file), p.sha256.clone()))
            .collect())
    }
}

/// Numeric sort key for a dotted version string.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Validate a package name.
///
/// Package names must be:
/// - Lowercase only
/// - Characters: [a-z0-9_-]
/// - Non-empty
/// - First character must be [a-z]
pub fn validate_package_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        bail!("package name cannot be empty");
    };

    if !first_char.is_ascii_lowercase() {
        bail!(
            "invalid package name '{}': must start with lowercase letter [a-z]",
            name
        );
    }

    for c in name.chars() {
        if !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-') {
            bail!(
                "invalid package name '{}': only [a-z0-9_-] allowed, found '{}'",
                name,
                c
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HASH: &str = "9a93b2b7dfdac77ceba5a558a580e74667dd6fede4585b91eefb60f03b72df23";

    fn recipe_with(versions: &str) -> String {
        format!(
            r#"
[package]
name = "clhep"
description = "Class Library for High Energy Physics."
license = "LGPL-3.0-only"
{}
"#,
            versions
        )
    }

    #[test]
    fn test_bundled_recipe() {
        let recipe = Recipe::bundled().unwrap();
        assert_eq!(recipe.package.name, "clhep");
        assert_eq!(recipe.package.license, "LGPL-3.0-only");
        assert_eq!(recipe.package.cmake_subdir.as_deref(), Some("CLHEP"));

        let source = recipe.source_for("2.4.1.3").unwrap();
        assert_eq!(source.strip_prefix.as_deref(), Some("2.4.1.3"));
        assert!(source.url.ends_with("clhep-2.4.1.3.tgz"));
    }

    #[test]
    fn test_validate_package_name() {
        assert!(validate_package_name("clhep").is_ok());
        assert!(validate_package_name("my-lib_2").is_ok());

        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("CLHEP").is_err());
        assert!(validate_package_name("2clhep").is_err());
        assert!(validate_package_name("my.lib").is_err());
    }

    #[test]
    fn test_unknown_version() {
        let recipe = Recipe::bundled().unwrap();
        let err = recipe.source_for("1.0.0.0").unwrap_err();
        match err {
            ConfigError::UnknownVersion { version, available } => {
                assert_eq!(version, "1.0.0.0");
                assert!(available.contains(&"2.4.1.3".to_string()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_versions_sort_numerically() {
        let content = recipe_with(&format!(
            r#"
[versions."2.4.10.0"]
url = "https://example.com/a.tgz"
sha256 = "{h}"

[versions."2.4.9.1"]
url = "https://example.com/b.tgz"
sha256 = "{h}"
"#,
            h = HASH
        ));
        let recipe = Recipe::parse(&content, Path::new("r.toml")).unwrap();
        assert_eq!(recipe.available_versions(), vec!["2.4.9.1", "2.4.10.0"]);
        assert_eq!(recipe.latest_version().as_deref(), Some("2.4.10.0"));
    }

    #[test]
    fn test_invalid_sha256() {
        let content = recipe_with(
            r#"
[versions."2.4.1.3"]
url = "https://example.com/a.tgz"
sha256 = "abc123"
"#,
        );
        let err = Recipe::parse(&content, Path::new("r.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("64-character hex"));
    }

    #[test]
    fn test_uppercase_checksums_are_normalized() {
        let upper = HASH.to_ascii_uppercase();
        let content = recipe_with(&format!(
            r#"
[versions."2.4.1.3"]
url = "https://example.com/a.tgz"
sha256 = "{h}"

[[versions."2.4.1.3".patches]]
file = "fix.patch"
sha256 = "{h}"
"#,
            h = upper
        ));

        let recipe = Recipe::parse(&content, Path::new("r.toml")).unwrap();
        let source = recipe.source_for("2.4.1.3").unwrap();
        assert_eq!(source.sha256, HASH);
        assert_eq!(recipe.patch_paths("2.4.1.3").unwrap()[0].1, HASH);
    }

    #[test]
    fn test_invalid_version_string() {
        let content = recipe_with(&format!(
            r#"
[versions."latest"]
url = "https://example.com/a.tgz"
sha256 = "{}"
"#,
            HASH
        ));
        let err = Recipe::parse(&content, Path::new("r.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid version 'latest'"));
    }

    #[test]
    fn test_patch_paths_resolve_against_recipe_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clhep.toml");
        std::fs::write(
            &path,
            recipe_with(&format!(
                r#"
[versions."2.4.1.3"]
url = "https://example.com/a.tgz"
sha256 = "{h}"

[[versions."2.4.1.3".patches]]
file = "patches/0001-fix-cmake.patch"
sha256 = "{h}"
"#,
                h = HASH
            )),
        )
        .unwrap();

        let recipe = Recipe::load(&path).unwrap();
        let patches = recipe.patch_paths("2.4.1.3").unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, tmp.path().join("patches/0001-fix-cmake.patch"));
        assert_eq!(patches[0].1, HASH);
    }
}
