//! Read-only reports about a build configuration.
//!
//! Nothing here touches the network or runs a build tool; every report is
//! derived from the recipe, the settings and the resolved options.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::descriptor::{Exports, Folders, PackageDescriptor, PackageInfo, RecipeVariant};
use crate::core::layout;
use crate::core::options::{resolve_options, OptionRequest, ResolvedOptions};
use crate::core::platform::{Compiler, Os, Settings};
use crate::core::recipe::Recipe;

/// Load the recipe at `path`, or the bundled one.
pub fn load_recipe(path: Option<&Path>) -> Result<Recipe> {
    match path {
        Some(path) => Recipe::load(path),
        None => Recipe::bundled(),
    }
}

/// The requested version, defaulting to the newest one in the recipe.
pub fn select_version(recipe: &Recipe, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(v) => {
            recipe.source_for(v)?;
            Ok(v.to_string())
        }
        None => recipe
            .latest_version()
            .context("recipe does not list any versions"),
    }
}

/// Resolved options for a set of settings.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsReport {
    pub os: Os,
    pub compiler: Compiler,
    pub options: ResolvedOptions,
}

pub fn options_report(settings: &Settings, request: OptionRequest) -> Result<OptionsReport> {
    let options = resolve_options(settings, request)?;
    Ok(OptionsReport {
        os: settings.os,
        compiler: settings.compiler,
        options,
    })
}

/// Format an options report, one `name=value` line per present option.
pub fn format_options(report: &OptionsReport) -> String {
    let mut out = format!("shared={}\n", report.options.shared);
    if let Some(fpic) = report.options.fpic {
        out.push_str(&format!("fPIC={}\n", fpic));
    }
    out
}

/// Parameters of an `info` report.
#[derive(Debug, Clone)]
pub struct InfoOptions {
    pub recipe: Option<PathBuf>,
    pub version: Option<String>,
    pub settings: Settings,
    pub request: OptionRequest,
    pub variant: RecipeVariant,
    /// Installed package folder, read by the flat variant
    pub package_dir: Option<PathBuf>,
}

/// Exported surface of a configuration, with its link order.
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub package_id: String,
    /// Display names, dependents before their requirements
    pub link_order: Vec<String>,
    #[serde(flatten)]
    pub info: PackageInfo,
}

pub fn info(opts: &InfoOptions) -> Result<InfoReport> {
    let recipe = load_recipe(opts.recipe.as_deref())?;
    let version = select_version(&recipe, opts.version.as_deref())?;

    let package_dir = opts
        .package_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("package"));
    let folders = Folders::new(".", package_dir);

    let desc = PackageDescriptor::new(
        recipe,
        &version,
        opts.settings.clone(),
        opts.request,
        folders,
    )?
    .with_variant(opts.variant);

    let link_order = match desc.variant() {
        RecipeVariant::Components => desc
            .component_graph()?
            .link_order()
            .into_iter()
            .map(|c| c.display_name.clone())
            .collect(),
        RecipeVariant::Flat => Vec::new(),
    };

    Ok(InfoReport {
        package_id: desc.package_id(),
        link_order,
        info: desc.package_info()?,
    })
}

/// Human-readable form of an `info` report.
pub fn format_info(report: &InfoReport) -> String {
    let info = &report.info;

    let mut out = format!("{} {} (package {})\n", info.name, info.version, report.package_id);
    out.push_str(&format!("license: {}\n", info.license));
    out.push_str(&format!("options: shared={}", info.options.shared));
    if let Some(fpic) = info.options.fpic {
        out.push_str(&format!(" fPIC={}", fpic));
    }
    out.push('\n');
    out.push_str(&format!(
        "cmake: {}  pkg-config: {}\n",
        info.cmake_name, info.pkg_config_name
    ));

    match &info.exports {
        Exports::Components { components } => {
            out.push_str("components:\n");
            for c in components {
                out.push_str(&format!("  {:<12} {}", c.key, c.display_name));
                if let Some(pc) = &c.pkg_config_name {
                    out.push_str(&format!(" ({})", pc));
                }
                out.push('\n');
                if !c.libs.is_empty() {
                    out.push_str(&format!("      libs: {}\n", c.libs.join(", ")));
                }
                if !c.system_libs.is_empty() {
                    out.push_str(&format!("      system libs: {}\n", c.system_libs.join(", ")));
                }
                if !c.requires.is_empty() {
                    out.push_str(&format!("      requires: {}\n", c.requires.join(", ")));
                }
            }
            out.push_str(&format!("link order: {}\n", report.link_order.join(" ")));
        }
        Exports::Flat { libs, system_libs } => {
            if libs.is_empty() {
                out.push_str("libs: (none installed)\n");
            } else {
                out.push_str(&format!("libs: {}\n", libs.join(", ")));
            }
            if !system_libs.is_empty() {
                out.push_str(&format!("system libs: {}\n", system_libs.join(", ")));
            }
        }
    }

    out
}

/// What the package step removes from an installed tree.
#[derive(Debug, Clone, Serialize)]
pub struct CleanPatterns {
    pub version: String,
    pub shared: bool,
    /// Glob patterns relative to `<package>/lib`
    pub lib_patterns: Vec<String>,
    /// Directories relative to the package folder
    pub pruned_dirs: Vec<PathBuf>,
}

pub fn clean_patterns(recipe: &Recipe, version: Option<&str>, shared: bool) -> Result<CleanPatterns> {
    let version = select_version(recipe, version)?;
    Ok(CleanPatterns {
        lib_patterns: layout::artifact_deletion_set(&version, shared),
        pruned_dirs: layout::pruned_dirs(&version),
        version,
        shared,
    })
}

pub fn format_clean_patterns(patterns: &CleanPatterns) -> String {
    let mut out = String::new();
    for dir in &patterns.pruned_dirs {
        out.push_str(&format!("{}/\n", dir.display()));
    }
    for pattern in &patterns.lib_patterns {
        out.push_str(&format!("lib/{}\n", pattern));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ConfigError;

    fn info_opts(os: Os, shared: bool) -> InfoOptions {
        InfoOptions {
            recipe: None,
            version: Some("2.4.1.3".to_string()),
            settings: Settings::new(os),
            request: OptionRequest::shared(shared),
            variant: RecipeVariant::Components,
            package_dir: None,
        }
    }

    #[test]
    fn test_options_report() {
        let report = options_report(&Settings::new(Os::Linux), OptionRequest::shared(false)).unwrap();
        assert_eq!(format_options(&report), "shared=false\nfPIC=true\n");

        let report = options_report(&Settings::new(Os::Windows), OptionRequest::shared(false)).unwrap();
        assert_eq!(format_options(&report), "shared=false\n");
    }

    #[test]
    fn test_options_report_rejects_mingw() {
        let settings = Settings::new(Os::Windows).with_compiler(Compiler::Gcc);
        let err = options_report(&settings, OptionRequest::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::MinGw)));
    }

    #[test]
    fn test_select_version_defaults_to_latest() {
        let recipe = Recipe::bundled().unwrap();
        assert_eq!(select_version(&recipe, None).unwrap(), "2.4.4.0");
        assert!(select_version(&recipe, Some("1.0.0.0")).is_err());
    }

    #[test]
    fn test_info_static_linux() {
        let report = info(&info_opts(Os::Linux, false)).unwrap();

        assert_eq!(report.link_order.first().map(String::as_str), Some("CLHEPS"));
        let pos = |name: &str| report.link_order.iter().position(|n| n == name).unwrap();
        assert!(pos("MatrixS") < pos("VectorS"));
        assert!(pos("ExceptionsS") < pos("CastS"));

        let text = format_info(&report);
        assert!(text.starts_with("clhep 2.4.1.3"));
        assert!(text.contains("options: shared=false fPIC=true"));
        assert!(text.contains("libs: CLHEP-MatrixS-2.4.1.3"));
        assert!(text.contains("requires: random, vector"));
        assert!(text.contains("  matrix       MatrixS (clhep-matrix)\n"));
        assert!(!text.contains("MatrixS MatrixS"));
    }

    #[test]
    fn test_info_json_shape() {
        let report = info(&info_opts(Os::Macos, true)).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["mode"], "components");
        assert_eq!(json["version"], "2.4.1.3");
        assert_eq!(json["package_id"].as_str().unwrap().len(), 16);
        assert_eq!(json["link_order"][0], "CLHEP");
    }

    #[test]
    fn test_info_flat_without_install() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut opts = info_opts(Os::Linux, true);
        opts.variant = RecipeVariant::Flat;
        opts.package_dir = Some(tmp.path().to_path_buf());

        let report = info(&opts).unwrap();
        assert!(report.link_order.is_empty());
        assert!(format_info(&report).contains("libs: (none installed)"));
    }

    #[test]
    fn test_clean_patterns() {
        let recipe = Recipe::bundled().unwrap();
        let patterns = clean_patterns(&recipe, Some("2.4.1.3"), true).unwrap();
        let text = format_clean_patterns(&patterns);

        assert!(text.contains("bin/\n"));
        assert!(text.contains("lib/CLHEP-2.4.1.3/\n"));
        assert!(text.contains("lib/*CLHEPS-2.4.1.3.*\n"));
        assert!(text.contains("lib/*.a\n"));
        assert!(!text.contains("lib/*.so\n"));
    }
}
