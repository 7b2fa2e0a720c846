//! Package descriptor - one build configuration of the CLHEP recipe.
//!
//! A descriptor is created from a recipe, a version, the settings and the
//! requested options. Creation performs every configuration check, so an
//! invalid combination fails before anything is downloaded or built.
//!
//! The descriptor then drives four lifecycle hooks:
//! - [`source`](PackageDescriptor::source): fetch and unpack the sources
//! - [`build`](PackageDescriptor::build): patch, configure and compile
//! - [`package`](PackageDescriptor::package): install and prune the package folder
//! - [`package_info`](PackageDescriptor::package_info): export what consumers link

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::cmake::{BuildOrchestrator, CMakeConfiguration};
use crate::core::component::{Component, ComponentGraph};
use crate::core::error::ConfigError;
use crate::core::layout::{self, CleanupReport, LICENSE_DIR, LICENSE_PATTERN};
use crate::core::options::{resolve_options, OptionRequest, ResolvedOptions};
use crate::core::platform::{Os, Settings};
use crate::core::recipe::Recipe;
use crate::sources::archive::ArchiveProvider;
use crate::sources::patch::{PatchApplier, PatchFile};
use crate::util::fs::{ensure_dir, glob_files};
use crate::util::hash::ConfigDigest;

/// Fixed name of the directory holding the unpacked sources.
pub const SOURCE_SUBFOLDER: &str = "source_subfolder";

/// Fixed name of the CMake build directory.
pub const BUILD_SUBFOLDER: &str = "build_subfolder";

/// Context attached to source fetch failures.
pub const FETCH_CONTEXT: &str = "failed to fetch sources";

/// CMake package name exported for the whole library.
pub const CMAKE_PACKAGE_NAME: &str = "CLHEP";

/// pkg-config name exported for the whole library.
pub const PKG_CONFIG_NAME: &str = "clhep";

/// How the package describes itself to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeVariant {
    /// Per-component libraries, system libraries and requirements
    #[default]
    Components,
    /// One library list discovered from the installed tree
    Flat,
}

impl RecipeVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeVariant::Components => "components",
            RecipeVariant::Flat => "flat",
        }
    }

    /// Extra CMake toggles this variant passes to CLHEP's build.
    pub fn toggles(&self) -> &'static [(&'static str, bool)] {
        match self {
            RecipeVariant::Components => &[("CLHEP_SINGLE_THREAD", false), ("CLHEP_BUILD_DOCS", false)],
            RecipeVariant::Flat => &[],
        }
    }
}

/// Working directories of one build.
#[derive(Debug, Clone)]
pub struct Folders {
    /// Directory receiving `source_subfolder` and `build_subfolder`
    pub work_dir: PathBuf,
    /// Final package directory
    pub package_dir: PathBuf,
}

impl Folders {
    pub fn new(work_dir: impl Into<PathBuf>, package_dir: impl Into<PathBuf>) -> Self {
        Folders {
            work_dir: work_dir.into(),
            package_dir: package_dir.into(),
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.work_dir.join(SOURCE_SUBFOLDER)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.work_dir.join(BUILD_SUBFOLDER)
    }
}

/// What consumers link against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Exports {
    Components { components: Vec<Component> },
    Flat {
        libs: Vec<String>,
        system_libs: Vec<String>,
    },
}

/// The exported package surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub license: String,
    pub cmake_name: String,
    pub pkg_config_name: String,
    /// License files, relative to the package folder
    pub license_dir: PathBuf,
    pub options: ResolvedOptions,
    #[serde(flatten)]
    pub exports: Exports,
}

/// One build configuration of the recipe.
#[derive(Debug)]
pub struct PackageDescriptor {
    recipe: Recipe,
    version: String,
    settings: Settings,
    options: ResolvedOptions,
    variant: RecipeVariant,
    folders: Folders,
    generator: Option<String>,
    jobs: Option<usize>,
    /// Configured CMake tree, set by the first step that needs it
    cmake: OnceLock<CMakeConfiguration>,
}

impl PackageDescriptor {
    /// Validate a configuration and create its descriptor.
    pub fn new(
        recipe: Recipe,
        version: &str,
        settings: Settings,
        request: OptionRequest,
        folders: Folders,
    ) -> Result<Self, ConfigError> {
        let options = resolve_options(&settings, request)?;
        recipe.source_for(version)?;

        Ok(PackageDescriptor {
            recipe,
            version: version.to_string(),
            settings,
            options,
            variant: RecipeVariant::default(),
            folders,
            generator: None,
            jobs: None,
            cmake: OnceLock::new(),
        })
    }

    pub fn with_variant(mut self, variant: RecipeVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self) -> ResolvedOptions {
        self.options
    }

    pub fn variant(&self) -> RecipeVariant {
        self.variant
    }

    pub fn folders(&self) -> &Folders {
        &self.folders
    }

    /// Directory holding the top-level CMakeLists.txt.
    pub fn cmake_source_dir(&self) -> PathBuf {
        let source = self.folders.source_dir();
        match &self.recipe.package.cmake_subdir {
            Some(subdir) => source.join(subdir),
            None => source,
        }
    }

    /// The CMake configuration this descriptor builds with.
    pub fn cmake_configuration(&self) -> CMakeConfiguration {
        let mut config = CMakeConfiguration::new(
            self.cmake_source_dir(),
            self.folders.build_dir(),
            &self.folders.package_dir,
        )
        .build_type(self.settings.build_type)
        .generator(self.generator.clone())
        .jobs(self.jobs)
        .define("BUILD_SHARED_LIBS", self.options.shared);

        if let Some(fpic) = self.options.fpic {
            config = config.define("CMAKE_POSITION_INDEPENDENT_CODE", fpic);
        }

        for (name, value) in self.variant.toggles() {
            config = config.define(*name, *value);
        }

        config
    }

    /// Configure once and hand out the configured tree afterwards.
    fn configured(&self, orchestrator: &dyn BuildOrchestrator) -> Result<&CMakeConfiguration> {
        if let Some(config) = self.cmake.get() {
            return Ok(config);
        }

        let config = self.cmake_configuration();
        orchestrator.configure(&config)?;
        Ok(self.cmake.get_or_init(|| config))
    }

    /// Whether the CMake tree has been configured by this descriptor.
    pub fn is_configured(&self) -> bool {
        self.cmake.get().is_some()
    }

    /// Fetch the sources into `source_subfolder`.
    pub fn source(&self, provider: &dyn ArchiveProvider) -> Result<()> {
        let source = self.recipe.source_for(&self.version)?;
        let dest = self.folders.source_dir();

        tracing::info!(
            "Fetching {} {} via {}",
            self.recipe.package.name,
            self.version,
            provider.name()
        );
        provider
            .fetch(source, &dest)
            .with_context(|| format!("{} for {}", FETCH_CONTEXT, self.version))?;
        Ok(())
    }

    /// Apply the version's patches, then configure and compile.
    pub fn build(
        &self,
        patcher: &dyn PatchApplier,
        orchestrator: &dyn BuildOrchestrator,
    ) -> Result<()> {
        let patches: Vec<PatchFile> = self
            .recipe
            .patch_paths(&self.version)?
            .into_iter()
            .map(|(path, sha256)| PatchFile::new(path, sha256))
            .collect();
        patcher.apply(&patches, &self.folders.source_dir())?;

        let config = self.configured(orchestrator)?;
        orchestrator.build(config)
    }

    /// Install into the package folder and prune it.
    pub fn package(&self, orchestrator: &dyn BuildOrchestrator) -> Result<CleanupReport> {
        let package_dir = &self.folders.package_dir;

        self.copy_licenses()?;

        let config = self.configured(orchestrator)?;
        orchestrator.install(config)?;

        let report = layout::clean_installed_tree(package_dir, &self.version, self.options.shared)?;

        if self.variant == RecipeVariant::Components {
            let graph = self.component_graph()?;
            layout::verify_artifacts(package_dir, &graph, self.settings.os)?;
        }

        Ok(report)
    }

    fn copy_licenses(&self) -> Result<()> {
        let licenses = glob_files(&self.cmake_source_dir(), &[LICENSE_PATTERN.to_string()])?;
        if licenses.is_empty() {
            tracing::debug!("no license files found in {}", self.cmake_source_dir().display());
            return Ok(());
        }

        let dest = self.folders.package_dir.join(LICENSE_DIR);
        ensure_dir(&dest)?;
        for file in licenses {
            let Some(name) = file.file_name() else {
                continue;
            };
            std::fs::copy(&file, dest.join(name))
                .with_context(|| format!("failed to copy license {}", file.display()))?;
        }
        Ok(())
    }

    /// Glob patterns removed from `<package>/lib` after install.
    pub fn deletion_set(&self) -> Vec<String> {
        layout::artifact_deletion_set(&self.version, self.options.shared)
    }

    /// Component graph for this configuration.
    pub fn component_graph(&self) -> Result<ComponentGraph, ConfigError> {
        ComponentGraph::build(&self.version, self.options.shared, self.settings.os)
    }

    /// The surface exported to consumers.
    pub fn package_info(&self) -> Result<PackageInfo> {
        let exports = match self.variant {
            RecipeVariant::Components => Exports::Components {
                components: self.component_graph()?.all().to_vec(),
            },
            RecipeVariant::Flat => Exports::Flat {
                libs: layout::collect_libs(&self.folders.package_dir)?,
                system_libs: flat_system_libs(self.settings.os),
            },
        };

        Ok(PackageInfo {
            name: self.recipe.package.name.clone(),
            version: self.version.clone(),
            license: self.recipe.package.license.clone(),
            cmake_name: CMAKE_PACKAGE_NAME.to_string(),
            pkg_config_name: PKG_CONFIG_NAME.to_string(),
            license_dir: PathBuf::from(LICENSE_DIR),
            options: self.options,
            exports,
        })
    }

    /// Short identifier of this configuration (settings, options and version).
    ///
    /// Two descriptors with the same id produce interchangeable packages.
    pub fn package_id(&self) -> String {
        ConfigDigest::new()
            .field("name", &self.recipe.package.name)
            .field("version", &self.version)
            .field("os", self.settings.os.as_str())
            .field("arch", &self.settings.arch)
            .field("compiler", self.settings.compiler.as_str())
            .field("build_type", self.settings.build_type.as_str())
            .opt_field("cppstd", self.settings.cppstd)
            .field("shared", self.options.shared)
            .opt_field("fPIC", self.options.fpic)
            .field("variant", self.variant.as_str())
            .finish()
    }
}

fn flat_system_libs(os: Os) -> Vec<String> {
    if os == Os::Linux {
        vec!["m".to_string(), "pthread".to_string()]
    } else {
        Vec::new()
    }
}

/// Resolve a package folder argument relative to a working directory.
pub fn package_dir_in(work_dir: &Path, package_dir: Option<&Path>) -> PathBuf {
    match package_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => work_dir.join(dir),
        None => work_dir.join("package"),
    }
}
