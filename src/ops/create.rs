//! `create` - run the whole recipe lifecycle for one configuration.
//!
//! source -> build -> package -> package_info, with the package folder
//! written under the output directory and the exported surface saved next
//! to it as `package_info.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::builder::cmake::{BuildOrchestrator, CMakeBuilder};
use crate::core::descriptor::{package_dir_in, Folders, PackageDescriptor, PackageInfo, RecipeVariant};
use crate::core::layout::{CleanupReport, LICENSE_DIR};
use crate::core::options::{resolve_options, OptionRequest};
use crate::core::platform::Settings;
use crate::ops::inspect::{load_recipe, select_version};
use crate::sources::archive::{ArchiveProvider, TarballProvider};
use crate::sources::patch::{GitApply, PatchApplier};
use crate::util::config::Config;
use crate::util::fs::{list_files, write_string};
use crate::util::shell::{Shell, Status};

/// File (in the output directory) receiving the exported surface.
pub const PACKAGE_INFO_FILE: &str = "package_info.json";

/// Options for `create`.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Recipe file (bundled recipe when `None`)
    pub recipe: Option<PathBuf>,
    /// Version to build (newest when `None`)
    pub version: Option<String>,
    pub settings: Settings,
    pub request: OptionRequest,
    pub variant: RecipeVariant,
    /// Directory receiving sources, build tree and package
    pub output: PathBuf,
    /// Package folder, relative to `output` unless absolute
    pub package_dir: Option<PathBuf>,
    pub config: Config,
}

/// Outcome of a successful `create`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateResult {
    pub package_id: String,
    pub package_dir: PathBuf,
    pub cleanup: CleanupReport,
    /// Files left in the package folder, relative to it
    pub files: Vec<PathBuf>,
    pub info: PackageInfo,
}

/// Backends used by the lifecycle steps.
pub struct Backends<'a> {
    pub archive: &'a dyn ArchiveProvider,
    pub patcher: &'a dyn PatchApplier,
    pub orchestrator: &'a dyn BuildOrchestrator,
}

/// Run the lifecycle with the default backends (HTTP tarballs, `git apply`, CMake).
pub fn create(opts: &CreateOptions, shell: &Shell) -> Result<CreateResult> {
    // Reject invalid configurations before looking for tools.
    resolve_options(&opts.settings, opts.request)?;

    let mut archive = TarballProvider::new().offline(opts.config.net.offline);
    if let Some(cache) = opts.config.cache_dir() {
        archive = archive.with_cache_dir(cache);
    }
    let orchestrator = CMakeBuilder::new()?;

    let backends = Backends {
        archive: &archive,
        patcher: &GitApply,
        orchestrator: &orchestrator,
    };
    create_with(opts, shell, &backends)
}

/// Run the lifecycle with explicit backends.
pub fn create_with(opts: &CreateOptions, shell: &Shell, backends: &Backends<'_>) -> Result<CreateResult> {
    let recipe = load_recipe(opts.recipe.as_deref())?;
    let version = select_version(&recipe, opts.version.as_deref())?;

    let mut settings = opts.settings.clone();
    if let Some(build_type) = opts.config.build_type()? {
        settings = settings.with_build_type(build_type);
    }

    let package_dir = package_dir_in(&opts.output, opts.package_dir.as_deref());
    let folders = Folders::new(&opts.output, &package_dir);

    // Validation happens here, before anything is fetched.
    let desc = PackageDescriptor::new(recipe, &version, settings, opts.request, folders)?
        .with_variant(opts.variant)
        .with_generator(opts.config.build.generator.clone())
        .with_jobs(opts.config.build.jobs);

    let package_id = desc.package_id();
    tracing::info!("Creating clhep/{} (package {})", version, package_id);

    let progress = shell.progress(4);

    progress.set_message("source");
    shell.status(Status::Fetching, format!("clhep {} via {}", version, backends.archive.name()));
    desc.source(backends.archive)?;
    progress.inc();

    progress.set_message("build");
    shell.status(Status::Building, format!("clhep {} ({})", version, desc.settings().build_type.as_str()));
    desc.build(backends.patcher, backends.orchestrator)?;
    progress.inc();

    progress.set_message("package");
    shell.status(Status::Packaging, package_dir.display());
    let cleanup = desc.package(backends.orchestrator)?;
    if !package_dir.join(LICENSE_DIR).is_dir() {
        shell.warn(format!("no license files in the clhep {} sources, none packaged", version));
    }
    progress.inc();

    progress.set_message("package_info");
    let info = desc.package_info()?;
    let json = serde_json::to_string_pretty(&info).context("failed to serialize package info")?;
    write_string(&opts.output.join(PACKAGE_INFO_FILE), &json)?;
    progress.inc();
    progress.finish();

    for file in &cleanup.removed_files {
        tracing::debug!("removed {}", file.display());
    }
    shell.status(
        Status::Removed,
        format!(
            "{} director(ies) and {} file(s) not exported",
            cleanup.removed_dirs.len(),
            cleanup.removed_files.len()
        ),
    );

    let files = list_files(&package_dir)?;
    shell.status(
        Status::Finished,
        format!("clhep/{} package {} ({} files)", version, package_id, files.len()),
    );

    Ok(CreateResult {
        package_id,
        package_dir,
        cleanup,
        files,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;

    use crate::builder::cmake::CMakeConfiguration;
    use crate::core::component::ComponentGraph;
    use crate::core::descriptor::Exports;
    use crate::core::error::ConfigError;
    use crate::core::platform::{Compiler, Os};
    use crate::core::recipe::VersionSource;
    use crate::sources::patch::PatchFile;
    use tempfile::TempDir;

    struct FakeArchive {
        fetched: Cell<bool>,
        licensed: bool,
    }

    impl FakeArchive {
        fn new() -> Self {
            FakeArchive {
                fetched: Cell::new(false),
                licensed: true,
            }
        }
    }

    impl ArchiveProvider for FakeArchive {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch(&self, _source: &VersionSource, dest: &Path) -> Result<()> {
            self.fetched.set(true);
            std::fs::create_dir_all(dest.join("CLHEP"))?;
            std::fs::write(dest.join("CLHEP/CMakeLists.txt"), "project(CLHEP)")?;
            if self.licensed {
                std::fs::write(dest.join("CLHEP/COPYING.LESSER"), "LGPL")?;
            }
            Ok(())
        }
    }

    struct NoPatches;

    impl PatchApplier for NoPatches {
        fn apply(&self, _patches: &[PatchFile], _source_dir: &Path) -> Result<()> {
            Ok(())
        }
    }

    /// Installs the component libraries of both build modes plus the extras CMake ships.
    struct FakeInstall {
        version: String,
    }

    impl BuildOrchestrator for FakeInstall {
        fn configure(&self, _config: &CMakeConfiguration) -> Result<()> {
            Ok(())
        }

        fn build(&self, _config: &CMakeConfiguration) -> Result<()> {
            Ok(())
        }

        fn install(&self, config: &CMakeConfiguration) -> Result<()> {
            let lib = config.install_prefix.join("lib");
            std::fs::create_dir_all(lib.join("pkgconfig"))?;
            std::fs::create_dir_all(config.install_prefix.join("bin"))?;
            std::fs::write(config.install_prefix.join("bin/clhep-config"), "")?;
            for shared in [false, true] {
                let graph = ComponentGraph::build(&self.version, shared, Os::Linux)?;
                for file in graph.artifact_files(Os::Linux) {
                    std::fs::write(lib.join(file), "")?;
                }
            }
            std::fs::write(lib.join(format!("libCLHEP-{}.a", self.version)), "")?;
            Ok(())
        }
    }

    fn opts(tmp: &TempDir, settings: Settings, shared: bool) -> CreateOptions {
        CreateOptions {
            recipe: None,
            version: Some("2.4.1.3".to_string()),
            settings,
            request: OptionRequest::shared(shared),
            variant: RecipeVariant::Components,
            output: tmp.path().to_path_buf(),
            package_dir: None,
            config: Config::default(),
        }
    }

    #[test]
    fn test_create_static_linux() {
        let tmp = TempDir::new().unwrap();
        let archive = FakeArchive::new();
        let install = FakeInstall { version: "2.4.1.3".to_string() };
        let backends = Backends {
            archive: &archive,
            patcher: &NoPatches,
            orchestrator: &install,
        };

        let result = create_with(&opts(&tmp, Settings::new(Os::Linux), false), &Shell::quiet(), &backends).unwrap();

        assert_eq!(result.package_dir, tmp.path().join("package"));
        assert!(result.files.contains(&PathBuf::from("lib/libCLHEP-VectorS-2.4.1.3.a")));
        assert!(result.files.contains(&PathBuf::from("licenses/COPYING.LESSER")));
        assert!(!result.files.iter().any(|f| f.extension().is_some_and(|e| e == "so")));
        assert!(!result.files.iter().any(|f| f.starts_with("bin")));
        assert!(!result.package_dir.join("lib/libCLHEP-2.4.1.3.a").exists());

        let saved = std::fs::read_to_string(tmp.path().join(PACKAGE_INFO_FILE)).unwrap();
        let saved: PackageInfo = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved, result.info);
        assert!(matches!(saved.exports, Exports::Components { .. }));
    }

    #[test]
    fn test_create_rejects_before_fetching() {
        let tmp = TempDir::new().unwrap();
        let archive = FakeArchive::new();
        let install = FakeInstall { version: "2.4.1.3".to_string() };
        let backends = Backends {
            archive: &archive,
            patcher: &NoPatches,
            orchestrator: &install,
        };
        let settings = Settings::new(Os::Windows).with_compiler(Compiler::Msvc);

        let err = create_with(&opts(&tmp, settings, true), &Shell::quiet(), &backends).unwrap_err();

        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::SharedMsvc)));
        assert!(!archive.fetched.get());
    }

    #[test]
    fn test_config_build_type_applies() {
        let tmp = TempDir::new().unwrap();
        let archive = FakeArchive::new();
        let install = FakeInstall { version: "2.4.1.3".to_string() };
        let backends = Backends {
            archive: &archive,
            patcher: &NoPatches,
            orchestrator: &install,
        };

        let mut release = opts(&tmp, Settings::new(Os::Linux), true);
        let mut debug = release.clone();
        debug.config.build.build_type = Some("Debug".to_string());
        debug.output = tmp.path().join("debug");
        release.output = tmp.path().join("release");

        let a = create_with(&release, &Shell::quiet(), &backends).unwrap();
        let b = create_with(&debug, &Shell::quiet(), &backends).unwrap();
        assert_ne!(a.package_id, b.package_id);
        assert!(b.files.contains(&PathBuf::from("lib/libCLHEP-Vector-2.4.1.3.so")));
    }

    #[test]
    fn test_create_without_license_files() {
        let tmp = TempDir::new().unwrap();
        let archive = FakeArchive {
            licensed: false,
            ..FakeArchive::new()
        };
        let install = FakeInstall { version: "2.4.1.3".to_string() };
        let backends = Backends {
            archive: &archive,
            patcher: &NoPatches,
            orchestrator: &install,
        };

        let result = create_with(&opts(&tmp, Settings::new(Os::Linux), false), &Shell::quiet(), &backends).unwrap();

        assert!(!result.package_dir.join(LICENSE_DIR).exists());
        assert!(!result.files.iter().any(|f| f.starts_with(LICENSE_DIR)));
    }

    #[test]
    fn test_invalid_config_build_type_stops_create() {
        let tmp = TempDir::new().unwrap();
        let archive = FakeArchive::new();
        let install = FakeInstall { version: "2.4.1.3".to_string() };
        let backends = Backends {
            archive: &archive,
            patcher: &NoPatches,
            orchestrator: &install,
        };

        let mut opts = opts(&tmp, Settings::new(Os::Linux), false);
        opts.config.build.build_type = Some("Relase".to_string());

        let err = create_with(&opts, &Shell::quiet(), &backends).unwrap_err();
        assert!(err.to_string().contains("build.build_type"));
        assert!(!archive.fetched.get());
    }
}
