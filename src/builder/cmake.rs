//! CMake driver for the packaged sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::platform::BuildType;
use crate::util::diagnostic::suggestions;
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, ProcessBuilder};

/// Value of a `-D` cache definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Bool(bool),
    String(String),
}

impl Definition {
    /// Render the value the way CMake expects it on the command line.
    pub fn to_cmake(&self) -> String {
        match self {
            Definition::Bool(true) => "ON".to_string(),
            Definition::Bool(false) => "OFF".to_string(),
            Definition::String(s) => s.clone(),
        }
    }
}

impl From<bool> for Definition {
    fn from(b: bool) -> Self {
        Definition::Bool(b)
    }
}

impl From<&str> for Definition {
    fn from(s: &str) -> Self {
        Definition::String(s.to_string())
    }
}

/// Everything needed to configure, build and install one CMake tree.
#[derive(Debug, Clone)]
pub struct CMakeConfiguration {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub install_prefix: PathBuf,
    pub build_type: BuildType,
    /// Generator override (e.g., "Ninja")
    pub generator: Option<String>,
    /// Parallel build jobs (`None` lets the generator decide)
    pub jobs: Option<usize>,
    pub definitions: BTreeMap<String, Definition>,
}

impl CMakeConfiguration {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        install_prefix: impl Into<PathBuf>,
    ) -> Self {
        CMakeConfiguration {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            install_prefix: install_prefix.into(),
            build_type: BuildType::default(),
            generator: None,
            jobs: None,
            definitions: BTreeMap::new(),
        }
    }

    /// Set a cache definition.
    pub fn define(mut self, name: impl Into<String>, value: impl Into<Definition>) -> Self {
        self.definitions.insert(name.into(), value.into());
        self
    }

    pub fn build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Arguments of the configure step.
    pub fn configure_args(&self) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            self.source_dir.display().to_string(),
            "-B".to_string(),
            self.build_dir.display().to_string(),
        ];

        if let Some(generator) = &self.generator {
            args.push("-G".to_string());
            args.push(generator.clone());
        }

        args.push(format!("-DCMAKE_BUILD_TYPE={}", self.build_type.as_str()));
        args.push(format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            self.install_prefix.display()
        ));

        for (name, value) in &self.definitions {
            args.push(format!("-D{}={}", name, value.to_cmake()));
        }

        args
    }

    /// Arguments of the build step.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--build".to_string(),
            self.build_dir.display().to_string(),
            // Multi-config generators (Visual Studio, Xcode) ignore CMAKE_BUILD_TYPE
            "--config".to_string(),
            self.build_type.as_str().to_string(),
        ];

        args.push("--parallel".to_string());
        if let Some(jobs) = self.jobs {
            args.push(jobs.to_string());
        }

        args
    }

    /// Arguments of the install step.
    pub fn install_args(&self) -> Vec<String> {
        vec![
            "--install".to_string(),
            self.build_dir.display().to_string(),
            "--config".to_string(),
            self.build_type.as_str().to_string(),
        ]
    }
}

/// Configures, compiles and installs a source tree.
pub trait BuildOrchestrator {
    /// Run the configure step.
    fn configure(&self, config: &CMakeConfiguration) -> Result<()>;

    /// Compile a configured tree.
    fn build(&self, config: &CMakeConfiguration) -> Result<()>;

    /// Install a built tree into its install prefix.
    fn install(&self, config: &CMakeConfiguration) -> Result<()>;
}

/// Runs the `cmake` executable.
#[derive(Debug, Clone)]
pub struct CMakeBuilder {
    cmake: PathBuf,
}

impl CMakeBuilder {
    /// Locate CMake on PATH.
    pub fn new() -> Result<Self> {
        let Some(cmake) = find_cmake() else {
            bail!(
                "CMake not found\n\
                 \n\
                 CMake is required to build CLHEP.\n\
                 {}",
                suggestions::CMAKE_MISSING
            );
        };
        Ok(CMakeBuilder { cmake })
    }

    /// Use a specific CMake executable.
    pub fn with_program(cmake: impl Into<PathBuf>) -> Self {
        CMakeBuilder {
            cmake: cmake.into(),
        }
    }

    fn run(&self, step: &str, args: Vec<String>, cwd: &Path) -> Result<()> {
        let cmd = ProcessBuilder::new(&self.cmake).args(args).cwd(cwd);
        tracing::debug!("running {}", cmd.display_command());

        cmd.exec_as(&format!("CMake {}", step))?;
        Ok(())
    }
}

impl BuildOrchestrator for CMakeBuilder {
    fn configure(&self, config: &CMakeConfiguration) -> Result<()> {
        if !is_cmake_project(&config.source_dir) {
            bail!(
                "no CMakeLists.txt in {}\n\
                 help: Check `strip_prefix` and `cmake_subdir` in the recipe",
                config.source_dir.display()
            );
        }
        tracing::info!("Configuring CMake project in {}", config.build_dir.display());
        ensure_dir(&config.build_dir)?;
        self.run("configuration", config.configure_args(), &config.build_dir)
    }

    fn build(&self, config: &CMakeConfiguration) -> Result<()> {
        tracing::info!("Building CMake project");
        self.run("build", config.build_args(), &config.build_dir)
    }

    fn install(&self, config: &CMakeConfiguration) -> Result<()> {
        tracing::info!("Installing into {}", config.install_prefix.display());
        ensure_dir(&config.install_prefix)?;
        self.run("install", config.install_args(), &config.build_dir)
    }
}

/// Check if a directory contains a CMake project.
fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CMakeConfiguration {
        CMakeConfiguration::new("/src/CLHEP", "/work/build", "/work/package")
    }

    #[test]
    fn test_configure_args() {
        let cfg = config()
            .define("CLHEP_SINGLE_THREAD", false)
            .define("BUILD_SHARED_LIBS", true)
            .generator(Some("Ninja".to_string()));
        let args = cfg.configure_args();

        assert_eq!(&args[..4], &["-S", "/src/CLHEP", "-B", "/work/build"]);
        assert!(args.contains(&"-G".to_string()));
        assert!(args.contains(&"Ninja".to_string()));
        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(args.contains(&"-DCMAKE_INSTALL_PREFIX=/work/package".to_string()));
        assert!(args.contains(&"-DCLHEP_SINGLE_THREAD=OFF".to_string()));
        assert!(args.contains(&"-DBUILD_SHARED_LIBS=ON".to_string()));
    }

    #[test]
    fn test_build_and_install_args() {
        let cfg = config().build_type(BuildType::Debug).jobs(Some(4));
        assert_eq!(
            cfg.build_args(),
            vec!["--build", "/work/build", "--config", "Debug", "--parallel", "4"]
        );
        assert_eq!(
            cfg.install_args(),
            vec!["--install", "/work/build", "--config", "Debug"]
        );
    }

    #[test]
    fn test_configure_requires_cmake_lists() {
        let builder = CMakeBuilder::with_program("/nonexistent/cmake");
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = CMakeConfiguration::new(tmp.path(), tmp.path().join("build"), tmp.path().join("pkg"));

        let err = builder.configure(&cfg).unwrap_err();
        assert!(err.to_string().starts_with("no CMakeLists.txt in"));
        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn test_missing_cmake_reports_failure() {
        let builder = CMakeBuilder::with_program("/nonexistent/cmake");
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("CMakeLists.txt"), "project(CLHEP)").unwrap();
        let cfg = CMakeConfiguration::new(tmp.path(), tmp.path().join("build"), tmp.path().join("pkg"));

        let err = builder.configure(&cfg).unwrap_err();
        assert!(err.to_string().contains("failed to run `/nonexistent/cmake"));
    }
}
