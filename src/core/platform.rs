//! Build settings - the platform half of a build configuration.
//!
//! Settings describe the host the package is built for: operating system,
//! architecture, compiler, build type and (optionally) the C++ standard.
//! Together with the recipe options they select one build configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    #[serde(alias = "darwin")]
    Macos,
    Windows,
    FreeBsd,
}

impl Os {
    /// The operating system this binary was compiled for.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            "freebsd" => Os::FreeBsd,
            _ => Os::Linux,
        }
    }

    /// Get the OS name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::FreeBsd => "freebsd",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Os::Windows)
    }

    /// File extension of static archives on this platform.
    pub fn static_lib_extension(&self) -> &'static str {
        match self {
            Os::Windows => "lib",
            _ => "a",
        }
    }

    /// File extension of shared libraries on this platform.
    pub fn shared_lib_extension(&self) -> &'static str {
        match self {
            Os::Windows => "dll",
            Os::Macos => "dylib",
            _ => "so",
        }
    }

    /// Prefix prepended to library file names.
    pub fn lib_prefix(&self) -> &'static str {
        match self {
            Os::Windows => "",
            _ => "lib",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" | "osx" => Ok(Os::Macos),
            "windows" | "win" => Ok(Os::Windows),
            "freebsd" => Ok(Os::FreeBsd),
            _ => Err(format!(
                "unknown os '{}'; expected 'linux', 'macos', 'windows' or 'freebsd'",
                s
            )),
        }
    }
}

/// Compiler family used for the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compiler {
    /// GCC (MinGW when targeting Windows)
    Gcc,
    Clang,
    AppleClang,
    /// Microsoft Visual C++
    #[serde(alias = "visual-studio")]
    Msvc,
}

impl Compiler {
    /// Get the compiler name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Clang => "clang",
            Compiler::AppleClang => "apple-clang",
            Compiler::Msvc => "msvc",
        }
    }

    /// Default compiler for an operating system.
    pub fn default_for(os: Os) -> Self {
        match os {
            Os::Windows => Compiler::Msvc,
            Os::Macos => Compiler::AppleClang,
            Os::FreeBsd => Compiler::Clang,
            Os::Linux => Compiler::Gcc,
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compiler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "mingw" => Ok(Compiler::Gcc),
            "clang" => Ok(Compiler::Clang),
            "apple-clang" | "apple_clang" => Ok(Compiler::AppleClang),
            "msvc" | "visual studio" | "visual-studio" | "cl" => Ok(Compiler::Msvc),
            _ => Err(format!(
                "unknown compiler '{}'; expected 'gcc', 'clang', 'apple-clang' or 'msvc'",
                s
            )),
        }
    }
}

/// CMake build type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(format!("unknown build type '{}'", s)),
        }
    }
}

/// C++ language standard, as a bare year suffix (98, 11, 14, 17, 20, 23).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CppStd(u8);

impl CppStd {
    pub const CXX11: CppStd = CppStd(11);

    /// Ordering key; C++98 sorts before C++11.
    fn rank(&self) -> u16 {
        match self.0 {
            98 => 0,
            n => 100 + n as u16,
        }
    }

    pub fn at_least(&self, other: CppStd) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for CppStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C++{}", self.0)
    }
}

impl FromStr for CppStd {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .trim_start_matches("gnu")
            .trim_start_matches("c++")
            .trim_start_matches("C++");
        match digits {
            "98" | "11" | "14" | "17" | "20" | "23" => Ok(CppStd(digits.parse().unwrap_or(11))),
            _ => Err(format!("unknown C++ standard '{}'", s)),
        }
    }
}

/// The settings half of a build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    pub arch: String,
    pub compiler: Compiler,
    #[serde(default)]
    pub build_type: BuildType,
    #[serde(default)]
    pub cppstd: Option<CppStd>,
}

impl Settings {
    /// Settings for an OS with its default compiler.
    pub fn new(os: Os) -> Self {
        Settings {
            os,
            arch: std::env::consts::ARCH.to_string(),
            compiler: Compiler::default_for(os),
            build_type: BuildType::default(),
            cppstd: None,
        }
    }

    /// Settings describing the host.
    pub fn host() -> Self {
        Self::new(Os::host())
    }

    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = build_type;
        self
    }

    pub fn with_cppstd(mut self, cppstd: Option<CppStd>) -> Self {
        self.cppstd = cppstd;
        self
    }
}
