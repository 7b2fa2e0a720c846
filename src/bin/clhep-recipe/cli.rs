//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use clhep_recipe::core::options::OptionRequest;
use clhep_recipe::core::platform::{BuildType, Compiler, CppStd, Os, Settings};

/// clhep-recipe - build and package the CLHEP class library
#[derive(Parser)]
#[command(name = "clhep-recipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the effective options of a configuration
    Options(OptionsArgs),

    /// Show the components, libraries and link order a configuration exports
    Info(InfoArgs),

    /// Show what the package step removes from the installed tree
    CleanPatterns(CleanPatternsArgs),

    /// Fetch, build and package CLHEP
    Create(CreateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Settings and options shared by every configuration-aware command.
#[derive(Args, Clone)]
pub struct ConfigArgs {
    /// Target operating system (defaults to the host)
    #[arg(long)]
    pub os: Option<Os>,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Compiler (defaults to the platform's usual one)
    #[arg(long)]
    pub compiler: Option<Compiler>,

    /// Build type (Release, Debug, RelWithDebInfo, MinSizeRel)
    #[arg(long)]
    pub build_type: Option<BuildType>,

    /// C++ standard (e.g., 11, 17, gnu14)
    #[arg(long)]
    pub cppstd: Option<CppStd>,

    /// Build shared libraries
    #[arg(long)]
    pub shared: bool,

    /// Request position-independent code (true/false)
    #[arg(long = "fpic")]
    pub fpic: Option<bool>,
}

impl ConfigArgs {
    pub fn settings(&self) -> Settings {
        let os = self.os.unwrap_or_else(Os::host);
        let mut settings = Settings::new(os).with_cppstd(self.cppstd);
        if let Some(compiler) = self.compiler {
            settings = settings.with_compiler(compiler);
        }
        if let Some(build_type) = self.build_type {
            settings = settings.with_build_type(build_type);
        }
        if let Some(arch) = &self.arch {
            settings.arch = arch.clone();
        }
        settings
    }

    pub fn request(&self) -> OptionRequest {
        OptionRequest::shared(self.shared).with_fpic(self.fpic)
    }
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// CLHEP version (defaults to the newest in the recipe)
    #[arg(long = "version")]
    pub pkg_version: Option<String>,

    /// Recipe file (defaults to the bundled recipe)
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Describe the package as one flat library list
    #[arg(long)]
    pub flat: bool,

    /// Installed package folder (read by --flat)
    #[arg(long)]
    pub package: Option<PathBuf>,

    /// List the versions the recipe can build and exit
    #[arg(long)]
    pub list_versions: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CleanPatternsArgs {
    /// CLHEP version (defaults to the newest in the recipe)
    #[arg(long = "version")]
    pub pkg_version: Option<String>,

    /// Recipe file (defaults to the bundled recipe)
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Patterns for a shared build
    #[arg(long)]
    pub shared: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// CLHEP version (defaults to the newest in the recipe)
    #[arg(long = "version")]
    pub pkg_version: Option<String>,

    /// Recipe file (defaults to the bundled recipe)
    #[arg(long)]
    pub recipe: Option<PathBuf>,

    /// Export one flat library list instead of components
    #[arg(long)]
    pub flat: bool,

    /// Directory receiving sources, build tree and package
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Package folder (relative to --output unless absolute)
    #[arg(long)]
    pub package_dir: Option<PathBuf>,

    /// CMake generator (e.g., Ninja)
    #[arg(short = 'G', long)]
    pub generator: Option<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Only use cached source archives
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_args() {
        let cli = Cli::parse_from([
            "clhep-recipe", "options", "--os", "linux", "--compiler", "clang", "--fpic", "false",
        ]);
        let Commands::Options(args) = cli.command else {
            panic!("expected options");
        };
        let settings = args.config.settings();
        assert_eq!(settings.os, Os::Linux);
        assert_eq!(settings.compiler, Compiler::Clang);
        assert_eq!(args.config.request().fpic, Some(false));
    }
}
