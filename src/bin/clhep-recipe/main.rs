//! clhep-recipe CLI - build and package the CLHEP class library

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use clhep_recipe::core::error::{ConfigError, PackagingError};
use clhep_recipe::core::descriptor::FETCH_CONTEXT;
use clhep_recipe::util::diagnostic::{emit, suggestions};
use clhep_recipe::util::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

/// Print typed recipe errors as diagnostics, anything else with its chain.
fn report(err: &anyhow::Error, color: bool) {
    if let Some(config) = err.downcast_ref::<ConfigError>() {
        emit(&config.to_diagnostic(), color);
    } else if let Some(packaging) = err.downcast_ref::<PackagingError>() {
        emit(&packaging.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", err);
        if let Some(help) = hint_for(err) {
            eprintln!("{}", help);
        }
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        let msg = cause.to_string();
        if msg.starts_with(FETCH_CONTEXT) {
            Some(suggestions::FETCH_FAILED)
        } else if msg.starts_with("CMake ") && msg.contains(" failed") {
            Some(suggestions::BUILD_FAILED)
        } else {
            None
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("clhep_recipe=debug")
    } else {
        EnvFilter::new("clhep_recipe=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.verbose, cli.no_color);

    match cli.command {
        Commands::Options(args) => commands::options::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::CleanPatterns(args) => commands::clean_patterns::execute(args),
        Commands::Create(args) => commands::create::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
