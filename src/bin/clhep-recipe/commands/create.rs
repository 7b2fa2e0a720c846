//! `clhep-recipe create` command

use anyhow::Result;

use crate::cli::CreateArgs;
use clhep_recipe::core::descriptor::RecipeVariant;
use clhep_recipe::ops::create::{create, CreateOptions};
use clhep_recipe::util::config::load_default_config;
use clhep_recipe::util::Shell;

pub fn execute(args: CreateArgs, shell: &Shell) -> Result<()> {
    let cwd = std::env::current_dir()?;

    // Load configuration (global + project); CLI flags override it
    let mut config = load_default_config(&cwd);
    if args.generator.is_some() {
        config.build.generator = args.generator;
    }
    if args.jobs.is_some() {
        config.build.jobs = args.jobs;
    }
    if let Some(build_type) = args.config.build_type {
        config.build.build_type = Some(build_type.as_str().to_string());
    }
    if args.offline {
        config.net.offline = true;
    }

    let output = if args.output.is_absolute() {
        args.output
    } else {
        cwd.join(args.output)
    };

    let opts = CreateOptions {
        recipe: args.recipe,
        version: args.pkg_version,
        settings: args.config.settings(),
        request: args.config.request(),
        variant: if args.flat {
            RecipeVariant::Flat
        } else {
            RecipeVariant::Components
        },
        output,
        package_dir: args.package_dir,
        config,
    };

    let result = create(&opts, shell)?;

    println!("{}", result.package_dir.display());
    Ok(())
}
