//! `clhep-recipe info` command

use anyhow::Result;

use crate::cli::InfoArgs;
use clhep_recipe::core::descriptor::RecipeVariant;
use clhep_recipe::ops::inspect::{format_info, info, load_recipe, InfoOptions};

pub fn execute(args: InfoArgs) -> Result<()> {
    if args.list_versions {
        let recipe = load_recipe(args.recipe.as_deref())?;
        for version in recipe.available_versions() {
            println!("{}", version);
        }
        return Ok(());
    }

    let opts = InfoOptions {
        recipe: args.recipe,
        version: args.pkg_version,
        settings: args.config.settings(),
        request: args.config.request(),
        variant: if args.flat {
            RecipeVariant::Flat
        } else {
            RecipeVariant::Components
        },
        package_dir: args.package,
    };

    let report = info(&opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_info(&report));
    }

    Ok(())
}
