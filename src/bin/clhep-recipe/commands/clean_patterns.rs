//! `clhep-recipe clean-patterns` command

use anyhow::Result;

use crate::cli::CleanPatternsArgs;
use clhep_recipe::ops::inspect::{clean_patterns, format_clean_patterns, load_recipe};

pub fn execute(args: CleanPatternsArgs) -> Result<()> {
    let recipe = load_recipe(args.recipe.as_deref())?;
    let patterns = clean_patterns(&recipe, args.pkg_version.as_deref(), args.shared)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
    } else {
        print!("{}", format_clean_patterns(&patterns));
    }

    Ok(())
}
