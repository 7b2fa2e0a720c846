//! `clhep-recipe options` command

use anyhow::Result;

use crate::cli::OptionsArgs;
use clhep_recipe::ops::inspect::{format_options, options_report};

pub fn execute(args: OptionsArgs) -> Result<()> {
    let report = options_report(&args.config.settings(), args.config.request())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_options(&report));
    }

    Ok(())
}
