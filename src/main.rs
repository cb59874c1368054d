// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use budgetsheet::config::Settings;
use budgetsheet::{cli, commands, logging};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    logging::init(matches.get_count("verbose"));
    let settings = Settings::from_matches(&matches);

    match matches.subcommand() {
        None | Some(("run", _)) => commands::worksheet::handle(&settings)?,
        Some(("fx", sub)) => commands::fx::handle(&settings, sub)?,
        Some(("snapshot", sub)) => commands::snapshot::handle(&settings, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&settings, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
