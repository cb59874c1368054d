// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("budgetsheet")
        .version(crate_version!())
        .about("Interactive personal budget worksheet with live currency conversion")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .arg(
            Arg::new("rates-url")
                .long("rates-url")
                .env("BUDGETSHEET_RATES_URL")
                .global(true)
                .help("Exchange-rate endpoint; the base currency is appended as a path segment"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("HTTP timeout in seconds"),
        )
        .arg(
            Arg::new("save-delay-ms")
                .long("save-delay-ms")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("Delay before a reviewed worksheet is written"),
        )
        .arg(
            Arg::new("success-ms")
                .long("success-ms")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("How long the save confirmation stays up"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .env("BUDGETSHEET_DB")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Database file for saved worksheets"),
        )
        .subcommand(Command::new("run").about("Fill in the worksheet interactively"))
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(
                    Command::new("currencies")
                        .about("List currencies known to the rate endpoint")
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("convert")
                        .about("Convert an amount between two currencies")
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .allow_hyphen_values(true),
                        )
                        .arg(Arg::new("from").long("from").default_value("USD"))
                        .arg(Arg::new("to").long("to").default_value("INR")),
                ),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Saved worksheet")
                .subcommand(
                    Command::new("show")
                        .about("Print the saved worksheet and its summary")
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(Command::new("clear").about("Delete the saved worksheet")),
        )
        .subcommand(
            Command::new("export")
                .about("Export saved expenses")
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_parser(["csv", "json"])
                        .default_value("csv"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}
