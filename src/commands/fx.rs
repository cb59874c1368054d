// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::warn;

use crate::config::Settings;
use crate::error::{WorksheetError, WorksheetResult};
use crate::rates::RateProvider;
use crate::utils::{fmt_amount, is_currency_code, maybe_print_json, parse_decimal, pretty_table};
use crate::views::converter::{INVALID_AMOUNT, RATE_FAILED};

use super::rate_provider;

pub fn handle(settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    let provider = rate_provider(settings)?;
    match m.subcommand() {
        Some(("currencies", sub)) => list_currencies(provider.as_ref(), sub.get_flag("json"))?,
        Some(("convert", sub)) => {
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
            let from = currency_arg(sub.get_one::<String>("from").unwrap())?;
            let to = currency_arg(sub.get_one::<String>("to").unwrap())?;
            let (converted, err) = convert(provider.as_ref(), amount, &from, &to)?;
            if let Some(e) = err {
                eprintln!("{} Using a rate of 1.", e);
            }
            println!(
                "{} {} = {} {}",
                fmt_amount(&amount),
                from,
                fmt_amount(&converted),
                to
            );
        }
        _ => {}
    }
    Ok(())
}

fn currency_arg(raw: &str) -> Result<String> {
    let code = raw.trim().to_uppercase();
    if !is_currency_code(&code) {
        bail!("Invalid currency code '{}'", raw);
    }
    Ok(code)
}

fn list_currencies(provider: &dyn RateProvider, json_flag: bool) -> Result<()> {
    let codes = provider.list_currencies()?;
    if maybe_print_json(json_flag, &json!({ "currencies": codes }))? {
        return Ok(());
    }
    let rows = codes.into_iter().map(|c| vec![c]).collect();
    println!("{}", pretty_table(&["Currency"], rows));
    Ok(())
}

/// Convert through the provider, falling back to an identity rate when the
/// rate cannot be fetched. The fetch error is returned alongside for
/// reporting; a product too large for a decimal is an `Err`.
pub fn convert(
    provider: &dyn RateProvider,
    amount: Decimal,
    from: &str,
    to: &str,
) -> WorksheetResult<(Decimal, Option<WorksheetError>)> {
    match provider.rate(from, to) {
        Ok(rate) => amount
            .checked_mul(rate)
            .map(|v| (v, None))
            .ok_or_else(|| WorksheetError::validation("amount", INVALID_AMOUNT)),
        Err(e) => {
            warn!(from, to, "rate unavailable: {}", e);
            Ok((amount, Some(WorksheetError::Network(RATE_FAILED.to_string()))))
        }
    }
}
