// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde_json::json;

use crate::config::Settings;
use crate::store::Store;
use crate::utils::fmt_amount;
use crate::views::review::load_committed;

use super::open_durable;

pub fn handle(settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    let fmt = m.get_one::<String>("format").unwrap().to_lowercase();
    let out = m.get_one::<PathBuf>("out").unwrap();
    let durable = open_durable(settings)?;
    let n = export_expenses(&durable, &fmt, out)?;
    println!("Exported {} expenses to {}", n, out.display());
    Ok(())
}

/// Write the committed expense list as csv or json. Returns the row count.
pub fn export_expenses(durable: &dyn Store, fmt: &str, out: &Path) -> Result<usize> {
    let Some(snap) = load_committed(durable)? else {
        bail!("No saved worksheet to export");
    };
    let ccy = snap.user.currency.as_str();
    let rows: Vec<(String, String)> = snap
        .finance
        .expenses
        .iter()
        .map(|e| (e.name.clone(), fmt_amount(&e.amount.unwrap_or_default())))
        .collect();

    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["name", "amount", "currency"])?;
            for (name, amount) in &rows {
                wtr.write_record([name.as_str(), amount.as_str(), ccy])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = rows
                .iter()
                .map(|(name, amount)| json!({ "name": name, "amount": amount, "currency": ccy }))
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(rows.len())
}
