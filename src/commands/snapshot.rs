// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::models::{BudgetDerivation, Snapshot, FINAL_FINANCE_DATA_KEY, FINAL_USER_INFO_KEY};
use crate::store::{DurableStore, Store};
use crate::utils::{fmt_amount, fmt_money, maybe_print_json, pretty_table};
use crate::views::finance::TOTALS_OVERFLOW;
use crate::views::review::load_committed;

use super::open_durable;

pub fn handle(settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    let durable = open_durable(settings)?;
    match m.subcommand() {
        Some(("show", sub)) => show(&durable, sub.get_flag("json"))?,
        Some(("clear", _)) => {
            clear(&durable)?;
            println!("Saved worksheet cleared.");
        }
        _ => {}
    }
    Ok(())
}

/// JSON document for the committed worksheet, `None` when nothing is saved.
pub fn snapshot_json(durable: &DurableStore) -> Result<Option<Value>> {
    let Some(snap) = load_committed(durable)? else {
        return Ok(None);
    };
    let saved_at = durable.updated_at(FINAL_FINANCE_DATA_KEY)?;
    Ok(Some(json!({
        FINAL_USER_INFO_KEY: snap.user,
        FINAL_FINANCE_DATA_KEY: snap.finance,
        "savedAt": saved_at.map(|t| t.to_rfc3339()),
    })))
}

fn show(durable: &DurableStore, json_flag: bool) -> Result<()> {
    if json_flag {
        let doc = snapshot_json(durable)?.unwrap_or(Value::Null);
        maybe_print_json(true, &doc)?;
        return Ok(());
    }
    match load_committed(durable)? {
        Some(snap) => print!("{}", render(&snap)),
        None => println!("No saved worksheet."),
    }
    Ok(())
}

pub fn render(snap: &Snapshot) -> String {
    let ccy = &snap.user.currency;
    let mut out = format!(
        "Name: {}\nEmail: {}\nCurrency: {}\n",
        snap.user.name, snap.user.email, ccy
    );
    let rows = snap
        .finance
        .expenses
        .iter()
        .map(|e| {
            vec![
                e.name.clone(),
                fmt_amount(&e.amount.unwrap_or_default()),
            ]
        })
        .collect();
    out.push_str(&format!("{}\n", pretty_table(&["Expense", "Amount"], rows)));
    match BudgetDerivation::derive(&snap.finance) {
        Some(d) => {
            out.push_str(&format!("Total Income:     {}\n", fmt_money(&d.total_income, ccy)));
            out.push_str(&format!("Total Expenses:   {}\n", fmt_money(&d.total_expenses, ccy)));
            out.push_str(&format!("Remaining Budget: {}\n", fmt_money(&d.remaining, ccy)));
        }
        None => out.push_str(&format!("{}\n", TOTALS_OVERFLOW)),
    }
    out
}

pub fn clear(durable: &dyn Store) -> Result<()> {
    durable.remove(FINAL_USER_INFO_KEY)?;
    durable.remove(FINAL_FINANCE_DATA_KEY)?;
    Ok(())
}
