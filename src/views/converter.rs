// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::WorksheetResult;
use crate::rates::{RateQuery, RateReply};
use crate::utils::{fmt_amount, parse_amount};

use super::CurrencyOptions;

pub const INVALID_AMOUNT: &str = "Please enter a valid amount.";
pub const RATE_FAILED: &str = "Failed to fetch conversion rate.";
pub const OPTIONS_FAILED: &str = "Failed to fetch currency options.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterIntent {
    SetAmount(String),
    SetFrom(String),
    SetTo(String),
    Convert,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConverterRate {
    Pending,
    Ready(Decimal),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ConverterView {
    pub amount: String,
    pub from: String,
    pub to: String,
    pub options: CurrencyOptions,
    pub rate: ConverterRate,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl Default for ConverterView {
    fn default() -> Self {
        Self {
            amount: String::new(),
            from: "USD".into(),
            to: "INR".into(),
            options: CurrencyOptions::Loading,
            rate: ConverterRate::Pending,
            result: None,
            error: None,
        }
    }
}

impl ConverterView {
    /// Applies the intent; returns a rate query when the pair changed and a
    /// fresh rate is needed.
    pub fn apply(&mut self, intent: ConverterIntent) -> Option<RateQuery> {
        match intent {
            ConverterIntent::SetAmount(v) => {
                self.amount = v;
                None
            }
            ConverterIntent::SetFrom(code) => {
                let code = self.pick(&code)?;
                self.from = code;
                self.pair_changed()
            }
            ConverterIntent::SetTo(code) => {
                let code = self.pick(&code)?;
                self.to = code;
                self.pair_changed()
            }
            ConverterIntent::Convert => {
                self.convert();
                None
            }
        }
    }

    fn pick(&mut self, code: &str) -> Option<String> {
        match self.options.check_settled(code) {
            Ok(c) => Some(c),
            Err(msg) => {
                self.error = Some(msg);
                None
            }
        }
    }

    /// Same-currency pairs resolve to 1 without asking the provider.
    pub fn pair_changed(&mut self) -> Option<RateQuery> {
        self.result = None;
        if self.from == self.to {
            self.rate = ConverterRate::Ready(Decimal::ONE);
            return None;
        }
        self.rate = ConverterRate::Pending;
        Some(RateQuery::Rate {
            base: self.from.clone(),
            quote: self.to.clone(),
        })
    }

    pub fn apply_options(&mut self, reply: WorksheetResult<RateReply>) {
        self.options = CurrencyOptions::from_reply(reply, OPTIONS_FAILED);
        if let CurrencyOptions::Failed(msg) = &self.options {
            self.error = Some(msg.clone());
        }
    }

    pub fn apply_rate(&mut self, reply: WorksheetResult<RateReply>) {
        match reply {
            Ok(RateReply::Rate { base, quote, rate }) if base == self.from && quote == self.to => {
                self.rate = ConverterRate::Ready(rate);
                if self.error.as_deref() == Some(RATE_FAILED) {
                    self.error = None;
                }
            }
            Ok(other) => debug!(?other, "ignoring rate for a previous pair"),
            Err(_) => {
                self.rate = ConverterRate::Failed(RATE_FAILED.to_string());
                self.error = Some(RATE_FAILED.to_string());
            }
        }
    }

    pub fn convert(&mut self) -> Option<Decimal> {
        let Some(amount) = parse_amount(&self.amount) else {
            self.error = Some(INVALID_AMOUNT.to_string());
            self.result = None;
            return None;
        };
        let rate = match &self.rate {
            ConverterRate::Ready(r) => *r,
            // Identity fallback keeps the calculator usable offline.
            ConverterRate::Failed(_) => Decimal::ONE,
            ConverterRate::Pending => {
                self.error = Some("Conversion rate is still loading.".to_string());
                return None;
            }
        };
        let Some(converted) = amount.checked_mul(rate) else {
            self.error = Some(INVALID_AMOUNT.to_string());
            self.result = None;
            return None;
        };
        self.result = Some(fmt_amount(&converted));
        if matches!(self.rate, ConverterRate::Ready(_)) {
            self.error = None;
        }
        Some(converted)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("== Currency Conversion ==\n");
        out.push_str(&format!(
            "  Amount: {}\n",
            if self.amount.is_empty() { "-" } else { &self.amount }
        ));
        out.push_str(&format!("  From Currency: {}\n", self.from));
        out.push_str(&format!("  To Currency:   {}\n", self.to));
        out.push_str(&format!("  ({})\n", self.options.describe()));
        match &self.rate {
            ConverterRate::Pending => out.push_str("  Rate: fetching...\n"),
            ConverterRate::Ready(r) => out.push_str(&format!("  Rate: 1 {} = {} {}\n", self.from, r, self.to)),
            ConverterRate::Failed(msg) => {
                out.push_str(&format!("  Rate: unavailable, using 1 ({})\n", msg))
            }
        }
        if let Some(err) = &self.error {
            out.push_str(&format!("  ! {}\n", err));
        }
        if let Some(res) = &self.result {
            out.push_str(&format!("  Converted Amount: {} {}\n", res, self.to));
        }
        out
    }
}
