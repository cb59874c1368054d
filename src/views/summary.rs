// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{WorksheetError, WorksheetResult};
use crate::models::{BudgetDerivation, FinanceData, UserInfo, FINANCE_DATA_KEY, USER_INFO_KEY};
use crate::rates::{RateQuery, RateReply};
use crate::store::{Store, StoreExt};
use crate::utils::fmt_money;
use crate::workflow::Step;

use super::finance::TOTALS_OVERFLOW;

pub const OVER_BUDGET_WARNING: &str =
    "Your expenses exceed your income. Please review your budget.";
pub const RATE_FAILED: &str = "Failed to fetch currency conversion rate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryIntent {
    ProceedToReview,
    OpenConverter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayRate {
    Pending,
    Ready(Decimal),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SummaryView {
    pub user: UserInfo,
    pub finance: FinanceData,
    pub derivation: BudgetDerivation,
    pub rate: DisplayRate,
}

impl SummaryView {
    pub fn load(session: &dyn Store) -> WorksheetResult<Self> {
        let missing = WorksheetError::MissingPrerequisite {
            step: Step::Summary,
        };
        let user: UserInfo = session.get_record(USER_INFO_KEY)?.ok_or(missing.clone())?;
        let finance: FinanceData = session.get_record(FINANCE_DATA_KEY)?.ok_or(missing)?;
        let derivation = BudgetDerivation::derive(&finance).ok_or_else(|| {
            WorksheetError::validation("expenses", TOTALS_OVERFLOW)
        })?;
        Ok(Self {
            user,
            finance,
            derivation,
            rate: DisplayRate::Pending,
        })
    }

    /// The display rate is quoted against the selected currency itself, so a
    /// healthy feed yields 1; the fetch still goes out to detect an outage.
    pub fn rate_query(&self) -> RateQuery {
        RateQuery::Table {
            base: self.user.currency.clone(),
            quote: self.user.currency.clone(),
        }
    }

    pub fn apply_rate(&mut self, reply: WorksheetResult<RateReply>) {
        match reply {
            Ok(RateReply::Rate { base, rate, .. }) if base == self.user.currency => {
                self.rate = DisplayRate::Ready(rate);
            }
            Ok(other) => debug!(?other, "ignoring rate for another selection"),
            Err(_) => self.rate = DisplayRate::Failed(RATE_FAILED.to_string()),
        }
    }

    pub fn effective_rate(&self) -> Decimal {
        match self.rate {
            DisplayRate::Ready(r) => r,
            _ => Decimal::ONE,
        }
    }

    pub fn displayed(&self) -> BudgetDerivation {
        self.derivation
            .scaled(self.effective_rate())
            .unwrap_or(self.derivation)
    }

    pub fn render(&self) -> String {
        let d = self.displayed();
        let ccy = &self.user.currency;
        let mut out = String::from("== Budget Summary ==\n");
        out.push_str(&format!("  Total Income:     {}\n", fmt_money(&d.total_income, ccy)));
        out.push_str(&format!("  Total Expenses:   {}\n", fmt_money(&d.total_expenses, ccy)));
        out.push_str(&format!("  Remaining Budget: {}\n", fmt_money(&d.remaining, ccy)));
        if d.over_budget {
            out.push_str(&format!("  !! {}\n", OVER_BUDGET_WARNING));
        }
        match &self.rate {
            DisplayRate::Pending => out.push_str("  (fetching display rate...)\n"),
            DisplayRate::Failed(msg) => out.push_str(&format!("  ! {}\n", msg)),
            DisplayRate::Ready(_) => {}
        }
        out
    }
}
