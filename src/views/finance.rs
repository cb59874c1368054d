// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Income and expense entry.
//!
//! Rows are edited one keystroke at a time: a character that would make the
//! field invalid is refused on the spot, so a row's text is always either
//! empty or well-formed. Bulk edits go through the same filter.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::models::{BudgetDerivation, Expense, FinanceData, UserInfo, FINANCE_DATA_KEY};
use crate::store::{Store, StoreExt};
use crate::utils::{fmt_amount, is_valid_expense_name, parse_amount, pretty_table};
use crate::workflow::Step;

use super::identity::{IdentityForm, IdentityIntent};
use super::Transition;

pub const INVALID_INCOME: &str = "Please enter a valid income amount.";
pub const INCOMPLETE_LAST_ROW: &str =
    "Please fill in the last expense with valid details before adding a new one.";
pub const NO_VALID_EXPENSE: &str = "Please add at least one valid expense detail.";
pub const TOTALS_OVERFLOW: &str = "Amounts are too large to total.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinanceIntent {
    SetIncome(String),
    TypeName { row: usize, ch: char },
    EraseName { row: usize },
    SetName { row: usize, text: String },
    TypeAmount { row: usize, ch: char },
    EraseAmount { row: usize },
    SetAmount { row: usize, text: String },
    AddExpense,
    RemoveExpense(usize),
    /// Edits to the identity block shown on this page; `Submit` rewrites
    /// `userInfo` and stays here.
    Info(IdentityIntent),
    Submit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseRow {
    pub name: String,
    pub amount: String,
}

impl ExpenseRow {
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.amount.trim().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && is_valid_expense_name(&self.name)
            && parse_amount(&self.amount).is_some_and(|a| !a.is_sign_negative())
    }

    fn to_expense(&self) -> Expense {
        Expense {
            name: self.name.trim().to_string(),
            amount: parse_amount(&self.amount),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FinanceForm {
    pub income: String,
    pub rows: Vec<ExpenseRow>,
    pub income_error: Option<String>,
    pub expense_error: Option<String>,
    /// Identity shown above the form, read from the session on entry.
    pub profile: Option<UserInfo>,
    /// Editor for re-entering identity details without leaving the page.
    pub info: IdentityForm,
    pristine: bool,
}

impl Default for FinanceForm {
    fn default() -> Self {
        Self {
            income: String::new(),
            rows: vec![ExpenseRow::default()],
            income_error: None,
            expense_error: None,
            profile: None,
            info: IdentityForm::default(),
            pristine: true,
        }
    }
}

impl FinanceForm {
    pub fn is_pristine(&self) -> bool {
        self.pristine
    }

    /// Show `user` in the banner. The info editor follows along unless it
    /// holds edits of its own.
    pub fn set_profile(&mut self, user: Option<UserInfo>) {
        let untouched = self.info.is_blank()
            || self
                .profile
                .as_ref()
                .is_some_and(|p| self.info.shows(p));
        if let (true, Some(u)) = (untouched, &user) {
            self.info.hydrate(u);
        }
        self.profile = user;
    }

    /// Refill from a previously submitted artifact, e.g. when review sends
    /// the user back to edit.
    pub fn hydrate(&mut self, data: &FinanceData) {
        self.income = data.monthly_income.normalize().to_string();
        self.rows = data
            .expenses
            .iter()
            .map(|e| ExpenseRow {
                name: e.name.clone(),
                amount: e.amount.map(|a| a.normalize().to_string()).unwrap_or_default(),
            })
            .collect();
        if self.rows.is_empty() {
            self.rows.push(ExpenseRow::default());
        }
        self.income_error = None;
        self.expense_error = None;
    }

    pub fn apply(&mut self, intent: FinanceIntent, session: &dyn Store) -> Transition {
        if !matches!(intent, FinanceIntent::Submit | FinanceIntent::Info(_)) {
            self.pristine = false;
        }
        match intent {
            FinanceIntent::SetIncome(text) => {
                self.set_income(&text);
            }
            FinanceIntent::TypeName { row, ch } => {
                self.type_name(row, ch);
            }
            FinanceIntent::EraseName { row } => {
                if let Some(r) = self.rows.get_mut(row) {
                    r.name.pop();
                }
            }
            FinanceIntent::SetName { row, text } => {
                self.set_name(row, &text);
            }
            FinanceIntent::TypeAmount { row, ch } => {
                self.type_amount(row, ch);
            }
            FinanceIntent::EraseAmount { row } => {
                if let Some(r) = self.rows.get_mut(row) {
                    r.amount.pop();
                }
            }
            FinanceIntent::SetAmount { row, text } => {
                self.set_amount(row, &text);
            }
            FinanceIntent::AddExpense => {
                self.add_expense();
            }
            FinanceIntent::RemoveExpense(row) => {
                self.remove_expense(row);
            }
            FinanceIntent::Info(IdentityIntent::Submit) => {
                if let Some(user) = self.info.save(session) {
                    self.profile = Some(user);
                }
            }
            FinanceIntent::Info(i) => {
                self.info.apply(i, session);
            }
            FinanceIntent::Submit => return self.submit(session),
        }
        Transition::Stay
    }

    pub fn set_income(&mut self, text: &str) -> bool {
        match parse_amount(text) {
            Some(v) if v > Decimal::ZERO => {
                self.income = text.trim().to_string();
                self.income_error = None;
                true
            }
            _ => {
                self.income_error = Some(INVALID_INCOME.to_string());
                false
            }
        }
    }

    pub fn type_name(&mut self, row: usize, ch: char) -> bool {
        let Some(r) = self.rows.get_mut(row) else {
            return false;
        };
        let mut candidate = r.name.clone();
        candidate.push(ch);
        if is_valid_expense_name(&candidate) {
            r.name = candidate;
            true
        } else {
            debug!(row, ?ch, "rejected expense name keystroke");
            false
        }
    }

    /// Replace a row's name, typing `text` through the keystroke filter.
    /// Returns the number of refused characters.
    pub fn set_name(&mut self, row: usize, text: &str) -> usize {
        let Some(r) = self.rows.get_mut(row) else {
            return text.chars().count();
        };
        r.name.clear();
        text.chars().filter(|c| !self.type_name(row, *c)).count()
    }

    pub fn type_amount(&mut self, row: usize, ch: char) -> bool {
        let Some(r) = self.rows.get_mut(row) else {
            return false;
        };
        let mut candidate = r.amount.clone();
        candidate.push(ch);
        if parse_amount(&candidate).is_some_and(|a| !a.is_sign_negative()) {
            r.amount = candidate;
            true
        } else {
            debug!(row, ?ch, "rejected expense amount keystroke");
            false
        }
    }

    pub fn set_amount(&mut self, row: usize, text: &str) -> usize {
        let Some(r) = self.rows.get_mut(row) else {
            return text.chars().count();
        };
        r.amount.clear();
        text.chars().filter(|c| !self.type_amount(row, *c)).count()
    }

    pub fn add_expense(&mut self) -> bool {
        if self.rows.last().is_some_and(ExpenseRow::is_complete) {
            self.rows.push(ExpenseRow::default());
            self.expense_error = None;
            true
        } else {
            self.expense_error = Some(INCOMPLETE_LAST_ROW.to_string());
            false
        }
    }

    /// Row 0 anchors the list and cannot be removed.
    pub fn remove_expense(&mut self, row: usize) -> bool {
        if row == 0 || row >= self.rows.len() {
            return false;
        }
        self.rows.remove(row);
        true
    }

    pub fn build(&self) -> Option<FinanceData> {
        let income = parse_amount(&self.income).filter(|v| *v > Decimal::ZERO)?;
        if !self.rows.iter().any(ExpenseRow::is_complete) {
            return None;
        }
        Some(FinanceData {
            monthly_income: income,
            expenses: self
                .rows
                .iter()
                .filter(|r| !r.is_blank())
                .map(ExpenseRow::to_expense)
                .collect(),
        })
    }

    fn submit(&mut self, session: &dyn Store) -> Transition {
        if !parse_amount(&self.income).is_some_and(|v| v > Decimal::ZERO) {
            self.income_error = Some(INVALID_INCOME.to_string());
            return Transition::Stay;
        }
        self.income_error = None;
        let Some(data) = self.build() else {
            self.expense_error = Some(NO_VALID_EXPENSE.to_string());
            return Transition::Stay;
        };
        if BudgetDerivation::derive(&data).is_none() {
            self.expense_error = Some(TOTALS_OVERFLOW.to_string());
            return Transition::Stay;
        }
        if let Err(e) = session.put_record(FINANCE_DATA_KEY, &data) {
            warn!("could not store finance data: {}", e);
            self.expense_error = Some(e.to_string());
            return Transition::Stay;
        }
        info!(expenses = data.expenses.len(), "finance data saved");
        self.expense_error = None;
        Transition::Go(Step::Summary)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("== Income and Expenses ==\n");
        match &self.profile {
            Some(u) => out.push_str(&format!(
                "  {} <{}>  Selected Currency: {}\n",
                u.name, u.email, u.currency
            )),
            None => out.push_str("  Selected Currency: None\n"),
        }
        out.push_str("  -- Update Info --\n");
        for (label, value, key) in [
            ("Name", &self.info.name, "name"),
            ("Email", &self.info.email, "email"),
            ("Currency", &self.info.currency, "currency"),
        ] {
            out.push_str(&format!(
                "    {:<9} {}\n",
                label,
                if value.is_empty() { "-" } else { value.as_str() }
            ));
            if let Some(err) = self.info.error_for(key) {
                out.push_str(&format!("      ! {}\n", err));
            }
        }
        let income = parse_amount(&self.income)
            .map(|d| fmt_amount(&d))
            .unwrap_or_else(|| "-".into());
        out.push_str(&format!("  Monthly Income: {}\n", income));
        if let Some(err) = &self.income_error {
            out.push_str(&format!("    ! {}\n", err));
        }
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                vec![
                    (i + 1).to_string(),
                    r.name.clone(),
                    r.amount.clone(),
                    if i == 0 { String::new() } else { "removable".into() },
                ]
            })
            .collect();
        out.push_str(&format!(
            "{}\n",
            pretty_table(&["#", "Expense Name", "Amount", ""], rows)
        ));
        if let Some(err) = &self.expense_error {
            out.push_str(&format!("  ! {}\n", err));
        }
        out
    }
}
