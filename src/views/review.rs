// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Review of the worksheet and the commit into durable storage.
//!
//! Commit runs `idle -> saving -> saved -> idle`. The durable write happens
//! when the saving delay elapses, using the snapshot taken when Save was
//! pressed. A failed write parks the machine in `failed`, from which Save
//! can be pressed again.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{WorksheetError, WorksheetResult};
use crate::models::{
    FinanceData, Snapshot, UserInfo, FINAL_FINANCE_DATA_KEY, FINAL_USER_INFO_KEY,
    FINANCE_DATA_KEY, USER_INFO_KEY,
};
use crate::store::{Store, StoreExt};
use crate::utils::{fmt_amount, pretty_table};
use crate::workflow::Step;

use super::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewIntent {
    Edit(Step),
    Save,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    Idle,
    Saving { until: Instant, snapshot: Snapshot },
    Saved { until: Instant },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReviewAndCommit {
    pub snapshot: Option<Snapshot>,
    pub state: SaveState,
    save_delay: Duration,
    success_window: Duration,
}

impl ReviewAndCommit {
    pub fn new(save_delay: Duration, success_window: Duration) -> Self {
        Self {
            snapshot: None,
            state: SaveState::Idle,
            save_delay,
            success_window,
        }
    }

    pub fn load(&mut self, session: &dyn Store) -> WorksheetResult<()> {
        let missing = WorksheetError::MissingPrerequisite { step: Step::Review };
        let user: UserInfo = session.get_record(USER_INFO_KEY)?.ok_or(missing.clone())?;
        let finance: FinanceData = session.get_record(FINANCE_DATA_KEY)?.ok_or(missing)?;
        self.snapshot = Some(Snapshot { user, finance });
        Ok(())
    }

    /// Interaction is blocked while the saving overlay is up.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, SaveState::Saving { .. })
    }

    pub fn apply(&mut self, intent: ReviewIntent, now: Instant) -> Transition {
        match intent {
            ReviewIntent::Edit(step @ (Step::Identity | Step::Finance)) => Transition::Go(step),
            ReviewIntent::Edit(_) => Transition::Stay,
            ReviewIntent::Save => {
                self.save(now);
                Transition::Stay
            }
        }
    }

    pub fn save(&mut self, now: Instant) -> bool {
        if self.is_busy() {
            return false;
        }
        let Some(snapshot) = self.snapshot.clone() else {
            return false;
        };
        info!("saving worksheet");
        self.state = SaveState::Saving {
            until: now + self.save_delay,
            snapshot,
        };
        true
    }

    /// Advance timers. Returns true when the state changed.
    pub fn tick(&mut self, now: Instant, durable: &dyn Store) -> bool {
        match &self.state {
            SaveState::Saving { until, snapshot } if now >= *until => {
                self.state = match commit(durable, snapshot) {
                    Ok(()) => {
                        info!("worksheet saved");
                        SaveState::Saved {
                            until: now + self.success_window,
                        }
                    }
                    Err(e) => {
                        warn!("saving worksheet failed: {}", e);
                        SaveState::Failed(e.to_string())
                    }
                };
                true
            }
            SaveState::Saved { until } if now >= *until => {
                self.state = SaveState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("== Review and Save ==\n");
        match &self.state {
            SaveState::Saving { .. } => out.push_str("  [ saving... ]\n"),
            SaveState::Saved { .. } => {
                out.push_str("  [ Success! Your data has been saved. ]\n")
            }
            SaveState::Failed(msg) => {
                out.push_str(&format!("  [ Save failed: {} ; press save to retry ]\n", msg))
            }
            SaveState::Idle => {}
        }
        let Some(s) = &self.snapshot else {
            out.push_str("  Nothing to review.\n");
            return out;
        };
        let or_na = |v: &str| if v.is_empty() { "N/A".to_string() } else { v.to_string() };
        out.push_str("  User Information\n");
        out.push_str(&format!("    Name:               {}\n", or_na(&s.user.name)));
        out.push_str(&format!("    Email:              {}\n", or_na(&s.user.email)));
        out.push_str(&format!("    Preferred Currency: {}\n", or_na(&s.user.currency)));
        out.push_str("  Finance Data\n");
        out.push_str(&format!(
            "    Monthly Income:     {}\n",
            fmt_amount(&s.finance.monthly_income)
        ));
        if s.finance.expenses.is_empty() {
            out.push_str("    No expenses recorded.\n");
        } else {
            let rows = s
                .finance
                .expenses
                .iter()
                .map(|e| {
                    vec![
                        if e.name.is_empty() {
                            "Unnamed Expense".to_string()
                        } else {
                            e.name.clone()
                        },
                        e.amount
                            .map(|a| fmt_amount(&a))
                            .unwrap_or_else(|| "0.00".to_string()),
                    ]
                })
                .collect();
            out.push_str(&format!(
                "{}\n",
                pretty_table(&["Expense Name", "Amount"], rows)
            ));
        }
        out
    }
}

/// The only write path into durable storage.
fn commit(durable: &dyn Store, snapshot: &Snapshot) -> WorksheetResult<()> {
    let user: Value = serde_json::to_value(&snapshot.user)?;
    let finance: Value = serde_json::to_value(&snapshot.finance)?;
    durable.put_all(&[
        (FINAL_USER_INFO_KEY, user),
        (FINAL_FINANCE_DATA_KEY, finance),
    ])
}

/// Read back a committed snapshot, if any.
pub fn load_committed(durable: &dyn Store) -> WorksheetResult<Option<Snapshot>> {
    let user: Option<UserInfo> = durable.get_record(FINAL_USER_INFO_KEY)?;
    let finance: Option<FinanceData> = durable.get_record(FINAL_FINANCE_DATA_KEY)?;
    Ok(user.zip(finance).map(|(user, finance)| Snapshot { user, finance }))
}
