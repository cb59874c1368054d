// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use tracing::{info, warn};

use crate::error::WorksheetError;
use crate::models::{UserInfo, USER_INFO_KEY};
use crate::store::{Store, StoreExt};
use crate::utils::is_valid_email;
use crate::workflow::Step;

use super::{CurrencyOptions, Transition};

pub const CURRENCY_LOAD_FAILED: &str = "Failed to load currencies.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityIntent {
    SetName(String),
    SetEmail(String),
    SelectCurrency(String),
    Submit,
}

#[derive(Debug, Clone)]
pub struct IdentityForm {
    pub name: String,
    pub email: String,
    pub currency: String,
    pub options: CurrencyOptions,
    pub errors: Vec<WorksheetError>,
}

impl Default for IdentityForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            currency: String::new(),
            options: CurrencyOptions::Loading,
            errors: Vec::new(),
        }
    }
}

impl IdentityForm {
    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.currency.is_empty()
    }

    /// Whether the inputs hold exactly `user`.
    pub fn shows(&self, user: &UserInfo) -> bool {
        self.name == user.name && self.email == user.email && self.currency == user.currency
    }

    pub fn hydrate(&mut self, user: &UserInfo) {
        self.name = user.name.clone();
        self.email = user.email.clone();
        self.currency = user.currency.clone();
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors.iter().find_map(|e| match e {
            WorksheetError::Validation { field: f, message } if *f == field => {
                Some(message.as_str())
            }
            _ => None,
        })
    }

    pub fn apply(&mut self, intent: IdentityIntent, session: &dyn Store) -> Transition {
        match intent {
            IdentityIntent::SetName(v) => {
                self.name = v;
                self.clear_error("name");
            }
            IdentityIntent::SetEmail(v) => {
                self.email = v;
                self.clear_error("email");
            }
            IdentityIntent::SelectCurrency(code) => self.select_currency(&code),
            IdentityIntent::Submit => return self.submit(session),
        }
        Transition::Stay
    }

    fn select_currency(&mut self, code: &str) {
        self.clear_error("currency");
        match self.options.check_settled(code) {
            Ok(code) => self.currency = code,
            Err(msg) => self.errors.push(WorksheetError::validation("currency", msg)),
        }
    }

    fn clear_error(&mut self, field: &str) {
        self.errors
            .retain(|e| !matches!(e, WorksheetError::Validation { field: f, .. } if *f == field));
    }

    pub fn validate(&self) -> Result<UserInfo, Vec<WorksheetError>> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() {
            errors.push(WorksheetError::validation("name", "Name is required"));
        }
        if email.is_empty() {
            errors.push(WorksheetError::validation("email", "Email is required"));
        } else if !is_valid_email(email) {
            errors.push(WorksheetError::validation(
                "email",
                "Enter a valid email address",
            ));
        }
        // The list may have arrived after the selection was made; without a
        // list only the code's shape can be checked.
        let currency = match self.options.check_settled(&self.currency) {
            Ok(c) => c,
            Err(msg) => {
                errors.push(WorksheetError::validation("currency", msg));
                String::new()
            }
        };
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(UserInfo {
            name: name.to_string(),
            email: email.to_string(),
            currency,
        })
    }

    fn submit(&mut self, session: &dyn Store) -> Transition {
        match self.save(session) {
            Some(_) => Transition::Go(Step::Finance),
            None => Transition::Stay,
        }
    }

    /// Validate and write `userInfo`. Errors are kept on the form.
    pub fn save(&mut self, session: &dyn Store) -> Option<UserInfo> {
        match self.validate() {
            Ok(user) => {
                if let Err(e) = session.put_record(USER_INFO_KEY, &user) {
                    warn!("could not store user info: {}", e);
                    self.errors = vec![WorksheetError::validation("form", e.to_string())];
                    return None;
                }
                info!(currency = %user.currency, "user info saved");
                self.errors.clear();
                self.hydrate(&user);
                Some(user)
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("== User Information ==\n");
        let field = |label: &str, value: &str, key: &str| {
            let mut s = format!("  {:<20} {}\n", label, if value.is_empty() { "-" } else { value });
            if let Some(err) = self.error_for(key) {
                s.push_str(&format!("    ! {}\n", err));
            }
            s
        };
        out.push_str(&field("Name", &self.name, "name"));
        out.push_str(&field("Email", &self.email, "email"));
        out.push_str(&field("Preferred Currency", &self.currency, "currency"));
        out.push_str(&format!("  ({})\n", self.options.describe()));
        if let Some(err) = self.error_for("form") {
            out.push_str(&format!("  ! {}\n", err));
        }
        out
    }
}
