// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod converter;
pub mod finance;
pub mod identity;
pub mod review;
pub mod summary;

use crate::error::WorksheetResult;
use crate::rates::RateReply;
use crate::utils::is_currency_code;
use crate::workflow::Step;

/// What a view asks the controller to do after handling an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Go(Step),
}

/// State of a currency selector fed by the rate provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyOptions {
    Loading,
    Failed(String),
    Ready(Vec<String>),
}

impl CurrencyOptions {
    pub fn from_reply(reply: WorksheetResult<RateReply>, failure: &str) -> Self {
        match reply {
            Ok(RateReply::Currencies(list)) => Self::Ready(list),
            Ok(other) => Self::Failed(format!("Unexpected reply {:?}", other)),
            Err(_) => Self::Failed(failure.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Normalise a selection and check it against the loaded list. When the
    /// list could not be loaded a well-formed code is still accepted so a
    /// rate outage never blocks the worksheet.
    pub fn check(&self, code: &str) -> Result<String, String> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err("Currency is required".into());
        }
        match self {
            Self::Loading => Err("Currencies are still loading".into()),
            Self::Ready(list) if list.iter().any(|c| *c == code) => Ok(code),
            Self::Ready(_) => Err(format!("Unknown currency '{}'", code)),
            Self::Failed(_) if is_currency_code(&code) => Ok(code),
            Self::Failed(_) => Err(format!("'{}' is not a currency code", code)),
        }
    }

    /// Like [`check`](Self::check), but a list that has not arrived yet is
    /// treated as unavailable, so only the code's shape is checked.
    pub fn check_settled(&self, code: &str) -> Result<String, String> {
        match self {
            Self::Loading => Self::Failed(String::new()).check(code),
            other => other.check(code),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Loading => "Loading currencies...".into(),
            Self::Failed(msg) => msg.clone(),
            Self::Ready(list) => format!("{} currencies available", list.len()),
        }
    }
}
