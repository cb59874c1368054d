// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error kinds surfaced by the worksheet.
//!
//! None of these end a workflow run: each is recovered by the component that
//! raised it (an inline message, a banner, a redirect or a failed-save state).

use thiserror::Error;

use crate::workflow::Step;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorksheetError {
    /// A single form field failed validation
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Rate endpoint unreachable or returned an unexpected shape
    #[error("Network error: {0}")]
    Network(String),

    /// A step was entered before its upstream artifact existed
    #[error("Missing prerequisite for {step}")]
    MissingPrerequisite { step: Step },

    /// Store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl WorksheetError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for WorksheetError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for WorksheetError {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for WorksheetError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

pub type WorksheetResult<T> = std::result::Result<T, WorksheetError>;
