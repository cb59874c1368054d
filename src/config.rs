// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::rates::DEFAULT_RATES_URL;

#[derive(Debug, Clone)]
pub struct Settings {
    pub rates_url: String,
    pub http_timeout: Duration,
    /// Simulated latency between pressing Save and the durable write.
    pub save_delay: Duration,
    /// How long the success overlay stays up.
    pub success_window: Duration,
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rates_url: DEFAULT_RATES_URL.to_string(),
            http_timeout: Duration::from_secs(15),
            save_delay: Duration::from_millis(2000),
            success_window: Duration::from_millis(3000),
            db_path: None,
        }
    }
}

impl Settings {
    /// Global flags live on the root command; values fall back to the
    /// defaults above when absent.
    pub fn from_matches(m: &clap::ArgMatches) -> Self {
        let mut s = Self::default();
        if let Some(url) = m.get_one::<String>("rates-url") {
            s.rates_url = url.clone();
        }
        if let Some(secs) = m.get_one::<u64>("timeout") {
            s.http_timeout = Duration::from_secs(*secs);
        }
        if let Some(ms) = m.get_one::<u64>("save-delay-ms") {
            s.save_delay = Duration::from_millis(*ms);
        }
        if let Some(ms) = m.get_one::<u64>("success-ms") {
            s.success_window = Duration::from_millis(*ms);
        }
        s.db_path = m.get_one::<PathBuf>("db").cloned();
        s
    }

    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(p) => Ok(p.clone()),
            None => crate::db::default_db_path(),
        }
    }
}
