// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Settings;
use crate::rates::{HttpRateProvider, RateProvider};
use crate::store::DurableStore;
use crate::utils::http_client;

pub mod exporter;
pub mod fx;
pub mod snapshot;
pub mod worksheet;

pub fn rate_provider(settings: &Settings) -> Result<Arc<dyn RateProvider>> {
    let client = http_client(settings.http_timeout)?;
    Ok(Arc::new(HttpRateProvider::new(client, settings.rates_url.clone())))
}

pub fn open_durable(settings: &Settings) -> Result<DurableStore> {
    let path = settings.resolve_db_path()?;
    tracing::debug!(path = %path.display(), "opening saved worksheets");
    DurableStore::open(&path)
}
