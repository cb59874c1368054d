// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{WorksheetError, WorksheetResult};
use crate::models::RateTable;

pub const DEFAULT_RATES_URL: &str = "https://api.exchangerate-api.com/v4/latest";
/// Base used to probe the endpoint for the list of known currencies.
pub const PROBE_BASE: &str = "USD";

pub trait RateProvider: Send + Sync {
    fn fetch_table(&self, base: &str) -> WorksheetResult<RateTable>;

    fn list_currencies(&self) -> WorksheetResult<Vec<String>> {
        Ok(self.fetch_table(PROBE_BASE)?.currencies())
    }

    /// 1 base = rate quote. Self pairs never touch the network.
    fn rate(&self, base: &str, quote: &str) -> WorksheetResult<Decimal> {
        if base == quote {
            return Ok(Decimal::ONE);
        }
        Ok(self.fetch_table(base)?.rate(quote))
    }
}

/// `GET {base_url}/{BASE}` against an exchangerate-api style endpoint.
pub struct HttpRateProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn url_for(&self, base: &str) -> String {
        format!("{}/{}", self.base_url, base)
    }
}

impl RateProvider for HttpRateProvider {
    fn fetch_table(&self, base: &str) -> WorksheetResult<RateTable> {
        let url = self.url_for(base);
        debug!(%url, "fetching rate table");
        let resp = self.client.get(&url).send()?.error_for_status()?;
        let body: Value = resp
            .json()
            .map_err(|e| WorksheetError::Network(format!("Malformed rate response: {}", e)))?;
        let table = RateTable::from_json(base, body)?;
        info!(base, currencies = table.rates.len(), "rate table fetched");
        Ok(table)
    }
}

/// Request lanes; each view owns one or two and a new request in a lane
/// supersedes whatever was in flight there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    IdentityCurrencies,
    SummaryRate,
    ConverterCurrencies,
    ConverterRate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateQuery {
    Currencies,
    Rate { base: String, quote: String },
    /// Like `Rate`, but always fetches the base table, self pairs included.
    Table { base: String, quote: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RateReply {
    Currencies(Vec<String>),
    Rate {
        base: String,
        quote: String,
        rate: Decimal,
    },
}

#[derive(Debug)]
pub struct Delivery {
    pub slot: Slot,
    pub result: WorksheetResult<RateReply>,
}

struct Tagged {
    slot: Slot,
    epoch: u64,
    result: WorksheetResult<RateReply>,
}

/// Runs provider calls on worker threads and hands results back to the
/// owning thread. Every request carries an epoch; only the latest epoch per
/// slot is accepted, anything else is dropped on arrival.
pub struct RateRequests {
    provider: Arc<dyn RateProvider>,
    tx: Sender<Tagged>,
    rx: Receiver<Tagged>,
    next_epoch: u64,
    in_flight: HashMap<Slot, u64>,
}

impl RateRequests {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            provider,
            tx,
            rx,
            next_epoch: 0,
            in_flight: HashMap::new(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn RateProvider> {
        &self.provider
    }

    pub fn request(&mut self, slot: Slot, query: RateQuery) -> u64 {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        self.in_flight.insert(slot, epoch);
        debug!(?slot, epoch, ?query, "rate request issued");

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = match query {
                RateQuery::Currencies => provider.list_currencies().map(RateReply::Currencies),
                RateQuery::Rate { base, quote } => provider
                    .rate(&base, &quote)
                    .map(|rate| RateReply::Rate { base, quote, rate }),
                RateQuery::Table { base, quote } => {
                    provider.fetch_table(&base).map(|table| RateReply::Rate {
                        rate: table.rate(&quote),
                        base,
                        quote,
                    })
                }
            };
            // Receiver gone means the session ended; nothing to report to.
            let _ = tx.send(Tagged {
                slot,
                epoch,
                result,
            });
        });
        epoch
    }

    pub fn cancel(&mut self, slot: Slot) {
        if let Some(epoch) = self.in_flight.remove(&slot) {
            debug!(?slot, epoch, "rate request cancelled");
        }
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.in_flight.contains_key(&slot)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Drain whatever has arrived without blocking.
    pub fn poll(&mut self) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Ok(t) = self.rx.try_recv() {
            if let Some(d) = self.accept(t) {
                out.push(d);
            }
        }
        out
    }

    /// Block until every current request has answered or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) -> Vec<Delivery> {
        let deadline = Instant::now() + timeout;
        let mut out = self.poll();
        while self.has_pending() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(t) => {
                    if let Some(d) = self.accept(t) {
                        out.push(d);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("rate requests still outstanding after {:?}", timeout);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        out
    }

    fn accept(&mut self, t: Tagged) -> Option<Delivery> {
        if self.in_flight.get(&t.slot) != Some(&t.epoch) {
            debug!(slot = ?t.slot, epoch = t.epoch, "discarding stale rate response");
            return None;
        }
        self.in_flight.remove(&t.slot);
        if let Err(e) = &t.result {
            warn!(slot = ?t.slot, "rate request failed: {}", e);
        }
        Some(Delivery {
            slot: t.slot,
            result: t.result,
        })
    }
}
