// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The worksheet state machine.
//!
//! One [`WorkflowController`] owns every form, both stores and the rate
//! request lanes. Front ends render the controller's views and feed it
//! [`Intent`]s; async rate results and the save timers are folded in by
//! [`WorkflowController::pump`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::WorksheetError;
use crate::models::{FinanceData, UserInfo, FINANCE_DATA_KEY, USER_INFO_KEY};
use crate::rates::{Delivery, RateProvider, RateQuery, RateRequests, Slot};
use crate::store::{Store, StoreExt};
use crate::views::converter::{ConverterIntent, ConverterRate, ConverterView};
use crate::views::finance::{FinanceForm, FinanceIntent};
use crate::views::identity::{IdentityForm, IdentityIntent, CURRENCY_LOAD_FAILED};
use crate::views::review::{ReviewAndCommit, ReviewIntent};
use crate::views::summary::{SummaryIntent, SummaryView};
use crate::views::{CurrencyOptions, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Identity,
    Finance,
    Summary,
    Review,
    Converter,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Identity,
        Step::Finance,
        Step::Summary,
        Step::Review,
        Step::Converter,
    ];

    pub fn route(self) -> &'static str {
        match self {
            Step::Identity => "/",
            Step::Finance => "/user-info-and-finance",
            Step::Summary => "/budget-summary",
            Step::Review => "/review-and-save",
            Step::Converter => "/currency-converter",
        }
    }

    pub fn from_route(route: &str) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.route() == route)
    }

    /// Where the back control leads. The converter is an excursion off the
    /// summary and always returns there.
    pub fn back(self) -> Step {
        match self {
            Step::Identity | Step::Finance => Step::Identity,
            Step::Summary => Step::Finance,
            Step::Review | Step::Converter => Step::Summary,
        }
    }

    fn slots(self) -> &'static [Slot] {
        match self {
            Step::Identity | Step::Finance => &[Slot::IdentityCurrencies],
            Step::Summary => &[Slot::SummaryRate],
            Step::Converter => &[Slot::ConverterCurrencies, Slot::ConverterRate],
            Step::Review => &[],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Identity => "identity",
            Step::Finance => "finance",
            Step::Summary => "summary",
            Step::Review => "review",
            Step::Converter => "converter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Navigate(Step),
    Back,
    Reset,
    Identity(IdentityIntent),
    Finance(FinanceIntent),
    Summary(SummaryIntent),
    Review(ReviewIntent),
    Converter(ConverterIntent),
}

pub struct WorkflowController {
    step: Step,
    session: Box<dyn Store>,
    durable: Box<dyn Store>,
    rates: RateRequests,
    identity: IdentityForm,
    finance: FinanceForm,
    summary: Option<SummaryView>,
    review: ReviewAndCommit,
    converter: ConverterView,
    notice: Option<WorksheetError>,
    save_delay: Duration,
    success_window: Duration,
}

impl WorkflowController {
    pub fn new(
        session: Box<dyn Store>,
        durable: Box<dyn Store>,
        provider: Arc<dyn RateProvider>,
        settings: &Settings,
    ) -> Self {
        let mut c = Self {
            step: Step::Identity,
            session,
            durable,
            rates: RateRequests::new(provider),
            identity: IdentityForm::default(),
            finance: FinanceForm::default(),
            summary: None,
            review: ReviewAndCommit::new(settings.save_delay, settings.success_window),
            converter: ConverterView::default(),
            notice: None,
            save_delay: settings.save_delay,
            success_window: settings.success_window,
        };
        c.enter(Step::Identity);
        c
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn identity(&self) -> &IdentityForm {
        &self.identity
    }

    pub fn finance(&self) -> &FinanceForm {
        &self.finance
    }

    pub fn summary(&self) -> Option<&SummaryView> {
        self.summary.as_ref()
    }

    pub fn review(&self) -> &ReviewAndCommit {
        &self.review
    }

    pub fn converter(&self) -> &ConverterView {
        &self.converter
    }

    pub fn session(&self) -> &dyn Store {
        self.session.as_ref()
    }

    pub fn durable(&self) -> &dyn Store {
        self.durable.as_ref()
    }

    /// Last redirect caused by a missing prerequisite, if any.
    pub fn notice(&self) -> Option<&WorksheetError> {
        self.notice.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.review.is_busy()
    }

    pub fn has_pending_rates(&self) -> bool {
        self.rates.has_pending()
    }

    pub fn dispatch(&mut self, intent: Intent) -> Step {
        self.dispatch_at(intent, Instant::now())
    }

    pub fn dispatch_at(&mut self, intent: Intent, now: Instant) -> Step {
        if self.review.is_busy() {
            debug!(?intent, "ignored while saving");
            return self.step;
        }
        match intent {
            Intent::Navigate(step) => self.navigate(step),
            Intent::Back => self.navigate(self.step.back()),
            Intent::Reset => self.reset(),
            Intent::Identity(i) if self.step == Step::Identity => {
                let t = self.identity.apply(i, self.session.as_ref());
                self.follow(t);
            }
            Intent::Finance(i) if self.step == Step::Finance => {
                let updating = i == FinanceIntent::Info(IdentityIntent::Submit);
                let t = self.finance.apply(i, self.session.as_ref());
                if updating && self.finance.info.errors.is_empty() {
                    if let Some(user) = &self.finance.profile {
                        self.identity.hydrate(user);
                    }
                }
                self.follow(t);
            }
            Intent::Summary(i) if self.step == Step::Summary => match i {
                SummaryIntent::ProceedToReview => self.navigate(Step::Review),
                SummaryIntent::OpenConverter => self.navigate(Step::Converter),
            },
            Intent::Review(i) if self.step == Step::Review => {
                let t = self.review.apply(i, now);
                self.follow(t);
            }
            Intent::Converter(i) if self.step == Step::Converter => {
                if let Some(query) = self.converter.apply(i) {
                    self.rates.request(Slot::ConverterRate, query);
                } else if self.converter.rate != ConverterRate::Pending {
                    self.rates.cancel(Slot::ConverterRate);
                }
            }
            other => debug!(?other, step = %self.step, "intent does not apply to this step"),
        }
        self.step
    }

    /// Fold in finished rate requests and advance the save timers.
    pub fn pump(&mut self, now: Instant) {
        for d in self.rates.poll() {
            self.deliver(d);
        }
        self.review.tick(now, self.durable.as_ref());
    }

    /// Wait (bounded) for outstanding rate requests, then pump.
    pub fn settle(&mut self, timeout: Duration) {
        for d in self.rates.settle(timeout) {
            self.deliver(d);
        }
        self.review.tick(Instant::now(), self.durable.as_ref());
    }

    fn follow(&mut self, t: Transition) {
        if let Transition::Go(step) = t {
            self.navigate(step);
        }
    }

    pub fn navigate(&mut self, target: Step) {
        let resolved = match self.check_prerequisites(target) {
            Ok(()) => {
                self.notice = None;
                target
            }
            Err(e) => {
                warn!("{}; redirecting to {}", e, Step::Identity.route());
                self.notice = Some(e);
                Step::Identity
            }
        };
        if resolved != self.step {
            self.leave(self.step);
        }
        info!(from = %self.step, to = %resolved, route = resolved.route(), "navigate");
        self.step = resolved;
        self.enter(resolved);
    }

    fn check_prerequisites(&self, target: Step) -> Result<(), WorksheetError> {
        let missing = WorksheetError::MissingPrerequisite { step: target };
        let needs_user = matches!(target, Step::Finance | Step::Summary | Step::Review);
        let needs_finance = matches!(target, Step::Summary | Step::Review);
        if needs_user && !self.stored_user().is_some_and(|u| u.is_complete()) {
            return Err(missing);
        }
        if needs_finance && !self.stored_finance().is_some_and(|f| f.is_valid()) {
            return Err(missing);
        }
        Ok(())
    }

    fn stored_user(&self) -> Option<UserInfo> {
        self.session
            .get_record(USER_INFO_KEY)
            .inspect_err(|e| warn!("unreadable user info: {}", e))
            .ok()
            .flatten()
    }

    fn stored_finance(&self) -> Option<FinanceData> {
        self.session
            .get_record(FINANCE_DATA_KEY)
            .inspect_err(|e| warn!("unreadable finance data: {}", e))
            .ok()
            .flatten()
    }

    fn leave(&mut self, step: Step) {
        for slot in step.slots() {
            self.rates.cancel(*slot);
        }
    }

    fn enter(&mut self, step: Step) {
        match step {
            Step::Identity => {
                if self.identity.is_blank() {
                    if let Some(user) = self.stored_user() {
                        self.identity.hydrate(&user);
                    }
                }
                if !self.identity.options.is_ready() {
                    self.identity.options = CurrencyOptions::Loading;
                    self.rates
                        .request(Slot::IdentityCurrencies, RateQuery::Currencies);
                }
            }
            Step::Finance => {
                let user = self.stored_user();
                self.finance.set_profile(user);
                if !self.finance.info.options.is_ready() {
                    if self.identity.options.is_ready() {
                        self.finance.info.options = self.identity.options.clone();
                    } else {
                        self.finance.info.options = CurrencyOptions::Loading;
                        self.rates
                            .request(Slot::IdentityCurrencies, RateQuery::Currencies);
                    }
                }
                if self.finance.is_pristine() {
                    if let Some(data) = self.stored_finance() {
                        self.finance.hydrate(&data);
                    }
                }
            }
            Step::Summary => match SummaryView::load(self.session.as_ref()) {
                Ok(view) => {
                    let query = view.rate_query();
                    self.summary = Some(view);
                    self.rates.request(Slot::SummaryRate, query);
                }
                Err(e) => {
                    warn!("summary unavailable: {}", e);
                    self.summary = None;
                }
            },
            Step::Review => {
                if let Err(e) = self.review.load(self.session.as_ref()) {
                    warn!("review unavailable: {}", e);
                }
            }
            Step::Converter => {
                if !self.converter.options.is_ready() {
                    self.converter.options = CurrencyOptions::Loading;
                    self.rates
                        .request(Slot::ConverterCurrencies, RateQuery::Currencies);
                }
                match self.converter.pair_changed() {
                    Some(query) => {
                        self.rates.request(Slot::ConverterRate, query);
                    }
                    None => self.rates.cancel(Slot::ConverterRate),
                }
            }
        }
    }

    fn deliver(&mut self, d: Delivery) {
        match d.slot {
            Slot::IdentityCurrencies => {
                let options = CurrencyOptions::from_reply(d.result, CURRENCY_LOAD_FAILED);
                self.finance.info.options = options.clone();
                self.identity.options = options;
            }
            Slot::SummaryRate => {
                if let Some(view) = self.summary.as_mut() {
                    view.apply_rate(d.result);
                }
            }
            Slot::ConverterCurrencies => self.converter.apply_options(d.result),
            Slot::ConverterRate => self.converter.apply_rate(d.result),
        }
    }

    fn reset(&mut self) {
        info!("workflow reset");
        if let Err(e) = self.session.clear() {
            warn!("could not clear session: {}", e);
        }
        for step in Step::ALL {
            self.leave(step);
        }
        let options = std::mem::replace(&mut self.identity.options, CurrencyOptions::Loading);
        self.identity = IdentityForm {
            options,
            ..IdentityForm::default()
        };
        self.finance = FinanceForm::default();
        self.summary = None;
        self.review = ReviewAndCommit::new(self.save_delay, self.success_window);
        self.converter = ConverterView::default();
        self.notice = None;
        self.step = Step::Identity;
        self.enter(Step::Identity);
    }

    pub fn render(&self) -> String {
        let mut out = format!("[{}]\n", self.step.route());
        if let Some(n) = &self.notice {
            out.push_str(&format!("  ! {}\n", n));
        }
        let body = match self.step {
            Step::Identity => self.identity.render(),
            Step::Finance => self.finance.render(),
            Step::Summary => self
                .summary
                .as_ref()
                .map(SummaryView::render)
                .unwrap_or_else(|| "Summary unavailable.\n".into()),
            Step::Review => self.review.render(),
            Step::Converter => self.converter.render(),
        };
        out.push_str(&body);
        out
    }
}
