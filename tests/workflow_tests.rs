// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use budgetsheet::config::Settings;
use budgetsheet::error::{WorksheetError, WorksheetResult};
use budgetsheet::models::{
    FinanceData, RateTable, UserInfo, FINAL_USER_INFO_KEY, FINANCE_DATA_KEY, USER_INFO_KEY,
};
use budgetsheet::rates::RateProvider;
use budgetsheet::store::{DurableStore, SessionStore, Store, StoreExt};
use budgetsheet::views::finance::{FinanceIntent, INCOMPLETE_LAST_ROW, TOTALS_OVERFLOW};
use budgetsheet::views::identity::{IdentityIntent, CURRENCY_LOAD_FAILED};
use budgetsheet::views::review::{load_committed, ReviewIntent, SaveState};
use budgetsheet::views::summary::{DisplayRate, SummaryIntent, OVER_BUDGET_WARNING, RATE_FAILED};
use budgetsheet::views::CurrencyOptions;
use budgetsheet::workflow::{Intent, Step, WorkflowController};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::Value;

const SETTLE: Duration = Duration::from_secs(2);

struct Table;

impl RateProvider for Table {
    fn fetch_table(&self, base: &str) -> WorksheetResult<RateTable> {
        let mut rates = BTreeMap::new();
        rates.insert("EUR".to_string(), Decimal::new(9, 1));
        rates.insert("INR".to_string(), Decimal::new(83, 0));
        rates.insert("USD".to_string(), Decimal::ONE);
        rates.insert(base.to_string(), Decimal::ONE);
        Ok(RateTable {
            base: base.to_string(),
            rates,
        })
    }
}

struct Down;

impl RateProvider for Down {
    fn fetch_table(&self, _base: &str) -> WorksheetResult<RateTable> {
        Err(WorksheetError::Network("connection refused".into()))
    }
}

/// Durable store that refuses writes while `fail` is set.
struct Flaky {
    fail: Rc<Cell<bool>>,
    inner: SessionStore,
}

impl Store for Flaky {
    fn put(&self, key: &str, value: &Value) -> WorksheetResult<()> {
        if self.fail.get() {
            return Err(WorksheetError::Persistence("disk full".into()));
        }
        self.inner.put(key, value)
    }
    fn get(&self, key: &str) -> WorksheetResult<Option<Value>> {
        self.inner.get(key)
    }
    fn remove(&self, key: &str) -> WorksheetResult<()> {
        self.inner.remove(key)
    }
    fn clear(&self) -> WorksheetResult<()> {
        self.inner.clear()
    }
}

fn settings(save_delay: Duration) -> Settings {
    Settings {
        save_delay,
        success_window: Duration::from_secs(60),
        ..Settings::default()
    }
}

fn setup_with(provider: impl RateProvider + 'static, durable: Box<dyn Store>, s: &Settings) -> WorkflowController {
    let session = SessionStore::new().unwrap();
    let mut ctl = WorkflowController::new(Box::new(session), durable, Arc::new(provider), s);
    ctl.settle(SETTLE);
    ctl
}

fn setup() -> WorkflowController {
    let durable = DurableStore::from_connection(Connection::open_in_memory().unwrap()).unwrap();
    setup_with(Table, Box::new(durable), &settings(Duration::ZERO))
}

fn fill_identity(ctl: &mut WorkflowController, currency: &str) {
    ctl.dispatch(Intent::Identity(IdentityIntent::SetName("Ada".into())));
    ctl.dispatch(Intent::Identity(IdentityIntent::SetEmail("ada@example.com".into())));
    ctl.dispatch(Intent::Identity(IdentityIntent::SelectCurrency(currency.into())));
    ctl.dispatch(Intent::Identity(IdentityIntent::Submit));
}

fn fill_finance(ctl: &mut WorkflowController, income: &str, expenses: &[(&str, &str)]) {
    ctl.dispatch(Intent::Finance(FinanceIntent::SetIncome(income.into())));
    for (row, (name, amount)) in expenses.iter().enumerate() {
        if row > 0 {
            ctl.dispatch(Intent::Finance(FinanceIntent::AddExpense));
        }
        ctl.dispatch(Intent::Finance(FinanceIntent::SetName {
            row,
            text: name.to_string(),
        }));
        ctl.dispatch(Intent::Finance(FinanceIntent::SetAmount {
            row,
            text: amount.to_string(),
        }));
    }
    ctl.dispatch(Intent::Finance(FinanceIntent::Submit));
}

#[test]
fn happy_path_commits_what_the_session_holds() {
    let mut ctl = setup();
    assert!(ctl.identity().options.is_ready());

    fill_identity(&mut ctl, "USD");
    assert_eq!(ctl.step(), Step::Finance);
    let user: UserInfo = ctl.session().get_record(USER_INFO_KEY).unwrap().unwrap();
    assert_eq!(
        user,
        UserInfo {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            currency: "USD".into(),
        }
    );

    fill_finance(&mut ctl, "1000", &[("Rent", "400"), ("Food", "250")]);
    assert_eq!(ctl.step(), Step::Summary);
    ctl.settle(SETTLE);

    let summary = ctl.summary().unwrap();
    let shown = summary.displayed();
    assert_eq!(shown.total_expenses, Decimal::new(650, 0));
    assert_eq!(shown.remaining, Decimal::new(350, 0));
    assert!(!shown.over_budget);
    assert!(ctl.render().contains("Remaining Budget: 350.00 USD"));

    ctl.dispatch(Intent::Summary(SummaryIntent::ProceedToReview));
    assert_eq!(ctl.step(), Step::Review);
    ctl.dispatch(Intent::Review(ReviewIntent::Save));
    assert!(ctl.is_busy());
    ctl.pump(Instant::now());
    assert!(matches!(ctl.review().state, SaveState::Saved { .. }));
    assert!(ctl.render().contains("Success! Your data has been saved."));

    let committed = load_committed(ctl.durable()).unwrap().unwrap();
    let finance: FinanceData = ctl.session().get_record(FINANCE_DATA_KEY).unwrap().unwrap();
    assert_eq!(committed.user, user);
    assert_eq!(committed.finance, finance);
    let names: Vec<_> = committed.finance.expenses.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Rent", "Food"]);
}

#[test]
fn overspending_is_flagged() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "EUR");
    fill_finance(&mut ctl, "500", &[("Rent", "800")]);
    ctl.settle(SETTLE);
    let shown = ctl.summary().unwrap().displayed();
    assert_eq!(shown.remaining, Decimal::new(-300, 0));
    assert!(shown.over_budget);
    let page = ctl.render();
    assert!(page.contains("Remaining Budget: -300.00 EUR"));
    assert!(page.contains(OVER_BUDGET_WARNING));
}

#[test]
fn deep_links_without_prerequisites_land_on_identity() {
    let mut ctl = setup();
    for target in [Step::Finance, Step::Summary, Step::Review] {
        ctl.dispatch(Intent::Navigate(target));
        assert_eq!(ctl.step(), Step::Identity);
        assert!(matches!(
            ctl.notice(),
            Some(WorksheetError::MissingPrerequisite { step }) if *step == target
        ));
    }

    fill_identity(&mut ctl, "USD");
    ctl.dispatch(Intent::Navigate(Step::Summary));
    assert_eq!(ctl.step(), Step::Identity);
}

#[test]
fn rate_outage_does_not_block_the_worksheet() {
    let durable = DurableStore::from_connection(Connection::open_in_memory().unwrap()).unwrap();
    let mut ctl = setup_with(Down, Box::new(durable), &settings(Duration::ZERO));
    assert_eq!(
        ctl.identity().options,
        CurrencyOptions::Failed(CURRENCY_LOAD_FAILED.to_string())
    );
    assert!(ctl.render().contains(CURRENCY_LOAD_FAILED));

    fill_identity(&mut ctl, "usd");
    assert_eq!(ctl.step(), Step::Finance);
    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.settle(SETTLE);
    let summary = ctl.summary().unwrap();
    assert_eq!(summary.rate, DisplayRate::Failed(RATE_FAILED.to_string()));
    assert_eq!(summary.effective_rate(), Decimal::ONE);
    let page = ctl.render();
    assert!(page.contains(RATE_FAILED));
    assert!(page.contains("Total Income:     1000.00 USD"));
}

#[test]
fn totals_too_large_keep_the_finance_step() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    fill_finance(
        &mut ctl,
        "1000",
        &[
            ("Rent", "50000000000000000000000000000"),
            ("Food", "50000000000000000000000000000"),
        ],
    );
    assert_eq!(ctl.step(), Step::Finance);
    assert_eq!(ctl.finance().expense_error.as_deref(), Some(TOTALS_OVERFLOW));
    assert!(ctl.session().get(FINANCE_DATA_KEY).unwrap().is_none());
    assert!(ctl.render().contains(TOTALS_OVERFLOW));
}

#[test]
fn large_amounts_are_totalled_exactly() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    fill_finance(&mut ctl, "20000000000000000", &[("Rent", "12345678901234567.89")]);
    assert_eq!(ctl.step(), Step::Summary);
    ctl.settle(SETTLE);
    let page = ctl.render();
    assert!(page.contains("Total Expenses:   12345678901234567.89 USD"));
    assert!(page.contains("Remaining Budget: 7654321098765432.11 USD"));
}

#[test]
fn finance_page_can_update_the_profile() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    assert!(ctl.finance().info.options.is_ready());
    ctl.dispatch(Intent::Finance(FinanceIntent::Info(IdentityIntent::SelectCurrency(
        "EUR".into(),
    ))));
    ctl.dispatch(Intent::Finance(FinanceIntent::Info(IdentityIntent::Submit)));
    assert_eq!(ctl.step(), Step::Finance);
    let user: UserInfo = ctl.session().get_record(USER_INFO_KEY).unwrap().unwrap();
    assert_eq!(user.currency, "EUR");
    assert_eq!(ctl.identity().currency, "EUR");
    assert!(ctl.render().contains("Selected Currency: EUR"));

    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.settle(SETTLE);
    assert_eq!(ctl.summary().unwrap().user.currency, "EUR");
    assert!(ctl.render().contains("Total Income:     1000.00 EUR"));
}

#[test]
fn finance_page_update_rejects_bad_input() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    ctl.dispatch(Intent::Finance(FinanceIntent::Info(IdentityIntent::SetEmail(
        "nope".into(),
    ))));
    ctl.dispatch(Intent::Finance(FinanceIntent::Info(IdentityIntent::Submit)));
    assert_eq!(ctl.step(), Step::Finance);
    assert!(ctl.finance().info.error_for("email").is_some());
    let user: UserInfo = ctl.session().get_record(USER_INFO_KEY).unwrap().unwrap();
    assert_eq!(user.email, "ada@example.com");
}

#[test]
fn identity_errors_keep_the_step() {
    let mut ctl = setup();
    ctl.dispatch(Intent::Identity(IdentityIntent::SetEmail("not-an-email".into())));
    ctl.dispatch(Intent::Identity(IdentityIntent::Submit));
    assert_eq!(ctl.step(), Step::Identity);
    assert!(ctl.identity().error_for("name").is_some());
    assert!(ctl.identity().error_for("email").is_some());
    assert!(ctl.identity().error_for("currency").is_some());
    assert!(ctl.session().get(USER_INFO_KEY).unwrap().is_none());
}

#[test]
fn add_with_an_incomplete_last_row_changes_nothing() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    ctl.dispatch(Intent::Finance(FinanceIntent::SetName {
        row: 0,
        text: "Rent".into(),
    }));
    ctl.dispatch(Intent::Finance(FinanceIntent::AddExpense));
    assert_eq!(ctl.finance().rows.len(), 1);
    assert_eq!(ctl.finance().expense_error.as_deref(), Some(INCOMPLETE_LAST_ROW));
}

#[test]
fn expense_name_keystrokes_drop_non_letters() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    for ch in "Food123".chars() {
        ctl.dispatch(Intent::Finance(FinanceIntent::TypeName { row: 0, ch }));
    }
    assert_eq!(ctl.finance().rows[0].name, "Food");
}

#[test]
fn back_keeps_partial_input() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    ctl.dispatch(Intent::Finance(FinanceIntent::SetIncome("1000".into())));
    ctl.dispatch(Intent::Finance(FinanceIntent::SetName {
        row: 0,
        text: "Re".into(),
    }));
    ctl.dispatch(Intent::Back);
    assert_eq!(ctl.step(), Step::Identity);
    assert_eq!(ctl.identity().name, "Ada");

    ctl.dispatch(Intent::Identity(IdentityIntent::Submit));
    assert_eq!(ctl.step(), Step::Finance);
    assert_eq!(ctl.finance().income, "1000");
    assert_eq!(ctl.finance().rows[0].name, "Re");
}

#[test]
fn review_edit_returns_to_the_form() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.dispatch(Intent::Summary(SummaryIntent::ProceedToReview));
    ctl.dispatch(Intent::Review(ReviewIntent::Edit(Step::Finance)));
    assert_eq!(ctl.step(), Step::Finance);
    assert_eq!(ctl.finance().income, "1000");
}

#[test]
fn saving_blocks_input_until_the_write_lands() {
    let durable = DurableStore::from_connection(Connection::open_in_memory().unwrap()).unwrap();
    let mut ctl = setup_with(Table, Box::new(durable), &settings(Duration::from_secs(10)));
    fill_identity(&mut ctl, "USD");
    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.dispatch(Intent::Summary(SummaryIntent::ProceedToReview));

    let t0 = Instant::now();
    ctl.dispatch_at(Intent::Review(ReviewIntent::Save), t0);
    assert!(ctl.is_busy());
    assert!(ctl.render().contains("saving"));

    ctl.dispatch_at(Intent::Review(ReviewIntent::Save), t0);
    ctl.dispatch_at(Intent::Back, t0);
    assert_eq!(ctl.step(), Step::Review);

    ctl.pump(t0 + Duration::from_secs(5));
    assert!(ctl.is_busy());
    assert!(ctl.durable().get(FINAL_USER_INFO_KEY).unwrap().is_none());

    ctl.pump(t0 + Duration::from_secs(10));
    assert!(!ctl.is_busy());
    assert!(ctl.durable().get(FINAL_USER_INFO_KEY).unwrap().is_some());

    ctl.pump(t0 + Duration::from_secs(71));
    assert_eq!(ctl.review().state, SaveState::Idle);
}

#[test]
fn failed_save_reports_and_can_be_retried() {
    let fail = Rc::new(Cell::new(true));
    let durable = Flaky {
        fail: Rc::clone(&fail),
        inner: SessionStore::new().unwrap(),
    };
    let mut ctl = setup_with(Table, Box::new(durable), &settings(Duration::ZERO));
    fill_identity(&mut ctl, "USD");
    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.dispatch(Intent::Summary(SummaryIntent::ProceedToReview));

    ctl.dispatch(Intent::Review(ReviewIntent::Save));
    ctl.pump(Instant::now());
    assert!(matches!(ctl.review().state, SaveState::Failed(_)));
    assert!(ctl.render().contains("Save failed"));
    assert!(load_committed(ctl.durable()).unwrap().is_none());

    fail.set(false);
    ctl.dispatch(Intent::Review(ReviewIntent::Save));
    ctl.pump(Instant::now());
    assert!(matches!(ctl.review().state, SaveState::Saved { .. }));
    assert!(load_committed(ctl.durable()).unwrap().is_some());
}

#[test]
fn reset_clears_the_session() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "USD");
    fill_finance(&mut ctl, "1000", &[("Rent", "400")]);
    ctl.dispatch(Intent::Reset);
    assert_eq!(ctl.step(), Step::Identity);
    assert!(ctl.identity().is_blank());
    assert!(ctl.session().get(USER_INFO_KEY).unwrap().is_none());
    assert!(ctl.session().get(FINANCE_DATA_KEY).unwrap().is_none());
    // Currency list survives the reset.
    assert!(ctl.identity().options.is_ready());
}

#[test]
fn returning_to_identity_prefills_from_the_session() {
    let mut ctl = setup();
    fill_identity(&mut ctl, "INR");
    ctl.dispatch(Intent::Navigate(Step::Identity));
    assert_eq!(ctl.identity().currency, "INR");
    assert_eq!(ctl.identity().email, "ada@example.com");
}
