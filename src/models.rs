// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{WorksheetError, WorksheetResult};
use crate::utils::{is_valid_expense_name, parse_amount};

pub const USER_INFO_KEY: &str = "userInfo";
pub const FINANCE_DATA_KEY: &str = "financeData";
pub const FINAL_USER_INFO_KEY: &str = "finalUserInfo";
pub const FINAL_FINANCE_DATA_KEY: &str = "finalFinanceData";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub currency: String,
}

impl UserInfo {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.currency.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::arbitrary_precision_option::serialize",
        deserialize_with = "lenient_amount"
    )]
    pub amount: Option<Decimal>,
}

impl Expense {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount: Some(amount),
        }
    }

    /// Both fields filled in and well-formed.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && is_valid_expense_name(&self.name)
            && self.amount.is_some_and(|a| !a.is_sign_negative())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceData {
    #[serde(
        serialize_with = "rust_decimal::serde::arbitrary_precision::serialize",
        deserialize_with = "lenient_income"
    )]
    pub monthly_income: Decimal,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl FinanceData {
    /// Positive income, one complete expense, and totals that fit a
    /// [`Decimal`].
    pub fn is_valid(&self) -> bool {
        self.monthly_income > Decimal::ZERO
            && self.expenses.iter().any(Expense::is_complete)
            && BudgetDerivation::derive(self).is_some()
    }
}

/// Totals derived from [`FinanceData`]; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetDerivation {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub remaining: Decimal,
    pub over_budget: bool,
}

impl BudgetDerivation {
    /// `None` when the totals overflow.
    pub fn derive(data: &FinanceData) -> Option<Self> {
        let total_income = data.monthly_income;
        let total_expenses = data
            .expenses
            .iter()
            .map(|e| e.amount.unwrap_or(Decimal::ZERO))
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a))?;
        let remaining = total_income.checked_sub(total_expenses)?;
        Some(Self {
            total_income,
            total_expenses,
            remaining,
            over_budget: remaining < Decimal::ZERO,
        })
    }

    /// Same totals expressed through a display rate. The over-budget flag is
    /// sign-based, so a positive rate never changes it.
    pub fn scaled(&self, rate: Decimal) -> Option<Self> {
        Some(Self {
            total_income: self.total_income.checked_mul(rate)?,
            total_expenses: self.total_expenses.checked_mul(rate)?,
            remaining: self.remaining.checked_mul(rate)?,
            over_budget: self.over_budget,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    pub base: String,
    pub rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    /// Parse an endpoint payload. Anything other than an object carrying a
    /// `rates` map of positive numbers is rejected.
    pub fn from_json(base: &str, body: Value) -> WorksheetResult<Self> {
        let Value::Object(mut obj) = body else {
            return Err(WorksheetError::Network("Rate response is not an object".into()));
        };
        let Some(Value::Object(raw)) = obj.remove("rates") else {
            return Err(WorksheetError::Network(
                "Rate response has no 'rates' table".into(),
            ));
        };
        let mut rates = BTreeMap::new();
        for (code, v) in raw {
            let rate = match decimal_from_value(v) {
                Ok(Some(r)) if r > Decimal::ZERO => r,
                _ => {
                    return Err(WorksheetError::Network(format!(
                        "Invalid rate for {}",
                        code
                    )));
                }
            };
            rates.insert(code, rate);
        }
        let base = match obj.remove("base") {
            Some(Value::String(b)) if !b.is_empty() => b,
            _ => base.to_string(),
        };
        Ok(Self { base, rates })
    }

    pub fn currencies(&self) -> Vec<String> {
        self.rates.keys().cloned().collect()
    }

    /// Identity fallback when the quote is missing from the table.
    pub fn rate(&self, quote: &str) -> Decimal {
        self.rates.get(quote).copied().unwrap_or(Decimal::ONE)
    }
}

/// The committed (UserInfo, FinanceData) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub user: UserInfo,
    pub finance: FinanceData,
}

fn decimal_from_value(v: Value) -> Result<Option<Decimal>, String> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => parse_amount(&n.to_string())
            .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
            .map(Some)
            .ok_or_else(|| format!("Invalid number '{}'", n)),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_amount(&s)
            .map(Some)
            .ok_or_else(|| format!("Invalid amount '{}'", s)),
        other => Err(format!("Expected a number, found {}", other)),
    }
}

// Older worksheets kept amounts as the text typed into the form.
fn lenient_amount<'de, D>(d: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    decimal_from_value(v).map_err(serde::de::Error::custom)
}

fn lenient_income<'de, D>(d: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    decimal_from_value(v)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("monthlyIncome is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finance_data_uses_camel_case_and_numbers() {
        let data = FinanceData {
            monthly_income: Decimal::new(2000, 0),
            expenses: vec![Expense::new("Food", Decimal::new(500, 0))],
        };
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["monthlyIncome"].as_f64(), Some(2000.0));
        assert_eq!(v["expenses"][0]["name"], "Food");
        assert_eq!(v["expenses"][0]["amount"].as_f64(), Some(500.0));
    }

    #[test]
    fn reads_amounts_entered_as_text() {
        let v = json!({
            "monthlyIncome": 1000,
            "expenses": [
                {"name": "Food", "amount": "300"},
                {"name": "Rent", "amount": ""},
                {"name": "Misc"}
            ]
        });
        let data: FinanceData = serde_json::from_value(v).unwrap();
        assert_eq!(data.expenses[0].amount, Some(Decimal::new(300, 0)));
        assert_eq!(data.expenses[1].amount, None);
        assert_eq!(data.expenses[2].amount, None);
    }

    #[test]
    fn rejects_garbage_amounts() {
        let v = json!({"monthlyIncome": 1000, "expenses": [{"name": "Food", "amount": "abc"}]});
        assert!(serde_json::from_value::<FinanceData>(v).is_err());
    }

    #[test]
    fn derivation_treats_missing_amount_as_zero() {
        let data = FinanceData {
            monthly_income: Decimal::new(1000, 0),
            expenses: vec![
                Expense::new("Food", Decimal::new(300, 0)),
                Expense {
                    name: "Gym".into(),
                    amount: None,
                },
                Expense::new("Rent", Decimal::new(800, 0)),
            ],
        };
        let d = BudgetDerivation::derive(&data).unwrap();
        assert_eq!(d.total_expenses, Decimal::new(1100, 0));
        assert_eq!(d.remaining, Decimal::new(-100, 0));
        assert!(d.over_budget);
        assert_eq!(d.total_income - d.total_expenses, d.remaining);
    }

    #[test]
    fn rate_table_falls_back_to_identity() {
        let table =
            RateTable::from_json("USD", json!({"base": "USD", "rates": {"EUR": 0.9, "INR": 83}}))
                .unwrap();
        assert_eq!(table.currencies(), vec!["EUR".to_string(), "INR".to_string()]);
        assert_eq!(table.rate("EUR"), Decimal::new(9, 1));
        assert_eq!(table.rate("INR"), Decimal::new(83, 0));
        assert_eq!(table.rate("XYZ"), Decimal::ONE);
    }

    #[test]
    fn rate_table_rejects_other_shapes() {
        for body in [
            json!([1, 2, 3]),
            json!({"base": "USD"}),
            json!({"rates": {"EUR": "abc"}}),
            json!({"rates": {"EUR": 0}}),
            json!({"rates": {"EUR": -1.5}}),
        ] {
            assert!(matches!(
                RateTable::from_json("USD", body),
                Err(WorksheetError::Network(_))
            ));
        }
    }

    #[test]
    fn totals_that_overflow_are_not_derived() {
        let huge = Decimal::from_str_exact("50000000000000000000000000000").unwrap();
        let data = FinanceData {
            monthly_income: Decimal::ONE,
            expenses: vec![Expense::new("Rent", huge), Expense::new("Food", huge)],
        };
        assert_eq!(BudgetDerivation::derive(&data), None);
        assert!(!data.is_valid());

        let one = FinanceData {
            monthly_income: Decimal::ONE,
            expenses: vec![Expense::new("Rent", huge)],
        };
        let d = BudgetDerivation::derive(&one).unwrap();
        assert_eq!(d.scaled(Decimal::new(83, 0)), None);
    }

    #[test]
    fn amounts_keep_every_digit_through_json() {
        let exact = Decimal::from_str_exact("12345678901234567.89").unwrap();
        let near_max = Decimal::MAX;
        let data = FinanceData {
            monthly_income: near_max,
            expenses: vec![Expense::new("Car", exact)],
        };
        let text = serde_json::to_string(&data).unwrap();
        assert!(text.contains("12345678901234567.89"));
        let back: FinanceData = serde_json::from_str(&text).unwrap();
        assert_eq!(back, data);
        assert_eq!(back.expenses[0].amount, Some(exact));
    }
}
