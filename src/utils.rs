// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

const UA: &str = concat!(
    "budgetsheet/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/budgetsheet)"
);

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("number pattern"));
static EXPENSE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s]*$").expect("expense name pattern"));
static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency code pattern"));

pub fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(UA)
        .build()?;
    Ok(c)
}

/// Lenient number parsing for form input: surrounding whitespace, a leading
/// sign, "1." and ".5" are all accepted.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let t = s.trim();
    if !NUMBER.is_match(t) {
        return None;
    }
    let (neg, digits) = match t.as_bytes()[0] {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    let digits = digits.strip_suffix('.').unwrap_or(digits);
    let mut d = if let Some(frac) = digits.strip_prefix('.') {
        Decimal::from_str(&format!("0.{}", frac)).ok()?
    } else {
        Decimal::from_str(digits).ok()?
    };
    d.set_sign_negative(neg && !d.is_zero());
    Some(d)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    parse_amount(s).with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn is_valid_expense_name(s: &str) -> bool {
    EXPENSE_NAME.is_match(s)
}

pub fn is_currency_code(s: &str) -> bool {
    CURRENCY_CODE.is_match(s)
}

pub fn is_valid_email(s: &str) -> bool {
    let s = s.trim();
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// Two decimal places, no currency.
pub fn fmt_amount(d: &Decimal) -> String {
    format!(
        "{:.2}",
        d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {}", fmt_amount(d), ccy)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(json_flag: bool, v: &T) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_accepts_partial_input() {
        assert_eq!(parse_amount("12"), Some(Decimal::new(12, 0)));
        assert_eq!(parse_amount(" 12.50 "), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_amount("1."), Some(Decimal::ONE));
        assert_eq!(parse_amount(".5"), Some(Decimal::new(5, 1)));
        assert_eq!(parse_amount("-3"), Some(Decimal::new(-3, 0)));
        assert_eq!(parse_amount("+4"), Some(Decimal::new(4, 0)));
    }

    #[test]
    fn parse_amount_rejects_non_numbers() {
        for s in ["", " ", "-", ".", "1.2.3", "12a", "abc", "1,000", "--1"] {
            assert_eq!(parse_amount(s), None, "{s:?}");
        }
    }

    #[test]
    fn expense_names_are_letters_and_spaces() {
        assert!(is_valid_expense_name("Food"));
        assert!(is_valid_expense_name("Car insurance"));
        assert!(is_valid_expense_name(""));
        assert!(!is_valid_expense_name("Food123"));
        assert!(!is_valid_expense_name("Rent!"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@x"));
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@x"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a b@x"));
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(fmt_money(&Decimal::new(-100, 0), "USD"), "-100.00 USD");
        assert_eq!(fmt_amount(&Decimal::new(12345, 3)), "12.35");
    }
}
