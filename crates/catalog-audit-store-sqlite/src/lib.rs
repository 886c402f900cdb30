#![allow(clippy::missing_errors_doc)]

//! In-memory order ledger harness.
//!
//! A fresh SQLite database is seeded from a SQL script (schema plus rows,
//! one batch) and queried through three fixed aggregate checks. Nothing
//! mutates after seeding; the connection lives for one harness run.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};

/// Month filter and expected aggregates for the bundled seed script.
pub const SEED_MONTH: &str = "2024-03";
pub const SEED_MONTH_TOTAL: i64 = 27_000;
pub const SEED_TOP_CUSTOMER: &str = "Alice";
pub const SEED_TOP_CUSTOMER_TOTAL: i64 = 20_000;
pub const SEED_AVERAGE_ORDER_VALUE: f64 = 5_400.0;

/// The bundled seed script, kept next to its expected values.
pub const DEFAULT_SEED_SCRIPT: &str = include_str!("../fixtures/orders_seed.sql");

pub struct OrderLedger {
    conn: Connection,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CustomerSpend {
    pub customer: String,
    pub total_spent: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct LedgerExpectations {
    pub month: String,
    pub monthly_total: i64,
    pub top_customer: String,
    pub top_customer_total: i64,
    pub average_order_value: f64,
}

impl LedgerExpectations {
    /// Expectations matching `fixtures/orders_seed.sql`.
    #[must_use]
    pub fn seed_baseline() -> Self {
        Self {
            month: SEED_MONTH.to_string(),
            monthly_total: SEED_MONTH_TOTAL,
            top_customer: SEED_TOP_CUSTOMER.to_string(),
            top_customer_total: SEED_TOP_CUSTOMER_TOTAL,
            average_order_value: SEED_AVERAGE_ORDER_VALUE,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct LedgerCheck {
    pub name: String,
    pub expected: Value,
    pub actual: Value,
    pub passed: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct LedgerCheckReport {
    pub passed: bool,
    pub checks: Vec<LedgerCheck>,
}

impl LedgerCheckReport {
    /// Human-readable summaries of the failed checks.
    #[must_use]
    pub fn mismatches(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| {
                format!(
                    "{}: expected {} got {}",
                    check.name, check.expected, check.actual
                )
            })
            .collect()
    }
}

impl OrderLedger {
    /// Opens a fresh isolated in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to open in-memory sqlite database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("failed to configure sqlite pragmas")?;
        Ok(Self { conn })
    }

    /// Executes the whole seed script (schema + rows) as one batch.
    pub fn seed_from_script(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .context("failed to execute orders seed script")
    }

    pub fn seed_from_file(&self, path: &Path) -> Result<()> {
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed script {}", path.display()))?;
        self.seed_from_script(&sql)
    }

    /// Sum of amounts for orders whose date falls in the given `YYYY-MM`
    /// month. `None` when no order matches.
    pub fn monthly_sales_total(&self, year_month: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT SUM(amount)
                 FROM orders
                 WHERE strftime('%Y-%m', order_date) = ?1",
                params![year_month],
                |row| row.get::<_, Option<i64>>(0),
            )
            .context("failed to query monthly sales total")
    }

    /// Customer with the maximum total spend. `None` on an empty ledger.
    pub fn top_customer(&self) -> Result<Option<CustomerSpend>> {
        self.conn
            .query_row(
                "SELECT customer, SUM(amount) AS total_spent
                 FROM orders
                 GROUP BY customer
                 ORDER BY total_spent DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(CustomerSpend {
                        customer: row.get(0)?,
                        total_spent: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("failed to query top customer")
    }

    /// Mean of all order amounts. `None` on an empty ledger.
    pub fn average_order_value(&self) -> Result<Option<f64>> {
        self.conn
            .query_row("SELECT AVG(amount) FROM orders", [], |row| {
                row.get::<_, Option<f64>>(0)
            })
            .context("failed to query average order value")
    }

    /// Runs the three aggregate checks against the given expectations.
    ///
    /// Mismatches are data in the report, not errors; only SQL failures
    /// surface as errors. Exact equality is acceptable because the seed
    /// amounts are fixed integers.
    pub fn run_checks(&self, expectations: &LedgerExpectations) -> Result<LedgerCheckReport> {
        let monthly = self.monthly_sales_total(&expectations.month)?;
        let top = self.top_customer()?;
        let average = self.average_order_value()?;

        let checks = vec![
            LedgerCheck {
                name: format!("monthly_sales_total[{}]", expectations.month),
                expected: json!(expectations.monthly_total),
                actual: json!(monthly),
                passed: monthly == Some(expectations.monthly_total),
            },
            LedgerCheck {
                name: "top_customer".to_string(),
                expected: json!({
                    "customer": expectations.top_customer,
                    "total_spent": expectations.top_customer_total,
                }),
                actual: json!(top),
                passed: top.as_ref().is_some_and(|spend| {
                    spend.customer == expectations.top_customer
                        && spend.total_spent == expectations.top_customer_total
                }),
            },
            LedgerCheck {
                name: "average_order_value".to_string(),
                expected: json!(expectations.average_order_value),
                actual: json!(average),
                passed: average == Some(expectations.average_order_value),
            },
        ];

        Ok(LedgerCheckReport {
            passed: checks.iter().all(|check| check.passed),
            checks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err}"),
        }
    }

    fn seeded_ledger() -> OrderLedger {
        let ledger = must(OrderLedger::open_in_memory());
        must(ledger.seed_from_script(DEFAULT_SEED_SCRIPT));
        ledger
    }

    #[test]
    fn march_2024_sales_total_is_27000() {
        let ledger = seeded_ledger();
        assert_eq!(must(ledger.monthly_sales_total(SEED_MONTH)), Some(27_000));
    }

    #[test]
    fn top_customer_is_alice_with_20000() {
        let ledger = seeded_ledger();
        assert_eq!(
            must(ledger.top_customer()),
            Some(CustomerSpend {
                customer: "Alice".to_string(),
                total_spent: 20_000,
            })
        );
    }

    #[test]
    fn average_order_value_is_5400() {
        let ledger = seeded_ledger();
        assert_eq!(must(ledger.average_order_value()), Some(5_400.0));
    }

    #[test]
    fn month_without_orders_sums_to_none() {
        let ledger = seeded_ledger();
        assert_eq!(must(ledger.monthly_sales_total("2023-12")), None);
    }

    #[test]
    fn baseline_checks_all_pass() {
        let ledger = seeded_ledger();
        let report = must(ledger.run_checks(&LedgerExpectations::seed_baseline()));
        assert!(report.passed);
        assert_eq!(report.checks.len(), 3);
        assert!(report.mismatches().is_empty());
    }

    #[test]
    fn reruns_against_the_same_seed_are_idempotent() {
        let expectations = LedgerExpectations::seed_baseline();
        let first = must(seeded_ledger().run_checks(&expectations));
        let second = must(seeded_ledger().run_checks(&expectations));
        assert_eq!(first, second);
    }

    #[test]
    fn mismatched_expectation_is_reported_not_raised() {
        let ledger = seeded_ledger();
        let mut expectations = LedgerExpectations::seed_baseline();
        expectations.monthly_total = 1;

        let report = must(ledger.run_checks(&expectations));
        assert!(!report.passed);
        assert!(!report.checks[0].passed);
        assert!(report.checks[1].passed);
        assert!(report.checks[2].passed);

        let mismatches = report.mismatches();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("monthly_sales_total"));
    }

    #[test]
    fn empty_ledger_yields_none_aggregates() {
        let ledger = must(OrderLedger::open_in_memory());
        must(ledger.seed_from_script(
            "CREATE TABLE orders (
                order_id INTEGER PRIMARY KEY,
                customer TEXT NOT NULL,
                amount INTEGER NOT NULL,
                order_date TEXT NOT NULL
            );",
        ));

        assert_eq!(must(ledger.monthly_sales_total(SEED_MONTH)), None);
        assert_eq!(must(ledger.top_customer()), None);
        assert_eq!(must(ledger.average_order_value()), None);

        let report = must(ledger.run_checks(&LedgerExpectations::seed_baseline()));
        assert!(!report.passed);
        assert_eq!(report.mismatches().len(), 3);
    }

    #[test]
    fn malformed_seed_script_is_a_hard_error() {
        let ledger = must(OrderLedger::open_in_memory());
        assert!(ledger.seed_from_script("CREATE TABLE orders (").is_err());
    }
}
