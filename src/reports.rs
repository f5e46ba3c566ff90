use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{transactions_for_user, TransactionFilter};
use crate::error::Result;
use crate::models::{Bucket, Transaction, TransactionType};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Fold transactions into income, expense and balance.
///
/// Refunds and reimbursements reduce expense rather than adding income, and
/// expense never goes below zero.
pub fn fold_summary<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Summary {
    let mut income = 0.0f64;
    let mut expense = 0.0f64;

    for txn in transactions {
        match txn.classification.bucket() {
            Bucket::Income => income += txn.amount,
            Bucket::Expense => expense += txn.amount,
            Bucket::Offset => expense -= txn.amount,
            Bucket::Neutral => {}
            Bucket::Fallback => match txn.transaction_type {
                TransactionType::Credit => income += txn.amount,
                TransactionType::Debit => expense += txn.amount,
            },
        }
    }

    if expense < 0.0 {
        expense = 0.0;
    }

    Summary {
        income,
        expense,
        balance: income - expense,
    }
}

pub fn summarize(conn: &Connection, user_id: &str, financial_year: Option<&str>) -> Result<Summary> {
    let filter = TransactionFilter {
        financial_year: financial_year.map(str::to_string),
        unreviewed_only: false,
    };
    let transactions = transactions_for_user(conn, user_id, &filter)?;
    Ok(fold_summary(&transactions))
}

// ---------------------------------------------------------------------------
// Per financial year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub financial_year: String,
    #[serde(flatten)]
    pub summary: Summary,
}

/// One summary per financial year, ordered by label. Clamping applies to each
/// year on its own.
pub fn summarize_by_financial_year(conn: &Connection, user_id: &str) -> Result<Vec<YearSummary>> {
    let transactions = transactions_for_user(conn, user_id, &TransactionFilter::default())?;
    let mut by_year: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for txn in &transactions {
        by_year.entry(txn.financial_year.as_str()).or_default().push(txn);
    }
    Ok(by_year
        .into_iter()
        .map(|(fy, txns)| YearSummary {
            financial_year: fy.to_string(),
            summary: fold_summary(txns),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Classification breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationTotal {
    pub classification: String,
    pub bucket: Bucket,
    pub count: usize,
    pub total: f64,
}

pub fn classification_breakdown(
    conn: &Connection,
    user_id: &str,
    financial_year: Option<&str>,
) -> Result<Vec<ClassificationTotal>> {
    let filter = TransactionFilter {
        financial_year: financial_year.map(str::to_string),
        unreviewed_only: false,
    };
    let transactions = transactions_for_user(conn, user_id, &filter)?;

    let mut totals: BTreeMap<&str, ClassificationTotal> = BTreeMap::new();
    for txn in &transactions {
        let entry = totals
            .entry(txn.classification.as_str())
            .or_insert_with(|| ClassificationTotal {
                classification: txn.classification.as_str().to_string(),
                bucket: txn.classification.bucket(),
                count: 0,
                total: 0.0,
            });
        entry.count += 1;
        entry.total += txn.amount;
    }

    let mut items: Vec<ClassificationTotal> = totals.into_values().collect();
    items.sort_by(|a, b| b.total.total_cmp(&a.total));
    Ok(items)
}
