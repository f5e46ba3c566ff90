use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Financial-year label used when a statement date cannot be parsed.
pub const UNKNOWN_FINANCIAL_YEAR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn default_category(&self) -> &'static str {
        match self {
            Self::Credit => "Income",
            Self::Debit => "Expense",
        }
    }

    pub fn default_classification(&self) -> Classification {
        match self {
            Self::Credit => Classification::Income,
            Self::Debit => Classification::Uncategorized,
        }
    }

    /// Credits need no review; debits wait for an explicit classification.
    pub fn is_pre_reviewed(&self) -> bool {
        matches!(self, Self::Credit)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// How a classification folds into the income/expense summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Income,
    Expense,
    /// Reduces expense instead of counting as income.
    Offset,
    Neutral,
    /// Decided by the transaction type.
    Fallback,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Offset => "offset",
            Self::Neutral => "neutral",
            Self::Fallback => "fallback",
        }
    }
}

/// User-facing classification of a transaction.
///
/// Strings outside the known taxonomy are kept verbatim in `Other` and fold
/// through the fallback bucket; they are never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Classification {
    Salary,
    Interest,
    Necessary,
    Leak,
    Refund,
    Reimbursement,
    Transfer,
    Adjustment,
    Income,
    Uncategorized,
    Other(String),
}

impl Classification {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Salary => "Salary",
            Self::Interest => "Interest",
            Self::Necessary => "Necessary",
            Self::Leak => "Leak",
            Self::Refund => "Refund",
            Self::Reimbursement => "Reimbursement",
            Self::Transfer => "Transfer",
            Self::Adjustment => "Adjustment",
            Self::Income => "Income",
            Self::Uncategorized => "Uncategorized",
            Self::Other(s) => s,
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Salary | Self::Interest => Bucket::Income,
            Self::Necessary | Self::Leak => Bucket::Expense,
            Self::Refund | Self::Reimbursement => Bucket::Offset,
            Self::Transfer | Self::Adjustment => Bucket::Neutral,
            Self::Income | Self::Uncategorized | Self::Other(_) => Bucket::Fallback,
        }
    }
}

impl From<&str> for Classification {
    fn from(s: &str) -> Self {
        match s {
            "Salary" => Self::Salary,
            "Interest" => Self::Interest,
            "Necessary" => Self::Necessary,
            "Leak" => Self::Leak,
            "Refund" => Self::Refund,
            "Reimbursement" => Self::Reimbursement,
            "Transfer" => Self::Transfer,
            "Adjustment" => Self::Adjustment,
            "Income" => Self::Income,
            "Uncategorized" => Self::Uncategorized,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Classification {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Classification> for String {
    fn from(c: Classification) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Classification {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Classification {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(Self::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub merchant_name: String,
    pub reference_number: Option<String>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: String,
    pub classification: Classification,
    pub is_reviewed: bool,
    pub transaction_date: NaiveDate,
    pub financial_year: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A normalized transaction that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: String,
    pub user_id: String,
    pub merchant_name: String,
    pub reference_number: Option<String>,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category: String,
    pub classification: Classification,
    pub is_reviewed: bool,
    pub transaction_date: NaiveDate,
    pub financial_year: String,
}

/// One data row of a bank statement, reduced to the columns we read.
/// Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementRow {
    pub date: Option<String>,
    pub narration: Option<String>,
    pub reference: Option<String>,
    pub withdrawal: Option<String>,
    pub deposit: Option<String>,
}

/// Audit data for one uploaded statement, written alongside its batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImport {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub record_count: i64,
    pub skipped_count: i64,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub record_count: i64,
    pub skipped_count: i64,
    pub date_range_start: Option<NaiveDate>,
    pub date_range_end: Option<NaiveDate>,
    pub checksum: String,
    pub imported_at: String,
}
