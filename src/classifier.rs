use rusqlite::Connection;
use tracing::info;

use crate::db::{find_transaction, transactions_for_user, update_classification, TransactionFilter};
use crate::error::{FintrackError, Result};
use crate::models::{Classification, Transaction};

/// Set the classification of transaction `id` and mark it reviewed.
///
/// Any string is accepted; values outside the known taxonomy are stored as-is
/// and summarized by transaction type.
pub fn classify(conn: &Connection, id: &str, classification: &str) -> Result<Transaction> {
    let classification = Classification::from(classification);
    if update_classification(conn, id, &classification)? == 0 {
        return Err(FintrackError::TransactionNotFound(id.to_string()));
    }
    info!(id, %classification, "classified transaction");
    find_transaction(conn, id)?.ok_or_else(|| FintrackError::TransactionNotFound(id.to_string()))
}

/// Transactions still waiting for a classification, newest first.
pub fn unreviewed(conn: &Connection, user_id: &str, financial_year: Option<&str>) -> Result<Vec<Transaction>> {
    let filter = TransactionFilter {
        financial_year: financial_year.map(str::to_string),
        unreviewed_only: true,
    };
    transactions_for_user(conn, user_id, &filter)
}
