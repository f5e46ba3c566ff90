use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Classification, ImportRecord, NewImport, NewTransaction, Transaction};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    merchant_name TEXT NOT NULL,
    reference_number TEXT,
    amount REAL NOT NULL CHECK (amount >= 0),
    transaction_type TEXT NOT NULL CHECK (transaction_type IN ('credit', 'debit')),
    category TEXT NOT NULL DEFAULT 'Uncategorized',
    classification TEXT NOT NULL DEFAULT 'Uncategorized',
    is_reviewed INTEGER NOT NULL DEFAULT 0,
    transaction_date TEXT NOT NULL,
    financial_year TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_user_date
    ON transactions (user_id, transaction_date);

CREATE TABLE IF NOT EXISTS imports (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    skipped_count INTEGER NOT NULL DEFAULT 0,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT NOT NULL,
    imported_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_imports_user_checksum
    ON imports (user_id, checksum);
";

const TRANSACTION_COLUMNS: &str = "id, user_id, merchant_name, reference_number, amount, \
     transaction_type, category, classification, is_reviewed, transaction_date, \
     financial_year, created_at, updated_at";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        merchant_name: row.get(2)?,
        reference_number: row.get(3)?,
        amount: row.get(4)?,
        transaction_type: row.get(5)?,
        category: row.get(6)?,
        classification: row.get(7)?,
        is_reviewed: row.get(8)?,
        transaction_date: row.get(9)?,
        financial_year: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Insert a batch and return the stored rows, timestamps included.
///
/// Callers that need all-or-nothing semantics wrap this in a transaction.
pub fn insert_transactions(conn: &Connection, batch: &[NewTransaction]) -> Result<Vec<Transaction>> {
    let sql = format!(
        "INSERT INTO transactions (id, user_id, merchant_name, reference_number, amount, \
         transaction_type, category, classification, is_reviewed, transaction_date, financial_year) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
         RETURNING {TRANSACTION_COLUMNS}"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut saved = Vec::with_capacity(batch.len());
    for txn in batch {
        let row = stmt.query_row(
            rusqlite::params![
                txn.id,
                txn.user_id,
                txn.merchant_name,
                txn.reference_number,
                txn.amount,
                txn.transaction_type,
                txn.category,
                txn.classification,
                txn.is_reviewed,
                txn.transaction_date,
                txn.financial_year,
            ],
            transaction_from_row,
        )?;
        saved.push(row);
    }
    Ok(saved)
}

pub fn find_transaction(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
    let found = conn.query_row(&sql, [id], transaction_from_row).optional()?;
    Ok(found)
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub financial_year: Option<String>,
    pub unreviewed_only: bool,
}

/// All transactions owned by `user_id`, newest first. Rows sharing a date keep
/// the order they were inserted in.
pub fn transactions_for_user(
    conn: &Connection,
    user_id: &str,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>> {
    let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
    let mut clause = String::from("user_id = ?1");
    if let Some(fy) = &filter.financial_year {
        params.push(fy);
        clause.push_str(&format!(" AND financial_year = ?{}", params.len()));
    }
    if filter.unreviewed_only {
        clause.push_str(" AND is_reviewed = 0");
    }

    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE {clause} ORDER BY transaction_date DESC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns the number of rows changed (0 when `id` is unknown).
pub fn update_classification(
    conn: &Connection,
    id: &str,
    classification: &Classification,
) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE transactions SET classification = ?1, is_reviewed = 1, updated_at = datetime('now') \
         WHERE id = ?2",
        rusqlite::params![classification, id],
    )?;
    Ok(changed)
}

pub fn count_transactions(conn: &Connection, user_id: &str) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT count(*), COALESCE(SUM(CASE WHEN is_reviewed = 0 THEN 1 ELSE 0 END), 0) \
         FROM transactions WHERE user_id = ?1",
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn insert_import(conn: &Connection, import: &NewImport) -> Result<()> {
    conn.execute(
        "INSERT INTO imports (id, user_id, filename, record_count, skipped_count, \
         date_range_start, date_range_end, checksum) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            import.id,
            import.user_id,
            import.filename,
            import.record_count,
            import.skipped_count,
            import.date_range_start,
            import.date_range_end,
            import.checksum,
        ],
    )?;
    Ok(())
}

pub fn checksum_seen(conn: &Connection, user_id: &str, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM imports WHERE user_id = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![user_id, checksum])?)
}

pub fn latest_import(conn: &Connection, user_id: &str) -> Result<Option<ImportRecord>> {
    let found = conn
        .query_row(
            "SELECT id, user_id, filename, record_count, skipped_count, date_range_start, \
             date_range_end, checksum, imported_at FROM imports WHERE user_id = ?1 \
             ORDER BY imported_at DESC, rowid DESC LIMIT 1",
            [user_id],
            |row| {
                Ok(ImportRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    filename: row.get(2)?,
                    record_count: row.get(3)?,
                    skipped_count: row.get(4)?,
                    date_range_start: row.get(5)?,
                    date_range_end: row.get(6)?,
                    checksum: row.get(7)?,
                    imported_at: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}
