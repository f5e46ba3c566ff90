use std::path::Path;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::models::{
    NewImport, NewTransaction, StatementRow, Transaction, TransactionType, UNKNOWN_FINANCIAL_YEAR,
};

pub const DATE_COLUMN: &str = "Date";
pub const NARRATION_COLUMN: &str = "Narration";
pub const REFERENCE_COLUMN: &str = "Chq./Ref.No.";
pub const WITHDRAWAL_COLUMN: &str = "Withdrawal Amt.";
pub const DEPOSIT_COLUMN: &str = "Deposit Amt.";

const UNKNOWN_MERCHANT: &str = "Unknown";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lenient decimal parse: thousands separators, quotes and currency symbols
/// are ignored, `(x)` means `-x`, and only the leading number counts, so
/// `500.00 Dr` reads as `500.0`. Anything without a leading number is `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$' | '₹'))
        .collect();
    let s = s.trim();
    let value = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        -leading_decimal(inner.trim()).unwrap_or(0.0)
    } else {
        leading_decimal(s).unwrap_or(0.0)
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Longest prefix of `s` shaped like `[+-]digits[.digits]`.
fn leading_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if frac_end > frac_start || digits > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse().ok()
}

/// Parse a `DD/MM/YY` statement date. The year is always `2000 + YY`.
///
/// Out-of-range days and months are malformed rather than rolled over into
/// the next month, so `31/02/23` is `None`. So is any year past 9999.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let d: u32 = parts[0].trim().parse().ok()?;
    let m: u32 = parts[1].trim().parse().ok()?;
    let yy: i32 = parts[2].trim().parse().ok()?;
    let year = 2000i32.checked_add(yy).filter(|y| (0..=9999).contains(y))?;
    NaiveDate::from_ymd_opt(year, m, d)
}

/// Indian financial year label: April through March, e.g. `2023-2024`.
pub fn financial_year(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 4 {
        format!("{}-{}", year, year + 1)
    } else {
        format!("{}-{}", year - 1, year)
    }
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Statement reading
// ---------------------------------------------------------------------------

/// Positions of the columns we read, resolved once from the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatementColumns {
    date: Option<usize>,
    narration: Option<usize>,
    reference: Option<usize>,
    withdrawal: Option<usize>,
    deposit: Option<usize>,
}

impl StatementColumns {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            date: find(DATE_COLUMN),
            narration: find(NARRATION_COLUMN),
            reference: find(REFERENCE_COLUMN),
            withdrawal: find(WITHDRAWAL_COLUMN),
            deposit: find(DEPOSIT_COLUMN),
        }
    }

    pub fn row(&self, record: &StringRecord) -> StatementRow {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        // Amount cells only count when they hold more than whitespace.
        let amount_cell = |idx: Option<usize>| cell(idx).filter(|v| !v.trim().is_empty());
        StatementRow {
            date: cell(self.date),
            narration: cell(self.narration),
            reference: cell(self.reference),
            withdrawal: amount_cell(self.withdrawal),
            deposit: amount_cell(self.deposit),
        }
    }
}

/// Decode a statement into rows. Missing columns are tolerated; a stream the
/// CSV reader cannot continue past (e.g. invalid UTF-8) is an error.
pub fn read_statement(data: &[u8]) -> Result<Vec<StatementRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);
    let columns = StatementColumns::from_headers(rdr.headers()?);
    debug!(?columns, "resolved statement columns");

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(columns.row(&record));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn one statement row into a transaction owned by `user_id`.
///
/// Returns `None` for rows whose amount resolves to zero. Rows without a
/// usable date are dated `today` and get an `Unknown` financial year.
pub fn normalize_row(row: &StatementRow, user_id: &str, today: NaiveDate) -> Option<NewTransaction> {
    let (amount, transaction_type) = if let Some(raw) = &row.withdrawal {
        (parse_amount(raw), TransactionType::Debit)
    } else if let Some(raw) = &row.deposit {
        (parse_amount(raw), TransactionType::Credit)
    } else {
        (0.0, TransactionType::Credit)
    };
    if amount == 0.0 {
        return None;
    }

    let (transaction_date, financial_year) = match row.date.as_deref().and_then(parse_date_dmy) {
        Some(date) => (date, financial_year(date)),
        None => (today, UNKNOWN_FINANCIAL_YEAR.to_string()),
    };

    Some(NewTransaction {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        merchant_name: row
            .narration
            .clone()
            .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
        reference_number: row.reference.clone(),
        amount: amount.abs(),
        transaction_type,
        category: transaction_type.default_category().to_string(),
        classification: transaction_type.default_classification(),
        is_reviewed: transaction_type.is_pre_reviewed(),
        transaction_date,
        financial_year,
    })
}

pub struct Normalized {
    pub records: Vec<NewTransaction>,
    pub skipped: usize,
}

pub fn normalize(rows: &[StatementRow], user_id: &str, today: NaiveDate) -> Normalized {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (i, row) in rows.iter().enumerate() {
        match normalize_row(row, user_id, today) {
            Some(txn) => records.push(txn),
            None => {
                debug!(row = i + 1, "skipping row with zero amount");
                skipped += 1;
            }
        }
    }
    Normalized { records, skipped }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// ingest / import_file
// ---------------------------------------------------------------------------

/// Parse raw statement bytes for `user_id` and persist them as one batch.
pub fn ingest(conn: &Connection, data: &[u8], user_id: &str) -> Result<Vec<Transaction>> {
    let rows = read_statement(data)?;
    let normalized = normalize(&rows, user_id, today());
    let saved = write_batch(conn, &normalized.records, None)?;
    info!(user_id, imported = saved.len(), skipped = normalized.skipped, "ingested statement");
    Ok(saved)
}

/// Insert the batch, and the import record if any, in one SQLite transaction.
fn write_batch(
    conn: &Connection,
    records: &[NewTransaction],
    import: Option<&NewImport>,
) -> Result<Vec<Transaction>> {
    let tx = conn.unchecked_transaction()?;
    let saved = db::insert_transactions(&tx, records)?;
    if let Some(import) = import {
        db::insert_import(&tx, import)?;
    }
    tx.commit()?;
    Ok(saved)
}

pub struct ImportResult {
    pub transactions: Vec<Transaction>,
    pub skipped: usize,
    /// The same bytes were imported for this user before. They are ingested
    /// again regardless.
    pub previously_imported: bool,
}

/// Read a statement file and ingest it, recording the upload in `imports`.
pub fn import_file(conn: &Connection, file_path: &Path, user_id: &str) -> Result<ImportResult> {
    let data = std::fs::read(file_path)?;
    let checksum = compute_checksum(&data);
    let previously_imported = db::checksum_seen(conn, user_id, &checksum)?;
    if previously_imported {
        warn!(user_id, file = %file_path.display(), "statement was imported before");
    }

    let rows = read_statement(&data)?;
    let normalized = normalize(&rows, user_id, today());

    let dated: Vec<NaiveDate> = normalized
        .records
        .iter()
        .filter(|t| t.financial_year != UNKNOWN_FINANCIAL_YEAR)
        .map(|t| t.transaction_date)
        .collect();
    let import = NewImport {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        filename: file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string(),
        record_count: normalized.records.len() as i64,
        skipped_count: normalized.skipped as i64,
        date_range_start: dated.iter().min().copied(),
        date_range_end: dated.iter().max().copied(),
        checksum,
    };

    let transactions = write_batch(conn, &normalized.records, Some(&import))?;

    info!(
        user_id,
        file = %import.filename,
        imported = transactions.len(),
        skipped = normalized.skipped,
        "imported statement"
    );
    Ok(ImportResult {
        transactions,
        skipped: normalized.skipped,
        previously_imported,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::db::{transactions_for_user, TransactionFilter};
    use crate::models::Classification;

    const HEADER: &str = "Date,Narration,Chq./Ref.No.,Value Dt,Withdrawal Amt.,Deposit Amt.,Closing Balance\n";

    fn statement(rows: &[&str]) -> Vec<u8> {
        let mut content = String::from(HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content.into_bytes()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(date: &str, withdrawal: &str, deposit: &str) -> StatementRow {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        StatementRow {
            date: opt(date),
            narration: Some("UPI-GROCER".to_string()),
            reference: Some("0000123".to_string()),
            withdrawal: opt(withdrawal),
            deposit: opt(deposit),
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("  500.00  "), 500.0);
        assert_eq!(parse_amount("₹2,000"), 2000.0);
        assert_eq!(parse_amount("(50.00)"), -50.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
    }

    #[test]
    fn test_parse_amount_reads_leading_number() {
        assert_eq!(parse_amount("500.00 Dr"), 500.0);
        assert_eq!(parse_amount("12abc"), 12.0);
        assert_eq!(parse_amount("1,250.75 CR"), 1250.75);
        assert_eq!(parse_amount("-42.5x"), -42.5);
        assert_eq!(parse_amount(".5"), 0.5);
        assert_eq!(parse_amount("7."), 7.0);
        assert_eq!(parse_amount("(80 Dr)"), -80.0);
        assert_eq!(parse_amount("Dr 500"), 0.0);
        assert_eq!(parse_amount("-"), 0.0);
        assert_eq!(parse_amount("."), 0.0);
    }

    #[test]
    fn test_parse_date_dmy() {
        assert_eq!(parse_date_dmy("01/01/23"), Some(day(2023, 1, 1)));
        assert_eq!(parse_date_dmy("15/04/23"), Some(day(2023, 4, 15)));
        assert_eq!(parse_date_dmy("2023-04-15"), None);
        assert_eq!(parse_date_dmy("15/04"), None);
        assert_eq!(parse_date_dmy("15/04/23/1"), None);
        assert_eq!(parse_date_dmy("xx/04/23"), None);
        assert_eq!(parse_date_dmy("31/02/23"), None);
    }

    #[test]
    fn test_parse_date_dmy_rejects_out_of_range_years() {
        assert_eq!(parse_date_dmy("01/01/2147483647"), None);
        assert_eq!(parse_date_dmy("01/05/99999"), None);
        assert_eq!(parse_date_dmy("01/05/8000"), None);
        assert_eq!(parse_date_dmy("01/05/7999"), Some(day(9999, 5, 1)));
    }

    #[test]
    fn test_two_digit_years_are_offset_from_2000() {
        assert_eq!(parse_date_dmy("01/06/99"), Some(day(2099, 6, 1)));
        assert_eq!(parse_date_dmy("01/06/00"), Some(day(2000, 6, 1)));
    }

    #[test]
    fn test_financial_year() {
        assert_eq!(financial_year(day(2023, 4, 15)), "2023-2024");
        assert_eq!(financial_year(day(2023, 1, 15)), "2022-2023");
        assert_eq!(financial_year(day(2023, 3, 31)), "2022-2023");
        assert_eq!(financial_year(day(2023, 4, 1)), "2023-2024");
        assert_eq!(financial_year(day(2023, 12, 31)), "2023-2024");
    }

    #[test]
    fn test_columns_resolved_by_header_name() {
        let headers = StringRecord::from(vec!["Deposit Amt.", " Narration ", "Date"]);
        let columns = StatementColumns::from_headers(&headers);
        let record = StringRecord::from(vec!["100.00", "SALARY", "01/05/23"]);
        let parsed = columns.row(&record);
        assert_eq!(parsed.deposit.as_deref(), Some("100.00"));
        assert_eq!(parsed.narration.as_deref(), Some("SALARY"));
        assert_eq!(parsed.date.as_deref(), Some("01/05/23"));
        assert_eq!(parsed.withdrawal, None);
        assert_eq!(parsed.reference, None);
    }

    #[test]
    fn test_whitespace_amount_cells_are_empty() {
        let headers = StringRecord::from(vec!["Withdrawal Amt.", "Deposit Amt."]);
        let columns = StatementColumns::from_headers(&headers);
        let parsed = columns.row(&StringRecord::from(vec!["   ", "75.00"]));
        assert_eq!(parsed.withdrawal, None);
        assert_eq!(parsed.deposit.as_deref(), Some("75.00"));
    }

    #[test]
    fn test_withdrawal_row_is_unreviewed_debit() {
        let txn = normalize_row(&row("15/04/23", "250.00", ""), "u1", day(2024, 1, 1)).unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.amount, 250.0);
        assert_eq!(txn.category, "Expense");
        assert_eq!(txn.classification, Classification::Uncategorized);
        assert!(!txn.is_reviewed);
        assert_eq!(txn.financial_year, "2023-2024");
        assert_eq!(txn.user_id, "u1");
        assert_eq!(txn.reference_number.as_deref(), Some("0000123"));
    }

    #[test]
    fn test_deposit_row_is_reviewed_credit() {
        let txn = normalize_row(&row("15/01/23", "", "1000"), "u1", day(2024, 1, 1)).unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Credit);
        assert_eq!(txn.category, "Income");
        assert_eq!(txn.classification, Classification::Income);
        assert!(txn.is_reviewed);
        assert_eq!(txn.financial_year, "2022-2023");
    }

    #[test]
    fn test_withdrawal_takes_precedence_over_deposit() {
        let txn = normalize_row(&row("15/01/23", "10", "20"), "u1", day(2024, 1, 1)).unwrap();
        assert_eq!(txn.transaction_type, TransactionType::Debit);
        assert_eq!(txn.amount, 10.0);
    }

    #[test]
    fn test_zero_and_empty_amounts_are_dropped() {
        let today = day(2024, 1, 1);
        assert!(normalize_row(&row("15/01/23", "", ""), "u1", today).is_none());
        assert!(normalize_row(&row("15/01/23", "0.00", ""), "u1", today).is_none());
        assert!(normalize_row(&row("15/01/23", "garbage", ""), "u1", today).is_none());
        // A zero withdrawal does not fall through to the deposit column.
        assert!(normalize_row(&row("15/01/23", "0", "500"), "u1", today).is_none());
    }

    #[test]
    fn test_negative_amounts_are_stored_as_magnitude() {
        let txn = normalize_row(&row("15/01/23", "-42.50", ""), "u1", day(2024, 1, 1)).unwrap();
        assert_eq!(txn.amount, 42.5);
        assert_eq!(txn.transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_bad_date_defaults_to_today_and_unknown_year() {
        let today = day(2024, 2, 29);
        for date in ["2023-04-15", "", "15-04-23", "aa/bb/cc"] {
            let txn = normalize_row(&row(date, "5", ""), "u1", today).unwrap();
            assert_eq!(txn.transaction_date, today, "date {date:?}");
            assert_eq!(txn.financial_year, UNKNOWN_FINANCIAL_YEAR, "date {date:?}");
        }
    }

    #[test]
    fn test_missing_narration_is_unknown() {
        let mut r = row("15/01/23", "5", "");
        r.narration = None;
        r.reference = None;
        let txn = normalize_row(&r, "u1", day(2024, 1, 1)).unwrap();
        assert_eq!(txn.merchant_name, "Unknown");
        assert_eq!(txn.reference_number, None);
    }

    #[test]
    fn test_normalize_counts_skipped_and_keeps_order() {
        let rows = vec![
            row("01/04/23", "10", ""),
            row("", "", ""),
            row("02/04/23", "", "20"),
        ];
        let normalized = normalize(&rows, "u1", day(2024, 1, 1));
        assert_eq!(normalized.skipped, 1);
        let amounts: Vec<f64> = normalized.records.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![10.0, 20.0]);
    }

    #[test]
    fn test_read_statement_tolerates_missing_columns_and_ragged_rows() {
        let data = b"Date,Narration,Withdrawal Amt.\n01/04/23,TEA,12.00\n02/04/23\n";
        let rows = read_statement(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].withdrawal.as_deref(), Some("12.00"));
        assert_eq!(rows[0].deposit, None);
        assert_eq!(rows[1], StatementRow { date: Some("02/04/23".to_string()), ..Default::default() });
    }

    #[test]
    fn test_ingest_persists_batch() {
        let (_dir, conn) = test_db();
        let data = statement(&[
            "15/04/23,UPI-SWIGGY,0000411,15/04/23,350.00,,9650.00",
            "16/04/23,NEFT-SALARY ACME,0000412,16/04/23,,50000.00,59650.00",
            ",,,,,,",
        ]);
        let saved = ingest(&conn, &data, "u1").unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].merchant_name, "UPI-SWIGGY");
        assert_eq!(saved[1].transaction_type, TransactionType::Credit);
        assert!(!saved[0].created_at.is_empty());
        let stored = transactions_for_user(&conn, "u1", &TransactionFilter::default()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(transactions_for_user(&conn, "u2", &TransactionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_out_of_range_year_falls_back_to_today() {
        let (_dir, conn) = test_db();
        let data = statement(&[
            "02/05/23,UPI-SWIGGY,0000411,02/05/23,350.00,,9650.00",
            "01/05/99999,UPI-ZOMATO,0000412,01/05/23,120.00,,9530.00",
        ]);
        let saved = ingest(&conn, &data, "u1").unwrap();
        assert_eq!(saved[1].financial_year, UNKNOWN_FINANCIAL_YEAR);
        assert!(saved[1].transaction_date > day(2024, 1, 1));
        let stored = transactions_for_user(&conn, "u1", &TransactionFilter::default()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].transaction_date >= stored[1].transaction_date);
        assert_eq!(stored[1].transaction_date, day(2023, 5, 2));
    }

    #[test]
    fn test_ingest_keeps_amounts_with_trailing_text() {
        let (_dir, conn) = test_db();
        let data = statement(&["02/05/23,NEFT-RENT,0000413,02/05/23,500.00 Dr,,9150.00"]);
        let saved = ingest(&conn, &data, "u1").unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].amount, 500.0);
        assert_eq!(saved[0].transaction_type, TransactionType::Debit);
    }

    #[test]
    fn test_ingest_stream_error_persists_nothing() {
        let (_dir, conn) = test_db();
        let mut data = statement(&["15/04/23,UPI-SWIGGY,0000411,15/04/23,350.00,,9650.00"]);
        data.extend_from_slice(b"16/04/23,\xff\xfe,1,16/04/23,10.00,,1.00\n");
        let err = ingest(&conn, &data, "u1");
        assert!(matches!(err, Err(crate::error::FintrackError::Csv(_))));
        let count: i64 = conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_ingest_header_only_is_empty_batch() {
        let (_dir, conn) = test_db();
        let saved = ingest(&conn, HEADER.as_bytes(), "u1").unwrap();
        assert!(saved.is_empty());
    }

    #[test]
    fn test_import_file_records_batch() {
        let (dir, conn) = test_db();
        let path = dir.path().join("hdfc.csv");
        std::fs::write(&path, statement(&[
            "15/04/23,UPI-SWIGGY,0000411,15/04/23,350.00,,9650.00",
            "01/05/23,ATM WDL,0000413,01/05/23,2000.00,,7650.00",
            ",,,,,,",
        ])).unwrap();
        let result = import_file(&conn, &path, "u1").unwrap();
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.skipped, 1);
        assert!(!result.previously_imported);

        let import = db::latest_import(&conn, "u1").unwrap().unwrap();
        assert_eq!(import.filename, "hdfc.csv");
        assert_eq!(import.record_count, 2);
        assert_eq!(import.skipped_count, 1);
        assert_eq!(import.date_range_start, Some(day(2023, 4, 15)));
        assert_eq!(import.date_range_end, Some(day(2023, 5, 1)));
    }

    #[test]
    fn test_import_file_reimport_is_flagged_but_ingested() {
        let (dir, conn) = test_db();
        let path = dir.path().join("hdfc.csv");
        std::fs::write(&path, statement(&["15/04/23,UPI-SWIGGY,0000411,15/04/23,350.00,,9650.00"])).unwrap();
        import_file(&conn, &path, "u1").unwrap();
        let second = import_file(&conn, &path, "u1").unwrap();
        assert!(second.previously_imported);
        assert_eq!(second.transactions.len(), 1);
        let other_user = import_file(&conn, &path, "u2").unwrap();
        assert!(!other_user.previously_imported);
        let (total, _) = db::count_transactions(&conn, "u1").unwrap();
        assert_eq!(total, 2);
    }
}
