use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::{transactions_for_user, TransactionFilter};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{Transaction, TransactionType};
use crate::settings::load_settings;

pub fn run(user: Option<&str>, year: Option<String>, unreviewed: bool, json: bool) -> Result<()> {
    let settings = load_settings();
    let user_id = settings.resolve_user(user)?;
    let conn = open_db(&settings)?;

    let filter = TransactionFilter {
        financial_year: year,
        unreviewed_only: unreviewed,
    };
    let rows = transactions_for_user(&conn, &user_id, &filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No transactions.");
        return Ok(());
    }
    println!("Transactions\n{}", table(&rows));
    Ok(())
}

pub(crate) fn table(rows: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date", "FY", "Merchant", "Ref", "Amount", "Classification", "Reviewed",
    ]);
    for txn in rows {
        let amount = match txn.transaction_type {
            TransactionType::Credit => money(txn.amount).green(),
            TransactionType::Debit => format!("-{}", money(txn.amount)).red(),
        };
        table.add_row(vec![
            Cell::new(&txn.id),
            Cell::new(txn.transaction_date.format("%d/%m/%Y")),
            Cell::new(&txn.financial_year),
            Cell::new(&txn.merchant_name),
            Cell::new(txn.reference_number.as_deref().unwrap_or("")),
            Cell::new(amount),
            Cell::new(txn.classification.as_str()),
            Cell::new(if txn.is_reviewed { "yes" } else { "no" }),
        ]);
    }
    table
}
