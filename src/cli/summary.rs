use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::reports;
use crate::settings::load_settings;

pub fn run(user: Option<&str>, year: Option<String>, by_year: bool, json: bool) -> Result<()> {
    let settings = load_settings();
    let user_id = settings.resolve_user(user)?;
    let conn = open_db(&settings)?;

    if by_year {
        let years = reports::summarize_by_financial_year(&conn, &user_id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&years)?);
            return Ok(());
        }
        let mut table = Table::new();
        table.set_header(vec!["Financial Year", "Income", "Expense", "Balance"]);
        for y in &years {
            table.add_row(vec![
                Cell::new(&y.financial_year),
                Cell::new(money(y.summary.income)),
                Cell::new(money(y.summary.expense)),
                Cell::new(money(y.summary.balance)),
            ]);
        }
        println!("Summary by financial year\n{table}");
        return Ok(());
    }

    let summary = reports::summarize(&conn, &user_id, year.as_deref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![Cell::new("INCOME".green().bold()), Cell::new(money(summary.income))]);
    table.add_row(vec![Cell::new("EXPENSE".red().bold()), Cell::new(money(summary.expense))]);
    let balance_label = if summary.balance >= 0.0 {
        "BALANCE".green().bold()
    } else {
        "BALANCE".red().bold()
    };
    table.add_row(vec![Cell::new(balance_label), Cell::new(money(summary.balance))]);

    match year {
        Some(fy) => println!("Summary for FY {fy}\n{table}"),
        None => println!("Summary\n{table}"),
    }
    Ok(())
}
