pub mod breakdown;
pub mod classify;
pub mod import;
pub mod init;
pub mod status;
pub mod summary;
pub mod transactions;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "fintrack", about = "Track income and expenses from bank-statement CSV exports.")]
pub struct Cli {
    /// Act as this user id (default: user_id from settings)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and default user, and initialize the database.
    Init {
        /// Path for fintrack data (default: ~/Documents/fintrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a bank-statement CSV (Date, Narration, Chq./Ref.No., Withdrawal Amt., Deposit Amt.).
    Import {
        /// Path to the CSV file, or `-` for stdin
        file: String,
    },
    /// List transactions, newest first.
    Transactions {
        /// Financial year filter, e.g. 2023-2024
        #[arg(long)]
        year: Option<String>,
        /// Only transactions that still need a classification
        #[arg(long)]
        unreviewed: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Income, expense and balance.
    Summary {
        /// Financial year filter, e.g. 2023-2024
        #[arg(long, conflicts_with = "by_year")]
        year: Option<String>,
        /// One row per financial year
        #[arg(long = "by-year")]
        by_year: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Totals per classification.
    Breakdown {
        /// Financial year filter, e.g. 2023-2024
        #[arg(long)]
        year: Option<String>,
    },
    /// Set the classification of a transaction and mark it reviewed.
    Classify {
        /// Transaction id
        id: String,
        /// Salary, Interest, Necessary, Leak, Refund, Reimbursement, Transfer, Adjustment, or any label
        classification: String,
        /// Print the updated transaction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show settings, database location and counts for the current user.
    Status,
}

/// Open the configured database, creating the data dir and schema on first use.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    Ok(conn)
}
