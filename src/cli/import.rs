use std::io::Read;
use std::path::PathBuf;

use colored::Colorize;

use crate::classifier::unreviewed;
use crate::cli::open_db;
use crate::error::Result;
use crate::importer::{import_file, ingest};
use crate::settings::load_settings;

pub fn run(file: &str, user: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let user_id = settings.resolve_user(user)?;
    let conn = open_db(&settings)?;

    // `-` reads the statement from stdin; no import record is kept for it.
    if file == "-" {
        let mut data = Vec::new();
        std::io::stdin().read_to_end(&mut data)?;
        let saved = ingest(&conn, &data, &user_id)?;
        println!("{} imported", saved.len());
    } else {
        let result = import_file(&conn, &PathBuf::from(file), &user_id)?;
        if result.previously_imported {
            println!(
                "{}",
                "Note: this file was imported before; its transactions were added again.".yellow()
            );
        }
        println!(
            "{} imported, {} skipped (no amount)",
            result.transactions.len(),
            result.skipped
        );
    }

    let pending = unreviewed(&conn, &user_id, None)?.len();
    if pending > 0 {
        println!("{pending} transactions awaiting classification");
    }
    Ok(())
}
