use crate::classifier;
use crate::cli::open_db;
use crate::cli::transactions::table;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run(id: &str, classification: &str, json: bool) -> Result<()> {
    let conn = open_db(&load_settings())?;
    let updated = classifier::classify(&conn, id, classification)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Classified as {}\n{}", updated.classification, table(std::slice::from_ref(&updated)));
    }
    Ok(())
}
