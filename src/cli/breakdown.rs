use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::reports::classification_breakdown;
use crate::settings::load_settings;

pub fn run(user: Option<&str>, year: Option<String>) -> Result<()> {
    let settings = load_settings();
    let user_id = settings.resolve_user(user)?;
    let conn = open_db(&settings)?;

    let items = classification_breakdown(&conn, &user_id, year.as_deref())?;
    if items.is_empty() {
        println!("No transactions.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Classification", "Bucket", "Count", "Total"]);
    for item in &items {
        table.add_row(vec![
            Cell::new(&item.classification),
            Cell::new(item.bucket.as_str()),
            Cell::new(item.count),
            Cell::new(money(item.total)),
        ]);
    }
    println!("Classification breakdown\n{table}");
    Ok(())
}
