use crate::db::{count_transactions, get_connection, latest_import};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run(user: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();
    let user_id = settings.resolve_user(user).ok();

    println!("User:       {}", user_id.as_deref().unwrap_or("(not set)"));
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `fintrack init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let Some(user_id) = user_id else {
        return Ok(());
    };
    let conn = get_connection(&db_path)?;
    let (total, pending) = count_transactions(&conn, &user_id)?;

    println!();
    println!("Transactions:  {total}");
    println!("Unreviewed:    {pending}");
    if let Some(import) = latest_import(&conn, &user_id)? {
        let range = match (import.date_range_start, import.date_range_end) {
            (Some(start), Some(end)) => format!(" ({start} to {end})"),
            _ => String::new(),
        };
        println!(
            "Last import:   {} at {}, {} rows{range}",
            import.filename, import.imported_at, import.record_count
        );
    }
    Ok(())
}
