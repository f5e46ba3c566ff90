use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, user: Option<&str>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) {
        settings.user_id = user.to_string();
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!("Initialized fintrack at {}", resolved.display());
    if settings.user_id.is_empty() {
        println!("No default user set; pass --user <id> to each command.");
    } else {
        println!("Default user: {}", settings.user_id);
    }
    Ok(())
}
