mod classifier;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

/// Log filter comes from `FINTRACK_LOG`, then the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("FINTRACK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("tracing init failed: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&settings::load_settings().log_level);

    let user = cli.user.as_deref();
    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir, user),
        Commands::Import { file } => cli::import::run(&file, user),
        Commands::Transactions {
            year,
            unreviewed,
            json,
        } => cli::transactions::run(user, year, unreviewed, json),
        Commands::Summary {
            year,
            by_year,
            json,
        } => cli::summary::run(user, year, by_year, json),
        Commands::Breakdown { year } => cli::breakdown::run(user, year),
        Commands::Classify {
            id,
            classification,
            json,
        } => cli::classify::run(&id, &classification, json),
        Commands::Status => cli::status::run(user),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
