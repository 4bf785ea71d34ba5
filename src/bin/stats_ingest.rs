use std::path::PathBuf;

use anyhow::{Context, Result};

use epl_reconcile::stats_fetch::{self, StatsApiConfig};
use epl_reconcile::store;

const DEFAULT_SEASON_YEAR: u32 = 2019;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let db_path = parse_value_arg("--db")
        .map(PathBuf::from)
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let year = parse_value_arg("--year")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_SEASON_YEAR);

    let cfg = StatsApiConfig::from_env();
    let mut conn = store::open_db(&db_path)?;
    let summary = stats_fetch::ingest_season(&mut conn, db_path, &cfg, year)?;

    println!("Stats ingest complete ({})", summary.season);
    println!("DB: {}", summary.db_path.display());
    println!("League id: {}", summary.league_id);
    println!(
        "Fixtures: {}/{}",
        summary.fixtures_succeeded, summary.fixtures_total
    );
    println!("Rows upserted: {}", summary.rows_upserted);
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    Ok(())
}

fn parse_value_arg(name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
