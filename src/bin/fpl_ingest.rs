use std::path::PathBuf;

use anyhow::{Context, Result};

use epl_reconcile::fpl_fetch;
use epl_reconcile::store;

const DEFAULT_SEASON: &str = "2019/20";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let db_path = parse_value_arg("--db")
        .map(PathBuf::from)
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let season = parse_value_arg("--season").unwrap_or_else(|| DEFAULT_SEASON.to_string());

    let mut conn = store::open_db(&db_path)?;
    let summary = fpl_fetch::ingest_history(&mut conn, db_path, &season)?;

    println!("Fantasy ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!(
        "Players: {}/{}",
        summary.players_succeeded, summary.players_total
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
