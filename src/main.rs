use std::path::PathBuf;

use anyhow::{Context, Result};

use epl_reconcile::reconcile::{self, MatchStage, ReconcileOptions};
use epl_reconcile::reconcile::alias::load_bundled_alias_map;
use epl_reconcile::{export, store};

const DEFAULT_SEASON: &str = "2019/20";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let season = parse_value_arg("--season").unwrap_or_else(|| DEFAULT_SEASON.to_string());
    let db_path = parse_value_arg("--db")
        .map(PathBuf::from)
        .or_else(store::default_db_path)
        .context("unable to resolve sqlite path")?;
    let out_path = parse_value_arg("--out").map(PathBuf::from);

    let mut conn = store::open_db(&db_path)?;
    let stats_rows = store::load_stats_rows(&conn, &season)?;
    let fpl_rows = store::load_fpl_rows(&conn, &season)?;
    if stats_rows.is_empty() || fpl_rows.is_empty() {
        println!("Season {season}: nothing to reconcile");
        println!(
            "DB {} holds {} stats rows and {} fantasy rows for that season.",
            db_path.display(),
            stats_rows.len(),
            fpl_rows.len()
        );
        println!("Run stats_ingest and fpl_ingest first.");
        return Ok(());
    }

    let aliases = load_bundled_alias_map()?;
    let outcome = reconcile::reconcile(
        &stats_rows,
        &fpl_rows,
        &aliases,
        &ReconcileOptions::default(),
    )?;

    println!("Reconciliation complete for {season}");
    println!("DB: {}", db_path.display());
    println!(
        "Fantasy rows: {} total, {} eligible after filtering",
        outcome.fantasy_rows_total, outcome.fantasy_rows_eligible
    );
    println!("Matched pairs: {}", outcome.pairs.len());
    for stage in [
        MatchStage::Exact,
        MatchStage::TokenCombo,
        MatchStage::Disambiguated,
        MatchStage::AliasApplied,
    ] {
        println!("  {}: {}", stage.label(), outcome.stage_count(stage));
    }
    println!(
        "Unmatched: {} fantasy, {} stats",
        outcome.unmatched_fpl.len(),
        outcome.unmatched_stats.len()
    );
    for entry in outcome.unmatched_fpl.iter().take(8) {
        println!("  fantasy residue: {} ({} min)", entry.raw_name, entry.minutes);
    }
    for entry in outcome.unmatched_stats.iter().take(8) {
        println!("  stats residue: {} ({} min)", entry.raw_name, entry.minutes);
    }
    if !outcome.staged_aliases.is_empty() {
        println!("Alias suggestions staged for review:");
        for staged in &outcome.staged_aliases {
            println!(
                "  {} -> {} (confidence {:.3})",
                staged.from_name, staged.to_name, staged.confidence
            );
        }
    }

    store::save_reconciled(&mut conn, &season, &outcome.pairs)?;
    println!("Saved {} pairs to the reconciled table", outcome.pairs.len());

    if let Some(out_path) = out_path {
        let report = export::export_outcome(&out_path, &season, &outcome)?;
        println!(
            "Workbook: {} ({} reconciled, {} residues)",
            out_path.display(),
            report.reconciled,
            report.unmatched_fantasy + report.unmatched_stats
        );
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
