use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::reconcile::{MatchPair, ReconcileOutcome, ResidueEntry};

pub struct ExportReport {
    pub reconciled: usize,
    pub unmatched_fantasy: usize,
    pub unmatched_stats: usize,
    pub staged_aliases: usize,
}

/// Write the reconciliation result as a workbook: one sheet for the id map,
/// one per residue side, one for alias suggestions awaiting review.
pub fn export_outcome(path: &Path, season: &str, outcome: &ReconcileOutcome) -> Result<ExportReport> {
    let mut reconciled_rows = vec![vec![
        "Season".to_string(),
        "Fantasy ID".to_string(),
        "Stats ID".to_string(),
        "Fantasy Name".to_string(),
        "Stats Name".to_string(),
        "Stage".to_string(),
        "Confidence".to_string(),
        "Fantasy Minutes".to_string(),
        "Fantasy Goals".to_string(),
        "Fantasy Assists".to_string(),
        "Stats Goals".to_string(),
        "Stats Assists".to_string(),
    ]];
    for pair in &outcome.pairs {
        reconciled_rows.push(pair_row(season, pair));
    }

    let mut fantasy_rows = residue_header("Fantasy");
    for entry in &outcome.unmatched_fpl {
        fantasy_rows.push(residue_row(entry));
    }

    let mut stats_rows = residue_header("Stats");
    for entry in &outcome.unmatched_stats {
        stats_rows.push(residue_row(entry));
    }

    let mut alias_rows = vec![vec![
        "From Name".to_string(),
        "To Name".to_string(),
        "Confidence".to_string(),
        "Staged At".to_string(),
    ]];
    for staged in &outcome.staged_aliases {
        alias_rows.push(vec![
            staged.from_name.clone(),
            staged.to_name.clone(),
            format!("{:.3}", staged.confidence),
            staged.staged_at.clone(),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Reconciled")?;
        write_rows(sheet, &reconciled_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("UnmatchedFantasy")?;
        write_rows(sheet, &fantasy_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("UnmatchedStats")?;
        write_rows(sheet, &stats_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("StagedAliases")?;
        write_rows(sheet, &alias_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        reconciled: outcome.pairs.len(),
        unmatched_fantasy: outcome.unmatched_fpl.len(),
        unmatched_stats: outcome.unmatched_stats.len(),
        staged_aliases: outcome.staged_aliases.len(),
    })
}

fn pair_row(season: &str, pair: &MatchPair) -> Vec<String> {
    vec![
        season.to_string(),
        pair.fpl_player_id.to_string(),
        pair.stats_player_id.to_string(),
        pair.fpl_name.clone(),
        pair.stats_name.clone(),
        pair.stage.label().to_string(),
        pair.confidence
            .map(|c| format!("{c:.3}"))
            .unwrap_or_default(),
        pair.fpl_minutes.to_string(),
        pair.fpl_goals.to_string(),
        pair.fpl_assists.to_string(),
        pair.stats_goals.to_string(),
        pair.stats_assists.to_string(),
    ]
}

fn residue_header(side: &str) -> Vec<Vec<String>> {
    vec![vec![
        format!("{side} ID"),
        "Raw Name".to_string(),
        "Normalized Name".to_string(),
        "Minutes".to_string(),
        "Goals".to_string(),
        "Assists".to_string(),
    ]]
}

fn residue_row(entry: &ResidueEntry) -> Vec<String> {
    vec![
        entry.source_id.to_string(),
        entry.raw_name.clone(),
        entry.name.clone(),
        entry.minutes.to_string(),
        entry.goals.to_string(),
        entry.assists.to_string(),
    ]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
