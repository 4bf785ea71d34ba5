use std::collections::HashSet;

use crate::records::FplRow;

/// Status markers that indicate a player has left the league. Matching is a
/// case-sensitive substring test against the raw news text.
pub const DEPARTURE_MARKERS: [&str; 4] = [
    "Joined",
    "Contract terminated",
    "Loan deal ended",
    "Returned",
];

/// Indices of fantasy rows eligible for matching.
///
/// Drops rows with zero minutes (no pitch time this season, nothing to link
/// against) and rows whose news text carries a departure marker. Exclusion is
/// computed per row index, never by name value: several rows can share a
/// name, and removing by value would also take out rows that should stay.
pub fn eligible_fantasy_rows(rows: &[FplRow]) -> Vec<usize> {
    let dropped = excluded_row_indices(rows);
    (0..rows.len()).filter(|idx| !dropped.contains(idx)).collect()
}

fn excluded_row_indices(rows: &[FplRow]) -> HashSet<usize> {
    let mut dropped = HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        if row.minutes == 0 {
            dropped.insert(idx);
            continue;
        }
        if is_departed(&row.player_news) {
            dropped.insert(idx);
        }
    }
    dropped
}

pub fn is_departed(news: &str) -> bool {
    DEPARTURE_MARKERS.iter().any(|marker| news.contains(marker))
}
