//! Record linkage between the per-fixture stats dataset and the per-season
//! fantasy dataset.
//!
//! The two sources disagree on name format (diacritics, hyphenation, full
//! legal name vs. common name), so matching runs in stages over the unmatched
//! remainder of the previous stage: exact equality on normalized names, then
//! first-name + Nth-token combinations, then stat-validated disambiguation,
//! and finally the curated alias table followed by one more exact pass.

pub mod alias;
pub mod combos;
pub mod disambiguate;
pub mod exact;
pub mod filter;
pub mod normalize;

use std::collections::{HashMap, HashSet};

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::records::{FplRow, StatsRow};
use alias::AliasMap;
use normalize::normalize_name;

pub use disambiguate::StagedAlias;

/// Stage that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStage {
    Exact,
    TokenCombo,
    Disambiguated,
    AliasApplied,
}

impl MatchStage {
    pub fn label(self) -> &'static str {
        match self {
            MatchStage::Exact => "exact",
            MatchStage::TokenCombo => "token_combo",
            MatchStage::Disambiguated => "disambiguated",
            MatchStage::AliasApplied => "alias_applied",
        }
    }
}

/// One player as seen by one dataset: the rows sharing a source player id,
/// reduced to the aggregates the matchers compare on. The normalized name is
/// always derived from the raw name when the identity is built.
#[derive(Debug, Clone)]
pub struct Identity {
    pub source_id: i64,
    pub raw_name: String,
    pub name: String,
    pub team_id: i64,
    pub minutes: i64,
    pub goals: i64,
    pub assists: i64,
    pub saves: i64,
    pub row_ids: Vec<i64>,
}

impl Identity {
    /// Goalkeepers rack up saves and (almost) never goal involvement.
    pub fn is_keeper_like(&self) -> bool {
        self.saves > 0 && self.goals + self.assists == 0
    }

    /// Secondary signal used to confirm identity across datasets.
    pub fn secondary_signal(&self) -> i64 {
        if self.is_keeper_like() {
            self.saves
        } else {
            self.goals + self.assists
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPair {
    pub fpl_player_id: i64,
    pub stats_player_id: i64,
    pub fpl_name: String,
    pub stats_name: String,
    pub stage: MatchStage,
    pub confidence: Option<f64>,
    pub fpl_minutes: i64,
    pub fpl_goals: i64,
    pub fpl_assists: i64,
    pub stats_goals: i64,
    pub stats_assists: i64,
}

/// Unmatched identity surfaced for manual inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidueEntry {
    pub source_id: i64,
    pub raw_name: String,
    pub name: String,
    pub minutes: i64,
    pub goals: i64,
    pub assists: i64,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub pairs: Vec<MatchPair>,
    pub unmatched_fpl: Vec<ResidueEntry>,
    pub unmatched_stats: Vec<ResidueEntry>,
    pub staged_aliases: Vec<StagedAlias>,
    pub fantasy_rows_total: usize,
    pub fantasy_rows_eligible: usize,
}

impl ReconcileOutcome {
    pub fn stage_count(&self, stage: MatchStage) -> usize {
        self.pairs.iter().filter(|p| p.stage == stage).count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    pub max_extra_tokens: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_extra_tokens: combos::DEFAULT_MAX_EXTRA_TOKENS,
        }
    }
}

/// Group stats rows into per-player identities. Rows without a usable name
/// cannot take part in matching and are skipped here; they stay untouched in
/// the stored dataset.
pub fn build_stats_identities(rows: &[StatsRow]) -> Vec<Identity> {
    let mut order = Vec::new();
    let mut by_player: HashMap<i64, Identity> = HashMap::new();
    for row in rows {
        let name = normalize_name(&row.player_name);
        if name.is_empty() {
            continue;
        }
        let entry = by_player.entry(row.player_id).or_insert_with(|| {
            order.push(row.player_id);
            Identity {
                source_id: row.player_id,
                raw_name: row.player_name.clone(),
                name,
                team_id: row.team_id,
                minutes: 0,
                goals: 0,
                assists: 0,
                saves: 0,
                row_ids: Vec::new(),
            }
        });
        entry.minutes += row.minutes_played;
        entry.goals += row.goals_total;
        entry.assists += row.goals_assists;
        entry.saves += row.saves;
        entry.row_ids.push(row.row_id);
    }
    order
        .into_iter()
        .filter_map(|player_id| by_player.remove(&player_id))
        .collect()
}

/// Group eligible fantasy rows into per-player identities.
pub fn build_fantasy_identities(rows: &[FplRow], eligible: &[usize]) -> Vec<Identity> {
    let mut order = Vec::new();
    let mut by_player: HashMap<i64, Identity> = HashMap::new();
    for &idx in eligible {
        let row = &rows[idx];
        let name = normalize_name(&row.full_name);
        if name.is_empty() {
            continue;
        }
        let entry = by_player.entry(row.player_id).or_insert_with(|| {
            order.push(row.player_id);
            Identity {
                source_id: row.player_id,
                raw_name: row.full_name.clone(),
                name,
                team_id: row.team_id,
                minutes: 0,
                goals: 0,
                assists: 0,
                saves: 0,
                row_ids: Vec::new(),
            }
        });
        entry.minutes += row.minutes;
        entry.goals += row.goals_scored;
        entry.assists += row.assists;
        entry.saves += row.saves;
        entry.row_ids.push(row.row_id);
    }
    order
        .into_iter()
        .filter_map(|player_id| by_player.remove(&player_id))
        .collect()
}

/// Run the full matching pipeline over the two datasets.
///
/// The alias map is frozen for the duration of the pass; resolutions the
/// disambiguation stage confirms are staged in the outcome for review, not
/// applied. Reruns with identical inputs and the same alias asset produce
/// identical output.
pub fn reconcile(
    stats_rows: &[StatsRow],
    fpl_rows: &[FplRow],
    aliases: &AliasMap,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutcome> {
    let eligible = filter::eligible_fantasy_rows(fpl_rows);
    let stats_ids = build_stats_identities(stats_rows);
    let fpl_ids = build_fantasy_identities(fpl_rows, &eligible);

    let mut pairs: Vec<(usize, usize, MatchStage, Option<f64>)> = Vec::new();
    let mut flagged: HashSet<String> = HashSet::new();

    // Stage 1: exact equality on normalized names.
    let exact_out = exact::match_exact(&stats_ids, &fpl_ids);
    pairs.extend(
        exact_out
            .pairs
            .iter()
            .map(|&(s, f)| (s, f, MatchStage::Exact, None)),
    );
    flagged.extend(exact_out.ambiguous);
    let mut stats_residue = exact_out.residue_stats;
    let mut fpl_residue = exact_out.residue_fpl;

    // Stage 2: first-name + Nth-token combinations.
    let combo_out = combos::match_by_token_combination(
        &stats_ids,
        &fpl_ids,
        &stats_residue,
        &fpl_residue,
        opts.max_extra_tokens,
    );
    for pair in &combo_out.pairs {
        pairs.push((pair.stats_idx, pair.fpl_idx, MatchStage::TokenCombo, None));
    }
    flagged.extend(combo_out.ambiguous);
    retain_unmatched(&mut stats_residue, combo_out.pairs.iter().map(|p| p.stats_idx));
    retain_unmatched(&mut fpl_residue, combo_out.pairs.iter().map(|p| p.fpl_idx));

    // Stage 3: stat-validated disambiguation of single-token and flagged names.
    let resolve_out =
        disambiguate::resolve_residues(&stats_ids, &fpl_ids, &stats_residue, &fpl_residue, &flagged);
    for res in &resolve_out.resolutions {
        pairs.push((
            res.stats_idx,
            res.fpl_idx,
            MatchStage::Disambiguated,
            Some(res.confidence),
        ));
    }
    retain_unmatched(
        &mut stats_residue,
        resolve_out.resolutions.iter().map(|r| r.stats_idx),
    );
    retain_unmatched(
        &mut fpl_residue,
        resolve_out.resolutions.iter().map(|r| r.fpl_idx),
    );

    // Stage 4: substitute through the curated alias table, then one more
    // exact pass over what is left.
    let stats_aliased = stats_residue
        .iter()
        .map(|&idx| (idx, aliases.resolve(&stats_ids[idx].name)))
        .collect::<Vec<_>>();
    let fpl_aliased = fpl_residue
        .iter()
        .map(|&idx| (idx, aliases.resolve(&fpl_ids[idx].name)))
        .collect::<Vec<_>>();
    let alias_out = exact::match_names(&stats_aliased, &fpl_aliased);
    pairs.extend(
        alias_out
            .pairs
            .iter()
            .map(|&(s, f)| (s, f, MatchStage::AliasApplied, None)),
    );
    retain_unmatched(&mut stats_residue, alias_out.pairs.iter().map(|&(s, _)| s));
    retain_unmatched(&mut fpl_residue, alias_out.pairs.iter().map(|&(_, f)| f));

    let outcome = assemble_outcome(
        &stats_ids,
        &fpl_ids,
        pairs,
        &stats_residue,
        &fpl_residue,
        resolve_out.staged,
        fpl_rows.len(),
        eligible.len(),
    );
    verify_one_to_one(&outcome)?;
    Ok(outcome)
}

fn retain_unmatched(residue: &mut Vec<usize>, matched: impl Iterator<Item = usize>) {
    let matched: HashSet<usize> = matched.collect();
    residue.retain(|idx| !matched.contains(idx));
}

#[allow(clippy::too_many_arguments)]
fn assemble_outcome(
    stats_ids: &[Identity],
    fpl_ids: &[Identity],
    pairs: Vec<(usize, usize, MatchStage, Option<f64>)>,
    stats_residue: &[usize],
    fpl_residue: &[usize],
    staged_aliases: Vec<StagedAlias>,
    fantasy_rows_total: usize,
    fantasy_rows_eligible: usize,
) -> ReconcileOutcome {
    let mut out = ReconcileOutcome {
        fantasy_rows_total,
        fantasy_rows_eligible,
        staged_aliases,
        ..Default::default()
    };

    for (stats_idx, fpl_idx, stage, confidence) in pairs {
        let stats_id = &stats_ids[stats_idx];
        let fpl_id = &fpl_ids[fpl_idx];
        out.pairs.push(MatchPair {
            fpl_player_id: fpl_id.source_id,
            stats_player_id: stats_id.source_id,
            fpl_name: fpl_id.name.clone(),
            stats_name: stats_id.name.clone(),
            stage,
            confidence,
            fpl_minutes: fpl_id.minutes,
            fpl_goals: fpl_id.goals,
            fpl_assists: fpl_id.assists,
            stats_goals: stats_id.goals,
            stats_assists: stats_id.assists,
        });
    }

    out.unmatched_stats = residue_entries(stats_ids, stats_residue);
    out.unmatched_fpl = residue_entries(fpl_ids, fpl_residue);
    out
}

fn residue_entries(idents: &[Identity], residue: &[usize]) -> Vec<ResidueEntry> {
    let mut entries = residue
        .iter()
        .map(|&idx| {
            let id = &idents[idx];
            ResidueEntry {
                source_id: id.source_id,
                raw_name: id.raw_name.clone(),
                name: id.name.clone(),
                minutes: id.minutes,
                goals: id.goals,
                assists: id.assists,
            }
        })
        .collect::<Vec<_>>();
    // Most minutes first: the entries worth fixing by hand.
    entries.sort_by(|a, b| b.minutes.cmp(&a.minutes).then(a.name.cmp(&b.name)));
    entries
}

/// Each id may appear in at most one pair, and residues must be disjoint
/// from matched ids. A violation is a correctness bug in the pipeline, not
/// bad input.
fn verify_one_to_one(outcome: &ReconcileOutcome) -> Result<()> {
    let mut fpl_seen = HashSet::new();
    let mut stats_seen = HashSet::new();
    for pair in &outcome.pairs {
        ensure!(
            fpl_seen.insert(pair.fpl_player_id),
            "fantasy id {} matched more than once",
            pair.fpl_player_id
        );
        ensure!(
            stats_seen.insert(pair.stats_player_id),
            "stats id {} matched more than once",
            pair.stats_player_id
        );
    }
    for entry in &outcome.unmatched_fpl {
        ensure!(
            !fpl_seen.contains(&entry.source_id),
            "fantasy id {} is both matched and residual",
            entry.source_id
        );
    }
    for entry in &outcome.unmatched_stats {
        ensure!(
            !stats_seen.contains(&entry.source_id),
            "stats id {} is both matched and residual",
            entry.source_id
        );
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{FplRow, StatsRow};

    fn stats_row(player_id: i64, name: &str, goals: i64, assists: i64, saves: i64) -> StatsRow {
        StatsRow {
            row_id: player_id * 100,
            player_id,
            player_name: name.to_string(),
            team_id: 1,
            fixture_id: 1,
            season: "2019/20".to_string(),
            minutes_played: 90,
            goals_total: goals,
            goals_assists: assists,
            rating: Some("7.0".to_string()),
            substitute: false,
            saves,
            cards_yellow: 0,
            cards_red: 0,
        }
    }

    fn fpl_row(player_id: i64, name: &str, minutes: i64) -> FplRow {
        FplRow {
            row_id: player_id,
            player_id,
            full_name: name.to_string(),
            team_id: 1,
            season_name: "2019/20".to_string(),
            minutes,
            goals_scored: 0,
            assists: 0,
            saves: 0,
            bonus_points: 0,
            total_points: 0,
            player_news: String::new(),
        }
    }

    #[test]
    fn stats_identities_aggregate_across_fixtures() {
        let mut rows = vec![
            stats_row(7, "Harry Kane", 1, 0, 0),
            stats_row(7, "Harry Kane", 2, 1, 0),
        ];
        rows[1].row_id = 701;
        let ids = build_stats_identities(&rows);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].goals, 3);
        assert_eq!(ids[0].assists, 1);
        assert_eq!(ids[0].minutes, 180);
        assert_eq!(ids[0].row_ids.len(), 2);
    }

    #[test]
    fn blank_stats_names_are_skipped() {
        let rows = vec![stats_row(7, "  ", 1, 0, 0), stats_row(8, "Somebody", 0, 0, 0)];
        let ids = build_stats_identities(&rows);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].source_id, 8);
    }

    #[test]
    fn zero_minute_rows_never_reach_the_matchers() {
        let stats = vec![stats_row(1, "Tommy Doyle", 0, 0, 0)];
        let fpl = vec![fpl_row(10, "Tommy Doyle", 0)];
        let outcome = reconcile(
            &stats,
            &fpl,
            &alias::AliasMap::empty(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.fantasy_rows_eligible, 0);
        assert!(outcome.unmatched_fpl.is_empty());
        assert_eq!(outcome.unmatched_stats.len(), 1);
    }

    #[test]
    fn alias_pass_pairs_what_earlier_stages_cannot() {
        let stats = vec![stats_row(1, "Rodri", 0, 0, 0)];
        let fpl = vec![fpl_row(10, "Rodrigo Hernandez", 900)];
        let aliases = alias::AliasMap::from_entries(&[alias::AliasEntry {
            from_name: "Rodri".to_string(),
            to_name: "Rodrigo Hernandez".to_string(),
            note: None,
        }]);

        let without = reconcile(
            &stats,
            &fpl,
            &alias::AliasMap::empty(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert!(without.pairs.is_empty());

        let with = reconcile(&stats, &fpl, &aliases, &ReconcileOptions::default()).unwrap();
        assert_eq!(with.pairs.len(), 1);
        assert_eq!(with.pairs[0].stage, MatchStage::AliasApplied);
    }

    #[test]
    fn residues_sort_by_minutes_descending() {
        let fpl = vec![
            fpl_row(10, "Quiet Name", 60),
            fpl_row(11, "Busy Name", 2800),
        ];
        let outcome = reconcile(
            &[],
            &fpl,
            &alias::AliasMap::empty(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.unmatched_fpl[0].name, "Busy Name");
        assert_eq!(outcome.unmatched_fpl[1].name, "Quiet Name");
    }

    #[test]
    fn one_to_one_violation_is_detected() {
        let outcome = ReconcileOutcome {
            pairs: vec![
                MatchPair {
                    fpl_player_id: 1,
                    stats_player_id: 2,
                    fpl_name: "A".into(),
                    stats_name: "A".into(),
                    stage: MatchStage::Exact,
                    confidence: None,
                    fpl_minutes: 0,
                    fpl_goals: 0,
                    fpl_assists: 0,
                    stats_goals: 0,
                    stats_assists: 0,
                },
                MatchPair {
                    fpl_player_id: 1,
                    stats_player_id: 3,
                    fpl_name: "A".into(),
                    stats_name: "B".into(),
                    stage: MatchStage::Exact,
                    confidence: None,
                    fpl_minutes: 0,
                    fpl_goals: 0,
                    fpl_assists: 0,
                    stats_goals: 0,
                    stats_assists: 0,
                },
            ],
            ..Default::default()
        };
        assert!(verify_one_to_one(&outcome).is_err());
    }
}
