use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::Identity;

/// Alias candidate produced by a confirmed resolution. Staged entries are
/// surfaced for human review and folded into the next alias artifact version;
/// they are never applied inside the run that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedAlias {
    pub from_name: String,
    pub to_name: String,
    pub confidence: f64,
    pub staged_at: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub stats_idx: usize,
    pub fpl_idx: usize,
    pub confidence: f64,
}

#[derive(Debug, Default)]
pub struct ResolveOutcome {
    pub resolutions: Vec<Resolution>,
    pub staged: Vec<StagedAlias>,
}

/// Cross-validate leftover stats-side names against fantasy-side candidates
/// using secondary statistics.
///
/// Targets are single-token stats names (common for players known by one
/// name) plus any name the earlier stages flagged ambiguous. Candidates are
/// unmatched fantasy identities whose name contains the target name. The
/// secondary signal is summed goals + assists, or saves when the target looks
/// like a goalkeeper. A candidate is accepted only when it is the unique
/// closest non-zero signal; identical signals (including all-zero) stay
/// unresolved, since equal stat lines cannot tell two players apart.
pub fn resolve_residues(
    stats: &[Identity],
    fpl: &[Identity],
    stats_residue: &[usize],
    fpl_residue: &[usize],
    flagged: &HashSet<String>,
) -> ResolveOutcome {
    let mut out = ResolveOutcome::default();
    let mut taken_fpl = HashSet::new();

    for &stats_idx in stats_residue {
        let target = &stats[stats_idx];
        let single_token = !target.name.contains(' ');
        if !single_token && !flagged.contains(&target.name) {
            continue;
        }
        if target.name.is_empty() {
            continue;
        }

        let keeper = target.is_keeper_like();
        let target_sig = target.secondary_signal();
        if target_sig == 0 {
            // Nothing to validate against; accepting the first name hit
            // would be a blind guess.
            continue;
        }

        let mut best: Option<(usize, i64)> = None;
        let mut best_is_tied = false;
        for &fpl_idx in fpl_residue {
            if taken_fpl.contains(&fpl_idx) {
                continue;
            }
            let candidate = &fpl[fpl_idx];
            if !candidate.name.contains(target.name.as_str()) {
                continue;
            }
            let candidate_sig = if keeper {
                candidate.saves
            } else {
                candidate.goals + candidate.assists
            };
            if candidate_sig == 0 {
                continue;
            }
            let diff = (candidate_sig - target_sig).abs();
            match best {
                None => best = Some((fpl_idx, diff)),
                Some((_, best_diff)) if diff < best_diff => {
                    best = Some((fpl_idx, diff));
                    best_is_tied = false;
                }
                Some((_, best_diff)) if diff == best_diff => best_is_tied = true,
                Some(_) => {}
            }
        }

        let Some((fpl_idx, diff)) = best else {
            continue;
        };
        if best_is_tied {
            // Two candidates equally close; known false-match risk, defer
            // to manual review instead.
            continue;
        }

        let confidence = 1.0 / (1.0 + diff as f64);
        taken_fpl.insert(fpl_idx);
        out.resolutions.push(Resolution {
            stats_idx,
            fpl_idx,
            confidence,
        });
        out.staged.push(StagedAlias {
            from_name: fpl[fpl_idx].name.clone(),
            to_name: target.name.clone(),
            confidence,
            staged_at: Utc::now().to_rfc3339(),
        });
    }

    out
}
