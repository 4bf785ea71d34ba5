use std::collections::{HashMap, HashSet};

use super::normalize::name_tokens;
use super::Identity;

pub const DEFAULT_MAX_EXTRA_TOKENS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ComboPair {
    pub stats_idx: usize,
    pub fpl_idx: usize,
    /// Which token position produced the hit (1 = first + second token).
    pub combo_index: usize,
}

#[derive(Debug, Default)]
pub struct ComboOutcome {
    pub pairs: Vec<ComboPair>,
    pub ambiguous: HashSet<String>,
}

/// Recover matches where the fantasy dataset stores a full legal name and the
/// stats dataset a short/common one.
///
/// For every unmatched fantasy identity the matcher builds candidate keys
/// `token[0] + " " + token[i]`, `i` ascending from 1 up to `max_extra_tokens`,
/// and tests each against the unmatched stats names. Closer token positions
/// are the more plausible short forms, so the first hit wins and the search
/// stops for that record. A stats name claimed by more than one fantasy
/// record is flagged ambiguous and left for the resolver.
pub fn match_by_token_combination(
    stats: &[Identity],
    fpl: &[Identity],
    stats_residue: &[usize],
    fpl_residue: &[usize],
    max_extra_tokens: usize,
) -> ComboOutcome {
    let mut out = ComboOutcome::default();

    let mut stats_by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for &idx in stats_residue {
        stats_by_name.entry(stats[idx].name.as_str()).or_default().push(idx);
    }

    // stats_idx -> claims from fantasy records
    let mut claims: HashMap<usize, Vec<ComboPair>> = HashMap::new();
    for &fpl_idx in fpl_residue {
        let tokens = name_tokens(&fpl[fpl_idx].name);
        if tokens.len() < 2 {
            continue;
        }
        for combo_index in 1..=max_extra_tokens {
            let Some(extra) = tokens.get(combo_index) else {
                break;
            };
            let key = format!("{} {}", tokens[0], extra);
            let Some(stats_idxs) = stats_by_name.get(key.as_str()) else {
                continue;
            };
            if stats_idxs.len() > 1 {
                // Name already duplicated within the stats side.
                out.ambiguous.insert(key);
                break;
            }
            claims.entry(stats_idxs[0]).or_default().push(ComboPair {
                stats_idx: stats_idxs[0],
                fpl_idx,
                combo_index,
            });
            break;
        }
    }

    for (stats_idx, claimants) in claims {
        if claimants.len() == 1 {
            out.pairs.push(claimants[0]);
        } else {
            out.ambiguous.insert(stats[stats_idx].name.clone());
        }
    }
    out.pairs.sort_unstable_by_key(|p| (p.stats_idx, p.fpl_idx));
    out
}
