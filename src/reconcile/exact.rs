use std::collections::{HashMap, HashSet};

use super::Identity;

/// Outcome of one exact-equality pass. Indices refer to the identity slices
/// the caller passed in. Names that map to more than one identity on either
/// side are never paired here; they stay in the residues and are reported in
/// `ambiguous` so the resolver can pick them up.
#[derive(Debug, Default)]
pub struct ExactOutcome {
    pub pairs: Vec<(usize, usize)>,
    pub residue_stats: Vec<usize>,
    pub residue_fpl: Vec<usize>,
    pub ambiguous: HashSet<String>,
}

/// Pair identities whose normalized names are string-equal.
pub fn match_exact(stats: &[Identity], fpl: &[Identity]) -> ExactOutcome {
    let stats_entries = stats
        .iter()
        .enumerate()
        .map(|(idx, id)| (idx, id.name.as_str()))
        .collect::<Vec<_>>();
    let fpl_entries = fpl
        .iter()
        .enumerate()
        .map(|(idx, id)| (idx, id.name.as_str()))
        .collect::<Vec<_>>();
    match_names(&stats_entries, &fpl_entries)
}

/// Core of the exact matcher over (index, comparable name) pairs. The alias
/// pass reuses this with alias-resolved names instead of normalized ones.
pub fn match_names(stats: &[(usize, &str)], fpl: &[(usize, &str)]) -> ExactOutcome {
    let stats_by_name = index_by_name(stats);
    let fpl_by_name = index_by_name(fpl);

    let mut out = ExactOutcome::default();
    let mut matched_stats = HashSet::new();
    let mut matched_fpl = HashSet::new();

    for (name, stats_idxs) in &stats_by_name {
        let Some(fpl_idxs) = fpl_by_name.get(name) else {
            continue;
        };
        if stats_idxs.len() == 1 && fpl_idxs.len() == 1 {
            out.pairs.push((stats_idxs[0], fpl_idxs[0]));
            matched_stats.insert(stats_idxs[0]);
            matched_fpl.insert(fpl_idxs[0]);
        } else {
            // Shared name with multiplicity on either side: an arbitrary
            // pick here would be a silent false positive.
            out.ambiguous.insert((*name).to_string());
        }
    }

    out.residue_stats = stats
        .iter()
        .filter(|(idx, _)| !matched_stats.contains(idx))
        .map(|(idx, _)| *idx)
        .collect();
    out.residue_fpl = fpl
        .iter()
        .filter(|(idx, _)| !matched_fpl.contains(idx))
        .map(|(idx, _)| *idx)
        .collect();
    out.pairs.sort_unstable();
    out
}

fn index_by_name<'a>(entries: &[(usize, &'a str)]) -> HashMap<&'a str, Vec<usize>> {
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, name) in entries {
        by_name.entry(name).or_default().push(*idx);
    }
    by_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::testing::identity;

    #[test]
    fn equal_names_pair_up() {
        let stats = vec![identity(1, "Harry Kane"), identity(2, "Rodri")];
        let fpl = vec![
            identity(10, "Rodrigo Hernandez Martinez"),
            identity(11, "Harry Kane"),
        ];
        let out = match_exact(&stats, &fpl);
        assert_eq!(out.pairs, vec![(0, 1)]);
        assert_eq!(out.residue_stats, vec![1]);
        assert_eq!(out.residue_fpl, vec![0]);
        assert!(out.ambiguous.is_empty());
    }

    #[test]
    fn short_vs_long_name_goes_to_residue() {
        let stats = vec![identity(1, "Rodri")];
        let fpl = vec![identity(10, "Rodrigo Hernandez Martinez")];
        let out = match_exact(&stats, &fpl);
        assert!(out.pairs.is_empty());
        assert_eq!(out.residue_stats, vec![0]);
        assert_eq!(out.residue_fpl, vec![0]);
    }

    #[test]
    fn duplicate_name_is_deferred_not_paired() {
        // Two distinct stats identities named "Danilo": pairing either one
        // with the single fantasy record would be a guess.
        let stats = vec![identity(1, "Danilo"), identity(2, "Danilo")];
        let fpl = vec![identity(10, "Danilo")];
        let out = match_exact(&stats, &fpl);
        assert!(out.pairs.is_empty());
        assert!(out.ambiguous.contains("Danilo"));
        assert_eq!(out.residue_stats, vec![0, 1]);
        assert_eq!(out.residue_fpl, vec![0]);
    }
}
