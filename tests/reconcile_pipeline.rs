use epl_reconcile::reconcile::alias::{AliasMap, load_bundled_alias_map};
use epl_reconcile::reconcile::{MatchStage, ReconcileOptions, reconcile};
use epl_reconcile::records::{FplRow, StatsRow};

fn stats_row(
    row_id: i64,
    player_id: i64,
    name: &str,
    minutes: i64,
    goals: i64,
    assists: i64,
    saves: i64,
) -> StatsRow {
    StatsRow {
        row_id,
        player_id,
        player_name: name.to_string(),
        team_id: 1,
        fixture_id: row_id,
        season: "2019/20".to_string(),
        minutes_played: minutes,
        goals_total: goals,
        goals_assists: assists,
        rating: None,
        substitute: false,
        saves,
        cards_yellow: 0,
        cards_red: 0,
    }
}

fn fpl_row(
    row_id: i64,
    player_id: i64,
    name: &str,
    minutes: i64,
    goals: i64,
    assists: i64,
    saves: i64,
    news: &str,
) -> FplRow {
    FplRow {
        row_id,
        player_id,
        full_name: name.to_string(),
        team_id: 1,
        season_name: "2019/20".to_string(),
        minutes,
        goals_scored: goals,
        assists,
        saves,
        bonus_points: 0,
        total_points: 0,
        player_news: news.to_string(),
    }
}

fn run(stats: &[StatsRow], fpl: &[FplRow], aliases: &AliasMap) -> epl_reconcile::reconcile::ReconcileOutcome {
    reconcile(stats, fpl, aliases, &ReconcileOptions::default()).expect("pipeline runs")
}

#[test]
fn accented_names_match_exactly() {
    let stats = vec![stats_row(1, 10, "Sadio Mané", 2800, 18, 7, 0)];
    let fpl = vec![fpl_row(1, 100, "Sadio Mane", 2790, 18, 7, 0, "")];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert_eq!(out.pairs.len(), 1);
    assert_eq!(out.pairs[0].stage, MatchStage::Exact);
    assert_eq!(out.pairs[0].fpl_player_id, 100);
    assert_eq!(out.pairs[0].stats_player_id, 10);
    assert!(out.unmatched_fpl.is_empty());
    assert!(out.unmatched_stats.is_empty());
}

#[test]
fn zero_minute_and_departed_players_are_excluded() {
    let stats = vec![stats_row(1, 10, "Jonathan Kodjia", 120, 0, 0, 0)];
    let fpl = vec![
        fpl_row(
            1,
            100,
            "Jonathan Kodjia",
            120,
            0,
            0,
            0,
            "Joined Al Gharafa in the Qatar Stars League",
        ),
        fpl_row(2, 101, "Unused Substitute", 0, 0, 0, 0, ""),
    ];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert!(out.pairs.is_empty());
    assert_eq!(out.fantasy_rows_total, 2);
    assert_eq!(out.fantasy_rows_eligible, 0);
    // Excluded rows are not residues either, they were never candidates.
    assert!(out.unmatched_fpl.is_empty());
    assert_eq!(out.unmatched_stats.len(), 1);
}

#[test]
fn departure_markers_are_case_sensitive() {
    let stats = vec![stats_row(1, 10, "Test Player", 90, 1, 0, 0)];
    let fpl = vec![fpl_row(
        1,
        100,
        "Test Player",
        90,
        1,
        0,
        0,
        "has joined the physio room",
    )];

    let out = run(&stats, &fpl, &AliasMap::empty());
    // Lowercase "joined" is ordinary news, not a departure notice.
    assert_eq!(out.pairs.len(), 1);
}

#[test]
fn long_registered_name_matches_via_token_combination() {
    let stats = vec![
        stats_row(1, 10, "Gabriel Jesus", 2100, 14, 4, 0),
        stats_row(2, 11, "David Silva", 1900, 5, 9, 0),
    ];
    let fpl = vec![
        fpl_row(1, 100, "Gabriel Fernando de Jesus", 2100, 14, 4, 0, ""),
        fpl_row(2, 101, "David Josué Jiménez Silva", 1900, 5, 9, 0, ""),
    ];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert_eq!(out.pairs.len(), 2);
    assert!(out.pairs.iter().all(|p| p.stage == MatchStage::TokenCombo));
    let gabriel = out
        .pairs
        .iter()
        .find(|p| p.stats_name == "Gabriel Jesus")
        .unwrap();
    assert_eq!(gabriel.fpl_player_id, 100);
}

#[test]
fn short_stats_name_is_disambiguated_by_goal_involvement() {
    let stats = vec![
        stats_row(1, 10, "Rodri", 2500, 3, 2, 0),
        stats_row(2, 11, "Jay Rodriguez", 2200, 8, 2, 0),
    ];
    let fpl = vec![
        fpl_row(1, 100, "Rodrigo Hernandez", 2480, 3, 2, 0, ""),
        fpl_row(2, 101, "Jay Rodriguez", 2200, 8, 2, 0, ""),
    ];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert_eq!(out.pairs.len(), 2);

    let rodri = out
        .pairs
        .iter()
        .find(|p| p.stats_name == "Rodri")
        .expect("rodri resolved");
    assert_eq!(rodri.stage, MatchStage::Disambiguated);
    assert_eq!(rodri.fpl_player_id, 100);
    assert_eq!(rodri.confidence, Some(1.0));

    // The confirmed equivalence is staged for review, never applied in-run.
    assert_eq!(out.staged_aliases.len(), 1);
    assert_eq!(out.staged_aliases[0].from_name, "Rodrigo Hernandez");
    assert_eq!(out.staged_aliases[0].to_name, "Rodri");
}

#[test]
fn keepers_are_disambiguated_on_saves() {
    let stats = vec![stats_row(1, 10, "Adrian", 1200, 0, 0, 41)];
    let fpl = vec![fpl_row(1, 100, "Adrian San Miguel del Castillo", 1180, 0, 0, 40, "")];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert_eq!(out.pairs.len(), 1);
    assert_eq!(out.pairs[0].stage, MatchStage::Disambiguated);
}

#[test]
fn curated_alias_closes_the_longest_names() {
    let aliases = load_bundled_alias_map().expect("bundled asset parses");
    let stats = vec![stats_row(1, 10, "Bernardo Silva", 2480, 6, 10, 0)];
    let fpl = vec![fpl_row(
        1,
        100,
        "Bernardo Mota Veiga de Carvalho e Silva",
        2480,
        6,
        10,
        0,
        "",
    )];

    let out = run(&stats, &fpl, &aliases);
    assert_eq!(out.pairs.len(), 1);
    assert_eq!(out.pairs[0].stage, MatchStage::AliasApplied);
    assert_eq!(out.pairs[0].stats_name, "Bernardo Silva");
}

#[test]
fn shared_names_with_no_signal_stay_unresolved() {
    // Two distinct players registered under the same name, neither with a
    // goal involvement to tell them apart.
    let stats = vec![
        stats_row(1, 10, "Danny Ward", 900, 0, 0, 0),
        stats_row(2, 11, "Danny Ward", 450, 0, 0, 0),
    ];
    let fpl = vec![fpl_row(1, 100, "Danny Ward", 900, 0, 0, 0, "")];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert!(out.pairs.is_empty());
    assert_eq!(out.unmatched_stats.len(), 2);
    assert_eq!(out.unmatched_fpl.len(), 1);
}

#[test]
fn residues_are_reported_sorted_by_minutes() {
    let stats = vec![
        stats_row(1, 10, "Someone Unknown", 300, 0, 0, 0),
        stats_row(2, 11, "Another Unknown", 1800, 2, 1, 0),
    ];
    let fpl = vec![fpl_row(1, 100, "Totally Different", 2000, 4, 4, 0, "")];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert!(out.pairs.is_empty());
    assert_eq!(out.unmatched_stats[0].raw_name, "Another Unknown");
    assert_eq!(out.unmatched_stats[1].raw_name, "Someone Unknown");
    assert_eq!(out.unmatched_fpl[0].raw_name, "Totally Different");
}

#[test]
fn reruns_are_deterministic() {
    let stats = vec![
        stats_row(1, 10, "Gabriel Jesus", 2100, 14, 4, 0),
        stats_row(2, 11, "Rodri", 2500, 3, 2, 0),
        stats_row(3, 12, "Sadio Mané", 2800, 18, 7, 0),
    ];
    let fpl = vec![
        fpl_row(1, 100, "Gabriel Fernando de Jesus", 2100, 14, 4, 0, ""),
        fpl_row(2, 101, "Rodrigo Hernandez", 2480, 3, 2, 0, ""),
        fpl_row(3, 102, "Sadio Mane", 2790, 18, 7, 0, ""),
    ];

    let first = run(&stats, &fpl, &AliasMap::empty());
    let second = run(&stats, &fpl, &AliasMap::empty());
    let ids = |out: &epl_reconcile::reconcile::ReconcileOutcome| {
        out.pairs
            .iter()
            .map(|p| (p.fpl_player_id, p.stats_player_id))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.pairs.len(), 3);
}

#[test]
fn fixture_rows_aggregate_into_one_identity() {
    // Several appearances of the same player collapse into one season line.
    let stats = vec![
        stats_row(1, 10, "Harry Kane", 90, 1, 0, 0),
        stats_row(2, 10, "Harry Kane", 90, 2, 1, 0),
        stats_row(3, 10, "Harry Kane", 45, 0, 0, 0),
    ];
    let fpl = vec![fpl_row(1, 100, "Harry Kane", 225, 3, 1, 0, "")];

    let out = run(&stats, &fpl, &AliasMap::empty());
    assert_eq!(out.pairs.len(), 1);
    assert_eq!(out.pairs[0].stats_goals, 3);
    assert_eq!(out.pairs[0].stats_assists, 1);
}
