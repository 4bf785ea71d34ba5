use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::http_cache::fetch_json_cached;
use crate::http_client::{http_client, polite_pause};
use crate::records::FplRow;
use crate::store;

const BOOTSTRAP_URL: &str = "https://fantasy.premierleague.com/api/bootstrap-static/";
const ELEMENT_SUMMARY_URL: &str = "https://fantasy.premierleague.com/api/element-summary";

/// Current-season metadata for one fantasy element. `player_id` is the
/// stable cross-season code, not the per-season element id.
#[derive(Debug, Clone)]
pub struct ElementMeta {
    pub element_id: i64,
    pub player_id: i64,
    pub team_id: i64,
    pub full_name: String,
    pub news: String,
    pub minutes: i64,
    pub goals_scored: i64,
    pub assists: i64,
    pub saves: i64,
    pub bonus: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone)]
pub struct FplIngestSummary {
    pub db_path: PathBuf,
    pub players_total: usize,
    pub players_succeeded: usize,
    pub rows_upserted: usize,
    pub errors: Vec<String>,
}

/// Pull the fantasy dataset into sqlite: one row per (player, season),
/// combining the current-season totals from `bootstrap-static` with each
/// player's `history_past` seasons.
pub fn ingest_history(
    conn: &mut rusqlite::Connection,
    db_path: PathBuf,
    current_season: &str,
) -> Result<FplIngestSummary> {
    let client = http_client()?;
    let bootstrap = fetch_json_cached(client, BOOTSTRAP_URL, &[])
        .context("fetch bootstrap-static failed")?;
    let elements = parse_bootstrap_elements(&bootstrap)?;
    if elements.is_empty() {
        return Err(anyhow!("bootstrap-static returned no elements"));
    }

    let run_id = store::begin_ingest_run(conn, "fantasy", elements.len())?;
    let mut players_succeeded = 0usize;
    let mut rows_upserted = 0usize;
    let mut errors = Vec::new();

    for meta in &elements {
        match fetch_element_history(client, meta) {
            Ok(mut rows) => {
                rows.push(current_season_row(meta, current_season));
                let tx = conn.transaction().context("begin fantasy transaction")?;
                for row in &rows {
                    store::upsert_fpl_row(&tx, row)?;
                    rows_upserted += 1;
                }
                tx.commit().context("commit fantasy transaction")?;
                players_succeeded += 1;
            }
            Err(err) => {
                errors.push(format!("{} ({}): {err}", meta.full_name, meta.element_id));
            }
        }
        polite_pause();
    }

    store::finish_ingest_run(conn, run_id, players_succeeded, rows_upserted, &errors)?;

    Ok(FplIngestSummary {
        db_path,
        players_total: elements.len(),
        players_succeeded,
        rows_upserted,
        errors,
    })
}

fn fetch_element_history(
    client: &reqwest::blocking::Client,
    meta: &ElementMeta,
) -> Result<Vec<FplRow>> {
    let url = format!("{ELEMENT_SUMMARY_URL}/{}/", meta.element_id);
    let body = fetch_json_cached(client, &url, &[]).context("fetch element summary failed")?;
    parse_history_rows(&body, meta)
}

/// Decode `bootstrap-static` elements. Full name is first + second name,
/// exactly as the site displays legal names.
pub fn parse_bootstrap_elements(raw: &str) -> Result<Vec<ElementMeta>> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid bootstrap json")?;
    let elements = value
        .get("elements")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing elements"))?;

    let mut out = Vec::with_capacity(elements.len());
    for entry in elements {
        let Some(element_id) = entry.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(player_id) = entry.get("code").and_then(Value::as_i64) else {
            continue;
        };
        let first = entry.get("first_name").and_then(|v| v.as_str()).unwrap_or("");
        let second = entry.get("second_name").and_then(|v| v.as_str()).unwrap_or("");
        let full_name = format!("{first} {second}").trim().to_string();
        if full_name.is_empty() {
            continue;
        }
        out.push(ElementMeta {
            element_id,
            player_id,
            team_id: entry.get("team_code").and_then(Value::as_i64).unwrap_or_default(),
            full_name,
            news: entry
                .get("news")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            minutes: int_field(entry, "minutes"),
            goals_scored: int_field(entry, "goals_scored"),
            assists: int_field(entry, "assists"),
            saves: int_field(entry, "saves"),
            bonus: int_field(entry, "bonus"),
            total_points: int_field(entry, "total_points"),
        });
    }
    Ok(out)
}

/// Decode the `history_past` block of an element summary into season rows.
pub fn parse_history_rows(raw: &str, meta: &ElementMeta) -> Result<Vec<FplRow>> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid element summary json")?;
    let history = value
        .get("history_past")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing history_past"))?;

    let mut out = Vec::with_capacity(history.len());
    for entry in history {
        let Some(season_name) = entry.get("season_name").and_then(|v| v.as_str()) else {
            continue;
        };
        out.push(FplRow {
            row_id: 0,
            player_id: meta.player_id,
            full_name: meta.full_name.clone(),
            team_id: meta.team_id,
            season_name: season_name.to_string(),
            minutes: int_field(entry, "minutes"),
            goals_scored: int_field(entry, "goals_scored"),
            assists: int_field(entry, "assists"),
            saves: int_field(entry, "saves"),
            bonus_points: int_field(entry, "bonus"),
            total_points: int_field(entry, "total_points"),
            // News describes the present; past seasons carry none.
            player_news: String::new(),
        });
    }
    Ok(out)
}

/// Season row for the running season, taken from the bootstrap element
/// itself. This is the row the departure filter sees the news text on.
pub fn current_season_row(meta: &ElementMeta, season_name: &str) -> FplRow {
    FplRow {
        row_id: 0,
        player_id: meta.player_id,
        full_name: meta.full_name.clone(),
        team_id: meta.team_id,
        season_name: season_name.to_string(),
        minutes: meta.minutes,
        goals_scored: meta.goals_scored,
        assists: meta.assists,
        saves: meta.saves,
        bonus_points: meta.bonus,
        total_points: meta.total_points,
        player_news: meta.news.clone(),
    }
}

fn int_field(entry: &Value, key: &str) -> i64 {
    entry.get(key).and_then(Value::as_i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTSTRAP_JSON: &str = r#"{
        "elements": [
            {
                "id": 1,
                "code": 80201,
                "team_code": 3,
                "first_name": "Bernardo",
                "second_name": "Mota Veiga de Carvalho e Silva",
                "news": "",
                "minutes": 2480,
                "goals_scored": 6,
                "assists": 10,
                "saves": 0,
                "bonus": 15,
                "total_points": 153
            },
            {
                "id": 2,
                "code": 54764,
                "team_code": 7,
                "first_name": "Jonathan",
                "second_name": "Kodjia",
                "news": "Joined Al Gharafa in the Qatar Stars League",
                "minutes": 120,
                "goals_scored": 0,
                "assists": 0,
                "saves": 0,
                "bonus": 0,
                "total_points": 3
            },
            {"id": 3, "team_code": 7, "first_name": "", "second_name": ""}
        ]
    }"#;

    const SUMMARY_JSON: &str = r#"{
        "history_past": [
            {"season_name": "2018/19", "minutes": 2900, "goals_scored": 7,
             "assists": 7, "saves": 0, "bonus": 21, "total_points": 161},
            {"season_name": "2017/18", "minutes": 2035, "goals_scored": 6,
             "assists": 5, "saves": 0, "bonus": 11, "total_points": 124}
        ]
    }"#;

    #[test]
    fn bootstrap_elements_decode() {
        let elements = parse_bootstrap_elements(BOOTSTRAP_JSON).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(
            elements[0].full_name,
            "Bernardo Mota Veiga de Carvalho e Silva"
        );
        assert_eq!(elements[0].player_id, 80201);
        assert!(elements[1].news.contains("Joined"));
    }

    #[test]
    fn nameless_elements_are_skipped() {
        let elements = parse_bootstrap_elements(BOOTSTRAP_JSON).unwrap();
        assert!(elements.iter().all(|e| e.element_id != 3));
    }

    #[test]
    fn history_rows_inherit_element_identity() {
        let elements = parse_bootstrap_elements(BOOTSTRAP_JSON).unwrap();
        let rows = parse_history_rows(SUMMARY_JSON, &elements[0]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player_id, 80201);
        assert_eq!(rows[0].season_name, "2018/19");
        assert_eq!(rows[0].goals_scored, 7);
        assert!(rows[0].player_news.is_empty());
    }

    #[test]
    fn current_season_row_carries_the_news() {
        let elements = parse_bootstrap_elements(BOOTSTRAP_JSON).unwrap();
        let row = current_season_row(&elements[1], "2019/20");
        assert_eq!(row.season_name, "2019/20");
        assert_eq!(row.minutes, 120);
        assert!(row.player_news.contains("Joined"));
    }
}
