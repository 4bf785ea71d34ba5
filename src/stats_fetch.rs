use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::records::StatsRow;
use crate::store;

const DEFAULT_API_HOST: &str = "api-football-v1.p.rapidapi.com";
const DEFAULT_LEAGUE: &str = "Premier League";
const DEFAULT_COUNTRY: &str = "England";

/// Connection settings for the per-fixture stats API, read from the
/// environment so keys never land in the repo.
#[derive(Debug, Clone)]
pub struct StatsApiConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub league: String,
    pub country: String,
}

impl StatsApiConfig {
    pub fn from_env() -> Self {
        let host = env::var("STATS_API_HOST")
            .unwrap_or_else(|_| DEFAULT_API_HOST.to_string())
            .trim()
            .to_string();
        let api_key = env::var("STATS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let league = env::var("STATS_API_LEAGUE")
            .unwrap_or_else(|_| DEFAULT_LEAGUE.to_string())
            .trim()
            .to_string();
        let country = env::var("STATS_API_COUNTRY")
            .unwrap_or_else(|_| DEFAULT_COUNTRY.to_string())
            .trim()
            .to_string();
        Self {
            host,
            api_key,
            league,
            country,
        }
    }

    fn headers(&self) -> Result<[(&str, &str); 2]> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(anyhow!("STATS_API_KEY missing"));
        };
        Ok([
            ("x-rapidapi-host", self.host.as_str()),
            ("x-rapidapi-key", api_key),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct StatsIngestSummary {
    pub db_path: PathBuf,
    pub league_id: u32,
    pub season: String,
    pub fixtures_total: usize,
    pub fixtures_succeeded: usize,
    pub rows_upserted: usize,
    pub errors: Vec<String>,
}

/// Pull every player/fixture row for one league season into sqlite.
pub fn ingest_season(
    conn: &mut rusqlite::Connection,
    db_path: PathBuf,
    cfg: &StatsApiConfig,
    year: u32,
) -> Result<StatsIngestSummary> {
    let client = http_client()?;
    let season = season_label(year);

    let league_id = fetch_league_id(client, cfg, year)?;
    let fixture_ids = fetch_fixture_ids(client, cfg, league_id)?;
    if fixture_ids.is_empty() {
        return Err(anyhow!(
            "no fixtures returned for league {league_id} ({season})"
        ));
    }

    let run_id = store::begin_ingest_run(conn, "stats", fixture_ids.len())?;
    let mut fixtures_succeeded = 0usize;
    let mut rows_upserted = 0usize;
    let mut errors = Vec::new();

    for fixture_id in &fixture_ids {
        match fetch_fixture_player_rows(client, cfg, *fixture_id, &season) {
            Ok(rows) => {
                let tx = conn.transaction().context("begin stats transaction")?;
                for row in &rows {
                    store::upsert_stats_row(&tx, row)?;
                    rows_upserted += 1;
                }
                tx.commit().context("commit stats transaction")?;
                fixtures_succeeded += 1;
            }
            Err(err) => errors.push(format!("fixture {fixture_id}: {err}")),
        }
    }

    store::finish_ingest_run(conn, run_id, fixtures_succeeded, rows_upserted, &errors)?;

    Ok(StatsIngestSummary {
        db_path,
        league_id,
        season,
        fixtures_total: fixture_ids.len(),
        fixtures_succeeded,
        rows_upserted,
        errors,
    })
}

pub fn season_label(year: u32) -> String {
    format!("{}/{:02}", year, (year + 1) % 100)
}

fn fetch_league_id(
    client: &reqwest::blocking::Client,
    cfg: &StatsApiConfig,
    year: u32,
) -> Result<u32> {
    let url = format!("https://{}/v2/leagues", cfg.host);
    let body = fetch_json_cached(client, &url, &cfg.headers()?)
        .context("fetch leagues failed")?;
    parse_league_id_json(&body, &cfg.league, &cfg.country, year)
}

/// Resolve the numeric league id for (league, country, season start year).
pub fn parse_league_id_json(raw: &str, league: &str, country: &str, year: u32) -> Result<u32> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid leagues json")?;
    let leagues = value
        .get("api")
        .and_then(|v| v.get("leagues"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing api.leagues"))?;

    for entry in leagues {
        let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let entry_country = entry.get("country").and_then(|v| v.as_str()).unwrap_or("");
        let season = entry.get("season").and_then(as_u64_any).unwrap_or(0);
        if name == league && entry_country == country && season == u64::from(year) {
            if let Some(id) = entry.get("league_id").and_then(as_u64_any) {
                return u32::try_from(id).context("league id out of range");
            }
        }
    }
    Err(anyhow!("no league id for {league} ({country}) season {year}"))
}

fn fetch_fixture_ids(
    client: &reqwest::blocking::Client,
    cfg: &StatsApiConfig,
    league_id: u32,
) -> Result<Vec<u64>> {
    let url = format!("https://{}/v2/fixtures/league/{league_id}", cfg.host);
    let body = fetch_json_cached(client, &url, &cfg.headers()?)
        .context("fetch fixtures failed")?;
    parse_fixture_ids_json(&body)
}

pub fn parse_fixture_ids_json(raw: &str) -> Result<Vec<u64>> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid fixtures json")?;
    let fixtures = value
        .get("api")
        .and_then(|v| v.get("fixtures"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing api.fixtures"))?;
    Ok(fixtures
        .iter()
        .filter_map(|f| f.get("fixture_id").and_then(as_u64_any))
        .collect())
}

fn fetch_fixture_player_rows(
    client: &reqwest::blocking::Client,
    cfg: &StatsApiConfig,
    fixture_id: u64,
    season: &str,
) -> Result<Vec<StatsRow>> {
    let url = format!("https://{}/v2/players/fixture/{fixture_id}", cfg.host);
    let body = fetch_json_cached(client, &url, &cfg.headers()?)
        .context("fetch fixture players failed")?;
    parse_fixture_players_json(&body, season)
}

/// Decode the per-fixture player rows. Entries missing a player id or name
/// cannot be linked to anything and are skipped; other missing fields
/// degrade to zero/none so one bad field does not sink the row.
pub fn parse_fixture_players_json(raw: &str, season: &str) -> Result<Vec<StatsRow>> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid players json")?;
    let players = value
        .get("api")
        .and_then(|v| v.get("players"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing api.players"))?;

    let mut out = Vec::with_capacity(players.len());
    for entry in players {
        if let Some(row) = parse_player_entry(entry, season) {
            out.push(row);
        }
    }
    Ok(out)
}

fn parse_player_entry(entry: &Value, season: &str) -> Option<StatsRow> {
    let player_id = entry.get("player_id").and_then(as_i64_any)?;
    let player_name = entry
        .get("player_name")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();
    let fixture_id = entry
        .get("event_id")
        .or_else(|| entry.get("fixture_id"))
        .and_then(as_i64_any)
        .unwrap_or_default();
    let goals = entry.get("goals");
    let cards = entry.get("cards");

    Some(StatsRow {
        row_id: 0,
        player_id,
        player_name,
        team_id: entry.get("team_id").and_then(as_i64_any).unwrap_or_default(),
        fixture_id,
        season: season.to_string(),
        minutes_played: entry
            .get("minutes_played")
            .and_then(as_i64_any)
            .unwrap_or_default(),
        goals_total: field_i64(goals, "total"),
        goals_assists: field_i64(goals, "assists"),
        rating: entry
            .get("rating")
            .and_then(value_to_text),
        substitute: entry
            .get("substitute")
            .and_then(as_bool_any)
            .unwrap_or(false),
        saves: field_i64(goals, "saves").max(
            entry.get("saves").and_then(as_i64_any).unwrap_or_default(),
        ),
        cards_yellow: field_i64(cards, "yellow"),
        cards_red: field_i64(cards, "red"),
    })
}

fn field_i64(parent: Option<&Value>, key: &str) -> i64 {
    parent
        .and_then(|v| v.get(key))
        .and_then(as_i64_any)
        .unwrap_or_default()
}

fn value_to_text(v: &Value) -> Option<String> {
    if let Some(s) = v.as_str() {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        return Some(trimmed.to_string());
    }
    v.as_f64().map(|n| n.to_string())
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

fn as_bool_any(v: &Value) -> Option<bool> {
    if let Some(b) = v.as_bool() {
        return Some(b);
    }
    match v.as_str()?.trim() {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}
