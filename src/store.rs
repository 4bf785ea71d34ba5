use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, Transaction, params};

use crate::http_cache::app_cache_dir;
use crate::reconcile::MatchPair;
use crate::records::{FplRow, StatsRow};

const DB_FILE: &str = "epl_reconcile.sqlite";

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS stats_rows (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            player_name TEXT NOT NULL,
            team_id INTEGER NOT NULL,
            fixture_id INTEGER NOT NULL,
            season TEXT NOT NULL,
            minutes_played INTEGER NOT NULL,
            goals_total INTEGER NOT NULL,
            goals_assists INTEGER NOT NULL,
            rating TEXT NULL,
            substitute INTEGER NOT NULL,
            saves INTEGER NOT NULL,
            cards_yellow INTEGER NOT NULL,
            cards_red INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(player_id, fixture_id)
        );
        CREATE INDEX IF NOT EXISTS idx_stats_rows_season ON stats_rows(season);

        CREATE TABLE IF NOT EXISTS fpl_rows (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL,
            full_name TEXT NOT NULL,
            team_id INTEGER NOT NULL,
            season_name TEXT NOT NULL,
            minutes INTEGER NOT NULL,
            goals_scored INTEGER NOT NULL,
            assists INTEGER NOT NULL,
            saves INTEGER NOT NULL,
            bonus_points INTEGER NOT NULL,
            total_points INTEGER NOT NULL,
            player_news TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(player_id, season_name)
        );
        CREATE INDEX IF NOT EXISTS idx_fpl_rows_season ON fpl_rows(season_name);

        CREATE TABLE IF NOT EXISTS reconciled (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season TEXT NOT NULL,
            fpl_player_id INTEGER NOT NULL,
            stats_player_id INTEGER NOT NULL,
            fpl_name TEXT NOT NULL,
            stats_name TEXT NOT NULL,
            stage TEXT NOT NULL,
            confidence REAL NULL,
            created_at TEXT NOT NULL,
            UNIQUE(season, fpl_player_id)
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            items_total INTEGER NOT NULL,
            items_succeeded INTEGER NOT NULL,
            rows_upserted INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Record the start of a fetch pass; the row is completed by
/// [`finish_ingest_run`] once the pass is over.
pub fn begin_ingest_run(conn: &Connection, source: &str, items_total: usize) -> Result<i64> {
    conn.execute(
        "INSERT INTO ingest_runs(source, started_at, finished_at, items_total, items_succeeded, rows_upserted, errors_json)
         VALUES (?1, ?2, NULL, ?3, 0, 0, '[]')",
        params![source, Utc::now().to_rfc3339(), items_total as i64],
    )
    .context("insert ingest run")?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_ingest_run(
    conn: &Connection,
    run_id: i64,
    items_succeeded: usize,
    rows_upserted: usize,
    errors: &[String],
) -> Result<()> {
    let errors_json = serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "UPDATE ingest_runs
         SET finished_at = ?1, items_succeeded = ?2, rows_upserted = ?3, errors_json = ?4
         WHERE run_id = ?5",
        params![
            Utc::now().to_rfc3339(),
            items_succeeded as i64,
            rows_upserted as i64,
            errors_json,
            run_id
        ],
    )
    .context("update ingest run")?;
    Ok(())
}

pub fn upsert_stats_row(tx: &Transaction<'_>, row: &StatsRow) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO stats_rows (
            player_id, player_name, team_id, fixture_id, season,
            minutes_played, goals_total, goals_assists, rating, substitute,
            saves, cards_yellow, cards_red, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14
        )
        ON CONFLICT(player_id, fixture_id) DO UPDATE SET
            player_name = excluded.player_name,
            team_id = excluded.team_id,
            season = excluded.season,
            minutes_played = excluded.minutes_played,
            goals_total = excluded.goals_total,
            goals_assists = excluded.goals_assists,
            rating = excluded.rating,
            substitute = excluded.substitute,
            saves = excluded.saves,
            cards_yellow = excluded.cards_yellow,
            cards_red = excluded.cards_red,
            updated_at = excluded.updated_at
        "#,
        params![
            row.player_id,
            row.player_name,
            row.team_id,
            row.fixture_id,
            row.season,
            row.minutes_played,
            row.goals_total,
            row.goals_assists,
            row.rating,
            bool_to_i64(row.substitute),
            row.saves,
            row.cards_yellow,
            row.cards_red,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert stats row")?;
    Ok(())
}

pub fn upsert_fpl_row(tx: &Transaction<'_>, row: &FplRow) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO fpl_rows (
            player_id, full_name, team_id, season_name,
            minutes, goals_scored, assists, saves,
            bonus_points, total_points, player_news, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12
        )
        ON CONFLICT(player_id, season_name) DO UPDATE SET
            full_name = excluded.full_name,
            team_id = excluded.team_id,
            minutes = excluded.minutes,
            goals_scored = excluded.goals_scored,
            assists = excluded.assists,
            saves = excluded.saves,
            bonus_points = excluded.bonus_points,
            total_points = excluded.total_points,
            player_news = excluded.player_news,
            updated_at = excluded.updated_at
        "#,
        params![
            row.player_id,
            row.full_name,
            row.team_id,
            row.season_name,
            row.minutes,
            row.goals_scored,
            row.assists,
            row.saves,
            row.bonus_points,
            row.total_points,
            row.player_news,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert fantasy row")?;
    Ok(())
}

pub fn load_stats_rows(conn: &Connection, season: &str) -> Result<Vec<StatsRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                row_id, player_id, player_name, team_id, fixture_id, season,
                minutes_played, goals_total, goals_assists, rating, substitute,
                saves, cards_yellow, cards_red
            FROM stats_rows
            WHERE season = ?1
            ORDER BY fixture_id ASC, row_id ASC
            "#,
        )
        .context("prepare load stats rows query")?;

    let rows = stmt
        .query_map(params![season], |row| {
            Ok(StatsRow {
                row_id: row.get(0)?,
                player_id: row.get(1)?,
                player_name: row.get(2)?,
                team_id: row.get(3)?,
                fixture_id: row.get(4)?,
                season: row.get(5)?,
                minutes_played: row.get(6)?,
                goals_total: row.get(7)?,
                goals_assists: row.get(8)?,
                rating: row.get(9)?,
                substitute: row.get::<_, i64>(10)? != 0,
                saves: row.get(11)?,
                cards_yellow: row.get(12)?,
                cards_red: row.get(13)?,
            })
        })
        .context("query stats rows")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode stats row")?);
    }
    Ok(out)
}

pub fn load_fpl_rows(conn: &Connection, season: &str) -> Result<Vec<FplRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                row_id, player_id, full_name, team_id, season_name,
                minutes, goals_scored, assists, saves,
                bonus_points, total_points, player_news
            FROM fpl_rows
            WHERE season_name = ?1
            ORDER BY row_id ASC
            "#,
        )
        .context("prepare load fantasy rows query")?;

    let rows = stmt
        .query_map(params![season], |row| {
            Ok(FplRow {
                row_id: row.get(0)?,
                player_id: row.get(1)?,
                full_name: row.get(2)?,
                team_id: row.get(3)?,
                season_name: row.get(4)?,
                minutes: row.get(5)?,
                goals_scored: row.get(6)?,
                assists: row.get(7)?,
                saves: row.get(8)?,
                bonus_points: row.get(9)?,
                total_points: row.get(10)?,
                player_news: row.get(11)?,
            })
        })
        .context("query fantasy rows")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode fantasy row")?);
    }
    Ok(out)
}

/// Replace the reconciled id map for one season. Replays overwrite
/// wholesale rather than merging, so stale pairs never linger.
pub fn save_reconciled(conn: &mut Connection, season: &str, pairs: &[MatchPair]) -> Result<()> {
    let tx = conn.transaction().context("begin reconciled transaction")?;
    tx.execute("DELETE FROM reconciled WHERE season = ?1", params![season])
        .context("clear reconciled season")?;
    for pair in pairs {
        tx.execute(
            "INSERT INTO reconciled (
                season, fpl_player_id, stats_player_id, fpl_name, stats_name,
                stage, confidence, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                season,
                pair.fpl_player_id,
                pair.stats_player_id,
                pair.fpl_name,
                pair.stats_name,
                pair.stage.label(),
                pair.confidence,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("insert reconciled pair")?;
    }
    tx.commit().context("commit reconciled transaction")?;
    Ok(())
}

pub fn count_reconciled(conn: &Connection, season: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM reconciled WHERE season = ?1",
        params![season],
        |row| row.get(0),
    )
    .context("count reconciled pairs")
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
