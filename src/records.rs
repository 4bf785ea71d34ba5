use serde::{Deserialize, Serialize};

/// One player appearance in one fixture, as returned by the stats API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRow {
    pub row_id: i64,
    pub player_id: i64,
    pub player_name: String,
    pub team_id: i64,
    pub fixture_id: i64,
    pub season: String,
    pub minutes_played: i64,
    pub goals_total: i64,
    pub goals_assists: i64,
    /// Raw rating text. The source emits a dash placeholder for players
    /// without a rated appearance, so this is not always numeric.
    pub rating: Option<String>,
    pub substitute: bool,
    pub saves: i64,
    pub cards_yellow: i64,
    pub cards_red: i64,
}

impl StatsRow {
    pub fn rating_value(&self) -> Option<f64> {
        let raw = self.rating.as_deref()?.trim();
        if raw.is_empty() || raw.contains('–') || raw.contains('-') {
            return None;
        }
        raw.parse::<f64>().ok()
    }
}

/// One player season from the fantasy API history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FplRow {
    pub row_id: i64,
    pub player_id: i64,
    pub full_name: String,
    pub team_id: i64,
    pub season_name: String,
    pub minutes: i64,
    pub goals_scored: i64,
    pub assists: i64,
    pub saves: i64,
    pub bonus_points: i64,
    pub total_points: i64,
    /// Free text status feed. Departure notices land here.
    pub player_news: String,
}
