use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One raw nflverse play-by-play row.
///
/// Only the columns the engine reads are kept; every other column in the season
/// file is ignored. nflverse writes `NA` for missing values, so numeric and text
/// cells go through [`na_f64`] / [`na_string`] and come out as `None`.
///
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPlay {
    #[serde(default, deserialize_with = "na_f64")]
    pub play_id: Option<f64>,
    pub game_id: String,
    #[serde(default, deserialize_with = "na_f64")]
    pub season: Option<f64>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, deserialize_with = "na_string")]
    pub posteam: Option<String>,
    #[serde(default, deserialize_with = "na_string")]
    pub defteam: Option<String>,
    #[serde(default, deserialize_with = "na_string")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "na_string")]
    pub play_type_nfl: Option<String>,

    // ── Clock and situation ─────────────────────────────────────────────────
    #[serde(default, deserialize_with = "na_f64")]
    pub qtr: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub quarter_seconds_remaining: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub half_seconds_remaining: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub game_seconds_remaining: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub down: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub ydstogo: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub yardline_100: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub yards_gained: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub drive: Option<f64>,

    // ── Score ───────────────────────────────────────────────────────────────
    /// Possession team's score at the snap.
    #[serde(default, deserialize_with = "na_f64")]
    pub posteam_score: Option<f64>,
    /// Defending team's score at the snap.
    #[serde(default, deserialize_with = "na_f64")]
    pub defteam_score: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub score_differential: Option<f64>,
    /// Running scores at the end of the play.
    #[serde(default, deserialize_with = "na_f64")]
    pub total_home_score: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub total_away_score: Option<f64>,
    /// Final scores (repeated on every row of the game).
    #[serde(default, deserialize_with = "na_f64")]
    pub home_score: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub away_score: Option<f64>,

    // ── Outcome flags ───────────────────────────────────────────────────────
    #[serde(default, deserialize_with = "na_f64")]
    pub pass_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub complete_pass: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub interception: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub return_yards: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub passing_yards: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub rush_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub rushing_yards: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub fumble: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub fumble_lost: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub third_down_converted: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub fourth_down_converted: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub punt_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub kick_distance: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub extra_point_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_string")]
    pub extra_point_result: Option<String>,
    #[serde(default, deserialize_with = "na_f64")]
    pub two_point_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_string")]
    pub two_point_conv_result: Option<String>,
    #[serde(default, deserialize_with = "na_f64")]
    pub field_goal_attempt: Option<f64>,
    #[serde(default, deserialize_with = "na_string")]
    pub field_goal_result: Option<String>,
    #[serde(default, deserialize_with = "na_f64")]
    pub penalty: Option<f64>,
    #[serde(default, deserialize_with = "na_string")]
    pub penalty_type: Option<String>,
    #[serde(default, deserialize_with = "na_f64")]
    pub penalty_yards: Option<f64>,
    #[serde(default, deserialize_with = "na_f64")]
    pub timeout: Option<f64>,
    #[serde(default, deserialize_with = "na_string")]
    pub timeout_team: Option<String>,
    #[serde(default, deserialize_with = "na_string")]
    pub td_team: Option<String>,
}

impl HistoricalPlay {
    /// nflverse encodes booleans as 0/1 numbers.
    pub fn flag(value: Option<f64>) -> bool {
        value.map_or(false, |v| v > 0.5)
    }

    /// Round an optional cell to an integer, `None` when missing.
    pub fn int(value: Option<f64>) -> Option<i32> {
        value.filter(|v| v.is_finite()).map(|v| v.round() as i32)
    }

    /// Case-insensitive match on a text result column ("made", "good", "success").
    pub fn result_is(value: &Option<String>, expected: &[&str]) -> bool {
        value
            .as_deref()
            .map(|v| expected.iter().any(|e| v.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    pub fn is_offense(&self, team: &str) -> bool {
        self.posteam.as_deref() == Some(team)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.is_offense(team) || self.defteam.as_deref() == Some(team)
    }
}

/// A stored season, as recorded in the local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season: u16,
    pub row_count: i64,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

/// One game in a season listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameListing {
    pub game_id: String,
    pub season: u16,
    pub week: Option<u8>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl GameListing {
    /// Collapse season rows into one listing per game, keeping file order.
    /// `team` filters to games where that abbreviation is home or away.
    pub fn from_rows(season: u16, rows: &[HistoricalPlay], team: Option<&str>) -> Vec<GameListing> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            if !seen.insert(row.game_id.as_str()) {
                continue;
            }
            if let Some(t) = team {
                if !row.home_team.eq_ignore_ascii_case(t) && !row.away_team.eq_ignore_ascii_case(t) {
                    continue;
                }
            }
            out.push(GameListing {
                game_id: row.game_id.clone(),
                season,
                week: row.game_id.split('_').nth(1).and_then(|w| w.parse().ok()),
                home_team: row.home_team.clone(),
                away_team: row.away_team.clone(),
                home_score: HistoricalPlay::int(row.home_score),
                away_score: HistoricalPlay::int(row.away_score),
            });
        }
        out
    }
}

// ── NA-tolerant cell deserializers ──────────────────────────────────────────

/// A raw cell: the csv reader infers numbers and booleans, JSON hands us numbers
/// directly, everything else arrives as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    Num(f64),
    Bool(bool),
    Text(String),
}

fn is_na(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t.eq_ignore_ascii_case("na") || t.eq_ignore_ascii_case("nan")
}

fn na_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Cell>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Cell::Num(v)) => Ok(Some(v)),
        Some(Cell::Bool(b)) => Ok(Some(if b { 1.0 } else { 0.0 })),
        Some(Cell::Text(s)) if is_na(&s) => Ok(None),
        Some(Cell::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number or NA, got '{}'", s))),
    }
}

fn na_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Cell>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Cell::Num(v)) => Ok(Some(v.to_string())),
        Some(Cell::Bool(b)) => Ok(Some(b.to_string())),
        Some(Cell::Text(s)) if is_na(&s) => Ok(None),
        Some(Cell::Text(s)) => Ok(Some(s)),
    }
}
