use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::models::HistoricalPlay;
use crate::pbp::PlayByPlayProvider;
use crate::sim::engine::FinalScore;
use crate::sim::error::WhatIfError;
use crate::sim::play::{PlayEvent, Side};
use crate::sim::profile::TeamProfile;

/// First season nflverse publishes play-by-play for.
pub const FIRST_SEASON: u16 = 1999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfiles {
    pub home: TeamProfile,
    pub away: TeamProfile,
}

impl TeamProfiles {
    pub fn for_side(&self, side: Side) -> &TeamProfile {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

/// One historical game, classified and ready to branch from.
#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub id: String,
    pub season: u16,
    pub home_team: String,
    pub away_team: String,
    pub final_score: Option<FinalScore>,
    pub plays: Vec<PlayEvent>,
    pub profiles: TeamProfiles,
    pub loaded_at: DateTime<Utc>,
}

/// Season of an nflverse game id (`YYYY_WW_AWAY_HOME`).
pub fn season_of(game_id: &str) -> Result<u16, WhatIfError> {
    let parts: Vec<&str> = game_id.split('_').collect();
    let well_formed = parts.len() == 4
        && parts[0].len() == 4
        && parts[0].bytes().all(|b| b.is_ascii_digit())
        && !parts[1].is_empty()
        && parts[1].bytes().all(|b| b.is_ascii_digit())
        && parts[2..].iter().all(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_alphabetic()));
    if !well_formed {
        return Err(WhatIfError::invalid(format!(
            "malformed game id '{}', expected YYYY_WW_AWAY_HOME",
            game_id
        )));
    }
    let season: u16 = parts[0]
        .parse()
        .map_err(|_| WhatIfError::invalid(format!("malformed season in '{}'", game_id)))?;
    if season < FIRST_SEASON {
        return Err(WhatIfError::invalid(format!(
            "no play-by-play before {} (got {})",
            FIRST_SEASON, season
        )));
    }
    Ok(season)
}

/// Broadcast-style spot: "KC 35" on the offense's half, "DET 20" on the other, "50".
pub fn field_position_label(yard_line_100: i32, offense: &str, defense: &str) -> String {
    match yard_line_100 {
        yl if yl > 50 => format!("{} {}", offense, 100 - yl),
        50 => "50".to_string(),
        yl => format!("{} {}", defense, yl),
    }
}

impl Game {
    pub fn new(
        game_id: &str,
        season: u16,
        rows: &[HistoricalPlay],
        profiles: TeamProfiles,
    ) -> Result<Game, WhatIfError> {
        let first = rows
            .first()
            .ok_or_else(|| WhatIfError::unavailable(format!("no plays found for game {}", game_id)))?;
        let last = rows.last().unwrap_or(first);

        let final_score = match (HistoricalPlay::int(last.home_score), HistoricalPlay::int(last.away_score)) {
            (Some(home), Some(away)) => Some(FinalScore { home, away }),
            _ => match (
                HistoricalPlay::int(last.total_home_score),
                HistoricalPlay::int(last.total_away_score),
            ) {
                (Some(home), Some(away)) => Some(FinalScore { home, away }),
                _ => None,
            },
        };

        let plays: Vec<PlayEvent> = rows.iter().filter_map(PlayEvent::from_historical).collect();
        if plays.is_empty() {
            return Err(WhatIfError::unavailable(format!(
                "game {} has no simulatable plays",
                game_id
            )));
        }
        debug!(
            "Classified {} of {} rows in {} as plays",
            plays.len(),
            rows.len(),
            game_id
        );

        Ok(Game {
            id: game_id.to_string(),
            season,
            home_team: first.home_team.clone(),
            away_team: first.away_team.clone(),
            final_score,
            plays,
            profiles,
            loaded_at: Utc::now(),
        })
    }

    /// Fetch a game and both teams' season tendencies from `provider`.
    pub async fn load(provider: &dyn PlayByPlayProvider, game_id: &str) -> Result<Game, WhatIfError> {
        let season = season_of(game_id)?;
        let unavailable = |e: anyhow::Error| WhatIfError::unavailable(format!("{:#}", e));

        let rows = provider.game_plays(season, game_id).await.map_err(unavailable)?;
        let first = rows
            .first()
            .ok_or_else(|| WhatIfError::unavailable(format!("game {} not found in {}", game_id, season)))?;
        let (home, away) = (first.home_team.clone(), first.away_team.clone());

        let home_counts = provider.season_counts(&home, season).await.map_err(unavailable)?;
        let away_counts = provider.season_counts(&away, season).await.map_err(unavailable)?;
        let profiles = TeamProfiles {
            home: TeamProfile::from_counts(home_counts),
            away: TeamProfile::from_counts(away_counts),
        };

        let game = Game::new(game_id, season, &rows, profiles)?;
        info!(
            "Loaded game {} ({} @ {}, {} plays) from {}",
            game_id,
            game.away_team,
            game.home_team,
            game.plays.len(),
            provider.name()
        );
        Ok(game)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub fn field_position(&self, event: &PlayEvent) -> String {
        field_position_label(
            event.yard_line_100,
            self.team(event.possession),
            self.team(event.possession.opponent()),
        )
    }
}
