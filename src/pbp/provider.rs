use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::HistoricalPlay;
use crate::sim::profile::SeasonCounts;

/// Trait that every play-by-play source must implement.
#[async_trait]
pub trait PlayByPlayProvider: Send + Sync {
    /// Every row of a season, in file order.
    async fn season_plays(&self, season: u16) -> Result<Arc<Vec<HistoricalPlay>>>;

    /// Rows for one game, in play order. Empty when the season has no such game.
    async fn game_plays(&self, season: u16, game_id: &str) -> Result<Vec<HistoricalPlay>> {
        let rows = self.season_plays(season).await?;
        Ok(rows.iter().filter(|r| r.game_id == game_id).cloned().collect())
    }

    /// Season sums for one team, enough to build its profile.
    async fn season_counts(&self, team: &str, season: u16) -> Result<SeasonCounts> {
        let rows = self.season_plays(season).await?;
        Ok(SeasonCounts::tally(team, season, &rows))
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
