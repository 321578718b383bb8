use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::db::models::HistoricalPlay;
use crate::db::Database;
use crate::pbp::provider::PlayByPlayProvider;

/// Read-through provider: seasons come from the local store, and a season the
/// store has never seen is fetched once from `upstream` and written back.
pub struct StoredProvider {
    db: Database,
    upstream: Arc<dyn PlayByPlayProvider>,
    memo: RwLock<HashMap<u16, Arc<Vec<HistoricalPlay>>>>,
}

impl StoredProvider {
    pub fn new(db: Database, upstream: Arc<dyn PlayByPlayProvider>) -> Self {
        StoredProvider {
            db,
            upstream,
            memo: RwLock::new(HashMap::new()),
        }
    }

    async fn stored(&self, season: u16) -> Result<Option<Vec<HistoricalPlay>>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            if db.has_season(season)? {
                db.season_rows(season).map(Some)
            } else {
                Ok(None)
            }
        })
        .await
        .context("Season read task panicked")?
    }
}

#[async_trait]
impl PlayByPlayProvider for StoredProvider {
    async fn season_plays(&self, season: u16) -> Result<Arc<Vec<HistoricalPlay>>> {
        if let Some(rows) = self.memo.read().await.get(&season) {
            return Ok(Arc::clone(rows));
        }

        let rows = match self.stored(season).await? {
            Some(rows) => {
                debug!("Season {} served from store ({} rows)", season, rows.len());
                Arc::new(rows)
            }
            None => {
                let rows = self
                    .upstream
                    .season_plays(season)
                    .await
                    .with_context(|| format!("{} could not supply season {}", self.upstream.name(), season))?;
                let db = self.db.clone();
                let source = self.upstream.name().to_string();
                let to_store = Arc::clone(&rows);
                tokio::task::spawn_blocking(move || db.store_season(season, &source, &to_store))
                    .await
                    .context("Season write task panicked")??;
                info!("Stored season {} ({} rows) from {}", season, rows.len(), self.upstream.name());
                rows
            }
        };

        self.memo.write().await.insert(season, Arc::clone(&rows));
        Ok(rows)
    }

    async fn game_plays(&self, season: u16, game_id: &str) -> Result<Vec<HistoricalPlay>> {
        if !self.memo.read().await.contains_key(&season) {
            let db = self.db.clone();
            let id = game_id.to_string();
            let stored = tokio::task::spawn_blocking(move || {
                if db.has_season(season)? {
                    db.game_rows(season, &id).map(Some)
                } else {
                    Ok(None)
                }
            })
            .await
            .context("Game read task panicked")??;
            if let Some(rows) = stored {
                debug!("Game {} served from store ({} rows)", game_id, rows.len());
                return Ok(rows);
            }
        }
        let rows = self.season_plays(season).await?;
        Ok(rows.iter().filter(|r| r.game_id == game_id).cloned().collect())
    }

    fn name(&self) -> &str {
        "sqlite-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fixtures::{self, StaticProvider};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn fetches_upstream_once_then_reads_locally() {
        let db = Database::open(":memory:").unwrap();
        let upstream = Arc::new(StaticProvider::new(fixtures::season_rows()));
        let provider = StoredProvider::new(db.clone(), upstream.clone());

        let first = provider.season_plays(2023).await.unwrap();
        let second = provider.season_plays(2023).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert!(db.has_season(2023).unwrap());

        // A fresh provider over the same store never touches upstream.
        let again = StoredProvider::new(db, upstream.clone());
        let game = again.game_plays(2023, fixtures::GAME_ID).await.unwrap();
        assert!(!game.is_empty());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn game_read_on_empty_store_fetches_and_stores_the_season() {
        let db = Database::open(":memory:").unwrap();
        let upstream = Arc::new(StaticProvider::new(fixtures::season_rows()));
        let provider = StoredProvider::new(db.clone(), upstream.clone());

        let game = provider.game_plays(2023, fixtures::OTHER_GAME_ID).await.unwrap();
        assert_eq!(game.len(), 5);
        assert!(game.iter().all(|r| r.game_id == fixtures::OTHER_GAME_ID));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert!(db.has_season(2023).unwrap());

        let stored = StoredProvider::new(db, upstream.clone());
        let again = stored.game_plays(2023, fixtures::OTHER_GAME_ID).await.unwrap();
        assert_eq!(again.len(), 5);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let db = Database::open(":memory:").unwrap();
        let provider = StoredProvider::new(db.clone(), Arc::new(fixtures::FailingProvider));
        assert!(provider.season_plays(2023).await.is_err());
        assert!(!db.has_season(2023).unwrap());
    }

    #[tokio::test]
    async fn season_counts_come_from_stored_rows() {
        let db = Database::open(":memory:").unwrap();
        let upstream = Arc::new(StaticProvider::new(fixtures::season_rows()));
        let provider = StoredProvider::new(db, upstream);
        let counts = provider.season_counts("KC", 2023).await.unwrap();
        assert_eq!(counts.pass_attempts, 4);
    }
}
