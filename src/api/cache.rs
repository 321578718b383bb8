//! In-memory cache of loaded games.
//!
//! Loading a game means a season read plus two team tallies, so the API keeps
//! each `Game` for a TTL (10 minutes by default). Entries are shared as
//! `Arc<Game>` with running simulations; expiry only drops the cache's handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::pbp::PlayByPlayProvider;
use crate::sim::{Game, WhatIfError};

struct Entry {
    game: Arc<Game>,
    inserted: Instant,
}

/// Thread-safe, TTL-bounded game cache keyed by game id.
#[derive(Clone)]
pub struct GameCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl GameCache {
    pub fn new(ttl: Duration) -> Self {
        GameCache {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Live entry for `game_id`, if any.
    pub async fn get(&self, game_id: &str) -> Option<Arc<Game>> {
        let inner = self.inner.read().await;
        inner
            .get(game_id)
            .filter(|e| e.inserted.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.game))
    }

    pub async fn insert(&self, game: Game) -> Arc<Game> {
        let game = Arc::new(game);
        self.inner.write().await.insert(
            game.id.clone(),
            Entry {
                game: Arc::clone(&game),
                inserted: Instant::now(),
            },
        );
        game
    }

    /// Cached game, or load it through `provider` and cache it.
    ///
    /// Two concurrent misses may both load; the later insert wins.
    pub async fn get_or_load(
        &self,
        game_id: &str,
        provider: &dyn PlayByPlayProvider,
    ) -> Result<Arc<Game>, WhatIfError> {
        if let Some(game) = self.get(game_id).await {
            debug!("GameCache hit: {}", game_id);
            return Ok(game);
        }
        debug!("GameCache miss: {}", game_id);
        let game = Game::load(provider, game_id).await?;
        Ok(self.insert(game).await)
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|_, e| e.inserted.elapsed() < self.ttl);
        before - inner.len()
    }

    /// Number of cached games, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
