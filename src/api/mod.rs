use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, warn};

pub mod cache;

pub use cache::GameCache;

use crate::db::models::GameListing;
use crate::db::Database;
use crate::pbp::PlayByPlayProvider;
use crate::sim::engine::FinalScore;
use crate::sim::game::{TeamProfiles, FIRST_SEASON};
use crate::sim::monte_carlo::{validate_trials, CancelToken, MonteCarloResult};
use crate::sim::play::PlayEvent;
use crate::sim::{Game, Simulator, WhatIfError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub provider: Arc<dyn PlayByPlayProvider>,
    pub cache: GameCache,
    /// Bounded pool every Monte Carlo batch runs on.
    pub pool: Arc<ThreadPool>,
    pub default_trials: u32,
    pub max_trials: u32,
    pub deadline: Option<Duration>,
}

/// Build the Axum router for the API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/seasons", get(seasons_handler))
        .route("/api/games", get(games_handler))
        .route("/api/games/:game_id", get(game_handler))
        .route("/api/games/:game_id/simulate", post(simulate_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

impl IntoResponse for WhatIfError {
    fn into_response(self) -> Response {
        let status = match &self {
            WhatIfError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WhatIfError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            WhatIfError::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let details = match &self {
            WhatIfError::InvalidInput(m) | WhatIfError::DataUnavailable(m) | WhatIfError::Invariant(m) => m.clone(),
        };
        match status {
            StatusCode::SERVICE_UNAVAILABLE => warn!("Data unavailable: {}", details),
            StatusCode::INTERNAL_SERVER_ERROR => error!("Simulation failed: {}", details),
            _ => debug!("Rejected request: {}", details),
        }
        let body = serde_json::json!({ "error": self.kind(), "details": details });
        (status, Json(body)).into_response()
    }
}

// ── Views ───────────────────────────────────────────────────────────────────

/// One play as the API shows it.
#[derive(Debug, Serialize)]
pub struct PlayView {
    pub index: usize,
    pub possession_team: String,
    pub field_position: String,
    pub changeable: BTreeMap<&'static str, bool>,
    #[serde(flatten)]
    pub event: PlayEvent,
}

impl PlayView {
    fn list(game: &Game, plays: &[PlayEvent]) -> Vec<PlayView> {
        plays
            .iter()
            .enumerate()
            .map(|(index, event)| PlayView {
                index,
                possession_team: game.team(event.possession).to_string(),
                field_position: game.field_position(event),
                changeable: event.changeable_attributes().as_map(),
                event: event.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct GameView {
    pub game_id: String,
    pub season: u16,
    pub home_team: String,
    pub away_team: String,
    pub final_score: Option<FinalScore>,
    pub profiles: TeamProfiles,
    pub plays: Vec<PlayView>,
}

#[derive(Debug, Deserialize)]
pub struct GamesQuery {
    pub season: u16,
    pub team: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub play_index: i64,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
    pub trials: Option<i64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HeadlineView {
    pub plays: Vec<PlayView>,
    pub final_score: FinalScore,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub game_id: String,
    pub branch_index: usize,
    pub seed: u64,
    pub headline: HeadlineView,
    pub monte_carlo: MonteCarloResult,
}

/// Override values must be JSON booleans.
pub fn parse_overrides(raw: &HashMap<String, serde_json::Value>) -> Result<BTreeMap<String, bool>, WhatIfError> {
    raw.iter()
        .map(|(name, value)| {
            value
                .as_bool()
                .map(|b| (name.clone(), b))
                .ok_or_else(|| WhatIfError::invalid(format!("override '{}' must be true or false", name)))
        })
        .collect()
}

struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/seasons
async fn seasons_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .list_seasons()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/games?season=2023&team=KC
async fn games_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<GamesQuery>,
) -> Result<Json<Vec<GameListing>>, WhatIfError> {
    if q.season < FIRST_SEASON {
        return Err(WhatIfError::invalid(format!(
            "no play-by-play before {} (got {})",
            FIRST_SEASON, q.season
        )));
    }
    let rows = state
        .provider
        .season_plays(q.season)
        .await
        .map_err(|e| WhatIfError::unavailable(format!("{:#}", e)))?;
    Ok(Json(GameListing::from_rows(q.season, &rows, q.team.as_deref())))
}

/// GET /api/games/:game_id
async fn game_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, WhatIfError> {
    let game = state.cache.get_or_load(&game_id, state.provider.as_ref()).await?;
    Ok(Json(GameView {
        game_id: game.id.clone(),
        season: game.season,
        home_team: game.home_team.clone(),
        away_team: game.away_team.clone(),
        final_score: game.final_score,
        profiles: game.profiles.clone(),
        plays: PlayView::list(&game, &game.plays),
    }))
}

/// POST /api/games/:game_id/simulate
async fn simulate_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, WhatIfError> {
    let index = usize::try_from(req.play_index)
        .map_err(|_| WhatIfError::invalid(format!("play_index must be non-negative, got {}", req.play_index)))?;
    let overrides = parse_overrides(&req.overrides)?;
    let trials = validate_trials(req.trials, state.default_trials, state.max_trials)?;
    let seed = req.seed.unwrap_or_else(rand::random);

    let game = state.cache.get_or_load(&game_id, state.provider.as_ref()).await?;
    debug!(
        "Simulating {} from play {} ({} trials, seed {})",
        game_id, index, trials, seed
    );

    let cancel = state.deadline.map(CancelToken::with_deadline).unwrap_or_default();
    // Stops the batch if the client goes away and this future is dropped.
    let _guard = CancelOnDrop(cancel.clone());
    let pool = Arc::clone(&state.pool);
    let worker_game = Arc::clone(&game);
    let (headline, monte_carlo) = tokio::task::spawn_blocking(move || {
        pool.install(|| {
            let sim = Simulator::new(&worker_game);
            let attrs = sim.branch_attributes(index, &overrides)?;
            let headline = sim.headline(index, attrs, seed)?;
            let monte_carlo = sim.monte_carlo(index, attrs, trials, seed, &cancel)?;
            Ok::<_, WhatIfError>((headline, monte_carlo))
        })
    })
    .await
    .map_err(|e| WhatIfError::invariant(format!("simulation task failed: {}", e)))??;

    debug!(
        "What-if {} play {}: {} {:.1} ({:.1}%) - {} {:.1} ({:.1}%) over {} trials",
        game_id,
        index,
        monte_carlo.home.team,
        monte_carlo.home.average_score,
        monte_carlo.home.win_probability * 100.0,
        monte_carlo.away.team,
        monte_carlo.away.average_score,
        monte_carlo.away.win_probability * 100.0,
        monte_carlo.trials
    );

    Ok(Json(SimulateResponse {
        game_id: game.id.clone(),
        branch_index: headline.branch_index,
        seed,
        headline: HeadlineView {
            plays: PlayView::list(&game, &headline.plays),
            final_score: headline.final_score,
        },
        monte_carlo,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fixtures;

    #[test]
    fn error_kinds_map_to_status_codes() {
        let cases = [
            (WhatIfError::invalid("x"), StatusCode::BAD_REQUEST),
            (WhatIfError::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (WhatIfError::invariant("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn overrides_must_be_booleans() {
        let mut raw = HashMap::new();
        raw.insert("made".to_string(), serde_json::json!(true));
        assert_eq!(parse_overrides(&raw).unwrap().get("made"), Some(&true));

        raw.insert("punt_it".to_string(), serde_json::json!("yes"));
        assert_eq!(parse_overrides(&raw).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn simulate_request_defaults() {
        let req: SimulateRequest = serde_json::from_str(r#"{"play_index": 3}"#).unwrap();
        assert_eq!(req.play_index, 3);
        assert!(req.overrides.is_empty());
        assert!(req.trials.is_none());
        assert!(req.seed.is_none());
    }

    #[test]
    fn play_view_flattens_the_event() {
        let game = fixtures::sample_game();
        let views = PlayView::list(&game, &game.plays);
        assert_eq!(views.len(), game.plays.len());

        let json = serde_json::to_value(&views[fixtures::FIELD_GOAL_INDEX]).unwrap();
        assert_eq!(json["index"], 4);
        assert_eq!(json["category"], "field_goal");
        assert_eq!(json["possession_team"], "KC");
        assert_eq!(json["field_position"], "DET 20");
        assert_eq!(json["changeable"]["made"], false);
    }
}
