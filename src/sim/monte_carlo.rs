//! Monte Carlo aggregation over independent continuations.
//!
//! Trials fan out with rayon; each owns a generator seeded from the batch seed
//! plus its index, so a batch is reproducible whatever the thread count. The
//! [`Tally`] is a plain sum, merged in any order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sim::engine::{trial_rng, FinalScore, Simulator};
use crate::sim::error::WhatIfError;
use crate::sim::play::{ChangeableAttributes, Side};

pub const DEFAULT_TRIALS: u32 = 5000;

/// Shared stop signal for a running batch: an explicit flag plus an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn with_deadline(budget: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + budget),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

/// Running sums for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub home_wins: u64,
    pub away_wins: u64,
    pub ties: u64,
    home_points: f64,
    away_points: f64,
    home_points_sq: f64,
    away_points_sq: f64,
}

impl Tally {
    pub fn record(&mut self, score: FinalScore) {
        self.completed += 1;
        let (h, a) = (f64::from(score.home), f64::from(score.away));
        self.home_points += h;
        self.away_points += a;
        self.home_points_sq += h * h;
        self.away_points_sq += a * a;
        match score.winner() {
            Some(Side::Home) => self.home_wins += 1,
            Some(Side::Away) => self.away_wins += 1,
            None => self.ties += 1,
        }
    }

    pub fn merge(self, other: Tally) -> Tally {
        Tally {
            completed: self.completed + other.completed,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
            home_wins: self.home_wins + other.home_wins,
            away_wins: self.away_wins + other.away_wins,
            ties: self.ties + other.ties,
            home_points: self.home_points + other.home_points,
            away_points: self.away_points + other.away_points,
            home_points_sq: self.home_points_sq + other.home_points_sq,
            away_points_sq: self.away_points_sq + other.away_points_sq,
        }
    }

    fn outlook(&self, team: &str, side: Side) -> TeamOutlook {
        let (points, points_sq, wins) = match side {
            Side::Home => (self.home_points, self.home_points_sq, self.home_wins),
            Side::Away => (self.away_points, self.away_points_sq, self.away_wins),
        };
        if self.completed == 0 {
            return TeamOutlook {
                team: team.to_string(),
                average_score: 0.0,
                score_std_dev: 0.0,
                win_probability: 0.0,
                wins,
            };
        }
        let n = self.completed as f64;
        let mean = points / n;
        let variance = (points_sq / n - mean * mean).max(0.0);
        TeamOutlook {
            team: team.to_string(),
            average_score: mean,
            score_std_dev: variance.sqrt(),
            // Ties count half a win for each side.
            win_probability: (wins as f64 + 0.5 * self.ties as f64) / n,
            wins,
        }
    }

    pub fn into_result(self, requested: u32, home_team: &str, away_team: &str) -> MonteCarloResult {
        MonteCarloResult {
            home: self.outlook(home_team, Side::Home),
            away: self.outlook(away_team, Side::Away),
            requested,
            trials: self.completed,
            failed: self.failed,
            ties: self.ties,
            cancelled: self.skipped > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamOutlook {
    pub team: String,
    pub average_score: f64,
    pub score_std_dev: f64,
    pub win_probability: f64,
    pub wins: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub home: TeamOutlook,
    pub away: TeamOutlook,
    pub requested: u32,
    /// Trials that completed and count toward the statistics.
    pub trials: u64,
    /// Trials dropped on an engine error.
    pub failed: u64,
    pub ties: u64,
    pub cancelled: bool,
}

/// Resolve a caller trial count against the configured default and ceiling.
pub fn validate_trials(requested: Option<i64>, default: u32, max: u32) -> Result<u32, WhatIfError> {
    let Some(n) = requested else {
        return Ok(default);
    };
    if n <= 0 {
        return Err(WhatIfError::invalid(format!("trials must be positive, got {}", n)));
    }
    if n > i64::from(max) {
        return Err(WhatIfError::invalid(format!(
            "trials must be at most {}, got {}",
            max, n
        )));
    }
    Ok(n as u32)
}

impl Simulator<'_> {
    /// Run `trials` independent continuations of the branch and aggregate them.
    ///
    /// Runs on the current rayon pool. A cancelled batch returns what finished.
    pub fn monte_carlo(
        &self,
        index: usize,
        attrs: ChangeableAttributes,
        trials: u32,
        seed: u64,
        cancel: &CancelToken,
    ) -> Result<MonteCarloResult, WhatIfError> {
        if trials == 0 {
            return Err(WhatIfError::invalid("trials must be positive"));
        }
        self.play(index)?;

        let started = Instant::now();
        let tally = (0..u64::from(trials))
            .into_par_iter()
            .fold(Tally::default, |mut tally, i| {
                if cancel.is_cancelled() {
                    tally.skipped += 1;
                    return tally;
                }
                let mut rng = trial_rng(seed, i);
                match self.run_trial(index, attrs, &mut rng) {
                    Ok(score) => tally.record(score),
                    Err(_) => tally.failed += 1,
                }
                tally
            })
            .reduce(Tally::default, Tally::merge);

        let game = self.game();
        if tally.failed > 0 {
            warn!("Dropped {} failed trial(s) from the {} aggregate", tally.failed, game.id);
        }
        if tally.skipped > 0 {
            warn!(
                "Monte Carlo batch for {} cancelled: {} completed, {} skipped",
                game.id, tally.completed, tally.skipped
            );
        }
        info!(
            "Monte Carlo {} from play {}: {} trials in {}ms",
            game.id,
            index,
            tally.completed,
            started.elapsed().as_millis()
        );

        Ok(tally.into_result(trials, &game.home_team, &game.away_team))
    }
}
