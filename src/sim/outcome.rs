//! Per-category outcome samplers.
//!
//! Each sampler draws a [`PlayOutcome`] from the possession team's profile and
//! the caller's random source; `GameState::apply` turns it into an event. Uniform
//! draws that decide success are passed in as `u` so one draw can drive a whole
//! dispatch, the way the reroll resolver needs it.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::sim::decision::sigmoid;
use crate::sim::profile::TeamProfile;
use crate::sim::state::GameState;

pub const PASS_YARDS_SD: f64 = 4.0;
pub const PASS_YARDS_FLOOR: i32 = -5;
pub const RUSH_YARDS_SD: f64 = 3.0;
pub const RUSH_YARDS_FLOOR: i32 = -10;
pub const PUNT_MEAN: f64 = 45.0;
pub const PUNT_SD: f64 = 10.0;
pub const PUNT_FLOOR: i32 = 20;
/// Snap-to-goalpost offset added to the line of scrimmage.
pub const FIELD_GOAL_OFFSET: i32 = 17;
pub const EXTRA_POINT_FACTOR: f64 = 0.95;
pub const TWO_POINT_FACTOR: f64 = 0.45;
pub const MIN_PLAY_SECONDS: i32 = 20;
pub const MAX_PLAY_SECONDS: i32 = 40;

/// What happened on one snap, before it is applied to the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlayOutcome {
    Completion { yards: i32 },
    Incompletion,
    Interception { return_yards: i32 },
    Rush { yards: i32 },
    FieldGoal { made: bool, kick_distance: i32 },
    ExtraPoint { made: bool },
    TwoPoint { made: bool },
    Punt { kick_distance: i32 },
}

/// One normal draw; a degenerate parameter set falls back to the mean.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    match Normal::new(mean, sd) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

pub fn completion<R: Rng + ?Sized>(profile: &TeamProfile, rng: &mut R) -> PlayOutcome {
    let yards = gaussian(rng, profile.avg_yards_per_pass, PASS_YARDS_SD) as i32;
    PlayOutcome::Completion {
        yards: yards.max(PASS_YARDS_FLOOR),
    }
}

pub fn incompletion() -> PlayOutcome {
    PlayOutcome::Incompletion
}

/// Return yardage is not modeled: the defense takes over at the mirrored spot.
pub fn interception() -> PlayOutcome {
    PlayOutcome::Interception { return_yards: 0 }
}

pub fn rush<R: Rng + ?Sized>(profile: &TeamProfile, rng: &mut R) -> PlayOutcome {
    let yards = gaussian(rng, profile.avg_yards_per_carry, RUSH_YARDS_SD) as i32;
    PlayOutcome::Rush {
        yards: yards.max(RUSH_YARDS_FLOOR),
    }
}

/// Pass outcome from one uniform draw: completion, then interception, then incomplete.
pub fn pass_result<R: Rng + ?Sized>(profile: &TeamProfile, u: f64, rng: &mut R) -> PlayOutcome {
    if u < profile.completion_probability {
        completion(profile, rng)
    } else if u < profile.completion_probability + profile.interception_probability {
        interception()
    } else {
        incompletion()
    }
}

pub fn field_goal_distance(yard_line_100: i32) -> i32 {
    yard_line_100 + FIELD_GOAL_OFFSET
}

pub fn field_goal_success_probability(yard_line_100: i32, profile: &TeamProfile) -> f64 {
    let distance = f64::from(field_goal_distance(yard_line_100));
    sigmoid(-0.2 * (distance - 35.0)) * profile.field_goal_probability
}

/// `forced` pins the result regardless of `u`.
pub fn field_goal(state: &GameState, profile: &TeamProfile, u: f64, forced: Option<bool>) -> PlayOutcome {
    let made = forced.unwrap_or_else(|| u < field_goal_success_probability(state.yard_line_100, profile));
    PlayOutcome::FieldGoal {
        made,
        kick_distance: field_goal_distance(state.yard_line_100),
    }
}

pub fn extra_point(profile: &TeamProfile, u: f64, forced: Option<bool>) -> PlayOutcome {
    PlayOutcome::ExtraPoint {
        made: forced.unwrap_or(u < EXTRA_POINT_FACTOR * profile.extra_point_probability),
    }
}

pub fn two_point(profile: &TeamProfile, u: f64, forced: Option<bool>) -> PlayOutcome {
    PlayOutcome::TwoPoint {
        made: forced.unwrap_or(u < TWO_POINT_FACTOR * profile.two_point_probability),
    }
}

pub fn punt<R: Rng + ?Sized>(rng: &mut R) -> PlayOutcome {
    let distance = gaussian(rng, PUNT_MEAN, PUNT_SD) as i32;
    PlayOutcome::Punt {
        kick_distance: distance.max(PUNT_FLOOR),
    }
}

pub fn seconds_per_play<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(MIN_PLAY_SECONDS..=MAX_PLAY_SECONDS)
}
