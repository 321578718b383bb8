//! Play-calling heuristics.
//!
//! ── Play call ──
//!   1. End of half, tied or down by a field goal, in range: kick.
//!   2. Downs 1-3: blend a distance logistic with the team's pass share.
//!   3. 4th down: go for it at the goal line, else field goal vs punt by spot.
//!
//! ── Try after touchdown ──
//!   Two-point urgency rises late in the game and when trailing by about a
//!   score, saturating through `tanh`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::profile::TeamProfile;
use crate::sim::state::GameState;

const DISTANCE_WEIGHT: f64 = 0.7;
const TEAM_WEIGHT: f64 = 0.3;
const GO_FOR_IT_SPOT: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayCall {
    Pass,
    Rush,
    FieldGoal,
    Punt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionCall {
    ExtraPoint,
    TwoPoint,
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn pass_probability(state: &GameState, profile: &TeamProfile) -> f64 {
    let by_distance = sigmoid(0.8 * (f64::from(state.distance) - 6.0));
    DISTANCE_WEIGHT * by_distance + TEAM_WEIGHT * profile.pass_share
}

pub fn field_goal_attempt_probability(yard_line_100: i32) -> f64 {
    if yard_line_100 <= 35 {
        0.7
    } else if yard_line_100 <= 50 {
        0.4
    } else {
        0.1
    }
}

/// Trailing by a field goal or tied, half about to expire, in range.
pub fn must_kick(state: &GameState) -> bool {
    state.half_seconds_remaining <= 30
        && (-3..=0).contains(&state.score_differential)
        && state.yard_line_100 <= 45
}

fn pass_or_rush<R: Rng + ?Sized>(state: &GameState, profile: &TeamProfile, rng: &mut R) -> PlayCall {
    if rng.gen::<f64>() < pass_probability(state, profile) {
        PlayCall::Pass
    } else {
        PlayCall::Rush
    }
}

pub fn choose_play<R: Rng + ?Sized>(state: &GameState, profile: &TeamProfile, rng: &mut R) -> PlayCall {
    if must_kick(state) {
        return PlayCall::FieldGoal;
    }
    if state.down < 4 || state.yard_line_100 <= GO_FOR_IT_SPOT {
        return pass_or_rush(state, profile, rng);
    }
    if rng.gen::<f64>() < field_goal_attempt_probability(state.yard_line_100) {
        PlayCall::FieldGoal
    } else {
        PlayCall::Punt
    }
}

pub fn two_point_probability(state: &GameState) -> f64 {
    let minutes = f64::from(state.game_seconds_remaining) / 60.0;
    let diff = f64::from(state.score_differential);

    let time_urgency = 0.5 + 5.5 / (1.0 + (0.3 * (minutes - 5.0)).exp());
    let score_urgency = (-0.5 * ((diff + 5.0) / 8.0).powi(2)).exp();
    let trailing_bonus = if diff < 0.0 {
        1.0 + 0.8 * (1.0 - (0.1 * diff).exp())
    } else {
        (-0.2 * diff).exp()
    };

    let p = 0.08 * time_urgency * score_urgency * trailing_bonus;
    let p = 0.85 * (p / 0.85).tanh();
    p.max(0.01)
}

/// `state` is the scoring team's state after the touchdown points are on the board.
pub fn choose_conversion<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> ConversionCall {
    if rng.gen::<f64>() < two_point_probability(state) {
        ConversionCall::TwoPoint
    } else {
        ConversionCall::ExtraPoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fixtures::profile;
    use crate::sim::play::Side;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn situation(down: u8, distance: i32, yard_line_100: i32) -> GameState {
        GameState {
            quarter: 2,
            quarter_seconds_remaining: 600,
            half_seconds_remaining: 600,
            game_seconds_remaining: 2400,
            down,
            distance,
            yard_line_100,
            possession: Side::Home,
            home_score: 7,
            away_score: 7,
            score_differential: 0,
            playing: true,
        }
    }

    #[test]
    fn pass_probability_blends_distance_and_team_share() {
        let mut p = profile("KC");
        p.pass_share = 0.6;
        let s = situation(2, 6, 50);
        assert_relative_eq!(pass_probability(&s, &p), 0.7 * 0.5 + 0.3 * 0.6);
        assert!(pass_probability(&situation(3, 15, 50), &p) > pass_probability(&situation(3, 1, 50), &p));
        // Long yardage leans pass, short yardage leans run.
        assert_relative_eq!(pass_probability(&situation(3, 1, 50), &p), 0.7 * sigmoid(-4.0) + 0.18);
        assert!(pass_probability(&situation(3, 15, 50), &p) > 0.85);
    }

    #[test]
    fn field_goal_attempt_buckets() {
        assert_relative_eq!(field_goal_attempt_probability(35), 0.7);
        assert_relative_eq!(field_goal_attempt_probability(36), 0.4);
        assert_relative_eq!(field_goal_attempt_probability(50), 0.4);
        assert_relative_eq!(field_goal_attempt_probability(51), 0.1);
    }

    #[test]
    fn end_of_half_forces_a_kick_when_close() {
        let p = profile("KC");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut s = situation(1, 10, 30);
        s.half_seconds_remaining = 25;
        s.score_differential = -3;
        for _ in 0..20 {
            assert_eq!(choose_play(&s, &p, &mut rng), PlayCall::FieldGoal);
        }
        s.score_differential = -4;
        assert!(!must_kick(&s));
    }

    #[test]
    fn fourth_down_never_passes_or_rushes_outside_the_five() {
        let p = profile("KC");
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let s = situation(4, 3, 40);
        for _ in 0..200 {
            let call = choose_play(&s, &p, &mut rng);
            assert!(matches!(call, PlayCall::FieldGoal | PlayCall::Punt));
        }
        let goal_line = situation(4, 2, 2);
        for _ in 0..200 {
            let call = choose_play(&goal_line, &p, &mut rng);
            assert!(matches!(call, PlayCall::Pass | PlayCall::Rush));
        }
    }

    #[test]
    fn same_seed_same_calls() {
        let p = profile("KC");
        let s = situation(2, 8, 60);
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let xs: Vec<_> = (0..50).map(|_| choose_play(&s, &p, &mut a)).collect();
        let ys: Vec<_> = (0..50).map(|_| choose_play(&s, &p, &mut b)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn two_point_urgency_peaks_late_when_trailing() {
        let mut early = situation(1, 10, 15);
        early.game_seconds_remaining = 3000;
        early.score_differential = 6;
        let mut late = early.clone();
        late.game_seconds_remaining = 120;
        late.score_differential = -2;

        let p_early = two_point_probability(&early);
        let p_late = two_point_probability(&late);
        assert!(p_late > p_early);
        assert!(p_early >= 0.01);
        assert!(p_late < 0.85);
    }

    #[test]
    fn two_point_probability_matches_closed_form() {
        let mut s = situation(1, 10, 15);
        s.game_seconds_remaining = 300;
        s.score_differential = -5;
        // minutes = 5 → time_urgency = 3.25; score_urgency = 1; trailing_bonus = 1 + 0.8(1 - e^-0.5)
        let raw = 0.08 * 3.25 * (1.0 + 0.8 * (1.0 - (-0.5f64).exp()));
        assert_relative_eq!(two_point_probability(&s), 0.85 * (raw / 0.85).tanh(), epsilon = 1e-12);
    }
}
