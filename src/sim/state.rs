//! Simulation cursor and the pure play transition.
//!
//! `GameState::apply` is the only place field position, downs, possession and
//! score change. Samplers draw a [`PlayOutcome`]; the engine owns the loop and
//! the clock.

use serde::{Deserialize, Serialize};

use crate::sim::error::WhatIfError;
use crate::sim::outcome::PlayOutcome;
use crate::sim::play::{PlayDetail, PlayEvent, Side};

pub const QUARTER_SECONDS: i32 = 900;
pub const FINAL_QUARTER: u8 = 4;
/// Spot of a try after a touchdown.
pub const TRY_SPOT: i32 = 15;
/// Receiving team's own 25 after a score.
pub const KICKOFF_SPOT: i32 = 75;
/// Losses behind the offense's own 1 are spotted here; safeties are not modeled.
pub const DEEPEST_SPOT: i32 = 99;
pub const TOUCHDOWN_POINTS: i32 = 6;
pub const FIELD_GOAL_POINTS: i32 = 3;

/// Half and game seconds remaining for a quarter and its clock.
pub fn derived_clocks(quarter: u8, quarter_seconds: i32) -> (i32, i32) {
    let half = if quarter % 2 == 1 {
        quarter_seconds + QUARTER_SECONDS
    } else {
        quarter_seconds
    };
    let game = quarter_seconds + i32::from(FINAL_QUARTER.saturating_sub(quarter)) * QUARTER_SECONDS;
    (half, game)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub quarter: u8,
    pub quarter_seconds_remaining: i32,
    pub half_seconds_remaining: i32,
    pub game_seconds_remaining: i32,
    pub down: u8,
    pub distance: i32,
    pub yard_line_100: i32,
    pub possession: Side,
    pub home_score: i32,
    pub away_score: i32,
    /// Possession team's score minus the opponent's.
    pub score_differential: i32,
    pub playing: bool,
}

/// Result of one snap: the event to record and the state for the next snap.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub event: PlayEvent,
    pub next: GameState,
    /// The possession team scored a touchdown and now has to choose a try.
    pub touchdown: bool,
}

impl GameState {
    pub fn from_event(event: &PlayEvent) -> GameState {
        GameState {
            quarter: event.quarter,
            quarter_seconds_remaining: event.quarter_seconds_remaining,
            half_seconds_remaining: event.half_seconds_remaining,
            game_seconds_remaining: event.game_seconds_remaining,
            down: event.down,
            distance: event.distance,
            yard_line_100: event.yard_line_100,
            possession: event.possession,
            home_score: event.home_score,
            away_score: event.away_score,
            score_differential: event.score_for(event.possession)
                - event.score_for(event.possession.opponent()),
            playing: event.game_seconds_remaining > 0,
        }
    }

    pub fn score_for(&self, side: Side) -> i32 {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    fn add_points(&mut self, side: Side, points: i32) {
        match side {
            Side::Home => self.home_score += points,
            Side::Away => self.away_score += points,
        }
        self.rescore();
    }

    fn rescore(&mut self) {
        self.score_differential =
            self.score_for(self.possession) - self.score_for(self.possession.opponent());
    }

    /// Structural invariants every state must hold between snaps.
    pub fn check(&self) -> Result<(), WhatIfError> {
        if !(1..=FINAL_QUARTER).contains(&self.quarter) {
            return Err(WhatIfError::invariant(format!("quarter {} out of range", self.quarter)));
        }
        if !(1..=4).contains(&self.down) {
            return Err(WhatIfError::invariant(format!("down {} out of range", self.down)));
        }
        if !(0..=100).contains(&self.yard_line_100) {
            return Err(WhatIfError::invariant(format!(
                "yard line {} off the field",
                self.yard_line_100
            )));
        }
        if self.distance < 1 {
            return Err(WhatIfError::invariant(format!("distance {} to go", self.distance)));
        }
        if self.quarter_seconds_remaining < 0 || self.game_seconds_remaining < 0 {
            return Err(WhatIfError::invariant("negative clock"));
        }
        Ok(())
    }

    /// Charge `seconds` of play time to the quarter clock.
    ///
    /// An expired quarter rolls over to a fresh 900 s quarter; the 4th quarter
    /// stays 4 with every clock at zero.
    pub fn run_clock(&mut self, seconds: i32) {
        self.quarter_seconds_remaining -= seconds;
        if self.quarter_seconds_remaining <= 0 {
            if self.quarter < FINAL_QUARTER {
                self.quarter += 1;
                self.quarter_seconds_remaining = QUARTER_SECONDS;
            } else {
                self.quarter_seconds_remaining = 0;
            }
        }
        let (half, game) = derived_clocks(self.quarter, self.quarter_seconds_remaining);
        self.half_seconds_remaining = half;
        self.game_seconds_remaining = game;
        self.playing = game > 0;
    }

    /// Turn over at `spot`, measured from the new offense's point of view.
    fn change_possession(&mut self, spot: i32) {
        self.possession = self.possession.opponent();
        self.yard_line_100 = spot.clamp(1, DEEPEST_SPOT);
        self.first_down();
        self.rescore();
    }

    fn first_down(&mut self) {
        self.down = 1;
        self.distance = self.yard_line_100.clamp(1, 10);
    }

    /// Move the ball `yards` for the offense. Returns the effective gain and
    /// whether it was a touchdown.
    fn advance(&mut self, yards: i32) -> (i32, bool) {
        let spot = self.yard_line_100 - yards;
        if spot <= 0 {
            let gained = self.yard_line_100;
            self.add_points(self.possession, TOUCHDOWN_POINTS);
            self.yard_line_100 = TRY_SPOT;
            self.first_down();
            return (gained, true);
        }

        let spot = spot.min(DEEPEST_SPOT);
        let gained = self.yard_line_100 - spot;
        self.yard_line_100 = spot;
        if gained >= self.distance {
            self.first_down();
        } else if self.down >= 4 {
            self.change_possession(100 - spot);
        } else {
            self.down += 1;
            self.distance -= gained;
        }
        (gained, false)
    }

    /// Apply one sampled outcome to this (pre-snap) state.
    pub fn apply(&self, outcome: &PlayOutcome) -> Transition {
        let mut next = self.clone();
        let offense = self.possession;
        let mut touchdown = false;

        let (detail, yards_gained, mut description) = match *outcome {
            PlayOutcome::Completion { yards } => {
                let (gained, td) = next.advance(yards);
                touchdown = td;
                (
                    PlayDetail::Pass { is_complete: true },
                    gained,
                    format!("Simulated pass: complete, gain of {} yards", gained),
                )
            }
            PlayOutcome::Incompletion => {
                next.advance(0);
                (
                    PlayDetail::Pass { is_complete: false },
                    0,
                    "Simulated pass: incomplete".to_string(),
                )
            }
            PlayOutcome::Interception { return_yards } => {
                next.change_possession(100 - self.yard_line_100 - return_yards);
                (
                    PlayDetail::Interception { return_yards },
                    0,
                    "Simulated pass: intercepted".to_string(),
                )
            }
            PlayOutcome::Rush { yards } => {
                let (gained, td) = next.advance(yards);
                touchdown = td;
                (
                    PlayDetail::Rush,
                    gained,
                    format!("Simulated rush for {} yards", gained),
                )
            }
            PlayOutcome::FieldGoal { made, kick_distance } => {
                if made {
                    next.add_points(offense, FIELD_GOAL_POINTS);
                    next.change_possession(KICKOFF_SPOT);
                } else {
                    next.change_possession(100 - self.yard_line_100);
                }
                (
                    PlayDetail::FieldGoal { is_good: made, kick_distance },
                    0,
                    format!(
                        "Simulated {} yard field goal: {}",
                        kick_distance,
                        if made { "good" } else { "no good" }
                    ),
                )
            }
            PlayOutcome::ExtraPoint { made } => {
                if made {
                    next.add_points(offense, 1);
                }
                next.change_possession(KICKOFF_SPOT);
                (
                    PlayDetail::ExtraPoint { is_good: made },
                    0,
                    format!("Simulated extra point: {}", if made { "good" } else { "no good" }),
                )
            }
            PlayOutcome::TwoPoint { made } => {
                if made {
                    next.add_points(offense, 2);
                }
                next.change_possession(KICKOFF_SPOT);
                (
                    PlayDetail::TwoPoint { is_good: made },
                    0,
                    format!(
                        "Simulated two-point attempt: {}",
                        if made { "converted" } else { "not converted" }
                    ),
                )
            }
            PlayOutcome::Punt { kick_distance } => {
                let landing = (self.yard_line_100 - kick_distance).max(25);
                next.change_possession(100 - landing);
                (
                    PlayDetail::Punt { kick_distance: Some(kick_distance) },
                    self.yard_line_100 - landing,
                    format!("Simulated punt of {} yards", kick_distance),
                )
            }
        };
        if touchdown {
            description.push_str(", TOUCHDOWN");
        }
        next.playing = next.game_seconds_remaining > 0;

        let event = PlayEvent {
            description,
            quarter: next.quarter,
            quarter_seconds_remaining: next.quarter_seconds_remaining,
            half_seconds_remaining: next.half_seconds_remaining,
            game_seconds_remaining: next.game_seconds_remaining,
            down: next.down,
            distance: next.distance,
            yard_line_100: next.yard_line_100,
            yards_gained,
            possession: next.possession,
            home_score: next.home_score,
            away_score: next.away_score,
            score_differential: next.score_differential,
            simulated: true,
            detail,
        };
        Transition { event, next, touchdown }
    }
}
