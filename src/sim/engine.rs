//! Branch reroll and the advancement loop.
//!
//! A run starts from one historical play: its what-if knobs pick the sampler for
//! the rerolled snap, then the loop keeps calling plays until regulation ends.
//! Every random draw comes from the caller's generator, so a seed fixes the run.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::sim::decision::{choose_conversion, choose_play, ConversionCall, PlayCall};
use crate::sim::error::WhatIfError;
use crate::sim::game::Game;
use crate::sim::outcome::{self, PlayOutcome};
use crate::sim::play::{ChangeableAttributes, PlayEvent, Side};
use crate::sim::profile::TeamProfile;
use crate::sim::state::GameState;

/// Upper bound on simulated snaps in one continuation. A full game is ~150.
pub const MAX_CONTINUATION_PLAYS: usize = 400;
/// On a "go for it" punt reroll, share of draws that become a rush.
const GO_FOR_IT_RUSH_SHARE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub home: i32,
    pub away: i32,
}

impl FinalScore {
    pub fn from_state(state: &GameState) -> FinalScore {
        FinalScore {
            home: state.home_score,
            away: state.away_score,
        }
    }

    /// `None` on a tie.
    pub fn winner(&self) -> Option<Side> {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// The headline run: historical prefix, rerolled snap, simulated rest of the game.
#[derive(Debug, Clone, Serialize)]
pub struct Continuation {
    pub branch_index: usize,
    pub plays: Vec<PlayEvent>,
    pub final_score: FinalScore,
    pub final_state: GameState,
}

/// Private generator for trial `index` of a batch seeded with `seed`.
pub fn trial_rng(seed: u64, index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_add(index))
}

pub struct Simulator<'g> {
    game: &'g Game,
}

impl<'g> Simulator<'g> {
    pub fn new(game: &'g Game) -> Self {
        Self { game }
    }

    pub fn game(&self) -> &Game {
        self.game
    }

    fn profile(&self, side: Side) -> &TeamProfile {
        self.game.profiles.for_side(side)
    }

    pub fn play(&self, index: usize) -> Result<&PlayEvent, WhatIfError> {
        self.game.plays.get(index).ok_or_else(|| {
            WhatIfError::invalid(format!(
                "play index {} out of range (game has {} plays)",
                index,
                self.game.plays.len()
            ))
        })
    }

    /// Validate caller overrides against the branch play's knobs.
    pub fn branch_attributes(
        &self,
        index: usize,
        overrides: &BTreeMap<String, bool>,
    ) -> Result<ChangeableAttributes, WhatIfError> {
        let play = self.play(index)?;
        play.changeable_attributes()
            .with_overrides(overrides)
            .map_err(|e| match e {
                WhatIfError::InvalidInput(msg) => {
                    WhatIfError::invalid(format!("{} play {}: {}", play.category(), index, msg))
                }
                other => other,
            })
    }

    /// Apply `outcome`, then the try if it was a touchdown.
    fn execute<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        outcome: PlayOutcome,
        rng: &mut R,
        out: &mut Vec<PlayEvent>,
    ) -> GameState {
        let transition = state.apply(&outcome);
        out.push(transition.event);
        if !transition.touchdown {
            return transition.next;
        }

        let scored = transition.next;
        let profile = self.profile(scored.possession);
        let call = choose_conversion(&scored, rng);
        let u: f64 = rng.gen();
        let attempt = match call {
            ConversionCall::ExtraPoint => outcome::extra_point(profile, u, None),
            ConversionCall::TwoPoint => outcome::two_point(profile, u, None),
        };
        let conversion = scored.apply(&attempt);
        out.push(conversion.event);
        conversion.next
    }

    /// One advancement step: run the clock, call a play, sample it.
    pub fn next_play<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        rng: &mut R,
        out: &mut Vec<PlayEvent>,
    ) -> GameState {
        let mut state = state.clone();
        state.run_clock(outcome::seconds_per_play(rng));

        let profile = self.profile(state.possession);
        let call = choose_play(&state, profile, rng);
        let u: f64 = rng.gen();
        let sampled = match call {
            PlayCall::Pass => outcome::pass_result(profile, u, rng),
            PlayCall::Rush => outcome::rush(profile, rng),
            PlayCall::FieldGoal => outcome::field_goal(&state, profile, u, None),
            PlayCall::Punt => outcome::punt(rng),
        };
        self.execute(&state, sampled, rng, out)
    }

    /// Re-run the branch play under `attrs` and return the state after it.
    pub fn reroll<R: Rng + ?Sized>(
        &self,
        play: &PlayEvent,
        attrs: ChangeableAttributes,
        rng: &mut R,
        out: &mut Vec<PlayEvent>,
    ) -> Result<GameState, WhatIfError> {
        let state = GameState::from_event(play);
        state.check()?;
        let profile = self.profile(state.possession);
        let u: f64 = rng.gen();

        let sampled = match attrs {
            // The what-if mechanic: interception wins over completion, else incomplete.
            ChangeableAttributes::Pass { intercepted: true, .. } => outcome::interception(),
            ChangeableAttributes::Pass { completed: true, .. } => outcome::completion(profile, rng),
            ChangeableAttributes::Pass { .. } => outcome::incompletion(),
            ChangeableAttributes::Rush => outcome::rush(profile, rng),
            ChangeableAttributes::FieldGoal { made } => outcome::field_goal(&state, profile, u, Some(made)),
            ChangeableAttributes::Conversion { made, is_one_point: true } => {
                outcome::extra_point(profile, u, Some(made))
            }
            ChangeableAttributes::Conversion { made, is_one_point: false } => {
                outcome::two_point(profile, u, Some(made))
            }
            ChangeableAttributes::Punt { punt_it: true } => outcome::punt(rng),
            ChangeableAttributes::Punt { punt_it: false } => {
                if u < GO_FOR_IT_RUSH_SHARE {
                    outcome::rush(profile, rng)
                } else {
                    let v: f64 = rng.gen();
                    outcome::pass_result(profile, v, rng)
                }
            }
            ChangeableAttributes::Penalty { was_called: true } => {
                out.push(play.clone());
                return Ok(state);
            }
            ChangeableAttributes::Penalty { was_called: false } => {
                return Ok(self.next_play(&state, rng, out));
            }
        };
        Ok(self.execute(&state, sampled, rng, out))
    }

    /// Drive `state` until regulation ends.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        mut state: GameState,
        rng: &mut R,
        out: &mut Vec<PlayEvent>,
    ) -> Result<GameState, WhatIfError> {
        let mut snaps = 0usize;
        while state.playing {
            state.check()?;
            snaps += 1;
            if snaps > MAX_CONTINUATION_PLAYS {
                return Err(WhatIfError::invariant(format!(
                    "continuation exceeded {} plays",
                    MAX_CONTINUATION_PLAYS
                )));
            }
            state = self.next_play(&state, rng, out);
        }
        state.check()?;
        Ok(state)
    }

    /// Reroll the branch play and play out the rest of the game.
    pub fn run<R: Rng + ?Sized>(
        &self,
        index: usize,
        attrs: ChangeableAttributes,
        rng: &mut R,
        out: &mut Vec<PlayEvent>,
    ) -> Result<GameState, WhatIfError> {
        let play = self.play(index)?;
        let state = self.reroll(play, attrs, rng, out)?;
        self.advance(state, rng, out)
    }

    /// One Monte Carlo trial; only the final score is kept.
    pub fn run_trial<R: Rng + ?Sized>(
        &self,
        index: usize,
        attrs: ChangeableAttributes,
        rng: &mut R,
    ) -> Result<FinalScore, WhatIfError> {
        let mut scratch = Vec::with_capacity(160);
        let state = self.run(index, attrs, rng, &mut scratch)?;
        Ok(FinalScore::from_state(&state))
    }

    /// The seeded run shown to the caller, with the historical prefix in front.
    pub fn headline(
        &self,
        index: usize,
        attrs: ChangeableAttributes,
        seed: u64,
    ) -> Result<Continuation, WhatIfError> {
        let mut rng = trial_rng(seed, 0);
        let mut plays = self.game.plays[..index.min(self.game.plays.len())].to_vec();
        let final_state = self.run(index, attrs, &mut rng, &mut plays)?;
        Ok(Continuation {
            branch_index: index,
            plays,
            final_score: FinalScore::from_state(&final_state),
            final_state,
        })
    }
}
