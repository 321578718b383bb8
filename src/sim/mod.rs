//! The what-if engine: play model, season profiles, game state, play calling,
//! outcome samplers, the reroll/advancement loop and the Monte Carlo aggregate.

pub mod decision;
pub mod engine;
pub mod error;
pub mod game;
pub mod monte_carlo;
pub mod outcome;
pub mod play;
pub mod profile;
pub mod state;

#[cfg(test)]
pub(crate) mod fixtures;

pub use engine::Simulator;
pub use error::WhatIfError;
pub use game::Game;
