// src/dynamics.rs
//
// One-step environment dynamics: (state, action) -> (reward, observation).
//
// - Noisy regime: the tiger stays put; a listen reports the true side with
//   probability `p_correct` and the opposite side otherwise.
// - Cyclic regime: the tiger is at `pattern[t mod k]`; a listen reports it
//   exactly. Accuracy 1.0 is what makes the process exactly k-th-order
//   Markov, so no sensor draw is ever made in this regime.
//
// Opening a door ends the episode under both regimes and emits the terminal
// sentinel observation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GenConfig, Regime, RewardTable};
use crate::cyclic::CyclicPattern;
use crate::error::{ConfigError, GenError};
use crate::rng::bernoulli;
use crate::types::{Action, Observation, Side};

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub reward: f64,
    pub observation: Observation,
}

/// Latent-state process plus sensor model.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicsModel {
    Noisy {
        p_correct: f64,
        rewards: RewardTable,
    },
    Cyclic {
        pattern: CyclicPattern,
        rewards: RewardTable,
    },
}

impl DynamicsModel {
    pub fn noisy(p_correct: f64, rewards: RewardTable) -> Self {
        DynamicsModel::Noisy { p_correct, rewards }
    }

    pub fn cyclic(pattern: CyclicPattern, rewards: RewardTable) -> Self {
        DynamicsModel::Cyclic { pattern, rewards }
    }

    /// Build the model for a validated config.
    pub fn from_config(cfg: &GenConfig) -> Result<Self, ConfigError> {
        Ok(match cfg.regime {
            Regime::Noisy => Self::noisy(cfg.p_correct, cfg.rewards),
            Regime::Cyclic => {
                let pattern = CyclicPattern::new(cfg.k, cfg.pattern.clone())?;
                Self::cyclic(pattern, cfg.rewards)
            }
        })
    }

    /// Probability that a listen reports the true side.
    pub fn accuracy(&self) -> f64 {
        match self {
            DynamicsModel::Noisy { p_correct, .. } => *p_correct,
            DynamicsModel::Cyclic { .. } => 1.0,
        }
    }

    pub fn rewards(&self) -> &RewardTable {
        match self {
            DynamicsModel::Noisy { rewards, .. } | DynamicsModel::Cyclic { rewards, .. } => {
                rewards
            }
        }
    }

    /// Draw (noisy: fair coin) or compute (cyclic: `pattern[0]`) the initial state.
    pub fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Side {
        match self {
            DynamicsModel::Noisy { .. } => {
                if bernoulli(rng, 0.5) {
                    Side::Right
                } else {
                    Side::Left
                }
            }
            DynamicsModel::Cyclic { pattern, .. } => pattern.state_at(0),
        }
    }

    /// Latent state at step `t` of a trajectory that started in `initial`.
    pub fn state_at(&self, t: usize, initial: Side) -> Side {
        match self {
            DynamicsModel::Noisy { .. } => initial,
            DynamicsModel::Cyclic { pattern, .. } => pattern.state_at(t),
        }
    }

    /// Advance one step.
    ///
    /// The end-of-trajectory marker is not an action an agent can take; if it
    /// reaches the dynamics the trajectory is aborted.
    pub fn step<R: Rng + ?Sized>(
        &self,
        state: Side,
        action: Action,
        rng: &mut R,
    ) -> Result<Transition, GenError> {
        match action {
            Action::Listen => {
                let heard = match self {
                    DynamicsModel::Noisy { p_correct, .. } => {
                        if bernoulli(rng, *p_correct) {
                            state
                        } else {
                            state.opposite()
                        }
                    }
                    DynamicsModel::Cyclic { .. } => state,
                };
                Ok(Transition {
                    reward: self.rewards().listen_cost,
                    observation: Observation::Heard(heard),
                })
            }
            Action::Open(door) => Ok(Transition {
                reward: open_reward(self.rewards(), door, state),
                observation: Observation::Terminal,
            }),
            Action::End => Err(GenError::InvariantViolation(
                "end-of-trajectory marker passed to the dynamics".to_string(),
            )),
        }
    }
}

/// Reward for opening `door` while the tiger is behind `tiger`.
pub fn open_reward(rewards: &RewardTable, door: Side, tiger: Side) -> f64 {
    if door == tiger {
        rewards.tiger_penalty
    } else {
        rewards.escape_reward
    }
}
