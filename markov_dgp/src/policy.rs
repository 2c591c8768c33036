// src/policy.rs
//
// Behavioural policies.
//
// Every policy chooses from the observation-derived belief only; none of
// them can see the latent state. Randomness comes from the trajectory's own
// stream, so a policy is a pure function of (belief, stream position).
//
// - FixedPolicy:    always listen
// - RandomPolicy:   listen w.p. p_listen, else open a door by a second coin
// - AdaptivePolicy: forced listens, then listen w.p. 2 * (1 - max(p, 1 - p))

use rand::Rng;

use crate::config::PolicyConfig;
use crate::encoding::BeliefState;
use crate::rng::bernoulli;
use crate::types::{Action, Side};

/// Decision rule over the observation history.
pub trait Policy {
    fn choose_action<R: Rng + ?Sized>(&self, history: &BeliefState, rng: &mut R) -> Action;
}

/// Always listen. Consumes no randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPolicy;

impl Policy for FixedPolicy {
    fn choose_action<R: Rng + ?Sized>(&self, _history: &BeliefState, _rng: &mut R) -> Action {
        Action::Listen
    }
}

/// Listen with probability `p_listen`; otherwise open the left door with
/// probability `p_open_left`, else the right one.
#[derive(Debug, Clone, Copy)]
pub struct RandomPolicy {
    pub p_listen: f64,
    pub p_open_left: f64,
}

impl Policy for RandomPolicy {
    fn choose_action<R: Rng + ?Sized>(&self, _history: &BeliefState, rng: &mut R) -> Action {
        if bernoulli(rng, self.p_listen) {
            Action::Listen
        } else if bernoulli(rng, self.p_open_left) {
            Action::Open(Side::Left)
        } else {
            Action::Open(Side::Right)
        }
    }
}

/// Uncertainty-driven policy.
///
/// For the first `t_must_observe` steps it always listens. Afterwards it
/// listens with probability `2 * (1 - max(p_left, 1 - p_left))`, which is 1
/// at maximal uncertainty and 0 at full confidence; when it stops listening
/// it opens the left door with probability `p_left`.
#[derive(Debug, Clone, Copy)]
pub struct AdaptivePolicy {
    pub t_must_observe: u32,
}

impl AdaptivePolicy {
    pub fn listen_probability(p_left: f64) -> f64 {
        2.0 * (1.0 - p_left.max(1.0 - p_left))
    }
}

impl Policy for AdaptivePolicy {
    fn choose_action<R: Rng + ?Sized>(&self, history: &BeliefState, rng: &mut R) -> Action {
        if history.steps() < self.t_must_observe {
            return Action::Listen;
        }

        let p_left = history.p_left();
        if bernoulli(rng, Self::listen_probability(p_left)) {
            Action::Listen
        } else if bernoulli(rng, p_left) {
            Action::Open(Side::Left)
        } else {
            Action::Open(Side::Right)
        }
    }
}

/// Policy selected by configuration.
#[derive(Debug, Clone, Copy)]
pub enum BehaviorPolicy {
    Fixed(FixedPolicy),
    Random(RandomPolicy),
    Adaptive(AdaptivePolicy),
}

impl From<PolicyConfig> for BehaviorPolicy {
    fn from(cfg: PolicyConfig) -> Self {
        match cfg {
            PolicyConfig::Fixed => BehaviorPolicy::Fixed(FixedPolicy),
            PolicyConfig::Random {
                p_listen,
                p_open_left,
            } => BehaviorPolicy::Random(RandomPolicy {
                p_listen,
                p_open_left,
            }),
            PolicyConfig::Adaptive { t_must_observe } => {
                BehaviorPolicy::Adaptive(AdaptivePolicy { t_must_observe })
            }
        }
    }
}

impl Policy for BehaviorPolicy {
    fn choose_action<R: Rng + ?Sized>(&self, history: &BeliefState, rng: &mut R) -> Action {
        match self {
            BehaviorPolicy::Fixed(p) => p.choose_action(history, rng),
            BehaviorPolicy::Random(p) => p.choose_action(history, rng),
            BehaviorPolicy::Adaptive(p) => p.choose_action(history, rng),
        }
    }
}
