// src/cyclic.rs
//
// Moving tiger: ground-truth k-th-order Markov data.
//
// The tiger sits at `pattern[t mod k]` and every listen reports it exactly.
// With a pattern whose minimal period is k, the next observation is a
// deterministic function of the last k observations and of no shorter
// window, which is what the order sweep uses as its reference answer.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{GenConfig, PolicyConfig, Regime};
use crate::dataset::{Dataset, Trajectory};
use crate::error::{ConfigError, GenError};
use crate::generator::TrajectoryGenerator;
use crate::types::Side;

/// Fixed-length repeating sequence of tiger positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclicPattern {
    pattern: Vec<Side>,
}

impl CyclicPattern {
    /// Use `pattern` when given (it must have exactly `k` entries), otherwise
    /// synthesize the default pattern for `k`.
    pub fn new(k: usize, pattern: Option<Vec<Side>>) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::validation("k", "must be > 0"));
        }
        let pattern = match pattern {
            Some(p) if p.len() != k => {
                return Err(ConfigError::PatternLength {
                    expected: k,
                    actual: p.len(),
                })
            }
            Some(p) => p,
            None => Self::default_for(k),
        };
        Ok(Self { pattern })
    }

    /// Parse a pattern from a comma- or space-separated list of sides
    /// (`L,R,R,L`, `LEFT RIGHT`, `-1,1`).
    pub fn parse_list(s: &str) -> Result<Vec<Side>, ConfigError> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(Side::parse)
            .collect()
    }

    /// Default pattern for cycle length `k`.
    ///
    /// Small cycles use hand-picked asymmetric patterns so that no pattern
    /// repeats with a shorter period. Other lengths start all-LEFT and place
    /// RIGHT at every other position from `k / 3` onward.
    pub fn default_for(k: usize) -> Vec<Side> {
        use crate::types::Side::{Left as L, Right as R};
        match k {
            2 => vec![L, R],
            3 => vec![L, R, L],
            4 => vec![L, R, R, L],
            5 => vec![L, R, L, R, R],
            6 => vec![L, R, R, L, L, R],
            7 => vec![L, R, L, L, R, L, R],
            11 => vec![L, R, L, R, R, L, R, L, R, R, L],
            _ => {
                let mut pattern = vec![L; k];
                for slot in pattern.iter_mut().skip(k / 3).step_by(2) {
                    *slot = R;
                }
                pattern
            }
        }
    }

    pub fn k(&self) -> usize {
        self.pattern.len()
    }

    pub fn pattern(&self) -> &[Side] {
        &self.pattern
    }

    /// Tiger position at step `t`.
    pub fn state_at(&self, t: usize) -> Side {
        self.pattern[t % self.pattern.len()]
    }

    /// Smallest `p` with `state_at(t) == state_at(t + p)` for all `t`.
    /// Always divides `k`.
    pub fn minimal_period(&self) -> usize {
        let k = self.pattern.len();
        (1..=k)
            .find(|&p| (0..k).all(|i| self.pattern[i] == self.pattern[(i + p) % k]))
            .unwrap_or(k)
    }

    /// True when the pattern repeats with a period shorter than `k`, so the
    /// generated process is of lower order than configured.
    pub fn is_degenerate(&self) -> bool {
        self.minimal_period() < self.k()
    }

    /// Human-readable rendering, e.g. `LEFT → RIGHT → RIGHT → LEFT`.
    pub fn describe(&self) -> String {
        self.pattern
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(" → ")
    }

    pub fn codes(&self) -> Vec<i8> {
        self.pattern.iter().map(|s| s.code()).collect()
    }
}

/// Diagnostics snapshot of a cyclic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInfo {
    pub k: usize,
    pub pattern: Vec<Side>,
    pub pattern_str: String,
    pub minimal_period: usize,
    pub obs_accuracy: f64,
}

/// Trajectory generator pinned to the cyclic regime.
///
/// Latent states are always recorded, since they are the ground truth the
/// cyclic data exists to provide.
#[derive(Debug, Clone)]
pub struct CyclicGenerator {
    pattern: CyclicPattern,
    config: GenConfig,
}

impl CyclicGenerator {
    /// Cyclic generator with the default shape from [`GenConfig::cyclic`].
    pub fn new(
        k: usize,
        pattern: Option<Vec<Side>>,
        policy: PolicyConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        Self::from_config(GenConfig {
            policy,
            seed,
            ..GenConfig::cyclic(k, pattern)
        })
    }

    /// Build from a full config. The regime is forced to cyclic.
    pub fn from_config(mut config: GenConfig) -> Result<Self, ConfigError> {
        config.regime = Regime::Cyclic;
        config.record_states = true;
        config.validate()?;

        let pattern = CyclicPattern::new(config.k, config.pattern.clone())?;
        if pattern.is_degenerate() {
            warn!(
                k = pattern.k(),
                period = pattern.minimal_period(),
                pattern = %pattern.describe(),
                "cyclic pattern repeats with a shorter period; data will be of lower order than k"
            );
        }
        debug!(k = pattern.k(), pattern = %pattern.describe(), "cyclic generator ready");

        Ok(Self { pattern, config })
    }

    pub fn pattern(&self) -> &CyclicPattern {
        &self.pattern
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    pub fn info(&self) -> PatternInfo {
        PatternInfo {
            k: self.pattern.k(),
            pattern: self.pattern.pattern().to_vec(),
            pattern_str: self.pattern.describe(),
            minimal_period: self.pattern.minimal_period(),
            obs_accuracy: self.config.observation_accuracy(),
        }
    }

    /// Generate `n_trajectories` trajectories of `trajectory_length` steps.
    pub fn generate(
        &self,
        n_trajectories: usize,
        trajectory_length: usize,
    ) -> Result<Dataset, GenError> {
        self.generator(n_trajectories, trajectory_length)?.generate()
    }

    /// Generate the trajectory at stream `index` with `length` steps.
    pub fn generate_trajectory(&self, index: u64, length: usize) -> Result<Trajectory, GenError> {
        self.generator(1, length)?.generate_trajectory(index, length)
    }

    /// Tiger position at every time index the trajectory reached: `0..=T`
    /// when it ran to the cap, `0..=i` when a door was opened at step `i`.
    ///
    /// One entry longer than `traj.states` on a full run, since the state at
    /// time `T` exists even though no step is taken from it.
    pub fn visited_states(&self, traj: &Trajectory) -> Vec<Side> {
        let count = traj.terminal_position().unwrap_or(traj.len());
        (0..count).map(|t| self.pattern.state_at(t)).collect()
    }

    fn generator(&self, count: usize, length: usize) -> Result<TrajectoryGenerator, ConfigError> {
        TrajectoryGenerator::new(GenConfig {
            trajectory_count: count,
            trajectory_length: length,
            ..self.config.clone()
        })
    }
}
