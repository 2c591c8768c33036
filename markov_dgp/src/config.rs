// src/config.rs
//
// Generation configuration.
//
// A `GenConfig` fully defines a reproducible dataset:
// - regime (noisy sensor or deterministic k-cycle) and its parameters
// - behavioural policy, carrying only the knobs it uses
// - exported observation encoding
// - termination rule, horizon, number of trajectories and seed
//
// The struct is immutable once validated and is threaded explicitly into
// every generation call; there are no module-level defaults to mutate.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Side;

/// Default probability that a listen reports the true side.
pub const DEFAULT_P_CORRECT: f64 = 0.7;
/// Default listen probability of the randomized policy.
pub const DEFAULT_P_LISTEN: f64 = 0.9;
/// Default number of forced listens of the adaptive policy.
pub const DEFAULT_T_MUST_OBSERVE: u32 = 10;

/// Latent-state dynamics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    /// Tiger fixed for the episode, heard correctly with probability `p_correct`.
    #[default]
    Noisy,
    /// Tiger follows `pattern[t mod k]`, heard exactly.
    Cyclic,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Noisy => "noisy",
            Regime::Cyclic => "cyclic",
        }
    }
}

impl FromStr for Regime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noisy" | "pomdp" => Ok(Regime::Noisy),
            "cyclic" | "moving" => Ok(Regime::Cyclic),
            other => Err(ConfigError::UnknownVariant {
                kind: "regime",
                value: other.to_string(),
            }),
        }
    }
}

/// Behavioural policy selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PolicyConfig {
    /// Always listen.
    #[default]
    Fixed,
    /// Listen with probability `p_listen`, otherwise open a door at random.
    Random {
        #[serde(default = "default_p_listen")]
        p_listen: f64,
        /// Probability of opening the left door once the policy stops listening.
        #[serde(default = "default_p_open_left")]
        p_open_left: f64,
    },
    /// Listen for `t_must_observe` steps, then listen with probability
    /// proportional to the current uncertainty.
    Adaptive {
        #[serde(default = "default_t_must_observe")]
        t_must_observe: u32,
    },
}

fn default_p_listen() -> f64 {
    DEFAULT_P_LISTEN
}

fn default_p_open_left() -> f64 {
    0.5
}

fn default_t_must_observe() -> u32 {
    DEFAULT_T_MUST_OBSERVE
}

impl PolicyConfig {
    pub fn random() -> Self {
        PolicyConfig::Random {
            p_listen: DEFAULT_P_LISTEN,
            p_open_left: default_p_open_left(),
        }
    }

    pub fn adaptive() -> Self {
        PolicyConfig::Adaptive {
            t_must_observe: DEFAULT_T_MUST_OBSERVE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyConfig::Fixed => "fixed",
            PolicyConfig::Random { .. } => "random",
            PolicyConfig::Adaptive { .. } => "adaptive",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let PolicyConfig::Random {
            p_listen,
            p_open_left,
        } = *self
        {
            check_probability("policy.p_listen", p_listen)?;
            check_probability("policy.p_open_left", p_open_left)?;
        }
        Ok(())
    }
}

impl FromStr for PolicyConfig {
    type Err = ConfigError;

    /// Parse a policy name; parameters take their defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "always-listen" | "always_listen" => Ok(PolicyConfig::Fixed),
            "random" => Ok(PolicyConfig::random()),
            "adaptive" => Ok(PolicyConfig::adaptive()),
            other => Err(ConfigError::UnknownVariant {
                kind: "policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Exported observation representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingMode {
    /// Raw observation codes, one column.
    #[default]
    Raw,
    /// Raw observation paired with the true state (diagnostics only).
    HiddenExposed,
    /// Cumulative fraction of LEFT reports.
    RunningProportion,
    /// (cumulative LEFT fraction, elapsed step count).
    ProportionAndCount,
}

impl EncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Raw => "raw",
            EncodingMode::HiddenExposed => "hidden-exposed",
            EncodingMode::RunningProportion => "running-proportion",
            EncodingMode::ProportionAndCount => "proportion-and-count",
        }
    }

    /// Number of columns in the exported representation.
    pub fn dim(&self) -> usize {
        match self {
            EncodingMode::Raw | EncodingMode::RunningProportion => 1,
            EncodingMode::HiddenExposed | EncodingMode::ProportionAndCount => 2,
        }
    }
}

impl FromStr for EncodingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "alt" => Ok(EncodingMode::Raw),
            "hidden-exposed" | "null" => Ok(EncodingMode::HiddenExposed),
            "running-proportion" | "1" => Ok(EncodingMode::RunningProportion),
            "proportion-and-count" | "2" => Ok(EncodingMode::ProportionAndCount),
            other => Err(ConfigError::UnknownVariant {
                kind: "encoding",
                value: other.to_string(),
            }),
        }
    }
}

/// Rule deciding when a trajectory stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Exactly `trajectory_length` steps; positions after an early
    /// terminating action are padded.
    #[default]
    FixedHorizon,
    /// Stop as soon as a terminating action is taken (capped at
    /// `trajectory_length` steps).
    EarlyStop,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::FixedHorizon => "fixed-horizon",
            Termination::EarlyStop => "early-stop",
        }
    }
}

impl FromStr for Termination {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed-horizon" | "fixed" => Ok(Termination::FixedHorizon),
            "early-stop" | "truncation" => Ok(Termination::EarlyStop),
            other => Err(ConfigError::UnknownVariant {
                kind: "termination",
                value: other.to_string(),
            }),
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Regime, EncodingMode, Termination);

/// Reward for each (action, state) outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    /// Reward of a listen step.
    pub listen_cost: f64,
    /// Reward for opening the door the tiger is behind.
    pub tiger_penalty: f64,
    /// Reward for opening the other door.
    pub escape_reward: f64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            listen_cost: -1.0,
            tiger_penalty: -100.0,
            escape_reward: 10.0,
        }
    }
}

/// Complete generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenConfig {
    pub regime: Regime,
    /// Cycle length (cyclic regime only).
    pub k: usize,
    /// Explicit cycle pattern; a default one is synthesized when absent.
    pub pattern: Option<Vec<Side>>,
    pub policy: PolicyConfig,
    pub encoding: EncodingMode,
    pub termination: Termination,
    /// Sensor accuracy of the noisy regime. The cyclic regime always uses 1.0.
    pub p_correct: f64,
    pub rewards: RewardTable,
    /// Number of steps T (observations per trajectory = T + 1).
    pub trajectory_length: usize,
    /// Number of trajectories N.
    pub trajectory_count: usize,
    pub seed: u64,
    pub include_reward: bool,
    /// Keep the latent state sequence as a side channel.
    pub record_states: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            regime: Regime::Noisy,
            k: 4,
            pattern: None,
            policy: PolicyConfig::Fixed,
            encoding: EncodingMode::Raw,
            termination: Termination::FixedHorizon,
            p_correct: DEFAULT_P_CORRECT,
            rewards: RewardTable::default(),
            trajectory_length: 20,
            trajectory_count: 1,
            seed: 1,
            include_reward: true,
            record_states: false,
        }
    }
}

impl GenConfig {
    /// Cyclic k-th-order configuration: always listen, full horizon, raw codes.
    pub fn cyclic(k: usize, pattern: Option<Vec<Side>>) -> Self {
        Self {
            regime: Regime::Cyclic,
            k,
            pattern,
            include_reward: false,
            record_states: true,
            ..Self::default()
        }
    }

    /// Load a config from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a config from a YAML string. Missing fields take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: GenConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Sensor accuracy in effect for the configured regime.
    pub fn observation_accuracy(&self) -> f64 {
        match self.regime {
            Regime::Noisy => self.p_correct,
            Regime::Cyclic => 1.0,
        }
    }

    /// Check every field. Nothing is generated from a config that fails here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trajectory_length == 0 {
            return Err(ConfigError::validation(
                "trajectory_length",
                "must be > 0",
            ));
        }
        // Positions are T + 1, including the placeholder.
        if self.trajectory_length.checked_add(1).is_none() {
            return Err(ConfigError::validation(
                "trajectory_length",
                "too large to index trajectory positions",
            ));
        }
        if self.trajectory_count == 0 {
            return Err(ConfigError::validation("trajectory_count", "must be > 0"));
        }

        check_probability("p_correct", self.p_correct)?;
        self.policy.validate()?;

        let r = &self.rewards;
        for (field, value) in [
            ("rewards.listen_cost", r.listen_cost),
            ("rewards.tiger_penalty", r.tiger_penalty),
            ("rewards.escape_reward", r.escape_reward),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::validation(field, "must be finite"));
            }
        }

        match self.regime {
            Regime::Cyclic => {
                if self.k == 0 {
                    return Err(ConfigError::validation("k", "must be > 0"));
                }
                if let Some(pattern) = &self.pattern {
                    if pattern.len() != self.k {
                        return Err(ConfigError::PatternLength {
                            expected: self.k,
                            actual: pattern.len(),
                        });
                    }
                }
            }
            Regime::Noisy => {
                if self.pattern.is_some() {
                    return Err(ConfigError::validation(
                        "pattern",
                        "only applies to the cyclic regime",
                    ));
                }
            }
        }

        Ok(())
    }
}

fn check_probability(field: &str, p: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::validation(
            field,
            format!("probability must be within [0, 1], got {p}"),
        ));
    }
    Ok(())
}
