// src/dataset.rs
//
// Trajectories, datasets and their export.
//
// Design:
// - Trajectory: aligned observation / action / reward sequences plus the
//   encoded feature matrix and an optional latent-state side channel
// - Dataset: immutable batch with versioned metadata and a content fingerprint
// - DatasetWriter: metadata.json + trajectories.jsonl
// - TestInput: the array view handed to a Markov test

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{EncodingMode, GenConfig, PolicyConfig, Regime, Termination};
use crate::encoding::{BeliefState, FeatureMatrix};
use crate::error::GenError;
use crate::types::{Action, Observation, Side};

/// Current dataset format version.
/// Increment when changing the record schema.
pub const DATASET_VERSION: u32 = 1;

/// One generated trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Stream index within the dataset.
    pub index: u64,
    pub initial_state: Side,
    /// Raw observations, placeholder first.
    pub observations: Vec<Observation>,
    /// Exported representation, one row per observation.
    pub features: FeatureMatrix,
    /// Actions, closed by the end marker.
    pub actions: Vec<Action>,
    /// Rewards, 0 at position 0.
    pub rewards: Vec<f64>,
    /// Latent state per step, when recorded.
    pub states: Option<Vec<Side>>,
    /// Steps actually taken, excluding padding.
    pub steps: usize,
    /// Whether a door was opened.
    pub terminated_early: bool,
}

impl Trajectory {
    /// Number of positions (observations), including the placeholder.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observation_codes(&self) -> Vec<i8> {
        self.observations.iter().map(|o| o.code()).collect()
    }

    pub fn action_codes(&self) -> Vec<i8> {
        self.actions.iter().map(|a| a.code()).collect()
    }

    pub fn state_codes(&self) -> Option<Vec<i8>> {
        self.states
            .as_ref()
            .map(|s| s.iter().map(|x| x.code()).collect())
    }

    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// Fraction of LEFT among sensor reports; 0.5 when there are none.
    pub fn left_fraction(&self) -> f64 {
        let mut belief = BeliefState::new();
        for obs in &self.observations {
            belief.update(*obs);
        }
        belief.p_left()
    }

    /// Position of the terminal sentinel, if a door was opened.
    pub fn terminal_position(&self) -> Option<usize> {
        self.observations.iter().position(|o| o.is_terminal())
    }

    /// Check the structural invariants every trajectory must satisfy.
    pub fn check_alignment(&self) -> Result<(), GenError> {
        let n = self.len();
        let fail = |msg: String| -> Result<(), GenError> { Err(GenError::InvariantViolation(msg)) };

        if self.observations.first() != Some(&Observation::Placeholder) {
            return fail(format!("trajectory {}: missing placeholder", self.index));
        }
        if self.actions.len() != n {
            return fail(format!(
                "trajectory {}: {} actions for {} observations",
                self.index,
                self.actions.len(),
                n
            ));
        }
        if self.rewards.len() != n || self.rewards[0] != 0.0 {
            return fail(format!("trajectory {}: misaligned rewards", self.index));
        }
        if self.features.rows() != n {
            return fail(format!(
                "trajectory {}: {} feature rows for {} observations",
                self.index,
                self.features.rows(),
                n
            ));
        }
        if self.actions.last() != Some(&Action::End) {
            return fail(format!("trajectory {}: missing end marker", self.index));
        }
        if let Some(states) = &self.states {
            if states.len() != n - 1 {
                return fail(format!(
                    "trajectory {}: {} states for {} steps",
                    self.index,
                    states.len(),
                    n - 1
                ));
            }
        }
        if let Some(pos) = self.terminal_position() {
            let tail_ok = self.observations[pos..].iter().all(|o| o.is_terminal())
                && self.actions[pos..].iter().all(|a| *a == Action::End)
                && self.actions[pos - 1].is_terminating();
            if !tail_ok {
                return fail(format!(
                    "trajectory {}: non-terminal data after termination at {}",
                    self.index, pos
                ));
            }
        }
        Ok(())
    }

    fn feed_hash(&self, hasher: &mut Sha256) {
        hasher.update(self.index.to_le_bytes());
        hasher.update((self.len() as u64).to_le_bytes());
        for v in self.features.as_slice() {
            hasher.update(v.to_le_bytes());
        }
        for a in &self.actions {
            hasher.update(a.code().to_le_bytes());
        }
        for r in &self.rewards {
            hasher.update(r.to_le_bytes());
        }
        if let Some(states) = &self.states {
            for s in states {
                hasher.update(s.code().to_le_bytes());
            }
        }
    }
}

/// Metadata for a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Dataset format version.
    pub dataset_version: u32,
    pub regime: Regime,
    pub policy: PolicyConfig,
    pub encoding: EncodingMode,
    pub termination: Termination,
    /// Cycle length (cyclic regime only).
    pub k: Option<usize>,
    pub seed: u64,
    pub trajectory_count: usize,
    pub trajectory_length: usize,
    /// Columns of the observation representation.
    pub obs_dim: usize,
    pub observation_accuracy: f64,
    pub include_reward: bool,
    pub record_states: bool,
    /// Mean number of positions per trajectory.
    pub mean_length: f64,
    /// Fraction of trajectories ending in a door opening.
    pub early_termination_rate: f64,
    pub mean_total_reward: f64,
    /// SHA-256 of the numeric content, `sha256:<hex>`.
    pub fingerprint: String,
}

/// Immutable batch of trajectories from one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub metadata: DatasetMetadata,
    pub trajectories: Vec<Trajectory>,
}

impl Dataset {
    pub fn new(config: &GenConfig, trajectories: Vec<Trajectory>) -> Self {
        let n = trajectories.len();
        let mean = |f: &dyn Fn(&Trajectory) -> f64| {
            if n == 0 {
                0.0
            } else {
                trajectories.iter().map(f).sum::<f64>() / n as f64
            }
        };

        let metadata = DatasetMetadata {
            dataset_version: DATASET_VERSION,
            regime: config.regime,
            policy: config.policy,
            encoding: config.encoding,
            termination: config.termination,
            k: (config.regime == Regime::Cyclic).then_some(config.k),
            seed: config.seed,
            trajectory_count: n,
            trajectory_length: config.trajectory_length,
            obs_dim: config.encoding.dim(),
            observation_accuracy: config.observation_accuracy(),
            include_reward: config.include_reward,
            record_states: config.record_states,
            mean_length: mean(&|t: &Trajectory| t.len() as f64),
            early_termination_rate: mean(&|t: &Trajectory| f64::from(u8::from(t.terminated_early))),
            mean_total_reward: mean(&|t: &Trajectory| t.total_reward()),
            fingerprint: fingerprint(&trajectories),
        };

        Self {
            metadata,
            trajectories,
        }
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    pub fn fingerprint(&self) -> &str {
        &self.metadata.fingerprint
    }

    /// Array view for a Markov test.
    ///
    /// Rewards are attached only when `include_reward` is set. The hidden
    /// state side channel is attached only when `pass_hidden_state` is set
    /// and states were recorded.
    pub fn to_test_input(&self, include_reward: bool, pass_hidden_state: bool) -> TestInput {
        let trajectories = self
            .trajectories
            .iter()
            .map(|t| TestTrajectory {
                observations: t.features.clone(),
                actions: t.action_codes(),
                rewards: include_reward.then(|| t.rewards.clone()),
            })
            .collect();

        let hidden_states = if pass_hidden_state {
            self.trajectories
                .iter()
                .map(Trajectory::state_codes)
                .collect::<Option<Vec<_>>>()
        } else {
            None
        };

        TestInput {
            obs_dim: self.metadata.obs_dim,
            trajectories,
            hidden_states,
        }
    }

    /// Export records, one per trajectory.
    pub fn records(&self) -> Vec<TrajectoryRecord> {
        self.trajectories
            .iter()
            .map(|t| TrajectoryRecord {
                index: t.index,
                observations: t.features.to_rows(),
                actions: t.action_codes(),
                rewards: self.metadata.include_reward.then(|| t.rewards.clone()),
                states: t.state_codes(),
                steps: t.steps,
                terminated_early: t.terminated_early,
            })
            .collect()
    }
}

/// SHA-256 over the numeric content of all trajectories.
pub fn fingerprint(trajectories: &[Trajectory]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DATASET_VERSION.to_le_bytes());
    for t in trajectories {
        t.feed_hash(&mut hasher);
    }
    format!("sha256:{}", hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One exported trajectory (a line of `trajectories.jsonl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub index: u64,
    /// Feature rows, one per position.
    pub observations: Vec<Vec<f64>>,
    pub actions: Vec<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<i8>>,
    pub steps: usize,
    pub terminated_early: bool,
}

/// One trajectory as seen by a Markov test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestTrajectory {
    pub observations: FeatureMatrix,
    pub actions: Vec<i8>,
    pub rewards: Option<Vec<f64>>,
}

/// Dataset view consumed by a Markov test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInput {
    pub obs_dim: usize,
    pub trajectories: Vec<TestTrajectory>,
    /// Latent state codes per trajectory, aligned with steps.
    pub hidden_states: Option<Vec<Vec<i8>>>,
}

impl TestInput {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Shortest trajectory, in positions.
    pub fn min_length(&self) -> usize {
        self.trajectories
            .iter()
            .map(|t| t.actions.len())
            .min()
            .unwrap_or(0)
    }
}

/// Writes datasets to a directory.
pub struct DatasetWriter {
    output_dir: PathBuf,
}

impl DatasetWriter {
    pub const METADATA_FILE: &'static str = "metadata.json";
    pub const RECORDS_FILE: &'static str = "trajectories.jsonl";

    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write metadata and records.
    ///
    /// Creates:
    /// - {output_dir}/metadata.json - pretty JSON metadata
    /// - {output_dir}/trajectories.jsonl - one record per line
    pub fn write(&self, dataset: &Dataset) -> Result<(), GenError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            GenError::io(format!("creating {}", self.output_dir.display()), e)
        })?;

        let metadata_path = self.output_dir.join(Self::METADATA_FILE);
        let metadata_json = serde_json::to_string_pretty(&dataset.metadata)?;
        fs::write(&metadata_path, metadata_json)
            .map_err(|e| GenError::io(format!("writing {}", metadata_path.display()), e))?;

        let records_path = self.output_dir.join(Self::RECORDS_FILE);
        let io_err = |e| GenError::io(format!("writing {}", records_path.display()), e);
        let file = File::create(&records_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        for record in dataset.records() {
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n").map_err(io_err)?;
        }
        writer.flush().map_err(io_err)?;

        Ok(())
    }

    pub fn read_metadata(&self) -> Result<DatasetMetadata, GenError> {
        let path = self.output_dir.join(Self::METADATA_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|e| GenError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn read_records(&self) -> Result<Vec<TrajectoryRecord>, GenError> {
        let path = self.output_dir.join(Self::RECORDS_FILE);
        let io_err = |e| GenError::io(format!("reading {}", path.display()), e);
        let reader = BufReader::new(File::open(&path).map_err(io_err)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
