// src/encoding.rs
//
// Observation encoders: reshape the raw per-step observation history into
// the numeric representation exported with the dataset.
//
// Encoders are incremental: the generator pushes one observation per
// position and each encoder appends exactly one row. Proportions are taken
// over sensor reports only, so the placeholder and the terminal sentinel
// never contaminate the LEFT fraction.

use serde::{Deserialize, Serialize};

use crate::config::EncodingMode;
use crate::types::{Observation, Side};

/// Running summary of the sensor reports seen so far.
///
/// This is also the history the behavioural policies read: it is built from
/// observations only and never from the latent state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeliefState {
    left: u32,
    heard: u32,
    steps: u32,
}

impl BeliefState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the observation produced by one step. The position-0
    /// placeholder is not a step and is ignored.
    pub fn update(&mut self, observation: Observation) {
        match observation {
            Observation::Placeholder => {}
            Observation::Heard(side) => {
                self.steps += 1;
                self.heard += 1;
                if side == Side::Left {
                    self.left += 1;
                }
            }
            Observation::Terminal => self.steps += 1,
        }
    }

    /// Fraction of LEFT reports among sensor reports; 0.5 before any report.
    pub fn p_left(&self) -> f64 {
        if self.heard == 0 {
            0.5
        } else {
            self.left as f64 / self.heard as f64
        }
    }

    /// Elapsed steps, including a terminal step.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn left_reports(&self) -> u32 {
        self.left
    }

    pub fn sensor_reports(&self) -> u32 {
        self.heard
    }
}

/// Row-major matrix of exported features, one row per observation position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    dim: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            values: Vec::new(),
        }
    }

    pub fn with_capacity(dim: usize, rows: usize) -> Self {
        Self {
            dim,
            values: Vec::with_capacity(dim * rows),
        }
    }

    pub fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.dim);
        self.values.extend_from_slice(row);
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.values.len() / self.dim
        }
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.dim.max(1))
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.iter_rows().map(|r| r[j]).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// Incremental encoder for one exported representation.
pub trait ObservationEncoder: Send {
    fn mode(&self) -> EncodingMode;

    /// Append the row for one observation position. `state` is the latent
    /// state the observation is about; only diagnostic encoders read it.
    fn push(&mut self, observation: Observation, state: Side, out: &mut FeatureMatrix);
}

/// Raw observation codes.
#[derive(Debug, Default)]
pub struct RawEncoder;

impl ObservationEncoder for RawEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::Raw
    }

    fn push(&mut self, observation: Observation, _state: Side, out: &mut FeatureMatrix) {
        out.push_row(&[observation.code() as f64]);
    }
}

/// Raw observation paired with the true state. Breaks partial observability
/// and is meant for ground-truth-labelled calibration sets only.
#[derive(Debug, Default)]
pub struct HiddenExposedEncoder;

impl ObservationEncoder for HiddenExposedEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::HiddenExposed
    }

    fn push(&mut self, observation: Observation, state: Side, out: &mut FeatureMatrix) {
        out.push_row(&[observation.code() as f64, state.code() as f64]);
    }
}

/// Cumulative LEFT fraction.
#[derive(Debug, Default)]
pub struct RunningProportionEncoder {
    belief: BeliefState,
}

impl ObservationEncoder for RunningProportionEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::RunningProportion
    }

    fn push(&mut self, observation: Observation, _state: Side, out: &mut FeatureMatrix) {
        self.belief.update(observation);
        out.push_row(&[self.belief.p_left()]);
    }
}

/// Cumulative LEFT fraction and elapsed step count.
#[derive(Debug, Default)]
pub struct ProportionAndCountEncoder {
    belief: BeliefState,
}

impl ObservationEncoder for ProportionAndCountEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::ProportionAndCount
    }

    fn push(&mut self, observation: Observation, _state: Side, out: &mut FeatureMatrix) {
        self.belief.update(observation);
        out.push_row(&[self.belief.p_left(), self.belief.steps() as f64]);
    }
}

/// Fresh encoder for `mode`.
pub fn encoder_for(mode: EncodingMode) -> Box<dyn ObservationEncoder> {
    match mode {
        EncodingMode::Raw => Box::new(RawEncoder),
        EncodingMode::HiddenExposed => Box::new(HiddenExposedEncoder),
        EncodingMode::RunningProportion => Box::<RunningProportionEncoder>::default(),
        EncodingMode::ProportionAndCount => Box::<ProportionAndCountEncoder>::default(),
    }
}

/// Encode a complete observation history in one pass.
pub fn encode_history(
    mode: EncodingMode,
    observations: &[Observation],
    states: &[Side],
) -> FeatureMatrix {
    debug_assert_eq!(observations.len(), states.len());
    let mut encoder = encoder_for(mode);
    let mut out = FeatureMatrix::with_capacity(mode.dim(), observations.len());
    for (obs, state) in observations.iter().zip(states) {
        encoder.push(*obs, *state, &mut out);
    }
    out
}
