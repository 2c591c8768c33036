//! Synthetic trajectory generators for Markov-order testing.
//!
//! The crate produces datasets of (observation, action, reward) sequences
//! whose Markov order is known by construction, to validate a statistical
//! test of the Markov property. The binary (`src/main.rs`) is a thin CLI
//! around these components.
//!
//! # Architecture
//!
//! - **Dynamics** (`dynamics`): one-step (state, action) -> (reward,
//!   observation) for the noisy-sensor tiger and the deterministic k-cycle.
//!
//! - **Policies** (`policy`): fixed, randomized and adaptive behaviour,
//!   reading only the observation-derived belief.
//!
//! - **Encoders** (`encoding`): incremental exported representations of the
//!   observation history.
//!
//! - **Generator** (`generator`): the RUNNING / TERMINATED loop under a
//!   termination rule, batched into a `Dataset` with one seeded stream per
//!   trajectory.
//!
//! - **Moving tiger** (`cyclic`): the generator pinned to a k-cycle, with
//!   pattern construction and diagnostics.
//!
//! - **Test boundary** (`markov_test`): the `MarkovTest` trait plus order
//!   sweeps and replicate rejection rates on top of it.

pub mod config;
pub mod cyclic;
pub mod dataset;
pub mod dynamics;
pub mod encoding;
pub mod error;
pub mod generator;
pub mod logging;
pub mod policy;
pub mod rng;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{
    EncodingMode, GenConfig, PolicyConfig, Regime, RewardTable, Termination, DEFAULT_P_CORRECT,
    DEFAULT_P_LISTEN, DEFAULT_T_MUST_OBSERVE,
};

pub use cyclic::{CyclicGenerator, CyclicPattern, PatternInfo};

pub use dataset::{
    Dataset, DatasetMetadata, DatasetWriter, TestInput, TestTrajectory, Trajectory,
    TrajectoryRecord, DATASET_VERSION,
};

pub use dynamics::{DynamicsModel, Transition};

pub use encoding::{encode_history, encoder_for, BeliefState, FeatureMatrix, ObservationEncoder};

pub use error::{ConfigError, GenError};

pub use generator::TrajectoryGenerator;

pub use logging::{EventSink, JsonlSink, MemorySink, NoopSink, TrajectorySummary};

pub use markov_test::{
    order_sweep, replicate_rejection_rate, run_test, EstimatorMethod, EstimatorParams, MarkovTest,
    MarkovTestError, MarkovTestParams, OrderSweep, RejectionSummary, SweepPreset, DEFAULT_ALPHA,
};

pub use policy::{AdaptivePolicy, BehaviorPolicy, FixedPolicy, Policy, RandomPolicy};

pub use rng::SeedStreams;

pub use types::{Action, Observation, Side, TERMINAL_CODE};
