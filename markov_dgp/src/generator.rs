// src/generator.rs
//
// Trajectory generator: runs policy -> dynamics -> encoder until the
// termination rule fires, then batches trajectories into a dataset.
//
// Layout of one trajectory with `steps` real steps:
// - observations[0] is the placeholder; observations[t + 1] is the result of
//   the action taken at step t
// - actions[t] is the action of step t; the end marker closes the sequence,
//   so actions.len() == observations.len()
// - rewards[0] == 0; rewards[t + 1] is the reward of step t
// - states[t] is the latent state at step t
//
// Fixed-horizon trajectories always have `trajectory_length + 1` positions:
// after an early door opening the remaining positions carry the terminal
// sentinel, the end marker and zero reward. Early-stop trajectories end at
// the terminating step, and are capped at `trajectory_length` steps.

use tracing::{debug, info};

use crate::config::{GenConfig, Termination};
use crate::dataset::{Dataset, Trajectory};
use crate::dynamics::{DynamicsModel, Transition};
use crate::encoding::{encoder_for, BeliefState, FeatureMatrix};
use crate::error::{ConfigError, GenError};
use crate::logging::{EventSink, NoopSink, TrajectorySummary};
use crate::policy::{BehaviorPolicy, Policy};
use crate::rng::SeedStreams;
use crate::types::{Action, Observation};

/// Steps preallocated per trajectory; longer ones grow on demand.
const PREALLOC_STEPS: usize = 1024;

/// Episode phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Terminated,
}

/// Deterministic dataset generator for one validated configuration.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    config: GenConfig,
    model: DynamicsModel,
    policy: BehaviorPolicy,
    streams: SeedStreams,
}

impl TrajectoryGenerator {
    /// Validate `config` and build the generator. Nothing is generated from
    /// a config that fails validation.
    pub fn new(config: GenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let model = DynamicsModel::from_config(&config)?;
        let policy = BehaviorPolicy::from(config.policy);
        let streams = SeedStreams::new(config.seed);
        Ok(Self {
            config,
            model,
            policy,
            streams,
        })
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    pub fn model(&self) -> &DynamicsModel {
        &self.model
    }

    /// Trajectory `index` of the dataset, at the configured length.
    pub fn generate_one(&self, index: u64) -> Result<Trajectory, GenError> {
        self.generate_trajectory(index, self.config.trajectory_length)
    }

    /// Generate the full dataset.
    pub fn generate(&self) -> Result<Dataset, GenError> {
        self.generate_with_sink(&mut NoopSink)
    }

    /// Generate the full dataset, reporting a summary of every trajectory
    /// to `sink`.
    pub fn generate_with_sink<S: EventSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<Dataset, GenError> {
        let n = self.config.trajectory_count;
        let mut trajectories = Vec::with_capacity(n);
        for index in 0..n as u64 {
            let trajectory = self.generate_one(index)?;
            sink.log_trajectory(&TrajectorySummary::from_trajectory(&trajectory));
            trajectories.push(trajectory);
        }

        let dataset = Dataset::new(&self.config, trajectories);
        info!(
            regime = %self.config.regime,
            policy = self.config.policy.name(),
            encoding = %self.config.encoding,
            termination = %self.config.termination,
            trajectories = dataset.len(),
            early_termination_rate = dataset.metadata.early_termination_rate,
            fingerprint = %dataset.metadata.fingerprint,
            "dataset generated"
        );
        Ok(dataset)
    }

    /// Run one trajectory on stream `index` for at most `horizon` steps.
    ///
    /// Randomness is consumed in a fixed order: the initial state, then for
    /// each running step the policy draws followed by the sensor draw.
    pub fn generate_trajectory(&self, index: u64, horizon: usize) -> Result<Trajectory, GenError> {
        if horizon == 0 || horizon == usize::MAX {
            return Err(ConfigError::validation(
                "trajectory_length",
                "must be > 0 and leave room for the placeholder position",
            )
            .into());
        }

        let mut rng = self.streams.trajectory(index);
        let initial = self.model.initial_state(&mut rng);
        let mode = self.config.encoding;
        let early_stop = self.config.termination == Termination::EarlyStop;

        // Under early stop the horizon is only a cap, so size for typical runs.
        let capacity = horizon.min(PREALLOC_STEPS);
        let mut encoder = encoder_for(mode);
        let mut features = FeatureMatrix::with_capacity(mode.dim(), capacity + 1);
        let mut observations = Vec::with_capacity(capacity + 1);
        let mut actions = Vec::with_capacity(capacity + 1);
        let mut rewards = Vec::with_capacity(capacity + 1);
        let mut states = Vec::with_capacity(capacity);
        let mut belief = BeliefState::new();

        observations.push(Observation::Placeholder);
        rewards.push(0.0);
        encoder.push(Observation::Placeholder, initial, &mut features);

        let mut phase = Phase::Running;
        let mut steps = 0;
        for t in 0..horizon {
            let state = self.model.state_at(t, initial);
            let (action, transition) = match phase {
                Phase::Running => {
                    let action = self.policy.choose_action(&belief, &mut rng);
                    (action, self.model.step(state, action, &mut rng)?)
                }
                Phase::Terminated => (
                    Action::End,
                    Transition {
                        reward: 0.0,
                        observation: Observation::Terminal,
                    },
                ),
            };

            belief.update(transition.observation);
            encoder.push(transition.observation, state, &mut features);
            observations.push(transition.observation);
            actions.push(action);
            rewards.push(transition.reward);
            states.push(state);

            if phase == Phase::Running {
                steps += 1;
                if action.is_terminating() {
                    phase = Phase::Terminated;
                    if early_stop {
                        break;
                    }
                }
            }
        }
        actions.push(Action::End);

        let trajectory = Trajectory {
            index,
            initial_state: initial,
            observations,
            features,
            actions,
            rewards,
            states: self.config.record_states.then_some(states),
            steps,
            terminated_early: phase == Phase::Terminated,
        };
        trajectory.check_alignment()?;

        debug!(
            index,
            steps,
            length = trajectory.len(),
            terminated_early = trajectory.terminated_early,
            total_reward = trajectory.total_reward(),
            "trajectory generated"
        );
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncodingMode, PolicyConfig, Regime};
    use crate::types::{Side, TERMINAL_CODE};

    fn noisy(policy: PolicyConfig, termination: Termination) -> GenConfig {
        GenConfig {
            policy,
            termination,
            trajectory_length: 20,
            trajectory_count: 50,
            seed: 3,
            record_states: true,
            ..GenConfig::default()
        }
    }

    #[test]
    fn test_always_listen_full_length() {
        let gen = TrajectoryGenerator::new(GenConfig::default()).unwrap();
        let traj = gen.generate_one(0).unwrap();
        assert_eq!(traj.len(), 21);
        assert_eq!(traj.actions.len(), 21);
        assert_eq!(traj.rewards.len(), 21);
        assert_eq!(traj.rewards[0], 0.0);
        assert!(traj.rewards[1..].iter().all(|r| *r == -1.0));
        assert_eq!(traj.actions.last(), Some(&Action::End));
        assert!(traj.actions[..20].iter().all(|a| *a == Action::Listen));
        assert_eq!(traj.steps, 20);
        assert!(!traj.terminated_early);
    }

    #[test]
    fn test_fixed_horizon_pads_after_opening() {
        let gen = TrajectoryGenerator::new(noisy(
            PolicyConfig::random(),
            Termination::FixedHorizon,
        ))
        .unwrap();
        let data = gen.generate().unwrap();
        let mut saw_early = false;
        for traj in data.iter() {
            assert_eq!(traj.len(), 21);
            assert_eq!(traj.actions.len(), 21);
            if let Some(i) = traj.actions.iter().position(|a| a.is_terminating()) {
                saw_early = true;
                assert_eq!(traj.observations[i + 1], Observation::Terminal);
                assert!(traj.actions[i + 1..].iter().all(|a| *a == Action::End));
                assert!(traj.observations[i + 1..].iter().all(|o| o.is_terminal()));
                assert!(traj.rewards[i + 2..].iter().all(|r| *r == 0.0));
                assert_eq!(traj.steps, i + 1);
            }
        }
        assert!(saw_early, "random policy should open a door in 50 x 20 steps");
    }

    #[test]
    fn test_early_stop_ends_at_terminal_step() {
        let gen =
            TrajectoryGenerator::new(noisy(PolicyConfig::random(), Termination::EarlyStop))
                .unwrap();
        for traj in gen.generate().unwrap().iter() {
            assert_eq!(traj.actions.len(), traj.len());
            assert_eq!(traj.rewards.len(), traj.len());
            assert_eq!(traj.states.as_ref().map(Vec::len), Some(traj.steps));
            if traj.terminated_early {
                let last = traj.len() - 1;
                assert_eq!(traj.observations[last].code(), TERMINAL_CODE);
                assert!(traj.actions[last - 1].is_terminating());
                assert_eq!(traj.actions[last], Action::End);
                assert_eq!(traj.observations.iter().filter(|o| o.is_terminal()).count(), 1);
            } else {
                assert_eq!(traj.len(), 21);
            }
        }
    }

    #[test]
    fn test_early_stop_caps_a_policy_that_never_opens() {
        let gen = TrajectoryGenerator::new(noisy(PolicyConfig::Fixed, Termination::EarlyStop))
            .unwrap();
        let traj = gen.generate_one(0).unwrap();
        assert_eq!(traj.len(), 21);
        assert!(!traj.terminated_early);
        assert_eq!(traj.actions.last(), Some(&Action::End));
    }

    #[test]
    fn test_door_rewards_follow_tiger_position() {
        let gen =
            TrajectoryGenerator::new(noisy(PolicyConfig::random(), Termination::EarlyStop))
                .unwrap();
        for traj in gen.generate().unwrap().iter() {
            if let Some(Action::Open(door)) = traj.actions.iter().find(|a| a.is_terminating()) {
                let reward = traj.rewards[traj.len() - 1];
                if *door == traj.initial_state {
                    assert_eq!(reward, -100.0);
                } else {
                    assert_eq!(reward, 10.0);
                }
            }
        }
    }

    #[test]
    fn test_noisy_state_is_fixed_for_the_episode() {
        let gen = TrajectoryGenerator::new(noisy(PolicyConfig::Fixed, Termination::FixedHorizon))
            .unwrap();
        for traj in gen.generate().unwrap().iter() {
            let states = traj.states.as_ref().unwrap();
            assert!(states.iter().all(|s| *s == traj.initial_state));
        }
    }

    #[test]
    fn test_trajectories_are_independent_of_count_and_order() {
        let small = TrajectoryGenerator::new(GenConfig {
            trajectory_count: 3,
            ..noisy(PolicyConfig::adaptive(), Termination::EarlyStop)
        })
        .unwrap();
        let large = TrajectoryGenerator::new(noisy(
            PolicyConfig::adaptive(),
            Termination::EarlyStop,
        ))
        .unwrap();

        let a = small.generate().unwrap();
        let b = large.generate().unwrap();
        for i in 0..3 {
            assert_eq!(a.trajectories[i], b.trajectories[i]);
        }
        assert_eq!(large.generate_one(7).unwrap(), b.trajectories[7]);
    }

    #[test]
    fn test_hidden_exposed_rows_pair_state() {
        let gen = TrajectoryGenerator::new(GenConfig {
            encoding: EncodingMode::HiddenExposed,
            ..GenConfig::default()
        })
        .unwrap();
        let traj = gen.generate_one(0).unwrap();
        assert_eq!(traj.features.dim(), 2);
        let expected = traj.initial_state.code() as f64;
        assert!(traj.features.column(1).iter().all(|s| *s == expected));
        assert_eq!(traj.features.rows(), traj.len());
    }

    #[test]
    fn test_cyclic_regime_observations_are_exact() {
        let gen = TrajectoryGenerator::new(GenConfig {
            trajectory_length: 24,
            ..GenConfig::cyclic(6, None)
        })
        .unwrap();
        assert_eq!(gen.config().regime, Regime::Cyclic);
        let traj = gen.generate_one(0).unwrap();
        let states = traj.states.as_ref().unwrap();
        for (t, state) in states.iter().enumerate() {
            assert_eq!(traj.observations[t + 1], Observation::Heard(*state));
        }
        assert_eq!(traj.initial_state, Side::Left);
    }

    #[test]
    fn test_early_stop_cap_does_not_size_buffers() {
        let gen = TrajectoryGenerator::new(GenConfig {
            policy: PolicyConfig::Random {
                p_listen: 0.0,
                p_open_left: 0.5,
            },
            termination: Termination::EarlyStop,
            trajectory_length: 1 << 40,
            trajectory_count: 3,
            ..GenConfig::default()
        })
        .unwrap();
        for traj in gen.generate().unwrap().iter() {
            assert_eq!(traj.len(), 2);
            assert!(traj.terminated_early);
        }
    }

    #[test]
    fn test_unindexable_length_is_an_error() {
        let err = TrajectoryGenerator::new(GenConfig {
            trajectory_length: usize::MAX,
            ..GenConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));

        let gen = TrajectoryGenerator::new(GenConfig::default()).unwrap();
        assert!(matches!(
            gen.generate_trajectory(0, usize::MAX),
            Err(GenError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let err = TrajectoryGenerator::new(GenConfig {
            trajectory_count: 0,
            ..GenConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
