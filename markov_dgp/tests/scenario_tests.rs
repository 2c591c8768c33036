//! End-to-end generation scenarios and structural invariants.

use markov_dgp::{
    Action, AdaptivePolicy, BeliefState, ConfigError, CyclicGenerator, GenConfig, Observation,
    Policy, PolicyConfig, Regime, SeedStreams, Side, Termination, TrajectoryGenerator,
    TERMINAL_CODE,
};

/// seed=1, noisy, always listen, T=20, N=1.
#[test]
fn test_always_listen_seed_one() {
    let cfg = GenConfig {
        regime: Regime::Noisy,
        policy: PolicyConfig::Fixed,
        trajectory_length: 20,
        trajectory_count: 1,
        seed: 1,
        ..GenConfig::default()
    };
    let data = TrajectoryGenerator::new(cfg).unwrap().generate().unwrap();
    assert_eq!(data.len(), 1);

    let traj = &data.trajectories[0];
    assert_eq!(traj.observations.len(), 21);
    assert_eq!(traj.actions.len(), 21);
    assert_eq!(traj.rewards.len(), 21);
    assert_eq!(traj.observations[0], Observation::Placeholder);
    assert_eq!(traj.actions[20], Action::End);
    assert_eq!(traj.action_codes()[20], TERMINAL_CODE);
    assert_eq!(traj.rewards[0], 0.0);
    assert!(traj.rewards[1..].iter().all(|r| *r == -1.0));
    assert!(traj.observations[1..]
        .iter()
        .all(|o| matches!(o, Observation::Heard(_))));
}

/// k=4, pattern [L, R, R, L], always listen, T=12.
#[test]
fn test_cyclic_k4_pattern_repeats_three_times() {
    use markov_dgp::Side::{Left as L, Right as R};

    let gen = CyclicGenerator::new(4, Some(vec![L, R, R, L]), PolicyConfig::Fixed, 1).unwrap();
    let data = gen.generate(1, 12).unwrap();
    let traj = &data.trajectories[0];

    let states = traj.states.clone().unwrap();
    assert_eq!(states, [L, R, R, L].repeat(3));

    let observed: Vec<Observation> = states.iter().map(|s| Observation::Heard(*s)).collect();
    assert_eq!(traj.observations[1..], observed[..]);
}

/// Opening the tiger door costs 100, the other door pays 10, and the
/// observation becomes the terminal sentinel.
#[test]
fn test_door_rewards() {
    let cfg = GenConfig {
        policy: PolicyConfig::Random {
            p_listen: 0.0,
            p_open_left: 0.5,
        },
        termination: Termination::EarlyStop,
        trajectory_count: 200,
        ..GenConfig::default()
    };
    let data = TrajectoryGenerator::new(cfg).unwrap().generate().unwrap();

    let (mut hits, mut escapes) = (0, 0);
    for traj in data.iter() {
        assert_eq!(traj.len(), 2);
        assert_eq!(traj.observations[1].code(), TERMINAL_CODE);
        let Action::Open(door) = traj.actions[0] else {
            panic!("expected a door opening, got {:?}", traj.actions[0]);
        };
        if door == traj.initial_state {
            assert_eq!(traj.rewards[1], -100.0);
            hits += 1;
        } else {
            assert_eq!(traj.rewards[1], 10.0);
            escapes += 1;
        }
    }
    assert!(hits > 0 && escapes > 0);
}

/// Adaptive policy with T_must_observe = 10 listens for t < 10 whatever the belief.
#[test]
fn test_adaptive_forced_listening() {
    let policy = AdaptivePolicy { t_must_observe: 10 };
    let mut rng = SeedStreams::new(9).trajectory(0);
    for reports in [Side::Left, Side::Right] {
        let mut belief = BeliefState::new();
        for _t in 0..10 {
            for _ in 0..20 {
                assert_eq!(policy.choose_action(&belief, &mut rng), Action::Listen);
            }
            belief.update(Observation::Heard(reports));
        }
    }

    let cfg = GenConfig {
        policy: PolicyConfig::adaptive(),
        termination: Termination::EarlyStop,
        trajectory_count: 100,
        ..GenConfig::default()
    };
    let data = TrajectoryGenerator::new(cfg).unwrap().generate().unwrap();
    for traj in data.iter() {
        assert!(traj.actions[..10].iter().all(|a| *a == Action::Listen));
    }
    // Adaptive commits once the sensor agrees with itself.
    assert!(data.metadata.early_termination_rate > 0.5);
}

/// A pattern whose length is not k is rejected before anything is generated.
#[test]
fn test_pattern_length_mismatch_is_a_config_error() {
    let err = CyclicGenerator::new(4, Some(vec![Side::Left; 3]), PolicyConfig::Fixed, 1)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::PatternLength {
            expected: 4,
            actual: 3
        }
    ));

    let err = TrajectoryGenerator::new(GenConfig::cyclic(5, Some(vec![Side::Right; 4])))
        .unwrap_err();
    assert!(matches!(err, ConfigError::PatternLength { .. }));
}

#[test]
fn test_early_stop_invariants() {
    let cfg = GenConfig {
        policy: PolicyConfig::random(),
        termination: Termination::EarlyStop,
        trajectory_length: 30,
        trajectory_count: 200,
        ..GenConfig::default()
    };
    let data = TrajectoryGenerator::new(cfg).unwrap().generate().unwrap();
    for traj in data.iter() {
        assert_eq!(traj.actions.len(), traj.len());
        assert_eq!(traj.rewards.len(), traj.len());
        assert_eq!(traj.rewards[0], 0.0);
        if let Some(i) = traj.actions.iter().position(|a| a.is_terminating()) {
            assert_eq!(traj.observations[i + 1].code(), TERMINAL_CODE);
            assert!(traj.actions[i + 1..].iter().all(|a| *a == Action::End));
        }
        assert!(traj.check_alignment().is_ok());
    }
}

#[test]
fn test_fixed_horizon_lengths_are_constant() {
    for policy in [PolicyConfig::random(), PolicyConfig::adaptive()] {
        let cfg = GenConfig {
            policy,
            trajectory_length: 15,
            trajectory_count: 100,
            ..GenConfig::default()
        };
        let data = TrajectoryGenerator::new(cfg).unwrap().generate().unwrap();
        assert!(data.iter().all(|t| t.len() == 16 && t.actions.len() == 16));
        assert_eq!(data.metadata.mean_length, 16.0);
    }
}

#[test]
fn test_reward_flag_controls_export_only() {
    let with = TrajectoryGenerator::new(GenConfig::default())
        .unwrap()
        .generate()
        .unwrap();
    let without = TrajectoryGenerator::new(GenConfig {
        include_reward: false,
        ..GenConfig::default()
    })
    .unwrap()
    .generate()
    .unwrap();

    assert!(with.records()[0].rewards.is_some());
    assert!(without.records()[0].rewards.is_none());
    assert_eq!(with.trajectories, without.trajectories);
}
