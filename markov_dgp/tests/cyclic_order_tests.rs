//! k-cycle ground truth.
//!
//! The moving tiger must be exactly k-periodic, observed without noise, and
//! its observation stream must be predictable from the last k observations.
//! The order check uses an exact window test: on deterministic data an order
//! J is consistent iff no J-window is followed by two different observations.

use std::collections::HashMap;

use markov_dgp::dynamics::open_reward;
use markov_dgp::{
    order_sweep, Action, CyclicGenerator, CyclicPattern, Dataset, GenConfig, MarkovTest,
    MarkovTestError, MarkovTestParams, Observation, PolicyConfig, RewardTable, Side, Termination,
    TestInput, DEFAULT_ALPHA,
};

/// p = 0 when some window of `order` observations has two successors, else 1.
struct WindowConsistency;

impl MarkovTest for WindowConsistency {
    fn p_value(&self, input: &TestInput, params: &MarkovTestParams) -> Result<f64, MarkovTestError> {
        let j = params.order as usize;
        let mut successors: HashMap<Vec<i64>, i64> = HashMap::new();
        for traj in &input.trajectories {
            // Skip the placeholder row.
            let obs: Vec<i64> = traj.observations.column(0)[1..]
                .iter()
                .map(|v| *v as i64)
                .collect();
            for w in obs.windows(j + 1) {
                let (history, next) = (w[..j].to_vec(), w[j]);
                if let Some(prev) = successors.insert(history, next) {
                    if prev != next {
                        return Ok(0.0);
                    }
                }
            }
        }
        Ok(1.0)
    }
}

fn dataset(k: usize, n: usize, length: usize) -> Dataset {
    CyclicGenerator::new(k, None, PolicyConfig::Fixed, 42)
        .unwrap()
        .generate(n, length)
        .unwrap()
}

#[test]
fn test_states_repeat_with_period_k() {
    for k in 2..=12 {
        let data = dataset(k, 3, 3 * k + 1);
        for traj in data.iter() {
            let states = traj.states.as_ref().unwrap();
            assert!(states.len() >= 2 * k);
            assert_eq!(states[0..k], states[k..2 * k], "k = {k}");
            for t in 0..states.len() - k {
                assert_eq!(states[t], states[t + k]);
            }
        }
    }
}

#[test]
fn test_observation_accuracy_is_exact() {
    let data = dataset(7, 10, 40);
    assert_eq!(data.metadata.observation_accuracy, 1.0);
    for traj in data.iter() {
        let states = traj.states.as_ref().unwrap();
        for (t, obs) in traj.observations[1..].iter().enumerate() {
            if !obs.is_terminal() {
                assert_eq!(*obs, Observation::Heard(states[t]));
            }
        }
    }
}

#[test]
fn test_door_openings_in_the_cycle() {
    let rewards = RewardTable::default();
    for termination in [Termination::FixedHorizon, Termination::EarlyStop] {
        let gen = CyclicGenerator::from_config(GenConfig {
            policy: PolicyConfig::Random {
                p_listen: 0.8,
                p_open_left: 0.5,
            },
            termination,
            seed: 7,
            ..GenConfig::cyclic(4, None)
        })
        .unwrap();
        let pattern = gen.pattern();
        let data = gen.generate(60, 30).unwrap();

        let mut opened = 0;
        for traj in data.iter() {
            traj.check_alignment().unwrap();
            let states = traj.states.as_ref().unwrap();
            for (t, state) in states.iter().enumerate() {
                assert_eq!(*state, pattern.state_at(t));
            }

            let Some(i) = traj.actions.iter().position(|a| a.is_terminating()) else {
                assert_eq!(traj.len(), 31);
                assert!(traj.observations[1..]
                    .iter()
                    .enumerate()
                    .all(|(t, o)| *o == Observation::Heard(states[t])));
                continue;
            };
            opened += 1;

            for t in 0..i {
                assert_eq!(traj.observations[t + 1], Observation::Heard(states[t]));
                assert_eq!(traj.rewards[t + 1], rewards.listen_cost);
            }
            let Action::Open(door) = traj.actions[i] else {
                unreachable!()
            };
            assert_eq!(traj.observations[i + 1], Observation::Terminal);
            assert_eq!(
                traj.rewards[i + 1],
                open_reward(&rewards, door, pattern.state_at(i % 4))
            );
            assert!(traj.actions[i + 1..].iter().all(|a| *a == Action::End));

            match termination {
                Termination::EarlyStop => {
                    assert_eq!(traj.len(), i + 2);
                    assert_eq!(states.len(), i + 1);
                }
                Termination::FixedHorizon => {
                    assert_eq!(traj.len(), 31);
                    assert_eq!(states.len(), 30);
                    assert!(traj.observations[i + 1..].iter().all(|o| o.is_terminal()));
                }
            }
        }
        assert!(opened > 0, "{termination}: no door was opened");
    }
}

#[test]
fn test_all_trajectories_follow_the_same_cycle() {
    let data = dataset(5, 8, 20);
    let first = data.trajectories[0].observations.clone();
    assert!(data.iter().all(|t| t.observations == first));
}

#[test]
fn test_order_k_window_determines_next_observation() {
    let params = MarkovTestParams {
        folds: 2,
        ..Default::default()
    };
    // k = 2 alternates, which is already first order.
    for k in 3..=8 {
        let data = dataset(k, 4, 4 * k);
        let orders: Vec<u32> = (1..=k as u32 + 1).collect();
        let sweep = order_sweep(&WindowConsistency, &data, &orders, &params, DEFAULT_ALPHA).unwrap();

        let by_order: HashMap<u32, bool> =
            sweep.decisions.iter().map(|d| (d.order, d.reject)).collect();
        assert!(by_order[&1], "k = {k}: order 1 should be rejected");
        assert!(!by_order[&(k as u32)], "k = {k}: order k should pass");
        assert!(!by_order[&(k as u32 + 1)], "k = {k}: order k + 1 should pass");
        assert_eq!(sweep.k, Some(k));
    }
}

#[test]
fn test_degenerate_pattern_has_lower_order() {
    use markov_dgp::Side::{Left as L, Right as R};

    let pattern = vec![L, R, L, R];
    assert_eq!(CyclicPattern::new(4, Some(pattern.clone())).unwrap().minimal_period(), 2);

    let data = CyclicGenerator::new(4, Some(pattern), PolicyConfig::Fixed, 1)
        .unwrap()
        .generate(4, 16)
        .unwrap();
    let params = MarkovTestParams {
        folds: 2,
        ..Default::default()
    };
    let sweep = order_sweep(&WindowConsistency, &data, &[1, 2, 3], &params, DEFAULT_ALPHA).unwrap();
    // Alternation is already first-order.
    assert!(sweep.decisions.iter().all(|d| !d.reject));
    assert!(!sweep.matches_expectation());
}

#[test]
fn test_default_pattern_for_k4() {
    let gen = CyclicGenerator::new(4, None, PolicyConfig::Fixed, 0).unwrap();
    assert_eq!(
        gen.pattern().pattern(),
        &[Side::Left, Side::Right, Side::Right, Side::Left]
    );
    assert_eq!(gen.info().pattern_str, "LEFT → RIGHT → RIGHT → LEFT");
}
