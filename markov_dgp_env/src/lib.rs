// markov_dgp_env/src/lib.rs
//
// Python bindings for the markov_dgp generators.
//
// Keeps the call shapes the Python estimator already consumes:
// - simu_tiger(N, T, seed, behav_def, obs_def, T_def, include_reward, fixed_state_comp)
// - simu_moving_tiger(N, T, seed, k, pattern, behav_def, include_reward)
// - tiger_dynamics(state, action): one sampled step of the noisy tiger
// - MovingTigerKthOrder: the k-cycle generator as a class
//
// Matrices are returned as lists of rows, so `np.array(x)` gives the
// (len, dim) arrays the test expects. All calls are deterministic given seeds.

use std::str::FromStr;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use markov_dgp::{
    Action, CyclicGenerator, DynamicsModel, EncodingMode, GenConfig, PolicyConfig, RewardTable,
    SeedStreams, Side, Termination, Trajectory, TrajectoryGenerator, DATASET_VERSION,
    DEFAULT_P_CORRECT,
};

type Matrix<T> = Vec<Vec<T>>;

fn to_py_err(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn column<T: Copy>(values: &[T]) -> Matrix<T> {
    values.iter().map(|v| vec![*v]).collect()
}

/// Map the historical `behav_def` codes (0 listen, 1 random, 2 adaptive).
fn policy_from_code(behav_def: u8) -> PyResult<PolicyConfig> {
    match behav_def {
        0 => Ok(PolicyConfig::Fixed),
        1 => Ok(PolicyConfig::random()),
        2 => Ok(PolicyConfig::adaptive()),
        other => Err(PyValueError::new_err(format!(
            "behav_def must be 0, 1 or 2, got {other}"
        ))),
    }
}

/// `obs_def` is either a string ("alt", "null", or an encoding name) or an int (1, 2).
fn encoding_from_py(obs_def: &Bound<'_, PyAny>) -> PyResult<EncodingMode> {
    let name = match obs_def.extract::<String>() {
        Ok(s) => s,
        Err(_) => obs_def.extract::<i64>()?.to_string(),
    };
    EncodingMode::from_str(&name).map_err(to_py_err)
}

fn termination_from_code(t_def: u8) -> PyResult<Termination> {
    match t_def {
        0 => Ok(Termination::FixedHorizon),
        1 => Ok(Termination::EarlyStop),
        other => Err(PyValueError::new_err(format!(
            "T_def must be 0 or 1, got {other}"
        ))),
    }
}

fn parse_pattern(pattern: Option<Vec<i64>>) -> PyResult<Option<Vec<Side>>> {
    pattern
        .map(|codes| {
            codes
                .into_iter()
                .map(Side::from_code)
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
        .map_err(to_py_err)
}

/// [O, A] or [O, A, R], each as a list of rows.
fn trajectory_to_py(py: Python<'_>, traj: &Trajectory, include_reward: bool) -> PyObject {
    let observations = traj.features.to_rows();
    let actions = column(&traj.action_codes());
    if include_reward {
        (observations, actions, column(&traj.rewards)).into_py(py)
    } else {
        (observations, actions).into_py(py)
    }
}

/// Simulate N trajectories of the noisy tiger.
///
/// Args:
///     N: number of trajectories
///     T: steps per trajectory
///     seed: dataset seed
///     behav_def: 0 always listen, 1 random, 2 adaptive
///     obs_def: "alt" raw, "null" raw + true state, 1 running proportion,
///         2 (proportion, count)
///     T_def: 0 fixed horizon with padding, 1 stop at the first door opening
///     include_reward: append the reward column
///     fixed_state_comp: also return the initial true state of every
///         trajectory; with obs_def="null" the state column moves out of O
///         into that list
///
/// Returns:
///     A list of [O, A] / [O, A, R] entries, or (entries, true_states) when
///     fixed_state_comp is set, whatever obs_def is.
#[pyfunction]
#[pyo3(signature = (
    N=1, T=20, seed=1, behav_def=0, obs_def=None, T_def=0,
    include_reward=true, fixed_state_comp=false
))]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn simu_tiger(
    py: Python<'_>,
    N: usize,
    T: usize,
    seed: u64,
    behav_def: u8,
    obs_def: Option<&Bound<'_, PyAny>>,
    T_def: u8,
    include_reward: bool,
    fixed_state_comp: bool,
) -> PyResult<PyObject> {
    let mut encoding = match obs_def {
        Some(obs_def) => encoding_from_py(obs_def)?,
        None => EncodingMode::Raw,
    };
    if fixed_state_comp && encoding == EncodingMode::HiddenExposed {
        encoding = EncodingMode::Raw;
    }

    let config = GenConfig {
        policy: policy_from_code(behav_def)?,
        encoding,
        termination: termination_from_code(T_def)?,
        trajectory_length: T,
        trajectory_count: N,
        seed,
        include_reward,
        ..GenConfig::default()
    };
    let dataset = TrajectoryGenerator::new(config)
        .map_err(to_py_err)?
        .generate()
        .map_err(to_py_err)?;

    let mdps: Vec<PyObject> = dataset
        .iter()
        .map(|traj| trajectory_to_py(py, traj, include_reward))
        .collect();

    if fixed_state_comp {
        let true_states: Vec<i8> = dataset.iter().map(|t| t.initial_state.code()).collect();
        Ok((mdps, true_states).into_py(py))
    } else {
        Ok(mdps.into_py(py))
    }
}

/// Simulate N trajectories of the k-cycle moving tiger.
///
/// Returns a list of [O, A] (or [O, A, R]) entries shaped like `simu_tiger`.
#[pyfunction]
#[pyo3(signature = (N=1, T=20, seed=1, k=4, pattern=None, behav_def=0, include_reward=false))]
#[allow(non_snake_case, clippy::too_many_arguments)]
fn simu_moving_tiger(
    py: Python<'_>,
    N: usize,
    T: usize,
    seed: u64,
    k: usize,
    pattern: Option<Vec<i64>>,
    behav_def: u8,
    include_reward: bool,
) -> PyResult<Vec<PyObject>> {
    let generator =
        CyclicGenerator::new(k, parse_pattern(pattern)?, policy_from_code(behav_def)?, seed)
            .map_err(to_py_err)?;
    let dataset = generator.generate(N, T).map_err(to_py_err)?;
    Ok(dataset
        .iter()
        .map(|traj| trajectory_to_py(py, traj, include_reward))
        .collect())
}

/// One step of the noisy tiger.
///
/// Args:
///     state: -1 (left) or 1 (right)
///     action: 0 listen, -1 open left, 1 open right
///     seed: seed of the sensor draw
///     p_correct: sensor accuracy
///
/// Returns:
///     (reward, observation) with observation 3 after a door opening.
#[pyfunction]
#[pyo3(signature = (state, action, seed=0, p_correct=DEFAULT_P_CORRECT))]
fn tiger_dynamics(state: i64, action: i64, seed: u64, p_correct: f64) -> PyResult<(f64, i8)> {
    let state = Side::from_code(state).map_err(to_py_err)?;
    let action = Action::from_code(action).map_err(to_py_err)?;
    if !(0.0..=1.0).contains(&p_correct) {
        return Err(PyValueError::new_err(format!(
            "p_correct must be in [0, 1], got {p_correct}"
        )));
    }

    let model = DynamicsModel::noisy(p_correct, RewardTable::default());
    let mut rng = SeedStreams::new(seed).trajectory(0);
    let transition = model.step(state, action, &mut rng).map_err(to_py_err)?;
    Ok((transition.reward, transition.observation.code()))
}

/// Tiger moving through a fixed k-cycle, observed without noise.
///
/// Each call to `generate_trajectory` draws from the next trajectory
/// stream, so repeated calls give fresh (but reproducible) trajectories.
#[pyclass]
pub struct MovingTigerKthOrder {
    inner: CyclicGenerator,
    next_index: u64,
}

#[pymethods]
impl MovingTigerKthOrder {
    /// Create a generator.
    ///
    /// Args:
    ///     k: cycle length (default: 6)
    ///     pattern: list of k codes in {-1, 1}; a default pattern is used when None
    ///     policy: "always_listen", "random" or "adaptive"
    ///     random_state: seed (default: 0)
    #[new]
    #[pyo3(signature = (k=6, pattern=None, policy="always_listen", random_state=None))]
    fn new(
        k: usize,
        pattern: Option<Vec<i64>>,
        policy: &str,
        random_state: Option<u64>,
    ) -> PyResult<Self> {
        let policy = PolicyConfig::from_str(policy).map_err(to_py_err)?;
        let inner = CyclicGenerator::new(
            k,
            parse_pattern(pattern)?,
            policy,
            random_state.unwrap_or(0),
        )
        .map_err(to_py_err)?;
        Ok(Self {
            inner,
            next_index: 0,
        })
    }

    /// Generate one trajectory.
    ///
    /// Returns:
    ///     ((O, A), states) with O and A as column matrices. states holds the
    ///     latent state code at every time index reached: length + 1 entries
    ///     (t = 0..=length) on a full run, i + 1 when a door opens at step i.
    fn generate_trajectory(
        &mut self,
        length: usize,
    ) -> PyResult<((Matrix<f64>, Matrix<i8>), Vec<i8>)> {
        let traj = self
            .inner
            .generate_trajectory(self.next_index, length)
            .map_err(to_py_err)?;
        self.next_index += 1;

        let states = self
            .inner
            .visited_states(&traj)
            .iter()
            .map(|s| s.code())
            .collect();
        Ok((
            (traj.features.to_rows(), column(&traj.action_codes())),
            states,
        ))
    }

    /// Generate `n_trajectories` trajectories as a list of (O, A) pairs.
    fn generate(
        &mut self,
        n_trajectories: usize,
        trajectory_length: usize,
    ) -> PyResult<Vec<(Matrix<f64>, Matrix<i8>)>> {
        (0..n_trajectories)
            .map(|_| {
                self.generate_trajectory(trajectory_length)
                    .map(|(pair, _)| pair)
            })
            .collect()
    }

    /// Pattern diagnostics: k, pattern, pattern_str, minimal_period, obs_accuracy.
    fn get_pattern_info(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let info = self.inner.info();
        let dict = PyDict::new_bound(py);
        dict.set_item("k", info.k)?;
        dict.set_item(
            "pattern",
            info.pattern.iter().map(|s| s.code()).collect::<Vec<_>>(),
        )?;
        dict.set_item("pattern_str", info.pattern_str)?;
        dict.set_item("minimal_period", info.minimal_period)?;
        dict.set_item("obs_accuracy", info.obs_accuracy)?;
        Ok(dict.into())
    }

    #[getter]
    fn k(&self) -> usize {
        self.inner.pattern().k()
    }

    #[getter]
    fn pattern(&self) -> Vec<i8> {
        self.inner.pattern().codes()
    }

    #[getter]
    fn obs_accuracy(&self) -> f64 {
        self.inner.info().obs_accuracy
    }
}

/// Version of the exported dataset layout.
#[pyfunction]
fn dataset_version() -> u32 {
    DATASET_VERSION
}

/// Python module definition.
#[pymodule]
fn markov_dgp_env(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<MovingTigerKthOrder>()?;
    m.add_function(wrap_pyfunction!(simu_tiger, m)?)?;
    m.add_function(wrap_pyfunction!(simu_moving_tiger, m)?)?;
    m.add_function(wrap_pyfunction!(tiger_dynamics, m)?)?;
    m.add_function(wrap_pyfunction!(dataset_version, m)?)?;
    Ok(())
}
