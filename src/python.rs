//! Python bindings: drive a Python `Simulation` object from the Rust
//! environment, and expose the environment back to Python.

use std::path::PathBuf;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tracing::debug;

use crate::config::{ActionPolicy, EngineConfig, EnvConfig, ScenarioConfig};
use crate::engine::{EngineError, EngineLauncher, EntityIds, SimulationEngine, VehicleRecord};
use crate::env::{Action, Env, EnvError, Info};
use crate::traffic::{REBUILD_OPTION, TrafficEnv};

const SIMULATION_FILE: &str = "src/simulation.py";
const SIMULATION_CLASS: &str = "Simulation";

fn engine_err(op: &'static str) -> impl FnOnce(PyErr) -> EngineError {
    move |e| EngineError::call(op, e)
}

/// Loads the `Simulation` class from the project's install directory by file
/// location, without touching `sys.path`.
#[derive(Debug, Clone, Default)]
pub struct PyEngineLauncher;

impl EngineLauncher for PyEngineLauncher {
    type Engine = PyEngine;

    fn launch(&mut self, config: &EngineConfig) -> Result<PyEngine, EngineError> {
        let root = config.install_path.as_ref().ok_or_else(|| {
            EngineError::Launch(format!(
                "no install path configured; set {}",
                EngineConfig::INSTALL_PATH_VAR
            ))
        })?;
        let file = root.join(SIMULATION_FILE);
        debug!(path = %file.display(), "loading simulation module");

        let class = Python::with_gil(|py| -> PyResult<Py<PyAny>> {
            let util = py.import("importlib.util")?;
            let spec = util.call_method1(
                "spec_from_file_location",
                ("simulation", file.to_string_lossy().into_owned()),
            )?;
            let module = util.call_method1("module_from_spec", (&spec,))?;
            spec.getattr("loader")?
                .call_method1("exec_module", (&module,))?;
            Ok(module.getattr(SIMULATION_CLASS)?.unbind())
        })
        .map_err(|e| EngineError::Launch(e.to_string()))?;

        Ok(PyEngine { class, sim: None })
    }
}

/// A `Simulation` instance living in the Python interpreter.
pub struct PyEngine {
    class: Py<PyAny>,
    sim: Option<Py<PyAny>>,
}

impl PyEngine {
    fn invoke(&self, op: &'static str, method: &str) -> Result<(), EngineError> {
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        Python::with_gil(|py| sim.call_method0(py, method).map(drop))
            .map_err(engine_err(op))
    }

    fn query<T>(&self, op: &'static str, method: &str) -> Result<T, EngineError>
    where
        T: for<'py> FromPyObject<'py>,
    {
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        Python::with_gil(|py| -> PyResult<T> { sim.bind(py).call_method0(method)?.extract() })
            .map_err(engine_err(op))
    }
}

fn stringify_ids(ids: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    ids.try_iter()?
        .map(|item| Ok(item?.str()?.to_string()))
        .collect()
}

impl SimulationEngine for PyEngine {
    fn configure(
        &mut self,
        scenario: &ScenarioConfig,
        seed: Option<u64>,
    ) -> Result<(), EngineError> {
        debug!(?seed, "configuring python simulation");
        let sim = Python::with_gil(|py| -> PyResult<Py<PyAny>> {
            let sim = self.class.bind(py).call1((
                scenario.vehicle_count,
                scenario.agent_count,
                scenario.route_id.as_str(),
            ))?;
            sim.call_method0("setup_sumo")?;
            Ok(sim.unbind())
        })
        .map_err(engine_err("configure"))?;
        self.sim = Some(sim);
        Ok(())
    }

    fn apply_options(&mut self, options: &[String]) -> Result<(), EngineError> {
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        Python::with_gil(|py| {
            if options.is_empty() {
                sim.call_method0(py, "get_options").map(drop)
            } else {
                sim.call_method1(py, "get_options", (options.to_vec(),))
                    .map(drop)
            }
        })
        .map_err(engine_err("apply_options"))
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.invoke("start", "start_sumo")
    }

    fn initialize(&mut self) -> Result<(), EngineError> {
        self.invoke("initialize", "simulation_init")
    }

    fn entity_ids(&self) -> Result<EntityIds, EngineError> {
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        Python::with_gil(|py| -> PyResult<EntityIds> {
            let ids = sim.bind(py).call_method0("get_ids")?;
            Ok(EntityIds {
                vehicles: stringify_ids(&ids.get_item(0)?)?,
                agents: stringify_ids(&ids.get_item(1)?)?,
            })
        })
        .map_err(engine_err("entity_ids"))
    }

    fn advance(&mut self) -> Result<(), EngineError> {
        self.invoke("advance", "simulation_step")
    }

    fn set_acceleration(&mut self, agent_id: &str, acceleration: f32) -> Result<(), EngineError> {
        // The Python side picks its controlled agent itself.
        debug!(agent = agent_id, acceleration, "setting acceleration");
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        Python::with_gil(|py| {
            sim.call_method1(py, "set_acceleration", (acceleration,))
                .map(drop)
        })
        .map_err(engine_err("set_acceleration"))
    }

    fn records(&self) -> Result<Vec<VehicleRecord>, EngineError> {
        let (positions, speeds): (Vec<Option<Vec<f32>>>, Vec<Option<f32>>) =
            self.query("records", "get_obs")?;
        Ok(positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| VehicleRecord {
                position: position.and_then(|p| match p.as_slice() {
                    [x, y, ..] => Some([*x, *y]),
                    _ => None,
                }),
                speed: speeds.get(i).copied().flatten(),
            })
            .collect())
    }

    fn is_terminated(&self) -> Result<bool, EngineError> {
        self.query("is_terminated", "get_terminated")
    }

    fn reset_episode(&mut self, _seed: Option<u64>) -> Result<(), EngineError> {
        let sim = self.sim.as_ref().ok_or(EngineError::NotRunning)?;
        let supported = Python::with_gil(|py| sim.bind(py).hasattr("simulation_reset"))
            .map_err(engine_err("reset_episode"))?;
        if !supported {
            return Err(EngineError::Unsupported("reset_episode"));
        }
        self.invoke("reset_episode", "simulation_reset")
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        let result = self.invoke("shutdown", "end_simulation");
        self.sim = None;
        result
    }
}

fn to_py_err(e: EnvError) -> PyErr {
    match e {
        EnvError::ActionOutOfBounds { .. }
        | EnvError::ActionShape { .. }
        | EnvError::InvalidIdentifiers(_)
        | EnvError::Config(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn parse_policy(name: &str) -> PyResult<ActionPolicy> {
    match name {
        "reject" => Ok(ActionPolicy::Reject),
        "clamp" => Ok(ActionPolicy::Clamp),
        "passthrough" => Ok(ActionPolicy::Passthrough),
        other => Err(PyValueError::new_err(format!(
            "unknown action policy {other:?}; expected reject, clamp or passthrough"
        ))),
    }
}

/// The traffic environment, callable from Python.
#[pyclass(name = "TrafficEnv")]
pub struct PyTrafficEnv {
    inner: TrafficEnv<PyEngineLauncher>,
}

#[pymethods]
impl PyTrafficEnv {
    #[new]
    #[pyo3(signature = (num_vehicles, num_agents, route_id, install_path=None, action_policy="reject", engine_options=None))]
    fn new(
        num_vehicles: usize,
        num_agents: usize,
        route_id: String,
        install_path: Option<PathBuf>,
        action_policy: &str,
        engine_options: Option<Vec<String>>,
    ) -> PyResult<Self> {
        let mut engine = match install_path {
            Some(path) => EngineConfig::new(path),
            None => EngineConfig::from_env(),
        };
        engine.options = engine_options.unwrap_or_default();

        let config = EnvConfig::new(ScenarioConfig::new(num_vehicles, num_agents, route_id))
            .with_engine(engine)
            .with_action_policy(parse_policy(action_policy)?);
        let inner = TrafficEnv::new(config, PyEngineLauncher).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[getter]
    fn observation_shape(&self) -> (usize,) {
        (self.inner.observation_space().len(),)
    }

    #[getter]
    fn action_bounds(&self) -> (f32, f32) {
        let space = self.inner.action_space();
        (space.low()[0], space.high()[0])
    }

    #[pyo3(signature = (seed=None, options=None))]
    fn reset(
        &mut self,
        py: Python<'_>,
        seed: Option<u64>,
        options: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<(Vec<f32>, Py<PyDict>)> {
        let mut info = Info::new();
        if let Some(options) = options {
            if let Some(rebuild) = options.get_item(REBUILD_OPTION)? {
                info.insert(REBUILD_OPTION.into(), rebuild.extract::<bool>()?.into());
            }
        }
        let (obs, _) = self.inner.reset(seed, Some(&info)).map_err(to_py_err)?;
        Ok((obs, PyDict::new(py).unbind()))
    }

    fn step(
        &mut self,
        py: Python<'_>,
        action: &Bound<'_, PyAny>,
    ) -> PyResult<(Vec<f32>, f32, bool, Py<PyDict>)> {
        let action = match action.extract::<f32>() {
            Ok(value) => Action(value),
            Err(_) => {
                let values: Vec<f32> = action.extract()?;
                Action::try_from(values.as_slice()).map_err(to_py_err)?
            }
        };
        let (obs, reward, terminated, _) = self.inner.step(action).map_err(to_py_err)?;
        Ok((obs, reward, terminated, PyDict::new(py).unbind()))
    }

    #[pyo3(signature = (mode="console"))]
    fn render(&self, mode: &str) -> PyResult<()> {
        self.inner.render(mode).map_err(to_py_err)
    }

    fn close(&mut self) -> PyResult<()> {
        self.inner.close().map_err(to_py_err)
    }
}

/// The name of this function must match the lib.name in Cargo.toml
#[pymodule]
fn traffic_gym(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTrafficEnv>()?;
    Ok(())
}
