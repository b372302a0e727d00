// bindings/python/src/msm.rs
use std::collections::BTreeMap;

use msmlump_core::Matrix;
use msmlump_msm::{
    ErgodicCutoff, MapMode, MarkovStateModel, MsmConfig, ReversibleType, StartState,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::to_py_err;

pub(crate) type Model = MarkovStateModel<i64>;

pub(crate) fn rows(m: &Matrix) -> Vec<Vec<f64>> {
    (0..m.rows()).map(|i| m.row(i).to_vec()).collect()
}

/// Build an `MsmConfig` from Python keyword arguments.
pub(crate) fn config_from_args(
    lag_time: usize,
    n_timescales: Option<usize>,
    reversible_type: &str,
    ergodic_cutoff: Option<&PyAny>,
    prior_counts: f64,
    sliding_window: bool,
    verbose: bool,
) -> PyResult<MsmConfig> {
    let reversible_type = match reversible_type {
        "mle" => ReversibleType::Mle,
        "transpose" => ReversibleType::Transpose,
        "none" => ReversibleType::None,
        other => {
            return Err(PyValueError::new_err(format!(
                "reversible_type must be 'mle', 'transpose' or 'none', got '{}'",
                other
            )))
        }
    };
    let ergodic_cutoff = match ergodic_cutoff {
        None => ErgodicCutoff::On,
        Some(value) => parse_cutoff(value)?,
    };
    Ok(MsmConfig {
        lag_time,
        n_timescales,
        reversible_type,
        ergodic_cutoff,
        prior_counts,
        sliding_window,
        verbose,
    })
}

/// `'on'`, `'off'` or a numeric threshold.
fn parse_cutoff(value: &PyAny) -> PyResult<ErgodicCutoff> {
    if let Ok(s) = value.extract::<&str>() {
        match s {
            "on" => Ok(ErgodicCutoff::On),
            "off" => Ok(ErgodicCutoff::Off),
            other => Err(PyValueError::new_err(format!(
                "ergodic_cutoff must be 'on', 'off' or a number, got '{}'",
                other
            ))),
        }
    } else {
        Ok(ErgodicCutoff::Value(value.extract::<f64>()?))
    }
}

/// Reversible Markov state model over integer-labelled trajectories.
#[pyclass(module = "_msmlump", name = "MarkovStateModel")]
#[derive(Clone)]
pub struct PyMarkovStateModel {
    pub(crate) config: MsmConfig,
    pub(crate) inner: Option<Model>,
}

impl PyMarkovStateModel {
    pub(crate) fn fitted(&self) -> PyResult<&Model> {
        self.inner
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("model is not fitted; call fit() first"))
    }
}

#[pymethods]
impl PyMarkovStateModel {
    #[new]
    #[pyo3(signature = (
        lag_time = 1,
        n_timescales = None,
        reversible_type = "mle",
        ergodic_cutoff = None,
        prior_counts = 0.0,
        sliding_window = true,
        verbose = true
    ))]
    fn new(
        lag_time: usize,
        n_timescales: Option<usize>,
        reversible_type: &str,
        ergodic_cutoff: Option<&PyAny>,
        prior_counts: f64,
        sliding_window: bool,
        verbose: bool,
    ) -> PyResult<Self> {
        let config = config_from_args(
            lag_time,
            n_timescales,
            reversible_type,
            ergodic_cutoff,
            prior_counts,
            sliding_window,
            verbose,
        )?;
        Ok(PyMarkovStateModel {
            config,
            inner: None,
        })
    }

    fn fit(mut slf: PyRefMut<'_, Self>, sequences: Vec<Vec<i64>>) -> PyResult<PyRefMut<'_, Self>> {
        let model = MarkovStateModel::fit(&slf.config, &sequences).map_err(to_py_err)?;
        slf.inner = Some(model);
        Ok(slf)
    }

    #[getter]
    fn n_states_(&self) -> PyResult<usize> {
        Ok(self.fitted()?.n_states())
    }

    #[getter]
    fn mapping_(&self) -> PyResult<BTreeMap<i64, usize>> {
        Ok(self.fitted()?.mapping())
    }

    #[getter]
    fn countsmat_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(self.fitted()?.countsmat()))
    }

    #[getter]
    fn transmat_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(self.fitted()?.transmat()))
    }

    #[getter]
    fn populations_(&self) -> PyResult<Vec<f64>> {
        Ok(self.fitted()?.populations().to_vec())
    }

    #[getter]
    fn eigenvalues_(&self) -> PyResult<Vec<f64>> {
        Ok(self.fitted()?.eigenvalues().to_vec())
    }

    #[getter]
    fn eigenvalues_imag_(&self) -> PyResult<Vec<f64>> {
        Ok(self.fitted()?.eigenvalues_imag().to_vec())
    }

    #[getter]
    fn left_eigenvectors_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(self.fitted()?.left_eigenvectors()))
    }

    #[getter]
    fn right_eigenvectors_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(self.fitted()?.right_eigenvectors()))
    }

    #[getter]
    fn timescales_(&self) -> PyResult<Vec<f64>> {
        Ok(self.fitted()?.timescales())
    }

    #[getter]
    fn percent_retained_(&self) -> PyResult<f64> {
        Ok(self.fitted()?.percent_retained())
    }

    #[getter]
    fn score_(&self) -> PyResult<f64> {
        Ok(self.fitted()?.training_score())
    }

    /// Map labels to state indices. `clip` splits at unknown labels, `fill`
    /// keeps them as None.
    #[pyo3(signature = (sequence, mode = "clip"))]
    fn partial_transform(&self, py: Python<'_>, sequence: Vec<i64>, mode: &str) -> PyResult<PyObject> {
        let model = self.fitted()?;
        match parse_mode(mode)? {
            MapMode::Clip => Ok(model.partial_transform_clip(&sequence).into_py(py)),
            MapMode::Fill => Ok(model.partial_transform_fill(&sequence).into_py(py)),
        }
    }

    #[pyo3(signature = (sequences, mode = "clip"))]
    fn transform(&self, py: Python<'_>, sequences: Vec<Vec<i64>>, mode: &str) -> PyResult<PyObject> {
        let model = self.fitted()?;
        match parse_mode(mode)? {
            MapMode::Clip => Ok(model.transform_clip(&sequences).into_py(py)),
            MapMode::Fill => Ok(model.transform_fill(&sequences).into_py(py)),
        }
    }

    fn inverse_transform(&self, sequences: Vec<Vec<usize>>) -> PyResult<Vec<Vec<i64>>> {
        self.fitted()?.inverse_transform(&sequences).map_err(to_py_err)
    }

    fn score(&self, sequences: Vec<Vec<i64>>) -> PyResult<f64> {
        self.fitted()?.score(&sequences).map_err(to_py_err)
    }

    fn score_ll(&self, sequences: Vec<Vec<i64>>) -> PyResult<f64> {
        Ok(self.fitted()?.score_ll(&sequences))
    }

    /// `state` is a start label, a list of start weights over state
    /// indices, or None for the stationary populations.
    #[pyo3(signature = (state = None, n_steps = 1000, random_state = None))]
    fn sample_discrete(
        &self,
        state: Option<&PyAny>,
        n_steps: usize,
        random_state: Option<u64>,
    ) -> PyResult<Vec<i64>> {
        let start = match state {
            None => None,
            Some(value) => match value.extract::<i64>() {
                Ok(label) => Some(StartState::Label(label)),
                Err(_) => Some(StartState::Distribution(value.extract::<Vec<f64>>()?)),
            },
        };
        self.fitted()?
            .sample_discrete(start.as_ref(), n_steps, random_state)
            .map_err(to_py_err)
    }

    #[pyo3(signature = (sequences, n_samples, random_state = None))]
    fn draw_samples(
        &self,
        sequences: Vec<Vec<usize>>,
        n_samples: usize,
        random_state: Option<u64>,
    ) -> PyResult<Vec<Vec<(usize, usize)>>> {
        self.fitted()?
            .draw_samples(&sequences, n_samples, random_state)
            .map_err(to_py_err)
    }

    fn summarize(&self) -> PyResult<String> {
        Ok(self.fitted()?.summarize())
    }

    fn save_json(&self, path: &str) -> PyResult<()> {
        self.fitted()?.save_json(path).map_err(to_py_err)
    }

    #[staticmethod]
    fn load_json(path: &str) -> PyResult<Self> {
        let model: Model = MarkovStateModel::load_json(path).map_err(to_py_err)?;
        Ok(PyMarkovStateModel {
            config: model.config().clone(),
            inner: Some(model),
        })
    }
}

pub(crate) fn parse_mode(mode: &str) -> PyResult<MapMode> {
    match mode {
        "clip" => Ok(MapMode::Clip),
        "fill" => Ok(MapMode::Fill),
        other => Err(PyValueError::new_err(format!(
            "mode must be 'clip' or 'fill', got '{}'",
            other
        ))),
    }
}
