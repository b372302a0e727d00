// bindings/python/src/lumpers.rs
use msmlump_lumping::{
    Bace, BaceOptions, LandmarkStrategy, Lumper, Mvca, MvcaOptions, Objective, Pcca, PccaOptions,
    PccaPlus, PccaPlusOptions,
};
use msmlump_msm::{MapMode, MsmConfig};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::msm::{config_from_args, parse_mode, rows, PyMarkovStateModel};
use crate::to_py_err;

fn fitted<T>(inner: &Option<T>) -> PyResult<&T> {
    inner
        .as_ref()
        .ok_or_else(|| PyRuntimeError::new_err("lumper is not fitted; call fit() first"))
}

fn transform_with<T: Lumper<Label = i64>>(
    lumper: &T,
    py: Python<'_>,
    sequences: Vec<Vec<i64>>,
    mode: &str,
) -> PyResult<PyObject> {
    match parse_mode(mode)? {
        MapMode::Clip => Ok(lumper.transform_clip(&sequences).into_py(py)),
        MapMode::Fill => Ok(lumper.transform_fill(&sequences).into_py(py)),
    }
}

fn partial_transform_with<T: Lumper<Label = i64>>(
    lumper: &T,
    py: Python<'_>,
    sequence: Vec<i64>,
    mode: &str,
) -> PyResult<PyObject> {
    match parse_mode(mode)? {
        MapMode::Clip => Ok(lumper.partial_transform_clip(&sequence).into_py(py)),
        MapMode::Fill => Ok(lumper.partial_transform_fill(&sequence).into_py(py)),
    }
}

fn msm_of<T: Lumper<Label = i64>>(lumper: &T) -> PyMarkovStateModel {
    PyMarkovStateModel {
        config: lumper.msm().config().clone(),
        inner: Some(lumper.msm().clone()),
    }
}

// ─────────────────────────────────────────────────────────────────────
// PCCA
// ─────────────────────────────────────────────────────────────────────

/// Perron cluster cluster analysis.
#[pyclass(module = "_msmlump", name = "PCCA")]
pub struct PyPcca {
    config: MsmConfig,
    n_macrostates: usize,
    options: PccaOptions,
    inner: Option<Pcca<i64>>,
}

#[pymethods]
impl PyPcca {
    #[new]
    #[pyo3(signature = (
        n_macrostates,
        pcca_tolerance = 1e-5,
        lag_time = 1,
        n_timescales = None,
        reversible_type = "mle",
        ergodic_cutoff = None,
        prior_counts = 0.0,
        sliding_window = true,
        verbose = true
    ))]
    fn new(
        n_macrostates: usize,
        pcca_tolerance: f64,
        lag_time: usize,
        n_timescales: Option<usize>,
        reversible_type: &str,
        ergodic_cutoff: Option<&PyAny>,
        prior_counts: f64,
        sliding_window: bool,
        verbose: bool,
    ) -> PyResult<Self> {
        Ok(PyPcca {
            config: config_from_args(
                lag_time,
                n_timescales,
                reversible_type,
                ergodic_cutoff,
                prior_counts,
                sliding_window,
                verbose,
            )?,
            n_macrostates,
            options: PccaOptions { pcca_tolerance },
            inner: None,
        })
    }

    fn fit(mut slf: PyRefMut<'_, Self>, sequences: Vec<Vec<i64>>) -> PyResult<PyRefMut<'_, Self>> {
        let lumper = Pcca::fit(&slf.config, &sequences, slf.n_macrostates, slf.options.clone())
            .map_err(to_py_err)?;
        slf.inner = Some(lumper);
        Ok(slf)
    }

    #[staticmethod]
    #[pyo3(signature = (msm, n_macrostates, pcca_tolerance = 1e-5))]
    fn from_msm(msm: &PyMarkovStateModel, n_macrostates: usize, pcca_tolerance: f64) -> PyResult<Self> {
        let options = PccaOptions { pcca_tolerance };
        let lumper = Pcca::from_msm(msm.fitted()?.clone(), n_macrostates, options.clone())
            .map_err(to_py_err)?;
        Ok(PyPcca {
            config: msm.config.clone(),
            n_macrostates,
            options,
            inner: Some(lumper),
        })
    }

    #[getter]
    fn microstate_mapping_(&self) -> PyResult<Vec<usize>> {
        Ok(fitted(&self.inner)?.microstate_mapping().to_vec())
    }

    #[getter]
    fn msm_(&self) -> PyResult<PyMarkovStateModel> {
        Ok(msm_of(fitted(&self.inner)?))
    }

    #[getter]
    fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }

    fn macrostate_populations(&self) -> PyResult<Vec<f64>> {
        Ok(fitted(&self.inner)?.macrostate_populations())
    }

    #[pyo3(signature = (sequence, mode = "clip"))]
    fn partial_transform(&self, py: Python<'_>, sequence: Vec<i64>, mode: &str) -> PyResult<PyObject> {
        partial_transform_with(fitted(&self.inner)?, py, sequence, mode)
    }

    #[pyo3(signature = (sequences, mode = "clip"))]
    fn transform(&self, py: Python<'_>, sequences: Vec<Vec<i64>>, mode: &str) -> PyResult<PyObject> {
        transform_with(fitted(&self.inner)?, py, sequences, mode)
    }
}

// ─────────────────────────────────────────────────────────────────────
// PCCA+
// ─────────────────────────────────────────────────────────────────────

fn parse_objective(name: &str) -> PyResult<Objective> {
    match name {
        "metastability" => Ok(Objective::Metastability),
        "crisp_metastability" => Ok(Objective::CrispMetastability),
        "crispness" => Ok(Objective::Crispness),
        other => Err(PyValueError::new_err(format!(
            "objective must be 'metastability', 'crisp_metastability' or 'crispness', got '{}'",
            other
        ))),
    }
}

/// Robust Perron cluster analysis.
#[pyclass(module = "_msmlump", name = "PCCAPlus")]
pub struct PyPccaPlus {
    config: MsmConfig,
    n_macrostates: usize,
    options: PccaPlusOptions,
    inner: Option<PccaPlus<i64>>,
}

#[pymethods]
impl PyPccaPlus {
    #[new]
    #[pyo3(signature = (
        n_macrostates,
        do_minimization = true,
        objective_function = "crisp_metastability",
        random_state = None,
        lag_time = 1,
        n_timescales = None,
        reversible_type = "mle",
        ergodic_cutoff = None,
        prior_counts = 0.0,
        sliding_window = true,
        verbose = true
    ))]
    fn new(
        n_macrostates: usize,
        do_minimization: bool,
        objective_function: &str,
        random_state: Option<u64>,
        lag_time: usize,
        n_timescales: Option<usize>,
        reversible_type: &str,
        ergodic_cutoff: Option<&PyAny>,
        prior_counts: f64,
        sliding_window: bool,
        verbose: bool,
    ) -> PyResult<Self> {
        Ok(PyPccaPlus {
            config: config_from_args(
                lag_time,
                n_timescales,
                reversible_type,
                ergodic_cutoff,
                prior_counts,
                sliding_window,
                verbose,
            )?,
            n_macrostates,
            options: PccaPlusOptions {
                do_minimization,
                objective: parse_objective(objective_function)?,
                random_state,
                ..Default::default()
            },
            inner: None,
        })
    }

    fn fit(mut slf: PyRefMut<'_, Self>, sequences: Vec<Vec<i64>>) -> PyResult<PyRefMut<'_, Self>> {
        let lumper = PccaPlus::fit(&slf.config, &sequences, slf.n_macrostates, slf.options.clone())
            .map_err(to_py_err)?;
        slf.inner = Some(lumper);
        Ok(slf)
    }

    #[staticmethod]
    #[pyo3(signature = (
        msm,
        n_macrostates,
        do_minimization = true,
        objective_function = "crisp_metastability",
        random_state = None
    ))]
    fn from_msm(
        msm: &PyMarkovStateModel,
        n_macrostates: usize,
        do_minimization: bool,
        objective_function: &str,
        random_state: Option<u64>,
    ) -> PyResult<Self> {
        let options = PccaPlusOptions {
            do_minimization,
            objective: parse_objective(objective_function)?,
            random_state,
            ..Default::default()
        };
        let lumper = PccaPlus::from_msm(msm.fitted()?.clone(), n_macrostates, options.clone())
            .map_err(to_py_err)?;
        Ok(PyPccaPlus {
            config: msm.config.clone(),
            n_macrostates,
            options,
            inner: Some(lumper),
        })
    }

    #[getter]
    fn microstate_mapping_(&self) -> PyResult<Vec<usize>> {
        Ok(fitted(&self.inner)?.microstate_mapping().to_vec())
    }

    #[getter]
    fn msm_(&self) -> PyResult<PyMarkovStateModel> {
        Ok(msm_of(fitted(&self.inner)?))
    }

    #[getter]
    fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }

    #[getter]
    fn chi_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(fitted(&self.inner)?.chi()))
    }

    #[getter]
    fn A_(&self) -> PyResult<Vec<Vec<f64>>> {
        Ok(rows(fitted(&self.inner)?.a()))
    }

    fn macrostate_populations(&self) -> PyResult<Vec<f64>> {
        Ok(fitted(&self.inner)?.macrostate_populations())
    }

    #[pyo3(signature = (sequence, mode = "clip"))]
    fn partial_transform(&self, py: Python<'_>, sequence: Vec<i64>, mode: &str) -> PyResult<PyObject> {
        partial_transform_with(fitted(&self.inner)?, py, sequence, mode)
    }

    #[pyo3(signature = (sequences, mode = "clip"))]
    fn transform(&self, py: Python<'_>, sequences: Vec<Vec<i64>>, mode: &str) -> PyResult<PyObject> {
        transform_with(fitted(&self.inner)?, py, sequences, mode)
    }
}

// ─────────────────────────────────────────────────────────────────────
// BACE
// ─────────────────────────────────────────────────────────────────────

/// Bayesian agglomerative clustering engine.
#[pyclass(module = "_msmlump", name = "BACE")]
pub struct PyBace {
    config: MsmConfig,
    n_macrostates: usize,
    options: BaceOptions,
    inner: Option<Bace<i64>>,
}

#[pymethods]
impl PyBace {
    #[new]
    #[pyo3(signature = (
        n_macrostates,
        filter = 1.1,
        save_all_maps = true,
        n_proc = 1,
        chunk_size = 100,
        lag_time = 1,
        n_timescales = None,
        reversible_type = "mle",
        ergodic_cutoff = None,
        prior_counts = 0.0,
        sliding_window = true,
        verbose = true
    ))]
    fn new(
        n_macrostates: usize,
        filter: f64,
        save_all_maps: bool,
        n_proc: usize,
        chunk_size: usize,
        lag_time: usize,
        n_timescales: Option<usize>,
        reversible_type: &str,
        ergodic_cutoff: Option<&PyAny>,
        prior_counts: f64,
        sliding_window: bool,
        verbose: bool,
    ) -> PyResult<Self> {
        Ok(PyBace {
            config: config_from_args(
                lag_time,
                n_timescales,
                reversible_type,
                ergodic_cutoff,
                prior_counts,
                sliding_window,
                verbose,
            )?,
            n_macrostates,
            options: BaceOptions {
                filter,
                save_all_maps,
                n_proc,
                chunk_size,
            },
            inner: None,
        })
    }

    fn fit(mut slf: PyRefMut<'_, Self>, sequences: Vec<Vec<i64>>) -> PyResult<PyRefMut<'_, Self>> {
        let lumper = Bace::fit(&slf.config, &sequences, slf.n_macrostates, slf.options.clone())
            .map_err(to_py_err)?;
        slf.inner = Some(lumper);
        Ok(slf)
    }

    #[staticmethod]
    #[pyo3(signature = (msm, n_macrostates, filter = 1.1, save_all_maps = true, n_proc = 1, chunk_size = 100))]
    fn from_msm(
        msm: &PyMarkovStateModel,
        n_macrostates: usize,
        filter: f64,
        save_all_maps: bool,
        n_proc: usize,
        chunk_size: usize,
    ) -> PyResult<Self> {
        let options = BaceOptions {
            filter,
            save_all_maps,
            n_proc,
            chunk_size,
        };
        let lumper = Bace::from_msm(msm.fitted()?.clone(), n_macrostates, options.clone())
            .map_err(to_py_err)?;
        Ok(PyBace {
            config: msm.config.clone(),
            n_macrostates,
            options,
            inner: Some(lumper),
        })
    }

    #[getter]
    fn microstate_mapping_(&self) -> PyResult<Vec<usize>> {
        Ok(fitted(&self.inner)?.microstate_mapping().to_vec())
    }

    #[getter]
    fn msm_(&self) -> PyResult<PyMarkovStateModel> {
        Ok(msm_of(fitted(&self.inner)?))
    }

    #[getter]
    fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }

    #[getter]
    fn bayes_factors(&self) -> PyResult<Vec<(usize, f64)>> {
        Ok(fitted(&self.inner)?
            .bayes_factors()
            .iter()
            .map(|(&k, &v)| (k, v))
            .collect())
    }

    #[getter]
    fn map_dict(&self) -> PyResult<Vec<(usize, Vec<usize>)>> {
        Ok(fitted(&self.inner)?
            .map_dict()
            .iter()
            .map(|(&k, v)| (k, v.clone()))
            .collect())
    }

    fn macrostate_populations(&self) -> PyResult<Vec<f64>> {
        Ok(fitted(&self.inner)?.macrostate_populations())
    }

    #[pyo3(signature = (sequence, mode = "clip"))]
    fn partial_transform(&self, py: Python<'_>, sequence: Vec<i64>, mode: &str) -> PyResult<PyObject> {
        partial_transform_with(fitted(&self.inner)?, py, sequence, mode)
    }

    #[pyo3(signature = (sequences, mode = "clip"))]
    fn transform(&self, py: Python<'_>, sequences: Vec<Vec<i64>>, mode: &str) -> PyResult<PyObject> {
        transform_with(fitted(&self.inner)?, py, sequences, mode)
    }
}

// ─────────────────────────────────────────────────────────────────────
// MVCA
// ─────────────────────────────────────────────────────────────────────

fn mvca_options(
    n_landmarks: Option<usize>,
    landmark_strategy: &str,
    random_state: Option<u64>,
    get_linkage: bool,
    fit_only: bool,
) -> PyResult<MvcaOptions> {
    let landmark_strategy = match landmark_strategy {
        "stride" => LandmarkStrategy::Stride,
        "random" => LandmarkStrategy::Random,
        other => {
            return Err(PyValueError::new_err(format!(
                "landmark_strategy must be 'stride' or 'random', got '{}'",
                other
            )))
        }
    };
    Ok(MvcaOptions {
        n_landmarks,
        landmark_strategy,
        random_state,
        get_linkage,
        fit_only,
    })
}

/// Minimum variance cluster analysis.
#[pyclass(module = "_msmlump", name = "MVCA")]
pub struct PyMvca {
    config: MsmConfig,
    n_macrostates: usize,
    options: MvcaOptions,
    inner: Option<Mvca<i64>>,
}

#[pymethods]
impl PyMvca {
    #[new]
    #[pyo3(signature = (
        n_macrostates,
        n_landmarks = None,
        landmark_strategy = "stride",
        random_state = None,
        get_linkage = false,
        fit_only = false,
        lag_time = 1,
        n_timescales = None,
        reversible_type = "mle",
        ergodic_cutoff = None,
        prior_counts = 0.0,
        sliding_window = true,
        verbose = true
    ))]
    fn new(
        n_macrostates: usize,
        n_landmarks: Option<usize>,
        landmark_strategy: &str,
        random_state: Option<u64>,
        get_linkage: bool,
        fit_only: bool,
        lag_time: usize,
        n_timescales: Option<usize>,
        reversible_type: &str,
        ergodic_cutoff: Option<&PyAny>,
        prior_counts: f64,
        sliding_window: bool,
        verbose: bool,
    ) -> PyResult<Self> {
        Ok(PyMvca {
            config: config_from_args(
                lag_time,
                n_timescales,
                reversible_type,
                ergodic_cutoff,
                prior_counts,
                sliding_window,
                verbose,
            )?,
            n_macrostates,
            options: mvca_options(
                n_landmarks,
                landmark_strategy,
                random_state,
                get_linkage,
                fit_only,
            )?,
            inner: None,
        })
    }

    fn fit(mut slf: PyRefMut<'_, Self>, sequences: Vec<Vec<i64>>) -> PyResult<PyRefMut<'_, Self>> {
        let lumper = Mvca::fit(&slf.config, &sequences, slf.n_macrostates, slf.options.clone())
            .map_err(to_py_err)?;
        slf.inner = Some(lumper);
        Ok(slf)
    }

    #[staticmethod]
    #[pyo3(signature = (
        msm,
        n_macrostates,
        n_landmarks = None,
        landmark_strategy = "stride",
        random_state = None,
        get_linkage = false,
        fit_only = false
    ))]
    fn from_msm(
        msm: &PyMarkovStateModel,
        n_macrostates: usize,
        n_landmarks: Option<usize>,
        landmark_strategy: &str,
        random_state: Option<u64>,
        get_linkage: bool,
        fit_only: bool,
    ) -> PyResult<Self> {
        let options = mvca_options(
            n_landmarks,
            landmark_strategy,
            random_state,
            get_linkage,
            fit_only,
        )?;
        let lumper = Mvca::from_msm(msm.fitted()?.clone(), n_macrostates, options.clone())
            .map_err(to_py_err)?;
        Ok(PyMvca {
            config: msm.config.clone(),
            n_macrostates,
            options,
            inner: Some(lumper),
        })
    }

    #[getter]
    fn microstate_mapping_(&self) -> PyResult<Vec<usize>> {
        Ok(fitted(&self.inner)?.microstate_mapping().to_vec())
    }

    #[getter]
    fn msm_(&self) -> PyResult<PyMarkovStateModel> {
        Ok(msm_of(fitted(&self.inner)?))
    }

    #[getter]
    fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }

    /// Rows of `[a, b, distance, size]`, or None without `get_linkage`.
    #[getter]
    fn linkage(&self) -> PyResult<Option<Vec<(usize, usize, f64, usize)>>> {
        Ok(fitted(&self.inner)?
            .linkage()
            .map(|l| l.iter().map(|m| (m.a, m.b, m.distance, m.size)).collect()))
    }

    #[getter]
    fn elbow_data(&self) -> PyResult<Option<Vec<f64>>> {
        Ok(fitted(&self.inner)?.elbow_data())
    }

    fn macrostate_populations(&self) -> PyResult<Vec<f64>> {
        Ok(fitted(&self.inner)?.macrostate_populations())
    }

    #[pyo3(signature = (sequence, mode = "clip"))]
    fn partial_transform(&self, py: Python<'_>, sequence: Vec<i64>, mode: &str) -> PyResult<PyObject> {
        partial_transform_with(fitted(&self.inner)?, py, sequence, mode)
    }

    #[pyo3(signature = (sequences, mode = "clip"))]
    fn transform(&self, py: Python<'_>, sequences: Vec<Vec<i64>>, mode: &str) -> PyResult<PyObject> {
        transform_with(fitted(&self.inner)?, py, sequences, mode)
    }
}
