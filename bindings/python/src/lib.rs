// bindings/python/src/lib.rs

#![allow(non_local_definitions)]
#![allow(non_snake_case)]
#![allow(clippy::too_many_arguments)]

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

mod lumpers;
mod msm;

use lumpers::{PyBace, PyMvca, PyPcca, PyPccaPlus};
use msm::PyMarkovStateModel;

pub(crate) fn to_py_err(e: msmlump_core::Error) -> PyErr {
    match e {
        msmlump_core::Error::Io(_) => PyIOError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

#[pymodule]
fn _msmlump(_py: Python, m: &PyModule) -> PyResult<()> {
    // Microstate model
    m.add_class::<PyMarkovStateModel>()?;

    // Lumpers
    m.add_class::<PyPcca>()?;
    m.add_class::<PyPccaPlus>()?;
    m.add_class::<PyBace>()?;
    m.add_class::<PyMvca>()?;

    m.add("__all__", vec!["PCCA", "PCCAPlus", "BACE", "MVCA"])?;
    Ok(())
}
