use crate::config;
use crate::layout::{CsrLayout, PaddedLayout};
use crate::verlet::{
    BuildOptions, FullNeighborTag, HalfNeighborTag, NeighborSemantics, VerletList,
};
use nalgebra::Vector3;
use numpy::{PyArrayMethods, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::ops::Range;

enum PositionData<'a> {
    Slice(&'a [Vector3<f64>]),
    Owned(Vec<Vector3<f64>>),
}

impl<'a> std::ops::Deref for PositionData<'a> {
    type Target = [Vector3<f64>];
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Slice(s) => s,
            Self::Owned(v) => v,
        }
    }
}

fn get_positions<'a>(positions: &'a PyReadonlyArray2<'a, f64>) -> PyResult<PositionData<'a>> {
    if positions.shape()[1] != 3 {
        return Err(pyo3::exceptions::PyValueError::new_err(
            "Positions must be (N, 3)",
        ));
    }

    if let Ok(slice) = positions.as_slice()
        && let Ok(cast_slice) = bytemuck::try_cast_slice(slice)
    {
        return Ok(PositionData::Slice(cast_slice));
    }

    // Non-contiguous input
    let pos_view = positions.as_array();
    let n_particles = pos_view.shape()[0];
    let mut pos_vec = Vec::with_capacity(n_particles);
    for row in pos_view.rows() {
        pos_vec.push(Vector3::new(row[0], row[1], row[2]));
    }
    Ok(PositionData::Owned(pos_vec))
}

/// Arguments shared by every layout/semantics combination.
struct BuildArgs {
    range: Range<usize>,
    radius: f64,
    ratio: f64,
    grid_min: [f64; 3],
    grid_max: [f64; 3],
    options: BuildOptions,
}

fn build_csr<'py, S: NeighborSemantics>(
    py: Python<'py>,
    positions: &[Vector3<f64>],
    args: BuildArgs,
) -> PyResult<Bound<'py, PyDict>> {
    let list = VerletList::<S, CsrLayout>::with_options(
        positions,
        args.range,
        args.radius,
        args.ratio,
        args.grid_min,
        args.grid_max,
        args.options,
    )
    .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;

    let layout = list.layout();
    let offsets: Vec<i64> = layout.offsets().iter().map(|&o| o as i64).collect();
    let neighbors: Vec<i64> = layout.neighbors().into_iter().map(|j| j as i64).collect();

    let dict = PyDict::new(py);
    dict.set_item("offsets", numpy::PyArray1::from_vec(py, offsets))?;
    dict.set_item("neighbors", numpy::PyArray1::from_vec(py, neighbors))?;
    Ok(dict)
}

fn build_padded<'py, S: NeighborSemantics>(
    py: Python<'py>,
    positions: &[Vector3<f64>],
    args: BuildArgs,
) -> PyResult<Bound<'py, PyDict>> {
    let list = VerletList::<S, PaddedLayout>::with_options(
        positions,
        args.range,
        args.radius,
        args.ratio,
        args.grid_min,
        args.grid_max,
        args.options,
    )
    .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;

    let layout = list.layout();
    let n_particles = layout.counts().len();
    let capacity = layout.capacity();
    let raw = layout.neighbors();

    // Unused slots read as -1 rather than whatever the last attempt left.
    let mut neighbors = vec![-1i64; n_particles * capacity];
    for (i, &count) in layout.counts().iter().enumerate() {
        let row = i * capacity;
        for n in 0..count {
            neighbors[row + n] = raw[row + n] as i64;
        }
    }
    let counts: Vec<i64> = layout.counts().iter().map(|&c| c as i64).collect();

    let dict = PyDict::new(py);
    dict.set_item("counts", numpy::PyArray1::from_vec(py, counts))?;
    dict.set_item(
        "neighbors",
        numpy::PyArray1::from_vec(py, neighbors).reshape((n_particles, capacity))?,
    )?;
    Ok(dict)
}

#[pyfunction]
#[pyo3(signature = (positions, radius, ratio, grid_min, grid_max, half=false, layout="csr", begin=None, end=None, capacity=None))]
#[allow(clippy::too_many_arguments)]
fn build_verlet_list<'py>(
    py: Python<'py>,
    positions: PyReadonlyArray2<'_, f64>,
    radius: f64,
    ratio: f64,
    grid_min: [f64; 3],
    grid_max: [f64; 3],
    half: bool,
    layout: &str,
    begin: Option<usize>,
    end: Option<usize>,
    capacity: Option<usize>,
) -> PyResult<Bound<'py, PyDict>> {
    let pos_data = get_positions(&positions)?;
    let n_particles = pos_data.len();

    let mut options = BuildOptions::default();
    if let Some(c) = capacity {
        options = options.with_capacity(c);
    }
    let args = BuildArgs {
        range: begin.unwrap_or(0)..end.unwrap_or(n_particles),
        radius,
        ratio,
        grid_min,
        grid_max,
        options,
    };

    match (layout, half) {
        ("csr", false) => build_csr::<FullNeighborTag>(py, &pos_data, args),
        ("csr", true) => build_csr::<HalfNeighborTag>(py, &pos_data, args),
        ("padded", false) => build_padded::<FullNeighborTag>(py, &pos_data, args),
        ("padded", true) => build_padded::<HalfNeighborTag>(py, &pos_data, args),
        (other, _) => Err(pyo3::exceptions::PyValueError::new_err(format!(
            "Unknown layout '{other}', expected 'csr' or 'padded'"
        ))),
    }
}

#[pyfunction]
fn get_num_threads() -> usize {
    rayon::current_num_threads()
}

#[pyfunction]
fn set_num_threads(n: usize) -> PyResult<()> {
    // build_global only succeeds once per process; later calls keep the
    // existing pool.
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global();
    Ok(())
}

#[pyfunction]
fn get_parallel_threshold() -> usize {
    config::get_parallel_threshold()
}

#[pyfunction]
fn set_parallel_threshold(val: usize) {
    config::set_parallel_threshold(val);
}

#[pyfunction]
fn get_max_build_attempts() -> usize {
    config::get_max_build_attempts()
}

#[pyfunction]
fn set_max_build_attempts(val: usize) {
    config::set_max_build_attempts(val);
}

#[pyfunction]
#[pyo3(name = "init_logging", signature = (level=None))]
fn py_init_logging(level: Option<String>) {
    crate::init_logging(level.as_deref());
}

#[pymodule]
fn verletlist_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(build_verlet_list, m)?)?;
    m.add_function(wrap_pyfunction!(get_num_threads, m)?)?;
    m.add_function(wrap_pyfunction!(set_num_threads, m)?)?;
    m.add_function(wrap_pyfunction!(get_parallel_threshold, m)?)?;
    m.add_function(wrap_pyfunction!(set_parallel_threshold, m)?)?;
    m.add_function(wrap_pyfunction!(get_max_build_attempts, m)?)?;
    m.add_function(wrap_pyfunction!(set_max_build_attempts, m)?)?;
    m.add_function(wrap_pyfunction!(py_init_logging, m)?)?;
    Ok(())
}
