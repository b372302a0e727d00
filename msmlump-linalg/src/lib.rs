// Numeric kernels use index loops on packed arrays where iterators hurt readability.
#![allow(clippy::needless_range_loop)]

//! # msmlump-linalg
//!
//! Pure Rust dense linear algebra for Markov state models.
//!
//! No FFI, no LAPACK dependency. Covers what MSM estimation and lumping need:
//!
//! - **LU**: factorization with partial pivoting, solves, inverse
//!   (committors, GMRQ scoring, PCCA+ vertex inversion)
//! - **Eigen**: cyclic Jacobi for symmetric matrices (reversible models),
//!   Hessenberg + Francis QR eigenvalues and inverse-iteration eigenvectors,
//!   real or complex, for general matrices (non-reversible models)
//! - **Optimize**: Nelder-Mead simplex and basin hopping, the derivative-free
//!   minimizers used by PCCA+

pub mod eigen;
pub mod lu;
pub mod optimize;

pub use eigen::{
    complex_eigenvector_for, eigenvector_for, eigenvectors_for, general_eigenvalues,
    symmetric_eigen, Complex, SymmetricEigen,
};
pub use lu::{inverse, lu_factor, solve, Lu};
pub use optimize::{basin_hopping, nelder_mead, BasinHoppingOptions, Minimum, NelderMeadOptions};
