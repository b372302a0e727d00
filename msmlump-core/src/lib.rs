//! # msmlump-core
//!
//! Shared building blocks for the msmlump crates.
//!
//! This crate provides:
//! - **Matrix**: row-major dense `f64` matrix used for count matrices,
//!   transition matrices and eigenvector blocks.
//! - **SplitMix64**: deterministic PRNG for seeded sampling and optimizers.
//! - **Parallel execution**: scoped-thread helpers for data-parallel loops.
//! - **Error**: the error type returned by every fallible msmlump operation.

pub mod error;
pub mod matrix;
pub mod parallel;
pub mod rng;

pub use error::{Error, Result};
pub use matrix::Matrix;
pub use parallel::{parallel_for_chunks, parallel_map_chunks};
pub use rng::SplitMix64;
