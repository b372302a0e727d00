// Numeric kernels use index loops on packed arrays where iterators hurt readability.
#![allow(clippy::needless_range_loop)]

//! # msmlump-msm
//!
//! Markov state model estimation from discrete trajectories.
//!
//! ```text
//!   label sequences ──count──▶ C ──trim (SCC)──▶ C' ──estimate──▶ T, π
//!                                                  │
//!                              eigensystem ◀───────┘──▶ timescales, GMRQ
//! ```
//!
//! - **counts**: lagged transition counting and ergodic trimming
//! - **estimate**: reversible MLE, transpose and non-reversible estimators
//! - **eigensystem**: normalized left/right eigenvectors
//! - **model**: [`MarkovStateModel`], label mapping, scoring, sampling,
//!   JSON persistence
//! - **tpt**: committors, conditional committors and hub scores

pub mod config;
pub mod counts;
pub mod eigensystem;
pub mod estimate;
pub mod label;
pub mod model;
pub mod tpt;

pub use config::{ErgodicCutoff, MapMode, MsmConfig, ReversibleType};
pub use label::StateLabel;
pub use model::{draw_samples, MarkovStateModel, StartState};
pub use tpt::{committors, conditional_committors, fraction_visited, hub_scores};
