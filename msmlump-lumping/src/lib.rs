// Numeric kernels use index loops on packed arrays where iterators hurt readability.
#![allow(clippy::needless_range_loop)]

//! # msmlump-lumping
//!
//! Coarse-graining of Markov state models into macrostates.
//!
//! Every lumper owns a fitted [`MarkovStateModel`](msmlump_msm::MarkovStateModel)
//! and a microstate → macrostate mapping, exposed through the [`Lumper`]
//! trait:
//!
//! - [`Pcca`]: sign structure of the leading right eigenvectors
//! - [`PccaPlus`]: fuzzy simplex memberships refined by basin hopping
//! - [`Bace`]: Bayesian agglomerative merging of count-matrix rows
//! - [`Mvca`]: Ward clustering of transition-matrix rows
//!
//! ```no_run
//! use msmlump_lumping::{Lumper, Pcca, PccaOptions};
//! use msmlump_msm::MsmConfig;
//!
//! let trajectories = vec![vec![0u32, 0, 1, 1, 0, 2, 3, 3, 2, 3]];
//! let pcca = Pcca::fit(&MsmConfig::default(), &trajectories, 2, PccaOptions::default())?;
//! let macro_trajectories = pcca.transform_fill(&trajectories);
//! # Ok::<(), msmlump_core::Error>(())
//! ```

pub mod bace;
pub mod linkage;
pub mod lumper;
pub mod metric;
pub mod mvca;
pub mod pcca;
pub mod pcca_plus;

pub use bace::{Bace, BaceOptions};
pub use linkage::Merge;
pub use lumper::Lumper;
pub use metric::{Euclidean, JensenShannon, RowMetric};
pub use mvca::{LandmarkStrategy, Mvca, MvcaOptions};
pub use pcca::{Pcca, PccaOptions};
pub use pcca_plus::{Objective, PccaPlus, PccaPlusOptions};
