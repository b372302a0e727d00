//! MVCA: minimum variance cluster analysis.
//!
//! Rows of the transition matrix are compared with a [`RowMetric`] and
//! clustered by Ward linkage. With `n_landmarks` set, only a subset of rows
//! is clustered and every row then joins the cluster whose landmarks it is
//! closest to in mean squared distance.
//!
//! Husic & Pande, J. Chem. Phys. 147, 176101 (2017).

use msmlump_core::{Error, Result, SplitMix64};
use msmlump_msm::{MarkovStateModel, MsmConfig, StateLabel};
use serde::{Deserialize, Serialize};

use crate::linkage::{cut, pairwise, ward_linkage, Merge};
use crate::lumper::{check_n_macrostates, Lumper};
use crate::metric::{JensenShannon, RowMetric};

/// How landmark rows are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkStrategy {
    /// Every `n / n_landmarks`-th row.
    #[default]
    Stride,
    /// Distinct rows drawn uniformly at random.
    Random,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MvcaOptions {
    /// Cluster only this many rows; `None` clusters all of them.
    pub n_landmarks: Option<usize>,
    pub landmark_strategy: LandmarkStrategy,
    pub random_state: Option<u64>,
    /// Also build the dendrogram of all rows.
    pub get_linkage: bool,
    /// Take the linkage labels as the mapping instead of reassigning rows.
    /// Only applies when every row is a landmark.
    pub fit_only: bool,
}

/// Ward clustering of transition-matrix rows.
#[derive(Debug, Clone)]
pub struct Mvca<L> {
    msm: MarkovStateModel<L>,
    n_macrostates: usize,
    options: MvcaOptions,
    landmarks: Vec<usize>,
    microstate_mapping: Vec<usize>,
    linkage: Option<Vec<Merge>>,
}

impl<L: StateLabel> Mvca<L> {
    pub fn fit<S: AsRef<[L]>>(
        config: &MsmConfig,
        sequences: &[S],
        n_macrostates: usize,
        options: MvcaOptions,
    ) -> Result<Self> {
        let msm = MarkovStateModel::fit(config, sequences)?;
        Self::from_msm(msm, n_macrostates, options)
    }

    /// Lump with the square-root Jensen-Shannon metric.
    pub fn from_msm(
        msm: MarkovStateModel<L>,
        n_macrostates: usize,
        options: MvcaOptions,
    ) -> Result<Self> {
        Self::from_msm_with(msm, n_macrostates, options, &JensenShannon)
    }

    pub fn from_msm_with<M: RowMetric + ?Sized>(
        msm: MarkovStateModel<L>,
        n_macrostates: usize,
        options: MvcaOptions,
        metric: &M,
    ) -> Result<Self> {
        let n = msm.n_states();
        check_n_macrostates(n_macrostates, n)?;
        let landmarks = select_landmarks(n, n_macrostates, &options)?;
        let t = msm.transmat();

        let merges = ward_linkage(&pairwise(t, &landmarks, metric))?;
        let landmark_labels = cut(&merges, landmarks.len(), n_macrostates);

        let microstate_mapping = if options.fit_only && landmarks.len() == n {
            landmark_labels
        } else {
            (0..n)
                .map(|i| {
                    let mut sum = vec![0.0; n_macrostates];
                    let mut count = vec![0usize; n_macrostates];
                    for (&l, &c) in landmarks.iter().zip(&landmark_labels) {
                        let d = metric.distance(t.row(i), t.row(l));
                        sum[c] += d * d;
                        count[c] += 1;
                    }
                    let means: Vec<f64> = sum
                        .iter()
                        .zip(&count)
                        .map(|(s, &c)| if c > 0 { s / c as f64 } else { f64::INFINITY })
                        .collect();
                    argmin(&means)
                })
                .collect()
        };

        let linkage = if !options.get_linkage {
            None
        } else if landmarks.len() == n {
            Some(merges)
        } else {
            let all: Vec<usize> = (0..n).collect();
            Some(ward_linkage(&pairwise(t, &all, metric))?)
        };

        if msm.config().verbose {
            tracing::info!(
                n_macrostates,
                n_states = n,
                n_landmarks = landmarks.len(),
                "MVCA lumping done"
            );
        }
        Ok(Mvca {
            msm,
            n_macrostates,
            options,
            landmarks,
            microstate_mapping,
            linkage,
        })
    }

    /// Indices of the rows that were clustered.
    pub fn landmarks(&self) -> &[usize] {
        &self.landmarks
    }

    /// Full dendrogram of all rows, when `get_linkage` was set.
    pub fn linkage(&self) -> Option<&[Merge]> {
        self.linkage.as_deref()
    }

    /// Merge distances from the last merge to the first, for elbow plots.
    pub fn elbow_data(&self) -> Option<Vec<f64>> {
        self.linkage
            .as_ref()
            .map(|l| l.iter().rev().map(|m| m.distance).collect())
    }

    pub fn options(&self) -> &MvcaOptions {
        &self.options
    }
}

impl<L: StateLabel> Lumper for Mvca<L> {
    type Label = L;

    fn msm(&self) -> &MarkovStateModel<L> {
        &self.msm
    }

    fn microstate_mapping(&self) -> &[usize] {
        &self.microstate_mapping
    }

    fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }
}

fn select_landmarks(n: usize, n_macrostates: usize, options: &MvcaOptions) -> Result<Vec<usize>> {
    let Some(k) = options.n_landmarks else {
        return Ok((0..n).collect());
    };
    if k < n_macrostates || k > n {
        return Err(Error::InvalidParameter(format!(
            "n_landmarks must be in {}..={}, got {}",
            n_macrostates, n, k
        )));
    }
    let mut landmarks = match options.landmark_strategy {
        LandmarkStrategy::Stride => {
            let stride = (n / k).max(1);
            (0..n).step_by(stride).take(k).collect()
        }
        LandmarkStrategy::Random => {
            SplitMix64::from_optional_seed(options.random_state).choose_distinct(n, k)
        }
    };
    landmarks.sort_unstable();
    Ok(landmarks)
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| {
            if v < bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}
