//! PCCA: Perron cluster cluster analysis by eigenvector sign structure.
//!
//! Each non-stationary right eigenvector splits one existing macrostate in
//! two. Eigenvector `i` picks the macrostate over which it varies most and
//! moves that macrostate's members on the positive side into a new
//! macrostate `i + 1`.
//!
//! Deuflhard et al., Linear Algebra Appl. 315, 39 (2000).

use msmlump_core::Result;
use msmlump_msm::{MarkovStateModel, MsmConfig, StateLabel};
use serde::{Deserialize, Serialize};

use crate::lumper::{check_n_macrostates, check_timescales, spectral_config, Lumper};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PccaOptions {
    /// Eigenvector components at or above this value count as positive.
    pub pcca_tolerance: f64,
}

impl Default for PccaOptions {
    fn default() -> Self {
        PccaOptions {
            pcca_tolerance: 1e-5,
        }
    }
}

/// Spectral lumping by successive eigenvector splits.
#[derive(Debug, Clone)]
pub struct Pcca<L> {
    msm: MarkovStateModel<L>,
    n_macrostates: usize,
    options: PccaOptions,
    microstate_mapping: Vec<usize>,
}

impl<L: StateLabel> Pcca<L> {
    /// Fit a microstate model to `sequences` and lump it.
    pub fn fit<S: AsRef<[L]>>(
        config: &MsmConfig,
        sequences: &[S],
        n_macrostates: usize,
        options: PccaOptions,
    ) -> Result<Self> {
        let msm = MarkovStateModel::fit(&spectral_config(config, n_macrostates), sequences)?;
        Self::from_msm(msm, n_macrostates, options)
    }

    /// Lump an already fitted model.
    pub fn from_msm(
        msm: MarkovStateModel<L>,
        n_macrostates: usize,
        options: PccaOptions,
    ) -> Result<Self> {
        check_n_macrostates(n_macrostates, msm.n_states())?;
        check_timescales(&msm, n_macrostates)?;
        let microstate_mapping = split_by_sign(&msm, n_macrostates, options.pcca_tolerance);
        if msm.config().verbose {
            tracing::info!(n_macrostates, n_states = msm.n_states(), "PCCA lumping done");
        }
        Ok(Pcca {
            msm,
            n_macrostates,
            options,
            microstate_mapping,
        })
    }

    pub fn options(&self) -> &PccaOptions {
        &self.options
    }
}

fn split_by_sign<L: StateLabel>(
    msm: &MarkovStateModel<L>,
    n_macrostates: usize,
    tolerance: f64,
) -> Vec<usize> {
    let n = msm.n_states();
    let right = msm.right_eigenvectors();
    let mut mapping = vec![0usize; n];

    for i in 0..n_macrostates - 1 {
        let v = right.column(i + 1);

        let mut best = 0;
        let mut best_spread = f64::NEG_INFINITY;
        for k in 0..=i {
            let (lo, hi) = (0..n)
                .filter(|&s| mapping[s] == k)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                    (lo.min(v[s]), hi.max(v[s]))
                });
            // An emptied macrostate has no spread.
            let spread = if hi >= lo { hi - lo } else { f64::NEG_INFINITY };
            if spread > best_spread {
                best_spread = spread;
                best = k;
            }
        }

        for s in 0..n {
            if mapping[s] == best && v[s] >= tolerance {
                mapping[s] = i + 1;
            }
        }
    }
    mapping
}

impl<L: StateLabel> Lumper for Pcca<L> {
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

#[cfg(test)]
mod tests {
    use super::*;

    /// Two wells {0, 1} and {2, 3} with a slow crossing between 1 and 2.
    fn two_wells() -> Vec<Vec<u32>> {
        let mut seq = Vec::new();
        for _ in 0..20 {
            seq.extend([0, 1, 0, 1, 1, 0, 0, 1]);
            seq.extend([2, 3, 3, 2, 2, 3, 2, 3]);
        }
        vec![seq]
    }

    #[test]
    fn test_two_wells_split() {
        let cfg = MsmConfig::default().quiet();
        let pcca = Pcca::fit(&cfg, &two_wells(), 2, PccaOptions::default()).unwrap();
        let m = pcca.microstate_mapping();
        assert_eq!(m[0], m[1]);
        assert_eq!(m[2], m[3]);
        assert_ne!(m[0], m[2]);
        let pops = pcca.macrostate_populations();
        assert!((pops.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_single_macrostate() {
        let cfg = MsmConfig::default().quiet();
        let pcca = Pcca::fit(&cfg, &two_wells(), 1, PccaOptions::default()).unwrap();
        assert!(pcca.microstate_mapping().iter().all(|&m| m == 0));
    }

    #[test]
    fn test_too_few_timescales() {
        let cfg = MsmConfig::default().quiet().with_n_timescales(1);
        let msm = MarkovStateModel::fit(&cfg, &two_wells()).unwrap();
        assert!(Pcca::from_msm(msm.clone(), 3, PccaOptions::default()).is_err());
        assert!(Pcca::from_msm(msm, 2, PccaOptions::default()).is_ok());
    }

    #[test]
    fn test_transform_to_macrostates() {
        let cfg = MsmConfig::default().quiet();
        let pcca = Pcca::fit(&cfg, &two_wells(), 2, PccaOptions::default()).unwrap();
        let out = pcca.transform_fill(&[vec![0u32, 3, 9]]);
        let m = pcca.microstate_mapping();
        assert_eq!(out, vec![vec![Some(m[0]), Some(m[3]), None]]);
    }
}
