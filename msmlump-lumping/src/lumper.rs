//! The interface shared by every lumping estimator.

use msmlump_core::{Error, Result};
use msmlump_msm::{MarkovStateModel, MsmConfig, StateLabel};

/// A coarse-graining of a fitted Markov state model into macrostates.
///
/// Implementors own the microstate model and a mapping from each of its
/// states to a macrostate. The provided methods map label trajectories
/// straight to macrostate trajectories.
pub trait Lumper {
    type Label: StateLabel;

    /// The microstate model that was lumped.
    fn msm(&self) -> &MarkovStateModel<Self::Label>;

    /// Macrostate index of every microstate, in the model's state order.
    fn microstate_mapping(&self) -> &[usize];

    /// Number of macrostates requested.
    fn n_macrostates(&self) -> usize;

    fn partial_transform_fill(&self, sequence: &[Self::Label]) -> Vec<Option<usize>> {
        let mapping = self.microstate_mapping();
        self.msm()
            .partial_transform_fill(sequence)
            .into_iter()
            .map(|s| s.map(|i| mapping[i]))
            .collect()
    }

    fn partial_transform_clip(&self, sequence: &[Self::Label]) -> Vec<Vec<usize>> {
        let mapping = self.microstate_mapping();
        self.msm()
            .partial_transform_clip(sequence)
            .into_iter()
            .map(|piece| piece.into_iter().map(|i| mapping[i]).collect())
            .collect()
    }

    fn transform_fill<S: AsRef<[Self::Label]>>(&self, sequences: &[S]) -> Vec<Vec<Option<usize>>>
    where
        Self: Sized,
    {
        sequences
            .iter()
            .map(|s| self.partial_transform_fill(s.as_ref()))
            .collect()
    }

    fn transform_clip<S: AsRef<[Self::Label]>>(&self, sequences: &[S]) -> Vec<Vec<usize>>
    where
        Self: Sized,
    {
        sequences
            .iter()
            .flat_map(|s| self.partial_transform_clip(s.as_ref()))
            .collect()
    }

    /// Stationary probability of each macrostate.
    fn macrostate_populations(&self) -> Vec<f64> {
        let mut pops = vec![0.0; self.n_macrostates()];
        for (&macro_state, &p) in self.microstate_mapping().iter().zip(self.msm().populations()) {
            if let Some(slot) = pops.get_mut(macro_state) {
                *slot += p;
            }
        }
        pops
    }
}

pub(crate) fn check_n_macrostates(n_macrostates: usize, n_states: usize) -> Result<()> {
    if n_macrostates == 0 || n_macrostates > n_states {
        return Err(Error::InvalidParameter(format!(
            "n_macrostates must be in 1..={}, got {}",
            n_states, n_macrostates
        )));
    }
    Ok(())
}

/// Spectral lumpers need at least `n_macrostates - 1` timescales.
pub(crate) fn spectral_config(config: &MsmConfig, n_macrostates: usize) -> MsmConfig {
    let needed = n_macrostates.saturating_sub(1);
    let mut cfg = config.clone();
    if let Some(t) = cfg.n_timescales {
        cfg.n_timescales = Some(t.max(needed));
    }
    cfg
}

pub(crate) fn check_timescales<L: StateLabel>(
    msm: &MarkovStateModel<L>,
    n_macrostates: usize,
) -> Result<()> {
    if msm.n_timescales() + 1 < n_macrostates {
        return Err(Error::InvalidParameter(format!(
            "model keeps {} timescales, lumping into {} macrostates needs {}",
            msm.n_timescales(),
            n_macrostates,
            n_macrostates - 1
        )));
    }
    Ok(())
}

/// Relabel so macrostate ids appear as 0, 1, 2, ... in microstate order.
pub(crate) fn contiguous_labels(raw: &[usize]) -> Vec<usize> {
    let mut seen: Vec<(usize, usize)> = Vec::new();
    raw.iter()
        .map(|&r| match seen.iter().find(|(old, _)| *old == r) {
            Some(&(_, new)) => new,
            None => {
                let new = seen.len();
                seen.push((r, new));
                new
            }
        })
        .collect()
}
