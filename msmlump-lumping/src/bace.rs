//! BACE: Bayesian agglomerative clustering engine.
//!
//! Works on the count matrix rather than the spectrum. The divergence
//! between two states measures how much likelier it is that their outgoing
//! counts were drawn from two different distributions than from one. The
//! closest pair is merged until the requested number of macrostates is
//! left.
//!
//! Bowman, J. Chem. Phys. 137, 134111 (2012).

use std::collections::BTreeMap;

use msmlump_core::{parallel_map_chunks, Error, Matrix, Result};
use msmlump_msm::{MarkovStateModel, MsmConfig, StateLabel};
use serde::{Deserialize, Serialize};

use crate::lumper::{check_n_macrostates, Lumper};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaceOptions {
    /// States closer than this to the uniform pseudo-state are merged into
    /// their most connected neighbour before clustering starts.
    pub filter: f64,
    /// Keep the mapping at every intermediate number of macrostates.
    pub save_all_maps: bool,
    /// Threads used to recompute divergences after a merge.
    pub n_proc: usize,
    /// Below this many pairs the recomputation stays on one thread.
    pub chunk_size: usize,
}

impl Default for BaceOptions {
    fn default() -> Self {
        BaceOptions {
            filter: 1.1,
            save_all_maps: true,
            n_proc: 1,
            chunk_size: 100,
        }
    }
}

/// Count-based agglomerative lumping.
#[derive(Debug, Clone)]
pub struct Bace<L> {
    msm: MarkovStateModel<L>,
    n_macrostates: usize,
    options: BaceOptions,
    microstate_mapping: Vec<usize>,
    bayes_factors: BTreeMap<usize, f64>,
    map_dict: BTreeMap<usize, Vec<usize>>,
}

impl<L: StateLabel> Bace<L> {
    pub fn fit<S: AsRef<[L]>>(
        config: &MsmConfig,
        sequences: &[S],
        n_macrostates: usize,
        options: BaceOptions,
    ) -> Result<Self> {
        let msm = MarkovStateModel::fit(config, sequences)?;
        Self::from_msm(msm, n_macrostates, options)
    }

    pub fn from_msm(
        msm: MarkovStateModel<L>,
        n_macrostates: usize,
        options: BaceOptions,
    ) -> Result<Self> {
        check_n_macrostates(n_macrostates, msm.n_states())?;
        if options.filter.is_nan() || options.n_proc == 0 {
            return Err(Error::InvalidParameter(format!(
                "invalid BACE options: filter {}, n_proc {}",
                options.filter, options.n_proc
            )));
        }

        let mut counts = msm.countsmat().clone();
        if msm.config().sliding_window {
            counts.scale(msm.lag_time() as f64);
        }

        let mut engine = Engine::new(counts, options.filter);
        if engine.keep.len() < n_macrostates {
            return Err(Error::InvalidParameter(format!(
                "filter {} leaves {} states, fewer than the {} macrostates requested",
                options.filter,
                engine.keep.len(),
                n_macrostates
            )));
        }
        let pruned = engine.n - engine.keep.len();
        let (bayes_factors, map_dict) = engine.run(n_macrostates, &options)?;
        let microstate_mapping = rank_labels(&engine.map);

        if msm.config().verbose {
            tracing::info!(
                n_macrostates,
                n_states = msm.n_states(),
                pruned,
                "BACE lumping done"
            );
        }
        Ok(Bace {
            msm,
            n_macrostates,
            options,
            microstate_mapping,
            bayes_factors,
            map_dict,
        })
    }

    /// Merge divergence keyed by the number of states just before the merge.
    pub fn bayes_factors(&self) -> &BTreeMap<usize, f64> {
        &self.bayes_factors
    }

    /// Mapping after each merge, keyed by the number of macrostates left.
    /// Empty unless `save_all_maps` is set.
    pub fn map_dict(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.map_dict
    }

    pub fn options(&self) -> &BaceOptions {
        &self.options
    }
}

impl<L: StateLabel> Lumper for Bace<L> {
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

// ─────────────────────────────────────────────────────────────────────
// Merge engine
// ─────────────────────────────────────────────────────────────────────

/// Mutable clustering state. Merged states keep their row and column in
/// `c` but are zeroed and dropped from `keep`; `map` sends each microstate
/// to the kept state that represents it.
struct Engine {
    n: usize,
    c: Matrix,
    w: Vec<f64>,
    /// Still owed its `1/n` pseudocounts.
    unmerged: Vec<bool>,
    keep: Vec<usize>,
    map: Vec<usize>,
    /// Upper-triangle divergences; `INFINITY` marks non-candidates.
    dist: Matrix,
}

impl Engine {
    fn new(mut c: Matrix, filter: f64) -> Self {
        let n = c.rows();
        let mut map: Vec<usize> = (0..n).collect();
        let pseudo = vec![1.0 / n as f64; n];

        let (keep, prune): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| {
            let row: Vec<f64> = c.row(i).iter().map(|x| x + 1.0 / n as f64).collect();
            let w: f64 = c.row(i).iter().sum::<f64>() + 1.0;
            divergence(&row, w, &pseudo, 1.0) >= filter
        });

        let mut keep = keep;
        // With nothing kept there is nowhere to merge into.
        let prune = if keep.is_empty() { Vec::new() } else { prune };
        for s in prune {
            let dest = keep
                .iter()
                .copied()
                .filter(|&k| c[(s, k)] > 0.0)
                .fold(None, |best: Option<usize>, k| match best {
                    Some(b) if c[(s, b)] >= c[(s, k)] => Some(b),
                    _ => Some(k),
                });
            match dest {
                // Only the outgoing counts move; transitions into `s` are dropped.
                Some(dest) => {
                    for j in 0..n {
                        let v = c[(s, j)];
                        c[(dest, j)] += v;
                        c[(s, j)] = 0.0;
                    }
                    for i in 0..n {
                        c[(i, s)] = 0.0;
                    }
                    for m in map.iter_mut() {
                        if *m == s {
                            *m = dest;
                        }
                    }
                    tracing::debug!(state = s, into = dest, "BACE filter merge");
                }
                None => keep.push(s),
            }
        }
        keep.sort_unstable();

        let mut w = c.row_sums();
        let mut unmerged = vec![false; n];
        for &k in &keep {
            w[k] += 1.0;
            unmerged[k] = true;
        }

        Engine {
            n,
            c,
            w,
            unmerged,
            keep,
            map,
            dist: Matrix::filled(n, n, f64::INFINITY),
        }
    }

    /// Row `i` restricted to kept columns, with pending pseudocounts.
    fn row(&self, i: usize) -> Vec<f64> {
        let pseudo = 1.0 / self.n as f64;
        self.keep
            .iter()
            .map(|&k| {
                let extra = if self.unmerged[i] && self.unmerged[k] {
                    pseudo
                } else {
                    0.0
                };
                self.c[(i, k)] + extra
            })
            .collect()
    }

    fn is_candidate(&self, i: usize, j: usize) -> bool {
        self.c[(i, j)].max(self.c[(j, i)]) > 1.0
    }

    fn pair_divergence(&self, i: usize, j: usize) -> f64 {
        divergence(&self.row(i), self.w[i], &self.row(j), self.w[j])
    }

    fn run(
        &mut self,
        n_macrostates: usize,
        options: &BaceOptions,
    ) -> Result<(BTreeMap<usize, f64>, BTreeMap<usize, Vec<usize>>)> {
        let mut bayes_factors = BTreeMap::new();
        let mut map_dict = BTreeMap::new();

        for (a, &i) in self.keep.iter().enumerate() {
            for &j in &self.keep[a + 1..] {
                if self.is_candidate(i, j) {
                    self.dist[(i, j)] = self.pair_divergence(i, j);
                }
            }
        }

        while self.keep.len() > n_macrostates {
            let (x, y, d) = self.closest_pair().ok_or_else(|| {
                Error::NoConvergence(format!(
                    "no connected pair left to merge at {} states",
                    self.keep.len()
                ))
            })?;
            bayes_factors.insert(self.keep.len(), d);
            tracing::debug!(x, y, divergence = d, n_states = self.keep.len(), "BACE merge");

            self.merge(x, y);
            if options.save_all_maps {
                map_dict.insert(self.keep.len(), rank_labels(&self.map));
            }
            self.recompute(x, options);
        }
        Ok((bayes_factors, map_dict))
    }

    /// Smallest divergence among kept pairs, first in scan order on ties.
    fn closest_pair(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (a, &i) in self.keep.iter().enumerate() {
            for &j in &self.keep[a + 1..] {
                let d = self.dist[(i, j)];
                if d.is_finite() && best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((i, j, d));
                }
            }
        }
        best
    }

    /// Fold `y` into `x`.
    fn merge(&mut self, x: usize, y: usize) {
        let pseudo = 1.0 / self.n as f64;
        for s in [x, y] {
            if self.unmerged[s] {
                for &k in &self.keep {
                    if self.unmerged[k] {
                        self.c[(s, k)] += pseudo;
                    }
                }
                self.unmerged[s] = false;
                for &k in &self.keep {
                    if self.unmerged[k] {
                        self.c[(k, s)] += pseudo;
                    }
                }
            }
        }

        for &k in &self.keep {
            let v = self.c[(y, k)];
            self.c[(x, k)] += v;
        }
        for &k in &self.keep {
            let v = self.c[(k, y)];
            self.c[(k, x)] += v;
        }
        for &k in &self.keep {
            self.c[(y, k)] = 0.0;
            self.c[(k, y)] = 0.0;
        }
        for i in 0..self.n {
            for s in [x, y] {
                self.dist[(i, s)] = f64::INFINITY;
                self.dist[(s, i)] = f64::INFINITY;
            }
        }

        self.w[x] += self.w[y];
        self.w[y] = 0.0;
        self.keep.retain(|&k| k != y);
        for m in self.map.iter_mut() {
            if *m == y {
                *m = x;
            }
        }
    }

    /// Refresh the divergences between `x` and every connected kept state.
    fn recompute(&mut self, x: usize, options: &BaceOptions) {
        let partners: Vec<usize> = self
            .keep
            .iter()
            .copied()
            .filter(|&k| k != x && self.is_candidate(x, k))
            .collect();

        let dists: Vec<f64> = if options.n_proc > 1 && partners.len() > options.chunk_size {
            let this = &*self;
            parallel_map_chunks(0, partners.len(), options.n_proc, |lo, hi| {
                partners[lo..hi]
                    .iter()
                    .map(|&k| this.pair_divergence(x, k))
                    .collect::<Vec<f64>>()
            })
            .into_iter()
            .flatten()
            .collect()
        } else {
            partners.iter().map(|&k| self.pair_divergence(x, k)).collect()
        };

        for (&k, d) in partners.iter().zip(dists) {
            let (i, j) = if x < k { (x, k) } else { (k, x) };
            self.dist[(i, j)] = d;
        }
    }
}

/// `Σ p log(p / (w_p q)) + Σ r log(r / (w_r q))` with `q = (p + r) / (w_p + w_r)`.
fn divergence(p: &[f64], wp: f64, r: &[f64], wr: f64) -> f64 {
    let w = wp + wr;
    p.iter()
        .zip(r)
        .map(|(&a, &b)| {
            let q = (a + b) / w;
            xlogy(a, wp * q) + xlogy(b, wr * q)
        })
        .sum()
}

#[inline]
fn xlogy(x: f64, y: f64) -> f64 {
    if x > 0.0 {
        x * (x / y).ln()
    } else {
        0.0
    }
}

/// Relabel representatives `0..k` in increasing order of representative id.
fn rank_labels(map: &[usize]) -> Vec<usize> {
    let mut reps = map.to_vec();
    reps.sort_unstable();
    reps.dedup();
    map.iter()
        .map(|r| reps.binary_search(r).unwrap_or_default())
        .collect()
}
