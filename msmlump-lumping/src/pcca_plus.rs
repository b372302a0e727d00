//! PCCA+: robust Perron cluster analysis.
//!
//! The leading `k` right eigenvectors `V` (n × k) embed the microstates in
//! a space where metastable sets sit near the vertices of a simplex. PCCA+
//! looks for a `k × k` transformation `A` such that the memberships
//! `χ = V A` are non-negative and sum to one per microstate, then improves
//! `A` against an objective.
//!
//! ```text
//!   V ──index_search──▶ vertices ──inv──▶ A₀ ──fill_a──▶ feasible A
//!                                               │
//!            basin hopping + Nelder-Mead over A[1.., 1..] (maximize)
//!                                               ▼
//!                                   χ = V A, mapping = argmax_row χ
//! ```
//!
//! Only the `(k-1)²` entries `A[1.., 1..]` are free: `fill_a` derives the
//! first column from the row-sum constraint and the first row from the
//! positivity constraint.
//!
//! Deuflhard & Weber, Linear Algebra Appl. 398, 161 (2005);
//! Kube & Weber, J. Chem. Phys. 126, 024103 (2007).

use msmlump_core::matrix::{argmax, dot, norm2};
use msmlump_core::{Error, Matrix, Result, SplitMix64};
use msmlump_linalg::{basin_hopping, inverse, nelder_mead, BasinHoppingOptions, NelderMeadOptions};
use msmlump_msm::{MarkovStateModel, MsmConfig, StateLabel};
use serde::{Deserialize, Serialize};

use crate::lumper::{check_n_macrostates, check_timescales, spectral_config, Lumper};

/// Tolerance of the row-sum/positivity consistency check.
const CONSTRAINT_EPSILON: f64 = 1e-8;

/// Quantity maximized when refining `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Sum of fuzzy macrostate self-transition probabilities.
    Metastability,
    /// Metastability of the crisp (argmax) assignment.
    #[default]
    CrispMetastability,
    /// How close the memberships are to 0/1.
    Crispness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PccaPlusOptions {
    pub do_minimization: bool,
    pub objective: Objective,
    /// Seed for the basin-hopping perturbations.
    pub random_state: Option<u64>,
    /// Basin-hopping iterations before the final simplex polish.
    pub n_hops: usize,
}

impl Default for PccaPlusOptions {
    fn default() -> Self {
        PccaPlusOptions {
            do_minimization: true,
            objective: Objective::CrispMetastability,
            random_state: None,
            n_hops: 100,
        }
    }
}

/// Spectral lumping with fuzzy memberships.
#[derive(Debug, Clone)]
pub struct PccaPlus<L> {
    msm: MarkovStateModel<L>,
    n_macrostates: usize,
    options: PccaPlusOptions,
    a: Matrix,
    chi: Matrix,
    microstate_mapping: Vec<usize>,
}

impl<L: StateLabel> PccaPlus<L> {
    pub fn fit<S: AsRef<[L]>>(
        config: &MsmConfig,
        sequences: &[S],
        n_macrostates: usize,
        options: PccaPlusOptions,
    ) -> Result<Self> {
        let msm = MarkovStateModel::fit(&spectral_config(config, n_macrostates), sequences)?;
        Self::from_msm(msm, n_macrostates, options)
    }

    pub fn from_msm(
        msm: MarkovStateModel<L>,
        n_macrostates: usize,
        options: PccaPlusOptions,
    ) -> Result<Self> {
        check_n_macrostates(n_macrostates, msm.n_states())?;
        check_timescales(&msm, n_macrostates)?;

        let cols: Vec<usize> = (0..n_macrostates).collect();
        let v = msm.right_eigenvectors().select_columns(&cols);

        let a = if n_macrostates == 1 {
            Matrix::identity(1)
        } else {
            let problem = Problem {
                v: &v,
                transmat: msm.transmat(),
                populations: msm.populations(),
                objective: options.objective,
            };
            let index = index_search(&v);
            let a0 = fill_a(&inverse(&v.select(&index, &cols))?, &v);
            let a = if options.do_minimization {
                problem.optimize(&a0, &options)?
            } else {
                a0
            };
            fill_a(&a, &v)
        };
        let chi = v.matmul(&a)?;
        let microstate_mapping: Vec<usize> = (0..chi.rows()).map(|i| argmax(chi.row(i))).collect();

        if msm.config().verbose {
            tracing::info!(
                n_macrostates,
                n_states = msm.n_states(),
                objective = ?options.objective,
                "PCCA+ lumping done"
            );
        }
        Ok(PccaPlus {
            msm,
            n_macrostates,
            options,
            a,
            chi,
            microstate_mapping,
        })
    }

    /// The transformation from eigenvectors to memberships.
    pub fn a(&self) -> &Matrix {
        &self.a
    }

    /// Fuzzy memberships, one row per microstate.
    pub fn chi(&self) -> &Matrix {
        &self.chi
    }

    pub fn options(&self) -> &PccaPlusOptions {
        &self.options
    }
}

impl<L: StateLabel> Lumper for PccaPlus<L> {
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
// Simplex geometry
// ─────────────────────────────────────────────────────────────────────

/// Rows of `v` that best approximate the simplex vertices.
///
/// The first vertex is the row of largest norm. Each further vertex is the
/// row farthest from the span of the previous ones, found by repeatedly
/// projecting out the last vertex and rescaling.
pub fn index_search(v: &Matrix) -> Vec<usize> {
    let (n, k) = v.shape();
    let mut index = vec![0usize; k];
    let norms: Vec<f64> = (0..n).map(|i| norm2(v.row(i))).collect();
    index[0] = argmax(&norms);

    let mut ortho = v.clone();
    let first = v.row(index[0]).to_vec();
    for i in 0..n {
        for (o, f) in ortho.row_mut(i).iter_mut().zip(&first) {
            *o -= f;
        }
    }

    for j in 1..k {
        let temp = ortho.row(index[j - 1]).to_vec();
        for l in 0..n {
            let c = dot(ortho.row(l), &temp);
            for (o, t) in ortho.row_mut(l).iter_mut().zip(&temp) {
                *o -= t * c;
            }
        }
        let dist: Vec<f64> = (0..n).map(|l| norm2(ortho.row(l))).collect();
        index[j] = argmax(&dist);
        let max = dist[index[j]];
        if max > 0.0 {
            ortho.scale(1.0 / max);
        }
    }
    index
}

/// Make `a` feasible: first column from the row-sum condition, first row
/// from the positivity condition, then rescale so the first row sums to 1.
pub fn fill_a(a: &Matrix, v: &Matrix) -> Matrix {
    let k = a.rows();
    let n = v.rows();
    let mut a = a.clone();
    for i in 1..k {
        a[(i, 0)] = -(1..k).map(|j| a[(i, j)]).sum::<f64>();
    }
    for j in 0..k {
        let min = (0..n)
            .map(|r| (1..k).map(|c| v[(r, c)] * a[(c, j)]).sum::<f64>())
            .fold(f64::INFINITY, f64::min);
        a[(0, j)] = -min;
    }
    let s: f64 = a.row(0).iter().sum();
    a.scale(1.0 / s);
    a
}

/// Positions of the free entries `A[1.., 1..]` in the flat parameter vector.
fn flat_map(k: usize) -> Vec<(usize, usize)> {
    (1..k).flat_map(|i| (1..k).map(move |j| (i, j))).collect()
}

fn to_flat(a: &Matrix) -> Vec<f64> {
    flat_map(a.rows()).into_iter().map(|(i, j)| a[(i, j)]).collect()
}

fn to_square(alpha: &[f64], k: usize) -> Matrix {
    let mut a = Matrix::zeros(k, k);
    for (&x, (i, j)) in alpha.iter().zip(flat_map(k)) {
        a[(i, j)] = x;
    }
    a
}

/// True when the filled `a` is inconsistent: the first row's implied
/// positivity bound disagrees with the row-sum bound.
fn has_constraint_violation(a: &Matrix, v: &Matrix) -> bool {
    let k = a.rows();
    let lhs = 1.0 - (1..k).map(|j| a[(0, j)]).sum::<f64>();
    let rhs = -(0..v.rows())
        .map(|r| (1..k).map(|c| v[(r, c)] * a[(c, 0)]).sum::<f64>())
        .fold(f64::INFINITY, f64::min);
    (lhs - rhs).abs() > CONSTRAINT_EPSILON
}

// ─────────────────────────────────────────────────────────────────────
// Objectives
// ─────────────────────────────────────────────────────────────────────

struct Problem<'a> {
    v: &'a Matrix,
    transmat: &'a Matrix,
    populations: &'a [f64],
    objective: Objective,
}

impl Problem<'_> {
    /// Objective value of the free parameters; `-inf` when infeasible or
    /// when some macrostate receives no microstate.
    fn evaluate(&self, alpha: &[f64]) -> f64 {
        let k = self.v.cols();
        let a = fill_a(&to_square(alpha, k), self.v);
        if a.as_slice().iter().any(|x| !x.is_finite()) {
            return f64::NEG_INFINITY;
        }
        let Ok(chi) = self.v.matmul(&a) else {
            return f64::NEG_INFINITY;
        };
        let mapping: Vec<usize> = (0..chi.rows()).map(|i| argmax(chi.row(i))).collect();
        let mut used = vec![false; k];
        mapping.iter().for_each(|&m| used[m] = true);
        if used.iter().any(|u| !u) || has_constraint_violation(&a, self.v) {
            return f64::NEG_INFINITY;
        }

        match self.objective {
            Objective::Metastability => (0..k)
                .map(|i| self.self_transition(&chi.column(i)))
                .sum(),
            Objective::CrispMetastability => (0..k)
                .map(|i| {
                    let indicator: Vec<f64> = mapping
                        .iter()
                        .map(|&m| if m == i { 1.0 } else { 0.0 })
                        .collect();
                    self.self_transition(&indicator)
                })
                .sum(),
            Objective::Crispness => (0..k)
                .map(|i| (0..k).map(|r| a[(r, i)] * a[(r, i)]).sum::<f64>() / a[(0, i)])
                .sum(),
        }
    }

    /// `(T χ)·(π ∘ χ) / (χ·π)`.
    fn self_transition(&self, chi: &[f64]) -> f64 {
        let Ok(t_chi) = self.transmat.matvec(chi) else {
            return f64::NEG_INFINITY;
        };
        let weighted: Vec<f64> = chi.iter().zip(self.populations).map(|(c, p)| c * p).collect();
        dot(&t_chi, &weighted) / dot(chi, self.populations)
    }

    fn optimize(&self, a0: &Matrix, options: &PccaPlusOptions) -> Result<Matrix> {
        let k = a0.rows();
        let f = |x: &[f64]| -self.evaluate(x);
        let mut rng = SplitMix64::from_optional_seed(options.random_state);

        let hop = BasinHoppingOptions {
            niter: options.n_hops,
            niter_success: Some(1000),
            ..BasinHoppingOptions::default()
        };
        let hopped = basin_hopping(f, &to_flat(a0), &hop, &mut rng);
        let polish = NelderMeadOptions {
            xtol: 1e-4,
            ftol: 1e-4,
            max_evals: 5000,
            max_iter: 100_000,
        };
        let best = nelder_mead(f, &hopped.x, &polish);
        tracing::debug!(
            hops = hopped.n_evals,
            polish = best.n_evals,
            objective = -best.f,
            "PCCA+ optimization finished"
        );
        if best.f == f64::INFINITY {
            return Err(Error::NoConvergence(
                "PCCA+ minimization did not locate a feasible point".to_string(),
            ));
        }
        Ok(to_square(&best.x, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three wells {0, 1}, {2, 3}, {4, 5}, visited in turn.
    fn three_wells() -> Vec<Vec<u32>> {
        let mut seq = Vec::new();
        for _ in 0..15 {
            seq.extend([0, 1, 1, 0, 0, 1, 0, 1, 1, 0]);
            seq.extend([2, 3, 2, 2, 3, 3, 2, 3, 2, 3]);
            seq.extend([4, 5, 5, 4, 4, 5, 4, 5, 5, 4]);
        }
        vec![seq]
    }

    fn assert_wells(mapping: &[usize]) {
        assert_eq!(mapping[0], mapping[1], "{:?}", mapping);
        assert_eq!(mapping[2], mapping[3], "{:?}", mapping);
        assert_eq!(mapping[4], mapping[5], "{:?}", mapping);
        assert_ne!(mapping[0], mapping[2], "{:?}", mapping);
        assert_ne!(mapping[2], mapping[4], "{:?}", mapping);
        assert_ne!(mapping[0], mapping[4], "{:?}", mapping);
    }

    #[test]
    fn test_maps_roundtrip_free_entries() {
        let a = Matrix::from_rows(&[
            vec![9.0, 9.0, 9.0],
            vec![9.0, 1.0, 2.0],
            vec![9.0, 3.0, 4.0],
        ])
        .unwrap();
        let flat = to_flat(&a);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0]);
        let sq = to_square(&flat, 3);
        assert_eq!(sq.row(2), &[0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_fill_a_gives_partition_of_unity() {
        let cfg = MsmConfig::default().quiet();
        let msm = MarkovStateModel::fit(&cfg, &three_wells()).unwrap();
        let v = msm.right_eigenvectors().select_columns(&[0, 1, 2]);
        let index = index_search(&v);
        let mut sorted = index.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 3, "vertices must be distinct: {:?}", index);

        let a = fill_a(&inverse(&v.select(&index, &[0, 1, 2])).unwrap(), &v);
        let chi = v.matmul(&a).unwrap();
        for i in 0..chi.rows() {
            let s: f64 = chi.row(i).iter().sum();
            assert!((s - 1.0).abs() < 1e-8, "row {} sums to {}", i, s);
            assert!(chi.row(i).iter().all(|&x| x > -1e-8), "row {}: {:?}", i, chi.row(i));
        }
    }

    #[test]
    fn test_three_wells_without_minimization() {
        let cfg = MsmConfig::default().quiet();
        let opts = PccaPlusOptions {
            do_minimization: false,
            ..Default::default()
        };
        let lumper = PccaPlus::fit(&cfg, &three_wells(), 3, opts).unwrap();
        assert_wells(lumper.microstate_mapping());
        assert_eq!(lumper.chi().shape(), (6, 3));
    }

    #[test]
    fn test_three_wells_crisp_metastability() {
        let cfg = MsmConfig::default().quiet();
        let opts = PccaPlusOptions {
            random_state: Some(42),
            n_hops: 10,
            ..Default::default()
        };
        let lumper = PccaPlus::fit(&cfg, &three_wells(), 3, opts).unwrap();
        assert_wells(lumper.microstate_mapping());
    }

    #[test]
    fn test_other_objectives_stay_feasible() {
        let cfg = MsmConfig::default().quiet();
        for objective in [Objective::Metastability, Objective::Crispness] {
            let opts = PccaPlusOptions {
                objective,
                random_state: Some(7),
                n_hops: 5,
                ..Default::default()
            };
            let lumper = PccaPlus::fit(&cfg, &three_wells(), 3, opts).unwrap();
            let mut used = lumper.microstate_mapping().to_vec();
            used.sort_unstable();
            used.dedup();
            assert_eq!(used, vec![0, 1, 2], "{:?}", objective);
        }
    }

    #[test]
    fn test_single_macrostate() {
        let cfg = MsmConfig::default().quiet();
        let lumper = PccaPlus::fit(&cfg, &three_wells(), 1, PccaPlusOptions::default()).unwrap();
        assert!(lumper.microstate_mapping().iter().all(|&m| m == 0));
        assert_eq!(lumper.a().shape(), (1, 1));
    }

    #[test]
    fn test_objective_serde_names() {
        let o: Objective = serde_json::from_str("\"crisp_metastability\"").unwrap();
        assert_eq!(o, Objective::CrispMetastability);
    }
}
