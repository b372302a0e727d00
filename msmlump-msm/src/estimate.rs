//! Transition matrix estimators.

use msmlump_core::{Error, Matrix, Result};
use msmlump_linalg::{eigenvector_for, solve};

use crate::config::ReversibleType;

const MLE_TOLERANCE: f64 = 1e-10;
const MLE_MAX_ITER: usize = 100_000;

/// Transition matrix and its stationary distribution.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub transmat: Matrix,
    pub populations: Vec<f64>,
}

/// Estimate a transition matrix from `counts` with the chosen method.
pub fn estimate(counts: &Matrix, method: ReversibleType) -> Result<Estimate> {
    if !counts.is_square() || counts.rows() == 0 {
        return Err(Error::ShapeMismatch {
            expected: "non-empty square count matrix".to_string(),
            got: format!("{}x{}", counts.rows(), counts.cols()),
        });
    }
    match method {
        ReversibleType::Mle => reversible_mle(counts),
        ReversibleType::Transpose => transpose_estimate(counts),
        ReversibleType::None => nonreversible_estimate(counts),
    }
}

/// Reversible maximum-likelihood estimate by the self-consistent iteration
/// `x_ij = (c_ij + c_ji) / (c_i / x_i + c_j / x_j)` over a symmetric
/// matrix `X`, where `c_i` and `x_i` are row sums.
pub fn reversible_mle(counts: &Matrix) -> Result<Estimate> {
    if counts.sum() <= 0.0 {
        return Err(Error::Empty("count matrix has no transitions".to_string()));
    }
    let n = counts.rows();
    let c_row = counts.row_sums();
    let sym = counts.add_matrix(&counts.transpose())?;

    let mut x = sym.clone();
    let mut x_row = x.row_sums();
    let mut converged = false;
    for iteration in 0..MLE_MAX_ITER {
        let mut next = Matrix::zeros(n, n);
        for i in 0..n {
            let ri = ratio(c_row[i], x_row[i]);
            for j in i..n {
                let num = sym[(i, j)];
                if num == 0.0 {
                    continue;
                }
                let denom = ri + ratio(c_row[j], x_row[j]);
                let v = if denom > 0.0 { num / denom } else { 0.0 };
                next[(i, j)] = v;
                next[(j, i)] = v;
            }
        }
        let next_row = next.row_sums();
        let total: f64 = next_row.iter().sum();
        let prev_total: f64 = x_row.iter().sum();
        let change = next_row
            .iter()
            .zip(&x_row)
            .map(|(a, b)| (a / total - b / prev_total).abs())
            .fold(0.0, f64::max);
        x = next;
        x_row = next_row;
        if change < MLE_TOLERANCE {
            tracing::debug!(iterations = iteration + 1, "reversible MLE converged");
            converged = true;
            break;
        }
    }
    if !converged {
        tracing::warn!(max_iter = MLE_MAX_ITER, "reversible MLE did not converge");
    }

    let total: f64 = x_row.iter().sum();
    let populations: Vec<f64> = x_row.iter().map(|v| v / total).collect();
    Ok(Estimate {
        transmat: stochastic_rows(&x),
        populations,
    })
}

fn ratio(c: f64, x: f64) -> f64 {
    if x > 0.0 {
        c / x
    } else {
        0.0
    }
}

/// Symmetrize, `(C + Cᵀ) / 2`, then row-normalize. Populations are the
/// normalized row sums of the symmetrized counts.
pub fn transpose_estimate(counts: &Matrix) -> Result<Estimate> {
    let mut sym = counts.add_matrix(&counts.transpose())?;
    sym.scale(0.5);
    let rows = sym.row_sums();
    let total: f64 = rows.iter().sum();
    if total <= 0.0 {
        return Err(Error::Empty("count matrix has no transitions".to_string()));
    }
    Ok(Estimate {
        transmat: stochastic_rows(&sym),
        populations: rows.iter().map(|v| v / total).collect(),
    })
}

/// Row-normalized counts; populations from the stationary left eigenvector.
pub fn nonreversible_estimate(counts: &Matrix) -> Result<Estimate> {
    if counts.sum() <= 0.0 {
        return Err(Error::Empty("count matrix has no transitions".to_string()));
    }
    let transmat = stochastic_rows(counts);
    let populations = stationary_distribution(&transmat)?;
    Ok(Estimate {
        transmat,
        populations,
    })
}

/// Row-normalize; a row without counts becomes a self-loop so the result
/// stays stochastic.
fn stochastic_rows(m: &Matrix) -> Matrix {
    let mut t = m.row_normalized();
    for i in 0..t.rows() {
        if t.row(i).iter().all(|&v| v == 0.0) {
            t[(i, i)] = 1.0;
        }
    }
    t
}

/// Stationary distribution `π = π T`, `Σπ = 1`.
///
/// Solves `(Tᵀ - I) π = 0` with the last equation replaced by the
/// normalization; falls back to inverse iteration on `Tᵀ` when that system
/// is singular (a reducible chain).
pub fn stationary_distribution(transmat: &Matrix) -> Result<Vec<f64>> {
    let n = transmat.rows();
    if n == 1 {
        return Ok(vec![1.0]);
    }
    let mut a = transmat.transpose();
    for i in 0..n {
        a[(i, i)] -= 1.0;
    }
    a.row_mut(n - 1).iter_mut().for_each(|v| *v = 1.0);
    let mut b = vec![0.0; n];
    b[n - 1] = 1.0;

    let pi = match solve(&a, &b) {
        Ok(pi) => pi,
        Err(Error::Singular(_)) => {
            tracing::debug!("stationary system singular, using inverse iteration");
            eigenvector_for(&transmat.transpose(), 1.0)?
        }
        Err(e) => return Err(e),
    };
    let total: f64 = pi.iter().map(|v| v.abs()).sum();
    if total == 0.0 || !total.is_finite() {
        return Err(Error::NoConvergence(
            "stationary distribution could not be normalized".to_string(),
        ));
    }
    Ok(pi.iter().map(|v| v.abs() / total).collect())
}
