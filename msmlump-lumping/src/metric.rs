//! Distances between transition-matrix rows.

// ─────────────────────────────────────────────────────────────────────
// RowMetric trait
// ─────────────────────────────────────────────────────────────────────

/// Distance between two rows of a row-stochastic matrix.
///
/// Implementations must be non-negative and symmetric, and return 0 for
/// identical rows. Ward linkage assumes squared distances behave like
/// variances, which holds for Euclidean-embeddable metrics.
pub trait RowMetric: Sync {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Whether the triangle inequality holds.
    fn is_metric(&self) -> bool;
}

/// Square root of the Jensen-Shannon divergence (natural log).
///
/// Bounded by `sqrt(ln 2)` and a true metric on probability vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JensenShannon;

impl RowMetric for JensenShannon {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let js: f64 = a
            .iter()
            .zip(b)
            .map(|(&p, &q)| {
                let m = 0.5 * (p + q);
                0.5 * (kl_term(p, m) + kl_term(q, m))
            })
            .sum();
        js.max(0.0).sqrt()
    }

    fn is_metric(&self) -> bool {
        true
    }
}

/// Plain Euclidean distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl RowMetric for Euclidean {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    fn is_metric(&self) -> bool {
        true
    }
}

/// `p ln(p / m)` with `0 ln 0 = 0`.
#[inline]
fn kl_term(p: f64, m: f64) -> f64 {
    if p > 0.0 {
        p * (p / m).ln()
    } else {
        0.0
    }
}
