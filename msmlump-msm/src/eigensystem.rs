//! Leading eigenpairs of a transition matrix.
//!
//! Left eigenvectors `φ` (columns of `left`) and right eigenvectors `ψ`
//! (columns of `right`) are normalized so that
//!
//! - `φ_0` sums to one (it is the stationary distribution),
//! - `<φ_i, φ_i>_{1/π} = 1` for every `i`,
//! - `<φ_i, ψ_i> = 1` for every `i`.
//!
//! For a reversible model this also gives `<ψ_i, ψ_i>_π = 1` and
//! biorthonormality `Φᵀ Ψ = I`.
//!
//! A non-reversible matrix can have complex eigenvalues. The products above
//! are then taken without conjugation, and a conjugate pair `a ± ib` is
//! stored the LAPACK way: the column of `a + ib` holds the real part of its
//! eigenvector and the column of `a - ib` the imaginary part.

use msmlump_core::{Error, Matrix, Result};
use msmlump_linalg::{
    complex_eigenvector_for, eigenvectors_for, general_eigenvalues, symmetric_eigen, Complex,
};

const EIGENVECTOR_SEED: u64 = 0x5EED_E16;

#[derive(Debug, Clone)]
pub struct Eigensystem {
    /// Real parts, sorted by decreasing real part; `values[0]` is 1 for a
    /// stochastic matrix.
    pub values: Vec<f64>,
    /// Imaginary parts of `values`; all zero for a reversible model.
    pub imag: Vec<f64>,
    pub left: Matrix,
    pub right: Matrix,
}

/// Eigenvector as separate real and imaginary parts.
#[derive(Debug)]
struct ComplexVector {
    re: Vec<f64>,
    im: Vec<f64>,
}

impl ComplexVector {
    fn real(re: Vec<f64>) -> Self {
        let im = vec![0.0; re.len()];
        ComplexVector { re, im }
    }

    fn at(&self, i: usize) -> Complex {
        Complex::new(self.re[i], self.im[i])
    }

    fn scale(&mut self, c: Complex) {
        for i in 0..self.re.len() {
            let v = self.at(i) * c;
            self.re[i] = v.re;
            self.im[i] = v.im;
        }
    }

    /// `Σ a_i b_i w_i` without conjugation.
    fn weighted_dot(&self, other: &ComplexVector, weight: impl Fn(usize) -> f64) -> Complex {
        (0..self.re.len()).fold(Complex::new(0.0, 0.0), |acc, i| {
            acc + self.at(i) * other.at(i) * Complex::new(weight(i), 0.0)
        })
    }
}

/// The `k` leading eigenpairs of `transmat`.
///
/// With `reversible` the matrix is symmetrized as `D^½ T D^-½`
/// (`D = diag(populations)`) and decomposed by Jacobi rotations. Otherwise
/// the eigenvalues come from Hessenberg QR and the vectors from inverse
/// iteration on `T` and `Tᵀ`, complex where the eigenvalue is.
pub fn eigensystem(
    transmat: &Matrix,
    populations: &[f64],
    k: usize,
    reversible: bool,
) -> Result<Eigensystem> {
    let n = transmat.rows();
    if !transmat.is_square() || populations.len() != n {
        return Err(Error::ShapeMismatch {
            expected: format!("{}x{} transition matrix with {} populations", n, n, n),
            got: format!(
                "{}x{} with {} populations",
                transmat.rows(),
                transmat.cols(),
                populations.len()
            ),
        });
    }
    let k = k.clamp(1, n.max(1));
    let (values, mut left, mut right) = if reversible {
        reversible_pairs(transmat, populations, k)?
    } else {
        general_pairs(transmat, k)?
    };
    normalize(&mut left, &mut right);

    let mut left_out = Matrix::zeros(n, k);
    let mut right_out = Matrix::zeros(n, k);
    for (col, lambda) in values.iter().enumerate() {
        if lambda.im < 0.0 {
            left_out.set_column(col, &left[col].im);
            right_out.set_column(col, &right[col].im);
        } else {
            left_out.set_column(col, &left[col].re);
            right_out.set_column(col, &right[col].re);
        }
    }
    Ok(Eigensystem {
        values: values.iter().map(|l| l.re).collect(),
        imag: values.iter().map(|l| l.im).collect(),
        left: left_out,
        right: right_out,
    })
}

type Pairs = (Vec<Complex>, Vec<ComplexVector>, Vec<ComplexVector>);

fn reversible_pairs(t: &Matrix, pi: &[f64], k: usize) -> Result<Pairs> {
    let n = t.rows();
    let sqrt_pi: Vec<f64> = pi.iter().map(|p| p.sqrt()).collect();
    let mut s = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            s[(i, j)] = sqrt_pi[i] * t[(i, j)] / sqrt_pi[j];
        }
    }
    // Exact symmetry; detailed balance only holds to rounding.
    let mut sym = s.add_matrix(&s.transpose())?;
    sym.scale(0.5);

    let eig = symmetric_eigen(&sym)?;
    let mut left = Vec::with_capacity(k);
    let mut right = Vec::with_capacity(k);
    for col in 0..k {
        let u = eig.vectors.column(col);
        left.push(ComplexVector::real(
            u.iter().zip(&sqrt_pi).map(|(u, s)| u * s).collect(),
        ));
        right.push(ComplexVector::real(
            u.iter().zip(&sqrt_pi).map(|(u, s)| u / s).collect(),
        ));
    }
    let values = eig.values[..k].iter().map(|&v| Complex::new(v, 0.0)).collect();
    Ok((values, left, right))
}

/// Both eigenvalues of a conjugate pair carry the eigenvector of `a + ib`,
/// so a pair cut in half by `k` still normalizes.
fn general_pairs(t: &Matrix, k: usize) -> Result<Pairs> {
    let mut values = general_eigenvalues(t)?;
    values.sort_by(|a, b| b.re.total_cmp(&a.re).then(b.im.total_cmp(&a.im)));
    values.truncate(k);

    let tt = t.transpose();
    let real: Vec<f64> = values.iter().filter(|l| l.im == 0.0).map(|l| l.re).collect();
    let real_right = eigenvectors_for(t, &real, EIGENVECTOR_SEED)?;
    let real_left = eigenvectors_for(&tt, &real, EIGENVECTOR_SEED)?;

    let mut left = Vec::with_capacity(k);
    let mut right = Vec::with_capacity(k);
    let mut next_real = 0;
    for lambda in &values {
        if lambda.im == 0.0 {
            right.push(ComplexVector::real(real_right.column(next_real)));
            left.push(ComplexVector::real(real_left.column(next_real)));
            next_real += 1;
        } else {
            let upper = Complex::new(lambda.re, lambda.im.abs());
            let (re, im) = complex_eigenvector_for(t, upper, EIGENVECTOR_SEED)?;
            right.push(ComplexVector { re, im });
            let (re, im) = complex_eigenvector_for(&tt, upper, EIGENVECTOR_SEED)?;
            left.push(ComplexVector { re, im });
        }
    }
    Ok((values, left, right))
}

fn normalize(left: &mut [ComplexVector], right: &mut [ComplexVector]) {
    if left.is_empty() {
        return;
    }
    let n = left[0].re.len();
    let total = (0..n).fold(Complex::new(0.0, 0.0), |acc, i| acc + left[0].at(i));
    left[0].scale(Complex::new(1.0, 0.0) / total);
    let pi = left[0].re.clone();

    for lv in left.iter_mut().skip(1) {
        let weighted = {
            let v: &ComplexVector = lv;
            v.weighted_dot(v, |i| 1.0 / pi[i])
        };
        lv.scale(Complex::new(1.0, 0.0) / weighted.sqrt());
    }
    for (lv, rv) in left.iter().zip(right.iter_mut()) {
        let overlap = lv.weighted_dot(rv, |_| 1.0);
        rv.scale(Complex::new(1.0, 0.0) / overlap);
    }
}

/// Implied timescales `-lag / ln|λ_i|` for every eigenvalue after the first,
/// with `|λ|` the modulus of `values + i·imag`.
pub fn implied_timescales(values: &[f64], imag: &[f64], lag_time: usize) -> Vec<f64> {
    let imag = imag.iter().copied().chain(std::iter::repeat(0.0));
    values
        .iter()
        .zip(imag)
        .skip(1)
        .map(|(&re, im)| -(lag_time as f64) / re.hypot(im).ln())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::{nonreversible_estimate, reversible_mle};

    fn check_normalization(es: &Eigensystem, pi: &[f64], tol: f64) {
        let n = pi.len();
        let k = es.values.len();
        let s: f64 = es.left.column(0).iter().sum();
        assert!((s - 1.0).abs() < tol);
        for a in 0..k {
            let la = es.left.column(a);
            let wa: f64 = (0..n).map(|i| la[i] * la[i] / pi[i]).sum();
            assert!((wa - 1.0).abs() < tol, "<phi_{a}, phi_{a}>_(1/pi) = {}", wa);
            for b in 0..k {
                let rb = es.right.column(b);
                let d: f64 = la.iter().zip(&rb).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((d - expected).abs() < tol, "<phi_{a}, psi_{b}> = {}", d);
            }
        }
    }

    #[test]
    fn test_reversible_normalization() {
        let c = Matrix::from_rows(&[
            vec![6.0, 2.0, 1.0, 0.0],
            vec![2.0, 3.0, 1.0, 1.0],
            vec![1.0, 1.0, 0.0, 3.0],
            vec![0.0, 1.0, 3.0, 3.0],
        ])
        .unwrap();
        let e = reversible_mle(&c).unwrap();
        let es = eigensystem(&e.transmat, &e.populations, 3, true).unwrap();
        assert_eq!(es.values.len(), 3);
        assert!((es.values[0] - 1.0).abs() < 1e-10);
        check_normalization(&es, &e.populations, 1e-8);
        for i in 0..4 {
            assert!((es.left[(i, 0)] - e.populations[i]).abs() < 1e-10);
            assert!((es.right[(i, 0)] - 1.0).abs() < 1e-8);
        }
        for a in 0..3 {
            let r = es.right.column(a);
            let w: f64 = (0..4).map(|i| r[i] * r[i] * e.populations[i]).sum();
            assert!((w - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn test_general_path_matches_reversible_path() {
        let c = Matrix::from_rows(&[
            vec![8.0, 1.0, 1.0],
            vec![1.0, 3.0, 0.0],
            vec![1.0, 0.0, 3.0],
        ])
        .unwrap();
        let e = reversible_mle(&c).unwrap();
        let rev = eigensystem(&e.transmat, &e.populations, 3, true).unwrap();
        let gen = eigensystem(&e.transmat, &e.populations, 3, false).unwrap();
        for (a, b) in rev.values.iter().zip(&gen.values) {
            assert!((a - b).abs() < 1e-8, "{} vs {}", a, b);
        }
        for i in 0..3 {
            assert!((rev.left[(i, 0)] - gen.left[(i, 0)]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_nonreversible_stationary_vector() {
        let c = Matrix::from_rows(&[
            vec![0.0, 3.0, 1.0],
            vec![1.0, 0.0, 3.0],
            vec![3.0, 1.0, 0.0],
        ])
        .unwrap();
        let e = nonreversible_estimate(&c).unwrap();
        let es = eigensystem(&e.transmat, &e.populations, 1, false).unwrap();
        assert!((es.values[0] - 1.0).abs() < 1e-10);
        for i in 0..3 {
            assert!((es.left[(i, 0)] - e.populations[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_complex_pair_satisfies_eigen_equation() {
        // Mostly 0 -> 1 -> 2 -> 0 with a little backflow; the non-stationary
        // eigenvalues are -0.35 ± 0.35·√3 i.
        let t = Matrix::from_rows(&[
            vec![0.1, 0.8, 0.1],
            vec![0.1, 0.1, 0.8],
            vec![0.8, 0.1, 0.1],
        ])
        .unwrap();
        let pi = [1.0 / 3.0; 3];
        let es = eigensystem(&t, &pi, 3, false).unwrap();
        let (a, b) = (-0.35, 0.35 * 3f64.sqrt());
        assert!((es.values[0] - 1.0).abs() < 1e-10);
        assert!((es.values[1] - a).abs() < 1e-10 && (es.values[2] - a).abs() < 1e-10);
        assert!((es.imag[1] - b).abs() < 1e-10, "imag = {:?}", es.imag);
        assert!((es.imag[2] + b).abs() < 1e-10, "imag = {:?}", es.imag);

        // M(x + iy) = (a + ib)(x + iy) for M = T (right) and M = Tᵀ (left).
        let tt = t.transpose();
        for (m, vecs) in [(&t, &es.right), (&tt, &es.left)] {
            let x = vecs.column(1);
            let y = vecs.column(2);
            let mx = m.matvec(&x).unwrap();
            let my = m.matvec(&y).unwrap();
            for i in 0..3 {
                assert!((mx[i] - (a * x[i] - b * y[i])).abs() < 1e-8, "residual {:?}", mx);
                assert!((my[i] - (b * x[i] + a * y[i])).abs() < 1e-8, "residual {:?}", my);
            }
        }

        let (lx, ly) = (es.left.column(1), es.left.column(2));
        let (rx, ry) = (es.right.column(1), es.right.column(2));
        let overlap_re: f64 = (0..3).map(|i| lx[i] * rx[i] - ly[i] * ry[i]).sum();
        let overlap_im: f64 = (0..3).map(|i| lx[i] * ry[i] + ly[i] * rx[i]).sum();
        assert!((overlap_re - 1.0).abs() < 1e-8 && overlap_im.abs() < 1e-8);
        let weighted_re: f64 = (0..3).map(|i| (lx[i] * lx[i] - ly[i] * ly[i]) / pi[i]).sum();
        let weighted_im: f64 = (0..3).map(|i| 2.0 * lx[i] * ly[i] / pi[i]).sum();
        assert!((weighted_re - 1.0).abs() < 1e-8 && weighted_im.abs() < 1e-8);
        for i in 0..3 {
            assert!((es.left[(i, 0)] - 1.0 / 3.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_truncated_pair_keeps_real_part() {
        let t = Matrix::from_rows(&[
            vec![0.1, 0.8, 0.1],
            vec![0.1, 0.1, 0.8],
            vec![0.8, 0.1, 0.1],
        ])
        .unwrap();
        let full = eigensystem(&t, &[1.0 / 3.0; 3], 3, false).unwrap();
        let cut = eigensystem(&t, &[1.0 / 3.0; 3], 2, false).unwrap();
        assert_eq!(cut.imag.len(), 2);
        for i in 0..3 {
            assert!((cut.right[(i, 1)] - full.right[(i, 1)]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_implied_timescales() {
        let ts = implied_timescales(&[1.0, 0.5, -0.25], &[], 2);
        assert_eq!(ts.len(), 2);
        assert!((ts[0] - 2.0 / 2f64.ln()).abs() < 1e-12);
        assert!((ts[1] - 2.0 / 4f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_implied_timescales_use_modulus() {
        let ts = implied_timescales(&[1.0, -0.3, -0.3], &[0.0, 0.4, -0.4], 1);
        let expected = -1.0 / 0.5f64.ln();
        assert!((ts[0] - expected).abs() < 1e-12);
        assert!((ts[1] - expected).abs() < 1e-12);
    }
}
