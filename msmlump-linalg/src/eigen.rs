//! Eigen-decomposition of small dense matrices.
//!
//! Two paths, matching the two kinds of transition matrices:
//!
//! - **Symmetric** (`symmetric_eigen`): cyclic Jacobi rotations. A
//!   reversible transition matrix `T` with stationary distribution `π` is
//!   similar to the symmetric `D^½ T D^-½` (`D = diag(π)`), so reversible
//!   models always take this path and get orthogonal eigenvectors back.
//! - **General** (`general_eigenvalues` + `eigenvectors_for`): elimination
//!   to upper Hessenberg form, Francis double-shift QR for the eigenvalues,
//!   then inverse iteration for one eigenvector per requested value. A
//!   complex eigenvalue is iterated on the real `2n x 2n` form of `A - λI`.
//!
//! ```text
//!   A ──elmhes──▶ H (upper Hessenberg) ──hqr──▶ λ₁..λₙ (re, im)
//!   (A - σI)⁻¹ x ──iterate──▶ v(λ)
//! ```

use std::ops::{Add, Div, Mul};

use msmlump_core::matrix::{dot, norm2};
use msmlump_core::{Error, Matrix, Result, SplitMix64};

use crate::lu::lu_factor;

/// Eigenvalue as a `(re, im)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    pub fn modulus(&self) -> f64 {
        self.re.hypot(self.im)
    }

    pub fn conj(self) -> Self {
        Complex::new(self.re, -self.im)
    }

    /// Principal square root.
    pub fn sqrt(self) -> Self {
        let r = self.modulus();
        let re = (0.5 * (r + self.re)).max(0.0).sqrt();
        let im = (0.5 * (r - self.re)).max(0.0).sqrt();
        Complex::new(re, if self.im < 0.0 { -im } else { im })
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Div for Complex {
    type Output = Complex;

    fn div(self, rhs: Complex) -> Complex {
        let d = rhs.re * rhs.re + rhs.im * rhs.im;
        Complex::new(
            (self.re * rhs.re + self.im * rhs.im) / d,
            (self.im * rhs.re - self.re * rhs.im) / d,
        )
    }
}

/// Eigenpairs of a symmetric matrix, sorted by decreasing eigenvalue.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    /// Unit eigenvectors stored as columns.
    pub vectors: Matrix,
}

const MAX_JACOBI_SWEEPS: usize = 100;
const MAX_QR_ITERATIONS: usize = 60;

/// Cyclic Jacobi eigen-decomposition. The input must be square; only its
/// symmetric part is meaningful.
pub fn symmetric_eigen(a: &Matrix) -> Result<SymmetricEigen> {
    if !a.is_square() {
        return Err(Error::ShapeMismatch {
            expected: "square matrix".to_string(),
            got: format!("{}x{}", a.rows(), a.cols()),
        });
    }
    let n = a.rows();
    let mut m = a.clone();
    let mut v = Matrix::identity(n);

    let total: f64 = m.as_slice().iter().map(|x| x * x).sum();
    let tol = f64::EPSILON * f64::EPSILON * total.max(f64::MIN_POSITIVE);

    let mut converged = n <= 1;
    for _sweep in 0..MAX_JACOBI_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| m.get(p, q) * m.get(p, q))
            .sum();
        if off <= tol {
            converged = true;
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m.get(p, q);
                if apq == 0.0 {
                    continue;
                }
                let theta = (m.get(q, q) - m.get(p, p)) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                rotate(&mut m, &mut v, p, q, c, s);
            }
        }
    }
    if !converged {
        tracing::warn!(n, "Jacobi eigensolver hit the sweep limit");
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m.get(j, j).total_cmp(&m.get(i, i)));
    let values = order.iter().map(|&i| m.get(i, i)).collect();
    let vectors = v.select_columns(&order);
    Ok(SymmetricEigen { values, vectors })
}

/// Apply the Jacobi rotation `Jᵀ M J` and accumulate `V J`.
fn rotate(m: &mut Matrix, v: &mut Matrix, p: usize, q: usize, c: f64, s: f64) {
    let n = m.rows();
    for k in 0..n {
        let akp = m.get(k, p);
        let akq = m.get(k, q);
        m.set(k, p, c * akp - s * akq);
        m.set(k, q, s * akp + c * akq);
    }
    for k in 0..n {
        let apk = m.get(p, k);
        let aqk = m.get(q, k);
        m.set(p, k, c * apk - s * aqk);
        m.set(q, k, s * apk + c * aqk);
    }
    for k in 0..n {
        let vkp = v.get(k, p);
        let vkq = v.get(k, q);
        v.set(k, p, c * vkp - s * vkq);
        v.set(k, q, s * vkp + c * vkq);
    }
}

/// All eigenvalues of a general square matrix, in no particular order.
pub fn general_eigenvalues(a: &Matrix) -> Result<Vec<Complex>> {
    if !a.is_square() {
        return Err(Error::ShapeMismatch {
            expected: "square matrix".to_string(),
            got: format!("{}x{}", a.rows(), a.cols()),
        });
    }
    let n = a.rows();
    if n == 0 {
        return Ok(Vec::new());
    }
    // 1-based working copy: the Hessenberg and QR sweeps below index
    // neighbours like h[k-1], h[k+2] and read much more clearly that way.
    let mut h = vec![vec![0.0f64; n + 1]; n + 1];
    for i in 0..n {
        for j in 0..n {
            h[i + 1][j + 1] = a.get(i, j);
        }
    }
    elmhes(&mut h, n);
    for i in 3..=n {
        for j in 1..(i - 1) {
            h[i][j] = 0.0;
        }
    }
    let (wr, wi) = hqr(&mut h, n)?;
    Ok((1..=n)
        .map(|i| Complex {
            re: wr[i],
            im: wi[i],
        })
        .collect())
}

/// Reduction to upper Hessenberg form by stabilized elementary similarity
/// transforms.
fn elmhes(a: &mut [Vec<f64>], n: usize) {
    for m in 2..n {
        let mut x = 0.0f64;
        let mut i = m;
        for j in m..=n {
            if a[j][m - 1].abs() > x.abs() {
                x = a[j][m - 1];
                i = j;
            }
        }
        if i != m {
            for j in (m - 1)..=n {
                let tmp = a[i][j];
                a[i][j] = a[m][j];
                a[m][j] = tmp;
            }
            for row in a.iter_mut().take(n + 1).skip(1) {
                row.swap(i, m);
            }
        }
        if x != 0.0 {
            for i in (m + 1)..=n {
                let mut y = a[i][m - 1];
                if y != 0.0 {
                    y /= x;
                    a[i][m - 1] = y;
                    for j in m..=n {
                        a[i][j] -= y * a[m][j];
                    }
                    for j in 1..=n {
                        a[j][m] += y * a[j][i];
                    }
                }
            }
        }
    }
}

#[inline]
fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 {
        a.abs()
    } else {
        -a.abs()
    }
}

/// Francis double-shift QR on an upper Hessenberg matrix (1-based). Returns
/// real and imaginary parts, 1-based.
fn hqr(a: &mut [Vec<f64>], n: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut wr = vec![0.0f64; n + 1];
    let mut wi = vec![0.0f64; n + 1];

    let mut anorm = 0.0;
    for i in 1..=n {
        for j in (i.max(2) - 1)..=n {
            anorm += a[i][j].abs();
        }
    }

    let mut nn = n as isize;
    let mut t = 0.0f64;
    while nn >= 1 {
        let mut its = 0usize;
        loop {
            // Look for a single small subdiagonal element.
            let mut l = nn;
            while l >= 2 {
                let (lu, lm) = (l as usize, l as usize - 1);
                let mut s = a[lm][lm].abs() + a[lu][lu].abs();
                if s == 0.0 {
                    s = anorm;
                }
                if a[lu][lm].abs() + s == s {
                    a[lu][lm] = 0.0;
                    break;
                }
                l -= 1;
            }
            let nu = nn as usize;
            let mut x = a[nu][nu];
            if l == nn {
                // One root found.
                wr[nu] = x + t;
                wi[nu] = 0.0;
                nn -= 1;
            } else {
                let mut y = a[nu - 1][nu - 1];
                let mut w = a[nu][nu - 1] * a[nu - 1][nu];
                if l == nn - 1 {
                    // Two roots found.
                    let p = 0.5 * (y - x);
                    let q = p * p + w;
                    let mut z = q.abs().sqrt();
                    x += t;
                    if q >= 0.0 {
                        z = p + sign(z, p);
                        wr[nu - 1] = x + z;
                        wr[nu] = x + z;
                        if z != 0.0 {
                            wr[nu] = x - w / z;
                        }
                        wi[nu - 1] = 0.0;
                        wi[nu] = 0.0;
                    } else {
                        wr[nu - 1] = x + p;
                        wr[nu] = x + p;
                        wi[nu - 1] = -z;
                        wi[nu] = z;
                    }
                    nn -= 2;
                } else {
                    if its == MAX_QR_ITERATIONS {
                        return Err(Error::NoConvergence(format!(
                            "QR iteration exceeded {} sweeps",
                            MAX_QR_ITERATIONS
                        )));
                    }
                    if its == 10 || its == 20 {
                        // Exceptional shift.
                        t += x;
                        for i in 1..=nu {
                            a[i][i] -= x;
                        }
                        let s = a[nu][nu - 1].abs() + a[nu - 1][nu - 2].abs();
                        x = 0.75 * s;
                        y = x;
                        w = -0.4375 * s * s;
                    }
                    its += 1;

                    let lu = l as usize;
                    let mut m = nu - 2;
                    let mut p;
                    let mut q;
                    let mut r;
                    loop {
                        let z = a[m][m];
                        let r0 = x - z;
                        let s0 = y - z;
                        p = (r0 * s0 - w) / a[m + 1][m] + a[m][m + 1];
                        q = a[m + 1][m + 1] - z - r0 - s0;
                        r = a[m + 2][m + 1];
                        let s = p.abs() + q.abs() + r.abs();
                        p /= s;
                        q /= s;
                        r /= s;
                        if m == lu {
                            break;
                        }
                        let u = a[m][m - 1].abs() * (q.abs() + r.abs());
                        let v = p.abs() * (a[m - 1][m - 1].abs() + z.abs() + a[m + 1][m + 1].abs());
                        if u + v == v {
                            break;
                        }
                        m -= 1;
                    }
                    for i in (m + 2)..=nu {
                        a[i][i - 2] = 0.0;
                        if i != m + 2 {
                            a[i][i - 3] = 0.0;
                        }
                    }

                    // Double QR step on rows l..nn and columns m..nn.
                    for k in m..nu {
                        if k != m {
                            p = a[k][k - 1];
                            q = a[k + 1][k - 1];
                            r = 0.0;
                            if k != nu - 1 {
                                r = a[k + 2][k - 1];
                            }
                            x = p.abs() + q.abs() + r.abs();
                            if x != 0.0 {
                                p /= x;
                                q /= x;
                                r /= x;
                            }
                        }
                        let s = sign((p * p + q * q + r * r).sqrt(), p);
                        if s != 0.0 {
                            if k == m {
                                if lu != m {
                                    a[k][k - 1] = -a[k][k - 1];
                                }
                            } else {
                                a[k][k - 1] = -s * x;
                            }
                            p += s;
                            x = p / s;
                            y = q / s;
                            let z = r / s;
                            q /= p;
                            r /= p;
                            for j in k..=nu {
                                let mut pp = a[k][j] + q * a[k + 1][j];
                                if k != nu - 1 {
                                    pp += r * a[k + 2][j];
                                    a[k + 2][j] -= pp * z;
                                }
                                a[k + 1][j] -= pp * y;
                                a[k][j] -= pp * x;
                            }
                            let mmin = nu.min(k + 3);
                            for i in lu..=mmin {
                                let mut pp = x * a[i][k] + y * a[i][k + 1];
                                if k != nu - 1 {
                                    pp += z * a[i][k + 2];
                                    a[i][k + 2] -= pp * r;
                                }
                                a[i][k + 1] -= pp * q;
                                a[i][k] -= pp;
                            }
                        }
                    }
                }
            }
            if l >= nn - 1 {
                break;
            }
        }
    }
    Ok((wr, wi))
}

/// One unit-norm real eigenvector of `a` per entry of `lambdas`, by inverse
/// iteration, returned as the columns of a matrix.
///
/// Values closer together than `1e-8` are treated as one cluster: their
/// vectors are Gram-Schmidt orthogonalized against the earlier members so
/// a repeated eigenvalue yields independent vectors.
pub fn eigenvectors_for(a: &Matrix, lambdas: &[f64], seed: u64) -> Result<Matrix> {
    let n = a.rows();
    let mut out = Matrix::zeros(n, lambdas.len());
    let mut found: Vec<(f64, Vec<f64>)> = Vec::with_capacity(lambdas.len());
    let mut rng = SplitMix64::new(seed);

    for (col, &lambda) in lambdas.iter().enumerate() {
        let cluster: Vec<&Vec<f64>> = found
            .iter()
            .filter(|(l, _)| (l - lambda).abs() < 1e-8)
            .map(|(_, v)| v)
            .collect();
        let v = inverse_iteration(a, lambda, &cluster, &mut rng)?;
        out.set_column(col, &v);
        found.push((lambda, v));
    }
    Ok(out)
}

/// Single eigenvector for an (approximate) eigenvalue.
pub fn eigenvector_for(a: &Matrix, lambda: f64) -> Result<Vec<f64>> {
    let mut rng = SplitMix64::new(0x1D_E7EC);
    inverse_iteration(a, lambda, &[], &mut rng)
}

fn inverse_iteration(
    a: &Matrix,
    lambda: f64,
    orthogonal_to: &[&Vec<f64>],
    rng: &mut SplitMix64,
) -> Result<Vec<f64>> {
    let n = a.rows();
    if n == 0 {
        return Ok(Vec::new());
    }
    let scale = a.as_slice().iter().fold(0.0f64, |m, x| m.max(x.abs())).max(1.0);

    // Perturb the shift until (A - σI) factors; an exact eigenvalue makes it
    // singular.
    let mut delta = 1e-10 * scale;
    let lu = loop {
        let mut shifted = a.clone();
        for i in 0..n {
            shifted.set(i, i, a.get(i, i) - (lambda + delta));
        }
        match lu_factor(&shifted) {
            Ok(lu) => break lu,
            Err(Error::Singular(_)) if delta < 1e-2 * scale => delta *= 10.0,
            Err(e) => return Err(e),
        }
    };

    let mut x: Vec<f64> = (0..n).map(|_| rng.next_f64() + 0.5).collect();
    project_out(&mut x, orthogonal_to);
    normalize(&mut x);

    for _ in 0..50 {
        let mut y = lu.solve(&x)?;
        project_out(&mut y, orthogonal_to);
        let nrm = norm2(&y);
        if nrm == 0.0 || !nrm.is_finite() {
            return Err(Error::NoConvergence(format!(
                "inverse iteration collapsed for eigenvalue {}",
                lambda
            )));
        }
        y.iter_mut().for_each(|v| *v /= nrm);
        // Align sign with the previous iterate before measuring change.
        if dot(&x, &y) < 0.0 {
            y.iter_mut().for_each(|v| *v = -*v);
        }
        let change = x
            .iter()
            .zip(&y)
            .map(|(p, q)| (p - q).abs())
            .fold(0.0, f64::max);
        x = y;
        if change < 1e-13 {
            break;
        }
    }
    Ok(x)
}

/// Eigenvector `x + iy` of a real matrix for a complex eigenvalue
/// `λ = a + ib`, by inverse iteration on the real form of `A - λI`:
///
/// ```text
///   ⎡ A - aI    bI   ⎤ ⎡x⎤
///   ⎣  -bI    A - aI ⎦ ⎣y⎦
/// ```
///
/// Returns `(x, y)` with `|x|² + |y|² = 1`.
pub fn complex_eigenvector_for(a: &Matrix, lambda: Complex, seed: u64) -> Result<(Vec<f64>, Vec<f64>)> {
    let n = a.rows();
    if n == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    let scale = a.as_slice().iter().fold(0.0f64, |m, x| m.max(x.abs())).max(1.0);

    let mut delta = 1e-10 * scale;
    let lu = loop {
        let shift = lambda.re + delta;
        let mut m = Matrix::zeros(2 * n, 2 * n);
        for i in 0..n {
            for j in 0..n {
                let v = a.get(i, j);
                m.set(i, j, v);
                m.set(n + i, n + j, v);
            }
            m.set(i, i, a.get(i, i) - shift);
            m.set(n + i, n + i, a.get(i, i) - shift);
            m.set(i, n + i, lambda.im);
            m.set(n + i, i, -lambda.im);
        }
        match lu_factor(&m) {
            Ok(lu) => break lu,
            Err(Error::Singular(_)) if delta < 1e-2 * scale => delta *= 10.0,
            Err(e) => return Err(e),
        }
    };

    let mut rng = SplitMix64::new(seed);
    let mut z: Vec<f64> = (0..2 * n).map(|_| rng.next_f64() + 0.5).collect();
    normalize(&mut z);

    for _ in 0..50 {
        let mut w = lu.solve(&z)?;
        let nrm = norm2(&w);
        if nrm == 0.0 || !nrm.is_finite() {
            return Err(Error::NoConvergence(format!(
                "inverse iteration collapsed for eigenvalue {} + {}i",
                lambda.re, lambda.im
            )));
        }
        w.iter_mut().for_each(|v| *v /= nrm);
        align_phase(&z, &mut w, n);
        let change = z
            .iter()
            .zip(&w)
            .map(|(p, q)| (p - q).abs())
            .fold(0.0, f64::max);
        z = w;
        if change < 1e-13 {
            break;
        }
    }
    let y = z.split_off(n);
    Ok((z, y))
}

/// Rotate the complex vector `w` (real parts then imaginary parts) by the
/// unit phase that best matches it to `z`.
fn align_phase(z: &[f64], w: &mut [f64], n: usize) {
    let mut c = Complex::new(0.0, 0.0);
    for k in 0..n {
        let (x, y) = (z[k], z[n + k]);
        let (u, v) = (w[k], w[n + k]);
        c = c + Complex::new(u * x + v * y, u * y - v * x);
    }
    let m = c.modulus();
    if m == 0.0 {
        return;
    }
    let (cr, ci) = (c.re / m, c.im / m);
    for k in 0..n {
        let (u, v) = (w[k], w[n + k]);
        w[k] = u * cr - v * ci;
        w[n + k] = u * ci + v * cr;
    }
}

fn project_out(x: &mut [f64], basis: &[&Vec<f64>]) {
    for b in basis {
        let c = dot(x, b);
        for (xi, bi) in x.iter_mut().zip(b.iter()) {
            *xi -= c * bi;
        }
    }
}

fn normalize(x: &mut [f64]) {
    let nrm = norm2(x);
    if nrm > 0.0 {
        x.iter_mut().for_each(|v| *v /= nrm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_re(vals: &[Complex]) -> Vec<f64> {
        let mut re: Vec<f64> = vals.iter().map(|c| c.re).collect();
        re.sort_by(|a, b| b.total_cmp(a));
        re
    }

    #[test]
    fn test_symmetric_eigen_reconstructs() {
        let a = Matrix::from_rows(&[
            vec![4.0, 1.0, 0.5],
            vec![1.0, 3.0, 0.2],
            vec![0.5, 0.2, 1.0],
        ])
        .unwrap();
        let eig = symmetric_eigen(&a).unwrap();
        assert!(eig.values.windows(2).all(|w| w[0] >= w[1]));
        for k in 0..3 {
            let v = eig.vectors.column(k);
            let av = a.matvec(&v).unwrap();
            for i in 0..3 {
                assert!((av[i] - eig.values[k] * v[i]).abs() < 1e-10);
            }
            assert!((norm2(&v) - 1.0).abs() < 1e-12);
        }
        let trace: f64 = eig.values.iter().sum();
        assert!((trace - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_symmetric_eigen_diagonal() {
        let a = Matrix::from_diag(&[1.0, 5.0, 3.0]);
        let eig = symmetric_eigen(&a).unwrap();
        assert_eq!(eig.values, vec![5.0, 3.0, 1.0]);
    }

    #[test]
    fn test_general_eigenvalues_real() {
        // Upper-triangular: eigenvalues on the diagonal.
        let a = Matrix::from_rows(&[
            vec![2.0, 1.0, 3.0],
            vec![0.0, -1.0, 4.0],
            vec![0.0, 0.0, 0.5],
        ])
        .unwrap();
        let re = sorted_re(&general_eigenvalues(&a).unwrap());
        let expected = [2.0, 0.5, -1.0];
        for (r, e) in re.iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-10, "got {:?}", re);
        }
    }

    #[test]
    fn test_general_eigenvalues_rotation_is_complex() {
        let a = Matrix::from_rows(&[vec![0.0, -1.0], vec![1.0, 0.0]]).unwrap();
        let vals = general_eigenvalues(&a).unwrap();
        for v in &vals {
            assert!(v.re.abs() < 1e-12);
            assert!((v.im.abs() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_general_eigenvalues_stochastic_matrix() {
        let t = Matrix::from_rows(&[
            vec![0.9, 0.1, 0.0, 0.0],
            vec![0.05, 0.9, 0.05, 0.0],
            vec![0.0, 0.1, 0.8, 0.1],
            vec![0.2, 0.0, 0.1, 0.7],
        ])
        .unwrap();
        let vals = general_eigenvalues(&t).unwrap();
        let re = sorted_re(&vals);
        assert!((re[0] - 1.0).abs() < 1e-10, "leading eigenvalue {:?}", re);
        let tr: f64 = vals.iter().map(|c| c.re).sum();
        assert!((tr - t.trace()).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_iteration_finds_stationary_vector() {
        let t = Matrix::from_rows(&[vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap();
        let v = eigenvector_for(&t.transpose(), 1.0).unwrap();
        let s: f64 = v.iter().sum();
        let pi: Vec<f64> = v.iter().map(|x| x / s).collect();
        assert!((pi[0] - 2.0 / 3.0).abs() < 1e-8, "pi = {:?}", pi);
    }

    #[test]
    fn test_complex_eigenvector_of_rotation() {
        // Quarter turn scaled by 1/2: eigenvalues ±i/2.
        let a = Matrix::from_rows(&[
            vec![0.0, -0.5, 0.0],
            vec![0.5, 0.0, 0.0],
            vec![0.0, 0.0, 0.9],
        ])
        .unwrap();
        let lambda = Complex::new(0.0, 0.5);
        let (x, y) = complex_eigenvector_for(&a, lambda, 3).unwrap();
        let ax = a.matvec(&x).unwrap();
        let ay = a.matvec(&y).unwrap();
        // A(x + iy) = (a + ib)(x + iy)
        for i in 0..3 {
            assert!((ax[i] - (lambda.re * x[i] - lambda.im * y[i])).abs() < 1e-10);
            assert!((ay[i] - (lambda.im * x[i] + lambda.re * y[i])).abs() < 1e-10);
        }
        let nrm = dot(&x, &x) + dot(&y, &y);
        assert!((nrm - 1.0).abs() < 1e-12);
        assert!(x[2].abs() < 1e-10 && y[2].abs() < 1e-10);
    }

    #[test]
    fn test_complex_arithmetic() {
        let z = Complex::new(3.0, -4.0);
        assert_eq!(z.modulus(), 5.0);
        let r = z.sqrt();
        let sq = r * r;
        assert!((sq.re - 3.0).abs() < 1e-12 && (sq.im + 4.0).abs() < 1e-12);
        assert!(r.re > 0.0);
        let q = z / z.conj();
        assert!((q.modulus() - 1.0).abs() < 1e-12);
        assert_eq!(Complex::new(-4.0, 0.0).sqrt(), Complex::new(0.0, 2.0));
    }

    #[test]
    fn test_repeated_eigenvalue_gives_independent_vectors() {
        let a = Matrix::from_diag(&[2.0, 2.0, 1.0]);
        let vecs = eigenvectors_for(&a, &[2.0, 2.0], 9).unwrap();
        let c = dot(&vecs.column(0), &vecs.column(1));
        assert!(c.abs() < 1e-8, "columns not independent: {}", c);
    }
}
