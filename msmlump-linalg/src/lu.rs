//! LU factorization `PA = LU` with partial pivoting, on row-major `Matrix`.
//!
//! The factors share one buffer: the strict lower triangle holds L (unit
//! diagonal implied), the upper triangle holds U. Inner loops run as axpy
//! updates on contiguous row slices.

use msmlump_core::{Error, Matrix, Result};

/// Packed LU factors plus the row pivots applied during elimination.
#[derive(Debug, Clone)]
pub struct Lu {
    factors: Matrix,
    /// `ipiv[k]` is the row swapped with row k at step k.
    ipiv: Vec<usize>,
}

/// Factor a square matrix. Returns `Error::Singular(k)` when column k has no
/// non-zero pivot.
pub fn lu_factor(a: &Matrix) -> Result<Lu> {
    if !a.is_square() {
        return Err(Error::ShapeMismatch {
            expected: "square matrix".to_string(),
            got: format!("{}x{}", a.rows(), a.cols()),
        });
    }
    let n = a.rows();
    let mut lu = a.clone();
    let mut ipiv = vec![0usize; n];
    let buf = lu.as_mut_slice();

    for k in 0..n {
        let (max_idx, max_val) = pivot_search(buf, k, n);
        ipiv[k] = max_idx;
        if max_val == 0.0 || !max_val.is_finite() {
            return Err(Error::Singular(k));
        }
        if max_idx != k {
            swap_rows(buf, k, max_idx, n, n);
        }

        let inv_pivot = 1.0 / buf[k * n + k];
        for i in (k + 1)..n {
            buf[i * n + k] *= inv_pivot;
        }
        trailing_update(buf, k, n);
    }

    Ok(Lu { factors: lu, ipiv })
}

/// Max |A[i, col]| for i in col..n.
#[inline]
fn pivot_search(a: &[f64], col: usize, n: usize) -> (usize, f64) {
    let mut max_val = 0.0f64;
    let mut max_idx = col;
    for i in col..n {
        let val = a[i * n + col].abs();
        if val > max_val {
            max_val = val;
            max_idx = i;
        }
    }
    (max_idx, max_val)
}

#[inline]
fn swap_rows(a: &mut [f64], r1: usize, r2: usize, width: usize, ld: usize) {
    for j in 0..width {
        a.swap(r1 * ld + j, r2 * ld + j);
    }
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `A[i, k+1..] -= L[i, k] * U[k, k+1..]` for every row below k.
#[inline]
fn trailing_update(a: &mut [f64], k: usize, n: usize) {
    let trail = n - k - 1;
    if trail == 0 {
        return;
    }
    let (head, tail) = a.split_at_mut((k + 1) * n);
    let row_k = &head[k * n + k + 1..k * n + n];
    for r in 0..(n - k - 1) {
        let row = &mut tail[r * n..(r + 1) * n];
        let lik = row[k];
        if lik == 0.0 {
            continue;
        }
        axpy(-lik, row_k, &mut row[k + 1..]);
    }
}

impl Lu {
    pub fn dim(&self) -> usize {
        self.ipiv.len()
    }

    /// Solve `A X = B` in place on a row-major `n x nrhs` buffer.
    fn solve_in_place(&self, b: &mut [f64], nrhs: usize) {
        let n = self.dim();
        let a = self.factors.as_slice();

        for k in 0..n {
            if self.ipiv[k] != k {
                swap_rows(b, k, self.ipiv[k], nrhs, nrhs);
            }
        }

        // Forward substitution with unit-diagonal L.
        for k in 0..n {
            let (head, tail) = b.split_at_mut((k + 1) * nrhs);
            let b_k = &head[k * nrhs..];
            for i in (k + 1)..n {
                let lik = a[i * n + k];
                if lik == 0.0 {
                    continue;
                }
                let off = (i - k - 1) * nrhs;
                axpy(-lik, b_k, &mut tail[off..off + nrhs]);
            }
        }

        // Back substitution with U.
        for k in (0..n).rev() {
            let inv_ukk = 1.0 / a[k * n + k];
            let (head, tail) = b.split_at_mut(k * nrhs);
            let b_k = &mut tail[..nrhs];
            b_k.iter_mut().for_each(|v| *v *= inv_ukk);
            for i in 0..k {
                let uik = a[i * n + k];
                if uik == 0.0 {
                    continue;
                }
                axpy(-uik, b_k, &mut head[i * nrhs..(i + 1) * nrhs]);
            }
        }
    }

    /// Solve `A x = b` for a single right-hand side.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        if b.len() != self.dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("right-hand side of length {}", self.dim()),
                got: format!("length {}", b.len()),
            });
        }
        let mut x = b.to_vec();
        self.solve_in_place(&mut x, 1);
        Ok(x)
    }

    /// Solve `A X = B` for every column of `B`.
    pub fn solve_matrix(&self, b: &Matrix) -> Result<Matrix> {
        if b.rows() != self.dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("{} rows", self.dim()),
                got: format!("{}x{}", b.rows(), b.cols()),
            });
        }
        let mut x = b.clone();
        let nrhs = x.cols();
        self.solve_in_place(x.as_mut_slice(), nrhs);
        Ok(x)
    }

    /// Determinant from the diagonal of U and the pivot parity.
    pub fn determinant(&self) -> f64 {
        let n = self.dim();
        let mut det = 1.0;
        for k in 0..n {
            det *= self.factors.get(k, k);
            if self.ipiv[k] != k {
                det = -det;
            }
        }
        det
    }
}

/// Solve `A x = b`.
pub fn solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    lu_factor(a)?.solve(b)
}

/// `A⁻¹`.
pub fn inverse(a: &Matrix) -> Result<Matrix> {
    let lu = lu_factor(a)?;
    lu.solve_matrix(&Matrix::identity(a.rows()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(&[
            vec![2.0, 1.0, 1.0],
            vec![4.0, -6.0, 0.0],
            vec![-2.0, 7.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_solve_known_system() {
        let x = solve(&sample(), &[5.0, -2.0, 9.0]).unwrap();
        let expected = [1.0, 1.0, 2.0];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-12, "x = {:?}", x);
        }
    }

    #[test]
    fn test_inverse_roundtrip() {
        let a = sample();
        let inv = inverse(&a).unwrap();
        let prod = a.matmul(&inv).unwrap();
        assert!(prod.max_abs_diff(&Matrix::identity(3)) < 1e-12);
    }

    #[test]
    fn test_determinant() {
        let lu = lu_factor(&sample()).unwrap();
        assert!((lu.determinant() - (-16.0)).abs() < 1e-10, "det = {}", lu.determinant());
    }

    #[test]
    fn test_singular_detected() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(matches!(lu_factor(&a), Err(Error::Singular(1))));
    }

    #[test]
    fn test_solve_matrix_multiple_rhs() {
        let a = sample();
        let b = Matrix::from_rows(&[vec![5.0, 4.0], vec![-2.0, -2.0], vec![9.0, 7.0]]).unwrap();
        let x = lu_factor(&a).unwrap().solve_matrix(&b).unwrap();
        let back = a.matmul(&x).unwrap();
        assert!(back.max_abs_diff(&b) < 1e-12);
    }

    #[test]
    fn test_non_square_rejected() {
        assert!(lu_factor(&Matrix::zeros(2, 3)).is_err());
    }
}
