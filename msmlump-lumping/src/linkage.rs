//! Ward agglomerative clustering on a precomputed distance matrix.
//!
//! Nearest-neighbour chain over a dense matrix, O(m²) memory and time per
//! merge in the worst case. Ward distances between merged clusters follow
//! the Lance-Williams update
//!
//! ```text
//!   d(i∪j, k) = sqrt( ((n_i+n_k) d_ik² + (n_j+n_k) d_jk² - n_k d_ij²) / (n_i+n_j+n_k) )
//! ```
//!
//! Output follows the usual dendrogram convention: points are clusters
//! `0..m`, merge `t` creates cluster `m + t`, and merges are sorted by
//! distance.

use msmlump_core::{Error, Matrix, Result};
use serde::{Deserialize, Serialize};

use crate::lumper::contiguous_labels;
use crate::metric::RowMetric;

/// One dendrogram step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Smaller cluster id of the pair.
    pub a: usize,
    pub b: usize,
    pub distance: f64,
    /// Number of points in the new cluster.
    pub size: usize,
}

/// Symmetric distance matrix between the rows of `x` listed in `rows`.
pub fn pairwise<M: RowMetric + ?Sized>(x: &Matrix, rows: &[usize], metric: &M) -> Matrix {
    let m = rows.len();
    let mut d = Matrix::zeros(m, m);
    for a in 0..m {
        for b in a + 1..m {
            let v = metric.distance(x.row(rows[a]), x.row(rows[b]));
            d[(a, b)] = v;
            d[(b, a)] = v;
        }
    }
    d
}

/// Ward linkage of a symmetric distance matrix. Returns `m - 1` merges.
pub fn ward_linkage(dist: &Matrix) -> Result<Vec<Merge>> {
    let m = dist.rows();
    if !dist.is_square() {
        return Err(Error::ShapeMismatch {
            expected: "square distance matrix".to_string(),
            got: format!("{:?}", dist.shape()),
        });
    }
    let mut d = dist.clone();
    let mut size = vec![1usize; m];
    let mut active = vec![true; m];
    let mut chain: Vec<usize> = Vec::with_capacity(m);
    let mut raw: Vec<(usize, usize, f64)> = Vec::with_capacity(m.saturating_sub(1));

    for _ in 1..m {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&a| a) {
                chain.push(first);
            }
        }

        let (x, y, dxy) = loop {
            let x = chain[chain.len() - 1];
            let prev = (chain.len() > 1).then(|| chain[chain.len() - 2]);
            let (mut y, mut best) = match prev {
                Some(p) => (p, d[(x, p)]),
                None => (x, f64::INFINITY),
            };
            for i in 0..m {
                if active[i] && i != x && d[(x, i)] < best {
                    best = d[(x, i)];
                    y = i;
                }
            }
            if prev == Some(y) {
                chain.truncate(chain.len() - 2);
                break (x, y, best);
            }
            chain.push(y);
        };

        // Cluster `x` is folded into slot `y`.
        let (nx, ny) = (size[x] as f64, size[y] as f64);
        active[x] = false;
        for k in 0..m {
            if !active[k] || k == y {
                continue;
            }
            let nk = size[k] as f64;
            let sq = ((nx + nk) * d[(x, k)].powi(2) + (ny + nk) * d[(y, k)].powi(2)
                - nk * dxy * dxy)
                / (nx + ny + nk);
            let v = sq.max(0.0).sqrt();
            d[(y, k)] = v;
            d[(k, y)] = v;
        }
        size[y] += size[x];
        raw.push((x.min(y), x.max(y), dxy));
    }

    raw.sort_by(|p, q| p.2.total_cmp(&q.2));
    Ok(label_merges(&raw, m))
}

/// Rename point-representative merges into dendrogram cluster ids.
fn label_merges(raw: &[(usize, usize, f64)], m: usize) -> Vec<Merge> {
    let mut uf = UnionFind::new(2 * m);
    let mut sizes = vec![1usize; 2 * m];
    raw.iter()
        .enumerate()
        .map(|(t, &(x, y, distance))| {
            let (ra, rb) = (uf.find(x), uf.find(y));
            let (a, b) = (ra.min(rb), ra.max(rb));
            let new = m + t;
            sizes[new] = sizes[a] + sizes[b];
            uf.parent[a] = new;
            uf.parent[b] = new;
            Merge {
                a,
                b,
                distance,
                size: sizes[new],
            }
        })
        .collect()
}

/// Flat clustering with exactly `n_clusters` clusters, labels contiguous in
/// order of first appearance.
pub fn cut(merges: &[Merge], m: usize, n_clusters: usize) -> Vec<usize> {
    let mut uf = UnionFind::new(2 * m);
    let n_apply = m.saturating_sub(n_clusters).min(merges.len());
    for (t, merge) in merges[..n_apply].iter().enumerate() {
        uf.parent[merge.a] = m + t;
        uf.parent[merge.b] = m + t;
    }
    let roots: Vec<usize> = (0..m).map(|i| uf.find(i)).collect();
    contiguous_labels(&roots)
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Euclidean;

    fn points_1d(xs: &[f64]) -> Matrix {
        Matrix::from_vec(xs.len(), 1, xs.to_vec()).unwrap()
    }

    #[test]
    fn test_ward_two_pairs() {
        let x = points_1d(&[0.0, 1.0, 10.0, 12.0]);
        let rows: Vec<usize> = (0..4).collect();
        let merges = ward_linkage(&pairwise(&x, &rows, &Euclidean)).unwrap();
        assert_eq!(merges.len(), 3);

        assert_eq!((merges[0].a, merges[0].b), (0, 1));
        assert!((merges[0].distance - 1.0).abs() < 1e-12);
        assert_eq!((merges[1].a, merges[1].b), (2, 3));
        assert!((merges[1].distance - 2.0).abs() < 1e-12);
        assert_eq!((merges[2].a, merges[2].b), (4, 5));
        assert_eq!(merges[2].size, 4);

        // sqrt(2 n_a n_b / (n_a + n_b)) * |0.5 - 11|
        let expected = 2f64.sqrt() * 10.5;
        assert!(
            (merges[2].distance - expected).abs() < 1e-9,
            "{} vs {}",
            merges[2].distance,
            expected
        );
    }

    #[test]
    fn test_distances_non_decreasing() {
        let x = points_1d(&[0.0, 0.3, 0.35, 4.0, 4.2, 9.0, 9.1, 9.15]);
        let rows: Vec<usize> = (0..8).collect();
        let merges = ward_linkage(&pairwise(&x, &rows, &Euclidean)).unwrap();
        assert_eq!(merges.len(), 7);
        assert!(merges.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(merges[6].size, 8);
    }

    #[test]
    fn test_cut() {
        let x = points_1d(&[0.0, 10.0, 0.5, 10.5, 20.0]);
        let rows: Vec<usize> = (0..5).collect();
        let merges = ward_linkage(&pairwise(&x, &rows, &Euclidean)).unwrap();
        assert_eq!(cut(&merges, 5, 3), vec![0, 1, 0, 1, 2]);
        assert_eq!(cut(&merges, 5, 5), vec![0, 1, 2, 3, 4]);
        assert!(cut(&merges, 5, 1).iter().all(|&l| l == 0));
    }

    #[test]
    fn test_single_point() {
        let merges = ward_linkage(&Matrix::zeros(1, 1)).unwrap();
        assert!(merges.is_empty());
        assert_eq!(cut(&merges, 1, 1), vec![0]);
    }
}
