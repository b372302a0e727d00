//! Transition path theory on a fitted model: committors and hub scores.
//!
//! Hub scores follow Dickson & Brooks, JCTC 8, 3044 (2012): the fraction of
//! `source -> sink` paths that pass through a waypoint, averaged over every
//! ordered pair of other states.

use msmlump_core::matrix::dot;
use msmlump_core::{parallel_map_chunks, Error, Matrix, Result};
use msmlump_linalg::solve;

use crate::label::StateLabel;
use crate::model::MarkovStateModel;

fn check_states(states: &[usize], n: usize) -> Result<()> {
    match states.iter().find(|&&s| s >= n) {
        Some(&s) => Err(Error::OutOfRange { index: s, len: n }),
        None => Ok(()),
    }
}

/// Forward committors: probability that a walker starting in each state
/// reaches `sinks` before `sources`.
pub fn committors<L: StateLabel>(
    sources: &[usize],
    sinks: &[usize],
    msm: &MarkovStateModel<L>,
) -> Result<Vec<f64>> {
    committors_for(sources, sinks, msm.transmat())
}

/// [`committors`] on a bare transition matrix.
pub fn committors_for(sources: &[usize], sinks: &[usize], tprob: &Matrix) -> Result<Vec<f64>> {
    let n = tprob.rows();
    check_states(sources, n)?;
    check_states(sinks, n)?;
    if sources.is_empty() || sinks.is_empty() {
        return Err(Error::InvalidParameter(
            "sources and sinks must be non-empty".to_string(),
        ));
    }
    if sources.iter().any(|s| sinks.contains(s)) {
        return Err(Error::InvalidParameter(
            "sources and sinks must be disjoint".to_string(),
        ));
    }

    let mut lhs = Matrix::identity(n);
    for i in 0..n {
        for j in 0..n {
            lhs[(i, j)] -= tprob[(i, j)];
        }
    }
    for &a in sources.iter().chain(sinks) {
        lhs.row_mut(a).iter_mut().for_each(|v| *v = 0.0);
        for i in 0..n {
            lhs[(i, a)] = 0.0;
        }
        lhs[(a, a)] = 1.0;
    }

    let mut ident_sinks = vec![0.0; n];
    for &b in sinks {
        ident_sinks[b] = 1.0;
    }
    let mut rhs = tprob.matvec(&ident_sinks)?;
    for &a in sources {
        rhs[a] = 0.0;
    }
    for &b in sinks {
        rhs[b] = 1.0;
    }
    solve(&lhs, &rhs)
}

/// Probability of visiting `waypoint` on the way from `source` to `sink`,
/// for a walker starting in each state.
pub fn conditional_committors<L: StateLabel>(
    source: usize,
    sink: usize,
    waypoint: usize,
    msm: &MarkovStateModel<L>,
) -> Result<Vec<f64>> {
    let forward = committors_for(&[source], &[sink], msm.transmat())?;
    conditional_committors_for(source, sink, waypoint, msm.transmat(), &forward)
}

fn conditional_committors_for(
    source: usize,
    sink: usize,
    waypoint: usize,
    tprob: &Matrix,
    forward: &[f64],
) -> Result<Vec<f64>> {
    let n_states = tprob.rows();
    check_states(&[source, sink, waypoint], n_states)?;
    if source == sink || source == waypoint || sink == waypoint {
        return Err(Error::InvalidParameter(format!(
            "source ({}), sink ({}) and waypoint ({}) must be distinct",
            source, sink, waypoint
        )));
    }

    // Transient states first, then [source, sink, waypoint].
    let absorbing = [source, sink, waypoint];
    let mut perm: Vec<usize> = (0..n_states).filter(|i| !absorbing.contains(i)).collect();
    let n = perm.len();
    perm.extend_from_slice(&absorbing);

    // Absorption probability into the waypoint: (I - P) b = R[:, waypoint].
    let mut b = if n > 0 {
        let mut i_minus_p = Matrix::identity(n);
        let mut r = vec![0.0; n];
        for a in 0..n {
            for c in 0..n {
                i_minus_p[(a, c)] -= tprob[(perm[a], perm[c])];
            }
            r[a] = tprob[(perm[a], waypoint)];
        }
        solve(&i_minus_p, &r)?
    } else {
        Vec::new()
    };
    b.extend_from_slice(&[0.0, 0.0, 1.0]);

    let mut out = vec![0.0; n_states];
    for (pos, &state) in perm.iter().enumerate() {
        out[state] = b[pos] * forward[waypoint];
    }
    Ok(out)
}

/// Fraction of `source -> sink` paths that pass through `waypoint`.
pub fn fraction_visited<L: StateLabel>(
    source: usize,
    sink: usize,
    waypoint: usize,
    msm: &MarkovStateModel<L>,
) -> Result<f64> {
    fraction_visited_for(source, sink, waypoint, msm.transmat())
}

fn fraction_visited_for(source: usize, sink: usize, waypoint: usize, tprob: &Matrix) -> Result<f64> {
    let forward = committors_for(&[source], &[sink], tprob)?;
    let cond = conditional_committors_for(source, sink, waypoint, tprob, &forward)?;
    let row = tprob.row(source);
    Ok(dot(row, &cond) / dot(row, &forward))
}

/// Hub score of each waypoint (all states when `None`).
pub fn hub_scores<L: StateLabel>(
    msm: &MarkovStateModel<L>,
    waypoints: Option<&[usize]>,
) -> Result<Vec<f64>> {
    let tprob = msm.transmat();
    let n_states = tprob.rows();
    if n_states < 3 {
        return Err(Error::InvalidParameter(format!(
            "hub scores need at least 3 states, model has {}",
            n_states
        )));
    }
    let all: Vec<usize> = (0..n_states).collect();
    let waypoints = waypoints.unwrap_or(&all);
    check_states(waypoints, n_states)?;

    let n_pairs = ((n_states - 1) * (n_states - 2)) as f64;
    let chunks = parallel_map_chunks(0, waypoints.len(), usize::MAX, |lo, hi| {
        waypoints[lo..hi]
            .iter()
            .map(|&waypoint| {
                let mut total = 0.0;
                for source in (0..n_states).filter(|&s| s != waypoint) {
                    for sink in (0..n_states).filter(|&s| s != waypoint && s != source) {
                        total += fraction_visited_for(source, sink, waypoint, tprob)?;
                    }
                }
                Ok(total / n_pairs)
            })
            .collect::<Result<Vec<f64>>>()
    });
    let mut scores = Vec::with_capacity(waypoints.len());
    for chunk in chunks {
        scores.extend(chunk?);
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear chain 0 - 1 - 2 - 3 with symmetric hopping.
    fn chain() -> Matrix {
        Matrix::from_rows(&[
            vec![0.5, 0.5, 0.0, 0.0],
            vec![0.25, 0.5, 0.25, 0.0],
            vec![0.0, 0.25, 0.5, 0.25],
            vec![0.0, 0.0, 0.5, 0.5],
        ])
        .unwrap()
    }

    #[test]
    fn test_committors_linear_chain() {
        let q = committors_for(&[0], &[3], &chain()).unwrap();
        assert!(q[0].abs() < 1e-15);
        assert!((q[3] - 1.0).abs() < 1e-15);
        assert!((q[1] - 1.0 / 3.0).abs() < 1e-12, "q = {:?}", q);
        assert!((q[2] - 2.0 / 3.0).abs() < 1e-12, "q = {:?}", q);
    }

    #[test]
    fn test_committors_reject_overlap() {
        assert!(committors_for(&[0, 1], &[1], &chain()).is_err());
        assert!(committors_for(&[0], &[7], &chain()).is_err());
    }

    #[test]
    fn test_bottleneck_is_always_visited() {
        // Every path from 0 to 3 crosses 1 and 2.
        let t = chain();
        let f = fraction_visited_for(0, 3, 1, &t).unwrap();
        assert!((f - 1.0).abs() < 1e-10, "fraction = {}", f);
        let f = fraction_visited_for(0, 3, 2, &t).unwrap();
        assert!((f - 1.0).abs() < 1e-10, "fraction = {}", f);
    }

    #[test]
    fn test_side_state_is_sometimes_visited() {
        // 0 and 2 connect directly and through 1.
        let t = Matrix::from_rows(&[
            vec![0.4, 0.3, 0.3],
            vec![0.3, 0.4, 0.3],
            vec![0.3, 0.3, 0.4],
        ])
        .unwrap();
        let f = fraction_visited_for(0, 2, 1, &t).unwrap();
        assert!(f > 0.0 && f < 1.0, "fraction = {}", f);
        // q+(1) = 1/2, so T[0]·q_cond = 0.15 against T[0]·q+ = 0.45.
        assert!((f - 1.0 / 3.0).abs() < 1e-10, "fraction = {}", f);
    }

    #[test]
    fn test_conditional_committors_three_states() {
        let t = Matrix::from_rows(&[
            vec![0.4, 0.3, 0.3],
            vec![0.3, 0.4, 0.3],
            vec![0.3, 0.3, 0.4],
        ])
        .unwrap();
        let forward = committors_for(&[0], &[2], &t).unwrap();
        let q = conditional_committors_for(0, 2, 1, &t, &forward).unwrap();
        assert_eq!(q[0], 0.0);
        assert_eq!(q[2], 0.0);
        assert!((q[1] - forward[1]).abs() < 1e-12);
    }
}
