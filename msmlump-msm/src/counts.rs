//! Transition counting and ergodic trimming.

use std::collections::BTreeSet;

use msmlump_core::{Error, Matrix, Result};

use crate::label::StateLabel;

/// Count matrix over every label observed in the input.
#[derive(Debug, Clone)]
pub struct RawCounts<L> {
    /// Sorted distinct labels; label `labels[i]` is state `i`.
    pub labels: Vec<L>,
    pub counts: Matrix,
}

/// Count `(x[t], x[t + lag])` transitions.
///
/// With `sliding_window` every frame starts a transition and the result is
/// divided by `lag_time`, otherwise frames are strided by `lag_time`. Pairs
/// that touch a missing frame are not counted.
pub fn transition_counts<L, S>(
    sequences: &[S],
    lag_time: usize,
    sliding_window: bool,
) -> Result<RawCounts<L>>
where
    L: StateLabel,
    S: AsRef<[L]>,
{
    if lag_time == 0 {
        return Err(Error::InvalidParameter("lag_time must be at least 1".to_string()));
    }
    let labels: Vec<L> = sequences
        .iter()
        .flat_map(|s| s.as_ref().iter())
        .filter(|l| !l.is_missing())
        .cloned()
        .collect::<BTreeSet<L>>()
        .into_iter()
        .collect();
    if labels.is_empty() {
        return Err(Error::Empty("no labelled frames in the input sequences".to_string()));
    }

    let n = labels.len();
    let mut counts = Matrix::zeros(n, n);
    let step = if sliding_window { 1 } else { lag_time };
    for seq in sequences {
        let mapped: Vec<Option<usize>> = seq
            .as_ref()
            .iter()
            .map(|l| {
                if l.is_missing() {
                    None
                } else {
                    labels.binary_search(l).ok()
                }
            })
            .collect();
        if mapped.len() <= lag_time {
            continue;
        }
        for t in (0..mapped.len() - lag_time).step_by(step) {
            if let (Some(a), Some(b)) = (mapped[t], mapped[t + lag_time]) {
                counts[(a, b)] += 1.0;
            }
        }
    }
    if sliding_window {
        counts.scale(1.0 / lag_time as f64);
    }
    Ok(RawCounts { labels, counts })
}

/// Strongly connected components of the graph with an edge `i -> j`
/// whenever `counts[i][j] >= threshold`. Returns the component id of every
/// node and the number of components.
pub fn strongly_connected_components(counts: &Matrix, threshold: f64) -> (Vec<usize>, usize) {
    let n = counts.rows();
    let edge = |v: usize, w: usize| counts.get(v, w) >= threshold;

    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut component = vec![usize::MAX; n];
    let mut next_index = 0usize;
    let mut n_components = 0usize;

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        // Iterative Tarjan: (node, next neighbour to scan).
        let mut call_stack: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = Some(next_index);
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(v, start)) = call_stack.last() {
            let mut child = None;
            for w in start..n {
                if !edge(v, w) {
                    continue;
                }
                match index[w] {
                    None => {
                        child = Some(w);
                        break;
                    }
                    Some(iw) if on_stack[w] => low[v] = low[v].min(iw),
                    Some(_) => {}
                }
            }

            if let Some(w) = child {
                if let Some(top) = call_stack.last_mut() {
                    top.1 = w + 1;
                }
                index[w] = Some(next_index);
                low[w] = next_index;
                next_index += 1;
                stack.push(w);
                on_stack[w] = true;
                call_stack.push((w, 0));
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if Some(low[v]) == index[v] {
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component[w] = n_components;
                    if w == v {
                        break;
                    }
                }
                n_components += 1;
            }
        }
    }
    (component, n_components)
}

/// Outcome of ergodic trimming.
#[derive(Debug, Clone)]
pub struct ErgodicSubset {
    /// Retained state indices, ascending.
    pub keep: Vec<usize>,
    pub n_components: usize,
    /// Share of all counts carried by rows of the retained component.
    pub percent_retained: f64,
}

/// Keep the strongly connected component with the most counts.
pub fn ergodic_subset(counts: &Matrix, threshold: f64) -> ErgodicSubset {
    let (component, n_components) = strongly_connected_components(counts, threshold);
    let row_sums = counts.row_sums();
    let mut component_counts = vec![0.0f64; n_components];
    for (state, &c) in component.iter().enumerate() {
        component_counts[c] += row_sums[state];
    }
    let total: f64 = row_sums.iter().sum();

    let mut best = 0;
    for c in 1..n_components {
        if component_counts[c] > component_counts[best] {
            best = c;
        }
    }
    let keep: Vec<usize> = (0..counts.rows()).filter(|&s| component[s] == best).collect();
    let percent_retained = if total > 0.0 {
        100.0 * component_counts.get(best).copied().unwrap_or(0.0) / total
    } else {
        100.0
    };
    ErgodicSubset {
        keep,
        n_components,
        percent_retained,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_no_trim() {
        let raw = transition_counts(&[vec![1u32; 9]], 1, true).unwrap();
        assert_eq!(raw.labels, vec![1]);
        assert_eq!(raw.counts.as_slice(), &[8.0]);
    }

    #[test]
    fn test_sliding_and_strided_counts_agree() {
        let mut seq = vec![1u32; 4];
        seq.extend([2u32; 4]);
        seq.extend([1u32; 4]);
        let sliding = transition_counts(&[seq.clone()], 2, true).unwrap();
        let strided = transition_counts(&[seq], 2, false).unwrap();
        assert_eq!(sliding.counts, strided.counts);
        assert_eq!(sliding.counts.as_slice(), &[2.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_missing_frames_break_transitions() {
        let seq = vec![Some(0u8), Some(1), None, Some(1), Some(0)];
        let raw = transition_counts(&[seq], 1, true).unwrap();
        assert_eq!(raw.labels, vec![Some(0), Some(1)]);
        assert_eq!(raw.counts.as_slice(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_empty_input_rejected() {
        let seqs: Vec<Vec<Option<u8>>> = vec![vec![None, None]];
        assert!(matches!(
            transition_counts(&seqs, 1, true),
            Err(Error::Empty(_))
        ));
        assert!(transition_counts(&[vec![1u8, 2]], 0, true).is_err());
    }

    #[test]
    fn test_scc_two_cycles_joined_one_way() {
        // 0 <-> 1, 2 <-> 3, and 1 -> 2 only.
        let c = Matrix::from_rows(&[
            vec![0.0, 5.0, 0.0, 0.0],
            vec![5.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 3.0],
            vec![0.0, 0.0, 3.0, 0.0],
        ])
        .unwrap();
        let (comp, n) = strongly_connected_components(&c, 1.0);
        assert_eq!(n, 2);
        assert_eq!(comp[0], comp[1]);
        assert_eq!(comp[2], comp[3]);
        assert_ne!(comp[0], comp[2]);

        let subset = ergodic_subset(&c, 1.0);
        assert_eq!(subset.keep, vec![0, 1]);
        assert!((subset.percent_retained - 100.0 * 11.0 / 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_threshold_connects_everything() {
        let c = Matrix::from_rows(&[vec![8.0, 1.0], vec![0.0, 0.0]]).unwrap();
        let subset = ergodic_subset(&c, 0.0);
        assert_eq!(subset.keep, vec![0, 1]);
        assert_eq!(subset.n_components, 1);
    }

    #[test]
    fn test_trim_dead_end_state() {
        let raw = transition_counts(&[vec![1u32, 1, 1, 1, 1, 1, 1, 1, 1, 2]], 1, true).unwrap();
        let subset = ergodic_subset(&raw.counts, 1.0);
        assert_eq!(subset.keep, vec![0]);
        assert_eq!(subset.n_components, 2);
    }
}
