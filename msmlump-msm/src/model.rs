//! The fitted Markov state model.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use msmlump_core::{Error, Matrix, Result, SplitMix64};
use msmlump_linalg::inverse;
use serde::{Deserialize, Serialize};

use crate::config::{MapMode, MsmConfig};
use crate::counts::{ergodic_subset, transition_counts};
use crate::eigensystem::{eigensystem, implied_timescales};
use crate::estimate::estimate;
use crate::label::StateLabel;

/// Where [`MarkovStateModel::sample_discrete`] starts.
#[derive(Debug, Clone, PartialEq)]
pub enum StartState<L> {
    /// Begin in the state with this label.
    Label(L),
    /// Draw the first state from these weights over state indices.
    Distribution(Vec<f64>),
}

/// Reversible (or not) Markov state model estimated from labelled
/// trajectories.
///
/// A model only exists fitted: [`MarkovStateModel::fit`] counts
/// transitions, trims to the largest strongly connected component,
/// estimates the transition matrix and its leading eigenpairs.
///
/// ```
/// use msmlump_msm::{MarkovStateModel, MsmConfig};
///
/// let seq = vec!['a', 'a', 'b', 'b', 'a', 'a', 'b', 'b'];
/// let msm = MarkovStateModel::fit(&MsmConfig::default().quiet(), &[seq]).unwrap();
/// assert_eq!(msm.state_labels(), &['a', 'b']);
/// assert_eq!(msm.transform_clip(&[vec!['a', 'x', 'b']]), vec![vec![0], vec![1]]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovStateModel<L> {
    config: MsmConfig,
    state_labels: Vec<L>,
    countsmat: Matrix,
    transmat: Matrix,
    populations: Vec<f64>,
    eigenvalues: Vec<f64>,
    #[serde(default)]
    eigenvalues_imag: Vec<f64>,
    left_eigenvectors: Matrix,
    right_eigenvectors: Matrix,
    n_components: usize,
    percent_retained: f64,
    #[serde(with = "nan_as_null")]
    training_score: f64,
}

/// JSON has no NaN; a singular training score is stored as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        let opt = if v.is_nan() { None } else { Some(*v) };
        opt.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

impl<L: StateLabel> MarkovStateModel<L> {
    /// Fit a model to one or more label sequences.
    pub fn fit<S: AsRef<[L]>>(config: &MsmConfig, sequences: &[S]) -> Result<Self> {
        validate(config)?;
        let raw = transition_counts(sequences, config.lag_time, config.sliding_window)?;
        if raw.counts.sum() <= 0.0 {
            return Err(Error::Empty(format!(
                "no transitions at lag time {}",
                config.lag_time
            )));
        }

        let threshold = config.ergodic_threshold();
        let subset = ergodic_subset(&raw.counts, threshold);
        if config.verbose {
            tracing::info!(
                n_components = subset.n_components,
                threshold,
                percent_retained = subset.percent_retained,
                "ergodic trimming kept the largest strongly connected component"
            );
        }
        let countsmat = raw.counts.select(&subset.keep, &subset.keep);
        let state_labels: Vec<L> = subset.keep.iter().map(|&i| raw.labels[i].clone()).collect();
        let n = state_labels.len();

        let mut prior = countsmat.clone();
        if config.prior_counts > 0.0 {
            prior
                .as_mut_slice()
                .iter_mut()
                .for_each(|c| *c += config.prior_counts);
        }
        let est = estimate(&prior, config.reversible_type)?;

        let k = config.n_timescales.map_or(n, |t| t + 1).min(n);
        let es = eigensystem(
            &est.transmat,
            &est.populations,
            k,
            config.reversible_type.is_reversible(),
        )?;
        let training_score = gmrq(&es.right, &est.populations, &est.transmat)?;

        Ok(MarkovStateModel {
            config: config.clone(),
            state_labels,
            countsmat,
            transmat: est.transmat,
            populations: est.populations,
            eigenvalues: es.values,
            eigenvalues_imag: es.imag,
            left_eigenvectors: es.left,
            right_eigenvectors: es.right,
            n_components: subset.n_components,
            percent_retained: subset.percent_retained,
            training_score,
        })
    }

    pub fn config(&self) -> &MsmConfig {
        &self.config
    }

    pub fn lag_time(&self) -> usize {
        self.config.lag_time
    }

    pub fn n_states(&self) -> usize {
        self.state_labels.len()
    }

    /// Number of implied timescales kept, one less than the eigenvalue count.
    pub fn n_timescales(&self) -> usize {
        self.eigenvalues.len().saturating_sub(1)
    }

    /// Trimmed count matrix, without prior counts.
    pub fn countsmat(&self) -> &Matrix {
        &self.countsmat
    }

    pub fn transmat(&self) -> &Matrix {
        &self.transmat
    }

    pub fn populations(&self) -> &[f64] {
        &self.populations
    }

    /// Labels of the retained states in index order.
    pub fn state_labels(&self) -> &[L] {
        &self.state_labels
    }

    /// Label → state index for every retained state.
    pub fn mapping(&self) -> BTreeMap<L, usize> {
        self.state_labels
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect()
    }

    /// Real parts of the leading eigenvalues, in decreasing order.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Imaginary parts of [`eigenvalues`](Self::eigenvalues). Nonzero only
    /// for a non-reversible model; a conjugate pair `a ± ib` holds the real
    /// and imaginary parts of one complex eigenvector in its two columns.
    pub fn eigenvalues_imag(&self) -> &[f64] {
        &self.eigenvalues_imag
    }

    /// Left eigenvectors as columns.
    pub fn left_eigenvectors(&self) -> &Matrix {
        &self.left_eigenvectors
    }

    /// Right eigenvectors as columns.
    pub fn right_eigenvectors(&self) -> &Matrix {
        &self.right_eigenvectors
    }

    pub fn timescales(&self) -> Vec<f64> {
        implied_timescales(&self.eigenvalues, &self.eigenvalues_imag, self.config.lag_time)
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn percent_retained(&self) -> f64 {
        self.percent_retained
    }

    /// GMRQ of the model on its own training data.
    pub fn training_score(&self) -> f64 {
        self.training_score
    }

    /// Index of `label`, or `None` when it is missing or was trimmed.
    pub fn state_index(&self, label: &L) -> Option<usize> {
        if label.is_missing() {
            return None;
        }
        self.state_labels.binary_search(label).ok()
    }

    /// Map one sequence, keeping its length; unknown frames become `None`.
    pub fn partial_transform_fill(&self, sequence: &[L]) -> Vec<Option<usize>> {
        sequence.iter().map(|l| self.state_index(l)).collect()
    }

    /// Map one sequence, splitting it wherever a frame is unknown. Empty
    /// pieces are dropped.
    pub fn partial_transform_clip(&self, sequence: &[L]) -> Vec<Vec<usize>> {
        let mut pieces = Vec::new();
        let mut current = Vec::new();
        for label in sequence {
            match self.state_index(label) {
                Some(i) => current.push(i),
                None => {
                    if !current.is_empty() {
                        pieces.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    pub fn transform_fill<S: AsRef<[L]>>(&self, sequences: &[S]) -> Vec<Vec<Option<usize>>> {
        sequences
            .iter()
            .map(|s| self.partial_transform_fill(s.as_ref()))
            .collect()
    }

    pub fn transform_clip<S: AsRef<[L]>>(&self, sequences: &[S]) -> Vec<Vec<usize>> {
        sequences
            .iter()
            .flat_map(|s| self.partial_transform_clip(s.as_ref()))
            .collect()
    }

    /// Map state indices back to labels.
    pub fn inverse_transform<S: AsRef<[usize]>>(&self, sequences: &[S]) -> Result<Vec<Vec<L>>> {
        sequences
            .iter()
            .map(|s| {
                s.as_ref()
                    .iter()
                    .map(|&i| {
                        self.state_labels
                            .get(i)
                            .cloned()
                            .ok_or(Error::OutOfRange {
                                index: i,
                                len: self.n_states(),
                            })
                    })
                    .collect()
            })
            .collect()
    }

    /// Log-likelihood of the lag-1 transitions in `sequences`.
    ///
    /// Any frame with a label outside the model gives `-inf`; missing frames
    /// are skipped.
    pub fn score_ll<S: AsRef<[L]>>(&self, sequences: &[S]) -> f64 {
        let mut ll = 0.0;
        for seq in sequences {
            let mut prev: Option<usize> = None;
            for label in seq.as_ref() {
                if label.is_missing() {
                    prev = None;
                    continue;
                }
                let Some(cur) = self.state_index(label) else {
                    return f64::NEG_INFINITY;
                };
                if let Some(p) = prev {
                    ll += self.transmat[(p, cur)].ln();
                }
                prev = Some(cur);
            }
        }
        ll
    }

    /// Generalized matrix Rayleigh quotient of this model's right
    /// eigenvectors on `sequences`.
    ///
    /// A model with the same configuration is fitted to `sequences`; rows of
    /// the eigenvectors for labels this model never saw are zero. A singular
    /// overlap matrix scores `NaN`.
    pub fn score<S: AsRef<[L]>>(&self, sequences: &[S]) -> Result<f64> {
        let test_config = MsmConfig {
            verbose: false,
            ..self.config.clone()
        };
        let test = MarkovStateModel::fit(&test_config, sequences)?;
        let k = self.right_eigenvectors.cols();
        let mut v = Matrix::zeros(test.n_states(), k);
        for (row, label) in test.state_labels.iter().enumerate() {
            if let Some(i) = self.state_index(label) {
                v.row_mut(row).copy_from_slice(self.right_eigenvectors.row(i));
            }
        }
        gmrq(&v, &test.populations, &test.transmat)
    }

    /// Project frames onto the non-stationary eigenvectors.
    ///
    /// Each returned matrix has one row per mapped frame and one column per
    /// timescale. With [`MapMode::Clip`] the output follows
    /// [`transform_clip`](Self::transform_clip); with [`MapMode::Fill`]
    /// unknown frames get a row of `NaN`.
    pub fn eigtransform<S: AsRef<[L]>>(&self, sequences: &[S], right: bool, mode: MapMode) -> Vec<Matrix> {
        let vectors = if right {
            &self.right_eigenvectors
        } else {
            &self.left_eigenvectors
        };
        let k = self.n_timescales();
        let fill_row = |out: &mut Matrix, row: usize, state: Option<usize>| {
            for c in 0..k {
                out[(row, c)] = match state {
                    Some(s) => vectors[(s, c + 1)],
                    None => f64::NAN,
                };
            }
        };
        match mode {
            MapMode::Clip => self
                .transform_clip(sequences)
                .into_iter()
                .map(|piece| {
                    let mut out = Matrix::zeros(piece.len(), k);
                    for (row, &s) in piece.iter().enumerate() {
                        fill_row(&mut out, row, Some(s));
                    }
                    out
                })
                .collect(),
            MapMode::Fill => self
                .transform_fill(sequences)
                .into_iter()
                .map(|mapped| {
                    let mut out = Matrix::zeros(mapped.len(), k);
                    for (row, &s) in mapped.iter().enumerate() {
                        fill_row(&mut out, row, s);
                    }
                    out
                })
                .collect(),
        }
    }

    /// Sample a discrete trajectory of `n_steps` labels from the chain.
    ///
    /// The first frame follows `start`; without one it is drawn from the
    /// stationary populations.
    pub fn sample_discrete(
        &self,
        start: Option<&StartState<L>>,
        n_steps: usize,
        seed: Option<u64>,
    ) -> Result<Vec<L>> {
        let mut rng = SplitMix64::from_optional_seed(seed);
        if n_steps == 0 {
            return Ok(Vec::new());
        }
        let mut current = match start {
            Some(StartState::Label(label)) => self.state_index(label).ok_or_else(|| {
                Error::InvalidParameter(format!("start state {:?} is not in the model", label))
            })?,
            Some(StartState::Distribution(weights)) => {
                if weights.len() != self.n_states() {
                    return Err(Error::ShapeMismatch {
                        expected: format!("{} start weights", self.n_states()),
                        got: format!("{}", weights.len()),
                    });
                }
                rng.sample_categorical(weights)?
            }
            None => rng.sample_categorical(&self.populations)?,
        };
        let mut chain = Vec::with_capacity(n_steps);
        chain.push(self.state_labels[current].clone());
        for _ in 1..n_steps {
            current = rng.sample_categorical(self.transmat.row(current))?;
            chain.push(self.state_labels[current].clone());
        }
        Ok(chain)
    }

    /// Summary of the fitted model, one fact per line.
    pub fn summarize(&self) -> String {
        let counts = self.countsmat.as_slice();
        let mut nonzero: Vec<f64> = counts.iter().copied().filter(|&c| c > 0.0).collect();
        nonzero.sort_by(f64::total_cmp);
        let total: f64 = nonzero.iter().sum();
        let n = self.n_states();

        let mut out = String::new();
        let _ = writeln!(out, "Markov state model");
        let _ = writeln!(out, "------------------");
        let _ = writeln!(out, "Lag time         : {}", self.config.lag_time);
        let _ = writeln!(out, "Reversible type  : {:?}", self.config.reversible_type);
        let _ = writeln!(out, "Ergodic cutoff   : {}", self.config.ergodic_threshold());
        let _ = writeln!(out, "Prior counts     : {}", self.config.prior_counts);
        let _ = writeln!(out, "Sliding window   : {}", self.config.sliding_window);
        let _ = writeln!(
            out,
            "Components       : {} ({:.1}% of counts retained)",
            self.n_components, self.percent_retained
        );
        let _ = writeln!(out, "Number of states : {}", n);
        let _ = writeln!(
            out,
            "Nonzero counts   : {} of {} ({:.1}%)",
            nonzero.len(),
            n * n,
            100.0 * nonzero.len() as f64 / (n * n) as f64
        );
        if !nonzero.is_empty() {
            let _ = writeln!(out, "    Min.   : {:.1}", nonzero[0]);
            let _ = writeln!(out, "    1st Qu.: {:.1}", quantile(&nonzero, 0.25));
            let _ = writeln!(out, "    Median : {:.1}", quantile(&nonzero, 0.5));
            let _ = writeln!(out, "    Mean   : {:.1}", total / nonzero.len() as f64);
            let _ = writeln!(out, "    3rd Qu.: {:.1}", quantile(&nonzero, 0.75));
            let _ = writeln!(out, "    Max.   : {:.1}", nonzero[nonzero.len() - 1]);
        }
        let _ = writeln!(out, "Total transition counts : {:.1}", total);
        let _ = writeln!(
            out,
            "Total counts / lag time : {:.1} units of time",
            total / self.config.lag_time as f64
        );
        let _ = writeln!(out, "Eigenvalues      : {:?}", self.eigenvalues);
        let _ = writeln!(out, "Timescales       : {:?}", self.timescales());
        let _ = writeln!(out, "Training GMRQ    : {}", self.training_score);
        out
    }

    /// For each of the model's states, `n_samples` random `(trajectory,
    /// frame)` pairs from `sequences`, which must already be mapped to state
    /// indices. States the trajectories never visit get an empty list.
    pub fn draw_samples<S: AsRef<[usize]>>(
        &self,
        sequences: &[S],
        n_samples: usize,
        seed: Option<u64>,
    ) -> Result<Vec<Vec<(usize, usize)>>> {
        let frames = frames_by_state(sequences, self.n_states())?;
        Ok(pick_frames(&frames, n_samples, seed))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// For every state, `n_samples` random `(trajectory, frame)` pairs at which
/// `sequences` visit that state (drawn with replacement).
///
/// States must be zero-indexed and consecutive across `sequences`.
pub fn draw_samples<S: AsRef<[usize]>>(
    sequences: &[S],
    n_samples: usize,
    seed: Option<u64>,
) -> Result<Vec<Vec<(usize, usize)>>> {
    let n_states = sequences
        .iter()
        .flat_map(|s| s.as_ref().iter().copied())
        .max()
        .map(|m| m + 1)
        .ok_or_else(|| Error::Empty("no frames to draw from".to_string()))?;

    let frames = frames_by_state(sequences, n_states)?;
    let present = frames.iter().filter(|f| !f.is_empty()).count();
    if present != n_states {
        return Err(Error::InvalidParameter(format!(
            "states must be zero-indexed and consecutive: max index implies {} states, found {}",
            n_states, present
        )));
    }
    Ok(pick_frames(&frames, n_samples, seed))
}

/// Every `(trajectory, frame)` position, grouped by state index.
fn frames_by_state<S: AsRef<[usize]>>(
    sequences: &[S],
    n_states: usize,
) -> Result<Vec<Vec<(usize, usize)>>> {
    let mut frames: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n_states];
    for (traj, seq) in sequences.iter().enumerate() {
        for (frame, &state) in seq.as_ref().iter().enumerate() {
            frames
                .get_mut(state)
                .ok_or(Error::OutOfRange {
                    index: state,
                    len: n_states,
                })?
                .push((traj, frame));
        }
    }
    Ok(frames)
}

/// `n_samples` draws with replacement per state; unvisited states stay empty.
fn pick_frames(
    frames: &[Vec<(usize, usize)>],
    n_samples: usize,
    seed: Option<u64>,
) -> Vec<Vec<(usize, usize)>> {
    let mut rng = SplitMix64::from_optional_seed(seed);
    frames
        .iter()
        .map(|pairs| {
            if pairs.is_empty() {
                return Vec::new();
            }
            (0..n_samples)
                .map(|_| pairs[rng.next_below(pairs.len())])
                .collect()
        })
        .collect()
}

/// `tr(VᵀCV (VᵀSV)⁻¹)` with `S = diag(π)` and `C = S T`.
pub fn gmrq(v: &Matrix, populations: &[f64], transmat: &Matrix) -> Result<f64> {
    let mut sv = v.clone();
    for (i, &p) in populations.iter().enumerate() {
        sv.row_mut(i).iter_mut().for_each(|x| *x *= p);
    }
    let vt = v.transpose();
    let mut c = transmat.clone();
    for (i, &p) in populations.iter().enumerate() {
        c.row_mut(i).iter_mut().for_each(|x| *x *= p);
    }
    let numerator = vt.matmul(&c.matmul(v)?)?;
    let overlap = vt.matmul(&sv)?;
    match inverse(&overlap) {
        Ok(inv) => Ok(numerator.matmul(&inv)?.trace()),
        Err(Error::Singular(_)) => Ok(f64::NAN),
        Err(e) => Err(e),
    }
}

fn validate(config: &MsmConfig) -> Result<()> {
    let prior = config.prior_counts;
    if prior.is_nan() || prior < 0.0 || prior.is_infinite() {
        return Err(Error::InvalidParameter(format!(
            "prior_counts must be finite and non-negative, got {}",
            config.prior_counts
        )));
    }
    let threshold = config.ergodic_threshold();
    if threshold.is_nan() || threshold < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "ergodic cutoff must be non-negative, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Linear-interpolation quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ErgodicCutoff, ReversibleType};

    fn quiet() -> MsmConfig {
        MsmConfig::default().quiet()
    }

    #[test]
    fn test_mapping_and_counts() {
        let seq = vec![0u32, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 2, 2, 2, 2, 0, 0, 0];
        let msm = MarkovStateModel::fit(&quiet(), &[seq]).unwrap();
        let expected = Matrix::from_rows(&[
            vec![8.0, 1.0, 1.0],
            vec![1.0, 3.0, 0.0],
            vec![1.0, 0.0, 3.0],
        ])
        .unwrap();
        assert_eq!(msm.countsmat(), &expected);
        let total: f64 = msm.populations().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(msm.mapping().get(&2), Some(&2));
    }

    #[test]
    fn test_prior_counts_not_stored_in_countsmat() {
        let seq = vec![0u8, 0, 1, 1, 0];
        let cfg = quiet().with_prior_counts(1.0).with_reversible_type(ReversibleType::None);
        let msm = MarkovStateModel::fit(&cfg, &[seq]).unwrap();
        assert_eq!(msm.countsmat().as_slice(), &[1.0, 1.0, 1.0, 1.0]);
        assert!((msm.transmat()[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_prior() {
        let cfg = quiet().with_prior_counts(-1.0);
        assert!(matches!(
            MarkovStateModel::fit(&cfg, &[vec![0u8, 1, 0]]),
            Err(Error::InvalidParameter(_))
        ));
        let cfg = quiet().with_ergodic_cutoff(ErgodicCutoff::Value(-2.0));
        assert!(MarkovStateModel::fit(&cfg, &[vec![0u8, 1, 0]]).is_err());
    }

    #[test]
    fn test_no_transitions() {
        assert!(matches!(
            MarkovStateModel::fit(&quiet(), &[vec![3u8]]),
            Err(Error::Empty(_))
        ));
    }

    #[test]
    fn test_single_state_model() {
        let msm = MarkovStateModel::fit(&quiet(), &[vec![5i64; 6]]).unwrap();
        assert_eq!(msm.n_states(), 1);
        assert_eq!(msm.eigenvalues().len(), 1);
        assert!((msm.eigenvalues()[0] - 1.0).abs() < 1e-12);
        assert!(msm.timescales().is_empty());
    }

    #[test]
    fn test_gmrq_singular_is_nan() {
        let v = Matrix::zeros(2, 1);
        let t = Matrix::identity(2);
        assert!(gmrq(&v, &[0.5, 0.5], &t).unwrap().is_nan());
    }

    #[test]
    fn test_draw_samples_covers_every_model_state() {
        let msm = MarkovStateModel::fit(&quiet(), &[vec![0u8, 1, 2, 0, 1, 2, 0]]).unwrap();
        assert_eq!(msm.n_states(), 3);

        let pairs = msm.draw_samples(&[vec![0usize, 1, 1, 0]], 4, Some(1)).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].len(), 4);
        assert_eq!(pairs[1].len(), 4);
        assert!(pairs[2].is_empty());

        let pairs = msm.draw_samples(&[vec![0usize, 2, 2]], 2, Some(1)).unwrap();
        assert!(pairs[1].is_empty());
        for &(traj, frame) in &pairs[2] {
            assert_eq!((traj, [0usize, 2, 2][frame]), (0, 2));
        }

        assert!(matches!(
            msm.draw_samples(&[vec![0usize, 3]], 2, None),
            Err(Error::OutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_sample_discrete_from_start_distribution() {
        let msm = MarkovStateModel::fit(&quiet(), &[vec![0u8, 0, 1, 1, 2, 2, 0]]).unwrap();
        let start = StartState::Distribution(vec![0.0, 0.0, 1.0]);
        for seed in 0..10 {
            let chain = msm.sample_discrete(Some(&start), 3, Some(seed)).unwrap();
            assert_eq!(chain[0], 2);
        }
        let short = StartState::Distribution(vec![1.0]);
        assert!(matches!(
            msm.sample_discrete(Some(&short), 3, None),
            Err(Error::ShapeMismatch { .. })
        ));
        let zero = StartState::Distribution(vec![0.0; 3]);
        assert!(msm.sample_discrete(Some(&zero), 3, None).is_err());
    }

    #[test]
    fn test_quantile() {
        let d = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&d, 0.0), 1.0);
        assert_eq!(quantile(&d, 0.5), 2.5);
        assert_eq!(quantile(&d, 1.0), 4.0);
    }

    #[test]
    fn test_summarize_mentions_state_count() {
        let msm = MarkovStateModel::fit(&quiet(), &[vec![0u8, 0, 1, 1, 0, 0, 1]]).unwrap();
        let text = msm.summarize();
        assert!(text.contains("Number of states : 2"), "{}", text);
        assert!(text.contains("Lag time         : 1"));
    }
}
