//! Estimator settings.

use serde::{Deserialize, Serialize};

/// How the transition matrix is estimated from the count matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReversibleType {
    /// Reversible maximum-likelihood estimate (detailed balance enforced).
    #[default]
    Mle,
    /// Symmetrize the counts, `(C + Cᵀ) / 2`, then row-normalize.
    Transpose,
    /// Row-normalize the raw counts; no detailed balance.
    None,
}

impl ReversibleType {
    pub fn is_reversible(self) -> bool {
        !matches!(self, ReversibleType::None)
    }
}

/// Minimum count for an edge to keep states in the same strongly connected
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErgodicCutoff {
    /// One transition's worth of counts: `1 / lag_time` with a sliding
    /// window, `1` otherwise.
    #[default]
    On,
    /// No trimming threshold (every pair of states counts as connected).
    Off,
    Value(f64),
}

/// How labels the model never saw are handled when mapping trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// Drop unknown frames and split the trajectory around them.
    #[default]
    Clip,
    /// Keep the trajectory length; unknown frames map to nothing.
    Fill,
}

/// Markov state model configuration.
///
/// Every field has a default, so a JSON config only needs the fields that
/// differ:
///
/// ```
/// use msmlump_msm::{MsmConfig, ReversibleType};
///
/// let cfg: MsmConfig = serde_json::from_str(r#"{"lag_time": 10, "reversible_type": "transpose"}"#).unwrap();
/// assert_eq!(cfg.lag_time, 10);
/// assert_eq!(cfg.reversible_type, ReversibleType::Transpose);
/// assert!(cfg.sliding_window);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsmConfig {
    /// Lag between counted frames.
    pub lag_time: usize,
    /// Number of implied timescales to keep; `None` keeps all `n_states - 1`.
    pub n_timescales: Option<usize>,
    pub reversible_type: ReversibleType,
    pub ergodic_cutoff: ErgodicCutoff,
    /// Pseudocount added to every element of the count matrix before the
    /// transition matrix is estimated.
    pub prior_counts: f64,
    /// Count every frame (divided by the lag) instead of striding by the lag.
    pub sliding_window: bool,
    /// Log the ergodic trimming summary at info level.
    pub verbose: bool,
}

impl Default for MsmConfig {
    fn default() -> Self {
        MsmConfig {
            lag_time: 1,
            n_timescales: None,
            reversible_type: ReversibleType::Mle,
            ergodic_cutoff: ErgodicCutoff::On,
            prior_counts: 0.0,
            sliding_window: true,
            verbose: true,
        }
    }
}

impl MsmConfig {
    /// The numeric edge threshold used for ergodic trimming.
    pub fn ergodic_threshold(&self) -> f64 {
        match self.ergodic_cutoff {
            ErgodicCutoff::On => {
                if self.sliding_window {
                    1.0 / self.lag_time as f64
                } else {
                    1.0
                }
            }
            ErgodicCutoff::Off => 0.0,
            ErgodicCutoff::Value(v) => v,
        }
    }

    pub fn with_lag_time(mut self, lag_time: usize) -> Self {
        self.lag_time = lag_time;
        self
    }

    pub fn with_n_timescales(mut self, n_timescales: usize) -> Self {
        self.n_timescales = Some(n_timescales);
        self
    }

    pub fn with_reversible_type(mut self, reversible_type: ReversibleType) -> Self {
        self.reversible_type = reversible_type;
        self
    }

    pub fn with_ergodic_cutoff(mut self, cutoff: ErgodicCutoff) -> Self {
        self.ergodic_cutoff = cutoff;
        self
    }

    pub fn with_prior_counts(mut self, prior_counts: f64) -> Self {
        self.prior_counts = prior_counts;
        self
    }

    pub fn with_sliding_window(mut self, sliding_window: bool) -> Self {
        self.sliding_window = sliding_window;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ergodic_threshold() {
        let cfg = MsmConfig::default().with_lag_time(10);
        assert_eq!(cfg.ergodic_threshold(), 0.1);
        let cfg = cfg.with_sliding_window(false);
        assert_eq!(cfg.ergodic_threshold(), 1.0);
        let cfg = cfg.with_ergodic_cutoff(ErgodicCutoff::Off);
        assert_eq!(cfg.ergodic_threshold(), 0.0);
        let cfg = cfg.with_ergodic_cutoff(ErgodicCutoff::Value(0.01));
        assert_eq!(cfg.ergodic_threshold(), 0.01);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = MsmConfig::default()
            .with_reversible_type(ReversibleType::None)
            .with_ergodic_cutoff(ErgodicCutoff::Value(2.0));
        let s = serde_json::to_string(&cfg).unwrap();
        let back: MsmConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let cfg: MsmConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, MsmConfig::default());
    }
}
