//! Derivative-free minimization.
//!
//! PCCA+ maximizes a piecewise objective (crisp metastability jumps when a
//! microstate changes cluster, and infeasible points score `-inf`), so
//! gradients are useless. We use the Nelder-Mead simplex for local search
//! and wrap it in basin hopping to escape shallow local optima.

use std::cell::Cell;

use msmlump_core::SplitMix64;

/// Result of a minimization run.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub n_evals: usize,
    /// True when the tolerance test stopped the run, false when a budget did.
    pub converged: bool,
}

#[derive(Debug, Clone)]
pub struct NelderMeadOptions {
    /// Stop when every vertex is within `xtol` of the best one...
    pub xtol: f64,
    /// ...and every function value is within `ftol` of the best one.
    pub ftol: f64,
    pub max_evals: usize,
    pub max_iter: usize,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        NelderMeadOptions {
            xtol: 1e-4,
            ftol: 1e-4,
            max_evals: 5000,
            max_iter: 100_000,
        }
    }
}

/// Nelder-Mead simplex minimization of `f` starting at `x0`.
///
/// The initial simplex perturbs each coordinate by 5% (or 0.00025 when the
/// coordinate is zero). Non-finite objective values are allowed and simply
/// rank worst.
pub fn nelder_mead<F>(f: F, x0: &[f64], opts: &NelderMeadOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    const RHO: f64 = 1.0;
    const CHI: f64 = 2.0;
    const PSI: f64 = 0.5;
    const SIGMA: f64 = 0.5;

    let n = x0.len();
    let evals = Cell::new(0usize);
    let eval = |x: &[f64]| {
        evals.set(evals.get() + 1);
        let v = f(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    if n == 0 {
        let fx = eval(x0);
        return Minimum {
            x: Vec::new(),
            f: fx,
            n_evals: 1,
            converged: true,
        };
    }

    let mut sim: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    sim.push(x0.to_vec());
    for k in 0..n {
        let mut y = x0.to_vec();
        y[k] = if y[k] != 0.0 { 1.05 * y[k] } else { 0.00025 };
        sim.push(y);
    }
    let mut fsim: Vec<f64> = sim.iter().map(|x| eval(x)).collect();

    let mut iterations = 0usize;
    let mut converged = false;
    loop {
        sort_simplex(&mut sim, &mut fsim);

        let x_spread = sim[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&sim[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = fsim[1..]
            .iter()
            .map(|v| (v - fsim[0]).abs())
            .fold(0.0, f64::max);
        if x_spread <= opts.xtol && f_spread <= opts.ftol {
            converged = true;
            break;
        }
        if evals.get() >= opts.max_evals || iterations >= opts.max_iter {
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| sim[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let worst = sim[n].clone();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| (1.0 + coef) * c - coef * w)
                .collect()
        };

        let xr = along(RHO);
        let fxr = eval(&xr);
        let mut shrink = false;

        if fxr < fsim[0] {
            let xe = along(RHO * CHI);
            let fxe = eval(&xe);
            if fxe < fxr {
                sim[n] = xe;
                fsim[n] = fxe;
            } else {
                sim[n] = xr;
                fsim[n] = fxr;
            }
        } else if fxr < fsim[n - 1] {
            sim[n] = xr;
            fsim[n] = fxr;
        } else if fxr < fsim[n] {
            // Outside contraction.
            let xc = along(PSI * RHO);
            let fxc = eval(&xc);
            if fxc <= fxr {
                sim[n] = xc;
                fsim[n] = fxc;
            } else {
                shrink = true;
            }
        } else {
            // Inside contraction.
            let xcc = along(-PSI);
            let fxcc = eval(&xcc);
            if fxcc < fsim[n] {
                sim[n] = xcc;
                fsim[n] = fxcc;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = sim[0].clone();
            for j in 1..=n {
                for (v, b) in sim[j].iter_mut().zip(&best) {
                    *v = b + SIGMA * (*v - b);
                }
                fsim[j] = eval(&sim[j]);
            }
        }
    }

    sort_simplex(&mut sim, &mut fsim);
    Minimum {
        x: sim.swap_remove(0),
        f: fsim[0],
        n_evals: evals.get(),
        converged,
    }
}

fn sort_simplex(sim: &mut Vec<Vec<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    *sim = order.iter().map(|&i| sim[i].clone()).collect();
    *fsim = order.iter().map(|&i| fsim[i]).collect();
}

#[derive(Debug, Clone)]
pub struct BasinHoppingOptions {
    /// Number of hopping iterations.
    pub niter: usize,
    /// Stop early after this many iterations without a new global minimum.
    pub niter_success: Option<usize>,
    /// Metropolis temperature for accepting uphill hops.
    pub temperature: f64,
    /// Half-width of the uniform coordinate perturbation.
    pub step_size: f64,
    /// Local minimizer settings used after each hop.
    pub local: NelderMeadOptions,
}

impl Default for BasinHoppingOptions {
    fn default() -> Self {
        BasinHoppingOptions {
            niter: 100,
            niter_success: None,
            temperature: 1.0,
            step_size: 0.5,
            local: NelderMeadOptions {
                max_evals: 1000,
                ..NelderMeadOptions::default()
            },
        }
    }
}

/// Basin hopping: random perturbation, local Nelder-Mead, Metropolis
/// acceptance. Returns the best local minimum seen.
pub fn basin_hopping<F>(
    f: F,
    x0: &[f64],
    opts: &BasinHoppingOptions,
    rng: &mut SplitMix64,
) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let mut current = nelder_mead(&f, x0, &opts.local);
    let mut best = current.clone();
    let mut evals = current.n_evals;
    let mut since_improvement = 0usize;

    for iter in 0..opts.niter {
        let trial_x: Vec<f64> = current
            .x
            .iter()
            .map(|v| v + opts.step_size * (2.0 * rng.next_f64() - 1.0))
            .collect();
        let trial = nelder_mead(&f, &trial_x, &opts.local);
        evals += trial.n_evals;

        let accept = if trial.f < current.f {
            true
        } else if trial.f.is_finite() && current.f.is_finite() && opts.temperature > 0.0 {
            rng.next_f64() < (-(trial.f - current.f) / opts.temperature).exp()
        } else {
            // From an infeasible point any finite trial is an improvement;
            // into an infeasible point is never accepted.
            !current.f.is_finite() && trial.f.is_finite()
        };

        if trial.f < best.f {
            best = trial.clone();
            since_improvement = 0;
        } else {
            since_improvement += 1;
        }
        if accept {
            current = trial;
        }

        tracing::debug!(iter, best = best.f, current = current.f, "basin hopping step");

        if let Some(limit) = opts.niter_success {
            if since_improvement >= limit {
                break;
            }
        }
    }

    best.n_evals = evals;
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_nelder_mead_quadratic() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
        let opts = NelderMeadOptions {
            xtol: 1e-8,
            ftol: 1e-10,
            ..Default::default()
        };
        let m = nelder_mead(f, &[0.0, 0.0], &opts);
        assert!(m.converged);
        assert!((m.x[0] - 3.0).abs() < 1e-4, "x = {:?}", m.x);
        assert!((m.x[1] + 1.0).abs() < 1e-4, "x = {:?}", m.x);
    }

    #[test]
    fn test_nelder_mead_rosenbrock() {
        let opts = NelderMeadOptions {
            xtol: 1e-8,
            ftol: 1e-12,
            max_evals: 20_000,
            ..Default::default()
        };
        let m = nelder_mead(rosenbrock, &[-1.2, 1.0], &opts);
        assert!((m.x[0] - 1.0).abs() < 1e-3, "x = {:?}", m.x);
        assert!((m.x[1] - 1.0).abs() < 1e-3, "x = {:?}", m.x);
    }

    #[test]
    fn test_nelder_mead_respects_budget() {
        let opts = NelderMeadOptions {
            xtol: 0.0,
            ftol: 0.0,
            max_evals: 50,
            ..Default::default()
        };
        let m = nelder_mead(rosenbrock, &[-1.2, 1.0], &opts);
        assert!(!m.converged);
        // One iteration may overshoot by at most n+1 shrink evaluations.
        assert!(m.n_evals <= 50 + 4);
    }

    #[test]
    fn test_nelder_mead_handles_infeasible_region() {
        // Infeasible for x < 0.
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::INFINITY
            } else {
                (x[0] - 0.5).powi(2)
            }
        };
        let m = nelder_mead(f, &[2.0], &NelderMeadOptions::default());
        assert!((m.x[0] - 0.5).abs() < 1e-2, "x = {:?}", m.x);
    }

    #[test]
    fn test_basin_hopping_escapes_local_minimum() {
        // Double well with the deeper well at x = 2.
        let f = |x: &[f64]| {
            let a = (x[0] + 1.0).powi(2) * 4.0;
            let b = (x[0] - 2.0).powi(2) * 4.0 - 1.0;
            a.min(b)
        };
        let mut rng = SplitMix64::new(11);
        let opts = BasinHoppingOptions {
            niter: 60,
            step_size: 2.0,
            ..Default::default()
        };
        let m = basin_hopping(f, &[-1.0], &opts, &mut rng);
        assert!((m.x[0] - 2.0).abs() < 1e-2, "x = {:?}", m.x);
        assert!((m.f + 1.0).abs() < 1e-3);
    }
}
