//! Embedded Dormand–Prince 5(4) Runge–Kutta integration.
//!
//! Two layers:
//!
//! - [`DormandPrince::try_step`] attempts one step and reports the fifth-order
//!   solution, its derivative (reused as the first stage of the next step) and
//!   the scaled error norm. Callers that need their own acceptance rules, like
//!   the PN evolution with its per-orbit step cap and terminal-velocity search,
//!   drive this directly.
//! - [`solve_adaptive`] is the standard adaptive driver over an interval.
//!
//! Right-hand sides have the shape `f(t, y, dydt) -> Result<(), E>`, so a
//! derivative that detects an unphysical state can stop the integration with
//! its own error type.

use crate::{FrameError, FrameResult, OdeConfig};
use tracing::debug;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// fifth minus fourth order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Result of one attempted step.
#[derive(Debug, Clone)]
pub struct TrialStep {
    /// Fifth-order solution at `t + h`.
    pub y: Vec<f64>,
    /// Derivative at `(t + h, y)`.
    pub dydt: Vec<f64>,
    /// RMS error scaled by `abs_tolerance + rel_tolerance·|y|`; at most 1 to accept.
    pub error: f64,
}

impl TrialStep {
    pub fn is_acceptable(&self) -> bool {
        self.error <= 1.0
    }
}

/// Single-step Dormand–Prince stepper with reusable stage buffers.
#[derive(Debug, Clone)]
pub struct DormandPrince {
    config: OdeConfig,
    k: [Vec<f64>; 6],
    scratch: Vec<f64>,
}

impl DormandPrince {
    pub fn new(config: OdeConfig, dimension: usize) -> Self {
        Self {
            config,
            k: std::array::from_fn(|_| vec![0.0; dimension]),
            scratch: vec![0.0; dimension],
        }
    }

    pub fn config(&self) -> &OdeConfig {
        &self.config
    }

    /// Attempts a step of size `h` from `(t, y)` where `k1 = f(t, y)`.
    pub fn try_step<F, E>(
        &mut self,
        f: &mut F,
        t: f64,
        y: &[f64],
        k1: &[f64],
        h: f64,
    ) -> Result<TrialStep, E>
    where
        F: FnMut(f64, &[f64], &mut [f64]) -> Result<(), E>,
    {
        let n = y.len();
        let [k2, k3, k4, k5, k6, k7] = &mut self.k;
        let tmp = &mut self.scratch;

        for i in 0..n {
            tmp[i] = y[i] + h * A21 * k1[i];
        }
        f(t + h / 5.0, tmp, k2)?;

        for i in 0..n {
            tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        f(t + 3.0 * h / 10.0, tmp, k3)?;

        for i in 0..n {
            tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        f(t + 4.0 * h / 5.0, tmp, k4)?;

        for i in 0..n {
            tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        f(t + 8.0 * h / 9.0, tmp, k5)?;

        for i in 0..n {
            tmp[i] = y[i]
                + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        f(t + h, tmp, k6)?;

        let mut y_new = vec![0.0; n];
        for i in 0..n {
            y_new[i] =
                y[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
        }
        f(t + h, &y_new, k7)?;

        let mut err = 0.0;
        for i in 0..n {
            let scale = self.config.abs_tolerance
                + self.config.rel_tolerance * y[i].abs().max(y_new[i].abs());
            let e = h
                * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            err += (e / scale) * (e / scale);
        }
        let mut error = libm::sqrt(err / n.max(1) as f64);
        if !error.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
            error = f64::INFINITY;
        }

        Ok(TrialStep {
            y: y_new,
            dydt: k7.clone(),
            error,
        })
    }

    /// Next step size after a step of size `h` with scaled error `error`,
    /// clamped to the configured bounds.
    pub fn next_step_size(&self, h: f64, error: f64) -> f64 {
        let factor = if error.is_nan() || error.is_infinite() {
            MIN_FACTOR
        } else if error > 0.0 {
            SAFETY * libm::pow(error, -0.2)
        } else {
            MAX_FACTOR
        };
        let next = h * factor.clamp(MIN_FACTOR, MAX_FACTOR);
        next.abs().clamp(self.config.min_step, self.config.max_step).copysign(h)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

/// Dense output of [`solve_adaptive`]: every accepted step.
#[derive(Debug, Clone)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
    pub stats: SolverStats,
}

impl OdeSolution {
    pub fn final_state(&self) -> Option<&[f64]> {
        self.y.last().map(|v| v.as_slice())
    }
}

/// Integrates `y' = f(t, y)` from `t_span.0` to `t_span.1` with adaptive steps.
///
/// # Errors
///
/// Errors of `f` are returned as-is. [`FrameError::Convergence`] is returned if
/// the error cannot be controlled at the minimum step or the step budget is
/// exhausted.
///
/// ```
/// use gwframe_core::numerics::ode::solve_adaptive;
/// use gwframe_core::OdeConfig;
///
/// let sol = solve_adaptive(
///     |_t, y, dy| { dy[0] = -y[0]; Ok(()) },
///     &[1.0],
///     (0.0, 1.0),
///     &OdeConfig::default(),
/// ).unwrap();
/// let y1 = sol.final_state().unwrap()[0];
/// assert!((y1 - (-1.0f64).exp()).abs() < 1e-8);
/// ```
pub fn solve_adaptive<F>(
    mut f: F,
    y0: &[f64],
    t_span: (f64, f64),
    config: &OdeConfig,
) -> FrameResult<OdeSolution>
where
    F: FnMut(f64, &[f64], &mut [f64]) -> FrameResult<()>,
{
    let (t0, tf) = t_span;
    if !(tf > t0) {
        return Err(FrameError::invalid_input(
            "solve_adaptive",
            format!("empty interval [{}, {}]", t0, tf),
        ));
    }
    let n = y0.len();
    let mut stepper = DormandPrince::new(*config, n);
    let mut stats = SolverStats::default();

    let mut t = t0;
    let mut y = y0.to_vec();
    let mut dydt = vec![0.0; n];
    f(t, &y, &mut dydt)?;
    stats.evaluations += 1;

    let mut h = if config.initial_step > 0.0 {
        config.initial_step
    } else {
        (tf - t0) / 100.0
    }
    .clamp(config.min_step, config.max_step);

    let mut times = vec![t];
    let mut states = vec![y.clone()];

    while t < tf {
        if stats.accepted >= config.max_steps {
            return Err(FrameError::convergence(
                "solve_adaptive",
                stats.accepted,
                format!("step budget exhausted at t = {}", t),
            ));
        }
        let step = h.min(tf - t);
        let trial = stepper.try_step(&mut f, t, &y, &dydt, step)?;
        stats.evaluations += 6;

        if trial.is_acceptable() {
            t = if tf - t <= step { tf } else { t + step };
            y = trial.y;
            dydt = trial.dydt;
            times.push(t);
            states.push(y.clone());
            stats.accepted += 1;
        } else {
            stats.rejected += 1;
            if step <= config.min_step {
                return Err(FrameError::convergence(
                    "solve_adaptive",
                    stats.accepted,
                    format!("error {} not controllable at minimum step near t = {}", trial.error, t),
                ));
            }
        }
        h = stepper.next_step_size(step, trial.error);
    }

    debug!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        "solve_adaptive finished"
    );
    Ok(OdeSolution {
        t: times,
        y: states,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_exponential_decay() {
        let sol = solve_adaptive(
            |_t, y, dy| {
                dy[0] = -0.5 * y[0];
                Ok(())
            },
            &[2.0],
            (0.0, 4.0),
            &OdeConfig::default(),
        )
        .unwrap();
        assert_eq!(*sol.t.last().unwrap(), 4.0);
        assert_abs_diff_eq!(sol.final_state().unwrap()[0], 2.0 * (-2.0f64).exp(), epsilon = 1e-8);
    }

    #[test]
    fn test_harmonic_oscillator_conserves_energy() {
        let sol = solve_adaptive(
            |_t, y, dy| {
                dy[0] = y[1];
                dy[1] = -y[0];
                Ok(())
            },
            &[1.0, 0.0],
            (0.0, 20.0),
            &OdeConfig::default(),
        )
        .unwrap();
        let y = sol.final_state().unwrap();
        assert_abs_diff_eq!(y[0], 20f64.cos(), epsilon = 1e-7);
        assert_abs_diff_eq!(y[0] * y[0] + y[1] * y[1], 1.0, epsilon = 1e-7);
        assert!(sol.stats.accepted > 10);
    }

    #[test]
    fn test_single_step_error_shrinks_with_step() {
        let mut f = |_t: f64, y: &[f64], dy: &mut [f64]| -> Result<(), FrameError> {
            dy[0] = y[0];
            Ok(())
        };
        let mut stepper = DormandPrince::new(OdeConfig::default(), 1);
        let big = stepper.try_step(&mut f, 0.0, &[1.0], &[1.0], 0.5).unwrap();
        let small = stepper.try_step(&mut f, 0.0, &[1.0], &[1.0], 0.05).unwrap();
        assert!(small.error < big.error);
        // local truncation error of one fifth-order step is O(h⁶), a few 1e-12 here
        assert_abs_diff_eq!(small.y[0], 0.05f64.exp(), epsilon = 1e-10);
        let big_error = (big.y[0] - 0.5f64.exp()).abs();
        let small_error = (small.y[0] - 0.05f64.exp()).abs();
        assert!(small_error < 1e-4 * big_error);
        assert_abs_diff_eq!(small.dydt[0], small.y[0]);
    }

    #[test]
    fn test_rhs_error_propagates() {
        let err = solve_adaptive(
            |t, _y, _dy| {
                if t > 0.5 {
                    Err(FrameError::singular_input("rhs", "blow-up"))
                } else {
                    Ok(())
                }
            },
            &[0.0],
            (0.0, 1.0),
            &OdeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::SingularInput { .. }));
    }

    #[test]
    fn test_step_budget() {
        let config = OdeConfig::default().with_max_steps(3).with_step_bounds(1e-6, 0.01);
        let err = solve_adaptive(
            |_t, _y, dy| {
                dy[0] = 1.0;
                Ok(())
            },
            &[0.0],
            (0.0, 1.0),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Convergence { .. }));
    }
}
