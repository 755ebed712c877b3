//! Levenberg–Marquardt nonlinear least squares for small parameter vectors.
//!
//! Minimizes `½ Σ r_k(p)²` over at most [`MAX_PARAMETERS`] parameters. The
//! Jacobian is built by forward differences, falling back to backward
//! differences where the forward trial point is rejected. A parameter that
//! cannot move in either direction gets a zero column and stays where it is.
//! Each damped normal-equation system is solved by SVD.
//!
//! The residual closure returns a [`FrameResult`]: a trial point it cannot
//! evaluate (for instance a time shift that leaves the sampled domain) is
//! treated as a step that increases the cost, so the damping grows and the
//! step shrinks.

use crate::{FrameError, FrameResult, MinimizerConfig};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

pub const MAX_PARAMETERS: usize = 4;

/// Damping above which no downhill step exists at working precision.
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresResult {
    pub parameters: Vec<f64>,
    /// Euclidean norm of the residual vector at `parameters`.
    pub residual_norm: f64,
    pub iterations: usize,
}

fn cost_of(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

fn jacobian<F>(
    residuals: &mut F,
    x: &DVector<f64>,
    r: &DVector<f64>,
    step: f64,
) -> FrameResult<(DMatrix<f64>, Vec<bool>)>
where
    F: FnMut(&[f64]) -> FrameResult<Vec<f64>>,
{
    let m = r.len();
    let n = x.len();
    let mut j = DMatrix::zeros(m, n);
    let mut frozen = vec![false; n];
    for col in 0..n {
        let h = step * x[col].abs().max(1.0);
        let mut trial = x.clone();
        trial[col] += h;
        let (rp, signed_h) = match residuals(trial.as_slice()) {
            Ok(rp) => (rp, h),
            Err(_) => {
                trial[col] = x[col] - h;
                match residuals(trial.as_slice()) {
                    Ok(rp) => (rp, -h),
                    Err(err) => {
                        // no feasible move along this parameter; hold it fixed
                        debug!(parameter = col, error = %err, "least_squares froze a parameter");
                        frozen[col] = true;
                        continue;
                    }
                }
            }
        };
        if rp.len() != m {
            return Err(FrameError::invalid_input(
                "least_squares",
                format!("residual length changed from {} to {}", m, rp.len()),
            ));
        }
        for row in 0..m {
            j[(row, col)] = (rp[row] - r[row]) / signed_h;
        }
    }
    Ok((j, frozen))
}

/// Minimizes the squared norm of `residuals(p)` starting from `initial`.
///
/// Returns the optimal parameters, the residual norm there, and the number of
/// accepted iterations. A starting point that is already a stationary point
/// returns immediately with zero iterations.
///
/// # Errors
///
/// - [`FrameError::InvalidInput`] for zero or more than [`MAX_PARAMETERS`]
///   parameters, or a residual vector that changes length.
/// - Any error of `residuals` at the starting point.
/// - [`FrameError::Convergence`] if the iteration budget is exhausted.
pub fn least_squares<F>(
    mut residuals: F,
    initial: &[f64],
    config: &MinimizerConfig,
) -> FrameResult<LeastSquaresResult>
where
    F: FnMut(&[f64]) -> FrameResult<Vec<f64>>,
{
    let n = initial.len();
    if n == 0 || n > MAX_PARAMETERS {
        return Err(FrameError::invalid_input(
            "least_squares",
            format!("expected 1 to {} parameters, got {}", MAX_PARAMETERS, n),
        ));
    }

    let mut x = DVector::from_column_slice(initial);
    let mut r = DVector::from_vec(residuals(x.as_slice())?);
    if r.is_empty() {
        return Err(FrameError::invalid_input(
            "least_squares",
            "residual vector is empty",
        ));
    }
    let mut cost = cost_of(&r);
    let mut lambda = config.initial_damping;

    for iteration in 0..config.max_iterations {
        let (j, frozen) = jacobian(&mut residuals, &x, &r, config.jacobian_step)?;
        let jt = j.transpose();
        let g = &jt * &r;
        let a = &jt * &j;

        if g.amax() <= config.tolerance * (1.0 + cost) {
            debug!(iterations = iteration, residual = r.norm(), "least_squares converged on gradient");
            return Ok(LeastSquaresResult {
                parameters: x.as_slice().to_vec(),
                residual_norm: r.norm(),
                iterations: iteration,
            });
        }

        loop {
            let mut damped = a.clone();
            for k in 0..n {
                damped[(k, k)] += lambda * a[(k, k)].max(f64::EPSILON);
            }
            let rhs = -&g;
            let mut delta = damped
                .svd(true, true)
                .solve(&rhs, 1e-15)
                .map_err(|e| FrameError::singular_input("least_squares", format!("SVD solve failed: {}", e)))?;
            for (k, _) in frozen.iter().enumerate().filter(|(_, f)| **f) {
                delta[k] = 0.0;
            }
            let trial = &x + &delta;

            let accepted = match residuals(trial.as_slice()) {
                Ok(rt) if rt.len() == r.len() => {
                    let rt = DVector::from_vec(rt);
                    let trial_cost = cost_of(&rt);
                    if trial_cost.is_finite() && trial_cost < cost {
                        Some((rt, trial_cost))
                    } else {
                        None
                    }
                }
                Ok(rt) => {
                    return Err(FrameError::invalid_input(
                        "least_squares",
                        format!("residual length changed from {} to {}", r.len(), rt.len()),
                    ));
                }
                Err(err) => {
                    warn!(error = %err, "least_squares trial point rejected");
                    None
                }
            };

            match accepted {
                Some((rt, trial_cost)) => {
                    let small_step =
                        delta.norm() <= config.tolerance * (x.norm() + config.tolerance);
                    let small_gain = cost - trial_cost <= config.tolerance * config.tolerance * cost;
                    x = trial;
                    r = rt;
                    cost = trial_cost;
                    lambda = (lambda / 10.0).max(1e-12);
                    if small_step || small_gain {
                        debug!(iterations = iteration + 1, residual = r.norm(), "least_squares converged on step");
                        return Ok(LeastSquaresResult {
                            parameters: x.as_slice().to_vec(),
                            residual_norm: r.norm(),
                            iterations: iteration + 1,
                        });
                    }
                    break;
                }
                None => {
                    lambda *= 10.0;
                    if lambda > MAX_DAMPING {
                        // no downhill direction left
                        debug!(iterations = iteration, residual = r.norm(), "least_squares stalled at minimum");
                        return Ok(LeastSquaresResult {
                            parameters: x.as_slice().to_vec(),
                            residual_norm: r.norm(),
                            iterations: iteration,
                        });
                    }
                }
            }
        }
    }

    Err(FrameError::convergence(
        "least_squares",
        config.max_iterations,
        format!("residual norm {}", r.norm()),
    ))
}
