//! Bracketed root finding.

use crate::{FrameError, FrameResult, RootConfig};
use tracing::debug;

/// A located root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Function value at `x`.
    pub value: f64,
    pub iterations: usize,
}

/// Brent's method on the bracket `[a, b]`.
///
/// Combines bisection, secant and inverse quadratic interpolation; converges
/// whenever `f(a)` and `f(b)` have opposite signs. Stops once the bracket is
/// narrower than `abs_tolerance + rel_tolerance·|x|`.
///
/// Fails with [`FrameError::Convergence`] if the endpoints do not bracket a sign
/// change, if `f` returns a non-finite value, or if the iteration budget runs out.
///
/// ```
/// use gwframe_core::numerics::roots::brent;
/// use gwframe_core::RootConfig;
///
/// let root = brent(|x| x * x - 2.0, 0.0, 2.0, &RootConfig::default()).unwrap();
/// assert!((root.x - 2f64.sqrt()).abs() < 1e-12);
/// ```
pub fn brent<F>(mut f: F, a: f64, b: f64, config: &RootConfig) -> FrameResult<Root>
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a);
    let mut fb = f(b);
    if !fa.is_finite() || !fb.is_finite() {
        return Err(FrameError::convergence(
            "brent",
            0,
            "non-finite function value at bracket endpoint",
        ));
    }
    if fa == 0.0 {
        return Ok(Root { x: a, value: fa, iterations: 0 });
    }
    if fb == 0.0 {
        return Ok(Root { x: b, value: fb, iterations: 0 });
    }
    if fa.signum() == fb.signum() {
        return Err(FrameError::convergence(
            "brent",
            0,
            format!("no sign change on [{}, {}]", a, b),
        ));
    }

    let (mut c, mut fc) = (b, fb);
    let mut d = b - a;
    let mut e = d;

    for iteration in 1..=config.max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 0.5 * (config.abs_tolerance + config.rel_tolerance * b.abs());
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol || fb == 0.0 {
            debug!(iterations = iteration, root = b, "brent converged");
            return Ok(Root { x: b, value: fb, iterations: iteration });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // secant
                (2.0 * xm * s, 1.0 - s)
            } else {
                // inverse quadratic
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(xm) };
        fb = f(b);
        if !fb.is_finite() {
            return Err(FrameError::convergence(
                "brent",
                iteration,
                format!("non-finite function value at {}", b),
            ));
        }
    }

    Err(FrameError::convergence(
        "brent",
        config.max_iterations,
        format!("bracket still {} wide", (c - b).abs()),
    ))
}
