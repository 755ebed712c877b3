//! Differentiation and integration of sampled time series.
//!
//! Both operate on a strictly increasing, possibly non-uniform grid and return
//! values sampled on that same grid.
//!
//! | Function | Interior | Endpoints |
//! |----------|----------|-----------|
//! | [`derivative`] | cubic-spline derivative | one-sided three-point formula |
//! | [`cumulative_integral`] | exact spline integral | starts at 0 |
//!
//! The endpoints use second-order one-sided differences on the first and last
//! three samples.

use super::spline::{CubicSpline, VectorSpline};
use crate::{FrameError, FrameResult, Vector3};
use num_complex::Complex64;

/// One-sided second-order derivative at `t[0]` from the first three samples.
fn forward_three_point(t: &[f64], y: &[f64]) -> f64 {
    let h1 = t[1] - t[0];
    let h2 = t[2] - t[1];
    -(2.0 * h1 + h2) / (h1 * (h1 + h2)) * y[0] + (h1 + h2) / (h1 * h2) * y[1]
        - h1 / (h2 * (h1 + h2)) * y[2]
}

/// One-sided second-order derivative at the last sample from the last three.
fn backward_three_point(t: &[f64], y: &[f64]) -> f64 {
    let n = t.len();
    let h1 = t[n - 2] - t[n - 3];
    let h2 = t[n - 1] - t[n - 2];
    h2 / (h1 * (h1 + h2)) * y[n - 3] - (h1 + h2) / (h1 * h2) * y[n - 2]
        + (h1 + 2.0 * h2) / (h2 * (h1 + h2)) * y[n - 1]
}

/// Derivative of `values` with respect to `times`, sampled on the grid.
///
/// Requires at least three samples; fewer fail with
/// [`FrameError::InvalidInput`].
///
/// ```
/// use gwframe_core::numerics::calculus::derivative;
///
/// let t = [0.0, 0.5, 1.5, 2.0, 3.0];
/// let y: Vec<f64> = t.iter().map(|x| 2.0 * x + 1.0).collect();
/// let dy = derivative(&t, &y).unwrap();
/// assert!(dy.iter().all(|d| (d - 2.0).abs() < 1e-12));
/// ```
pub fn derivative(times: &[f64], values: &[f64]) -> FrameResult<Vec<f64>> {
    if times.len() < 3 {
        return Err(FrameError::invalid_input(
            "derivative",
            format!("need at least 3 samples, got {}", times.len()),
        ));
    }
    let spline = CubicSpline::new(times, values)?;
    let n = times.len();
    let mut out = Vec::with_capacity(n);
    out.push(forward_three_point(times, values));
    for &t in &times[1..n - 1] {
        out.push(spline.derivative(t)?);
    }
    out.push(backward_three_point(times, values));
    Ok(out)
}

/// Derivative of complex samples, component by component.
pub fn complex_derivative(times: &[f64], values: &[Complex64]) -> FrameResult<Vec<Complex64>> {
    let re: Vec<f64> = values.iter().map(|z| z.re).collect();
    let im: Vec<f64> = values.iter().map(|z| z.im).collect();
    let d_re = derivative(times, &re)?;
    let d_im = derivative(times, &im)?;
    Ok(d_re
        .into_iter()
        .zip(d_im)
        .map(|(r, i)| Complex64::new(r, i))
        .collect())
}

/// Running integral `∫_{t_0}^{t_i} y dt` on the grid, starting at 0.
pub fn cumulative_integral(times: &[f64], values: &[f64]) -> FrameResult<Vec<f64>> {
    let spline = CubicSpline::new(times, values)?;
    Ok(spline.cumulative_integral().to_vec())
}

pub fn complex_cumulative_integral(
    times: &[f64],
    values: &[Complex64],
) -> FrameResult<Vec<Complex64>> {
    let re: Vec<f64> = values.iter().map(|z| z.re).collect();
    let im: Vec<f64> = values.iter().map(|z| z.im).collect();
    let i_re = cumulative_integral(times, &re)?;
    let i_im = cumulative_integral(times, &im)?;
    Ok(i_re
        .into_iter()
        .zip(i_im)
        .map(|(r, i)| Complex64::new(r, i))
        .collect())
}

pub fn vector_cumulative_integral(
    times: &[f64],
    values: &[Vector3],
) -> FrameResult<Vec<Vector3>> {
    Ok(VectorSpline::new(times, values)?.cumulative_integral())
}
