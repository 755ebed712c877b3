//! Cubic splines on non-uniform grids.
//!
//! [`CubicSpline`] interpolates real samples; [`ComplexSpline`] and
//! [`VectorSpline`] wrap one spline per component for complex mode data and for
//! angular-velocity vectors. All three share the same rules:
//!
//! - the grid is finite and strictly increasing with at least two points (two
//!   points give linear interpolation);
//! - evaluation at a knot returns the stored sample bit-for-bit;
//! - evaluation outside `[t_min, t_max]` fails with [`FrameError::OutOfRange`].
//!
//! Not-a-knot end conditions keep the interpolant fourth-order accurate up to
//! the ends of the grid. Derivatives and integrals are those of the piecewise
//! cubic itself, so
//! [`CubicSpline::integral`] is exact for the interpolant.

use crate::utils::{bracket, check_strictly_increasing};
use crate::{FrameError, FrameResult, Vector3};
use num_complex::Complex64;

/// Not-a-knot cubic spline through `(t_i, y_i)`.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    times: Vec<f64>,
    values: Vec<f64>,
    // second derivatives at the knots
    second: Vec<f64>,
    // integral from t_0 to t_i
    cumulative: Vec<f64>,
}

impl CubicSpline {
    pub fn new(times: &[f64], values: &[f64]) -> FrameResult<Self> {
        if times.len() != values.len() {
            return Err(FrameError::invalid_input(
                "CubicSpline::new",
                format!("{} times but {} values", times.len(), values.len()),
            ));
        }
        if times.len() < 2 {
            return Err(FrameError::invalid_input(
                "CubicSpline::new",
                "at least two samples are required",
            ));
        }
        check_strictly_increasing("CubicSpline::new", times)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FrameError::invalid_input(
                "CubicSpline::new",
                "sample values must be finite",
            ));
        }

        let second = not_a_knot_second_derivatives(times, values);
        let mut spline = Self {
            times: times.to_vec(),
            values: values.to_vec(),
            second,
            cumulative: Vec::new(),
        };
        let mut cumulative = Vec::with_capacity(times.len());
        cumulative.push(0.0);
        for i in 0..times.len() - 1 {
            let h = times[i + 1] - times[i];
            let prev = cumulative[i];
            cumulative.push(prev + spline.partial_integral(i, h));
        }
        spline.cumulative = cumulative;
        Ok(spline)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn t_min(&self) -> f64 {
        self.times[0]
    }

    pub fn t_max(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Local power-series coefficients `(c1, c2, c3)` on interval `i`, so that
    /// `S(t_i + s) = y_i + c1 s + c2 s² + c3 s³`.
    fn coefficients(&self, i: usize) -> (f64, f64, f64) {
        let h = self.times[i + 1] - self.times[i];
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let c1 = (self.values[i + 1] - self.values[i]) / h - h * (2.0 * m0 + m1) / 6.0;
        (c1, m0 / 2.0, (m1 - m0) / (6.0 * h))
    }

    /// Integral over `[t_i, t_i + s]`.
    fn partial_integral(&self, i: usize, s: f64) -> f64 {
        let (c1, c2, c3) = self.coefficients(i);
        s * (self.values[i] + s * (c1 / 2.0 + s * (c2 / 3.0 + s * c3 / 4.0)))
    }

    fn locate(&self, context: &str, t: f64) -> FrameResult<usize> {
        let (before, _) = bracket(context, &self.times, t)?;
        Ok(before)
    }

    /// Spline value at `t`.
    pub fn eval(&self, t: f64) -> FrameResult<f64> {
        let i = self.locate("CubicSpline::eval", t)?;
        if self.times[i] == t {
            return Ok(self.values[i]);
        }
        if self.times[i + 1] == t {
            return Ok(self.values[i + 1]);
        }
        let s = t - self.times[i];
        let (c1, c2, c3) = self.coefficients(i);
        Ok(self.values[i] + s * (c1 + s * (c2 + s * c3)))
    }

    /// First derivative of the spline at `t`.
    pub fn derivative(&self, t: f64) -> FrameResult<f64> {
        let i = self.locate("CubicSpline::derivative", t)?;
        let s = t - self.times[i];
        let (c1, c2, c3) = self.coefficients(i);
        Ok(c1 + s * (2.0 * c2 + 3.0 * c3 * s))
    }

    /// Antiderivative `∫_{t_min}^{t} S`.
    pub fn antiderivative(&self, t: f64) -> FrameResult<f64> {
        let i = self.locate("CubicSpline::antiderivative", t)?;
        Ok(self.cumulative[i] + self.partial_integral(i, t - self.times[i]))
    }

    /// Exact integral of the spline over `[a, b]`.
    ///
    /// Both limits must lie in the grid domain; `b < a` gives the negated integral.
    pub fn integral(&self, a: f64, b: f64) -> FrameResult<f64> {
        Ok(self.antiderivative(b)? - self.antiderivative(a)?)
    }

    /// Running integral sampled at every knot, starting at 0.
    pub fn cumulative_integral(&self) -> &[f64] {
        &self.cumulative
    }
}

/// Second derivatives at the knots under not-a-knot end conditions.
///
/// The third derivative is continuous across the second and the penultimate
/// knot. Eliminating `M_0` and `M_{n-1}` with those conditions leaves a
/// tridiagonal system in the interior unknowns, solved with the Thomas
/// algorithm. Two knots give a line, three a parabola.
fn not_a_knot_second_derivatives(t: &[f64], y: &[f64]) -> Vec<f64> {
    let n = t.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    if n == 3 {
        let h0 = t[1] - t[0];
        let h1 = t[2] - t[1];
        let curvature = 2.0 * ((y[2] - y[1]) / h1 - (y[1] - y[0]) / h0) / (h0 + h1);
        m.fill(curvature);
        return m;
    }

    let inner = n - 2;
    let mut lower = vec![0.0; inner];
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];
    for k in 0..inner {
        let i = k + 1;
        let h0 = t[i] - t[i - 1];
        let h1 = t[i + 1] - t[i];
        lower[k] = h0;
        diag[k] = 2.0 * (h0 + h1);
        upper[k] = h1;
        rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    let (h0, h1) = (t[1] - t[0], t[2] - t[1]);
    diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
    upper[0] = (h1 * h1 - h0 * h0) / h1;
    let (ha, hb) = (t[n - 2] - t[n - 3], t[n - 1] - t[n - 2]);
    lower[inner - 1] = (ha * ha - hb * hb) / ha;
    diag[inner - 1] = (ha + hb) * (2.0 * ha + hb) / ha;

    for k in 1..inner {
        let w = lower[k] / diag[k - 1];
        diag[k] -= w * upper[k - 1];
        rhs[k] -= w * rhs[k - 1];
    }
    m[inner] = rhs[inner - 1] / diag[inner - 1];
    for k in (0..inner - 1).rev() {
        m[k + 1] = (rhs[k] - upper[k] * m[k + 2]) / diag[k];
    }

    m[0] = ((h0 + h1) * m[1] - h0 * m[2]) / h1;
    m[n - 1] = ((ha + hb) * m[n - 2] - hb * m[n - 3]) / ha;
    m
}

/// Cubic spline of complex samples, one real spline per component.
#[derive(Debug, Clone)]
pub struct ComplexSpline {
    re: CubicSpline,
    im: CubicSpline,
}

impl ComplexSpline {
    pub fn new(times: &[f64], values: &[Complex64]) -> FrameResult<Self> {
        let re: Vec<f64> = values.iter().map(|z| z.re).collect();
        let im: Vec<f64> = values.iter().map(|z| z.im).collect();
        Ok(Self {
            re: CubicSpline::new(times, &re)?,
            im: CubicSpline::new(times, &im)?,
        })
    }

    pub fn times(&self) -> &[f64] {
        self.re.times()
    }

    pub fn eval(&self, t: f64) -> FrameResult<Complex64> {
        Ok(Complex64::new(self.re.eval(t)?, self.im.eval(t)?))
    }

    pub fn derivative(&self, t: f64) -> FrameResult<Complex64> {
        Ok(Complex64::new(self.re.derivative(t)?, self.im.derivative(t)?))
    }

    pub fn integral(&self, a: f64, b: f64) -> FrameResult<Complex64> {
        Ok(Complex64::new(self.re.integral(a, b)?, self.im.integral(a, b)?))
    }

    pub fn cumulative_integral(&self) -> Vec<Complex64> {
        self.re
            .cumulative_integral()
            .iter()
            .zip(self.im.cumulative_integral())
            .map(|(&r, &i)| Complex64::new(r, i))
            .collect()
    }
}

/// Cubic spline of 3-vectors, one real spline per Cartesian component.
#[derive(Debug, Clone)]
pub struct VectorSpline {
    x: CubicSpline,
    y: CubicSpline,
    z: CubicSpline,
}

impl VectorSpline {
    pub fn new(times: &[f64], values: &[Vector3]) -> FrameResult<Self> {
        let component = |f: fn(&Vector3) -> f64| values.iter().map(f).collect::<Vec<f64>>();
        Ok(Self {
            x: CubicSpline::new(times, &component(|v| v.x))?,
            y: CubicSpline::new(times, &component(|v| v.y))?,
            z: CubicSpline::new(times, &component(|v| v.z))?,
        })
    }

    pub fn times(&self) -> &[f64] {
        self.x.times()
    }

    pub fn eval(&self, t: f64) -> FrameResult<Vector3> {
        Ok(Vector3::new(self.x.eval(t)?, self.y.eval(t)?, self.z.eval(t)?))
    }

    pub fn derivative(&self, t: f64) -> FrameResult<Vector3> {
        Ok(Vector3::new(
            self.x.derivative(t)?,
            self.y.derivative(t)?,
            self.z.derivative(t)?,
        ))
    }

    pub fn integral(&self, a: f64, b: f64) -> FrameResult<Vector3> {
        Ok(Vector3::new(
            self.x.integral(a, b)?,
            self.y.integral(a, b)?,
            self.z.integral(a, b)?,
        ))
    }

    pub fn cumulative_integral(&self) -> Vec<Vector3> {
        let (x, y, z) = (
            self.x.cumulative_integral(),
            self.y.cumulative_integral(),
            self.z.cumulative_integral(),
        );
        (0..x.len()).map(|i| Vector3::new(x[i], y[i], z[i])).collect()
    }
}
