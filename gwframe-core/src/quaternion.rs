//! Quaternions for rotation algebra and frame tracking.
//!
//! A quaternion `q = w + x i + y j + z k` with unit norm represents a rotation of
//! three-dimensional space. The engine uses them for three things:
//!
//! - **Frame tracking**: the corotating and co-precessing frames are time series of
//!   unit quaternions `R(t)` obtained by integrating `dR/dt = ½ Ω(t) R(t)`.
//! - **Mode rotation**: each `R(t)` determines the Wigner D matrices that rotate the
//!   spin-weighted spherical-harmonic decomposition (see [`crate::wigner`]).
//! - **Orbital bookkeeping**: the PN evolution carries the orbital frame as a
//!   quaternion, with `ℓ̂ = R ẑ R̄` and the separation direction `n̂ = R x̂ R̄`.
//!
//! # Conventions
//!
//! Rotations are *active*: [`Quaternion::rotate`] computes `q v q̄`, which rotates the
//! vector `v` counterclockwise about the rotation axis. Composition follows the
//! product order, so `(a * b).rotate(v) == a.rotate(b.rotate(v))`.
//!
//! The exponential map connects quaternions to rotation vectors. A rotation by angle
//! `θ` about the unit axis `n̂` is `exp(θ n̂ / 2)`:
//!
//! ```
//! use gwframe_core::{Quaternion, Vector3};
//! use std::f64::consts::FRAC_PI_2;
//!
//! let q = Quaternion::from_rotation_vector(Vector3::new(0.0, 0.0, FRAC_PI_2));
//! let v = q.rotate(Vector3::x_axis());
//! assert!((v.y - 1.0).abs() < 1e-15);
//! assert!(v.x.abs() < 1e-15);
//! ```
//!
//! # Interpolation
//!
//! Time series of frames are interpolated with [`QuaternionSeries::interpolate`], which
//! uses spherical linear interpolation between the two bracketing samples. This keeps
//! every interpolated value on the unit sphere without renormalization.

use crate::{FrameError, FrameResult, Vector3};
use std::fmt;

/// Below this norm a quaternion is treated as zero.
const ZERO_NORM: f64 = 1e-300;

/// A real quaternion `w + x i + y j + z k`.
///
/// Immutable `Copy` value. Unit quaternions represent rotations; the arithmetic
/// operators work for any quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Creates a quaternion from its four components.
    #[inline]
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation `1`.
    #[inline]
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    #[inline]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Creates the pure-vector quaternion `0 + v`.
    #[inline]
    pub fn from_vector(v: Vector3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    /// Returns the vector part `(x, y, z)`.
    #[inline]
    pub fn vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn scalar(&self) -> f64 {
        self.w
    }

    /// Creates the rotation by `angle` radians about `axis`.
    ///
    /// The axis need not be normalized. A zero-length axis is accepted only when
    /// the angle is zero (giving the identity); otherwise the rotation is undefined
    /// and [`FrameError::InvalidInput`] is returned.
    ///
    /// ```
    /// use gwframe_core::{Quaternion, Vector3};
    ///
    /// assert!(Quaternion::from_axis_angle(Vector3::zeros(), 0.3).is_err());
    /// assert_eq!(
    ///     Quaternion::from_axis_angle(Vector3::zeros(), 0.0).unwrap(),
    ///     Quaternion::identity()
    /// );
    /// ```
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> FrameResult<Self> {
        let mag = axis.magnitude();
        if mag == 0.0 {
            if angle == 0.0 {
                return Ok(Self::identity());
            }
            return Err(FrameError::invalid_input(
                "Quaternion::from_axis_angle",
                format!("zero-length axis with non-zero angle {}", angle),
            ));
        }
        if !mag.is_finite() || !angle.is_finite() {
            return Err(FrameError::invalid_input(
                "Quaternion::from_axis_angle",
                "axis and angle must be finite",
            ));
        }
        let (s, c) = libm::sincos(angle / 2.0);
        let n = axis / mag;
        Ok(Self::new(c, s * n.x, s * n.y, s * n.z))
    }

    /// Creates the rotation `exp(θ/2)` for the rotation vector `θ`.
    ///
    /// The rotation angle is `|θ|` and the axis is `θ̂`. The zero vector maps to
    /// the identity.
    pub fn from_rotation_vector(theta: Vector3) -> Self {
        Self::from_vector(theta * 0.5).exp()
    }

    /// Returns the rotation vector `2 log(q)` of the (normalized) rotor.
    pub fn to_rotation_vector(&self) -> FrameResult<Vector3> {
        Ok(self.log()?.vector() * 2.0)
    }

    /// Returns the rotation taking the direction `from` onto the direction `to`
    /// about the axis `from × to` (the minimal rotation).
    ///
    /// For antiparallel inputs the axis is an arbitrary direction perpendicular to
    /// `from`.
    pub fn rotation_between(from: Vector3, to: Vector3) -> FrameResult<Self> {
        let a = from.try_normalize()?;
        let b = to.try_normalize()?;
        let d = a.dot(&b);
        if d < -1.0 + 1e-14 {
            let trial = if a.x.abs() < 0.9 {
                Vector3::x_axis()
            } else {
                Vector3::y_axis()
            };
            let axis = a.cross(&trial).normalize();
            return Ok(Self::from_vector(axis));
        }
        let c = a.cross(&b);
        Self::new(1.0 + d, c.x, c.y, c.z).normalize()
    }

    /// Squared Euclidean norm `w² + x² + y² + z²`.
    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        libm::sqrt(self.norm_squared())
    }

    /// Returns `q / |q|`, or [`FrameError::SingularInput`] for a zero quaternion.
    pub fn normalize(&self) -> FrameResult<Self> {
        let n = self.norm();
        if n < ZERO_NORM || !n.is_finite() {
            return Err(FrameError::singular_input(
                "Quaternion::normalize",
                format!("cannot normalize quaternion of norm {}", n),
            ));
        }
        Ok(*self * (1.0 / n))
    }

    /// Returns `true` if `| |q| - 1 | <= tolerance`.
    pub fn is_unit(&self, tolerance: f64) -> bool {
        (self.norm() - 1.0).abs() <= tolerance
    }

    /// Returns `w - x i - y j - z k`.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Returns `q̄ / |q|²`, or [`FrameError::SingularInput`] for a zero quaternion.
    ///
    /// ```
    /// use gwframe_core::Quaternion;
    ///
    /// let q = Quaternion::new(1.0, 2.0, -0.5, 0.25);
    /// let p = q * q.inverse().unwrap();
    /// assert!((p.w - 1.0).abs() < 1e-15);
    /// assert!(Quaternion::zero().inverse().is_err());
    /// ```
    pub fn inverse(&self) -> FrameResult<Self> {
        let n2 = self.norm_squared();
        let scale = 1.0 / n2;
        if !(n2 > 0.0) || !scale.is_finite() {
            return Err(FrameError::singular_input(
                "Quaternion::inverse",
                format!("cannot invert quaternion of squared norm {}", n2),
            ));
        }
        Ok(self.conjugate() * scale)
    }

    /// Four-dimensional dot product.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Quaternion exponential `e^w (cos|v| + sin|v| v̂)`.
    pub fn exp(&self) -> Self {
        let v = self.vector();
        let angle = v.magnitude();
        let ew = libm::exp(self.w);
        if angle < 1e-12 {
            // sin(a)/a to second order
            let sinc = 1.0 - angle * angle / 6.0;
            return Self::new(ew * libm::cos(angle), ew * sinc * v.x, ew * sinc * v.y, ew * sinc * v.z);
        }
        let (s, c) = libm::sincos(angle);
        let k = ew * s / angle;
        Self::new(ew * c, k * v.x, k * v.y, k * v.z)
    }

    /// Logarithm of the normalized quaternion.
    ///
    /// A non-unit input is normalized first, so the result is always a pure vector
    /// `θ n̂ / 2` for a rotation by `θ` about `n̂`. The zero quaternion fails with
    /// [`FrameError::SingularInput`].
    pub fn log(&self) -> FrameResult<Self> {
        let q = self.normalize()?;
        let v = q.vector();
        let vmag = v.magnitude();
        if vmag < 1e-300 {
            if q.w < 0.0 {
                // -1: rotation by 2π, axis undefined; pick z
                return Ok(Self::new(0.0, 0.0, 0.0, std::f64::consts::PI));
            }
            return Ok(Self::zero());
        }
        let half_angle = libm::atan2(vmag, q.w);
        Ok(Self::from_vector(v * (half_angle / vmag)))
    }

    /// Rotates `v` by conjugation, `q v q̄`.
    ///
    /// Assumes `q` is a unit quaternion. The scalar part of the product is zero up to
    /// rounding and is discarded, so the result is always a pure vector.
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let p = *self * Self::from_vector(v) * self.conjugate();
        p.vector()
    }

    /// Rotates `v` by the inverse rotation, `q̄ v q`.
    pub fn inverse_rotate(&self, v: Vector3) -> Vector3 {
        self.conjugate().rotate(v)
    }

    /// Spherical linear interpolation from `a` (at `tau = 0`) to `b` (at `tau = 1`).
    ///
    /// Takes the shorter arc: if `a · b < 0`, `-b` is used in place of `b`.
    pub fn slerp(a: &Self, b: &Self, tau: f64) -> Self {
        let mut d = a.dot(b);
        let mut b = *b;
        if d < 0.0 {
            d = -d;
            b = -b;
        }
        if d > 1.0 - 1e-12 {
            let lerp = *a * (1.0 - tau) + b * tau;
            return lerp.normalize().unwrap_or(*a);
        }
        let theta = libm::acos(d.min(1.0));
        let s = libm::sin(theta);
        *a * (libm::sin((1.0 - tau) * theta) / s) + b * (libm::sin(tau * theta) / s)
    }

    /// Returns the equivalent 3×3 rotation matrix (row-major) of the normalized
    /// quaternion, such that `m · v == q.rotate(v)`.
    pub fn to_rotation_matrix(&self) -> FrameResult<[[f64; 3]; 3]> {
        let q = self.normalize()?;
        let (w, x, y, z) = (q.w, q.x, q.y, q.z);
        Ok([
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (x * z + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (x * z - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ])
    }

    /// Largest absolute component-wise difference to `other`.
    pub fn max_difference(&self, other: &Self) -> f64 {
        (self.w - other.w)
            .abs()
            .max((self.x - other.x).abs())
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }

    /// Rotation-aware distance: the smaller of `|a - b|` and `|a + b|`.
    ///
    /// `q` and `-q` represent the same rotation, so this is zero for equivalent rotors.
    pub fn rotor_distance(&self, other: &Self) -> f64 {
        (*self - *other).norm().min((*self + *other).norm())
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Mul for Quaternion {
    type Output = Self;

    /// Hamilton product.
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }
}

impl std::ops::Mul<&Quaternion> for &Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: &Quaternion) -> Quaternion {
        *self * *rhs
    }
}

impl std::ops::Mul<f64> for Quaternion {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Self::new(self.w * scalar, self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl std::ops::Add for Quaternion {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.w + rhs.w, self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Quaternion {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.w - rhs.w, self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quaternion({:.12}, {:.12}, {:.12}, {:.12})",
            self.w, self.x, self.y, self.z
        )
    }
}

/// An ordered time series of quaternions.
///
/// The time grid is strictly increasing and has the same length as the samples.
/// Used for frame histories and the PN orbital frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuaternionSeries {
    times: Vec<f64>,
    values: Vec<Quaternion>,
}

impl QuaternionSeries {
    /// Creates a series, validating lengths and time ordering.
    pub fn new(times: Vec<f64>, values: Vec<Quaternion>) -> FrameResult<Self> {
        if times.len() != values.len() {
            return Err(FrameError::invalid_input(
                "QuaternionSeries::new",
                format!(
                    "{} times but {} quaternions",
                    times.len(),
                    values.len()
                ),
            ));
        }
        if times.is_empty() {
            return Err(FrameError::invalid_input(
                "QuaternionSeries::new",
                "series must contain at least one sample",
            ));
        }
        crate::utils::check_strictly_increasing("QuaternionSeries::new", &times)?;
        Ok(Self { times, values })
    }

    /// A constant series equal to `q` on the given grid.
    pub fn constant(times: Vec<f64>, q: Quaternion) -> FrameResult<Self> {
        let values = vec![q; times.len()];
        Self::new(times, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[Quaternion] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<Quaternion> {
        self.values.get(index).copied()
    }

    pub fn t_min(&self) -> f64 {
        self.times[0]
    }

    pub fn t_max(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Series of conjugates (the inverse frame for unit samples).
    pub fn conjugate(&self) -> Self {
        Self {
            times: self.times.clone(),
            values: self.values.iter().map(Quaternion::conjugate).collect(),
        }
    }

    /// Flips signs so consecutive samples have a non-negative dot product.
    ///
    /// `q` and `-q` are the same rotation; continuity keeps slerp on the short arc
    /// and derivatives of the series smooth.
    pub fn make_continuous(&mut self) {
        for i in 1..self.values.len() {
            if self.values[i].dot(&self.values[i - 1]) < 0.0 {
                self.values[i] = -self.values[i];
            }
        }
    }

    /// Interpolated quaternion at time `t`.
    ///
    /// Uses slerp between the two bracketing samples. An exact grid time returns
    /// the stored sample unchanged. Times outside `[t_min, t_max]` fail with
    /// [`FrameError::OutOfRange`].
    pub fn interpolate(&self, t: f64) -> FrameResult<Quaternion> {
        let (before, after) = crate::utils::bracket("QuaternionSeries::interpolate", &self.times, t)?;
        if self.times[before] == t {
            return Ok(self.values[before]);
        }
        if self.times[after] == t {
            return Ok(self.values[after]);
        }
        let tau = (t - self.times[before]) / (self.times[after] - self.times[before]);
        Ok(Quaternion::slerp(
            &self.values[before],
            &self.values[after],
            tau,
        ))
    }

    /// Returns the parts `(times, values)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<Quaternion>) {
        (self.times, self.values)
    }
}
