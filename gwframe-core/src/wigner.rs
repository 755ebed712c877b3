//! Wigner D matrices for rotating spin-weighted spherical-harmonic modes.
//!
//! A rotation `R` acts on each `ℓ` block of a mode decomposition through the
//! `(2ℓ+1) × (2ℓ+1)` unitary matrix `D^ℓ_{m' m}(R)`. The engine evaluates the
//! elements directly from the quaternion, splitting it into the two complex
//! numbers
//!
//! ```text
//! Ra = w + i z        Rb = y + i x
//! ```
//!
//! with `|Ra|² + |Rb|² = 1` for a unit rotor. Pure rotations about `z` have
//! `Rb = 0` and give the diagonal `D_{m m} = Ra^{2m} = e^{i m α}`.
//!
//! The general element is
//!
//! ```text
//! D^ℓ_{m' m} = C(ℓ, m', m) |Ra|^{2ℓ-2m} Ra^{m+m'} Rb^{m-m'}
//!              Σ_ρ (-1)^ρ binom(ℓ+m', ρ) binom(ℓ-m', ℓ-ρ-m) (|Rb|²/|Ra|²)^ρ
//! ```
//!
//! with `C = sqrt((ℓ+m)!(ℓ-m)! / ((ℓ+m')!(ℓ-m')!))`. The sum is evaluated in
//! Horner form. When `|Ra|` is small the ratio `|Rb|²/|Ra|²` overflows, so the
//! powers of `|Ra|` are folded into each term instead.
//!
//! ```
//! use gwframe_core::{wigner::WignerD, Quaternion, Vector3};
//!
//! let alpha = 0.3;
//! let r = Quaternion::from_rotation_vector(Vector3::new(0.0, 0.0, alpha));
//! let d = WignerD::new(&r);
//! let d22 = d.element(2, 2, 2);
//! assert!((d22.re - (2.0 * alpha).cos()).abs() < 1e-14);
//! assert!((d22.im - (2.0 * alpha).sin()).abs() < 1e-14);
//! ```

use crate::constants::WIGNER_EPSILON;
use crate::Quaternion;
use num_complex::Complex64;

/// Below this `|Ra|` the Horner sum switches to the overflow-safe form.
const SMALL_RA: f64 = 1e-3;

/// Below this a folded `|Ra|` power is treated as zero.
const NEGLIGIBLE_TERM: f64 = 1e-100;

fn factorial(n: i32) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

fn binomial(n: i32, k: i32) -> f64 {
    if k < 0 || k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut out = 1.0;
    for i in 0..k {
        out = out * (n - i) as f64 / (i + 1) as f64;
    }
    libm::round(out)
}

fn coefficient(ell: i32, mp: i32, m: i32) -> f64 {
    libm::sqrt(
        factorial(ell + m) * factorial(ell - m) / (factorial(ell + mp) * factorial(ell - mp)),
    )
}

/// Wigner D evaluator bound to one rotation.
#[derive(Debug, Clone, Copy)]
pub struct WignerD {
    ra: Complex64,
    rb: Complex64,
    abs_ra: f64,
    abs_rb: f64,
    ratio_sq: f64,
}

impl WignerD {
    /// Prepares the evaluator for the rotation `r` (assumed unit).
    pub fn new(r: &Quaternion) -> Self {
        let ra = Complex64::new(r.w, r.z);
        let rb = Complex64::new(r.y, r.x);
        let abs_ra = ra.norm();
        let abs_rb = rb.norm();
        let ratio_sq = if abs_ra > 0.0 {
            (abs_rb * abs_rb) / (abs_ra * abs_ra)
        } else {
            f64::INFINITY
        };
        Self {
            ra,
            rb,
            abs_ra,
            abs_rb,
            ratio_sq,
        }
    }

    /// Element `D^ℓ_{m' m}`. Indices with `|m'| > ℓ` or `|m| > ℓ` give zero.
    pub fn element(&self, ell: i32, mp: i32, m: i32) -> Complex64 {
        if mp.abs() > ell || m.abs() > ell {
            return Complex64::new(0.0, 0.0);
        }
        if self.abs_ra < WIGNER_EPSILON {
            if mp != -m {
                return Complex64::new(0.0, 0.0);
            }
            let sign = if (ell + mp) % 2 == 0 { 1.0 } else { -1.0 };
            return self.rb.powi(2 * mp) * sign;
        }
        if self.abs_rb < WIGNER_EPSILON {
            if mp != m {
                return Complex64::new(0.0, 0.0);
            }
            return self.ra.powi(2 * mp);
        }

        let rho_min = 0.max(mp - m);
        let rho_max = (ell + mp).min(ell - m);
        let abs_rb_sq = self.abs_rb * self.abs_rb;

        if self.abs_ra < SMALL_RA {
            let prefactor =
                self.ra.powi(m + mp) * self.rb.powi(m - mp) * coefficient(ell, mp, m);
            let abs_ra_sq = self.abs_ra * self.abs_ra;
            let mut sum = 0.0;
            for rho in (rho_min..=rho_max).rev() {
                let a_term = libm::pow(abs_ra_sq, (ell - m - rho) as f64);
                if !a_term.is_finite() || a_term < NEGLIGIBLE_TERM {
                    sum *= abs_rb_sq;
                    continue;
                }
                sum = sign_of(rho)
                    * binomial(ell + mp, rho)
                    * binomial(ell - mp, ell - rho - m)
                    * a_term
                    + sum * abs_rb_sq;
            }
            return prefactor * (sum * libm::pow(abs_rb_sq, rho_min as f64));
        }

        let prefactor = self.ra.powi(m + mp)
            * self.rb.powi(m - mp)
            * (coefficient(ell, mp, m) * libm::pow(self.abs_ra, (2 * ell - 2 * m) as f64));
        let mut sum = 0.0;
        for rho in (rho_min..=rho_max).rev() {
            sum = sign_of(rho) * binomial(ell + mp, rho) * binomial(ell - mp, ell - rho - m)
                + sum * self.ratio_sq;
        }
        prefactor * (sum * libm::pow(self.ratio_sq, rho_min as f64))
    }

    /// The full `ℓ` block, row-major with rows `m'` and columns `m`, both running
    /// from `-ℓ` to `ℓ`.
    pub fn matrix(&self, ell: i32) -> Vec<Complex64> {
        let dim = (2 * ell + 1) as usize;
        let mut out = Vec::with_capacity(dim * dim);
        for mp in -ell..=ell {
            for m in -ell..=ell {
                out.push(self.element(ell, mp, m));
            }
        }
        out
    }
}

#[inline]
fn sign_of(rho: i32) -> f64 {
    if rho % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}
