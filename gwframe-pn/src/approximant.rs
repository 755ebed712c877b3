//! TaylorT1 energy, flux and spin-precession expressions.
//!
//! With `M = 1`, `ν = m1 m2`, `δ = m1 − m2`, `S_i = m_i² χ_i`,
//! `S = S1 + S2` and `Σ = S2/m2 − S1/m1`:
//!
//! ```text
//! E(v) = −½ ν v² Σ_k e_k v^k
//! F(v) = 32/5 ν² v¹⁰ Σ_k f_k v^k
//! ```
//!
//! The non-spinning coefficients are those of Blanchet, Living Rev. Relativ.
//! 17, 2 (2014), Eqs. (233) and (314), through 3.5PN. The spin–orbit terms at
//! 1.5PN and the orbit-averaged spin–spin terms at 2PN follow Kidder, Phys. Rev.
//! D 52, 821 (1995). A term of relative order `v^k` is included when `k` does
//! not exceed twice the requested PN order.

use crate::params::Binary;
use gwframe_core::constants::{EULER_GAMMA, PI, PI_SQUARED};
use gwframe_core::Vector3;

/// Highest power of `v` in the relative series.
const N_TERMS: usize = 8;

/// Spin scalars entering the energy and flux.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpinScalars {
    /// `S·ℓ̂`
    s_ell: f64,
    /// `Σ·ℓ̂`
    sigma_ell: f64,
    /// `S1·S2`
    s1_s2: f64,
    /// `(S1·ℓ̂)(S2·ℓ̂)`
    s1_ell_s2_ell: f64,
}

/// The TaylorT1 model of a validated binary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaylorT1 {
    binary: Binary,
    energy: [f64; N_TERMS],
    flux: [f64; N_TERMS],
}

impl TaylorT1 {
    pub fn new(binary: Binary) -> Self {
        let nu = binary.nu;
        let mut energy = [0.0; N_TERMS];
        energy[0] = 1.0;
        energy[2] = -0.75 - nu / 12.0;
        energy[4] = -27.0 / 8.0 + 19.0 * nu / 8.0 - nu * nu / 24.0;
        energy[6] = -675.0 / 64.0 + (34445.0 / 576.0 - 205.0 * PI_SQUARED / 96.0) * nu
            - 155.0 * nu * nu / 96.0
            - 35.0 * nu * nu * nu / 5184.0;

        // the ln(16 v²) part of f6 is added at evaluation time
        let mut flux = [0.0; N_TERMS];
        flux[0] = 1.0;
        flux[2] = -1247.0 / 336.0 - 35.0 * nu / 12.0;
        flux[3] = 4.0 * PI;
        flux[4] = -44711.0 / 9072.0 + 9271.0 * nu / 504.0 + 65.0 * nu * nu / 18.0;
        flux[5] = -(8191.0 / 672.0 + 583.0 * nu / 24.0) * PI;
        flux[6] = 6643739519.0 / 69854400.0 + 16.0 * PI_SQUARED / 3.0 - 1712.0 * EULER_GAMMA / 105.0
            + (-134543.0 / 7776.0 + 41.0 * PI_SQUARED / 48.0) * nu
            - 94403.0 * nu * nu / 3024.0
            - 775.0 * nu * nu * nu / 324.0;
        flux[7] = (-16285.0 / 504.0 + 214745.0 * nu / 1728.0 + 193385.0 * nu * nu / 3024.0) * PI;

        for k in (binary.orbital_half_orders as usize + 1)..N_TERMS {
            energy[k] = 0.0;
            flux[k] = 0.0;
        }
        Self { binary, energy, flux }
    }

    pub fn binary(&self) -> &Binary {
        &self.binary
    }

    fn includes(&self, k: usize) -> bool {
        k as u32 <= self.binary.orbital_half_orders
    }

    fn spin_scalars(&self, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> SpinScalars {
        let b = &self.binary;
        let s1 = *chi1 * (b.m1 * b.m1);
        let s2 = *chi2 * (b.m2 * b.m2);
        let s1_ell = s1.dot(ell);
        let s2_ell = s2.dot(ell);
        SpinScalars {
            s_ell: s1_ell + s2_ell,
            sigma_ell: s2_ell / b.m2 - s1_ell / b.m1,
            s1_s2: s1.dot(&s2),
            s1_ell_s2_ell: s1_ell * s2_ell,
        }
    }

    /// Relative energy coefficients `e_k` including spin terms.
    fn energy_coefficients(&self, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> [f64; N_TERMS] {
        let mut e = self.energy;
        if self.binary.spin_terms {
            let s = self.spin_scalars(chi1, chi2, ell);
            let nu = self.binary.nu;
            if self.includes(3) {
                e[3] += 14.0 * s.s_ell / 3.0 + 2.0 * self.binary.delta * s.sigma_ell;
            }
            if self.includes(4) {
                e[4] += (s.s1_s2 - 3.0 * s.s1_ell_s2_ell) / nu;
            }
        }
        e
    }

    /// Binding energy `E(v)`.
    pub fn energy(&self, v: f64, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> f64 {
        let e = self.energy_coefficients(chi1, chi2, ell);
        let series = horner(&e, v);
        -0.5 * self.binary.nu * v * v * series
    }

    /// `dE/dv` at fixed spins and orbital direction.
    pub fn energy_derivative(&self, v: f64, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> f64 {
        let e = self.energy_coefficients(chi1, chi2, ell);
        let mut d = [0.0; N_TERMS];
        for (k, (dk, ek)) in d.iter_mut().zip(e.iter()).enumerate() {
            *dk = (k as f64 + 2.0) * ek;
        }
        -0.5 * self.binary.nu * v * horner(&d, v)
    }

    /// Gravitational-wave flux `F(v)`.
    pub fn flux(&self, v: f64, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> f64 {
        let mut f = self.flux;
        if self.includes(6) {
            f[6] -= 856.0 / 105.0 * libm::log(16.0 * v * v);
        }
        if self.binary.spin_terms {
            let s = self.spin_scalars(chi1, chi2, ell);
            let nu = self.binary.nu;
            if self.includes(3) {
                f[3] += -4.0 * s.s_ell - 1.25 * self.binary.delta * s.sigma_ell;
            }
            if self.includes(4) {
                f[4] += (-103.0 * s.s1_s2 + 289.0 * s.s1_ell_s2_ell) / (48.0 * nu);
            }
        }
        let nu = self.binary.nu;
        let v2 = v * v;
        let v10 = v2 * v2 * v2 * v2 * v2;
        6.4 * nu * nu * v10 * horner(&f, v)
    }

    /// Orbit-averaged precession angular velocities `(Ω1, Ω2)` of the two spins,
    /// `χ̇_i = Ω_i × χ_i`. Zero when spin terms are disabled.
    pub fn precession(&self, v: f64, chi1: &Vector3, chi2: &Vector3, ell: &Vector3) -> (Vector3, Vector3) {
        let b = &self.binary;
        if !b.spin_terms {
            return (Vector3::zeros(), Vector3::zeros());
        }
        let v5 = v * v * v * v * v;
        let v6 = v5 * v;
        let s1 = *chi1 * (b.m1 * b.m1);
        let s2 = *chi2 * (b.m2 * b.m2);
        let omega1 = *ell * (v5 * (0.75 + 0.5 * b.nu - 0.75 * b.delta))
            + (s2 - *ell * (3.0 * s2.dot(ell))) * (0.5 * v6);
        let omega2 = *ell * (v5 * (0.75 + 0.5 * b.nu + 0.75 * b.delta))
            + (s1 - *ell * (3.0 * s1.dot(ell))) * (0.5 * v6);
        (omega1, omega2)
    }

    /// `dℓ̂/dt` from conservation of `L + S1 + S2` with `L = ν/v ℓ̂`.
    pub fn ell_hat_derivative(&self, v: f64, chi1_dot: &Vector3, chi2_dot: &Vector3) -> Vector3 {
        let b = &self.binary;
        let s_dot = *chi1_dot * (b.m1 * b.m1) + *chi2_dot * (b.m2 * b.m2);
        s_dot * (-v / b.nu)
    }
}

fn horner(coefficients: &[f64], v: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * v + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PnParameters;
    use approx::assert_abs_diff_eq;

    fn model(chi1: Vector3, chi2: Vector3, order: f64) -> TaylorT1 {
        let binary = PnParameters::new(2.0, 1.0, chi1, chi2, 0.01)
            .with_orbital_order(order)
            .validate()
            .unwrap();
        TaylorT1::new(binary)
    }

    #[test]
    fn test_newtonian_limit() {
        let m = model(Vector3::zeros(), Vector3::zeros(), 0.0);
        let z = Vector3::z_axis();
        let nu = 2.0 / 9.0;
        let v = 0.3;
        assert_abs_diff_eq!(m.energy(v, &z, &z, &z), -0.5 * nu * v * v, epsilon = 1e-16);
        assert_abs_diff_eq!(m.energy_derivative(v, &z, &z, &z), -nu * v, epsilon = 1e-16);
        assert_abs_diff_eq!(m.flux(v, &z, &z, &z), 6.4 * nu * nu * v.powi(10), epsilon = 1e-18);
    }

    #[test]
    fn test_energy_derivative_matches_finite_difference() {
        let chi1 = Vector3::new(0.3, -0.2, 0.5);
        let chi2 = Vector3::new(-0.1, 0.4, 0.2);
        let ell = Vector3::new(0.1, 0.2, 0.97).normalize();
        let m = model(chi1, chi2, 3.5);
        let (v, h) = (0.25, 1e-6);
        let fd = (m.energy(v + h, &chi1, &chi2, &ell) - m.energy(v - h, &chi1, &chi2, &ell)) / (2.0 * h);
        assert_abs_diff_eq!(m.energy_derivative(v, &chi1, &chi2, &ell), fd, epsilon = 1e-9);
    }

    #[test]
    fn test_aligned_spins_change_binding_energy() {
        let z = Vector3::z_axis();
        let spinning = model(z * 0.9, z * 0.9, 3.5);
        let bare = model(Vector3::zeros(), Vector3::zeros(), 3.5);
        let up = z * 0.9;
        let zero = Vector3::zeros();
        // the spin-orbit term dominates at this v and deepens the binding energy
        assert!(spinning.energy(0.3, &up, &up, &z) < bare.energy(0.3, &zero, &zero, &z));
        // the 1.5PN spin-orbit flux term is negative for aligned spins
        assert!(spinning.flux(0.3, &up, &up, &z) < bare.flux(0.3, &zero, &zero, &z));
    }

    #[test]
    fn test_spin_orbit_precession_is_along_ell() {
        let m = model(Vector3::x_axis() * 0.5, Vector3::zeros(), 3.5);
        let ell = Vector3::z_axis();
        let (o1, o2) = m.precession(0.3, &(Vector3::x_axis() * 0.5), &Vector3::zeros(), &ell);
        assert_eq!(o1.x, 0.0);
        assert_eq!(o1.y, 0.0);
        assert!(o1.z > 0.0);
        // the spin-spin part of Ω2 is driven by S1
        assert!(o2.x > 0.0);
    }
}
