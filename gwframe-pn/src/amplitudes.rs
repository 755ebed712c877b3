//! Co-orbital mode amplitudes of a quasi-circular binary.
//!
//! `h_ℓm = 2 ν x sqrt(16π/5) Ĥ_ℓm` with `x = v²`, in the frame where the
//! orbit lies in the xy-plane with the bodies on the x axis. The non-spinning
//! `Ĥ_ℓm` for `m ≥ 0` are Blanchet, Living Rev. Relativ. 17, 2 (2014), Eq. (330),
//! through relative 1.5PN order. Spin–orbit terms of the spin components along
//! `ℓ̂` follow Arun, Buonanno, Faye and Ochsner, Phys. Rev. D 79, 104023 (2009);
//! in-plane spin components do not enter at this order. Negative `m` follow from
//! `h_{ℓ,−m} = (−1)^ℓ h̄_ℓm`.

use gwframe_core::constants::{PI, PN_ELL_MAX};
use gwframe_core::Vector3;
use num_complex::Complex64;

/// Spin projections on the orbital angular momentum direction, `M = 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpinProjections {
    /// `S·ℓ̂` with `S = m1² χ1 + m2² χ2`.
    pub s_ell: f64,
    /// `Σ·ℓ̂` with `Σ = m2 χ2 − m1 χ1`.
    pub sigma_ell: f64,
}

impl SpinProjections {
    pub fn new(m1: f64, m2: f64, chi1: &Vector3, chi2: &Vector3, ell_hat: &Vector3) -> Self {
        let chi1_ell = chi1.dot(ell_hat);
        let chi2_ell = chi2.dot(ell_hat);
        Self {
            s_ell: m1 * m1 * chi1_ell + m2 * m2 * chi2_ell,
            sigma_ell: m2 * chi2_ell - m1 * chi1_ell,
        }
    }
}

/// `(ℓ, m)` pairs produced, `ℓ = 2..=4`, `m = −ℓ..=ℓ`.
pub fn mode_list() -> Vec<(i32, i32)> {
    (2..=PN_ELL_MAX)
        .flat_map(|ell| (-ell..=ell).map(move |m| (ell, m)))
        .collect()
}

/// `Σ c_k v^k` over the terms whose overall power `leading + k` does not exceed
/// `half_orders`. Orders count from the leading `(2, 2)` amplitude.
fn series(v: f64, leading: u32, half_orders: u32, terms: &[(u32, Complex64)]) -> Complex64 {
    terms
        .iter()
        .filter(|(k, _)| leading + k <= half_orders)
        .map(|&(k, c)| c * v.powi(k as i32))
        .sum()
}

/// `Ĥ_ℓm` for `m ≥ 0`, truncated at `half_orders / 2` PN orders.
fn h_hat(ell: i32, m: i32, v: f64, nu: f64, delta: f64, half_orders: u32) -> Complex64 {
    let re = |x: f64| Complex64::new(x, 0.0);
    let im = |x: f64| Complex64::new(0.0, x);
    // (power of v of the leading term, prefactor, relative corrections)
    let (leading, prefactor, corrections): (u32, Complex64, Vec<(u32, Complex64)>) = match (ell, m) {
        (2, 2) => (
            0,
            re(1.0),
            vec![(2, re(-107.0 / 42.0 + 55.0 * nu / 42.0)), (3, re(2.0 * PI))],
        ),
        (2, 1) => (1, im(delta / 3.0), vec![(2, re(-17.0 / 28.0 + 5.0 * nu / 7.0))]),
        (2, 0) => (0, re(-5.0 / (14.0 * libm::sqrt(6.0))), vec![]),
        (3, 3) => (
            1,
            im(-0.75 * libm::sqrt(15.0 / 14.0) * delta),
            vec![(2, re(-2.0 + nu / 2.0))],
        ),
        (3, 2) => (2, re(libm::sqrt(5.0 / 7.0) / 3.0 * (1.0 - 3.0 * nu)), vec![]),
        (3, 1) => (
            1,
            im(delta / (12.0 * libm::sqrt(14.0))),
            vec![(2, re(-8.0 / 3.0 - 2.0 * nu / 3.0))],
        ),
        (4, 4) => (2, re(-8.0 / 9.0 * libm::sqrt(5.0 / 7.0) * (1.0 - 3.0 * nu)), vec![]),
        (4, 3) => (
            3,
            im(-9.0 / (4.0 * libm::sqrt(70.0)) * delta * (1.0 - 2.0 * nu)),
            vec![],
        ),
        (4, 2) => (2, re(libm::sqrt(5.0) / 63.0 * (1.0 - 3.0 * nu)), vec![]),
        (4, 1) => (
            3,
            im(delta / (84.0 * libm::sqrt(10.0)) * (1.0 - 2.0 * nu)),
            vec![],
        ),
        (4, 0) => (0, re(-1.0 / (504.0 * libm::sqrt(2.0))), vec![]),
        // (3, 0) first appears at 2.5PN
        _ => return Complex64::new(0.0, 0.0),
    };
    if leading > half_orders {
        return Complex64::new(0.0, 0.0);
    }
    let mut terms = vec![(0, re(1.0))];
    terms.extend(corrections);
    prefactor * v.powi(leading as i32) * series(v, leading, half_orders, &terms)
}

/// Spin–orbit part of `Ĥ_ℓm` for `m ≥ 0`. Powers of `v` are absolute.
fn h_hat_spin(ell: i32, m: i32, v: f64, delta: f64, spins: &SpinProjections, half_orders: u32) -> Complex64 {
    let SpinProjections { s_ell, sigma_ell } = *spins;
    let terms: Vec<(u32, Complex64)> = match (ell, m) {
        (2, 2) => vec![(3, Complex64::new(-2.0 * s_ell - 2.0 / 3.0 * delta * sigma_ell, 0.0))],
        (2, 1) => vec![(2, Complex64::new(0.0, 0.5 * sigma_ell))],
        (3, 2) => vec![(
            3,
            Complex64::new(2.0 * libm::sqrt(35.0) / 21.0 * (s_ell + delta * sigma_ell), 0.0),
        )],
        _ => return Complex64::new(0.0, 0.0),
    };
    series(v, 0, half_orders, &terms)
}

/// Co-orbital modes at PN parameter `v` in [`mode_list`] order.
pub fn coorbital_modes(v: f64, nu: f64, delta: f64, spins: &SpinProjections, half_orders: u32) -> Vec<Complex64> {
    let x = v * v;
    let scale = 2.0 * nu * x * libm::sqrt(16.0 * PI / 5.0);
    let positive = |ell: i32, m: i32| {
        h_hat(ell, m, v, nu, delta, half_orders) + h_hat_spin(ell, m, v, delta, spins, half_orders)
    };
    mode_list()
        .into_iter()
        .map(|(ell, m)| {
            if m >= 0 {
                positive(ell, m) * scale
            } else {
                let sign = if ell % 2 == 0 { 1.0 } else { -1.0 };
                positive(ell, -m).conj() * (sign * scale)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn index(ell: i32, m: i32) -> usize {
        (ell * ell + ell + m - 4) as usize
    }

    #[test]
    fn test_leading_order_quadrupole() {
        let (v, nu) = (0.3, 0.25);
        let h = coorbital_modes(v, nu, 0.0, &SpinProjections::default(), 0);
        let expected = 2.0 * nu * v * v * libm::sqrt(16.0 * PI / 5.0);
        assert_abs_diff_eq!(h[index(2, 2)].re, expected, epsilon = 1e-15);
        assert_eq!(h[index(2, 2)].im, 0.0);
        assert_eq!(h[index(2, 1)], Complex64::new(0.0, 0.0));
        assert_eq!(h[index(4, 4)], Complex64::new(0.0, 0.0));
        assert_eq!(mode_list().len(), h.len());
    }

    #[test]
    fn test_equal_mass_odd_m_vanish() {
        let h = coorbital_modes(0.35, 0.25, 0.0, &SpinProjections::default(), 3);
        for (i, (_, m)) in mode_list().into_iter().enumerate() {
            if m % 2 != 0 {
                assert_eq!(h[i].norm(), 0.0, "m = {}", m);
            }
        }
        assert!(h[index(4, 4)].norm() > 0.0);
    }

    #[test]
    fn test_negative_m_symmetry() {
        let spins = SpinProjections {
            s_ell: 0.3,
            sigma_ell: -0.2,
        };
        let h = coorbital_modes(0.3, 0.2, 0.4, &spins, 3);
        for ell in 2..=4 {
            let sign = if ell % 2 == 0 { 1.0 } else { -1.0 };
            for m in 1..=ell {
                let plus = h[index(ell, m)];
                let minus = h[index(ell, -m)];
                assert!((minus - plus.conj() * sign).norm() < 1e-16);
            }
        }
    }

    #[test]
    fn test_tail_term_enters_at_one_and_a_half_pn() {
        let (v, nu) = (0.3, 0.25);
        let h1 = coorbital_modes(v, nu, 0.0, &SpinProjections::default(), 2)[index(2, 2)];
        let h15 = coorbital_modes(v, nu, 0.0, &SpinProjections::default(), 3)[index(2, 2)];
        let scale = 2.0 * nu * v * v * libm::sqrt(16.0 * PI / 5.0);
        assert_abs_diff_eq!((h15 - h1).re, scale * 2.0 * PI * v * v * v, epsilon = 1e-14);
    }

    #[test]
    fn test_aligned_spin_enters_dipole_mode() {
        let (v, nu) = (0.3, 0.25);
        let z = Vector3::z_axis();
        let spins = SpinProjections::new(0.5, 0.5, &(z * 0.9), &Vector3::zeros(), &z);
        assert_abs_diff_eq!(spins.s_ell, 0.225, epsilon = 1e-15);
        assert_abs_diff_eq!(spins.sigma_ell, -0.45, epsilon = 1e-15);

        let bare = coorbital_modes(v, nu, 0.0, &SpinProjections::default(), 3);
        let spinning = coorbital_modes(v, nu, 0.0, &spins, 3);
        // equal masses: the (2, 1) mode is purely spin driven
        assert_eq!(bare[index(2, 1)].norm(), 0.0);
        let scale = 2.0 * nu * v * v * libm::sqrt(16.0 * PI / 5.0);
        assert_abs_diff_eq!(spinning[index(2, 1)].im, scale * 0.5 * -0.45 * v * v, epsilon = 1e-15);
        // spin enters (2, 2) at 1.5PN only
        let below = coorbital_modes(v, nu, 0.0, &spins, 2);
        assert_eq!(below[index(2, 2)], coorbital_modes(v, nu, 0.0, &SpinProjections::default(), 2)[index(2, 2)]);
        assert_abs_diff_eq!(
            (spinning[index(2, 2)] - bare[index(2, 2)]).re,
            scale * -2.0 * 0.225 * v * v * v,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_in_plane_spin_does_not_enter() {
        let z = Vector3::z_axis();
        let spins = SpinProjections::new(0.6, 0.4, &Vector3::new(0.7, 0.2, 0.0), &Vector3::new(0.0, -0.5, 0.0), &z);
        assert_eq!(spins, SpinProjections::default());
    }
}
