//! Angular velocity of the radiation pattern.
//!
//! For mode data `f = {f_ℓm}` the angular-momentum operators act within each
//! `ℓ` block as
//!
//! ```text
//! (L_z f)_m = m f_m
//! (L_+ f)_m = sqrt(ℓ(ℓ+1) − m(m−1)) f_{m−1}
//! (L_− f)_m = sqrt(ℓ(ℓ+1) − m(m+1)) f_{m+1}
//! L_x = (L_+ + L_−)/2        L_y = (L_+ − L_−)/(2i)
//! ```
//!
//! At each sample the engine forms
//!
//! ```text
//! ⟨LL⟩_ab  = Re Σ (L_a f)* (L_b f)
//! ⟨L∂t⟩_a  = Im Σ (L_a f)* ḟ
//! Ω        = −⟨LL⟩⁻¹ ⟨L∂t⟩
//! ```
//!
//! and takes the dominant eigenvector of `⟨LL⟩` as the radiation axis. The
//! eigenvector's sign is arbitrary, so it is fixed sequentially: each sample is
//! oriented to agree with the previous one, and the first is oriented along `Ω`
//! (or toward +z when `Ω` is perpendicular to it).
//!
//! With this sign convention a pure `h_22 ∝ e^{−2iωt}` signal has `Ω = +ω ẑ`,
//! and the frame solving `dR/dt = ½ Ω R` is the one in which the modes stop
//! rotating.
//!
//! # Degenerate samples
//!
//! A sample whose selected modes have norm below
//! [`EngineConfig::degenerate_tolerance`], or whose `⟨LL⟩` is singular, carries
//! no orientation information. It is flagged in
//! [`AngularVelocity::degenerate`] and takes `Ω` and the axis of the nearest
//! valid sample. The first index of each degenerate run is recorded in
//! [`AngularVelocity::discontinuities`]. If no sample is valid, the computation
//! fails with [`FrameError::SingularInput`].

use crate::Waveform;
use gwframe_core::constants::ELL_MIN;
use gwframe_core::numerics::calculus::complex_derivative;
use gwframe_core::{EngineConfig, FrameError, FrameResult, Vector3};
use nalgebra::{Matrix3, SymmetricEigen};
use num_complex::Complex64;
use tracing::{debug, warn};

/// Smallest-to-largest eigenvalue ratio below which `⟨LL⟩` is singular.
const SINGULAR_RATIO: f64 = 1e-10;

/// Per-sample angular velocity and radiation axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngularVelocity {
    pub times: Vec<f64>,
    pub omega: Vec<Vector3>,
    pub axis: Vec<Vector3>,
    pub degenerate: Vec<bool>,
    /// First index of each run of degenerate samples.
    pub discontinuities: Vec<usize>,
}

impl AngularVelocity {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn n_degenerate(&self) -> usize {
        self.degenerate.iter().filter(|&&d| d).count()
    }
}

/// One `ℓ` block laid out densely over `m = −ℓ..=ℓ`, missing modes as zero.
struct Block {
    ell: i32,
    rows: Vec<Option<usize>>,
}

impl Block {
    fn value(&self, source: &[Vec<Complex64>], k: usize, i: usize) -> Complex64 {
        self.rows[k].map_or(Complex64::new(0.0, 0.0), |row| source[row][i])
    }
}

/// `(L_x f, L_y f, L_z f)` of one block at sample `i`.
fn apply_l(block: &Block, data: &[Vec<Complex64>], i: usize) -> [Vec<Complex64>; 3] {
    let ell = block.ell;
    let dim = (2 * ell + 1) as usize;
    let l2 = (ell * (ell + 1)) as f64;
    let mut lx = vec![Complex64::new(0.0, 0.0); dim];
    let mut ly = vec![Complex64::new(0.0, 0.0); dim];
    let mut lz = vec![Complex64::new(0.0, 0.0); dim];
    for k in 0..dim {
        let m = k as i32 - ell;
        let f = block.value(data, k, i);
        lz[k] = f * m as f64;
        let plus = if k > 0 {
            block.value(data, k - 1, i) * libm::sqrt(l2 - (m * (m - 1)) as f64)
        } else {
            Complex64::new(0.0, 0.0)
        };
        let minus = if k + 1 < dim {
            block.value(data, k + 1, i) * libm::sqrt(l2 - (m * (m + 1)) as f64)
        } else {
            Complex64::new(0.0, 0.0)
        };
        lx[k] = (plus + minus) * 0.5;
        ly[k] = (plus - minus) * Complex64::new(0.0, -0.5);
    }
    [lx, ly, lz]
}

/// Computes the angular velocity of `waveform`'s radiation at every sample.
///
/// Only modes with `ℓ ≤ config.frame_ell_max` enter the sums.
///
/// # Errors
///
/// - [`FrameError::InvalidInput`] with fewer than three samples or no selected modes.
/// - [`FrameError::SingularInput`] if every sample is degenerate.
pub fn angular_velocity(waveform: &Waveform, config: &EngineConfig) -> FrameResult<AngularVelocity> {
    const CONTEXT: &str = "angular_velocity";
    let times = waveform.times();
    let n = times.len();
    if n < 3 {
        return Err(FrameError::invalid_input(
            CONTEXT,
            format!("need at least 3 samples, got {}", n),
        ));
    }

    let modes = waveform.modes();
    let ell_cap = config.frame_ell_max.min(modes.ell_max());
    let blocks: Vec<Block> = (ELL_MIN..=ell_cap)
        .map(|ell| Block {
            ell,
            rows: (-ell..=ell).map(|m| modes.index_of(ell, m)).collect(),
        })
        .filter(|b| b.rows.iter().any(Option::is_some))
        .collect();
    if blocks.is_empty() {
        return Err(FrameError::invalid_input(
            CONTEXT,
            format!("no modes with ℓ ≤ {}", config.frame_ell_max),
        ));
    }

    let data = waveform.data();
    let mut derivatives = vec![Vec::new(); data.len()];
    for block in &blocks {
        for row in block.rows.iter().flatten() {
            derivatives[*row] = complex_derivative(times, &data[*row])?;
        }
    }

    let mut omega = vec![Vector3::zeros(); n];
    let mut axis = vec![Vector3::zeros(); n];
    let mut degenerate = vec![false; n];
    let mut previous_axis: Option<Vector3> = None;

    for i in 0..n {
        let mut ll = Matrix3::<f64>::zeros();
        let mut ldt = [0.0; 3];
        let mut norm_sq = 0.0;

        for block in &blocks {
            let l = apply_l(block, data, i);
            for k in 0..l[0].len() {
                let f = block.value(data, k, i);
                norm_sq += f.norm_sqr();
                let fdot = block.rows[k].map_or(Complex64::new(0.0, 0.0), |row| derivatives[row][i]);
                for a in 0..3 {
                    let la = l[a][k].conj();
                    ldt[a] += (la * fdot).im;
                    for b in 0..3 {
                        ll[(a, b)] += (la * l[b][k]).re;
                    }
                }
            }
        }

        if libm::sqrt(norm_sq) < config.degenerate_tolerance {
            degenerate[i] = true;
            continue;
        }

        let eigen = SymmetricEigen::new(ll);
        let (mut i_max, mut i_min) = (0, 0);
        for k in 1..3 {
            if eigen.eigenvalues[k] > eigen.eigenvalues[i_max] {
                i_max = k;
            }
            if eigen.eigenvalues[k] < eigen.eigenvalues[i_min] {
                i_min = k;
            }
        }
        let lambda_max = eigen.eigenvalues[i_max];
        let lambda_min = eigen.eigenvalues[i_min];
        if !(lambda_max > 0.0) || lambda_min <= SINGULAR_RATIO * lambda_max {
            degenerate[i] = true;
            continue;
        }

        // Ω = −⟨LL⟩⁻¹⟨L∂t⟩ through the eigenbasis
        let mut w = Vector3::zeros();
        for k in 0..3 {
            let q = Vector3::new(
                eigen.eigenvectors[(0, k)],
                eigen.eigenvectors[(1, k)],
                eigen.eigenvectors[(2, k)],
            );
            let proj = q.dot(&Vector3::from_array(ldt)) / eigen.eigenvalues[k];
            w += q * (-proj);
        }

        let mut a = Vector3::new(
            eigen.eigenvectors[(0, i_max)],
            eigen.eigenvectors[(1, i_max)],
            eigen.eigenvectors[(2, i_max)],
        )
        .normalize();
        let flip = match previous_axis {
            Some(prev) => a.dot(&prev) < 0.0,
            None => {
                let along = w.dot(&a);
                if along == 0.0 {
                    a.z < 0.0
                } else {
                    along < 0.0
                }
            }
        };
        if flip {
            a = -a;
        }
        previous_axis = Some(a);
        omega[i] = w;
        axis[i] = a;
    }

    let n_degenerate = degenerate.iter().filter(|&&d| d).count();
    if n_degenerate == n {
        return Err(FrameError::singular_input(
            CONTEXT,
            format!("all {} samples are degenerate", n),
        ));
    }

    let mut discontinuities = Vec::new();
    if n_degenerate > 0 {
        let first = degenerate.iter().position(|&d| d).unwrap_or(0);
        warn!(
            count = n_degenerate,
            first_index = first,
            "degenerate angular-velocity samples filled from neighbours"
        );
        for i in 0..n {
            if degenerate[i] && (i == 0 || !degenerate[i - 1]) {
                discontinuities.push(i);
            }
        }
        fill_from_nearest_valid(&degenerate, &mut omega);
        fill_from_nearest_valid(&degenerate, &mut axis);
    }

    debug!(n_times = n, n_degenerate, "computed angular velocity");
    Ok(AngularVelocity {
        times: times.to_vec(),
        omega,
        axis,
        degenerate,
        discontinuities,
    })
}

/// Overwrites each flagged entry with the nearest unflagged one; ties go to
/// the earlier sample.
fn fill_from_nearest_valid(flags: &[bool], values: &mut [Vector3]) {
    let n = flags.len();
    let mut previous: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for i in 0..n {
        if !flags[i] {
            last = Some(i);
        }
        previous[i] = last;
    }
    let mut next = None;
    for i in (0..n).rev() {
        if !flags[i] {
            next = Some(i);
            continue;
        }
        let source = match (previous[i], next) {
            (Some(p), Some(q)) => {
                if i - p <= q - i {
                    p
                } else {
                    q
                }
            }
            (Some(p), None) => p,
            (None, Some(q)) => q,
            (None, None) => continue,
        };
        values[i] = values[source];
    }
}

impl Waveform {
    /// See [`angular_velocity`].
    pub fn angular_velocity(&self, config: &EngineConfig) -> FrameResult<AngularVelocity> {
        angular_velocity(self, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModeSet, WaveformMetadata};

    fn quadrupole(omega: f64, n: usize, dt: f64) -> Waveform {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let modes = ModeSet::new(vec![(2, 2), (2, -2)]).unwrap();
        let data = vec![
            times.iter().map(|&t| Complex64::from_polar(1.0, -2.0 * omega * t)).collect(),
            times.iter().map(|&t| Complex64::from_polar(1.0, 2.0 * omega * t)).collect(),
        ];
        Waveform::new(times, modes, data, WaveformMetadata::new("quadrupole", 2)).unwrap()
    }

    #[test]
    fn test_rotating_quadrupole_gives_z_omega() {
        let w = quadrupole(0.1, 200, 0.1);
        let av = angular_velocity(&w, &EngineConfig::default()).unwrap();
        for i in 0..av.len() {
            assert!(av.omega[i].max_difference(&Vector3::new(0.0, 0.0, 0.1)) < 1e-4, "{}", av.omega[i]);
            assert!(av.axis[i].max_difference(&Vector3::z_axis()) < 1e-12);
        }
        assert_eq!(av.n_degenerate(), 0);
        assert!(av.discontinuities.is_empty());
    }

    #[test]
    fn test_counter_rotating_quadrupole_flips_axis() {
        let w = quadrupole(-0.2, 100, 0.05);
        let av = angular_velocity(&w, &EngineConfig::default()).unwrap();
        // axis follows Ω on the first sample, then stays continuous
        for i in 0..av.len() {
            assert!((av.omega[i].z + 0.2).abs() < 1e-4);
            assert!((av.axis[i].z + 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_degenerate_samples_are_flagged_and_filled() {
        let w = quadrupole(0.1, 60, 0.1);
        let mut data = w.data().to_vec();
        for row in data.iter_mut() {
            for z in row[20..23].iter_mut() {
                *z = Complex64::new(0.0, 0.0);
            }
        }
        let w = Waveform::new(w.times().to_vec(), w.modes().clone(), data, WaveformMetadata::new("gap", 2))
            .unwrap();
        let av = angular_velocity(&w, &EngineConfig::default()).unwrap();
        assert_eq!(av.n_degenerate(), 3);
        assert_eq!(av.discontinuities, vec![20]);
        assert_eq!(av.omega[20], av.omega[19]);
        assert_eq!(av.omega[22], av.omega[23]);
        assert!(av.omega.iter().all(|o| o.is_finite()));
    }

    #[test]
    fn test_all_degenerate_fails() {
        let times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let modes = ModeSet::full(2, 2).unwrap();
        let data = vec![vec![Complex64::new(0.0, 0.0); 10]; 5];
        let w = Waveform::new(times, modes, data, WaveformMetadata::default()).unwrap();
        assert!(matches!(
            angular_velocity(&w, &EngineConfig::default()),
            Err(FrameError::SingularInput { .. })
        ));
    }

    #[test]
    fn test_too_few_samples() {
        let w = quadrupole(0.1, 2, 0.1);
        assert!(matches!(
            angular_velocity(&w, &EngineConfig::default()),
            Err(FrameError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_fill_prefers_earlier_on_tie() {
        let flags = [false, true, false];
        let mut values = [Vector3::x_axis(), Vector3::zeros(), Vector3::y_axis()];
        fill_from_nearest_valid(&flags, &mut values);
        assert_eq!(values[1], Vector3::x_axis());
    }
}
