//! Alignment of one waveform onto another by a constant rotation and time shift.
//!
//! [`align`] finds the rotor `R` and offset `δt` minimizing
//!
//! ```text
//! Σ_k Σ_ℓm | f^ref_ℓm(t_k) − [f^this(t_k + δt) D(R)]_ℓm |²
//! ```
//!
//! over the reference samples `t_k ∈ [t1, t2]`. The four parameters are the
//! rotation vector of `R` and `δt`, solved with
//! [`least_squares`](gwframe_core::numerics::least_squares) from the identity and
//! zero offset.

use crate::waveform::rotate_table;
use crate::Waveform;
use gwframe_core::numerics::least_squares;
use gwframe_core::{EngineConfig, FrameError, FrameResult, Quaternion, Vector3};
use num_complex::Complex64;
use tracing::debug;

/// Result of [`align`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    /// Rotation to apply to the aligned waveform's basis.
    pub rotation: Quaternion,
    /// Amount by which the aligned waveform lags the reference.
    pub time_offset: f64,
    /// L2 norm of the remaining mode difference over the window.
    pub residual: f64,
    pub iterations: usize,
}

/// Aligns `this` onto `reference` over the window `[t1, t2]`.
///
/// # Errors
///
/// - [`FrameError::InvalidInput`] if the two mode sets differ, or the window is
///   empty or holds no reference sample.
/// - [`FrameError::OutOfRange`] if the window is not inside both domains.
/// - [`FrameError::Convergence`] if the minimizer runs out of iterations.
pub fn align(
    this: &Waveform,
    reference: &Waveform,
    t1: f64,
    t2: f64,
    config: &EngineConfig,
) -> FrameResult<Alignment> {
    const CONTEXT: &str = "align";
    if !(t1 < t2) {
        return Err(FrameError::invalid_input(
            CONTEXT,
            format!("empty window [{}, {}]", t1, t2),
        ));
    }
    let modes = this.modes();
    if modes.len() != reference.n_modes() || !reference.modes().iter().all(|(l, m)| modes.contains(l, m)) {
        return Err(FrameError::invalid_input(
            CONTEXT,
            format!("mode sets differ: {} vs {}", modes, reference.modes()),
        ));
    }
    modes.require_complete_blocks(CONTEXT)?;
    for w in [this, reference] {
        for t in [t1, t2] {
            if t < w.t_min() || t > w.t_max() {
                return Err(FrameError::out_of_range(CONTEXT, t, w.t_min(), w.t_max()));
            }
        }
    }

    let window: Vec<usize> = reference
        .times()
        .iter()
        .enumerate()
        .filter(|(_, &t)| t >= t1 && t <= t2)
        .map(|(i, _)| i)
        .collect();
    if window.is_empty() {
        return Err(FrameError::invalid_input(
            CONTEXT,
            format!("no reference samples in [{}, {}]", t1, t2),
        ));
    }
    let sample_times: Vec<f64> = window.iter().map(|&i| reference.times()[i]).collect();
    // reference values laid out in this waveform's mode order
    let target: Vec<Vec<Complex64>> = modes
        .iter()
        .map(|(ell, m)| {
            let row = reference.mode(ell, m).unwrap_or_default();
            window.iter().map(|&i| row[i]).collect()
        })
        .collect();

    let interpolator = this.interpolator()?;
    let n_samples = sample_times.len();
    let residuals = |p: &[f64]| -> FrameResult<Vec<f64>> {
        let rotor = Quaternion::from_rotation_vector(Vector3::new(p[0], p[1], p[2]));
        let mut shifted = vec![Vec::with_capacity(n_samples); modes.len()];
        for &t in &sample_times {
            for (row, value) in shifted.iter_mut().zip(interpolator.eval(t + p[3])?) {
                row.push(value);
            }
        }
        let rotated = rotate_table(modes, &shifted, &vec![rotor; n_samples])?;
        let mut out = Vec::with_capacity(2 * n_samples * modes.len());
        for (want, got) in target.iter().zip(&rotated) {
            for (a, b) in want.iter().zip(got) {
                let d = a - b;
                out.push(d.re);
                out.push(d.im);
            }
        }
        Ok(out)
    };

    let fit = least_squares(residuals, &[0.0; 4], &config.minimizer)?;
    let p = &fit.parameters;
    let alignment = Alignment {
        rotation: Quaternion::from_rotation_vector(Vector3::new(p[0], p[1], p[2])),
        time_offset: p[3],
        residual: fit.residual_norm,
        iterations: fit.iterations,
    };
    debug!(
        t1,
        t2,
        samples = n_samples,
        time_offset = alignment.time_offset,
        residual = alignment.residual,
        iterations = alignment.iterations,
        "alignment found"
    );
    Ok(alignment)
}

impl Waveform {
    /// Aligns this waveform onto `reference`; see [`align`].
    pub fn align_to(
        &self,
        reference: &Waveform,
        t1: f64,
        t2: f64,
        config: &EngineConfig,
    ) -> FrameResult<Alignment> {
        align(self, reference, t1, t2, config)
    }

    /// Shifts the grid by `−time_offset` and rotates the basis by `rotation`,
    /// so the waveform lines up with the reference it was aligned to.
    pub fn apply_alignment(&mut self, alignment: &Alignment) -> FrameResult<()> {
        let mut aligned = self.clone();
        aligned.rotate_decomposition_basis_by(alignment.rotation)?;
        aligned.shift_times(-alignment.time_offset)?;
        aligned.push_history(format!(
            "apply_alignment(time_offset={}, rotation={})",
            alignment.time_offset, alignment.rotation
        ));
        *self = aligned;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModeSet, WaveformMetadata};

    fn sample(n: usize) -> Waveform {
        let times: Vec<f64> = (0..n).map(|i| i as f64 * 0.2).collect();
        let modes = ModeSet::full(2, 2).unwrap();
        let data = modes
            .iter()
            .map(|(_, m)| {
                times
                    .iter()
                    .map(|&t| Complex64::from_polar(1.0 + 0.1 * m as f64, -(m as f64) * 0.3 * t))
                    .collect()
            })
            .collect();
        Waveform::new(times, modes, data, WaveformMetadata::default()).unwrap()
    }

    #[test]
    fn test_identical_copy_aligns_trivially() {
        let w = sample(60);
        let a = align(&w, &w.clone(), 1.0, 10.0, &EngineConfig::default()).unwrap();
        assert_eq!(a.rotation, Quaternion::identity());
        assert_eq!(a.time_offset, 0.0);
        assert_eq!(a.residual, 0.0);
        assert_eq!(a.iterations, 0);
    }

    #[test]
    fn test_window_spanning_whole_domain() {
        let w = sample(60);
        let a = w
            .align_to(&w.clone(), w.t_min(), w.t_max(), &EngineConfig::default())
            .unwrap();
        assert_eq!(a.rotation, Quaternion::identity());
        assert_eq!(a.time_offset, 0.0);
        assert_eq!(a.residual, 0.0);
    }

    #[test]
    fn test_window_outside_domain() {
        let w = sample(60);
        assert!(matches!(
            align(&w, &w, 1.0, 100.0, &EngineConfig::default()),
            Err(FrameError::OutOfRange { .. })
        ));
        assert!(matches!(
            align(&w, &w, 5.0, 5.0, &EngineConfig::default()),
            Err(FrameError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_mode_sets_must_match() {
        let w = sample(30);
        let times = w.times().to_vec();
        let modes = ModeSet::full(2, 3).unwrap();
        let data = vec![vec![Complex64::new(1.0, 0.0); times.len()]; modes.len()];
        let other = Waveform::new(times, modes, data, WaveformMetadata::default()).unwrap();
        assert!(matches!(
            align(&w, &other, 1.0, 2.0, &EngineConfig::default()),
            Err(FrameError::InvalidInput { .. })
        ));
    }
}
