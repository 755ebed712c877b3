//! Helpers for angles and sampled time grids.
//!
//! Small building blocks used throughout the workspace: phase unwrapping for
//! mode arguments, angle normalization, grid validation, bracketing lookups,
//! and the intersection of two time grids.
//!
//! # Angle Normalization
//!
//! | Function | Output Range |
//! |----------|--------------|
//! | [`normalize_angle_rad`] | (-π, π] |
//! | [`normalize_angle_to_positive`] | [0, 2π) |
//!
//! # Phase Unwrapping
//!
//! [`unwrap`] removes the 2π jumps from a sequence of wrapped phases, so the
//! argument of a mode like `h₂₂ ∝ e^{-2iΦ}` becomes a smooth, monotone function.

use crate::constants::{PI, TWOPI};
use crate::{FrameError, FrameResult};

/// Normalizes an angle in radians to the range (-π, π].
#[inline]
pub fn normalize_angle_rad(angle: f64) -> f64 {
    let mut normalized = angle % TWOPI;
    if normalized > PI {
        normalized -= TWOPI;
    } else if normalized <= -PI {
        normalized += TWOPI;
    }
    normalized
}

/// Normalizes an angle in radians to the range [0, 2π).
#[inline]
pub fn normalize_angle_to_positive(angle: f64) -> f64 {
    let mut a = angle % TWOPI;
    if a < 0.0 {
        a += TWOPI;
    }
    a
}

/// Unwraps a sequence of phases.
///
/// Each jump larger than π between consecutive samples is shifted by the multiple
/// of 2π that brings it into (-π, π]. The first sample is unchanged.
///
/// ```
/// use gwframe_core::utils::unwrap;
///
/// let wrapped = [3.0, -3.0, -2.9];
/// let smooth = unwrap(&wrapped);
/// assert!((smooth[1] - (-3.0 + 2.0 * std::f64::consts::PI)).abs() < 1e-12);
/// ```
pub fn unwrap(phases: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phases.len());
    let mut offset = 0.0;
    for (i, &p) in phases.iter().enumerate() {
        if i > 0 {
            let jump = p - phases[i - 1];
            offset -= TWOPI * libm::round(jump / TWOPI);
        }
        out.push(p + offset);
    }
    out
}

/// Fails with [`FrameError::InvalidInput`] unless `times` is finite and strictly
/// increasing.
pub fn check_strictly_increasing(context: &str, times: &[f64]) -> FrameResult<()> {
    if let Some(bad) = times.iter().position(|t| !t.is_finite()) {
        return Err(FrameError::invalid_input(
            context,
            format!("non-finite time at index {}", bad),
        ));
    }
    for i in 1..times.len() {
        if times[i] <= times[i - 1] {
            return Err(FrameError::invalid_input(
                context,
                format!(
                    "time grid not strictly increasing at index {} ({} after {})",
                    i,
                    times[i],
                    times[i - 1]
                ),
            ));
        }
    }
    Ok(())
}

/// Indices `(i, i + 1)` of the grid interval containing `t`.
///
/// For a single-point grid both indices are 0. Fails with
/// [`FrameError::OutOfRange`] when `t` lies outside `[times[0], times[n-1]]`.
pub fn bracket(context: &str, times: &[f64], t: f64) -> FrameResult<(usize, usize)> {
    let n = times.len();
    if n == 0 {
        return Err(FrameError::invalid_input(context, "empty time grid"));
    }
    let (t_min, t_max) = (times[0], times[n - 1]);
    if !(t >= t_min && t <= t_max) {
        return Err(FrameError::out_of_range(context, t, t_min, t_max));
    }
    if n == 1 {
        return Ok((0, 0));
    }
    let upper = times.partition_point(|&x| x <= t);
    let before = upper.saturating_sub(1).min(n - 2);
    Ok((before, before + 1))
}

/// The part of grid `a` lying inside the domain of grid `b`.
///
/// Used to build a common window for comparing two waveforms: every returned time
/// is a sample of `a` and can be interpolated in `b`. Returns an empty vector if
/// the domains do not overlap.
pub fn intersection_grid(a: &[f64], b: &[f64]) -> Vec<f64> {
    let (Some(&b0), Some(&b1)) = (b.first(), b.last()) else {
        return Vec::new();
    };
    a.iter().copied().filter(|&t| t >= b0 && t <= b1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_rad() {
        assert!((normalize_angle_rad(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-15);
        assert_eq!(normalize_angle_rad(0.5), 0.5);
        assert!((normalize_angle_rad(-PI) - PI).abs() < 1e-15);
    }

    #[test]
    fn test_normalize_angle_to_positive() {
        assert!((normalize_angle_to_positive(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-15);
        assert_eq!(normalize_angle_to_positive(1.0), 1.0);
    }

    #[test]
    fn test_unwrap_linear_phase() {
        let truth: Vec<f64> = (0..200).map(|i| -0.37 * i as f64).collect();
        let wrapped: Vec<f64> = truth.iter().map(|&p| normalize_angle_rad(p)).collect();
        let unwrapped = unwrap(&wrapped);
        for (u, t) in unwrapped.iter().zip(truth.iter()) {
            assert!((u - t).abs() < 1e-10);
        }
    }

    #[test]
    fn test_unwrap_empty() {
        assert!(unwrap(&[]).is_empty());
    }

    #[test]
    fn test_check_strictly_increasing() {
        assert!(check_strictly_increasing("t", &[0.0, 1.0, 1.5]).is_ok());
        assert!(check_strictly_increasing("t", &[0.0, 1.0, 1.0]).is_err());
        assert!(check_strictly_increasing("t", &[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_bracket() {
        let grid = [0.0, 1.0, 2.0, 4.0];
        assert_eq!(bracket("b", &grid, 0.0).unwrap(), (0, 1));
        assert_eq!(bracket("b", &grid, 1.0).unwrap(), (1, 2));
        assert_eq!(bracket("b", &grid, 3.0).unwrap(), (2, 3));
        assert_eq!(bracket("b", &grid, 4.0).unwrap(), (2, 3));
        assert!(matches!(
            bracket("b", &grid, 4.5),
            Err(FrameError::OutOfRange { .. })
        ));
        assert!(bracket("b", &grid, f64::NAN).is_err());
    }

    #[test]
    fn test_intersection_grid() {
        let a = [0.0, 1.0, 2.0, 3.0, 4.0];
        let b = [0.5, 2.0, 3.5];
        assert_eq!(intersection_grid(&a, &b), vec![1.0, 2.0, 3.0]);
        assert!(intersection_grid(&a, &[10.0, 11.0]).is_empty());
        assert!(intersection_grid(&a, &[]).is_empty());
    }
}
