//! Frame integration and the corotating, co-precessing and inertial transforms.
//!
//! A rotating frame is the solution of `dR/dt = ½ Ω(t) R(t)` for an angular
//! velocity sampled on the waveform's grid. [`integrate_frame`] advances it
//! interval by interval with a fourth-order Magnus step:
//!
//! ```text
//! Θ_i     = ∫_{t_i}^{t_{i+1}} Ω dt + (√3/12) h² (Ω(τ₂) × Ω(τ₁))
//! R_{i+1} = exp(Θ_i / 2) R_i
//! ```
//!
//! where the integral is that of the cubic spline through `Ω`, and
//! `τ₁,₂ = t_i + (½ ∓ √3/6) h` are the two Gauss points. Every step is
//! renormalized.
//!
//! | Transform | Angular velocity integrated | Initial rotor |
//! |-----------|-----------------------------|---------------|
//! | corotating | `Ω` | identity |
//! | co-precessing | `Ω − (Ω·â)â` | minimal rotation `ẑ → â(t₀)` |
//! | inertial | (applies the conjugate of the stored frame) | |

use crate::angular_velocity::angular_velocity;
use crate::waveform::FrameTarget;
use crate::{FrameType, Waveform};
use gwframe_core::numerics::VectorSpline;
use gwframe_core::{EngineConfig, FrameError, FrameResult, Quaternion, QuaternionSeries, Vector3};
use tracing::debug;

const SQRT3: f64 = 1.7320508075688772;

/// Integrates `dR/dt = ½ Ω R` from `initial` at `times[0]`.
///
/// # Errors
///
/// [`FrameError::InvalidInput`] if `omega` does not match the grid or the grid
/// has fewer than two samples.
pub fn integrate_frame(
    times: &[f64],
    omega: &[Vector3],
    initial: Quaternion,
) -> FrameResult<QuaternionSeries> {
    if times.len() != omega.len() {
        return Err(FrameError::invalid_input(
            "integrate_frame",
            format!("{} times but {} angular velocities", times.len(), omega.len()),
        ));
    }
    let spline = VectorSpline::new(times, omega)?;
    let mut rotors = Vec::with_capacity(times.len());
    let mut r = initial.normalize()?;
    rotors.push(r);

    for i in 0..times.len() - 1 {
        let (t0, t1) = (times[i], times[i + 1]);
        let h = t1 - t0;
        let tau1 = t0 + (0.5 - SQRT3 / 6.0) * h;
        let tau2 = t0 + (0.5 + SQRT3 / 6.0) * h;
        let w1 = spline.eval(tau1)?;
        let w2 = spline.eval(tau2)?;
        let theta = spline.integral(t0, t1)? + w2.cross(&w1) * (SQRT3 * h * h / 12.0);
        r = (Quaternion::from_rotation_vector(theta) * r).normalize()?;
        rotors.push(r);
    }

    QuaternionSeries::new(times.to_vec(), rotors)
}

impl Waveform {
    fn require_inertial(&self, operation: &str) -> FrameResult<()> {
        if self.frame_type() != FrameType::Inertial {
            return Err(FrameError::invalid_input(
                operation,
                format!("waveform must be in the inertial frame, found {}", self.frame_type()),
            ));
        }
        Ok(())
    }

    /// Rotates the modes into the frame that follows the radiation's rotation.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] unless the waveform is inertial, plus any error
    /// of [`angular_velocity`]. The waveform is unchanged on error.
    pub fn transform_to_corotating_frame(&mut self, config: &EngineConfig) -> FrameResult<()> {
        const OPERATION: &str = "transform_to_corotating_frame";
        self.require_inertial(OPERATION)?;
        let av = angular_velocity(self, config)?;
        let rotors = integrate_frame(self.times(), &av.omega, Quaternion::identity())?;
        self.apply_frame(&rotors, FrameType::Corotating)?;
        self.push_history(format!(
            "{}(frame_ell_max={}, degenerate={})",
            OPERATION,
            config.frame_ell_max,
            av.n_degenerate()
        ));
        Ok(())
    }

    /// Rotates the modes into the frame that follows the precession of the
    /// radiation axis but not the orbital phase about it.
    ///
    /// # Errors
    ///
    /// As for [`transform_to_corotating_frame`](Self::transform_to_corotating_frame).
    pub fn transform_to_coprecessing_frame(&mut self, config: &EngineConfig) -> FrameResult<()> {
        const OPERATION: &str = "transform_to_coprecessing_frame";
        self.require_inertial(OPERATION)?;
        let av = angular_velocity(self, config)?;
        let precession: Vec<Vector3> = av
            .omega
            .iter()
            .zip(&av.axis)
            .map(|(w, a)| w.reject_from(a))
            .collect();
        let initial = Quaternion::rotation_between(Vector3::z_axis(), av.axis[0])?;
        let rotors = integrate_frame(self.times(), &precession, initial)?;
        self.apply_frame(&rotors, FrameType::Coprecessing)?;
        self.push_history(format!(
            "{}(frame_ell_max={}, degenerate={})",
            OPERATION,
            config.frame_ell_max,
            av.n_degenerate()
        ));
        Ok(())
    }

    /// Undoes the stored frame, returning the modes to the inertial frame.
    ///
    /// A waveform that is already inertial is left as is.
    pub fn transform_to_inertial_frame(&mut self) -> FrameResult<()> {
        const OPERATION: &str = "transform_to_inertial_frame";
        let Some(frame) = self.frame() else {
            self.push_history(format!("{}() [already inertial]", OPERATION));
            return Ok(());
        };
        let inverse = frame.conjugate();
        self.rotate_basis(&inverse, FrameTarget::Fixed(FrameType::Inertial))?;
        self.push_history(format!("{}()", OPERATION));
        Ok(())
    }

    fn apply_frame(&mut self, rotors: &QuaternionSeries, frame_type: FrameType) -> FrameResult<()> {
        self.rotate_basis(rotors, FrameTarget::Fixed(frame_type))?;
        debug!(n_times = self.n_times(), frame_type = %frame_type, "frame transform applied");
        Ok(())
    }
}
