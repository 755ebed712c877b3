//! The PN run as seen by callers: trajectory accessors and mode synthesis.

use crate::amplitudes::{coorbital_modes, mode_list, SpinProjections};
use crate::evolution::{kinematics, Kinematics, PnEvolution, PnState, TerminationReason, Trajectory};
use crate::params::{Binary, PnConfig, PnParameters};
use gwframe_core::{FrameResult, QuaternionSeries, Vector3};
use gwframe_waveform::{FrameType, ModeSet, Waveform, WaveformMetadata};
use num_complex::Complex64;
use tracing::debug;

/// A completed (or terminated) PN run.
///
/// Construction integrates the orbit straight away. Only invalid parameters
/// make [`PNWaveform::new`] fail; a run that stops early is still returned,
/// with [`state`](Self::state) saying why and the trajectory up to that point.
///
/// ```
/// use gwframe_core::Vector3;
/// use gwframe_pn::{PNWaveform, PnConfig, PnParameters, PnState};
///
/// let params = PnParameters::new(1.0, 1.0, Vector3::zeros(), Vector3::zeros(), 0.03);
/// let pn = PNWaveform::new(&params, PnConfig::default().with_t_max(100.0)).unwrap();
/// assert_eq!(pn.state(), PnState::Complete);
///
/// let h = pn.to_inertial_waveform().unwrap();
/// assert_eq!(h.n_times(), pn.len());
/// ```
#[derive(Debug, Clone)]
pub struct PNWaveform {
    binary: Binary,
    evolution: PnEvolution,
}

impl PNWaveform {
    pub fn new(params: &PnParameters, config: PnConfig) -> FrameResult<Self> {
        let mut evolution = PnEvolution::new(params, config)?;
        evolution.run();
        Ok(Self {
            binary: *evolution.binary(),
            evolution,
        })
    }

    pub fn state(&self) -> PnState {
        self.evolution.state()
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        match self.state() {
            PnState::Terminated(reason) => Some(reason),
            _ => None,
        }
    }

    /// True when the run ended `Terminated`, for any reason.
    pub fn is_truncated(&self) -> bool {
        self.termination_reason().is_some()
    }

    pub fn binary(&self) -> &Binary {
        &self.binary
    }

    pub fn trajectory(&self) -> &Trajectory {
        self.evolution.trajectory()
    }

    pub fn steps(&self) -> usize {
        self.evolution.steps()
    }

    pub fn rejected_steps(&self) -> usize {
        self.evolution.rejected_steps()
    }

    pub fn len(&self) -> usize {
        self.trajectory().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory().is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.trajectory().t
    }

    pub fn v(&self) -> &[f64] {
        &self.trajectory().v
    }

    pub fn phase(&self) -> &[f64] {
        &self.trajectory().phase
    }

    pub fn chi1(&self) -> &[Vector3] {
        &self.trajectory().chi1
    }

    pub fn chi2(&self) -> &[Vector3] {
        &self.trajectory().chi2
    }

    /// Co-orbital frame rotor at each sample.
    pub fn frame(&self) -> FrameResult<QuaternionSeries> {
        let traj = self.trajectory();
        QuaternionSeries::new(traj.t.clone(), traj.frame.clone())
    }

    fn kinematics(&self) -> Vec<Kinematics> {
        let model = self.evolution.model();
        let traj = self.trajectory();
        (0..traj.len())
            .map(|i| kinematics(model, traj.v[i], &traj.chi1[i], &traj.chi2[i], &traj.frame[i]))
            .collect()
    }

    /// Direction `ℓ̂` of the orbital angular momentum.
    pub fn ell_hat(&self) -> Vec<Vector3> {
        self.kinematics().iter().map(|k| k.ell_hat).collect()
    }

    /// Orbital angular velocity `v³ ℓ̂`.
    pub fn omega_orb(&self) -> Vec<Vector3> {
        self.kinematics().iter().map(|k| k.omega_orb).collect()
    }

    /// Precession part of the frame angular velocity, `ℓ̂ × dℓ̂/dt`.
    pub fn omega_prec(&self) -> Vec<Vector3> {
        self.kinematics().iter().map(|k| k.omega_prec).collect()
    }

    /// Total frame angular velocity `omega_orb + omega_prec`.
    pub fn omega_tot(&self) -> Vec<Vector3> {
        self.kinematics()
            .iter()
            .map(|k| k.omega_orb + k.omega_prec)
            .collect()
    }

    /// Newtonian orbital angular momentum `L = ν/v ℓ̂`.
    pub fn angular_momentum(&self) -> Vec<Vector3> {
        let nu = self.binary.nu;
        self.kinematics()
            .iter()
            .zip(self.v())
            .map(|(k, v)| k.ell_hat * (nu / v))
            .collect()
    }

    pub fn omega_orb_magnitude(&self) -> Vec<f64> {
        magnitudes(&self.omega_orb())
    }

    pub fn omega_prec_magnitude(&self) -> Vec<f64> {
        magnitudes(&self.omega_prec())
    }

    pub fn omega_tot_magnitude(&self) -> Vec<f64> {
        magnitudes(&self.omega_tot())
    }

    pub fn angular_momentum_magnitude(&self) -> Vec<f64> {
        magnitudes(&self.angular_momentum())
    }

    /// Modes in the co-orbital frame, with the frame series attached.
    pub fn coorbital_waveform(&self) -> FrameResult<Waveform> {
        let traj = self.trajectory();
        let b = &self.binary;
        let modes = ModeSet::full(2, gwframe_core::constants::PN_ELL_MAX)?;
        let mut data = vec![Vec::with_capacity(traj.len()); mode_list().len()];
        for i in 0..traj.len() {
            for (row, (_, h)) in data.iter_mut().zip(self.sample_modes(i)) {
                row.push(h);
            }
        }
        let metadata = WaveformMetadata::new(
            format!("PN {} (m1={}, m2={})", approximant_name(b), b.m1, b.m2),
            gwframe_core::constants::PN_ELL_MAX,
        );
        debug!(n_times = traj.len(), state = %self.state(), "synthesized co-orbital PN modes");
        Ok(Waveform::new(traj.t.clone(), modes, data, metadata)?
            .with_frame(self.frame()?, FrameType::Coorbital)?
            .with_truncated(self.is_truncated()))
    }

    /// Modes in the inertial frame.
    pub fn to_inertial_waveform(&self) -> FrameResult<Waveform> {
        let mut waveform = self.coorbital_waveform()?;
        waveform.transform_to_inertial_frame()?;
        Ok(waveform)
    }

    pub fn into_waveform(self) -> FrameResult<Waveform> {
        self.to_inertial_waveform()
    }

    /// Spin projections on `ℓ̂` at each sample, as they enter the amplitudes.
    /// Zero when spin terms are disabled.
    pub fn spin_projections(&self) -> Vec<SpinProjections> {
        (0..self.len()).map(|i| self.spin_projection(i)).collect()
    }

    fn spin_projection(&self, i: usize) -> SpinProjections {
        let b = &self.binary;
        if !b.spin_terms {
            return SpinProjections::default();
        }
        let traj = self.trajectory();
        let frame = &traj.frame[i];
        let ell_hat = frame.rotate(Vector3::z_axis()) / frame.norm_squared();
        SpinProjections::new(b.m1, b.m2, &traj.chi1[i], &traj.chi2[i], &ell_hat)
    }

    /// Co-orbital modes at sample `i`, in `(ℓ, m)` order.
    fn sample_modes(&self, i: usize) -> Vec<((i32, i32), Complex64)> {
        let b = &self.binary;
        let v = self.trajectory().v[i];
        mode_list()
            .into_iter()
            .zip(coorbital_modes(v, b.nu, b.delta, &self.spin_projection(i), b.amplitude_half_orders))
            .collect()
    }

    /// Co-orbital modes at sample `i`, or `None` past the end of the trajectory.
    pub fn coorbital_modes_at(&self, i: usize) -> Option<Vec<((i32, i32), Complex64)>> {
        (i < self.len()).then(|| self.sample_modes(i))
    }
}

fn approximant_name(b: &Binary) -> &'static str {
    if b.spin_terms {
        "TaylorT1"
    } else {
        "TaylorT1 (no spin terms)"
    }
}

fn magnitudes(vectors: &[Vector3]) -> Vec<f64> {
    vectors.iter().map(Vector3::magnitude).collect()
}
