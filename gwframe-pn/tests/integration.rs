use approx::assert_abs_diff_eq;
use gwframe_core::{FrameError, OdeConfig, Vector3};
use gwframe_pn::{PNWaveform, PnConfig, PnParameters, PnState, TerminationReason};
use gwframe_waveform::FrameType;

fn non_spinning(omega: f64) -> PnParameters {
    PnParameters::new(1.0, 1.0, Vector3::zeros(), Vector3::zeros(), omega)
}

fn precessing() -> PnParameters {
    PnParameters::new(
        1.5,
        1.0,
        Vector3::new(0.6, 0.0, 0.2),
        Vector3::new(-0.2, 0.4, 0.1),
        0.02,
    )
}

#[test]
fn equal_mass_inspiral_reaches_v_max() {
    let pn = PNWaveform::new(&non_spinning(0.02), PnConfig::default()).unwrap();
    assert_eq!(pn.state(), PnState::Terminated(TerminationReason::MergerApproach));
    assert!(pn.is_truncated());

    let v = pn.v();
    assert!(v.windows(2).all(|w| w[1] > w[0]));
    assert!(pn.times().windows(2).all(|w| w[1] > w[0]));
    assert_abs_diff_eq!(v[0], 0.02f64.cbrt(), epsilon = 1e-15);
    assert_abs_diff_eq!(*v.last().unwrap(), 0.4, epsilon = 1e-6);
    assert!(pn.phase().iter().all(|p| p.is_finite()));

    // leading-order chirp time is 5 / (256 ν v⁸) ≈ 2.7e3 M; PN corrections shorten it
    let duration = *pn.times().last().unwrap();
    assert!(duration > 1000.0 && duration < 3000.0, "duration {}", duration);
}

#[test]
fn invalid_parameters_fail_before_integrating() {
    let mut params = non_spinning(0.02);
    params.m1 = -1.0;
    assert!(matches!(
        PNWaveform::new(&params, PnConfig::default()),
        Err(FrameError::InvalidInput { .. })
    ));

    let too_slow = PnConfig::default().with_v_max(0.2);
    assert!(matches!(
        PNWaveform::new(&non_spinning(0.02), too_slow),
        Err(FrameError::InvalidInput { .. })
    ));
}

#[test]
fn t_max_completes_the_run() {
    let pn = PNWaveform::new(&non_spinning(0.02), PnConfig::default().with_t_max(400.0)).unwrap();
    assert_eq!(pn.state(), PnState::Complete);
    assert!(!pn.is_truncated());
    assert_abs_diff_eq!(*pn.times().last().unwrap(), 400.0, epsilon = 1e-9);
}

#[test]
fn precessing_binary_stays_finite() {
    let pn = PNWaveform::new(&precessing(), PnConfig::default().with_t_max(1200.0)).unwrap();
    assert_eq!(pn.state(), PnState::Complete);

    let ell = pn.ell_hat();
    assert!(ell.iter().all(|l| l.is_finite() && (l.magnitude() - 1.0).abs() < 1e-9));
    // in-plane spins make the orbital plane precess
    let tilt = ell.iter().map(|l| l.z).fold(f64::INFINITY, f64::min);
    assert!(tilt < 1.0 - 1e-6);
    assert!(pn.omega_prec_magnitude().iter().any(|w| *w > 0.0));
    for (tot, orb) in pn.omega_tot_magnitude().iter().zip(pn.omega_orb_magnitude()) {
        assert!(tot.is_finite() && *tot >= 0.5 * orb);
    }
    for (c, c0) in pn.chi1().iter().zip(std::iter::repeat(precessing().chi1)) {
        assert_abs_diff_eq!(c.magnitude(), c0.magnitude(), epsilon = 1e-6);
    }
}

#[test]
fn inertial_waveform_is_quadrupole_dominated() {
    let pn = PNWaveform::new(&precessing(), PnConfig::default().with_t_max(500.0)).unwrap();
    let h = pn.to_inertial_waveform().unwrap();
    assert_eq!(h.frame_type(), FrameType::Inertial);
    assert!(h.frame().is_none());
    assert_eq!(h.n_times(), pn.len());

    let n = h.n_times() - 1;
    let h22 = h.mode(2, 2).unwrap()[n].norm();
    for (ell, m) in h.modes().iter() {
        if ell > 2 {
            assert!(h.mode(ell, m).unwrap()[n].norm() < h22);
        }
    }
    // a rotation mixes m within ℓ = 2 but keeps the ℓ = 2 power
    let co = pn.coorbital_waveform().unwrap();
    let power = |w: &gwframe_waveform::Waveform| -> f64 {
        (-2..=2).map(|m| w.mode(2, m).unwrap()[n].norm_sqr()).sum()
    };
    assert_abs_diff_eq!(power(&h), power(&co), epsilon = 1e-12);
}

#[test]
fn step_budget_keeps_partial_trajectory() {
    let config = PnConfig::default().with_ode(OdeConfig::default().with_max_steps(5));
    let pn = PNWaveform::new(&non_spinning(0.02), config).unwrap();
    assert_eq!(pn.termination_reason(), Some(TerminationReason::StepBudgetExhausted));
    assert_eq!(pn.steps(), 5);
    assert_eq!(pn.len(), 6);

    let h = pn.into_waveform().unwrap();
    assert!(h.is_truncated());
    assert_eq!(h.n_times(), 6);
}

#[test]
fn backward_leg_starts_at_lower_frequency() {
    let params = non_spinning(0.02).with_start_frequency(0.015);
    let pn = PNWaveform::new(&params, PnConfig::default().with_t_max(200.0)).unwrap();
    assert_eq!(pn.state(), PnState::Complete);

    let t = pn.times();
    assert!(t[0] < -1000.0);
    assert!(t.windows(2).all(|w| w[1] > w[0]));
    assert_abs_diff_eq!(pn.v()[0], 0.015f64.cbrt(), epsilon = 1e-6);

    let i0 = t.iter().position(|&ti| ti == 0.0).unwrap();
    assert_abs_diff_eq!(pn.v()[i0], 0.02f64.cbrt(), epsilon = 1e-15);
    assert_eq!(pn.phase()[i0], 0.0);
    assert!(pn.phase()[0] < 0.0);
}
