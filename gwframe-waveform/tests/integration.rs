use approx::assert_abs_diff_eq;
use gwframe_core::{EngineConfig, FrameError, Quaternion, QuaternionSeries, Vector3};
use gwframe_waveform::{align, FrameType, ModeSet, TextSink, Waveform, WaveformMetadata};
use num_complex::Complex64;

fn grid(n: usize, dt: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 * dt).collect()
}

/// Constant `(2, ±2)` pattern seen from the frame `R(t)`: modes `h0 D(R̄(t))`.
fn precessing_quadrupole(times: &[f64]) -> (Waveform, Vec<Quaternion>) {
    let modes = ModeSet::full(2, 2).unwrap();
    let data = modes
        .iter()
        .map(|(_, m)| {
            let amp = if m.abs() == 2 { 1.0 } else { 0.0 };
            vec![Complex64::new(amp, 0.0); times.len()]
        })
        .collect();
    let mut w = Waveform::new(times.to_vec(), modes, data, WaveformMetadata::new("precessing", 2)).unwrap();

    let tilt = Quaternion::from_rotation_vector(Vector3::new(0.3, 0.0, 0.0));
    let frame: Vec<Quaternion> = times
        .iter()
        .map(|&t| {
            Quaternion::from_rotation_vector(Vector3::new(0.0, 0.0, 0.02 * t))
                * tilt
                * Quaternion::from_rotation_vector(Vector3::new(0.0, 0.0, 0.2 * t))
        })
        .collect();
    let inverse = QuaternionSeries::new(times.to_vec(), frame.iter().map(Quaternion::conjugate).collect()).unwrap();
    w.rotate_decomposition_basis(&inverse).unwrap();

    // forget the construction frame: the data are now "measured" inertial modes
    let inertial = Waveform::new(
        times.to_vec(),
        w.modes().clone(),
        w.data().to_vec(),
        WaveformMetadata::new("precessing", 2),
    )
    .unwrap();
    (inertial, frame)
}

fn max_mode_difference(a: &Waveform, b: &Waveform) -> f64 {
    a.data()
        .iter()
        .zip(b.data())
        .flat_map(|(x, y)| x.iter().zip(y).map(|(p, q)| (p - q).norm()))
        .fold(0.0, f64::max)
}

#[test]
fn corotating_round_trip_reproduces_modes() {
    let (original, _) = precessing_quadrupole(&grid(501, 0.1));
    let mut w = original.clone();
    w.transform_to_corotating_frame(&EngineConfig::default()).unwrap();
    assert_eq!(w.frame_type(), FrameType::Corotating);
    assert!(w.frame().is_some());

    w.transform_to_inertial_frame().unwrap();
    assert_eq!(w.frame_type(), FrameType::Inertial);
    assert!(w.frame().is_none());
    assert!(max_mode_difference(&w, &original) < 1e-12);
    assert_eq!(w.history().len(), 3);
}

#[test]
fn corotating_frame_freezes_a_rotating_pattern() {
    let (mut w, _) = precessing_quadrupole(&grid(501, 0.1));
    w.transform_to_corotating_frame(&EngineConfig::default()).unwrap();
    for row in w.data() {
        let first = row[0];
        for z in row {
            assert!((z - first).norm() < 1e-3, "{} vs {}", z, first);
        }
    }
    let frame = w.frame().unwrap();
    assert!(frame.values().iter().all(|q| (q.norm() - 1.0).abs() < 1e-13));
}

#[test]
fn coprecessing_frame_keeps_only_quadrupole_power() {
    let (mut w, frame) = precessing_quadrupole(&grid(501, 0.1));
    w.transform_to_coprecessing_frame(&EngineConfig::default()).unwrap();
    assert_eq!(w.frame_type(), FrameType::Coprecessing);

    for i in 0..w.n_times() {
        assert_abs_diff_eq!(w.mode(2, 2).unwrap()[i].norm(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(w.mode(2, -2).unwrap()[i].norm(), 1.0, epsilon = 1e-3);
        assert!(w.mode(2, 1).unwrap()[i].norm() < 1e-3);
        assert!(w.mode(2, 0).unwrap()[i].norm() < 1e-3);
    }

    // the co-precessing frame carries ẑ onto the radiation axis R ẑ R̄
    let series = w.frame().unwrap();
    for (q, r) in series.values().iter().zip(&frame).step_by(50) {
        let axis = r.rotate(Vector3::z_axis());
        assert!(q.rotate(Vector3::z_axis()).max_difference(&axis) < 1e-3);
    }
}

#[test]
fn coprecessing_frame_of_non_precessing_signal_is_identity() {
    let times = grid(300, 0.2);
    let modes = ModeSet::new(vec![(2, -2), (2, -1), (2, 0), (2, 1), (2, 2)]).unwrap();
    let data = modes
        .iter()
        .map(|(_, m)| {
            let amp = if m.abs() == 2 { 1.0 } else { 0.0 };
            times.iter().map(|&t| Complex64::from_polar(amp, -0.1 * m as f64 * t)).collect()
        })
        .collect();
    let original = Waveform::new(times, modes, data, WaveformMetadata::default()).unwrap();
    let mut w = original.clone();
    w.transform_to_coprecessing_frame(&EngineConfig::default()).unwrap();
    assert!(max_mode_difference(&w, &original) < 1e-10);
}

/// Precessing quadrupole with every mode zeroed over `gap`.
fn quadrupole_with_gap(times: &[f64], gap: std::ops::Range<usize>) -> Waveform {
    let (w, _) = precessing_quadrupole(times);
    let mut data = w.data().to_vec();
    for row in data.iter_mut() {
        for z in row[gap.clone()].iter_mut() {
            *z = Complex64::new(0.0, 0.0);
        }
    }
    Waveform::new(times.to_vec(), w.modes().clone(), data, WaveformMetadata::new("gap", 2)).unwrap()
}

#[test]
fn zeroed_samples_still_give_a_unit_frame() {
    let gapped = quadrupole_with_gap(&grid(301, 0.1), 140..145);
    let config = EngineConfig::default();
    assert_eq!(gapped.angular_velocity(&config).unwrap().n_degenerate(), 5);

    for corotating in [true, false] {
        let mut w = gapped.clone();
        if corotating {
            w.transform_to_corotating_frame(&config).unwrap();
        } else {
            w.transform_to_coprecessing_frame(&config).unwrap();
        }
        let frame = w.frame().unwrap();
        assert_eq!(frame.len(), 301);
        for q in frame.values() {
            assert!(q.is_finite() && q.is_unit(1e-12), "{:?}", q);
        }
        assert!(w.data().iter().flatten().all(|z| z.is_finite()));
        let last = w.history().last().unwrap();
        assert!(last.ends_with("degenerate=5)"), "{}", last);
    }
}

fn chirp(t: f64) -> Vec<Complex64> {
    let amp = 1.0 + 0.02 * t;
    let phi = 0.3 * t + 0.002 * t * t;
    vec![
        Complex64::from_polar(0.8 * amp, phi),
        Complex64::new(0.0, 0.25 * amp) * Complex64::from_polar(1.0, 0.5 * phi),
        Complex64::new(0.2 * amp, 0.0),
        Complex64::from_polar(0.3 * amp, -0.5 * phi),
        Complex64::from_polar(amp, -phi),
    ]
}

fn chirp_waveform(times: &[f64], delay: f64) -> Waveform {
    let modes = ModeSet::full(2, 2).unwrap();
    let mut data = vec![Vec::with_capacity(times.len()); modes.len()];
    for &t in times {
        for (row, z) in data.iter_mut().zip(chirp(t - delay)) {
            row.push(z);
        }
    }
    Waveform::new(times.to_vec(), modes, data, WaveformMetadata::new("chirp", 2)).unwrap()
}

#[test]
fn alignment_recovers_rotation_and_offset() {
    let times = grid(401, 0.1);
    let reference = chirp_waveform(&times, 0.0);
    let theta = Vector3::new(0.05, -0.03, 0.1);
    let q = Quaternion::from_rotation_vector(theta);
    let mut this = chirp_waveform(&times, 0.3);
    this.rotate_decomposition_basis_by(q.conjugate()).unwrap();

    let a = align(&this, &reference, 5.0, 35.0, &EngineConfig::default()).unwrap();
    assert_abs_diff_eq!(a.time_offset, 0.3, epsilon = 1e-5);
    assert!(a.rotation.max_difference(&q) < 1e-5, "{}", a.rotation);
    assert!(a.residual < 1e-4);

    this.apply_alignment(&a).unwrap();
    assert_abs_diff_eq!(this.t_min(), -0.3, epsilon = 1e-5);
    let at_ten = this.interpolate_modes(10.0).unwrap();
    for (got, want) in at_ten.iter().zip(reference.interpolate_modes(10.0).unwrap()) {
        assert!((got - want).norm() < 1e-4);
    }
}

#[test]
fn identical_copy_aligns_to_identity() {
    let reference = chirp_waveform(&grid(201, 0.1), 0.0);
    let a = reference
        .align_to(&reference.clone(), 2.0, 18.0, &EngineConfig::default())
        .unwrap();
    assert_eq!(a.rotation, Quaternion::identity());
    assert_eq!(a.time_offset, 0.0);
    assert!(a.residual < 1e-14);
}

#[test]
fn alignment_over_the_whole_domain_fits_rotation_only() {
    let times = grid(201, 0.1);
    let reference = chirp_waveform(&times, 0.0);
    let q = Quaternion::from_rotation_vector(Vector3::new(-0.04, 0.02, 0.07));
    let mut this = reference.clone();
    this.rotate_decomposition_basis_by(q.conjugate()).unwrap();

    // any shift leaves the domain, so the offset stays at zero
    let a = align(&this, &reference, this.t_min(), this.t_max(), &EngineConfig::default()).unwrap();
    assert_eq!(a.time_offset, 0.0);
    assert!(a.rotation.max_difference(&q) < 1e-6, "{}", a.rotation);
    assert!(a.residual < 1e-6);
}

#[test]
fn queries_at_bounds_succeed_and_outside_fail() {
    let w = chirp_waveform(&grid(50, 0.5), 0.0);
    assert!(w.interpolate_modes(w.t_min()).is_ok());
    assert!(w.interpolate_modes(w.t_max()).is_ok());
    assert!(matches!(
        w.interpolate_modes(w.t_min() - 1e-12),
        Err(FrameError::OutOfRange { .. })
    ));
    assert!(matches!(
        w.frame_at(w.t_max() + 1e-12),
        Err(FrameError::OutOfRange { .. })
    ));
}

#[test]
fn tuples_in_text_out() {
    let times = grid(4, 0.25);
    let mut records = Vec::new();
    for &t in times.iter().rev() {
        for (k, z) in chirp(t).into_iter().enumerate() {
            records.push((t, 2, k as i32 - 2, z));
        }
    }
    let w = Waveform::from_tuples(&records, WaveformMetadata::new("records", 2)).unwrap();
    assert_eq!(w.times(), times.as_slice());
    assert_eq!(w.column(2), chirp(0.5));

    let mut sink = TextSink::new(Vec::new());
    w.export(&mut sink).unwrap();
    let text = String::from_utf8(sink.into_inner()).unwrap();
    let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.split_whitespace().count() == 1 + 2 * 5));
}

#[cfg(feature = "serde")]
#[test]
fn waveform_serde_round_trip() {
    let (mut w, _) = precessing_quadrupole(&grid(40, 0.5));
    w.transform_to_corotating_frame(&EngineConfig::default()).unwrap();
    let json = serde_json::to_string(&w).unwrap();
    let back: Waveform = serde_json::from_str(&json).unwrap();
    assert_eq!(back.frame_type(), FrameType::Corotating);
    assert_eq!(back.modes(), w.modes());
    assert!(max_mode_difference(&back, &w) < 1e-15);
}
