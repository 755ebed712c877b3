//! The [`Waveform`] container and its basis rotation.
//!
//! A waveform is a strictly increasing time grid, a [`ModeSet`], a complex mode
//! table indexed `[mode][time]`, and an optional frame series recording the
//! rotation applied to the decomposition basis. An absent frame means the
//! modes are given in the inertial frame.
//!
//! Every mutating operation builds the complete replacement table and frame
//! first and only then swaps them in, so a failed call leaves the waveform
//! exactly as it was.

use crate::ModeSet;
use gwframe_core::constants::QUATERNION_TOLERANCE;
use gwframe_core::numerics::ComplexSpline;
use gwframe_core::utils::{bracket, check_strictly_increasing};
use gwframe_core::{FrameError, FrameResult, Quaternion, QuaternionSeries, WignerD};
use num_complex::Complex64;
use std::fmt;
use tracing::debug;

/// How [`Waveform::rotate_basis`] labels the result of a rotation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FrameTarget {
    /// [`FrameType::Rotated`], or inertial if the composed frame is the identity
    /// within the tolerance.
    Detect(f64),
    /// Always the given frame type. `Inertial` drops the stored frame.
    Fixed(FrameType),
}

/// Frame in which the modes of a [`Waveform`] are decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameType {
    Inertial,
    Corotating,
    Coprecessing,
    /// Frame co-moving with a PN binary's orbit.
    Coorbital,
    /// Any other rotated frame.
    Rotated,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inertial => "inertial",
            Self::Corotating => "corotating",
            Self::Coprecessing => "coprecessing",
            Self::Coorbital => "coorbital",
            Self::Rotated => "rotated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveformMetadata {
    /// Free-form identifier of where the data came from.
    pub source: String,
    /// Largest `ℓ` the waveform may carry.
    pub ell_max: i32,
}

impl WaveformMetadata {
    pub fn new(source: impl Into<String>, ell_max: i32) -> Self {
        Self {
            source: source.into(),
            ell_max,
        }
    }
}

impl Default for WaveformMetadata {
    fn default() -> Self {
        Self::new("", 8)
    }
}

/// Spin-weight −2 mode data on a time grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Waveform {
    times: Vec<f64>,
    modes: ModeSet,
    data: Vec<Vec<Complex64>>,
    frame: Option<QuaternionSeries>,
    frame_type: FrameType,
    metadata: WaveformMetadata,
    history: Vec<String>,
    truncated: bool,
}

impl Waveform {
    /// Builds an inertial-frame waveform from a grid, a mode set and the table
    /// `data[mode][time]`.
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] if the grid is empty or not strictly
    /// increasing, if the table shape does not match, if a value is not finite, or
    /// if a mode exceeds `metadata.ell_max`.
    pub fn new(
        times: Vec<f64>,
        modes: ModeSet,
        data: Vec<Vec<Complex64>>,
        metadata: WaveformMetadata,
    ) -> FrameResult<Self> {
        const CONTEXT: &str = "Waveform::new";
        if times.is_empty() {
            return Err(FrameError::invalid_input(CONTEXT, "empty time grid"));
        }
        check_strictly_increasing(CONTEXT, &times)?;
        if data.len() != modes.len() {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!("{} modes but {} data rows", modes.len(), data.len()),
            ));
        }
        for (row, (ell, m)) in data.iter().zip(modes.iter()) {
            if row.len() != times.len() {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!(
                        "mode ({}, {}) has {} samples, grid has {}",
                        ell,
                        m,
                        row.len(),
                        times.len()
                    ),
                ));
            }
            if row.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!("mode ({}, {}) contains non-finite values", ell, m),
                ));
            }
        }
        if modes.ell_max() > metadata.ell_max {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!(
                    "mode ℓ = {} exceeds ell_max = {}",
                    modes.ell_max(),
                    metadata.ell_max
                ),
            ));
        }

        let history = vec![format!(
            "Waveform::new(n_times={}, modes={}, source={:?})",
            times.len(),
            modes.len(),
            metadata.source
        )];
        Ok(Self {
            times,
            modes,
            data,
            frame: None,
            frame_type: FrameType::Inertial,
            metadata,
            history,
            truncated: false,
        })
    }

    /// Attaches a frame series and declares the frame the modes are given in.
    ///
    /// Used when the modes were produced directly in a rotating frame, such as the
    /// co-orbital output of the PN model.
    pub fn with_frame(mut self, frame: QuaternionSeries, frame_type: FrameType) -> FrameResult<Self> {
        if frame.len() != self.times.len() {
            return Err(FrameError::invalid_input(
                "Waveform::with_frame",
                format!(
                    "frame has {} samples, grid has {}",
                    frame.len(),
                    self.times.len()
                ),
            ));
        }
        self.history
            .push(format!("Waveform::with_frame(frame_type={})", frame_type));
        self.frame = Some(frame);
        self.frame_type = frame_type;
        Ok(self)
    }

    /// Marks the waveform as the partial output of an interrupted computation.
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    /// The mode table, `data()[mode][time]`.
    pub fn data(&self) -> &[Vec<Complex64>] {
        &self.data
    }

    /// Time series of the `(ℓ, m)` mode, if present.
    pub fn mode(&self, ell: i32, m: i32) -> Option<&[Complex64]> {
        self.modes.index_of(ell, m).map(|i| self.data[i].as_slice())
    }

    pub fn frame(&self) -> Option<&QuaternionSeries> {
        self.frame.as_ref()
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn metadata(&self) -> &WaveformMetadata {
        &self.metadata
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_modes(&self) -> usize {
        self.modes.len()
    }

    pub fn t_min(&self) -> f64 {
        self.times[0]
    }

    pub fn t_max(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// `Σ |h_ℓm|²` over all modes at time index `i`.
    pub fn norm_squared_at(&self, i: usize) -> f64 {
        self.data.iter().map(|row| row[i].norm_sqr()).sum()
    }

    /// Root-sum-square mode amplitude at every sample.
    pub fn norms(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| libm::sqrt(self.norm_squared_at(i)))
            .collect()
    }

    /// Mode values at sample `i`, in mode-set order.
    pub fn column(&self, i: usize) -> Vec<Complex64> {
        self.data.iter().map(|row| row[i]).collect()
    }

    /// Splines of every mode, for repeated evaluation off the grid.
    pub fn interpolator(&self) -> FrameResult<ModeInterpolator> {
        let splines = self
            .data
            .iter()
            .map(|row| ComplexSpline::new(&self.times, row))
            .collect::<FrameResult<Vec<_>>>()?;
        Ok(ModeInterpolator { splines })
    }

    /// All modes at time `t`, in mode-set order.
    ///
    /// Exact at grid times (including both endpoints); fails with
    /// [`FrameError::OutOfRange`] outside `[t_min, t_max]`.
    pub fn interpolate_modes(&self, t: f64) -> FrameResult<Vec<Complex64>> {
        let (before, after) = bracket("Waveform::interpolate_modes", &self.times, t)?;
        if self.times[before] == t {
            return Ok(self.column(before));
        }
        if self.times[after] == t {
            return Ok(self.column(after));
        }
        self.interpolator()?.eval(t)
    }

    /// Frame rotor at time `t`; the identity when the waveform is inertial.
    pub fn frame_at(&self, t: f64) -> FrameResult<Quaternion> {
        match &self.frame {
            Some(frame) => frame.interpolate(t),
            None => {
                bracket("Waveform::frame_at", &self.times, t)?;
                Ok(Quaternion::identity())
            }
        }
    }

    /// Rotates the decomposition basis by the time-dependent rotor `rotors`.
    ///
    /// Each `ℓ` block becomes `f'_{m'} = Σ_m f_m D^ℓ_{m m'}(R)` and the frame is
    /// composed as `frame ← frame · R`. If the composed frame is the identity at
    /// every sample the waveform is marked inertial again; otherwise it is marked
    /// [`FrameType::Rotated`].
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] if the rotor series does not have one sample
    /// per grid time or if an `ℓ` block is incomplete. The waveform is unchanged
    /// on error.
    pub fn rotate_decomposition_basis(&mut self, rotors: &QuaternionSeries) -> FrameResult<()> {
        let frame_type = self.rotate_basis(rotors, FrameTarget::Detect(QUATERNION_TOLERANCE))?;
        self.history.push(format!(
            "rotate_decomposition_basis(n={}) -> {}",
            rotors.len(),
            frame_type
        ));
        Ok(())
    }

    /// Rotates by the same rotor at every sample.
    pub fn rotate_decomposition_basis_by(&mut self, rotor: Quaternion) -> FrameResult<()> {
        let rotors = QuaternionSeries::constant(self.times.clone(), rotor)?;
        let frame_type = self.rotate_basis(&rotors, FrameTarget::Detect(QUATERNION_TOLERANCE))?;
        self.history.push(format!(
            "rotate_decomposition_basis_by({}) -> {}",
            rotor, frame_type
        ));
        Ok(())
    }

    /// Shared rotation kernel. Returns the frame type that was assigned.
    pub(crate) fn rotate_basis(
        &mut self,
        rotors: &QuaternionSeries,
        target: FrameTarget,
    ) -> FrameResult<FrameType> {
        if rotors.len() != self.times.len() {
            return Err(FrameError::invalid_input(
                "Waveform::rotate_decomposition_basis",
                format!(
                    "rotor series has {} samples, waveform has {}",
                    rotors.len(),
                    self.times.len()
                ),
            ));
        }
        let new_data = rotate_table(&self.modes, &self.data, rotors.values())?;

        let new_frame: Vec<Quaternion> = match &self.frame {
            Some(frame) => frame
                .values()
                .iter()
                .zip(rotors.values())
                .map(|(f, r)| *f * *r)
                .collect(),
            None => rotors.values().to_vec(),
        };
        let frame_type = match target {
            FrameTarget::Fixed(frame_type) => frame_type,
            FrameTarget::Detect(tolerance) => {
                let is_identity = new_frame
                    .iter()
                    .all(|q| q.rotor_distance(&Quaternion::identity()) <= tolerance);
                if is_identity {
                    FrameType::Inertial
                } else {
                    FrameType::Rotated
                }
            }
        };
        let frame = if frame_type == FrameType::Inertial {
            None
        } else {
            let mut series = QuaternionSeries::new(self.times.clone(), new_frame)?;
            series.make_continuous();
            Some(series)
        };

        self.data = new_data;
        self.frame = frame;
        self.frame_type = frame_type;
        debug!(
            n_times = self.times.len(),
            frame_type = %frame_type,
            "rotated decomposition basis"
        );
        Ok(frame_type)
    }

    /// Adds `dt` to every grid time, including the frame series.
    pub(crate) fn shift_times(&mut self, dt: f64) -> FrameResult<()> {
        let times: Vec<f64> = self.times.iter().map(|t| t + dt).collect();
        check_strictly_increasing("Waveform::shift_times", &times)?;
        let frame = match &self.frame {
            Some(frame) => Some(QuaternionSeries::new(times.clone(), frame.values().to_vec())?),
            None => None,
        };
        self.times = times;
        self.frame = frame;
        Ok(())
    }

    pub(crate) fn push_history(&mut self, entry: String) {
        self.history.push(entry);
    }
}

/// Applies `f'_{m'} = Σ_m f_m D^ℓ_{m m'}(R_i)` to every sample of the table.
pub(crate) fn rotate_table(
    modes: &ModeSet,
    data: &[Vec<Complex64>],
    rotors: &[Quaternion],
) -> FrameResult<Vec<Vec<Complex64>>> {
    modes.require_complete_blocks("Waveform::rotate_decomposition_basis")?;
    let blocks: Vec<(i32, Vec<usize>)> = modes
        .ells()
        .into_iter()
        .filter_map(|ell| modes.block_indices(ell).map(|idx| (ell, idx)))
        .collect();

    let mut out = data.to_vec();
    for (i, rotor) in rotors.iter().enumerate() {
        let d = WignerD::new(rotor);
        for (ell, idx) in &blocks {
            let ell = *ell;
            let block = d.matrix(ell);
            let dim = idx.len();
            for (col, &target) in idx.iter().enumerate() {
                let mut sum = Complex64::new(0.0, 0.0);
                for (row, &source) in idx.iter().enumerate() {
                    sum += data[source][i] * block[row * dim + col];
                }
                out[target][i] = sum;
            }
        }
    }
    Ok(out)
}

/// Cached splines of every mode of a waveform.
#[derive(Debug, Clone)]
pub struct ModeInterpolator {
    splines: Vec<ComplexSpline>,
}

impl ModeInterpolator {
    /// All modes at `t`, in mode-set order.
    pub fn eval(&self, t: f64) -> FrameResult<Vec<Complex64>> {
        self.splines.iter().map(|s| s.eval(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwframe_core::Vector3;

    fn two_mode_waveform() -> Waveform {
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let modes = ModeSet::full(2, 2).unwrap();
        let data = modes
            .iter()
            .map(|(_, m)| {
                times
                    .iter()
                    .map(|&t| Complex64::from_polar(1.0 + 0.1 * m as f64, -(m as f64) * t))
                    .collect()
            })
            .collect();
        Waveform::new(times, modes, data, WaveformMetadata::new("test", 2)).unwrap()
    }

    #[test]
    fn test_shift_times_moves_frame_with_grid() {
        let w = two_mode_waveform();
        let values: Vec<Quaternion> = w
            .times()
            .iter()
            .map(|&t| Quaternion::from_rotation_vector(Vector3::z_axis() * (0.3 * t)))
            .collect();
        let frame = QuaternionSeries::new(w.times().to_vec(), values.clone()).unwrap();
        let mut w = w.with_frame(frame, FrameType::Coprecessing).unwrap();

        w.shift_times(2.5).unwrap();
        assert_eq!(w.times()[0], 2.5);
        let shifted = w.frame().unwrap();
        assert_eq!(shifted.times(), w.times());
        assert_eq!(shifted.values(), &values[..]);

        // every shifted time rounds to the same value, so the grid collapses
        let before = w.clone();
        assert!(w.shift_times(1e20).is_err());
        assert_eq!(w.times(), before.times());
        assert_eq!(w.frame().unwrap().times(), before.times());
        assert_eq!(w.frame().unwrap().values(), &values[..]);
    }

    #[test]
    fn test_new_validates_shape() {
        let modes = ModeSet::full(2, 2).unwrap();
        let err = Waveform::new(
            vec![0.0, 1.0],
            modes.clone(),
            vec![vec![Complex64::new(0.0, 0.0); 2]; 4],
            WaveformMetadata::default(),
        );
        assert!(matches!(err, Err(FrameError::InvalidInput { .. })));

        let err = Waveform::new(
            vec![0.0, 0.0],
            modes.clone(),
            vec![vec![Complex64::new(0.0, 0.0); 2]; 5],
            WaveformMetadata::default(),
        );
        assert!(err.is_err());

        let err = Waveform::new(
            vec![0.0, 1.0],
            modes,
            vec![vec![Complex64::new(0.0, 0.0); 2]; 5],
            WaveformMetadata::new("x", 1),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_interpolate_exact_and_out_of_range() {
        let w = two_mode_waveform();
        assert_eq!(w.interpolate_modes(w.t_min()).unwrap(), w.column(0));
        assert_eq!(w.interpolate_modes(w.t_max()).unwrap(), w.column(w.n_times() - 1));
        assert_eq!(w.interpolate_modes(w.times()[17]).unwrap(), w.column(17));
        assert!(matches!(
            w.interpolate_modes(w.t_max() + 1e-9),
            Err(FrameError::OutOfRange { .. })
        ));
        assert!(matches!(
            w.frame_at(w.t_min() - 1e-9),
            Err(FrameError::OutOfRange { .. })
        ));
        assert_eq!(w.frame_at(w.t_max()).unwrap(), Quaternion::identity());
    }

    #[test]
    fn test_rotation_length_mismatch_leaves_waveform_unchanged() {
        let mut w = two_mode_waveform();
        let before = w.clone();
        let rotors = QuaternionSeries::constant(vec![0.0, 1.0], Quaternion::identity()).unwrap();
        assert!(matches!(
            w.rotate_decomposition_basis(&rotors),
            Err(FrameError::InvalidInput { .. })
        ));
        assert_eq!(w, before);
    }

    #[test]
    fn test_z_rotation_multiplies_phases() {
        let mut w = two_mode_waveform();
        let alpha = 0.4;
        let before = w.clone();
        w.rotate_decomposition_basis_by(Quaternion::from_rotation_vector(Vector3::new(0.0, 0.0, alpha)))
            .unwrap();
        assert_eq!(w.frame_type(), FrameType::Rotated);
        for (k, (_, m)) in w.modes().iter().enumerate() {
            let phase = Complex64::from_polar(1.0, m as f64 * alpha);
            for i in 0..w.n_times() {
                assert!((w.data()[k][i] - before.data()[k][i] * phase).norm() < 1e-13);
            }
        }
    }

    #[test]
    fn test_rotation_back_to_identity_is_inertial() {
        let mut w = two_mode_waveform();
        let before = w.clone();
        let q = Quaternion::from_rotation_vector(Vector3::new(0.3, -0.2, 1.0));
        w.rotate_decomposition_basis_by(q).unwrap();
        w.rotate_decomposition_basis_by(q.conjugate()).unwrap();
        assert_eq!(w.frame_type(), FrameType::Inertial);
        assert!(w.frame().is_none());
        for k in 0..w.n_modes() {
            for i in 0..w.n_times() {
                assert!((w.data()[k][i] - before.data()[k][i]).norm() < 1e-13);
            }
        }
        assert_eq!(w.history().len(), 3);
    }

    #[test]
    fn test_rotation_preserves_norm() {
        let mut w = two_mode_waveform();
        let before = w.norms();
        w.rotate_decomposition_basis_by(Quaternion::from_rotation_vector(Vector3::new(1.0, 0.5, 0.0)))
            .unwrap();
        for (a, b) in w.norms().iter().zip(before.iter()) {
            assert!((a - b).abs() < 1e-13);
        }
    }
}
