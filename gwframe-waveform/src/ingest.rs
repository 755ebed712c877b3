//! Construction of a [`Waveform`] from flat `(t, ℓ, m, value)` records.

use crate::{ModeSet, Waveform, WaveformMetadata};
use gwframe_core::{FrameError, FrameResult};
use num_complex::Complex64;

/// One sample of one mode: `(t, ℓ, m, h_ℓm(t))`.
pub type ModeTuple = (f64, i32, i32, Complex64);

impl Waveform {
    /// Builds an inertial waveform from records in any order.
    ///
    /// The grid is the sorted set of distinct times and the mode set is the sorted
    /// set of distinct `(ℓ, m)`. Every `(t, ℓ, m)` combination must appear exactly
    /// once.
    ///
    /// ```
    /// use gwframe_waveform::{Waveform, WaveformMetadata};
    /// use num_complex::Complex64;
    ///
    /// let one = Complex64::new(1.0, 0.0);
    /// let records = [(1.0, 2, 2, one), (0.0, 2, 2, one)];
    /// let w = Waveform::from_tuples(&records, WaveformMetadata::default()).unwrap();
    /// assert_eq!(w.times(), &[0.0, 1.0]);
    /// ```
    ///
    /// # Errors
    ///
    /// [`FrameError::InvalidInput`] for no records, a non-finite time, a missing
    /// or duplicated combination, or anything [`Waveform::new`] rejects.
    pub fn from_tuples(records: &[ModeTuple], metadata: WaveformMetadata) -> FrameResult<Self> {
        const CONTEXT: &str = "Waveform::from_tuples";
        if records.is_empty() {
            return Err(FrameError::invalid_input(CONTEXT, "no records"));
        }
        if let Some(&(t, ell, m, _)) = records.iter().find(|r| !r.0.is_finite()) {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!("non-finite time {} for mode ({}, {})", t, ell, m),
            ));
        }

        let mut times: Vec<f64> = records.iter().map(|r| r.0).collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        let mut pairs: Vec<(i32, i32)> = records.iter().map(|r| (r.1, r.2)).collect();
        pairs.sort_unstable();
        pairs.dedup();
        let modes = ModeSet::new(pairs)?;

        let expected = times.len() * modes.len();
        if records.len() != expected {
            return Err(FrameError::invalid_input(
                CONTEXT,
                format!(
                    "{} records for {} times x {} modes",
                    records.len(),
                    times.len(),
                    modes.len()
                ),
            ));
        }

        let mut data: Vec<Vec<Option<Complex64>>> = vec![vec![None; times.len()]; modes.len()];
        for &(t, ell, m, value) in records {
            let i = times.partition_point(|&x| x < t);
            let k = modes.index_of(ell, m).unwrap_or_default();
            if data[k][i].replace(value).is_some() {
                return Err(FrameError::invalid_input(
                    CONTEXT,
                    format!("duplicate record at t = {} for mode ({}, {})", t, ell, m),
                ));
            }
        }
        // counts match and nothing repeated, so every slot is filled
        let data = data
            .into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect();

        Waveform::new(times, modes, data, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_groups_unordered_records() {
        let records = [
            (1.0, 2, 2, c(3.0)),
            (0.0, 2, -2, c(2.0)),
            (0.0, 2, 2, c(1.0)),
            (1.0, 2, -2, c(4.0)),
        ];
        let w = Waveform::from_tuples(&records, WaveformMetadata::new("unit", 2)).unwrap();
        assert_eq!(w.times(), &[0.0, 1.0]);
        assert_eq!(w.modes().as_slice(), &[(2, -2), (2, 2)]);
        assert_eq!(w.mode(2, 2).unwrap(), &[c(1.0), c(3.0)]);
        assert_eq!(w.mode(2, -2).unwrap(), &[c(2.0), c(4.0)]);
    }

    #[test]
    fn test_rejects_missing_and_duplicate() {
        let missing = [(0.0, 2, 2, c(1.0)), (1.0, 2, 2, c(1.0)), (0.0, 2, 1, c(1.0))];
        assert!(Waveform::from_tuples(&missing, WaveformMetadata::default()).is_err());

        let duplicate = [
            (0.0, 2, 2, c(1.0)),
            (0.0, 2, 2, c(1.0)),
            (1.0, 2, 1, c(1.0)),
            (0.0, 2, 1, c(1.0)),
        ];
        assert!(matches!(
            Waveform::from_tuples(&duplicate, WaveformMetadata::default()),
            Err(FrameError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rejects_nan_time() {
        let records = [(f64::NAN, 2, 2, c(1.0))];
        assert!(Waveform::from_tuples(&records, WaveformMetadata::default()).is_err());
    }
}
