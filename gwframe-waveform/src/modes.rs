//! The set of `(ℓ, m)` modes carried by a waveform.

use gwframe_core::constants::ELL_MIN;
use gwframe_core::{FrameError, FrameResult};
use std::fmt;

/// Ordered list of distinct `(ℓ, m)` indices with `ℓ ≥ 2` and `|m| ≤ ℓ`.
///
/// The order is the storage order of the waveform's mode table and never
/// changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeSet {
    modes: Vec<(i32, i32)>,
}

impl ModeSet {
    pub fn new(modes: Vec<(i32, i32)>) -> FrameResult<Self> {
        if modes.is_empty() {
            return Err(FrameError::invalid_input("ModeSet::new", "no modes given"));
        }
        for (i, &(ell, m)) in modes.iter().enumerate() {
            if ell < ELL_MIN || m.abs() > ell {
                return Err(FrameError::invalid_input(
                    "ModeSet::new",
                    format!("invalid mode (ℓ={}, m={})", ell, m),
                ));
            }
            if modes[..i].contains(&(ell, m)) {
                return Err(FrameError::invalid_input(
                    "ModeSet::new",
                    format!("duplicate mode (ℓ={}, m={})", ell, m),
                ));
            }
        }
        Ok(Self { modes })
    }

    /// Every mode with `ell_min ≤ ℓ ≤ ell_max`, sorted by `ℓ` then `m`.
    ///
    /// ```
    /// use gwframe_waveform::ModeSet;
    ///
    /// let set = ModeSet::full(2, 4).unwrap();
    /// assert_eq!(set.len(), 5 + 7 + 9);
    /// assert_eq!(set.index_of(3, -1), Some(ModeSet::full_index(3, -1)));
    /// ```
    pub fn full(ell_min: i32, ell_max: i32) -> FrameResult<Self> {
        if ell_min < ELL_MIN || ell_max < ell_min {
            return Err(FrameError::invalid_input(
                "ModeSet::full",
                format!("invalid ℓ range [{}, {}]", ell_min, ell_max),
            ));
        }
        let modes = (ell_min..=ell_max)
            .flat_map(|ell| (-ell..=ell).map(move |m| (ell, m)))
            .collect();
        Ok(Self { modes })
    }

    /// Position of `(ℓ, m)` in a full set starting at `ℓ = 2`: `ℓ² + ℓ + m − 4`.
    #[inline]
    pub fn full_index(ell: i32, m: i32) -> usize {
        (ell * ell + ell + m - 4) as usize
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.modes.iter().copied()
    }

    pub fn as_slice(&self) -> &[(i32, i32)] {
        &self.modes
    }

    pub fn get(&self, index: usize) -> Option<(i32, i32)> {
        self.modes.get(index).copied()
    }

    pub fn index_of(&self, ell: i32, m: i32) -> Option<usize> {
        self.modes.iter().position(|&mode| mode == (ell, m))
    }

    pub fn contains(&self, ell: i32, m: i32) -> bool {
        self.index_of(ell, m).is_some()
    }

    pub fn ell_min(&self) -> i32 {
        self.modes.iter().map(|&(ell, _)| ell).min().unwrap_or(ELL_MIN)
    }

    pub fn ell_max(&self) -> i32 {
        self.modes.iter().map(|&(ell, _)| ell).max().unwrap_or(ELL_MIN)
    }

    /// Distinct `ℓ` values in ascending order.
    pub fn ells(&self) -> Vec<i32> {
        let mut ells: Vec<i32> = self.modes.iter().map(|&(ell, _)| ell).collect();
        ells.sort_unstable();
        ells.dedup();
        ells
    }

    /// Storage indices of the `ℓ` block ordered `m = -ℓ..=ℓ`, or `None` if any
    /// `m` of the block is missing.
    pub fn block_indices(&self, ell: i32) -> Option<Vec<usize>> {
        (-ell..=ell).map(|m| self.index_of(ell, m)).collect()
    }

    /// Fails with [`FrameError::InvalidInput`] unless every `ℓ` present has all
    /// `2ℓ + 1` values of `m`. Rotations mix the `m` of a block, so they require it.
    pub fn require_complete_blocks(&self, context: &str) -> FrameResult<()> {
        for ell in self.ells() {
            if self.block_indices(ell).is_none() {
                return Err(FrameError::invalid_input(
                    context,
                    format!("ℓ = {} block is incomplete", ell),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModeSet[")?;
        for (i, (ell, m)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}, {})", ell, m)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_index_matches_full_order() {
        let set = ModeSet::full(2, 6).unwrap();
        for (i, (ell, m)) in set.iter().enumerate() {
            assert_eq!(ModeSet::full_index(ell, m), i);
        }
    }

    #[test]
    fn test_rejects_invalid_modes() {
        assert!(ModeSet::new(vec![(1, 0)]).is_err());
        assert!(ModeSet::new(vec![(2, 3)]).is_err());
        assert!(ModeSet::new(vec![(2, 2), (2, 2)]).is_err());
        assert!(ModeSet::new(vec![]).is_err());
    }

    #[test]
    fn test_block_indices_and_completeness() {
        let set = ModeSet::new(vec![(2, 2), (2, -2), (3, 0)]).unwrap();
        assert!(set.block_indices(2).is_none());
        assert!(set.require_complete_blocks("test").is_err());
        assert_eq!(set.ells(), vec![2, 3]);

        let full = ModeSet::full(2, 3).unwrap();
        assert_eq!(full.block_indices(3).unwrap(), (5..12).collect::<Vec<_>>());
        assert!(full.require_complete_blocks("test").is_ok());
    }

    #[test]
    fn test_display() {
        let set = ModeSet::new(vec![(2, 2), (2, -2)]).unwrap();
        assert_eq!(set.to_string(), "ModeSet[(2, 2), (2, -2)]");
    }
}
