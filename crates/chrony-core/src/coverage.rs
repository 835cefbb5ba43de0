//! Presence bitmaps over sample positions.
//!
//! A regularly sampled series maps naturally onto the `u32` positions
//! `0..len`. [`Coverage`] records which positions hold a present value using a
//! `roaring::RoaringBitmap`; missing-value runs, coverage ratios and gap
//! lengths then fall out of bitmap algebra against the expected domain.
//!
//! ```
//! use chrony_core::coverage::{Coverage, domain};
//!
//! let values = [Some(1.0), None, None, Some(4.0)];
//! let cov = Coverage::from_values(&values).unwrap();
//! let expected = domain(values.len()).unwrap();
//!
//! assert_eq!(cov.missing_runs(&expected), vec![1..=2]);
//! assert!((cov.coverage_ratio(&expected) - 0.5).abs() < 1e-12);
//! ```

use std::ops::RangeInclusive;

use roaring::RoaringBitmap;
use snafu::prelude::*;

use crate::error::{ChronyResult, SeriesTooLongSnafu};

/// Position of a sample within a series.
pub type Position = u32;

/// Bitmap of positions `0..len`, the domain a series of `len` samples covers.
pub fn domain(len: usize) -> ChronyResult<RoaringBitmap> {
    let end = Position::try_from(len)
        .ok()
        .context(SeriesTooLongSnafu { len })?;
    Ok((0..end).collect())
}

/// Set of sample positions holding a present value.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    bitmap: RoaringBitmap,
}

impl Coverage {
    /// Coverage with no present position.
    pub fn empty() -> Self {
        Self {
            bitmap: RoaringBitmap::new(),
        }
    }

    /// Wrap an existing bitmap of present positions.
    pub fn from_bitmap(bitmap: RoaringBitmap) -> Self {
        Self { bitmap }
    }

    /// Positions of the `Some` entries of `values`.
    ///
    /// Fails with `SeriesTooLong` if `values` has more positions than `u32`
    /// can address.
    pub fn from_values(values: &[Option<f64>]) -> ChronyResult<Self> {
        ensure!(
            Position::try_from(values.len()).is_ok(),
            SeriesTooLongSnafu { len: values.len() }
        );
        let bitmap = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| i as Position)
            .collect();
        Ok(Self { bitmap })
    }

    /// Bitmap of present positions.
    pub fn present(&self) -> &RoaringBitmap {
        &self.bitmap
    }

    /// Number of present positions.
    pub fn cardinality(&self) -> u64 {
        self.bitmap.len()
    }

    /// First present position.
    pub fn first(&self) -> Option<Position> {
        self.bitmap.min()
    }

    /// Last present position.
    pub fn last(&self) -> Option<Position> {
        self.bitmap.max()
    }

    /// Positions that are expected but not present (`expected - present`).
    pub fn missing_points(&self, expected: &RoaringBitmap) -> RoaringBitmap {
        let mut missing = expected.clone();
        missing -= &self.bitmap;
        missing
    }

    /// Maximal runs of missing positions, in ascending order. Each range is
    /// inclusive.
    pub fn missing_runs(&self, expected: &RoaringBitmap) -> Vec<RangeInclusive<Position>> {
        runs_from_bitmap(&self.missing_points(expected))
    }

    /// Fraction of `expected` that is present, in `[0.0, 1.0]`.
    ///
    /// An empty `expected` domain is fully covered by convention.
    pub fn coverage_ratio(&self, expected: &RoaringBitmap) -> f64 {
        let expected_count = expected.len();
        if expected_count == 0 {
            return 1.0;
        }
        let covered = &self.bitmap & expected;
        covered.len() as f64 / expected_count as f64
    }

    /// Length of the longest missing run, 0 when nothing is missing.
    pub fn max_gap_len(&self, expected: &RoaringBitmap) -> u64 {
        self.missing_runs(expected)
            .into_iter()
            .map(|r| u64::from(r.end() - r.start()) + 1)
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<Position> for Coverage {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        Self {
            bitmap: iter.into_iter().collect(),
        }
    }
}

/// Contiguous runs of set positions.
fn runs_from_bitmap(bitmap: &RoaringBitmap) -> Vec<RangeInclusive<Position>> {
    let mut out = Vec::new();
    let mut iter = bitmap.iter();

    let Some(mut start) = iter.next() else {
        return out;
    };
    let mut prev = start;

    for v in iter {
        if v == prev + 1 {
            prev = v;
        } else {
            out.push(start..=prev);
            start = v;
            prev = v;
        }
    }

    out.push(start..=prev);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_missing_at(len: usize, missing: &[usize]) -> Vec<Option<f64>> {
        (0..len)
            .map(|i| (!missing.contains(&i)).then_some(i as f64))
            .collect()
    }

    #[test]
    fn full_coverage() {
        let values = values_missing_at(10, &[]);
        let cov = Coverage::from_values(&values).unwrap();
        let expected = domain(10).unwrap();

        assert!(cov.missing_points(&expected).is_empty());
        assert!(cov.missing_runs(&expected).is_empty());
        assert!((cov.coverage_ratio(&expected) - 1.0).abs() < 1e-12);
        assert_eq!(cov.max_gap_len(&expected), 0);
        assert_eq!((cov.first(), cov.last()), (Some(0), Some(9)));
    }

    #[test]
    fn runs_group_contiguous_positions() {
        let values = values_missing_at(20, &[3, 4, 10, 11, 12, 18]);
        let cov = Coverage::from_values(&values).unwrap();
        let expected = domain(20).unwrap();

        assert_eq!(
            cov.missing_runs(&expected),
            vec![3..=4, 10..=12, 18..=18]
        );
        assert_eq!(cov.max_gap_len(&expected), 3);
        assert_eq!(cov.cardinality(), 14);
    }

    #[test]
    fn boundary_runs_are_reported() {
        let values = values_missing_at(6, &[0, 1, 5]);
        let cov = Coverage::from_values(&values).unwrap();
        let expected = domain(6).unwrap();
        assert_eq!(cov.missing_runs(&expected), vec![0..=1, 5..=5]);
        assert_eq!((cov.first(), cov.last()), (Some(2), Some(4)));
    }

    #[test]
    fn empty_domain_is_fully_covered() {
        let cov = Coverage::empty();
        let expected = domain(0).unwrap();
        assert!(cov.missing_runs(&expected).is_empty());
        assert_eq!(cov.coverage_ratio(&expected), 1.0);
        assert_eq!(cov.first(), None);
    }

    #[test]
    fn all_missing() {
        let cov = Coverage::from_values(&[None, None, None]).unwrap();
        let expected = domain(3).unwrap();
        assert_eq!(cov.coverage_ratio(&expected), 0.0);
        assert_eq!(cov.missing_runs(&expected), vec![0..=2]);
    }

    #[test]
    fn from_iterator_collects_positions() {
        let cov: Coverage = [1u32, 2, 7].into_iter().collect();
        let expected = domain(8).unwrap();
        assert_eq!(cov.missing_runs(&expected), vec![0..=0, 3..=6]);
        assert_eq!(Coverage::from_bitmap(cov.present().clone()).cardinality(), 3);
    }
}
