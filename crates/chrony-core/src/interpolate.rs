//! Interpolation weighted by a companion series.

use log::debug;
use snafu::prelude::*;

use crate::{
    coverage::{Coverage, domain},
    error::{BadLengthsSnafu, ChronyResult, InvalidWeightSnafu, ZeroWeightSpanSnafu},
    series::Series,
};

/// Fill interior missing values, advancing by accumulated weight.
///
/// For a missing sample `k` between present anchors `a < k < b`, the value is
/// `v[a] + (v[b] - v[a]) * W(a, k) / W(a, b)` where `W(a, k)` is the sum of
/// `weights[a + 1..=k]`. Uniform weights give plain positional
/// interpolation. Present values are never rewritten; leading and trailing
/// missing runs have no anchor pair and stay missing.
///
/// `weights` must be row-aligned with `series` (`BadLengths`), finite and
/// non-negative (`InvalidWeight`), and each interpolated span must carry some
/// weight (`ZeroWeightSpan`).
pub fn weighted_interpolate(series: &Series, weights: &[f64]) -> ChronyResult<Series> {
    ensure!(
        weights.len() == series.len(),
        BadLengthsSnafu {
            left: series.len(),
            right: weights.len(),
        }
    );
    if let Some((row, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return InvalidWeightSnafu { row, weight }.fail();
    }

    let original = series.values();
    let mut values = original.to_vec();
    let coverage = Coverage::from_values(original)?;
    let mut filled = 0;
    for run in coverage.missing_runs(&domain(series.len())?) {
        let (start, end) = (*run.start() as usize, *run.end() as usize);
        let (Some(from), Some(va), Some(vb)) = (
            start.checked_sub(1),
            start.checked_sub(1).and_then(|a| original[a]),
            original.get(end + 1).copied().flatten(),
        ) else {
            continue;
        };
        let to = end + 1;
        let total: f64 = weights[start..=to].iter().sum();
        ensure!(total > 0.0, ZeroWeightSpanSnafu { from, to });

        let mut consumed = 0.0;
        for k in start..=end {
            consumed += weights[k];
            values[k] = Some(va + (vb - va) * consumed / total);
        }
        filled += end - start + 1;
    }
    debug!("interpolated {filled} samples by weight");
    Ok(series.with_values(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChronyError;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn series(values: &[Option<f64>]) -> Series {
        let t0: NaiveDateTime = NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        Series::new(
            (0..values.len())
                .map(|i| t0 + TimeDelta::minutes(i as i64))
                .collect(),
            values.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn uniform_weights_are_positional() {
        let s = series(&[Some(0.0), None, None, Some(6.0)]);
        let out = weighted_interpolate(&s, &[1.0; 4]).unwrap();
        assert_eq!(out.values(), &[Some(0.0), Some(2.0), Some(4.0), Some(6.0)]);
    }

    #[test]
    fn weight_shifts_the_fraction() {
        let s = series(&[Some(0.0), None, None, Some(10.0)]);
        // Weights reaching samples 1, 2, 3: 3, 1, 1.
        let out = weighted_interpolate(&s, &[7.0, 3.0, 1.0, 1.0]).unwrap();
        assert_eq!(out.values(), &[Some(0.0), Some(6.0), Some(8.0), Some(10.0)]);
    }

    #[test]
    fn boundary_runs_stay_missing() {
        let s = series(&[None, Some(1.0), None, Some(3.0), None]);
        let out = weighted_interpolate(&s, &[1.0; 5]).unwrap();
        assert_eq!(out.values(), &[None, Some(1.0), Some(2.0), Some(3.0), None]);
    }

    #[test]
    fn weight_validation() {
        let s = series(&[Some(0.0), None, Some(1.0)]);
        assert!(matches!(
            weighted_interpolate(&s, &[1.0]),
            Err(ChronyError::BadLengths { left: 3, right: 1 })
        ));
        assert!(matches!(
            weighted_interpolate(&s, &[1.0, -1.0, 1.0]),
            Err(ChronyError::InvalidWeight { row: 1, .. })
        ));
        assert!(matches!(
            weighted_interpolate(&s, &[1.0, f64::NAN, 1.0]),
            Err(ChronyError::InvalidWeight { row: 1, .. })
        ));
        assert!(matches!(
            weighted_interpolate(&s, &[1.0, 0.0, 0.0]),
            Err(ChronyError::ZeroWeightSpan { from: 0, to: 2 })
        ));
    }
}
