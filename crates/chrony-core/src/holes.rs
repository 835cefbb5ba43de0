//! Hole detection, cutting and filling for regularly sampled series.
//!
//! A hole is a maximal run of missing samples. Runs are read off a
//! [`Coverage`] bitmap of present positions, so every operation here is a
//! scan over missing runs rather than over individual samples. Durations are
//! counted in samples; the series is assumed to pass
//! [`audit`](crate::series::audit).

use chrono::{NaiveDateTime, TimeDelta};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    coverage::{Coverage, domain},
    error::{
        ChronyResult, EmptySeriesSnafu, InvalidWindowSnafu, MissingDataSnafu, UnfilledHolesSnafu,
    },
    series::{Series, trim},
};

/// A maximal run of missing samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    /// Instant of the first missing sample.
    pub ts_beg: NaiveDateTime,
    /// Instant of the last missing sample.
    pub ts_end: NaiveDateTime,
    /// Position of the present sample before the hole; `None` when the hole
    /// starts the series.
    pub i_beg: Option<usize>,
    /// Position of the present sample after the hole.
    pub i_end: usize,
    /// Number of missing samples.
    pub length: usize,
}

impl Hole {
    /// Position of the first missing sample.
    pub fn first_missing(&self) -> usize {
        self.i_end - self.length
    }
}

/// Holes of `series`, in position order.
///
/// A run reaching the last sample is not reported: it has no following
/// present value, and [`trim`] removes it. A run at the start is reported
/// with `i_beg == None`.
pub fn find_holes(series: &Series) -> ChronyResult<Vec<Hole>> {
    let coverage = Coverage::from_values(series.values())?;
    let expected = domain(series.len())?;
    let ts = series.timestamps();

    let holes: Vec<Hole> = coverage
        .missing_runs(&expected)
        .into_iter()
        .map(|run| (*run.start() as usize, *run.end() as usize))
        .filter(|&(_, end)| end + 1 < series.len())
        .map(|(start, end)| Hole {
            ts_beg: ts[start],
            ts_end: ts[end],
            i_beg: start.checked_sub(1),
            i_end: end + 1,
            length: end - start + 1,
        })
        .collect();
    debug!("found {} holes in {} samples", holes.len(), series.len());
    Ok(holes)
}

/// Split `series` at every hole longer than `min_hole_duration` samples.
///
/// The series is trimmed first. With `h` such holes the result has `h + 1`
/// pieces in position order, each starting and ending with a present value;
/// shorter holes stay inside their piece. An empty series yields no piece.
pub fn cut(series: &Series, min_hole_duration: usize) -> ChronyResult<Vec<Series>> {
    let trimmed = trim(series)?;
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for hole in find_holes(&trimmed)? {
        if hole.length > min_hole_duration {
            pieces.push(trimmed.slice(start..hole.first_missing()));
            start = hole.i_end;
        }
    }
    pieces.push(trimmed.slice(start..trimmed.len()));
    debug!("cut series into {} pieces", pieces.len());
    Ok(pieces)
}

/// Fill every missing run of at most `max_hole_duration` samples.
///
/// Interior runs are interpolated linearly by sample position between the
/// bounding present values. A leading run is back-filled with the first
/// present value, a trailing run forward-filled with the last one. Longer
/// runs are left missing. A series without any present value fails with
/// `MissingData`.
pub fn fill_data(series: &Series, max_hole_duration: usize) -> ChronyResult<Series> {
    if series.is_empty() {
        return Ok(series.clone());
    }
    let coverage = Coverage::from_values(series.values())?;
    ensure!(
        coverage.cardinality() > 0,
        MissingDataSnafu { len: series.len() }
    );

    let original = series.values();
    let mut values = original.to_vec();
    let mut filled = 0;
    for run in coverage.missing_runs(&domain(series.len())?) {
        let (start, end) = (*run.start() as usize, *run.end() as usize);
        if end - start + 1 > max_hole_duration {
            continue;
        }
        let before = start.checked_sub(1).and_then(|i| original[i]);
        let after = original.get(end + 1).copied().flatten();
        for (k, slot) in values.iter_mut().enumerate().take(end + 1).skip(start) {
            *slot = match (before, after) {
                (Some(a), Some(b)) => {
                    Some(a + (b - a) * (k + 1 - start) as f64 / (end + 2 - start) as f64)
                }
                (None, b) => b,
                (a, None) => a,
            };
        }
        filled += 1;
    }
    debug!("filled {filled} holes up to {max_hole_duration} samples");
    Ok(series.with_values(values))
}

/// Fixed-size windows of `size` samples advancing by `size - overlap`.
///
/// Windows start at every multiple of the step while they fit, followed by
/// one window aligned on the last sample, for
/// `2 + (len - size) / (size - overlap)` windows in total. A series shorter
/// than `size` yields none. The series must not contain missing values
/// (`UnfilledHoles`), and `size` must exceed `overlap` (`InvalidWindow`).
pub fn cut_fixed_size(series: &Series, size: usize, overlap: usize) -> ChronyResult<Vec<Series>> {
    let missing = series.missing_count();
    ensure!(missing == 0, UnfilledHolesSnafu { missing });
    ensure!(size > overlap, InvalidWindowSnafu { size, overlap });

    let len = series.len();
    if len < size {
        return Ok(Vec::new());
    }
    let step = size - overlap;
    let mut windows: Vec<Series> = (0..=(len - size) / step)
        .map(|k| series.slice(k * step..k * step + size))
        .collect();
    windows.push(series.slice(len - size..len));
    debug!("cut {len} samples into {} windows", windows.len());
    Ok(windows)
}

/// Summary of a series and its holes, see [`describe_series`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// First sample instant.
    pub beg: NaiveDateTime,
    /// Spacing of the first two samples; `None` for a single sample.
    #[serde(with = "optional_millis")]
    pub time_step: Option<TimeDelta>,
    /// Last sample instant.
    pub end: NaiveDateTime,
    /// Number of samples.
    pub samples: usize,
    /// Number of missing samples.
    pub missing: usize,
    /// Number of holes, as reported by [`find_holes`].
    pub holes: usize,
    /// Fraction of present samples.
    pub coverage: f64,
    /// Hole length distribution; `None` without holes.
    pub hole_sizes: Option<HoleSizeStats>,
}

/// Distribution of hole lengths, in samples. Percentiles interpolate
/// linearly between order statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleSizeStats {
    /// Shortest hole.
    pub min: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
    /// Longest hole.
    pub max: f64,
}

impl HoleSizeStats {
    fn from_lengths(lengths: &[usize]) -> Option<Self> {
        let mut sorted: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
        sorted.sort_by(f64::total_cmp);
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        Some(Self {
            min,
            p25: percentile(&sorted, 0.25),
            median: percentile(&sorted, 0.5),
            p75: percentile(&sorted, 0.75),
            max,
        })
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Describe extent, sampling and holes of `series`.
pub fn describe_series(series: &Series) -> ChronyResult<SeriesSummary> {
    let ts = series.timestamps();
    let (Some(&beg), Some(&end)) = (ts.first(), ts.last()) else {
        return EmptySeriesSnafu {
            operation: "describe",
        }
        .fail();
    };
    let holes = find_holes(series)?;
    let lengths: Vec<usize> = holes.iter().map(|h| h.length).collect();
    let coverage = Coverage::from_values(series.values())?.coverage_ratio(&domain(series.len())?);

    Ok(SeriesSummary {
        beg,
        time_step: ts.get(1).map(|&second| second - beg),
        end,
        samples: series.len(),
        missing: series.missing_count(),
        holes: holes.len(),
        coverage,
        hole_sizes: HoleSizeStats::from_lengths(&lengths),
    })
}

// `Option<TimeDelta>` as optional whole milliseconds.
mod optional_millis {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
        value.map(|d| d.num_milliseconds()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(TimeDelta::milliseconds))
    }
}
