//! Regularly sampled series with missing values.
//!
//! A [`Series`] pairs strictly ascending, evenly spaced timestamps with
//! optional `f64` values; `None` marks a missing sample. The hole analyzer
//! expects series that pass [`audit`].

use std::{ops::Range, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, Float64Array, RecordBatch},
    datatypes::{DataType, Field, Schema},
};
use chrono::NaiveDateTime;
use log::warn;
use snafu::prelude::*;

use crate::{
    columns::{column, naive_timestamps, optional_f64, timestamp_array, timezone},
    coverage::Coverage,
    error::{
        ArrowSnafu, BadLengthsSnafu, ChronyError, ChronyResult, HasTimezoneSnafu,
        MissingDataSnafu, NotSortedSnafu, TimeStepSnafu,
    },
};

/// Timestamps and optional values of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<Option<f64>>,
    timezone: Option<String>,
}

impl Series {
    /// Build a naive series; fails with `BadLengths` on mismatched inputs.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<Option<f64>>) -> ChronyResult<Self> {
        ensure!(
            timestamps.len() == values.len(),
            BadLengthsSnafu {
                left: timestamps.len(),
                right: values.len(),
            }
        );
        Ok(Self {
            timestamps,
            values,
            timezone: None,
        })
    }

    /// Attach timezone metadata to the timestamps.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Read a series from a timestamp column and a numeric column of `batch`.
    ///
    /// Integer values are widened to `f64`; nulls become missing values. The
    /// timezone metadata of the timestamp column is kept.
    pub fn from_batch(
        batch: &RecordBatch,
        ts_column: &str,
        value_column: &str,
    ) -> ChronyResult<Self> {
        let ts = column(batch, ts_column)?;
        let series = Self::new(
            naive_timestamps(ts_column, ts.as_ref())?,
            optional_f64(value_column, column(batch, value_column)?.as_ref())?,
        )?;
        Ok(match timezone(ts.as_ref()) {
            Some(tz) => series.with_timezone(tz),
            None => series,
        })
    }

    /// Two-column batch `[ts_column, value_column]` of nanosecond timestamps
    /// and nullable `Float64` values; missing values are null.
    pub fn to_batch(&self, ts_column: &str, value_column: &str) -> ChronyResult<RecordBatch> {
        let ts = timestamp_array(ts_column, &self.timestamps, self.timezone.as_deref())?;
        let fields = vec![
            Field::new(ts_column, ts.data_type().clone(), false),
            Field::new(value_column, DataType::Float64, true),
        ];
        let columns: Vec<ArrayRef> = vec![
            Arc::new(ts),
            Arc::new(Float64Array::from(self.values.clone())),
        ];
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// `true` when the series has no sample.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Sample instants.
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Sample values, `None` where missing.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Timezone metadata, if any.
    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Number of missing samples.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Samples at positions `range`, clamped to the series.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            timezone: self.timezone.clone(),
        }
    }

    // Same timestamps, new values of the same length.
    pub(crate) fn with_values(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            timestamps: self.timestamps.clone(),
            values,
            timezone: self.timezone.clone(),
        }
    }
}

/// Validate a series for hole analysis, failing on the first violation.
///
/// Checks, in order: no timezone metadata, a uniform time step, strictly
/// ascending timestamps, at least one present value. An empty series is
/// trivially valid.
pub fn audit(series: &Series) -> ChronyResult<()> {
    match violations(series, true).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Apply every [`audit`] check, logging and returning each violation.
pub fn diagnose(series: &Series) -> Vec<ChronyError> {
    let found = violations(series, false);
    for err in &found {
        warn!("series audit: {err}");
    }
    found
}

fn violations(series: &Series, fail_fast: bool) -> Vec<ChronyError> {
    let mut out = Vec::new();
    macro_rules! report {
        ($err:expr) => {{
            out.push($err);
            if fail_fast {
                return out;
            }
        }};
    }

    if series.is_empty() {
        return out;
    }
    let ts = series.timestamps();

    if let Some(tz) = series.timezone() {
        report!(
            HasTimezoneSnafu {
                column: "timestamp",
                timezone: tz,
            }
            .build()
        );
    }

    if let [first, second, ..] = ts {
        let expected = *second - *first;
        for row in 2..ts.len() {
            let found = ts[row] - ts[row - 1];
            if found != expected {
                report!(
                    TimeStepSnafu {
                        row,
                        expected,
                        found,
                    }
                    .build()
                );
            }
        }
    }

    for row in 1..ts.len() {
        if ts[row] <= ts[row - 1] {
            report!(
                NotSortedSnafu {
                    row,
                    previous: ts[row - 1],
                    current: ts[row],
                }
                .build()
            );
        }
    }

    if series.values().iter().all(Option::is_none) {
        report!(MissingDataSnafu { len: series.len() }.build());
    }

    out
}

/// Drop the leading and trailing runs of missing values.
///
/// The result starts and ends with a present value. A series with no present
/// value fails with `MissingData`; an empty series is returned as is.
pub fn trim(series: &Series) -> ChronyResult<Series> {
    if series.is_empty() {
        return Ok(series.clone());
    }
    let coverage = Coverage::from_values(series.values())?;
    let (Some(first), Some(last)) = (coverage.first(), coverage.last()) else {
        return MissingDataSnafu { len: series.len() }.fail();
    };
    Ok(series.slice(first as usize..last as usize + 1))
}
