//! Structural audits for span sequences.
//!
//! A span table is valid when its begin and end columns are naive, equally
//! long, every row has `beg <= end`, begins are non-decreasing and no span
//! ends after the next one begins. [`audit_timespan`] rejects the first
//! violation; [`diagnose_timespan`] reports all of them.

use arrow::{
    array::{Array, ArrayRef},
    compute::{concat, kernels::cmp::lt, kernels::zip::zip},
};
use chrono::{NaiveDateTime, TimeDelta};
use log::warn;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    columns::{naive_timestamps, timezone},
    error::{
        ArrowSnafu, BadLengthsSnafu, BegPosteriorToEndSnafu, ChronyError, ChronyResult,
        EmptySeriesSnafu, HasTimezoneSnafu, IncompatibleColumnsSnafu, NotSortedSnafu,
        OverlapSnafu,
    },
};

const BEGS: &str = "begs";
const ENDS: &str = "ends";

/// Summary of a span sequence, see [`describe_timespan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimespanSummary {
    /// Begin of the first span.
    pub beg: NaiveDateTime,
    /// Number of spans.
    pub count: usize,
    /// Rows whose begin equals the previous row's end.
    pub contiguous_transitions: usize,
    /// Rows (after the first) whose begin differs from the previous end.
    pub non_contiguous_transitions: usize,
    /// Covered duration over the `[first beg, last end]` window.
    pub coverage: f64,
    /// End of the last span.
    pub end: NaiveDateTime,
}

/// Validate a span sequence, failing on the first violated invariant.
///
/// Checks run in order: timezone metadata, lengths, `beg <= end` per row,
/// ascending begins, then overlap between consecutive rows. Two empty columns
/// are trivially valid. Both arrays must be timestamp arrays without nulls.
pub fn audit_timespan(begs: &dyn Array, ends: &dyn Array) -> ChronyResult<()> {
    match violations(begs, ends, true).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Apply every audit check without stopping, logging each violation.
///
/// Returns all violations found. When the lengths differ, row checks run over
/// the common prefix.
pub fn diagnose_timespan(begs: &dyn Array, ends: &dyn Array) -> Vec<ChronyError> {
    let found = violations(begs, ends, false);
    for err in &found {
        warn!("timespan audit: {err}");
    }
    found
}

fn violations(begs: &dyn Array, ends: &dyn Array, fail_fast: bool) -> Vec<ChronyError> {
    let mut out = Vec::new();
    macro_rules! report {
        ($err:expr) => {{
            out.push($err);
            if fail_fast {
                return out;
            }
        }};
    }

    if begs.is_empty() && ends.is_empty() {
        return out;
    }

    for (name, array) in [(BEGS, begs), (ENDS, ends)] {
        if let Some(tz) = timezone(array) {
            report!(
                HasTimezoneSnafu {
                    column: name,
                    timezone: tz,
                }
                .build()
            );
        }
    }

    if begs.len() != ends.len() {
        report!(
            BadLengthsSnafu {
                left: begs.len(),
                right: ends.len(),
            }
            .build()
        );
    }

    let (b, e) = match (naive_timestamps(BEGS, begs), naive_timestamps(ENDS, ends)) {
        (Ok(b), Ok(e)) => (b, e),
        (Err(err), _) | (_, Err(err)) => {
            out.push(err);
            return out;
        }
    };
    let n = b.len().min(e.len());

    for row in 0..n {
        if b[row] > e[row] {
            report!(
                BegPosteriorToEndSnafu {
                    row,
                    beg: b[row],
                    end: e[row],
                }
                .build()
            );
        }
    }

    for row in 1..b.len() {
        if b[row] < b[row - 1] {
            report!(
                NotSortedSnafu {
                    row,
                    previous: b[row - 1],
                    current: b[row],
                }
                .build()
            );
        }
    }

    for row in 1..n {
        if e[row - 1] > b[row] {
            report!(
                OverlapSnafu {
                    row,
                    previous_end: e[row - 1],
                    beg: b[row],
                }
                .build()
            );
        }
    }

    out
}

/// Summarize a span sequence: extent, transition counts and coverage.
///
/// Coverage is the summed span durations over `last end - first beg`; a
/// zero-length window counts as fully covered.
pub fn describe_timespan(begs: &dyn Array, ends: &dyn Array) -> ChronyResult<TimespanSummary> {
    ensure!(
        begs.len() == ends.len(),
        BadLengthsSnafu {
            left: begs.len(),
            right: ends.len(),
        }
    );
    let b = naive_timestamps(BEGS, begs)?;
    let e = naive_timestamps(ENDS, ends)?;
    let (Some(&first), Some(&last)) = (b.first(), e.last()) else {
        return EmptySeriesSnafu {
            operation: "describe timespans of",
        }
        .fail();
    };

    let contiguous_transitions = (1..b.len()).filter(|&i| b[i] == e[i - 1]).count();
    let covered: TimeDelta = b.iter().zip(&e).map(|(b, e)| *e - *b).sum();
    let window = last - first;
    let coverage = if window.is_zero() {
        1.0
    } else {
        seconds(covered) / seconds(window)
    };

    Ok(TimespanSummary {
        beg: first,
        count: b.len(),
        contiguous_transitions,
        non_contiguous_transitions: b.len() - 1 - contiguous_transitions,
        coverage,
        end: last,
    })
}

/// Clip every end to the next row's begin: `min(end[i], beg[i + 1])`.
///
/// The last row keeps its end. The result has the type of `ends`, which must
/// match the type of `begs`.
pub fn clip_overlapping_ends(begs: &dyn Array, ends: &dyn Array) -> ChronyResult<ArrayRef> {
    ensure!(
        begs.len() == ends.len(),
        BadLengthsSnafu {
            left: begs.len(),
            right: ends.len(),
        }
    );
    naive_timestamps(BEGS, begs)?;
    naive_timestamps(ENDS, ends)?;
    ensure!(
        begs.data_type() == ends.data_type(),
        IncompatibleColumnsSnafu {
            column: ENDS,
            left: begs.data_type().clone(),
            right: ends.data_type().clone(),
        }
    );

    let n = ends.len();
    if n < 2 {
        return Ok(ends.slice(0, n));
    }
    let next_begs = begs.slice(1, n - 1);
    let heads = ends.slice(0, n - 1);
    let earlier = lt(&next_begs, &heads).context(ArrowSnafu)?;
    let clipped = zip(&earlier, &next_begs, &heads).context(ArrowSnafu)?;
    concat(&[clipped.as_ref(), ends.slice(n - 1, 1).as_ref()]).context(ArrowSnafu)
}

pub(crate) fn seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9
}
