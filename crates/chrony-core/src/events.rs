//! Merging of overlapping events and inter-event gaps.
//!
//! An event table has a begin and an end timestamp column and any number of
//! other columns. Optional `kind` columns partition events into groups that
//! are processed independently.

use std::sync::Arc;

use arrow::{
    array::{DurationNanosecondArray, RecordBatch, UInt32Array},
    compute::{concat_batches, take, take_record_batch},
    datatypes::{DataType, Field, TimeUnit},
};
use log::debug;
use snafu::prelude::*;

use crate::{
    columns::{column, group_rows, naive_timestamps, stable_sort_indices, with_column},
    error::{ArrowSnafu, ChronyResult, TimestampOutOfRangeSnafu, UnimplementedSnafu},
};

/// Column added by [`add_time_between_events`]: begin minus the previous end.
pub const TIME_SINCE_PREVIOUS: &str = "time_since_previous";
/// Column added by [`add_time_between_events`]: next begin minus this end.
pub const TIME_TO_NEXT: &str = "time_to_next";

/// Coalesce transitively overlapping events.
///
/// Events are sorted by `beg`, then scanned once: an event whose begin is
/// before the running end of the current merged event (or equal to its
/// begin) is absorbed, extending the running end to the larger of both ends.
/// Touching events (`end == next beg`) are not merged. The surviving row of a
/// merged chain is its first row; other columns of absorbed rows are dropped.
///
/// The output is sorted and non-overlapping, and merging it again is a no-op.
pub fn merge_overlapping_events(
    batch: &RecordBatch,
    beg: &str,
    end: &str,
) -> ChronyResult<RecordBatch> {
    let order = stable_sort_indices(column(batch, beg)?)?;
    let sorted = take_record_batch(batch, &order).context(ArrowSnafu)?;
    let begs = naive_timestamps(beg, column(&sorted, beg)?.as_ref())?;
    let ends = naive_timestamps(end, column(&sorted, end)?.as_ref())?;

    // Per merged chain: its first row and the row holding its largest end.
    let mut kept: Vec<u32> = Vec::new();
    let mut end_rows: Vec<u32> = Vec::new();
    for (i, (&b, &e)) in (0u32..).zip(begs.iter().zip(&ends)) {
        let absorbed = match (kept.last(), end_rows.last()) {
            (Some(&k), Some(&r)) => b < ends[r as usize] || b == begs[k as usize],
            _ => false,
        };
        match end_rows.last_mut() {
            Some(running) if absorbed => {
                if e > ends[*running as usize] {
                    *running = i;
                }
            }
            _ => {
                kept.push(i);
                end_rows.push(i);
            }
        }
    }

    let survivors = take_record_batch(&sorted, &UInt32Array::from(kept)).context(ArrowSnafu)?;
    let merged_ends = take(column(&sorted, end)?, &UInt32Array::from(end_rows), None)
        .context(ArrowSnafu)?;
    let end_field = sorted.schema().field_with_name(end).context(ArrowSnafu)?.clone();
    let merged = with_column(&survivors, end_field, merged_ends)?;
    debug!(
        "merged {} events into {}",
        batch.num_rows(),
        merged.num_rows()
    );
    Ok(merged)
}

/// [`merge_overlapping_events`] applied independently to each group of
/// equal `kind` values.
///
/// The merged groups are concatenated and then stably re-sorted by `beg`, so
/// the output is in global time order. Events of different kinds may still
/// overlap. Merging without any kind column is rejected as `Unimplemented`;
/// call [`merge_overlapping_events`] instead.
pub fn merge_overlapping_events_kind<S: AsRef<str>>(
    batch: &RecordBatch,
    beg: &str,
    end: &str,
    kind: &[S],
) -> ChronyResult<RecordBatch> {
    ensure!(
        !kind.is_empty(),
        UnimplementedSnafu {
            case: "merging events by kind without any kind column",
        }
    );
    let groups = group_rows(batch, kind)?;
    if groups.is_empty() {
        return merge_overlapping_events(batch, beg, end);
    }

    let merged = groups
        .into_iter()
        .map(|rows| {
            let group = take_record_batch(batch, &UInt32Array::from(rows)).context(ArrowSnafu)?;
            merge_overlapping_events(&group, beg, end)
        })
        .collect::<ChronyResult<Vec<_>>>()?;
    debug!("merged events across {} kinds", merged.len());

    let all = concat_batches(&batch.schema(), &merged).context(ArrowSnafu)?;
    let order = stable_sort_indices(column(&all, beg)?)?;
    take_record_batch(&all, &order).context(ArrowSnafu)
}

/// Append the gaps between consecutive events of each kind.
///
/// Within a group sorted by `beg`, [`TIME_SINCE_PREVIOUS`] is
/// `beg[i] - end[i - 1]` and [`TIME_TO_NEXT`] is `beg[i + 1] - end[i]`; the
/// side without a neighbor is null. Groups come out in ascending key order,
/// each sorted by `beg`. An empty `kind` treats all events as one group.
/// Overlapping neighbors produce negative durations. Both columns are
/// nanosecond durations.
pub fn add_time_between_events<S: AsRef<str>>(
    batch: &RecordBatch,
    beg: &str,
    end: &str,
    kind: &[S],
) -> ChronyResult<RecordBatch> {
    let begs = naive_timestamps(beg, column(batch, beg)?.as_ref())?;
    let ends = naive_timestamps(end, column(batch, end)?.as_ref())?;
    let gap = |name: &str, row: usize, from: usize, to: usize| -> ChronyResult<i64> {
        (begs[to] - ends[from])
            .num_nanoseconds()
            .context(TimestampOutOfRangeSnafu { column: name, row })
    };

    let mut order: Vec<u32> = Vec::with_capacity(batch.num_rows());
    let mut since = Vec::with_capacity(batch.num_rows());
    let mut next = Vec::with_capacity(batch.num_rows());
    for mut rows in group_rows(batch, kind)? {
        rows.sort_by_key(|&r| begs[r as usize]);
        for (pos, &row) in rows.iter().enumerate() {
            let out_row = order.len() + pos;
            let previous = pos.checked_sub(1).map(|p| rows[p] as usize);
            let following = rows.get(pos + 1).map(|&f| f as usize);
            since.push(
                previous
                    .map(|p| gap(TIME_SINCE_PREVIOUS, out_row, p, row as usize))
                    .transpose()?,
            );
            next.push(
                following
                    .map(|f| gap(TIME_TO_NEXT, out_row, row as usize, f))
                    .transpose()?,
            );
        }
        order.extend(rows);
    }

    let duration = DataType::Duration(TimeUnit::Nanosecond);
    let out = take_record_batch(batch, &UInt32Array::from(order)).context(ArrowSnafu)?;
    let out = with_column(
        &out,
        Field::new(TIME_SINCE_PREVIOUS, duration.clone(), true),
        Arc::new(DurationNanosecondArray::from(since)),
    )?;
    with_column(
        &out,
        Field::new(TIME_TO_NEXT, duration, true),
        Arc::new(DurationNanosecondArray::from(next)),
    )
}
