//! Conversion between span tables and stamp tables.
//!
//! A span row `[ts_beg, ts_end, state..., beg_value..., end_value...]`
//! describes an interval. Its stamp form has one row per distinct instant
//! where a span begins or ends: `[ts, beg_state..., end_state..., value...]`.
//! Where two spans meet, the earlier span's end values and the later span's
//! begin values must agree, and both land in the same stamp row.
//!
//! Column naming is driven by a [`SpanLayout`]; every projection goes through
//! an explicit [`RenameTable`]. The stamp schema records which span columns
//! were declared nullable, so converting back restores the span schema.

pub mod layout;

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, Scalar, StringArray},
    compute::{is_not_null, kernels::zip::zip, take_record_batch},
    datatypes::{DataType, Field, FieldRef, Schema},
};
use log::debug;
use snafu::prelude::*;

pub use layout::{BEG_PREFIX, END_PREFIX, RenameTable, SpanLayout};

use crate::{
    columns::{column, naive_timestamps, stable_sort_indices, with_column},
    error::{ArrowSnafu, ChronyResult, IncompatibleColumnsSnafu, IntegritySnafu},
};

/// Sentinel written by [`fill_transition_nulls`] into text columns.
pub const UNDEFINED_TEXT: &str = "UNDEFINED";
/// Sentinel written by [`fill_transition_nulls`] into numeric columns.
pub const UNDEFINED_NUMBER: i64 = -1;

/// Schema metadata key prefix on stamp tables. `<prefix><span column>` is
/// `"true"` or `"false"` after the declared nullability of that span column.
pub const SPAN_NULLABLE_PREFIX: &str = "chrony.span_nullable.";

/// Convert spans to stamps with the default timestamp column names.
///
/// See [`to_stamps_with`].
pub fn to_stamps<S: AsRef<str>, V: AsRef<str>>(
    spans: &RecordBatch,
    state_columns: &[S],
    value_columns: &[V],
) -> ChronyResult<RecordBatch> {
    to_stamps_with(spans, &SpanLayout::new(state_columns, value_columns))
}

/// Convert a span table to its stamp form.
///
/// The begin side of every span (`ts_beg`, state as `beg_<state>`,
/// `beg_<value>` as `<value>`) is outer-joined with the end side (`ts_end`,
/// state as `end_<state>`, `end_<value>` as `<value>`) on the stamp column
/// and the value columns. State columns absent at an instant are null.
///
/// The result is sorted by the stamp column. If an instant still appears
/// twice, adjoining spans disagree on their shared values and the call fails
/// with `Integrity`.
pub fn to_stamps_with(spans: &RecordBatch, layout: &SpanLayout) -> ChronyResult<RecordBatch> {
    let begins = RenameTable::stamps_from_span_begins(layout).project(spans)?;
    let ends = RenameTable::stamps_from_span_ends(layout).project(spans)?;

    let mut on = vec![layout.stamp_column.as_str()];
    on.extend(layout.value_columns.iter().map(String::as_str));
    let joined = crate::join::outer_join(&begins, &ends, &on)?;

    let order = stable_sort_indices(column(&joined, &layout.stamp_column)?)?;
    let sorted = take_record_batch(&joined, &order).context(ArrowSnafu)?;
    let joined_schema = sorted.schema();
    let positions = layout
        .stamp_columns()
        .iter()
        .map(|name| joined_schema.index_of(name).context(ArrowSnafu))
        .collect::<ChronyResult<Vec<_>>>()?;
    let projected = sorted.project(&positions).context(ArrowSnafu)?;

    let span_schema = spans.schema();
    let declared: HashMap<String, String> = layout
        .span_columns()
        .into_iter()
        .map(|name| -> ChronyResult<(String, String)> {
            let nullable = span_schema
                .field_with_name(&name)
                .context(ArrowSnafu)?
                .is_nullable();
            Ok((format!("{SPAN_NULLABLE_PREFIX}{name}"), nullable.to_string()))
        })
        .collect::<ChronyResult<_>>()?;
    let schema = Schema::new_with_metadata(projected.schema().fields().clone(), declared);
    let stamps = projected.with_schema(Arc::new(schema)).context(ArrowSnafu)?;

    ensure_unique_instants(
        &layout.stamp_column,
        column(&stamps, &layout.stamp_column)?.as_ref(),
    )?;

    debug!(
        "converted {} spans into {} stamps",
        spans.num_rows(),
        stamps.num_rows()
    );
    Ok(stamps)
}

fn ensure_unique_instants(name: &str, array: &dyn Array) -> ChronyResult<()> {
    let ts = naive_timestamps(name, array)?;
    match ts.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => {
            let dup = w[0];
            IntegritySnafu {
                ts: dup,
                count: ts.iter().filter(|&&t| t == dup).count(),
            }
            .fail()
        }
        None => Ok(()),
    }
}

/// Convert stamps to spans with the default timestamp column names.
///
/// See [`to_spans_with`].
pub fn to_spans<S: AsRef<str>, V: AsRef<str>>(
    stamps: &RecordBatch,
    state_columns: &[S],
    value_columns: &[V],
) -> ChronyResult<RecordBatch> {
    to_spans_with(stamps, &SpanLayout::new(state_columns, value_columns))
}

/// Convert a stamp table back to spans; the inverse of [`to_stamps_with`].
///
/// Each consecutive pair of stamps `(i, i + 1)` yields one span from
/// `ts[i]` to `ts[i + 1]`. The state is `beg_<state>` of stamp `i`, or
/// `end_<state>` of stamp `i + 1` when the former is null. `beg_<value>` is
/// the value at stamp `i` and `end_<value>` the value at stamp `i + 1`.
/// `N` stamps yield `N - 1` spans; fewer than two stamps yield none.
///
/// Span fields are nullable as recorded under [`SPAN_NULLABLE_PREFIX`] by
/// [`to_stamps_with`]. Without that record they follow the stamp field they
/// come from. A column holding nulls is always nullable.
pub fn to_spans_with(stamps: &RecordBatch, layout: &SpanLayout) -> ChronyResult<RecordBatch> {
    let n = stamps.num_rows();
    let len = n.saturating_sub(1);
    let heads = stamps.slice(0, len);
    let tails = stamps.slice(n.min(1), len);

    let begins = RenameTable::spans_from_stamp_begins(layout).project(&heads)?;
    let ends = RenameTable::spans_from_stamp_ends(layout).project(&tails)?;

    let schema = stamps.schema();
    let nullable = |span_name: &str, stamp_name: &str| -> ChronyResult<bool> {
        let key = format!("{SPAN_NULLABLE_PREFIX}{span_name}");
        Ok(match schema.metadata().get(&key) {
            Some(flag) => flag == "true",
            None => schema
                .field_with_name(stamp_name)
                .context(ArrowSnafu)?
                .is_nullable(),
        })
    };

    let mut parts: Vec<(String, bool, ArrayRef)> = vec![
        (
            layout.beg_column.clone(),
            nullable(&layout.beg_column, &layout.stamp_column)?,
            column(&begins, &layout.beg_column)?.clone(),
        ),
        (
            layout.end_column.clone(),
            nullable(&layout.end_column, &layout.stamp_column)?,
            column(&ends, &layout.end_column)?.clone(),
        ),
    ];
    for state in &layout.state_columns {
        parts.push((
            state.clone(),
            nullable(state, &format!("{BEG_PREFIX}{state}"))?,
            coalesce(state, column(&begins, state)?, column(&ends, state)?)?,
        ));
    }
    for (prefix, side) in [(BEG_PREFIX, &begins), (END_PREFIX, &ends)] {
        for value in &layout.value_columns {
            let name = format!("{prefix}{value}");
            parts.push((
                name.clone(),
                nullable(&name, value)?,
                column(side, &name)?.clone(),
            ));
        }
    }

    let (fields, columns): (Vec<FieldRef>, Vec<ArrayRef>) = parts
        .into_iter()
        .map(|(name, declared, array)| {
            let field = Field::new(
                name,
                array.data_type().clone(),
                declared || array.null_count() > 0,
            );
            (Arc::new(field), array)
        })
        .unzip();
    let spans =
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu)?;
    debug!("converted {n} stamps into {} spans", spans.num_rows());
    Ok(spans)
}

// `primary` where present, else `fallback`.
fn coalesce(name: &str, primary: &ArrayRef, fallback: &ArrayRef) -> ChronyResult<ArrayRef> {
    ensure!(
        primary.data_type() == fallback.data_type(),
        IncompatibleColumnsSnafu {
            column: name,
            left: primary.data_type().clone(),
            right: fallback.data_type().clone(),
        }
    );
    let present = is_not_null(primary.as_ref()).context(ArrowSnafu)?;
    zip(&present, primary, fallback).context(ArrowSnafu)
}

/// Replace nulls in `beg_*`/`end_*` columns with sentinels.
///
/// Text columns get [`UNDEFINED_TEXT`], integer and float columns get
/// [`UNDEFINED_NUMBER`]; filled columns become non-nullable. Other columns,
/// and columns of other types, are returned unchanged.
pub fn fill_transition_nulls(batch: &RecordBatch) -> ChronyResult<RecordBatch> {
    let mut out = batch.clone();
    let schema = batch.schema();
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let name = field.name();
        if !(name.starts_with(BEG_PREFIX) || name.starts_with(END_PREFIX)) {
            continue;
        }
        let present = is_not_null(array.as_ref()).context(ArrowSnafu)?;
        let filled = match field.data_type() {
            DataType::Utf8 => zip(
                &present,
                array,
                &Scalar::new(StringArray::from(vec![UNDEFINED_TEXT])),
            ),
            DataType::Int64 => zip(
                &present,
                array,
                &Scalar::new(Int64Array::from(vec![UNDEFINED_NUMBER])),
            ),
            DataType::Float64 => zip(
                &present,
                array,
                &Scalar::new(Float64Array::from(vec![UNDEFINED_NUMBER as f64])),
            ),
            _ => continue,
        }
        .context(ArrowSnafu)?;
        let field = Field::clone(field).with_nullable(false);
        out = with_column(&out, field, filled)?;
    }
    Ok(out)
}
