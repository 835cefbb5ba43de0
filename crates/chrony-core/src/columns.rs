//! Column access, conversion and row-key helpers over arrow batches.
//!
//! Span, stamp and event tables are plain [`RecordBatch`]es. The helpers here
//! read timestamp and numeric columns into naive Rust values, build
//! nanosecond timestamp arrays back, and encode key columns with the arrow
//! row format for grouping and segment detection.

use std::{collections::BTreeMap, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, AsArray, RecordBatch, TimestampNanosecondArray, UInt32Array},
    compute::{SortColumn, cast, lexsort_to_indices},
    datatypes::{
        DataType, Field, FieldRef, Float64Type, Schema, TimeUnit, TimestampMicrosecondType,
        TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
    },
    row::{Row, RowConverter, Rows, SortField},
};
use chrono::NaiveDateTime;
use snafu::prelude::*;

use crate::error::{
    ArrowSnafu, ChronyResult, ColumnNotFoundSnafu, NotNumericSnafu, NotTimestampSnafu,
    NullTimestampSnafu, SeriesTooLongSnafu, TimestampOutOfRangeSnafu,
};

/// Column `name` of `batch`.
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> ChronyResult<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .context(ColumnNotFoundSnafu { column: name })
}

/// Timezone attached to a timestamp array, if any.
pub fn timezone(array: &dyn Array) -> Option<&str> {
    match array.data_type() {
        DataType::Timestamp(_, tz) => tz.as_deref(),
        _ => None,
    }
}

/// Read a timestamp array of any unit as naive instants.
///
/// Timezone metadata is ignored here; validators check it separately. Null
/// cells are rejected with `NullTimestamp`.
pub fn naive_timestamps(name: &str, array: &dyn Array) -> ChronyResult<Vec<NaiveDateTime>> {
    macro_rules! collect {
        ($t:ty) => {{
            let arr = array.as_primitive::<$t>();
            (0..arr.len())
                .map(|row| -> ChronyResult<NaiveDateTime> {
                    ensure!(arr.is_valid(row), NullTimestampSnafu { column: name, row });
                    arr.value_as_datetime(row)
                        .context(TimestampOutOfRangeSnafu { column: name, row })
                })
                .collect()
        }};
    }

    match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => collect!(TimestampSecondType),
        DataType::Timestamp(TimeUnit::Millisecond, _) => collect!(TimestampMillisecondType),
        DataType::Timestamp(TimeUnit::Microsecond, _) => collect!(TimestampMicrosecondType),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => collect!(TimestampNanosecondType),
        other => NotTimestampSnafu {
            column: name,
            datatype: other.clone(),
        }
        .fail(),
    }
}

/// Nanosecond timestamp array of `values`, tagged with `timezone`.
pub fn timestamp_array(
    name: &str,
    values: &[NaiveDateTime],
    timezone: Option<&str>,
) -> ChronyResult<TimestampNanosecondArray> {
    let nanos = values
        .iter()
        .enumerate()
        .map(|(row, ts)| {
            ts.and_utc()
                .timestamp_nanos_opt()
                .context(TimestampOutOfRangeSnafu { column: name, row })
        })
        .collect::<ChronyResult<Vec<i64>>>()?;
    Ok(TimestampNanosecondArray::from(nanos).with_timezone_opt(timezone))
}

/// Read a numeric array as optional `f64`; nulls become `None`.
pub fn optional_f64(name: &str, array: &dyn Array) -> ChronyResult<Vec<Option<f64>>> {
    ensure!(
        array.data_type().is_numeric(),
        NotNumericSnafu {
            column: name,
            datatype: array.data_type().clone(),
        }
    );
    let floats = cast(array, &DataType::Float64).context(ArrowSnafu)?;
    Ok(floats.as_primitive::<Float64Type>().iter().collect())
}

/// Append `array` under `field`, or replace the column of the same name.
///
/// Schema metadata is kept.
pub fn with_column(
    batch: &RecordBatch,
    field: Field,
    array: ArrayRef,
) -> ChronyResult<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    match schema.index_of(field.name()) {
        Ok(i) => {
            fields[i] = Arc::new(field);
            columns[i] = array;
        }
        Err(_) => {
            fields.push(Arc::new(field));
            columns.push(array);
        }
    }
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(schema), columns).context(ArrowSnafu)
}

/// Row positions ordering `array` ascending; ties keep their input order.
pub(crate) fn stable_sort_indices(array: &ArrayRef) -> ChronyResult<UInt32Array> {
    let len = u32::try_from(array.len())
        .ok()
        .context(SeriesTooLongSnafu { len: array.len() })?;
    let positions: ArrayRef = Arc::new(UInt32Array::from_iter_values(0..len));
    lexsort_to_indices(
        &[
            SortColumn {
                values: array.clone(),
                options: None,
            },
            SortColumn {
                values: positions,
                options: None,
            },
        ],
        None,
    )
    .context(ArrowSnafu)
}

/// Row-format encoding of the `keys` columns of `batch`.
///
/// Encoded rows compare equal exactly when every key cell is equal, nulls
/// included, and order like the key values.
pub(crate) fn row_keys<S: AsRef<str>>(batch: &RecordBatch, keys: &[S]) -> ChronyResult<Rows> {
    let columns = keys
        .iter()
        .map(|k| column(batch, k.as_ref()).cloned())
        .collect::<ChronyResult<Vec<_>>>()?;
    encode_rows(&columns)
}

pub(crate) fn encode_rows(columns: &[ArrayRef]) -> ChronyResult<Rows> {
    let converter = RowConverter::new(
        columns
            .iter()
            .map(|c| SortField::new(c.data_type().clone()))
            .collect(),
    )
    .context(ArrowSnafu)?;
    converter.convert_columns(columns).context(ArrowSnafu)
}

/// Row positions grouped by equal `keys`, groups in ascending key order.
///
/// Without key columns every row falls into a single group.
pub(crate) fn group_rows<S: AsRef<str>>(
    batch: &RecordBatch,
    keys: &[S],
) -> ChronyResult<Vec<Vec<u32>>> {
    let len = u32::try_from(batch.num_rows())
        .ok()
        .context(SeriesTooLongSnafu {
            len: batch.num_rows(),
        })?;
    if keys.is_empty() {
        return Ok(if len == 0 {
            Vec::new()
        } else {
            vec![(0..len).collect()]
        });
    }

    let rows = row_keys(batch, keys)?;
    let mut groups: BTreeMap<Row<'_>, Vec<u32>> = BTreeMap::new();
    for (i, row) in (0..len).zip(rows.iter()) {
        groups.entry(row).or_default().push(i);
    }
    Ok(groups.into_values().collect())
}
