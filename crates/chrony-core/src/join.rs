//! Full outer join of two batches on equal key columns.

use std::{collections::HashMap, sync::Arc};

use arrow::{
    array::{ArrayRef, RecordBatch, UInt32Array},
    compute::{is_not_null, kernels::zip::zip, take},
    datatypes::{Field, FieldRef, Schema},
    row::{Row, RowConverter, SortField},
};
use snafu::prelude::*;

use crate::{
    columns::column,
    error::{ArrowSnafu, ChronyResult, IncompatibleColumnsSnafu},
};

/// Join `left` and `right` on the `on` columns, keeping unmatched rows of
/// both sides.
///
/// Keys match when every key cell is equal, nulls included. Output columns
/// are the keys (coalesced from both sides), then the other columns of
/// `left`, then the other columns of `right`; non-key columns are nullable.
/// Rows come in left order, followed by the unmatched right rows.
pub(crate) fn outer_join<S: AsRef<str>>(
    left: &RecordBatch,
    right: &RecordBatch,
    on: &[S],
) -> ChronyResult<RecordBatch> {
    let keys = |batch: &RecordBatch| {
        on.iter()
            .map(|k| column(batch, k.as_ref()).cloned())
            .collect::<ChronyResult<Vec<ArrayRef>>>()
    };
    let (left_keys, right_keys) = (keys(left)?, keys(right)?);
    for ((name, l), r) in on.iter().zip(&left_keys).zip(&right_keys) {
        ensure!(
            l.data_type() == r.data_type(),
            IncompatibleColumnsSnafu {
                column: name.as_ref(),
                left: l.data_type().clone(),
                right: r.data_type().clone(),
            }
        );
    }

    let (left_idx, right_idx) = match_rows(&left_keys, &right_keys, left.num_rows())?;

    let (left_schema, right_schema) = (left.schema(), right.schema());
    let is_key = |name: &str| on.iter().any(|k| k.as_ref() == name);
    let mut fields: Vec<FieldRef> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (key, (l, r)) in on.iter().zip(left_keys.iter().zip(&right_keys)) {
        let taken_left = take(l, &left_idx, None).context(ArrowSnafu)?;
        let taken_right = take(r, &right_idx, None).context(ArrowSnafu)?;
        let mask = is_not_null(&taken_left).context(ArrowSnafu)?;
        columns.push(zip(&mask, &taken_left, &taken_right).context(ArrowSnafu)?);

        let (lf, rf) = (
            left_schema.field_with_name(key.as_ref()).context(ArrowSnafu)?,
            right_schema.field_with_name(key.as_ref()).context(ArrowSnafu)?,
        );
        fields.push(Arc::new(
            lf.clone().with_nullable(lf.is_nullable() || rf.is_nullable()),
        ));
    }

    for (batch, indices) in [(left, &left_idx), (right, &right_idx)] {
        let schema = batch.schema();
        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            if is_key(field.name()) {
                continue;
            }
            columns.push(take(array, indices, None).context(ArrowSnafu)?);
            fields.push(Arc::new(Field::clone(field).with_nullable(true)));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu)
}

// Paired row positions of the join; `None` marks the missing side.
fn match_rows(
    left_keys: &[ArrayRef],
    right_keys: &[ArrayRef],
    left_len: usize,
) -> ChronyResult<(UInt32Array, UInt32Array)> {
    let converter = RowConverter::new(
        left_keys
            .iter()
            .map(|c| SortField::new(c.data_type().clone()))
            .collect(),
    )
    .context(ArrowSnafu)?;
    let left_rows = converter.convert_columns(left_keys).context(ArrowSnafu)?;
    let right_rows = converter.convert_columns(right_keys).context(ArrowSnafu)?;

    let mut index: HashMap<Row<'_>, Vec<u32>> = HashMap::new();
    for (j, row) in (0u32..).zip(right_rows.iter()) {
        index.entry(row).or_default().push(j);
    }

    let mut matched = vec![false; right_rows.num_rows()];
    let mut left_idx: Vec<Option<u32>> = Vec::with_capacity(left_len);
    let mut right_idx: Vec<Option<u32>> = Vec::with_capacity(left_len);
    for (i, row) in (0u32..).zip(left_rows.iter()) {
        match index.get(&row) {
            Some(js) => {
                for &j in js {
                    left_idx.push(Some(i));
                    right_idx.push(Some(j));
                    matched[j as usize] = true;
                }
            }
            None => {
                left_idx.push(Some(i));
                right_idx.push(None);
            }
        }
    }
    for (j, _) in (0u32..).zip(&matched).filter(|(_, m)| !**m) {
        left_idx.push(None);
        right_idx.push(Some(j));
    }
    Ok((UInt32Array::from(left_idx), UInt32Array::from(right_idx)))
}
