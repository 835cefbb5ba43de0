//! Run-length segment ids.

use arrow::array::RecordBatch;

use crate::{columns::row_keys, error::ChronyResult};

/// One segment id per row of `batch`.
///
/// Ids start at 1 and increase by one at every row where any of `tracked`
/// differs from the previous row. Nulls compare equal to each other. With no
/// tracked column every row belongs to segment 1.
pub fn compute_segments<S: AsRef<str>>(
    batch: &RecordBatch,
    tracked: &[S],
) -> ChronyResult<Vec<u64>> {
    let n = batch.num_rows();
    if tracked.is_empty() {
        return Ok(vec![1; n]);
    }
    let rows = row_keys(batch, tracked)?;

    let mut ids = Vec::with_capacity(n);
    let mut id = 0u64;
    for row in 0..n {
        if row == 0 || rows.row(row) != rows.row(row - 1) {
            id += 1;
        }
        ids.push(id);
    }
    Ok(ids)
}
