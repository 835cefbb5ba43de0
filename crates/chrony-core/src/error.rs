//! Error types and SNAFU context selectors for the chrony engine.
//!
//! `ChronyError` is the single, closed error taxonomy returned by every
//! validator and transformation. Context selectors are exposed crate-wide
//! (via `#[snafu(visibility(pub(crate)))]`) so sibling modules attach context
//! without re-exporting them. All variants are rejections: nothing here is
//! retryable, the caller has to fix its input.

use arrow::{datatypes::DataType, error::ArrowError};
use chrono::{NaiveDateTime, TimeDelta};
use snafu::prelude::*;

/// Convenience alias for results of chrony operations.
pub type ChronyResult<T> = Result<T, ChronyError>;

/// Errors from timespan audits, span/stamp transforms, event merging and
/// hole analysis.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChronyError {
    /// A timestamp column carries timezone metadata where naive is required.
    #[snafu(display("Column {column} is timezone-aware ({timezone}); naive timestamps required"))]
    HasTimezone {
        /// Offending column.
        column: String,
        /// Timezone attached to the column.
        timezone: String,
    },

    /// Two row-aligned sequences differ in length.
    #[snafu(display("Row-aligned sequences differ in length: {left} vs {right}"))]
    BadLengths {
        /// Length of the first sequence.
        left: usize,
        /// Length of the second sequence.
        right: usize,
    },

    /// A row's begin timestamp is after its end timestamp.
    #[snafu(display("Row {row} begins at {beg}, after its end {end}"))]
    BegPosteriorToEnd {
        /// Offending row.
        row: usize,
        /// Begin timestamp of the row.
        beg: NaiveDateTime,
        /// End timestamp of the row.
        end: NaiveDateTime,
    },

    /// Timestamps are not in ascending order.
    #[snafu(display("Row {row} ({current}) is earlier than row {} ({previous})", row - 1))]
    NotSorted {
        /// First row that breaks the order.
        row: usize,
        /// Timestamp of the preceding row.
        previous: NaiveDateTime,
        /// Timestamp of the offending row.
        current: NaiveDateTime,
    },

    /// A span ends after the next span begins.
    #[snafu(display("Row {} ends at {previous_end}, after row {row} begins at {beg}", row - 1))]
    Overlap {
        /// Row whose begin is overlapped by its predecessor.
        row: usize,
        /// End timestamp of the preceding row.
        previous_end: NaiveDateTime,
        /// Begin timestamp of the offending row.
        beg: NaiveDateTime,
    },

    /// A timestamp appears more than once after merging begin and end stamps.
    #[snafu(display(
        "Stamp integrity violated: timestamp {ts} appears {count} times \
         (adjoining spans disagree on their shared values)"
    ))]
    Integrity {
        /// Duplicated timestamp.
        ts: NaiveDateTime,
        /// Number of stamp rows sharing it.
        count: usize,
    },

    /// A series holds no present value at all.
    #[snafu(display("All {len} values of the series are missing"))]
    MissingData {
        /// Length of the series.
        len: usize,
    },

    /// Sample spacing is not uniform.
    #[snafu(display("Time step changes at row {row}: expected {expected}, found {found}"))]
    TimeStep {
        /// Row whose spacing to its predecessor differs.
        row: usize,
        /// Step between the first two samples.
        expected: TimeDelta,
        /// Step observed at `row`.
        found: TimeDelta,
    },

    /// A column named by the caller is absent from the batch.
    #[snafu(display("Column {column} not found"))]
    ColumnNotFound {
        /// Requested column.
        column: String,
    },

    /// A column expected to hold timestamps has another type.
    #[snafu(display("Column {column} is not a timestamp column (found {datatype:?})"))]
    NotTimestamp {
        /// Offending column.
        column: String,
        /// Arrow data type encountered.
        datatype: DataType,
    },

    /// A column expected to hold numbers has another type.
    #[snafu(display("Column {column} is not numeric (found {datatype:?})"))]
    NotNumeric {
        /// Offending column.
        column: String,
        /// Arrow data type encountered.
        datatype: DataType,
    },

    /// A timestamp cell is null where an instant is required.
    #[snafu(display("Column {column} has a null timestamp at row {row}"))]
    NullTimestamp {
        /// Offending column.
        column: String,
        /// Offending row.
        row: usize,
    },

    /// A timestamp cannot be represented as a naive date-time or in nanoseconds.
    #[snafu(display("Column {column} has an out-of-range timestamp at row {row}"))]
    TimestampOutOfRange {
        /// Offending column.
        column: String,
        /// Offending row.
        row: usize,
    },

    /// Two columns that must line up have different types.
    #[snafu(display("Column {column} has type {left:?} on one side and {right:?} on the other"))]
    IncompatibleColumns {
        /// Column name.
        column: String,
        /// Type on the first side.
        left: DataType,
        /// Type on the second side.
        right: DataType,
    },

    /// Arrow compute or batch construction error.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The operation needs at least one row.
    #[snafu(display("Cannot {operation} an empty input"))]
    EmptySeries {
        /// Operation that was attempted.
        operation: String,
    },

    /// A call shape the engine deliberately does not implement.
    #[snafu(display("Unimplemented case: {case}"))]
    Unimplemented {
        /// Description of the rejected case.
        case: String,
    },

    /// Window parameters cannot make progress.
    #[snafu(display("Invalid window: size {size} with overlap {overlap} (need size > overlap)"))]
    InvalidWindow {
        /// Requested window size in samples.
        size: usize,
        /// Requested overlap in samples.
        overlap: usize,
    },

    /// The series still contains missing values.
    #[snafu(display("Series still has {missing} missing values; fill or cut it first"))]
    UnfilledHoles {
        /// Number of missing samples.
        missing: usize,
    },

    /// An interpolation weight is negative or not finite.
    #[snafu(display("Invalid interpolation weight {weight} at row {row}"))]
    InvalidWeight {
        /// Offending row.
        row: usize,
        /// Offending weight.
        weight: f64,
    },

    /// No weight is available between two anchors.
    #[snafu(display("Total weight between rows {from} and {to} is zero"))]
    ZeroWeightSpan {
        /// Preceding anchor row.
        from: usize,
        /// Following anchor row.
        to: usize,
    },

    /// Sample positions must fit the `u32` coverage domain.
    #[snafu(display("Series of {len} samples exceeds the u32 position domain"))]
    SeriesTooLong {
        /// Length of the series.
        len: usize,
    },
}
