//! Wrapper prelude.
//!
//! The `chrony` crate is the supported public entry point. Downstream code
//! should prefer importing from this prelude instead of depending on
//! `chrony-core` module paths.

pub use crate::arrow::array::{ArrayRef, RecordBatch};
pub use crate::columns::{column, naive_timestamps, timestamp_array};
pub use crate::coverage;
pub use crate::events::{
    add_time_between_events, merge_overlapping_events, merge_overlapping_events_kind,
};
pub use crate::series::{
    Hole, Series, cut, cut_fixed_size, describe_series, fill_data, find_holes, weighted_interpolate,
};
pub use crate::timespan::{audit_timespan, describe_timespan, diagnose_timespan};
pub use crate::transform::{SpanLayout, to_spans, to_stamps};
pub use crate::{ChronyError, ChronyResult, compute_category_index, compute_segments};
