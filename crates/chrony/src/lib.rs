//! # chrony
//!
//! Timespan validation, stamps/spans conversion and gap analysis for
//! time-indexed tables.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! Tables are arrow [`RecordBatch`](arrow::array::RecordBatch)es; the
//! [`arrow`] crate is re-exported so callers build them against the same
//! version.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chrony::prelude::*;
//!
//! let spans = RecordBatch::try_from_iter(vec![
//!     ("ts_beg", begs),
//!     ("ts_end", ends),
//!     ("state", states),
//! ])?;
//! audit_timespan(column(&spans, "ts_beg")?, column(&spans, "ts_end")?)?;
//! let stamps = to_stamps(&spans, &["state"], &[] as &[&str])?;
//! ```

#![deny(missing_docs)]

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Span table audits and summaries.
pub mod timespan {
    pub use chrony_core::timespan::{
        TimespanSummary, audit_timespan, clip_overlapping_ends, describe_timespan,
        diagnose_timespan,
    };
}

/// Span/stamp conversion.
pub mod transform {
    pub use chrony_core::transform::{
        BEG_PREFIX, END_PREFIX, RenameTable, SPAN_NULLABLE_PREFIX, SpanLayout, UNDEFINED_NUMBER,
        UNDEFINED_TEXT, fill_transition_nulls, to_spans, to_spans_with, to_stamps, to_stamps_with,
    };
}

/// Event merging and gaps between events.
pub mod events {
    pub use chrony_core::events::{
        TIME_SINCE_PREVIOUS, TIME_TO_NEXT, add_time_between_events, merge_overlapping_events,
        merge_overlapping_events_kind,
    };
}

/// Regular series, holes and interpolation.
pub mod series {
    pub use chrony_core::holes::{
        Hole, HoleSizeStats, SeriesSummary, cut, cut_fixed_size, describe_series, fill_data,
        find_holes,
    };
    pub use chrony_core::interpolate::weighted_interpolate;
    pub use chrony_core::series::{Series, audit, diagnose, trim};
}

/// Coverage namespace (wrapper-only).
pub mod coverage {
    pub use chrony_core::coverage::{Coverage, Position};
}

/// Column access and conversion over arrow batches.
pub mod columns {
    pub use chrony_core::columns::{
        column, naive_timestamps, optional_f64, timestamp_array, timezone, with_column,
    };
}

pub use chrony_core::arrow;
pub use chrony_core::category::compute_category_index;
pub use chrony_core::segments::compute_segments;
pub use chrony_core::{ChronyError, ChronyResult};
