//! Core engine for validating and transforming time-indexed tables.
//!
//! This crate provides the foundational pieces for `chrony`:
//!
//! - Span, stamp and event tables as Arrow [`RecordBatch`](arrow::array::RecordBatch)es,
//!   with column access and row-key helpers (`columns` module).
//! - Structural audits for span tables (`timespan` module).
//! - The span/stamp conversion and its naming layout (`transform` module).
//! - Run-length segment ids (`segments` module) and merging of overlapping
//!   events (`events` module).
//! - Regularly sampled series with missing values (`series` module), their
//!   RoaringBitmap presence sets (`coverage` module), hole cutting and
//!   filling (`holes` module) and weighted interpolation (`interpolate`
//!   module).
//!
//! Every operation reads a complete in-memory input and returns a new value;
//! nothing is mutated in place. Failures are reported as [`ChronyError`].
#![deny(missing_docs)]
pub mod category;
pub mod columns;
pub mod coverage;
pub mod error;
pub mod events;
pub mod holes;
pub mod interpolate;
mod join;
pub mod segments;
pub mod series;
pub mod timespan;
pub mod transform;

pub use arrow;
pub use error::{ChronyError, ChronyResult};
