//! Column naming for span and stamp tables.

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, RecordBatch},
    datatypes::{FieldRef, Schema},
};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::error::{ArrowSnafu, ChronyResult, ColumnNotFoundSnafu};

/// Prefix of begin-side columns (`beg_<col>`).
pub const BEG_PREFIX: &str = "beg_";
/// Prefix of end-side columns (`end_<col>`).
pub const END_PREFIX: &str = "end_";

/// Naming convention shared by a span table and its stamp form.
///
/// A span table has `[beg_column, end_column, <state>..., beg_<value>...,
/// end_<value>...]`; its stamp form has `[stamp_column, beg_<state>...,
/// end_<state>..., <value>...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLayout {
    /// Begin timestamp column of the span table.
    #[serde(default = "default_beg_column")]
    pub beg_column: String,

    /// End timestamp column of the span table.
    #[serde(default = "default_end_column")]
    pub end_column: String,

    /// Timestamp column of the stamp table.
    #[serde(default = "default_stamp_column")]
    pub stamp_column: String,

    /// Columns holding the state of a span (one value per span).
    #[serde(default)]
    pub state_columns: Vec<String>,

    /// Columns holding a value observed at each end of a span and shared by
    /// the stamp where two spans meet.
    #[serde(default)]
    pub value_columns: Vec<String>,
}

fn default_beg_column() -> String {
    "ts_beg".to_string()
}

fn default_end_column() -> String {
    "ts_end".to_string()
}

fn default_stamp_column() -> String {
    "ts".to_string()
}

impl Default for SpanLayout {
    fn default() -> Self {
        Self {
            beg_column: default_beg_column(),
            end_column: default_end_column(),
            stamp_column: default_stamp_column(),
            state_columns: Vec::new(),
            value_columns: Vec::new(),
        }
    }
}

impl SpanLayout {
    /// Default timestamp column names with the given state and value columns.
    pub fn new<S: AsRef<str>, V: AsRef<str>>(state_columns: &[S], value_columns: &[V]) -> Self {
        Self {
            state_columns: state_columns.iter().map(|s| s.as_ref().to_string()).collect(),
            value_columns: value_columns.iter().map(|v| v.as_ref().to_string()).collect(),
            ..Self::default()
        }
    }

    /// Stamp-side names of the state columns: begin names then end names.
    pub fn stamp_state_columns(&self) -> Vec<String> {
        prefixed(BEG_PREFIX, &self.state_columns)
            .chain(prefixed(END_PREFIX, &self.state_columns))
            .collect()
    }

    /// Span-side names of the value columns: begin names then end names.
    pub fn span_value_columns(&self) -> Vec<String> {
        prefixed(BEG_PREFIX, &self.value_columns)
            .chain(prefixed(END_PREFIX, &self.value_columns))
            .collect()
    }

    /// Column order of a span table.
    pub fn span_columns(&self) -> Vec<String> {
        let mut out = vec![self.beg_column.clone(), self.end_column.clone()];
        out.extend(self.state_columns.iter().cloned());
        out.extend(self.span_value_columns());
        out
    }

    /// Column order of a stamp table.
    pub fn stamp_columns(&self) -> Vec<String> {
        let mut out = vec![self.stamp_column.clone()];
        out.extend(self.stamp_state_columns());
        out.extend(self.value_columns.iter().cloned());
        out
    }
}

fn prefixed<'a>(prefix: &'a str, columns: &'a [String]) -> impl Iterator<Item = String> + 'a {
    columns.iter().map(move |c| format!("{prefix}{c}"))
}

/// Ordered `source -> target` column renames.
///
/// Projecting a batch through a table selects the source columns, in table
/// order, under their target names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenameTable {
    entries: Vec<(String, String)>,
}

impl RenameTable {
    /// Table from explicit pairs.
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Begin side of a span table, renamed to stamp names:
    /// `beg_column -> stamp`, `<state> -> beg_<state>`, `beg_<value> -> <value>`.
    pub fn stamps_from_span_begins(layout: &SpanLayout) -> Self {
        Self::stamp_side(layout, &layout.beg_column, BEG_PREFIX)
    }

    /// End side of a span table, renamed to stamp names:
    /// `end_column -> stamp`, `<state> -> end_<state>`, `end_<value> -> <value>`.
    pub fn stamps_from_span_ends(layout: &SpanLayout) -> Self {
        Self::stamp_side(layout, &layout.end_column, END_PREFIX)
    }

    /// Stamp columns that become the begin side of a span:
    /// `stamp -> beg_column`, `beg_<state> -> <state>`, `<value> -> beg_<value>`.
    pub fn spans_from_stamp_begins(layout: &SpanLayout) -> Self {
        Self::stamp_side(layout, &layout.beg_column, BEG_PREFIX).inverted()
    }

    /// Stamp columns that become the end side of a span:
    /// `stamp -> end_column`, `end_<state> -> <state>`, `<value> -> end_<value>`.
    pub fn spans_from_stamp_ends(layout: &SpanLayout) -> Self {
        Self::stamp_side(layout, &layout.end_column, END_PREFIX).inverted()
    }

    fn stamp_side(layout: &SpanLayout, ts_column: &str, prefix: &str) -> Self {
        let mut entries = vec![(ts_column.to_string(), layout.stamp_column.clone())];
        entries.extend(
            layout
                .state_columns
                .iter()
                .map(|c| (c.clone(), format!("{prefix}{c}"))),
        );
        entries.extend(
            layout
                .value_columns
                .iter()
                .map(|c| (format!("{prefix}{c}"), c.clone())),
        );
        Self { entries }
    }

    /// Same pairs with source and target swapped.
    pub fn inverted(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(s, t)| (t.clone(), s.clone()))
                .collect(),
        }
    }

    /// `(source, target)` pairs in order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Target names in order.
    pub fn targets(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, t)| t.as_str()).collect()
    }

    /// Select the source columns of `batch` under their target names.
    ///
    /// Each projected field keeps the type, nullability and metadata of its
    /// source field.
    pub fn project(&self, batch: &RecordBatch) -> ChronyResult<RecordBatch> {
        let schema = batch.schema();
        let (fields, columns): (Vec<FieldRef>, Vec<ArrayRef>) = self
            .entries
            .iter()
            .map(|(source, target)| -> ChronyResult<(FieldRef, ArrayRef)> {
                let i = schema
                    .index_of(source)
                    .ok()
                    .context(ColumnNotFoundSnafu { column: source })?;
                let field = schema.field(i).clone().with_name(target);
                Ok((Arc::new(field) as FieldRef, batch.column(i).clone()))
            })
            .collect::<ChronyResult<Vec<_>>>()?
            .into_iter()
            .unzip();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context(ArrowSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChronyError;
    use arrow::{
        array::{AsArray, Int64Array, StringArray},
        datatypes::Int64Type,
    };

    #[test]
    fn layout_orders_columns() {
        let layout = SpanLayout::new(&["state"], &["value"]);
        assert_eq!(
            layout.span_columns(),
            vec!["ts_beg", "ts_end", "state", "beg_value", "end_value"]
        );
        assert_eq!(
            layout.stamp_columns(),
            vec!["ts", "beg_state", "end_state", "value"]
        );
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout: SpanLayout =
            serde_json::from_str(r#"{"state_columns":["s"],"end_column":"stop"}"#).unwrap();
        assert_eq!(layout.beg_column, "ts_beg");
        assert_eq!(layout.end_column, "stop");
        assert_eq!(layout.stamp_column, "ts");
        assert!(layout.value_columns.is_empty());
    }

    #[test]
    fn rename_tables_mirror_each_other() {
        let layout = SpanLayout::new(&["s"], &["v"]);
        let begins = RenameTable::stamps_from_span_begins(&layout);
        assert_eq!(
            begins.entries(),
            &[
                ("ts_beg".to_string(), "ts".to_string()),
                ("s".to_string(), "beg_s".to_string()),
                ("beg_v".to_string(), "v".to_string()),
            ]
        );
        let back = RenameTable::spans_from_stamp_begins(&layout);
        assert_eq!(back, begins.inverted());
        assert_eq!(back.targets(), vec!["ts_beg", "s", "beg_v"]);
    }

    #[test]
    fn project_selects_and_renames() {
        let layout = SpanLayout::new(&["s"], &["v"]);
        let int = |v: i64| Arc::new(Int64Array::from(vec![v])) as ArrayRef;
        let batch = RecordBatch::try_from_iter_with_nullable(vec![
            ("end_v", int(2), true),
            ("beg_v", int(1), false),
            ("s", Arc::new(StringArray::from(vec!["a"])) as ArrayRef, false),
            ("ts_beg", int(0), false),
            ("ts_end", int(0), false),
        ])
        .unwrap();
        let projected = RenameTable::stamps_from_span_ends(&layout)
            .project(&batch)
            .unwrap();
        let schema = projected.schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["ts", "end_s", "v"]);
        assert!(schema.field(2).is_nullable());
        assert_eq!(projected.column(2).as_primitive::<Int64Type>().value(0), 2);

        let states_only = batch.project(&[2]).unwrap();
        assert!(matches!(
            RenameTable::stamps_from_span_ends(&layout).project(&states_only),
            Err(ChronyError::ColumnNotFound { .. })
        ));
    }
}
