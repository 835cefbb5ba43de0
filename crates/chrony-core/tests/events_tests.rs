#![allow(missing_docs)]

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, AsArray, Int64Array, RecordBatch},
    datatypes::{DataType, DurationNanosecondType, Field},
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use chrony_core::{
    columns::{column, naive_timestamps, timestamp_array, with_column},
    events::{
        TIME_SINCE_PREVIOUS, TIME_TO_NEXT, add_time_between_events, merge_overlapping_events,
        merge_overlapping_events_kind,
    },
    timespan::audit_timespan,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;
type Bounds = Vec<(NaiveDateTime, NaiveDateTime)>;
type Fallible<T> = Result<T, Box<dyn std::error::Error>>;

fn at(h: u32, m: u32, s: u32) -> Result<NaiveDateTime, &'static str> {
    NaiveDate::from_ymd_opt(2014, 9, 12)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .ok_or("invalid time")
}

fn hm(h: u32, m: u32) -> Result<NaiveDateTime, &'static str> {
    at(h, m, 0)
}

fn events(begs: Vec<NaiveDateTime>, ends: Vec<NaiveDateTime>) -> Fallible<RecordBatch> {
    Ok(RecordBatch::try_from_iter(vec![
        ("ts_beg", Arc::new(timestamp_array("ts_beg", &begs, None)?) as ArrayRef),
        ("ts_end", Arc::new(timestamp_array("ts_end", &ends, None)?) as ArrayRef),
    ])?)
}

fn bounds(batch: &RecordBatch) -> Fallible<Bounds> {
    let b = naive_timestamps("ts_beg", column(batch, "ts_beg")?.as_ref())?;
    let e = naive_timestamps("ts_end", column(batch, "ts_end")?.as_ref())?;
    Ok(b.into_iter().zip(e).collect())
}

fn with_ints(batch: RecordBatch, name: &str, values: Vec<i64>) -> Fallible<RecordBatch> {
    let field = Field::new(name, DataType::Int64, false);
    Ok(with_column(&batch, field, Arc::new(Int64Array::from(values)))?)
}

fn durations(batch: &RecordBatch, name: &str) -> Fallible<Vec<Option<i64>>> {
    Ok(column(batch, name)?
        .as_primitive::<DurationNanosecondType>()
        .iter()
        .collect())
}

fn minutes(m: i64) -> Option<i64> {
    TimeDelta::minutes(m).num_nanoseconds()
}

fn evening() -> Fallible<RecordBatch> {
    events(
        vec![
            hm(12, 0)?,
            hm(13, 0)?,
            hm(14, 0)?,
            hm(15, 0)?,
            hm(22, 0)?,
            hm(23, 15)?,
            hm(23, 46)?,
        ],
        vec![
            hm(12, 30)?,
            hm(15, 30)?,
            hm(15, 0)?,
            hm(16, 0)?,
            hm(23, 0)?,
            hm(23, 16)?,
            hm(23, 50)?,
        ],
    )
}

fn hourly() -> Fallible<RecordBatch> {
    let begs = (12..=20).map(|h| hm(h, 0)).collect::<Result<Vec<_>, _>>()?;
    let ends = (13..=21).map(|h| at(h, 0, 1)).collect::<Result<Vec<_>, _>>()?;
    events(begs, ends)
}

fn five_categorized() -> Fallible<RecordBatch> {
    let batch = events(
        vec![hm(12, 0)?, hm(13, 0)?, hm(14, 0)?, hm(15, 0)?, hm(17, 0)?],
        vec![hm(12, 30)?, hm(15, 30)?, hm(15, 0)?, hm(17, 1)?, hm(18, 0)?],
    )?;
    with_ints(batch, "category", vec![1, 1, 1, 2, 2])
}

#[test]
fn overlapping_chain_collapses_and_result_audits_clean() -> TestResult {
    let merged = merge_overlapping_events(&evening()?, "ts_beg", "ts_end")?;
    assert_eq!(
        bounds(&merged)?,
        vec![
            (hm(12, 0)?, hm(12, 30)?),
            (hm(13, 0)?, hm(16, 0)?),
            (hm(22, 0)?, hm(23, 0)?),
            (hm(23, 15)?, hm(23, 16)?),
            (hm(23, 46)?, hm(23, 50)?),
        ]
    );
    audit_timespan(column(&merged, "ts_beg")?, column(&merged, "ts_end")?)?;
    assert_eq!(merge_overlapping_events(&merged, "ts_beg", "ts_end")?, merged);
    Ok(())
}

type Span = ((u32, u32), (u32, u32));

fn from_spans(spans: &[Span]) -> Fallible<RecordBatch> {
    let begs = spans.iter().map(|(b, _)| hm(b.0, b.1)).collect::<Result<_, _>>()?;
    let ends = spans.iter().map(|(_, e)| hm(e.0, e.1)).collect::<Result<_, _>>()?;
    events(begs, ends)
}

#[test]
fn merging_is_idempotent() -> TestResult {
    let cases: [(&str, &[Span], &[Span]); 5] = [
        (
            "unsorted input",
            &[((15, 0), (16, 0)), ((12, 0), (12, 30)), ((14, 0), (15, 30))],
            &[((12, 0), (12, 30)), ((14, 0), (16, 0))],
        ),
        (
            "equal begins",
            &[((10, 0), (10, 30)), ((10, 0), (11, 0)), ((10, 0), (10, 15))],
            &[((10, 0), (11, 0))],
        ),
        (
            "nested intervals",
            &[((9, 0), (17, 0)), ((10, 0), (11, 0)), ((12, 0), (13, 0))],
            &[((9, 0), (17, 0))],
        ),
        (
            "touching intervals",
            &[((12, 0), (13, 0)), ((13, 0), (14, 0))],
            &[((12, 0), (13, 0)), ((13, 0), (14, 0))],
        ),
        (
            "single event",
            &[((12, 0), (12, 30))],
            &[((12, 0), (12, 30))],
        ),
    ];
    for (name, input, expected) in cases {
        let once = merge_overlapping_events(&from_spans(input)?, "ts_beg", "ts_end")?;
        assert_eq!(bounds(&once)?, bounds(&from_spans(expected)?)?, "{name}");
        audit_timespan(column(&once, "ts_beg")?, column(&once, "ts_end")?)?;
        let twice = merge_overlapping_events(&once, "ts_beg", "ts_end")?;
        assert_eq!(twice, once, "{name}");
    }
    Ok(())
}

#[test]
fn one_second_overlaps_chain_the_whole_day() -> TestResult {
    let merged = merge_overlapping_events(&hourly()?, "ts_beg", "ts_end")?;
    assert_eq!(bounds(&merged)?, vec![(hm(12, 0)?, at(21, 0, 1)?)]);
    Ok(())
}

#[test]
fn categories_merge_separately() -> TestResult {
    let cats: Vec<i64> = (0..9).map(|i| if i < 5 { 1 } else { 2 }).collect();
    let batch = with_ints(hourly()?, "category", cats)?;
    let merged = merge_overlapping_events_kind(&batch, "ts_beg", "ts_end", &["category"])?;
    assert_eq!(
        bounds(&merged)?,
        vec![(hm(12, 0)?, at(17, 0, 1)?), (hm(17, 0)?, at(21, 0, 1)?)]
    );

    let merged =
        merge_overlapping_events_kind(&five_categorized()?, "ts_beg", "ts_end", &["category"])?;
    assert_eq!(
        bounds(&merged)?,
        vec![
            (hm(12, 0)?, hm(12, 30)?),
            (hm(13, 0)?, hm(15, 30)?),
            (hm(15, 0)?, hm(18, 0)?),
        ]
    );
    Ok(())
}

#[test]
fn gaps_between_merged_events_per_category() -> TestResult {
    let merged =
        merge_overlapping_events_kind(&five_categorized()?, "ts_beg", "ts_end", &["category"])?;
    let out = add_time_between_events(&merged, "ts_beg", "ts_end", &["category"])?;

    assert_eq!(durations(&out, TIME_SINCE_PREVIOUS)?, vec![None, minutes(30), None]);
    assert_eq!(durations(&out, TIME_TO_NEXT)?, vec![minutes(30), None, None]);
    Ok(())
}

#[test]
fn gaps_with_two_kind_columns() -> TestResult {
    let batch = with_ints(evening()?, "category", vec![1; 7])?;
    let batch = with_ints(batch, "subcategory", vec![1, 1, 1, 2, 2, 2, 2])?;
    let kind = ["category", "subcategory"];
    let merged = merge_overlapping_events_kind(&batch, "ts_beg", "ts_end", &kind)?;
    assert_eq!(merged.num_rows(), 6);

    let out = add_time_between_events(&merged, "ts_beg", "ts_end", &kind)?;
    assert_eq!(
        durations(&out, TIME_SINCE_PREVIOUS)?,
        vec![None, minutes(30), None, minutes(360), minutes(15), minutes(30)]
    );
    assert_eq!(
        durations(&out, TIME_TO_NEXT)?,
        vec![minutes(30), None, minutes(360), minutes(15), minutes(30), None]
    );
    Ok(())
}
