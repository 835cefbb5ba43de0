#![allow(missing_docs)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use chrony_core::{
    ChronyError,
    columns::timestamp_array,
    holes::{cut, cut_fixed_size, describe_series, fill_data, find_holes},
    interpolate::weighted_interpolate,
    series::{Series, audit, diagnose, trim},
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn september() -> Result<Vec<NaiveDateTime>, &'static str> {
    let first = NaiveDate::from_ymd_opt(2015, 9, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or("invalid date")?;
    Ok((0..30).map(|i| first + TimeDelta::days(i)).collect())
}

fn wave(missing: &[usize]) -> Result<Series, Box<dyn std::error::Error>> {
    let values = (0..30)
        .map(|i| {
            let x = 4.0 * std::f64::consts::PI * i as f64 / 30.0;
            (!missing.contains(&i)).then_some(x.sin())
        })
        .collect();
    Ok(Series::new(september()?, values)?)
}

#[test]
fn interior_holes_of_a_daily_series() -> TestResult {
    let series = wave(&[4, 5, 6, 10, 20, 21])?;
    audit(&series)?;

    let holes = find_holes(&series)?;
    let spans: Vec<_> = holes
        .iter()
        .map(|h| (h.first_missing(), h.length))
        .collect();
    assert_eq!(spans, vec![(4, 3), (10, 1), (20, 2)]);
    assert_eq!(holes[0].ts_beg, september()?[4]);
    assert_eq!(holes[0].ts_end, september()?[6]);
    Ok(())
}

#[test]
fn trim_fill_cut_and_window() -> TestResult {
    let series = wave(&[4, 5, 6, 10, 20, 21, 27, 28, 29])?;
    assert!(diagnose(&series).is_empty());
    // The trailing run is not a hole until trimmed away.
    assert_eq!(find_holes(&series)?.len(), 3);

    let trimmed = trim(&series)?;
    assert_eq!(trimmed.len(), 27);
    assert_eq!(trimmed.timestamps().last(), september()?.get(26));

    let filled = fill_data(&trimmed, 2)?;
    assert_eq!(filled.missing_count(), 3);
    let summary = describe_series(&filled)?;
    assert_eq!(summary.holes, 1);
    assert_eq!(summary.time_step, Some(TimeDelta::days(1)));
    assert_eq!(summary.hole_sizes.map(|s| s.max), Some(3.0));

    let pieces = cut(&filled, 2)?;
    let lengths: Vec<_> = pieces.iter().map(Series::len).collect();
    assert_eq!(lengths, vec![4, 20]);

    assert!(cut_fixed_size(&pieces[0], 6, 3)?.is_empty());
    let windows = cut_fixed_size(&pieces[1], 6, 3)?;
    assert_eq!(windows.len(), 2 + (20 - 6) / 3);
    assert_eq!(windows.last().map(|w| w.timestamps()[0]), Some(pieces[1].timestamps()[14]));
    Ok(())
}

#[test]
fn windows_require_a_filled_series() -> TestResult {
    let series = wave(&[10])?;
    assert!(matches!(
        cut_fixed_size(&series, 6, 3),
        Err(ChronyError::UnfilledHoles { missing: 1 })
    ));
    let windows = cut_fixed_size(&fill_data(&series, 1)?, 6, 3)?;
    assert_eq!(windows.len(), 10);
    Ok(())
}

#[test]
fn series_from_a_batch_with_weights() -> TestResult {
    let ts = september()?;
    let values = Float64Array::from(vec![Some(0.0), None, None, None, Some(8.0)]);
    let batch = RecordBatch::try_from_iter(vec![
        ("ts", Arc::new(timestamp_array("ts", &ts[..5], None)?) as ArrayRef),
        ("val", Arc::new(values) as ArrayRef),
    ])?;
    let series = Series::from_batch(&batch, "ts", "val")?;
    audit(&series)?;

    let out = weighted_interpolate(&series, &[0.0, 1.0, 1.0, 2.0, 0.0])?;
    assert_eq!(
        out.values(),
        &[Some(0.0), Some(2.0), Some(4.0), Some(8.0), Some(8.0)]
    );
    assert_eq!(out.to_batch("ts", "val")?.num_rows(), 5);
    Ok(())
}

#[test]
fn all_missing_series_is_rejected() -> TestResult {
    let series = wave(&(0..30).collect::<Vec<_>>())?;
    assert!(matches!(audit(&series), Err(ChronyError::MissingData { len: 30 })));
    assert!(matches!(trim(&series), Err(ChronyError::MissingData { .. })));
    assert!(matches!(fill_data(&series, 30), Err(ChronyError::MissingData { .. })));
    Ok(())
}
