//! Quarter buckets and year series
//!
//! A bucket keeps a running sum per quarter plus whether that quarter ever saw
//! a real value. Only populated quarters are emitted, in Q1..Q4 order, and a
//! year with none is dropped from the series instead of showing up empty.

use calamine::Data;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{IngestError, Result};

pub const QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

/// Four positional quarter values from one row; `None` is an empty cell
pub type QuarterValues = [Option<f64>; 4];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuarterBucket {
    totals: [f64; 4],
    populated: [bool; 4],
}

impl QuarterBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every present value to its quarter. Repeated contributions sum.
    pub fn accumulate(&mut self, values: QuarterValues) {
        for (i, value) in values.iter().enumerate() {
            if let Some(v) = value {
                self.totals[i] += v;
                self.populated[i] = true;
            }
        }
    }

    /// Populated quarter totals in Q1..Q4 order
    pub fn materialize(&self) -> Vec<f64> {
        self.totals
            .iter()
            .zip(self.populated.iter())
            .filter(|(_, &populated)| populated)
            .map(|(&total, _)| total)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.populated.iter().any(|&p| p)
    }

    pub fn total(&self, quarter: usize) -> Option<f64> {
        if quarter < 4 && self.populated[quarter] {
            Some(self.totals[quarter])
        } else {
            None
        }
    }
}

/// One `{year, data}` entry of a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: i32,
    pub data: Vec<f64>,
}

pub type YearSeries = Vec<YearPoint>;

/// Buckets for a fixed set of known years
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearBuckets {
    buckets: BTreeMap<i32, QuarterBucket>,
}

impl YearBuckets {
    pub fn new(years: &[i32]) -> Self {
        Self {
            buckets: years.iter().map(|&y| (y, QuarterBucket::new())).collect(),
        }
    }

    /// Returns false when `year` is not one of the known years
    pub fn accumulate(&mut self, year: i32, values: QuarterValues) -> bool {
        match self.buckets.get_mut(&year) {
            Some(bucket) => {
                bucket.accumulate(values);
                true
            }
            None => false,
        }
    }

    pub fn bucket(&self, year: i32) -> Option<&QuarterBucket> {
        self.buckets.get(&year)
    }

    /// Ascending by year; empty years omitted
    pub fn series(&self) -> YearSeries {
        self.buckets
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(&year, bucket)| YearPoint {
                year,
                data: bucket.materialize(),
            })
            .collect()
    }
}

/// Convert one quarter cell. Empty and blank cells are `None`.
pub fn quarter_value(cell: &Data, column: &str) -> Result<Option<f64>> {
    let malformed = |value: String| IngestError::MalformedQuantity {
        column: column.to_string(),
        value,
    };

    match cell {
        Data::Empty => Ok(None),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::Float(f) if f.is_finite() => Ok(Some(*f)),
        Data::Float(f) => Err(malformed(f.to_string())),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Some)
                .ok_or_else(|| malformed(s.clone()))
        }
        other => Err(malformed(other.to_string())),
    }
}

/// Convert all four quarter cells of a row before any of them is used, so a
/// bad cell leaves the row contributing nothing.
pub fn quarter_values(cells: &[Data; 4]) -> Result<QuarterValues> {
    let mut values = [None; 4];
    for (i, cell) in cells.iter().enumerate() {
        values[i] = quarter_value(cell, QUARTERS[i])?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // BUCKET TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_materialize_skips_unpopulated_quarters() {
        let mut bucket = QuarterBucket::new();
        bucket.accumulate([Some(10.0), None, Some(5.0), None]);
        assert_eq!(bucket.materialize(), vec![10.0, 5.0]);
    }

    #[test]
    fn test_contributions_sum() {
        let mut bucket = QuarterBucket::new();
        bucket.accumulate([Some(3.0), None, None, None]);
        bucket.accumulate([Some(3.0), None, None, None]);
        assert_eq!(bucket.total(0), Some(6.0));
        assert_eq!(bucket.materialize(), vec![6.0]);
    }

    #[test]
    fn test_zero_is_a_real_value() {
        let mut bucket = QuarterBucket::new();
        bucket.accumulate([None, Some(0.0), None, None]);
        assert!(!bucket.is_empty());
        assert_eq!(bucket.materialize(), vec![0.0]);
    }

    #[test]
    fn test_empty_bucket() {
        let mut bucket = QuarterBucket::new();
        bucket.accumulate([None, None, None, None]);
        assert!(bucket.is_empty());
        assert!(bucket.materialize().is_empty());
        assert_eq!(bucket.total(2), None);
        assert_eq!(bucket.total(9), None);
    }

    #[test]
    fn test_quarter_order_is_fixed() {
        let mut bucket = QuarterBucket::new();
        bucket.accumulate([None, None, None, Some(4.0)]);
        bucket.accumulate([Some(1.0), None, None, None]);
        assert_eq!(bucket.materialize(), vec![1.0, 4.0]);
    }

    // -------------------------------------------------------------------------
    // YEAR SERIES TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_series_omits_empty_years() {
        let mut years = YearBuckets::new(&[2024, 2025]);
        years.accumulate(2025, [Some(10.0), Some(20.0), None, None]);
        years.accumulate(2024, [None, None, None, None]);

        assert_eq!(
            years.series(),
            vec![YearPoint {
                year: 2025,
                data: vec![10.0, 20.0]
            }]
        );
    }

    #[test]
    fn test_series_is_ordered_by_year() {
        let mut years = YearBuckets::new(&[2025, 2024]);
        years.accumulate(2025, [Some(1.0), None, None, None]);
        years.accumulate(2024, [Some(2.0), None, None, None]);
        let order: Vec<i32> = years.series().iter().map(|p| p.year).collect();
        assert_eq!(order, vec![2024, 2025]);
    }

    #[test]
    fn test_unknown_year_is_rejected() {
        let mut years = YearBuckets::new(&[2024, 2025]);
        assert!(!years.accumulate(2023, [Some(1.0), None, None, None]));
        assert!(years.series().is_empty());
        assert!(years.bucket(2023).is_none());
    }

    #[test]
    fn test_series_serializes_as_year_data() {
        let mut years = YearBuckets::new(&[2025]);
        years.accumulate(2025, [Some(10.0), Some(20.0), None, None]);
        assert_eq!(
            serde_json::to_string(&years.series()).unwrap(),
            r#"[{"year":2025,"data":[10.0,20.0]}]"#
        );
    }

    // -------------------------------------------------------------------------
    // CELL CONVERSION TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_quarter_value_numbers() {
        assert_eq!(quarter_value(&Data::Int(7), "Q1").unwrap(), Some(7.0));
        assert_eq!(quarter_value(&Data::Float(2.5), "Q1").unwrap(), Some(2.5));
        assert_eq!(
            quarter_value(&Data::String(" 12 ".to_string()), "Q1").unwrap(),
            Some(12.0)
        );
    }

    #[test]
    fn test_quarter_value_blanks() {
        assert_eq!(quarter_value(&Data::Empty, "Q1").unwrap(), None);
        assert_eq!(quarter_value(&Data::String("  ".to_string()), "Q1").unwrap(), None);
    }

    #[test]
    fn test_quarter_value_malformed() {
        let err = quarter_value(&Data::String("n/a".to_string()), "Q3").unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedQuantity { ref column, ref value } if column == "Q3" && value == "n/a"
        ));
        assert!(quarter_value(&Data::Bool(true), "Q1").is_err());
        assert!(quarter_value(&Data::String("NaN".to_string()), "Q1").is_err());
    }

    #[test]
    fn test_quarter_values_all_or_nothing() {
        let cells = [
            Data::Float(1.0),
            Data::String("oops".to_string()),
            Data::Empty,
            Data::Int(4),
        ];
        assert!(quarter_values(&cells).is_err());

        let cells = [Data::Float(1.0), Data::Empty, Data::Empty, Data::Int(4)];
        assert_eq!(quarter_values(&cells).unwrap(), [Some(1.0), None, None, Some(4.0)]);
    }
}
