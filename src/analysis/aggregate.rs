use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{SaleRecord, SeriesPoint};

/// Calendar bucket size for resampling, with the fixed forecast horizon the
/// dashboard attaches to each choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Day,
    Week,
    Month,
}

impl Interval {
    pub fn horizon(self) -> usize {
        match self {
            Interval::Day => 7,
            Interval::Week => 4,
            Interval::Month => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Interval::Day => "Día",
            Interval::Week => "Semana",
            Interval::Month => "Mes",
        }
    }

    /// Bucket label for a calendar date: the day itself, the Sunday ending
    /// its week, or the last day of its month.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Interval::Day => date,
            Interval::Week => {
                // weekday() counts Mon=0..Sun=6, so this lands on the
                // enclosing week's Sunday (a Sunday maps to itself).
                let ahead = 6 - date.weekday().num_days_from_monday() as i64;
                date + Duration::days(ahead)
            }
            Interval::Month => month_end(date),
        }
    }

    /// The bucket label immediately following `period`. Day and week steps
    /// are fixed-length; months follow the true calendar, so the step from
    /// one month-end to the next varies between 28 and 31 days. The two
    /// rules are not interchangeable.
    pub fn next(self, period: NaiveDate) -> NaiveDate {
        match self {
            Interval::Day => period + Duration::days(1),
            Interval::Week => period + Duration::days(7),
            Interval::Month => month_end(period + Duration::days(1)),
        }
    }
}

fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    // The first of a valid month always exists.
    let next_first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    next_first - Duration::days(1)
}

/// Sums raw sale records into a regular series at the requested bucket size.
///
/// Amounts are coerced from text; rows that fail coercion are dropped, they
/// never poison a bucket sum. Buckets between the first and last observed
/// label are zero-filled so the series has no gaps. Empty input (or input
/// with no parseable amount at all) yields an empty series — the caller
/// treats that as the "no data" condition.
pub fn resample(records: &[SaleRecord], interval: Interval) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    let mut dropped = 0usize;
    for record in records {
        let total = match record.total.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                dropped += 1;
                continue;
            }
        };
        *buckets.entry(interval.bucket(record.date)).or_insert(0.0) += total;
    }
    if dropped > 0 {
        tracing::warn!(dropped, "dropped rows with non-numeric totals");
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut period = first;
    while period <= last {
        series.push(SeriesPoint {
            period,
            total: buckets.get(&period).copied().unwrap_or(0.0),
        });
        period = interval.next(period);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(date: &str, total: &str) -> SaleRecord {
        SaleRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            total: total.to_string(),
            product_id: 1,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn daily_sums_pass_through_unchanged() {
        let records = vec![
            record("2024-03-01", "10"),
            record("2024-03-02", "20"),
            record("2024-03-03", "30"),
        ];
        let series = resample(&records, Interval::Day);
        assert_eq!(
            series,
            vec![
                SeriesPoint { period: date("2024-03-01"), total: 10.0 },
                SeriesPoint { period: date("2024-03-02"), total: 20.0 },
                SeriesPoint { period: date("2024-03-03"), total: 30.0 },
            ]
        );
    }

    #[test]
    fn invalid_totals_are_dropped_not_errors() {
        let records = vec![
            record("2024-03-01", "15"),
            record("2024-03-01", "bad"),
            record("2024-03-01", "25"),
        ];
        let series = resample(&records, Interval::Day);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total, 40.0);
    }

    #[test]
    fn whitespace_is_trimmed_nan_is_rejected() {
        let records = vec![
            record("2024-03-01", " 12.5 "),
            record("2024-03-01", "NaN"),
            record("2024-03-01", ""),
        ];
        let series = resample(&records, Interval::Day);
        assert_eq!(series[0].total, 12.5);
    }

    #[test]
    fn output_is_strictly_ascending_without_duplicates() {
        let records = vec![
            record("2024-03-05", "1"),
            record("2024-03-01", "2"),
            record("2024-03-05", "3"),
            record("2024-03-03", "4"),
        ];
        let series = resample(&records, Interval::Day);
        for pair in series.windows(2) {
            assert!(pair[0].period < pair[1].period);
        }
    }

    #[test]
    fn gaps_inside_the_span_are_zero_filled() {
        let records = vec![record("2024-03-01", "5"), record("2024-03-04", "5")];
        let series = resample(&records, Interval::Day);
        assert_eq!(series.len(), 4);
        assert_eq!(series[1].total, 0.0);
        assert_eq!(series[2].total, 0.0);
    }

    #[test]
    fn weekly_buckets_label_on_sunday() {
        // 2024-01-01 is a Monday; its week ends Sunday 2024-01-07.
        assert_eq!(Interval::Week.bucket(date("2024-01-01")), date("2024-01-07"));
        assert_eq!(Interval::Week.bucket(date("2024-01-07")), date("2024-01-07"));
        assert_eq!(Interval::Week.bucket(date("2024-01-08")), date("2024-01-14"));
    }

    #[test]
    fn monthly_buckets_label_on_month_end() {
        assert_eq!(Interval::Month.bucket(date("2024-02-10")), date("2024-02-29"));
        assert_eq!(Interval::Month.bucket(date("2023-02-10")), date("2023-02-28"));
        assert_eq!(Interval::Month.bucket(date("2024-12-31")), date("2024-12-31"));
    }

    #[test]
    fn weekly_resample_sums_across_the_week() {
        let records = vec![
            record("2024-01-01", "10"), // Mon
            record("2024-01-03", "20"), // Wed, same week
            record("2024-01-08", "30"), // Mon of next week
        ];
        let series = resample(&records, Interval::Week);
        assert_eq!(
            series,
            vec![
                SeriesPoint { period: date("2024-01-07"), total: 30.0 },
                SeriesPoint { period: date("2024-01-14"), total: 30.0 },
            ]
        );
    }

    #[test]
    fn resampling_is_idempotent_at_the_same_interval() {
        let records = vec![
            record("2024-01-02", "10"),
            record("2024-01-05", "20"),
            record("2024-02-11", "30"),
        ];
        for interval in [Interval::Day, Interval::Week, Interval::Month] {
            let once = resample(&records, interval);
            let as_records: Vec<SaleRecord> = once
                .iter()
                .map(|p| SaleRecord {
                    date: p.period,
                    total: p.total.to_string(),
                    product_id: 1,
                })
                .collect();
            let twice = resample(&as_records, interval);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_input_yields_empty_series() {
        assert!(resample(&[], Interval::Day).is_empty());
        let all_bad = vec![record("2024-01-01", "abc")];
        assert!(resample(&all_bad, Interval::Month).is_empty());
    }
}
