//! Windowing engine: fixed-width time buckets over an ordered record stream

use crate::broadcast_core::records::{AggregationPolicy, SignalCounters, SignalRecord};
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// One fixed-width time window and its aggregated, rounded counters.
///
/// `inicio` is inclusive, `fim` exclusive, and `fim - inicio` always equals
/// the configured window width. Buckets are values: built fresh per
/// aggregation pass and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub inicio: DateTime<Utc>,
    pub fim: DateTime<Utc>,
    #[serde(flatten)]
    pub counters: SignalCounters,
}

impl Bucket {
    /// Zero-filled bucket for a window with no contributing records.
    ///
    /// All counters are 0.0, never absent: downstream charts do arithmetic
    /// on every field of every bucket.
    pub fn empty(inicio: DateTime<Utc>, fim: DateTime<Utc>) -> Self {
        Bucket {
            inicio,
            fim,
            counters: SignalCounters::default(),
        }
    }
}

/// Truncate an instant to the start of its minute
pub fn floor_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::minutes(1))
        .unwrap_or(instant)
}

/// Aggregate one block of records into a bucket covering `[inicio, fim)`.
///
/// Field-wise sum; `Media` divides by the block size before rounding. Every
/// counter passes through the chart rounding rule on the way out.
pub fn aggregate_block(
    records: &[SignalRecord],
    inicio: DateTime<Utc>,
    fim: DateTime<Utc>,
    policy: AggregationPolicy,
) -> Bucket {
    if records.is_empty() {
        return Bucket::empty(inicio, fim);
    }

    let mut total = SignalCounters::default();
    for record in records {
        total.accumulate(&record.counters);
    }

    let aggregated = match policy {
        AggregationPolicy::Sum => total,
        AggregationPolicy::Media => total.scaled(records.len() as f64),
    };

    Bucket {
        inicio,
        fim,
        counters: aggregated.rounded(),
    }
}

/// Partition an ordered record sequence into contiguous fixed-width buckets.
///
/// Coverage runs from the first record's minute floor through the last
/// record's timestamp; the final bucket's `fim` may exceed the last record.
/// Windows are half-open: a record exactly on a bucket's `fim` belongs to
/// the next bucket. Windows with no records yield zero-filled buckets, so
/// the output is always gapless. An empty input is "no data", not an error,
/// and yields an empty sequence.
pub fn bucketize(
    records: &[SignalRecord],
    width: Duration,
    policy: AggregationPolicy,
) -> Vec<Bucket> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut buckets = Vec::new();
    let mut inicio = floor_to_minute(first.timestamp);

    while inicio <= last.timestamp {
        let fim = inicio + width;
        let block: Vec<SignalRecord> = records
            .iter()
            .filter(|r| r.timestamp >= inicio && r.timestamp < fim)
            .cloned()
            .collect();

        buckets.push(aggregate_block(&block, inicio, fim, policy));
        inicio = fim;
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 9, h, m, s).unwrap()
    }

    fn record(timestamp: DateTime<Utc>, alta: f64, queda: f64) -> SignalRecord {
        SignalRecord {
            timestamp,
            counters: SignalCounters {
                alta,
                queda,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let buckets = bucketize(&[], Duration::minutes(5), AggregationPolicy::Sum);
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_buckets_are_contiguous_and_gapless() {
        let records = vec![
            record(ts(9, 0, 10), 2.0, 1.0),
            record(ts(9, 7, 30), 1.0, 0.0),
            record(ts(9, 23, 5), 3.0, 2.0),
        ];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Sum);

        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets[0].inicio, ts(9, 0, 0));
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].fim, pair[1].inicio);
        }
        assert_eq!(buckets.last().unwrap().fim, ts(9, 25, 0));
    }

    #[test]
    fn test_empty_windows_are_zero_filled() {
        let records = vec![
            record(ts(9, 0, 10), 2.0, 1.0),
            record(ts(9, 23, 5), 3.0, 2.0),
        ];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Sum);

        // Windows [09:05,09:10), [09:10,09:15), [09:15,09:20) hold no records
        for bucket in &buckets[1..4] {
            assert_eq!(bucket.counters, SignalCounters::default());
            assert!(bucket.counters.alta.is_finite());
        }
    }

    #[test]
    fn test_record_on_boundary_belongs_to_next_bucket() {
        let records = vec![
            record(ts(9, 0, 0), 1.0, 0.0),
            record(ts(9, 5, 0), 10.0, 0.0),
        ];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Sum);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].counters.alta, 1.0);
        assert_eq!(buckets[1].counters.alta, 10.0);
    }

    #[test]
    fn test_final_bucket_end_may_exceed_last_record() {
        let records = vec![record(ts(9, 2, 13), 1.0, 0.0)];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Sum);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].inicio, ts(9, 2, 0));
        assert_eq!(buckets[0].fim, ts(9, 7, 0));
    }

    #[test]
    fn test_mean_of_single_record_equals_rounded_record() {
        let records = vec![record(ts(9, 1, 0), 2.4, 1.29)];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Media);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].counters.alta, 3.0); // 2.4 rounds up past 0.30
        assert_eq!(buckets[0].counters.queda, 1.0); // 1.29 truncates
    }

    #[test]
    fn test_mean_divides_by_block_size() {
        let records = vec![
            record(ts(9, 0, 10), 2.0, 0.0),
            record(ts(9, 0, 40), 4.0, 0.0),
            record(ts(9, 1, 20), 6.0, 0.0),
        ];

        let buckets = bucketize(&records, Duration::minutes(5), AggregationPolicy::Media);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].counters.alta, 4.0);
    }

    #[test]
    fn test_sum_over_disjoint_blocks_matches_concatenation() {
        let first = vec![
            record(ts(9, 0, 10), 2.0, 1.0),
            record(ts(9, 0, 40), 1.0, 3.0),
        ];
        let second = vec![record(ts(9, 6, 5), 3.0, 2.0)];
        let merged: Vec<SignalRecord> =
            first.iter().chain(second.iter()).cloned().collect();

        let a = aggregate_block(&first, ts(9, 0, 0), ts(9, 5, 0), AggregationPolicy::Sum);
        let b = aggregate_block(&second, ts(9, 5, 0), ts(9, 10, 0), AggregationPolicy::Sum);
        let whole = aggregate_block(&merged, ts(9, 0, 0), ts(9, 10, 0), AggregationPolicy::Sum);

        assert_eq!(a.counters.alta + b.counters.alta, whole.counters.alta);
        assert_eq!(a.counters.queda + b.counters.queda, whole.counters.queda);
    }

    #[test]
    fn test_bucket_serializes_flat() {
        let bucket = Bucket {
            inicio: ts(9, 0, 0),
            fim: ts(9, 5, 0),
            counters: SignalCounters {
                alta: 3.0,
                ..Default::default()
            },
        };

        let json: serde_json::Value = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["inicio"], "2025-11-09T09:00:00Z");
        assert_eq!(json["fim"], "2025-11-09T09:05:00Z");
        assert_eq!(json["alta"], 3.0);
        assert_eq!(json["rastro_acumulado"], 0.0);
    }
}
