//! Delivery bookkeeping: authoritative bucket history plus per-session cursors
//!
//! One `WindowHistory` per query window is the single source of truth for
//! what the series looks like; each session tracks how far into it it has
//! been delivered. A client joining mid-stream backfills from the history
//! instead of triggering a divergent recomputation.

use crate::broadcast_core::records::{AggregationPolicy, SignalRecord};
use crate::broadcast_core::window::{aggregate_block, bucketize, Bucket};
use chrono::{DateTime, Duration, Utc};

/// A dispatch classified for one session on one pass
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Complete backfill of the window's bucket series (may be empty when
    /// the window is ready but holds no data yet)
    Full(Vec<Bucket>),
    /// Exactly one new bucket appended past the session's delivered boundary
    Increment(Bucket),
}

/// The authoritative bucket series for one query window.
///
/// `boundary` is the `fim` of the last appended bucket and doubles as the
/// record-source cursor: only records strictly newer than it are pulled on
/// steady-state passes.
#[derive(Debug, Default)]
pub struct WindowHistory {
    buckets: Vec<Bucket>,
    boundary: Option<DateTime<Utc>>,
}

impl WindowHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn boundary(&self) -> Option<DateTime<Utc>> {
        self.boundary
    }

    /// Build the initial series over the window's full record range
    pub fn backfill(
        &mut self,
        records: &[SignalRecord],
        width: Duration,
        policy: AggregationPolicy,
    ) {
        self.buckets = bucketize(records, width, policy);
        self.boundary = self.buckets.last().map(|b| b.fim);
    }

    /// Append exactly one increment bucket from records newer than the
    /// boundary.
    ///
    /// The bucket covers `[boundary, boundary + width)` regardless of how
    /// far past it the records reach: the boundary advances one window per
    /// pass, never by wall-clock. Returns the appended bucket, or `None`
    /// when there is nothing to append.
    pub fn extend(
        &mut self,
        new_records: &[SignalRecord],
        width: Duration,
        policy: AggregationPolicy,
    ) -> Option<&Bucket> {
        let inicio = self.boundary?;
        if new_records.is_empty() {
            return None;
        }

        let fim = inicio + width;
        let bucket = aggregate_block(new_records, inicio, fim, policy);
        self.boundary = Some(bucket.fim);
        self.buckets.push(bucket);
        self.buckets.last()
    }
}

/// Per-session index into a `WindowHistory`.
///
/// Reset whenever the session's query window changes, so the next dispatch
/// is a fresh FULL for the new window.
#[derive(Debug, Default)]
pub struct DeliveryCursor {
    delivered: usize,
    backfilled: bool,
}

impl DeliveryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.delivered = 0;
        self.backfilled = false;
    }

    pub fn backfilled(&self) -> bool {
        self.backfilled
    }

    /// Classify what this session should receive given the current history.
    ///
    /// - First contact: one FULL with the entire series, empty included —
    ///   an empty FULL tells the client "no data for this window", which is
    ///   distinct from receiving nothing while parameters are unset.
    /// - Backfilled but nothing delivered yet and data has since appeared:
    ///   the real FULL (increments cannot be anchored before the first
    ///   boundary exists).
    /// - Otherwise: one INCREMENT per bucket past the delivered index, in
    ///   order. Steady state appends at most one bucket per pass, so this
    ///   is normally zero or one.
    ///
    /// Never re-emits a delivered bucket; repeated passes over an unchanged
    /// history yield FULL once and nothing thereafter.
    pub fn classify(&mut self, history: &WindowHistory) -> Vec<Dispatch> {
        let buckets = history.buckets();

        if !self.backfilled || (self.delivered == 0 && !buckets.is_empty()) {
            self.backfilled = true;
            self.delivered = buckets.len();
            return vec![Dispatch::Full(buckets.to_vec())];
        }

        let dispatches: Vec<Dispatch> = buckets[self.delivered..]
            .iter()
            .map(|b| Dispatch::Increment(b.clone()))
            .collect();
        self.delivered = buckets.len();
        dispatches
    }
}
