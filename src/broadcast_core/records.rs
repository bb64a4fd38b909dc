//! Signal snapshot records and the shared counter block

use crate::broadcast_core::rounding::round_chart_value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The eight numeric counters carried by every snapshot and every bucket.
///
/// Aggregation is strictly field-wise; no counter depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalCounters {
    pub alta: f64,
    pub queda: f64,
    pub neutro: f64,
    pub acumulado_alta: f64,
    pub acumulado_queda: f64,
    pub acumulado_neutro: f64,
    pub rastro_parcial: f64,
    pub rastro_acumulado: f64,
}

impl SignalCounters {
    /// Add another counter block into this one, field by field
    pub fn accumulate(&mut self, other: &SignalCounters) {
        self.alta += other.alta;
        self.queda += other.queda;
        self.neutro += other.neutro;
        self.acumulado_alta += other.acumulado_alta;
        self.acumulado_queda += other.acumulado_queda;
        self.acumulado_neutro += other.acumulado_neutro;
        self.rastro_parcial += other.rastro_parcial;
        self.rastro_acumulado += other.rastro_acumulado;
    }

    /// Divide every field by `divisor` (mean aggregation)
    pub fn scaled(&self, divisor: f64) -> SignalCounters {
        SignalCounters {
            alta: self.alta / divisor,
            queda: self.queda / divisor,
            neutro: self.neutro / divisor,
            acumulado_alta: self.acumulado_alta / divisor,
            acumulado_queda: self.acumulado_queda / divisor,
            acumulado_neutro: self.acumulado_neutro / divisor,
            rastro_parcial: self.rastro_parcial / divisor,
            rastro_acumulado: self.rastro_acumulado / divisor,
        }
    }

    /// Pass every field through the chart rounding rule
    pub fn rounded(&self) -> SignalCounters {
        SignalCounters {
            alta: round_chart_value(self.alta),
            queda: round_chart_value(self.queda),
            neutro: round_chart_value(self.neutro),
            acumulado_alta: round_chart_value(self.acumulado_alta),
            acumulado_queda: round_chart_value(self.acumulado_queda),
            acumulado_neutro: round_chart_value(self.acumulado_neutro),
            rastro_parcial: round_chart_value(self.rastro_parcial),
            rastro_acumulado: round_chart_value(self.rastro_acumulado),
        }
    }
}

/// One persisted market-signal snapshot, immutable once produced.
///
/// Supplied by the record source ordered ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub counters: SignalCounters,
}

/// How a bucket's value is derived from its contributing records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationPolicy {
    #[serde(rename = "media")]
    Media,
    #[serde(rename = "sum")]
    Sum,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy::Media
    }
}

impl AggregationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationPolicy::Media => "media",
            AggregationPolicy::Sum => "sum",
        }
    }
}
