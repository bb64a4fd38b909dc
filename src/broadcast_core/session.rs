//! Per-session query parameters
//!
//! Every connection owns its parameters and delivery cursor; one client
//! changing its view never redirects what other clients receive. Sessions
//! with identical parameters share one authoritative bucket history, keyed
//! by `WindowKey`.

use crate::broadcast_core::protocol::ClientMessage;
use crate::broadcast_core::records::AggregationPolicy;
use chrono::{NaiveDate, NaiveTime};

pub type SessionId = u64;

/// Identifies the query window a session is following.
///
/// The policy participates: a mean/sum switch changes every value in the
/// series, so it re-keys (and re-backfills) rather than splicing increments
/// from a different series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub dia: NaiveDate,
    pub hora_inicial: NaiveTime,
    pub policy: AggregationPolicy,
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.dia,
            self.hora_inicial.format("%H:%M"),
            self.policy.as_str()
        )
    }
}

/// Current parameters for one session.
///
/// A session streams nothing until both `dia` and `hora_inicial` are set;
/// the aggregation policy defaults to mean, as the observed clients assume.
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    pub policy: Option<AggregationPolicy>,
    pub dia: Option<NaiveDate>,
    pub hora_inicial: Option<NaiveTime>,
}

impl SessionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite whichever parameters the message carries; absent fields
    /// stay as they are. Last write wins per field.
    pub fn apply(&mut self, message: &ClientMessage) {
        if let Some(policy) = message.tipo_agregacao {
            self.policy = Some(policy);
        }
        if let Some(dia) = message.dia {
            self.dia = Some(dia);
        }
        if let Some(hora_inicial) = message.hora_inicial {
            self.hora_inicial = Some(hora_inicial);
        }
    }

    /// The window this session follows, once both day and start time are set
    pub fn window_key(&self) -> Option<WindowKey> {
        Some(WindowKey {
            dia: self.dia?,
            hora_inicial: self.hora_inicial?,
            policy: self.policy.unwrap_or_default(),
        })
    }
}
