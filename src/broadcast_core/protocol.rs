//! Wire protocol: JSON messages exchanged over the WebSocket

use crate::broadcast_core::delivery::Dispatch;
use crate::broadcast_core::records::AggregationPolicy;
use crate::broadcast_core::window::Bucket;
use chrono::{NaiveDate, NaiveTime};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};

/// Inbound parameter update from a client.
///
/// Any subset of fields may be present; absent fields leave the session's
/// current parameters unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "tipoAgregacao")]
    pub tipo_agregacao: Option<AggregationPolicy>,
    pub dia: Option<NaiveDate>,
    #[serde(rename = "horaInicial", default, deserialize_with = "deserialize_hora")]
    pub hora_inicial: Option<NaiveTime>,
}

impl ClientMessage {
    /// Parse a client text frame
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Clients send `HH:MM`; accept `HH:MM:SS` too
fn deserialize_hora<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid horaInicial '{}'", raw))),
    }
}

/// Outbound dispatch to a client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Complete backfill of the active query window
    Full { dados: Vec<Bucket> },
    /// One new bucket appended since the session's delivered boundary
    Incremento { dados: Bucket },
}

impl From<Dispatch> for ServerMessage {
    fn from(dispatch: Dispatch) -> Self {
        match dispatch {
            Dispatch::Full(dados) => ServerMessage::Full { dados },
            Dispatch::Increment(dados) => ServerMessage::Incremento { dados },
        }
    }
}
