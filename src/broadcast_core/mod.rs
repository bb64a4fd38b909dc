//! Broadcast Core - Windowed Aggregation & Incremental Delivery
//!
//! Turns a growing stream of market-signal snapshots into a smoothly
//! updating chart feed for any number of WebSocket viewers.
//!
//! # Architecture
//!
//! ```text
//! RecordSource (SQLite) → bucketize / aggregate_block (window.rs)
//!     ↓
//! round_chart_value (0.30-threshold snapping)
//!     ↓
//! WindowHistory per query window + DeliveryCursor per session (delivery.rs)
//!     ↓
//! BroadcastEngine tick loop (scheduler.rs)
//!     ↓
//! WebSocket fan-out, {tipo: full | incremento} frames (server.rs)
//! ```

pub mod delivery;
pub mod protocol;
pub mod records;
pub mod rounding;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod window;

pub use delivery::{DeliveryCursor, Dispatch, WindowHistory};
pub use protocol::{ClientMessage, ServerMessage};
pub use records::{AggregationPolicy, SignalCounters, SignalRecord};
pub use rounding::round_chart_value;
pub use scheduler::{run_broadcast_task, BroadcastEngine, EngineCommand};
pub use session::{SessionId, SessionParams, WindowKey};
pub use window::{aggregate_block, bucketize, floor_to_minute, Bucket};
