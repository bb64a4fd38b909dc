//! Broadcast scheduler: periodic re-pull, aggregation, and fan-out
//!
//! A single task owns the engine and drives it from two inputs: a command
//! channel fed by connection tasks and a fixed-cadence ticker. That single
//! ownership is what serializes aggregation — parameter updates arriving
//! while a pull is in flight queue in the channel and land on the next
//! pass, and a late tick is skipped rather than run concurrently.

use crate::broadcast_core::delivery::{DeliveryCursor, WindowHistory};
use crate::broadcast_core::protocol::{ClientMessage, ServerMessage};
use crate::broadcast_core::session::{SessionId, SessionParams, WindowKey};
use crate::record_source::RecordSource;
use chrono::Duration as ChronoDuration;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Commands sent by connection tasks to the owning engine task
#[derive(Debug)]
pub enum EngineCommand {
    Connect {
        id: SessionId,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    },
    Update {
        id: SessionId,
        message: ClientMessage,
    },
    Disconnect {
        id: SessionId,
    },
}

struct Session {
    params: SessionParams,
    cursor: DeliveryCursor,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

/// Owns all sessions and the per-window bucket histories
pub struct BroadcastEngine {
    source: Arc<dyn RecordSource>,
    width: ChronoDuration,
    sessions: HashMap<SessionId, Session>,
    histories: HashMap<WindowKey, WindowHistory>,
}

impl BroadcastEngine {
    pub fn new(source: Arc<dyn RecordSource>, window_width_minutes: i64) -> Self {
        Self {
            source,
            width: ChronoDuration::minutes(window_width_minutes),
            sessions: HashMap::new(),
            histories: HashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Register a session; it streams nothing until parameters arrive
    pub fn connect(&mut self, id: SessionId, outbound: mpsc::UnboundedSender<ServerMessage>) {
        self.sessions.insert(
            id,
            Session {
                params: SessionParams::new(),
                cursor: DeliveryCursor::new(),
                outbound,
            },
        );
        log::info!("🔌 session {} registered ({} active)", id, self.sessions.len());
    }

    pub fn disconnect(&mut self, id: SessionId) {
        if self.sessions.remove(&id).is_some() {
            log::info!("👋 session {} removed ({} active)", id, self.sessions.len());
        }
        self.prune_histories();
    }

    /// Apply a parameter update to one session.
    ///
    /// A message that changes the session's window key resets its cursor.
    /// When the update leaves the session ready, it is refreshed right away
    /// instead of waiting out the running tick interval — still inside the
    /// owning task, so no aggregation runs concurrently.
    pub async fn update(&mut self, id: SessionId, message: ClientMessage) {
        let session = match self.sessions.get_mut(&id) {
            Some(session) => session,
            None => return,
        };

        let previous_key = session.params.window_key();
        session.params.apply(&message);
        let current_key = session.params.window_key();

        if current_key != previous_key {
            session.cursor.reset();
        }
        let needs_refresh = current_key != previous_key || !session.cursor.backfilled();

        if let Some(key) = current_key {
            if needs_refresh {
                log::info!("🛰️  session {} now following {}", id, key);
                if self.refresh_key(&key).await {
                    self.dispatch_key(&key);
                }
            }
        }

        self.prune_histories();
    }

    /// One scheduler tick: re-pull and fan out every window with viewers
    pub async fn run_tick(&mut self) {
        let keys: HashSet<WindowKey> = self
            .sessions
            .values()
            .filter_map(|s| s.params.window_key())
            .collect();

        for key in keys {
            if self.refresh_key(&key).await {
                self.dispatch_key(&key);
            }
        }

        self.prune_histories();
    }

    /// Pull new records for a window and fold them into its history.
    ///
    /// Returns false on a pull failure: the failure is logged, cursors stay
    /// untouched, and the window is retried on the next tick.
    async fn refresh_key(&mut self, key: &WindowKey) -> bool {
        let since = self.histories.get(key).and_then(|h| h.boundary());
        let source = Arc::clone(&self.source);

        let records = match source.fetch_records(key.dia, key.hora_inicial, since).await {
            Ok(records) => records,
            Err(e) => {
                log::error!("❌ record pull failed for {}: {}", key, e);
                return false;
            }
        };

        let history = self.histories.entry(key.clone()).or_default();

        if history.boundary().is_none() {
            if !records.is_empty() {
                history.backfill(&records, self.width, key.policy);
                log::info!(
                    "📊 backfilled {} with {} buckets",
                    key,
                    history.buckets().len()
                );
            }
        } else if let Some(bucket) = history.extend(&records, self.width, key.policy) {
            log::info!(
                "📈 appended increment [{} .. {}] to {}",
                bucket.inicio.format("%H:%M"),
                bucket.fim.format("%H:%M"),
                key
            );
        }

        true
    }

    /// Classify and send pending dispatches to every session on a window.
    ///
    /// Sends are independent and best-effort: a session whose channel has
    /// closed is skipped silently and reaped on disconnect; it never blocks
    /// or aborts delivery to the rest.
    fn dispatch_key(&mut self, key: &WindowKey) {
        let history = match self.histories.get(key) {
            Some(history) => history,
            None => return,
        };

        for (id, session) in self.sessions.iter_mut() {
            if session.params.window_key().as_ref() != Some(key) {
                continue;
            }

            for dispatch in session.cursor.classify(history) {
                let message = ServerMessage::from(dispatch);
                if session.outbound.send(message).is_err() {
                    log::debug!("session {} unreachable, skipping send", id);
                    break;
                }
            }
        }
    }

    /// Drop histories no session follows anymore
    fn prune_histories(&mut self) {
        let active: HashSet<WindowKey> = self
            .sessions
            .values()
            .filter_map(|s| s.params.window_key())
            .collect();
        self.histories.retain(|key, _| active.contains(key));
    }
}

/// Run the engine until every command sender is gone.
///
/// The first (immediate) interval tick is skipped; ready sessions are
/// served through the command path instead, so nobody waits a full period
/// for their backfill.
pub async fn run_broadcast_task(
    mut engine: BroadcastEngine,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    interval_secs: u64,
) {
    log::info!("⏰ Starting broadcast scheduler (interval: {}s)", interval_secs);

    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(EngineCommand::Connect { id, outbound }) => engine.connect(id, outbound),
                Some(EngineCommand::Update { id, message }) => engine.update(id, message).await,
                Some(EngineCommand::Disconnect { id }) => engine.disconnect(id),
                None => {
                    log::info!("⏹️  command channel closed, stopping scheduler");
                    break;
                }
            },
            _ = ticker.tick() => {
                engine.run_tick().await;
            }
        }
    }
}
