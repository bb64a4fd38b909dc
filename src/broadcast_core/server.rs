//! WebSocket server: accept loop and per-connection tasks
//!
//! Each connection registers a session with the engine, forwards inbound
//! parameter messages, and drains its outbound channel into the socket from
//! a dedicated writer task. Connections are fully independent: a slow or
//! dead socket only ever stalls its own writer.

use crate::broadcast_core::protocol::ClientMessage;
use crate::broadcast_core::scheduler::EngineCommand;
use crate::broadcast_core::session::SessionId;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Accept WebSocket clients forever
pub async fn run_server(
    bind_address: SocketAddr,
    commands: mpsc::UnboundedSender<EngineCommand>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(bind_address).await?;
    log::info!("🌐 WebSocket server listening on {}", bind_address);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                log::warn!("⚠️  accept failed: {}", e);
                continue;
            }
        };

        let commands = commands.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, commands).await {
                log::debug!("connection {} ended: {}", peer, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    commands: mpsc::UnboundedSender<EngineCommand>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws_stream = accept_async(stream).await?;
    let id: SessionId = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    log::info!("🔗 client connected from {} (session {})", peer, id);

    let (mut sink, mut reader) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    if commands
        .send(EngineCommand::Connect {
            id,
            outbound: outbound_tx,
        })
        .is_err()
    {
        // Scheduler is gone; nothing to serve
        return Ok(());
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let payload = match serde_json::to_string(&message) {
                Ok(payload) => payload,
                Err(e) => {
                    log::error!("❌ failed to serialize dispatch: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                Ok(message) => {
                    let _ = commands.send(EngineCommand::Update { id, message });
                }
                Err(e) => {
                    log::warn!("⚠️  ignoring malformed message from session {}: {}", id, e);
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary: nothing to do
            Err(e) => {
                log::debug!("session {} transport error: {}", id, e);
                break;
            }
        }
    }

    let _ = commands.send(EngineCommand::Disconnect { id });
    writer.abort();
    log::info!("🔌 client disconnected (session {})", id);
    Ok(())
}
