
pub mod broadcast_core;
pub mod record_source;
mod config;

use broadcast_core::scheduler::{run_broadcast_task, BroadcastEngine, EngineCommand};
use broadcast_core::server;
use config::BroadcastConfig;
use record_source::SqliteRecordSource;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = BroadcastConfig::from_env()?;

    log::info!("🚀 Starting sinalflow broadcaster");
    log::info!("   Bind address: {}", config.bind_address);
    log::info!("   Database: {}", config.db_path.display());
    log::info!("   Window width: {}min", config.window_width_minutes);
    log::info!("   Broadcast interval: {}s", config.broadcast_interval_secs);

    let source = Arc::new(SqliteRecordSource::open(&config.db_path)?);
    let engine = BroadcastEngine::new(source, config.window_width_minutes);

    let (command_tx, command_rx) = mpsc::unbounded_channel::<EngineCommand>();
    tokio::spawn(run_broadcast_task(
        engine,
        command_rx,
        config.broadcast_interval_secs,
    ));

    server::run_server(config.bind_address, command_tx).await?;

    Ok(())
}
