use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub bind_address: SocketAddr,
    pub db_path: PathBuf,
    pub window_width_minutes: i64,
    pub broadcast_interval_secs: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl BroadcastConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_raw =
            env::var("BROADCAST_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_address = bind_raw.parse::<SocketAddr>().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "BROADCAST_BIND must be a socket address, got '{}'",
                bind_raw
            ))
        })?;

        let db_path: PathBuf = env::var("SINALFLOW_DB_PATH")
            .unwrap_or_else(|_| "data/sinalflow.db".to_string())
            .into();

        let window_width_minutes = env::var("WINDOW_WIDTH_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(5);
        if window_width_minutes < 1 {
            return Err(ConfigError::InvalidValue(
                "WINDOW_WIDTH_MINUTES must be at least 1".to_string(),
            ));
        }

        let broadcast_interval_secs = env::var("BROADCAST_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);
        if broadcast_interval_secs < 1 {
            return Err(ConfigError::InvalidValue(
                "BROADCAST_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            db_path,
            window_width_minutes,
            broadcast_interval_secs,
        })
    }
}
