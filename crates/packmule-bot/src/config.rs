//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use packmule_core::AuthStore;
use packmule_nostr::Keys;

/// Relays used when `RELAYS` is not set.
const DEFAULT_RELAYS: [&str; 3] = [
    "wss://relay.damus.io",
    "wss://nos.lol",
    "wss://relay.nostr.band",
];

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot identity keys.
    pub keys: Keys,
    /// Relay endpoints to publish and subscribe on.
    pub relays: Vec<String>,
    /// Shared unlock code senders must present once.
    pub unlock_code: String,
    /// Root directory for completed downloads.
    pub save_dir: PathBuf,
    /// aria2 JSON-RPC endpoint.
    pub aria2_endpoint: String,
    /// Bind address for the status dashboard.
    pub dashboard_addr: SocketAddr,
    /// Bind address for the download file server.
    pub file_addr: SocketAddr,
    /// Cadence of the public stats note.
    pub stats_interval: Duration,
    /// Maximum accepted age of an inbound event.
    pub event_window: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BOT_PRIVKEY` | Bot secret key (hex or nsec) | (generated) |
    /// | `RELAYS` | Comma-separated relay URLs | damus.io, nos.lol, nostr.band |
    /// | `UNLOCK_CODE` | Shared unlock code | (generated) |
    /// | `SAVE_DIR` | Download directory | `$TMPDIR/packmule` |
    /// | `ARIA2_RPC_URL` | aria2 JSON-RPC endpoint | `http://localhost:6800/jsonrpc` |
    /// | `DASHBOARD_ADDR` | Status dashboard bind address | `127.0.0.1:6798` |
    /// | `FILES_ADDR` | File server bind address | `0.0.0.0:6799` |
    /// | `STATS_INTERVAL_SECS` | Public stats note cadence | `1500` (25 min) |
    /// | `EVENT_WINDOW_SECS` | Max inbound event age | `120` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let keys = match env::var("BOT_PRIVKEY") {
            Ok(raw) => Keys::parse(&raw).map_err(|_| ConfigError::InvalidPrivkey)?,
            Err(_) => Keys::generate(),
        };

        let relays = match env::var("RELAYS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect(),
        };

        let unlock_code =
            env::var("UNLOCK_CODE").unwrap_or_else(|_| AuthStore::generate_code());

        let save_dir = env::var("SAVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("packmule"));

        let aria2_endpoint = env::var("ARIA2_RPC_URL")
            .unwrap_or_else(|_| "http://localhost:6800/jsonrpc".to_string());

        let dashboard_addr = env::var("DASHBOARD_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:6798".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr("DASHBOARD_ADDR"))?;

        let file_addr = env::var("FILES_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:6799".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr("FILES_ADDR"))?;

        let stats_interval = duration_var("STATS_INTERVAL_SECS", 25 * 60)?;
        let event_window = duration_var("EVENT_WINDOW_SECS", 120)?;

        Ok(Self {
            keys,
            relays,
            unlock_code,
            save_dir,
            aria2_endpoint,
            dashboard_addr,
            file_addr,
            stats_interval,
            event_window,
        })
    }
}

fn duration_var(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_duration_secs(name, &raw),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Both intervals feed timers, and a zero period is not a valid timer
/// cadence, so zero is rejected along with non-numeric input.
fn parse_duration_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidDuration(name)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BOT_PRIVKEY is not a valid hex or nsec secret key")]
    InvalidPrivkey,

    #[error("Invalid {0} format")]
    InvalidAddr(&'static str),

    #[error("{0} must be a positive integer number of seconds")]
    InvalidDuration(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_accepts_positive_seconds() {
        let parsed = parse_duration_secs("STATS_INTERVAL_SECS", "1500").unwrap();
        assert_eq!(parsed, Duration::from_secs(1500));
        let parsed = parse_duration_secs("EVENT_WINDOW_SECS", " 120 ").unwrap();
        assert_eq!(parsed, Duration::from_secs(120));
    }

    #[test]
    fn test_parse_duration_rejects_zero() {
        let err = parse_duration_secs("STATS_INTERVAL_SECS", "0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration("STATS_INTERVAL_SECS")
        ));
    }

    #[test]
    fn test_parse_duration_rejects_non_numeric() {
        assert!(parse_duration_secs("STATS_INTERVAL_SECS", "25m").is_err());
        assert!(parse_duration_secs("STATS_INTERVAL_SECS", "-5").is_err());
        assert!(parse_duration_secs("STATS_INTERVAL_SECS", "").is_err());
    }
}
