//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

/// Fixed delay between WebSocket reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Access tokens are renewed this often, ahead of their 15 minute expiry
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(14 * 60);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Where the session document is kept
    pub session_path: PathBuf,
    pub reconnect_delay: Duration,
    pub refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            session_path: PathBuf::from("fleetview-session.json"),
            reconnect_delay: RECONNECT_DELAY,
            refresh_interval: REFRESH_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// REST endpoint URL for `path` (which starts with `/`)
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// WebSocket URL carrying the access token, `https` mapping to `wss`
    pub fn ws_url(&self, token: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}/api/ws?token={token}")
    }
}
