//! Live Dashboard Client
//!
//! Headless counterpart of the dashboard:
//! - Typed REST calls against the API server
//! - Session persisted to a JSON file and restored on startup
//! - Periodic token refresh
//! - WebSocket feed folded into the fleet store, reconnecting on loss

mod api;
mod config;
mod dashboard;
mod feed;
mod session;

pub use api::{ApiClient, SosReport, VehicleQuery};
pub use config::ClientConfig;
pub use dashboard::Dashboard;
pub use feed::{LiveFeed, LiveFeedHandle};
pub use session::{PersistedSession, Session, SessionStore};

use fleet_protocol::ProtocolError;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a failure envelope
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not authenticated")]
    NotAuthenticated,
}
