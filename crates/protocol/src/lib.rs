//! Fleet Protocol
//!
//! JSON shapes exchanged between the server and dashboard clients: the REST
//! response envelope, WebSocket messages and commands, and auth payloads.

mod auth;
mod envelope;
mod ws;

pub use auth::{
    Claims, LoginRequest, LoginResponse, RefreshRequest, TokenKind, TokenPair,
};
pub use data_validator::FieldError;
pub use envelope::{ApiResponse, Pagination};
pub use ws::{ClientCommand, MessageKind, VehicleStatus, WsEvent, WsMessage, ALL_VEHICLES};

use thiserror::Error;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unsupported message type: {0}")]
    Unsupported(String),
}
