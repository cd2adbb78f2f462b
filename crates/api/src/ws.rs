//! WebSocket fan-out
//!
//! Server events go through one broadcast channel. Each connection filters
//! the stream by organization and by its tracking subscription.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use fleet_protocol::{Claims, ClientCommand, MessageKind, WsEvent, WsMessage, ALL_VEHICLES};
use serde::Deserialize;
use session_auth::is_super_admin;
use storage::VehicleFilter;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::{telemetry, SharedState};

/// Publishes server events to every connected client
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<WsMessage>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send an event on behalf of `organization_id`. Returns the number of
    /// connections reached.
    pub fn publish(&self, event: &WsEvent, organization_id: &str) -> usize {
        match WsMessage::new(event, organization_id, Utc::now()) {
            // No receivers is not an error
            Ok(message) => self.tx.send(message).unwrap_or(0),
            Err(err) => {
                warn!(error = %err, kind = ?event.kind(), "Failed to encode websocket event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Which vehicles' tracking updates a connection wants
#[derive(Debug, Clone)]
struct TrackingFilter {
    all: bool,
    included: HashSet<String>,
    excluded: HashSet<String>,
}

impl Default for TrackingFilter {
    fn default() -> Self {
        Self {
            all: true,
            included: HashSet::new(),
            excluded: HashSet::new(),
        }
    }
}

impl TrackingFilter {
    fn start(&mut self, vehicle_id: &str) {
        if vehicle_id == ALL_VEHICLES {
            *self = Self::default();
        } else {
            self.excluded.remove(vehicle_id);
            if !self.all {
                self.included.insert(vehicle_id.to_string());
            }
        }
    }

    fn stop(&mut self, vehicle_id: &str) {
        if vehicle_id == ALL_VEHICLES {
            self.all = false;
            self.included.clear();
            self.excluded.clear();
        } else {
            self.included.remove(vehicle_id);
            if self.all {
                self.excluded.insert(vehicle_id.to_string());
            }
        }
    }

    fn wants(&self, vehicle_id: &str) -> bool {
        if self.all {
            !self.excluded.contains(vehicle_id)
        } else {
            self.included.contains(vehicle_id)
        }
    }
}

/// Whether a connection authenticated as `claims` may see `message`
fn visible(claims: &Claims, message: &WsMessage) -> bool {
    is_super_admin(claims.role) || message.organization_id == claims.org
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// `GET /api/ws?token=<access token>`
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;
    let claims = state
        .read()
        .await
        .signer
        .verify_access(&token, Utc::now())
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(ws.on_upgrade(move |socket| client_loop(socket, state, claims)))
}

async fn client_loop(mut socket: WebSocket, state: SharedState, claims: Claims) {
    let mut subscription = state.read().await.broadcaster.subscribe();
    let mut filter = TrackingFilter::default();

    telemetry::ws_connected();
    info!(user = %claims.sub, org = %claims.org, "WebSocket client connected");

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, user = %claims.sub, "WebSocket client lagged; dropping frames");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if !visible(&claims, &frame) {
                    continue;
                }
                if frame.kind == MessageKind::TrackingUpdate
                    && !frame.vehicle_id.as_deref().is_some_and(|v| filter.wants(v))
                {
                    continue;
                }

                if !send(&mut socket, &frame).await {
                    break;
                }
            }
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    break;
                };

                match message {
                    Message::Text(text) => match ClientCommand::from_json(&text) {
                        Ok(ClientCommand::StartTracking { vehicle_id }) => {
                            debug!(vehicle = %vehicle_id, "start_tracking");
                            filter.start(&vehicle_id);
                        }
                        Ok(ClientCommand::StopTracking { vehicle_id }) => {
                            debug!(vehicle = %vehicle_id, "stop_tracking");
                            filter.stop(&vehicle_id);
                        }
                        Ok(ClientCommand::RequestTrackingUpdate) => {
                            let frames = latest_samples(&state, &claims, &filter).await;
                            let mut open = true;
                            for frame in &frames {
                                if !send(&mut socket, frame).await {
                                    open = false;
                                    break;
                                }
                            }
                            if !open {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "Invalid websocket command");
                            let _ = socket
                                .send(Message::Text("{\"error\":\"invalid command\"}".into()))
                                .await;
                        }
                    },
                    Message::Binary(_) => {
                        let _ = socket
                            .send(Message::Text("{\"error\":\"binary unsupported\"}".into()))
                            .await;
                    }
                    Message::Ping(payload) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break,
                }
            }
        }
    }

    telemetry::ws_disconnected();
    info!(user = %claims.sub, "WebSocket client disconnected");
}

/// Serialize and send one frame; false once the socket is gone
async fn send(socket: &mut WebSocket, frame: &WsMessage) -> bool {
    match frame.to_json() {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "Failed to serialise websocket frame");
            true
        }
    }
}

/// Latest sample of every vehicle the connection may see and wants
async fn latest_samples(state: &SharedState, claims: &Claims, filter: &TrackingFilter) -> Vec<WsMessage> {
    let state = state.read().await;
    let scope = VehicleFilter {
        organization_id: (!is_super_admin(claims.role)).then(|| claims.org.clone()),
        search: None,
    };
    let vehicles = match state.repository.list_vehicles(&scope) {
        Ok(vehicles) => vehicles,
        Err(err) => {
            warn!(error = %err, "Failed to list vehicles for tracking snapshot");
            return Vec::new();
        }
    };

    let now = Utc::now();
    vehicles
        .iter()
        .filter(|v| filter.wants(&v.id))
        .filter_map(|v| {
            let sample = state.repository.latest_sample(&v.id).ok().flatten()?;
            WsMessage::new(&WsEvent::TrackingUpdate(sample), &v.organization_id, now).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_protocol::TokenKind;
    use storage::Role;

    #[test]
    fn test_filter_defaults_to_all() {
        let filter = TrackingFilter::default();
        assert!(filter.wants("vehicle_001"));
    }

    #[test]
    fn test_filter_stop_one_then_restart() {
        let mut filter = TrackingFilter::default();
        filter.stop("vehicle_001");
        assert!(!filter.wants("vehicle_001"));
        assert!(filter.wants("vehicle_002"));

        filter.start("vehicle_001");
        assert!(filter.wants("vehicle_001"));
    }

    #[test]
    fn test_filter_stop_all_then_start_one() {
        let mut filter = TrackingFilter::default();
        filter.stop(ALL_VEHICLES);
        assert!(!filter.wants("vehicle_001"));

        filter.start("vehicle_002");
        assert!(filter.wants("vehicle_002"));
        assert!(!filter.wants("vehicle_001"));

        filter.start(ALL_VEHICLES);
        assert!(filter.wants("vehicle_001"));
    }

    #[test]
    fn test_visibility_by_organization() {
        let mut claims = Claims {
            sub: "user_001".to_string(),
            email: "ops@fleet.example".to_string(),
            role: Role::FleetManager,
            org: "org_001".to_string(),
            kind: TokenKind::Access,
            iat: 0,
            exp: 900,
        };
        let message = WsMessage {
            kind: MessageKind::AlertNew,
            payload: serde_json::Value::Null,
            timestamp: Utc::now(),
            organization_id: "org_002".to_string(),
            vehicle_id: None,
        };
        assert!(!visible(&claims, &message));

        claims.role = Role::SuperAdmin;
        assert!(visible(&claims, &message));
    }

    #[tokio::test]
    async fn test_publish_without_clients() {
        let broadcaster = Broadcaster::new(8);
        assert_eq!(broadcaster.client_count(), 0);

        let status = fleet_protocol::VehicleStatus {
            id: "vehicle_001".to_string(),
            patch: Default::default(),
        };
        assert_eq!(broadcaster.publish(&WsEvent::VehicleStatus(status.clone()), "org_001"), 0);

        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.publish(&WsEvent::VehicleStatus(status), "org_001"), 1);
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.kind, MessageKind::VehicleStatus);
        assert_eq!(frame.vehicle_id.as_deref(), Some("vehicle_001"));
    }
}
