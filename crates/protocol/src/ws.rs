//! WebSocket messages
//!
//! Server frames are `{type, payload, timestamp, organizationId, vehicleId?}`.
//! The payload shape depends on `type`, so frames are kept as raw JSON until
//! [`WsMessage::decode`] is called.

use chrono::{DateTime, Utc};
use geofence::TrackingSample;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{Alert, SosIncident, VehiclePatch};

use crate::ProtocolError;

/// Vehicle id meaning "every vehicle" in tracking commands
pub const ALL_VEHICLES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    TrackingUpdate,
    AlertNew,
    AlertUpdate,
    VehicleStatus,
    SosIncident,
}

/// Partial vehicle update pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    pub id: String,
    #[serde(flatten)]
    pub patch: VehiclePatch,
}

/// Typed payload of a server frame
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    TrackingUpdate(TrackingSample),
    AlertNew(Alert),
    AlertUpdate(Alert),
    VehicleStatus(VehicleStatus),
    SosIncident(SosIncident),
}

impl WsEvent {
    pub fn kind(&self) -> MessageKind {
        match self {
            WsEvent::TrackingUpdate(_) => MessageKind::TrackingUpdate,
            WsEvent::AlertNew(_) => MessageKind::AlertNew,
            WsEvent::AlertUpdate(_) => MessageKind::AlertUpdate,
            WsEvent::VehicleStatus(_) => MessageKind::VehicleStatus,
            WsEvent::SosIncident(_) => MessageKind::SosIncident,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        match self {
            WsEvent::TrackingUpdate(s) => &s.vehicle_id,
            WsEvent::AlertNew(a) | WsEvent::AlertUpdate(a) => &a.vehicle_id,
            WsEvent::VehicleStatus(v) => &v.id,
            WsEvent::SosIncident(i) => &i.vehicle_id,
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            WsEvent::TrackingUpdate(s) => serde_json::to_value(s),
            WsEvent::AlertNew(a) | WsEvent::AlertUpdate(a) => serde_json::to_value(a),
            WsEvent::VehicleStatus(v) => serde_json::to_value(v),
            WsEvent::SosIncident(i) => serde_json::to_value(i),
        }
    }
}

/// Server to client frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
}

impl WsMessage {
    pub fn new(
        event: &WsEvent,
        organization_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: event.kind(),
            payload: event.payload()?,
            timestamp,
            organization_id: organization_id.into(),
            vehicle_id: Some(event.vehicle_id().to_string()),
        })
    }

    /// Parse a text frame
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        if let Some(kind) = value.get("type").and_then(Value::as_str) {
            if serde_json::from_value::<MessageKind>(Value::String(kind.to_string())).is_err() {
                return Err(ProtocolError::Unsupported(kind.to_string()));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Interpret the payload according to the frame type
    pub fn decode(&self) -> Result<WsEvent, ProtocolError> {
        let payload = self.payload.clone();
        Ok(match self.kind {
            MessageKind::TrackingUpdate => WsEvent::TrackingUpdate(serde_json::from_value(payload)?),
            MessageKind::AlertNew => WsEvent::AlertNew(serde_json::from_value(payload)?),
            MessageKind::AlertUpdate => WsEvent::AlertUpdate(serde_json::from_value(payload)?),
            MessageKind::VehicleStatus => WsEvent::VehicleStatus(serde_json::from_value(payload)?),
            MessageKind::SosIncident => WsEvent::SosIncident(serde_json::from_value(payload)?),
        })
    }
}

/// Client to server command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    StartTracking {
        #[serde(rename = "vehicleId", default = "all_vehicles")]
        vehicle_id: String,
    },
    StopTracking {
        #[serde(rename = "vehicleId", default = "all_vehicles")]
        vehicle_id: String,
    },
    RequestTrackingUpdate,
}

fn all_vehicles() -> String {
    ALL_VEHICLES.to_string()
}

impl ClientCommand {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        match value.get("type").and_then(Value::as_str) {
            Some("start_tracking" | "stop_tracking" | "request_tracking_update") => {
                Ok(serde_json::from_value(value)?)
            }
            Some(other) => Err(ProtocolError::Unsupported(other.to_string())),
            None => Err(ProtocolError::Unsupported(String::new())),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
