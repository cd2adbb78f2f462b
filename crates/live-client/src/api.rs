//! REST client
//!
//! Every endpoint answers with the `{success, data, message}` envelope;
//! failures surface as [`ClientError::Api`] carrying the server message.

use chrono::{DateTime, SecondsFormat, Utc};
use fleet_protocol::{ApiResponse, Claims, LoginRequest, LoginResponse, RefreshRequest, TokenPair};
use geofence::{Geofence, TrackingSample};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storage::{Alert, GeofenceDraft, GeofencePatch, SosIncident, Vehicle, VehiclePatch};
use tracing::debug;

use crate::config::ClientConfig;
use crate::ClientError;

/// Vehicle listing parameters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Incident and stored panic alert created by an SOS
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SosReport {
    pub incident: SosIncident,
    pub alert: Alert,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
            token: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bearer token sent with authenticated calls
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.config.api_url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotAuthenticated);
        }
        Ok(self.request(method, path))
    }

    /// Send and unwrap the envelope
    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;
        debug!(status = status.as_u16(), success = envelope.success, "API response");

        envelope.into_result().map_err(|message| ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // --- auth --------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        Self::send(self.request(Method::POST, "/api/auth/login").json(&body)).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        Self::send(self.request(Method::POST, "/api/auth/refresh").json(&body)).await
    }

    /// Whether `token` is still accepted. Network failures count as invalid.
    pub async fn verify(&self, token: &str) -> bool {
        let request = self
            .http
            .get(self.config.api_url("/api/auth/verify"))
            .bearer_auth(token);
        match Self::send::<Claims>(request).await {
            Ok(_) => true,
            Err(err) => {
                debug!(error = %err, "Token verification failed");
                false
            }
        }
    }

    // --- vehicles ----------------------------------------------------------

    pub async fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, ClientError> {
        Self::send(self.authed(Method::GET, "/api/vehicles")?.query(query)).await
    }

    pub async fn update_vehicle(&self, id: &str, patch: &VehiclePatch) -> Result<Vehicle, ClientError> {
        let path = format!("/api/vehicles/{id}");
        Self::send(self.authed(Method::PUT, &path)?.json(patch)).await
    }

    pub async fn immobilize(&self, id: &str, immobilize: bool) -> Result<Vehicle, ClientError> {
        let path = format!("/api/vehicles/{id}/immobilize");
        Self::send(self.authed(Method::POST, &path)?.json(&json!({ "immobilize": immobilize }))).await
    }

    pub async fn fuel_control(&self, id: &str, enable: bool) -> Result<Vehicle, ClientError> {
        let path = format!("/api/vehicles/{id}/fuel-control");
        Self::send(self.authed(Method::POST, &path)?.json(&json!({ "enable": enable }))).await
    }

    pub async fn history(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TrackingSample>, ClientError> {
        let path = format!("/api/vehicles/{id}/history");
        let range = [
            ("start", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("end", end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ];
        Self::send(self.authed(Method::GET, &path)?.query(&range)).await
    }

    // --- alerts ------------------------------------------------------------

    pub async fn alerts(&self) -> Result<Vec<Alert>, ClientError> {
        Self::send(self.authed(Method::GET, "/api/alerts")?).await
    }

    pub async fn acknowledge_alert(&self, id: &str) -> Result<Alert, ClientError> {
        let path = format!("/api/alerts/{id}/acknowledge");
        Self::send(self.authed(Method::POST, &path)?).await
    }

    pub async fn resolve_alert(&self, id: &str) -> Result<Alert, ClientError> {
        let path = format!("/api/alerts/{id}/resolve");
        Self::send(self.authed(Method::POST, &path)?).await
    }

    // --- geofences ---------------------------------------------------------

    pub async fn geofences(&self) -> Result<Vec<Geofence>, ClientError> {
        Self::send(self.authed(Method::GET, "/api/geofences")?).await
    }

    pub async fn create_geofence(&self, draft: &GeofenceDraft) -> Result<Geofence, ClientError> {
        Self::send(self.authed(Method::POST, "/api/geofences")?.json(draft)).await
    }

    pub async fn update_geofence(&self, id: &str, patch: &GeofencePatch) -> Result<Geofence, ClientError> {
        let path = format!("/api/geofences/{id}");
        Self::send(self.authed(Method::PUT, &path)?.json(patch)).await
    }

    /// Returns the deleted geofence
    pub async fn delete_geofence(&self, id: &str) -> Result<Geofence, ClientError> {
        let path = format!("/api/geofences/{id}");
        Self::send(self.authed(Method::DELETE, &path)?).await
    }

    // --- emergency ---------------------------------------------------------

    /// Raise an SOS at the vehicle's last known position
    pub async fn trigger_sos(&self, id: &str, description: Option<&str>) -> Result<SosReport, ClientError> {
        let path = format!("/api/vehicles/{id}/sos");
        Self::send(self.authed(Method::POST, &path)?.json(&json!({ "description": description }))).await
    }
}
