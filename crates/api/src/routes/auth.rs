//! Authentication Routes

use axum::{extract::State, Json};
use chrono::Utc;
use fleet_protocol::{ApiResponse, Claims, LoginRequest, LoginResponse, RefreshRequest, TokenPair};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::{telemetry, SharedState};

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let state = state.read().await;
    ApiError::check(state.validator.validate_login(&req.email, &req.password))?;

    match session_auth::login(&state.repository, &state.signer, &req.email, &req.password, Utc::now()) {
        Ok(response) => {
            telemetry::login(true);
            info!(user = %response.user.id, org = %response.organization.id, "Login succeeded");
            Ok(Json(ApiResponse::ok(response).with_message("Login successful")))
        }
        Err(err) => {
            telemetry::login(false);
            warn!(email = %req.email, error = %err, "Login rejected");
            Err(err.into())
        }
    }
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    let state = state.read().await;
    let pair = session_auth::refresh(&state.repository, &state.signer, &req.refresh_token, Utc::now())?;
    Ok(Json(ApiResponse::ok(pair)))
}

/// `GET /api/auth/verify`
pub async fn verify(user: AuthUser) -> ApiResult<Claims> {
    Ok(Json(ApiResponse::ok(user.claims)))
}
