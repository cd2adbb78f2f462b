//! Bearer token extractor and organization scoping

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use fleet_protocol::Claims;
use session_auth::is_super_admin;
use storage::Role;
use tracing::debug;

use crate::error::ApiError;
use crate::SharedState;

/// Authenticated caller, taken from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: Claims,
}

impl AuthUser {
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn organization_id(&self) -> &str {
        &self.claims.org
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    /// Organization filter for a listing. Super admins may ask for any
    /// organization (or all of them); everyone else sees only their own.
    pub fn scope(&self, requested: Option<&str>) -> Option<String> {
        if is_super_admin(self.claims.role) {
            requested.filter(|o| !o.is_empty()).map(str::to_string)
        } else {
            Some(self.claims.org.clone())
        }
    }

    /// Organization a new record is created in
    pub fn target_org(&self, requested: Option<&str>) -> String {
        self.scope(requested)
            .unwrap_or_else(|| self.claims.org.clone())
    }

    /// Reject access to a record owned by another organization
    pub fn ensure_org(&self, organization_id: &str) -> Result<(), ApiError> {
        if is_super_admin(self.claims.role) || self.claims.org == organization_id {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Reject callers whose role fails `check`
    pub fn require(&self, check: fn(Role) -> bool) -> Result<(), ApiError> {
        if check(self.claims.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

/// Token part of a bearer authorization header
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;

        let state = state.read().await;
        let claims = state
            .signer
            .verify_access(token, Utc::now())
            .map_err(|err| {
                debug!(error = %err, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;

        Ok(AuthUser { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_protocol::TokenKind;
    use session_auth::can_manage_vehicles;

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            claims: Claims {
                sub: "user_001".to_string(),
                email: "ops@fleet.example".to_string(),
                role,
                org: "org_001".to_string(),
                kind: TokenKind::Access,
                iat: 0,
                exp: 900,
            },
        }
    }

    #[test]
    fn test_scope_pins_regular_users() {
        let manager = caller(Role::FleetManager);
        assert_eq!(manager.scope(Some("org_999")).as_deref(), Some("org_001"));
        assert_eq!(manager.scope(None).as_deref(), Some("org_001"));
    }

    #[test]
    fn test_scope_super_admin() {
        let admin = caller(Role::SuperAdmin);
        assert_eq!(admin.scope(None), None);
        assert_eq!(admin.scope(Some("org_999")).as_deref(), Some("org_999"));
        assert_eq!(admin.target_org(None), "org_001");
    }

    #[test]
    fn test_ensure_org_and_require() {
        let driver = caller(Role::Driver);
        assert!(driver.ensure_org("org_001").is_ok());
        assert!(driver.ensure_org("org_002").is_err());
        assert!(driver.require(can_manage_vehicles).is_err());
        assert!(caller(Role::OrgAdmin).require(can_manage_vehicles).is_ok());
    }
}
