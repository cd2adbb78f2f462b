//! Signed session tokens
//!
//! Compact `header.claims.signature` form, each part base64url without
//! padding, signed with HMAC-SHA256.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use fleet_protocol::{Claims, TokenKind, TokenPair};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use storage::User;
use tracing::{debug, warn};

use crate::AuthError;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Signing secret. A random per-process key is used when empty.
    pub secret: String,
    /// Access token lifetime (minutes)
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime (days)
    pub refresh_ttl_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        }
    }
}

/// Issues and verifies tokens
pub struct TokenSigner {
    key: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    pub fn new(config: &TokenConfig) -> Self {
        let key = if config.secret.is_empty() {
            warn!("No token secret configured; sessions will not survive a restart");
            let mut key = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            key
        } else {
            config.secret.as_bytes().to_vec()
        };
        Self {
            key,
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AuthError::Key(e.to_string()))
    }

    /// Sign a token of the given kind for `user`
    pub fn issue(&self, user: &User, kind: TokenKind, now: DateTime<Utc>) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            org: user.organization_id.clone(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let body = serde_json::to_vec(&claims).map_err(|_| AuthError::InvalidToken)?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(body)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Fresh access and refresh tokens
    pub fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            token: self.issue(user, TokenKind::Access, now)?,
            refresh_token: self.issue(user, TokenKind::Refresh, now)?,
        })
    }

    /// Check signature and expiry of a token of any kind
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(AuthError::InvalidToken)?;
        let (_, body) = signing_input.split_once('.').ok_or(AuthError::InvalidToken)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&body).map_err(|_| AuthError::InvalidToken)?;

        if claims.is_expired(now.timestamp()) {
            debug!(user = %claims.sub, "Rejected expired token");
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        self.verify_kind(token, TokenKind::Access, now)
    }

    pub fn verify_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        self.verify_kind(token, TokenKind::Refresh, now)
    }

    fn verify_kind(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let claims = self.verify(token, now)?;
        if claims.kind != kind {
            return Err(AuthError::WrongTokenKind);
        }
        Ok(claims)
    }
}
