//! Server configuration
//!
//! Layered with the `config` crate: serde defaults, then an optional TOML
//! file, then `FLEETVIEW__SECTION__KEY` environment variables.

use alerting::AlertConfig;
use chrono::Utc;
use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use session_auth::TokenConfig;
use std::path::Path;
use storage::{Organization, Region, Repository, Role, User, DEFAULT_MAX_SAMPLES_PER_VEHICLE};
use tracing::{info, warn};

use crate::rate_limit::RateLimitConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FLEETVIEW";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: TokenConfig,
    pub alerts: AlertConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub websocket: WebSocketConfig,
    pub tracking: TrackingConfig,
    pub validation: ValidationConfig,
    pub seed: SeedConfig,
}

impl Settings {
    /// Load settings from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Allow any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Broadcast channel capacity; slower clients skip frames
    pub channel_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub max_samples_per_vehicle: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_samples_per_vehicle: DEFAULT_MAX_SAMPLES_PER_VEHICLE,
        }
    }
}

/// Organization created at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedOrganization {
    pub id: String,
    pub name: String,
    pub region: Region,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Account created at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub id: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    pub organization_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub organizations: Vec<SeedOrganization>,
    pub accounts: Vec<SeedAccount>,
}

impl SeedConfig {
    /// Insert configured organizations and accounts. Existing e-mails are
    /// skipped with a warning.
    pub fn apply(&self, repo: &Repository) -> Result<(), session_auth::AuthError> {
        let now = Utc::now();
        for org in &self.organizations {
            repo.upsert_organization(Organization {
                id: org.id.clone(),
                name: org.name.clone(),
                region: org.region,
                address: String::new(),
                contact_email: String::new(),
                contact_phone: String::new(),
                timezone: org.timezone.clone(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })?;
        }

        for account in &self.accounts {
            let user = User {
                id: account.id.clone(),
                email: account.email.clone(),
                first_name: account.first_name.clone(),
                last_name: account.last_name.clone(),
                role: account.role,
                organization_id: account.organization_id.clone(),
                phone_number: String::new(),
                is_active: true,
                last_login: None,
                created_at: now,
                updated_at: now,
            };
            match session_auth::register(repo, user, &account.password) {
                Ok(()) => {}
                Err(session_auth::AuthError::Storage(storage::StorageError::Conflict(msg))) => {
                    warn!(email = %account.email, "Skipping seed account: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            organizations = self.organizations.len(),
            accounts = self.accounts.len(),
            "Seed data applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert_eq!(settings.auth.access_ttl_minutes, 15);
        assert_eq!(settings.alerts.cooldown_seconds, 600);
        assert_eq!(settings.tracking.max_samples_per_vehicle, 10_000);
        assert!(settings.rate_limit.enabled);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
bind = "127.0.0.1:9000"

[alerts]
max_alerts_per_hour = 5

[[seed.organizations]]
id = "org_001"
name = "Gulf Logistics"
region = "saudi_arabia"

[[seed.accounts]]
id = "user_001"
email = "admin@fleet.example"
password = "admin123"
role = "org_admin"
organization_id = "org_001"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:9000");
        assert_eq!(settings.alerts.max_alerts_per_hour, 5);
        assert_eq!(settings.alerts.cooldown_seconds, 600);

        let repo = Repository::new();
        settings.seed.apply(&repo).unwrap();
        assert_eq!(repo.get_organization("org_001").unwrap().timezone, "UTC");
        assert!(repo.find_account("admin@fleet.example").unwrap().is_some());

        // Seeding twice is harmless
        settings.seed.apply(&repo).unwrap();
    }
}
