//! Login, registration, and refresh flows

use chrono::{DateTime, Utc};
use fleet_protocol::{LoginResponse, TokenPair};
use storage::{Repository, StorageError, User};
use tracing::{info, warn};

use crate::password::{hash_password, verify_password};
use crate::token::TokenSigner;
use crate::AuthError;

/// Create an account with a freshly salted password digest
pub fn register(repo: &Repository, user: User, password: &str) -> Result<(), AuthError> {
    let digest = hash_password(password)?;
    repo.insert_account(user, digest)?;
    Ok(())
}

/// Authenticate by e-mail and password.
///
/// Unknown, inactive, and wrong-password cases all yield
/// [`AuthError::InvalidCredentials`].
pub fn login(
    repo: &Repository,
    signer: &TokenSigner,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<LoginResponse, AuthError> {
    let (user, digest) = match repo.find_account(email)? {
        Some(account) => account,
        None => {
            warn!(email, "Login for unknown account");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !user.is_active || !verify_password(password, &digest) {
        warn!(user = %user.id, "Login rejected");
        return Err(AuthError::InvalidCredentials);
    }

    let organization = match repo.get_organization(&user.organization_id) {
        Ok(org) => org,
        Err(StorageError::NotFound { .. }) => return Err(AuthError::OrganizationNotFound),
        Err(e) => return Err(e.into()),
    };

    let user = repo.record_login(&user.id, now)?;
    let tokens = signer.issue_pair(&user, now)?;
    info!(user = %user.id, role = user.role.as_str(), "Login succeeded");

    Ok(LoginResponse {
        user,
        organization,
        token: tokens.token,
        refresh_token: tokens.refresh_token,
    })
}

/// Exchange a refresh token for a new pair. The account must still be active.
pub fn refresh(
    repo: &Repository,
    signer: &TokenSigner,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<TokenPair, AuthError> {
    let claims = signer.verify_refresh(refresh_token, now)?;
    let user = match repo.get_user(&claims.sub) {
        Ok(user) => user,
        Err(StorageError::NotFound { .. }) => return Err(AuthError::InvalidToken),
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(AuthError::Disabled);
    }
    signer.issue_pair(&user, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::fixtures::user;
    use crate::token::TokenConfig;
    use chrono::Duration;
    use storage::{Organization, Region, Role};

    fn organization() -> Organization {
        let now = Utc::now();
        Organization {
            id: "org_001".to_string(),
            name: "Gulf Logistics".to_string(),
            region: Region::SaudiArabia,
            address: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            timezone: "Asia/Riyadh".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn setup() -> (Repository, TokenSigner) {
        let repo = Repository::new();
        repo.upsert_organization(organization()).unwrap();
        register(&repo, user(Role::FleetManager), "fleet123").unwrap();
        let signer = TokenSigner::new(&TokenConfig {
            secret: "test".to_string(),
            ..Default::default()
        });
        (repo, signer)
    }

    #[test]
    fn test_login_success() {
        let (repo, signer) = setup();
        let now = Utc::now();
        let response = login(&repo, &signer, "MANAGER@fleet.example", "fleet123", now).unwrap();

        assert_eq!(response.user.last_login, Some(now));
        assert_eq!(response.organization.id, "org_001");
        let claims = signer.verify_access(&response.token, now).unwrap();
        assert_eq!(claims.sub, "user_001");
    }

    #[test]
    fn test_login_failures_share_message() {
        let (repo, signer) = setup();
        let now = Utc::now();

        let wrong = login(&repo, &signer, "manager@fleet.example", "nope", now).unwrap_err();
        let unknown = login(&repo, &signer, "ghost@fleet.example", "fleet123", now).unwrap_err();
        assert_eq!(wrong.to_string(), "Invalid email or password");
        assert_eq!(unknown.to_string(), "Invalid email or password");
    }

    #[test]
    fn test_login_missing_organization() {
        let repo = Repository::new();
        register(&repo, user(Role::Driver), "fleet123").unwrap();
        let signer = TokenSigner::new(&TokenConfig::default());

        let err = login(&repo, &signer, "manager@fleet.example", "fleet123", Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::OrganizationNotFound));
    }

    #[test]
    fn test_refresh() {
        let (repo, signer) = setup();
        let now = Utc::now();
        let response = login(&repo, &signer, "manager@fleet.example", "fleet123", now).unwrap();

        let later = now + Duration::minutes(20);
        let pair = refresh(&repo, &signer, &response.refresh_token, later).unwrap();
        assert!(signer.verify_access(&pair.token, later).is_ok());

        assert!(matches!(
            refresh(&repo, &signer, &response.token, now),
            Err(AuthError::WrongTokenKind)
        ));
    }
}
