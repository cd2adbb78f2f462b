//! Session Authentication
//!
//! E-mail/password login for dashboard users:
//! - Salted HMAC-SHA256 password digests
//! - HS256-signed access and refresh tokens
//! - Token refresh and verification
//! - Role checks

mod login;
mod password;
mod roles;
mod token;

pub use login::{login, refresh, register};
pub use password::{hash_password, verify_password};
pub use roles::{
    can_manage_vehicles, can_view_all_vehicles, has_role, is_fleet_manager, is_org_admin,
    is_super_admin,
};
pub use token::{TokenConfig, TokenSigner};

use storage::StorageError;
use thiserror::Error;

/// Authentication error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Wrong token type")]
    WrongTokenKind,

    #[error("Account disabled")]
    Disabled,

    #[error("Signing key error: {0}")]
    Key(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
