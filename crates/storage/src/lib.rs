//! Storage Layer
//!
//! Fleet records and an in-memory repository. Nothing is persisted across
//! restarts.

mod model;
mod query;
mod repository;

pub use model::{
    Alert, AlertDraft, AlertType, FuelType, GeofenceDraft, GeofencePatch, Organization, Region,
    Role, Severity, SosIncident, SosStatus, User, UserPatch, Vehicle, VehicleDraft, VehiclePatch,
};
pub use query::{paginate, AlertFilter, Page, VehicleFilter, MAX_PAGE_SIZE};
pub use repository::{Repository, DEFAULT_MAX_SAMPLES_PER_VEHICLE};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StorageError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Generate a prefixed record id, e.g. `vehicle_3f2a...`
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
