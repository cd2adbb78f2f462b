//! Fleet State
//!
//! Client-side state for the dashboard. Each reducer turns the current
//! snapshot and an action into a new snapshot; a [`Store`] publishes
//! snapshots to subscribers.

mod auth;
mod fleet;
mod live;
mod stats;
mod store;

pub use auth::{AuthAction, AuthState};
pub use fleet::{FleetAction, FleetState, DEFAULT_TRACKING_INTERVAL_SECS};
pub use live::LiveVehicleData;
pub use stats::DashboardStats;
pub use store::{Reducer, Store};

#[cfg(test)]
pub(crate) mod fixtures;
