//! REST handlers, one module per resource

pub mod alerts;
pub mod auth;
pub mod dashboard;
pub mod geofences;
pub mod tracking;
pub mod vehicles;

fn default_page() -> usize {
    1
}
