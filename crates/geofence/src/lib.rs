//! Geofence Evaluator
//!
//! Pure geometry and classification over tracking samples:
//! - Haversine great-circle distance
//! - Even-odd point-in-polygon test
//! - Containment set of active geofences
//! - Driver status (driving / idle / offline)
//! - Allowed time windows and entry/exit transitions

mod containment;
mod distance;
mod polygon;
mod schedule;
mod status;
mod types;

pub use containment::{containing, evaluate, in_any_geofence, transitions, Evaluation, Transitions};
pub use distance::{haversine_m, EARTH_RADIUS_M};
pub use polygon::point_in_polygon;
pub use schedule::{hhmm, parse_hhmm, AllowedDay, ScheduleError};
pub use status::{DriverStatus, IDLE_SPEED_KMH, OFFLINE_AFTER_MINUTES};
pub use types::{Coordinate, Geofence, GeofenceKind, TrackingSample};
