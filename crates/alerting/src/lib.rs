//! Alerting System
//!
//! Derives alerts from consecutive tracking samples (speeding, geofence
//! entry and exit, engine state, fuel drops, low battery, movement outside
//! allowed hours) and deduplicates them with a per-key cooldown and an
//! hourly cap.

mod engine;
mod manager;
mod rules;

pub use engine::AlertEngine;
pub use manager::{AlertConfig, AlertKey, AlertManager, AlertState};
pub use rules::{evaluate_rules, sos_alert, RuleContext};
