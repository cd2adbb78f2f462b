//! Alert engine: rules followed by deduplication

use chrono::{DateTime, Utc};
use geofence::TrackingSample;
use storage::{AlertDraft, SosIncident, Vehicle};
use tracing::debug;

use crate::manager::{AlertConfig, AlertKey, AlertManager};
use crate::rules::{evaluate_rules, sos_alert, RuleContext};

/// Evaluates alert rules and filters the candidates through an [`AlertManager`]
pub struct AlertEngine {
    manager: AlertManager,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            manager: AlertManager::new(config),
        }
    }

    /// Alerts to raise for a new sample, after cooldown and throttling
    pub fn process(
        &mut self,
        sample: &TrackingSample,
        ctx: &RuleContext<'_>,
        now: DateTime<Utc>,
    ) -> Vec<AlertDraft> {
        let candidates = evaluate_rules(self.manager.config(), sample, ctx);
        let total = candidates.len();
        let admitted: Vec<AlertDraft> = candidates
            .into_iter()
            .filter(|draft| self.manager.admit(&AlertKey::for_draft(draft), now))
            .collect();

        if total > 0 {
            debug!(
                vehicle = %sample.vehicle_id,
                candidates = total,
                admitted = admitted.len(),
                "Alert rules evaluated"
            );
        }
        admitted
    }

    /// Panic button alert for an SOS incident. Never suppressed.
    pub fn sos(&mut self, incident: &SosIncident, vehicle: &Vehicle, now: DateTime<Utc>) -> AlertDraft {
        let draft = sos_alert(incident, vehicle);
        self.manager.record_fire(&AlertKey::for_draft(&draft), now);
        draft
    }

    pub fn manager(&self) -> &AlertManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut AlertManager {
        &mut self.manager
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
