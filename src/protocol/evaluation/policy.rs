use super::super::domain::{AlertLevel, ValidatedSnapshot};
use super::config::{AlertBands, AlertFloor, OverrideTrigger};
use serde::{Deserialize, Serialize};

/// Classification result with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertClassification {
    pub level: AlertLevel,
    pub band_level: AlertLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_overrides: Vec<String>,
}

impl OverrideTrigger {
    pub fn matches(&self, snapshot: &ValidatedSnapshot) -> bool {
        match self {
            OverrideTrigger::CriticalProtocol { level } => {
                snapshot.critical_patient_protocol == *level
            }
            OverrideTrigger::SurgeActive => snapshot.surge_active,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            OverrideTrigger::CriticalProtocol { level } => {
                format!("critical patient protocol {}", level.label())
            }
            OverrideTrigger::SurgeActive => "surge active".to_string(),
        }
    }
}

pub(crate) fn classify(
    total_score: u32,
    snapshot: &ValidatedSnapshot,
    bands: &AlertBands,
    overrides: &[AlertFloor],
) -> AlertClassification {
    let band_level = bands.level_for(total_score);
    let mut level = band_level;
    let mut applied_overrides = Vec::new();

    for rule in overrides {
        if rule.trigger.matches(snapshot) && rule.floor > level {
            level = rule.floor;
            applied_overrides.push(format!(
                "{} raises the alert to at least {}",
                rule.trigger.describe(),
                rule.floor.label()
            ));
        }
    }

    AlertClassification {
        level,
        band_level,
        applied_overrides,
    }
}
