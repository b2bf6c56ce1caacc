use chrono::FixedOffset;

use super::domain::{Scenario, Snapshot, ValidatedSnapshot};

/// Reasons a snapshot cannot be scored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required fields: {}", .fields.join(", "))]
    MissingRequiredFields { fields: Vec<&'static str> },
    #[error("resuscitation bay patients are required when surge is not active")]
    MissingResuscitationBay,
    #[error("surge patients must be >= {threshold} for {}", scenario_phrase(.scenario))]
    SurgeBelowThreshold {
        scenario: Scenario,
        threshold: u32,
        found: Option<u32>,
    },
    #[error("evaluator name is required")]
    MissingEvaluator,
}

fn scenario_phrase(scenario: &Scenario) -> &'static str {
    match scenario {
        Scenario::ReducedCapacity => "reduced capacity",
        Scenario::FullCapacity => "full capacity",
    }
}

/// Checks raw snapshots and normalises them into the clinical timezone.
#[derive(Debug, Clone)]
pub struct SnapshotValidator {
    clinical_offset: FixedOffset,
}

impl SnapshotValidator {
    pub fn new(clinical_offset: FixedOffset) -> Self {
        Self { clinical_offset }
    }

    pub fn clinical_offset(&self) -> FixedOffset {
        self.clinical_offset
    }

    /// Applies the rules in order; the first failure wins.
    pub fn validate(&self, snapshot: &Snapshot) -> Result<ValidatedSnapshot, ValidationError> {
        let mut missing = Vec::new();
        if snapshot.scenario.is_none() {
            missing.push("scenario");
        }
        if snapshot.hospitalized_patients.is_none() {
            missing.push("hospitalized_patients");
        }
        if snapshot.esi_c2_patients.is_none() {
            missing.push("esi_c2_patients");
        }
        if snapshot.waiting_72_hours_patients.is_none() {
            missing.push("waiting_72_hours_patients");
        }

        let (
            Some(scenario),
            Some(hospitalized_patients),
            Some(esi_c2_patients),
            Some(waiting_72_hours_patients),
        ) = (
            snapshot.scenario,
            snapshot.hospitalized_patients,
            snapshot.esi_c2_patients,
            snapshot.waiting_72_hours_patients,
        )
        else {
            return Err(ValidationError::MissingRequiredFields { fields: missing });
        };

        let (resuscitation_bay_patients, surge_patients) = if snapshot.surge_active {
            let threshold = scenario.surge_threshold();
            match snapshot.surge_patients {
                Some(count) if count >= threshold => (0, count),
                found => {
                    return Err(ValidationError::SurgeBelowThreshold {
                        scenario,
                        threshold,
                        found,
                    })
                }
            }
        } else {
            let count = snapshot
                .resuscitation_bay_patients
                .ok_or(ValidationError::MissingResuscitationBay)?;
            (count, 0)
        };

        let evaluator_name = snapshot.evaluator_name.trim();
        if evaluator_name.is_empty() {
            return Err(ValidationError::MissingEvaluator);
        }

        Ok(ValidatedSnapshot {
            scenario,
            hospitalized_patients,
            esi_c2_patients,
            resuscitation_bay_patients,
            critical_patient_protocol: snapshot.critical_patient_protocol,
            waiting_72_hours_patients,
            surge_active: snapshot.surge_active,
            surge_patients,
            evaluator_name: evaluator_name.to_string(),
            timestamp: snapshot.timestamp.with_timezone(&self.clinical_offset),
        })
    }
}
