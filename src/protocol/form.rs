use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::domain::{CriticalProtocol, Evaluation, Scenario, Snapshot, ValidatedSnapshot};

/// Editable form state, kept as raw text until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields {
    pub scenario: String,
    pub hospitalized_patients: String,
    pub esi_c2_patients: String,
    pub resuscitation_bay_patients: String,
    pub critical_patient_protocol: String,
    pub waiting_72_hours_patients: String,
    pub surge_active: bool,
    pub surge_patients: String,
    pub evaluator_name: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            scenario: String::new(),
            hospitalized_patients: String::new(),
            esi_c2_patients: String::new(),
            resuscitation_bay_patients: String::new(),
            critical_patient_protocol: CriticalProtocol::None.form_value().to_string(),
            waiting_72_hours_patients: String::new(),
            surge_active: false,
            surge_patients: String::new(),
            evaluator_name: String::new(),
        }
    }
}

/// Raised before validation when a field holds text of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormParseError {
    #[error("field '{field}' must be a non-negative whole number, found '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
    #[error("unknown critical patient protocol '{0}'")]
    UnknownCriticalProtocol(String),
}

fn parse_count(field: &'static str, raw: &str) -> Result<Option<u32>, FormParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| FormParseError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        })
}

impl FormFields {
    /// Converts the form into a snapshot; blank fields become missing values.
    pub fn parse(&self, timestamp: DateTime<FixedOffset>) -> Result<Snapshot, FormParseError> {
        let scenario = if self.scenario.trim().is_empty() {
            None
        } else {
            Some(
                Scenario::from_form(&self.scenario)
                    .ok_or_else(|| FormParseError::UnknownScenario(self.scenario.clone()))?,
            )
        };
        let critical_patient_protocol = CriticalProtocol::from_form(&self.critical_patient_protocol)
            .ok_or_else(|| {
                FormParseError::UnknownCriticalProtocol(self.critical_patient_protocol.clone())
            })?;

        Ok(Snapshot {
            scenario,
            hospitalized_patients: parse_count(
                "hospitalized_patients",
                &self.hospitalized_patients,
            )?,
            esi_c2_patients: parse_count("esi_c2_patients", &self.esi_c2_patients)?,
            resuscitation_bay_patients: parse_count(
                "resuscitation_bay_patients",
                &self.resuscitation_bay_patients,
            )?,
            critical_patient_protocol,
            waiting_72_hours_patients: parse_count(
                "waiting_72_hours_patients",
                &self.waiting_72_hours_patients,
            )?,
            surge_active: self.surge_active,
            surge_patients: parse_count("surge_patients", &self.surge_patients)?,
            evaluator_name: self.evaluator_name.clone(),
            timestamp,
        })
    }

    /// Switches surge on once the bay count reaches the scenario threshold, off below it.
    ///
    /// Leaves the form untouched while the scenario or the bay count is unreadable.
    pub fn apply_surge_autofill(&mut self) {
        let Some(scenario) = Scenario::from_form(&self.scenario) else {
            return;
        };
        let Ok(Some(count)) = parse_count("resuscitation_bay_patients", &self.resuscitation_bay_patients)
        else {
            return;
        };

        if count >= scenario.surge_threshold() {
            self.surge_active = true;
            self.surge_patients = count.to_string();
        } else {
            self.surge_active = false;
            self.surge_patients = "0".to_string();
        }
    }

    /// Projects a stored snapshot back into editable fields. The evaluator is not carried over.
    pub fn from_snapshot(snapshot: &ValidatedSnapshot) -> Self {
        Self {
            scenario: snapshot.scenario.form_value().to_string(),
            hospitalized_patients: snapshot.hospitalized_patients.to_string(),
            esi_c2_patients: snapshot.esi_c2_patients.to_string(),
            resuscitation_bay_patients: snapshot.resuscitation_bay_patients.to_string(),
            critical_patient_protocol: snapshot.critical_patient_protocol.form_value().to_string(),
            waiting_72_hours_patients: snapshot.waiting_72_hours_patients.to_string(),
            surge_active: snapshot.surge_active,
            surge_patients: snapshot.surge_patients.to_string(),
            evaluator_name: String::new(),
        }
    }
}

/// Prefill from the evaluation with the latest timestamp, ties going to the higher id.
pub fn load_most_recent(evaluations: &[Evaluation]) -> Option<FormFields> {
    evaluations
        .iter()
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
        .map(|latest| FormFields::from_snapshot(&latest.snapshot))
}
