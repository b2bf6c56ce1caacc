use std::collections::HashSet;

use super::domain::{AlertLevel, ValidatedSnapshot};
use super::evaluation::{MeasureCatalog, MeasureCondition};

impl MeasureCondition {
    pub fn holds(self, snapshot: &ValidatedSnapshot) -> bool {
        match self {
            MeasureCondition::Always => true,
            MeasureCondition::SurgeActive => snapshot.surge_active,
            MeasureCondition::CriticalProtocolActive => {
                snapshot.critical_patient_protocol.is_active()
            }
            MeasureCondition::LongStayWaiting => snapshot.waiting_72_hours_patients > 0,
        }
    }
}

/// Ordered, deduplicated measure descriptions for an alert level.
///
/// Candidate lists accumulate from Yellow up to `level`; the first occurrence of a
/// description keeps its position.
pub(crate) fn select_measures(
    level: AlertLevel,
    snapshot: &ValidatedSnapshot,
    catalog: &MeasureCatalog,
) -> Vec<String> {
    let mut seen = HashSet::new();
    AlertLevel::ordered()
        .into_iter()
        .filter(|candidate_level| *candidate_level <= level)
        .flat_map(|candidate_level| catalog.candidates(candidate_level))
        .filter(|template| template.condition.holds(snapshot))
        .filter(|template| seen.insert(template.description.trim().to_string()))
        .map(|template| template.description.trim().to_string())
        .collect()
}
