use serde::{Deserialize, Serialize};

use super::super::domain::{AlertLevel, CriticalProtocol, Scenario};

/// Rule tables driving scoring, classification, measure selection, and re-evaluation.
///
/// Every threshold lives here as data so the clinical protocol can be revised without
/// touching the algorithms that consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub scoring: ScoringTables,
    pub bands: AlertBands,
    #[serde(default)]
    pub overrides: Vec<AlertFloor>,
    pub measures: MeasureCatalog,
    #[serde(default)]
    pub reevaluation: ReevaluationPolicy,
}

/// One row of a step table: counts at or above `min_count` earn `points`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreStep {
    pub min_count: u32,
    pub points: u32,
}

/// Monotonic step table keyed by patient count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepTable {
    pub steps: Vec<ScoreStep>,
}

impl StepTable {
    pub fn new(steps: &[(u32, u32)]) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|&(min_count, points)| ScoreStep { min_count, points })
                .collect(),
        }
    }

    /// Points of the highest step reached by `count`, or 0 below the first step.
    pub fn points_for(&self, count: u32) -> u32 {
        self.steps
            .iter()
            .take_while(|step| step.min_count <= count)
            .last()
            .map(|step| step.points)
            .unwrap_or(0)
    }

    fn check(&self, criterion: &'static str) -> Result<(), RulesError> {
        if self.steps.is_empty() {
            return Err(RulesError::EmptyStepTable { criterion });
        }
        for pair in self.steps.windows(2) {
            if pair[1].min_count <= pair[0].min_count {
                return Err(RulesError::StepThresholdsNotAscending { criterion });
            }
            if pair[1].points < pair[0].points {
                return Err(RulesError::StepPointsDecreasing { criterion });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalProtocolPoints {
    pub none: u32,
    pub yellow: u32,
    pub red: u32,
}

impl CriticalProtocolPoints {
    pub fn points_for(&self, protocol: CriticalProtocol) -> u32 {
        match protocol {
            CriticalProtocol::None => self.none,
            CriticalProtocol::Yellow => self.yellow,
            CriticalProtocol::Red => self.red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringTables {
    pub hospitalized_patients: StepTable,
    pub esi_c2_patients: StepTable,
    pub resuscitation_reduced_capacity: StepTable,
    pub resuscitation_full_capacity: StepTable,
    pub waiting_72_hours_patients: StepTable,
    pub critical_patient_protocol: CriticalProtocolPoints,
}

impl ScoringTables {
    pub fn resuscitation(&self, scenario: Scenario) -> &StepTable {
        match scenario {
            Scenario::ReducedCapacity => &self.resuscitation_reduced_capacity,
            Scenario::FullCapacity => &self.resuscitation_full_capacity,
        }
    }
}

/// Inclusive lower bounds of the Yellow, Orange, and Red bands; Green starts at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertBands {
    pub yellow_from: u32,
    pub orange_from: u32,
    pub red_from: u32,
}

impl AlertBands {
    pub fn level_for(&self, total_score: u32) -> AlertLevel {
        if total_score >= self.red_from {
            AlertLevel::Red
        } else if total_score >= self.orange_from {
            AlertLevel::Orange
        } else if total_score >= self.yellow_from {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        }
    }
}

/// Condition that forces a minimum alert level regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideTrigger {
    CriticalProtocol { level: CriticalProtocol },
    SurgeActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFloor {
    pub trigger: OverrideTrigger,
    pub floor: AlertLevel,
}

/// Snapshot condition a candidate measure depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureCondition {
    #[default]
    Always,
    SurgeActive,
    CriticalProtocolActive,
    LongStayWaiting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureTemplate {
    pub description: String,
    #[serde(default)]
    pub condition: MeasureCondition,
}

impl MeasureTemplate {
    pub fn new(description: &str, condition: MeasureCondition) -> Self {
        Self {
            description: description.to_string(),
            condition,
        }
    }
}

/// Candidate measures per alert level. Green carries none.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeasureCatalog {
    #[serde(default)]
    pub yellow: Vec<MeasureTemplate>,
    #[serde(default)]
    pub orange: Vec<MeasureTemplate>,
    #[serde(default)]
    pub red: Vec<MeasureTemplate>,
}

impl MeasureCatalog {
    pub fn candidates(&self, level: AlertLevel) -> &[MeasureTemplate] {
        match level {
            AlertLevel::Green => &[],
            AlertLevel::Yellow => &self.yellow,
            AlertLevel::Orange => &self.orange,
            AlertLevel::Red => &self.red,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReevaluationRule {
    pub interval_minutes: u32,
    pub note: String,
}

/// Re-evaluation obligations per alert level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReevaluationPolicy {
    #[serde(default)]
    pub green: Option<ReevaluationRule>,
    #[serde(default)]
    pub yellow: Option<ReevaluationRule>,
    #[serde(default)]
    pub orange: Option<ReevaluationRule>,
    #[serde(default)]
    pub red: Option<ReevaluationRule>,
}

impl ReevaluationPolicy {
    pub fn rule_for(&self, level: AlertLevel) -> Option<&ReevaluationRule> {
        match level {
            AlertLevel::Green => self.green.as_ref(),
            AlertLevel::Yellow => self.yellow.as_ref(),
            AlertLevel::Orange => self.orange.as_ref(),
            AlertLevel::Red => self.red.as_ref(),
        }
    }
}

/// Rejected rule tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("step table for {criterion} is empty")]
    EmptyStepTable { criterion: &'static str },
    #[error("step thresholds for {criterion} must be strictly ascending")]
    StepThresholdsNotAscending { criterion: &'static str },
    #[error("step points for {criterion} must not decrease")]
    StepPointsDecreasing { criterion: &'static str },
    #[error("alert band lower bounds must satisfy 0 < yellow < orange < red")]
    BandsNotAscending,
    #[error("measure description at {level:?} position {index} is blank")]
    BlankMeasure { level: AlertLevel, index: usize },
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), RulesError> {
        let scoring = &self.scoring;
        scoring
            .hospitalized_patients
            .check("hospitalized_patients")?;
        scoring.esi_c2_patients.check("esi_c2_patients")?;
        scoring
            .resuscitation_reduced_capacity
            .check("resuscitation_reduced_capacity")?;
        scoring
            .resuscitation_full_capacity
            .check("resuscitation_full_capacity")?;
        scoring
            .waiting_72_hours_patients
            .check("waiting_72_hours_patients")?;

        let bands = &self.bands;
        if !(0 < bands.yellow_from
            && bands.yellow_from < bands.orange_from
            && bands.orange_from < bands.red_from)
        {
            return Err(RulesError::BandsNotAscending);
        }

        for level in AlertLevel::ordered() {
            for (index, template) in self.measures.candidates(level).iter().enumerate() {
                if template.description.trim().is_empty() {
                    return Err(RulesError::BlankMeasure { level, index });
                }
            }
        }

        Ok(())
    }
}

const NOTIFY_SHIFT_LEAD: &str = "Notificar al jefe de turno de la Unidad de Emergencia.";
const SURGE_SUPPORT: &str = "Activar el protocolo de Sobresaturación Aguda de Reanimador (SAR) y reasignar personal de apoyo al reanimador.";

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringTables {
                hospitalized_patients: StepTable::new(&[(0, 0), (10, 1), (20, 2), (30, 3)]),
                esi_c2_patients: StepTable::new(&[(0, 0), (5, 1), (10, 2), (15, 3)]),
                resuscitation_reduced_capacity: StepTable::new(&[(0, 0), (3, 1), (4, 2), (6, 3)]),
                resuscitation_full_capacity: StepTable::new(&[(0, 0), (4, 1), (6, 2), (8, 3)]),
                waiting_72_hours_patients: StepTable::new(&[(0, 0), (1, 1), (3, 2), (5, 3)]),
                critical_patient_protocol: CriticalProtocolPoints {
                    none: 0,
                    yellow: 1,
                    red: 2,
                },
            },
            bands: AlertBands {
                yellow_from: 4,
                orange_from: 7,
                red_from: 10,
            },
            overrides: vec![AlertFloor {
                trigger: OverrideTrigger::CriticalProtocol {
                    level: CriticalProtocol::Red,
                },
                floor: AlertLevel::Orange,
            }],
            measures: MeasureCatalog {
                yellow: vec![
                    MeasureTemplate::new(NOTIFY_SHIFT_LEAD, MeasureCondition::Always),
                    MeasureTemplate::new(
                        "Priorizar altas y traslados pendientes de pacientes hospitalizados en la Unidad de Emergencia.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(
                        "Reforzar la categorización de pacientes en el triage.",
                        MeasureCondition::Always,
                    ),
                ],
                orange: vec![
                    MeasureTemplate::new(NOTIFY_SHIFT_LEAD, MeasureCondition::Always),
                    MeasureTemplate::new(
                        "Informar a la Subdirección Médica y a la Unidad de Gestión de Camas.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(
                        "Activar camas de contingencia en los servicios clínicos.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(
                        "Habilitar boxes adicionales para la atención de pacientes ESI C2.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(SURGE_SUPPORT, MeasureCondition::SurgeActive),
                    MeasureTemplate::new(
                        "Coordinar con el equipo de paciente crítico la derivación a unidades de paciente crítico.",
                        MeasureCondition::CriticalProtocolActive,
                    ),
                ],
                red: vec![
                    MeasureTemplate::new(
                        "Informar a la Dirección del establecimiento.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(
                        "Suspender la hospitalización electiva y las cirugías no urgentes.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(
                        "Solicitar apoyo a la red asistencial para la derivación de pacientes.",
                        MeasureCondition::Always,
                    ),
                    MeasureTemplate::new(SURGE_SUPPORT, MeasureCondition::SurgeActive),
                    MeasureTemplate::new(
                        "Gestionar el traslado prioritario de pacientes con más de 72 horas en espera de cama.",
                        MeasureCondition::LongStayWaiting,
                    ),
                ],
            },
            reevaluation: ReevaluationPolicy {
                green: None,
                yellow: Some(ReevaluationRule {
                    interval_minutes: 240,
                    note: "Reevaluar el nivel de saturación en 4 horas.".to_string(),
                }),
                orange: Some(ReevaluationRule {
                    interval_minutes: 120,
                    note: "Reevaluar el nivel de saturación en 2 horas y registrar el análisis de gestión.".to_string(),
                }),
                red: Some(ReevaluationRule {
                    interval_minutes: 60,
                    note: "Reevaluar el nivel de saturación en 1 hora y registrar el análisis de gestión.".to_string(),
                }),
            },
        }
    }
}
