use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::evaluation::ScoreBreakdown;
use super::results::EvaluationResults;

/// Server-assigned identifier of a persisted evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub u64);

/// Server-assigned identifier of a single measure row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasureId(pub u64);

impl std::fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MeasureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operating situation of the resuscitation bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    ReducedCapacity,
    FullCapacity,
}

impl Scenario {
    /// Minimum patients in the bay (regular plus supernumerary) for a surge activation.
    pub const fn surge_threshold(self) -> u32 {
        match self {
            Scenario::ReducedCapacity => 6,
            Scenario::FullCapacity => 8,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Scenario::ReducedCapacity => "Capacidad Reducida",
            Scenario::FullCapacity => "Capacidad Completa",
        }
    }

    pub(crate) fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reduced_capacity" | "capacidad_reducida" => Some(Self::ReducedCapacity),
            "full_capacity" | "capacidad_completa" => Some(Self::FullCapacity),
            _ => None,
        }
    }

    pub(crate) const fn form_value(self) -> &'static str {
        match self {
            Scenario::ReducedCapacity => "reduced_capacity",
            Scenario::FullCapacity => "full_capacity",
        }
    }
}

/// Activation state of the hospital critical-patient protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalProtocol {
    #[default]
    None,
    Yellow,
    Red,
}

impl CriticalProtocol {
    pub const fn label(self) -> &'static str {
        match self {
            CriticalProtocol::None => "No Activado",
            CriticalProtocol::Yellow => "Clave Amarilla",
            CriticalProtocol::Red => "Clave Roja",
        }
    }

    pub const fn is_active(self) -> bool {
        !matches!(self, CriticalProtocol::None)
    }

    pub(crate) fn from_form(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "yellow" | "amarilla" => Some(Self::Yellow),
            "red" | "roja" => Some(Self::Red),
            _ => None,
        }
    }

    pub(crate) const fn form_value(self) -> &'static str {
        match self {
            CriticalProtocol::None => "none",
            CriticalProtocol::Yellow => "yellow",
            CriticalProtocol::Red => "red",
        }
    }
}

/// Raw evaluation input as gathered from the form, before validation.
///
/// Numeric fields are optional because a blank form field is a validation failure
/// rather than a zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub scenario: Option<Scenario>,
    #[serde(default)]
    pub hospitalized_patients: Option<u32>,
    #[serde(default)]
    pub esi_c2_patients: Option<u32>,
    #[serde(default)]
    pub resuscitation_bay_patients: Option<u32>,
    #[serde(default)]
    pub critical_patient_protocol: CriticalProtocol,
    #[serde(default)]
    pub waiting_72_hours_patients: Option<u32>,
    #[serde(default)]
    pub surge_active: bool,
    #[serde(default)]
    pub surge_patients: Option<u32>,
    #[serde(default)]
    pub evaluator_name: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// Snapshot that passed validation, normalised for scoring and persistence.
///
/// When surge is active `resuscitation_bay_patients` is stored as 0; when inactive
/// `surge_patients` is stored as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedSnapshot {
    pub scenario: Scenario,
    pub hospitalized_patients: u32,
    pub esi_c2_patients: u32,
    pub resuscitation_bay_patients: u32,
    pub critical_patient_protocol: CriticalProtocol,
    pub waiting_72_hours_patients: u32,
    pub surge_active: bool,
    pub surge_patients: u32,
    pub evaluator_name: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl ValidatedSnapshot {
    /// Count used by the resuscitation-bay criterion.
    pub fn resuscitation_load(&self) -> u32 {
        if self.surge_active {
            self.surge_patients
        } else {
            self.resuscitation_bay_patients
        }
    }
}

/// Classified saturation severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    pub const fn ordered() -> [AlertLevel; 4] {
        [
            AlertLevel::Green,
            AlertLevel::Yellow,
            AlertLevel::Orange,
            AlertLevel::Red,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            AlertLevel::Green => "Verde",
            AlertLevel::Yellow => "Amarilla",
            AlertLevel::Orange => "Naranja",
            AlertLevel::Red => "Roja",
        }
    }

    /// Orange and Red evaluations activate an alert key with tracked measures.
    pub const fn is_elevated(self) -> bool {
        matches!(self, AlertLevel::Orange | AlertLevel::Red)
    }
}

/// Progress of a single containment measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureStatus {
    #[default]
    NotApplied,
    InProcess,
    Applied,
}

impl MeasureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MeasureStatus::NotApplied => "No Aplicada",
            MeasureStatus::InProcess => "En Proceso",
            MeasureStatus::Applied => "Aplicada",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MeasureStatus::NotApplied => "not_applied",
            MeasureStatus::InProcess => "in_process",
            MeasureStatus::Applied => "applied",
        }
    }
}

/// Containment measure attached to an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: MeasureId,
    pub description: String,
    pub status: MeasureStatus,
    pub original_order_index: u32,
}

/// Re-evaluation obligation derived from the alert level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reevaluation {
    pub due: DateTime<FixedOffset>,
    pub note: String,
}

/// Persisted outcome of one scoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub snapshot: ValidatedSnapshot,
    pub score: ScoreBreakdown,
    pub alert_level: AlertLevel,
    pub measures: Vec<Measure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reevaluation: Option<Reevaluation>,
    #[serde(default)]
    pub evaluation_results: EvaluationResults,
    pub timestamp: DateTime<FixedOffset>,
}

impl Evaluation {
    pub fn measure(&self, id: MeasureId) -> Option<&Measure> {
        self.measures.iter().find(|measure| measure.id == id)
    }

    pub fn total_score(&self) -> u32 {
        self.score.total_score
    }
}

/// Role of the authenticated principal; only the role matters to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Evaluator,
    Admin,
}

impl Role {
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "evaluator" | "editor" => Role::Evaluator,
            _ => Role::Viewer,
        }
    }

    pub const fn can_edit(self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}
