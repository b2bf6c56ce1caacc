mod config;
mod policy;
mod rules;

pub use config::{
    AlertBands, AlertFloor, CriticalProtocolPoints, MeasureCatalog, MeasureCondition,
    MeasureTemplate, OverrideTrigger, ProtocolConfig, ReevaluationPolicy, ReevaluationRule,
    RulesError, ScoreStep, ScoringTables, StepTable,
};
pub use policy::AlertClassification;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use super::domain::{AlertLevel, Reevaluation, Snapshot, ValidatedSnapshot};
use super::measures::select_measures;
use super::validation::{SnapshotValidator, ValidationError};

/// Stateless engine running validation, scoring, classification, and measure selection.
#[derive(Debug, Clone)]
pub struct ProtocolEngine {
    validator: SnapshotValidator,
    config: ProtocolConfig,
}

impl ProtocolEngine {
    pub fn new(config: ProtocolConfig, clinical_offset: FixedOffset) -> Self {
        Self {
            validator: SnapshotValidator::new(clinical_offset),
            config,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn clinical_offset(&self) -> FixedOffset {
        self.validator.clinical_offset()
    }

    pub fn validate(&self, snapshot: &Snapshot) -> Result<ValidatedSnapshot, ValidationError> {
        self.validator.validate(snapshot)
    }

    pub fn score(&self, snapshot: &ValidatedSnapshot) -> ScoreBreakdown {
        rules::score_snapshot(snapshot, &self.config.scoring)
    }

    pub fn classify(&self, total_score: u32, snapshot: &ValidatedSnapshot) -> AlertClassification {
        policy::classify(
            total_score,
            snapshot,
            &self.config.bands,
            &self.config.overrides,
        )
    }

    pub fn select_measures(&self, level: AlertLevel, snapshot: &ValidatedSnapshot) -> Vec<String> {
        select_measures(level, snapshot, &self.config.measures)
    }

    pub fn reevaluation(
        &self,
        level: AlertLevel,
        evaluated_at: DateTime<FixedOffset>,
    ) -> Option<Reevaluation> {
        self.config
            .reevaluation
            .rule_for(level)
            .map(|rule| Reevaluation {
                due: evaluated_at + Duration::minutes(i64::from(rule.interval_minutes)),
                note: rule.note.clone(),
            })
    }

    /// Runs the full pipeline, short-circuiting on validation failure.
    pub fn assess(&self, snapshot: &Snapshot) -> Result<Assessment, ValidationError> {
        let snapshot = self.validate(snapshot)?;
        let score = self.score(&snapshot);
        let classification = self.classify(score.total_score, &snapshot);
        let measures = self.select_measures(classification.level, &snapshot);
        let reevaluation = self.reevaluation(classification.level, snapshot.timestamp);

        Ok(Assessment {
            snapshot,
            score,
            classification,
            measures,
            reevaluation,
        })
    }
}

/// Scored criteria, identified independently of their display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    HospitalizedPatients,
    EsiC2Patients,
    ResuscitationBay,
    Waiting72Hours,
    CriticalPatientProtocol,
}

impl Criterion {
    pub const fn label(self) -> &'static str {
        match self {
            Criterion::HospitalizedPatients => "Pacientes Hospitalizados",
            Criterion::EsiC2Patients => "Pacientes ESI C2 en Espera y Atención",
            Criterion::ResuscitationBay => "Pacientes en Reanimador",
            Criterion::Waiting72Hours => "Pacientes >72 horas en UEH",
            Criterion::CriticalPatientProtocol => "Protocolo Paciente Crítico",
        }
    }
}

/// Discrete contribution of one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: Criterion,
    pub count: u32,
    pub points: u32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub components: Vec<ScoreComponent>,
    pub total_score: u32,
}

impl ScoreBreakdown {
    pub fn points(&self, criterion: Criterion) -> u32 {
        self.components
            .iter()
            .filter(|component| component.criterion == criterion)
            .map(|component| component.points)
            .sum()
    }
}

/// Output of the pure pipeline, ready to be persisted as an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub snapshot: ValidatedSnapshot,
    pub score: ScoreBreakdown,
    pub classification: AlertClassification,
    pub measures: Vec<String>,
    pub reevaluation: Option<Reevaluation>,
}
