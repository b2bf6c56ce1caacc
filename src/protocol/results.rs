use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::AlertLevel;

/// Decision recorded in the final section of an alert-key report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalDecision {
    #[serde(alias = "mantener_naranja")]
    MaintainOrange,
    #[serde(alias = "subir_roja")]
    EscalateToRed,
    #[serde(alias = "mantener_roja")]
    MaintainRed,
    #[serde(alias = "bajar_naranja")]
    DeescalateToOrange,
}

impl FinalDecision {
    pub const fn label(self) -> &'static str {
        match self {
            FinalDecision::MaintainOrange => "Mantener clave naranja",
            FinalDecision::EscalateToRed => "Subir a clave roja",
            FinalDecision::MaintainRed => "Mantener clave roja",
            FinalDecision::DeescalateToOrange => "Bajar a clave naranja",
        }
    }

    /// Alert level in force once the decision is carried out.
    pub const fn resulting_level(self) -> AlertLevel {
        match self {
            FinalDecision::MaintainOrange | FinalDecision::DeescalateToOrange => {
                AlertLevel::Orange
            }
            FinalDecision::EscalateToRed | FinalDecision::MaintainRed => AlertLevel::Red,
        }
    }
}

/// Decisions on offer for each alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOptions {
    /// Green and Yellow evaluations carry no final decision.
    NotApplicable,
    Orange {
        maintain: FinalDecision,
        escalate: FinalDecision,
    },
    Red {
        maintain: FinalDecision,
        deescalate: FinalDecision,
    },
}

impl DecisionOptions {
    pub const fn for_level(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Green | AlertLevel::Yellow => DecisionOptions::NotApplicable,
            AlertLevel::Orange => DecisionOptions::Orange {
                maintain: FinalDecision::MaintainOrange,
                escalate: FinalDecision::EscalateToRed,
            },
            AlertLevel::Red => DecisionOptions::Red {
                maintain: FinalDecision::MaintainRed,
                deescalate: FinalDecision::DeescalateToOrange,
            },
        }
    }

    pub fn choices(self) -> Vec<FinalDecision> {
        match self {
            DecisionOptions::NotApplicable => Vec::new(),
            DecisionOptions::Orange { maintain, escalate } => vec![maintain, escalate],
            DecisionOptions::Red {
                maintain,
                deescalate,
            } => vec![maintain, deescalate],
        }
    }

    pub fn allows(self, decision: FinalDecision) -> bool {
        self.choices().contains(&decision)
    }
}

/// Analysis and decision fields attached to an evaluation after creation.
///
/// Keys this type does not know about are kept in `extra` so that partial updates
/// never drop data written by other clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_evaluation_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<FinalDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_evaluation_timestamp: Option<DateTime<FixedOffset>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Partial update; absent fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultsPatch {
    #[serde(default)]
    pub re_evaluation_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub analysis_text: Option<String>,
    #[serde(default)]
    pub final_decision: Option<FinalDecision>,
    #[serde(default)]
    pub next_evaluation_timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("decision '{}' is not available for a {} alert", .decision.label(), .level.label())]
    DecisionNotAllowed {
        decision: FinalDecision,
        level: AlertLevel,
    },
    #[error("'{key}' must be sent as its own field, not as an extra key")]
    ReservedKey { key: String },
    #[error("malformed evaluation results: {0}")]
    Malformed(#[from] serde_json::Error),
}

const TYPED_KEYS: [&str; 4] = [
    "re_evaluation_time",
    "analysis_text",
    "final_decision",
    "next_evaluation_timestamp",
];

const LEGACY_ANALYSIS_KEYS: [&str; 5] = [
    "effective_movements",
    "potential_additional_add_movements",
    "main_difficulties",
    "facilitating_factors",
    "additional_comments",
];

impl EvaluationResults {
    pub fn from_json_str(raw: &str) -> Result<Self, ResultsError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_string(&self) -> Result<String, ResultsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Merges `patch` after checking the decision against the evaluation's level.
    ///
    /// Extra keys may not shadow the typed fields.
    pub fn apply(&mut self, patch: ResultsPatch, level: AlertLevel) -> Result<(), ResultsError> {
        if let Some(key) = patch
            .extra
            .keys()
            .find(|key| TYPED_KEYS.contains(&key.as_str()))
        {
            return Err(ResultsError::ReservedKey { key: key.clone() });
        }
        if let Some(decision) = patch.final_decision {
            if !DecisionOptions::for_level(level).allows(decision) {
                return Err(ResultsError::DecisionNotAllowed { decision, level });
            }
        }

        if let Some(time) = patch.re_evaluation_time {
            self.re_evaluation_time = Some(time);
        }
        if let Some(text) = patch.analysis_text {
            self.analysis_text = Some(text);
        }
        if let Some(decision) = patch.final_decision {
            self.final_decision = Some(decision);
        }
        if let Some(next) = patch.next_evaluation_timestamp {
            self.next_evaluation_timestamp = Some(next);
        }
        self.extra.extend(patch.extra);
        Ok(())
    }

    /// Stored narrative, or the structured template filled from legacy keys.
    pub fn analysis(&self) -> String {
        if let Some(text) = &self.analysis_text {
            return text.clone();
        }

        let [movements, potential, difficulties, facilitators, comments] =
            LEGACY_ANALYSIS_KEYS.map(|key| self.extra_text(key));

        format!(
            "1. Gestión de Pacientes:\n  * Movimientos Efectivos Realizados: {movements}\n  * Movimientos Potenciales Adicionales Identificados: {potential}\n\n2. Dificultades y Facilitadores:\n  * Principales Dificultades en la Implementación: {difficulties}\n  * Factores que Facilitaron la Gestión: {facilitators}\n\n3. Comentarios y Recomendaciones Adicionales: {comments}"
        )
    }

    fn extra_text(&self, key: &str) -> String {
        match self.extra.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}
