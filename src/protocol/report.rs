use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::domain::{AlertLevel, Evaluation, EvaluationId, MeasureStatus};
use super::results::FinalDecision;
use super::status::in_display_order;
use super::summary::{criteria_fields, format_datetime};

/// Labelled value rendered in a two-column block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportField {
    pub label: String,
    pub value: String,
}

impl ReportField {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeasure {
    pub description: String,
    pub status: MeasureStatus,
}

/// Ordered report sections handed to the external HTML/PDF renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSection {
    GeneralData {
        fields: Vec<ReportField>,
    },
    ActivationCriteria {
        fields: Vec<ReportField>,
    },
    Measures {
        measures: Vec<ReportMeasure>,
    },
    Analysis {
        re_evaluation_time: Option<DateTime<FixedOffset>>,
        analysis: String,
    },
    FinalDecision {
        decision: Option<FinalDecision>,
        next_evaluation: Option<DateTime<FixedOffset>>,
    },
}

impl ReportSection {
    pub const fn title(&self) -> &'static str {
        match self {
            ReportSection::GeneralData { .. } => "1. Datos Generales de la Activación",
            ReportSection::ActivationCriteria { .. } => "2. Criterios de Activación",
            ReportSection::Measures { .. } => "3. Medidas del Protocolo Implementadas",
            ReportSection::Analysis { .. } => "4. Resultados y Análisis",
            ReportSection::FinalDecision { .. } => "5. Decisión Final",
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            ReportSection::GeneralData { fields } | ReportSection::ActivationCriteria { fields } => {
                for field in fields {
                    let _ = writeln!(out, "{}: {}", field.label, field.value);
                }
            }
            ReportSection::Measures { measures } => {
                if measures.is_empty() {
                    out.push_str("No hay medidas registradas.\n");
                }
                for measure in measures {
                    let _ = writeln!(
                        out,
                        "- {} (Estado: {})",
                        measure.description,
                        measure.status.label()
                    );
                }
            }
            ReportSection::Analysis {
                re_evaluation_time,
                analysis,
            } => {
                let time = re_evaluation_time
                    .map(|time| time.format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_else(|| "No registrado".to_string());
                let _ = writeln!(out, "Hora de Reevaluación: {time}");
                let _ = writeln!(out, "Análisis de la Gestión:\n{analysis}");
            }
            ReportSection::FinalDecision {
                decision,
                next_evaluation,
            } => {
                let decision = decision
                    .map(FinalDecision::label)
                    .unwrap_or("No aplica");
                let next = next_evaluation
                    .as_ref()
                    .map(format_datetime)
                    .unwrap_or_else(|| "No aplica".to_string());
                let _ = writeln!(out, "Decisión: {decision}");
                let _ = writeln!(out, "Horario y fecha de próxima evaluación: {next}");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub evaluation_id: EvaluationId,
    pub activated_at: DateTime<FixedOffset>,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("reports are only available for orange or red alerts, found {}", .level.label())]
    NotElevated { level: AlertLevel },
    #[error("report is incomplete, missing: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

/// Assembles the report structure for an Orange or Red evaluation.
pub fn compose(evaluation: &Evaluation) -> Result<ReportDocument, ReportError> {
    if !evaluation.alert_level.is_elevated() {
        return Err(ReportError::NotElevated {
            level: evaluation.alert_level,
        });
    }

    let results = &evaluation.evaluation_results;
    let general = vec![
        ReportField::new(
            "Fecha y Hora de Activación",
            format_datetime(&evaluation.timestamp),
        ),
        ReportField::new(
            "Nombre del evaluador(a)",
            evaluation.snapshot.evaluator_name.clone(),
        ),
        ReportField::new("Nivel de Alerta Alcanzado", evaluation.alert_level.label()),
        ReportField::new(
            "Puntaje Total Obtenido",
            evaluation.total_score().to_string(),
        ),
    ];
    let criteria = criteria_fields(&evaluation.snapshot)
        .into_iter()
        .map(|(label, value)| ReportField::new(label, value))
        .collect();
    let measures = in_display_order(&evaluation.measures)
        .into_iter()
        .map(|measure| ReportMeasure {
            description: measure.description,
            status: measure.status,
        })
        .collect();

    Ok(ReportDocument {
        evaluation_id: evaluation.id,
        activated_at: evaluation.timestamp,
        sections: vec![
            ReportSection::GeneralData { fields: general },
            ReportSection::ActivationCriteria { fields: criteria },
            ReportSection::Measures { measures },
            ReportSection::Analysis {
                re_evaluation_time: results.re_evaluation_time,
                analysis: results.analysis(),
            },
            ReportSection::FinalDecision {
                decision: results.final_decision,
                next_evaluation: results.next_evaluation_timestamp,
            },
        ],
    })
}

/// Checks the fields required before a report may be exported.
pub fn ensure_ready(evaluation: &Evaluation) -> Result<(), ReportError> {
    if !evaluation.alert_level.is_elevated() {
        return Err(ReportError::NotElevated {
            level: evaluation.alert_level,
        });
    }

    let results = &evaluation.evaluation_results;
    let mut missing = Vec::new();
    if results.re_evaluation_time.is_none() {
        missing.push("re_evaluation_time");
    }
    if results.final_decision.is_none() {
        missing.push("final_decision");
    }
    if results.next_evaluation_timestamp.is_none() {
        missing.push("next_evaluation_timestamp");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReportError::Incomplete { missing })
    }
}

impl ReportDocument {
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = write!(out, "\n--- {} ---\n\n", section.title());
            section.render(&mut out);
        }
        out
    }

    pub fn file_name(&self) -> String {
        format!(
            "Informe_Evaluacion_{}.pdf",
            self.activated_at.format("%Y%m%d_%H%M%S")
        )
    }
}
