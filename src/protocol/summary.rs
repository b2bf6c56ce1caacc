//! Deterministic plain-text renderings of an evaluation.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};

use super::domain::{Evaluation, ValidatedSnapshot};
use super::status::in_display_order;

pub const PROTOCOL_TYPE_LABEL: &str = "Médico Quirúrgico";

pub(crate) fn format_datetime(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Labelled, localized snapshot fields in their fixed presentation order.
pub fn criteria_fields(snapshot: &ValidatedSnapshot) -> Vec<(&'static str, String)> {
    let resuscitation = if snapshot.surge_active {
        "SAR activo".to_string()
    } else {
        snapshot.resuscitation_bay_patients.to_string()
    };

    vec![
        ("Escenario", snapshot.scenario.label().to_string()),
        (
            "Pacientes Hospitalizados",
            snapshot.hospitalized_patients.to_string(),
        ),
        ("Pacientes ESI C2", snapshot.esi_c2_patients.to_string()),
        ("Pacientes en Reanimador", resuscitation),
        (
            "Protocolo Paciente Crítico",
            snapshot.critical_patient_protocol.label().to_string(),
        ),
        (
            "Pacientes en Espera > 72h",
            snapshot.waiting_72_hours_patients.to_string(),
        ),
        (
            "SAR Activo",
            if snapshot.surge_active { "Sí" } else { "No" }.to_string(),
        ),
        ("Pacientes en SAR", snapshot.surge_patients.to_string()),
    ]
}

/// Shareable message for messaging apps. Analysis and decision fields are never included.
pub fn share_message(evaluation: &Evaluation) -> String {
    let mut message = String::from("*Evaluación de Saturación Hospitalaria*\n");
    let _ = writeln!(message, "Fecha: {}", format_datetime(&evaluation.timestamp));
    let _ = writeln!(message, "Tipo de Protocolo: {PROTOCOL_TYPE_LABEL}");
    let _ = writeln!(message, "Nivel de Alerta: {}", evaluation.alert_level.label());
    let _ = writeln!(message, "Puntaje: {}", evaluation.total_score());
    let _ = writeln!(
        message,
        "Evaluador: {}\n",
        evaluation.snapshot.evaluator_name
    );

    message.push_str("*Detalles de la Evaluación*\n");
    for (label, value) in criteria_fields(&evaluation.snapshot) {
        let _ = writeln!(message, "{label}: {value}");
    }
    message
}

/// Text copied from the calculator view: level, score, measures in display order, note.
pub fn calculator_clipboard(evaluation: &Evaluation) -> String {
    let measures = in_display_order(&evaluation.measures);
    let measures_text = if measures.is_empty() {
        "Sin medidas específicas.".to_string()
    } else {
        measures
            .iter()
            .map(|measure| format!("- {} ({})", measure.description, measure.status.label()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let note = evaluation
        .reevaluation
        .as_ref()
        .map(|reevaluation| format!("Nota: {}", reevaluation.note))
        .unwrap_or_default();

    format!(
        "Resultados del Protocolo de Saturación:\n- Nivel de Alerta: {}\n- Puntaje Total: {}\n\nMedidas a Aplicar:\n{measures_text}\n\n{note}",
        evaluation.alert_level.label(),
        evaluation.total_score(),
    )
    .trim()
    .to_string()
}
