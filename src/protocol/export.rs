use std::io::Write;

use serde::Serialize;

use super::domain::{Evaluation, MeasureStatus};

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Encoding(std::string::FromUtf8Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "failed to write history export: {}", err),
            ExportError::Csv(err) => write!(f, "invalid history CSV data: {}", err),
            ExportError::Encoding(err) => write!(f, "history export is not valid UTF-8: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Encoding(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding(err)
    }
}

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(rename = "Fecha")]
    timestamp: String,
    #[serde(rename = "Evaluador")]
    evaluator: &'a str,
    #[serde(rename = "Nivel de Alerta")]
    alert_level: &'static str,
    #[serde(rename = "Puntaje")]
    total_score: u32,
    #[serde(rename = "Escenario")]
    scenario: &'static str,
    #[serde(rename = "Pacientes Hospitalizados")]
    hospitalized_patients: u32,
    #[serde(rename = "Pacientes ESI C2")]
    esi_c2_patients: u32,
    #[serde(rename = "Pacientes en Reanimador")]
    resuscitation_bay_patients: u32,
    #[serde(rename = "Protocolo Paciente Crítico")]
    critical_patient_protocol: &'static str,
    #[serde(rename = "Pacientes en Espera > 72h")]
    waiting_72_hours_patients: u32,
    #[serde(rename = "SAR Activo")]
    surge_active: &'static str,
    #[serde(rename = "Pacientes en SAR")]
    surge_patients: u32,
    #[serde(rename = "Medidas Aplicadas")]
    applied: usize,
    #[serde(rename = "Medidas En Proceso")]
    in_process: usize,
    #[serde(rename = "Medidas No Aplicadas")]
    not_applied: usize,
}

impl<'a> HistoryRow<'a> {
    fn from_evaluation(evaluation: &'a Evaluation) -> Self {
        let count = |status: MeasureStatus| {
            evaluation
                .measures
                .iter()
                .filter(|measure| measure.status == status)
                .count()
        };
        let snapshot = &evaluation.snapshot;

        Self {
            id: evaluation.id.0,
            timestamp: evaluation.timestamp.to_rfc3339(),
            evaluator: &snapshot.evaluator_name,
            alert_level: evaluation.alert_level.label(),
            total_score: evaluation.total_score(),
            scenario: snapshot.scenario.label(),
            hospitalized_patients: snapshot.hospitalized_patients,
            esi_c2_patients: snapshot.esi_c2_patients,
            resuscitation_bay_patients: snapshot.resuscitation_bay_patients,
            critical_patient_protocol: snapshot.critical_patient_protocol.label(),
            waiting_72_hours_patients: snapshot.waiting_72_hours_patients,
            surge_active: if snapshot.surge_active { "Sí" } else { "No" },
            surge_patients: snapshot.surge_patients,
            applied: count(MeasureStatus::Applied),
            in_process: count(MeasureStatus::InProcess),
            not_applied: count(MeasureStatus::NotApplied),
        }
    }
}

/// Writes one CSV row per evaluation, in the order given.
pub fn write_history<W: Write>(writer: W, evaluations: &[Evaluation]) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    for evaluation in evaluations {
        csv_writer.serialize(HistoryRow::from_evaluation(evaluation))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn history_csv(evaluations: &[Evaluation]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_history(&mut buffer, evaluations)?;
    Ok(String::from_utf8(buffer)?)
}
