use crate::infra::{build_service, now_in, parse_timestamp};
use chrono::{DateTime, Duration, FixedOffset};
use clap::Args;
use ed_saturation::config::{AppConfig, ProtocolSettings};
use ed_saturation::error::AppError;
use ed_saturation::protocol::{
    history_csv, Assessment, EvaluationSession, FinalDecision, FormFields, HistoryQuery,
    MeasureStatus, Principal, ProtocolServiceError, ResultsPatch, Role, Snapshot,
    StatisticsCalculator,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Snapshot JSON file (same shape as the POST /api/v1/evaluations body)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the assessment as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First evaluation time (RFC 3339). Defaults to now in the clinical timezone.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) start: Option<DateTime<FixedOffset>>,
    /// Name recorded as evaluator on every demo submission.
    #[arg(long, default_value = "Turno Demo")]
    pub(crate) evaluator: String,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = config.protocol.engine()?;

    let raw = std::fs::read_to_string(&args.input)?;
    let snapshot: Snapshot = serde_json::from_str(&raw)?;
    let assessment = engine
        .assess(&snapshot)
        .map_err(ProtocolServiceError::from)?;

    if args.json {
        let payload = json!({
            "alert_level": assessment.classification.level,
            "band_level": assessment.classification.band_level,
            "applied_overrides": assessment.classification.applied_overrides,
            "score": assessment.score,
            "measures": assessment.measures,
            "reevaluation": assessment.reevaluation,
            "snapshot": assessment.snapshot,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Assessment payload unavailable: {err}"),
        }
    } else {
        render_assessment(&assessment);
    }
    Ok(())
}

fn render_assessment(assessment: &Assessment) {
    let classification = &assessment.classification;
    println!(
        "Nivel de Alerta: {} (puntaje {})",
        classification.level.label(),
        assessment.score.total_score
    );
    if classification.band_level != classification.level {
        println!(
            "  Banda por puntaje: {} | piso aplicado: {}",
            classification.band_level.label(),
            classification.applied_overrides.join(", ")
        );
    }
    println!("Componentes:");
    for component in &assessment.score.components {
        println!(
            "  - {}: {} pts ({})",
            component.criterion.label(),
            component.points,
            component.notes
        );
    }
    if assessment.measures.is_empty() {
        println!("Medidas: sin medidas específicas");
    } else {
        println!("Medidas:");
        for (index, measure) in assessment.measures.iter().enumerate() {
            println!("  {}. {}", index + 1, measure);
        }
    }
    if let Some(reevaluation) = &assessment.reevaluation {
        println!(
            "Reevaluar antes de {} | {}",
            reevaluation.due.format("%d/%m/%Y %H:%M"),
            reevaluation.note
        );
    }
}

struct DemoRound {
    label: &'static str,
    offset_hours: i64,
    form: FormFields,
}

fn form(
    scenario: &str,
    hospitalized: u32,
    esi_c2: u32,
    resuscitation: u32,
    critical: &str,
    waiting_72h: u32,
) -> FormFields {
    FormFields {
        scenario: scenario.to_string(),
        hospitalized_patients: hospitalized.to_string(),
        esi_c2_patients: esi_c2.to_string(),
        resuscitation_bay_patients: resuscitation.to_string(),
        critical_patient_protocol: critical.to_string(),
        waiting_72_hours_patients: waiting_72h.to_string(),
        ..FormFields::default()
    }
}

fn demo_rounds() -> Vec<DemoRound> {
    vec![
        DemoRound {
            label: "morning census",
            offset_hours: 0,
            form: form("reduced_capacity", 20, 5, 3, "none", 0),
        },
        DemoRound {
            label: "midday inflow",
            offset_hours: 2,
            form: form("full_capacity", 25, 10, 6, "none", 1),
        },
        DemoRound {
            label: "resuscitation surge",
            offset_hours: 4,
            form: form("reduced_capacity", 30, 15, 6, "red", 3),
        },
        DemoRound {
            label: "afternoon follow-up",
            offset_hours: 6,
            form: form("reduced_capacity", 20, 10, 4, "none", 1),
        },
    ]
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { start, evaluator } = args;

    let settings = ProtocolSettings::default();
    let start = start.unwrap_or_else(|| now_in(settings.clinical_offset));
    let (service, _repository) = build_service(&settings)?;
    let principal = Principal::new(evaluator.clone(), Role::Evaluator);
    let mut session = EvaluationSession::new(service.clone(), principal);

    println!("Saturation protocol demo (evaluator: {evaluator})");
    let mut submitted = Vec::new();
    for round in demo_rounds() {
        session.reset_working_state();
        let form = session.form_mut();
        *form = round.form;
        form.evaluator_name = evaluator.clone();
        form.apply_surge_autofill();

        let timestamp = start + Duration::hours(round.offset_hours);
        match session.submit(timestamp) {
            Ok(evaluation) => {
                println!(
                    "- {} -> {} (score {}, {} measures)",
                    round.label,
                    evaluation.alert_level.label(),
                    evaluation.total_score(),
                    evaluation.measures.len()
                );
                submitted.push(evaluation);
            }
            Err(err) => println!("- {} rejected: {}", round.label, err),
        }
    }

    let Some(latest) = submitted.last().cloned() else {
        println!("No evaluations were stored");
        return Ok(());
    };

    println!("\nMeasure tracking on evaluation {}", latest.id);
    let targets = [MeasureStatus::Applied, MeasureStatus::InProcess];
    for (measure, status) in latest.measures.iter().zip(targets) {
        match session.set_measure_status(latest.id, measure.id, status) {
            Ok(updated) => println!("  - {} -> {}", updated.description, updated.status.label()),
            Err(err) => println!("  - update failed: {err}"),
        }
    }
    match session.calculator_clipboard() {
        Ok(text) => println!("\nClipboard text:\n{text}"),
        Err(err) => println!("\nClipboard text unavailable: {err}"),
    }

    if let Some(stale) = submitted.get(1) {
        if let Some(measure) = stale.measures.first() {
            println!("\nEditing a measure outside the edit window (evaluation {})", stale.id);
            match session.set_measure_status(stale.id, measure.id, MeasureStatus::Applied) {
                Ok(_) => println!("  unexpectedly accepted"),
                Err(err) => println!("  refused: {err}"),
            }
        }
    }

    let patch = ResultsPatch {
        re_evaluation_time: Some(latest.timestamp + Duration::hours(2)),
        analysis_text: Some(
            "Se habilitaron camas de observación y se priorizaron altas pendientes.".to_string(),
        ),
        final_decision: Some(FinalDecision::MaintainOrange),
        next_evaluation_timestamp: Some(latest.timestamp + Duration::hours(4)),
        ..ResultsPatch::default()
    };
    if let Err(err) = session.update_results(latest.id, patch) {
        println!("\nAnalysis update failed: {err}");
    }

    match session.share_message(latest.id) {
        Ok(message) => println!("\nShare message:\n{message}"),
        Err(err) => println!("\nShare message unavailable: {err}"),
    }
    match session.export_report(latest.id) {
        Ok(report) => {
            println!("Report {}:", report.file_name());
            println!("{}", report.to_plain_text());
        }
        Err(err) => println!("Report unavailable: {err}"),
    }

    let history = match service.history(&HistoryQuery::default()) {
        Ok(history) => history,
        Err(err) => {
            println!("History unavailable: {err}");
            return Ok(());
        }
    };
    let statistics = StatisticsCalculator::default().compute(&history);
    println!(
        "Statistics: {} evaluations | {} containment keys | {} intervention keys | avg SAR {:.1}",
        statistics.total_evaluations,
        statistics.containment_keys,
        statistics.intervention_keys,
        statistics.average_surge_patients
    );
    for entry in &statistics.series {
        println!(
            "  - {} {}: {} evaluations, highest {}",
            entry.reporting_day,
            entry.shift.label(),
            entry.evaluations,
            entry.highest_alert.label()
        );
    }

    println!("\nCSV export:\n{}", history_csv(&history)?);
    Ok(())
}
