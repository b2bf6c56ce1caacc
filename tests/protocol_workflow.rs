use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use ed_saturation::protocol::{
    history_csv, AlertLevel, EditWindowPolicy, EvaluationSession, FinalDecision, FormFields,
    HistoryQuery, InMemoryEvaluationRepository, MeasureStatus, Principal, ProtocolConfig,
    ProtocolEngine, ProtocolService, ResultsPatch, Role, SessionError,
};

type Service = ProtocolService<InMemoryEvaluationRepository, EditWindowPolicy>;

fn start() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(3 * 3600)
        .expect("valid offset")
        .with_ymd_and_hms(2024, 5, 2, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn service() -> Arc<Service> {
    let engine = ProtocolEngine::new(ProtocolConfig::default(), start().timezone());
    Arc::new(ProtocolService::new(
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(EditWindowPolicy::default()),
        engine,
    ))
}

fn form(scenario: &str, counts: [u32; 4], critical: &str) -> FormFields {
    let [hospitalized, esi_c2, resuscitation, waiting] = counts;
    FormFields {
        scenario: scenario.to_string(),
        hospitalized_patients: hospitalized.to_string(),
        esi_c2_patients: esi_c2.to_string(),
        resuscitation_bay_patients: resuscitation.to_string(),
        critical_patient_protocol: critical.to_string(),
        waiting_72_hours_patients: waiting.to_string(),
        evaluator_name: "Dr. Fuentes".to_string(),
        ..FormFields::default()
    }
}

#[test]
fn shift_round_from_intake_to_report() {
    let service = service();
    let principal = Principal::new("Dr. Fuentes", Role::Evaluator);
    let mut session = EvaluationSession::new(service.clone(), principal);

    let rounds = [
        form("reduced_capacity", [20, 5, 3, 0], "none"),
        form("full_capacity", [25, 10, 6, 1], "none"),
        form("reduced_capacity", [30, 15, 6, 3], "red"),
    ];
    let mut levels = Vec::new();
    for (hour, round) in rounds.into_iter().enumerate() {
        session.reset_working_state();
        *session.form_mut() = round;
        session.form_mut().apply_surge_autofill();
        let stored = session
            .submit(start() + Duration::hours(hour as i64 * 2))
            .expect("round submits");
        levels.push(stored.alert_level);
    }
    assert_eq!(
        levels,
        vec![AlertLevel::Yellow, AlertLevel::Orange, AlertLevel::Red]
    );

    let latest = session
        .state()
        .current
        .clone()
        .expect("latest evaluation is current");
    assert!(latest.snapshot.surge_active);
    assert_eq!(latest.snapshot.surge_patients, 6);

    let first_measure = latest.measures[0].id;
    session
        .set_measure_status(latest.id, first_measure, MeasureStatus::Applied)
        .expect("latest key is editable");
    let clipboard = session.calculator_clipboard().expect("calculator has a result");
    assert!(clipboard.contains("(Aplicada)"));

    session
        .update_results(
            latest.id,
            ResultsPatch {
                re_evaluation_time: Some(latest.timestamp + Duration::hours(1)),
                analysis_text: Some("Se gestionaron traslados a la red.".to_string()),
                final_decision: Some(FinalDecision::MaintainRed),
                next_evaluation_timestamp: Some(latest.timestamp + Duration::hours(2)),
                ..ResultsPatch::default()
            },
        )
        .expect("results accepted");

    let report = session.export_report(latest.id).expect("report is ready");
    let text = report.to_plain_text();
    assert!(text.contains("Nivel de Alerta Alcanzado: Roja"));
    assert!(text.contains("Se gestionaron traslados a la red."));
    assert!(text.contains("Decisión: Mantener clave roja"));

    let history = service
        .history(&HistoryQuery::default())
        .expect("history loads");
    assert_eq!(history.len(), 3);
    let csv = history_csv(&history).expect("export succeeds");
    assert_eq!(csv.lines().count(), 4);

    let statistics = service
        .statistics(&HistoryQuery::default())
        .expect("statistics load");
    assert_eq!(statistics.containment_keys, 1);
    assert_eq!(statistics.intervention_keys, 2);
}

#[test]
fn yellow_key_cannot_export_a_report() {
    let service = service();
    let mut session =
        EvaluationSession::new(service, Principal::new("Dr. Fuentes", Role::Evaluator));
    *session.form_mut() = form("reduced_capacity", [20, 5, 3, 0], "none");

    let stored = session.submit(start()).expect("form submits");
    assert!(matches!(
        session.report(stored.id),
        Err(SessionError::Report(_))
    ));
}
