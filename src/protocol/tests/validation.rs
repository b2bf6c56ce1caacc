use super::common::*;
use crate::protocol::domain::{Scenario, Snapshot};
use crate::protocol::validation::ValidationError;
use chrono::{FixedOffset, TimeZone};

#[test]
fn blank_required_fields_are_reported_together() {
    let snapshot = Snapshot {
        evaluator_name: "Dra. Rojas".to_string(),
        resuscitation_bay_patients: Some(2),
        timestamp: at(9, 0),
        ..Snapshot::default()
    };

    match engine().validate(&snapshot) {
        Err(ValidationError::MissingRequiredFields { fields }) => assert_eq!(
            fields,
            vec![
                "scenario",
                "hospitalized_patients",
                "esi_c2_patients",
                "waiting_72_hours_patients"
            ]
        ),
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[test]
fn missing_fields_take_precedence_over_evaluator() {
    let mut snapshot = yellow_snapshot();
    snapshot.hospitalized_patients = None;
    snapshot.evaluator_name = String::new();

    match engine().validate(&snapshot) {
        Err(ValidationError::MissingRequiredFields { fields }) => {
            assert_eq!(fields, vec!["hospitalized_patients"])
        }
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[test]
fn resuscitation_bay_is_required_without_surge() {
    let mut snapshot = yellow_snapshot();
    snapshot.resuscitation_bay_patients = None;

    assert_eq!(
        engine().validate(&snapshot),
        Err(ValidationError::MissingResuscitationBay)
    );
}

#[test]
fn surge_below_reduced_capacity_threshold_is_rejected() {
    let snapshot = surge(yellow_snapshot(), 5);

    let err = engine()
        .validate(&snapshot)
        .expect_err("five surge patients are not enough");
    assert_eq!(
        err,
        ValidationError::SurgeBelowThreshold {
            scenario: Scenario::ReducedCapacity,
            threshold: 6,
            found: Some(5),
        }
    );
    assert_eq!(
        err.to_string(),
        "surge patients must be >= 6 for reduced capacity"
    );
}

#[test]
fn surge_threshold_depends_on_scenario() {
    let full = surge(snapshot(Scenario::FullCapacity, 10, 5, 0, 0), 7);
    assert!(matches!(
        engine().validate(&full),
        Err(ValidationError::SurgeBelowThreshold { threshold: 8, .. })
    ));

    let full = surge(snapshot(Scenario::FullCapacity, 10, 5, 0, 0), 8);
    assert!(engine().validate(&full).is_ok());
}

#[test]
fn surge_without_count_is_rejected() {
    let mut snapshot = yellow_snapshot();
    snapshot.surge_active = true;

    assert!(matches!(
        engine().validate(&snapshot),
        Err(ValidationError::SurgeBelowThreshold { found: None, .. })
    ));
}

#[test]
fn blank_evaluator_is_rejected_after_other_rules() {
    let mut snapshot = yellow_snapshot();
    snapshot.evaluator_name = "   ".to_string();

    assert_eq!(
        engine().validate(&snapshot),
        Err(ValidationError::MissingEvaluator)
    );
}

#[test]
fn active_surge_zeroes_the_regular_bay_count() {
    let mut snapshot = surge(yellow_snapshot(), 7);
    snapshot.resuscitation_bay_patients = Some(4);

    let validated = validated(&snapshot);
    assert_eq!(validated.resuscitation_bay_patients, 0);
    assert_eq!(validated.surge_patients, 7);
    assert_eq!(validated.resuscitation_load(), 7);
}

#[test]
fn inactive_surge_zeroes_the_surge_count() {
    let mut snapshot = yellow_snapshot();
    snapshot.surge_patients = Some(9);

    let validated = validated(&snapshot);
    assert_eq!(validated.surge_patients, 0);
    assert_eq!(validated.resuscitation_bay_patients, 3);
}

#[test]
fn evaluator_is_trimmed_and_timestamp_moved_to_clinical_offset() {
    let utc = FixedOffset::east_opt(0).expect("valid offset");
    let mut snapshot = yellow_snapshot();
    snapshot.evaluator_name = "  Dr. Soto ".to_string();
    snapshot.timestamp = utc
        .with_ymd_and_hms(2024, 5, 2, 15, 30, 0)
        .single()
        .expect("valid timestamp");

    let validated = validated(&snapshot);
    assert_eq!(validated.evaluator_name, "Dr. Soto");
    assert_eq!(validated.timestamp, at(12, 30));
    assert_eq!(validated.timestamp.offset(), &clinical_offset());
}
