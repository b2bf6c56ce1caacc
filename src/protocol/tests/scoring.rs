use super::common::*;
use crate::protocol::domain::{CriticalProtocol, Scenario};
use crate::protocol::evaluation::{Criterion, ProtocolConfig, ProtocolEngine, StepTable};

#[test]
fn step_tables_award_the_highest_reached_step() {
    let table = StepTable::new(&[(0, 0), (10, 1), (20, 2), (30, 3)]);

    assert_eq!(table.points_for(0), 0);
    assert_eq!(table.points_for(9), 0);
    assert_eq!(table.points_for(10), 1);
    assert_eq!(table.points_for(29), 2);
    assert_eq!(table.points_for(300), 3);
}

#[test]
fn counts_below_the_first_step_score_zero() {
    let table = StepTable::new(&[(5, 2)]);
    assert_eq!(table.points_for(4), 0);
    assert_eq!(table.points_for(5), 2);
}

#[test]
fn yellow_example_scores_four() {
    let snapshot = validated(&yellow_snapshot());
    let breakdown = engine().score(&snapshot);

    assert_eq!(breakdown.components.len(), 5);
    assert_eq!(breakdown.points(Criterion::HospitalizedPatients), 2);
    assert_eq!(breakdown.points(Criterion::EsiC2Patients), 1);
    assert_eq!(breakdown.points(Criterion::ResuscitationBay), 1);
    assert_eq!(breakdown.points(Criterion::Waiting72Hours), 0);
    assert_eq!(breakdown.points(Criterion::CriticalPatientProtocol), 0);
    assert_eq!(breakdown.total_score, 4);
}

#[test]
fn total_is_the_sum_of_components() {
    for snapshot in [green_snapshot(), yellow_snapshot(), orange_snapshot(), red_snapshot()] {
        let breakdown = engine().score(&validated(&snapshot));
        let sum: u32 = breakdown.components.iter().map(|c| c.points).sum();
        assert_eq!(breakdown.total_score, sum);
    }
}

#[test]
fn resuscitation_table_follows_scenario() {
    let reduced = validated(&snapshot(Scenario::ReducedCapacity, 0, 0, 4, 0));
    let full = validated(&snapshot(Scenario::FullCapacity, 0, 0, 4, 0));

    assert_eq!(engine().score(&reduced).points(Criterion::ResuscitationBay), 2);
    assert_eq!(engine().score(&full).points(Criterion::ResuscitationBay), 1);
}

#[test]
fn surge_count_replaces_the_bay_count() {
    let mut with_surge = surge(snapshot(Scenario::ReducedCapacity, 0, 0, 0, 0), 6);
    with_surge.resuscitation_bay_patients = Some(1);
    let breakdown = engine().score(&validated(&with_surge));

    let component = breakdown
        .components
        .iter()
        .find(|c| c.criterion == Criterion::ResuscitationBay)
        .expect("resuscitation component present");
    assert_eq!(component.count, 6);
    assert_eq!(component.points, 3);
    assert!(component.notes.starts_with("surge active"));
}

#[test]
fn critical_protocol_points_follow_the_key() {
    let mut base = green_snapshot();
    let mut points = |protocol| {
        base.critical_patient_protocol = protocol;
        engine()
            .score(&validated(&base))
            .points(Criterion::CriticalPatientProtocol)
    };

    assert_eq!(points(CriticalProtocol::None), 0);
    assert_eq!(points(CriticalProtocol::Yellow), 1);
    assert_eq!(points(CriticalProtocol::Red), 2);
}

#[test]
fn default_rules_validate_and_round_trip_through_json() {
    let config = ProtocolConfig::default();
    config.validate().expect("default rules are valid");

    let raw = serde_json::to_string(&config).expect("serialize rules");
    let parsed: ProtocolConfig = serde_json::from_str(&raw).expect("parse rules");
    assert_eq!(parsed, config);
}

#[test]
fn rule_tables_are_checked() {
    use crate::protocol::evaluation::RulesError;

    let mut config = ProtocolConfig::default();
    config.bands.orange_from = config.bands.yellow_from;
    assert_eq!(config.validate(), Err(RulesError::BandsNotAscending));

    let mut config = ProtocolConfig::default();
    config.scoring.esi_c2_patients = StepTable::new(&[(0, 2), (5, 1)]);
    assert_eq!(
        config.validate(),
        Err(RulesError::StepPointsDecreasing {
            criterion: "esi_c2_patients"
        })
    );

    let mut config = ProtocolConfig::default();
    config.scoring.hospitalized_patients = StepTable::new(&[]);
    assert!(matches!(
        config.validate(),
        Err(RulesError::EmptyStepTable { .. })
    ));
}

#[test]
fn oversized_step_points_saturate_the_total() {
    let mut config = ProtocolConfig::default();
    config.scoring.hospitalized_patients = StepTable::new(&[(0, u32::MAX)]);
    config.scoring.esi_c2_patients = StepTable::new(&[(0, u32::MAX)]);
    let engine = ProtocolEngine::new(config, clinical_offset());

    let breakdown = engine.score(&validated(&green_snapshot()));
    assert_eq!(breakdown.points(Criterion::HospitalizedPatients), u32::MAX);
    assert_eq!(breakdown.total_score, u32::MAX);
}
