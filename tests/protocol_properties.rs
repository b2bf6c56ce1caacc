use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use ed_saturation::protocol::{
    in_display_order, AlertLevel, CriticalProtocol, EditWindowPolicy, EvaluationResults,
    InMemoryEvaluationRepository, Measure, MeasureId, MeasureStatus, Principal, ProtocolConfig,
    ProtocolEngine, ProtocolService, ProtocolServiceError, Role, Scenario, Snapshot,
};
use proptest::prelude::*;

fn offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("valid offset")
}

fn base_time() -> DateTime<FixedOffset> {
    offset()
        .with_ymd_and_hms(2024, 5, 2, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn engine() -> ProtocolEngine {
    ProtocolEngine::new(ProtocolConfig::default(), offset())
}

fn any_scenario() -> impl Strategy<Value = Scenario> {
    prop_oneof![
        Just(Scenario::ReducedCapacity),
        Just(Scenario::FullCapacity)
    ]
}

fn any_protocol() -> impl Strategy<Value = CriticalProtocol> {
    prop_oneof![
        Just(CriticalProtocol::None),
        Just(CriticalProtocol::Yellow),
        Just(CriticalProtocol::Red)
    ]
}

fn any_status() -> impl Strategy<Value = MeasureStatus> {
    prop_oneof![
        Just(MeasureStatus::NotApplied),
        Just(MeasureStatus::InProcess),
        Just(MeasureStatus::Applied)
    ]
}

prop_compose! {
    fn any_counts()(
        hospitalized in 0u32..60,
        esi_c2 in 0u32..30,
        resuscitation in 0u32..12,
        waiting in 0u32..10,
    ) -> [u32; 4] {
        [hospitalized, esi_c2, resuscitation, waiting]
    }
}

fn snapshot(scenario: Scenario, counts: [u32; 4], protocol: CriticalProtocol) -> Snapshot {
    let [hospitalized, esi_c2, resuscitation, waiting] = counts;
    Snapshot {
        scenario: Some(scenario),
        hospitalized_patients: Some(hospitalized),
        esi_c2_patients: Some(esi_c2),
        resuscitation_bay_patients: Some(resuscitation),
        critical_patient_protocol: protocol,
        waiting_72_hours_patients: Some(waiting),
        surge_active: false,
        surge_patients: None,
        evaluator_name: "Propiedad".to_string(),
        timestamp: base_time(),
    }
}

proptest! {
    /// Identical snapshots always produce identical assessments.
    #[test]
    fn assessment_is_deterministic(
        scenario in any_scenario(),
        counts in any_counts(),
        protocol in any_protocol(),
    ) {
        let snapshot = snapshot(scenario, counts, protocol);
        let first = engine().assess(&snapshot).expect("snapshot validates");
        let second = engine().assess(&snapshot).expect("snapshot validates");
        prop_assert_eq!(first, second);
    }

    /// Raising any single count never lowers the score or the level.
    #[test]
    fn higher_counts_never_lower_the_alert(
        scenario in any_scenario(),
        counts in any_counts(),
        protocol in any_protocol(),
        field in 0usize..4,
        bump in 1u32..20,
    ) {
        let engine = engine();
        let lower = engine
            .assess(&snapshot(scenario, counts, protocol))
            .expect("snapshot validates");

        let mut raised = counts;
        raised[field] += bump;
        let higher = engine
            .assess(&snapshot(scenario, raised, protocol))
            .expect("snapshot validates");

        prop_assert!(higher.score.total_score >= lower.score.total_score);
        prop_assert!(higher.classification.level >= lower.classification.level);
    }

    /// A red critical-patient key always yields at least an Orange alert.
    #[test]
    fn red_critical_protocol_is_at_least_orange(
        scenario in any_scenario(),
        counts in any_counts(),
    ) {
        let assessment = engine()
            .assess(&snapshot(scenario, counts, CriticalProtocol::Red))
            .expect("snapshot validates");
        prop_assert!(assessment.classification.level >= AlertLevel::Orange);
    }

    /// With surge active the regular bay count has no influence on the outcome.
    #[test]
    fn surge_ignores_the_regular_bay_count(
        scenario in any_scenario(),
        counts in any_counts(),
        protocol in any_protocol(),
        extra in 0u32..10,
        other_bay in 0u32..12,
    ) {
        let mut first = snapshot(scenario, counts, protocol);
        first.surge_active = true;
        first.surge_patients = Some(scenario.surge_threshold() + extra);
        let mut second = first.clone();
        second.resuscitation_bay_patients = Some(other_bay);

        let engine = engine();
        let a = engine.assess(&first).expect("snapshot validates");
        let b = engine.assess(&second).expect("snapshot validates");
        prop_assert_eq!(a.score, b.score);
        prop_assert_eq!(a.classification, b.classification);
        prop_assert_eq!(a.measures, b.measures);
    }

    /// Selected measures are free of duplicates and Green selects none.
    #[test]
    fn measures_are_unique_per_evaluation(
        scenario in any_scenario(),
        counts in any_counts(),
        protocol in any_protocol(),
    ) {
        let assessment = engine()
            .assess(&snapshot(scenario, counts, protocol))
            .expect("snapshot validates");

        let unique: HashSet<_> = assessment.measures.iter().collect();
        prop_assert_eq!(unique.len(), assessment.measures.len());
        if assessment.classification.level == AlertLevel::Green {
            prop_assert!(assessment.measures.is_empty());
        }
    }

    /// Display order is idempotent and ranks pending work first.
    #[test]
    fn display_order_is_idempotent(
        statuses in proptest::collection::vec(any_status(), 0..15),
    ) {
        let measures: Vec<Measure> = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| Measure {
                id: MeasureId(index as u64),
                description: format!("medida {index}"),
                status: *status,
                original_order_index: index as u32,
            })
            .collect();

        let once = in_display_order(&measures);
        prop_assert_eq!(in_display_order(&once), once.clone());
        prop_assert_eq!(once.len(), measures.len());
        for pair in once.windows(2) {
            let left = (pair[0].status.priority(), pair[0].original_order_index);
            let right = (pair[1].status.priority(), pair[1].original_order_index);
            prop_assert!(left < right);
        }
    }

    /// Stored results survive serialization, including keys written by other clients.
    #[test]
    fn results_round_trip_with_unknown_keys(
        analysis in proptest::option::of("[a-zA-Z ]{0,40}"),
        extra in proptest::collection::btree_map("x_[a-z]{1,8}", "[a-z0-9 ]{0,12}", 0..4),
    ) {
        let results = EvaluationResults {
            analysis_text: analysis,
            extra: extra
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect::<BTreeMap<_, _>>(),
            ..EvaluationResults::default()
        };

        let raw = results.to_json_string().expect("results serialize");
        let parsed = EvaluationResults::from_json_str(&raw).expect("results parse");
        prop_assert_eq!(parsed, results);
    }

    /// Only the two newest Orange/Red evaluations accept measure edits.
    #[test]
    fn only_the_newest_elevated_evaluations_are_editable(elevated in 1usize..6) {
        let repository = Arc::new(InMemoryEvaluationRepository::default());
        let service = ProtocolService::new(
            repository,
            Arc::new(EditWindowPolicy::default()),
            engine(),
        );
        let principal = Principal::new("Propiedad", Role::Evaluator);

        let mut stored = Vec::new();
        for index in 0..elevated {
            let mut orange = snapshot(
                Scenario::FullCapacity,
                [25, 10, 6, 1],
                CriticalProtocol::None,
            );
            orange.timestamp = base_time() + Duration::hours(index as i64);
            stored.push(service.submit(&principal, orange).expect("submission succeeds"));
        }

        for (position, evaluation) in stored.iter().rev().enumerate() {
            let outcome = service.set_measure_status(
                &principal,
                evaluation.id,
                evaluation.measures[0].id,
                MeasureStatus::Applied,
            );
            if position < 2 {
                prop_assert!(outcome.is_ok());
            } else {
                prop_assert!(matches!(outcome, Err(ProtocolServiceError::Forbidden(_))));
            }
        }
    }
}
