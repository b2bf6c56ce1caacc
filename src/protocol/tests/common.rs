use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::protocol::domain::{
    CriticalProtocol, Evaluation, EvaluationId, Measure, MeasureId, MeasureStatus, Principal,
    Role, Scenario, Snapshot, ValidatedSnapshot,
};
use crate::protocol::evaluation::{ProtocolConfig, ProtocolEngine};
use crate::protocol::repository::{
    EvaluationDraft, EvaluationRepository, HistoryQuery, InMemoryEvaluationRepository,
    RepositoryError,
};
use crate::protocol::results::EvaluationResults;
use crate::protocol::service::ProtocolService;
use crate::protocol::status::EditWindowPolicy;

pub(super) type TestService<R = InMemoryEvaluationRepository> = ProtocolService<R, EditWindowPolicy>;

pub(super) fn clinical_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("valid offset")
}

/// 2024-05-02 at the given clinical time.
pub(super) fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    clinical_offset()
        .with_ymd_and_hms(2024, 5, 2, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> ProtocolEngine {
    ProtocolEngine::new(ProtocolConfig::default(), clinical_offset())
}

pub(super) fn evaluator() -> Principal {
    Principal::new("Dra. Rojas", Role::Evaluator)
}

pub(super) fn viewer() -> Principal {
    Principal::new("Observador", Role::Viewer)
}

pub(super) fn snapshot(
    scenario: Scenario,
    hospitalized: u32,
    esi_c2: u32,
    resuscitation: u32,
    waiting_72h: u32,
) -> Snapshot {
    Snapshot {
        scenario: Some(scenario),
        hospitalized_patients: Some(hospitalized),
        esi_c2_patients: Some(esi_c2),
        resuscitation_bay_patients: Some(resuscitation),
        critical_patient_protocol: CriticalProtocol::None,
        waiting_72_hours_patients: Some(waiting_72h),
        surge_active: false,
        surge_patients: None,
        evaluator_name: "Dra. Rojas".to_string(),
        timestamp: at(9, 0),
    }
}

/// Scores 0.
pub(super) fn green_snapshot() -> Snapshot {
    snapshot(Scenario::ReducedCapacity, 5, 2, 1, 0)
}

/// Scores 4: hospitalized 2, ESI C2 1, resuscitation 1.
pub(super) fn yellow_snapshot() -> Snapshot {
    snapshot(Scenario::ReducedCapacity, 20, 5, 3, 0)
}

/// Scores 7: hospitalized 2, ESI C2 2, resuscitation 2, waiting 1.
pub(super) fn orange_snapshot() -> Snapshot {
    snapshot(Scenario::FullCapacity, 25, 10, 6, 1)
}

/// Scores 11: hospitalized 3, ESI C2 3, resuscitation 3, waiting 2.
pub(super) fn red_snapshot() -> Snapshot {
    snapshot(Scenario::ReducedCapacity, 30, 15, 6, 3)
}

pub(super) fn surge(mut snapshot: Snapshot, patients: u32) -> Snapshot {
    snapshot.surge_active = true;
    snapshot.surge_patients = Some(patients);
    snapshot
}

pub(super) fn timed(mut snapshot: Snapshot, timestamp: DateTime<FixedOffset>) -> Snapshot {
    snapshot.timestamp = timestamp;
    snapshot
}

pub(super) fn validated(snapshot: &Snapshot) -> ValidatedSnapshot {
    engine().validate(snapshot).expect("snapshot validates")
}

pub(super) fn service() -> (Arc<TestService>, Arc<InMemoryEvaluationRepository>) {
    let repository = Arc::new(InMemoryEvaluationRepository::default());
    let service = Arc::new(ProtocolService::new(
        repository.clone(),
        Arc::new(EditWindowPolicy::default()),
        engine(),
    ));
    (service, repository)
}

pub(super) fn measures(statuses: &[MeasureStatus]) -> Vec<Measure> {
    statuses
        .iter()
        .enumerate()
        .map(|(index, status)| Measure {
            id: MeasureId(index as u64 + 1),
            description: format!("measure {index}"),
            status: *status,
            original_order_index: index as u32,
        })
        .collect()
}

/// Evaluation built in memory, bypassing storage.
pub(super) fn evaluation_from(id: u64, snapshot: &Snapshot) -> Evaluation {
    let assessment = engine().assess(snapshot).expect("snapshot validates");
    let measures = assessment
        .measures
        .iter()
        .enumerate()
        .map(|(index, description)| Measure {
            id: MeasureId(id * 100 + index as u64),
            description: description.clone(),
            status: MeasureStatus::NotApplied,
            original_order_index: index as u32,
        })
        .collect();

    Evaluation {
        id: EvaluationId(id),
        timestamp: assessment.snapshot.timestamp,
        snapshot: assessment.snapshot,
        score: assessment.score,
        alert_level: assessment.classification.level,
        measures,
        reevaluation: assessment.reevaluation,
        evaluation_results: EvaluationResults::default(),
    }
}

/// In-memory repository whose writes or reads can be switched to fail.
#[derive(Default)]
pub(super) struct FlakyRepository {
    inner: InMemoryEvaluationRepository,
    offline: AtomicBool,
}

impl FlakyRepository {
    pub(super) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("storage offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EvaluationRepository for FlakyRepository {
    fn insert(&self, draft: EvaluationDraft) -> Result<Evaluation, RepositoryError> {
        self.check()?;
        self.inner.insert(draft)
    }

    fn fetch(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.check()?;
        self.inner.fetch(id)
    }

    fn list(&self, query: &HistoryQuery) -> Result<Vec<Evaluation>, RepositoryError> {
        self.check()?;
        self.inner.list(query)
    }

    fn recent_elevated(&self, limit: usize) -> Result<Vec<EvaluationId>, RepositoryError> {
        self.check()?;
        self.inner.recent_elevated(limit)
    }

    fn update_measure_status(
        &self,
        id: EvaluationId,
        measure_id: MeasureId,
        status: MeasureStatus,
    ) -> Result<Measure, RepositoryError> {
        self.check()?;
        self.inner.update_measure_status(id, measure_id, status)
    }

    fn update_results(
        &self,
        id: EvaluationId,
        results: EvaluationResults,
    ) -> Result<Evaluation, RepositoryError> {
        self.check()?;
        self.inner.update_results(id, results)
    }
}

pub(super) fn flaky_service() -> (Arc<TestService<FlakyRepository>>, Arc<FlakyRepository>) {
    let repository = Arc::new(FlakyRepository::default());
    let service = Arc::new(ProtocolService::new(
        repository.clone(),
        Arc::new(EditWindowPolicy::default()),
        engine(),
    ));
    (service, repository)
}
