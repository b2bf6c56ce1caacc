use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{
    AlertLevel, Evaluation, EvaluationId, Measure, MeasureId, MeasureStatus, Reevaluation,
    ValidatedSnapshot,
};
use super::evaluation::ScoreBreakdown;
use super::results::EvaluationResults;

/// Unsaved measure; the repository assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDraft {
    pub description: String,
    pub status: MeasureStatus,
    pub original_order_index: u32,
}

/// Evaluation assembled by the service and handed to storage for id assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDraft {
    pub snapshot: ValidatedSnapshot,
    pub score: ScoreBreakdown,
    pub alert_level: AlertLevel,
    pub measures: Vec<MeasureDraft>,
    pub reevaluation: Option<Reevaluation>,
    pub evaluation_results: EvaluationResults,
    pub timestamp: DateTime<FixedOffset>,
}

/// History filter over whole clinical days, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn matches(&self, evaluation: &Evaluation) -> bool {
        let day = evaluation.timestamp.date_naive();
        self.start_date.map_or(true, |start| day >= start)
            && self.end_date.map_or(true, |end| day <= end)
    }
}

/// Storage collaborator owning the persisted copy of every evaluation.
pub trait EvaluationRepository: Send + Sync {
    fn insert(&self, draft: EvaluationDraft) -> Result<Evaluation, RepositoryError>;
    fn fetch(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError>;
    /// Matching evaluations, newest first.
    fn list(&self, query: &HistoryQuery) -> Result<Vec<Evaluation>, RepositoryError>;
    /// Ids of the newest Orange/Red evaluations, newest first.
    fn recent_elevated(&self, limit: usize) -> Result<Vec<EvaluationId>, RepositoryError>;
    fn update_measure_status(
        &self,
        id: EvaluationId,
        measure_id: MeasureId,
        status: MeasureStatus,
    ) -> Result<Measure, RepositoryError>;
    fn update_results(
        &self,
        id: EvaluationId,
        results: EvaluationResults,
    ) -> Result<Evaluation, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    last_evaluation_id: u64,
    last_measure_id: u64,
    records: BTreeMap<EvaluationId, Evaluation>,
}

/// Process-local repository used by the service binary, the demo, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEvaluationRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryEvaluationRepository {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    fn newest_first(records: &BTreeMap<EvaluationId, Evaluation>) -> Vec<&Evaluation> {
        let mut ordered: Vec<&Evaluation> = records.values().collect();
        ordered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        ordered
    }
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, draft: EvaluationDraft) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.lock()?;
        guard.last_evaluation_id += 1;
        let id = EvaluationId(guard.last_evaluation_id);

        let mut measures = Vec::with_capacity(draft.measures.len());
        for measure in draft.measures {
            guard.last_measure_id += 1;
            measures.push(Measure {
                id: MeasureId(guard.last_measure_id),
                description: measure.description,
                status: measure.status,
                original_order_index: measure.original_order_index,
            });
        }

        let evaluation = Evaluation {
            id,
            snapshot: draft.snapshot,
            score: draft.score,
            alert_level: draft.alert_level,
            measures,
            reevaluation: draft.reevaluation,
            evaluation_results: draft.evaluation_results,
            timestamp: draft.timestamp,
        };
        guard.records.insert(id, evaluation.clone());
        Ok(evaluation)
    }

    fn fetch(&self, id: EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.records.get(&id).cloned())
    }

    fn list(&self, query: &HistoryQuery) -> Result<Vec<Evaluation>, RepositoryError> {
        let guard = self.lock()?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(Self::newest_first(&guard.records)
            .into_iter()
            .filter(|evaluation| query.matches(evaluation))
            .take(limit)
            .cloned()
            .collect())
    }

    fn recent_elevated(&self, limit: usize) -> Result<Vec<EvaluationId>, RepositoryError> {
        let guard = self.lock()?;
        Ok(Self::newest_first(&guard.records)
            .into_iter()
            .filter(|evaluation| evaluation.alert_level.is_elevated())
            .take(limit)
            .map(|evaluation| evaluation.id)
            .collect())
    }

    fn update_measure_status(
        &self,
        id: EvaluationId,
        measure_id: MeasureId,
        status: MeasureStatus,
    ) -> Result<Measure, RepositoryError> {
        let mut guard = self.lock()?;
        let evaluation = guard
            .records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        let measure = evaluation
            .measures
            .iter_mut()
            .find(|measure| measure.id == measure_id)
            .ok_or(RepositoryError::NotFound)?;
        measure.status = status;
        Ok(measure.clone())
    }

    fn update_results(
        &self,
        id: EvaluationId,
        results: EvaluationResults,
    ) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.lock()?;
        let evaluation = guard
            .records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        evaluation.evaluation_results = results;
        Ok(evaluation.clone())
    }
}
