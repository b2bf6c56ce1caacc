use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{
    Evaluation, EvaluationId, Measure, MeasureId, MeasureStatus, Principal, Snapshot,
};
use super::evaluation::{Assessment, ProtocolEngine};
use super::repository::{
    EvaluationDraft, EvaluationRepository, HistoryQuery, MeasureDraft, RepositoryError,
};
use super::results::{EvaluationResults, ResultsError, ResultsPatch};
use super::statistics::{ProtocolStatistics, StatisticsCalculator};
use super::status::{EditAuthorizer, EditDenied};
use super::validation::ValidationError;

/// Service composing the protocol engine, the storage collaborator, and the edit policy.
pub struct ProtocolService<R, A> {
    repository: Arc<R>,
    authorizer: Arc<A>,
    engine: Arc<ProtocolEngine>,
}

impl<R, A> ProtocolService<R, A>
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    pub fn new(repository: Arc<R>, authorizer: Arc<A>, engine: ProtocolEngine) -> Self {
        Self {
            repository,
            authorizer,
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    /// Validate, score, classify, and persist a snapshot as a new evaluation.
    pub fn submit(
        &self,
        principal: &Principal,
        snapshot: Snapshot,
    ) -> Result<Evaluation, ProtocolServiceError> {
        if !principal.role.can_edit() {
            return Err(EditDenied::ReadOnlyRole.into());
        }

        let assessment = self.engine.assess(&snapshot)?;
        let draft = draft_from(assessment);
        let stored = self.repository.insert(draft)?;

        info!(
            evaluation_id = %stored.id,
            alert_level = stored.alert_level.label(),
            total_score = stored.total_score(),
            measures = stored.measures.len(),
            evaluator = %stored.snapshot.evaluator_name,
            "evaluation submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, id: EvaluationId) -> Result<Evaluation, ProtocolServiceError> {
        let evaluation = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(evaluation)
    }

    /// Evaluations newest first, filtered by clinical day.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<Evaluation>, ProtocolServiceError> {
        Ok(self.repository.list(query)?)
    }

    pub fn statistics(
        &self,
        query: &HistoryQuery,
    ) -> Result<ProtocolStatistics, ProtocolServiceError> {
        let unlimited = HistoryQuery {
            limit: None,
            ..*query
        };
        let history = self.repository.list(&unlimited)?;
        Ok(StatisticsCalculator::default().compute(&history))
    }

    /// Change one measure's status, subject to the edit-window policy.
    ///
    /// The stored measure is left untouched on any failure.
    pub fn set_measure_status(
        &self,
        principal: &Principal,
        evaluation_id: EvaluationId,
        measure_id: MeasureId,
        status: MeasureStatus,
    ) -> Result<Measure, ProtocolServiceError> {
        let target = self.get(evaluation_id)?;
        let previous = target
            .measure(measure_id)
            .map(|measure| measure.status)
            .ok_or(RepositoryError::NotFound)?;

        let recent = self.repository.recent_elevated(self.authorizer.window())?;
        if let Err(denied) = self.authorizer.authorize(principal, &target, &recent) {
            warn!(
                evaluation_id = %evaluation_id,
                measure_id = %measure_id,
                user = %principal.name,
                reason = %denied,
                "measure edit refused"
            );
            return Err(denied.into());
        }

        let updated = self
            .repository
            .update_measure_status(evaluation_id, measure_id, status)?;
        info!(
            evaluation_id = %evaluation_id,
            measure_id = %measure_id,
            from = previous.as_str(),
            to = updated.status.as_str(),
            change = ?previous.transition_to(updated.status),
            "measure status updated"
        );
        Ok(updated)
    }

    /// Merge a partial analysis/decision patch into the stored results.
    ///
    /// Patch timestamps are moved to the clinical offset before storage.
    pub fn update_results(
        &self,
        principal: &Principal,
        evaluation_id: EvaluationId,
        mut patch: ResultsPatch,
    ) -> Result<Evaluation, ProtocolServiceError> {
        if !principal.role.can_edit() {
            return Err(EditDenied::ReadOnlyRole.into());
        }

        let offset = self.engine.clinical_offset();
        patch.re_evaluation_time = patch
            .re_evaluation_time
            .map(|time| time.with_timezone(&offset));
        patch.next_evaluation_timestamp = patch
            .next_evaluation_timestamp
            .map(|time| time.with_timezone(&offset));

        let evaluation = self.get(evaluation_id)?;
        let mut results: EvaluationResults = evaluation.evaluation_results.clone();
        results.apply(patch, evaluation.alert_level)?;

        let stored = self.repository.update_results(evaluation_id, results)?;
        info!(
            evaluation_id = %evaluation_id,
            decision = stored
                .evaluation_results
                .final_decision
                .map(|decision| decision.label())
                .unwrap_or("none"),
            "evaluation results updated"
        );
        Ok(stored)
    }
}

fn draft_from(assessment: Assessment) -> EvaluationDraft {
    let measures = assessment
        .measures
        .into_iter()
        .enumerate()
        .map(|(index, description)| MeasureDraft {
            description,
            status: MeasureStatus::NotApplied,
            original_order_index: u32::try_from(index).unwrap_or(u32::MAX),
        })
        .collect();

    EvaluationDraft {
        timestamp: assessment.snapshot.timestamp,
        snapshot: assessment.snapshot,
        score: assessment.score,
        alert_level: assessment.classification.level,
        measures,
        reevaluation: assessment.reevaluation,
        evaluation_results: EvaluationResults::default(),
    }
}

/// Error raised by the protocol service.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Forbidden(#[from] EditDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Results(#[from] ResultsError),
}

impl ProtocolServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProtocolServiceError::Repository(RepositoryError::NotFound))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProtocolServiceError::Repository(RepositoryError::Unavailable(_))
        )
    }
}
