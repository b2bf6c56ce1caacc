use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use super::domain::{
    Evaluation, EvaluationId, Measure, MeasureId, MeasureStatus, Principal, Snapshot,
};
use super::form::{load_most_recent, FormFields, FormParseError};
use super::report::{compose, ensure_ready, ReportDocument, ReportError};
use super::repository::{EvaluationRepository, HistoryQuery};
use super::results::ResultsPatch;
use super::service::{ProtocolService, ProtocolServiceError};
use super::status::{sort_for_display, EditAuthorizer, EditDenied};
use super::summary::{calculator_clipboard, share_message};

pub const UNAVAILABLE_MESSAGE: &str = "could not reach the server, please try again";

/// In-memory mirrors owned by one interactive session.
///
/// Every copy of an evaluation held here keeps its measures in display order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkingState {
    pub form: FormFields,
    pub current: Option<Evaluation>,
    pub history: Vec<Evaluation>,
    pub last_error: Option<String>,
}

impl WorkingState {
    fn find(&self, id: EvaluationId) -> Option<&Evaluation> {
        self.current
            .iter()
            .chain(self.history.iter())
            .find(|evaluation| evaluation.id == id)
    }

    /// Replace every held copy of the evaluation with the confirmed one.
    fn converge(&mut self, confirmed: &Evaluation) {
        let mut confirmed = confirmed.clone();
        sort_for_display(&mut confirmed.measures);

        if let Some(current) = self.current.as_mut().filter(|c| c.id == confirmed.id) {
            *current = confirmed.clone();
        }
        for entry in self.history.iter_mut().filter(|e| e.id == confirmed.id) {
            *entry = confirmed.clone();
        }
    }

    fn apply_measure(&mut self, evaluation_id: EvaluationId, updated: &Measure) {
        let copies = self
            .current
            .iter_mut()
            .chain(self.history.iter_mut())
            .filter(|evaluation| evaluation.id == evaluation_id);
        for evaluation in copies {
            if let Some(measure) = evaluation
                .measures
                .iter_mut()
                .find(|measure| measure.id == updated.id)
            {
                measure.status = updated.status;
            }
            sort_for_display(&mut evaluation.measures);
        }
    }

    fn forget(&mut self, evaluation_id: EvaluationId) {
        if self.current.as_ref().map(|c| c.id) == Some(evaluation_id) {
            self.current = None;
        }
        self.history.retain(|evaluation| evaluation.id != evaluation_id);
    }
}

/// Interactive session: form entry, submission, and measure tracking for one principal.
pub struct EvaluationSession<R, A> {
    service: Arc<ProtocolService<R, A>>,
    principal: Principal,
    history_query: HistoryQuery,
    state: WorkingState,
}

impl<R, A> EvaluationSession<R, A>
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    pub fn new(service: Arc<ProtocolService<R, A>>, principal: Principal) -> Self {
        Self {
            service,
            principal,
            history_query: HistoryQuery::default(),
            state: WorkingState::default(),
        }
    }

    pub fn with_history_query(mut self, query: HistoryQuery) -> Self {
        self.history_query = query;
        self
    }

    pub fn state(&self) -> &WorkingState {
        &self.state
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn form_mut(&mut self) -> &mut FormFields {
        &mut self.state.form
    }

    /// Parse the working form and submit it.
    pub fn submit(&mut self, timestamp: DateTime<FixedOffset>) -> Result<Evaluation, SessionError> {
        let snapshot = match self.state.form.parse(timestamp) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.state.last_error = Some(error.to_string());
                return Err(error.into());
            }
        };
        self.submit_snapshot(snapshot)
    }

    pub fn submit_snapshot(&mut self, snapshot: Snapshot) -> Result<Evaluation, SessionError> {
        match self.service.submit(&self.principal, snapshot) {
            Ok(evaluation) => {
                let mut working = evaluation.clone();
                sort_for_display(&mut working.measures);
                self.state.history.insert(0, working.clone());
                self.state
                    .history
                    .sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
                self.state.current = Some(working);
                self.state.last_error = None;
                Ok(evaluation)
            }
            Err(error) => Err(self.record_failure(error)),
        }
    }

    /// Clears the form and the current result without persisting; history is kept.
    pub fn reset_working_state(&mut self) {
        self.state.form = FormFields::default();
        self.state.current = None;
        self.state.last_error = None;
    }

    /// Fill the form from the newest evaluation in history. Returns false when history is empty.
    pub fn prefill_from_latest(&mut self) -> bool {
        match load_most_recent(&self.state.history) {
            Some(form) => {
                self.state.form = form;
                self.state.current = None;
                self.state.last_error = None;
                true
            }
            None => false,
        }
    }

    pub fn refresh_history(&mut self) -> Result<(), SessionError> {
        match self.service.history(&self.history_query) {
            Ok(mut history) => {
                for evaluation in &mut history {
                    sort_for_display(&mut evaluation.measures);
                }
                self.state.history = history;
                Ok(())
            }
            Err(error) => Err(self.record_failure(error)),
        }
    }

    /// Write a measure status and converge every held copy to the stored value.
    ///
    /// Forbidden and unavailable outcomes leave the working state untouched apart
    /// from `last_error`. A missing evaluation or measure triggers a reload.
    pub fn set_measure_status(
        &mut self,
        evaluation_id: EvaluationId,
        measure_id: MeasureId,
        status: MeasureStatus,
    ) -> Result<Measure, SessionError> {
        let result =
            self.service
                .set_measure_status(&self.principal, evaluation_id, measure_id, status);

        match result {
            Ok(updated) => {
                match self.service.get(evaluation_id) {
                    Ok(confirmed) => self.state.converge(&confirmed),
                    Err(error) => {
                        debug!(%evaluation_id, %error, "reload after status write failed");
                        self.state.apply_measure(evaluation_id, &updated);
                    }
                }
                self.state.last_error = None;
                Ok(updated)
            }
            Err(error) if error.is_not_found() => {
                self.reload_after_missing(evaluation_id);
                Err(self.record_failure(error))
            }
            Err(error) => Err(self.record_failure(error)),
        }
    }

    pub fn update_results(
        &mut self,
        evaluation_id: EvaluationId,
        patch: ResultsPatch,
    ) -> Result<Evaluation, SessionError> {
        match self
            .service
            .update_results(&self.principal, evaluation_id, patch)
        {
            Ok(stored) => {
                self.state.converge(&stored);
                self.state.last_error = None;
                Ok(stored)
            }
            Err(error) if error.is_not_found() => {
                self.reload_after_missing(evaluation_id);
                Err(self.record_failure(error))
            }
            Err(error) => Err(self.record_failure(error)),
        }
    }

    pub fn share_message(&self, evaluation_id: EvaluationId) -> Result<String, SessionError> {
        if !self.principal.role.can_edit() {
            return Err(ProtocolServiceError::from(EditDenied::ReadOnlyRole).into());
        }
        let evaluation = self.held(evaluation_id)?;
        Ok(share_message(evaluation))
    }

    pub fn calculator_clipboard(&self) -> Result<String, SessionError> {
        self.state
            .current
            .as_ref()
            .map(calculator_clipboard)
            .ok_or(SessionError::NoCurrentEvaluation)
    }

    /// Report preview; exporting also requires the decision fields to be filled in.
    pub fn report(&self, evaluation_id: EvaluationId) -> Result<ReportDocument, SessionError> {
        Ok(compose(self.held(evaluation_id)?)?)
    }

    pub fn export_report(
        &self,
        evaluation_id: EvaluationId,
    ) -> Result<ReportDocument, SessionError> {
        let evaluation = self.held(evaluation_id)?;
        ensure_ready(evaluation)?;
        Ok(compose(evaluation)?)
    }

    fn held(&self, evaluation_id: EvaluationId) -> Result<&Evaluation, SessionError> {
        self.state
            .find(evaluation_id)
            .ok_or(SessionError::UnknownEvaluation(evaluation_id))
    }

    fn reload_after_missing(&mut self, evaluation_id: EvaluationId) {
        match self.service.get(evaluation_id) {
            Ok(stored) => self.state.converge(&stored),
            Err(error) if error.is_not_found() => self.state.forget(evaluation_id),
            Err(error) => debug!(%evaluation_id, %error, "reload after missing record failed"),
        }
        if let Err(error) = self.refresh_history() {
            debug!(%error, "history reload failed");
        }
    }

    fn record_failure(&mut self, error: ProtocolServiceError) -> SessionError {
        let message = if error.is_unavailable() {
            warn!(%error, "storage collaborator unavailable");
            UNAVAILABLE_MESSAGE.to_string()
        } else {
            error.to_string()
        };
        self.state.last_error = Some(message);
        SessionError::Service(error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] FormParseError),
    #[error(transparent)]
    Service(#[from] ProtocolServiceError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("no evaluation is loaded in the calculator")]
    NoCurrentEvaluation,
    #[error("evaluation {0} is not loaded in this session")]
    UnknownEvaluation(EvaluationId),
}
