//! Emergency-department saturation protocol: scoring, alert classification,
//! containment measures, and the measure-status workflow around persisted evaluations.

pub mod domain;
pub mod evaluation;
pub mod export;
pub mod form;
pub(crate) mod measures;
pub mod report;
pub mod repository;
pub mod results;
pub mod router;
pub mod service;
pub mod session;
pub mod statistics;
pub mod status;
pub mod summary;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AlertLevel, CriticalProtocol, Evaluation, EvaluationId, Measure, MeasureId, MeasureStatus,
    Principal, Reevaluation, Role, Scenario, Snapshot, ValidatedSnapshot,
};
pub use evaluation::{
    AlertClassification, Assessment, Criterion, ProtocolConfig, ProtocolEngine, RulesError,
    ScoreBreakdown, ScoreComponent,
};
pub use export::{history_csv, write_history, ExportError};
pub use form::{load_most_recent, FormFields, FormParseError};
pub use report::{compose, ensure_ready, ReportDocument, ReportError, ReportSection};
pub use repository::{
    EvaluationDraft, EvaluationRepository, HistoryQuery, InMemoryEvaluationRepository,
    MeasureDraft, RepositoryError,
};
pub use results::{DecisionOptions, EvaluationResults, FinalDecision, ResultsError, ResultsPatch};
pub use router::protocol_router;
pub use service::{ProtocolService, ProtocolServiceError};
pub use session::{EvaluationSession, SessionError, WorkingState};
pub use statistics::{ProtocolStatistics, Shift, StatisticsCalculator};
pub use status::{
    in_display_order, sort_for_display, EditAuthorizer, EditDenied, EditWindowPolicy,
    StatusChange, DEFAULT_EDIT_WINDOW,
};
pub use summary::{calculator_clipboard, share_message};
pub use validation::{SnapshotValidator, ValidationError};
