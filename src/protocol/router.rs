use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{EvaluationId, MeasureId, MeasureStatus, Principal, Role, Snapshot};
use super::export::history_csv;
use super::report::{compose, ensure_ready, ReportError};
use super::repository::{EvaluationRepository, HistoryQuery, RepositoryError};
use super::results::ResultsPatch;
use super::service::{ProtocolService, ProtocolServiceError};
use super::status::{EditAuthorizer, EditDenied};
use super::summary::{calculator_clipboard, share_message};

pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Router exposing evaluation intake, measure tracking, reports, and statistics.
pub fn protocol_router<R, A>(service: Arc<ProtocolService<R, A>>) -> Router
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    Router::new()
        .route(
            "/api/v1/evaluations",
            post(submit_handler::<R, A>).get(history_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/export.csv",
            get(export_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id",
            get(evaluation_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/results",
            put(results_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/measures/:measure_id",
            put(measure_status_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/summary",
            get(summary_handler::<R, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/report",
            get(report_handler::<R, A>),
        )
        .route("/api/v1/statistics", get(statistics_handler::<R, A>))
        .with_state(service)
}

/// Identity forwarded by the authenticating proxy. Missing or unknown roles read as viewer.
pub fn principal_from_headers(headers: &HeaderMap) -> Principal {
    let name = headers
        .get(USER_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("anonymous");
    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(Role::from_header)
        .unwrap_or(Role::Viewer);
    Principal::new(name, role)
}

fn error_response(error: ProtocolServiceError) -> Response {
    let status = match &error {
        ProtocolServiceError::Validation(_) | ProtocolServiceError::Results(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProtocolServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ProtocolServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ProtocolServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    headers: HeaderMap,
    axum::Json(snapshot): axum::Json<Snapshot>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.submit(&principal, snapshot) {
        Ok(evaluation) => (StatusCode::CREATED, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    match service.history(&query) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluation_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    match service.get(EvaluationId(evaluation_id)) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn results_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Path(evaluation_id): Path<u64>,
    headers: HeaderMap,
    axum::Json(patch): axum::Json<ResultsPatch>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.update_results(&principal, EvaluationId(evaluation_id), patch) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    status: MeasureStatus,
}

pub(crate) async fn measure_status_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Path((evaluation_id, measure_id)): Path<(u64, u64)>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let principal = principal_from_headers(&headers);
    match service.set_measure_status(
        &principal,
        EvaluationId(evaluation_id),
        MeasureId(measure_id),
        update.status,
    ) {
        Ok(measure) => (StatusCode::OK, axum::Json(measure)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summary_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Path(evaluation_id): Path<u64>,
    headers: HeaderMap,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let principal = principal_from_headers(&headers);
    if !principal.role.can_edit() {
        return error_response(EditDenied::ReadOnlyRole.into());
    }
    match service.get(EvaluationId(evaluation_id)) {
        Ok(evaluation) => {
            let payload = json!({
                "evaluation_id": evaluation.id,
                "share_message": share_message(&evaluation),
                "calculator_clipboard": calculator_clipboard(&evaluation),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let evaluation = match service.get(EvaluationId(evaluation_id)) {
        Ok(evaluation) => evaluation,
        Err(error) => return error_response(error),
    };

    let document = match compose(&evaluation) {
        Ok(document) => document,
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let missing = match ensure_ready(&evaluation) {
        Err(ReportError::Incomplete { missing }) => missing,
        _ => Vec::new(),
    };
    let payload = json!({
        "file_name": document.file_name(),
        "ready": missing.is_empty(),
        "missing": missing,
        "plain_text": document.to_plain_text(),
        "document": document,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn statistics_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    match service.statistics(&query) {
        Ok(statistics) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<R, A>(
    State(service): State<Arc<ProtocolService<R, A>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: EvaluationRepository + 'static,
    A: EditAuthorizer + 'static,
{
    let history = match service.history(&query) {
        Ok(history) => history,
        Err(error) => return error_response(error),
    };

    match history_csv(&history) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"evaluaciones.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
