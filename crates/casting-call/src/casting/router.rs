use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::context::{AccessError, SessionContext};
use super::domain::{EventId, UserId};
use super::export::{ExportArtifact, ExportFormat};
use super::filter::{FilterQuery, FilterSpec};
use super::service::{ApplicationForm, CastingService, EventDraft, ServiceError};
use super::store::{RecordStore, StoreError};

/// Header carrying the uid of the signed-in user, set by the auth proxy in front of the API.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FormatQuery {
    #[serde(default)]
    format: ExportFormat,
}

/// Router builder exposing roster, event and applicant endpoints.
pub fn casting_router<S>(service: Arc<CastingService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/roster", get(roster_handler::<S>))
        .route("/api/v1/roster/export", get(roster_export_handler::<S>))
        .route("/api/v1/users/:user_id", delete(delete_user_handler::<S>))
        .route(
            "/api/v1/events",
            get(event_board_handler::<S>).post(create_event_handler::<S>),
        )
        .route(
            "/api/v1/events/:event_id",
            delete(delete_event_handler::<S>),
        )
        .route(
            "/api/v1/events/:event_id/applicants",
            get(applicants_handler::<S>).post(apply_handler::<S>),
        )
        .route(
            "/api/v1/events/:event_id/applicants/export",
            get(applicants_export_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn roster_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Response, Response>
where
    S: RecordStore + 'static,
{
    let query = query_params(query)?;
    let result = session(&service, &headers).and_then(|ctx| {
        let spec = FilterSpec::try_from(query)?;
        service.roster(&ctx, &spec)
    });

    Ok(match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    })
}

pub(crate) async fn roster_export_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    query: Result<Query<FilterQuery>, QueryRejection>,
    format: Result<Query<FormatQuery>, QueryRejection>,
) -> Result<Response, Response>
where
    S: RecordStore + 'static,
{
    let query = query_params(query)?;
    let format = query_params(format)?;
    let result = session(&service, &headers).and_then(|ctx| {
        let spec = FilterSpec::try_from(query)?;
        service.export_roster(&ctx, &spec, format.format)
    });

    Ok(match result {
        Ok(artifact) => artifact_response(artifact),
        Err(error) => error_response(error),
    })
}

pub(crate) async fn delete_user_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    let result = session(&service, &headers)
        .and_then(|ctx| service.delete_user(&ctx, &UserId(user_id)));

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn event_board_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    match session(&service, &headers).and_then(|ctx| service.event_board(&ctx)) {
        Ok(cards) => (StatusCode::OK, axum::Json(cards)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_event_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<EventDraft>,
) -> Response
where
    S: RecordStore + 'static,
{
    match session(&service, &headers).and_then(|ctx| service.create_event(&ctx, draft)) {
        Ok(event) => (StatusCode::CREATED, axum::Json(event)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_event_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
{
    let result = session(&service, &headers)
        .and_then(|ctx| service.delete_event(&ctx, &EventId(event_id)));

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn applicants_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Response, Response>
where
    S: RecordStore + 'static,
{
    let query = query_params(query)?;
    let result = session(&service, &headers).and_then(|ctx| {
        let spec = FilterSpec::try_from(query)?;
        service.applicants(&ctx, &EventId(event_id), &spec)
    });

    Ok(match result {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => error_response(error),
    })
}

pub(crate) async fn applicants_export_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    query: Result<Query<FilterQuery>, QueryRejection>,
    format: Result<Query<FormatQuery>, QueryRejection>,
) -> Result<Response, Response>
where
    S: RecordStore + 'static,
{
    let query = query_params(query)?;
    let format = query_params(format)?;
    let result = session(&service, &headers).and_then(|ctx| {
        let spec = FilterSpec::try_from(query)?;
        service.export_applicants(&ctx, &EventId(event_id), &spec, format.format)
    });

    Ok(match result {
        Ok(artifact) => artifact_response(artifact),
        Err(error) => error_response(error),
    })
}

pub(crate) async fn apply_handler<S>(
    State(service): State<Arc<CastingService<S>>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    axum::Json(form): axum::Json<ApplicationForm>,
) -> Response
where
    S: RecordStore + 'static,
{
    let result = session(&service, &headers)
        .and_then(|ctx| service.apply(&ctx, &EventId(event_id), form));

    match result {
        Ok(applicant) => (StatusCode::CREATED, axum::Json(applicant)).into_response(),
        Err(error) => error_response(error),
    }
}

fn session<S>(
    service: &CastingService<S>,
    headers: &HeaderMap,
) -> Result<SessionContext, ServiceError>
where
    S: RecordStore + 'static,
{
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AccessError::Unauthenticated)?;
    service.session(&UserId(user_id.to_string()))
}

/// Malformed query strings get the same JSON error body as every other failure.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query.map(|Query(inner)| inner).map_err(|rejection| {
        let payload = json!({ "error": rejection.body_text() });
        (rejection.status(), axum::Json(payload)).into_response()
    })
}

fn artifact_response(artifact: ExportArtifact) -> Response {
    let disposition = artifact.content_disposition();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.body,
    )
        .into_response()
}

pub(crate) fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Access(AccessError::Unauthenticated) => StatusCode::UNAUTHORIZED,
        ServiceError::Access(AccessError::Forbidden { .. }) => StatusCode::FORBIDDEN,
        ServiceError::Filter(_) => StatusCode::BAD_REQUEST,
        ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::EventNotFound(_) | ServiceError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::AlreadyApplied(_) | ServiceError::Store(StoreError::Conflict) => {
            StatusCode::CONFLICT
        }
        ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!(%error, status = status.as_u16(), "request failed");
    }

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
