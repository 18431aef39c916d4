use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::roster::{RosterSnapshot, WorkspaceStore};

use super::domain::StudentKey;
use super::rules::RuleSetError;
use super::service::{
    AdmissibilityRequest, ClassCounts, PlacementService, PlacementServiceError, PlacementWorkspace,
    RuleDraft,
};

/// Router builder exposing the placement engine and the stored level workspaces.
pub fn placement_router<S>(service: Arc<PlacementService<S>>) -> Router
where
    S: WorkspaceStore + 'static,
{
    Router::new()
        .route("/api/v1/placement/auto", post(auto_handler::<S>))
        .route("/api/v1/placement/violations", post(violations_handler::<S>))
        .route("/api/v1/placement/report", post(report_handler::<S>))
        .route(
            "/api/v1/placement/admissibility",
            post(admissibility_handler::<S>),
        )
        .route("/api/v1/roster", get(roster_handler::<S>))
        .route("/api/v1/roster/import", post(import_handler::<S>))
        .route("/api/v1/roster/export", post(export_handler))
        .route("/api/v1/roster/levels", get(levels_handler::<S>))
        .route("/api/v1/levels/:level", get(level_handler::<S>))
        .route("/api/v1/levels/:level/classes", put(classes_handler::<S>))
        .route("/api/v1/levels/:level/rules", post(add_rule_handler::<S>))
        .route(
            "/api/v1/levels/:level/rules/:rule_id",
            delete(remove_rule_handler::<S>),
        )
        .route("/api/v1/levels/:level/place", post(place_level_handler::<S>))
        .route(
            "/api/v1/levels/:level/violations",
            get(level_violations_handler::<S>),
        )
        .route("/api/v1/levels/:level/report", get(level_report_handler::<S>))
        .route("/api/v1/levels/:level/moves", post(move_handler::<S>))
        .route("/api/v1/levels/:level/reset", post(reset_handler::<S>))
        .with_state(service)
}

type Shared<S> = State<Arc<PlacementService<S>>>;

pub(crate) async fn auto_handler<S>(
    State(service): Shared<S>,
    Json(workspace): Json<PlacementWorkspace>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    let outcome = service.auto_place(&workspace);
    (StatusCode::OK, Json(outcome)).into_response()
}

pub(crate) async fn violations_handler<S>(
    State(service): Shared<S>,
    Json(workspace): Json<PlacementWorkspace>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    (StatusCode::OK, Json(service.check_violations(&workspace))).into_response()
}

pub(crate) async fn report_handler<S>(
    State(service): Shared<S>,
    Json(workspace): Json<PlacementWorkspace>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    (StatusCode::OK, Json(service.report(&workspace))).into_response()
}

pub(crate) async fn admissibility_handler<S>(
    State(service): Shared<S>,
    Json(request): Json<AdmissibilityRequest>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.admissibility(&request) {
        Ok(verdict) => (StatusCode::OK, Json(verdict)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn roster_handler<S>(State(service): Shared<S>) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.roster() {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<S>(State(service): Shared<S>, body: String) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.import_roster(body.as_bytes()) {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler(Json(snapshot): Json<RosterSnapshot>) -> Response {
    let mut buffer = Vec::new();
    match snapshot.write_csv(&mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(error) => AppError::Import(error).into_response(),
    }
}

pub(crate) async fn levels_handler<S>(State(service): Shared<S>) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.levels() {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn level_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.level_workspace(&level) {
        Ok(workspace) => (StatusCode::OK, Json(workspace)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn classes_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
    Json(counts): Json<ClassCounts>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.configure_classes(&level, counts) {
        Ok(workspace) => (StatusCode::OK, Json(workspace)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_rule_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
    Json(draft): Json<RuleDraft>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.add_rule(&level, draft) {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_rule_handler<S>(
    State(service): Shared<S>,
    Path((level, rule_id)): Path<(String, String)>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.remove_rule(&level, &rule_id) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn place_level_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.place_level(&level) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn level_violations_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.level_violations(&level) {
        Ok(violations) => (StatusCode::OK, Json(violations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn level_report_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.level_report(&level) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoveRequest {
    student: StudentKey,
    #[serde(default)]
    class_id: Option<String>,
}

pub(crate) async fn move_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.move_student(&level, &request.student, request.class_id.as_deref()) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reset_handler<S>(
    State(service): Shared<S>,
    Path(level): Path<String>,
) -> Response
where
    S: WorkspaceStore + 'static,
{
    match service.reset_level(&level) {
        Ok(cleared) => (StatusCode::OK, Json(json!({ "cleared": cleared }))).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PlacementServiceError) -> Response {
    let error = match error {
        PlacementServiceError::Import(err) => return AppError::Import(err).into_response(),
        PlacementServiceError::Store(err) => return AppError::Store(err).into_response(),
        other => other,
    };

    let status = match &error {
        PlacementServiceError::UnknownStudent(_)
        | PlacementServiceError::UnknownClass(_)
        | PlacementServiceError::NoRoster
        | PlacementServiceError::Edit(_)
        | PlacementServiceError::Rules(RuleSetError::NotFound(_)) => StatusCode::NOT_FOUND,
        PlacementServiceError::Rules(RuleSetError::BuiltIn(_)) => StatusCode::CONFLICT,
        PlacementServiceError::ClassSetup(_)
        | PlacementServiceError::Rules(RuleSetError::Invalid(_)) => StatusCode::BAD_REQUEST,
        PlacementServiceError::Import(_) | PlacementServiceError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
