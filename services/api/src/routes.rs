use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use roster_planner::error::AppError;
use roster_planner::placement::{placement_router, PlacementService};
use roster_planner::roster::{blank_template, WorkspaceStore};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_planner_routes<S>(service: Arc<PlacementService<S>>) -> axum::Router
where
    S: WorkspaceStore + 'static,
{
    placement_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/roster/template",
            axum::routing::get(template_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Empty roster with the full column vocabulary, for schools starting from scratch.
pub(crate) async fn template_endpoint() -> Result<impl IntoResponse, AppError> {
    let mut buffer = Vec::new();
    blank_template(&mut buffer)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"roster_template.csv\"",
            ),
        ],
        buffer,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use roster_planner::config::PlacementConfig;
    use roster_planner::roster::MemoryStore;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let service = PlacementService::new(
            Arc::new(MemoryStore::default()),
            PlacementConfig::default(),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_planner_routes(Arc::new(service)).layer(Extension(state))
    }

    #[tokio::test]
    async fn readiness_reflects_the_startup_flag() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn template_lists_every_column() {
        let response = template_endpoint()
            .await
            .expect("template builds")
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1 << 16)
            .await
            .expect("read body");
        let header_row = String::from_utf8(body.to_vec()).expect("utf-8 csv");
        assert!(header_row.starts_with("\"NOM\",\"PRENOM\",\"DATE\""));
        assert!(header_row.trim_end().ends_with("\"FUTURE_CLASSE\""));
    }

    #[tokio::test]
    async fn placement_routes_are_mounted() {
        let response = app(true)
            .oneshot(
                Request::get("/api/v1/levels/6EME")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
