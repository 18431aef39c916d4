use metrics_exporter_prometheus::PrometheusHandle;
use roster_planner::config::PlacementConfig;
use roster_planner::placement::PlacementService;
use roster_planner::roster::JsonFileStore;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service backed by the JSON workspace under the configured data directory.
pub(crate) fn planner_service(config: &PlacementConfig) -> PlacementService<JsonFileStore> {
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    PlacementService::new(store, config.clone())
}
