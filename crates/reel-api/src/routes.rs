//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::cloud::list_cloud_files;
use crate::handlers::imports::{cancel_import, enqueue_imports, list_imports};
use crate::handlers::videos::{
    analyze_confidentiality, create_video_clip, get_video, get_video_status, publish_video, regenerate_metadata,
    reprocess_video, reset_video, update_trim, upload_video,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let upload_routes = Router::new()
        .route("/videos/upload", post(upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_upload_size));

    let video_routes = Router::new()
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id/status", get(get_video_status))
        .route("/videos/:video_id/trim", patch(update_trim))
        .route("/videos/:video_id/reset", post(reset_video))
        .route("/videos/:video_id/reprocess", post(reprocess_video))
        .route("/videos/:video_id/metadata", post(regenerate_metadata))
        .route("/videos/:video_id/publish", post(publish_video))
        .route("/videos/:video_id/clips", post(create_video_clip))
        .route("/videos/:video_id/confidentiality", post(analyze_confidentiality));

    let import_routes = Router::new()
        .route("/cloud/files", get(list_cloud_files))
        .route("/imports", post(enqueue_imports).get(list_imports))
        .route("/imports/:import_id/cancel", post(cancel_import));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(import_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .merge(upload_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
