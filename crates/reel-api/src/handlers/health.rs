//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
    /// Import currently held by the ingest worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest_in_flight: Option<String>,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub store: CheckStatus,
    pub storage: CheckStatus,
    pub ffmpeg: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(started: Instant) -> Self {
        Self {
            status: "ok",
            error: None,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error",
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn skipped() -> Self {
        Self {
            status: "skipped",
            error: None,
            latency_ms: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status != "error"
    }
}

/// Readiness probe: store, object storage (when configured) and ffmpeg.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let store = {
        let started = Instant::now();
        match state.ctx.videos.ping().await {
            Ok(()) => CheckStatus::ok(started),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let storage = match &state.storage {
        Some(client) => {
            let started = Instant::now();
            match client.check_connectivity().await {
                Ok(()) => CheckStatus::ok(started),
                Err(e) => CheckStatus::error(e.to_string()),
            }
        }
        None => CheckStatus::skipped(),
    };

    let ffmpeg = {
        let started = Instant::now();
        match reel_media::check_ffmpeg() {
            Ok(_) => CheckStatus::ok(started),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let all_ok = store.is_healthy() && storage.is_healthy() && ffmpeg.is_healthy();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" },
        checks: ReadinessChecks { store, storage, ffmpeg },
        ingest_in_flight: state.ingest.in_flight().map(|id| id.to_string()),
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
