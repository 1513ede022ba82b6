//! HTTP API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::protocol::{ReportSummary, StudentReport};
use crate::ui::server::AppState;

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Console status
#[derive(serde::Serialize)]
pub struct ConsoleStatus {
    pub connection: &'static str,
    pub student_count: usize,
    pub envelopes_ingested: u64,
    pub uptime_seconds: u64,
}

/// Get console status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ConsoleStatus>> {
    let status = ConsoleStatus {
        connection: state.bus_state.lock().label(),
        student_count: state.store.student_count(),
        envelopes_ingested: state.store.ingested(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };

    Json(ApiResponse::ok(status))
}

/// Get the live snapshot of every student
pub async fn get_students(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<crate::aggregate::StudentSnapshot>>> {
    Json(ApiResponse::ok(state.store.snapshot()))
}

/// Get one student's live state and accumulated timeline
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (
    StatusCode,
    Json<ApiResponse<crate::aggregate::StudentSnapshot>>,
) {
    match state.store.get_snapshot(&id) {
        Some(snapshot) => (StatusCode::OK, Json(ApiResponse::ok(snapshot))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Student not seen: {}", id))),
        ),
    }
}

/// Stop-session response: the remote report plus the summary computed
/// from the in-memory window, clearly labeled apart
#[derive(serde::Serialize)]
pub struct StopSessionResponse {
    pub report: StudentReport,
    pub local_summary: ReportSummary,
}

/// Stop a student's session and fetch their report.
///
/// The report request happens exactly once; a failure is returned to
/// the caller and never retried here.
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<StopSessionResponse>>) {
    let Some(record) = state.store.get(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Student not seen: {}", id))),
        );
    };

    let local_summary = record
        .timeline
        .summarize(state.store.confusion_threshold());

    match state.reports.student_report(&id).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ApiResponse::ok(StopSessionResponse {
                report,
                local_summary,
            })),
        ),
        Err(e) => {
            tracing::warn!("Report fetch for {} failed: {}", id, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
