use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::statistics::{DailyReport, StatsError, SummaryReport};
use crate::tracking::{MetricsReport, MetricsSnapshot};

const DEFAULT_SUMMARY_DAYS: u32 = 7;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Stats request failed");
        let body = ErrorBody {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResult {
    pub removed: usize,
    pub days_to_keep: u32,
}

pub async fn get_metrics(State(state): State<AdminState>) -> Json<MetricsSnapshot> {
    Json(state.tracker.get_metrics())
}

pub async fn post_report(State(state): State<AdminState>) -> Result<Json<MetricsReport>, AdminError> {
    let tracker = state.tracker.clone();
    let report = tokio::task::spawn_blocking(move || tracker.generate_report()).await?;
    Ok(Json(report))
}

pub async fn get_daily(
    State(state): State<AdminState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<DailyReport>, AdminError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let statistics = state.statistics.clone();
    let report = tokio::task::spawn_blocking(move || statistics.generate_daily_report(date)).await??;
    Ok(Json(report))
}

pub async fn get_summary(
    State(state): State<AdminState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<SummaryReport>, AdminError> {
    let days = query.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    let statistics = state.statistics.clone();
    let report = tokio::task::spawn_blocking(move || statistics.generate_summary_report(days)).await??;
    Ok(Json(report))
}

pub async fn post_clean(
    State(state): State<AdminState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<CleanResult>, AdminError> {
    let days_to_keep = query.days.unwrap_or(state.default_retention_days);
    let statistics = state.statistics.clone();
    let removed = tokio::task::spawn_blocking(move || statistics.clean_old_logs(days_to_keep)).await??;
    Ok(Json(CleanResult { removed, days_to_keep }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    use crate::admin::{router, AdminState};
    use crate::observability::LogSink;
    use crate::statistics::StatisticsManager;
    use crate::tracking::MetricsTracker;

    fn app(api_key: Option<&str>) -> (std::path::PathBuf, Router) {
        let dir = std::env::temp_dir().join(format!("auto-router-admin-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let sink = Arc::new(LogSink::new(dir.join("metrics.log")));
        let state = AdminState::new(
            Arc::new(MetricsTracker::new(Arc::clone(&sink))),
            StatisticsManager::new(sink),
            30,
            api_key.map(str::to_string),
        );
        (dir, router("/__autorouter", state))
    }

    async fn json(app: &Router, method: &str, uri: &str) -> (u16, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_endpoints_on_empty_log() {
        let (dir, app) = app(None);

        let (status, body) = json(&app, "GET", "/__autorouter/metrics").await;
        assert_eq!(status, 200);
        assert_eq!(body["summary"]["totalRequests"], 0);

        let (status, body) = json(&app, "GET", "/__autorouter/daily?date=2026-10-18").await;
        assert_eq!(status, 200);
        assert_eq!(body["date"], "2026-10-18");
        assert_eq!(body["totalRequests"], 0);

        let (status, body) = json(&app, "GET", "/__autorouter/summary?days=3").await;
        assert_eq!(status, 200);
        assert_eq!(body["period"], "3 days");
        assert!(body["mostActiveDay"].is_null());

        let (status, body) = json(&app, "POST", "/__autorouter/report").await;
        assert_eq!(status, 200);
        assert!(body["topRoutes"].as_array().unwrap().is_empty());

        // The report line is the only entry and is recent.
        let (status, body) = json(&app, "POST", "/__autorouter/clean").await;
        assert_eq!(status, 200);
        assert_eq!(body["removed"], 0);
        assert_eq!(body["daysToKeep"], 30);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_bad_date_is_rejected() {
        let (dir, app) = app(None);
        let (status, _) = json(&app, "GET", "/__autorouter/daily?date=yesterday").await;
        assert_eq!(status, 400);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let (dir, app) = app(Some("secret"));

        let (status, _) = json(&app, "GET", "/__autorouter/metrics").await;
        assert_eq!(status, 401);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/__autorouter/metrics")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        std::fs::remove_dir_all(dir).ok();
    }
}
