//! Ingestion and read-back endpoints

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, State};
use serde::Deserialize;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::Repository;
use crate::{MetricKind, MetricPoint};

/// POST /update/{kind}/{id}/{value}
///
/// Path-style single-point update; the value is parsed according to the
/// kind.
pub async fn update_path(
    State(state): State<AppState>,
    Path((kind, id, value)): Path<(String, String, String)>,
) -> ApiResult<&'static str> {
    let kind: MetricKind = kind.parse().map_err(ApiError::from)?;

    match kind {
        MetricKind::Counter => {
            let delta: i64 = value
                .parse()
                .map_err(|_| ApiError::InvalidRequest(format!("invalid counter delta: {value}")))?;
            state.repository.counter(&id, delta).await?;
        }
        MetricKind::Gauge => {
            let value: f64 = value
                .parse()
                .map_err(|_| ApiError::InvalidRequest(format!("invalid gauge value: {value}")))?;
            state.repository.replace_gauge(&id, value).await?;
        }
    }

    state.flush_write_through().await;
    Ok("OK")
}

/// POST /update
///
/// JSON single-point update; responds with the stored point so counter
/// callers see the merged delta.
pub async fn update_json(
    State(state): State<AppState>,
    Json(point): Json<MetricPoint>,
) -> ApiResult<Json<MetricPoint>> {
    point.validate().map_err(ApiError::from)?;

    match point.kind {
        MetricKind::Counter => {
            let delta = point
                .delta
                .ok_or_else(|| ApiError::InvalidRequest("missing delta".to_string()))?;
            state.repository.counter(&point.id, delta).await?;
        }
        MetricKind::Gauge => {
            let value = point
                .value
                .ok_or_else(|| ApiError::InvalidRequest("missing value".to_string()))?;
            state.repository.replace_gauge(&point.id, value).await?;
        }
    }

    state.flush_write_through().await;

    let stored = state.repository.get_metric(point.kind, &point.id).await?;
    Ok(Json(stored))
}

/// POST /updates
///
/// Ordered batch update. Each point is validated and applied through
/// `update_many`; whether earlier points survive a mid-batch failure
/// depends on the backend (partial for memory/file, all-or-nothing for the
/// database).
pub async fn updates(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(points): Json<Vec<MetricPoint>>,
) -> ApiResult<&'static str> {
    debug!("ingesting batch of {} points", points.len());

    let names: Vec<String> = points.iter().map(|p| p.id.clone()).collect();

    state.repository.update_many(points).await?;
    state.flush_write_through().await;

    if let Some(audit) = &state.audit {
        let ip = addr
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        audit.notify(names, &ip).await;
    }

    Ok("OK")
}

#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// POST /value
///
/// JSON read-back of a full point.
pub async fn value_json(
    State(state): State<AppState>,
    Json(request): Json<ValueRequest>,
) -> ApiResult<Json<MetricPoint>> {
    let point = state
        .repository
        .get_metric(request.kind, &request.id)
        .await?;
    Ok(Json(point))
}

/// GET /value/{kind}/{id}
///
/// Plain-text read-back of the current value.
pub async fn value_path(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<String> {
    let kind: MetricKind = kind.parse().map_err(ApiError::from)?;
    let value = state.repository.get_value(kind, &id).await?;
    Ok(value.to_string())
}

/// GET /
///
/// All stored points as JSON.
pub async fn index(State(state): State<AppState>) -> ApiResult<Json<Vec<MetricPoint>>> {
    let points = state.repository.all().await?;
    Ok(Json(points))
}
