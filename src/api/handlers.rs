use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::SensorChannels,
    monitor::{HealthReport, HistoryPoint, SeatMonitor},
    posture::SeatState,
};

use super::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
}

pub async fn current_state(State(monitor): State<SeatMonitor>) -> ApiResult<Json<SeatState>> {
    Ok(Json(monitor.current_state(Utc::now()).await?))
}

pub async fn history(State(monitor): State<SeatMonitor>) -> ApiResult<Json<Vec<HistoryPoint>>> {
    Ok(Json(monitor.bucket_history(Utc::now()).await?))
}

/// Channels of the newest snapshot, or `null` when none has been logged.
pub async fn latest_sensors(
    State(monitor): State<SeatMonitor>,
) -> ApiResult<Json<Option<SensorChannels>>> {
    Ok(Json(monitor.latest_snapshot().await?))
}

pub async fn reset(State(monitor): State<SeatMonitor>) -> ApiResult<Json<ResetResponse>> {
    monitor.reset(Utc::now()).await?;
    Ok(Json(ResetResponse { success: true }))
}

pub async fn health(State(monitor): State<SeatMonitor>) -> ApiResult<Json<HealthReport>> {
    Ok(Json(monitor.health().await?))
}
