mod error;
mod handlers;
mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::monitor::SeatMonitor;

pub use error::{ApiError, ApiResult};

pub fn router(monitor: SeatMonitor) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/state", get(handlers::current_state))
        .route("/api/history", get(handlers::history))
        .route("/api/sensors/latest", get(handlers::latest_sensors))
        .route("/api/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .with_state(monitor)
}
