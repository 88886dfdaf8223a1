//! HTTP ingestion and query surface
//!
//! ## Endpoints
//!
//! - `POST /update/:kind/:id/:value` - path-style single update
//! - `POST /update` - JSON single update
//! - `POST /updates` - JSON batch update (audited)
//! - `POST /value` - JSON read-back of a full point
//! - `GET /value/:kind/:id` - plain-text read-back
//! - `GET /` - all stored points
//! - `GET /ping` - storage liveness probe
//!
//! Handlers only ever see `Arc<dyn Repository>`; the backend was selected
//! once at startup.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::metrics::index))
        .route("/update/:kind/:id/:value", post(routes::metrics::update_path))
        .route("/update", post(routes::metrics::update_json))
        .route("/updates", post(routes::metrics::updates))
        .route("/value", post(routes::metrics::value_json))
        .route("/value/:kind/:id", get(routes::metrics::value_path))
        .route("/ping", get(routes::health::ping))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
