//! Health check endpoint

use axum::extract::State;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::storage::Repository;

/// GET /ping
///
/// Maps the repository liveness probe to a status code. Backends without an
/// external dependency report `Unsupported`, which surfaces as a 500.
pub async fn ping(State(state): State<AppState>) -> ApiResult<&'static str> {
    state.repository.ping().await?;
    info!("successfully pinged the database");
    Ok("OK")
}
