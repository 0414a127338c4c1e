use axum::Json;
use axum::extract::State;
use vidgen_core::app::HealthReport;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthReport>> {
    Ok(Json(state.app.health().await?))
}
