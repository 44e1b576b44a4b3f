use axum::extract::State;
use axum::Json;
use warehouse_shared::database::HealthReport;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.check().await)
}
