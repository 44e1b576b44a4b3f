//! Shipment creation and the append-only event log.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use warehouse_core::error::DomainError;
use warehouse_core::models::{Shipment, ShipmentEvent, ShipmentId};
use warehouse_core::services::shipments::{
    AppendShipmentEventOutcome, AppendShipmentEventRequest, CreateShipmentRequest,
};
use warehouse_core::services::CreatedId;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shipments", post(create).get(list))
        .route("/shipments/:shipment_id/events", post(append_event).get(list_events))
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.shipments.create(req).await?))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Shipment>>, DomainError> {
    Ok(Json(state.shipments.list().await?))
}

async fn list_events(
    State(state): State<AppState>,
    Path(shipment_id): Path<ShipmentId>,
) -> Result<Json<Vec<ShipmentEvent>>, DomainError> {
    Ok(Json(state.shipments.list_events(shipment_id).await?))
}

async fn append_event(
    State(state): State<AppState>,
    Path(shipment_id): Path<ShipmentId>,
    Json(req): Json<AppendShipmentEventRequest>,
) -> Result<Json<AppendShipmentEventOutcome>, DomainError> {
    Ok(Json(state.shipments.append_event(shipment_id, req).await?))
}
