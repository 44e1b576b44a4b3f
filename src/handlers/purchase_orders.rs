//! Purchase-order lifecycle endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use warehouse_core::error::DomainError;
use warehouse_core::models::{ActorId, PurchaseOrderId, SiteId};
use warehouse_core::services::purchase_orders::{
    CreatePurchaseOrderRequest, PoTransitionAction, PoTransitionOutcome, PurchaseOrderDetail,
};
use warehouse_core::services::CreatedId;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purchase-orders", post(create).get(list))
        .route("/purchase-orders/:po_id", get(get_detail))
        .route("/purchase-orders/:po_id/transitions", post(transition))
}

async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePurchaseOrderRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.purchase_orders.create(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct SiteFilterQuery {
    pub site_id: Option<SiteId>,
}

async fn list(
    State(state): State<AppState>,
    Query(q): Query<SiteFilterQuery>,
) -> Result<Json<Vec<warehouse_core::models::PurchaseOrder>>, DomainError> {
    Ok(Json(state.purchase_orders.list(q.site_id).await?))
}

async fn get_detail(
    State(state): State<AppState>,
    Path(po_id): Path<PurchaseOrderId>,
) -> Result<Json<PurchaseOrderDetail>, DomainError> {
    Ok(Json(state.purchase_orders.get_detail(po_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub action: PoTransitionAction,
    pub actor_id: Option<ActorId>,
}

async fn transition(
    State(state): State<AppState>,
    Path(po_id): Path<PurchaseOrderId>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<PoTransitionOutcome>, DomainError> {
    Ok(Json(
        state
            .purchase_orders
            .transition(po_id, body.action, body.actor_id)
            .await?,
    ))
}
