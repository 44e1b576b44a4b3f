//! Stock mutation endpoints: transfer/reserve/unreserve/issue require
//! `Idempotency-Key`; goods-receipts derives one when absent.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use warehouse_core::error::DomainError;
use warehouse_core::models::{ActorId, LocationId, ProductId, PurchaseOrderId};
use warehouse_core::services::mutation::{
    IssueRequest, ReceiveGoodsLine, ReceiveGoodsOutcome, ReceiveGoodsRequest, ReserveRequest,
    TransferRequest, UnreserveRequest,
};

use crate::idempotency_header;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stock-movements/transfer", post(transfer))
        .route("/stock-movements/reserve", post(reserve))
        .route("/stock-movements/unreserve", post(unreserve))
        .route("/stock-movements/issue", post(issue))
        .route("/goods-receipts", post(receive_goods))
}

#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub product_id: ProductId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
}

async fn transfer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TransferBody>,
) -> Result<Json<warehouse_core::services::mutation::MovementOutcome>, DomainError> {
    let idempotency_key = idempotency_header::required(&headers)?;
    let req = TransferRequest {
        product_id: body.product_id,
        from_location_id: body.from_location_id,
        to_location_id: body.to_location_id,
        quantity: body.quantity,
        happened_at: body.happened_at,
        reason: body.reason,
        created_by: body.created_by,
        idempotency_key,
    };
    Ok(Json(state.inventory.transfer(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct SingleLocationBody {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
}

async fn reserve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SingleLocationBody>,
) -> Result<Json<warehouse_core::services::mutation::MovementOutcome>, DomainError> {
    let idempotency_key = idempotency_header::required(&headers)?;
    let req = ReserveRequest {
        product_id: body.product_id,
        location_id: body.location_id,
        quantity: body.quantity,
        happened_at: body.happened_at,
        reason: body.reason,
        created_by: body.created_by,
        idempotency_key,
    };
    Ok(Json(state.inventory.reserve(req).await?))
}

async fn unreserve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SingleLocationBody>,
) -> Result<Json<warehouse_core::services::mutation::MovementOutcome>, DomainError> {
    let idempotency_key = idempotency_header::required(&headers)?;
    let req = UnreserveRequest {
        product_id: body.product_id,
        location_id: body.location_id,
        quantity: body.quantity,
        happened_at: body.happened_at,
        reason: body.reason,
        created_by: body.created_by,
        idempotency_key,
    };
    Ok(Json(state.inventory.unreserve(req).await?))
}

async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SingleLocationBody>,
) -> Result<Json<warehouse_core::services::mutation::MovementOutcome>, DomainError> {
    let idempotency_key = idempotency_header::required(&headers)?;
    let req = IssueRequest {
        product_id: body.product_id,
        location_id: body.location_id,
        quantity: body.quantity,
        happened_at: body.happened_at,
        reason: body.reason,
        created_by: body.created_by,
        idempotency_key,
    };
    Ok(Json(state.inventory.issue(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReceiveGoodsBody {
    pub po_id: PurchaseOrderId,
    pub to_location_id: LocationId,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<ReceiveGoodsLine>,
    pub received_by: Option<ActorId>,
}

async fn receive_goods(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ReceiveGoodsBody>,
) -> Result<Json<ReceiveGoodsOutcome>, DomainError> {
    let req = ReceiveGoodsRequest {
        po_id: body.po_id,
        to_location_id: body.to_location_id,
        received_at: body.received_at,
        lines: body.lines,
        received_by: body.received_by,
        provided_idempotency_key: idempotency_header::optional(&headers),
    };
    Ok(Json(state.inventory.receive_goods(req).await?))
}
