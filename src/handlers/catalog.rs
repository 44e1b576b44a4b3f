//! Master-data CRUD: sites, locations, products, suppliers, actors,
//! plus the read-through `/stock` listing. None of these take row locks.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use warehouse_core::error::DomainError;
use warehouse_core::models::{LocationId, ProductId, SiteId};
use warehouse_core::services::catalog::{
    CreateActorRequest, CreateLocationRequest, CreateProductRequest, CreateSiteRequest,
    CreateSupplierRequest, CreatedId, StockFilter,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sites", post(create_site).get(list_sites))
        .route("/locations", post(create_location).get(list_locations))
        .route("/products", post(create_product).get(list_products))
        .route("/suppliers", post(create_supplier).get(list_suppliers))
        .route("/actors", post(create_actor))
        .route("/stock", get(list_stock))
}

async fn create_site(
    State(state): State<AppState>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.catalog.create_site(req).await?))
}

async fn list_sites(State(state): State<AppState>) -> Result<Json<Vec<warehouse_core::models::Site>>, DomainError> {
    Ok(Json(state.catalog.list_sites().await?))
}

async fn create_location(
    State(state): State<AppState>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.catalog.create_location(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct SiteFilterQuery {
    pub site_id: Option<SiteId>,
}

async fn list_locations(
    State(state): State<AppState>,
    Query(q): Query<SiteFilterQuery>,
) -> Result<Json<Vec<warehouse_core::models::Location>>, DomainError> {
    Ok(Json(state.catalog.list_locations(q.site_id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.catalog.create_product(req).await?))
}

async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<warehouse_core::models::Product>>, DomainError> {
    Ok(Json(state.catalog.list_products().await?))
}

async fn create_supplier(
    State(state): State<AppState>,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.catalog.create_supplier(req).await?))
}

async fn list_suppliers(
    State(state): State<AppState>,
) -> Result<Json<Vec<warehouse_core::models::Supplier>>, DomainError> {
    Ok(Json(state.catalog.list_suppliers().await?))
}

async fn create_actor(
    State(state): State<AppState>,
    Json(req): Json<CreateActorRequest>,
) -> Result<Json<CreatedId>, DomainError> {
    Ok(Json(state.catalog.create_actor(req).await?))
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub site_id: Option<SiteId>,
    pub location_id: Option<LocationId>,
    pub product_id: Option<ProductId>,
}

async fn list_stock(
    State(state): State<AppState>,
    Query(q): Query<StockQuery>,
) -> Result<Json<Vec<warehouse_core::models::StockLevel>>, DomainError> {
    let filter = StockFilter {
        site_id: q.site_id,
        location_id: q.location_id,
        product_id: q.product_id,
    };
    Ok(Json(state.catalog.list_stock(filter).await?))
}
