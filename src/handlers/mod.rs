pub mod catalog;
pub mod health;
pub mod purchase_orders;
pub mod shipments;
pub mod stock;

use axum::Router;

use crate::state::AppState;

/// The `/v1` domain surface: every handler module nests its routes here.
/// `/health` is mounted separately, outside the versioned prefix.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(stock::router())
        .merge(purchase_orders::router())
        .merge(shipments::router())
}
