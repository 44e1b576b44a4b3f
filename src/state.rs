use warehouse_core::services::{CatalogService, InventoryService, PurchaseOrderService, ShipmentService};
use warehouse_shared::DbPool;
use warehouse_shared::database::HealthChecker;

/// Shared state handed to every handler. Cheap to clone: every field is
/// either a `PgPool` (internally `Arc`-backed) or a service wrapping one.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub inventory: InventoryService,
    pub purchase_orders: PurchaseOrderService,
    pub shipments: ShipmentService,
    pub health: HealthChecker,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            catalog: CatalogService::new(pool.clone()),
            inventory: InventoryService::new(pool.clone()),
            purchase_orders: PurchaseOrderService::new(pool.clone()),
            shipments: ShipmentService::new(pool.clone()),
            health: HealthChecker::new(pool),
        }
    }
}
