use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{
    ActorRole, LocationType, MovementType, PoStatus, ReceiptStatus, ShipmentMode, ShipmentStatus,
};
use super::ids::*;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub timezone: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: LocationId,
    pub site_id: SiteId,
    pub name: String,
    pub r#type: LocationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub uom: String,
    pub barcode: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub country: Option<String>,
    pub lead_time_days: i32,
    pub reliability_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Actor {
    pub id: ActorId,
    pub site_id: SiteId,
    pub display_name: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shipment {
    pub id: ShipmentId,
    pub mode: ShipmentMode,
    pub carrier: Option<String>,
    pub tracking_ref: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub status: ShipmentStatus,
    pub eta_initial: Option<NaiveDate>,
    pub eta_current: Option<NaiveDate>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShipmentEvent {
    pub id: ShipmentEventId,
    pub shipment_id: ShipmentId,
    pub event_code: String,
    pub location: Option<String>,
    pub event_time: DateTime<Utc>,
    pub source: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Container {
    pub id: ContainerId,
    pub shipment_id: ShipmentId,
    pub container_number: String,
    pub seal_number: Option<String>,
    pub r#type: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: SupplierId,
    pub site_id: SiteId,
    pub status: PoStatus,
    pub expected_eta: Option<NaiveDate>,
    pub shipment_id: Option<ShipmentId>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<ActorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PurchaseOrderLine {
    pub po_id: PurchaseOrderId,
    pub product_id: ProductId,
    pub qty_ordered: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoodsReceipt {
    pub id: GoodsReceiptId,
    pub po_id: PurchaseOrderId,
    pub site_id: SiteId,
    pub status: ReceiptStatus,
    pub received_at: Option<DateTime<Utc>>,
    pub received_by: Option<ActorId>,
    pub container_id: Option<ContainerId>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GoodsReceiptLine {
    pub receipt_id: GoodsReceiptId,
    pub product_id: ProductId,
    pub qty_received: i32,
    pub qty_damaged: i32,
    pub lot_code: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

/// `(product_id, location_id)` is the composite key; `qty_on_order` is
/// a derived field that only the rebuilder may write.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub qty_on_hand: i32,
    pub qty_reserved: i32,
    pub qty_on_order: i32,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// `qty_on_hand - qty_reserved`. `qty_on_order` is forward-looking
    /// and never counts toward what can be reserved or transferred out.
    pub fn available(&self) -> i32 {
        self.qty_on_hand - self.qty_reserved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockMovement {
    pub id: StockMovementId,
    pub product_id: ProductId,
    pub from_location_id: Option<LocationId>,
    pub to_location_id: Option<LocationId>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
    pub happened_at: DateTime<Utc>,
    pub created_by: Option<ActorId>,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}
