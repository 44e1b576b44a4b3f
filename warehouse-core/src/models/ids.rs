// Identifiers are opaque monotonic integers — BIGSERIAL columns,
// surfaced here as plain aliases rather than newtypes; nothing in this
// crate needs them to be anything but an i64 with a readable name.

pub type SiteId = i64;
pub type LocationId = i64;
pub type ProductId = i64;
pub type SupplierId = i64;
pub type ActorId = i64;
pub type ShipmentId = i64;
pub type ShipmentEventId = i64;
pub type ContainerId = i64;
pub type PurchaseOrderId = i64;
pub type GoodsReceiptId = i64;
pub type StockMovementId = i64;
