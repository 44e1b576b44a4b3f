pub mod catalog;
pub mod mutation;
pub mod purchase_orders;
pub mod rebuilder;
pub mod shipments;

pub use catalog::{CatalogService, CreatedId};
pub use mutation::InventoryService;
pub use purchase_orders::PurchaseOrderService;
pub use shipments::ShipmentService;
