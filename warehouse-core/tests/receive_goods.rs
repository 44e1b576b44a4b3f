use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use warehouse_core::error::DomainError;
use warehouse_core::models::{LocationId, ProductId, PurchaseOrderId, SiteId};
use warehouse_core::services::mutation::{InventoryService, ReceiveGoodsLine, ReceiveGoodsRequest};
use warehouse_core::services::purchase_orders::{
    CreatePurchaseOrderLine, CreatePurchaseOrderRequest, PoTransitionAction, PurchaseOrderService,
};

#[allow(dead_code)]
struct Fixture {
    site_id: SiteId,
    other_site_id: SiteId,
    dock: LocationId,
    other_site_location: LocationId,
    product_a: ProductId,
    product_b: ProductId,
    supplier_id: i64,
}

async fn seed(pool: &PgPool) -> Fixture {
    let site_id: i64 = sqlx::query_scalar!(
        "INSERT INTO sites (name, timezone, active) VALUES ($1, $2, true) RETURNING id",
        "Papeete DC",
        "Pacific/Tahiti",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let other_site_id: i64 = sqlx::query_scalar!(
        "INSERT INTO sites (name, timezone, active) VALUES ($1, $2, true) RETURNING id",
        "Moorea Annex",
        "Pacific/Tahiti",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let dock: i64 = sqlx::query_scalar!(
        "INSERT INTO locations (site_id, name, type) VALUES ($1, 'TAH-DOCK', 'dock') RETURNING id",
        site_id,
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let other_site_location: i64 = sqlx::query_scalar!(
        "INSERT INTO locations (site_id, name, type) VALUES ($1, 'MOO-DOCK', 'dock') RETURNING id",
        other_site_id,
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let product_a: i64 = sqlx::query_scalar!(
        "INSERT INTO products (sku, name, uom, active) VALUES ($1, $2, 'ea', true) RETURNING id",
        "SKU-A",
        "Widget A",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let product_b: i64 = sqlx::query_scalar!(
        "INSERT INTO products (sku, name, uom, active) VALUES ($1, $2, 'ea', true) RETURNING id",
        "SKU-B",
        "Widget B",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let supplier_id: i64 = sqlx::query_scalar!(
        "INSERT INTO suppliers (name, lead_time_days, reliability_score) VALUES ($1, 14, 80) RETURNING id",
        "Pacific Supply Co",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    Fixture {
        site_id,
        other_site_id,
        dock,
        other_site_location,
        product_a,
        product_b,
        supplier_id,
    }
}

async fn create_and_approve_po(
    po_svc: &PurchaseOrderService,
    fx: &Fixture,
    lines: Vec<CreatePurchaseOrderLine>,
) -> PurchaseOrderId {
    let po_id = po_svc
        .create(CreatePurchaseOrderRequest {
            po_number: format!("PO-{}", uuid_like()),
            supplier_id: fx.supplier_id,
            site_id: fx.site_id,
            expected_eta: None,
            shipment_id: None,
            lines,
        })
        .await
        .unwrap()
        .id;
    po_svc
        .transition(po_id, PoTransitionAction::Approve, None)
        .await
        .unwrap();
    po_id
}

fn uuid_like() -> String {
    // tests run serially per sqlx::test database, but each test creates a
    // fresh fixture, so a fixed suffix per test is fine
    "0001".to_string()
}

#[sqlx::test(migrations = "../migrations")]
async fn receive_goods_rebuilds_qty_on_order_and_survives_po_close(pool: PgPool) {
    let fx = seed(&pool).await;
    let po_svc = PurchaseOrderService::new(pool.clone());
    let inv_svc = InventoryService::new(pool.clone());

    let po_id = create_and_approve_po(
        &po_svc,
        &fx,
        vec![CreatePurchaseOrderLine {
            product_id: fx.product_a,
            qty_ordered: 100,
            unit_cost: Decimal::new(1050, 2),
        }],
    )
    .await;

    // Engaged PO with nothing received yet: qty_on_order should equal qty_ordered.
    po_svc
        .transition(po_id, PoTransitionAction::Ship, None)
        .await
        .unwrap();

    let before_receipt: i32 = sqlx::query_scalar!(
        "SELECT qty_on_order FROM stock_levels WHERE product_id = $1 AND location_id = $2",
        fx.product_a,
        fx.dock,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(before_receipt, 100);

    inv_svc
        .receive_goods(ReceiveGoodsRequest {
            po_id,
            to_location_id: fx.dock,
            received_at: Utc::now(),
            lines: vec![ReceiveGoodsLine {
                product_id: fx.product_a,
                qty_received: 40,
                qty_damaged: 0,
                lot_code: None,
                expiration_date: None,
            }],
            received_by: None,
            provided_idempotency_key: Some("receipt-1".into()),
        })
        .await
        .unwrap();

    let after_partial_receipt: i32 = sqlx::query_scalar!(
        "SELECT qty_on_order FROM stock_levels WHERE product_id = $1 AND location_id = $2",
        fx.product_a,
        fx.dock,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(after_partial_receipt, 60);

    let on_hand: i32 = sqlx::query_scalar!(
        "SELECT qty_on_hand FROM stock_levels WHERE product_id = $1 AND location_id = $2",
        fx.product_a,
        fx.dock,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(on_hand, 40);

    po_svc
        .transition(po_id, PoTransitionAction::Close, None)
        .await
        .unwrap();

    // Closing the PO is a terminal transition: the open question resolution
    // says qty_on_order must not rebound because the receipt stays posted.
    let after_close: i32 = sqlx::query_scalar!(
        "SELECT qty_on_order FROM stock_levels WHERE product_id = $1 AND location_id = $2",
        fx.product_a,
        fx.dock,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(after_close, 0);
}

#[sqlx::test(migrations = "../migrations")]
async fn receive_goods_replay_with_same_key_is_idempotent(pool: PgPool) {
    let fx = seed(&pool).await;
    let po_svc = PurchaseOrderService::new(pool.clone());
    let inv_svc = InventoryService::new(pool.clone());

    let po_id = create_and_approve_po(
        &po_svc,
        &fx,
        vec![CreatePurchaseOrderLine {
            product_id: fx.product_a,
            qty_ordered: 50,
            unit_cost: Decimal::new(500, 2),
        }],
    )
    .await;

    let request = || ReceiveGoodsRequest {
        po_id,
        to_location_id: fx.dock,
        received_at: Utc::now(),
        lines: vec![ReceiveGoodsLine {
            product_id: fx.product_a,
            qty_received: 20,
            qty_damaged: 0,
            lot_code: None,
            expiration_date: None,
        }],
        received_by: None,
        provided_idempotency_key: Some("receipt-replay".into()),
    };

    let first = inv_svc.receive_goods(request()).await.unwrap();
    let second = inv_svc.receive_goods(request()).await.unwrap();
    assert_eq!(first.id, second.id);

    let on_hand: i32 = sqlx::query_scalar!(
        "SELECT qty_on_hand FROM stock_levels WHERE product_id = $1 AND location_id = $2",
        fx.product_a,
        fx.dock,
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(on_hand, 20);

    let receipt_count: i64 = sqlx::query_scalar!(
        "SELECT COUNT(*) FROM goods_receipts WHERE idempotency_key = $1",
        "receipt-replay",
    )
    .fetch_one(&pool)
    .await
    .unwrap()
    .unwrap();
    assert_eq!(receipt_count, 1);
}

#[sqlx::test(migrations = "../migrations")]
async fn receive_goods_rejects_location_outside_po_site(pool: PgPool) {
    let fx = seed(&pool).await;
    let po_svc = PurchaseOrderService::new(pool.clone());
    let inv_svc = InventoryService::new(pool.clone());

    let po_id = create_and_approve_po(
        &po_svc,
        &fx,
        vec![CreatePurchaseOrderLine {
            product_id: fx.product_a,
            qty_ordered: 10,
            unit_cost: Decimal::new(100, 2),
        }],
    )
    .await;

    let err = inv_svc
        .receive_goods(ReceiveGoodsRequest {
            po_id,
            to_location_id: fx.other_site_location,
            received_at: Utc::now(),
            lines: vec![ReceiveGoodsLine {
                product_id: fx.product_a,
                qty_received: 5,
                qty_damaged: 0,
                lot_code: None,
                expiration_date: None,
            }],
            received_by: None,
            provided_idempotency_key: Some("receipt-wrong-site".into()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    let _ = fx.other_site_id;
    let _ = fx.product_b;
}

#[sqlx::test(migrations = "../migrations")]
async fn receive_goods_rejects_product_not_on_po(pool: PgPool) {
    let fx = seed(&pool).await;
    let po_svc = PurchaseOrderService::new(pool.clone());
    let inv_svc = InventoryService::new(pool.clone());

    let po_id = create_and_approve_po(
        &po_svc,
        &fx,
        vec![CreatePurchaseOrderLine {
            product_id: fx.product_a,
            qty_ordered: 10,
            unit_cost: Decimal::new(100, 2),
        }],
    )
    .await;

    let err = inv_svc
        .receive_goods(ReceiveGoodsRequest {
            po_id,
            to_location_id: fx.dock,
            received_at: Utc::now(),
            lines: vec![ReceiveGoodsLine {
                product_id: fx.product_b,
                qty_received: 5,
                qty_damaged: 0,
                lot_code: None,
                expiration_date: None,
            }],
            received_by: None,
            provided_idempotency_key: Some("receipt-wrong-product".into()),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}

#[sqlx::test(migrations = "../migrations")]
async fn receive_goods_line_received_entirely_damaged_writes_no_movement(pool: PgPool) {
    let fx = seed(&pool).await;
    let po_svc = PurchaseOrderService::new(pool.clone());
    let inv_svc = InventoryService::new(pool.clone());

    let po_id = create_and_approve_po(
        &po_svc,
        &fx,
        vec![CreatePurchaseOrderLine {
            product_id: fx.product_a,
            qty_ordered: 10,
            unit_cost: Decimal::new(100, 2),
        }],
    )
    .await;

    inv_svc
        .receive_goods(ReceiveGoodsRequest {
            po_id,
            to_location_id: fx.dock,
            received_at: Utc::now(),
            lines: vec![ReceiveGoodsLine {
                product_id: fx.product_a,
                qty_received: 0,
                qty_damaged: 10,
                lot_code: None,
                expiration_date: None,
            }],
            received_by: None,
            provided_idempotency_key: Some("receipt-all-damaged".into()),
        })
        .await
        .unwrap();

    let movement_count: i64 = sqlx::query_scalar!("SELECT COUNT(*) FROM stock_movements")
        .fetch_one(&pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement_count, 0);

    let line_count: i64 = sqlx::query_scalar!("SELECT COUNT(*) FROM goods_receipt_lines")
        .fetch_one(&pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line_count, 1);
}
