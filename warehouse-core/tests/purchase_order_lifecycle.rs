use rust_decimal::Decimal;
use sqlx::PgPool;

use warehouse_core::error::DomainError;
use warehouse_core::models::PoStatus;
use warehouse_core::services::purchase_orders::{
    CreatePurchaseOrderLine, CreatePurchaseOrderRequest, PoTransitionAction, PurchaseOrderService,
};

async fn seed_site_and_product(pool: &PgPool) -> (i64, i64, i64) {
    let site_id: i64 = sqlx::query_scalar!(
        "INSERT INTO sites (name, timezone, active) VALUES ($1, $2, true) RETURNING id",
        "Papeete DC",
        "Pacific/Tahiti",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let product_id: i64 = sqlx::query_scalar!(
        "INSERT INTO products (sku, name, uom, active) VALUES ($1, $2, 'ea', true) RETURNING id",
        "SKU-PO-1",
        "Crate of bottles",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let supplier_id: i64 = sqlx::query_scalar!(
        "INSERT INTO suppliers (name, lead_time_days, reliability_score) VALUES ($1, 21, 60) RETURNING id",
        "Island Beverage Supply",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    (site_id, product_id, supplier_id)
}

#[sqlx::test(migrations = "../migrations")]
async fn lifecycle_follows_draft_approved_shipped_partial_closed(pool: PgPool) {
    let (site_id, product_id, supplier_id) = seed_site_and_product(&pool).await;
    let svc = PurchaseOrderService::new(pool.clone());

    let po_id = svc
        .create(CreatePurchaseOrderRequest {
            po_number: "PO-1001".into(),
            supplier_id,
            site_id,
            expected_eta: None,
            shipment_id: None,
            lines: vec![CreatePurchaseOrderLine {
                product_id,
                qty_ordered: 30,
                unit_cost: Decimal::new(1999, 2),
            }],
        })
        .await
        .unwrap()
        .id;

    let detail = svc.get_detail(po_id).await.unwrap();
    assert_eq!(detail.po.status, PoStatus::Draft);

    let approved = svc
        .transition(po_id, PoTransitionAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.status, PoStatus::Approved);

    let shipped = svc
        .transition(po_id, PoTransitionAction::Ship, None)
        .await
        .unwrap();
    assert_eq!(shipped.status, PoStatus::Shipped);

    let partial = svc
        .transition(po_id, PoTransitionAction::Receive, None)
        .await
        .unwrap();
    assert_eq!(partial.status, PoStatus::Partial);

    let closed = svc
        .transition(po_id, PoTransitionAction::Close, None)
        .await
        .unwrap();
    assert_eq!(closed.status, PoStatus::Closed);

    // Closed is terminal: no further transition is legal.
    let err = svc
        .transition(po_id, PoTransitionAction::Cancel, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}

#[sqlx::test(migrations = "../migrations")]
async fn draft_can_be_cancelled_but_not_shipped_directly(pool: PgPool) {
    let (site_id, product_id, supplier_id) = seed_site_and_product(&pool).await;
    let svc = PurchaseOrderService::new(pool.clone());

    let po_id = svc
        .create(CreatePurchaseOrderRequest {
            po_number: "PO-1002".into(),
            supplier_id,
            site_id,
            expected_eta: None,
            shipment_id: None,
            lines: vec![CreatePurchaseOrderLine {
                product_id,
                qty_ordered: 5,
                unit_cost: Decimal::new(500, 2),
            }],
        })
        .await
        .unwrap()
        .id;

    let err = svc
        .transition(po_id, PoTransitionAction::Ship, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    let cancelled = svc
        .transition(po_id, PoTransitionAction::Cancel, None)
        .await
        .unwrap();
    assert_eq!(cancelled.status, PoStatus::Cancelled);
}

#[sqlx::test(migrations = "../migrations")]
async fn duplicate_po_number_is_a_conflict(pool: PgPool) {
    let (site_id, product_id, supplier_id) = seed_site_and_product(&pool).await;
    let svc = PurchaseOrderService::new(pool.clone());

    let req = || CreatePurchaseOrderRequest {
        po_number: "PO-DUP".into(),
        supplier_id,
        site_id,
        expected_eta: None,
        shipment_id: None,
        lines: vec![CreatePurchaseOrderLine {
            product_id,
            qty_ordered: 5,
            unit_cost: Decimal::new(500, 2),
        }],
    };

    svc.create(req()).await.unwrap();
    let err = svc.create(req()).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}
