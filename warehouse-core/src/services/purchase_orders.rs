use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::models::{
    ActorId, PoStatus, ProductId, PurchaseOrder, PurchaseOrderId, PurchaseOrderLine, ShipmentId,
    SiteId, SupplierId,
};
use crate::services::{rebuilder, CreatedId};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrderLine {
    pub product_id: ProductId,
    #[validate(range(min = 1))]
    pub qty_ordered: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrderRequest {
    #[validate(length(min = 1, max = 64))]
    pub po_number: String,
    pub supplier_id: SupplierId,
    pub site_id: SiteId,
    pub expected_eta: Option<NaiveDate>,
    pub shipment_id: Option<ShipmentId>,
    #[validate(length(min = 1))]
    pub lines: Vec<CreatePurchaseOrderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoTransitionAction {
    Approve,
    Ship,
    Receive,
    Close,
    Cancel,
}

impl PoTransitionAction {
    fn target_status(self) -> PoStatus {
        match self {
            PoTransitionAction::Approve => PoStatus::Approved,
            PoTransitionAction::Ship => PoStatus::Shipped,
            PoTransitionAction::Receive => PoStatus::Partial,
            PoTransitionAction::Close => PoStatus::Closed,
            PoTransitionAction::Cancel => PoStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoTransitionOutcome {
    pub id: PurchaseOrderId,
    pub status: PoStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetail {
    pub po: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
}

/// Drives the PO lifecycle state machine: creation and the transition
/// endpoint that advances draft -> ... -> closed/cancelled, rebuilding
/// `qty_on_order` whenever a transition crosses the engaged-set boundary.
#[derive(Clone)]
pub struct PurchaseOrderService {
    pool: PgPool,
}

impl PurchaseOrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        req: CreatePurchaseOrderRequest,
    ) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;
        let mut seen_products = std::collections::HashSet::new();
        for line in &req.lines {
            line.validate()
                .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;
            if line.unit_cost < Decimal::ZERO {
                return Err(DomainError::InvalidArgument(format!(
                    "unit_cost must be >= 0 for product {}",
                    line.product_id
                )));
            }
            if !seen_products.insert(line.product_id) {
                return Err(DomainError::InvalidArgument(format!(
                    "product {} appears more than once in the PO lines",
                    line.product_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        if sqlx::query_scalar!(
            "SELECT id FROM suppliers WHERE id = $1",
            req.supplier_id
        )
        .fetch_optional(&mut *tx)
        .await?
        .is_none()
        {
            return Err(DomainError::not_found("supplier", req.supplier_id));
        }

        if sqlx::query_scalar!("SELECT id FROM sites WHERE id = $1", req.site_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("site", req.site_id));
        }

        if let Some(shipment_id) = req.shipment_id {
            if sqlx::query_scalar!("SELECT id FROM shipments WHERE id = $1", shipment_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_none()
            {
                return Err(DomainError::not_found("shipment", shipment_id));
            }
        }

        for line in &req.lines {
            if sqlx::query_scalar!("SELECT id FROM products WHERE id = $1", line.product_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_none()
            {
                return Err(DomainError::not_found("product", line.product_id));
            }
        }

        let insert = sqlx::query!(
            r#"
            INSERT INTO purchase_orders (po_number, supplier_id, site_id, status, expected_eta, shipment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id
            "#,
            req.po_number,
            req.supplier_id,
            req.site_id,
            PoStatus::Draft as PoStatus,
            req.expected_eta,
            req.shipment_id,
        )
        .fetch_one(&mut *tx)
        .await;

        let po_id = match insert {
            Ok(row) => row.id,
            Err(e) if e.as_database_error().and_then(|d| d.code()).as_deref() == Some("23505") => {
                return Err(DomainError::Conflict(format!(
                    "po_number {} already exists",
                    req.po_number
                )));
            }
            Err(e) => return Err(e.into()),
        };

        for line in &req.lines {
            sqlx::query!(
                "INSERT INTO purchase_order_lines (po_id, product_id, qty_ordered, unit_cost) VALUES ($1, $2, $3, $4)",
                po_id,
                line.product_id,
                line.qty_ordered,
                line.unit_cost,
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(CreatedId { id: po_id })
    }

    pub async fn get_detail(&self, po_id: PurchaseOrderId) -> DomainResult<PurchaseOrderDetail> {
        let po = sqlx::query_as!(
            PurchaseOrder,
            r#"
            SELECT id, po_number, supplier_id, site_id,
                   status AS "status: PoStatus",
                   expected_eta, shipment_id, created_at, approved_at, approved_by
            FROM purchase_orders WHERE id = $1
            "#,
            po_id,
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DomainError::not_found("purchase_order", po_id))?;

        let lines = sqlx::query_as!(
            PurchaseOrderLine,
            "SELECT po_id, product_id, qty_ordered, unit_cost FROM purchase_order_lines WHERE po_id = $1 ORDER BY product_id",
            po_id,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PurchaseOrderDetail { po, lines })
    }

    /// Applies a lifecycle transition and, if it crosses the engaged-set
    /// boundary, rebuilds `qty_on_order` for every product on the PO.
    pub async fn transition(
        &self,
        po_id: PurchaseOrderId,
        action: PoTransitionAction,
        actor_id: Option<ActorId>,
    ) -> DomainResult<PoTransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query!(
            r#"SELECT status AS "status: PoStatus", site_id FROM purchase_orders WHERE id = $1 FOR UPDATE"#,
            po_id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("purchase_order", po_id))?;

        let target = action.target_status();
        if !current.status.can_transition_to(target) {
            return Err(DomainError::PreconditionFailed(format!(
                "cannot transition purchase order {po_id} from {:?} to {:?}",
                current.status, target
            )));
        }

        if target == PoStatus::Approved {
            sqlx::query!(
                "UPDATE purchase_orders SET status = $1, approved_at = NOW(), approved_by = $2 WHERE id = $3",
                target as PoStatus,
                actor_id,
                po_id,
            )
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query!(
                "UPDATE purchase_orders SET status = $1 WHERE id = $2",
                target as PoStatus,
                po_id,
            )
            .execute(&mut *tx)
            .await?;
        }

        if rebuilder::crosses_engaged_boundary(current.status, target) {
            let product_ids: Vec<ProductId> = sqlx::query_scalar!(
                "SELECT product_id FROM purchase_order_lines WHERE po_id = $1",
                po_id,
            )
            .fetch_all(&mut *tx)
            .await?;
            rebuilder::rebuild_qty_on_order(&mut tx, current.site_id, &product_ids).await?;
        }

        tx.commit().await?;
        Ok(PoTransitionOutcome {
            id: po_id,
            status: target,
        })
    }

    pub async fn list(&self, site_id: Option<SiteId>) -> DomainResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as!(
            PurchaseOrder,
            r#"
            SELECT id, po_number, supplier_id, site_id,
                   status AS "status: PoStatus",
                   expected_eta, shipment_id, created_at, approved_at, approved_by
            FROM purchase_orders
            WHERE $1::bigint IS NULL OR site_id = $1
            ORDER BY id DESC
            "#,
            site_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
