use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::idempotency::{self, ReceiptLineKeyInput};
use crate::models::{
    ActorId, GoodsReceiptId, LocationId, MovementType, ProductId, PurchaseOrderId,
    ReceiptStatus, StockLevel, StockMovementId,
};
use crate::services::rebuilder;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

/// Result of any of the five single-row mutations: the `StockMovement`
/// that was written on first success, or re-read on replay.
#[derive(Debug, Clone, Serialize)]
pub struct MovementOutcome {
    pub id: StockMovementId,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiveGoodsOutcome {
    pub id: GoodsReceiptId,
    pub po_id: PurchaseOrderId,
    pub to_location_id: LocationId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReserveRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UnreserveRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueRequest {
    pub product_id: ProductId,
    pub location_id: LocationId,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub happened_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_by: Option<ActorId>,
    #[validate(length(min = 1, max = 64))]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiveGoodsLine {
    pub product_id: ProductId,
    #[validate(range(min = 0))]
    pub qty_received: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub qty_damaged: i32,
    pub lot_code: Option<String>,
    pub expiration_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReceiveGoodsRequest {
    pub po_id: PurchaseOrderId,
    pub to_location_id: LocationId,
    pub received_at: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub lines: Vec<ReceiveGoodsLine>,
    pub received_by: Option<ActorId>,
    pub provided_idempotency_key: Option<String>,
}

/// The inventory mutation engine: the five domain operations that are the
/// only path by which `StockLevel`/`StockMovement` are ever written.
#[derive(Clone)]
pub struct InventoryService {
    pool: PgPool,
}

impl InventoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_movement_outcome(
        tx: &mut Transaction<'_, Postgres>,
        key: &str,
    ) -> DomainResult<Option<MovementOutcome>> {
        let row = sqlx::query!(
            "SELECT id, idempotency_key FROM stock_movements WHERE idempotency_key = $1",
            key,
        )
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|r| MovementOutcome {
            id: r.id,
            idempotency_key: r.idempotency_key,
        }))
    }

    async fn lock_stock_level(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        location_id: LocationId,
    ) -> DomainResult<StockLevel> {
        sqlx::query!(
            r#"
            INSERT INTO stock_levels (product_id, location_id, qty_on_hand, qty_reserved, qty_on_order, updated_at)
            VALUES ($1, $2, 0, 0, 0, NOW())
            ON CONFLICT (product_id, location_id) DO NOTHING
            "#,
            product_id,
            location_id,
        )
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query_as!(
            StockLevel,
            r#"
            SELECT product_id, location_id, qty_on_hand, qty_reserved, qty_on_order, updated_at
            FROM stock_levels
            WHERE product_id = $1 AND location_id = $2
            FOR UPDATE
            "#,
            product_id,
            location_id,
        )
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Locks every `(product_id, location_id)` pair in canonical ascending
    /// order and returns the locked rows keyed by location.
    async fn lock_many(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        mut location_ids: Vec<LocationId>,
    ) -> DomainResult<HashMap<LocationId, StockLevel>> {
        location_ids.sort_unstable();
        location_ids.dedup();
        let mut locked = HashMap::new();
        for location_id in location_ids {
            let row = Self::lock_stock_level(tx, product_id, location_id).await?;
            locked.insert(location_id, row);
        }
        Ok(locked)
    }

    async fn insert_movement(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        from_location_id: Option<LocationId>,
        to_location_id: Option<LocationId>,
        movement_type: MovementType,
        quantity: i32,
        reason: Option<String>,
        happened_at: DateTime<Utc>,
        created_by: Option<ActorId>,
        idempotency_key: &str,
    ) -> sqlx::Result<MovementOutcome> {
        let row = sqlx::query!(
            r#"
            INSERT INTO stock_movements
                (product_id, from_location_id, to_location_id, movement_type, quantity,
                 reason, happened_at, created_by, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            RETURNING id, idempotency_key
            "#,
            product_id,
            from_location_id,
            to_location_id,
            movement_type as MovementType,
            quantity,
            reason,
            happened_at,
            created_by,
            idempotency_key,
        )
        .fetch_one(&mut **tx)
        .await?;
        Ok(MovementOutcome {
            id: row.id,
            idempotency_key: row.idempotency_key,
        })
    }

    async fn replay_outcome(&self, key: &str) -> DomainResult<MovementOutcome> {
        let row = sqlx::query!(
            "SELECT id, idempotency_key FROM stock_movements WHERE idempotency_key = $1",
            key,
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| MovementOutcome {
            id: r.id,
            idempotency_key: r.idempotency_key,
        })
        .ok_or_else(|| {
            DomainError::Integrity(format!(
                "idempotency conflict on key {key} but no movement row found on replay"
            ))
        })
    }

    fn validate(req: &impl Validate) -> DomainResult<()> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))
    }

    pub async fn transfer(&self, req: TransferRequest) -> DomainResult<MovementOutcome> {
        Self::validate(&req)?;
        if req.from_location_id == req.to_location_id {
            return Err(DomainError::PreconditionFailed(
                "from_location_id and to_location_id must differ".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        let locked = Self::lock_many(
            &mut tx,
            req.product_id,
            vec![req.from_location_id, req.to_location_id],
        )
        .await?;

        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        let from = &locked[&req.from_location_id];

        if from.available() < req.quantity {
            return Err(DomainError::PreconditionFailed(format!(
                "insufficient available stock at location {}: have {}, need {}",
                req.from_location_id,
                from.available(),
                req.quantity
            )));
        }

        sqlx::query!(
            "UPDATE stock_levels SET qty_on_hand = qty_on_hand - $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
            req.quantity,
            req.product_id,
            req.from_location_id,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query!(
            "UPDATE stock_levels SET qty_on_hand = qty_on_hand + $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
            req.quantity,
            req.product_id,
            req.to_location_id,
        )
        .execute(&mut *tx)
        .await?;

        let insert = Self::insert_movement(
            &mut tx,
            req.product_id,
            Some(req.from_location_id),
            Some(req.to_location_id),
            MovementType::Transfer,
            req.quantity,
            req.reason,
            req.happened_at,
            req.created_by,
            &req.idempotency_key,
        )
        .await;

        match insert {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                self.replay_outcome(&req.idempotency_key).await
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn reserve(&self, req: ReserveRequest) -> DomainResult<MovementOutcome> {
        Self::validate(&req)?;

        let mut tx = self.pool.begin().await?;
        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        let level = Self::lock_stock_level(&mut tx, req.product_id, req.location_id).await?;

        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        if level.available() < req.quantity {
            return Err(DomainError::PreconditionFailed(format!(
                "insufficient available stock at location {}: have {}, need {}",
                req.location_id,
                level.available(),
                req.quantity
            )));
        }

        sqlx::query!(
            "UPDATE stock_levels SET qty_reserved = qty_reserved + $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
            req.quantity,
            req.product_id,
            req.location_id,
        )
        .execute(&mut *tx)
        .await?;

        let insert = Self::insert_movement(
            &mut tx,
            req.product_id,
            None,
            Some(req.location_id),
            MovementType::Reserve,
            req.quantity,
            req.reason,
            req.happened_at,
            req.created_by,
            &req.idempotency_key,
        )
        .await;

        match insert {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                self.replay_outcome(&req.idempotency_key).await
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unreserve(&self, req: UnreserveRequest) -> DomainResult<MovementOutcome> {
        Self::validate(&req)?;

        let mut tx = self.pool.begin().await?;
        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        let level = Self::lock_stock_level(&mut tx, req.product_id, req.location_id).await?;

        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        if level.qty_reserved < req.quantity {
            return Err(DomainError::PreconditionFailed(format!(
                "cannot unreserve {} at location {}: only {} reserved",
                req.quantity, req.location_id, level.qty_reserved
            )));
        }

        sqlx::query!(
            "UPDATE stock_levels SET qty_reserved = qty_reserved - $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
            req.quantity,
            req.product_id,
            req.location_id,
        )
        .execute(&mut *tx)
        .await?;

        let insert = Self::insert_movement(
            &mut tx,
            req.product_id,
            Some(req.location_id),
            None,
            MovementType::Unreserve,
            req.quantity,
            req.reason,
            req.happened_at,
            req.created_by,
            &req.idempotency_key,
        )
        .await;

        match insert {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                self.replay_outcome(&req.idempotency_key).await
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn issue(&self, req: IssueRequest) -> DomainResult<MovementOutcome> {
        Self::validate(&req)?;

        let mut tx = self.pool.begin().await?;
        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        let level = Self::lock_stock_level(&mut tx, req.product_id, req.location_id).await?;

        if let Some(existing) = Self::find_movement_outcome(&mut tx, &req.idempotency_key).await? {
            return Ok(existing);
        }

        if level.qty_reserved < req.quantity || level.qty_on_hand < req.quantity {
            return Err(DomainError::PreconditionFailed(format!(
                "cannot issue {} at location {}: reserved {}, on_hand {}",
                req.quantity, req.location_id, level.qty_reserved, level.qty_on_hand
            )));
        }

        sqlx::query!(
            "UPDATE stock_levels SET qty_reserved = qty_reserved - $1, qty_on_hand = qty_on_hand - $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
            req.quantity,
            req.product_id,
            req.location_id,
        )
        .execute(&mut *tx)
        .await?;

        let insert = Self::insert_movement(
            &mut tx,
            req.product_id,
            Some(req.location_id),
            None,
            MovementType::Issue,
            req.quantity,
            req.reason,
            req.happened_at,
            req.created_by,
            &req.idempotency_key,
        )
        .await;

        match insert {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                self.replay_outcome(&req.idempotency_key).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The compound operation: posts a goods receipt against a PO,
    /// applying one `StockMovement` per line, then rebuilds `qty_on_order`
    /// for every product touched. Two layers of idempotency key guard it —
    /// one on the receipt, one derived per line — so a retried request
    /// with partial prior progress never double-applies.
    pub async fn receive_goods(
        &self,
        req: ReceiveGoodsRequest,
    ) -> DomainResult<ReceiveGoodsOutcome> {
        Self::validate(&req)?;
        for line in &req.lines {
            Self::validate(line)?;
        }

        let mut tx = self.pool.begin().await?;

        let po = sqlx::query!(
            "SELECT id, site_id FROM purchase_orders WHERE id = $1",
            req.po_id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("purchase_order", req.po_id))?;

        let location_site_id = sqlx::query_scalar!(
            "SELECT site_id FROM locations WHERE id = $1",
            req.to_location_id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("location", req.to_location_id))?;

        if location_site_id != po.site_id {
            return Err(DomainError::PreconditionFailed(
                "to_location_id is not in the purchase order's site".into(),
            ));
        }

        let po_product_ids: Vec<ProductId> = sqlx::query_scalar!(
            "SELECT product_id FROM purchase_order_lines WHERE po_id = $1",
            req.po_id,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut seen_products = std::collections::HashSet::new();
        for line in &req.lines {
            if !po_product_ids.contains(&line.product_id) {
                return Err(DomainError::PreconditionFailed(format!(
                    "product {} is not on purchase order {}",
                    line.product_id, req.po_id
                )));
            }
            if !seen_products.insert(line.product_id) {
                return Err(DomainError::InvalidArgument(format!(
                    "product {} appears more than once in the receipt lines",
                    line.product_id
                )));
            }
        }

        let key_inputs: Vec<ReceiptLineKeyInput> = req
            .lines
            .iter()
            .map(|l| ReceiptLineKeyInput {
                product_id: l.product_id,
                qty_received: l.qty_received,
            })
            .collect();
        let receipt_key = idempotency::receipt_key(
            po.site_id,
            req.po_id,
            req.to_location_id,
            req.received_at,
            &key_inputs,
            req.provided_idempotency_key.as_deref(),
        );

        if let Some(existing) = sqlx::query!(
            "SELECT id, po_id FROM goods_receipts WHERE idempotency_key = $1",
            receipt_key,
        )
        .fetch_optional(&mut *tx)
        .await?
        {
            return Ok(ReceiveGoodsOutcome {
                id: existing.id,
                po_id: existing.po_id,
                to_location_id: req.to_location_id,
            });
        }

        let inserted_receipt = sqlx::query!(
            r#"
            INSERT INTO goods_receipts (po_id, site_id, status, received_at, received_by, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id
            "#,
            req.po_id,
            po.site_id,
            ReceiptStatus::Posted as ReceiptStatus,
            req.received_at,
            req.received_by,
            receipt_key,
        )
        .fetch_one(&mut *tx)
        .await;

        let receipt_id = match inserted_receipt {
            Ok(row) => row.id,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                let existing = sqlx::query!(
                    "SELECT id, po_id FROM goods_receipts WHERE idempotency_key = $1",
                    receipt_key,
                )
                .fetch_one(&self.pool)
                .await?;
                return Ok(ReceiveGoodsOutcome {
                    id: existing.id,
                    po_id: existing.po_id,
                    to_location_id: req.to_location_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut product_ids: Vec<ProductId> = req.lines.iter().map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        // Canonical (product_id, to_location_id) ascending lock order.
        for &product_id in &product_ids {
            Self::lock_stock_level(&mut tx, product_id, req.to_location_id).await?;
        }

        for line in &req.lines {
            sqlx::query!(
                r#"
                INSERT INTO goods_receipt_lines (receipt_id, product_id, qty_received, qty_damaged, lot_code, expiration_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
                receipt_id,
                line.product_id,
                line.qty_received,
                line.qty_damaged,
                line.lot_code,
                line.expiration_date,
            )
            .execute(&mut *tx)
            .await?;

            // A line received entirely as damaged (qty_received = 0) moves
            // nothing onto the shelf — I7 forbids a zero-quantity movement,
            // so it gets a receipt line for the audit trail but no stock
            // update and no movement row.
            if line.qty_received == 0 {
                continue;
            }

            sqlx::query!(
                "UPDATE stock_levels SET qty_on_hand = qty_on_hand + $1, updated_at = NOW() WHERE product_id = $2 AND location_id = $3",
                line.qty_received,
                line.product_id,
                req.to_location_id,
            )
            .execute(&mut *tx)
            .await?;

            let movement_key = idempotency::movement_key(
                &receipt_key,
                line.product_id,
                req.to_location_id,
                req.received_at,
                line.qty_received,
            );

            let movement_insert = sqlx::query!(
                r#"
                INSERT INTO stock_movements
                    (product_id, from_location_id, to_location_id, movement_type, quantity,
                     reason, happened_at, created_by, idempotency_key, created_at)
                VALUES ($1, NULL, $2, $3, $4, NULL, $5, $6, $7, NOW())
                "#,
                line.product_id,
                req.to_location_id,
                MovementType::Receipt as MovementType,
                line.qty_received,
                req.received_at,
                req.received_by,
                movement_key,
            )
            .execute(&mut *tx)
            .await;

            if let Err(e) = movement_insert {
                if !is_unique_violation(&e) {
                    return Err(e.into());
                }
                // Per-line movement already recorded under this receipt key —
                // stock_on_hand was already applied for it on the winning
                // attempt, so this retry's update above double-applied it.
                // Roll back to the last committed state and surface the
                // prior outcome instead of a partially-applied receipt.
                tx.rollback().await?;
                let existing = sqlx::query!(
                    "SELECT id, po_id FROM goods_receipts WHERE idempotency_key = $1",
                    receipt_key,
                )
                .fetch_one(&self.pool)
                .await?;
                return Ok(ReceiveGoodsOutcome {
                    id: existing.id,
                    po_id: existing.po_id,
                    to_location_id: req.to_location_id,
                });
            }
        }

        rebuilder::rebuild_qty_on_order(&mut tx, po.site_id, &product_ids).await?;

        tx.commit().await?;
        Ok(ReceiveGoodsOutcome {
            id: receipt_id,
            po_id: req.po_id,
            to_location_id: req.to_location_id,
        })
    }
}
