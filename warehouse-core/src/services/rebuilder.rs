use sqlx::{Postgres, Transaction};

use crate::error::{DomainError, DomainResult};
use crate::models::{LocationId, PoStatus, ProductId, SiteId};

/// Finds the inbound-dock location for a site: the location named
/// `TAH-DOCK` of type `dock` if it exists, else the lowest-id dock at
/// the site. Fails with `Configuration` if the site has no dock at all —
/// the rebuilder has nowhere to materialize `qty_on_order`.
pub async fn inbound_dock_location(
    tx: &mut Transaction<'_, Postgres>,
    site_id: SiteId,
) -> DomainResult<LocationId> {
    let named = sqlx::query_scalar!(
        r#"SELECT id FROM locations
           WHERE site_id = $1 AND type = 'dock' AND name = 'TAH-DOCK'"#,
        site_id,
    )
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(id) = named {
        return Ok(id);
    }

    let lowest = sqlx::query_scalar!(
        r#"SELECT id FROM locations
           WHERE site_id = $1 AND type = 'dock'
           ORDER BY id ASC
           LIMIT 1"#,
        site_id,
    )
    .fetch_optional(&mut **tx)
    .await?;

    lowest.ok_or_else(|| {
        DomainError::Configuration(format!("site {site_id} has no dock location"))
    })
}

/// Recomputes `qty_on_order` for the given products at `site_id`,
/// restricted to the product set passed in, and writes the result onto the
/// dock `StockLevel` row. Must run inside the caller's transaction — it is
/// not itself atomic.
pub async fn rebuild_qty_on_order(
    tx: &mut Transaction<'_, Postgres>,
    site_id: SiteId,
    product_ids: &[ProductId],
) -> DomainResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let mut product_ids = product_ids.to_vec();
    product_ids.sort_unstable();
    product_ids.dedup();
    let product_ids = product_ids.as_slice();

    let dock = inbound_dock_location(tx, site_id).await?;

    // engaged = {approved, shipped, partial}; closed/cancelled POs don't contribute.
    let ordered_rows = sqlx::query!(
        r#"
        SELECT pol.product_id, SUM(pol.qty_ordered)::bigint AS "total!"
        FROM purchase_order_lines pol
        JOIN purchase_orders po ON po.id = pol.po_id
        WHERE po.site_id = $1
          AND po.status IN ('APPROVED', 'SHIPPED', 'PARTIAL')
          AND pol.product_id = ANY($2)
        GROUP BY pol.product_id
        "#,
        site_id,
        product_ids,
    )
    .fetch_all(&mut **tx)
    .await?;

    // Receipt status only — the PO's own status is irrelevant once a
    // receipt has posted.
    let received_rows = sqlx::query!(
        r#"
        SELECT grl.product_id, SUM(grl.qty_received - grl.qty_damaged)::bigint AS "total!"
        FROM goods_receipt_lines grl
        JOIN goods_receipts gr ON gr.id = grl.receipt_id
        WHERE gr.site_id = $1
          AND gr.status = 'POSTED'
          AND grl.product_id = ANY($2)
        GROUP BY grl.product_id
        "#,
        site_id,
        product_ids,
    )
    .fetch_all(&mut **tx)
    .await?;

    let mut received: std::collections::HashMap<ProductId, i64> = received_rows
        .into_iter()
        .map(|r| (r.product_id, r.total))
        .collect();

    let mut ordered: std::collections::HashMap<ProductId, i64> = ordered_rows
        .into_iter()
        .map(|r| (r.product_id, r.total))
        .collect();

    for &product_id in product_ids {
        let total_ordered = ordered.remove(&product_id).unwrap_or(0);
        let total_received = received.remove(&product_id).unwrap_or(0);
        let outstanding = (total_ordered - total_received).max(0) as i32;

        sqlx::query!(
            r#"
            INSERT INTO stock_levels (product_id, location_id, qty_on_hand, qty_reserved, qty_on_order, updated_at)
            VALUES ($1, $2, 0, 0, $3, NOW())
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET qty_on_order = EXCLUDED.qty_on_order, updated_at = NOW()
            "#,
            product_id,
            dock,
            outstanding,
        )
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Whether crossing `from -> to` enters or leaves the engaged set and
/// therefore requires a rebuild.
pub fn crosses_engaged_boundary(from: PoStatus, to: PoStatus) -> bool {
    from.is_engaged() != to.is_engaged()
}
