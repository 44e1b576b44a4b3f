use serde::{Deserialize, Serialize};
use sqlx::{PgPool, QueryBuilder};
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::models::{
    ActorRole, Location, LocationId, LocationType, Product, ProductId, Site, SiteId, StockLevel,
    Supplier, SupplierId,
};

fn conflict_if_unique_violation(err: sqlx::Error, what: &str) -> DomainError {
    if err.as_database_error().and_then(|d| d.code()).as_deref() == Some("23505") {
        DomainError::Conflict(format!("{what} already exists"))
    } else {
        err.into()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSiteRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLocationRequest {
    pub site_id: SiteId,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub r#type: LocationType,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(min = 1, max = 16))]
    pub uom: String,
    pub barcode: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub country: Option<String>,
    #[validate(range(min = 0))]
    pub lead_time_days: i32,
    #[validate(range(min = 0, max = 100))]
    pub reliability_score: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActorRequest {
    pub site_id: SiteId,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedId {
    pub id: i64,
}

#[derive(Debug, Default)]
pub struct StockFilter {
    pub site_id: Option<SiteId>,
    pub location_id: Option<LocationId>,
    pub product_id: Option<ProductId>,
}

/// Thin, unlocked CRUD over master data, plus the read-through stock
/// listing. Never touches `StockLevel`/`StockMovement` writes — that's the
/// mutation engine's exclusive territory.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_site(&self, req: CreateSiteRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;
        let id = sqlx::query_scalar!(
            "INSERT INTO sites (name, timezone, active) VALUES ($1, $2, $3) RETURNING id",
            req.name,
            req.timezone,
            req.active,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_if_unique_violation(e, "site"))?;
        Ok(CreatedId { id })
    }

    pub async fn list_sites(&self) -> DomainResult<Vec<Site>> {
        let rows = sqlx::query_as!(Site, "SELECT id, name, timezone, active FROM sites ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create_location(&self, req: CreateLocationRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;

        if sqlx::query_scalar!("SELECT id FROM sites WHERE id = $1", req.site_id)
            .fetch_optional(&self.pool)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("site", req.site_id));
        }

        let id = sqlx::query_scalar!(
            r#"INSERT INTO locations (site_id, name, type) VALUES ($1, $2, $3) RETURNING id"#,
            req.site_id,
            req.name,
            req.r#type as LocationType,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_if_unique_violation(e, "location"))?;
        Ok(CreatedId { id })
    }

    pub async fn list_locations(&self, site_id: Option<SiteId>) -> DomainResult<Vec<Location>> {
        let rows = sqlx::query_as!(
            Location,
            r#"
            SELECT id, site_id, name, type AS "type: LocationType"
            FROM locations
            WHERE $1::bigint IS NULL OR site_id = $1
            ORDER BY id
            "#,
            site_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_product(&self, req: CreateProductRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;
        let id = sqlx::query_scalar!(
            "INSERT INTO products (sku, name, uom, barcode, active) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            req.sku,
            req.name,
            req.uom,
            req.barcode,
            req.active,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_if_unique_violation(e, "product"))?;
        Ok(CreatedId { id })
    }

    pub async fn list_products(&self) -> DomainResult<Vec<Product>> {
        let rows = sqlx::query_as!(
            Product,
            "SELECT id, sku, name, uom, barcode, active FROM products ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_supplier(&self, req: CreateSupplierRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;
        let id = sqlx::query_scalar!(
            "INSERT INTO suppliers (name, country, lead_time_days, reliability_score) VALUES ($1, $2, $3, $4) RETURNING id",
            req.name,
            req.country,
            req.lead_time_days,
            req.reliability_score,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_if_unique_violation(e, "supplier"))?;
        Ok(CreatedId { id })
    }

    pub async fn list_suppliers(&self) -> DomainResult<Vec<Supplier>> {
        let rows = sqlx::query_as!(
            Supplier,
            "SELECT id, name, country, lead_time_days, reliability_score FROM suppliers ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_actor(&self, req: CreateActorRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;

        if sqlx::query_scalar!("SELECT id FROM sites WHERE id = $1", req.site_id)
            .fetch_optional(&self.pool)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("site", req.site_id));
        }

        let id = sqlx::query_scalar!(
            "INSERT INTO actors (site_id, display_name, role) VALUES ($1, $2, $3) RETURNING id",
            req.site_id,
            req.display_name,
            req.role as ActorRole,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(CreatedId { id })
    }

    /// AND-composed optional filters over the read-only projection of
    /// current stock levels. Built with `QueryBuilder` since the filter
    /// set is dynamic.
    pub async fn list_stock(&self, filter: StockFilter) -> DomainResult<Vec<StockLevel>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT sl.product_id, sl.location_id, sl.qty_on_hand, sl.qty_reserved, sl.qty_on_order, sl.updated_at
            FROM stock_levels sl
            JOIN locations loc ON loc.id = sl.location_id
            WHERE 1 = 1
            "#,
        );

        if let Some(site_id) = filter.site_id {
            qb.push(" AND loc.site_id = ").push_bind(site_id);
        }
        if let Some(location_id) = filter.location_id {
            qb.push(" AND sl.location_id = ").push_bind(location_id);
        }
        if let Some(product_id) = filter.product_id {
            qb.push(" AND sl.product_id = ").push_bind(product_id);
        }
        qb.push(" ORDER BY sl.product_id, sl.location_id");

        let rows = qb
            .build_query_as::<StockLevel>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
