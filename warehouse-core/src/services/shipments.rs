use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::error::{DomainError, DomainResult};
use crate::models::{Shipment, ShipmentEvent, ShipmentId, ShipmentMode};
use crate::services::CreatedId;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShipmentRequest {
    pub mode: ShipmentMode,
    pub carrier: Option<String>,
    pub tracking_ref: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub eta_initial: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppendShipmentEventRequest {
    #[validate(length(min = 1, max = 64))]
    pub event_code: String,
    pub location: Option<String>,
    pub event_time: DateTime<Utc>,
    #[validate(length(min = 1, max = 64))]
    pub source: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppendShipmentEventOutcome {
    pub ok: bool,
    pub status: crate::models::ShipmentStatus,
}

/// Shipment creation and the append-only event log that drives the
/// status state machine.
#[derive(Clone)]
pub struct ShipmentService {
    pool: PgPool,
}

impl ShipmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, req: CreateShipmentRequest) -> DomainResult<CreatedId> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;

        let id = sqlx::query_scalar!(
            r#"
            INSERT INTO shipments (mode, carrier, tracking_ref, origin, destination, status, eta_initial, eta_current, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, NOW())
            RETURNING id
            "#,
            req.mode as ShipmentMode,
            req.carrier,
            req.tracking_ref,
            req.origin,
            req.destination,
            crate::models::ShipmentStatus::Booked as crate::models::ShipmentStatus,
            req.eta_initial,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(CreatedId { id })
    }

    pub async fn list(&self) -> DomainResult<Vec<Shipment>> {
        let rows = sqlx::query_as!(
            Shipment,
            r#"
            SELECT id, mode AS "mode: ShipmentMode", carrier, tracking_ref, origin, destination,
                   status AS "status: crate::models::ShipmentStatus",
                   eta_initial, eta_current, last_event_at, created_at
            FROM shipments
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_events(&self, shipment_id: ShipmentId) -> DomainResult<Vec<ShipmentEvent>> {
        if sqlx::query_scalar!("SELECT id FROM shipments WHERE id = $1", shipment_id)
            .fetch_optional(&self.pool)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("shipment", shipment_id));
        }

        let rows = sqlx::query_as!(
            ShipmentEvent,
            r#"
            SELECT id, shipment_id, event_code, location, event_time, source, description, created_at
            FROM shipment_events WHERE shipment_id = $1 ORDER BY event_time ASC, id ASC
            "#,
            shipment_id,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Appends an event and, if the event code maps to a status further
    /// along than the shipment's current one, advances the shipment.
    /// A mapped status that is equal to or earlier than the current one
    /// (a replayed or out-of-order event) leaves status untouched.
    /// `last_event_at` always advances to the event's time regardless of
    /// whether the status changed.
    pub async fn append_event(
        &self,
        shipment_id: ShipmentId,
        req: AppendShipmentEventRequest,
    ) -> DomainResult<AppendShipmentEventOutcome> {
        req.validate()
            .map_err(|e| DomainError::InvalidArgument(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let current_status = sqlx::query_scalar!(
            r#"SELECT status AS "status: crate::models::ShipmentStatus" FROM shipments WHERE id = $1 FOR UPDATE"#,
            shipment_id,
        )
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("shipment", shipment_id))?;

        sqlx::query!(
            r#"
            INSERT INTO shipment_events (shipment_id, event_code, location, event_time, source, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
            shipment_id,
            req.event_code,
            req.location,
            req.event_time,
            req.source,
            req.description,
        )
        .execute(&mut *tx)
        .await?;

        let next_status = crate::models::ShipmentStatus::from_event_code(&req.event_code)
            .filter(|mapped| mapped.advances_from(current_status))
            .unwrap_or(current_status);

        sqlx::query!(
            "UPDATE shipments SET status = $1, last_event_at = $2 WHERE id = $3",
            next_status as crate::models::ShipmentStatus,
            req.event_time,
            shipment_id,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AppendShipmentEventOutcome {
            ok: true,
            status: next_status,
        })
    }
}
