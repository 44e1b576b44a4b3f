use chrono::Utc;
use sqlx::PgPool;

use warehouse_core::models::ShipmentMode;
use warehouse_core::models::ShipmentStatus;
use warehouse_core::services::shipments::{
    AppendShipmentEventRequest, CreateShipmentRequest, ShipmentService,
};

#[sqlx::test(migrations = "../migrations")]
async fn events_drive_the_status_state_machine(pool: PgPool) {
    let svc = ShipmentService::new(pool.clone());

    let shipment_id = svc
        .create(CreateShipmentRequest {
            mode: ShipmentMode::Sea,
            carrier: Some("Matson".into()),
            tracking_ref: Some("MATS-9001".into()),
            origin: Some("Auckland".into()),
            destination: Some("Papeete".into()),
            eta_initial: None,
        })
        .await
        .unwrap()
        .id;

    let shipments = svc.list().await.unwrap();
    let created = shipments.iter().find(|s| s.id == shipment_id).unwrap();
    assert_eq!(created.status, ShipmentStatus::Booked);

    let after_departed = svc
        .append_event(
            shipment_id,
            AppendShipmentEventRequest {
                event_code: "SAILED".into(),
                location: Some("Auckland".into()),
                event_time: Utc::now(),
                source: "carrier-edi".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(after_departed.status, ShipmentStatus::Departed);

    let after_transit = svc
        .append_event(
            shipment_id,
            AppendShipmentEventRequest {
                event_code: "IN_TRANSIT".into(),
                location: None,
                event_time: Utc::now(),
                source: "carrier-edi".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(after_transit.status, ShipmentStatus::InTransit);

    // An event code with no mapping still gets appended, but the status holds.
    let after_unknown = svc
        .append_event(
            shipment_id,
            AppendShipmentEventRequest {
                event_code: "VESSEL_DELAY".into(),
                location: None,
                event_time: Utc::now(),
                source: "carrier-edi".into(),
                description: Some("weather delay".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(after_unknown.status, ShipmentStatus::InTransit);

    let events = svc.list_events(shipment_id).await.unwrap();
    assert_eq!(events.len(), 3);

    let after_delivered = svc
        .append_event(
            shipment_id,
            AppendShipmentEventRequest {
                event_code: "DELIVERED".into(),
                location: Some("Papeete".into()),
                event_time: Utc::now(),
                source: "carrier-edi".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(after_delivered.status, ShipmentStatus::Delivered);
}

#[sqlx::test(migrations = "../migrations")]
async fn appending_an_event_to_an_unknown_shipment_is_not_found(pool: PgPool) {
    let svc = ShipmentService::new(pool.clone());

    let err = svc
        .append_event(
            999_999,
            AppendShipmentEventRequest {
                event_code: "DEPARTED".into(),
                location: None,
                event_time: Utc::now(),
                source: "carrier-edi".into(),
                description: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        warehouse_core::error::DomainError::NotFound { .. }
    ));
}
