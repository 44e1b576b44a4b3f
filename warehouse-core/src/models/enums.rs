use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "actor_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Manager,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "location_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Warehouse,
    Zone,
    Dock,
    Customs,
    Quarantine,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Receipt,
    Issue,
    Transfer,
    Adjustment,
    Scrap,
    Reserve,
    Unreserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "po_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum PoStatus {
    Draft,
    Approved,
    Shipped,
    Partial,
    Closed,
    Cancelled,
}

impl PoStatus {
    /// The set of statuses that contribute to `qty_on_order`.
    pub fn is_engaged(self) -> bool {
        matches!(self, PoStatus::Approved | PoStatus::Shipped | PoStatus::Partial)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PoStatus::Closed | PoStatus::Cancelled)
    }

    /// Legal next states for this status.
    pub fn allowed_transitions(self) -> &'static [PoStatus] {
        match self {
            PoStatus::Draft => &[PoStatus::Approved, PoStatus::Cancelled],
            PoStatus::Approved => &[
                PoStatus::Shipped,
                PoStatus::Partial,
                PoStatus::Closed,
                PoStatus::Cancelled,
            ],
            PoStatus::Shipped => &[PoStatus::Partial, PoStatus::Closed, PoStatus::Cancelled],
            PoStatus::Partial => &[PoStatus::Closed, PoStatus::Cancelled],
            PoStatus::Closed | PoStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: PoStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ShipmentMode {
    Sea,
    Air,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "shipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Booked,
    Departed,
    InTransit,
    Arrived,
    Customs,
    OutForDelivery,
    Delivered,
}

impl ShipmentStatus {
    /// Map an inbound event code to the status it advances the shipment to.
    /// Unknown codes return `None` — the event is still appended, the
    /// status is simply left alone.
    pub fn from_event_code(code: &str) -> Option<ShipmentStatus> {
        match code.to_ascii_uppercase().as_str() {
            "DEPARTED" | "SAILED" | "FLIGHT_DEPARTED" => Some(ShipmentStatus::Departed),
            "IN_TRANSIT" => Some(ShipmentStatus::InTransit),
            "ARRIVED" | "LANDED" => Some(ShipmentStatus::Arrived),
            "CUSTOMS" => Some(ShipmentStatus::Customs),
            "OUT_FOR_DELIVERY" => Some(ShipmentStatus::OutForDelivery),
            "DELIVERED" => Some(ShipmentStatus::Delivered),
            _ => None,
        }
    }

    /// Position in the `booked -> ... -> delivered` sequence; higher means
    /// further along. Used to keep an out-of-order or repeated event from
    /// moving the shipment backward.
    fn rank(self) -> u8 {
        self as u8
    }

    pub fn advances_from(self, current: ShipmentStatus) -> bool {
        self.rank() > current.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "receipt_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Draft,
    Posted,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::PoStatus::*;
    use rstest::rstest;

    #[rstest]
    #[case(Draft, Approved, true)]
    #[case(Draft, Cancelled, true)]
    #[case(Draft, Shipped, false)]
    #[case(Draft, Closed, false)]
    #[case(Approved, Shipped, true)]
    #[case(Approved, Partial, true)]
    #[case(Approved, Closed, true)]
    #[case(Shipped, Approved, false)]
    #[case(Partial, Closed, true)]
    #[case(Partial, Approved, false)]
    #[case(Closed, Cancelled, false)]
    #[case(Cancelled, Approved, false)]
    fn transition_table_matches_the_lifecycle_graph(
        #[case] from: super::PoStatus,
        #[case] to: super::PoStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    #[case(Draft, false)]
    #[case(Approved, true)]
    #[case(Shipped, true)]
    #[case(Partial, true)]
    #[case(Closed, false)]
    #[case(Cancelled, false)]
    fn engaged_set_matches_approved_shipped_partial(
        #[case] status: super::PoStatus,
        #[case] engaged: bool,
    ) {
        assert_eq!(status.is_engaged(), engaged);
    }
}
