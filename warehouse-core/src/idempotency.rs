use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::models::{ProductId, SiteId};

fn hex_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One line of a goods receipt, as far as the receipt-level idempotency key
/// is concerned (quantity only — damage/lot/expiry don't participate).
pub struct ReceiptLineKeyInput {
    pub product_id: ProductId,
    pub qty_received: i32,
}

/// Derives the receipt-level idempotency key for `receive_goods`.
///
/// A caller-supplied `Idempotency-Key` header is still hashed, not stored
/// verbatim: prefixed with the site id and a `GR-IDEMP:` tag so the same
/// header value can never collide with the key this function derives from
/// a payload at a different site, or with a payload-derived key for an
/// unrelated request that happens to produce the same raw string.
/// Falling back to the payload derivation (no header) makes an exact retry
/// of the same request idempotent even without client cooperation.
pub fn receipt_key(
    site_id: SiteId,
    po_id: i64,
    to_location_id: i64,
    received_at: DateTime<Utc>,
    lines: &[ReceiptLineKeyInput],
    provided: Option<&str>,
) -> String {
    if let Some(provided) = provided.map(str::trim).filter(|s| !s.is_empty()) {
        let raw = format!("GR-IDEMP:{site_id}:{provided}");
        return hex_digest(&raw);
    }

    let mut sorted: Vec<(ProductId, i32)> = lines
        .iter()
        .map(|l| (l.product_id, l.qty_received))
        .collect();
    sorted.sort_by_key(|(product_id, _)| *product_id);

    let lines_repr = sorted
        .iter()
        .map(|(product_id, qty)| format!("({product_id}, {qty})"))
        .collect::<Vec<_>>()
        .join(", ");

    let raw = format!(
        "GR:{site_id}:{po_id}:{to_location_id}:{}:[{lines_repr}]",
        received_at.to_rfc3339()
    );
    hex_digest(&raw)
}

/// Derives the per-line movement idempotency key, scoped under the parent
/// receipt key so two different receipts can never collide on a line key
/// even if they happen to move the same product/location/quantity.
pub fn movement_key(
    receipt_key: &str,
    product_id: ProductId,
    to_location_id: i64,
    received_at: DateTime<Utc>,
    qty: i32,
) -> String {
    let raw = format!(
        "GRMOVE:{receipt_key}:{product_id}:{to_location_id}:{}:{qty}",
        received_at.to_rfc3339()
    );
    hex_digest(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn receipt_key_is_stable_for_identical_payloads() {
        let lines = vec![
            ReceiptLineKeyInput { product_id: 2, qty_received: 5 },
            ReceiptLineKeyInput { product_id: 1, qty_received: 10 },
        ];
        let a = receipt_key(1, 42, 7, at(2026, 1, 1), &lines, None);
        let b = receipt_key(1, 42, 7, at(2026, 1, 1), &lines, None);
        assert_eq!(a, b);
    }

    #[test]
    fn receipt_key_is_order_insensitive_over_lines() {
        let forward = vec![
            ReceiptLineKeyInput { product_id: 1, qty_received: 10 },
            ReceiptLineKeyInput { product_id: 2, qty_received: 5 },
        ];
        let reversed = vec![
            ReceiptLineKeyInput { product_id: 2, qty_received: 5 },
            ReceiptLineKeyInput { product_id: 1, qty_received: 10 },
        ];
        let a = receipt_key(1, 42, 7, at(2026, 1, 1), &forward, None);
        let b = receipt_key(1, 42, 7, at(2026, 1, 1), &reversed, None);
        assert_eq!(a, b);
    }

    #[test]
    fn provided_header_overrides_payload_derivation() {
        let lines = vec![ReceiptLineKeyInput { product_id: 1, qty_received: 10 }];
        let derived = receipt_key(1, 42, 7, at(2026, 1, 1), &lines, None);
        let from_header = receipt_key(1, 42, 7, at(2026, 1, 1), &lines, Some("client-token-1"));
        assert_ne!(derived, from_header);
    }

    #[test]
    fn movement_key_is_scoped_under_receipt_key() {
        let a = movement_key("receipt-a", 1, 7, at(2026, 1, 1), 10);
        let b = movement_key("receipt-b", 1, 7, at(2026, 1, 1), 10);
        assert_ne!(a, b);
    }
}
