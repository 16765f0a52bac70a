//! Inventory ledger: every stock movement is an entry; on-hand is their sum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{ClientId, DomainError, DomainResult, SkuId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    /// Inbound units received against an ASN.
    Receipt,
    /// Outbound units shipped for an order.
    Shipment,
    /// Manual correction (cycle count, damage, ...).
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub client_id: ClientId,
    pub sku_id: SkuId,
    pub delta: i64,
    pub reason: LedgerReason,
    /// Free-form reference (ASN id, order number, note).
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Current on-hand quantity for a set of entries.
pub fn on_hand<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> i64 {
    entries.into_iter().map(|e| e.delta).sum()
}

/// Validate an entry against the current on-hand and return the new balance.
pub fn post_entry(current: i64, entry: &LedgerEntry) -> DomainResult<i64> {
    if entry.delta == 0 {
        return Err(DomainError::validation("delta cannot be zero"));
    }
    match entry.reason {
        LedgerReason::Receipt if entry.delta < 0 => {
            return Err(DomainError::validation("receipts must be positive"));
        }
        LedgerReason::Shipment if entry.delta > 0 => {
            return Err(DomainError::validation("shipments must be negative"));
        }
        _ => {}
    }

    let next = current
        .checked_add(entry.delta)
        .ok_or_else(|| DomainError::invariant("stock overflow"))?;
    if next < 0 {
        return Err(DomainError::invariant("stock cannot go negative"));
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(delta: i64, reason: LedgerReason) -> LedgerEntry {
        LedgerEntry {
            client_id: ClientId::new(),
            sku_id: SkuId::new(),
            delta,
            reason,
            reference: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn on_hand_sums_deltas() {
        let entries = vec![
            entry(10, LedgerReason::Receipt),
            entry(-3, LedgerReason::Shipment),
            entry(-1, LedgerReason::Adjustment),
        ];
        assert_eq!(on_hand(&entries), 6);
    }

    #[test]
    fn cannot_go_negative() {
        let err = post_entry(2, &entry(-3, LedgerReason::Shipment)).unwrap_err();
        assert_eq!(err, DomainError::invariant("stock cannot go negative"));
    }

    #[test]
    fn reason_constrains_sign() {
        assert!(post_entry(0, &entry(-1, LedgerReason::Receipt)).is_err());
        assert!(post_entry(5, &entry(1, LedgerReason::Shipment)).is_err());
        assert_eq!(post_entry(5, &entry(-5, LedgerReason::Adjustment)), Ok(0));
        assert!(post_entry(5, &entry(0, LedgerReason::Adjustment)).is_err());
    }
}
