use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{BillItemId, ClientId, DomainError, DomainResult, Money, QuoteId};

use crate::bill::{Bill, NewBillItem};

/// A priced service offered in a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub service_code: String,
    pub description: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub rate: Money,
}

fn default_unit() -> String {
    "each".to_string()
}

/// Pricing quote; a template of services and rates for one client (or a
/// general rate card when `client_id` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub client_id: Option<ClientId>,
    pub name: String,
    pub lines: Vec<QuoteLine>,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        name: &str,
        client_id: Option<ClientId>,
        lines: Vec<QuoteLine>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("quote name cannot be empty"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("quote needs at least one line"));
        }

        let mut seen = HashSet::new();
        let mut clean = Vec::with_capacity(lines.len());
        for line in lines {
            let code = line.service_code.trim().to_string();
            if code.is_empty() {
                return Err(DomainError::validation("service_code cannot be empty"));
            }
            if line.rate.is_negative() {
                return Err(DomainError::validation(format!("rate for {code} cannot be negative")));
            }
            if !seen.insert(code.clone()) {
                return Err(DomainError::validation(format!("duplicate service_code: {code}")));
            }
            clean.push(QuoteLine {
                service_code: code,
                ..line
            });
        }

        Ok(Self {
            id: QuoteId::new(),
            client_id,
            name: name.to_string(),
            lines: clean,
            created_at: now,
        })
    }

    pub fn rate_map(&self) -> BTreeMap<String, Money> {
        self.lines
            .iter()
            .map(|l| (l.service_code.clone(), l.rate))
            .collect()
    }

    /// Quotes bound to a client can only be applied to that client's bills.
    pub fn applies_to(&self, client_id: ClientId) -> bool {
        self.client_id.is_none_or(|c| c == client_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulateOutcome {
    pub added: Vec<BillItemId>,
    /// Service codes already present on the bill.
    pub skipped: Vec<String>,
}

/// Copy every quote line onto the bill as a zero-quantity item.
pub fn populate_from_quote(bill: &mut Bill, quote: &Quote, now: DateTime<Utc>) -> DomainResult<PopulateOutcome> {
    bill.ensure_draft()?;
    if !quote.applies_to(bill.client_id) {
        return Err(DomainError::validation("quote belongs to a different client"));
    }

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for line in &quote.lines {
        if bill.has_service(&line.service_code) {
            skipped.push(line.service_code.clone());
            continue;
        }
        let id = bill.add_item(
            NewBillItem {
                service_code: line.service_code.clone(),
                description: line.description.clone(),
                unit: line.unit.clone(),
                quantity: 0,
                rate: line.rate,
                service_date: None,
            },
            now,
        )?;
        added.push(id);
    }

    Ok(PopulateOutcome { added, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BillStatus;
    use stowline_core::BillingPeriod;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn line(code: &str, rate: i64) -> QuoteLine {
        QuoteLine {
            service_code: code.to_string(),
            description: code.to_uppercase(),
            unit: "each".to_string(),
            rate: Money::from_cents(rate),
        }
    }

    fn bill(client_id: ClientId) -> Bill {
        Bill::new(client_id, BillingPeriod::new(2024, 5).unwrap(), test_time())
    }

    #[test]
    fn rejects_duplicate_service_codes() {
        let err = Quote::new("Standard", None, vec![line("pick", 35), line(" pick ", 40)], test_time()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn lines_json_blob_shape() {
        let json = serde_json::json!([
            { "service_code": "pick", "description": "Pick fee", "rate": 35 },
            { "service_code": "storage", "description": "Pallet storage", "unit": "pallet", "rate": 2500 }
        ]);
        let lines: Vec<QuoteLine> = serde_json::from_value(json).unwrap();
        assert_eq!(lines[0].unit, "each");
        assert_eq!(lines[1].rate, Money::from_cents(2500));
    }

    #[test]
    fn populate_adds_zero_quantity_items() {
        let client = ClientId::new();
        let quote = Quote::new("Standard", Some(client), vec![line("pick", 35), line("pack", 20)], test_time()).unwrap();
        let mut b = bill(client);

        let out = populate_from_quote(&mut b, &quote, test_time()).unwrap();
        assert_eq!(out.added.len(), 2);
        assert!(out.skipped.is_empty());
        assert!(b.items.iter().all(|i| i.quantity == 0));
        assert_eq!(b.items[0].rate, Money::from_cents(35));
        assert_eq!(b.total(), Some(Money::ZERO));
    }

    #[test]
    fn populate_skips_existing_services() {
        let client = ClientId::new();
        let quote = Quote::new("Standard", None, vec![line("pick", 35), line("pack", 20)], test_time()).unwrap();
        let mut b = bill(client);
        populate_from_quote(&mut b, &quote, test_time()).unwrap();

        let again = populate_from_quote(&mut b, &quote, test_time()).unwrap();
        assert!(again.added.is_empty());
        assert_eq!(again.skipped, vec!["pick".to_string(), "pack".to_string()]);
        assert_eq!(b.items.len(), 2);
    }

    #[test]
    fn populate_respects_quote_owner_and_status() {
        let quote = Quote::new("Custom", Some(ClientId::new()), vec![line("pick", 35)], test_time()).unwrap();
        let mut b = bill(ClientId::new());
        assert!(populate_from_quote(&mut b, &quote, test_time()).is_err());

        let general = Quote::new("General", None, vec![line("pick", 35)], test_time()).unwrap();
        b.add_item(
            NewBillItem {
                service_code: "storage".to_string(),
                description: String::new(),
                unit: "pallet".to_string(),
                quantity: 1,
                rate: Money::from_cents(100),
                service_date: None,
            },
            test_time(),
        )
        .unwrap();
        b.transition(BillStatus::Finalized, test_time()).unwrap();
        assert!(populate_from_quote(&mut b, &general, test_time()).is_err());
    }
}
