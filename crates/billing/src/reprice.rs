//! Bulk rate updates on a draft bill.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{BillItemId, DomainError, DomainResult, Money};

use crate::bill::Bill;

/// Which line items a repricing touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RepriceScope {
    All,
    /// Items whose service date is strictly after `date`.
    AfterDate { date: NaiveDate },
    Selected { item_ids: Vec<BillItemId> },
}

impl RepriceScope {
    fn includes(&self, id: BillItemId, service_date: NaiveDate, selected: &HashSet<BillItemId>) -> bool {
        match self {
            RepriceScope::All => true,
            RepriceScope::AfterDate { date } => service_date > *date,
            RepriceScope::Selected { .. } => selected.contains(&id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepriceOutcome {
    pub updated: Vec<BillItemId>,
    pub unchanged: usize,
}

/// Apply `rates` (service code → rate) to the items selected by `scope`.
///
/// Items outside the scope, or whose service code has no rate, are left as
/// they are. Validation happens before anything is modified.
pub fn reprice(
    bill: &mut Bill,
    scope: &RepriceScope,
    rates: &BTreeMap<String, Money>,
    now: DateTime<Utc>,
) -> DomainResult<RepriceOutcome> {
    bill.ensure_draft()?;

    if rates.is_empty() {
        return Err(DomainError::validation("no rates supplied"));
    }
    if let Some((code, _)) = rates.iter().find(|(_, r)| r.is_negative()) {
        return Err(DomainError::validation(format!("rate for {code} cannot be negative")));
    }

    let selected: HashSet<BillItemId> = match scope {
        RepriceScope::Selected { item_ids } => {
            if item_ids.is_empty() {
                return Err(DomainError::validation("no items selected"));
            }
            if let Some(missing) = item_ids.iter().find(|id| bill.item(**id).is_none()) {
                return Err(DomainError::validation(format!("item {missing} is not on this bill")));
            }
            item_ids.iter().copied().collect()
        }
        _ => HashSet::new(),
    };

    let mut planned = Vec::new();
    for item in &bill.items {
        if !scope.includes(item.id, item.service_date, &selected) {
            continue;
        }
        let Some(rate) = rates.get(&item.service_code) else {
            continue;
        };
        if *rate == item.rate {
            continue;
        }
        if rate.checked_mul(item.quantity).is_none() {
            return Err(DomainError::validation(format!(
                "new rate for {} overflows the line amount",
                item.service_code
            )));
        }
        planned.push((item.id, *rate));
    }

    for (id, rate) in &planned {
        if let Some(item) = bill.items.iter_mut().find(|i| i.id == *id) {
            item.rate = *rate;
        }
    }
    if !planned.is_empty() {
        bill.updated_at = now;
    }

    Ok(RepriceOutcome {
        unchanged: bill.items.len() - planned.len(),
        updated: planned.into_iter().map(|(id, _)| id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::NewBillItem;
    use proptest::prelude::*;
    use stowline_core::{BillingPeriod, ClientId};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn bill_with(items: &[(&str, u32, i64)]) -> Bill {
        let mut bill = Bill::new(ClientId::new(), BillingPeriod::new(2024, 6).unwrap(), test_time());
        for (code, day, rate) in items {
            bill.add_item(
                NewBillItem {
                    service_code: code.to_string(),
                    description: String::new(),
                    unit: "each".to_string(),
                    quantity: 2,
                    rate: Money::from_cents(*rate),
                    service_date: Some(june(*day)),
                },
                test_time(),
            )
            .unwrap();
        }
        bill
    }

    fn rates(pairs: &[(&str, i64)]) -> BTreeMap<String, Money> {
        pairs
            .iter()
            .map(|(c, r)| (c.to_string(), Money::from_cents(*r)))
            .collect()
    }

    #[test]
    fn all_scope_updates_matching_services() {
        let mut bill = bill_with(&[("pick", 1, 30), ("pack", 2, 20), ("pick", 20, 30)]);
        let out = reprice(&mut bill, &RepriceScope::All, &rates(&[("pick", 40)]), test_time()).unwrap();
        assert_eq!(out.updated.len(), 2);
        assert_eq!(out.unchanged, 1);
        assert_eq!(bill.items[1].rate, Money::from_cents(20));
        assert_eq!(bill.items[2].rate, Money::from_cents(40));
    }

    #[test]
    fn after_date_is_strict() {
        let mut bill = bill_with(&[("pick", 10, 30), ("pick", 11, 30)]);
        let scope = RepriceScope::AfterDate { date: june(10) };
        let out = reprice(&mut bill, &scope, &rates(&[("pick", 45)]), test_time()).unwrap();
        assert_eq!(out.updated, vec![bill.items[1].id]);
        assert_eq!(bill.items[0].rate, Money::from_cents(30));
    }

    #[test]
    fn selected_with_unknown_id_changes_nothing() {
        let mut bill = bill_with(&[("pick", 1, 30)]);
        let before = bill.clone();
        let scope = RepriceScope::Selected {
            item_ids: vec![bill.items[0].id, BillItemId::new()],
        };
        assert!(reprice(&mut bill, &scope, &rates(&[("pick", 45)]), test_time()).is_err());
        assert_eq!(bill, before);
    }

    #[test]
    fn scope_json_shape() {
        let scope: RepriceScope =
            serde_json::from_value(serde_json::json!({ "mode": "after_date", "date": "2024-06-15" })).unwrap();
        assert_eq!(scope, RepriceScope::AfterDate { date: june(15) });
        let scope: RepriceScope = serde_json::from_value(serde_json::json!({ "mode": "all" })).unwrap();
        assert_eq!(scope, RepriceScope::All);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: only items inside the chosen scope change.
        #[test]
        fn out_of_scope_items_are_untouched(
            days in prop::collection::vec(1u32..=30, 1..12),
            cutoff in 1u32..=30,
            pick_mask in prop::collection::vec(any::<bool>(), 12),
            mode in 0u8..3,
        ) {
            let items: Vec<(&str, u32, i64)> = days
                .iter()
                .enumerate()
                .map(|(i, d)| (if i % 2 == 0 { "pick" } else { "pack" }, *d, 30))
                .collect();
            let mut bill = bill_with(&items);
            let before = bill.clone();

            let chosen: Vec<BillItemId> = bill
                .items
                .iter()
                .zip(pick_mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(i, _)| i.id)
                .collect();

            let scope = match mode {
                0 => RepriceScope::All,
                1 => RepriceScope::AfterDate { date: june(cutoff) },
                _ => RepriceScope::Selected { item_ids: chosen.clone() },
            };

            let result = reprice(&mut bill, &scope, &rates(&[("pick", 99), ("pack", 77)]), test_time());
            if matches!(scope, RepriceScope::Selected { .. }) && chosen.is_empty() {
                prop_assert!(result.is_err());
                prop_assert_eq!(&bill, &before);
                return Ok(());
            }
            let out = result.unwrap();

            for (old, new) in before.items.iter().zip(bill.items.iter()) {
                let in_scope = match &scope {
                    RepriceScope::All => true,
                    RepriceScope::AfterDate { date } => old.service_date > *date,
                    RepriceScope::Selected { item_ids } => item_ids.contains(&old.id),
                };
                if in_scope {
                    prop_assert_ne!(new.rate, old.rate);
                    prop_assert!(out.updated.contains(&old.id));
                } else {
                    prop_assert_eq!(new, old);
                    prop_assert!(!out.updated.contains(&old.id));
                }
                prop_assert_eq!(new.quantity, old.quantity);
            }
        }
    }
}
