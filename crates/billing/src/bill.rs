use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{BillId, BillItemId, BillingPeriod, ClientId, DomainError, DomainResult, Money};

/// Bill status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Draft,
    Finalized,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Draft => "draft",
            BillStatus::Finalized => "finalized",
            BillStatus::Paid => "paid",
        }
    }
}

impl core::str::FromStr for BillStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BillStatus::Draft),
            "finalized" => Ok(BillStatus::Finalized),
            "paid" => Ok(BillStatus::Paid),
            other => Err(DomainError::validation(format!("unknown bill status: {other}"))),
        }
    }
}

/// One billable service line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: BillItemId,
    pub service_code: String,
    pub description: String,
    pub unit: String,
    pub quantity: i64,
    /// Price per unit in cents.
    pub rate: Money,
    pub service_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    pub fn amount(&self) -> Option<Money> {
        self.rate.checked_mul(self.quantity)
    }
}

/// Input for adding a line item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBillItem {
    pub service_code: String,
    pub description: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub quantity: i64,
    pub rate: Money,
    #[serde(default)]
    pub service_date: Option<NaiveDate>,
}

fn default_unit() -> String {
    "each".to_string()
}

/// Aggregate root: one client's bill for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub client_id: ClientId,
    pub period: BillingPeriod,
    pub status: BillStatus,
    pub items: Vec<BillItem>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every successful save.
    #[serde(default)]
    pub version: u64,
}

impl Bill {
    pub fn new(client_id: ClientId, period: BillingPeriod, now: DateTime<Utc>) -> Self {
        Self {
            id: BillId::new(),
            client_id,
            period,
            status: BillStatus::Draft,
            items: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn ensure_draft(&self) -> DomainResult<()> {
        if self.status != BillStatus::Draft {
            return Err(DomainError::invariant(format!(
                "bill is {} and can no longer be edited",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    pub fn has_service(&self, service_code: &str) -> bool {
        self.items.iter().any(|i| i.service_code == service_code)
    }

    pub fn item(&self, id: BillItemId) -> Option<&BillItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn add_item(&mut self, input: NewBillItem, now: DateTime<Utc>) -> DomainResult<BillItemId> {
        self.ensure_draft()?;

        let service_code = input.service_code.trim().to_string();
        if service_code.is_empty() {
            return Err(DomainError::validation("service_code cannot be empty"));
        }
        if input.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if input.rate.is_negative() {
            return Err(DomainError::validation("rate cannot be negative"));
        }

        let service_date = input.service_date.unwrap_or_else(|| self.period.first_day());
        if !self.period.contains(service_date) {
            return Err(DomainError::validation(format!(
                "service_date {service_date} is outside billing period {}",
                self.period
            )));
        }

        let item = BillItem {
            id: BillItemId::new(),
            service_code,
            description: input.description.trim().to_string(),
            unit: input.unit.trim().to_string(),
            quantity: input.quantity,
            rate: input.rate,
            service_date,
            created_at: now,
        };
        let id = item.id;
        if item.amount().is_none() {
            return Err(DomainError::validation("line amount overflows"));
        }
        self.items.push(item);
        self.updated_at = now;
        Ok(id)
    }

    pub fn set_quantity(&mut self, id: BillItemId, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft()?;
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(DomainError::NotFound)?;
        if item.rate.checked_mul(quantity).is_none() {
            return Err(DomainError::validation("line amount overflows"));
        }
        item.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    pub fn remove_item(&mut self, id: BillItemId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft()?;
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        if self.items.len() == before {
            return Err(DomainError::NotFound);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Sum of line amounts; `None` on overflow.
    pub fn total(&self) -> Option<Money> {
        self.items
            .iter()
            .try_fold(Money::ZERO, |acc, i| acc.checked_add(i.amount()?))
    }

    /// draft → finalized → paid; every other move is rejected.
    pub fn transition(&mut self, to: BillStatus, now: DateTime<Utc>) -> DomainResult<()> {
        use BillStatus::*;
        let allowed = matches!((self.status, to), (Draft, Finalized) | (Finalized, Paid));
        if !allowed {
            return Err(DomainError::invariant(format!(
                "cannot move bill from {} to {}",
                self.status.as_str(),
                to.as_str()
            )));
        }
        if to == Finalized && self.items.is_empty() {
            return Err(DomainError::invariant("cannot finalize a bill without items"));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn march() -> BillingPeriod {
        BillingPeriod::new(2024, 3).unwrap()
    }

    fn item(code: &str, qty: i64, rate: i64) -> NewBillItem {
        NewBillItem {
            service_code: code.to_string(),
            description: format!("{code} service"),
            unit: "each".to_string(),
            quantity: qty,
            rate: Money::from_cents(rate),
            service_date: None,
        }
    }

    #[test]
    fn total_sums_line_amounts() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        bill.add_item(item("pick", 100, 35), test_time()).unwrap();
        bill.add_item(item("storage", 3, 2500), test_time()).unwrap();
        assert_eq!(bill.total(), Some(Money::from_cents(3500 + 7500)));
    }

    #[test]
    fn default_service_date_is_period_start() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        let id = bill.add_item(item("pick", 1, 35), test_time()).unwrap();
        assert_eq!(bill.item(id).unwrap().service_date, march().first_day());
    }

    #[test]
    fn rejects_service_date_outside_period() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        let mut input = item("pick", 1, 35);
        input.service_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(matches!(
            bill.add_item(input, test_time()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn finalized_bill_is_read_only() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        let id = bill.add_item(item("pick", 1, 35), test_time()).unwrap();
        bill.transition(BillStatus::Finalized, test_time()).unwrap();

        let err = bill.set_quantity(id, 5, test_time()).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("can no longer be edited") => {}
            _ => panic!("Expected InvariantViolation for editing finalized bill"),
        }
    }

    #[test]
    fn status_transitions() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        assert!(bill.transition(BillStatus::Finalized, test_time()).is_err());

        bill.add_item(item("pick", 1, 35), test_time()).unwrap();
        assert!(bill.transition(BillStatus::Paid, test_time()).is_err());
        bill.transition(BillStatus::Finalized, test_time()).unwrap();
        bill.transition(BillStatus::Paid, test_time()).unwrap();
        assert!(bill.transition(BillStatus::Draft, test_time()).is_err());
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[test]
    fn finalized_bill_cannot_reopen() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        bill.add_item(item("pick", 1, 35), test_time()).unwrap();
        bill.transition(BillStatus::Finalized, test_time()).unwrap();

        match bill.transition(BillStatus::Draft, test_time()) {
            Err(DomainError::InvariantViolation(msg)) => assert!(msg.contains("finalized to draft")),
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
        assert_eq!(bill.status, BillStatus::Finalized);
        assert!(bill.add_item(item("store", 1, 10), test_time()).is_err());
    }

    #[test]
    fn paid_is_terminal() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        bill.add_item(item("pick", 1, 35), test_time()).unwrap();
        bill.transition(BillStatus::Finalized, test_time()).unwrap();
        bill.transition(BillStatus::Paid, test_time()).unwrap();

        for to in [BillStatus::Draft, BillStatus::Finalized, BillStatus::Paid] {
            assert!(matches!(
                bill.transition(to, test_time()),
                Err(DomainError::InvariantViolation(_))
            ));
        }
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[test]
    fn remove_unknown_item_is_not_found() {
        let mut bill = Bill::new(ClientId::new(), march(), test_time());
        assert_eq!(
            bill.remove_item(BillItemId::new(), test_time()),
            Err(DomainError::NotFound)
        );
    }
}
