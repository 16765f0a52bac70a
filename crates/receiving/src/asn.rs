use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{AsnId, ClientId, DomainError, DomainResult};
use stowline_inventory::barcode::normalize;

/// ASN status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsnStatus {
    Submitted,
    Received,
    Discrepancy,
    Closed,
}

impl AsnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsnStatus::Submitted => "submitted",
            AsnStatus::Received => "received",
            AsnStatus::Discrepancy => "discrepancy",
            AsnStatus::Closed => "closed",
        }
    }
}

impl core::str::FromStr for AsnStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(AsnStatus::Submitted),
            "received" => Ok(AsnStatus::Received),
            "discrepancy" => Ok(AsnStatus::Discrepancy),
            "closed" => Ok(AsnStatus::Closed),
            other => Err(DomainError::validation(format!("unknown ASN status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnLine {
    pub sku: String,
    pub expected_qty: i64,
    pub received_qty: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancyKind {
    Short,
    Over,
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub sku: String,
    pub expected: i64,
    pub received: i64,
    pub kind: DiscrepancyKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAsnLine {
    pub sku: String,
    pub expected_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAsn {
    pub reference: String,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_numbers: Vec<String>,
    #[serde(default)]
    pub expected_date: Option<NaiveDate>,
    pub lines: Vec<NewAsnLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReceivedCount {
    pub sku: String,
    pub quantity: i64,
}

/// Outcome chosen when reviewing a discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Resolution {
    /// Inventory takes the counted quantities as-is.
    AcceptReceived,
    /// Override counted quantities per SKU.
    Adjust { quantities: BTreeMap<String, i64> },
}

/// Advance shipment notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asn {
    pub id: AsnId,
    pub client_id: ClientId,
    pub reference: String,
    pub carrier: Option<String>,
    pub tracking_numbers: Vec<String>,
    pub expected_date: Option<NaiveDate>,
    pub status: AsnStatus,
    pub lines: Vec<AsnLine>,
    pub discrepancies: Vec<Discrepancy>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful save.
    #[serde(default)]
    pub version: u64,
}

impl Asn {
    pub fn submit(client_id: ClientId, input: NewAsn, now: DateTime<Utc>) -> DomainResult<Self> {
        let reference = input.reference.trim().to_string();
        if reference.is_empty() {
            return Err(DomainError::validation("reference cannot be empty"));
        }
        if input.lines.is_empty() {
            return Err(DomainError::validation("ASN needs at least one line"));
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(input.lines.len());
        for line in input.lines {
            let sku = normalize(&line.sku);
            if sku.is_empty() {
                return Err(DomainError::validation("line sku cannot be empty"));
            }
            if line.expected_qty <= 0 {
                return Err(DomainError::validation(format!("expected_qty for {sku} must be positive")));
            }
            if !seen.insert(sku.clone()) {
                return Err(DomainError::validation(format!("duplicate sku on ASN: {sku}")));
            }
            lines.push(AsnLine {
                sku,
                expected_qty: line.expected_qty,
                received_qty: None,
            });
        }

        let tracking_numbers = input
            .tracking_numbers
            .iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            id: AsnId::new(),
            client_id,
            reference,
            carrier: input.carrier.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            tracking_numbers,
            expected_date: input.expected_date,
            status: AsnStatus::Submitted,
            lines,
            discrepancies: Vec::new(),
            review_note: None,
            created_at: now,
            received_at: None,
            closed_at: None,
            version: 0,
        })
    }

    pub fn matches_tracking(&self, code: &str) -> bool {
        self.tracking_numbers.iter().any(|t| t == code)
    }

    pub fn total_expected(&self) -> i64 {
        self.lines.iter().fold(0i64, |acc, l| acc.saturating_add(l.expected_qty))
    }

    /// Record dock counts. Expected lines without a count are counted as zero.
    pub fn receive(&mut self, counts: Vec<ReceivedCount>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AsnStatus::Submitted {
            return Err(DomainError::invariant(format!(
                "ASN is {} and cannot be received again",
                self.status.as_str()
            )));
        }

        let mut counted: BTreeMap<String, i64> = BTreeMap::new();
        for c in counts {
            let sku = normalize(&c.sku);
            if sku.is_empty() {
                return Err(DomainError::validation("count sku cannot be empty"));
            }
            if c.quantity < 0 {
                return Err(DomainError::validation(format!("quantity for {sku} cannot be negative")));
            }
            let total = counted.entry(sku).or_insert(0);
            *total = total
                .checked_add(c.quantity)
                .ok_or_else(|| DomainError::validation("quantity overflows"))?;
        }

        for line in &mut self.lines {
            line.received_qty = Some(counted.remove(&line.sku).unwrap_or(0));
        }
        for (sku, quantity) in counted {
            if quantity == 0 {
                continue;
            }
            self.lines.push(AsnLine {
                sku,
                expected_qty: 0,
                received_qty: Some(quantity),
            });
        }

        self.discrepancies = compute_discrepancies(&self.lines);
        self.status = if self.discrepancies.is_empty() {
            AsnStatus::Received
        } else {
            AsnStatus::Discrepancy
        };
        self.received_at = Some(now);
        Ok(())
    }

    /// Resolve a discrepancy and close the ASN.
    pub fn review(&mut self, resolution: Resolution, note: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AsnStatus::Discrepancy {
            return Err(DomainError::invariant(format!(
                "ASN is {} and has no discrepancy to review",
                self.status.as_str()
            )));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        if let Resolution::Adjust { quantities } = &resolution {
            if note.is_none() {
                return Err(DomainError::validation("a note is required when adjusting quantities"));
            }
            if quantities.is_empty() {
                return Err(DomainError::validation("no quantities supplied"));
            }
            let adjusted: Vec<(String, i64)> = quantities.iter().map(|(s, q)| (normalize(s), *q)).collect();
            for (sku, qty) in &adjusted {
                if *qty < 0 {
                    return Err(DomainError::validation(format!("quantity for {sku} cannot be negative")));
                }
                if !self.lines.iter().any(|l| &l.sku == sku) {
                    return Err(DomainError::validation(format!("{sku} is not on this ASN")));
                }
            }
            for (sku, qty) in adjusted {
                if let Some(line) = self.lines.iter_mut().find(|l| l.sku == sku) {
                    line.received_qty = Some(qty);
                }
            }
        }

        self.review_note = note;
        self.status = AsnStatus::Closed;
        self.closed_at = Some(now);
        Ok(())
    }

    /// Acknowledge a cleanly received ASN.
    pub fn close(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AsnStatus::Received {
            return Err(DomainError::invariant(format!(
                "only received ASNs can be closed directly (status is {})",
                self.status.as_str()
            )));
        }
        self.status = AsnStatus::Closed;
        self.closed_at = Some(now);
        Ok(())
    }

    /// Per-SKU quantities that should be booked into inventory.
    pub fn final_quantities(&self) -> Vec<(String, i64)> {
        self.lines
            .iter()
            .filter_map(|l| l.received_qty.filter(|q| *q > 0).map(|q| (l.sku.clone(), q)))
            .collect()
    }
}

fn compute_discrepancies(lines: &[AsnLine]) -> Vec<Discrepancy> {
    lines
        .iter()
        .filter_map(|l| {
            let received = l.received_qty.unwrap_or(0);
            let kind = if l.expected_qty == 0 {
                DiscrepancyKind::Unexpected
            } else if received < l.expected_qty {
                DiscrepancyKind::Short
            } else if received > l.expected_qty {
                DiscrepancyKind::Over
            } else {
                return None;
            };
            Some(Discrepancy {
                sku: l.sku.clone(),
                expected: l.expected_qty,
                received,
                kind,
            })
        })
        .collect()
}
