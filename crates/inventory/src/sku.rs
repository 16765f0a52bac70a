use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowline_core::{ClientId, DomainError, SkuId};

use crate::barcode::{BarcodeKind, Classification, normalize};

/// Catalog record for one client product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub client_id: ClientId,
    pub sku: String,
    pub name: String,
    pub upc: Option<String>,
    pub ean: Option<String>,
    pub fnsku: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSku {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub upc: Option<String>,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub fnsku: Option<String>,
}

impl NewSku {
    pub fn into_sku(self, client_id: ClientId, now: DateTime<Utc>) -> Result<Sku, DomainError> {
        let sku = normalize(&self.sku);
        if sku.is_empty() || sku.len() > 64 {
            return Err(DomainError::validation("sku must be 1-64 characters"));
        }
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let upc = digits_field("upc", self.upc, &[12])?;
        let ean = digits_field("ean", self.ean, &[8, 13])?;
        let fnsku = self.fnsku.map(|f| normalize(&f)).filter(|f| !f.is_empty());

        Ok(Sku {
            id: SkuId::new(),
            client_id,
            sku,
            name,
            upc,
            ean,
            fnsku,
            created_at: now,
        })
    }
}

fn digits_field(
    field: &str,
    value: Option<String>,
    lengths: &[usize],
) -> Result<Option<String>, DomainError> {
    let Some(v) = value.map(|v| normalize(&v)).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if !v.bytes().all(|b| b.is_ascii_digit()) || !lengths.contains(&v.len()) {
        return Err(DomainError::validation(format!("{field} has an invalid format")));
    }
    Ok(Some(v))
}

impl Sku {
    /// Whether a classified product code identifies this SKU.
    pub fn matches(&self, scan: &Classification) -> bool {
        if !scan.kind.is_product() {
            return false;
        }
        if self.sku == scan.code {
            return true;
        }
        match scan.kind {
            BarcodeKind::ProductUpc => self.upc.as_deref() == Some(scan.code.as_str()),
            // A 13-digit EAN with a leading zero is the UPC-A with a prefix.
            BarcodeKind::ProductEan => {
                self.ean.as_deref() == Some(scan.code.as_str())
                    || scan
                        .code
                        .strip_prefix('0')
                        .is_some_and(|upc| upc.len() == 12 && self.upc.as_deref() == Some(upc))
            }
            BarcodeKind::ProductFnsku => self.fnsku.as_deref() == Some(scan.code.as_str()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify;

    fn widget() -> Sku {
        NewSku {
            sku: "wid-001".to_string(),
            name: "Widget".to_string(),
            upc: Some("036000291452".to_string()),
            ean: None,
            fnsku: Some("x00abc1234".to_string()),
        }
        .into_sku(ClientId::new(), Utc::now())
        .unwrap()
    }

    #[test]
    fn normalizes_identifiers() {
        let s = widget();
        assert_eq!(s.sku, "WID-001");
        assert_eq!(s.fnsku.as_deref(), Some("X00ABC1234"));
    }

    #[test]
    fn rejects_malformed_upc() {
        let err = NewSku {
            sku: "A1".to_string(),
            name: "x".to_string(),
            upc: Some("12345".to_string()),
            ean: None,
            fnsku: None,
        }
        .into_sku(ClientId::new(), Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn matches_each_identifier() {
        let s = widget();
        assert!(s.matches(&classify("036000291452")));
        assert!(s.matches(&classify("0036000291452")));
        assert!(s.matches(&classify("X00ABC1234")));
        assert!(s.matches(&classify("wid-001")));
        assert!(!s.matches(&classify("1Z999AA10123456784")));
        assert!(!s.matches(&classify("4006381333931")));
    }
}
