//! Scanned-code classification.
//!
//! Decides whether a scanned string is a carrier tracking number or a product
//! identifier. Patterns run in a fixed order and the first match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeKind {
    Tracking,
    ProductUpc,
    ProductEan,
    ProductFnsku,
    ProductSku,
    Unknown,
}

impl BarcodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarcodeKind::Tracking => "tracking",
            BarcodeKind::ProductUpc => "product_upc",
            BarcodeKind::ProductEan => "product_ean",
            BarcodeKind::ProductFnsku => "product_fnsku",
            BarcodeKind::ProductSku => "product_sku",
            BarcodeKind::Unknown => "unknown",
        }
    }

    pub fn is_product(&self) -> bool {
        matches!(
            self,
            BarcodeKind::ProductUpc
                | BarcodeKind::ProductEan
                | BarcodeKind::ProductFnsku
                | BarcodeKind::ProductSku
        )
    }
}

impl core::fmt::Display for BarcodeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    Ups,
    Usps,
    Fedex,
    Dhl,
    Amazon,
}

/// Result of classifying one scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Normalized code (whitespace removed, uppercased).
    pub code: String,
    #[serde(rename = "type")]
    pub kind: BarcodeKind,
    pub carrier: Option<Carrier>,
    /// GS1 check digit result for UPC/EAN codes; `None` for other kinds.
    pub check_digit_valid: Option<bool>,
}

struct Rule {
    pattern: Regex,
    kind: BarcodeKind,
    carrier: Option<Carrier>,
}

fn rule(pattern: &str, kind: BarcodeKind, carrier: Option<Carrier>) -> Rule {
    Rule {
        // Patterns are literals below; a bad one is a programming error caught by tests.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid barcode pattern {pattern}: {e}")),
        kind,
        carrier,
    }
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use BarcodeKind::*;
    vec![
        rule(r"^1Z[0-9A-Z]{16}$", Tracking, Some(Carrier::Ups)),
        rule(r"^TBA[0-9]{12}$", Tracking, Some(Carrier::Amazon)),
        rule(r"^9[2-5][0-9]{20,24}$", Tracking, Some(Carrier::Usps)),
        rule(r"^[A-Z]{2}[0-9]{9}US$", Tracking, Some(Carrier::Usps)),
        rule(r"^JD[0-9]{18}$", Tracking, Some(Carrier::Dhl)),
        rule(r"^[0-9]{12}$", ProductUpc, None),
        rule(r"^[0-9]{13}$", ProductEan, None),
        rule(r"^[0-9]{8}$", ProductEan, None),
        rule(r"^[0-9]{15}$", Tracking, Some(Carrier::Fedex)),
        rule(r"^96[0-9]{20}$", Tracking, Some(Carrier::Fedex)),
        rule(r"^[0-9]{10}$", Tracking, Some(Carrier::Dhl)),
        rule(r"^X00[0-9A-Z]{7}$", ProductFnsku, None),
    ]
});

static SKU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+(?:[-_.][A-Z0-9]+)*$").unwrap_or_else(|e| panic!("{e}")));

/// Strip whitespace and uppercase.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Classify a scanned code.
pub fn classify(raw: &str) -> Classification {
    let code = normalize(raw);

    let (kind, carrier) = RULES
        .iter()
        .find(|r| r.pattern.is_match(&code))
        .map(|r| (r.kind, r.carrier))
        .unwrap_or_else(|| {
            if looks_like_sku(&code) {
                (BarcodeKind::ProductSku, None)
            } else {
                (BarcodeKind::Unknown, None)
            }
        });

    let check_digit_valid = match kind {
        BarcodeKind::ProductUpc | BarcodeKind::ProductEan => Some(gs1_check_digit_valid(&code)),
        _ => None,
    };

    Classification {
        code,
        kind,
        carrier,
        check_digit_valid,
    }
}

fn looks_like_sku(code: &str) -> bool {
    (3..=40).contains(&code.len())
        && code.bytes().any(|b| b.is_ascii_alphabetic())
        && SKU.is_match(code)
}

/// GS1 mod-10 check digit (UPC-A, EAN-8, EAN-13).
pub fn gs1_check_digit_valid(code: &str) -> bool {
    let digits: Vec<u32> = match code.chars().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };
    let Some((&check, body)) = digits.split_last() else {
        return false;
    };

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();

    (10 - sum % 10) % 10 == check
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn carrier_formats() {
        let ups = classify("1Z999AA10123456784");
        assert_eq!(ups.kind, BarcodeKind::Tracking);
        assert_eq!(ups.carrier, Some(Carrier::Ups));

        assert_eq!(classify("TBA123456789012").carrier, Some(Carrier::Amazon));
        assert_eq!(classify("9400 1000 0000 0000 0000 00").carrier, Some(Carrier::Usps));
        assert_eq!(classify("EA123456789US").carrier, Some(Carrier::Usps));
        assert_eq!(classify("123456789012345").carrier, Some(Carrier::Fedex));
        assert_eq!(classify("1234567890").carrier, Some(Carrier::Dhl));
    }

    #[test]
    fn product_formats() {
        let upc = classify("036000291452");
        assert_eq!(upc.kind, BarcodeKind::ProductUpc);
        assert_eq!(upc.check_digit_valid, Some(true));

        let ean = classify("4006381333931");
        assert_eq!(ean.kind, BarcodeKind::ProductEan);
        assert_eq!(ean.check_digit_valid, Some(true));

        assert_eq!(classify("96385074").kind, BarcodeKind::ProductEan);
        assert_eq!(classify("x00abc1234").kind, BarcodeKind::ProductFnsku);
        assert_eq!(classify("tee-blk-lg").kind, BarcodeKind::ProductSku);
    }

    #[test]
    fn bad_check_digit_keeps_kind() {
        let upc = classify("036000291453");
        assert_eq!(upc.kind, BarcodeKind::ProductUpc);
        assert_eq!(upc.check_digit_valid, Some(false));
    }

    #[test]
    fn normalizes_whitespace_and_case() {
        let c = classify("  1z999aa1 0123456784\n");
        assert_eq!(c.code, "1Z999AA10123456784");
        assert_eq!(c.kind, BarcodeKind::Tracking);
    }

    #[test]
    fn unknown_inputs() {
        for raw in ["", "12", "ab", "hello world!", "12345", "--A--", "#A1"] {
            assert_eq!(classify(raw).kind, BarcodeKind::Unknown, "{raw:?}");
        }
    }

    proptest! {
        #[test]
        fn ups_numbers_are_tracking(body in "[0-9A-Z]{16}") {
            let c = classify(&format!("1Z{body}"));
            prop_assert_eq!(c.kind, BarcodeKind::Tracking);
            prop_assert_eq!(c.carrier, Some(Carrier::Ups));
        }

        #[test]
        fn twelve_digits_are_upc(code in "[0-9]{12}") {
            prop_assert_eq!(classify(&code).kind, BarcodeKind::ProductUpc);
        }

        #[test]
        fn thirteen_digits_are_ean(code in "[0-9]{13}") {
            prop_assert_eq!(classify(&code).kind, BarcodeKind::ProductEan);
        }

        #[test]
        fn codes_with_foreign_symbols_are_unknown(
            prefix in "[A-Z0-9]{0,10}",
            symbol in "[#/@!?*+]",
            suffix in "[A-Z0-9]{0,10}",
        ) {
            let code = format!("{prefix}{symbol}{suffix}");
            prop_assert_eq!(classify(&code).kind, BarcodeKind::Unknown);
        }
    }
}
