//! Receiving domain: advance shipment notices and discrepancy review.

pub mod asn;

pub use asn::{
    Asn, AsnLine, AsnStatus, Discrepancy, DiscrepancyKind, NewAsn, NewAsnLine, ReceivedCount, Resolution,
};
