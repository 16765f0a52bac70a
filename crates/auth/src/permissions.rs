use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "inventory.read").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");
pub const INVENTORY_READ: Permission = Permission::from_static("inventory.read");
pub const INVENTORY_WRITE: Permission = Permission::from_static("inventory.write");
pub const BILLS_READ: Permission = Permission::from_static("bills.read");
pub const BILLS_WRITE: Permission = Permission::from_static("bills.write");
pub const QUOTES_READ: Permission = Permission::from_static("quotes.read");
pub const QUOTES_WRITE: Permission = Permission::from_static("quotes.write");
pub const ASNS_READ: Permission = Permission::from_static("asns.read");
pub const ASNS_CREATE: Permission = Permission::from_static("asns.create");
pub const ASNS_RECEIVE: Permission = Permission::from_static("asns.receive");
pub const ASNS_REVIEW: Permission = Permission::from_static("asns.review");
pub const SCAN_LOOKUP: Permission = Permission::from_static("scan.lookup");
pub const CLIENTS_MANAGE: Permission = Permission::from_static("clients.manage");
pub const BLOG_IMPORT: Permission = Permission::from_static("blog.import");
pub const SHOPIFY_CONNECT: Permission = Permission::from_static("integrations.shopify");

/// Static role → permission policy.
pub fn permissions_for(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "admin" => vec![WILDCARD],
        "warehouse" => vec![SCAN_LOOKUP, ASNS_READ, ASNS_RECEIVE, INVENTORY_READ],
        "client" => vec![
            INVENTORY_READ,
            BILLS_READ,
            QUOTES_READ,
            ASNS_READ,
            ASNS_CREATE,
            SCAN_LOOKUP,
            SHOPIFY_CONNECT,
        ],
        _ => Vec::new(),
    }
}
