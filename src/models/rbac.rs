// src/models/rbac.rs

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "inventory:read")]
    InventoryRead,
    #[serde(rename = "inventory:write")]
    InventoryWrite,
    #[serde(rename = "orders:create")]
    OrdersCreate,
    #[serde(rename = "orders:assemble")]
    OrdersAssemble,
    #[serde(rename = "orders:cancel")]
    OrdersCancel,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::InventoryRead,
        Permission::InventoryWrite,
        Permission::OrdersCreate,
        Permission::OrdersAssemble,
        Permission::OrdersCancel,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Permission::InventoryRead => "inventory:read",
            Permission::InventoryWrite => "inventory:write",
            Permission::OrdersCreate => "orders:create",
            Permission::OrdersAssemble => "orders:assemble",
            Permission::OrdersCancel => "orders:cancel",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
