//! Ledger data model: one struct per base table plus the `Row` / `RowKey`
//! unions the store and the rule engine pass around.

mod client;
mod employee;
mod inventory;
mod product;
mod purchase;
mod vivarium;
mod work;
mod zone;

use serde::{Deserialize, Serialize};

use verdant_core::{
    ClientId, DomainResult, EmployeeId, Entity, InventoryId, ProductId, PurchaseId, VivariumId,
    WorkId, ZoneId,
};
use verdant_events::Record;

pub use client::{Client, bonus_for_purchases};
pub use employee::Employee;
pub use inventory::Inventory;
pub use product::Product;
pub use purchase::Purchase;
pub use vivarium::Vivarium;
pub use work::Work;
pub use zone::Zone;

/// Base tables of the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Vivarium,
    Product,
    Zone,
    Inventory,
    Employee,
    Work,
    Client,
    Purchase,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Vivarium,
        Table::Product,
        Table::Zone,
        Table::Inventory,
        Table::Employee,
        Table::Work,
        Table::Client,
        Table::Purchase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Vivarium => "vivarium",
            Table::Product => "product",
            Table::Zone => "zone",
            Table::Inventory => "inventory",
            Table::Employee => "employee",
            Table::Work => "work",
            Table::Client => "client",
            Table::Purchase => "purchase",
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of any ledger row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "table", content = "id", rename_all = "snake_case")]
pub enum RowKey {
    Vivarium(VivariumId),
    Product(ProductId),
    Zone(ZoneId),
    Inventory(InventoryId),
    Employee(EmployeeId),
    Work(WorkId),
    Client(ClientId),
    Purchase(PurchaseId),
}

impl RowKey {
    pub fn table(&self) -> Table {
        match self {
            RowKey::Vivarium(_) => Table::Vivarium,
            RowKey::Product(_) => Table::Product,
            RowKey::Zone(_) => Table::Zone,
            RowKey::Inventory(_) => Table::Inventory,
            RowKey::Employee(_) => Table::Employee,
            RowKey::Work(_) => Table::Work,
            RowKey::Client(_) => Table::Client,
            RowKey::Purchase(_) => Table::Purchase,
        }
    }
}

impl core::fmt::Display for RowKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RowKey::Vivarium(id) => write!(f, "vivarium/{id}"),
            RowKey::Product(id) => write!(f, "product/{id}"),
            RowKey::Zone(id) => write!(f, "zone/{id}"),
            RowKey::Inventory(id) => write!(f, "inventory/{id}"),
            RowKey::Employee(id) => write!(f, "employee/{id}"),
            RowKey::Work(id) => write!(f, "work/{id}"),
            RowKey::Client(id) => write!(f, "client/{id}"),
            RowKey::Purchase(id) => write!(f, "purchase/{id}"),
        }
    }
}

/// A row of any ledger table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Row {
    Vivarium(Vivarium),
    Product(Product),
    Zone(Zone),
    Inventory(Inventory),
    Employee(Employee),
    Work(Work),
    Client(Client),
    Purchase(Purchase),
}

macro_rules! row_variant {
    ($variant:ident, $ty:ty, $as_fn:ident, $into_fn:ident) => {
        impl From<$ty> for Row {
            fn from(value: $ty) -> Self {
                Row::$variant(value)
            }
        }

        impl Row {
            pub fn $as_fn(&self) -> Option<&$ty> {
                match self {
                    Row::$variant(r) => Some(r),
                    _ => None,
                }
            }

            pub fn $into_fn(self) -> Option<$ty> {
                match self {
                    Row::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }
    };
}

row_variant!(Vivarium, Vivarium, as_vivarium, into_vivarium);
row_variant!(Product, Product, as_product, into_product);
row_variant!(Zone, Zone, as_zone, into_zone);
row_variant!(Inventory, Inventory, as_inventory, into_inventory);
row_variant!(Employee, Employee, as_employee, into_employee);
row_variant!(Work, Work, as_work, into_work);
row_variant!(Client, Client, as_client, into_client);
row_variant!(Purchase, Purchase, as_purchase, into_purchase);

impl Row {
    pub fn key(&self) -> RowKey {
        match self {
            Row::Vivarium(r) => RowKey::Vivarium(r.id()),
            Row::Product(r) => RowKey::Product(r.id()),
            Row::Zone(r) => RowKey::Zone(r.id()),
            Row::Inventory(r) => RowKey::Inventory(r.id()),
            Row::Employee(r) => RowKey::Employee(r.id()),
            Row::Work(r) => RowKey::Work(r.id()),
            Row::Client(r) => RowKey::Client(r.id()),
            Row::Purchase(r) => RowKey::Purchase(r.id()),
        }
    }

    /// Column-level validation (no cross-row checks).
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            Row::Vivarium(r) => r.validate(),
            Row::Product(r) => r.validate(),
            Row::Zone(r) => r.validate(),
            Row::Inventory(r) => r.validate(),
            Row::Employee(r) => r.validate(),
            Row::Work(r) => r.validate(),
            Row::Client(r) => r.validate(),
            Row::Purchase(r) => r.validate(),
        }
    }
}

impl Record for Row {
    type Table = Table;

    fn table(&self) -> Table {
        self.key().table()
    }
}

/// Shared column check for display names.
fn require_name(table: &str, name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(verdant_core::DomainError::validation(format!(
            "{table} name cannot be empty"
        )));
    }
    Ok(())
}
