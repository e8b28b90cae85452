//! # Flat Records
//!
//! Relational entities that are stored one row per record: users, stores,
//! suppliers, bills and departments, plus the role catalogue.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────┐  user_stores  ┌─────────────┐                         │
//! │  │    User     │◀─────────────▶│    Store    │                         │
//! │  │  role       │   (n : m)     │  code       │                         │
//! │  │  department │               └──────┬──────┘                         │
//! │  └──────┬──────┘                      │ store_id                       │
//! │         │                    ┌────────┴────────┐                        │
//! │         ▼                    ▼                 ▼                        │
//! │  ┌─────────────┐     ┌─────────────┐   ┌─────────────┐                 │
//! │  │ Department  │     │  Supplier   │   │    Bill     │──▶ CustomerCredit│
//! │  └─────────────┘     │  + extra{}  │   │  items[]    │   (credit bills)│
//! │                      └─────────────┘   └─────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every record has a UUID `id` used for relations, and where it makes sense
//! a human-readable business key (store `code`, `billNumber`, user `email`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_email, validate_line_count, validate_name, validate_non_negative_cents,
    validate_quantity, validate_sku,
};

// =============================================================================
// Role
// =============================================================================

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
    Cashier,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Employee, Role::Cashier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
            Role::Cashier => "cashier",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|r| r.as_str() == value)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Full access to every store, user and setting",
            Role::Manager => "Manages users, catalog, purchasing and credits for assigned stores",
            Role::Employee => "Maintains catalog and purchase orders for assigned stores",
            Role::Cashier => "Creates bills and views the catalog",
        }
    }

    /// Stores, departments and global settings.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// User accounts, credits and supplier records.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    /// Catalog and purchase orders.
    pub fn can_edit_inventory(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::Employee)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the role catalogue endpoint.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoleInfo {
    pub name: Role,
    pub description: String,
}

impl From<Role> for RoleInfo {
    fn from(role: Role) -> Self {
        RoleInfo {
            name: role,
            description: role.description().to_string(),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// An account that can sign in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercased; unique.
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub department_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "Option<String>")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Ids of stores this user belongs to.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub stores: Vec<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn belongs_to(&self, store_id: &str) -> bool {
        self.stores.iter().any(|s| s == store_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub department_id: Option<String>,
    pub stores: Vec<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name, 100)?;
        validate_email(&self.email)?;
        crate::validation::validate_password(&self.password)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub department_id: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name("name", name, 100)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Store {
    pub id: String,
    pub name: String,
    /// Short unique code, stored uppercased.
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct StoreInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl StoreInput {
    /// Validates a create request; name and code are required.
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        validate_name("name", self.name.as_deref().unwrap_or_default(), 100)?;
        validate_name("code", self.code.as_deref().unwrap_or_default(), 20)?;
        self.validate_update()
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name("name", name, 100)?;
        }
        if let Some(code) = &self.code {
            validate_name("code", code, 20)?;
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        Ok(())
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier. `extra` carries free-form legacy fields untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub payment_terms: Option<String>,
    pub is_active: bool,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    #[ts(type = "Record<string, unknown>")]
    pub extra: BTreeMap<String, serde_json::Value>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct SupplierInput {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub payment_terms: Option<String>,
    pub is_active: Option<bool>,
    #[ts(type = "Record<string, unknown> | null")]
    pub extra: Option<BTreeMap<String, serde_json::Value>>,
}

impl SupplierInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        validate_name("name", self.name.as_deref().unwrap_or_default(), 150)?;
        self.validate_update()
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name("name", name, 150)?;
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        Ok(())
    }

    /// Builds a new supplier row for a store.
    pub fn into_supplier(self, store_id: &str) -> Supplier {
        let now = Utc::now();
        Supplier {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            name: self.name.unwrap_or_default().trim().to_string(),
            contact_person: self.contact_person,
            email: self.email,
            phone: self.phone,
            address: self.address,
            tax_number: self.tax_number,
            payment_terms: self.payment_terms,
            is_active: self.is_active.unwrap_or(true),
            extra: self.extra.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges present fields into an existing supplier. `extra` keys merge
    /// one by one; a `null` value removes the key.
    pub fn apply(self, supplier: &mut Supplier) {
        if let Some(name) = self.name {
            supplier.name = name.trim().to_string();
        }
        if self.contact_person.is_some() {
            supplier.contact_person = self.contact_person;
        }
        if self.email.is_some() {
            supplier.email = self.email;
        }
        if self.phone.is_some() {
            supplier.phone = self.phone;
        }
        if self.address.is_some() {
            supplier.address = self.address;
        }
        if self.tax_number.is_some() {
            supplier.tax_number = self.tax_number;
        }
        if self.payment_terms.is_some() {
            supplier.payment_terms = self.payment_terms;
        }
        if let Some(active) = self.is_active {
            supplier.is_active = active;
        }
        for (key, value) in self.extra.unwrap_or_default() {
            if value.is_null() {
                supplier.extra.remove(&key);
            } else {
                supplier.extra.insert(key, value);
            }
        }
        supplier.updated_at = Utc::now();
    }
}

// =============================================================================
// Bill
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Sold on credit; a customer credit is opened for the total.
    Credit,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// A bill line. Name, SKU and price are frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BillItem {
    pub item_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Bill {
    pub id: String,
    pub bill_number: String,
    pub store_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<BillItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct BillLineInput {
    pub item_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct NewBill {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<BillLineInput>,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Prefix shared by every bill number.
pub const BILL_NUMBER_PREFIX: &str = "BILL-";

/// Next bill number after the most recently created one (`BILL-000001`).
pub fn next_bill_number(last: Option<&str>) -> String {
    let next = last
        .and_then(|n| n.strip_prefix(BILL_NUMBER_PREFIX))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{}{:06}", BILL_NUMBER_PREFIX, next)
}

impl Bill {
    /// Builds a bill with computed totals. Stock is not checked here.
    pub fn new(
        bill_number: String,
        store_id: &str,
        input: NewBill,
        created_by: Option<String>,
    ) -> CoreResult<Self> {
        validate_line_count(input.items.len())?;
        for line in &input.items {
            validate_name("items.name", &line.name, 100)?;
            validate_sku(&line.sku)?;
            validate_quantity(line.quantity)?;
            validate_non_negative_cents("items.unitPrice", line.unit_price_cents)?;
        }
        validate_non_negative_cents("discount", input.discount_cents)?;
        validate_non_negative_cents("tax", input.tax_cents)?;

        if input.payment_method == PaymentMethod::Credit
            && input
                .customer_name
                .as_deref()
                .map_or(true, |n| n.trim().is_empty())
        {
            return Err(ValidationError::Required {
                field: "customerName".to_string(),
            }
            .into());
        }

        let items = input
            .items
            .into_iter()
            .map(|line| {
                Ok(BillItem {
                    line_total_cents: Money::from_cents(line.unit_price_cents)
                        .checked_multiply_quantity(line.quantity, "items.lineTotal")?
                        .cents(),
                    item_id: line.item_id,
                    name: line.name.trim().to_string(),
                    sku: line.sku.trim().to_string(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                })
            })
            .collect::<CoreResult<Vec<BillItem>>>()?;

        let subtotal = Money::checked_sum(
            items.iter().map(|i| Money::from_cents(i.line_total_cents)),
            "subtotal",
        )?
        .ensure_within_limit("subtotal")?;
        let total = subtotal
            .checked_add(Money::from_cents(input.tax_cents), "total")?
            .checked_sub(Money::from_cents(input.discount_cents), "total")?
            .ensure_within_limit("total")?;

        Ok(Bill {
            id: Uuid::new_v4().to_string(),
            bill_number,
            store_id: store_id.to_string(),
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            items,
            subtotal_cents: subtotal.cents(),
            discount_cents: input.discount_cents,
            tax_cents: input.tax_cents,
            total_cents: total.floor_at_zero().cents(),
            payment_method: input.payment_method,
            created_by,
            created_at: Utc::now(),
        })
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Department
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct DepartmentInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl DepartmentInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        validate_name("name", self.name.as_deref().unwrap_or_default(), 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
