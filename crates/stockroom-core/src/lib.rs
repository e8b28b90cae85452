//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate holds every inventory rule as plain data and pure functions.
//! Nothing in here touches the database, the network or the file system.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum REST)                         │   │
//! │  │    /api/categories, /api/purchase-orders, /api/credits, ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  catalog  │  │ purchase_ │  │  ledger   │  │   types   │  │   │
//! │  │   │ Category  │  │   order   │  │  Credit   │  │ User/Bill │  │   │
//! │  │   │ Item/Batch│  │  Receipt  │  │  Payment  │  │ Supplier  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockroom-db (Database Layer)                   │   │
//! │  │           SQLite documents, relational rows, migrations         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Category → Subcategory → Item → Batch aggregate
//! - [`purchase_order`] - Purchase orders, totals and the receipt workflow
//! - [`ledger`] - Supplier and customer credit ledgers
//! - [`types`] - Flat records (users, stores, suppliers, bills, departments)
//! - [`pagination`] - Page/limit normalisation and page metadata
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::catalog::slugify;
//! use stockroom_core::money::Money;
//!
//! assert_eq!(slugify("Fresh Milk & Dairy!"), "fresh-milk-dairy");
//!
//! // Payments are applied in whole currency units
//! assert_eq!(Money::from_cents(39_960).round_to_whole_units().cents(), 40_000);
//! ```

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod money;
pub mod pagination;
pub mod purchase_order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{Batch, Category, Item, ItemImage, StockStatus, Subcategory};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{CreditStatus, Ledger};
pub use money::Money;
pub use pagination::{PageRequest, Pagination};
pub use purchase_order::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page size when a listing request carries no `limit`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on `limit` for any paginated listing.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum lines on a single purchase order or bill.
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum quantity on a single purchase order or bill line.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Largest accepted amount in cents for any price, cost, charge or payment.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

/// Largest stock level an item may hold.
pub const MAX_STOCK_LEVEL: i64 = 100_000_000;
