//! # Repository Module
//!
//! Database repository implementations for Stockroom.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.categories().get(store_id, id)                             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  CategoryRepository                                                    │
//! │  ├── get(&self, store_id, id)                                          │
//! │  ├── list(&self, store_id, filter, page)                               │
//! │  ├── modify(&self, store_id, id, by, |category| ...)                   │
//! │  └── delete(&self, store_id, id)                                       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (mock the repository)                                  │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Category aggregates and the item index
//! - [`PurchaseOrderRepository`] - Purchase orders and stock receipt
//! - [`CreditRepository`] / [`CustomerCreditRepository`] - Credit ledgers
//! - [`BillRepository`] - Bills with stock deduction
//! - [`UserRepository`], [`StoreRepository`], [`SupplierRepository`],
//!   [`DepartmentRepository`] - Flat records
//! - [`DashboardRepository`] - Store summary

pub mod bill;
pub mod category;
pub mod credit;
pub mod dashboard;
pub mod department;
pub mod purchase_order;
pub mod store;
pub mod supplier;
pub mod user;

pub use bill::BillRepository;
pub use category::{CategoryFilter, CategoryRepository, ItemFilter};
pub use credit::{CreditRepository, CustomerCreditRepository};
pub use dashboard::{DashboardRepository, DashboardSummary};
pub use department::DepartmentRepository;
pub use purchase_order::{PurchaseOrderRepository, ReceiptOutcome, ReceivedItem};
pub use store::StoreRepository;
pub use supplier::SupplierRepository;
pub use user::{UserFilter, UserRepository};
