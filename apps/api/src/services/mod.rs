//! HTTP route handlers, one module per resource.
//!
//! Each module exposes `router()`; [`crate::app`] merges them.

pub mod auth_service;
pub mod bill_service;
pub mod category_service;
pub mod credit_service;
pub mod customer_credit_service;
pub mod dashboard_service;
pub mod department_service;
pub mod health_service;
pub mod item_service;
pub mod purchase_order_service;
pub mod role_service;
pub mod store_service;
pub mod supplier_service;
pub mod user_service;
