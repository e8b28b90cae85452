//! # Stockroom API
//!
//! REST server for store catalogs, purchasing, supplier and customer
//! credit, and point-of-sale bills.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stockroom API                                  │
//! │                                                                         │
//! │  Client ──► axum (5000) ──► CurrentUser ──► service ──► stockroom-db    │
//! │               │               (JWT:                        │            │
//! │               │                Bearer / cookie)            ▼            │
//! │               │                                         SQLite          │
//! │               └──► /uploads/{file} ◄── item images written on update    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐ │
//! │  │ auth, users,   │  │ categories,    │  │ purchase-orders, credits,  │ │
//! │  │ stores, roles, │  │ items          │  │ customer-credits, bills,   │ │
//! │  │ departments    │  │                │  │ suppliers, dashboard       │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! `stockroom.toml` in the working directory, overridden by `STOCKROOM_*`
//! environment variables. See [`config::ApiConfig`].

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod services;
pub mod uploads;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use stockroom_db::Database;

use crate::auth::JwtManager;
use crate::services::{
    auth_service, bill_service, category_service, credit_service, customer_credit_service,
    dashboard_service, department_service, health_service, item_service,
    purchase_order_service, role_service, store_service, supplier_service, user_service,
};

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    /// Whether 500 responses carry the underlying error text.
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
        AppState {
            db,
            expose_internal_errors: !config.is_production(),
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}

/// Builds the full router with middleware.
pub fn app(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .merge(health_service::router())
        .merge(auth_service::router())
        .merge(user_service::router())
        .merge(store_service::router())
        .merge(department_service::router())
        .merge(role_service::router())
        .merge(category_service::router())
        .merge(item_service::router())
        .merge(purchase_order_service::router())
        .merge(supplier_service::router())
        .merge(credit_service::router())
        .merge(customer_credit_service::router())
        .merge(bill_service::router())
        .merge(dashboard_service::router())
        .merge(uploads::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::expose_internal_errors,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
