//! Purchase order endpoints.
//!
//! ## Lifecycle
//! ```text
//!   pending ──receive (some)──► partially_received ──receive (rest)──► completed
//!      │                                 │
//!      └────────cancel───────────────────┴──► cancelled
//! ```
//!
//! Only pending orders can be edited or deleted. A receipt updates the
//! order and every matched catalog item in one transaction.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockroom_core::purchase_order::{NewPurchaseOrder, PurchaseOrderUpdate, ReceiptLine};
use stockroom_core::PurchaseOrderStatus;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, message, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/purchase-orders", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/next-number", get(next_number))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/receive", post(receive))
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveRequest {
    pub items: Vec<ReceiptLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumberResponse {
    pub po_number: String,
}

/// GET /api/purchase-orders
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<PurchaseOrderQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(value) => Some(PurchaseOrderStatus::parse(value).ok_or_else(|| {
            ApiError::validation("status", format!("Unknown purchase order status '{}'", value))
        })?),
        None => None,
    };

    let request = page.request();
    let (orders, total) = state
        .db
        .purchase_orders()
        .list(store_id, status, request)
        .await?;
    Ok(ok(Page::new("purchaseOrders", orders, request, total)))
}

/// POST /api/purchase-orders
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<NewPurchaseOrder>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    if input.supplier_id.trim().is_empty() {
        return Err(ApiError::validation("supplierId", "Supplier is required"));
    }
    let supplier = state.db.suppliers().get(store_id, &input.supplier_id).await?;

    let order = state
        .db
        .purchase_orders()
        .create(store_id, supplier.name, input, Some(current.id.clone()))
        .await?;
    Ok(created(order, "Purchase order created"))
}

/// GET /api/purchase-orders/next-number
async fn next_number(State(state): State<AppState>, _current: CurrentUser) -> ApiResult<impl IntoResponse> {
    let po_number = state.db.purchase_orders().next_po_number().await?;
    Ok(ok(NextNumberResponse { po_number }))
}

/// GET /api/purchase-orders/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.purchase_orders().get(store_id, &id).await?))
}

/// PUT /api/purchase-orders/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<PurchaseOrderUpdate>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let order = state
        .db
        .purchase_orders()
        .modify(store_id, &id, |po| po.apply_update(update))
        .await?;
    Ok(ok_with_message(order, "Purchase order updated"))
}

/// DELETE /api/purchase-orders/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let order = state.db.purchase_orders().delete(store_id, &id).await?;
    info!(po_number = %order.po_number, "Purchase order deleted");
    Ok(message("Purchase order deleted"))
}

/// POST /api/purchase-orders/{id}/cancel
async fn cancel(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let order = state
        .db
        .purchase_orders()
        .modify(store_id, &id, |po| po.cancel())
        .await?;
    info!(po_number = %order.po_number, "Purchase order cancelled");
    Ok(ok_with_message(order, "Purchase order cancelled"))
}

/// POST /api/purchase-orders/{id}/receive
async fn receive(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<ReceiveRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let outcome = state
        .db
        .purchase_orders()
        .receive(store_id, &id, &req.items, Some(&current.id))
        .await?;

    if !outcome.unmatched_skus.is_empty() {
        warn!(
            po_number = %outcome.purchase_order.po_number,
            skus = ?outcome.unmatched_skus,
            "Received SKUs missing from the catalog"
        );
    }
    let status = outcome.purchase_order.status;
    Ok(ok_with_message(outcome, format!("Stock received, order is {}", status.as_str())))
}
