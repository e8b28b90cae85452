//! Supplier endpoints, scoped to the selected store.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use stockroom_core::SupplierInput;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, message, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/suppliers", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct SupplierQuery {
    pub search: Option<String>,
}

/// GET /api/suppliers
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<SupplierQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;

    let request = page.request();
    let (suppliers, total) = state
        .db
        .suppliers()
        .list(store_id, query.search.as_deref(), request)
        .await?;
    Ok(ok(Page::new("suppliers", suppliers, request, total)))
}

/// POST /api/suppliers
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<SupplierInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let supplier = state.db.suppliers().create(store_id, input).await?;
    info!(supplier_id = %supplier.id, name = %supplier.name, "Supplier created");
    Ok(created(supplier, "Supplier created"))
}

/// GET /api/suppliers/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.suppliers().get(store_id, &id).await?))
}

/// PUT /api/suppliers/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<SupplierInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let supplier = state.db.suppliers().update(store_id, &id, input).await?;
    Ok(ok_with_message(supplier, "Supplier updated"))
}

/// DELETE /api/suppliers/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    state.db.suppliers().delete(store_id, &id).await?;
    Ok(message("Supplier deleted"))
}
