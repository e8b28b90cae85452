//! Item endpoints.
//!
//! Items live inside category documents; these routes address them by id
//! or SKU and resolve the owning category through the item index.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use stockroom_core::catalog::{ItemPatch, StockStatus};
use stockroom_db::ItemFilter;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{message, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::services::category_service::view_of;
use crate::uploads::{persist_images, StoredImages};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/items", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/low-stock", get(low_stock))
        .route("/sku/{sku}", get(get_by_sku))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/batches/{batch_number}/deactivate", post(deactivate_batch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    pub search: Option<String>,
    pub stock_status: Option<String>,
    pub category_id: Option<String>,
}

impl ItemQuery {
    fn into_filter(self) -> ApiResult<ItemFilter> {
        let stock_status = match self.stock_status.as_deref().filter(|s| !s.is_empty()) {
            Some(value) => Some(StockStatus::parse(value).ok_or_else(|| {
                ApiError::validation("stockStatus", format!("Unknown stock status '{}'", value))
            })?),
            None => None,
        };

        Ok(ItemFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            stock_status,
            category_id: self.category_id.filter(|s| !s.is_empty()),
            low_stock_only: false,
        })
    }
}

/// GET /api/items
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<ItemQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let filter = query.into_filter()?;

    let request = page.request();
    let (items, total) = state.db.categories().list_items(store_id, &filter, request).await?;
    Ok(ok(Page::new("items", items, request, total)))
}

/// GET /api/items/low-stock
///
/// Low-stock and out-of-stock items.
async fn low_stock(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let filter = ItemFilter {
        low_stock_only: true,
        ..ItemFilter::default()
    };

    let request = page.request();
    let (items, total) = state.db.categories().list_items(store_id, &filter, request).await?;
    Ok(ok(Page::new("items", items, request, total)))
}

/// GET /api/items/sku/{sku}
async fn get_by_sku(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(sku): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.categories().item_by_sku(store_id, &sku).await?))
}

/// GET /api/items/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.categories().item(store_id, &id).await?))
}

/// PUT /api/items/{id}
///
/// Inline `data:` images are written to the uploads directory first.
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(mut patch): JsonBody<ItemPatch>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    patch.validate()?;
    let stored = match patch.images.as_mut() {
        Some(images) => persist_images(&state.config.uploads_dir, images).await?,
        None => StoredImages::default(),
    };

    let saved = state
        .db
        .categories()
        .modify_item(store_id, &id, Some(&current.id), |c| {
            c.update_item(&id, patch).map(|_| ())
        })
        .await;
    let (category, ()) = match saved {
        Ok(saved) => saved,
        Err(e) => {
            stored.discard().await;
            return Err(e.into());
        }
    };
    Ok(ok_with_message(view_of(&category, &id)?, "Item updated"))
}

/// DELETE /api/items/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let (_, removed) = state
        .db
        .categories()
        .modify_item(store_id, &id, Some(&current.id), |c| c.remove_item(&id))
        .await?;
    info!(item_id = %removed.id, sku = %removed.sku, "Item deleted");
    Ok(message("Item deleted"))
}

/// POST /api/items/{id}/batches/{batch_number}/deactivate
async fn deactivate_batch(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, batch_number)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let (category, ()) = state
        .db
        .categories()
        .modify_item(store_id, &id, Some(&current.id), |c| {
            c.deactivate_batch(&id, &batch_number).map(|_| ())
        })
        .await?;
    Ok(ok_with_message(view_of(&category, &id)?, "Batch deactivated"))
}
