//! Category endpoints.
//!
//! A category is one aggregate holding its subcategories and items, so
//! every write here is a load, change and save of a single document.
//!
//! ## Routes
//! ```text
//! GET    /api/categories                                   list (search, isActive)
//! POST   /api/categories                                   create
//! GET    /api/categories/{id}                              full tree + counts
//! PUT    /api/categories/{id}                              rename / describe / (de)activate
//! DELETE /api/categories/{id}                              only when empty
//! GET    /api/categories/{id}/can-delete
//! POST   /api/categories/{id}/subcategories
//! PUT    /api/categories/{id}/subcategories/{sub_id}
//! DELETE /api/categories/{id}/subcategories/{sub_id}       only when it has no items
//! POST   /api/categories/{id}/subcategories/{sub_id}/items
//! POST   /api/categories/{id}/items                        item directly on the category
//! ```

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use stockroom_core::catalog::{CategoryPatch, CategorySummary, ItemView, NewItem, StoreRef};
use stockroom_core::{Category, CoreError};
use stockroom_db::CategoryFilter;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::uploads::persist_images;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/categories", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/can-delete", get(can_delete))
        .route("/{id}/subcategories", post(add_subcategory))
        .route(
            "/{id}/subcategories/{sub_id}",
            put(update_subcategory).delete(delete_subcategory),
        )
        .route("/{id}/subcategories/{sub_id}/items", post(add_subcategory_item))
        .route("/{id}/items", post(add_category_item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubcategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionCheck {
    pub can_delete: bool,
    pub subcategory_count: usize,
    pub total_item_count: usize,
}

impl From<&Category> for DeletionCheck {
    fn from(category: &Category) -> Self {
        DeletionCheck {
            can_delete: category.can_delete(),
            subcategory_count: category.subcategory_count(),
            total_item_count: category.total_item_count(),
        }
    }
}

/// GET /api/categories
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let filter = CategoryFilter {
        search: query.search,
        is_active: query.is_active,
    };

    let request = page.request();
    let (categories, total) = state.db.categories().list(store_id, &filter, request).await?;
    let summaries: Vec<CategorySummary> = categories.into_iter().map(CategorySummary::from).collect();
    Ok(ok(Page::new("categories", summaries, request, total)))
}

/// POST /api/categories
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(req): JsonBody<NewCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let mut category = Category::new(&req.name, req.description, store_id, Some(current.id.clone()))?;
    state.db.categories().create(&mut category).await?;

    info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(created(CategorySummary::from(category), "Category created"))
}

/// GET /api/categories/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let category = state.db.categories().get(store_id, &id).await?;
    Ok(ok(CategorySummary::from(category)))
}

/// PUT /api/categories/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<CategoryPatch>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let (category, ()) = state
        .db
        .categories()
        .modify(store_id, &id, Some(&current.id), |c| c.apply_patch(patch))
        .await?;
    Ok(ok_with_message(CategorySummary::from(category), "Category updated"))
}

/// DELETE /api/categories/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let category = state.db.categories().delete(store_id, &id).await?;
    info!(category_id = %category.id, "Category deleted");
    Ok(ok_with_message(DeletionCheck::from(&category), "Category deleted"))
}

/// GET /api/categories/{id}/can-delete
async fn can_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let category = state.db.categories().get(store_id, &id).await?;
    Ok(ok(DeletionCheck::from(&category)))
}

// =============================================================================
// Subcategories
// =============================================================================

/// POST /api/categories/{id}/subcategories
async fn add_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<SubcategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;
    let name = req.name.unwrap_or_default();

    let (_, subcategory) = state
        .db
        .categories()
        .modify(store_id, &id, Some(&current.id), |c| {
            c.add_subcategory(&name, req.description).cloned()
        })
        .await?;
    Ok(created(subcategory, "Subcategory added"))
}

/// PUT /api/categories/{id}/subcategories/{sub_id}
async fn update_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, sub_id)): Path<(String, String)>,
    JsonBody(req): JsonBody<SubcategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let (_, subcategory) = state
        .db
        .categories()
        .modify(store_id, &id, Some(&current.id), |c| {
            c.update_subcategory(&sub_id, req.name.as_deref(), req.description, req.is_active)
                .cloned()
        })
        .await?;
    Ok(ok_with_message(subcategory, "Subcategory updated"))
}

/// DELETE /api/categories/{id}/subcategories/{sub_id}
async fn delete_subcategory(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, sub_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let (category, removed) = state
        .db
        .categories()
        .modify(store_id, &id, Some(&current.id), |c| c.remove_subcategory(&sub_id))
        .await?;
    info!(category_id = %category.id, subcategory = %removed.name, "Subcategory deleted");
    Ok(ok_with_message(CategorySummary::from(category), "Subcategory deleted"))
}

// =============================================================================
// Items
// =============================================================================

/// POST /api/categories/{id}/subcategories/{sub_id}/items
async fn add_subcategory_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, sub_id)): Path<(String, String)>,
    JsonBody(item): JsonBody<NewItem>,
) -> ApiResult<impl IntoResponse> {
    let view = add_item(&state, &current, &id, Some(&sub_id), item).await?;
    Ok(created(view, "Item added"))
}

/// POST /api/categories/{id}/items
async fn add_category_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(item): JsonBody<NewItem>,
) -> ApiResult<impl IntoResponse> {
    let view = add_item(&state, &current, &id, None, item).await?;
    Ok(created(view, "Item added"))
}

async fn add_item(
    state: &AppState,
    current: &CurrentUser,
    category_id: &str,
    subcategory_id: Option<&str>,
    mut item: NewItem,
) -> ApiResult<ItemView> {
    current.require_inventory()?;
    let store_id = current.require_store()?;

    let store = state.db.stores().get(store_id).await?;
    let store = StoreRef {
        id: store.id,
        name: store.name,
    };
    item.validate()?;
    let stored = persist_images(&state.config.uploads_dir, &mut item.images).await?;

    let saved = state
        .db
        .categories()
        .modify(store_id, category_id, Some(&current.id), |c| {
            c.add_item(subcategory_id, item, Some(&store))
                .map(|added| added.id.clone())
        })
        .await;
    let (category, item_id) = match saved {
        Ok(saved) => saved,
        Err(e) => {
            stored.discard().await;
            return Err(e.into());
        }
    };

    info!(item_id = %item_id, category_id = %category.id, "Item added");
    view_of(&category, &item_id)
}

/// Read model of an item inside a freshly saved category.
pub(crate) fn view_of(category: &Category, item_id: &str) -> ApiResult<ItemView> {
    let location = category
        .find_item(item_id)
        .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
    Ok(ItemView::new(category, location.subcategory, location.item))
}
