//! Store endpoints. Reads for any member, writes for admins.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

use stockroom_core::StoreInput;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, message, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/stores", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/stores
///
/// Admins page through every store; everyone else sees their memberships.
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let request = page.request();

    if current.role.is_admin() {
        let (stores, total) = state.db.stores().list(request).await?;
        return Ok(ok(Page::new("stores", stores, request, total)));
    }

    let user = state.db.users().get(&current.id).await?;
    let stores = state.db.stores().by_ids(&user.stores).await?;
    let total = stores.len() as u64;
    Ok(ok(Page::new("stores", request.slice(&stores), request, total)))
}

/// POST /api/stores
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<StoreInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;

    let store = state.db.stores().create(&input).await?;
    info!(store_id = %store.id, code = %store.code, "Store created");
    Ok(created(store, "Store created"))
}

/// GET /api/stores/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !current.role.is_admin() {
        let user = state.db.users().get(&current.id).await?;
        if !user.belongs_to(&id) {
            return Err(ApiError::Forbidden("You do not have access to this store".to_string()));
        }
    }
    Ok(ok(state.db.stores().get(&id).await?))
}

/// PUT /api/stores/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<StoreInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;
    let store = state.db.stores().update(&id, &input).await?;
    Ok(ok_with_message(store, "Store updated"))
}

/// DELETE /api/stores/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;
    state.db.stores().delete(&id).await?;
    Ok(message("Store deleted"))
}
