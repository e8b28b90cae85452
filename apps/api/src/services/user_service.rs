//! User management endpoints (admin and manager).

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;
use tracing::info;

use stockroom_core::{NewUser, Role, UserUpdate};
use stockroom_db::UserFilter;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, message, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/stores", put(assign_stores))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignStoresRequest {
    pub store_ids: Vec<String>,
}

/// Managers may not create, promote to or edit admins.
fn ensure_can_grant(current: &CurrentUser, role: Role) -> ApiResult<()> {
    if role.is_admin() {
        current.require_admin()?;
    }
    Ok(())
}

/// GET /api/users
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;

    let role = match query.role.as_deref().filter(|r| !r.is_empty()) {
        Some(value) => Some(
            Role::parse(value)
                .ok_or_else(|| ApiError::validation("role", format!("Unknown role '{}'", value)))?,
        ),
        None => None,
    };
    let filter = UserFilter {
        search: query.search,
        role,
    };

    let request = page.request();
    let (users, total) = state.db.users().list(&filter, request).await?;
    Ok(ok(Page::new("users", users, request, total)))
}

/// POST /api/users
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<NewUser>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let role = input.role.unwrap_or_default();
    ensure_can_grant(&current, role)?;

    let user = state.db.users().create(&input, role).await?;
    info!(created_by = %current.id, user_id = %user.id, "User created");
    Ok(created(user, "User created"))
}

/// GET /api/users/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if current.id != id {
        current.require_manager()?;
    }
    Ok(ok(state.db.users().get(&id).await?))
}

/// PUT /api/users/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<UserUpdate>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;

    let existing = state.db.users().get(&id).await?;
    ensure_can_grant(&current, existing.role)?;
    if let Some(role) = input.role {
        ensure_can_grant(&current, role)?;
    }

    let user = state.db.users().update(&id, &input).await?;
    Ok(ok_with_message(user, "User updated"))
}

/// DELETE /api/users/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    if current.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let existing = state.db.users().get(&id).await?;
    ensure_can_grant(&current, existing.role)?;

    state.db.users().delete(&id).await?;
    Ok(message("User deleted"))
}

/// PUT /api/users/{id}/stores
async fn assign_stores(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignStoresRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;

    let user = state.db.users().set_stores(&id, &req.store_ids).await?;
    info!(user_id = %id, stores = user.stores.len(), "Store membership updated");
    Ok(ok_with_message(user, "Stores assigned"))
}
