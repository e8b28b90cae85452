//! Department endpoints. Anyone signed in may read; admins edit.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use stockroom_core::DepartmentInput;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, message, ok, ok_with_message, JsonBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/departments", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
}

/// GET /api/departments
async fn list(State(state): State<AppState>, _current: CurrentUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.db.departments().list().await?))
}

/// POST /api/departments
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<DepartmentInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;
    let department = state.db.departments().create(&input).await?;
    Ok(created(department, "Department created"))
}

/// GET /api/departments/{id}
async fn get_by_id(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.db.departments().get(&id).await?))
}

/// PUT /api/departments/{id}
async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<DepartmentInput>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;
    let department = state.db.departments().update(&id, &input).await?;
    Ok(ok_with_message(department, "Department updated"))
}

/// DELETE /api/departments/{id}
async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    current.require_admin()?;
    state.db.departments().delete(&id).await?;
    Ok(message("Department deleted"))
}
