//! Authentication endpoints.
//!
//! ## Routes
//! ```text
//! POST /api/auth/register          first user → admin, later ones need an admin
//! POST /api/auth/login             email + password → token (+ cookie)
//! POST /api/auth/logout            clears the cookie
//! GET  /api/auth/me                profile, stores, selected store
//! POST /api/auth/select-store      re-issues the token bound to a store
//! POST /api/auth/change-password
//! ```

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockroom_core::{NewUser, PageRequest, Role, Store, User, MAX_PAGE_SIZE};
use stockroom_db::password::verify_password;

use crate::auth::{clear_token_cookie, token_cookie, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::response::{created, message, ok, ok_with_message, JsonBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/auth", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/select-store", post(select_store))
        .route("/change-password", post(change_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectStoreRequest {
    pub store_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
    pub stores: Vec<Store>,
    pub selected_store_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: User,
    pub stores: Vec<Store>,
    pub selected_store_id: Option<String>,
}

/// Stores a user may work in: every store for admins, memberships otherwise.
async fn accessible_stores(state: &AppState, user: &User) -> ApiResult<Vec<Store>> {
    if user.role.is_admin() {
        let (stores, _) = state
            .db
            .stores()
            .list(PageRequest::new(Some(1), Some(MAX_PAGE_SIZE)))
            .await?;
        Ok(stores)
    } else {
        Ok(state.db.stores().by_ids(&user.stores).await?)
    }
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    caller: Option<CurrentUser>,
    JsonBody(input): JsonBody<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let role = if state.db.users().count().await? == 0 {
        info!(email = %input.email, "Registering first user as admin");
        Role::Admin
    } else {
        let caller = caller.ok_or_else(ApiError::unauthorized)?;
        caller.require_admin()?;
        input.role.unwrap_or_default()
    };

    let user = state.db.users().create(&input, role).await?;
    Ok(created(user, "User registered"))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(user) = state.db.users().find_by_email(&req.email).await? else {
        warn!(email = %req.email, "Login for unknown email");
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::invalid_credentials());
    }
    if !user.is_active {
        warn!(user_id = %user.id, "Login to disabled account");
        return Err(ApiError::Forbidden("Account is disabled".to_string()));
    }

    state.db.users().record_login(&user.id).await?;

    let stores = accessible_stores(&state, &user).await?;
    // A single membership is selected straight away
    let selected = match stores.as_slice() {
        [only] if !user.role.is_admin() && only.is_active => Some(only.id.clone()),
        _ => None,
    };

    let token = state.jwt.issue(&user, selected.as_deref())?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok((
        [(SET_COOKIE, token_cookie(&token, state.jwt.lifetime_secs()))],
        ok_with_message(
            SessionResponse {
                token,
                user,
                stores,
                selected_store_id: selected,
            },
            "Login successful",
        ),
    ))
}

/// POST /api/auth/logout
async fn logout() -> impl IntoResponse {
    ([(SET_COOKIE, clear_token_cookie())], message("Logged out"))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, current: CurrentUser) -> ApiResult<impl IntoResponse> {
    let user = state.db.users().get(&current.id).await?;
    let stores = accessible_stores(&state, &user).await?;

    Ok(ok(ProfileResponse {
        user,
        stores,
        selected_store_id: current.store_id,
    }))
}

/// POST /api/auth/select-store
async fn select_store(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(req): JsonBody<SelectStoreRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.db.users().get(&current.id).await?;
    let store = state.db.stores().get(&req.store_id).await?;

    if !store.is_active {
        return Err(ApiError::bad_request("Store is not active"));
    }
    if !user.role.is_admin() && !user.belongs_to(&store.id) {
        warn!(user_id = %user.id, store_id = %store.id, "Store selection outside membership");
        return Err(ApiError::Forbidden("You do not have access to this store".to_string()));
    }

    let token = state.jwt.issue(&user, Some(&store.id))?;
    info!(user_id = %user.id, store_id = %store.id, "Store selected");

    let stores = accessible_stores(&state, &user).await?;
    Ok((
        [(SET_COOKIE, token_cookie(&token, state.jwt.lifetime_secs()))],
        ok_with_message(
            SessionResponse {
                token,
                user,
                stores,
                selected_store_id: Some(store.id),
            },
            format!("Switched to {}", store.name),
        ),
    ))
}

/// POST /api/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state.db.users().get(&current.id).await?;
    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(ApiError::validation(
            "currentPassword",
            "Current password is incorrect",
        ));
    }

    state.db.users().set_password(&user.id, &req.new_password).await?;
    info!(user_id = %user.id, "Password changed");
    Ok(message("Password changed"))
}
