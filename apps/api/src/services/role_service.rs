//! Role catalogue.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use stockroom_core::{Role, RoleInfo};

use crate::auth::CurrentUser;
use crate::response::ok;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/roles", get(list))
}

/// GET /api/roles
async fn list(_current: CurrentUser) -> impl IntoResponse {
    let roles: Vec<RoleInfo> = Role::ALL.into_iter().map(RoleInfo::from).collect();
    ok(roles)
}
