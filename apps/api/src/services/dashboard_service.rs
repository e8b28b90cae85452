//! Dashboard summary for the selected store.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::ok;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/summary", get(summary))
}

/// GET /api/dashboard/summary
async fn summary(State(state): State<AppState>, current: CurrentUser) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.dashboard().summary(store_id).await?))
}
