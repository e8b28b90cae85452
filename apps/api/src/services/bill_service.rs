//! Bill endpoints.
//!
//! Bills are written once. Creating one deducts stock from the catalog and,
//! for credit sales, opens a customer credit in the same transaction.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tracing::info;

use stockroom_core::ledger::CustomerCredit;
use stockroom_core::{Bill, NewBill};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::response::{created, ok, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/bills", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillCreated {
    pub bill: Bill,
    pub customer_credit: Option<CustomerCredit>,
}

/// GET /api/bills
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;

    let request = page.request();
    let (bills, total) = state.db.bills().list(store_id, request).await?;
    Ok(ok(Page::new("bills", bills, request, total)))
}

/// POST /api/bills
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(input): JsonBody<NewBill>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;

    let (bill, customer_credit) = state
        .db
        .bills()
        .create(store_id, input, Some(&current.id))
        .await?;

    info!(
        bill_number = %bill.bill_number,
        total = bill.total_cents,
        on_credit = customer_credit.is_some(),
        "Bill created"
    );
    Ok(created(
        BillCreated {
            bill,
            customer_credit,
        },
        "Bill created",
    ))
}

/// GET /api/bills/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.bills().get(store_id, &id).await?))
}
