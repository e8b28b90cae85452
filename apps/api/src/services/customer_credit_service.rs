//! Customer credit endpoints.
//!
//! Credit sales open one automatically; the create route covers bills
//! settled another way that are later moved onto account.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use stockroom_core::ledger::{CreditTerms, CustomerCredit};
use stockroom_core::Money;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::services::credit_service::{AmendAmountRequest, CreditQuery, PaymentRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/customer-credits", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/totals", get(totals))
        .route("/bill/{bill_id}", get(get_by_bill))
        .route("/{id}", get(get_by_id))
        .route("/{id}/amount", put(amend_amount))
        .route("/{id}/payments", post(record_payment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerCreditRequest {
    pub bill_id: String,
    /// Defaults to the bill total.
    pub amount_cents: Option<i64>,
    /// Falls back to the name on the bill.
    pub customer_name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// GET /api/customer-credits
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<CreditQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let status = query.status()?;

    let request = page.request();
    let (credits, total) = state
        .db
        .customer_credits()
        .list(store_id, status, request)
        .await?;
    Ok(ok(Page::new("customerCredits", credits, request, total)))
}

/// POST /api/customer-credits
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(req): JsonBody<NewCustomerCreditRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let bill = state.db.bills().get(store_id, &req.bill_id).await?;
    let customer_name = req
        .customer_name
        .or(bill.customer_name)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::validation("customerName", "Customer name is required"))?;

    let credit = CustomerCredit::new(
        &bill.id,
        &bill.bill_number,
        &customer_name,
        bill.customer_phone,
        store_id,
        CreditTerms {
            amount_cents: req.amount_cents.unwrap_or(bill.total_cents),
            due_date: req.due_date,
            notes: req.notes,
            created_by: Some(current.id.clone()),
        },
    )?;
    state.db.customer_credits().create(&credit).await?;

    info!(bill_number = %credit.bill_number, "Customer credit opened");
    Ok(created(credit, "Customer credit created"))
}

/// GET /api/customer-credits/totals
async fn totals(State(state): State<AppState>, current: CurrentUser) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.customer_credits().totals(store_id).await?))
}

/// GET /api/customer-credits/bill/{bill_id}
async fn get_by_bill(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(bill_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.customer_credits().get_by_bill(store_id, &bill_id).await?))
}

/// GET /api/customer-credits/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.customer_credits().get(store_id, &id).await?))
}

/// PUT /api/customer-credits/{id}/amount
async fn amend_amount(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AmendAmountRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let changed_by = Some(current.id.clone());
    let (credit, ()) = state
        .db
        .customer_credits()
        .modify(store_id, &id, |ledger| {
            ledger.amend(req.new_amount_cents, req.notes, changed_by)
        })
        .await?;
    Ok(ok_with_message(credit, "Customer credit amount updated"))
}

/// POST /api/customer-credits/{id}/payments
///
/// Open to every role, cashiers included.
async fn record_payment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;

    let paid_by = Some(current.id.clone());
    let (credit, applied) = state
        .db
        .customer_credits()
        .modify(store_id, &id, |ledger| ledger.pay(req.amount_cents, req.notes, paid_by))
        .await?;

    info!(credit_id = %credit.id, applied, "Customer payment recorded");
    Ok(ok_with_message(
        credit,
        format!("Payment of {} recorded", Money::from_cents(applied)),
    ))
}
