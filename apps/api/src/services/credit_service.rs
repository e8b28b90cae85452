//! Supplier credit endpoints.
//!
//! A credit is the amount owed to a supplier for one purchase order. Its
//! ledger tracks amendments to the amount and every payment made against it.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use stockroom_core::ledger::{Credit, CreditTerms};
use stockroom_core::{CreditStatus, Money};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{created, ok, ok_with_message, JsonBody, Page, PageQuery};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/credits", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/totals", get(totals))
        .route("/purchase-order/{po_id}", get(get_by_purchase_order))
        .route("/{id}", get(get_by_id))
        .route("/{id}/amount", put(amend_amount))
        .route("/{id}/payments", post(record_payment))
}

#[derive(Debug, Deserialize)]
pub struct CreditQuery {
    pub status: Option<String>,
}

impl CreditQuery {
    pub(crate) fn status(&self) -> ApiResult<Option<CreditStatus>> {
        match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(value) => CreditStatus::parse(value)
                .map(Some)
                .ok_or_else(|| ApiError::validation("status", format!("Unknown credit status '{}'", value))),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCreditRequest {
    pub purchase_order_id: String,
    /// Defaults to the order total.
    pub amount_cents: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendAmountRequest {
    pub new_amount_cents: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount_cents: i64,
    pub notes: Option<String>,
}

/// GET /api/credits
async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<CreditQuery>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    let status = query.status()?;

    let request = page.request();
    let (credits, total) = state.db.credits().list(store_id, status, request).await?;
    Ok(ok(Page::new("credits", credits, request, total)))
}

/// POST /api/credits
async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(req): JsonBody<NewCreditRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let order = state
        .db
        .purchase_orders()
        .get(store_id, &req.purchase_order_id)
        .await?;

    let credit = Credit::new(
        &order.id,
        &order.po_number,
        &order.supplier_id,
        &order.supplier_name,
        store_id,
        CreditTerms {
            amount_cents: req.amount_cents.unwrap_or(order.total_cents),
            due_date: req.due_date,
            notes: req.notes,
            created_by: Some(current.id.clone()),
        },
    )?;
    state.db.credits().create(&credit).await?;

    Ok(created(credit, "Credit created"))
}

/// GET /api/credits/totals
async fn totals(State(state): State<AppState>, current: CurrentUser) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.credits().totals(store_id).await?))
}

/// GET /api/credits/purchase-order/{po_id}
async fn get_by_purchase_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(po_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.credits().get_by_purchase_order(store_id, &po_id).await?))
}

/// GET /api/credits/{id}
async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store_id = current.require_store()?;
    Ok(ok(state.db.credits().get(store_id, &id).await?))
}

/// PUT /api/credits/{id}/amount
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
        .credits()
        .modify(store_id, &id, |ledger| {
            ledger.amend(req.new_amount_cents, req.notes, changed_by)
        })
        .await?;

    info!(credit_id = %credit.id, amount = req.new_amount_cents, "Credit amount amended");
    Ok(ok_with_message(credit, "Credit amount updated"))
}

/// POST /api/credits/{id}/payments
async fn record_payment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    current.require_manager()?;
    let store_id = current.require_store()?;

    let paid_by = Some(current.id.clone());
    let (credit, applied) = state
        .db
        .credits()
        .modify(store_id, &id, |ledger| ledger.pay(req.amount_cents, req.notes, paid_by))
        .await?;

    info!(
        credit_id = %credit.id,
        applied,
        balance = credit.ledger.balance_amount_cents,
        "Credit payment recorded"
    );
    Ok(ok_with_message(
        credit,
        format!("Payment of {} recorded", Money::from_cents(applied)),
    ))
}
