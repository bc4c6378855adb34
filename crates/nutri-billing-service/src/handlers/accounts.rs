//! Account handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use nutri_billing_core::{Account, SettlementRecord, UserId};

use crate::auth::{AdminAuth, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for payment history.
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Largest page size for payment history.
const MAX_HISTORY_LIMIT: usize = 100;

/// Request to register a user.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// The bot-side user id.
    pub user_id: UserId,
}

/// Account plus whether this call created it.
#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    /// The account.
    pub account: Account,
    /// True only for the call that created the account.
    pub created: bool,
}

/// Get or create an account.
pub async fn create_account(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<Json<CreateAccountResponse>, ApiError> {
    let Json(request) = payload?;

    let (account, created) = state.ledger.get_or_create(&request.user_id).await?;

    Ok(Json(CreateAccountResponse { account, created }))
}

/// Get an account.
pub async fn get_account(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.ledger.account(&user_id).await?))
}

/// Spend one credit.
pub async fn debit(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let user_id = UserId::new(user_id)?;
    Ok(Json(state.ledger.debit_one(&user_id).await?))
}

/// Pagination for payment history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page size (default 20, max 100).
    #[serde(default)]
    pub limit: Option<usize>,
    /// Records to skip.
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Payment history page.
#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    /// Applied payments, newest first.
    pub payments: Vec<SettlementRecord>,
    /// Page size used.
    pub limit: usize,
    /// Records skipped.
    pub offset: usize,
}

/// List applied payments for a user.
pub async fn list_payments(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let payments = state
        .ledger
        .payment_history(&user_id, limit, offset)
        .await?;

    Ok(Json(PaymentsResponse {
        payments,
        limit,
        offset,
    }))
}

/// Request to grant free credits.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    /// Credits to add. Must be positive.
    pub credits: i64,
}

/// Grant free credits (admin).
pub async fn grant(
    auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<GrantRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(request) = payload?;
    let user_id = UserId::new(user_id)?;

    let account = state.ledger.grant(&user_id, request.credits).await?;

    tracing::info!(
        admin_id = %auth.admin_id,
        user_id = %user_id,
        credits = request.credits,
        "Admin granted credits"
    );

    Ok(Json(account))
}

/// Request to overwrite a balance.
#[derive(Debug, Deserialize)]
pub struct SetCreditsRequest {
    /// New balance. Must not be negative.
    pub credits_remaining: i64,
}

/// Overwrite a balance (admin).
pub async fn set_credits(
    auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    payload: Result<Json<SetCreditsRequest>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    let Json(request) = payload?;
    let user_id = UserId::new(user_id)?;

    let account = state
        .ledger
        .correct_balance(&user_id, request.credits_remaining)
        .await?;

    tracing::info!(
        admin_id = %auth.admin_id,
        user_id = %user_id,
        credits_remaining = request.credits_remaining,
        "Admin corrected balance"
    );

    Ok(Json(account))
}
