//! Payment handlers for the bot and internal producers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use nutri_billing_core::{PaymentEvent, SettlementResult};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::telegram::{PreCheckoutAnswer, PreCheckoutQuery, SuccessfulPayment};

/// Settle a normalized payment event.
pub async fn settle_payment(
    auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PaymentEvent>, JsonRejection>,
) -> Result<Json<SettlementResult>, ApiError> {
    let Json(event) = payload?;

    tracing::info!(
        service = %auth.service_name,
        gateway = %event.gateway,
        event_id = %event.event_id,
        "Received payment event"
    );

    Ok(Json(state.settlement.settle(&event).await?))
}

/// Settle a Telegram `successful_payment` forwarded by the bot.
pub async fn telegram_payment(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SuccessfulPayment>, JsonRejection>,
) -> Result<Json<SettlementResult>, ApiError> {
    let Json(payment) = payload?;

    let event = payment.to_payment_event().map_err(|e| {
        tracing::warn!(
            error = %e,
            charge_id = %payment.telegram_payment_charge_id,
            "Rejected Telegram payment"
        );
        ApiError::BadRequest(e.to_string())
    })?;

    tracing::info!(
        charge_id = %event.event_id,
        user_id = %event.user_id,
        plan_id = %event.plan_id,
        amount = event.amount,
        currency = %payment.currency,
        "Received Telegram payment"
    );

    Ok(Json(state.settlement.settle(&event).await?))
}

/// Validate a Telegram `pre_checkout_query` before the charge.
pub async fn telegram_pre_checkout(
    _auth: ServiceAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PreCheckoutQuery>, JsonRejection>,
) -> Result<Json<PreCheckoutAnswer>, ApiError> {
    let Json(query) = payload?;

    let answer = query.check(state.catalog());
    if answer.ok {
        tracing::debug!(payload = %query.invoice_payload, "Pre-checkout accepted");
    } else {
        tracing::warn!(
            payload = %query.invoice_payload,
            total_amount = query.total_amount,
            currency = %query.currency,
            reason = ?answer.error_message,
            "Pre-checkout rejected"
        );
    }

    Ok(Json(answer))
}
