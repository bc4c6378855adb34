//! Webhook handlers for Stripe and YooKassa.
//!
//! Both normalize the notification into a `PaymentEvent` and hand it to the
//! same settlement path. Redeliveries are answered with 200 and
//! `already_processed`, so gateways stop retrying.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use nutri_billing_core::{PaymentEvent, SettlementResult};

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{self, StripeEvent};
use crate::yookassa::{self, Notification};

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
    /// Settlement outcome, absent for events that never move credits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementResult>,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(webhook_secret) = &state.config.stripe_webhook_secret {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

        stripe::verify_signature(&body, signature, webhook_secret).map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::BadRequest("Invalid webhook signature".into())
        })?;
    } else {
        tracing::warn!("Stripe webhook_secret not configured - skipping signature verification");
    }

    let webhook: StripeEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received Stripe webhook"
    );

    let event = stripe::payment_event(&webhook).map_err(|e| {
        tracing::warn!(error = %e, event_id = %webhook.id, "Unusable Stripe event");
        ApiError::BadRequest(e.to_string())
    })?;

    let Some(event) = event else {
        tracing::debug!(event_type = %webhook.event_type, "Unhandled Stripe event");
        return Ok(Json(WebhookResponse {
            received: true,
            settlement: None,
        }));
    };

    settle(&state, &event).await
}

/// Handle YooKassa notifications.
pub async fn yookassa_webhook(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let notification: Notification =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event = %notification.event,
        payment_id = %notification.object.id,
        "Received YooKassa notification"
    );

    if !notification.is_payment_event() {
        tracing::debug!(event = %notification.event, "Unhandled YooKassa event");
        return Ok(Json(WebhookResponse {
            received: true,
            settlement: None,
        }));
    }

    let payment = if let Some(client) = &state.yookassa {
        client
            .get_payment(&notification.object.id)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    payment_id = %notification.object.id,
                    "Failed to verify YooKassa payment"
                );
                ApiError::ExternalService("Failed to verify payment with YooKassa".into())
            })?
    } else if state.config.accepts_unverified_yookassa() {
        notification.object
    } else {
        tracing::error!(
            payment_id = %notification.object.id,
            "YooKassa credentials not configured - refusing unverified notification"
        );
        return Err(ApiError::ServiceUnavailable(
            "YooKassa payment verification is not configured".into(),
        ));
    };

    let event = yookassa::payment_event(&payment).map_err(|e| {
        tracing::warn!(error = %e, payment_id = %payment.id, "Unusable YooKassa payment");
        ApiError::BadRequest(e.to_string())
    })?;

    settle(&state, &event).await
}

async fn settle(state: &AppState, event: &PaymentEvent) -> Result<Json<WebhookResponse>, ApiError> {
    let result = state.settlement.settle(event).await?;

    Ok(Json(WebhookResponse {
        received: true,
        settlement: Some(result),
    }))
}
