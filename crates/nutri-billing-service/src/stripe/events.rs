//! Mapping Stripe events to payment events.

use nutri_billing_core::{EventId, Gateway, PaymentEvent, PaymentStatus, PlanId, UserId};

use super::types::{CheckoutSession, Invoice, StripeEvent};
use super::StripeError;

/// Normalize a Stripe event.
///
/// Returns `Ok(None)` for event types that never move credits.
///
/// # Errors
///
/// Returns `StripeError::InvalidEvent` if a handled event lacks the user,
/// plan or amount, and `StripeError::Serialization` if its object has the
/// wrong shape.
pub fn payment_event(event: &StripeEvent) -> Result<Option<PaymentEvent>, StripeError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session = parse_session(event)?;
            let status = if session.is_paid() {
                PaymentStatus::Succeeded
            } else {
                PaymentStatus::Pending
            };
            from_session(&session, status).map(Some)
        }
        "checkout.session.async_payment_succeeded" => {
            from_session(&parse_session(event)?, PaymentStatus::Succeeded).map(Some)
        }
        "checkout.session.async_payment_failed" => {
            from_session(&parse_session(event)?, PaymentStatus::Failed).map(Some)
        }
        "invoice.paid" => {
            let invoice: Invoice = serde_json::from_value(event.data.object.clone())?;
            if invoice.is_subscription_create() {
                tracing::debug!(
                    invoice_id = %invoice.id,
                    "First subscription invoice is settled by its checkout session"
                );
                return Ok(None);
            }
            from_invoice(&invoice).map(Some)
        }
        _ => Ok(None),
    }
}

fn parse_session(event: &StripeEvent) -> Result<CheckoutSession, StripeError> {
    Ok(serde_json::from_value(event.data.object.clone())?)
}

fn from_session(
    session: &CheckoutSession,
    status: PaymentStatus,
) -> Result<PaymentEvent, StripeError> {
    let metadata = session.metadata.as_ref();
    let user_id = metadata
        .and_then(|m| m.get("user_id"))
        .or(session.client_reference_id.as_ref())
        .ok_or_else(|| missing(&session.id, "user_id"))?;
    let plan_id = metadata
        .and_then(|m| m.get("plan_id"))
        .ok_or_else(|| missing(&session.id, "plan_id"))?;
    let amount = session
        .amount_total
        .ok_or_else(|| missing(&session.id, "amount_total"))?;

    build(&session.id, user_id, plan_id, amount, status)
}

fn from_invoice(invoice: &Invoice) -> Result<PaymentEvent, StripeError> {
    let user_id = invoice
        .metadata_value("user_id")
        .ok_or_else(|| missing(&invoice.id, "user_id"))?;
    let plan_id = invoice
        .metadata_value("plan_id")
        .ok_or_else(|| missing(&invoice.id, "plan_id"))?;

    build(
        &invoice.id,
        user_id,
        plan_id,
        invoice.amount_paid,
        PaymentStatus::Succeeded,
    )
}

fn build(
    object_id: &str,
    user_id: &str,
    plan_id: &str,
    amount: i64,
    status: PaymentStatus,
) -> Result<PaymentEvent, StripeError> {
    let invalid = |e: nutri_billing_core::IdError| {
        StripeError::InvalidEvent(format!("{object_id}: {e}"))
    };

    Ok(PaymentEvent {
        event_id: EventId::new(object_id).map_err(invalid)?,
        user_id: UserId::new(user_id).map_err(invalid)?,
        plan_id: PlanId::new(plan_id).map_err(invalid)?,
        amount,
        gateway: Gateway::Stripe,
        status,
    })
}

fn missing(object_id: &str, field: &str) -> StripeError {
    StripeError::InvalidEvent(format!("{object_id}: missing {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn session(payment_status: &str) -> serde_json::Value {
        json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": payment_status,
            "amount_total": 9900,
            "client_reference_id": "123456789",
            "metadata": { "plan_id": "basic" }
        })
    }

    #[test]
    fn paid_checkout_is_succeeded() {
        let e = payment_event(&event("checkout.session.completed", session("paid")))
            .unwrap()
            .unwrap();
        assert_eq!(e.event_id.as_str(), "cs_test_1");
        assert_eq!(e.user_id.as_str(), "123456789");
        assert_eq!(e.plan_id.as_str(), "basic");
        assert_eq!(e.amount, 9900);
        assert_eq!(e.gateway, Gateway::Stripe);
        assert_eq!(e.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn unpaid_checkout_is_pending_then_async_result_decides() {
        let pending = payment_event(&event("checkout.session.completed", session("unpaid")))
            .unwrap()
            .unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);

        let ok = payment_event(&event(
            "checkout.session.async_payment_succeeded",
            session("paid"),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(ok.status, PaymentStatus::Succeeded);
        assert_eq!(ok.event_id, pending.event_id);

        let failed = payment_event(&event(
            "checkout.session.async_payment_failed",
            session("unpaid"),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
    }

    #[test]
    fn metadata_user_id_wins_over_client_reference() {
        let mut object = session("paid");
        object["metadata"]["user_id"] = json!("42");
        let e = payment_event(&event("checkout.session.completed", object))
            .unwrap()
            .unwrap();
        assert_eq!(e.user_id.as_str(), "42");
    }

    #[test]
    fn checkout_without_plan_is_invalid() {
        let mut object = session("paid");
        object["metadata"] = json!({});
        let err = payment_event(&event("checkout.session.completed", object)).unwrap_err();
        assert!(matches!(err, StripeError::InvalidEvent(msg) if msg.contains("plan_id")));
    }

    #[test]
    fn renewal_invoice_reads_subscription_metadata() {
        let object = json!({
            "id": "in_1",
            "amount_paid": 34900,
            "billing_reason": "subscription_cycle",
            "subscription_details": {
                "metadata": { "user_id": "77", "plan_id": "pro" }
            },
            "metadata": {}
        });
        let e = payment_event(&event("invoice.paid", object)).unwrap().unwrap();
        assert_eq!(e.event_id.as_str(), "in_1");
        assert_eq!(e.user_id.as_str(), "77");
        assert_eq!(e.plan_id.as_str(), "pro");
        assert_eq!(e.amount, 34900);
        assert_eq!(e.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn first_subscription_invoice_is_skipped() {
        let object = json!({
            "id": "in_2",
            "amount_paid": 34900,
            "billing_reason": "subscription_create",
            "subscription_details": {
                "metadata": { "user_id": "77", "plan_id": "pro" }
            }
        });
        assert!(payment_event(&event("invoice.paid", object)).unwrap().is_none());
    }

    #[test]
    fn unrelated_events_are_skipped() {
        let e = event("customer.created", json!({ "id": "cus_1" }));
        assert!(payment_event(&e).unwrap().is_none());
    }
}
