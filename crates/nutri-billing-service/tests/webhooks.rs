//! Gateway webhook integration tests.

mod common;

use axum::http::StatusCode;
use common::{header, TestHarness, STRIPE_SECRET};
use nutri_billing_service::stripe::signature::sign;
use serde_json::json;
use wiremock::matchers::{basic_auth, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn signed_harness() -> TestHarness {
    TestHarness::with_config(|c| c.stripe_webhook_secret = Some(STRIPE_SECRET.into()))
}

fn checkout_completed(session_id: &str, user_id: &str, plan_id: &str, amount: i64) -> String {
    json!({
        "id": format!("evt_{session_id}"),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "amount_total": amount,
                "client_reference_id": user_id,
                "metadata": { "plan_id": plan_id }
            }
        }
    })
    .to_string()
}

async fn post_stripe(harness: &TestHarness, body: &str, signature: &str) -> axum_test::TestResponse {
    let (name, value) = header("stripe-signature", signature);
    harness
        .server
        .post("/webhooks/stripe")
        .add_header(name, value)
        .text(body.to_string())
        .await
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Stripe
// ============================================================================

#[tokio::test]
async fn stripe_checkout_settles_once_across_redeliveries() {
    let harness = signed_harness();
    harness.register("u1").await;

    let body = checkout_completed("cs_test_1", "u1", "basic", 9900);

    let response = post_stripe(&harness, &body, &sign(&body, STRIPE_SECRET, now())).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["received"], true);
    assert_eq!(json["settlement"]["result"], "applied");
    assert_eq!(json["settlement"]["new_balance"], 23);

    // Stripe redelivers with a fresh signature
    for _ in 0..3 {
        let response = post_stripe(&harness, &body, &sign(&body, STRIPE_SECRET, now())).await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["settlement"]["result"], "already_processed");
    }

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 23);
    assert_eq!(account["total_paid"], 9900);
}

#[tokio::test]
async fn stripe_rejects_bad_signature() {
    let harness = signed_harness();
    harness.register("u1").await;

    let body = checkout_completed("cs_test_2", "u1", "basic", 9900);

    let forged = sign(&body, "whsec_attacker", now());
    let response = post_stripe(&harness, &body, &forged).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let stale = sign(&body, STRIPE_SECRET, now() - 3600);
    let response = post_stripe(&harness, &body, &stale).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = harness
        .server
        .post("/webhooks/stripe")
        .text(body.clone())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
}

#[tokio::test]
async fn stripe_unhandled_event_is_acknowledged() {
    let harness = signed_harness();

    let body = json!({
        "id": "evt_cus",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();

    let response = post_stripe(&harness, &body, &sign(&body, STRIPE_SECRET, now())).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["received"], true);
    assert!(json.get("settlement").is_none());
}

#[tokio::test]
async fn stripe_renewal_invoice_credits_subscriber() {
    let harness = signed_harness();
    harness.register("u1").await;

    let body = json!({
        "id": "evt_inv",
        "type": "invoice.paid",
        "data": {
            "object": {
                "id": "in_renewal_1",
                "amount_paid": 34900,
                "billing_reason": "subscription_cycle",
                "subscription_details": {
                    "metadata": { "user_id": "u1", "plan_id": "pro" }
                }
            }
        }
    })
    .to_string();

    let response = post_stripe(&harness, &body, &sign(&body, STRIPE_SECRET, now())).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "applied");
    assert_eq!(json["settlement"]["credits_granted"], 100);
}

#[tokio::test]
async fn stripe_unknown_plan_asks_for_retry() {
    let harness = signed_harness();
    harness.register("u1").await;

    let body = checkout_completed("cs_test_3", "u1", "platinum", 9900);
    let response = post_stripe(&harness, &body, &sign(&body, STRIPE_SECRET, now())).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"]["code"], "unknown_plan");
}

#[tokio::test]
async fn stripe_without_secret_skips_verification() {
    let harness = TestHarness::new();

    let body = checkout_completed("cs_test_4", "newcomer", "basic", 9900);
    let response = harness
        .server
        .post("/webhooks/stripe")
        .text(body)
        .await;
    response.assert_status_ok();

    let account = harness.account("newcomer").await;
    assert_eq!(account["credits_remaining"], 23);
}

// ============================================================================
// YooKassa
// ============================================================================

fn yookassa_payment(id: &str, status: &str, value: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "paid": status == "succeeded",
        "amount": { "value": value, "currency": "RUB" },
        "metadata": { "user_id": "u1", "plan_id": "basic", "credits_count": "20" }
    })
}

fn notification(event: &str, payment: serde_json::Value) -> serde_json::Value {
    json!({ "type": "notification", "event": event, "object": payment })
}

#[tokio::test]
async fn yookassa_notification_settles_once() {
    let harness = TestHarness::new();
    harness.register("u1").await;

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_1", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "applied");
    assert_eq!(json["settlement"]["new_balance"], 23);

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "already_processed");

    let account = harness.account("u1").await;
    assert_eq!(account["total_paid"], 9900);
}

#[tokio::test]
async fn yookassa_canceled_payment_is_ignored() {
    let harness = TestHarness::new();
    harness.register("u1").await;

    let body = notification(
        "payment.canceled",
        yookassa_payment("pay_2", "canceled", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "ignored");
}

#[tokio::test]
async fn yookassa_bad_amount_is_rejected() {
    let harness = TestHarness::new();

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_3", "succeeded", "99.001"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn yookassa_refund_events_are_acknowledged() {
    let harness = TestHarness::new();

    let body = notification(
        "refund.succeeded",
        yookassa_payment("rf_1", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert!(json.get("settlement").is_none());
}

#[tokio::test]
async fn yookassa_unverified_notification_refused_at_live_prices() {
    let harness = TestHarness::with_config(|c| c.environment = Some("production".into()));
    harness.register("u1").await;

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_forged", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"]["code"], "service_unavailable");

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
    assert_eq!(account["total_paid"], 0);
}

#[tokio::test]
async fn yookassa_unverified_notification_allowed_when_opted_in() {
    let harness = TestHarness::with_config(|c| {
        c.environment = Some("production".into());
        c.yookassa_allow_unverified = Some(true);
    });
    harness.register("u1").await;

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_opt_in", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "applied");
}

#[tokio::test]
async fn yookassa_trusts_fetched_payment_over_notification() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_4"))
        .and(basic_auth("shop_1", "secret_1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(yookassa_payment("pay_4", "pending", "99.00")),
        )
        .expect(1)
        .mount(&mock)
        .await;

    let uri = mock.uri();
    let harness = TestHarness::with_config(move |c| {
        c.yookassa_shop_id = Some("shop_1".into());
        c.yookassa_secret_key = Some("secret_1".into());
        c.yookassa_api_url = uri;
    });
    harness.register("u1").await;

    // A forged "succeeded" notification for a payment YooKassa reports pending
    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_4", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "ignored");

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
}

#[tokio::test]
async fn yookassa_verified_payment_settles() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(yookassa_payment("pay_5", "succeeded", "99.00")),
        )
        .mount(&mock)
        .await;

    let uri = mock.uri();
    let harness = TestHarness::with_config(move |c| {
        c.yookassa_shop_id = Some("shop_1".into());
        c.yookassa_secret_key = Some("secret_1".into());
        c.yookassa_api_url = uri;
    });
    harness.register("u1").await;

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_5", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["settlement"]["result"], "applied");
    assert_eq!(json["settlement"]["credits_granted"], 20);
}

#[tokio::test]
async fn yookassa_api_failure_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_6"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "type": "error",
            "code": "not_found",
            "description": "Payment not found"
        })))
        .mount(&mock)
        .await;

    let uri = mock.uri();
    let harness = TestHarness::with_config(move |c| {
        c.yookassa_shop_id = Some("shop_1".into());
        c.yookassa_secret_key = Some("secret_1".into());
        c.yookassa_api_url = uri;
    });
    harness.register("u1").await;

    let body = notification(
        "payment.succeeded",
        yookassa_payment("pay_6", "succeeded", "99.00"),
    );

    let response = harness.server.post("/webhooks/yookassa").json(&body).await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
}
