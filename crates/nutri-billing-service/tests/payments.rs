//! Payment endpoint integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

fn telegram_payment(charge_id: &str, payload: &str, amount: i64) -> serde_json::Value {
    json!({
        "currency": "RUB",
        "total_amount": amount,
        "invoice_payload": payload,
        "telegram_payment_charge_id": charge_id,
        "provider_payment_charge_id": "yk_provider_1"
    })
}

// ============================================================================
// Normalized events
// ============================================================================

#[tokio::test]
async fn normalized_event_settles_once() {
    let harness = TestHarness::new();
    harness.register("u1").await;

    let event = json!({
        "event_id": "renewal_2024_01",
        "user_id": "u1",
        "plan_id": "basic",
        "amount": 9900,
        "gateway": "stripe",
        "status": "succeeded"
    });

    let response = harness.bot_post("/v1/payments").json(&event).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "applied");
    assert_eq!(body["new_balance"], 23);
    assert_eq!(body["credits_granted"], 20);

    let response = harness.bot_post("/v1/payments").json(&event).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "already_processed");

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 23);
    assert_eq!(account["total_paid"], 9900);
}

#[tokio::test]
async fn pending_event_is_ignored() {
    let harness = TestHarness::new();
    harness.register("u1").await;

    let response = harness
        .bot_post("/v1/payments")
        .json(&json!({
            "event_id": "evt_pending",
            "user_id": "u1",
            "plan_id": "basic",
            "amount": 9900,
            "gateway": "yookassa",
            "status": "pending"
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "ignored");

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
}

#[tokio::test]
async fn unknown_plan_is_server_error() {
    let harness = TestHarness::new();
    harness.register("u1").await;

    let response = harness
        .bot_post("/v1/payments")
        .json(&json!({
            "event_id": "evt_x",
            "user_id": "u1",
            "plan_id": "nonexistent",
            "amount": 9900,
            "gateway": "stripe",
            "status": "succeeded"
        }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unknown_plan");
    assert_eq!(body["error"]["details"]["plan_id"], "nonexistent");

    let account = harness.account("u1").await;
    assert_eq!(account["credits_remaining"], 3);
    assert_eq!(account["total_paid"], 0);
}

#[tokio::test]
async fn unknown_gateway_is_bad_request() {
    let harness = TestHarness::new();

    let response = harness
        .bot_post("/v1/payments")
        .json(&json!({
            "event_id": "evt_x",
            "user_id": "u1",
            "plan_id": "basic",
            "amount": 9900,
            "gateway": "paypal",
            "status": "succeeded"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// ============================================================================
// Telegram Payments
// ============================================================================

#[tokio::test]
async fn telegram_payment_credits_user() {
    let harness = TestHarness::new();
    harness.register("42").await;

    let payment = telegram_payment("tg_charge_1", "credits_pro_42", 34900);

    let response = harness
        .bot_post("/v1/payments/telegram")
        .json(&payment)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "applied");
    assert_eq!(body["new_balance"], 103);

    // The bot retries after a timeout
    let response = harness
        .bot_post("/v1/payments/telegram")
        .json(&payment)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"], "already_processed");

    let response = harness.bot_get("/v1/accounts/42/payments").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let payments = body["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["gateway"], "telegram_payments");
    assert_eq!(payments[0]["event_id"], "tg_charge_1");
    assert_eq!(payments[0]["plan_id"], "pro");
    assert_eq!(payments[0]["amount"], 34900);
    assert_eq!(payments[0]["credits_granted"], 100);
}

#[tokio::test]
async fn telegram_payment_with_bad_payload_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .bot_post("/v1/payments/telegram")
        .json(&telegram_payment("tg_charge_2", "subscription_42", 9900))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn pre_checkout_checks_plan_and_amount() {
    let harness = TestHarness::new();

    let query = |payload: &str, amount: i64| {
        json!({
            "id": "query_1",
            "currency": "RUB",
            "total_amount": amount,
            "invoice_payload": payload
        })
    };

    let response = harness
        .bot_post("/v1/payments/telegram/pre-checkout")
        .json(&query("credits_basic_42", 9900))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["id"], "query_1");
    assert!(body.get("error_message").is_none());

    let response = harness
        .bot_post("/v1/payments/telegram/pre-checkout")
        .json(&query("credits_basic_42", 100))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error_message"], "Invalid payment amount");

    let response = harness
        .bot_post("/v1/payments/telegram/pre-checkout")
        .json(&query("credits_gold_42", 9900))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error_message"], "Unknown plan");

    // Validation never touches the ledger
    let response = harness.bot_get("/v1/accounts/42").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn payments_require_api_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/payments/telegram")
        .json(&telegram_payment("tg_charge_3", "credits_basic_42", 9900))
        .await;
    response.assert_status_unauthorized();
}
