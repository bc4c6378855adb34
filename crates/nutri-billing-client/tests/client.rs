//! Client integration tests against a mocked nutri-billing API.

use nutri_billing_client::{
    ClientError, ClientOptions, EventId, Gateway, NutriBillingClient, PaymentEvent,
    PaymentStatus, PlanId, PreCheckoutQuery, SettlementResult, TelegramPayment, UserId,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-service-key";

fn account_json(user_id: &str, credits: i64, total_paid: i64) -> serde_json::Value {
    let now = chrono::Utc::now().to_rfc3339();
    json!({
        "user_id": user_id,
        "credits_remaining": credits,
        "total_paid": total_paid,
        "created_at": now,
        "updated_at": now
    })
}

fn error_json(code: &str, message: &str, details: serde_json::Value) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message, "details": details } })
}

fn client_for(server: &MockServer) -> NutriBillingClient {
    NutriBillingClient::with_options(
        &server.uri(),
        API_KEY,
        ClientOptions::with_service_name("telegram-bot"),
    )
    .unwrap()
}

#[tokio::test]
async fn get_or_create_account_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts"))
        .and(header("x-api-key", API_KEY))
        .and(header("x-service-name", "telegram-bot"))
        .and(body_json(json!({ "user_id": "42" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "account": account_json("42", 3, 0),
            "created": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registered = client_for(&server).get_or_create_account("42").await.unwrap();

    assert!(registered.created);
    assert_eq!(registered.account.user_id.as_str(), "42");
    assert_eq!(registered.account.credits_remaining, 3);
}

#[tokio::test]
async fn debit_maps_payment_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/42/debit"))
        .respond_with(ResponseTemplate::new(402).set_body_json(error_json(
            "insufficient_credits",
            "Insufficient credits",
            json!({ "balance": 0, "required": 1 }),
        )))
        .mount(&server)
        .await;

    let err = client_for(&server).debit_one("42").await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::InsufficientCredits {
            balance: 0,
            required: 1
        }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn debit_returns_updated_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts/42/debit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json("42", 2, 0)))
        .mount(&server)
        .await;

    let account = client_for(&server).debit_one("42").await.unwrap();
    assert_eq!(account.credits_remaining, 2);
}

#[tokio::test]
async fn unknown_account_maps_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_json(
            "account_not_found",
            "Account not found",
            json!({ "user_id": "ghost" }),
        )))
        .mount(&server)
        .await;

    let err = client_for(&server).get_account("ghost").await.unwrap_err();

    match err {
        ClientError::AccountNotFound { user_id } => assert_eq!(user_id, "ghost"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn payment_history_passes_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/42/payments"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payments": [{
                "gateway": "yookassa",
                "event_id": "pay_1",
                "user_id": "42",
                "plan_id": "basic",
                "amount": 9900,
                "credits_granted": 20,
                "processed_at": chrono::Utc::now().to_rfc3339()
            }],
            "limit": 5,
            "offset": 10
        })))
        .mount(&server)
        .await;

    let page = client_for(&server).payment_history("42", 5, 10).await.unwrap();

    assert_eq!(page.limit, 5);
    assert_eq!(page.offset, 10);
    assert_eq!(page.payments.len(), 1);
    assert_eq!(page.payments[0].gateway, Gateway::Yookassa);
    assert_eq!(page.payments[0].credits_granted, 20);
}

#[tokio::test]
async fn settle_payment_posts_normalized_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .and(body_json(json!({
            "event_id": "renewal_1",
            "user_id": "42",
            "plan_id": "pro",
            "amount": 34900,
            "gateway": "stripe",
            "status": "succeeded"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "applied",
            "new_balance": 103,
            "credits_granted": 100
        })))
        .mount(&server)
        .await;

    let event = PaymentEvent {
        event_id: EventId::new("renewal_1").unwrap(),
        user_id: UserId::new("42").unwrap(),
        plan_id: PlanId::new("pro").unwrap(),
        amount: 34900,
        gateway: Gateway::Stripe,
        status: PaymentStatus::Succeeded,
    };

    let result = client_for(&server).settle_payment(&event).await.unwrap();
    assert_eq!(
        result,
        SettlementResult::Applied {
            new_balance: 103,
            credits_granted: 100
        }
    );
}

#[tokio::test]
async fn telegram_retry_reports_already_processed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/telegram"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": "already_processed" })),
        )
        .mount(&server)
        .await;

    let payment = TelegramPayment {
        currency: "RUB".into(),
        total_amount: 9900,
        invoice_payload: "credits_basic_42".into(),
        telegram_payment_charge_id: "tg_charge_1".into(),
        provider_payment_charge_id: None,
    };

    let result = client_for(&server)
        .settle_telegram_payment(&payment)
        .await
        .unwrap();
    assert_eq!(result, SettlementResult::AlreadyProcessed);
}

#[tokio::test]
async fn pre_checkout_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/telegram/pre-checkout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "q1",
            "ok": false,
            "error_message": "Invalid payment amount"
        })))
        .mount(&server)
        .await;

    let query = PreCheckoutQuery {
        id: Some("q1".into()),
        currency: "RUB".into(),
        total_amount: 100,
        invoice_payload: "credits_basic_42".into(),
    };

    let answer = client_for(&server).pre_checkout(&query).await.unwrap();
    assert!(!answer.ok);
    assert_eq!(answer.id.as_deref(), Some("q1"));
    assert_eq!(answer.error_message.as_deref(), Some("Invalid payment amount"));
}

#[tokio::test]
async fn list_plans_unwraps_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/plans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plans": [{
                "plan_id": "basic",
                "title": "Basic",
                "credit_count": 20,
                "price": 9900,
                "currency": "RUB"
            }]
        })))
        .mount(&server)
        .await;

    let plans = client_for(&server).list_plans().await.unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].plan_id.as_str(), "basic");
    assert_eq!(plans[0].credit_count, 20);
    assert!(!plans[0].recurring);
}

#[tokio::test]
async fn unknown_plan_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/telegram"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_json(
            "unknown_plan",
            "Unknown plan",
            json!({ "plan_id": "gold" }),
        )))
        .mount(&server)
        .await;

    let payment = TelegramPayment {
        currency: "RUB".into(),
        total_amount: 9900,
        invoice_payload: "credits_gold_42".into(),
        telegram_payment_charge_id: "tg_charge_2".into(),
        provider_payment_charge_id: None,
    };

    let err = client_for(&server)
        .settle_telegram_payment(&payment)
        .await
        .unwrap_err();
    match err {
        ClientError::UnknownPlan { plan_id } => assert_eq!(plan_id, "gold"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unavailable_service_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/accounts/42"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_account("42").await.unwrap_err();

    match &err {
        ClientError::Api { code, status, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(*status, 503);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}
