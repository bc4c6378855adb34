//! Nutri-Billing HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};

use crate::error::ClientError;
use crate::types::{
    Account, ApiErrorResponse, CreateAccountRequest, PaymentEvent, PaymentsPage, Plan,
    PlansResponse, PreCheckoutAnswer, PreCheckoutQuery, RegisteredAccount, SettlementResult,
    TelegramPayment,
};

/// Nutri-Billing API client.
///
/// Wraps the bot-facing endpoints. Authenticates with the service API key.
#[derive(Debug, Clone)]
pub struct NutriBillingClient {
    client: Client,
    base_url: Url,
    api_key: String,
    service_name: String,
}

impl NutriBillingClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://nutri-billing:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if `base_url` is invalid, and
    /// `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Same as [`NutriBillingClient::new`].
    pub fn with_options(
        base_url: &str,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::Configuration(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "invalid base URL: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Get a user's account, creating it with the starting grant if new.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_or_create_account(
        &self,
        user_id: &str,
    ) -> Result<RegisteredAccount, ClientError> {
        let request = self
            .request(Method::POST, &["v1", "accounts"])?
            .json(&CreateAccountRequest { user_id });

        self.send(request).await
    }

    /// Get an account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AccountNotFound` if the user was never seen.
    pub async fn get_account(&self, user_id: &str) -> Result<Account, ClientError> {
        let request = self.request(Method::GET, &["v1", "accounts", user_id])?;
        self.send(request).await
    }

    /// Spend one credit for an analysis.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InsufficientCredits` when the balance is zero and
    /// `ClientError::AccountNotFound` if the user was never seen.
    pub async fn debit_one(&self, user_id: &str) -> Result<Account, ClientError> {
        let request = self.request(Method::POST, &["v1", "accounts", user_id, "debit"])?;
        self.send(request).await
    }

    /// List a user's applied payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn payment_history(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<PaymentsPage, ClientError> {
        let request = self
            .request(Method::GET, &["v1", "accounts", user_id, "payments"])?
            .query(&[("limit", limit), ("offset", offset)]);

        self.send(request).await
    }

    /// Settle a normalized payment event.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::UnknownPlan` if the service does not know the
    /// plan. Retry on [`ClientError::is_retryable`] errors.
    pub async fn settle_payment(
        &self,
        event: &PaymentEvent,
    ) -> Result<SettlementResult, ClientError> {
        let request = self
            .request(Method::POST, &["v1", "payments"])?
            .json(event);

        self.send(request).await
    }

    /// Settle a Telegram `successful_payment`.
    ///
    /// Safe to call again after a timeout: a repeated charge id returns
    /// `SettlementResult::AlreadyProcessed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn settle_telegram_payment(
        &self,
        payment: &TelegramPayment,
    ) -> Result<SettlementResult, ClientError> {
        let request = self
            .request(Method::POST, &["v1", "payments", "telegram"])?
            .json(payment);

        self.send(request).await
    }

    /// Validate a Telegram `pre_checkout_query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn pre_checkout(
        &self,
        query: &PreCheckoutQuery,
    ) -> Result<PreCheckoutAnswer, ClientError> {
        let request = self
            .request(Method::POST, &["v1", "payments", "telegram", "pre-checkout"])?
            .json(query);

        self.send(request).await
    }

    /// List purchasable plans.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_plans(&self) -> Result<Vec<Plan>, ClientError> {
        let request = self.request(Method::GET, &["v1", "plans"])?;
        let response: PlansResponse = self.send(request).await?;
        Ok(response.plans)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Configuration("invalid base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        Ok(self
            .client
            .request(method, self.url(segments)?)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let error = api_error.error;
                tracing::debug!(
                    status = %status,
                    code = %error.code,
                    message = %error.message,
                    "nutri-billing API error"
                );

                match error.code.as_str() {
                    "insufficient_credits" => Err(ClientError::InsufficientCredits {
                        balance: error.detail_i64("balance").unwrap_or(0),
                        required: error.detail_i64("required").unwrap_or(1),
                    }),
                    "account_not_found" => Err(ClientError::AccountNotFound {
                        user_id: error.detail_str("user_id").unwrap_or_default().to_string(),
                    }),
                    "unknown_plan" => Err(ClientError::UnknownPlan {
                        plan_id: error.detail_str("plan_id").unwrap_or_default().to_string(),
                    }),
                    _ => Err(ClientError::Api {
                        code: error.code,
                        message: error.message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 10).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
