//! YooKassa API client.

use std::time::Duration;

use reqwest::{Client, Url};

use super::types::{ApiErrorBody, YookassaPayment};
use super::YookassaError;

/// Timeout for YooKassa API requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// YooKassa API client. Read-only: it only fetches payments back.
#[derive(Debug, Clone)]
pub struct YookassaClient {
    client: Client,
    base_url: Url,
    shop_id: String,
    secret_key: String,
}

impl YookassaClient {
    /// Create a client for `api_url` (e.g. `https://api.yookassa.ru`).
    ///
    /// # Errors
    ///
    /// Returns `YookassaError::Configuration` if the URL does not parse or
    /// cannot be a base, and `YookassaError::Http` if the HTTP client cannot
    /// be built.
    pub fn new(api_url: &str, shop_id: &str, secret_key: &str) -> Result<Self, YookassaError> {
        let base_url = Url::parse(api_url)
            .map_err(|e| YookassaError::Configuration(format!("invalid API URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(YookassaError::Configuration(format!(
                "invalid API URL: {api_url}"
            )));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            shop_id: shop_id.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Fetch a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns `YookassaError::Api` on a non-success status and
    /// `YookassaError::Http` on transport or decoding failure.
    pub async fn get_payment(&self, payment_id: &str) -> Result<YookassaPayment, YookassaError> {
        let url = self.payment_url(payment_id)?;

        tracing::debug!(payment_id = %payment_id, "Fetching YooKassa payment");

        let response = self
            .client
            .get(url)
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body
                .description
                .or(body.code)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };

        Err(YookassaError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn payment_url(&self, payment_id: &str) -> Result<Url, YookassaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| YookassaError::Configuration("invalid API URL".into()))?
            .pop_if_empty()
            .extend(["v3", "payments", payment_id]);
        Ok(url)
    }
}
