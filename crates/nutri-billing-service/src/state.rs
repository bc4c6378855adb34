//! Application state.

use std::sync::Arc;

use nutri_billing_core::PlanCatalog;
use nutri_billing_ledger::{Ledger, Settlement};
use nutri_billing_store::Store;

use crate::config::ServiceConfig;
use crate::yookassa::YookassaClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Balance operations.
    pub ledger: Ledger,

    /// Payment settlement over the same ledger.
    pub settlement: Settlement,

    /// Service configuration.
    pub config: ServiceConfig,

    /// YooKassa client for re-fetching notified payments (optional).
    pub yookassa: Option<Arc<YookassaClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, catalog: PlanCatalog, config: ServiceConfig) -> Self {
        let ledger = Ledger::new(store).with_starting_credits(config.starting_credits);
        let settlement = Settlement::new(ledger.clone(), Arc::new(catalog));

        let yookassa = config
            .yookassa_shop_id
            .as_ref()
            .zip(config.yookassa_secret_key.as_ref())
            .and_then(|(shop_id, secret_key)| {
                match YookassaClient::new(&config.yookassa_api_url, shop_id, secret_key) {
                    Ok(client) => {
                        tracing::info!(
                            api_url = %config.yookassa_api_url,
                            "YooKassa payment verification enabled"
                        );
                        Some(Arc::new(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create YooKassa client");
                        None
                    }
                }
            });

        if yookassa.is_none() {
            if config.accepts_unverified_yookassa() {
                tracing::warn!(
                    "YooKassa not configured - notifications will be trusted without verification"
                );
            } else {
                tracing::error!(
                    profile = %config.price_profile(),
                    "YooKassa not configured - notifications will be refused"
                );
            }
        }

        if config.stripe_webhook_secret.is_none() {
            tracing::warn!("Stripe webhook_secret not configured - signatures will not be verified");
        }

        Self {
            ledger,
            settlement,
            config,
            yookassa,
        }
    }

    /// The plan catalog.
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        self.settlement.catalog()
    }

    /// Check if YooKassa verification is configured.
    #[must_use]
    pub fn has_yookassa(&self) -> bool {
        self.yookassa.is_some()
    }
}
