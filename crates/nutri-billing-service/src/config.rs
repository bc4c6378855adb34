//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use nutri_billing_core::{PriceProfile, STARTING_CREDITS};

/// Default YooKassa API base URL.
pub const DEFAULT_YOOKASSA_API_URL: &str = "https://api.yookassa.ru";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// PostgreSQL connection URL. When set, PostgreSQL is used instead of
    /// `RocksDB`.
    pub database_url: Option<String>,

    /// PostgreSQL pool size (default: 10).
    pub database_max_connections: u32,

    /// Path to `RocksDB` data directory (default: "/data/nutri-billing").
    pub data_dir: String,

    /// API key the bot presents in `x-api-key`.
    pub service_api_key: Option<String>,

    /// Operator key presented in `x-admin-key`.
    pub admin_api_key: Option<String>,

    /// Stripe webhook signing secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// YooKassa shop id (optional).
    pub yookassa_shop_id: Option<String>,

    /// YooKassa secret key (optional).
    pub yookassa_secret_key: Option<String>,

    /// YooKassa API base URL.
    pub yookassa_api_url: String,

    /// Settle YooKassa notifications that cannot be checked against the API.
    /// When unset, allowed only outside real-price environments.
    pub yookassa_allow_unverified: Option<bool>,

    /// Deployment environment name (`production`, `staging`, ...).
    pub environment: Option<String>,

    /// Force test prices regardless of `environment`.
    pub test_mode: bool,

    /// JSON plan catalog. The built-in catalog is used when unset.
    pub plans_file: Option<String>,

    /// Credits granted to a new account.
    pub starting_credits: i64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    webhook_secret: String,
}

/// YooKassa secrets file structure.
#[derive(Debug, Deserialize)]
struct YookassaSecrets {
    shop_id: String,
    secret_key: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let stripe_webhook_secret = load_stripe_secrets();
        let (yookassa_shop_id, yookassa_secret_key, yookassa_api_url) = load_yookassa_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/nutri-billing".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            stripe_webhook_secret,
            yookassa_shop_id,
            yookassa_secret_key,
            yookassa_api_url: yookassa_api_url
                .unwrap_or_else(|| DEFAULT_YOOKASSA_API_URL.into()),
            yookassa_allow_unverified: std::env::var("YOOKASSA_ALLOW_UNVERIFIED")
                .ok()
                .map(|v| parse_flag(&v)),
            environment: std::env::var("ENVIRONMENT").ok(),
            test_mode: std::env::var("TEST_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            plans_file: std::env::var("PLANS_FILE").ok(),
            starting_credits: env_parse("STARTING_CREDITS").unwrap_or(STARTING_CREDITS),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(64 * 1024), // 64KB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
        }
    }

    /// Whether YooKassa API credentials are present.
    #[must_use]
    pub fn has_yookassa_credentials(&self) -> bool {
        self.yookassa_shop_id.is_some() && self.yookassa_secret_key.is_some()
    }

    /// Price profile implied by `environment` and `test_mode`.
    #[must_use]
    pub fn price_profile(&self) -> PriceProfile {
        PriceProfile::detect(self.environment.as_deref(), self.test_mode)
    }

    /// Whether a YooKassa notification may be settled from its body alone.
    #[must_use]
    pub fn accepts_unverified_yookassa(&self) -> bool {
        self.yookassa_allow_unverified.unwrap_or_else(|| {
            !matches!(
                self.price_profile(),
                PriceProfile::Production | PriceProfile::Staging
            )
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load the Stripe webhook secret from file or environment.
fn load_stripe_secrets() -> Option<String> {
    let secret_paths = [
        ".secrets/stripe.json",
        "nutri-billing/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return Some(secrets.webhook_secret);
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    std::env::var("STRIPE_WEBHOOK_SECRET").ok()
}

/// Load YooKassa credentials from file or environment.
fn load_yookassa_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/yookassa.json",
        "nutri-billing/.secrets/yookassa.json",
        "../.secrets/yookassa.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<YookassaSecrets>(path) {
            tracing::info!(path = %path, "Loaded YooKassa secrets from file");
            return (
                Some(secrets.shop_id),
                Some(secrets.secret_key),
                secrets.api_url,
            );
        }
    }

    tracing::debug!("YooKassa secrets file not found, using environment variables");
    (
        std::env::var("YOOKASSA_SHOP_ID").ok(),
        std::env::var("YOOKASSA_SECRET_KEY").ok(),
        std::env::var("YOOKASSA_API_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            database_url: None,
            database_max_connections: 10,
            data_dir: "/data/nutri-billing".into(),
            service_api_key: None,
            admin_api_key: None,
            stripe_webhook_secret: None,
            yookassa_shop_id: None,
            yookassa_secret_key: None,
            yookassa_api_url: DEFAULT_YOOKASSA_API_URL.into(),
            yookassa_allow_unverified: None,
            environment: None,
            test_mode: false,
            plans_file: None,
            starting_credits: STARTING_CREDITS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
