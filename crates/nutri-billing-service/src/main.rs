//! Nutri-Billing Service - credit ledger and payment settlement over HTTP
//!
//! This is the main entry point for the nutri-billing service.

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nutri_billing_core::{PlanCatalog, PriceProfile};
use nutri_billing_service::{create_router, AppState, ServiceConfig};
use nutri_billing_store::{PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,nutri_billing=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Nutri-Billing Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres = %config.database_url.is_some(),
        data_dir = %config.data_dir,
        environment = ?config.environment,
        test_mode = %config.test_mode,
        starting_credits = %config.starting_credits,
        stripe_configured = %config.stripe_webhook_secret.is_some(),
        yookassa_configured = %config.has_yookassa_credentials(),
        yookassa_unverified = %config.accepts_unverified_yookassa(),
        "Service configuration loaded"
    );

    let catalog = load_catalog(&config)?;
    for plan in catalog.plans() {
        tracing::info!(
            plan_id = %plan.plan_id,
            credits = plan.credit_count,
            price = plan.price,
            currency = %plan.currency,
            "Plan loaded"
        );
    }

    let store = open_store(&config).await?;

    let state = AppState::new(store, catalog, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_catalog(config: &ServiceConfig) -> Result<PlanCatalog, Box<dyn Error>> {
    if let Some(path) = &config.plans_file {
        tracing::info!(path = %path, "Loading plan catalog from file");
        return Ok(PlanCatalog::from_file(path)?);
    }

    let profile = PriceProfile::detect(config.environment.as_deref(), config.test_mode);
    tracing::info!(profile = %profile, "Using built-in plan catalog");
    Ok(PlanCatalog::builtin(profile))
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL");
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        tracing::info!("PostgreSQL migrations applied");
        return Ok(Arc::new(store));
    }

    open_rocks(&config.data_dir)
}

#[cfg(feature = "rocksdb-backend")]
fn open_rocks(path: &str) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    tracing::info!(path = %path, "Opening RocksDB store");
    Ok(Arc::new(nutri_billing_store::RocksStore::open(path)?))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_rocks(_path: &str) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    Err("DATABASE_URL is required when built without the rocksdb-backend feature".into())
}
