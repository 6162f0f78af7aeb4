//! Application state

use std::sync::Arc;

use cashier_billing::{BillingService, PostgresAccountRepository, StripeClient};
use sqlx::PgPool;

use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub billing: Arc<BillingService<PostgresAccountRepository, StripeClient>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let billing = BillingService::from_env(pool.clone())?;
        tracing::info!("Stripe billing service initialized");

        Ok(Self {
            pool,
            config,
            billing: Arc::new(billing),
        })
    }
}
