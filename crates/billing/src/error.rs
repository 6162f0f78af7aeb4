//! Billing error types

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the billing façade
#[derive(Debug, Error)]
pub enum BillingError {
    /// The billable account does not exist locally
    #[error("Billable account not found: {0}")]
    AccountNotFound(Uuid),

    /// The subscription does not resolve locally for the given account
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// A mutation requires a Stripe customer the account does not have
    #[error("Account {0} has no Stripe customer")]
    CustomerMissing(Uuid),

    /// Malformed mutation input (missing plan id, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stripe API call failed
    #[error("Stripe API error: {0}")]
    StripeApi(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        BillingError::StripeApi(err.to_string())
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        BillingError::Database(err.to_string())
    }
}

/// Result type for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
