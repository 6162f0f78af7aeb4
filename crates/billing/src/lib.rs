// Billing crate clippy configuration
// These are intentional patterns in this crate:
#![allow(clippy::too_many_arguments)] // Some Stripe operations require many parameters
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cashier Billing
//!
//! Administrative facade over Stripe subscription billing.
//!
//! ## Features
//!
//! - **Account Overview**: Merge local account/subscription rows with live
//!   Stripe state into one normalized view
//! - **Collection Formatting**: Flatten payment methods, invoices,
//!   payment-intent charges, and the plan catalogue into API-ready shapes
//! - **Subscription Management**: Cancel (immediate or graceful), create,
//!   swap plans, resume
//! - **Refunds**: Issue full or partial charge refunds with a note

pub mod accounts;
pub mod client;
pub mod error;
pub mod format;
pub mod overview;
pub mod refund;
pub mod subscriptions;
pub mod timefmt;

#[cfg(test)]
mod edge_case_tests;

// Accounts
pub use accounts::{AccountRepository, BillableAccount, LocalSubscription, PostgresAccountRepository};

// Client
pub use client::{
    BillingGateway, RefundParams, RemoteCharge, RemoteDispute, RemoteInvoice, RemotePaymentIntent,
    RemotePaymentMethod, RemotePlan, RemoteSubscription, StripeClient, StripeConfig,
};

// Error
pub use error::{BillingError, BillingResult};

// Format
pub use format::{CardView, ChargeView, InvoiceView, PlanView};

// Overview
pub use overview::{
    merge_subscription, AccountOverview, AccountOverviewService, MergedSubscription,
    SubscriptionView,
};

// Refund
pub use refund::RefundService;

// Subscriptions
pub use subscriptions::{PlanSelection, SubscriptionService};

use std::sync::Arc;

use sqlx::PgPool;

/// Main billing service that combines all billing functionality
pub struct BillingService<R, G> {
    pub overview: AccountOverviewService<R, G>,
    pub subscriptions: SubscriptionService<R, G>,
    pub refunds: RefundService<G>,
}

impl<R, G> BillingService<R, G>
where
    R: AccountRepository,
    G: BillingGateway,
{
    /// Create a billing service over an explicit repository/gateway pair
    pub fn new(repository: Arc<R>, gateway: Arc<G>) -> Self {
        Self {
            overview: AccountOverviewService::new(repository.clone(), gateway.clone()),
            subscriptions: SubscriptionService::new(repository, gateway.clone()),
            refunds: RefundService::new(gateway),
        }
    }
}

impl BillingService<PostgresAccountRepository, StripeClient> {
    /// Create a billing service from environment variables
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        let repository = Arc::new(PostgresAccountRepository::new(pool));
        let gateway = Arc::new(StripeClient::from_env()?);
        Ok(Self::new(repository, gateway))
    }
}
