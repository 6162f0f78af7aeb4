//! Subscription mutations
//!
//! Each action resolves the local subscription row, then forwards one
//! instruction to the billing provider. No merging happens here, no local
//! state changes before the remote call succeeds, and nothing is retried -
//! a failed call surfaces to the caller as-is.

use std::sync::Arc;

use uuid::Uuid;

use crate::accounts::{AccountRepository, LocalSubscription};
use crate::client::{BillingGateway, RemoteSubscription};
use crate::error::{BillingError, BillingResult};

/// Plan selection for creating a subscription
#[derive(Debug, Clone)]
pub struct PlanSelection {
    /// Price to subscribe to
    pub price_id: String,
    /// Product grouping the price belongs to
    pub product_id: String,
}

/// Write operations against an account's subscriptions
pub struct SubscriptionService<R, G> {
    repository: Arc<R>,
    gateway: Arc<G>,
}

impl<R, G> SubscriptionService<R, G>
where
    R: AccountRepository,
    G: BillingGateway,
{
    pub fn new(repository: Arc<R>, gateway: Arc<G>) -> Self {
        Self {
            repository,
            gateway,
        }
    }

    /// Cancel a subscription. `now` ends access immediately; otherwise the
    /// subscription cancels at the end of the current period.
    pub async fn cancel(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
        now: bool,
    ) -> BillingResult<RemoteSubscription> {
        let local = self.resolve_subscription(account_id, subscription_id).await?;
        let stripe_id = synced_id(&local)?;

        let subscription = if now {
            self.gateway.cancel_now(&stripe_id).await?
        } else {
            self.gateway.cancel_at_period_end(&stripe_id).await?
        };

        tracing::info!(
            account_id = %account_id,
            subscription_id = %subscription_id,
            stripe_subscription_id = %subscription.id,
            immediate = now,
            "Cancelled subscription"
        );

        Ok(subscription)
    }

    /// Create a remote subscription for the account under the given plan
    pub async fn create(
        &self,
        account_id: Uuid,
        plan: PlanSelection,
    ) -> BillingResult<RemoteSubscription> {
        if plan.price_id.is_empty() {
            return Err(BillingError::InvalidInput("Missing plan price id".to_string()));
        }
        if plan.product_id.is_empty() {
            return Err(BillingError::InvalidInput("Missing plan product id".to_string()));
        }

        let account = self
            .repository
            .find_account(account_id)
            .await?
            .ok_or(BillingError::AccountNotFound(account_id))?;

        let customer_id = account
            .stripe_id
            .ok_or(BillingError::CustomerMissing(account_id))?;

        let subscription = self
            .gateway
            .create_subscription(&customer_id, &plan.product_id, &plan.price_id)
            .await?;

        tracing::info!(
            account_id = %account_id,
            stripe_subscription_id = %subscription.id,
            price_id = %plan.price_id,
            product_id = %plan.product_id,
            "Created subscription"
        );

        Ok(subscription)
    }

    /// Swap the subscription to a new plan.
    ///
    /// Also overwrites the locally stored plan label with the new plan id:
    /// the label doubles as a cache of the last requested plan.
    pub async fn swap_plan(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
        new_plan_id: &str,
    ) -> BillingResult<RemoteSubscription> {
        if new_plan_id.is_empty() {
            return Err(BillingError::InvalidInput("Missing plan id".to_string()));
        }

        let local = self.resolve_subscription(account_id, subscription_id).await?;
        let stripe_id = synced_id(&local)?;

        let subscription = self
            .gateway
            .swap_subscription_price(&stripe_id, new_plan_id)
            .await?;

        self.repository
            .update_subscription_plan(subscription_id, new_plan_id)
            .await?;

        tracing::info!(
            account_id = %account_id,
            subscription_id = %subscription_id,
            new_plan_id = %new_plan_id,
            "Swapped subscription plan"
        );

        Ok(subscription)
    }

    /// Lift a pending cancellation, restoring active billing
    pub async fn resume(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> BillingResult<RemoteSubscription> {
        let local = self.resolve_subscription(account_id, subscription_id).await?;
        let stripe_id = synced_id(&local)?;

        let subscription = self.gateway.resume_subscription(&stripe_id).await?;

        tracing::info!(
            account_id = %account_id,
            subscription_id = %subscription_id,
            stripe_subscription_id = %subscription.id,
            "Resumed subscription"
        );

        Ok(subscription)
    }

    async fn resolve_subscription(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> BillingResult<LocalSubscription> {
        self.repository
            .find_account(account_id)
            .await?
            .ok_or(BillingError::AccountNotFound(account_id))?;

        self.repository
            .find_subscriptions(account_id, Some(subscription_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BillingError::SubscriptionNotFound(subscription_id.to_string()))
    }
}

fn synced_id(local: &LocalSubscription) -> BillingResult<String> {
    local.stripe_id.clone().ok_or_else(|| {
        BillingError::InvalidInput(format!(
            "Subscription {} has not been created remotely",
            local.id
        ))
    })
}
