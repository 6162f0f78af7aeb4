//! The normalized account view
//!
//! One read path: load the local account and its subscription rows, fetch
//! the remote counterpart of every synced subscription, merge the two
//! field-by-field, and (unless the caller asked for the brief view) attach
//! the flattened secondary collections. Accounts that never became paying
//! customers short-circuit to a subscriptions-free view with just the plan
//! catalogue - that is a legitimate state, not an error.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::{AccountRepository, BillableAccount, LocalSubscription};
use crate::client::{BillingGateway, RemoteSubscription};
use crate::error::{BillingError, BillingResult};
use crate::format::{
    format_invoices, format_payment_intents, format_payment_methods, format_plans, CardView,
    ChargeView, InvoiceView, PlanView,
};
use crate::timefmt;

/// How many catalogue plans to include in the view
const PLAN_CATALOGUE_LIMIT: u64 = 100;

/// A local subscription row unified with its remote snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MergedSubscription {
    // Local row
    pub id: Uuid,
    pub account_id: Uuid,
    pub stripe_id: String,
    pub quantity: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    // Plan: the local label and the remote plan id are distinct values.
    // The label is whatever the caller last stored; the remote id is
    // authoritative.
    pub plan: String,
    pub stripe_plan: String,
    pub plan_amount: Option<i64>,
    pub plan_interval: Option<String>,
    pub plan_currency: Option<String>,

    // Lifecycle flags, surfaced from the local row's own derivations
    pub ended: bool,
    pub cancelled: bool,
    pub active: bool,
    pub on_trial: bool,
    pub on_grace_period: bool,

    pub charges_automatically: bool,

    // Remote timestamps, formatted. created_at reflects the remote billing
    // cycle anchor, not the local row's insert time.
    pub created_at: Option<String>,
    pub ended_at: Option<String>,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,

    // Remote pass-throughs
    pub days_until_due: Option<u32>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
}

/// Entry in the account view's subscription list.
///
/// Rows that were never created remotely surface as the bare local record;
/// merged entries carry the remote fields and derived flags on top.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SubscriptionView {
    Pending(LocalSubscription),
    Merged(Box<MergedSubscription>),
}

/// The full normalized account view
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<BillableAccount>,
    pub subscriptions: Vec<SubscriptionView>,
    pub cards: Vec<CardView>,
    pub invoices: Vec<InvoiceView>,
    pub charges: Vec<ChargeView>,
    pub plans: Vec<PlanView>,
}

/// Merge a local subscription row with its remote snapshot
pub fn merge_subscription(
    local: &LocalSubscription,
    remote: &RemoteSubscription,
) -> MergedSubscription {
    MergedSubscription {
        id: local.id,
        account_id: local.account_id,
        stripe_id: remote.id.clone(),
        quantity: local.quantity,
        trial_ends_at: local.trial_ends_at,
        ends_at: local.ends_at,
        updated_at: local.updated_at,

        plan: local.plan.clone(),
        stripe_plan: remote.plan.id.clone(),
        plan_amount: remote.plan.amount,
        plan_interval: remote.plan.interval.clone(),
        plan_currency: remote.plan.currency.clone(),

        ended: local.ended(),
        cancelled: local.cancelled(),
        active: local.active(),
        on_trial: local.on_trial(),
        on_grace_period: local.on_grace_period(),

        charges_automatically: remote.collection_method.as_deref()
            == Some("charge_automatically"),

        created_at: timefmt::datetime_string(remote.billing_cycle_anchor),
        ended_at: timefmt::datetime_string(remote.ended_at),
        current_period_start: timefmt::date_string(remote.current_period_start),
        current_period_end: timefmt::date_string(remote.current_period_end),

        days_until_due: remote.days_until_due,
        cancel_at_period_end: remote.cancel_at_period_end,
        canceled_at: remote.canceled_at,
    }
}

/// Builds the normalized account view
pub struct AccountOverviewService<R, G> {
    repository: Arc<R>,
    gateway: Arc<G>,
}

impl<R, G> AccountOverviewService<R, G>
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

    /// Assemble the account view.
    ///
    /// `subscription_id` narrows the view to a single local subscription.
    /// `brief` drops the secondary collections (cards, invoices, charges,
    /// plans) and skips their remote fetches entirely.
    pub async fn account_overview(
        &self,
        account_id: Uuid,
        subscription_id: Option<Uuid>,
        brief: bool,
    ) -> BillingResult<AccountOverview> {
        let account = self
            .repository
            .find_account(account_id)
            .await?
            .ok_or(BillingError::AccountNotFound(account_id))?;

        let locals = self
            .repository
            .find_subscriptions(account_id, subscription_id)
            .await?;

        // Not (yet) a paying customer: no customer-scoped remote state
        // exists, so only the catalogue is worth returning.
        let Some(customer_id) = account.stripe_id.clone() else {
            return self.catalogue_only().await;
        };
        if locals.is_empty() {
            return self.catalogue_only().await;
        }

        let mut subscriptions = Vec::with_capacity(locals.len());
        let mut remote_ids = HashSet::new();

        for local in &locals {
            match &local.stripe_id {
                None => {
                    // Exists locally but was never created remotely; pass
                    // the row through untouched.
                    subscriptions.push(SubscriptionView::Pending(local.clone()));
                }
                Some(stripe_id) => {
                    let remote = self.gateway.get_subscription(stripe_id).await?;
                    remote_ids.insert(remote.id.clone());
                    subscriptions.push(SubscriptionView::Merged(Box::new(merge_subscription(
                        local, &remote,
                    ))));
                }
            }
        }

        if brief {
            tracing::debug!(account_id = %account_id, "Brief account view assembled");
            return Ok(AccountOverview {
                user: Some(account),
                subscriptions,
                cards: Vec::new(),
                invoices: Vec::new(),
                charges: Vec::new(),
                plans: Vec::new(),
            });
        }

        let methods = self.gateway.list_payment_methods(&customer_id).await?;
        let default_method = self.gateway.default_payment_method(&customer_id).await?;
        let invoices = self.gateway.list_invoices(&customer_id).await?;
        let intents = self.gateway.list_payment_intents(&customer_id).await?;
        let plans = self.gateway.list_plans(PLAN_CATALOGUE_LIMIT).await?;

        let overview = AccountOverview {
            user: Some(account),
            subscriptions,
            cards: format_payment_methods(&methods, default_method.as_deref()),
            invoices: format_invoices(&invoices, &remote_ids),
            charges: format_payment_intents(&intents, self.gateway.as_ref()).await?,
            plans: format_plans(&plans),
        };

        tracing::debug!(
            account_id = %account_id,
            subscriptions = overview.subscriptions.len(),
            invoices = overview.invoices.len(),
            charges = overview.charges.len(),
            "Account view assembled"
        );

        Ok(overview)
    }

    async fn catalogue_only(&self) -> BillingResult<AccountOverview> {
        let plans = self.gateway.list_plans(PLAN_CATALOGUE_LIMIT).await?;

        Ok(AccountOverview {
            user: None,
            subscriptions: Vec::new(),
            cards: Vec::new(),
            invoices: Vec::new(),
            charges: Vec::new(),
            plans: format_plans(&plans),
        })
    }
}
