//! Local billable account records
//!
//! The application database owns the account and subscription rows; this
//! crate only reads them (plus one narrow label update, see
//! [`AccountRepository::update_subscription_plan`]). Lifecycle flags are
//! derived from the row's own timestamps - the billing provider is never
//! consulted for them.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;

/// Local account record for a paying (or potential-paying) entity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BillableAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Stripe customer id; None = never became a paying customer
    pub stripe_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Local subscription row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LocalSubscription {
    pub id: Uuid,
    pub account_id: Uuid,
    /// Display label; overwritten with the requested plan id on swap
    pub plan: String,
    /// Stripe subscription id; None = not yet created remotely
    pub stripe_id: Option<String>,
    pub quantity: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl LocalSubscription {
    /// A cancellation has been requested (it may still be in grace period)
    pub fn cancelled(&self) -> bool {
        self.ends_at.is_some()
    }

    /// Cancelled, but access runs until the period end
    pub fn on_grace_period(&self) -> bool {
        matches!(self.ends_at, Some(ends_at) if ends_at > OffsetDateTime::now_utc())
    }

    /// Cancelled and past the grace period
    pub fn ended(&self) -> bool {
        self.cancelled() && !self.on_grace_period()
    }

    pub fn on_trial(&self) -> bool {
        matches!(self.trial_ends_at, Some(trial_ends_at) if trial_ends_at > OffsetDateTime::now_utc())
    }

    pub fn active(&self) -> bool {
        self.ends_at.is_none() || self.on_grace_period()
    }
}

/// Read access to billable accounts and their subscription rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_account(&self, account_id: Uuid) -> BillingResult<Option<BillableAccount>>;

    /// Subscriptions for the account, optionally narrowed to a single row
    async fn find_subscriptions(
        &self,
        account_id: Uuid,
        subscription_id: Option<Uuid>,
    ) -> BillingResult<Vec<LocalSubscription>>;

    /// Overwrite the stored plan label. The label doubles as a cache of the
    /// last requested plan id; this is the only place that coupling lives.
    async fn update_subscription_plan(
        &self,
        subscription_id: Uuid,
        plan: &str,
    ) -> BillingResult<()>;
}

/// Postgres-backed account repository
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_account(&self, account_id: Uuid) -> BillingResult<Option<BillableAccount>> {
        let account = sqlx::query_as::<_, BillableAccount>(
            r#"
            SELECT id, name, email, stripe_id, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_subscriptions(
        &self,
        account_id: Uuid,
        subscription_id: Option<Uuid>,
    ) -> BillingResult<Vec<LocalSubscription>> {
        let subscriptions = sqlx::query_as::<_, LocalSubscription>(
            r#"
            SELECT id, account_id, plan, stripe_id, quantity,
                   trial_ends_at, ends_at, created_at, updated_at
            FROM subscriptions
            WHERE account_id = $1
              AND ($2::uuid IS NULL OR id = $2)
            ORDER BY created_at
            "#,
        )
        .bind(account_id)
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subscriptions)
    }

    async fn update_subscription_plan(
        &self,
        subscription_id: Uuid,
        plan: &str,
    ) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET plan = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(plan)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
