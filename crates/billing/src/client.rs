//! Stripe client wrapper and the billing gateway seam
//!
//! The rest of the crate talks to Stripe through the [`BillingGateway`]
//! trait, which returns provider-agnostic snapshot types. `StripeClient`
//! is the production implementation over async-stripe; tests substitute a
//! mock.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::generated::billing::subscription::SubscriptionProrationBehavior;
use stripe::{
    CancelSubscription, Charge, ChargeId, CreateRefund, CreateSubscription,
    CreateSubscriptionItems, Customer, CustomerId, Dispute, DisputeId, Invoice, ListCharges,
    ListInvoices, ListPaymentIntents, ListPaymentMethods, ListPlans, PaymentIntent, PaymentMethod,
    PaymentMethodTypeFilter, Plan, Refund, Subscription, SubscriptionId, UpdateSubscription,
    UpdateSubscriptionItems,
};

use crate::error::{BillingError, BillingResult};

/// Stripe configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... / sk_test_...)
    pub secret_key: String,
}

impl StripeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?;

        if secret_key.is_empty() {
            return Err(BillingError::Config("STRIPE_SECRET_KEY is empty".to_string()));
        }

        Ok(Self { secret_key })
    }
}

/// Wrapper around the async-stripe client
#[derive(Clone)]
pub struct StripeClient {
    client: stripe::Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        let client = stripe::Client::new(config.secret_key.clone());
        Self { client, config }
    }

    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    /// Get the underlying Stripe client
    pub fn inner(&self) -> &stripe::Client {
        &self.client
    }

    /// Get the configuration
    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

// =============================================================================
// Remote snapshots
// =============================================================================
//
// Plain-data copies of the Stripe objects this crate reads. Timestamps stay
// raw epochs here; formatting happens in the view layer.

/// Plan / price snapshot, shared by the subscription merge and the catalogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePlan {
    pub id: String,
    pub nickname: Option<String>,
    pub amount: Option<i64>,
    pub interval: Option<String>,
    pub currency: Option<String>,
    pub product: Option<String>,
}

/// Subscription snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSubscription {
    pub id: String,
    pub plan: RemotePlan,
    pub collection_method: Option<String>,
    pub billing_cycle_anchor: Option<i64>,
    pub ended_at: Option<i64>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub days_until_due: Option<u32>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
}

/// Card-backed payment method snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePaymentMethod {
    pub id: String,
    pub name: Option<String>,
    pub brand: String,
    pub last4: String,
    pub country: Option<String>,
    pub exp_month: i64,
    pub exp_year: i64,
}

/// Invoice snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteInvoice {
    pub id: String,
    pub subscription: Option<String>,
    pub total: i64,
    pub attempted: bool,
    pub charge: Option<String>,
    pub currency: String,
    pub period_start: Option<i64>,
    pub period_end: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Payment intent snapshot with its charges nested in provider order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePaymentIntent {
    pub id: String,
    pub charges: Vec<RemoteCharge>,
}

/// Charge snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCharge {
    pub id: String,
    pub amount: i64,
    pub amount_refunded: i64,
    pub captured: bool,
    pub paid: bool,
    pub status: String,
    pub currency: String,
    /// Dispute id, if the charge is disputed
    pub dispute: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub created: Option<i64>,
}

/// Dispute snapshot, embedded whole in the charge view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDispute {
    pub id: String,
    pub status: String,
    pub reason: String,
    pub amount: i64,
    pub currency: String,
}

/// Parameters for a refund request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefundParams {
    pub charge: String,
    /// Omitted = refund the full charge amount
    pub amount: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

// =============================================================================
// Gateway trait
// =============================================================================

/// Read/write access to the billing provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str) -> BillingResult<RemoteSubscription>;

    async fn list_plans(&self, limit: u64) -> BillingResult<Vec<RemotePlan>>;

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> BillingResult<Vec<RemotePaymentMethod>>;

    /// Id of the customer's default payment method, if one is set
    async fn default_payment_method(&self, customer_id: &str) -> BillingResult<Option<String>>;

    async fn list_invoices(&self, customer_id: &str) -> BillingResult<Vec<RemoteInvoice>>;

    async fn list_payment_intents(
        &self,
        customer_id: &str,
    ) -> BillingResult<Vec<RemotePaymentIntent>>;

    async fn get_dispute(&self, dispute_id: &str) -> BillingResult<RemoteDispute>;

    /// Returns the provider refund id
    async fn create_refund(&self, params: RefundParams) -> BillingResult<String>;

    async fn cancel_at_period_end(&self, subscription_id: &str)
        -> BillingResult<RemoteSubscription>;

    async fn cancel_now(&self, subscription_id: &str) -> BillingResult<RemoteSubscription>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        product_id: &str,
        price_id: &str,
    ) -> BillingResult<RemoteSubscription>;

    async fn swap_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> BillingResult<RemoteSubscription>;

    async fn resume_subscription(&self, subscription_id: &str)
        -> BillingResult<RemoteSubscription>;
}

// =============================================================================
// async-stripe implementation
// =============================================================================

fn parse_subscription_id(subscription_id: &str) -> BillingResult<SubscriptionId> {
    subscription_id
        .parse()
        .map_err(|e| BillingError::StripeApi(format!("Invalid subscription ID: {}", e)))
}

fn parse_customer_id(customer_id: &str) -> BillingResult<CustomerId> {
    customer_id
        .parse()
        .map_err(|e| BillingError::StripeApi(format!("Invalid customer ID: {}", e)))
}

fn subscription_snapshot(subscription: &Subscription) -> BillingResult<RemoteSubscription> {
    let price = subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .ok_or_else(|| {
            BillingError::StripeApi(format!(
                "Subscription {} has no priced items",
                subscription.id
            ))
        })?;

    let plan = RemotePlan {
        id: price.id.to_string(),
        nickname: price.nickname.clone(),
        amount: price.unit_amount,
        interval: price
            .recurring
            .as_ref()
            .map(|recurring| recurring.interval.to_string()),
        currency: price.currency.as_ref().map(|c| c.to_string()),
        product: price.product.as_ref().map(|p| match p {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(product) => product.id.to_string(),
        }),
    };

    Ok(RemoteSubscription {
        id: subscription.id.to_string(),
        plan,
        collection_method: subscription.collection_method.map(|m| m.to_string()),
        billing_cycle_anchor: Some(subscription.billing_cycle_anchor),
        ended_at: subscription.ended_at,
        current_period_start: Some(subscription.current_period_start),
        current_period_end: Some(subscription.current_period_end),
        days_until_due: subscription.days_until_due,
        cancel_at_period_end: subscription.cancel_at_period_end,
        canceled_at: subscription.canceled_at,
    })
}

fn plan_snapshot(plan: &Plan) -> RemotePlan {
    RemotePlan {
        id: plan.id.to_string(),
        nickname: plan.nickname.clone(),
        amount: plan.amount,
        interval: plan.interval.as_ref().map(|i| i.to_string()),
        currency: plan.currency.as_ref().map(|c| c.to_string()),
        product: plan.product.as_ref().map(|p| match p {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(product) => product.id.to_string(),
        }),
    }
}

fn invoice_snapshot(invoice: &Invoice) -> RemoteInvoice {
    RemoteInvoice {
        id: invoice.id.to_string(),
        subscription: invoice.subscription.as_ref().map(|s| match s {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(sub) => sub.id.to_string(),
        }),
        total: invoice.total.unwrap_or(0),
        attempted: invoice.attempted.unwrap_or(false),
        charge: invoice.charge.as_ref().map(|c| match c {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(charge) => charge.id.to_string(),
        }),
        currency: invoice
            .currency
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        period_start: invoice.period_start,
        period_end: invoice.period_end,
        metadata: invoice.metadata.clone(),
    }
}

fn charge_snapshot(charge: &Charge) -> RemoteCharge {
    RemoteCharge {
        id: charge.id.to_string(),
        amount: charge.amount,
        amount_refunded: charge.amount_refunded,
        captured: charge.captured,
        paid: charge.paid,
        status: charge.status.to_string(),
        currency: charge.currency.to_string(),
        dispute: charge.dispute.as_ref().map(|d| match d {
            stripe::Expandable::Id(id) => id.to_string(),
            stripe::Expandable::Object(dispute) => dispute.id.to_string(),
        }),
        failure_code: charge.failure_code.clone(),
        failure_message: charge.failure_message.clone(),
        created: Some(charge.created),
    }
}

fn dispute_snapshot(dispute: &Dispute) -> RemoteDispute {
    RemoteDispute {
        id: dispute.id.to_string(),
        status: dispute.status.to_string(),
        reason: dispute.reason.clone(),
        amount: dispute.amount,
        currency: dispute.currency.to_string(),
    }
}

#[async_trait]
impl BillingGateway for StripeClient {
    async fn get_subscription(&self, subscription_id: &str) -> BillingResult<RemoteSubscription> {
        let id = parse_subscription_id(subscription_id)?;
        let subscription = Subscription::retrieve(self.inner(), &id, &[]).await?;
        subscription_snapshot(&subscription)
    }

    async fn list_plans(&self, limit: u64) -> BillingResult<Vec<RemotePlan>> {
        let mut params = ListPlans::new();
        params.limit = Some(limit);

        let plans = Plan::list(self.inner(), &params).await?;
        Ok(plans.data.iter().map(plan_snapshot).collect())
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> BillingResult<Vec<RemotePaymentMethod>> {
        let customer = parse_customer_id(customer_id)?;

        let mut params = ListPaymentMethods::new();
        params.customer = Some(customer);
        params.type_ = Some(PaymentMethodTypeFilter::Card);

        let methods = PaymentMethod::list(self.inner(), &params).await?;

        // Non-card payment methods have no card block to flatten
        Ok(methods
            .data
            .iter()
            .filter_map(|method| {
                let card = method.card.as_ref()?;
                Some(RemotePaymentMethod {
                    id: method.id.to_string(),
                    name: method.billing_details.name.clone(),
                    brand: card.brand.to_string(),
                    last4: card.last4.to_string(),
                    country: card.country.clone(),
                    exp_month: card.exp_month as i64,
                    exp_year: card.exp_year as i64,
                })
            })
            .collect())
    }

    async fn default_payment_method(&self, customer_id: &str) -> BillingResult<Option<String>> {
        let customer_id = parse_customer_id(customer_id)?;
        let customer = Customer::retrieve(self.inner(), &customer_id, &[]).await?;

        Ok(customer
            .invoice_settings
            .as_ref()
            .and_then(|settings| settings.default_payment_method.as_ref())
            .map(|method| match method {
                stripe::Expandable::Id(id) => id.to_string(),
                stripe::Expandable::Object(pm) => pm.id.to_string(),
            }))
    }

    async fn list_invoices(&self, customer_id: &str) -> BillingResult<Vec<RemoteInvoice>> {
        let customer = parse_customer_id(customer_id)?;

        let mut params = ListInvoices::new();
        params.customer = Some(customer);

        let invoices = Invoice::list(self.inner(), &params).await?;
        Ok(invoices.data.iter().map(invoice_snapshot).collect())
    }

    async fn list_payment_intents(
        &self,
        customer_id: &str,
    ) -> BillingResult<Vec<RemotePaymentIntent>> {
        let customer = parse_customer_id(customer_id)?;

        let mut params = ListPaymentIntents::new();
        params.customer = Some(customer);

        let intents = PaymentIntent::list(self.inner(), &params).await?;

        // Charges are no longer embedded in payment intents; fetch them per
        // intent and keep the nested shape the normalizer expects.
        let mut snapshots = Vec::with_capacity(intents.data.len());
        for intent in &intents.data {
            let mut charge_params = ListCharges::new();
            charge_params.payment_intent = Some(intent.id.clone());

            let charges = Charge::list(self.inner(), &charge_params).await?;
            snapshots.push(RemotePaymentIntent {
                id: intent.id.to_string(),
                charges: charges.data.iter().map(charge_snapshot).collect(),
            });
        }

        Ok(snapshots)
    }

    async fn get_dispute(&self, dispute_id: &str) -> BillingResult<RemoteDispute> {
        let id: DisputeId = dispute_id
            .parse()
            .map_err(|e| BillingError::StripeApi(format!("Invalid dispute ID: {}", e)))?;

        let dispute = Dispute::retrieve(self.inner(), &id, &[]).await?;
        Ok(dispute_snapshot(&dispute))
    }

    async fn create_refund(&self, refund: RefundParams) -> BillingResult<String> {
        let charge: ChargeId = refund
            .charge
            .parse()
            .map_err(|e| BillingError::StripeApi(format!("Invalid charge ID: {}", e)))?;

        let mut params = CreateRefund::new();
        params.charge = Some(charge);
        params.amount = refund.amount;
        params.metadata = refund.metadata;

        let created = Refund::create(self.inner(), params).await?;
        Ok(created.id.to_string())
    }

    async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> BillingResult<RemoteSubscription> {
        let id = parse_subscription_id(subscription_id)?;

        let params = UpdateSubscription {
            cancel_at_period_end: Some(true),
            ..Default::default()
        };

        let subscription = Subscription::update(self.inner(), &id, params).await?;
        subscription_snapshot(&subscription)
    }

    async fn cancel_now(&self, subscription_id: &str) -> BillingResult<RemoteSubscription> {
        let id = parse_subscription_id(subscription_id)?;

        let params = CancelSubscription {
            cancellation_details: None,
            invoice_now: None,
            prorate: None,
        };

        let subscription = Subscription::cancel(self.inner(), &id, params).await?;
        subscription_snapshot(&subscription)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        product_id: &str,
        price_id: &str,
    ) -> BillingResult<RemoteSubscription> {
        let customer = parse_customer_id(customer_id)?;

        let mut metadata = HashMap::new();
        metadata.insert("product".to_string(), product_id.to_string());

        let mut params = CreateSubscription::new(customer);
        params.items = Some(vec![CreateSubscriptionItems {
            price: Some(price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]);
        params.metadata = Some(metadata);

        let subscription = Subscription::create(self.inner(), params).await?;
        subscription_snapshot(&subscription)
    }

    async fn swap_subscription_price(
        &self,
        subscription_id: &str,
        price_id: &str,
    ) -> BillingResult<RemoteSubscription> {
        let id = parse_subscription_id(subscription_id)?;

        // The price lives on the subscription item, so swapping means
        // repointing the existing item at the new price.
        let current = Subscription::retrieve(self.inner(), &id, &[]).await?;

        let item_id = current
            .items
            .data
            .first()
            .map(|item| item.id.to_string())
            .ok_or_else(|| {
                BillingError::StripeApi(format!("Subscription {} has no items", subscription_id))
            })?;

        let params = UpdateSubscription {
            items: Some(vec![UpdateSubscriptionItems {
                id: Some(item_id),
                price: Some(price_id.to_string()),
                ..Default::default()
            }]),
            proration_behavior: Some(SubscriptionProrationBehavior::CreateProrations),
            ..Default::default()
        };

        let subscription = Subscription::update(self.inner(), &id, params).await?;
        subscription_snapshot(&subscription)
    }

    async fn resume_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<RemoteSubscription> {
        let id = parse_subscription_id(subscription_id)?;

        let params = UpdateSubscription {
            cancel_at_period_end: Some(false),
            ..Default::default()
        };

        let subscription = Subscription::update(self.inner(), &id, params).await?;
        subscription_snapshot(&subscription)
    }
}
