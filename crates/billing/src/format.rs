//! Flatteners for the remote collections in the account view
//!
//! Each formatter turns a list of remote snapshots into the flat shapes the
//! admin UI consumes. Invoices are additionally filtered against the set of
//! subscription ids that belong to the account being viewed - an invoice
//! that cannot be tied to one of those subscriptions never leaves the
//! server.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::client::{
    BillingGateway, RemoteDispute, RemoteInvoice, RemotePaymentIntent, RemotePaymentMethod,
    RemotePlan,
};
use crate::error::BillingResult;
use crate::timefmt;

/// Card payment method as shown in the account view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub is_default: bool,
    pub name: Option<String>,
    pub last4: String,
    pub country: Option<String>,
    pub brand: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

/// Invoice as shown in the account view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceView {
    pub id: String,
    pub subscription_id: Option<String>,
    pub total: i64,
    pub attempted: bool,
    pub charge_id: Option<String>,
    pub currency: String,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Charge as shown in the account view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeView {
    pub id: String,
    pub amount: i64,
    pub amount_refunded: i64,
    pub captured: bool,
    pub paid: bool,
    pub status: String,
    pub currency: String,
    pub dispute: Option<RemoteDispute>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub created: Option<String>,
}

/// Catalogue plan as shown in the account view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanView {
    pub id: String,
    pub nickname: Option<String>,
    pub price: Option<i64>,
    pub interval: Option<String>,
    pub currency: Option<String>,
    pub product: Option<String>,
}

/// Flatten card payment methods, marking the customer's default by id
pub fn format_payment_methods(
    methods: &[RemotePaymentMethod],
    default_id: Option<&str>,
) -> Vec<CardView> {
    methods
        .iter()
        .map(|method| CardView {
            id: method.id.clone(),
            is_default: default_id == Some(method.id.as_str()),
            name: method.name.clone(),
            last4: method.last4.clone(),
            country: method.country.clone(),
            brand: method.brand.clone(),
            exp_month: method.exp_month,
            exp_year: method.exp_year,
        })
        .collect()
}

/// Flatten invoices, keeping only those tied to one of the given
/// subscription ids. Invoices without a subscription are dropped; an empty
/// id set yields an empty result.
pub fn format_invoices(
    invoices: &[RemoteInvoice],
    subscription_ids: &HashSet<String>,
) -> Vec<InvoiceView> {
    invoices
        .iter()
        .filter(|invoice| {
            invoice
                .subscription
                .as_ref()
                .is_some_and(|id| subscription_ids.contains(id))
        })
        .map(|invoice| InvoiceView {
            id: invoice.id.clone(),
            subscription_id: invoice.subscription.clone(),
            total: invoice.total,
            attempted: invoice.attempted,
            charge_id: invoice.charge.clone(),
            currency: invoice.currency.clone(),
            period_start: timefmt::datetime_string(invoice.period_start),
            period_end: timefmt::datetime_string(invoice.period_end),
            metadata: invoice.metadata.clone(),
        })
        .collect()
}

/// Flatten payment intents into their charges, preserving intent order and
/// nested charge order. A charge carrying a dispute id gets the dispute
/// resolved to a full object.
pub async fn format_payment_intents<G: BillingGateway>(
    intents: &[RemotePaymentIntent],
    gateway: &G,
) -> BillingResult<Vec<ChargeView>> {
    let mut views = Vec::new();

    for intent in intents {
        for charge in &intent.charges {
            let dispute = match &charge.dispute {
                Some(dispute_id) => Some(gateway.get_dispute(dispute_id).await?),
                None => None,
            };

            views.push(ChargeView {
                id: charge.id.clone(),
                amount: charge.amount,
                amount_refunded: charge.amount_refunded,
                captured: charge.captured,
                paid: charge.paid,
                status: charge.status.clone(),
                currency: charge.currency.clone(),
                dispute,
                failure_code: charge.failure_code.clone(),
                failure_message: charge.failure_message.clone(),
                created: timefmt::datetime_string(charge.created),
            });
        }
    }

    Ok(views)
}

/// Flatten the plan catalogue
pub fn format_plans(plans: &[RemotePlan]) -> Vec<PlanView> {
    plans
        .iter()
        .map(|plan| PlanView {
            id: plan.id.clone(),
            nickname: plan.nickname.clone(),
            price: plan.amount,
            interval: plan.interval.clone(),
            currency: plan.currency.clone(),
            product: plan.product.clone(),
        })
        .collect()
}
