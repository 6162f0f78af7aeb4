// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for the Billing Facade
//!
//! Exercises the boundary conditions of:
//! - Account overview assembly (early returns, brief mode, pass-through)
//! - Invoice association and charge flattening
//! - Subscription mutations (cancel/create/swap/resume)
//! - Refund parameter construction

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::{BillableAccount, LocalSubscription, MockAccountRepository};
use crate::client::{
    MockBillingGateway, RemoteInvoice, RemotePaymentIntent, RemotePlan, RemoteSubscription,
};

fn account(id: Uuid, stripe_id: Option<&str>) -> BillableAccount {
    let now = OffsetDateTime::now_utc();
    BillableAccount {
        id,
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        stripe_id: stripe_id.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

fn local_subscription(account_id: Uuid, stripe_id: Option<&str>) -> LocalSubscription {
    let now = OffsetDateTime::now_utc();
    LocalSubscription {
        id: Uuid::new_v4(),
        account_id,
        plan: "starter".to_string(),
        stripe_id: stripe_id.map(str::to_string),
        quantity: 1,
        trial_ends_at: None,
        ends_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn remote_subscription(id: &str) -> RemoteSubscription {
    RemoteSubscription {
        id: id.to_string(),
        plan: RemotePlan {
            id: "price_1".to_string(),
            amount: Some(1000),
            interval: Some("month".to_string()),
            currency: Some("usd".to_string()),
            ..Default::default()
        },
        collection_method: Some("charge_automatically".to_string()),
        billing_cycle_anchor: Some(1_709_296_245),
        current_period_start: Some(1_709_296_245),
        current_period_end: Some(1_711_974_645),
        cancel_at_period_end: false,
        ..Default::default()
    }
}

#[cfg(test)]
mod overview_tests {
    use super::*;
    use crate::error::BillingError;
    use crate::overview::{AccountOverviewService, SubscriptionView};

    // =========================================================================
    // Account without a Stripe customer - catalogue only, no customer lookups
    // =========================================================================
    #[tokio::test]
    async fn test_non_customer_account_gets_catalogue_only() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, None))));
        repository
            .expect_find_subscriptions()
            .returning(|account_id, _| Ok(vec![local_subscription(account_id, Some("sub_1"))]));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_get_subscription().never();
        gateway.expect_list_payment_methods().never();
        gateway.expect_list_invoices().never();
        gateway.expect_list_payment_intents().never();
        gateway.expect_list_plans().times(1).returning(|_| {
            Ok(vec![RemotePlan {
                id: "price_1".to_string(),
                amount: Some(1000),
                ..Default::default()
            }])
        });

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let overview = service.account_overview(account_id, None, false).await.unwrap();

        assert!(overview.user.is_none());
        assert!(overview.subscriptions.is_empty());
        assert!(overview.cards.is_empty());
        assert!(overview.invoices.is_empty());
        assert!(overview.charges.is_empty());
        assert_eq!(overview.plans.len(), 1);
    }

    // =========================================================================
    // Customer account with no subscription rows - same early return
    // =========================================================================
    #[tokio::test]
    async fn test_account_without_subscriptions_gets_catalogue_only() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, Some("cus_1")))));
        repository
            .expect_find_subscriptions()
            .returning(|_, _| Ok(vec![]));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_list_payment_methods().never();
        gateway.expect_list_invoices().never();
        gateway
            .expect_list_plans()
            .times(1)
            .returning(|_| Ok(vec![]));

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let overview = service.account_overview(account_id, None, false).await.unwrap();

        assert!(overview.subscriptions.is_empty());
    }

    // =========================================================================
    // Unknown account id - typed NotFound
    // =========================================================================
    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let mut repository = MockAccountRepository::new();
        repository.expect_find_account().returning(|_| Ok(None));

        let gateway = MockBillingGateway::new();
        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));

        let err = service
            .account_overview(Uuid::new_v4(), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::AccountNotFound(_)));
    }

    // =========================================================================
    // Subscription row never created remotely - passed through verbatim
    // =========================================================================
    #[tokio::test]
    async fn test_unsynced_subscription_passes_through() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, Some("cus_1")))));
        repository
            .expect_find_subscriptions()
            .returning(|account_id, _| Ok(vec![local_subscription(account_id, None)]));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_get_subscription().never();

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let overview = service.account_overview(account_id, None, true).await.unwrap();

        assert_eq!(overview.subscriptions.len(), 1);
        match &overview.subscriptions[0] {
            SubscriptionView::Pending(row) => assert_eq!(row.plan, "starter"),
            SubscriptionView::Merged(_) => panic!("unsynced row must not be merged"),
        }
    }

    // =========================================================================
    // Brief mode - secondary collections empty, their fetches never issued
    // =========================================================================
    #[tokio::test]
    async fn test_brief_mode_skips_secondary_fetches() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, Some("cus_1")))));
        repository
            .expect_find_subscriptions()
            .returning(|account_id, _| Ok(vec![local_subscription(account_id, Some("sub_1"))]));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_subscription()
            .times(1)
            .returning(|id| Ok(remote_subscription(id)));
        gateway.expect_list_payment_methods().never();
        gateway.expect_default_payment_method().never();
        gateway.expect_list_invoices().never();
        gateway.expect_list_payment_intents().never();
        gateway.expect_list_plans().never();

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let overview = service.account_overview(account_id, None, true).await.unwrap();

        assert_eq!(overview.subscriptions.len(), 1);
        assert!(overview.cards.is_empty());
        assert!(overview.invoices.is_empty());
        assert!(overview.charges.is_empty());
        assert!(overview.plans.is_empty());
    }

    // =========================================================================
    // Full view - merge fields populated, invoices filtered to own
    // subscriptions, foreign and unassociated invoices dropped
    // =========================================================================
    #[tokio::test]
    async fn test_full_view_merges_and_filters() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, Some("cus_1")))));
        repository
            .expect_find_subscriptions()
            .returning(|account_id, _| Ok(vec![local_subscription(account_id, Some("sub_1"))]));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_subscription()
            .times(1)
            .returning(|id| Ok(remote_subscription(id)));
        gateway
            .expect_list_payment_methods()
            .times(1)
            .returning(|_| Ok(vec![]));
        gateway
            .expect_default_payment_method()
            .times(1)
            .returning(|_| Ok(None));
        gateway.expect_list_invoices().times(1).returning(|_| {
            Ok(vec![
                RemoteInvoice {
                    id: "in_own".to_string(),
                    subscription: Some("sub_1".to_string()),
                    ..Default::default()
                },
                RemoteInvoice {
                    id: "in_foreign".to_string(),
                    subscription: Some("sub_other".to_string()),
                    ..Default::default()
                },
                RemoteInvoice {
                    id: "in_detached".to_string(),
                    subscription: None,
                    ..Default::default()
                },
            ])
        });
        gateway
            .expect_list_payment_intents()
            .times(1)
            .returning(|_| Ok(vec![RemotePaymentIntent::default()]));
        gateway
            .expect_list_plans()
            .times(1)
            .returning(|_| Ok(vec![]));

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let overview = service.account_overview(account_id, None, false).await.unwrap();

        assert!(overview.user.is_some());
        assert_eq!(overview.invoices.len(), 1);
        assert_eq!(overview.invoices[0].id, "in_own");

        match &overview.subscriptions[0] {
            SubscriptionView::Merged(merged) => {
                assert!(merged.charges_automatically);
                assert_eq!(merged.plan_amount, Some(1000));
                assert_eq!(merged.plan_interval.as_deref(), Some("month"));
                assert_eq!(merged.plan, "starter");
                assert_eq!(merged.stripe_plan, "price_1");
            }
            SubscriptionView::Pending(_) => panic!("synced row must be merged"),
        }
    }

    // =========================================================================
    // Remote fetch failure propagates as-is
    // =========================================================================
    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let account_id = Uuid::new_v4();

        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, Some("cus_1")))));
        repository
            .expect_find_subscriptions()
            .returning(|account_id, _| Ok(vec![local_subscription(account_id, Some("sub_1"))]));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_subscription()
            .returning(|_| Err(BillingError::StripeApi("connection reset".to_string())));

        let service = AccountOverviewService::new(Arc::new(repository), Arc::new(gateway));
        let err = service
            .account_overview(account_id, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::StripeApi(_)));
    }
}

#[cfg(test)]
mod mutation_tests {
    use super::*;
    use crate::error::BillingError;
    use crate::subscriptions::{PlanSelection, SubscriptionService};
    use mockall::predicate::eq;

    fn repository_with(
        stripe_customer: Option<&str>,
        subscription: Option<LocalSubscription>,
    ) -> MockAccountRepository {
        let stripe_customer = stripe_customer.map(str::to_string);
        let mut repository = MockAccountRepository::new();
        repository
            .expect_find_account()
            .returning(move |id| Ok(Some(account(id, stripe_customer.as_deref()))));
        repository
            .expect_find_subscriptions()
            .returning(move |_, _| Ok(subscription.clone().into_iter().collect()));
        repository
    }

    // =========================================================================
    // Graceful cancel goes through cancel-at-period-end
    // =========================================================================
    #[tokio::test]
    async fn test_graceful_cancel() {
        let account_id = Uuid::new_v4();
        let row = local_subscription(account_id, Some("sub_1"));
        let subscription_id = row.id;

        let repository = repository_with(Some("cus_1"), Some(row));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_cancel_now().never();
        gateway
            .expect_cancel_at_period_end()
            .with(eq("sub_1"))
            .times(1)
            .returning(|id| {
                let mut sub = remote_subscription(id);
                sub.cancel_at_period_end = true;
                Ok(sub)
            });

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let result = service.cancel(account_id, subscription_id, false).await.unwrap();
        assert!(result.cancel_at_period_end);
    }

    // =========================================================================
    // Immediate cancel goes through cancel-now
    // =========================================================================
    #[tokio::test]
    async fn test_immediate_cancel() {
        let account_id = Uuid::new_v4();
        let row = local_subscription(account_id, Some("sub_1"));
        let subscription_id = row.id;

        let repository = repository_with(Some("cus_1"), Some(row));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_cancel_at_period_end().never();
        gateway
            .expect_cancel_now()
            .with(eq("sub_1"))
            .times(1)
            .returning(|id| Ok(remote_subscription(id)));

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        service.cancel(account_id, subscription_id, true).await.unwrap();
    }

    // =========================================================================
    // Cancel on a row that does not resolve - NotFound
    // =========================================================================
    #[tokio::test]
    async fn test_cancel_unknown_subscription() {
        let account_id = Uuid::new_v4();
        let repository = repository_with(Some("cus_1"), None);
        let gateway = MockBillingGateway::new();

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let err = service
            .cancel(account_id, Uuid::new_v4(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::SubscriptionNotFound(_)));
    }

    // =========================================================================
    // Cancel on a row never created remotely - typed invalid input
    // =========================================================================
    #[tokio::test]
    async fn test_cancel_unsynced_subscription() {
        let account_id = Uuid::new_v4();
        let row = local_subscription(account_id, None);
        let subscription_id = row.id;

        let repository = repository_with(Some("cus_1"), Some(row));
        let gateway = MockBillingGateway::new();

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let err = service
            .cancel(account_id, subscription_id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    // =========================================================================
    // Create requires a Stripe customer on the account
    // =========================================================================
    #[tokio::test]
    async fn test_create_without_customer() {
        let account_id = Uuid::new_v4();
        let repository = repository_with(None, None);
        let gateway = MockBillingGateway::new();

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let err = service
            .create(
                account_id,
                PlanSelection {
                    price_id: "price_1".to_string(),
                    product_id: "prod_1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::CustomerMissing(_)));
    }

    // =========================================================================
    // Create validates the plan selection before any lookups
    // =========================================================================
    #[tokio::test]
    async fn test_create_with_missing_price() {
        let repository = MockAccountRepository::new();
        let gateway = MockBillingGateway::new();

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let err = service
            .create(
                Uuid::new_v4(),
                PlanSelection {
                    price_id: String::new(),
                    product_id: "prod_1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidInput(_)));
    }

    // =========================================================================
    // Create forwards customer, product, and price to the provider
    // =========================================================================
    #[tokio::test]
    async fn test_create_forwards_plan_selection() {
        let account_id = Uuid::new_v4();
        let repository = repository_with(Some("cus_1"), None);

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_subscription()
            .with(eq("cus_1"), eq("prod_1"), eq("price_1"))
            .times(1)
            .returning(|_, _, _| Ok(remote_subscription("sub_new")));

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        let created = service
            .create(
                account_id,
                PlanSelection {
                    price_id: "price_1".to_string(),
                    product_id: "prod_1".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(created.id, "sub_new");
    }

    // =========================================================================
    // Swap repoints the remote price AND overwrites the local plan label
    // =========================================================================
    #[tokio::test]
    async fn test_swap_updates_remote_and_local_label() {
        let account_id = Uuid::new_v4();
        let row = local_subscription(account_id, Some("sub_1"));
        let subscription_id = row.id;

        let mut repository = repository_with(Some("cus_1"), Some(row));
        repository
            .expect_update_subscription_plan()
            .with(eq(subscription_id), eq("price_2"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_swap_subscription_price()
            .with(eq("sub_1"), eq("price_2"))
            .times(1)
            .returning(|id, _| Ok(remote_subscription(id)));

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        service
            .swap_plan(account_id, subscription_id, "price_2")
            .await
            .unwrap();
    }

    // =========================================================================
    // Resume lifts a pending cancellation
    // =========================================================================
    #[tokio::test]
    async fn test_resume() {
        let account_id = Uuid::new_v4();
        let row = local_subscription(account_id, Some("sub_1"));
        let subscription_id = row.id;

        let repository = repository_with(Some("cus_1"), Some(row));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_resume_subscription()
            .with(eq("sub_1"))
            .times(1)
            .returning(|id| Ok(remote_subscription(id)));

        let service = SubscriptionService::new(Arc::new(repository), Arc::new(gateway));
        service.resume(account_id, subscription_id).await.unwrap();
    }
}

#[cfg(test)]
mod refund_tests {
    use super::*;
    use crate::refund::RefundService;

    // =========================================================================
    // Refund request carries charge, amount override, and notes metadata
    // =========================================================================
    #[tokio::test]
    async fn test_refund_request_shape() {
        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_refund()
            .withf(|params| {
                params.charge == "ch_1"
                    && params.amount == Some(500)
                    && params
                        .metadata
                        .as_ref()
                        .and_then(|m| m.get("notes"))
                        .map(String::as_str)
                        == Some("partial")
            })
            .times(1)
            .returning(|_| Ok("re_1".to_string()));

        let service = RefundService::new(Arc::new(gateway));
        let refund_id = service
            .refund_charge("ch_1", Some(500), Some("partial".to_string()))
            .await
            .unwrap();
        assert_eq!(refund_id, "re_1");
    }

    // =========================================================================
    // Omitted amount means a full refund with no metadata attached
    // =========================================================================
    #[tokio::test]
    async fn test_full_refund_omits_optionals() {
        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_refund()
            .withf(|params| params.amount.is_none() && params.metadata.is_none())
            .times(1)
            .returning(|_| Ok("re_2".to_string()));

        let service = RefundService::new(Arc::new(gateway));
        service.refund_charge("ch_1", None, None).await.unwrap();
    }
}
