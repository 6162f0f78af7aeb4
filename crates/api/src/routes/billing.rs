//! Billing routes
//!
//! Thin handlers over the billing services: decode the request, call the
//! service, encode the response. All decisions live in the billing crate.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cashier_billing::{AccountOverview, PlanSelection, RemoteSubscription};

use crate::error::ApiResult;
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    /// Narrow the view to a single local subscription
    pub subscription_id: Option<Uuid>,
    /// Skip the cards/invoices/charges/plans collections
    #[serde(default)]
    pub brief: bool,
}

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    /// Price id to subscribe to
    pub id: String,
    /// Product grouping the price belongs to
    pub product: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan: PlanPayload,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    /// New plan (price) id to swap to
    pub plan: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    /// End access immediately instead of at period end
    #[serde(default)]
    pub now: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefundChargeRequest {
    /// Partial amount in the smallest currency unit; omitted = full refund
    pub amount: Option<i64>,
    /// Free-form note attached as refund metadata
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefundChargeResponse {
    pub refund_id: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/accounts/{account_id}
pub async fn account_overview(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<OverviewQuery>,
) -> ApiResult<Json<AccountOverview>> {
    let overview = state
        .billing
        .overview
        .account_overview(account_id, query.subscription_id, query.brief)
        .await?;

    Ok(Json(overview))
}

/// POST /api/accounts/{account_id}/subscriptions
pub async fn create_subscription(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<RemoteSubscription>> {
    let subscription = state
        .billing
        .subscriptions
        .create(
            account_id,
            PlanSelection {
                price_id: request.plan.id,
                product_id: request.plan.product,
            },
        )
        .await?;

    Ok(Json(subscription))
}

/// PUT /api/accounts/{account_id}/subscriptions/{subscription_id}
pub async fn update_subscription(
    State(state): State<AppState>,
    Path((account_id, subscription_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<RemoteSubscription>> {
    let subscription = state
        .billing
        .subscriptions
        .swap_plan(account_id, subscription_id, &request.plan)
        .await?;

    Ok(Json(subscription))
}

/// PUT /api/accounts/{account_id}/subscriptions/{subscription_id}/cancel
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path((account_id, subscription_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> ApiResult<Json<RemoteSubscription>> {
    let subscription = state
        .billing
        .subscriptions
        .cancel(account_id, subscription_id, request.now)
        .await?;

    Ok(Json(subscription))
}

/// PUT /api/accounts/{account_id}/subscriptions/{subscription_id}/resume
pub async fn resume_subscription(
    State(state): State<AppState>,
    Path((account_id, subscription_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<RemoteSubscription>> {
    let subscription = state
        .billing
        .subscriptions
        .resume(account_id, subscription_id)
        .await?;

    Ok(Json(subscription))
}

/// POST /api/charges/{charge_id}/refund
pub async fn refund_charge(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
    Json(request): Json<RefundChargeRequest>,
) -> ApiResult<Json<RefundChargeResponse>> {
    let refund_id = state
        .billing
        .refunds
        .refund_charge(&charge_id, request.amount, request.notes)
        .await?;

    Ok(Json(RefundChargeResponse { refund_id }))
}
