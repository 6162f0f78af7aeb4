//! Route definitions

pub mod billing;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/accounts/{account_id}", get(billing::account_overview))
        .route(
            "/api/accounts/{account_id}/subscriptions",
            post(billing::create_subscription),
        )
        .route(
            "/api/accounts/{account_id}/subscriptions/{subscription_id}",
            put(billing::update_subscription),
        )
        .route(
            "/api/accounts/{account_id}/subscriptions/{subscription_id}/cancel",
            put(billing::cancel_subscription),
        )
        .route(
            "/api/accounts/{account_id}/subscriptions/{subscription_id}/resume",
            put(billing::resume_subscription),
        )
        .route("/api/charges/{charge_id}/refund", post(billing::refund_charge))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
