//! Admin-initiated charge refunds
//!
//! Builds the refund request (optional partial amount, free-form note as
//! metadata) and forwards it to the provider. Nothing is persisted locally.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{BillingGateway, RefundParams};
use crate::error::{BillingError, BillingResult};

/// Refund operations against provider charges
pub struct RefundService<G> {
    gateway: Arc<G>,
}

impl<G> RefundService<G>
where
    G: BillingGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Refund a charge.
    ///
    /// `amount` overrides the refunded amount in the smallest currency
    /// unit; omitted means the full original charge. `notes` is attached
    /// as refund metadata under a `notes` key.
    pub async fn refund_charge(
        &self,
        charge_id: &str,
        amount: Option<i64>,
        notes: Option<String>,
    ) -> BillingResult<String> {
        if charge_id.is_empty() {
            return Err(BillingError::InvalidInput("Missing charge id".to_string()));
        }

        let params = build_refund_params(charge_id, amount, notes);
        let refund_id = self.gateway.create_refund(params).await?;

        tracing::info!(
            charge_id = %charge_id,
            refund_id = %refund_id,
            amount = ?amount,
            "Issued refund"
        );

        Ok(refund_id)
    }
}

fn build_refund_params(
    charge_id: &str,
    amount: Option<i64>,
    notes: Option<String>,
) -> RefundParams {
    let metadata = notes.map(|notes| {
        let mut metadata = HashMap::new();
        metadata.insert("notes".to_string(), notes);
        metadata
    });

    RefundParams {
        charge: charge_id.to_string(),
        amount,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_refund_with_note() {
        let params = build_refund_params("ch_1", Some(500), Some("partial".to_string()));

        assert_eq!(params.charge, "ch_1");
        assert_eq!(params.amount, Some(500));
        let metadata = params.metadata.unwrap();
        assert_eq!(metadata.get("notes").map(String::as_str), Some("partial"));
    }

    #[test]
    fn test_full_refund_has_no_amount_or_metadata() {
        let params = build_refund_params("ch_1", None, None);

        assert_eq!(params.charge, "ch_1");
        assert_eq!(params.amount, None);
        assert!(params.metadata.is_none());
    }
}
