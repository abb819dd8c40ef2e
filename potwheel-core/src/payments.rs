use crate::error::Result;
use crate::storage::{BalanceStore, PaymentStore};
use crate::types::{OwnerId, PaymentRecord, SuccessfulPayment};
use chrono::Utc;
use std::sync::Arc;

/// Turns provider payment notifications into balance credits
pub struct PaymentService {
    payments: Arc<dyn PaymentStore>,
    balances: Arc<dyn BalanceStore>,
    stars_per_unit: u64,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        balances: Arc<dyn BalanceStore>,
        stars_per_unit: u64,
    ) -> Self {
        Self {
            payments,
            balances,
            stars_per_unit,
        }
    }

    /// Units of balance a payment of `total_amount` is worth
    pub fn units_for(&self, total_amount: u64) -> f64 {
        total_amount as f64 / self.stars_per_unit as f64
    }

    /// Record the payment and credit its owner. Returns the new balance,
    /// or `None` when this charge was already applied.
    ///
    /// If the credit fails the record is removed again, so the same charge
    /// can be applied on a later attempt.
    pub async fn apply(&self, owner: &OwnerId, payment: SuccessfulPayment) -> Result<Option<f64>> {
        let credited = self.units_for(payment.total_amount);
        let record = PaymentRecord {
            charge_id: payment.charge_id,
            owner_id: owner.clone(),
            amount: payment.total_amount,
            currency: payment.currency,
            credited,
            timestamp: Utc::now(),
        };

        if !self.payments.record_payment(&record).await? {
            tracing::warn!("Payment {} already applied, skipping", record.charge_id);
            return Ok(None);
        }

        let balance = match self.balances.adjust_balance(owner, credited).await {
            Ok(balance) => balance,
            Err(e) => {
                // Uncredited charges must stay retryable
                if let Err(undo) = self.payments.remove_payment(&record.charge_id).await {
                    tracing::error!(
                        "Payment {} recorded but not credited, rollback failed: {}",
                        record.charge_id,
                        undo
                    );
                }
                return Err(e);
            }
        };
        tracing::info!(
            "Payment {} from {}: {} {} credited as {:.2}, balance now {:.2}",
            record.charge_id,
            owner,
            record.amount,
            record.currency,
            credited,
            balance
        );

        Ok(Some(balance))
    }

    pub async fn has_payments(&self, owner: &OwnerId) -> Result<bool> {
        self.payments.has_payments(owner).await
    }
}
