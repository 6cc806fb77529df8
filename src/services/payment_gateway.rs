use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

/// A Pi payment as reported by the wallet API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub identifier: String,
    pub amount: Decimal,
    pub memo: String,
    pub metadata: Value,
    pub status: PaymentStatus,
    pub txid: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Wallet payment capability
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Open a payment the user has to approve in their wallet
    async fn create_payment(&self, amount: Decimal, memo: &str, metadata: Value) -> AppResult<Payment>;

    /// Wait for the payment to land on chain and mark it complete
    async fn complete_payment(&self, identifier: &str) -> AppResult<Payment>;
}

/// In-memory gateway standing in for the Pi sandbox
pub struct SandboxPaymentGateway {
    payments: RwLock<HashMap<String, Payment>>,
    latency: Duration,
    available: AtomicBool,
}

impl SandboxPaymentGateway {
    pub fn new(latency: Duration) -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
            latency,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the wallet API going down (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn payment(&self, identifier: &str) -> Option<Payment> {
        self.payments.read().await.get(identifier).cloned()
    }

    /// Every payment seen so far, in no particular order
    pub async fn payments(&self) -> Vec<Payment> {
        self.payments.read().await.values().cloned().collect()
    }

    async fn simulate_latency(&self) -> AppResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            warn!("Sandbox payment gateway unavailable");
            return Err(AppError::ExternalService("Pi payment service unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for SandboxPaymentGateway {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl PaymentGateway for SandboxPaymentGateway {
    async fn create_payment(&self, amount: Decimal, memo: &str, metadata: Value) -> AppResult<Payment> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("Payment amount must be positive".to_string()));
        }
        self.simulate_latency().await?;

        let payment = Payment {
            identifier: format!("pay_{}", Uuid::new_v4().simple()),
            amount,
            memo: memo.to_string(),
            metadata,
            status: PaymentStatus::Pending,
            txid: None,
            created_at: Utc::now(),
        };

        info!("Sandbox payment {} created for {} π", payment.identifier, amount);
        self.payments
            .write()
            .await
            .insert(payment.identifier.clone(), payment.clone());
        Ok(payment)
    }

    async fn complete_payment(&self, identifier: &str) -> AppResult<Payment> {
        self.simulate_latency().await?;

        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(identifier)
            .ok_or_else(|| AppError::NotFound(format!("Payment {}", identifier)))?;

        if payment.status == PaymentStatus::Completed {
            return Err(AppError::BusinessLogic(format!(
                "Payment {} already completed",
                identifier
            )));
        }

        let txid = hex::encode(Sha256::digest(identifier.as_bytes()));
        payment.status = PaymentStatus::Completed;
        payment.txid = Some(txid);

        info!("Sandbox payment {} completed", identifier);
        Ok(payment.clone())
    }
}
