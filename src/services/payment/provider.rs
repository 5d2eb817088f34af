use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{synthesize_reference, PaymentMethod, PaymentStatus};

/// What an adapter needs to charge the payer for one payment row.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payer_phone: String,
    pub reference_no: String,
    pub payer_message: String,
    pub payee_note: String,
}

impl ChargeRequest {
    /// Payer number as providers expect it: digits only.
    pub fn msisdn(&self) -> String {
        self.payer_phone.chars().filter(char::is_ascii_digit).collect()
    }

    pub fn amount_string(&self) -> String {
        format!("{:.2}", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChargeResult {
    pub success: bool,
    pub transaction_id: String,
    pub reference_no: String,
    pub status: PaymentStatus,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} rejected the request with HTTP {status}: {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} authentication failed: {reason}")]
    Authentication {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} returned an unexpected response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

/// One payment channel. Implementations must not retry; the orchestrator
/// owns timeouts and cancellation.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn method(&self) -> PaymentMethod;

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderError>;
}

/// Provider status vocabulary to payment status. Anything that is not a
/// definite success or failure keeps the payment pending.
pub fn map_provider_status(status: &str) -> PaymentStatus {
    match status.trim().to_ascii_uppercase().as_str() {
        "SUCCESSFUL" | "SUCCESS" => PaymentStatus::Completed,
        "FAILED" | "REJECTED" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

/// Cash and bank transfers: recorded as paid without a network call.
pub struct OfflineAdapter {
    method: PaymentMethod,
}

impl OfflineAdapter {
    pub fn cash() -> Self {
        Self {
            method: PaymentMethod::Cash,
        }
    }

    pub fn bank() -> Self {
        Self {
            method: PaymentMethod::Bank,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OfflineAdapter {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderError> {
        let message = match self.method {
            PaymentMethod::Bank => "Bank transfer recorded",
            _ => "Cash payment recorded",
        };

        Ok(ChargeResult {
            success: true,
            transaction_id: synthesize_reference(self.method.reference_prefix(), Utc::now()),
            reference_no: request.reference_no.clone(),
            status: PaymentStatus::Completed,
            message: message.to_string(),
        })
    }
}

/// Stand-in for a mobile-money provider whose endpoint is not configured.
pub struct SimulatedAdapter {
    method: PaymentMethod,
}

impl SimulatedAdapter {
    pub fn new(method: PaymentMethod) -> Self {
        Self { method }
    }
}

#[async_trait]
impl ProviderAdapter for SimulatedAdapter {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderError> {
        tracing::warn!(
            payment_id = %request.payment_id,
            method = self.method.as_str(),
            "Provider not configured, simulating a successful charge"
        );

        Ok(ChargeResult {
            success: true,
            transaction_id: synthesize_reference(self.method.reference_prefix(), Utc::now()),
            reference_no: request.reference_no.clone(),
            status: PaymentStatus::Completed,
            message: "Payment processed successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment::testing::charge_request;

    #[test]
    fn provider_status_mapping() {
        assert_eq!(map_provider_status("SUCCESSFUL"), PaymentStatus::Completed);
        assert_eq!(map_provider_status("successful"), PaymentStatus::Completed);
        assert_eq!(map_provider_status("FAILED"), PaymentStatus::Failed);
        assert_eq!(map_provider_status("REJECTED"), PaymentStatus::Failed);
        assert_eq!(map_provider_status("PENDING"), PaymentStatus::Pending);
        assert_eq!(map_provider_status("TIMEOUT"), PaymentStatus::Pending);
        assert_eq!(map_provider_status(""), PaymentStatus::Pending);
    }

    #[test]
    fn request_formats_for_providers() {
        let request = charge_request();
        assert_eq!(request.msisdn(), "260977123456");
        assert_eq!(request.amount_string(), "5000.00");
    }

    #[tokio::test]
    async fn offline_adapters_complete_with_prefixed_ids() {
        let request = charge_request();

        let cash = OfflineAdapter::cash().charge(&request).await.unwrap();
        assert!(cash.success);
        assert_eq!(cash.status, PaymentStatus::Completed);
        assert!(cash.transaction_id.starts_with("CASH_"));
        assert_eq!(cash.reference_no, request.reference_no);

        let bank = OfflineAdapter::bank().charge(&request).await.unwrap();
        assert!(bank.transaction_id.starts_with("BANK_"));
        assert_eq!(bank.message, "Bank transfer recorded");
    }

    #[tokio::test]
    async fn simulated_adapter_uses_provider_prefix() {
        let result = SimulatedAdapter::new(PaymentMethod::Airtel)
            .charge(&charge_request())
            .await
            .unwrap();
        assert!(result.transaction_id.starts_with("AIRTEL_"));
        assert_eq!(result.status, PaymentStatus::Completed);
    }
}
