//! Payment processing: commission, provider dispatch and settlement.

pub mod airtel;
pub mod mtn;
pub mod provider;

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

pub use provider::{
    map_provider_status, ChargeRequest, ChargeResult, OfflineAdapter, ProviderAdapter,
    ProviderError, SimulatedAdapter,
};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    calculate_commission, synthesize_reference, with_random_suffix, CreatePaymentRequest, House, NewNotification,
    Payment, PaymentMethod, PaymentStatus, User,
};
use crate::repository::{HouseRepository, NewPayment, PaymentRepository, RentalRepository, UserRepository};
use crate::services::outbox::{NotificationDispatcher, Outbox};

use airtel::AirtelAdapter;
use mtn::MtnAdapter;

const SYNTHESIZED_REFERENCE_RETRIES: u32 = 3;

/// Adapter per payment method.
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<PaymentMethod, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.method(), a)).collect(),
        }
    }

    /// Real REST adapters for configured providers, simulated ones otherwise.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.payment_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mtn: Arc<dyn ProviderAdapter> = match &config.mtn {
            Some(mtn) => Arc::new(MtnAdapter::new(client.clone(), mtn.clone())),
            None => {
                tracing::warn!("MTN MoMo is not configured, payments will be simulated");
                Arc::new(SimulatedAdapter::new(PaymentMethod::Mtn))
            }
        };

        let airtel: Arc<dyn ProviderAdapter> = match &config.airtel {
            Some(airtel) => Arc::new(AirtelAdapter::new(client, airtel.clone())),
            None => {
                tracing::warn!("Airtel Money is not configured, payments will be simulated");
                Arc::new(SimulatedAdapter::new(PaymentMethod::Airtel))
            }
        };

        Ok(Self::new(vec![
            mtn,
            airtel,
            Arc::new(OfflineAdapter::cash()),
            Arc::new(OfflineAdapter::bank()),
        ]))
    }

    pub fn get(&self, method: PaymentMethod) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&method).cloned()
    }
}

/// How a single adapter call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Completed(ChargeResult),
    Pending(ChargeResult),
    Failed(String),
    Cancelled,
}

/// Runs one adapter call bounded by `timeout` and `cancel`. Errors and
/// `success = false` both end up as `Failed`.
pub async fn dispatch_charge(
    adapter: &dyn ProviderAdapter,
    request: &ChargeRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ChargeOutcome {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => ChargeOutcome::Cancelled,
        outcome = tokio::time::timeout(timeout, adapter.charge(request)) => match outcome {
            Err(_) => ChargeOutcome::Failed(format!(
                "{} did not respond within {}s",
                adapter.method().as_str(),
                timeout.as_secs()
            )),
            Ok(Err(err)) => ChargeOutcome::Failed(err.to_string()),
            Ok(Ok(result)) if !result.success => ChargeOutcome::Failed(result.message),
            Ok(Ok(result)) => match result.status {
                PaymentStatus::Completed => ChargeOutcome::Completed(result),
                PaymentStatus::Pending => ChargeOutcome::Pending(result),
                _ => ChargeOutcome::Failed(result.message),
            },
        },
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub result: ChargeResult,
}

impl PaymentOutcome {
    pub fn message(&self) -> &'static str {
        match self.payment.status {
            PaymentStatus::Completed => "Payment processed successfully",
            _ => "Payment is pending confirmation",
        }
    }
}

pub struct PaymentOrchestrator {
    pool: PgPool,
    dispatcher: NotificationDispatcher,
    providers: ProviderRegistry,
    commission_rate: Decimal,
    timeout: Duration,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(
        pool: PgPool,
        dispatcher: NotificationDispatcher,
        providers: ProviderRegistry,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            dispatcher,
            providers,
            commission_rate: config.commission_rate,
            timeout: config.payment_timeout,
            currency: config.currency.clone(),
        }
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    /// Records a pending payment, charges it through the method's adapter and
    /// settles the row. A cancelled call leaves the payment pending.
    pub async fn process(
        &self,
        actor: &User,
        request: CreatePaymentRequest,
        cancel: CancellationToken,
    ) -> AppResult<PaymentOutcome> {
        let agreement = RentalRepository::find_by_id(&self.pool, request.agreement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rental agreement not found".to_string()))?;

        if !actor.role.is_admin() && agreement.tenant_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only make payments for your own agreements".to_string(),
            ));
        }

        if !agreement.status.is_active() {
            return Err(AppError::BadRequest(
                "Cannot make payment for inactive agreement".to_string(),
            ));
        }

        let house = HouseRepository::find_by_id(&self.pool, agreement.house_id)
            .await?
            .ok_or_else(|| AppError::NotFound("House not found".to_string()))?;

        let payer_phone = if agreement.tenant_id == actor.id {
            actor.phone.clone()
        } else {
            UserRepository::find_by_id(&self.pool, agreement.tenant_id)
                .await?
                .map(|tenant| tenant.phone)
                .unwrap_or_default()
        };

        let now = Utc::now();
        let supplied_reference = request
            .reference_no
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let base_reference = supplied_reference
            .clone()
            .unwrap_or_else(|| synthesize_reference("PAY", now));

        let mut reference_no = base_reference.clone();
        let mut retries = 0;
        let payment = loop {
            let inserted = PaymentRepository::insert(
                &self.pool,
                &NewPayment {
                    agreement_id: agreement.id,
                    amount: request.amount,
                    method: request.method,
                    reference_no: reference_no.clone(),
                    commission: calculate_commission(request.amount, self.commission_rate),
                    payment_date: now,
                },
            )
            .await;

            match inserted {
                // Only synthesized references are retried; a client reference is theirs to fix.
                Err(AppError::Conflict(_))
                    if supplied_reference.is_none() && retries < SYNTHESIZED_REFERENCE_RETRIES =>
                {
                    retries += 1;
                    reference_no = with_random_suffix(&base_reference);
                    tracing::debug!(reference_no = %reference_no, "Synthesized reference taken, retrying");
                }
                other => break other.map_err(|e| e.on_conflict("Payment reference already exists"))?,
            }
        };

        tracing::info!(
            payment_id = %payment.id,
            agreement_id = %agreement.id,
            method = payment.method.as_str(),
            amount = %payment.amount,
            "Payment recorded as pending"
        );

        let adapter = self.providers.get(request.method).ok_or_else(|| {
            AppError::Internal(format!("No adapter registered for {}", request.method.as_str()))
        })?;

        let charge = ChargeRequest {
            payment_id: payment.id,
            amount: payment.amount,
            currency: self.currency.clone(),
            payer_phone,
            reference_no,
            payer_message: format!("Rent payment for {}", house.title),
            payee_note: format!("BondiHub agreement {}", agreement.id),
        };

        match dispatch_charge(adapter.as_ref(), &charge, self.timeout, &cancel).await {
            ChargeOutcome::Completed(result) => {
                let payment = self.settle_completed(&payment, &house, &result).await?;
                tracing::info!(payment_id = %payment.id, reference_no = %payment.reference_no, "Payment completed");
                Ok(PaymentOutcome { payment, result })
            }
            ChargeOutcome::Pending(result) => {
                tracing::info!(payment_id = %payment.id, "Payment awaiting provider confirmation");
                Ok(PaymentOutcome { payment, result })
            }
            ChargeOutcome::Failed(message) => {
                PaymentRepository::transition(&self.pool, payment.id, PaymentStatus::Failed, None)
                    .await?;
                tracing::warn!(payment_id = %payment.id, reason = %message, "Payment failed");
                Err(AppError::External(format!("Payment failed: {}", message)))
            }
            ChargeOutcome::Cancelled => {
                tracing::warn!(payment_id = %payment.id, "Payment request cancelled, left pending");
                Err(AppError::External(
                    "Payment request was cancelled before the provider answered".to_string(),
                ))
            }
        }
    }

    async fn settle_completed(
        &self,
        payment: &Payment,
        house: &House,
        result: &ChargeResult,
    ) -> AppResult<Payment> {
        let mut tx = self.pool.begin().await?;

        let reference_no =
            if PaymentRepository::reference_in_use(&mut *tx, &result.transaction_id, payment.id).await? {
                tracing::warn!(
                    payment_id = %payment.id,
                    transaction_id = %result.transaction_id,
                    "Provider id already used by another payment, keeping local reference"
                );
                payment.reference_no.clone()
            } else {
                result.transaction_id.clone()
            };

        let settled = PaymentRepository::transition(
            &mut *tx,
            payment.id,
            PaymentStatus::Completed,
            Some(&reference_no),
        )
        .await?
        .ok_or_else(|| AppError::Conflict("Payment is no longer pending".to_string()))?;

        let mut outbox = Outbox::new();
        outbox.push(NewNotification::payment_received(
            house.landlord_id,
            settled.amount,
            &house.title,
        ));
        outbox.commit(tx, &self.dispatcher).await?;

        Ok(settled)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use testing::charge_request;

    struct Scripted {
        reply: Result<ChargeResult, &'static str>,
        delay: Duration,
    }

    impl Scripted {
        fn answering(status: PaymentStatus, success: bool) -> Self {
            Self {
                reply: Ok(ChargeResult {
                    success,
                    transaction_id: "TX_1".to_string(),
                    reference_no: "PAY_1".to_string(),
                    status,
                    message: "provider says so".to_string(),
                }),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for Scripted {
        fn method(&self) -> PaymentMethod {
            PaymentMethod::Mtn
        }

        async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeResult, ProviderError> {
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(result) => Ok(result.clone()),
                Err(reason) => Err(ProviderError::InvalidResponse {
                    provider: "scripted",
                    reason: reason.to_string(),
                }),
            }
        }
    }

    async fn run(adapter: &Scripted) -> ChargeOutcome {
        dispatch_charge(
            adapter,
            &charge_request(),
            Duration::from_secs(30),
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn completed_result_completes() {
        let outcome = run(&Scripted::answering(PaymentStatus::Completed, true)).await;
        assert!(matches!(outcome, ChargeOutcome::Completed(r) if r.transaction_id == "TX_1"));
    }

    #[tokio::test]
    async fn pending_result_does_not_advance() {
        let outcome = run(&Scripted::answering(PaymentStatus::Pending, true)).await;
        assert!(matches!(outcome, ChargeOutcome::Pending(_)));
    }

    #[tokio::test]
    async fn unsuccessful_result_and_error_are_both_failures() {
        let declined = run(&Scripted::answering(PaymentStatus::Failed, false)).await;
        assert_eq!(declined, ChargeOutcome::Failed("provider says so".to_string()));

        let broken = Scripted {
            reply: Err("garbled body"),
            delay: Duration::ZERO,
        };
        let outcome = run(&broken).await;
        assert!(matches!(outcome, ChargeOutcome::Failed(msg) if msg.contains("garbled body")));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let mut slow = Scripted::answering(PaymentStatus::Completed, true);
        slow.delay = Duration::from_secs(31);

        let outcome = run(&slow).await;
        assert!(matches!(outcome, ChargeOutcome::Failed(msg) if msg.contains("within 30s")));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins_over_a_late_answer() {
        let mut slow = Scripted::answering(PaymentStatus::Completed, true);
        slow.delay = Duration::from_secs(5);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = dispatch_charge(&slow, &charge_request(), Duration::from_secs(30), &cancel).await;
        assert_eq!(outcome, ChargeOutcome::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_request_never_reaches_provider() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let adapter = Scripted::answering(PaymentStatus::Completed, true);
        let outcome = dispatch_charge(&adapter, &charge_request(), Duration::from_secs(30), &cancel).await;
        assert_eq!(outcome, ChargeOutcome::Cancelled);
    }

    #[test]
    fn registry_covers_every_method_without_provider_credentials() {
        let config = Config::from_lookup(|key| (key == "JWT_SECRET").then(|| "s".to_string())).unwrap();
        let registry = ProviderRegistry::from_config(&config).unwrap();

        for method in PaymentMethod::ALL {
            let adapter = registry.get(method).unwrap();
            assert_eq!(adapter.method(), method);
        }
    }
}
