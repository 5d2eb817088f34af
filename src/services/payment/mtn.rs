use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{map_provider_status, ChargeRequest, ChargeResult, ProviderAdapter, ProviderError};
use crate::config::MtnConfig;
use crate::models::{PaymentMethod, PaymentStatus};

const PROVIDER: &str = "MTN MoMo";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payer {
    #[serde(rename = "partyIdType")]
    pub party_id_type: String,
    #[serde(rename = "partyId")]
    pub party_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestToPay {
    pub amount: String,
    pub currency: String,
    pub external_id: String,
    pub payer: Payer,
    pub payer_message: String,
    pub payee_note: String,
}

impl RequestToPay {
    pub fn from_charge(request: &ChargeRequest) -> Self {
        Self {
            amount: request.amount_string(),
            currency: request.currency.clone(),
            external_id: request.payment_id.to_string(),
            payer: Payer {
                party_id_type: "MSISDN".to_string(),
                party_id: request.msisdn(),
            },
            payer_message: request.payer_message.clone(),
            payee_note: request.payee_note.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestToPayStatus {
    #[serde(default)]
    financial_transaction_id: Option<String>,
    status: String,
    #[serde(default)]
    reason: Option<serde_json::Value>,
}

/// MTN Mobile Money collection API: request-to-pay followed by a status read.
pub struct MtnAdapter {
    client: reqwest::Client,
    config: MtnConfig,
}

impl MtnAdapter {
    pub fn new(client: reqwest::Client, config: MtnConfig) -> Self {
        Self { client, config }
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/collection/v1_0/{}", self.config.api_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.config.api_key)
            .header("X-Target-Environment", &self.config.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
    }
}

fn transport(source: reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        provider: PROVIDER,
        source,
    }
}

#[async_trait]
impl ProviderAdapter for MtnAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Mtn
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderError> {
        let reference_id = request.payment_id.to_string();

        let response = self
            .authorized(self.client.post(self.collection_url("requesttopay")))
            .header("X-Reference-Id", &reference_id)
            .json(&RequestToPay::from_charge(request))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let response = self
            .authorized(
                self.client
                    .get(self.collection_url(&format!("requesttopay/{}", reference_id))),
            )
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let outcome: RequestToPayStatus = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: e.to_string(),
            }
        })?;

        let status = map_provider_status(&outcome.status);
        let message = match (status, outcome.reason) {
            (PaymentStatus::Completed, _) => "Payment processed successfully".to_string(),
            (_, Some(serde_json::Value::String(reason))) => reason,
            (_, Some(reason)) => reason.to_string(),
            (PaymentStatus::Failed, None) => "Payment was declined by MTN MoMo".to_string(),
            (_, None) => "Payment is awaiting payer approval".to_string(),
        };

        Ok(ChargeResult {
            success: status != PaymentStatus::Failed,
            transaction_id: outcome
                .financial_transaction_id
                .filter(|id| !id.is_empty())
                .unwrap_or(reference_id),
            reference_no: request.reference_no.clone(),
            status,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use crate::services::payment::testing::{charge_request, spawn_mock};

    fn adapter(base: String) -> MtnAdapter {
        MtnAdapter::new(
            reqwest::Client::new(),
            MtnConfig {
                api_url: base,
                api_key: "test-key".to_string(),
                subscription_key: "sub-key".to_string(),
                target_environment: "sandbox".to_string(),
            },
        )
    }

    fn mock(status_body: Value) -> Router {
        Router::new()
            .route(
                "/collection/v1_0/requesttopay",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    let authorized = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer test-key");
                    let has_reference = headers.contains_key("x-reference-id");
                    let well_formed = body["payer"]["partyIdType"] == "MSISDN"
                        && body["currency"] == "ZMW"
                        && body["externalId"].is_string();

                    if authorized && has_reference && well_formed {
                        StatusCode::ACCEPTED
                    } else {
                        StatusCode::BAD_REQUEST
                    }
                }),
            )
            .route(
                "/collection/v1_0/requesttopay/:id",
                get(move |Path(_id): Path<String>| {
                    let body = status_body.clone();
                    async move { Json(body) }
                }),
            )
    }

    #[tokio::test]
    async fn successful_collection_completes_with_provider_id() {
        let base = spawn_mock(mock(json!({
            "financialTransactionId": "363440463",
            "status": "SUCCESSFUL"
        })))
        .await;

        let result = adapter(base).charge(&charge_request()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.status, PaymentStatus::Completed);
        assert_eq!(result.transaction_id, "363440463");
    }

    #[tokio::test]
    async fn failed_collection_reports_reason() {
        let base = spawn_mock(mock(json!({
            "status": "FAILED",
            "reason": "PAYER_NOT_FOUND"
        })))
        .await;

        let result = adapter(base).charge(&charge_request()).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.message, "PAYER_NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_status_stays_pending() {
        let base = spawn_mock(mock(json!({"status": "PENDING"}))).await;
        let request = charge_request();

        let result = adapter(base).charge(&request).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Pending);
        assert_eq!(result.transaction_id, request.payment_id.to_string());
    }

    #[tokio::test]
    async fn http_rejection_is_an_error() {
        let router = Router::new().route(
            "/collection/v1_0/requesttopay",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid subscription key") }),
        );
        let base = spawn_mock(router).await;

        let err = adapter(base).charge(&charge_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { status: 401, .. }));
    }

    #[test]
    fn request_body_uses_provider_field_names() {
        let body = serde_json::to_value(RequestToPay::from_charge(&charge_request())).unwrap();
        assert_eq!(body["amount"], "5000.00");
        assert_eq!(body["payer"]["partyId"], "260977123456");
        assert!(body.get("payerMessage").is_some());
        assert!(body.get("payeeNote").is_some());
    }
}
