use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::mtn::{Payer, RequestToPay};
use super::provider::{map_provider_status, ChargeRequest, ChargeResult, ProviderAdapter, ProviderError};
use crate::config::AirtelConfig;
use crate::models::{PaymentMethod, PaymentStatus};

const PROVIDER: &str = "Airtel Money";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Transaction {
    amount: String,
    currency: String,
    external_id: String,
    payer: Payer,
    payer_message: String,
    payee_note: String,
}

#[derive(Debug, Serialize)]
struct PaymentRequest {
    transaction: Transaction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentResponseBody {
    status: String,
    #[serde(default)]
    response_code: Option<String>,
    #[serde(default)]
    response_msg: Option<String>,
    #[serde(default)]
    transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    response: PaymentResponseBody,
}

/// Airtel Money merchant API with a client-credentials token per charge.
pub struct AirtelAdapter {
    client: reqwest::Client,
    config: AirtelConfig,
}

impl AirtelAdapter {
    pub fn new(client: reqwest::Client, config: AirtelConfig) -> Self {
        Self { client, config }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/auth/oauth2/token", self.config.api_url))
            .json(&TokenRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                grant_type: "client_credentials",
            })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(ProviderError::Authentication {
                provider: PROVIDER,
                reason: format!("token endpoint returned HTTP {}", response.status().as_u16()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication {
                provider: PROVIDER,
                reason: e.to_string(),
            }
        })?;

        Ok(token.access_token)
    }
}

fn transport(source: reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        provider: PROVIDER,
        source,
    }
}

#[async_trait]
impl ProviderAdapter for AirtelAdapter {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Airtel
    }

    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResult, ProviderError> {
        let token = self.access_token().await?;

        let RequestToPay {
            amount,
            currency,
            external_id,
            payer,
            payer_message,
            payee_note,
        } = RequestToPay::from_charge(request);

        let response = self
            .client
            .post(format!("{}/merchant/v1/payments/", self.config.api_url))
            .bearer_auth(token)
            .header("X-Country", &self.config.country)
            .header("X-Currency", &request.currency)
            .json(&PaymentRequest {
                transaction: Transaction {
                    amount,
                    currency,
                    external_id,
                    payer,
                    payer_message,
                    payee_note,
                },
            })
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

        let body: PaymentResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                provider: PROVIDER,
                reason: e.to_string(),
            }
        })?;
        let body = body.response;

        let status = map_provider_status(&body.status);
        let message = body.response_msg.unwrap_or_else(|| match status {
            PaymentStatus::Completed => "Payment processed successfully".to_string(),
            PaymentStatus::Failed => "Payment was declined by Airtel Money".to_string(),
            _ => "Payment is awaiting payer approval".to_string(),
        });

        tracing::debug!(
            payment_id = %request.payment_id,
            response_code = body.response_code.as_deref().unwrap_or(""),
            "Airtel Money responded"
        );

        Ok(ChargeResult {
            success: status != PaymentStatus::Failed,
            transaction_id: body
                .transaction_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| request.payment_id.to_string()),
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
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};

    use crate::services::payment::testing::{charge_request, spawn_mock};

    fn adapter(base: String) -> AirtelAdapter {
        AirtelAdapter::new(
            reqwest::Client::new(),
            AirtelConfig {
                api_url: base,
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                country: "ZM".to_string(),
            },
        )
    }

    fn mock(payment_body: Value) -> Router {
        Router::new()
            .route(
                "/auth/oauth2/token",
                post(|Json(body): Json<Value>| async move {
                    if body["grant_type"] == "client_credentials" && body["client_secret"] == "secret" {
                        (StatusCode::OK, Json(json!({"access_token": "tok", "expires_in": 180})))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"})))
                    }
                }),
            )
            .route(
                "/merchant/v1/payments/",
                post(move |headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = payment_body.clone();
                    async move {
                        let bearer = headers.get("authorization").and_then(|v| v.to_str().ok())
                            == Some("Bearer tok");
                        let shaped = body["transaction"]["externalId"].is_string()
                            && body["transaction"]["payer"]["partyIdType"] == "MSISDN";
                        if bearer && shaped {
                            (StatusCode::OK, Json(reply))
                        } else {
                            (StatusCode::BAD_REQUEST, Json(json!({})))
                        }
                    }
                }),
            )
    }

    #[tokio::test]
    async fn successful_payment_uses_airtel_transaction_id() {
        let base = spawn_mock(mock(json!({
            "response": {
                "status": "SUCCESSFUL",
                "responseCode": "DP00800001001",
                "responseMsg": "Transaction is successful",
                "transactionId": "AM_998877",
                "externalId": "x"
            }
        })))
        .await;

        let result = adapter(base).charge(&charge_request()).await.unwrap();

        assert_eq!(result.status, PaymentStatus::Completed);
        assert_eq!(result.transaction_id, "AM_998877");
        assert_eq!(result.message, "Transaction is successful");
    }

    #[tokio::test]
    async fn rejected_payment_is_failed() {
        let base = spawn_mock(mock(json!({
            "response": {"status": "REJECTED", "responseMsg": "Insufficient funds"}
        })))
        .await;

        let result = adapter(base).charge(&charge_request()).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.message, "Insufficient funds");
    }

    #[tokio::test]
    async fn bad_credentials_fail_authentication() {
        let base = spawn_mock(mock(json!({}))).await;
        let mut adapter = adapter(base);
        adapter.config.client_secret = "wrong".to_string();

        let err = adapter.charge(&charge_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Authentication { .. }));
    }
}
