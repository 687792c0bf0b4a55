use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use tracing::{error, instrument, warn};

use super::{GatewayCharge, GatewayError, PaymentGateway};

const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DECLINE_FALLBACK: &str = "Your card was declined.";

/// Stripe charges client.
///
/// Speaks the classic form-encoded `/v1/charges` API with a secret-key bearer
/// token. Failures are folded into [`GatewayError`] from the HTTP status and
/// the `error.type` Stripe reports, so callers never see transport detail.
#[derive(Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base_url(secret_key, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (sandbox, local stub).
    pub fn with_base_url(secret_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, source_token), fields(amount = amount_minor_units, currency = currency))]
    async fn charge(
        &self,
        amount_minor_units: i64,
        currency: &str,
        source_token: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        let url = format!("{}/v1/charges", self.base_url);
        let params = [
            ("amount", amount_minor_units.to_string()),
            ("currency", currency.to_string()),
            ("source", source_token.to_string()),
        ];

        let response = match self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "charge request failed to reach gateway");
                return Err(GatewayError::NetworkError);
            }
        };

        let status = response.status();
        if status.is_success() {
            let charge: ChargeResponse = response.json().await.map_err(|err| {
                error!(error = %err, "gateway returned success with unreadable body");
                GatewayError::Generic
            })?;
            return Ok(GatewayCharge {
                charge_id: charge.id,
            });
        }

        let detail = response
            .json::<ErrorEnvelope>()
            .await
            .map(|envelope| envelope.error)
            .unwrap_or_default();
        warn!(
            status = status.as_u16(),
            error_type = detail.error_type.as_deref().unwrap_or("unknown"),
            "gateway rejected charge"
        );
        Err(classify_failure(status, detail))
    }
}

/// Fold an HTTP failure into the tagged error the rest of the service speaks.
/// Stripe's `error.type` is authoritative when present; the status code is
/// the fallback for bodies that don't parse.
fn classify_failure(status: StatusCode, detail: ErrorDetail) -> GatewayError {
    let error_type = detail.error_type.as_deref();

    if error_type == Some("card_error") || status == StatusCode::PAYMENT_REQUIRED {
        let message = detail
            .message
            .unwrap_or_else(|| DECLINE_FALLBACK.to_string());
        return GatewayError::CardDeclined { message };
    }
    if error_type == Some("rate_limit_error") || status == StatusCode::TOO_MANY_REQUESTS {
        return GatewayError::RateLimited;
    }
    if error_type == Some("authentication_error") || status == StatusCode::UNAUTHORIZED {
        return GatewayError::AuthFailed;
    }
    if error_type == Some("api_connection_error") {
        return GatewayError::NetworkError;
    }
    if error_type == Some("invalid_request_error")
        || status == StatusCode::BAD_REQUEST
        || status == StatusCode::NOT_FOUND
    {
        return GatewayError::InvalidRequest;
    }
    GatewayError::Generic
}
