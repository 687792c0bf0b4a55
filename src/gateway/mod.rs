use async_trait::async_trait;
use serde::Serialize;

pub mod stripe;

pub use stripe::StripeGateway;

/// Successful outcome of a gateway charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCharge {
    /// Gateway-assigned identifier for the charge (e.g. `ch_...`).
    pub charge_id: String,
}

/// Classified gateway failure.
///
/// Every failure a gateway can produce collapses into one of these variants;
/// the `Display` text is the user-facing notice for that failure class. The
/// declined variant carries the gateway's own message because card declines
/// are the one case where the upstream wording is worth relaying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum GatewayError {
    #[error("{message}")]
    CardDeclined { message: String },

    #[error("Rate limit error.")]
    RateLimited,

    #[error("Invalid parameters.")]
    InvalidRequest,

    #[error("Not authenticated.")]
    AuthFailed,

    #[error("Network error.")]
    NetworkError,

    #[error("Something went wrong. You were not charged. Please try again.")]
    Generic,
}

impl GatewayError {
    /// Stable label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CardDeclined { .. } => "card_declined",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest => "invalid_request",
            Self::AuthFailed => "auth_failed",
            Self::NetworkError => "network_error",
            Self::Generic => "generic",
        }
    }
}

/// External payment collaborator.
///
/// Amounts are in the gateway's minor currency unit (cents for USD). The
/// source token is opaque to this service; it is collected client-side and
/// forwarded untouched.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount_minor_units: i64,
        currency: &str,
        source_token: &str,
    ) -> Result<GatewayCharge, GatewayError>;
}
