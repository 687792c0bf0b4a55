use crate::{
    entities::{billing_address, order},
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart::require_active_order,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static COUNTRY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Z]{2}$").expect("country code regex is valid"));

/// Gateway route selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRoute {
    Stripe,
    Paypal,
}

impl PaymentRoute {
    /// Maps the checkout form's single-letter payment choice.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "S" => Some(Self::Stripe),
            "P" => Some(Self::Paypal),
            _ => None,
        }
    }

    /// Maps the provider segment of the payment URL.
    pub fn from_provider(provider: &str) -> Option<Self> {
        match provider {
            "stripe" => Some(Self::Stripe),
            "paypal" => Some(Self::Paypal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Paypal => "paypal",
        }
    }
}

/// Billing-address capture ahead of payment.
///
/// Checkout moves an order from plain cart to address-collected: it persists
/// the submitted billing address, attaches it to the open order, and resolves
/// which payment route the client should call next. The actual charge is the
/// payment service's job.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Captures the billing address for the caller's open order and resolves
    /// the payment route.
    ///
    /// The address commit and the route check are deliberately ordered:
    /// an unrecognized payment option still leaves the address attached, so
    /// a corrected resubmission does not re-enter it.
    ///
    /// # Returns
    ///
    /// * `Ok(CheckoutReceipt)` - Address attached; `payment_provider` names
    ///   the route to call next
    /// * `Err(ServiceError::NoActiveOrder)` - No cart is open
    /// * `Err(ServiceError::ValidationError)` - Unrecognized payment option
    #[instrument(skip(self, input))]
    pub async fn submit(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let txn = self.db.begin().await?;

        let order = require_active_order(&txn, user_id).await?;

        let address = billing_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street_address: Set(input.street_address.trim().to_string()),
            apartment_address: Set(normalize_optional(input.apartment_address)),
            country: Set(input.country.trim().to_uppercase()),
            zip: Set(input.zip.trim().to_string()),
            created_at: Set(Utc::now()),
        };
        let address = address.insert(&txn).await?;

        let order_id = order.id;
        let mut order: order::ActiveModel = order.into();
        order.billing_address_id = Set(Some(address.id));
        order.updated_at = Set(Some(Utc::now()));
        order.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BillingAddressAttached {
                order_id,
                billing_address_id: address.id,
            })
            .await;

        // The address is already committed; a bad option only fails the
        // route selection.
        let route = PaymentRoute::from_choice(&input.payment_option).ok_or_else(|| {
            ServiceError::ValidationError("Invalid payment option selected.".to_string())
        })?;

        info!(
            "Checkout captured billing address {} for order {}",
            address.id, order_id
        );
        Ok(CheckoutReceipt {
            order_id,
            billing_address_id: address.id,
            payment_provider: route.as_str().to_string(),
        })
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim();
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    })
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_country_code(value: &str) -> Result<(), ValidationError> {
    if COUNTRY_CODE.is_match(value.trim().to_uppercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("country");
        err.message = Some("Must be a two-letter ISO 3166-1 country code".into());
        Err(err)
    }
}

/// Checkout form payload.
///
/// `same_shipping_address` and `save_info` are accepted and currently
/// unwired, mirroring the storefront form.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutInput {
    #[validate(custom = "validate_not_blank")]
    #[schema(example = "1 Main St")]
    pub street_address: String,
    #[schema(example = "Apt 4")]
    pub apartment_address: Option<String>,
    #[validate(custom = "validate_country_code")]
    #[schema(example = "US")]
    pub country: String,
    #[validate(custom = "validate_not_blank")]
    #[schema(example = "94105")]
    pub zip: String,
    #[serde(default)]
    pub same_shipping_address: bool,
    #[serde(default)]
    pub save_info: bool,
    /// "S" for the card gateway, "P" for the alternate route.
    #[schema(example = "S")]
    pub payment_option: String,
}

/// Where checkout left the order, and where to go next.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub billing_address_id: Uuid,
    #[schema(example = "stripe")]
    pub payment_provider: String,
}
