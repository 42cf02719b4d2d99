//! Wire shapes exchanged with the payment gateway.

use crate::domain::config::SessionConfig;
use crate::domain::reference::TransactionReference;
use crate::domain::state::Outcome;
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCustomerData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCustomizationData {
    pub logo_url: String,
    pub checkout_modal_title: String,
    pub payment_description: String,
}

/// Body of the initiate call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationRequest {
    pub public_key: String,
    pub transaction_reference: TransactionReference,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub checkout_customer_data: CheckoutCustomerData,
    pub checkout_customization_data: CheckoutCustomizationData,
}

impl InitiationRequest {
    pub fn new(config: &SessionConfig, reference: &TransactionReference) -> Self {
        let customer = config.customer();
        let customization = config.customization();
        Self {
            public_key: config.public_key().to_string(),
            transaction_reference: reference.clone(),
            amount: config.amount().value(),
            currency: config.currency().as_str().to_string(),
            checkout_customer_data: CheckoutCustomerData {
                email: customer.email.clone(),
                first_name: customer.first_name().to_string(),
                last_name: customer.last_name().to_string(),
                phone_number: customer.phone().to_string(),
            },
            checkout_customization_data: CheckoutCustomizationData {
                logo_url: customization.logo_url().to_string(),
                checkout_modal_title: customization.title().to_string(),
                payment_description: customization.description().to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitiationEnvelope {
    data: Option<InitiationData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiationData {
    transaction_reference: Option<String>,
    payment_redirect_url: Option<String>,
}

/// What the gateway hands back after a successful initiation.
#[derive(Debug, Clone, PartialEq)]
pub struct InitiationResult {
    /// The reference the gateway confirmed for this transaction.
    pub reference: TransactionReference,
    /// Hosted payment page to show the customer.
    pub payment_url: Url,
}

impl InitiationResult {
    /// Parses `{data:{transactionReference, paymentRedirectUrl}}`.
    pub fn from_response(raw: Value) -> Result<Self> {
        let envelope: InitiationEnvelope = serde_json::from_value(raw).map_err(|e| {
            CheckoutError::GatewayRejected(format!("malformed initiation response: {e}"))
        })?;
        let rejected = |what: &str| match &envelope.message {
            Some(message) => CheckoutError::GatewayRejected(format!(
                "initiation response has no {what}: {message}"
            )),
            None => CheckoutError::GatewayRejected(format!("initiation response has no {what}")),
        };
        let data = envelope.data.as_ref().ok_or_else(|| rejected("data"))?;
        let reference = data
            .transaction_reference
            .clone()
            .and_then(TransactionReference::new)
            .ok_or_else(|| rejected("transactionReference"))?;
        let payment_url = data
            .payment_redirect_url
            .as_deref()
            .ok_or_else(|| rejected("paymentRedirectUrl"))?;
        let payment_url = Url::parse(payment_url).map_err(|e| {
            CheckoutError::GatewayRejected(format!("invalid paymentRedirectUrl: {e}"))
        })?;
        Ok(Self {
            reference,
            payment_url,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Successful,
    Failed,
}

impl VerificationStatus {
    /// Case-insensitive. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "successful" => Some(Self::Successful),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// The settlement this status implies, `None` while still pending.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Pending => None,
            Self::Successful => Some(Outcome::Success),
            Self::Failed => Some(Outcome::Failed),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerificationEnvelope {
    data: Option<VerificationData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerificationData {
    status: Option<String>,
}

/// One answer from the verify call, with the untouched body kept in `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub message: Option<String>,
    pub raw: Value,
}

impl VerificationResult {
    /// Parses `{data:{status}, message}`.
    ///
    /// A missing, empty or unrecognised status reads as `Pending`, so polling
    /// carries on rather than settling on something it does not understand.
    pub fn from_response(raw: Value) -> Self {
        let envelope: Option<VerificationEnvelope> = serde_json::from_value(raw.clone()).ok();
        let (status, message) = match envelope {
            Some(env) => (
                env.data.and_then(|d| d.status).unwrap_or_default(),
                env.message,
            ),
            None => (String::new(), None),
        };
        let parsed = VerificationStatus::parse(&status).unwrap_or_else(|| {
            if !status.is_empty() {
                tracing::warn!(status = %status, "unrecognised verification status, treating as pending");
            }
            VerificationStatus::Pending
        });
        Self {
            status: parsed,
            message,
            raw,
        }
    }
}
