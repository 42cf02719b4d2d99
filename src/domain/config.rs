use crate::domain::gateway::VerificationResult;
use crate::domain::reference::TransactionReference;
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_CHECKOUT_TITLE: &str = "Novac Payment";
pub const DEFAULT_PAYMENT_DESCRIPTION: &str = "Complete your payment securely";
pub const ANONYMOUS: &str = "Anonymous";

/// A strictly positive amount to charge.
///
/// Wraps `rust_decimal::Decimal` so the amount never goes through a float
/// until it is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CheckoutError::Configuration(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Three-letter ISO 4217 code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(CheckoutError::Configuration(format!(
                "currency must be a three-letter code, got {code:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Ussd,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::Ussd,
    ];
}

/// Merchant branding shown on the hosted payment page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Customization {
    pub fn logo_url(&self) -> &str {
        non_blank(self.logo_url.as_deref()).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        non_blank(self.title.as_deref()).unwrap_or(DEFAULT_CHECKOUT_TITLE)
    }

    pub fn description(&self) -> &str {
        non_blank(self.description.as_deref()).unwrap_or(DEFAULT_PAYMENT_DESCRIPTION)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl Customer {
    /// First word of the full name.
    pub fn first_name(&self) -> &str {
        self.name_part(0)
    }

    /// Second word of the full name. Anything after it is dropped.
    pub fn last_name(&self) -> &str {
        self.name_part(1)
    }

    pub fn phone(&self) -> &str {
        self.phone.as_deref().unwrap_or("")
    }

    fn name_part(&self, index: usize) -> &str {
        self.name
            .as_deref()
            .unwrap_or("")
            .split(' ')
            .nth(index)
            .filter(|part| !part.is_empty())
            .unwrap_or(ANONYMOUS)
    }
}

/// Checkout options exactly as the host page supplies them.
///
/// Every field is optional at this stage so that a missing value turns into a
/// readable `CheckoutError::Configuration` instead of a serde error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOptions {
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customization: Option<Customization>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default = "all_payment_methods")]
    pub payment_methods: Vec<PaymentMethod>,
}

fn all_payment_methods() -> Vec<PaymentMethod> {
    PaymentMethod::ALL.to_vec()
}

/// Same defaults as an empty JSON document: no fields set, every payment
/// method offered.
impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            public_key: None,
            reference: None,
            amount: None,
            currency: None,
            email: None,
            customer_name: None,
            customer_phone: None,
            customization: None,
            redirect_url: None,
            payment_methods: all_payment_methods(),
        }
    }
}

impl CheckoutOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            CheckoutError::Configuration(format!("invalid checkout options: {e}"))
        })
    }
}

pub type SuccessCallback = Arc<dyn Fn(VerificationResult) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(CheckoutError) + Send + Sync>;

/// The merchant's `on_success` / `on_error` slots. Both may be left empty.
#[derive(Clone, Default)]
pub struct Callbacks {
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl Fn(VerificationResult) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(CheckoutError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_success(&self, result: VerificationResult) {
        if let Some(f) = &self.on_success {
            f(result);
        }
    }

    pub(crate) fn emit_error(&self, error: CheckoutError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Validated, immutable configuration for one checkout session.
///
/// Built once when the widget opens. Nothing in the crate hands out a mutable
/// reference to it, the return URL included.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    public_key: String,
    reference: Option<TransactionReference>,
    amount: Amount,
    currency: Currency,
    customer: Customer,
    customization: Customization,
    redirect_url: Option<String>,
    payment_methods: BTreeSet<PaymentMethod>,
    callbacks: Callbacks,
}

impl SessionConfig {
    /// Validates the host-supplied options. Fails fast, before any network call.
    pub fn new(options: CheckoutOptions, callbacks: Callbacks) -> Result<Self> {
        let public_key = required(options.public_key, "publicKey")?;
        let amount = options
            .amount
            .ok_or_else(|| missing("amount"))
            .and_then(Amount::new)?;
        let currency = Currency::new(&required(options.currency, "currency")?)?;
        let email = required(options.email, "email")?;

        Ok(Self {
            public_key,
            reference: options.reference.and_then(TransactionReference::new),
            amount,
            currency,
            customer: Customer {
                email,
                name: options.customer_name,
                phone: options.customer_phone,
            },
            customization: options.customization.unwrap_or_default(),
            redirect_url: options
                .redirect_url
                .filter(|url| !url.trim().is_empty()),
            payment_methods: options.payment_methods.into_iter().collect(),
            callbacks,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// The merchant's own reference, if one was supplied.
    pub fn reference(&self) -> Option<&TransactionReference> {
        self.reference.as_ref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn customization(&self) -> &Customization {
        &self.customization
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    pub fn payment_methods(&self) -> &BTreeSet<PaymentMethod> {
        &self.payment_methods
    }

    pub(crate) fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> CheckoutError {
    CheckoutError::Configuration(format!("{field} is required"))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
