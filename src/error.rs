use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Everything that can go wrong during a checkout session.
///
/// Cloneable so the same value can be kept in `SessionState::Errored`
/// and handed to the merchant's `on_error` callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// A required field was missing or malformed. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The gateway could not be reached, or did not answer in time.
    #[error("Network error: {0}")]
    Network(String),
    /// The gateway understood the request and refused it.
    #[error("Gateway rejected the request: {0}")]
    GatewayRejected(String),
    /// The return URL could not be made safe to navigate to.
    #[error("Redirect validation error: {0}")]
    RedirectValidation(String),
    /// The gateway settled the transaction as failed.
    #[error("Payment failed for transaction {reference}: {message}")]
    PaymentFailed { reference: String, message: String },
}

impl CheckoutError {
    /// Only connectivity problems are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Network(_))
    }
}
