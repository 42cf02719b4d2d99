use crate::domain::gateway::VerificationResult;
use crate::domain::reference::TransactionReference;
use crate::error::CheckoutError;
use url::Url;

/// Where the customer pays, as issued by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentTarget {
    pub payment_url: Url,
    pub reference: TransactionReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

/// What became of the post-payment redirect.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectOutcome {
    /// Settled, redirect not attempted yet.
    Pending,
    /// No return URL configured.
    NotConfigured,
    /// The browsing context was sent here.
    Navigated(Url),
    /// The return URL was unsafe or unreachable; nothing was navigated.
    Aborted(CheckoutError),
    /// The session was torn down before navigation.
    Skipped,
}

/// The single source of truth for a checkout session.
///
/// Only `SessionOrchestrator` writes it; everyone else holds a watch receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Initiating,
    AwaitingCustomerAction(PaymentTarget),
    Verifying(PaymentTarget),
    Settled {
        outcome: Outcome,
        result: VerificationResult,
        redirect: RedirectOutcome,
    },
    Errored {
        cause: CheckoutError,
    },
    Cancelled,
}

impl SessionState {
    /// Settled, errored or cancelled: nothing further will happen.
    pub fn is_terminal(&self) -> bool {
        match self {
            SessionState::Settled { .. } | SessionState::Errored { .. } | SessionState::Cancelled => true,
            SessionState::Idle
            | SessionState::Initiating
            | SessionState::AwaitingCustomerAction(_)
            | SessionState::Verifying(_) => false,
        }
    }

    /// Network work is outstanding.
    pub fn is_busy(&self) -> bool {
        match self {
            SessionState::Initiating | SessionState::Verifying(_) => true,
            SessionState::Idle
            | SessionState::AwaitingCustomerAction(_)
            | SessionState::Settled { .. }
            | SessionState::Errored { .. }
            | SessionState::Cancelled => false,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Initiating => "initiating",
            SessionState::AwaitingCustomerAction(_) => "awaiting_customer_action",
            SessionState::Verifying(_) => "verifying",
            SessionState::Settled { .. } => "settled",
            SessionState::Errored { .. } => "errored",
            SessionState::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> PaymentTarget {
        PaymentTarget {
            payment_url: Url::parse("https://pay.gateway.test/x").unwrap(),
            reference: TransactionReference::new("ref").unwrap(),
        }
    }

    #[test]
    fn test_terminal_and_busy_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(SessionState::Initiating.is_busy());
        assert!(SessionState::Verifying(target()).is_busy());
        assert!(!SessionState::AwaitingCustomerAction(target()).is_busy());
        assert!(SessionState::Cancelled.is_terminal());

        let settled = SessionState::Settled {
            outcome: Outcome::Success,
            result: VerificationResult {
                status: crate::domain::gateway::VerificationStatus::Successful,
                message: None,
                raw: json!({}),
            },
            redirect: RedirectOutcome::NotConfigured,
        };
        assert!(settled.is_terminal());
        assert!(!settled.is_busy());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::AwaitingCustomerAction(target()).name(), "awaiting_customer_action");
        assert_eq!(SessionState::Verifying(target()).name(), "verifying");
    }
}
