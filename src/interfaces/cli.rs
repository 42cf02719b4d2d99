use crate::domain::ports::Navigator;
use crate::domain::state::{Outcome, RedirectOutcome, SessionState};
use url::Url;

/// A terminal has no browsing context to send; the redirect target is printed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&self, url: &Url) {
        println!("redirect: {url}");
    }
}

/// One-line summary of a finished session.
pub fn outcome_line(state: &SessionState) -> String {
    match state {
        SessionState::Settled {
            outcome, redirect, ..
        } => {
            let outcome = match outcome {
                Outcome::Success => "success",
                Outcome::Failed => "failed",
            };
            match redirect {
                RedirectOutcome::Aborted(e) => format!("outcome: {outcome} (redirect aborted: {e})"),
                RedirectOutcome::NotConfigured => format!("outcome: {outcome} (no redirect)"),
                RedirectOutcome::Pending | RedirectOutcome::Navigated(_) | RedirectOutcome::Skipped => {
                    format!("outcome: {outcome}")
                }
            }
        }
        SessionState::Errored { cause } => format!("outcome: errored ({cause})"),
        other => format!("outcome: {}", other.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{VerificationResult, VerificationStatus};
    use crate::error::CheckoutError;
    use serde_json::json;

    fn settled(outcome: Outcome, redirect: RedirectOutcome) -> SessionState {
        SessionState::Settled {
            outcome,
            result: VerificationResult {
                status: VerificationStatus::Successful,
                message: None,
                raw: json!({}),
            },
            redirect,
        }
    }

    #[test]
    fn test_outcome_lines() {
        assert_eq!(
            outcome_line(&settled(Outcome::Success, RedirectOutcome::NotConfigured)),
            "outcome: success (no redirect)"
        );
        assert_eq!(
            outcome_line(&settled(
                Outcome::Failed,
                RedirectOutcome::Aborted(CheckoutError::RedirectValidation("unreachable".to_string()))
            )),
            "outcome: failed (redirect aborted: Redirect validation error: unreachable)"
        );
        assert_eq!(outcome_line(&SessionState::Cancelled), "outcome: cancelled");
    }
}
