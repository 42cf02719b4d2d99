use crate::domain::ports::{NavigatorRef, ProbeRef};
use crate::domain::reference::TransactionReference;
use crate::domain::state::Outcome;
use crate::error::{CheckoutError, Result};
use tracing::{debug, error, info};
use url::Url;

pub const REFERENCE_PARAM: &str = "transactionReference";
pub const STATUS_PARAM: &str = "status";

/// The `status` query parameter sent back to the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectStatus {
    #[default]
    Success,
    Failed,
}

impl RedirectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectStatus::Success => "success",
            RedirectStatus::Failed => "failed",
        }
    }
}

impl From<Outcome> for RedirectStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => RedirectStatus::Success,
            Outcome::Failed => RedirectStatus::Failed,
        }
    }
}

/// Decides whether the merchant's return URL is safe to send the customer to.
///
/// Plain `http` URLs are upgraded to `https` and must answer a probe before
/// they are used; there is no fallback to the insecure form. `https` URLs are
/// trusted as given. Any other scheme is refused.
pub struct RedirectValidator {
    probe: ProbeRef,
    navigator: NavigatorRef,
}

impl RedirectValidator {
    pub fn new(probe: ProbeRef, navigator: NavigatorRef) -> Self {
        Self { probe, navigator }
    }

    /// Returns the final navigation target, or `None` when no return URL is
    /// configured. The input is never modified; a new URL is built.
    pub async fn resolve(
        &self,
        raw_url: Option<&str>,
        reference: &TransactionReference,
        status: RedirectStatus,
    ) -> Result<Option<Url>> {
        let Some(raw_url) = raw_url else {
            debug!("no return URL configured, skipping redirect");
            return Ok(None);
        };

        let mut url = Url::parse(raw_url.trim()).map_err(|e| {
            CheckoutError::RedirectValidation(format!("invalid return URL {raw_url:?}: {e}"))
        })?;

        match url.scheme() {
            "https" => {}
            "http" => {
                url.set_scheme("https").map_err(|_| {
                    CheckoutError::RedirectValidation(format!(
                        "cannot upgrade {raw_url:?} to https"
                    ))
                })?;
                info!(url = %url, "upgraded return URL to https, probing");
                self.ensure_reachable(&url).await?;
            }
            other => {
                return Err(CheckoutError::RedirectValidation(format!(
                    "unsupported return URL scheme {other:?}"
                )));
            }
        }

        Ok(Some(with_session_params(url, reference, status)))
    }

    pub fn navigate(&self, url: &Url) {
        info!(url = %url, "redirecting to merchant");
        self.navigator.navigate(url);
    }

    async fn ensure_reachable(&self, url: &Url) -> Result<()> {
        match self.probe.probe(url).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                error!(url = %url, "upgraded return URL did not answer the probe successfully");
                Err(CheckoutError::RedirectValidation(format!(
                    "{url} did not answer the probe successfully"
                )))
            }
            Err(e) => {
                error!(url = %url, error = %e, "upgraded return URL is unreachable");
                Err(CheckoutError::RedirectValidation(format!(
                    "{url} is unreachable: {e}"
                )))
            }
        }
    }
}

/// Sets `transactionReference` and `status`, replacing any existing values
/// and keeping every other query parameter.
fn with_session_params(mut url: Url, reference: &TransactionReference, status: RedirectStatus) -> Url {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != REFERENCE_PARAM && key != STATUS_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(retained)
        .append_pair(REFERENCE_PARAM, reference.as_str())
        .append_pair(STATUS_PARAM, status.as_str());
    url
}
