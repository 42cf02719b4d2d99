use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlates the local checkout session with the gateway's transaction record.
///
/// Resolved once per session and never replaced: the same value is used for
/// initiation, verification polling and the redirect query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionReference(String);

impl TransactionReference {
    /// Wraps a merchant or gateway supplied token. Blank tokens are rejected.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// A fresh, locally unique token. No network involved.
    pub fn generate() -> Self {
        Self(format!("NVC-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
