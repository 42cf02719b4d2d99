use super::gateway::{InitiationRequest, InitiationResult, VerificationResult};
use super::reference::TransactionReference;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// The remote payment gateway. Stateless I/O boundary.
///
/// Callers are responsible for calling `initiate` at most once per session.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Produces a locally unique reference. Never touches the network.
    fn generate_reference(&self) -> TransactionReference {
        TransactionReference::generate()
    }

    async fn initiate(&self, request: InitiationRequest) -> Result<InitiationResult>;

    async fn verify(
        &self,
        reference: &TransactionReference,
        public_key: &str,
    ) -> Result<VerificationResult>;
}

/// Checks that an upgraded return URL actually answers over the secure scheme.
#[async_trait]
pub trait RedirectProbe: Send + Sync {
    /// `Ok(true)` when the endpoint gave a success indication.
    async fn probe(&self, url: &Url) -> Result<bool>;
}

/// The browsing context the widget lives in.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

pub type GatewayRef = Arc<dyn PaymentGateway>;
pub type ProbeRef = Arc<dyn RedirectProbe>;
pub type NavigatorRef = Arc<dyn Navigator>;
