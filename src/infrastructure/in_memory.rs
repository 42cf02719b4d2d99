use crate::domain::gateway::{InitiationRequest, InitiationResult, VerificationResult};
use crate::domain::ports::{Navigator, PaymentGateway, RedirectProbe};
use crate::domain::reference::TransactionReference;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use url::Url;

pub const SIMULATED_PAYMENT_HOST: &str = "https://checkout.novac.test/pay/";

/// One scripted answer to a verify call.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyStep {
    /// Answer with this status string, exactly as the gateway would spell it.
    Status(String),
    /// Answer with a status and a `message`.
    StatusWithMessage(String, String),
    /// Fail the call as if the connection dropped.
    NetworkDrop,
}

impl VerifyStep {
    /// Parses `pending,Successful,drop` style scripts. `drop` is a network failure.
    pub fn parse_script(script: &str) -> Vec<VerifyStep> {
        script
            .split(',')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(|step| match step {
                "drop" => VerifyStep::NetworkDrop,
                status => VerifyStep::Status(status.to_string()),
            })
            .collect()
    }
}

/// A deterministic gateway driven by a script of verify answers.
///
/// Initiation echoes the requested reference and points at a simulated
/// payment page. Once the script runs out, every verify answers `pending`.
/// Optional gates hold a call until the test releases it.
#[derive(Default)]
pub struct ScriptedGateway {
    initiation_failure: Option<CheckoutError>,
    steps: Mutex<VecDeque<VerifyStep>>,
    initiate_gate: Option<Arc<Notify>>,
    verify_gate: Option<Arc<Notify>>,
    initiate_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    requests: Mutex<Vec<InitiationRequest>>,
}

impl ScriptedGateway {
    pub fn new(steps: impl IntoIterator<Item = VerifyStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn from_script(script: &str) -> Self {
        Self::new(VerifyStep::parse_script(script))
    }

    /// Every initiation fails with `error`.
    pub fn failing_initiation(mut self, error: CheckoutError) -> Self {
        self.initiation_failure = Some(error);
        self
    }

    /// Initiation waits until `gate` is notified.
    pub fn hold_initiation(mut self, gate: Arc<Notify>) -> Self {
        self.initiate_gate = Some(gate);
        self
    }

    /// Every verify call waits until `gate` is notified.
    pub fn hold_verification(mut self, gate: Arc<Notify>) -> Self {
        self.verify_gate = Some(gate);
        self
    }

    pub fn initiate_calls(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<InitiationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_step(&self) -> Option<VerifyStep> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initiate(&self, request: InitiationRequest) -> Result<InitiationResult> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(gate) = &self.initiate_gate {
            gate.notified().await;
        }
        if let Some(error) = &self.initiation_failure {
            return Err(error.clone());
        }

        let payment_url = Url::parse(SIMULATED_PAYMENT_HOST)
            .and_then(|base| base.join(request.transaction_reference.as_str()))
            .map_err(|e| CheckoutError::GatewayRejected(e.to_string()))?;
        Ok(InitiationResult {
            reference: request.transaction_reference,
            payment_url,
        })
    }

    async fn verify(
        &self,
        _reference: &TransactionReference,
        _public_key: &str,
    ) -> Result<VerificationResult> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.verify_gate {
            gate.notified().await;
        }

        let raw = match self.next_step() {
            Some(VerifyStep::NetworkDrop) => {
                return Err(CheckoutError::Network("simulated connection drop".to_string()));
            }
            Some(VerifyStep::Status(status)) => json!({ "data": { "status": status } }),
            Some(VerifyStep::StatusWithMessage(status, message)) => {
                json!({ "data": { "status": status }, "message": message })
            }
            None => json!({ "data": { "status": "pending" } }),
        };
        Ok(VerificationResult::from_response(raw))
    }
}

#[derive(Debug, Clone)]
enum ProbeAnswer {
    Reachable,
    Unreachable,
    Failing(String),
}

/// A probe with a fixed answer that remembers what it was asked.
#[derive(Debug)]
pub struct StaticProbe {
    answer: ProbeAnswer,
    calls: AtomicUsize,
    last: Mutex<Option<Url>>,
}

impl StaticProbe {
    fn with_answer(answer: ProbeAnswer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn reachable() -> Self {
        Self::with_answer(ProbeAnswer::Reachable)
    }

    pub fn unreachable() -> Self {
        Self::with_answer(ProbeAnswer::Unreachable)
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_answer(ProbeAnswer::Failing(reason.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_probed(&self) -> Option<Url> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RedirectProbe for StaticProbe {
    async fn probe(&self, url: &Url) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(url.clone());
        match &self.answer {
            ProbeAnswer::Reachable => Ok(true),
            ProbeAnswer::Unreachable => Ok(false),
            ProbeAnswer::Failing(reason) => Err(CheckoutError::Network(reason.clone())),
        }
    }
}

/// Records navigations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Url> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
    }
}
