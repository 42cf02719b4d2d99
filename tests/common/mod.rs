#![allow(dead_code)]

use novac_checkout::application::orchestrator::SessionOrchestrator;
use novac_checkout::application::redirect::RedirectValidator;
use novac_checkout::domain::config::{Callbacks, CheckoutOptions, SessionConfig};
use novac_checkout::domain::gateway::VerificationResult;
use novac_checkout::domain::ports::{GatewayRef, ProbeRef};
use novac_checkout::error::CheckoutError;
use novac_checkout::infrastructure::in_memory::{RecordingNavigator, StaticProbe};
use novac_checkout::settings::OrchestratorSettings;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

pub fn options() -> CheckoutOptions {
    CheckoutOptions {
        public_key: Some("pk_test_123".to_string()),
        amount: Some(dec!(2500)),
        currency: Some("NGN".to_string()),
        email: Some("ada@example.com".to_string()),
        customer_name: Some("Ada Lovelace".to_string()),
        ..Default::default()
    }
}

/// Records every merchant callback.
#[derive(Default, Clone)]
pub struct CallbackLog {
    pub successes: Arc<Mutex<Vec<VerificationResult>>>,
    pub errors: Arc<Mutex<Vec<CheckoutError>>>,
}

impl CallbackLog {
    pub fn callbacks(&self) -> Callbacks {
        let successes = self.successes.clone();
        let errors = self.errors.clone();
        Callbacks::new()
            .on_success(move |result| successes.lock().unwrap().push(result))
            .on_error(move |error| errors.lock().unwrap().push(error))
    }

    pub fn successes(&self) -> Vec<VerificationResult> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<CheckoutError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.successes().len() + self.errors().len()
    }
}

pub struct Harness {
    pub orchestrator: SessionOrchestrator,
    pub navigator: Arc<RecordingNavigator>,
    pub log: CallbackLog,
}

pub fn harness(options: CheckoutOptions, gateway: GatewayRef) -> Harness {
    harness_with_probe(options, gateway, Arc::new(StaticProbe::reachable()))
}

pub fn harness_with_probe(options: CheckoutOptions, gateway: GatewayRef, probe: ProbeRef) -> Harness {
    let log = CallbackLog::default();
    let navigator = Arc::new(RecordingNavigator::new());
    let config = SessionConfig::new(options, log.callbacks()).unwrap();
    let orchestrator = SessionOrchestrator::new(
        config,
        gateway,
        RedirectValidator::new(probe, navigator.clone()),
        OrchestratorSettings::default(),
    );
    Harness {
        orchestrator,
        navigator,
        log,
    }
}

/// Lets spawned tasks run until `done` holds.
pub async fn settle_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}
