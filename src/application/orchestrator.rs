use crate::application::redirect::{RedirectStatus, RedirectValidator};
use crate::domain::config::SessionConfig;
use crate::domain::gateway::{InitiationRequest, VerificationResult};
use crate::domain::ports::GatewayRef;
use crate::domain::reference::TransactionReference;
use crate::domain::state::{Outcome, PaymentTarget, RedirectOutcome, SessionState};
use crate::error::CheckoutError;
use crate::settings::OrchestratorSettings;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const DEFAULT_FAILURE_MESSAGE: &str = "Payment failed";

/// Drives one checkout session from initiation to settlement.
///
/// The orchestrator is the only writer of [`SessionState`]. It calls the
/// gateway's `initiate` at most once, starts polling only after the
/// presentation surface reports it has loaded, settles on the first terminal
/// status and then hands over to the [`RedirectValidator`].
///
/// Teardown (explicit, or by dropping the orchestrator) clears the session's
/// liveness flag. From then on no state transition, callback or navigation
/// happens, even if a gateway call that was already in flight resolves.
pub struct SessionOrchestrator {
    session: Arc<Session>,
}

/// Everything one session owns. Shared with the poll task.
struct Session {
    config: SessionConfig,
    reference: TransactionReference,
    gateway: GatewayRef,
    redirect: RedirectValidator,
    settings: OrchestratorSettings,
    state: watch::Sender<SessionState>,
    live: watch::Sender<bool>,
    started: AtomicBool,
    polling: AtomicBool,
    callback_fired: AtomicBool,
    poll_attempts: AtomicU32,
}

impl SessionOrchestrator {
    /// Creates a session in `Idle`.
    ///
    /// The transaction reference is fixed here: the merchant's own if the
    /// configuration carries one, otherwise a freshly generated one.
    pub fn new(
        config: SessionConfig,
        gateway: GatewayRef,
        redirect: RedirectValidator,
        settings: OrchestratorSettings,
    ) -> Self {
        let reference = match config.reference() {
            Some(reference) => reference.clone(),
            None => gateway.generate_reference(),
        };
        let (state, _) = watch::channel(SessionState::Idle);
        let (live, _) = watch::channel(true);

        Self {
            session: Arc::new(Session {
                config,
                reference,
                gateway,
                redirect,
                settings,
                state,
                live,
                started: AtomicBool::new(false),
                polling: AtomicBool::new(false),
                callback_fired: AtomicBool::new(false),
                poll_attempts: AtomicU32::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.session.config
    }

    /// The session's transaction reference. Same value for the whole session.
    pub fn reference(&self) -> &TransactionReference {
        &self.session.reference
    }

    pub fn state(&self) -> SessionState {
        self.session.state.borrow().clone()
    }

    /// Read-only view of state changes, for the presentation surface.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.state.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.session.is_live()
    }

    /// Verify calls made so far, including ones that failed.
    pub fn poll_attempts(&self) -> u32 {
        self.session.poll_attempts.load(Ordering::SeqCst)
    }

    /// `Idle → Initiating → AwaitingCustomerAction | Errored`.
    ///
    /// Safe to call any number of times: only the first call reaches the
    /// gateway, later ones return immediately. A failed initiation is final.
    pub async fn start(&self) {
        self.session.start().await;
    }

    /// The presentation surface has finished loading the payment page.
    ///
    /// Moves `AwaitingCustomerAction → Verifying` and spawns the poll task.
    /// Returns `false` when polling was already armed or there is no payment
    /// page yet.
    pub fn surface_ready(&self) -> bool {
        let session = &self.session;
        if session.polling.swap(true, Ordering::SeqCst) {
            debug!(reference = %session.reference, "polling already armed");
            return false;
        }

        let mut armed = None;
        session.transition(|state| match state {
            SessionState::AwaitingCustomerAction(target) => {
                armed = Some(target.clone());
                Some(SessionState::Verifying(target.clone()))
            }
            _ => None,
        });

        let Some(target) = armed else {
            session.polling.store(false, Ordering::SeqCst);
            warn!(
                reference = %session.reference,
                state = session.state.borrow().name(),
                "surface ready signal ignored, no payment page to verify"
            );
            return false;
        };

        info!(reference = %target.reference, "payment page loaded, polling for settlement");
        tokio::spawn(poll_until_settled(Arc::clone(session), target));
        true
    }

    /// Cancels the session. Idempotent.
    pub fn teardown(&self) {
        self.session.teardown();
    }

    /// Waits until nothing further will happen: the session errored, was
    /// cancelled, or settled and finished its redirect.
    pub async fn finished(&self) -> SessionState {
        let mut rx = self.session.state.subscribe();
        let done = rx
            .wait_for(|state| match state {
                SessionState::Settled { redirect, .. } => *redirect != RedirectOutcome::Pending,
                other => other.is_terminal(),
            })
            .await
            .map(|state| state.clone());
        done.unwrap_or_else(|_| self.state())
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.session.teardown();
    }
}

impl Session {
    fn is_live(&self) -> bool {
        *self.live.borrow()
    }

    /// Applies `next` atomically if the session is still live and `next`
    /// accepts the current state.
    fn transition(&self, next: impl FnOnce(&SessionState) -> Option<SessionState>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_live() {
                return false;
            }
            match next(state) {
                Some(new_state) => {
                    debug!(from = state.name(), to = new_state.name(), "session transition");
                    *state = new_state;
                    true
                }
                None => false,
            }
        })
    }

    async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(reference = %self.reference, "duplicate start suppressed");
            return;
        }
        if !self.transition(|state| matches!(state, SessionState::Idle).then_some(SessionState::Initiating)) {
            debug!(reference = %self.reference, "session not idle, start ignored");
            return;
        }

        info!(
            reference = %self.reference,
            amount = %self.config.amount().value(),
            currency = self.config.currency().as_str(),
            "initiating checkout session"
        );
        let request = InitiationRequest::new(&self.config, &self.reference);

        match self.gateway.initiate(request).await {
            Ok(result) => {
                if result.reference != self.reference {
                    warn!(
                        local = %self.reference,
                        confirmed = %result.reference,
                        "gateway confirmed a different reference, using the gateway's"
                    );
                }
                let target = PaymentTarget {
                    payment_url: result.payment_url,
                    reference: result.reference,
                };
                let presented = self.transition(|state| {
                    matches!(state, SessionState::Initiating)
                        .then(|| SessionState::AwaitingCustomerAction(target.clone()))
                });
                if presented {
                    info!(reference = %target.reference, url = %target.payment_url, "payment page issued");
                } else {
                    debug!(reference = %self.reference, "initiation result discarded after teardown");
                }
            }
            Err(cause) => {
                error!(reference = %self.reference, error = %cause, "initiation failed");
                let errored = self.transition(|state| {
                    matches!(state, SessionState::Initiating)
                        .then(|| SessionState::Errored { cause: cause.clone() })
                });
                if errored {
                    self.emit_error(cause);
                } else {
                    debug!(reference = %self.reference, "initiation failure discarded after teardown");
                }
            }
        }
    }

    /// One verify call. `Break` once the session settled or went away.
    async fn poll_once(&self, target: &PaymentTarget) -> ControlFlow<()> {
        if !self.is_live() {
            return ControlFlow::Break(());
        }
        let attempt = self.poll_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(reference = %target.reference, attempt, "polling verification status");

        let verified = time::timeout(
            self.settings.verify_timeout,
            self.gateway.verify(&target.reference, self.config.public_key()),
        )
        .await
        .unwrap_or_else(|_| Err(CheckoutError::Network("verification timed out".to_string())));

        if !self.is_live() {
            debug!(reference = %target.reference, attempt, "verification result discarded after teardown");
            return ControlFlow::Break(());
        }

        match verified {
            Ok(result) => match result.status.outcome() {
                None => ControlFlow::Continue(()),
                Some(outcome) => {
                    self.settle(target, outcome, result).await;
                    ControlFlow::Break(())
                }
            },
            Err(e) if e.is_retryable() => {
                warn!(reference = %target.reference, attempt, error = %e, "verification failed, retrying on next tick");
                ControlFlow::Continue(())
            }
            Err(e) => {
                error!(reference = %target.reference, attempt, error = %e, "verification rejected, retrying on next tick");
                ControlFlow::Continue(())
            }
        }
    }

    /// `Verifying → Settled`, then the callback, then the redirect.
    async fn settle(&self, target: &PaymentTarget, outcome: Outcome, result: VerificationResult) {
        let settled = self.transition(|state| {
            matches!(state, SessionState::Verifying(_)).then(|| SessionState::Settled {
                outcome,
                result: result.clone(),
                redirect: RedirectOutcome::Pending,
            })
        });
        if !settled {
            return;
        }
        info!(reference = %target.reference, ?outcome, "checkout session settled");

        match outcome {
            Outcome::Success => self.emit_success(result),
            Outcome::Failed => self.emit_error(CheckoutError::PaymentFailed {
                reference: target.reference.to_string(),
                message: result
                    .message
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            }),
        }

        let redirect = self.redirect(&target.reference, outcome).await;
        self.state.send_if_modified(|state| match state {
            SessionState::Settled { redirect: slot, .. } => {
                *slot = redirect;
                true
            }
            _ => false,
        });
    }

    async fn redirect(&self, reference: &TransactionReference, outcome: Outcome) -> RedirectOutcome {
        let resolved = self
            .redirect
            .resolve(self.config.redirect_url(), reference, RedirectStatus::from(outcome))
            .await;
        match resolved {
            Ok(None) => RedirectOutcome::NotConfigured,
            Ok(Some(url)) => {
                if !self.is_live() {
                    debug!(reference = %reference, "redirect skipped after teardown");
                    return RedirectOutcome::Skipped;
                }
                self.redirect.navigate(&url);
                RedirectOutcome::Navigated(url)
            }
            Err(e) => {
                error!(reference = %reference, error = %e, "redirect aborted");
                RedirectOutcome::Aborted(e)
            }
        }
    }

    /// At most one merchant callback per session, and none once torn down.
    fn claim_callback(&self) -> bool {
        if !self.is_live() {
            debug!(reference = %self.reference, "callback suppressed after teardown");
            return false;
        }
        !self.callback_fired.swap(true, Ordering::SeqCst)
    }

    fn emit_success(&self, result: VerificationResult) {
        if self.claim_callback() {
            self.config.callbacks().emit_success(result);
        }
    }

    fn emit_error(&self, error: CheckoutError) {
        if self.claim_callback() {
            self.config.callbacks().emit_error(error);
        }
    }

    fn teardown(&self) {
        if !self.live.send_replace(false) {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = SessionState::Cancelled;
                true
            }
        });
        info!(reference = %self.reference, "checkout session torn down");
    }
}

/// Polls once straight away, then once per interval, until the session
/// settles or is torn down. Only one verify call is ever in flight.
async fn poll_until_settled(session: Arc<Session>, target: PaymentTarget) {
    let mut ticker = time::interval(session.settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut live = session.live.subscribe();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = live.wait_for(|live| !*live) => {
                debug!(reference = %target.reference, "polling stopped by teardown");
                return;
            }
        }
        if session.poll_once(&target).await.is_break() {
            return;
        }
    }
}
