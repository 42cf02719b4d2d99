use crate::application::orchestrator::SessionOrchestrator;
use crate::domain::config::PaymentMethod;
use crate::domain::state::{Outcome, SessionState};
use tokio::sync::watch;
use tracing::debug;
use url::Url;

pub const FAILED_TITLE: &str = "Payment Failed";
pub const FAILED_MESSAGE: &str =
    "Sorry, we can't complete your transaction at this time. Please try again.";
pub const FAILED_SUBMESSAGE: &str = "You can now securely close this tab.";

/// One payment-method tab on the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentTab {
    pub method: PaymentMethod,
    pub label: &'static str,
}

impl From<PaymentMethod> for PaymentTab {
    fn from(method: PaymentMethod) -> Self {
        let label = match method {
            PaymentMethod::Card => "Card",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Ussd => "USSD",
        };
        Self { method, label }
    }
}

/// What the widget shows for the current session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceView {
    /// Waiting for the gateway to issue a payment page.
    Loading,
    /// The gateway-hosted payment page, embedded.
    PaymentPage { url: Url, title: String },
    Completed,
    /// Generic failure view. No retry is offered.
    Failed {
        title: &'static str,
        message: &'static str,
        submessage: &'static str,
    },
    Closed,
}

impl SurfaceView {
    fn failed() -> Self {
        SurfaceView::Failed {
            title: FAILED_TITLE,
            message: FAILED_MESSAGE,
            submessage: FAILED_SUBMESSAGE,
        }
    }
}

/// The widget host.
///
/// Owns the orchestrator for its lifetime and only ever reads session state
/// through a watch receiver. Closing or dropping the surface tears the
/// session down.
pub struct PresentationSurface {
    orchestrator: SessionOrchestrator,
    state: watch::Receiver<SessionState>,
    title: String,
}

impl PresentationSurface {
    pub fn new(orchestrator: SessionOrchestrator) -> Self {
        let state = orchestrator.subscribe();
        let title = orchestrator.config().customization().title().to_string();
        Self {
            orchestrator,
            state,
            title,
        }
    }

    pub fn orchestrator(&self) -> &SessionOrchestrator {
        &self.orchestrator
    }

    /// Mounting the widget starts the session.
    pub async fn open(&self) {
        self.orchestrator.start().await;
    }

    /// The embedded payment page finished loading. Arms polling.
    pub fn frame_loaded(&self) -> bool {
        self.orchestrator.surface_ready()
    }

    pub fn view(&self) -> SurfaceView {
        render(&self.state.borrow(), &self.title)
    }

    /// Waits for the next state change and returns the new view, or `None`
    /// once the session can no longer change.
    pub async fn next_view(&mut self) -> Option<SurfaceView> {
        self.state.changed().await.ok()?;
        Some(render(&self.state.borrow_and_update(), &self.title))
    }

    /// Tabs for the configured payment methods, in display order.
    pub fn tabs(&self) -> Vec<PaymentTab> {
        self.orchestrator
            .config()
            .payment_methods()
            .iter()
            .copied()
            .map(PaymentTab::from)
            .collect()
    }

    /// Clicking outside the widget only closes it while no network work is
    /// outstanding.
    pub fn can_dismiss(&self) -> bool {
        !self.state.borrow().is_busy()
    }

    /// Returns `true` if the surface closed.
    pub fn dismiss(&self) -> bool {
        if !self.can_dismiss() {
            debug!(state = self.state.borrow().name(), "dismissal blocked while busy");
            return false;
        }
        self.close();
        true
    }

    /// The close control. Always tears the session down.
    pub fn close(&self) {
        self.orchestrator.teardown();
    }
}

fn render(state: &SessionState, title: &str) -> SurfaceView {
    match state {
        SessionState::Idle | SessionState::Initiating => SurfaceView::Loading,
        SessionState::AwaitingCustomerAction(target) | SessionState::Verifying(target) => {
            SurfaceView::PaymentPage {
                url: target.payment_url.clone(),
                title: title.to_string(),
            }
        }
        SessionState::Settled {
            outcome: Outcome::Success,
            ..
        } => SurfaceView::Completed,
        SessionState::Settled {
            outcome: Outcome::Failed,
            ..
        }
        | SessionState::Errored { .. } => SurfaceView::failed(),
        SessionState::Cancelled => SurfaceView::Closed,
    }
}
