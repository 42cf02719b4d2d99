//! Application layer: the session state machine and the post-payment redirect.
//!
//! `SessionOrchestrator` is the single writer of session state. It drives the
//! gateway through the `PaymentGateway` port and hands settled sessions to the
//! `RedirectValidator`.

pub mod orchestrator;
pub mod redirect;
