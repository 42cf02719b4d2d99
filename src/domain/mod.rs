//! Domain layer: session configuration, wire shapes, session state and the
//! ports the orchestrator talks through.

pub mod config;
pub mod gateway;
pub mod ports;
pub mod reference;
pub mod state;
