//! Application layer containing the stateful services.
//!
//! `SessionBootstrapper` resolves the process identity through a fixed
//! strategy chain. `TransactionOrchestrator` runs one payment at a time
//! against a `PaymentGateway` and auto-dismisses its result. Both publish
//! their state through tokio `watch` and `broadcast` channels.

pub mod orchestrator;
pub mod session;
mod state_cell;
