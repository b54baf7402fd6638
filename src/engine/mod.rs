//! Settlement engine
//!
//! The orchestrator drives one payment attempt through its state machine;
//! the surrounding modules derive the plan, price the order, filter the
//! payable-token list, and capture the settlement evidence.

pub mod orchestrator;
pub mod plan;
pub mod preflight;
pub mod pricing;
pub mod recorder;
