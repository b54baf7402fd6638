//! SaucerSwap AMM integration
//!
//! Handles:
//! - Locating the pool (and protocol version) that hosts a token pair
//! - Reverse quotes: required input for an exact output amount
//! - Building exact-input swap calldata per protocol version
//! - Decoding swap outputs from executed transaction records

pub mod contracts;
pub mod pools;
pub mod quote;
pub mod swap;
