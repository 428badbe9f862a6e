//! # Settle Hex
//!
//! Application service layer and HTTP adapter for the settlement engine.
//!
//! ## Architecture
//!
//! - `service` - Application service (vault + provider + repository orchestration)
//! - `inbound` - HTTP adapter (Axum server, management API and webhook ingress)
//!
//! The service is generic over `R: SettlementRepository` and takes the
//! provider factory as a trait object, so both sides can be swapped in tests.

pub mod inbound;
mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::PaymentService;
