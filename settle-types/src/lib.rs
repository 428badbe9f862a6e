//! # Settle Types
//!
//! Domain types and port traits for the payment gateway abstraction and
//! settlement reconciliation engine. This crate has ZERO external IO
//! dependencies - only data structures, business rules, and trait
//! definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Gateway, Order, PaymentTransaction)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository, provider and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AuditLogEntry, BillingCharge, ChargeStatus, Currency, Environment, Gateway, GatewayId, Money,
    NewGateway, NewOrder, NewTransaction, Order, OrderId, OrderStatus, PaymentMethod,
    PaymentTransaction, Provider, StatusClass, TenantId, TransactionId, map_pagbank_status,
    map_stripe_event,
};
pub use dto::*;
pub use error::{AppError, DomainError, ProviderError, RepoError};
pub use ports::{
    CardLink, ChargeContext, FinalizeRequest, PaymentLookup, PaymentProvider, PixCharge,
    ProviderCredentials, ProviderFactory, ProviderIdentity, SettlementOutcome,
    SettlementRepository,
};
