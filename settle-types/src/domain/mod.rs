//! Pure domain types for the settlement engine.

mod gateway;
mod money;
mod order;
mod settlement;
mod transaction;

pub use gateway::{Environment, Gateway, GatewayId, NewGateway, Provider, TenantId};
pub use money::{Currency, Money};
pub use order::{AuditLogEntry, BillingCharge, ChargeStatus, NewOrder, Order, OrderId, OrderStatus};
pub use settlement::{StatusClass, map_pagbank_status, map_stripe_event};
pub use transaction::{NewTransaction, PaymentMethod, PaymentTransaction, TransactionId};
