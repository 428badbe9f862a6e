//! Order, billing charge and audit-trail domain models.
//!
//! Orders are created by the order/charge lifecycle collaborator; the
//! settlement reconciler is the only component that mutates their status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::gateway::TenantId;
use super::money::Money;

/// Unique identifier for an Order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Order lifecycle status.
///
/// Transitions are monotonic: `pending_* -> paid` or `pending_* -> failed`
/// only. `paid` is terminal; re-applying it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPix,
    PendingGateway,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPix => "pending_pix",
            OrderStatus::PendingGateway => "pending_gateway",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
        }
    }

    /// True while the order may still transition.
    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::PendingPix | OrderStatus::PendingGateway)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_pix" => Ok(OrderStatus::PendingPix),
            "pending_gateway" => Ok(OrderStatus::PendingGateway),
            "paid" => Ok(OrderStatus::Paid),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// An order awaiting settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub total: Money,
    pub status: OrderStatus,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an order through the collaborator boundary.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tenant_id: TenantId,
    pub total: Money,
    pub status: OrderStatus,
    pub customer_name: String,
    /// When set, a 1:1 billing charge row is created alongside the order.
    pub with_charge: bool,
}

/// Terminal status of a billing charge, mirroring its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Paid,
    Failed,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Paid => "paid",
            ChargeStatus::Failed => "failed",
        }
    }
}

/// Optional 1:1 charge record mirroring the order's terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingCharge {
    pub order_id: OrderId,
    pub tenant_id: TenantId,
    pub status: ChargeStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Immutable append-only audit record, written whenever the reconciler
/// completes a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub action: String,
    pub resource: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_round_trip() {
        for s in [
            OrderStatus::PendingPix,
            OrderStatus::PendingGateway,
            OrderStatus::Paid,
            OrderStatus::Failed,
        ] {
            assert_eq!(OrderStatus::from_str(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn test_pending_classification() {
        assert!(OrderStatus::PendingPix.is_pending());
        assert!(OrderStatus::PendingGateway.is_pending());
        assert!(!OrderStatus::Paid.is_pending());
        assert!(!OrderStatus::Failed.is_pending());
    }
}
