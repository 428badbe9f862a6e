//! Payment transaction ledger domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::gateway::{GatewayId, Provider, TenantId};
use super::money::Money;
use super::order::OrderId;

/// Unique identifier for a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
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

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Credito,
    Debito,
    Cartao,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Credito => "credito",
            PaymentMethod::Debito => "debito",
            PaymentMethod::Cartao => "cartao",
        }
    }

    pub fn is_card(&self) -> bool {
        !matches!(self, PaymentMethod::Pix)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(PaymentMethod::Pix),
            "credito" => Ok(PaymentMethod::Credito),
            "debito" => Ok(PaymentMethod::Debito),
            "cartao" => Ok(PaymentMethod::Cartao),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// Canonical record of one payment attempt.
///
/// `status` holds the provider's raw status string as received
/// (`requires_action`, `pending`, ...). Normalization into paid/failed/other
/// happens only in the settlement reconciler, never at creation time.
///
/// Invariant: `(tenant_id, provider, external_payment_id)` is unique once
/// `external_payment_id` is non-null; it is the sole webhook lookup key.
/// Rows are mutated only by the reconciler and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub gateway_id: GatewayId,
    pub provider: Provider,
    pub payment_method: PaymentMethod,
    pub external_payment_id: Option<String>,
    pub status: String,
    pub amount: Money,
    pub qr_code_text: Option<String>,
    pub qr_code_image_url: Option<String>,
    pub payment_link_url: Option<String>,
    pub raw_provider_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for recording a new payment attempt at creation time.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub gateway_id: GatewayId,
    pub provider: Provider,
    pub payment_method: PaymentMethod,
    pub external_payment_id: Option<String>,
    pub status: String,
    pub amount: Money,
    pub qr_code_text: Option<String>,
    pub qr_code_image_url: Option<String>,
    pub payment_link_url: Option<String>,
    pub raw_provider_response: serde_json::Value,
}
