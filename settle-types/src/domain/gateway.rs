//! Gateway and tenant domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a tenant (company/business account).
///
/// Every entity in the engine is isolated by tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
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

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a Gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct GatewayId(Uuid);

impl GatewayId {
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

impl Default for GatewayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GatewayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GatewayId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The external payment providers the engine can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Stripe,
    MercadoPago,
    PagBank,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::MercadoPago => "mercadopago",
            Provider::PagBank => "pagbank",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Provider::Stripe),
            "mercadopago" => Ok(Provider::MercadoPago),
            "pagbank" => Ok(Provider::PagBank),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Gateway environment. Webhook signature verification may only be skipped
/// for sandbox gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

/// Per-tenant provider credentials and settings.
///
/// Invariant: at most one gateway per tenant has `is_active == true` at any
/// instant. The repository enforces this by deactivating every gateway of the
/// tenant before activating one, inside the same database transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    pub id: GatewayId,
    pub tenant_id: TenantId,
    pub provider: Provider,
    pub display_name: String,
    pub public_key: Option<String>,
    /// Vault-encrypted secret key. Never exposed in plaintext past the
    /// registry boundary; display uses a masked preview.
    pub encrypted_secret_key: String,
    pub encrypted_webhook_secret: Option<String>,
    pub environment: Environment,
    pub is_active: bool,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for connecting (creating or replacing) a gateway.
#[derive(Debug, Clone)]
pub struct NewGateway {
    pub tenant_id: TenantId,
    pub provider: Provider,
    pub display_name: String,
    pub public_key: Option<String>,
    pub encrypted_secret_key: String,
    pub encrypted_webhook_secret: Option<String>,
    pub environment: Environment,
    pub settings: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_round_trip() {
        for p in [Provider::Stripe, Provider::MercadoPago, Provider::PagBank] {
            assert_eq!(Provider::from_str(p.as_str()).unwrap(), p);
        }
        assert!(Provider::from_str("paypal").is_err());
    }

    #[test]
    fn test_environment_round_trip() {
        assert_eq!(
            Environment::from_str("production").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("staging").is_err());
    }
}
