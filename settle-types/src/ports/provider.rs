//! Payment provider port.
//!
//! One uniform contract per external provider (Stripe, MercadoPago, PagBank).
//! Adapters translate these calls into provider-specific HTTP requests and
//! normalize the responses; the rest of the engine never sees provider wire
//! formats except as the raw payload stored on the ledger row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Environment, Money, OrderId, PaymentMethod, Provider, TenantId};
use crate::error::ProviderError;

/// Decrypted credentials handed to an adapter for the duration of one call.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub secret_key: String,
    pub public_key: Option<String>,
    pub environment: Environment,
}

/// Identity returned by the provider's "who am I" endpoint, used to fail
/// fast on bad credentials before a gateway is marked active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub account_id: String,
    pub account_name: Option<String>,
}

/// Everything an adapter needs to create a charge.
///
/// `tenant_id` and `order_id` also feed the `{tenant}-{order}-{purpose}`
/// idempotency key supplied to MercadoPago and PagBank, so network-level
/// retries by the caller cannot create duplicate charges upstream.
#[derive(Debug, Clone)]
pub struct ChargeContext {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub return_url: Option<String>,
}

impl ChargeContext {
    /// Idempotency key for provider create calls.
    pub fn idempotency_key(&self, purpose: &str) -> String {
        format!("{}-{}-{}", self.tenant_id, self.order_id, purpose)
    }
}

/// Result of a PIX charge creation: the displayable "copia e cola" payload
/// plus the provider's raw initial status.
#[derive(Debug, Clone)]
pub struct PixCharge {
    pub external_id: String,
    pub status: String,
    pub qr_code_text: Option<String>,
    pub qr_code_image_url: Option<String>,
    pub raw: serde_json::Value,
}

/// Result of a card checkout-link creation.
#[derive(Debug, Clone)]
pub struct CardLink {
    pub external_id: String,
    pub status: String,
    pub payment_url: Option<String>,
    pub raw: serde_json::Value,
}

/// Provider-side payment state fetched on demand. MercadoPago webhook
/// ingestion treats this, never the webhook body, as the source of truth.
#[derive(Debug, Clone)]
pub struct PaymentLookup {
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub raw: serde_json::Value,
}

/// Uniform interface over one external payment provider.
///
/// Every call is a single synchronous outbound request with no internal
/// retry; failures surface to the caller as [`ProviderError`].
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Calls the provider's "who am I" endpoint to validate credentials.
    async fn validate_credentials(&self) -> Result<ProviderIdentity, ProviderError>;

    /// Creates a PIX payment and returns its QR payload.
    async fn create_pix_payment(&self, ctx: &ChargeContext) -> Result<PixCharge, ProviderError>;

    /// Creates a hosted card checkout link.
    async fn create_card_payment_link(
        &self,
        ctx: &ChargeContext,
    ) -> Result<CardLink, ProviderError>;

    /// Fetches the authoritative state of a payment by external id.
    ///
    /// Only MercadoPago requires this (its webhook bodies are opaque);
    /// other adapters keep the default.
    async fn lookup_payment(&self, external_id: &str) -> Result<PaymentLookup, ProviderError> {
        let _ = external_id;
        Err(ProviderError::Unsupported("payment lookup"))
    }
}

/// Builds adapters from decrypted credentials.
///
/// Injected into the application service so tests can substitute
/// deterministic doubles for provider responses.
pub trait ProviderFactory: Send + Sync + 'static {
    fn connect(
        &self,
        provider: Provider,
        credentials: ProviderCredentials,
    ) -> Arc<dyn PaymentProvider>;
}
