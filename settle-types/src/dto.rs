//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Currency, Environment, GatewayId, OrderId, OrderStatus, PaymentMethod, Provider, TransactionId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Gateway management DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to connect (create or replace) a provider gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConnectGatewayRequest {
    pub provider: Provider,
    /// Display name shown in the owner UI
    #[schema(example = "Stripe producao")]
    pub display_name: String,
    /// Provider secret key, stored only through the vault
    #[schema(example = "sk_test_abc123")]
    pub secret_key: String,
    /// Publishable/public key where the provider has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Webhook signing secret (Stripe)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: Environment,
    /// Free-form provider settings (checkout URLs, etc.)
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn default_environment() -> Environment {
    Environment::Sandbox
}

/// Gateway view for the owner UI. Secrets appear only as masked previews.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayResponse {
    pub id: GatewayId,
    pub provider: Provider,
    #[schema(example = "Stripe producao")]
    pub display_name: String,
    pub environment: Environment,
    pub is_active: bool,
    /// Masked secret preview, e.g. `sk_***xyz`
    #[schema(example = "sk_***xyz")]
    pub secret_preview: String,
    /// Account name reported by the provider at connect time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Order DTOs (collaborator boundary)
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an order, issued by the order/charge lifecycle
/// collaborator before it asks for a payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Order total in smallest currency unit (centavos)
    #[schema(example = 4990)]
    pub total: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
    /// Intended payment method; decides the initial pending state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<PaymentMethod>,
    /// Create the 1:1 billing charge alongside the order
    #[serde(default)]
    pub with_charge: bool,
}

fn default_currency() -> Currency {
    Currency::BRL
}

/// Order view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: OrderId,
    pub status: OrderStatus,
    #[schema(example = 4990)]
    pub total: i64,
    pub currency: Currency,
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment creation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a PIX payment for an existing order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePixPaymentRequest {
    pub order_id: OrderId,
    /// Amount in smallest currency unit (centavos)
    #[schema(example = 4990)]
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

/// Request to create a hosted card checkout link for an existing order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCardLinkRequest {
    pub order_id: OrderId,
    /// Amount in smallest currency unit (centavos)
    #[schema(example = 4990)]
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[schema(example = "Maria Silva")]
    pub customer_name: String,
    pub method: PaymentMethod,
    /// Where the hosted checkout returns the customer to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

/// Provider-agnostic payment reference returned to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub transaction_id: TransactionId,
    pub provider: Provider,
    /// Provider's raw initial status string
    #[schema(example = "pending")]
    pub status: String,
    /// PIX "copia e cola" payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code_image_url: Option<String>,
    /// Hosted checkout URL for card payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Acknowledgement returned to webhook senders. Always `received: true` on
/// 2xx so providers stop retrying, with `processed`/`ignored` telling apart
/// a settlement from a graceful no-op.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
}

impl WebhookAck {
    pub fn processed() -> Self {
        Self {
            received: true,
            processed: Some(true),
            ignored: None,
        }
    }

    pub fn ignored() -> Self {
        Self {
            received: true,
            processed: None,
            ignored: Some(true),
        }
    }
}
