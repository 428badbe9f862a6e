//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use settle_types::domain::{
    Currency, Environment, GatewayId, OrderId, OrderStatus, PaymentMethod, Provider, TransactionId,
};
use settle_types::dto::{
    ConnectGatewayRequest, CreateCardLinkRequest, CreateOrderRequest, CreatePixPaymentRequest,
    GatewayResponse, OrderResponse, PaymentResponse, WebhookAck,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Connect (create or replace) a provider gateway
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/gateways",
    tag = "gateways",
    request_body = ConnectGatewayRequest,
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 201, description = "Gateway connected and active", body = GatewayResponse),
        (status = 400, description = "Invalid request or rejected credentials"),
        (status = 502, description = "Provider unreachable")
    )
)]
async fn connect_gateway() {}

/// List a tenant's gateways with masked secret previews
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant}/gateways",
    tag = "gateways",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 200, description = "List of gateways", body = Vec<GatewayResponse>)
    )
)]
async fn list_gateways() {}

/// Make a gateway the tenant's single active one
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/gateways/{id}/activate",
    tag = "gateways",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)"),
        ("id" = String, Path, description = "Gateway ID (UUID)")
    ),
    responses(
        (status = 204, description = "Gateway activated"),
        (status = 404, description = "Gateway not found")
    )
)]
async fn activate_gateway() {}

/// Delete a gateway
#[utoipa::path(
    delete,
    path = "/api/tenants/{tenant}/gateways/{id}",
    tag = "gateways",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)"),
        ("id" = String, Path, description = "Gateway ID (UUID)")
    ),
    responses(
        (status = 204, description = "Gateway deleted"),
        (status = 404, description = "Gateway not found")
    )
)]
async fn delete_gateway() {}

/// Create an order (lifecycle collaborator boundary)
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid request")
    )
)]
async fn create_order() {}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant}/orders/{id}",
    tag = "orders",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)"),
        ("id" = String, Path, description = "Order ID (UUID)")
    ),
    responses(
        (status = 200, description = "Order", body = OrderResponse),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order() {}

/// Create a PIX payment through the tenant's active gateway
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/payments/pix",
    tag = "payments",
    request_body = CreatePixPaymentRequest,
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 201, description = "PIX payment created", body = PaymentResponse),
        (status = 400, description = "Invalid request or no active gateway"),
        (status = 502, description = "Provider error")
    )
)]
async fn create_pix_payment() {}

/// Create a hosted card checkout link
#[utoipa::path(
    post,
    path = "/api/tenants/{tenant}/payments/card-link",
    tag = "payments",
    request_body = CreateCardLinkRequest,
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 201, description = "Checkout link created", body = PaymentResponse),
        (status = 400, description = "Invalid request or no active gateway"),
        (status = 502, description = "Provider error")
    )
)]
async fn create_card_link() {}

/// Read a ledger transaction reference
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant}/transactions/{id}",
    tag = "payments",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)"),
        ("id" = String, Path, description = "Transaction ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transaction", body = PaymentResponse),
        (status = 404, description = "Transaction not found")
    )
)]
async fn get_transaction() {}

/// Read the recomputed monthly revenue aggregate
#[utoipa::path(
    get,
    path = "/api/tenants/{tenant}/revenue/{month}",
    tag = "revenue",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)"),
        ("month" = String, Path, description = "Month key, YYYY-MM")
    ),
    responses(
        (status = 200, description = "Revenue aggregate in centavos", body = inline(serde_json::Value), example = json!({"month": "2026-08", "total_cents": 4990}))
    )
)]
async fn monthly_revenue() {}

/// Stripe webhook ingress (signature-verified raw body)
#[utoipa::path(
    post,
    path = "/webhooks/stripe/{tenant}",
    tag = "webhooks",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 200, description = "Event absorbed", body = WebhookAck),
        (status = 400, description = "Signature verification failed")
    )
)]
async fn stripe_webhook() {}

/// MercadoPago webhook ingress (payment lookup is the source of truth)
#[utoipa::path(
    post,
    path = "/webhooks/mercadopago/{tenant}",
    tag = "webhooks",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 200, description = "Event absorbed", body = WebhookAck),
        (status = 502, description = "Payment lookup failed, provider should retry")
    )
)]
async fn mercadopago_webhook() {}

/// PagBank webhook ingress (self-contained payload)
#[utoipa::path(
    post,
    path = "/webhooks/pagbank/{tenant}",
    tag = "webhooks",
    params(
        ("tenant" = String, Path, description = "Tenant ID (UUID)")
    ),
    responses(
        (status = 200, description = "Event absorbed", body = WebhookAck)
    )
)]
async fn pagbank_webhook() {}

/// OpenAPI documentation for the settlement engine API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payment Settlement Engine API",
        version = "1.0.0",
        description = "Multi-tenant payment gateway abstraction with PIX and card checkout, webhook ingestion, and idempotent settlement reconciliation for Stripe, MercadoPago and PagBank.",
        license(name = "MIT"),
    ),
    paths(
        health,
        connect_gateway,
        list_gateways,
        activate_gateway,
        delete_gateway,
        create_order,
        get_order,
        create_pix_payment,
        create_card_link,
        get_transaction,
        monthly_revenue,
        stripe_webhook,
        mercadopago_webhook,
        pagbank_webhook,
    ),
    components(
        schemas(
            ConnectGatewayRequest,
            GatewayResponse,
            CreateOrderRequest,
            OrderResponse,
            CreatePixPaymentRequest,
            CreateCardLinkRequest,
            PaymentResponse,
            WebhookAck,
            Currency,
            Environment,
            Provider,
            PaymentMethod,
            OrderStatus,
            GatewayId,
            OrderId,
            TransactionId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "gateways", description = "Per-tenant gateway registry"),
        (name = "orders", description = "Order lifecycle boundary"),
        (name = "payments", description = "PIX and card checkout creation"),
        (name = "revenue", description = "Monthly revenue read model"),
        (name = "webhooks", description = "Provider webhook ingress"),
    )
)]
pub struct ApiDoc;
