//! Settlement application service.
//!
//! Orchestrates vault, provider adapters and the repository port. Contains
//! no HTTP or SQL; both sides are injected, which is what makes the webhook
//! flows testable with in-memory doubles.

use std::sync::Arc;

use settle_types::{
    AppError, CardLink, ChargeContext, ConnectGatewayRequest, CreateCardLinkRequest,
    CreateOrderRequest, CreatePixPaymentRequest, Environment, Gateway, GatewayId, GatewayResponse,
    Money, NewGateway, NewOrder, NewTransaction, Order, OrderId, OrderResponse, OrderStatus,
    PaymentMethod, PaymentProvider, PaymentResponse, PaymentTransaction, PixCharge, Provider,
    ProviderCredentials, ProviderFactory, SettlementRepository, TenantId, TransactionId,
    WebhookAck, FinalizeRequest,
};
use settle_vault::{SecretVault, mask_secret};

use settle_providers::signature::verify_stripe_signature;

/// Application service for the settlement engine.
///
/// Generic over `R: SettlementRepository`; the provider factory is injected
/// behind a trait object so tests can substitute deterministic adapters.
pub struct PaymentService<R: SettlementRepository> {
    repo: R,
    vault: SecretVault,
    providers: Arc<dyn ProviderFactory>,
}

impl<R: SettlementRepository> PaymentService<R> {
    pub fn new(repo: R, vault: SecretVault, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            repo,
            vault,
            providers,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    fn crypto_err(e: settle_vault::CryptoError) -> AppError {
        AppError::Internal(e.to_string())
    }

    /// Builds a provider adapter from a stored gateway's credentials.
    fn adapter_for(&self, gateway: &Gateway) -> Result<Arc<dyn PaymentProvider>, AppError> {
        let secret_key = self
            .vault
            .decrypt(&gateway.encrypted_secret_key)
            .map_err(Self::crypto_err)?;

        Ok(self.providers.connect(
            gateway.provider,
            ProviderCredentials {
                secret_key,
                public_key: gateway.public_key.clone(),
                environment: gateway.environment,
            },
        ))
    }

    fn find_gateway(
        &self,
        gateways: Vec<Gateway>,
        provider: Provider,
    ) -> Option<Gateway> {
        gateways.into_iter().find(|g| g.provider == provider)
    }

    fn gateway_response(&self, gateway: Gateway) -> Result<GatewayResponse, AppError> {
        let secret = self
            .vault
            .decrypt(&gateway.encrypted_secret_key)
            .map_err(Self::crypto_err)?;

        let account_name = gateway
            .settings
            .get("provider_account_name")
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(GatewayResponse {
            id: gateway.id,
            provider: gateway.provider,
            display_name: gateway.display_name,
            environment: gateway.environment,
            is_active: gateway.is_active,
            secret_preview: mask_secret(&secret),
            account_name,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Gateway Registry
    // ─────────────────────────────────────────────────────────────────────────────

    /// Connects (creates or replaces) a provider gateway for a tenant.
    ///
    /// Credentials are validated against the provider's "who am I" endpoint
    /// before anything is stored; a rejected key never reaches the database.
    #[tracing::instrument(skip(self, req), fields(tenant = %tenant_id, provider = %req.provider))]
    pub async fn connect_gateway(
        &self,
        tenant_id: TenantId,
        req: ConnectGatewayRequest,
    ) -> Result<GatewayResponse, AppError> {
        if req.display_name.trim().is_empty() {
            return Err(AppError::BadRequest("Display name cannot be empty".into()));
        }
        if req.secret_key.trim().is_empty() {
            return Err(AppError::BadRequest("Secret key cannot be empty".into()));
        }

        let adapter = self.providers.connect(
            req.provider,
            ProviderCredentials {
                secret_key: req.secret_key.clone(),
                public_key: req.public_key.clone(),
                environment: req.environment,
            },
        );
        let identity = adapter.validate_credentials().await?;
        tracing::info!(account = %identity.account_id, "provider credentials validated");

        let mut settings = req.settings;
        if !settings.is_object() {
            settings = serde_json::json!({});
        }
        settings["provider_account_id"] = serde_json::json!(identity.account_id);
        if let Some(name) = &identity.account_name {
            settings["provider_account_name"] = serde_json::json!(name);
        }

        let encrypted_secret_key = self
            .vault
            .encrypt(&req.secret_key)
            .map_err(Self::crypto_err)?;
        let encrypted_webhook_secret = req
            .webhook_secret
            .as_deref()
            .map(|s| self.vault.encrypt(s))
            .transpose()
            .map_err(Self::crypto_err)?;

        let gateway = self
            .repo
            .connect_gateway(NewGateway {
                tenant_id,
                provider: req.provider,
                display_name: req.display_name,
                public_key: req.public_key,
                encrypted_secret_key,
                encrypted_webhook_secret,
                environment: req.environment,
                settings,
            })
            .await?;

        self.gateway_response(gateway)
    }

    /// Lists a tenant's gateways with masked secret previews.
    pub async fn list_gateways(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<GatewayResponse>, AppError> {
        let gateways = self.repo.list_gateways(tenant_id).await?;
        gateways
            .into_iter()
            .map(|g| self.gateway_response(g))
            .collect()
    }

    /// Makes a gateway the tenant's single active one.
    pub async fn activate_gateway(
        &self,
        tenant_id: TenantId,
        id: GatewayId,
    ) -> Result<(), AppError> {
        self.repo
            .activate_gateway(tenant_id, id)
            .await
            .map_err(Into::into)
    }

    /// Removes a gateway.
    pub async fn delete_gateway(&self, tenant_id: TenantId, id: GatewayId) -> Result<(), AppError> {
        if self.repo.delete_gateway(tenant_id, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Gateway {}", id)))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Orders (lifecycle collaborator boundary)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates an order, and its billing charge when requested.
    pub async fn create_order(
        &self,
        tenant_id: TenantId,
        req: CreateOrderRequest,
    ) -> Result<OrderResponse, AppError> {
        if req.customer_name.trim().is_empty() {
            return Err(AppError::BadRequest("Customer name cannot be empty".into()));
        }
        if req.total <= 0 {
            return Err(AppError::BadRequest("Total must be positive".into()));
        }

        let total = Money::new(req.total, req.currency).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let status = match req.method {
            Some(PaymentMethod::Pix) => OrderStatus::PendingPix,
            _ => OrderStatus::PendingGateway,
        };

        let order = self
            .repo
            .create_order(NewOrder {
                tenant_id,
                total,
                status,
                customer_name: req.customer_name,
                with_charge: req.with_charge,
            })
            .await?;

        Ok(order_response(order))
    }

    /// Gets an order by id.
    pub async fn get_order(
        &self,
        tenant_id: TenantId,
        id: OrderId,
    ) -> Result<OrderResponse, AppError> {
        self.repo
            .get_order(tenant_id, id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Order {}", id))))
            .map(order_response)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a PIX payment for an existing pending order through the
    /// tenant's active gateway, and records it on the ledger.
    #[tracing::instrument(skip(self, req), fields(tenant = %tenant_id, order = %req.order_id))]
    pub async fn create_pix_payment(
        &self,
        tenant_id: TenantId,
        req: CreatePixPaymentRequest,
    ) -> Result<PaymentResponse, AppError> {
        let (order, gateway) = self.pending_order_and_gateway(tenant_id, req.order_id).await?;
        let amount = positive_amount(req.amount, req.currency)?;

        let ctx = ChargeContext {
            tenant_id,
            order_id: order.id,
            amount,
            method: PaymentMethod::Pix,
            customer_name: req.customer_name,
            customer_email: req.customer_email,
            return_url: None,
        };

        let adapter = self.adapter_for(&gateway)?;
        let charge: PixCharge = adapter.create_pix_payment(&ctx).await?;

        let tx = self
            .repo
            .insert_transaction(NewTransaction {
                tenant_id,
                order_id: order.id,
                gateway_id: gateway.id,
                provider: gateway.provider,
                payment_method: PaymentMethod::Pix,
                external_payment_id: Some(charge.external_id),
                status: charge.status,
                amount,
                qr_code_text: charge.qr_code_text,
                qr_code_image_url: charge.qr_code_image_url,
                payment_link_url: None,
                raw_provider_response: charge.raw,
            })
            .await?;

        Ok(payment_response(tx))
    }

    /// Creates a hosted card checkout link for an existing pending order.
    #[tracing::instrument(skip(self, req), fields(tenant = %tenant_id, order = %req.order_id))]
    pub async fn create_card_link(
        &self,
        tenant_id: TenantId,
        req: CreateCardLinkRequest,
    ) -> Result<PaymentResponse, AppError> {
        if !req.method.is_card() {
            return Err(AppError::BadRequest(
                "Card link requires a card payment method".into(),
            ));
        }

        let (order, gateway) = self.pending_order_and_gateway(tenant_id, req.order_id).await?;
        let amount = positive_amount(req.amount, req.currency)?;

        let ctx = ChargeContext {
            tenant_id,
            order_id: order.id,
            amount,
            method: req.method,
            customer_name: req.customer_name,
            customer_email: None,
            return_url: req.return_url,
        };

        let adapter = self.adapter_for(&gateway)?;
        let link: CardLink = adapter.create_card_payment_link(&ctx).await?;

        let tx = self
            .repo
            .insert_transaction(NewTransaction {
                tenant_id,
                order_id: order.id,
                gateway_id: gateway.id,
                provider: gateway.provider,
                payment_method: req.method,
                external_payment_id: Some(link.external_id),
                status: link.status,
                amount,
                qr_code_text: None,
                qr_code_image_url: None,
                payment_link_url: link.payment_url,
                raw_provider_response: link.raw,
            })
            .await?;

        Ok(payment_response(tx))
    }

    /// Reads a ledger transaction reference.
    pub async fn get_transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<PaymentResponse, AppError> {
        self.repo
            .get_transaction(tenant_id, id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Transaction {}", id))))
            .map(payment_response)
    }

    /// Reads the recomputed monthly revenue aggregate.
    pub async fn monthly_revenue(
        &self,
        tenant_id: TenantId,
        month: &str,
    ) -> Result<i64, AppError> {
        if !valid_month_key(month) {
            return Err(AppError::BadRequest(
                "Month must be formatted YYYY-MM".into(),
            ));
        }
        self.repo
            .monthly_revenue(tenant_id, month)
            .await
            .map_err(Into::into)
    }

    async fn pending_order_and_gateway(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
    ) -> Result<(Order, Gateway), AppError> {
        let order = self
            .repo
            .get_order(tenant_id, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {}", order_id)))?;

        if !order.status.is_pending() {
            return Err(AppError::BadRequest(format!(
                "Order is {}, not pending",
                order.status
            )));
        }

        let gateway = self
            .repo
            .get_active_gateway(tenant_id, None)
            .await?
            .ok_or_else(|| AppError::BadRequest("No active payment gateway".into()))?;

        Ok((order, gateway))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhook ingestion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ingests a Stripe webhook. The raw body is verified against the stored
    /// webhook secret before anything is parsed for settlement.
    #[tracing::instrument(skip(self, signature_header, body), fields(tenant = %tenant_id))]
    pub async fn ingest_stripe(
        &self,
        tenant_id: TenantId,
        signature_header: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookAck, AppError> {
        let gateways = self.repo.list_gateways(tenant_id).await?;
        let Some(gateway) = self.find_gateway(gateways, Provider::Stripe) else {
            tracing::warn!("stripe webhook for tenant with no stripe gateway");
            return Ok(WebhookAck::ignored());
        };

        match &gateway.encrypted_webhook_secret {
            Some(encrypted) => {
                let secret = self.vault.decrypt(encrypted).map_err(Self::crypto_err)?;
                let header = signature_header
                    .ok_or_else(|| AppError::Signature("Missing Stripe-Signature header".into()))?;
                if !verify_stripe_signature(&secret, header, body) {
                    return Err(AppError::Signature(
                        "Stripe signature verification failed".into(),
                    ));
                }
            }
            None if gateway.environment == Environment::Production => {
                return Err(AppError::Signature(
                    "Webhook secret not configured for production gateway".into(),
                ));
            }
            None => {
                tracing::warn!("sandbox gateway without webhook secret, skipping verification");
            }
        }

        let event: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Malformed webhook body: {}", e)))?;

        let object = &event["data"]["object"];
        let Some(external_id) = object["id"].as_str() else {
            return Ok(WebhookAck::ignored());
        };

        let event_type = event["type"].as_str().unwrap_or_default();
        let normalized = settle_types::map_stripe_event(event_type)
            .map(str::to_string)
            .unwrap_or_else(|| {
                object["status"].as_str().unwrap_or("unknown").to_string()
            });

        let paid_at = event["created"]
            .as_i64()
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0));

        self.finalize_ack(FinalizeRequest {
            tenant_id,
            provider: Provider::Stripe,
            external_payment_id: external_id.to_string(),
            normalized_status: normalized,
            paid_at,
            raw_payload: event,
        })
        .await
    }

    /// Ingests a MercadoPago webhook. The body carries only an opaque payment
    /// id and is never trusted; the authenticated payment lookup is the
    /// source of truth and runs before any state is touched.
    #[tracing::instrument(skip(self, body), fields(tenant = %tenant_id))]
    pub async fn ingest_mercadopago(
        &self,
        tenant_id: TenantId,
        body: serde_json::Value,
    ) -> Result<WebhookAck, AppError> {
        let external_id = body["data"]["id"]
            .as_str()
            .map(String::from)
            .or_else(|| body["data"]["id"].as_i64().map(|n| n.to_string()));
        let Some(external_id) = external_id else {
            return Ok(WebhookAck::ignored());
        };

        let gateways = self.repo.list_gateways(tenant_id).await?;
        let Some(gateway) = self.find_gateway(gateways, Provider::MercadoPago) else {
            tracing::warn!("mercadopago webhook for tenant with no mercadopago gateway");
            return Ok(WebhookAck::ignored());
        };

        let adapter = self.adapter_for(&gateway)?;
        let lookup = adapter.lookup_payment(&external_id).await?;

        self.finalize_ack(FinalizeRequest {
            tenant_id,
            provider: Provider::MercadoPago,
            external_payment_id: external_id,
            normalized_status: lookup.status.to_lowercase(),
            paid_at: lookup.paid_at,
            raw_payload: lookup.raw,
        })
        .await
    }

    /// Ingests a PagBank webhook. The payload is self-contained; its status
    /// goes through the closed PagBank mapping table.
    #[tracing::instrument(skip(self, body), fields(tenant = %tenant_id))]
    pub async fn ingest_pagbank(
        &self,
        tenant_id: TenantId,
        body: serde_json::Value,
    ) -> Result<WebhookAck, AppError> {
        let Some(external_id) = body["id"].as_str() else {
            return Ok(WebhookAck::ignored());
        };

        // PagBank notification shapes vary: a top-level status, an order
        // object, or a charges array. Check all three before giving up.
        let raw_status = body["status"]
            .as_str()
            .or_else(|| body["order"]["status"].as_str())
            .or_else(|| body["charges"][0]["status"].as_str())
            .unwrap_or_default();

        let paid_at = body["charges"][0]["paid_at"]
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));

        self.finalize_ack(FinalizeRequest {
            tenant_id,
            provider: Provider::PagBank,
            external_payment_id: external_id.to_string(),
            normalized_status: settle_types::map_pagbank_status(raw_status),
            paid_at,
            raw_payload: body,
        })
        .await
    }

    async fn finalize_ack(&self, req: FinalizeRequest) -> Result<WebhookAck, AppError> {
        let outcome = self.repo.finalize(req).await?;
        if outcome.processed {
            Ok(WebhookAck::processed())
        } else {
            Ok(WebhookAck::ignored())
        }
    }
}

fn valid_month_key(month: &str) -> bool {
    let bytes = month.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

fn positive_amount(
    amount: i64,
    currency: settle_types::Currency,
) -> Result<Money, AppError> {
    if amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }
    Money::new(amount, currency).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn order_response(order: Order) -> OrderResponse {
    OrderResponse {
        id: order.id,
        status: order.status,
        total: order.total.amount(),
        currency: order.total.currency(),
        customer_name: order.customer_name,
    }
}

fn payment_response(tx: PaymentTransaction) -> PaymentResponse {
    PaymentResponse {
        transaction_id: tx.id,
        provider: tx.provider,
        status: tx.status,
        qr_code_text: tx.qr_code_text,
        qr_code_image_url: tx.qr_code_image_url,
        payment_url: tx.payment_link_url,
    }
}
