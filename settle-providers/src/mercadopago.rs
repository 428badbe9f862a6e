//! MercadoPago adapter.
//!
//! JSON requests, decimal amounts, `X-Idempotency-Key` on create calls.
//! This is also the only adapter that implements `lookup_payment`: its
//! webhook bodies carry nothing but an opaque payment id, so ingestion
//! fetches the authoritative payment state here before settling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use settle_types::{
    CardLink, ChargeContext, PaymentLookup, PaymentProvider, PixCharge, ProviderCredentials,
    ProviderError, ProviderIdentity,
};

use crate::{into_json, json_str, network_err};

const BASE_URL: &str = "https://api.mercadopago.com";

pub struct MercadoPago {
    client: reqwest::Client,
    credentials: ProviderCredentials,
}

impl MercadoPago {
    pub fn new(client: reqwest::Client, credentials: ProviderCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl PaymentProvider for MercadoPago {
    async fn validate_credentials(&self) -> Result<ProviderIdentity, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/users/me", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .send()
            .await
            .map_err(network_err)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Credentials(
                "MercadoPago rejected the access token".into(),
            ));
        }

        let body = into_json(resp).await?;
        let account_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("users/me response missing id".into()))?;
        let account_name =
            json_str(&body, "/nickname").or_else(|| json_str(&body, "/email"));

        Ok(ProviderIdentity {
            account_id,
            account_name,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_pix_payment(&self, ctx: &ChargeContext) -> Result<PixCharge, ProviderError> {
        let payload = serde_json::json!({
            "transaction_amount": ctx.amount.as_decimal(),
            "description": format!("Pedido {}", ctx.order_id),
            "payment_method_id": "pix",
            "payer": {
                "email": ctx.customer_email.clone()
                    .unwrap_or_else(|| "cliente@example.com".to_string()),
                "first_name": ctx.customer_name,
            },
            "external_reference": ctx.order_id.to_string(),
        });

        let resp = self
            .client
            .post(format!("{}/v1/payments", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .header("X-Idempotency-Key", ctx.idempotency_key("pix"))
            .json(&payload)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("payment response missing id".into()))?;
        let status = json_str(&body, "/status").unwrap_or_else(|| "pending".to_string());

        Ok(PixCharge {
            external_id,
            status,
            qr_code_text: json_str(&body, "/point_of_interaction/transaction_data/qr_code"),
            qr_code_image_url: json_str(&body, "/point_of_interaction/transaction_data/ticket_url"),
            raw: body,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_card_payment_link(
        &self,
        ctx: &ChargeContext,
    ) -> Result<CardLink, ProviderError> {
        let payload = serde_json::json!({
            "items": [{
                "title": format!("Pedido {}", ctx.order_id),
                "quantity": 1,
                "unit_price": ctx.amount.as_decimal(),
                "currency_id": "BRL",
            }],
            "payer": { "name": ctx.customer_name },
            "external_reference": ctx.order_id.to_string(),
        });

        let resp = self
            .client
            .post(format!("{}/checkout/preferences", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .header("X-Idempotency-Key", ctx.idempotency_key("card"))
            .json(&payload)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("preference response missing id".into()))?;

        Ok(CardLink {
            external_id,
            // Checkout preferences carry no status of their own
            status: "pending".to_string(),
            payment_url: json_str(&body, "/init_point"),
            raw: body,
        })
    }

    /// Authenticated payment lookup, the source of truth for webhook
    /// ingestion. Never trust the webhook body's status field.
    #[tracing::instrument(skip(self))]
    async fn lookup_payment(&self, external_id: &str) -> Result<PaymentLookup, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/v1/payments/{}", BASE_URL, external_id))
            .bearer_auth(&self.credentials.secret_key)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let status = json_str(&body, "/status")
            .ok_or_else(|| ProviderError::Malformed("payment lookup missing status".into()))?;
        let paid_at = json_str(&body, "/date_approved")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(PaymentLookup {
            status,
            paid_at,
            raw: body,
        })
    }
}
