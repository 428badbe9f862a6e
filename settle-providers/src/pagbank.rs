//! PagBank adapter.
//!
//! JSON requests, decimal amounts, separate sandbox and production hosts.
//! Credential validation uses the `/public-keys` endpoint, which only
//! answers for a valid bearer token.

use async_trait::async_trait;

use settle_types::{
    CardLink, ChargeContext, Environment, PaymentProvider, PixCharge, ProviderCredentials,
    ProviderError, ProviderIdentity,
};

use crate::{into_json, json_str, network_err};

const SANDBOX_URL: &str = "https://sandbox.api.pagseguro.com";
const PRODUCTION_URL: &str = "https://api.pagseguro.com";

pub struct PagBank {
    client: reqwest::Client,
    credentials: ProviderCredentials,
}

impl PagBank {
    pub fn new(client: reqwest::Client, credentials: ProviderCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn base_url(&self) -> &'static str {
        match self.credentials.environment {
            Environment::Sandbox => SANDBOX_URL,
            Environment::Production => PRODUCTION_URL,
        }
    }

    /// Finds an href among PagBank's HATEOAS links by `rel`.
    fn link_href(body: &serde_json::Value, pointer: &str, rel: &str) -> Option<String> {
        body.pointer(pointer)?
            .as_array()?
            .iter()
            .find(|l| l.get("rel").and_then(|r| r.as_str()) == Some(rel))
            .and_then(|l| l.get("href").and_then(|h| h.as_str()))
            .map(String::from)
    }
}

#[async_trait]
impl PaymentProvider for PagBank {
    async fn validate_credentials(&self) -> Result<ProviderIdentity, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/public-keys", self.base_url()))
            .bearer_auth(&self.credentials.secret_key)
            .send()
            .await
            .map_err(network_err)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::Credentials(
                "PagBank rejected the token".into(),
            ));
        }

        let body = into_json(resp).await?;
        let account_id = json_str(&body, "/public_key")
            .ok_or_else(|| ProviderError::Malformed("public-keys response missing key".into()))?;

        Ok(ProviderIdentity {
            account_id,
            account_name: None,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_pix_payment(&self, ctx: &ChargeContext) -> Result<PixCharge, ProviderError> {
        let payload = serde_json::json!({
            "reference_id": ctx.order_id.to_string(),
            "customer": {
                "name": ctx.customer_name,
                "email": ctx.customer_email.clone()
                    .unwrap_or_else(|| "cliente@example.com".to_string()),
            },
            "qr_codes": [{
                "amount": { "value": ctx.amount.as_decimal() },
            }],
        });

        let resp = self
            .client
            .post(format!("{}/orders", self.base_url()))
            .bearer_auth(&self.credentials.secret_key)
            .header("x-idempotency-key", ctx.idempotency_key("pix"))
            .json(&payload)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("order response missing id".into()))?;
        let status = json_str(&body, "/status").unwrap_or_else(|| "pending".to_string());

        Ok(PixCharge {
            external_id,
            status,
            qr_code_text: json_str(&body, "/qr_codes/0/text"),
            qr_code_image_url: Self::link_href(&body, "/qr_codes/0/links", "QRCODE.PNG"),
            raw: body,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_card_payment_link(
        &self,
        ctx: &ChargeContext,
    ) -> Result<CardLink, ProviderError> {
        let payload = serde_json::json!({
            "reference_id": ctx.order_id.to_string(),
            "customer": { "name": ctx.customer_name },
            "items": [{
                "name": format!("Pedido {}", ctx.order_id),
                "quantity": 1,
                "unit_amount": ctx.amount.as_decimal(),
            }],
        });

        let resp = self
            .client
            .post(format!("{}/checkouts", self.base_url()))
            .bearer_auth(&self.credentials.secret_key)
            .header("x-idempotency-key", ctx.idempotency_key("card"))
            .json(&payload)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("checkout response missing id".into()))?;
        let status = json_str(&body, "/status").unwrap_or_else(|| "pending".to_string());

        Ok(CardLink {
            external_id,
            status,
            payment_url: Self::link_href(&body, "/links", "PAY"),
            raw: body,
        })
    }
}
