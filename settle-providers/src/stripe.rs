//! Stripe adapter.
//!
//! Stripe takes form-encoded requests and amounts in integer minor units
//! (centavos). Sandbox vs production is selected by the key itself, so both
//! environments share the same base URL.

use async_trait::async_trait;

use settle_types::{
    CardLink, ChargeContext, PaymentProvider, PixCharge, ProviderCredentials, ProviderError,
    ProviderIdentity,
};

use crate::{into_json, json_str, network_err};

const BASE_URL: &str = "https://api.stripe.com";

pub struct Stripe {
    client: reqwest::Client,
    credentials: ProviderCredentials,
}

impl Stripe {
    pub fn new(client: reqwest::Client, credentials: ProviderCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl PaymentProvider for Stripe {
    async fn validate_credentials(&self) -> Result<ProviderIdentity, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/v1/account", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .send()
            .await
            .map_err(network_err)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Credentials(
                "Stripe rejected the secret key".into(),
            ));
        }

        let body = into_json(resp).await?;
        let account_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("account response missing id".into()))?;
        let account_name =
            json_str(&body, "/business_profile/name").or_else(|| json_str(&body, "/email"));

        Ok(ProviderIdentity {
            account_id,
            account_name,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_pix_payment(&self, ctx: &ChargeContext) -> Result<PixCharge, ProviderError> {
        let amount = ctx.amount.amount().to_string();
        let description = format!("Pedido {}", ctx.order_id);
        let mut form: Vec<(&str, &str)> = vec![
            ("amount", &amount),
            ("currency", "brl"),
            ("payment_method_types[]", "pix"),
            ("payment_method_data[type]", "pix"),
            ("confirm", "true"),
            ("description", &description),
        ];
        if let Some(email) = &ctx.customer_email {
            form.push(("receipt_email", email));
        }

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("payment intent missing id".into()))?;
        let status = json_str(&body, "/status").unwrap_or_else(|| "pending".to_string());

        Ok(PixCharge {
            external_id,
            status,
            qr_code_text: json_str(&body, "/next_action/pix_display_qr_code/data"),
            qr_code_image_url: json_str(&body, "/next_action/pix_display_qr_code/image_url_png"),
            raw: body,
        })
    }

    #[tracing::instrument(skip(self, ctx), fields(order_id = %ctx.order_id))]
    async fn create_card_payment_link(
        &self,
        ctx: &ChargeContext,
    ) -> Result<CardLink, ProviderError> {
        let amount = ctx.amount.amount().to_string();
        let product_name = format!("Pedido {}", ctx.order_id);
        let success_url = ctx
            .return_url
            .clone()
            .unwrap_or_else(|| "https://checkout.invalid/success".to_string());

        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("line_items[0][price_data][currency]", "brl"),
            ("line_items[0][price_data][product_data][name]", &product_name),
            ("line_items[0][price_data][unit_amount]", &amount),
            ("line_items[0][quantity]", "1"),
            ("success_url", &success_url),
            ("cancel_url", &success_url),
            ("client_reference_id", &product_name),
        ];

        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", BASE_URL))
            .bearer_auth(&self.credentials.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(network_err)?;

        let body = into_json(resp).await?;
        let external_id = json_str(&body, "/id")
            .ok_or_else(|| ProviderError::Malformed("checkout session missing id".into()))?;
        let status = json_str(&body, "/status").unwrap_or_else(|| "open".to_string());

        Ok(CardLink {
            external_id,
            status,
            payment_url: json_str(&body, "/url"),
            raw: body,
        })
    }
}
