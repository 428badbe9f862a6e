//! # Settle Providers
//!
//! Outbound HTTP adapters implementing the `PaymentProvider` port for
//! Stripe, MercadoPago and PagBank, plus Stripe webhook signature
//! verification. Each adapter owns its provider's wire format: auth scheme,
//! amount representation (minor units vs decimal) and response shapes.

use std::sync::Arc;

use settle_types::{PaymentProvider, Provider, ProviderCredentials, ProviderError, ProviderFactory};

pub mod mercadopago;
pub mod pagbank;
pub mod signature;
pub mod stripe;

pub use mercadopago::MercadoPago;
pub use pagbank::PagBank;
pub use stripe::Stripe;

/// Builds real HTTP adapters over a shared `reqwest` client.
pub struct HttpProviderFactory {
    client: reqwest::Client,
}

impl HttpProviderFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpProviderFactory {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn connect(
        &self,
        provider: Provider,
        credentials: ProviderCredentials,
    ) -> Arc<dyn PaymentProvider> {
        match provider {
            Provider::Stripe => Arc::new(Stripe::new(self.client.clone(), credentials)),
            Provider::MercadoPago => Arc::new(MercadoPago::new(self.client.clone(), credentials)),
            Provider::PagBank => Arc::new(PagBank::new(self.client.clone(), credentials)),
        }
    }
}

/// Maps a provider response to its JSON body, turning any non-2xx status
/// into a `ProviderError` that carries the upstream code and message.
pub(crate) async fn into_json(resp: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    let status = resp.status();
    let body = resp.text().await.map_err(network_err)?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or(body);
        return Err(ProviderError::Upstream {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Network failures map to a 502-equivalent provider error.
pub(crate) fn network_err(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.to_string())
}

/// Pulls a string field out of a provider response, tolerating numeric ids
/// (MercadoPago payment ids are numbers on the wire).
pub(crate) fn json_str(value: &serde_json::Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
