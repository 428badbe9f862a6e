//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use settle_types::SettlementRepository;

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use super::webhooks;
use crate::PaymentService;
use crate::openapi::ApiDoc;

/// HTTP Server for the settlement engine API.
pub struct HttpServer<R: SettlementRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: SettlementRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: PaymentService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: PaymentService<R>, requests_per_minute: u32) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api/tenants/{tenant}/gateways",
                post(handlers::connect_gateway::<R>).get(handlers::list_gateways::<R>),
            )
            .route(
                "/api/tenants/{tenant}/gateways/{id}/activate",
                post(handlers::activate_gateway::<R>),
            )
            .route(
                "/api/tenants/{tenant}/gateways/{id}",
                delete(handlers::delete_gateway::<R>),
            )
            .route(
                "/api/tenants/{tenant}/orders",
                post(handlers::create_order::<R>),
            )
            .route(
                "/api/tenants/{tenant}/orders/{id}",
                get(handlers::get_order::<R>),
            )
            .route(
                "/api/tenants/{tenant}/payments/pix",
                post(handlers::create_pix_payment::<R>),
            )
            .route(
                "/api/tenants/{tenant}/payments/card-link",
                post(handlers::create_card_link::<R>),
            )
            .route(
                "/api/tenants/{tenant}/transactions/{id}",
                get(handlers::get_transaction::<R>),
            )
            .route(
                "/api/tenants/{tenant}/revenue/{month}",
                get(handlers::monthly_revenue::<R>),
            )
            .route("/webhooks/stripe/{tenant}", post(webhooks::stripe::<R>))
            .route(
                "/webhooks/mercadopago/{tenant}",
                post(webhooks::mercadopago::<R>),
            )
            .route("/webhooks/pagbank/{tenant}", post(webhooks::pagbank::<R>))
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
