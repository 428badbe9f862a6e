//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer: the tenant
//! management API plus one webhook ingress path per provider.

mod handlers;
mod rate_limit;
mod server;
mod webhooks;

pub use server::HttpServer;
