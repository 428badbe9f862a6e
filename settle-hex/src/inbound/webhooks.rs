//! Webhook ingress handlers, one path per provider.
//!
//! Stripe needs the raw request body for signature verification, so its
//! handler takes `Bytes` instead of a typed JSON extractor. All three return
//! 200 with `{"received": true, ...}` whenever the event was absorbed,
//! including graceful no-ops, so the provider stops retrying.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};

use settle_types::{AppError, SettlementRepository};

use super::handlers::{ApiError, AppState, parse_tenant};

#[tracing::instrument(skip(state, headers, body), fields(tenant = %tenant))]
pub async fn stripe<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    let ack = state
        .service
        .ingest_stripe(tenant_id, signature, &body)
        .await?;
    Ok(Json(ack))
}

#[tracing::instrument(skip(state, body), fields(tenant = %tenant))]
pub async fn mercadopago<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook body: {}", e)))?;

    let ack = state.service.ingest_mercadopago(tenant_id, payload).await?;
    Ok(Json(ack))
}

#[tracing::instrument(skip(state, body), fields(tenant = %tenant))]
pub async fn pagbank<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed webhook body: {}", e)))?;

    let ack = state.service.ingest_pagbank(tenant_id, payload).await?;
    Ok(Json(ack))
}
