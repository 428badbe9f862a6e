//! Management API request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use settle_types::{
    AppError, ConnectGatewayRequest, CreateCardLinkRequest, CreateOrderRequest,
    CreatePixPaymentRequest, GatewayId, OrderId, SettlementRepository, TenantId, TransactionId,
};

use crate::PaymentService;

/// Application state shared across handlers.
pub struct AppState<R: SettlementRepository> {
    pub service: PaymentService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Signature(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Provider { status, message } => (
                StatusCode::BAD_GATEWAY,
                format!("Provider returned {}: {}", status, message),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

pub fn parse_tenant(raw: &str) -> Result<TenantId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(AppError::BadRequest("Invalid tenant ID".into())))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway management
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(tenant = %tenant))]
pub async fn connect_gateway<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    Json(req): Json<ConnectGatewayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let gateway = state.service.connect_gateway(tenant_id, req).await?;
    Ok((StatusCode::CREATED, Json(gateway)))
}

#[tracing::instrument(skip(state), fields(tenant = %tenant))]
pub async fn list_gateways<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let gateways = state.service.list_gateways(tenant_id).await?;
    Ok(Json(gateways))
}

#[tracing::instrument(skip(state), fields(tenant = %tenant, gateway = %id))]
pub async fn activate_gateway<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let gateway_id: GatewayId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid gateway ID".into()))?;

    state.service.activate_gateway(tenant_id, gateway_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state), fields(tenant = %tenant, gateway = %id))]
pub async fn delete_gateway<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let gateway_id: GatewayId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid gateway ID".into()))?;

    state.service.delete_gateway(tenant_id, gateway_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(tenant = %tenant))]
pub async fn create_order<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let order = state.service.create_order(tenant_id, req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[tracing::instrument(skip(state), fields(tenant = %tenant, order = %id))]
pub async fn get_order<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let order_id: OrderId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order ID".into()))?;

    let order = state.service.get_order(tenant_id, order_id).await?;
    Ok(Json(order))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(tenant = %tenant, order = %req.order_id))]
pub async fn create_pix_payment<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    Json(req): Json<CreatePixPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let payment = state.service.create_pix_payment(tenant_id, req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[tracing::instrument(skip(state, req), fields(tenant = %tenant, order = %req.order_id))]
pub async fn create_card_link<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(tenant): Path<String>,
    Json(req): Json<CreateCardLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let payment = state.service.create_card_link(tenant_id, req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[tracing::instrument(skip(state), fields(tenant = %tenant, transaction = %id))]
pub async fn get_transaction<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((tenant, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let tx_id: TransactionId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid transaction ID".into()))?;

    let tx = state.service.get_transaction(tenant_id, tx_id).await?;
    Ok(Json(tx))
}

// ─────────────────────────────────────────────────────────────────────────────
// Read models
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(tenant = %tenant, month = %month))]
pub async fn monthly_revenue<R: SettlementRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path((tenant, month)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = parse_tenant(&tenant)?;
    let total_cents = state.service.monthly_revenue(tenant_id, &month).await?;
    Ok(Json(serde_json::json!({
        "month": month,
        "total_cents": total_cents
    })))
}
