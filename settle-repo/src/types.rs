//! Database row structs and their domain conversions.
//!
//! SQLite stores UUIDs and timestamps as TEXT; every row struct converts to
//! its domain type through an `into_domain` method.

use std::str::FromStr;

use sqlx::FromRow;

use settle_types::{
    AuditLogEntry, Currency, Environment, Gateway, GatewayId, Money,
    Order, OrderId, OrderStatus, PaymentMethod, PaymentTransaction, Provider, RepoError, TenantId,
    TransactionId,
};

fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_datetime(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    match s {
        "BRL" => Ok(Currency::BRL),
        "USD" => Ok(Currency::USD),
        other => Err(RepoError::Database(format!("unknown currency: {}", other))),
    }
}

fn parse_json(s: &str) -> Result<serde_json::Value, RepoError> {
    serde_json::from_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

/// Gateway row.
#[derive(FromRow)]
pub struct DbGateway {
    pub id: String,
    pub tenant_id: String,
    pub provider: String,
    pub display_name: String,
    pub public_key: Option<String>,
    pub encrypted_secret_key: String,
    pub encrypted_webhook_secret: Option<String>,
    pub environment: String,
    pub is_active: i64,
    pub settings: String,
    pub created_at: String,
}

impl DbGateway {
    pub fn into_domain(self) -> Result<Gateway, RepoError> {
        Ok(Gateway {
            id: GatewayId::from_uuid(parse_uuid(&self.id)?),
            tenant_id: TenantId::from_uuid(parse_uuid(&self.tenant_id)?),
            provider: Provider::from_str(&self.provider).map_err(RepoError::Database)?,
            display_name: self.display_name,
            public_key: self.public_key,
            encrypted_secret_key: self.encrypted_secret_key,
            encrypted_webhook_secret: self.encrypted_webhook_secret,
            environment: Environment::from_str(&self.environment).map_err(RepoError::Database)?,
            is_active: self.is_active != 0,
            settings: parse_json(&self.settings)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// Order row.
#[derive(FromRow)]
pub struct DbOrder {
    pub id: String,
    pub tenant_id: String,
    pub total_cents: i64,
    pub currency: String,
    pub status: String,
    pub customer_name: String,
    pub created_at: String,
}

impl DbOrder {
    pub fn into_domain(self) -> Result<Order, RepoError> {
        Ok(Order {
            id: OrderId::from_uuid(parse_uuid(&self.id)?),
            tenant_id: TenantId::from_uuid(parse_uuid(&self.tenant_id)?),
            total: Money::new(self.total_cents, parse_currency(&self.currency)?)
                .map_err(RepoError::Domain)?,
            status: OrderStatus::from_str(&self.status).map_err(RepoError::Database)?,
            customer_name: self.customer_name,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// Payment transaction row.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub tenant_id: String,
    pub order_id: String,
    pub gateway_id: String,
    pub provider: String,
    pub payment_method: String,
    pub external_payment_id: Option<String>,
    pub status: String,
    pub amount_cents: i64,
    pub currency: String,
    pub qr_code_text: Option<String>,
    pub qr_code_image_url: Option<String>,
    pub payment_link_url: Option<String>,
    pub raw_provider_response: String,
    pub created_at: String,
}

impl DbTransaction {
    pub fn into_domain(self) -> Result<PaymentTransaction, RepoError> {
        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(parse_uuid(&self.id)?),
            tenant_id: TenantId::from_uuid(parse_uuid(&self.tenant_id)?),
            order_id: OrderId::from_uuid(parse_uuid(&self.order_id)?),
            gateway_id: GatewayId::from_uuid(parse_uuid(&self.gateway_id)?),
            provider: Provider::from_str(&self.provider).map_err(RepoError::Database)?,
            payment_method: PaymentMethod::from_str(&self.payment_method)
                .map_err(RepoError::Database)?,
            external_payment_id: self.external_payment_id,
            status: self.status,
            amount: Money::new(self.amount_cents, parse_currency(&self.currency)?)
                .map_err(RepoError::Domain)?,
            qr_code_text: self.qr_code_text,
            qr_code_image_url: self.qr_code_image_url,
            payment_link_url: self.payment_link_url,
            raw_provider_response: parse_json(&self.raw_provider_response)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// Audit log row.
#[derive(FromRow)]
pub struct DbAuditEntry {
    pub id: String,
    pub tenant_id: String,
    pub action: String,
    pub resource: String,
    pub details: String,
    pub created_at: String,
}

impl DbAuditEntry {
    pub fn into_domain(self) -> Result<AuditLogEntry, RepoError> {
        Ok(AuditLogEntry {
            id: parse_uuid(&self.id)?,
            tenant_id: TenantId::from_uuid(parse_uuid(&self.tenant_id)?),
            action: self.action,
            resource: self.resource,
            details: parse_json(&self.details)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

/// Status-only order row used inside the settlement transaction.
#[derive(FromRow)]
pub struct DbOrderStatus {
    pub id: String,
    pub status: String,
}

/// Sum row for the revenue recompute.
#[derive(FromRow)]
pub struct DbRevenueSum {
    pub total_cents: Option<i64>,
}
