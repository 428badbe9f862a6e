//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture. Adapters (SQLite,
//! in-memory test doubles) implement this trait; there is no ambient global
//! database handle anywhere in the engine.

use chrono::{DateTime, Utc};

use crate::domain::{
    AuditLogEntry, Gateway, GatewayId, NewGateway, NewOrder, NewTransaction, Order, OrderId,
    OrderStatus, PaymentTransaction, Provider, TenantId, TransactionId,
};
use crate::error::RepoError;

/// Arguments for one settlement pass.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub tenant_id: TenantId,
    pub provider: Provider,
    pub external_payment_id: String,
    /// Status already normalized by webhook ingestion. The reconciler
    /// classifies it through the closed paid/failed/other sets.
    pub normalized_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub raw_payload: serde_json::Value,
}

/// Result of a settlement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementOutcome {
    /// False when no transaction matched the natural key; such webhooks are
    /// acknowledged and absorbed, not treated as errors.
    pub processed: bool,
    /// Order status after the pass, when a transaction matched.
    pub order_status: Option<OrderStatus>,
}

impl SettlementOutcome {
    pub fn ignored() -> Self {
        Self {
            processed: false,
            order_status: None,
        }
    }
}

/// The main repository port for the settlement engine.
///
/// Every multi-row mutation (gateway activation, settlement cascade) MUST be
/// one atomic database transaction; partial cascades must never be
/// observable.
#[async_trait::async_trait]
pub trait SettlementRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Gateway Registry
    // ─────────────────────────────────────────────────────────────────────────────

    /// Deactivates every gateway of the tenant, then upserts (by tenant +
    /// provider) the new one as active. One transaction, so the
    /// single-active-gateway invariant holds even under concurrent connects.
    async fn connect_gateway(&self, gw: NewGateway) -> Result<Gateway, RepoError>;

    /// Finds the tenant's active gateway, optionally narrowed to a provider.
    async fn get_active_gateway(
        &self,
        tenant_id: TenantId,
        provider: Option<Provider>,
    ) -> Result<Option<Gateway>, RepoError>;

    /// Lists all of a tenant's gateways.
    async fn list_gateways(&self, tenant_id: TenantId) -> Result<Vec<Gateway>, RepoError>;

    /// Flips the given gateway active, deactivating the rest, atomically.
    async fn activate_gateway(&self, tenant_id: TenantId, id: GatewayId) -> Result<(), RepoError>;

    /// Deletes a gateway. Returns false when it did not exist.
    async fn delete_gateway(&self, tenant_id: TenantId, id: GatewayId) -> Result<bool, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Order/Charge Lifecycle boundary
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates an order (and, when requested, its 1:1 billing charge).
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError>;

    /// Gets an order by id within a tenant.
    async fn get_order(&self, tenant_id: TenantId, id: OrderId)
    -> Result<Option<Order>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Transaction Ledger
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records a payment attempt with the provider's raw initial status.
    async fn insert_transaction(
        &self,
        tx: NewTransaction,
    ) -> Result<PaymentTransaction, RepoError>;

    /// Gets a ledger row by id within a tenant.
    async fn get_transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<Option<PaymentTransaction>, RepoError>;

    /// Looks up a ledger row by its natural key, the sole webhook lookup key.
    async fn find_transaction(
        &self,
        tenant_id: TenantId,
        provider: Provider,
        external_payment_id: &str,
    ) -> Result<Option<PaymentTransaction>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settlement Reconciler (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a normalized status to the ledger and cascades to the order,
    /// billing charge, monthly revenue aggregate and audit trail inside one
    /// database transaction. Idempotent under duplicate delivery.
    async fn finalize(&self, req: FinalizeRequest) -> Result<SettlementOutcome, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Read models
    // ─────────────────────────────────────────────────────────────────────────────

    /// Reads the recomputed revenue aggregate for a `YYYY-MM` month key.
    async fn monthly_revenue(&self, tenant_id: TenantId, month: &str) -> Result<i64, RepoError>;

    /// Lists a tenant's audit trail, newest first.
    async fn list_audit_entries(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<AuditLogEntry>, RepoError>;
}
