//! SQLite repository adapter.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use uuid::Uuid;

use settle_types::{
    AuditLogEntry, ChargeStatus, FinalizeRequest, Gateway, GatewayId, NewGateway, NewOrder,
    NewTransaction, Order, OrderId, OrderStatus, PaymentTransaction, Provider, RepoError,
    SettlementOutcome, SettlementRepository, StatusClass, TenantId, TransactionId,
};

use crate::types::{
    DbAuditEntry, DbGateway, DbOrder, DbOrderStatus, DbRevenueSum, DbTransaction,
};

fn db_err(e: sqlx::Error) -> RepoError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        RepoError::Conflict(msg)
    } else {
        RepoError::Database(msg)
    }
}

fn tx_err(e: sqlx::Error) -> RepoError {
    RepoError::Transaction(e.to_string())
}

const TRANSACTION_COLUMNS: &str = "id, tenant_id, order_id, gateway_id, provider, payment_method, \
     external_payment_id, status, amount_cents, currency, qr_code_text, qr_code_image_url, \
     payment_link_url, raw_provider_response, created_at";

const GATEWAY_COLUMNS: &str = "id, tenant_id, provider, display_name, public_key, \
     encrypted_secret_key, encrypted_webhook_secret, environment, is_active, settings, created_at";

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Each pooled connection to `:memory:` would open its own empty
        // database, so in-memory URLs get a single-connection pool.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool: SqlitePool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::raw_sql(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SettlementRepository for SqliteRepo {
    // ─────────────────────────────────────────────────────────────────────────────
    // Gateway Registry
    // ─────────────────────────────────────────────────────────────────────────────

    async fn connect_gateway(&self, gw: NewGateway) -> Result<Gateway, RepoError> {
        let tenant_str = gw.tenant_id.to_string();
        let provider_str = gw.provider.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        // Deactivate-then-upsert in one transaction keeps the
        // single-active-gateway invariant under concurrent connects.
        sqlx::query(r#"UPDATE gateways SET is_active = 0 WHERE tenant_id = ?"#)
            .bind(&tenant_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            r#"INSERT INTO gateways
                   (id, tenant_id, provider, display_name, public_key, encrypted_secret_key,
                    encrypted_webhook_secret, environment, is_active, settings, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
               ON CONFLICT (tenant_id, provider) DO UPDATE SET
                   display_name = excluded.display_name,
                   public_key = excluded.public_key,
                   encrypted_secret_key = excluded.encrypted_secret_key,
                   encrypted_webhook_secret = excluded.encrypted_webhook_secret,
                   environment = excluded.environment,
                   is_active = 1,
                   settings = excluded.settings"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&tenant_str)
        .bind(&provider_str)
        .bind(&gw.display_name)
        .bind(&gw.public_key)
        .bind(&gw.encrypted_secret_key)
        .bind(&gw.encrypted_webhook_secret)
        .bind(gw.environment.as_str())
        .bind(gw.settings.to_string())
        .bind(&now)
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let row: DbGateway = sqlx::query_as(&format!(
            r#"SELECT {GATEWAY_COLUMNS} FROM gateways WHERE tenant_id = ? AND provider = ?"#
        ))
        .bind(&tenant_str)
        .bind(&provider_str)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(db_err)?;

        db_tx.commit().await.map_err(tx_err)?;

        row.into_domain()
    }

    async fn get_active_gateway(
        &self,
        tenant_id: TenantId,
        provider: Option<Provider>,
    ) -> Result<Option<Gateway>, RepoError> {
        let tenant_str = tenant_id.to_string();

        let row: Option<DbGateway> = match provider {
            Some(p) => {
                sqlx::query_as(&format!(
                    r#"SELECT {GATEWAY_COLUMNS} FROM gateways
                       WHERE tenant_id = ? AND provider = ? AND is_active = 1"#
                ))
                .bind(&tenant_str)
                .bind(p.as_str())
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    r#"SELECT {GATEWAY_COLUMNS} FROM gateways
                       WHERE tenant_id = ? AND is_active = 1"#
                ))
                .bind(&tenant_str)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        row.map(DbGateway::into_domain).transpose()
    }

    async fn list_gateways(&self, tenant_id: TenantId) -> Result<Vec<Gateway>, RepoError> {
        let rows: Vec<DbGateway> = sqlx::query_as(&format!(
            r#"SELECT {GATEWAY_COLUMNS} FROM gateways WHERE tenant_id = ? ORDER BY created_at DESC"#
        ))
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbGateway::into_domain).collect()
    }

    async fn activate_gateway(&self, tenant_id: TenantId, id: GatewayId) -> Result<(), RepoError> {
        let tenant_str = tenant_id.to_string();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        sqlx::query(r#"UPDATE gateways SET is_active = 0 WHERE tenant_id = ?"#)
            .bind(&tenant_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        let result =
            sqlx::query(r#"UPDATE gateways SET is_active = 1 WHERE id = ? AND tenant_id = ?"#)
                .bind(id.to_string())
                .bind(&tenant_str)
                .execute(&mut *db_tx)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        db_tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn delete_gateway(&self, tenant_id: TenantId, id: GatewayId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM gateways WHERE id = ? AND tenant_id = ?"#)
            .bind(id.to_string())
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Order/Charge Lifecycle boundary
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError> {
        let id = OrderId::new();
        let now = chrono::Utc::now();
        let now_str = now.to_rfc3339();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        sqlx::query(
            r#"INSERT INTO orders (id, tenant_id, total_cents, currency, status, customer_name, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(order.tenant_id.to_string())
        .bind(order.total.amount())
        .bind(order.total.currency().to_string())
        .bind(order.status.as_str())
        .bind(&order.customer_name)
        .bind(&now_str)
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        if order.with_charge {
            sqlx::query(
                r#"INSERT INTO billing_charges (order_id, tenant_id, status) VALUES (?, ?, 'pending')"#,
            )
            .bind(id.to_string())
            .bind(order.tenant_id.to_string())
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;
        }

        db_tx.commit().await.map_err(tx_err)?;

        Ok(Order {
            id,
            tenant_id: order.tenant_id,
            total: order.total,
            status: order.status,
            customer_name: order.customer_name,
            created_at: now,
        })
    }

    async fn get_order(
        &self,
        tenant_id: TenantId,
        id: OrderId,
    ) -> Result<Option<Order>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(
            r#"SELECT id, tenant_id, total_cents, currency, status, customer_name, created_at
               FROM orders WHERE id = ? AND tenant_id = ?"#,
        )
        .bind(id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbOrder::into_domain).transpose()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Transaction Ledger
    // ─────────────────────────────────────────────────────────────────────────────

    async fn insert_transaction(
        &self,
        tx: NewTransaction,
    ) -> Result<PaymentTransaction, RepoError> {
        let id = TransactionId::new();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"INSERT INTO payment_transactions
                   (id, tenant_id, order_id, gateway_id, provider, payment_method,
                    external_payment_id, status, amount_cents, currency, qr_code_text,
                    qr_code_image_url, payment_link_url, raw_provider_response, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(tx.tenant_id.to_string())
        .bind(tx.order_id.to_string())
        .bind(tx.gateway_id.to_string())
        .bind(tx.provider.as_str())
        .bind(tx.payment_method.as_str())
        .bind(&tx.external_payment_id)
        .bind(&tx.status)
        .bind(tx.amount.amount())
        .bind(tx.amount.currency().to_string())
        .bind(&tx.qr_code_text)
        .bind(&tx.qr_code_image_url)
        .bind(&tx.payment_link_url)
        .bind(tx.raw_provider_response.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(PaymentTransaction {
            id,
            tenant_id: tx.tenant_id,
            order_id: tx.order_id,
            gateway_id: tx.gateway_id,
            provider: tx.provider,
            payment_method: tx.payment_method,
            external_payment_id: tx.external_payment_id,
            status: tx.status,
            amount: tx.amount,
            qr_code_text: tx.qr_code_text,
            qr_code_image_url: tx.qr_code_image_url,
            payment_link_url: tx.payment_link_url,
            raw_provider_response: tx.raw_provider_response,
            created_at: now,
        })
    }

    async fn get_transaction(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<Option<PaymentTransaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            r#"SELECT {TRANSACTION_COLUMNS} FROM payment_transactions
               WHERE id = ? AND tenant_id = ?"#
        ))
        .bind(id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn find_transaction(
        &self,
        tenant_id: TenantId,
        provider: Provider,
        external_payment_id: &str,
    ) -> Result<Option<PaymentTransaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            r#"SELECT {TRANSACTION_COLUMNS} FROM payment_transactions
               WHERE tenant_id = ? AND provider = ? AND external_payment_id = ?"#
        ))
        .bind(tenant_id.to_string())
        .bind(provider.as_str())
        .bind(external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransaction::into_domain).transpose()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Settlement Reconciler
    // ─────────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self, req), fields(external_id = %req.external_payment_id))]
    async fn finalize(&self, req: FinalizeRequest) -> Result<SettlementOutcome, RepoError> {
        let tenant_str = req.tenant_id.to_string();

        let mut db_tx = self.pool.begin().await.map_err(tx_err)?;

        // Step 1: natural-key lookup. Unknown transactions are absorbed,
        // not errors; stale or misrouted webhooks must still get a 2xx.
        let row: Option<DbTransaction> = sqlx::query_as(&format!(
            r#"SELECT {TRANSACTION_COLUMNS} FROM payment_transactions
               WHERE tenant_id = ? AND provider = ? AND external_payment_id = ?"#
        ))
        .bind(&tenant_str)
        .bind(req.provider.as_str())
        .bind(&req.external_payment_id)
        .fetch_optional(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(SettlementOutcome::ignored());
        };
        let ledger_tx = row.into_domain()?;

        // Step 3a: status and raw payload are updated unconditionally, so
        // re-deliveries always leave the latest provider payload behind.
        sqlx::query(
            r#"UPDATE payment_transactions SET status = ?, raw_provider_response = ? WHERE id = ?"#,
        )
        .bind(&req.normalized_status)
        .bind(req.raw_payload.to_string())
        .bind(ledger_tx.id.to_string())
        .execute(&mut *db_tx)
        .await
        .map_err(db_err)?;

        let order_row: Option<DbOrderStatus> =
            sqlx::query_as(r#"SELECT id, status FROM orders WHERE id = ? AND tenant_id = ?"#)
                .bind(ledger_tx.order_id.to_string())
                .bind(&tenant_str)
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(db_err)?;

        let Some(order_row) = order_row else {
            tracing::warn!(order_id = %ledger_tx.order_id, "ledger row references missing order");
            db_tx.commit().await.map_err(tx_err)?;
            return Ok(SettlementOutcome {
                processed: true,
                order_status: None,
            });
        };

        let current = OrderStatus::from_str(&order_row.status).map_err(RepoError::Database)?;
        let mut final_status = current;

        // Steps 3b-3d: the cascade runs only while the order is still
        // pending. `paid` is terminal, which makes duplicate delivery a
        // no-op beyond the raw-payload update above.
        if current.is_pending() {
            match StatusClass::classify(&req.normalized_status) {
                StatusClass::Paid => {
                    let paid_at = req.paid_at.unwrap_or_else(chrono::Utc::now);

                    sqlx::query(r#"UPDATE orders SET status = 'paid' WHERE id = ?"#)
                        .bind(&order_row.id)
                        .execute(&mut *db_tx)
                        .await
                        .map_err(db_err)?;

                    sqlx::query(
                        r#"UPDATE billing_charges SET status = 'paid', paid_at = ? WHERE order_id = ?"#,
                    )
                    .bind(paid_at.to_rfc3339())
                    .bind(&order_row.id)
                    .execute(&mut *db_tx)
                    .await
                    .map_err(db_err)?;

                    self.recompute_monthly_revenue(&mut db_tx, &tenant_str)
                        .await?;
                    self.append_audit(
                        &mut db_tx,
                        &tenant_str,
                        "payment.settled",
                        &ledger_tx,
                        ChargeStatus::Paid,
                    )
                    .await?;

                    final_status = OrderStatus::Paid;
                }
                StatusClass::Failed => {
                    sqlx::query(r#"UPDATE orders SET status = 'failed' WHERE id = ?"#)
                        .bind(&order_row.id)
                        .execute(&mut *db_tx)
                        .await
                        .map_err(db_err)?;

                    sqlx::query(
                        r#"UPDATE billing_charges SET status = 'failed' WHERE order_id = ?"#,
                    )
                    .bind(&order_row.id)
                    .execute(&mut *db_tx)
                    .await
                    .map_err(db_err)?;

                    self.append_audit(
                        &mut db_tx,
                        &tenant_str,
                        "payment.failed",
                        &ledger_tx,
                        ChargeStatus::Failed,
                    )
                    .await?;

                    final_status = OrderStatus::Failed;
                }
                StatusClass::Other => {}
            }
        }

        db_tx.commit().await.map_err(tx_err)?;

        Ok(SettlementOutcome {
            processed: true,
            order_status: Some(final_status),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read models
    // ─────────────────────────────────────────────────────────────────────────────

    async fn monthly_revenue(&self, tenant_id: TenantId, month: &str) -> Result<i64, RepoError> {
        let row: Option<DbRevenueSum> = sqlx::query_as(
            r#"SELECT total_cents FROM monthly_revenue WHERE tenant_id = ? AND month = ?"#,
        )
        .bind(tenant_id.to_string())
        .bind(month)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.and_then(|r| r.total_cents).unwrap_or(0))
    }

    async fn list_audit_entries(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<AuditLogEntry>, RepoError> {
        let rows: Vec<DbAuditEntry> = sqlx::query_as(
            r#"SELECT id, tenant_id, action, resource, details, created_at
               FROM audit_log WHERE tenant_id = ? ORDER BY created_at DESC"#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbAuditEntry::into_domain).collect()
    }
}

impl SqliteRepo {
    /// Recomputes (never increments) the tenant's current-month revenue:
    /// the full sum of paid orders created in the current calendar month.
    async fn recompute_monthly_revenue(
        &self,
        db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        tenant_str: &str,
    ) -> Result<(), RepoError> {
        let month = chrono::Utc::now().format("%Y-%m").to_string();

        let sum: DbRevenueSum = sqlx::query_as(
            r#"SELECT SUM(total_cents) AS total_cents FROM orders
               WHERE tenant_id = ? AND status = 'paid' AND strftime('%Y-%m', created_at) = ?"#,
        )
        .bind(tenant_str)
        .bind(&month)
        .fetch_one(&mut **db_tx)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"INSERT INTO monthly_revenue (tenant_id, month, total_cents, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (tenant_id, month) DO UPDATE SET
                   total_cents = excluded.total_cents,
                   updated_at = excluded.updated_at"#,
        )
        .bind(tenant_str)
        .bind(&month)
        .bind(sum.total_cents.unwrap_or(0))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut **db_tx)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn append_audit(
        &self,
        db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        tenant_str: &str,
        action: &str,
        ledger_tx: &PaymentTransaction,
        charge_status: ChargeStatus,
    ) -> Result<(), RepoError> {
        let details = serde_json::json!({
            "transaction_id": ledger_tx.id,
            "order_id": ledger_tx.order_id,
            "provider": ledger_tx.provider,
            "status": charge_status.as_str(),
        });

        sqlx::query(
            r#"INSERT INTO audit_log (id, tenant_id, action, resource, details, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(tenant_str)
        .bind(action)
        .bind(format!("order:{}", ledger_tx.order_id))
        .bind(details.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut **db_tx)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
