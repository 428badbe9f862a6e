use serde_json::json;

use settle_types::{
    Currency, Environment, FinalizeRequest, Money, NewGateway, NewOrder, NewTransaction,
    OrderStatus, PaymentMethod, PaymentTransaction, Provider, RepoError, SettlementRepository,
    TenantId,
};

use crate::SqliteRepo;

async fn repo() -> SqliteRepo {
    SqliteRepo::new("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

fn new_gateway(tenant_id: TenantId, provider: Provider) -> NewGateway {
    NewGateway {
        tenant_id,
        provider,
        display_name: format!("{provider} gateway"),
        public_key: None,
        encrypted_secret_key: "enc:secret".to_string(),
        encrypted_webhook_secret: Some("enc:whsec".to_string()),
        environment: Environment::Sandbox,
        settings: json!({}),
    }
}

async fn seed_transaction(
    repo: &SqliteRepo,
    tenant_id: TenantId,
    external_id: &str,
    amount_cents: i64,
) -> PaymentTransaction {
    let gw = repo
        .connect_gateway(new_gateway(tenant_id, Provider::MercadoPago))
        .await
        .unwrap();

    let order = repo
        .create_order(NewOrder {
            tenant_id,
            total: Money::new(amount_cents, Currency::BRL).unwrap(),
            status: OrderStatus::PendingPix,
            customer_name: "Maria Souza".to_string(),
            with_charge: true,
        })
        .await
        .unwrap();

    repo.insert_transaction(NewTransaction {
        tenant_id,
        order_id: order.id,
        gateway_id: gw.id,
        provider: Provider::MercadoPago,
        payment_method: PaymentMethod::Pix,
        external_payment_id: Some(external_id.to_string()),
        status: "pending".to_string(),
        amount: Money::new(amount_cents, Currency::BRL).unwrap(),
        qr_code_text: Some("00020126...".to_string()),
        qr_code_image_url: None,
        payment_link_url: None,
        raw_provider_response: json!({"id": external_id}),
    })
    .await
    .unwrap()
}

fn finalize_req(tenant_id: TenantId, external_id: &str, status: &str) -> FinalizeRequest {
    FinalizeRequest {
        tenant_id,
        provider: Provider::MercadoPago,
        external_payment_id: external_id.to_string(),
        normalized_status: status.to_string(),
        paid_at: None,
        raw_payload: json!({"id": external_id, "status": status}),
    }
}

#[tokio::test]
async fn connect_gateway_keeps_single_active() {
    let repo = repo().await;
    let tenant = TenantId::new();

    let first = repo
        .connect_gateway(new_gateway(tenant, Provider::Stripe))
        .await
        .unwrap();
    assert!(first.is_active);

    let second = repo
        .connect_gateway(new_gateway(tenant, Provider::MercadoPago))
        .await
        .unwrap();
    assert!(second.is_active);

    let all = repo.list_gateways(tenant).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().filter(|g| g.is_active).count(), 1);

    let active = repo.get_active_gateway(tenant, None).await.unwrap().unwrap();
    assert_eq!(active.provider, Provider::MercadoPago);
}

#[tokio::test]
async fn concurrent_connects_keep_single_active() {
    let repo = repo().await;
    let tenant = TenantId::new();

    // Each connect deactivates-then-upserts in its own transaction; racing
    // them must still leave exactly one active gateway.
    let (a, b, c) = tokio::join!(
        repo.connect_gateway(new_gateway(tenant, Provider::Stripe)),
        repo.connect_gateway(new_gateway(tenant, Provider::MercadoPago)),
        repo.connect_gateway(new_gateway(tenant, Provider::PagBank)),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let all = repo.list_gateways(tenant).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().filter(|g| g.is_active).count(), 1);
}

#[tokio::test]
async fn connect_gateway_upserts_by_provider() {
    let repo = repo().await;
    let tenant = TenantId::new();

    let first = repo
        .connect_gateway(new_gateway(tenant, Provider::Stripe))
        .await
        .unwrap();

    let mut replacement = new_gateway(tenant, Provider::Stripe);
    replacement.display_name = "Stripe (rotated)".to_string();
    let second = repo.connect_gateway(replacement).await.unwrap();

    // Re-connecting the same provider replaces credentials in place.
    assert_eq!(first.id, second.id);
    assert_eq!(second.display_name, "Stripe (rotated)");
    assert_eq!(repo.list_gateways(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn activate_gateway_switches_and_rejects_unknown() {
    let repo = repo().await;
    let tenant = TenantId::new();

    let stripe = repo
        .connect_gateway(new_gateway(tenant, Provider::Stripe))
        .await
        .unwrap();
    repo.connect_gateway(new_gateway(tenant, Provider::PagBank))
        .await
        .unwrap();

    repo.activate_gateway(tenant, stripe.id).await.unwrap();
    let active = repo.get_active_gateway(tenant, None).await.unwrap().unwrap();
    assert_eq!(active.id, stripe.id);

    let err = repo
        .activate_gateway(tenant, settle_types::GatewayId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
async fn gateway_is_scoped_to_tenant() {
    let repo = repo().await;
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();

    let gw = repo
        .connect_gateway(new_gateway(tenant_a, Provider::Stripe))
        .await
        .unwrap();

    assert!(repo.get_active_gateway(tenant_b, None).await.unwrap().is_none());
    assert!(!repo.delete_gateway(tenant_b, gw.id).await.unwrap());
    assert!(repo.delete_gateway(tenant_a, gw.id).await.unwrap());
}

#[tokio::test]
async fn natural_key_is_unique_per_tenant_and_provider() {
    let repo = repo().await;
    let tenant = TenantId::new();

    let first = seed_transaction(&repo, tenant, "mp-111", 4990).await;

    let duplicate = NewTransaction {
        tenant_id: tenant,
        order_id: first.order_id,
        gateway_id: first.gateway_id,
        provider: Provider::MercadoPago,
        payment_method: PaymentMethod::Pix,
        external_payment_id: Some("mp-111".to_string()),
        status: "pending".to_string(),
        amount: Money::new(4990, Currency::BRL).unwrap(),
        qr_code_text: None,
        qr_code_image_url: None,
        payment_link_url: None,
        raw_provider_response: json!({}),
    };
    let err = repo.insert_transaction(duplicate).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}

#[tokio::test]
async fn finalize_unknown_transaction_is_absorbed() {
    let repo = repo().await;
    let tenant = TenantId::new();
    seed_transaction(&repo, tenant, "mp-known", 4990).await;

    let outcome = repo
        .finalize(finalize_req(tenant, "mp-does-not-exist", "paid"))
        .await
        .unwrap();

    assert!(!outcome.processed);
    assert!(outcome.order_status.is_none());
    // No side effects: the known order is untouched.
    let tx = repo
        .find_transaction(tenant, Provider::MercadoPago, "mp-known")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, "pending");
}

#[tokio::test]
async fn finalize_paid_cascades_order_charge_and_revenue() {
    let repo = repo().await;
    let tenant = TenantId::new();
    let tx = seed_transaction(&repo, tenant, "mp-222", 4990).await;

    let outcome = repo
        .finalize(finalize_req(tenant, "mp-222", "approved"))
        .await
        .unwrap();
    assert!(outcome.processed);
    assert_eq!(outcome.order_status, Some(OrderStatus::Paid));

    let order = repo.get_order(tenant, tx.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let updated = repo
        .find_transaction(tenant, Provider::MercadoPago, "mp-222")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "approved");

    let month = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(repo.monthly_revenue(tenant, &month).await.unwrap(), 4990);

    let audit = repo.list_audit_entries(tenant).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "payment.settled");
}

#[tokio::test]
async fn finalize_is_idempotent_on_redelivery() {
    let repo = repo().await;
    let tenant = TenantId::new();
    seed_transaction(&repo, tenant, "mp-333", 2500).await;

    repo.finalize(finalize_req(tenant, "mp-333", "paid"))
        .await
        .unwrap();
    let second = repo
        .finalize(finalize_req(tenant, "mp-333", "paid"))
        .await
        .unwrap();

    assert!(second.processed);
    assert_eq!(second.order_status, Some(OrderStatus::Paid));

    // Revenue stays a recompute, not an increment, and the audit trail
    // records a single settlement.
    let month = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(repo.monthly_revenue(tenant, &month).await.unwrap(), 2500);
    assert_eq!(repo.list_audit_entries(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn paid_order_never_regresses() {
    let repo = repo().await;
    let tenant = TenantId::new();
    let tx = seed_transaction(&repo, tenant, "mp-444", 1000).await;

    repo.finalize(finalize_req(tenant, "mp-444", "paid"))
        .await
        .unwrap();
    let outcome = repo
        .finalize(finalize_req(tenant, "mp-444", "failed"))
        .await
        .unwrap();

    assert_eq!(outcome.order_status, Some(OrderStatus::Paid));
    let order = repo.get_order(tenant, tx.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    // The ledger row still reflects the latest payload.
    let updated = repo
        .find_transaction(tenant, Provider::MercadoPago, "mp-444")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "failed");
}

#[tokio::test]
async fn finalize_failed_cascades_without_revenue() {
    let repo = repo().await;
    let tenant = TenantId::new();
    let tx = seed_transaction(&repo, tenant, "mp-555", 7500).await;

    let outcome = repo
        .finalize(finalize_req(tenant, "mp-555", "rejected"))
        .await
        .unwrap();
    assert_eq!(outcome.order_status, Some(OrderStatus::Failed));

    let order = repo.get_order(tenant, tx.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);

    let month = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(repo.monthly_revenue(tenant, &month).await.unwrap(), 0);

    let audit = repo.list_audit_entries(tenant).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "payment.failed");
}

#[tokio::test]
async fn finalize_other_status_updates_raw_only() {
    let repo = repo().await;
    let tenant = TenantId::new();
    let tx = seed_transaction(&repo, tenant, "mp-666", 3000).await;

    let outcome = repo
        .finalize(finalize_req(tenant, "mp-666", "in_process"))
        .await
        .unwrap();
    assert!(outcome.processed);
    assert_eq!(outcome.order_status, Some(OrderStatus::PendingPix));

    let order = repo.get_order(tenant, tx.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::PendingPix);

    let updated = repo
        .find_transaction(tenant, Provider::MercadoPago, "mp-666")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "in_process");
}

#[tokio::test]
async fn monthly_revenue_sums_across_orders() {
    let repo = repo().await;
    let tenant = TenantId::new();
    seed_transaction(&repo, tenant, "mp-777", 4990).await;
    seed_transaction(&repo, tenant, "mp-888", 10010).await;

    repo.finalize(finalize_req(tenant, "mp-777", "paid"))
        .await
        .unwrap();
    repo.finalize(finalize_req(tenant, "mp-888", "paid"))
        .await
        .unwrap();

    let month = chrono::Utc::now().format("%Y-%m").to_string();
    assert_eq!(repo.monthly_revenue(tenant, &month).await.unwrap(), 15000);
}
