//! PaymentService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use settle_types::{
        AppError, AuditLogEntry, CardLink, ChargeContext, ConnectGatewayRequest,
        CreateCardLinkRequest, CreateOrderRequest, CreatePixPaymentRequest, Currency, Environment,
        FinalizeRequest, Gateway, GatewayId, NewGateway, NewOrder, NewTransaction, Order, OrderId,
        OrderStatus, PaymentLookup, PaymentMethod, PaymentProvider, PaymentTransaction, PixCharge,
        Provider, ProviderCredentials, ProviderError, ProviderFactory, ProviderIdentity,
        RepoError, SettlementOutcome, SettlementRepository, TenantId, TransactionId,
    };
    use settle_vault::SecretVault;

    use crate::PaymentService;

    /// Shared event log to assert call ordering across the provider
    /// double and the repository double.
    type EventLog = Arc<Mutex<Vec<&'static str>>>;

    /// Simple in-memory repository for testing the service layer.
    pub struct MockRepo {
        gateways: Mutex<Vec<Gateway>>,
        orders: Mutex<HashMap<OrderId, Order>>,
        transactions: Mutex<Vec<PaymentTransaction>>,
        pub finalized: Mutex<Vec<FinalizeRequest>>,
        events: EventLog,
    }

    impl MockRepo {
        pub fn new(events: EventLog) -> Self {
            Self {
                gateways: Mutex::new(Vec::new()),
                orders: Mutex::new(HashMap::new()),
                transactions: Mutex::new(Vec::new()),
                finalized: Mutex::new(Vec::new()),
                events,
            }
        }
    }

    #[async_trait]
    impl SettlementRepository for MockRepo {
        async fn connect_gateway(&self, gw: NewGateway) -> Result<Gateway, RepoError> {
            let mut gateways = self.gateways.lock().unwrap();
            gateways.retain(|g| !(g.tenant_id == gw.tenant_id && g.provider == gw.provider));
            for g in gateways.iter_mut() {
                if g.tenant_id == gw.tenant_id {
                    g.is_active = false;
                }
            }
            let gateway = Gateway {
                id: GatewayId::new(),
                tenant_id: gw.tenant_id,
                provider: gw.provider,
                display_name: gw.display_name,
                public_key: gw.public_key,
                encrypted_secret_key: gw.encrypted_secret_key,
                encrypted_webhook_secret: gw.encrypted_webhook_secret,
                environment: gw.environment,
                is_active: true,
                settings: gw.settings,
                created_at: chrono::Utc::now(),
            };
            gateways.push(gateway.clone());
            Ok(gateway)
        }

        async fn get_active_gateway(
            &self,
            tenant_id: TenantId,
            provider: Option<Provider>,
        ) -> Result<Option<Gateway>, RepoError> {
            Ok(self
                .gateways
                .lock()
                .unwrap()
                .iter()
                .find(|g| {
                    g.tenant_id == tenant_id
                        && g.is_active
                        && provider.is_none_or(|p| g.provider == p)
                })
                .cloned())
        }

        async fn list_gateways(&self, tenant_id: TenantId) -> Result<Vec<Gateway>, RepoError> {
            Ok(self
                .gateways
                .lock()
                .unwrap()
                .iter()
                .filter(|g| g.tenant_id == tenant_id)
                .cloned()
                .collect())
        }

        async fn activate_gateway(
            &self,
            tenant_id: TenantId,
            id: GatewayId,
        ) -> Result<(), RepoError> {
            let mut gateways = self.gateways.lock().unwrap();
            if !gateways.iter().any(|g| g.tenant_id == tenant_id && g.id == id) {
                return Err(RepoError::NotFound);
            }
            for g in gateways.iter_mut().filter(|g| g.tenant_id == tenant_id) {
                g.is_active = g.id == id;
            }
            Ok(())
        }

        async fn delete_gateway(
            &self,
            tenant_id: TenantId,
            id: GatewayId,
        ) -> Result<bool, RepoError> {
            let mut gateways = self.gateways.lock().unwrap();
            let before = gateways.len();
            gateways.retain(|g| !(g.tenant_id == tenant_id && g.id == id));
            Ok(gateways.len() < before)
        }

        async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError> {
            let created = Order {
                id: OrderId::new(),
                tenant_id: order.tenant_id,
                total: order.total,
                status: order.status,
                customer_name: order.customer_name,
                created_at: chrono::Utc::now(),
            };
            self.orders
                .lock()
                .unwrap()
                .insert(created.id, created.clone());
            Ok(created)
        }

        async fn get_order(
            &self,
            tenant_id: TenantId,
            id: OrderId,
        ) -> Result<Option<Order>, RepoError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .get(&id)
                .filter(|o| o.tenant_id == tenant_id)
                .cloned())
        }

        async fn insert_transaction(
            &self,
            tx: NewTransaction,
        ) -> Result<PaymentTransaction, RepoError> {
            let created = PaymentTransaction {
                id: TransactionId::new(),
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
                created_at: chrono::Utc::now(),
            };
            self.transactions.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn get_transaction(
            &self,
            tenant_id: TenantId,
            id: TransactionId,
        ) -> Result<Option<PaymentTransaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.tenant_id == tenant_id && t.id == id)
                .cloned())
        }

        async fn find_transaction(
            &self,
            tenant_id: TenantId,
            provider: Provider,
            external_payment_id: &str,
        ) -> Result<Option<PaymentTransaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| {
                    t.tenant_id == tenant_id
                        && t.provider == provider
                        && t.external_payment_id.as_deref() == Some(external_payment_id)
                })
                .cloned())
        }

        async fn finalize(&self, req: FinalizeRequest) -> Result<SettlementOutcome, RepoError> {
            self.events.lock().unwrap().push("finalize");
            let known = self
                .find_transaction(req.tenant_id, req.provider, &req.external_payment_id)
                .await?
                .is_some();
            self.finalized.lock().unwrap().push(req);
            if known {
                Ok(SettlementOutcome {
                    processed: true,
                    order_status: Some(OrderStatus::Paid),
                })
            } else {
                Ok(SettlementOutcome::ignored())
            }
        }

        async fn monthly_revenue(&self, _: TenantId, _: &str) -> Result<i64, RepoError> {
            Ok(0)
        }

        async fn list_audit_entries(&self, _: TenantId) -> Result<Vec<AuditLogEntry>, RepoError> {
            Ok(Vec::new())
        }
    }

    /// Deterministic provider double.
    pub struct MockProvider {
        pub reject_credentials: bool,
        events: EventLog,
    }

    #[async_trait]
    impl PaymentProvider for MockProvider {
        async fn validate_credentials(&self) -> Result<ProviderIdentity, ProviderError> {
            if self.reject_credentials {
                return Err(ProviderError::Credentials("key rejected".into()));
            }
            Ok(ProviderIdentity {
                account_id: "acct_test".into(),
                account_name: Some("Loja Teste".into()),
            })
        }

        async fn create_pix_payment(
            &self,
            ctx: &ChargeContext,
        ) -> Result<PixCharge, ProviderError> {
            Ok(PixCharge {
                external_id: format!("ext-{}", ctx.order_id),
                status: "pending".into(),
                qr_code_text: Some("00020126580014br.gov.bcb.pix".into()),
                qr_code_image_url: None,
                raw: json!({"id": format!("ext-{}", ctx.order_id)}),
            })
        }

        async fn create_card_payment_link(
            &self,
            ctx: &ChargeContext,
        ) -> Result<CardLink, ProviderError> {
            Ok(CardLink {
                external_id: format!("ext-{}", ctx.order_id),
                status: "pending".into(),
                payment_url: Some("https://pay.example/checkout/ext".into()),
                raw: json!({}),
            })
        }

        async fn lookup_payment(&self, external_id: &str) -> Result<PaymentLookup, ProviderError> {
            self.events.lock().unwrap().push("lookup");
            Ok(PaymentLookup {
                status: "approved".into(),
                paid_at: None,
                raw: json!({"id": external_id, "status": "approved"}),
            })
        }
    }

    pub struct MockFactory {
        provider: Arc<MockProvider>,
    }

    impl ProviderFactory for MockFactory {
        fn connect(&self, _: Provider, _: ProviderCredentials) -> Arc<dyn PaymentProvider> {
            self.provider.clone()
        }
    }

    fn service(reject_credentials: bool) -> (PaymentService<MockRepo>, EventLog) {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let repo = MockRepo::new(events.clone());
        let factory = MockFactory {
            provider: Arc::new(MockProvider {
                reject_credentials,
                events: events.clone(),
            }),
        };
        let svc = PaymentService::new(repo, SecretVault::new("test-install-secret"), Arc::new(factory));
        (svc, events)
    }

    fn connect_request(provider: Provider) -> ConnectGatewayRequest {
        ConnectGatewayRequest {
            provider,
            display_name: "Gateway de teste".into(),
            secret_key: "sk_test_abcdef123456".into(),
            public_key: None,
            webhook_secret: Some("whsec_test".into()),
            environment: Environment::Sandbox,
            settings: json!({}),
        }
    }

    async fn seed_paid_path(
        svc: &PaymentService<MockRepo>,
        tenant: TenantId,
        provider: Provider,
    ) -> String {
        svc.connect_gateway(tenant, connect_request(provider))
            .await
            .unwrap();

        let order = svc
            .create_order(
                tenant,
                CreateOrderRequest {
                    total: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    method: Some(PaymentMethod::Pix),
                    with_charge: true,
                },
            )
            .await
            .unwrap();

        let payment = svc
            .create_pix_payment(
                tenant,
                CreatePixPaymentRequest {
                    order_id: order.id,
                    amount: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    customer_email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(payment.status, "pending");

        format!("ext-{}", order.id)
    }

    #[tokio::test]
    async fn test_connect_gateway_masks_secret_and_stores_identity() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();

        let gateway = svc
            .connect_gateway(tenant, connect_request(Provider::Stripe))
            .await
            .unwrap();

        assert!(gateway.is_active);
        assert_eq!(gateway.secret_preview, "sk_***456");
        assert_eq!(gateway.account_name.as_deref(), Some("Loja Teste"));
        // The stored secret is encrypted, never the plaintext.
        let stored = svc.repo().list_gateways(tenant).await.unwrap();
        assert_ne!(stored[0].encrypted_secret_key, "sk_test_abcdef123456");
    }

    #[tokio::test]
    async fn test_rejected_credentials_store_nothing() {
        let (svc, _) = service(true);
        let tenant = TenantId::new();

        let err = svc
            .connect_gateway(tenant, connect_request(Provider::Stripe))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(svc.repo().list_gateways(tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pix_payment_requires_active_gateway() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();

        let order = svc
            .create_order(
                tenant,
                CreateOrderRequest {
                    total: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    method: Some(PaymentMethod::Pix),
                    with_charge: false,
                },
            )
            .await
            .unwrap();

        let err = svc
            .create_pix_payment(
                tenant,
                CreatePixPaymentRequest {
                    order_id: order.id,
                    amount: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    customer_email: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_card_link_rejects_pix_method() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        svc.connect_gateway(tenant, connect_request(Provider::Stripe))
            .await
            .unwrap();

        let order = svc
            .create_order(
                tenant,
                CreateOrderRequest {
                    total: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    method: None,
                    with_charge: false,
                },
            )
            .await
            .unwrap();

        let err = svc
            .create_card_link(
                tenant,
                CreateCardLinkRequest {
                    order_id: order.id,
                    amount: 4990,
                    currency: Currency::BRL,
                    customer_name: "Maria Silva".into(),
                    method: PaymentMethod::Pix,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_mercadopago_lookup_runs_before_any_mutation() {
        let (svc, events) = service(false);
        let tenant = TenantId::new();
        let external_id = seed_paid_path(&svc, tenant, Provider::MercadoPago).await;

        let ack = svc
            .ingest_mercadopago(tenant, json!({"type": "payment", "data": {"id": external_id}}))
            .await
            .unwrap();

        assert_eq!(ack.processed, Some(true));
        let log = events.lock().unwrap();
        let lookup_pos = log.iter().position(|e| *e == "lookup").unwrap();
        let finalize_pos = log.iter().position(|e| *e == "finalize").unwrap();
        assert!(lookup_pos < finalize_pos);

        // The finalize request carries the looked-up status, not anything
        // from the webhook body.
        let finalized = svc.repo().finalized.lock().unwrap();
        assert_eq!(finalized[0].normalized_status, "approved");
    }

    #[tokio::test]
    async fn test_mercadopago_without_payment_id_is_absorbed() {
        let (svc, events) = service(false);
        let tenant = TenantId::new();
        seed_paid_path(&svc, tenant, Provider::MercadoPago).await;

        let ack = svc
            .ingest_mercadopago(tenant, json!({"type": "test"}))
            .await
            .unwrap();

        assert_eq!(ack.ignored, Some(true));
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagbank_status_goes_through_closed_table() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        let external_id = seed_paid_path(&svc, tenant, Provider::PagBank).await;

        svc.ingest_pagbank(
            tenant,
            json!({
                "id": external_id,
                "charges": [{"id": "CHAR_1", "status": "PAID"}]
            }),
        )
        .await
        .unwrap();

        let finalized = svc.repo().finalized.lock().unwrap();
        assert_eq!(finalized[0].normalized_status, "paid");
    }

    #[tokio::test]
    async fn test_pagbank_reads_order_level_status() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        let external_id = seed_paid_path(&svc, tenant, Provider::PagBank).await;

        let ack = svc
            .ingest_pagbank(
                tenant,
                json!({
                    "id": external_id,
                    "order": {"status": "PAID"}
                }),
            )
            .await
            .unwrap();

        assert_eq!(ack.processed, Some(true));
        let finalized = svc.repo().finalized.lock().unwrap();
        assert_eq!(finalized[0].normalized_status, "paid");
    }

    #[tokio::test]
    async fn test_pagbank_top_level_status_wins() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        let external_id = seed_paid_path(&svc, tenant, Provider::PagBank).await;

        svc.ingest_pagbank(
            tenant,
            json!({
                "id": external_id,
                "status": "DECLINED",
                "charges": [{"id": "CHAR_1", "status": "PAID"}]
            }),
        )
        .await
        .unwrap();

        let finalized = svc.repo().finalized.lock().unwrap();
        assert_eq!(finalized[0].normalized_status, "failed");
    }

    #[tokio::test]
    async fn test_stripe_rejects_bad_signature() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        seed_paid_path(&svc, tenant, Provider::Stripe).await;

        let body = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let err = svc
            .ingest_stripe(tenant, Some("t=1712000000,v1=deadbeef"), body)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Signature(_)));
        assert!(svc.repo().finalized.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stripe_sandbox_without_secret_skips_verification() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();

        let mut req = connect_request(Provider::Stripe);
        req.webhook_secret = None;
        svc.connect_gateway(tenant, req).await.unwrap();

        let body = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_unknown"}}}"#;
        let ack = svc.ingest_stripe(tenant, None, body).await.unwrap();

        // Unknown external id: absorbed, not an error.
        assert_eq!(ack.ignored, Some(true));
    }

    #[tokio::test]
    async fn test_stripe_event_type_maps_to_normalized_status() {
        let (svc, _) = service(false);
        let tenant = TenantId::new();
        let external_id = seed_paid_path(&svc, tenant, Provider::Stripe).await;

        let event = json!({
            "type": "payment_intent.payment_failed",
            "created": 1712000000,
            "data": {"object": {"id": external_id, "status": "requires_payment_method"}}
        });
        let body = serde_json::to_vec(&event).unwrap();
        let header = stripe_header(&body);

        svc.ingest_stripe(tenant, Some(&header), &body).await.unwrap();

        let finalized = svc.repo().finalized.lock().unwrap();
        assert_eq!(finalized[0].normalized_status, "failed");
    }

    fn stripe_header(body: &[u8]) -> String {
        let sig = settle_providers::signature::sign_stripe_payload("whsec_test", "1712000000", body);
        format!("t=1712000000,v1={}", sig)
    }
}
