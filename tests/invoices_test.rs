//! Invoice issuing and webhook reconciliation against a migrated in-memory
//! database.
//!
//! Run with: `cargo test --test invoices_test`
mod common;

use std::sync::Arc;

use freelance_backend::config::StripeConfig;
use freelance_backend::db::invoices as invoice_db;
use freelance_backend::db::transactions as transaction_db;
use freelance_backend::error::AppError;
use freelance_backend::models::PaginationQuery;
use freelance_backend::models::invoices::{
    CreateInvoice, InvoiceItemInput, InvoiceStatus, UpdateInvoice,
};
use freelance_backend::models::users::{self, Roles};
use freelance_backend::payments::webhook::sign_payload;
use freelance_backend::realtime::EventHub;
use freelance_backend::services::reconciliation::{self, ReconcileOutcome, WebhookContext};
use freelance_backend::services::{invoices as invoice_service, notifications, payments};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use common::{
    FailingMailer, FakeGateway, FakeMailer, active_contract, create_user, gateway_handle, setup_db,
    started_hub,
};

const WEBHOOK_SECRET: &str = "whsec_test";

fn stripe_config() -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        api_base: "http://localhost".to_string(),
        currency: "usd".to_string(),
        webhook_tolerance_secs: 300,
    }
}

fn item(description: &str, quantity: i32, unit_price: f64) -> InvoiceItemInput {
    InvoiceItemInput {
        description: description.to_string(),
        quantity,
        unit_price,
    }
}

async fn issue_invoice(
    db: &DatabaseConnection,
    hub: &EventHub,
    freelancer: &users::Model,
    contract_id: Uuid,
) -> Uuid {
    invoice_service::create_invoice(
        db,
        hub,
        freelancer,
        CreateInvoice {
            contract_id,
            milestone_id: None,
            items: vec![item("Design", 2, 25.0), item("Build", 1, 50.0)],
            due_date: None,
        },
    )
    .await
    .expect("Failed to create invoice")
    .invoice
    .id
}

fn succeeded_payload(intent_id: &str, invoice_id: Uuid, payer: Uuid, amount: i64) -> Vec<u8> {
    serde_json::json!({
        "id": format!("evt_{intent_id}"),
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": intent_id,
                "amount": amount,
                "amount_received": amount,
                "currency": "usd",
                "status": "succeeded",
                "metadata": {
                    "invoiceId": invoice_id.to_string(),
                    "userId": payer.to_string()
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

async fn deliver(
    ctx: &WebhookContext<'_>,
    payload: &[u8],
) -> Result<ReconcileOutcome, AppError> {
    let now = chrono::Utc::now().timestamp();
    let header = sign_payload(payload, WEBHOOK_SECRET, now);
    reconciliation::handle_webhook(ctx, &stripe_config(), payload, Some(&header), now).await
}

#[tokio::test]
async fn test_invoice_total_is_fixed_at_creation() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let created = invoice_service::create_invoice(
        &db,
        &hub,
        &freelancer,
        CreateInvoice {
            contract_id: contract.id,
            milestone_id: None,
            items: vec![item("Design", 2, 25.0), item("Build", 1, 50.0)],
            due_date: None,
        },
    )
    .await
    .expect("Freelancer can invoice");
    assert_eq!(created.invoice.total, 100.0);
    assert_eq!(created.invoice.status, InvoiceStatus::Unpaid);
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.items[0].description, "Design");

    let updated = invoice_service::update_invoice(
        &db,
        &freelancer,
        created.invoice.id,
        UpdateInvoice {
            items: Some(vec![item("Everything", 10, 100.0)]),
            due_date: None,
        },
    )
    .await
    .expect("Issuer can edit an unpaid invoice");
    assert_eq!(updated.invoice.total, 100.0);
    assert_eq!(updated.items.len(), 1);

    // The contract client was notified about the new invoice.
    let inbox = notifications::list(&db, client.id, &PaginationQuery::default())
        .await
        .expect("Listing notifications works");
    let link = format!("/invoices/{}", created.invoice.id);
    assert!(inbox.iter().any(|n| n.link.as_deref() == Some(link.as_str())));
}

#[tokio::test]
async fn test_invoice_rules_for_issuer_and_items() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;

    let err = invoice_service::create_invoice(
        &db,
        &hub,
        &client,
        CreateInvoice {
            contract_id: contract.id,
            milestone_id: None,
            items: vec![item("Design", 1, 10.0)],
            due_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = invoice_service::create_invoice(
        &db,
        &hub,
        &freelancer,
        CreateInvoice {
            contract_id: contract.id,
            milestone_id: None,
            items: vec![],
            due_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    let err = invoice_service::create_invoice(
        &db,
        &hub,
        &freelancer,
        CreateInvoice {
            contract_id: contract.id,
            milestone_id: Some(Uuid::new_v4()),
            items: vec![item("Design", 1, 10.0)],
            due_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_payment_intent_uses_minor_units_and_leaves_invoice_alone() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let invoice_id = issue_invoice(&db, &hub, &freelancer, contract.id).await;

    let gateway = Arc::new(FakeGateway::default());
    let response = invoice_service::create_payment_intent(
        &db,
        &gateway_handle(&gateway),
        "usd",
        &client,
        invoice_id,
    )
    .await
    .expect("Client can start a payment");
    assert_eq!(response.invoice_id, invoice_id);
    assert_eq!(response.payment_intent_id, "pi_test_1");

    {
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount_minor, 10_000);
        assert_eq!(requests[0].invoice_id, invoice_id);
        assert_eq!(requests[0].user_id, client.id);
    }

    let invoice = invoice_service::get_invoice(&db, &client, invoice_id)
        .await
        .expect("Client can read the invoice");
    assert_eq!(invoice.invoice.status, InvoiceStatus::Unpaid);
}

#[tokio::test]
async fn test_succeeded_webhook_settles_invoice_exactly_once() {
    let db = setup_db().await;
    let hub = started_hub();
    let mailer = FakeMailer::default();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let invoice_id = issue_invoice(&db, &hub, &freelancer, contract.id).await;

    let ctx = WebhookContext {
        db: &db,
        hub: &hub,
        mailer: &mailer,
        public_base_url: "http://localhost:8080",
    };
    let payload = succeeded_payload("pi_abc", invoice_id, client.id, 9999);

    let outcome = deliver(&ctx, &payload).await.expect("Signed delivery is accepted");
    assert_eq!(
        outcome,
        ReconcileOutcome::Paid {
            invoice_id,
            transaction_recorded: true,
        }
    );

    let invoice = invoice_service::get_invoice(&db, &client, invoice_id)
        .await
        .expect("Invoice is readable");
    assert_eq!(invoice.invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.invoice.paid_by, Some(client.id));
    assert!(invoice.invoice.paid_at.is_some());
    assert_eq!(invoice.invoice.total, 99.99);

    let history = payments::my_payments(&db, &client).await.expect("Payments list");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 99.99);
    assert_eq!(history[0].stripe_payment_intent_id, "pi_abc");
    assert_eq!(mailer.sent_count(), 1);

    // Redelivery changes nothing.
    let outcome = deliver(&ctx, &payload).await.expect("Redelivery is accepted");
    assert_eq!(outcome, ReconcileOutcome::AlreadyPaid(invoice_id));
    let recorded = transaction_db::count_for_invoice(&db, invoice_id)
        .await
        .expect("Transaction count");
    assert_eq!(recorded, 1);
    assert_eq!(mailer.sent_count(), 1);

    // Paid invoices are locked.
    let err = invoice_service::delete_invoice(&db, &freelancer, invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let err = invoice_service::mark_paid(&db, &client, invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let gateway = Arc::new(FakeGateway::default());
    let err = invoice_service::create_payment_intent(
        &db,
        &gateway_handle(&gateway),
        "usd",
        &client,
        invoice_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)), "got {err:?}");
}

#[tokio::test]
async fn test_webhook_edge_outcomes() {
    let db = setup_db().await;
    let hub = started_hub();
    let mailer = FakeMailer::default();
    let ctx = WebhookContext {
        db: &db,
        hub: &hub,
        mailer: &mailer,
        public_base_url: "http://localhost:8080",
    };
    let stranger = create_user(&db, "Sam", Roles::Client).await;

    let unknown = Uuid::new_v4();
    let outcome = deliver(&ctx, &succeeded_payload("pi_x", unknown, stranger.id, 100))
        .await
        .expect("Accepted");
    assert_eq!(outcome, ReconcileOutcome::InvoiceNotFound(unknown));

    let no_metadata = serde_json::json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_y", "amount": 100, "amount_received": 100, "currency": "usd" } }
    })
    .to_string();
    let outcome = deliver(&ctx, no_metadata.as_bytes()).await.expect("Accepted");
    assert_eq!(outcome, ReconcileOutcome::MissingInvoiceId);

    let other = serde_json::json!({
        "id": "evt_2",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();
    let outcome = deliver(&ctx, other.as_bytes()).await.expect("Accepted");
    assert_eq!(outcome, ReconcileOutcome::Ignored("customer.created".to_string()));

    // Signed but unreadable payloads are acknowledged, not bounced.
    let numeric_invoice_id = serde_json::json!({
        "id": "evt_3",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_n", "amount": 100, "metadata": { "invoiceId": 123 } } }
    })
    .to_string();
    let outcome = deliver(&ctx, numeric_invoice_id.as_bytes())
        .await
        .expect("Accepted");
    assert!(matches!(outcome, ReconcileOutcome::Failed(_)), "got {outcome:?}");

    let outcome = deliver(&ctx, b"not json").await.expect("Accepted");
    assert!(matches!(outcome, ReconcileOutcome::Failed(_)), "got {outcome:?}");

    // Wrong secret never reaches the handler logic.
    let payload = succeeded_payload("pi_z", unknown, stranger.id, 100);
    let now = chrono::Utc::now().timestamp();
    let forged = sign_payload(&payload, "whsec_other", now);
    let err = reconciliation::handle_webhook(&ctx, &stripe_config(), &payload, Some(&forged), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Signature(_)), "got {err:?}");

    let err = reconciliation::handle_webhook(&ctx, &stripe_config(), &payload, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Signature(_)), "got {err:?}");
}

#[tokio::test]
async fn test_manual_mark_paid_and_unpaid_delete() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let outsider = create_user(&db, "Olga", Roles::Client).await;

    let first = issue_invoice(&db, &hub, &freelancer, contract.id).await;
    let err = invoice_service::mark_paid(&db, &outsider, first)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");

    let paid = invoice_service::mark_paid(&db, &client, first)
        .await
        .expect("Client can mark paid");
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(
        payments::my_payments(&db, &client)
            .await
            .expect("Payments list")
            .is_empty()
    );

    let second = issue_invoice(&db, &hub, &freelancer, contract.id).await;
    let err = invoice_service::delete_invoice(&db, &client, second)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");
    invoice_service::delete_invoice(&db, &freelancer, second)
        .await
        .expect("Issuer can delete an unpaid invoice");
}

#[tokio::test]
async fn test_delete_loses_to_a_concurrent_settlement() {
    let db = setup_db().await;
    let hub = started_hub();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let invoice_id = issue_invoice(&db, &hub, &freelancer, contract.id).await;

    // The webhook commits after the delete request has read the invoice as unpaid.
    let settled = invoice_db::mark_paid_if_unpaid(&db, invoice_id, Some(client.id), None)
        .await
        .expect("Settlement update");
    assert_eq!(settled, 1);

    let deleted = invoice_db::delete_unpaid_invoice(&db, invoice_id)
        .await
        .expect("Conditional delete");
    assert_eq!(deleted, 0);

    let invoice = invoice_db::get_invoice_by_id(&db, invoice_id)
        .await
        .expect("Invoice lookup")
        .expect("Paid invoice survives");
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    let items = invoice_db::get_items(&db, invoice_id).await.expect("Items lookup");
    assert_eq!(items.len(), 2);

    let err = invoice_service::delete_invoice(&db, &freelancer, invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)), "got {err:?}");
}

#[tokio::test]
async fn test_receipt_failure_keeps_invoice_paid() {
    let db = setup_db().await;
    let hub = started_hub();
    let mailer = FailingMailer::default();
    let (client, freelancer, contract) = active_contract(&db, &hub).await;
    let invoice_id = issue_invoice(&db, &hub, &freelancer, contract.id).await;

    let ctx = WebhookContext {
        db: &db,
        hub: &hub,
        mailer: &mailer,
        public_base_url: "http://localhost:8080",
    };
    let payload = succeeded_payload("pi_mailfail", invoice_id, client.id, 10000);

    let outcome = deliver(&ctx, &payload).await.expect("Signed delivery is accepted");
    assert_eq!(
        outcome,
        ReconcileOutcome::Paid {
            invoice_id,
            transaction_recorded: true,
        }
    );
    assert_eq!(*mailer.attempts.lock().expect("mailer lock poisoned"), 1);

    let invoice = invoice_service::get_invoice(&db, &client, invoice_id)
        .await
        .expect("Invoice is readable");
    assert_eq!(invoice.invoice.status, InvoiceStatus::Paid);
    let recorded = transaction_db::count_for_invoice(&db, invoice_id)
        .await
        .expect("Transaction count");
    assert_eq!(recorded, 1);
}
