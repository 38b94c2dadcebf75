//! Payment-processor webhook handling: verify, settle the invoice exactly
//! once, then send the receipt.

use sea_orm::{DatabaseConnection, DbErr, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::db::invoices as invoice_db;
use crate::db::transactions as transaction_db;
use crate::db::users as user_db;
use crate::error::AppError;
use crate::mail::{Mailer, ReceiptEmail};
use crate::models::invoices::InvoiceStatus;
use crate::models::notifications::NewNotification;
use crate::models::transactions::NewTransaction;
use crate::payments::from_minor_units;
use crate::payments::webhook::{PaymentEvent, PaymentIntentObject, WebhookEvent, verify_signature};
use crate::realtime::EventHub;
use crate::receipts;
use crate::services::notifications::notify;

/// Everything reconciliation touches besides the event itself.
pub struct WebhookContext<'a> {
    pub db: &'a DatabaseConnection,
    pub hub: &'a EventHub,
    pub mailer: &'a dyn Mailer,
    pub public_base_url: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Invoice moved to paid by this delivery.
    Paid {
        invoice_id: Uuid,
        transaction_recorded: bool,
    },
    /// Repeated delivery; nothing changed.
    AlreadyPaid(Uuid),
    MissingInvoiceId,
    InvoiceNotFound(Uuid),
    /// Recognised event type that only gets logged.
    Logged(String),
    /// Event type this service does not handle.
    Ignored(String),
    /// Processing failed after the payload was trusted; the event is still
    /// acknowledged.
    Failed(String),
}

/// Verify and process one webhook delivery.
///
/// Only an untrusted payload is an error. Any fault after the signature
/// checks out, an unreadable body included, is logged and reported as
/// [`ReconcileOutcome::Failed`] so the delivery is still acknowledged.
pub async fn handle_webhook(
    ctx: &WebhookContext<'_>,
    stripe: &StripeConfig,
    payload: &[u8],
    signature_header: Option<&str>,
    now: i64,
) -> Result<ReconcileOutcome, AppError> {
    let header = signature_header
        .ok_or_else(|| AppError::Signature("missing Stripe-Signature header".to_string()))?;

    verify_signature(
        payload,
        header,
        &stripe.webhook_secret,
        stripe.webhook_tolerance_secs,
        now,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "rejected webhook with bad signature");
        AppError::Signature(e.to_string())
    })?;

    let event = match WebhookEvent::parse(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "signed webhook payload is not a valid event");
            return Ok(ReconcileOutcome::Failed(format!("Malformed webhook payload: {e}")));
        }
    };
    let event_id = event.id.clone();
    let payment_event = match event.into_payment_event() {
        Ok(payment_event) => payment_event,
        Err(e) => {
            tracing::error!(event_id = %event_id, error = %e, "signed webhook carries a malformed payment intent");
            return Ok(ReconcileOutcome::Failed(format!("Malformed payment intent: {e}")));
        }
    };

    let outcome = match reconcile_payment_event(ctx, payment_event).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(event_id = %event_id, error = %e, "webhook processing failed");
            ReconcileOutcome::Failed(e.to_string())
        }
    };

    tracing::info!(event_id = %event_id, ?outcome, "webhook processed");
    Ok(outcome)
}

/// Apply a trusted payment event.
pub async fn reconcile_payment_event(
    ctx: &WebhookContext<'_>,
    event: PaymentEvent,
) -> Result<ReconcileOutcome, AppError> {
    match event {
        PaymentEvent::Succeeded(intent) => {
            let outcome = settle_invoice(ctx.db, &intent).await?;
            if let ReconcileOutcome::Paid { invoice_id, .. } = outcome {
                send_receipt(ctx, invoice_id, &intent.id).await;
            }
            Ok(outcome)
        }
        PaymentEvent::Failed(intent) => {
            tracing::warn!(
                payment_intent = %intent.id,
                invoice_id = ?intent.invoice_id(),
                "payment failed"
            );
            Ok(ReconcileOutcome::Logged("payment_intent.payment_failed".to_string()))
        }
        PaymentEvent::Created(intent) => {
            tracing::info!(payment_intent = %intent.id, "payment intent created");
            Ok(ReconcileOutcome::Logged("payment_intent.created".to_string()))
        }
        PaymentEvent::Other(event_type) => {
            tracing::debug!(event_type = %event_type, "unhandled webhook event");
            Ok(ReconcileOutcome::Ignored(event_type))
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Mark the invoice paid and record the transaction in one database
/// transaction. Safe to run for the same intent any number of times.
async fn settle_invoice(
    db: &DatabaseConnection,
    intent: &PaymentIntentObject,
) -> Result<ReconcileOutcome, AppError> {
    let Some(invoice_id) = intent.invoice_id() else {
        tracing::warn!(payment_intent = %intent.id, "payment succeeded without invoiceId metadata");
        return Ok(ReconcileOutcome::MissingInvoiceId);
    };

    let txn = db.begin().await?;

    let Some(invoice) = invoice_db::get_invoice_by_id(&txn, invoice_id).await? else {
        tracing::warn!(invoice_id = %invoice_id, "payment succeeded for unknown invoice");
        return Ok(ReconcileOutcome::InvoiceNotFound(invoice_id));
    };
    if invoice.status == InvoiceStatus::Paid {
        return Ok(ReconcileOutcome::AlreadyPaid(invoice_id));
    }

    // Only record a payer that actually exists.
    let payer = match intent.user_id() {
        Some(id) => user_db::get_user_by_id(&txn, id).await?.map(|u| u.id),
        None => None,
    };
    let received = from_minor_units(intent.amount_received);

    let changed = invoice_db::mark_paid_if_unpaid(&txn, invoice_id, payer, Some(received)).await?;
    if changed == 0 {
        return Ok(ReconcileOutcome::AlreadyPaid(invoice_id));
    }

    let mut transaction_recorded = false;
    if transaction_db::find_by_payment_intent(&txn, &intent.id)
        .await?
        .is_none()
    {
        let inserted = transaction_db::insert_transaction(
            &txn,
            NewTransaction {
                stripe_payment_intent_id: intent.id.clone(),
                user_id: payer,
                invoice_id: Some(invoice_id),
                amount: received,
                currency: intent.currency.clone(),
                status: intent.status.clone().unwrap_or_else(|| "succeeded".to_string()),
            },
        )
        .await;

        match inserted {
            Ok(_) => transaction_recorded = true,
            Err(e) if is_unique_violation(&e) => {
                // A concurrent delivery won the race and owns the whole write.
                txn.rollback().await?;
                return Ok(ReconcileOutcome::AlreadyPaid(invoice_id));
            }
            Err(e) => return Err(e.into()),
        }
    }

    txn.commit().await?;

    tracing::info!(
        invoice_id = %invoice_id,
        payment_intent = %intent.id,
        amount = received,
        "invoice paid"
    );

    Ok(ReconcileOutcome::Paid {
        invoice_id,
        transaction_recorded,
    })
}

/// Render the receipt, email it to the issuer and push a notification.
/// Every failure here is logged and swallowed.
async fn send_receipt(ctx: &WebhookContext<'_>, invoice_id: Uuid, payment_intent_id: &str) {
    let (invoice, items) = match load_for_receipt(ctx.db, invoice_id).await {
        Ok(Some(found)) => found,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(invoice_id = %invoice_id, error = %e, "could not load paid invoice for receipt");
            return;
        }
    };

    let issuer = match user_db::get_user_by_id(ctx.db, invoice.issued_by).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(invoice_id = %invoice_id, error = %e, "could not load invoice issuer");
            return;
        }
    };

    let link = format!(
        "{}/invoices/{}",
        ctx.public_base_url.trim_end_matches('/'),
        invoice_id
    );

    match receipts::render_receipt_pdf(&invoice, &items, payment_intent_id) {
        Ok(pdf) => {
            let email = ReceiptEmail {
                to: issuer.email.clone(),
                subject: format!("Invoice {invoice_id} has been paid"),
                body: format!(
                    "Hi {},\n\nYour invoice for {:.2} has been paid.\nView it at {link}\n\nThe receipt is attached.",
                    issuer.name, invoice.total
                ),
                filename: format!("receipt-{invoice_id}.pdf"),
                pdf,
            };
            if let Err(e) = ctx.mailer.send_receipt(email).await {
                tracing::warn!(invoice_id = %invoice_id, error = %e, "receipt email failed");
            }
        }
        Err(e) => {
            tracing::warn!(invoice_id = %invoice_id, error = %e, "receipt rendering failed");
        }
    }

    notify(
        ctx.db,
        ctx.hub,
        NewNotification::success(
            issuer.id,
            format!("Invoice paid: {:.2} received", invoice.total),
            Some(format!("/invoices/{invoice_id}")),
        ),
    )
    .await;
}

async fn load_for_receipt(
    db: &DatabaseConnection,
    invoice_id: Uuid,
) -> Result<
    Option<(
        crate::models::invoices::Model,
        Vec<crate::models::invoice_items::Model>,
    )>,
    DbErr,
> {
    let Some(invoice) = invoice_db::get_invoice_by_id(db, invoice_id).await? else {
        return Ok(None);
    };
    let items = invoice_db::get_items(db, invoice_id).await?;
    Ok(Some((invoice, items)))
}
