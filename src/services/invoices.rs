use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::authorization::is_admin;
use crate::db::contracts as contract_db;
use crate::db::invoices::{self as invoice_db, NewInvoice};
use crate::db::milestones as milestone_db;
use crate::error::AppError;
use crate::models::contracts;
use crate::models::invoices::{
    self, CreateInvoice, InvoiceItemInput, InvoiceResponse, InvoiceStatus, PaymentIntentResponse,
    UpdateInvoice,
};
use crate::models::notifications::NewNotification;
use crate::models::users;
use crate::payments::{PaymentGateway, PaymentIntentRequest, to_minor_units};
use crate::realtime::EventHub;
use crate::receipts;
use crate::services::notifications::notify;

/// Reject empty item lists, non-positive quantities and negative prices.
pub fn validate_items(items: &[InvoiceItemInput]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "An invoice needs at least one item".to_string(),
        ));
    }
    for (i, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Item {} needs a description",
                i + 1
            )));
        }
        if item.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Item {} must have a positive quantity",
                i + 1
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(AppError::Validation(format!(
                "Item {} has an invalid unit price",
                i + 1
            )));
        }
    }
    Ok(())
}

/// Σ quantity × unit_price.
pub fn compute_total(items: &[InvoiceItemInput]) -> f64 {
    items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum()
}

fn can_view(invoice: &invoices::Model, contract: &contracts::Model, user: &users::Model) -> bool {
    invoice.issued_by == user.id
        || invoice.paid_by == Some(user.id)
        || contract.is_party(user.id)
        || is_admin(user)
}

async fn load_invoice(db: &DatabaseConnection, id: Uuid) -> Result<invoices::Model, AppError> {
    invoice_db::get_invoice_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice {id} not found")))
}

/// Load an invoice together with its contract, checking the user may see it.
async fn load_visible_invoice(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(invoices::Model, contracts::Model), AppError> {
    let invoice = load_invoice(db, id).await?;
    let contract = contract_db::get_contract_by_id(db, invoice.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", invoice.contract_id)))?;

    if !can_view(&invoice, &contract, acting) {
        return Err(AppError::Authorization(
            "You do not have access to this invoice".to_string(),
        ));
    }
    Ok((invoice, contract))
}

/// Issue an invoice against a contract. Only the contract's freelancer may bill.
pub async fn create_invoice(
    db: &DatabaseConnection,
    hub: &EventHub,
    acting: &users::Model,
    input: CreateInvoice,
) -> Result<InvoiceResponse, AppError> {
    validate_items(&input.items)?;

    let contract = contract_db::get_contract_by_id(db, input.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", input.contract_id)))?;

    if contract.freelancer_id != acting.id {
        return Err(AppError::Authorization(
            "Only the contract's freelancer can issue invoices".to_string(),
        ));
    }

    if let Some(milestone_id) = input.milestone_id {
        if milestone_db::get_milestone_in_contract(db, contract.id, milestone_id)
            .await?
            .is_none()
        {
            return Err(AppError::Validation(
                "Milestone does not belong to this contract".to_string(),
            ));
        }
    }

    let total = compute_total(&input.items);
    let (invoice, items) = invoice_db::insert_invoice_with_items(
        db,
        NewInvoice {
            contract_id: contract.id,
            milestone_id: input.milestone_id,
            issued_by: acting.id,
            total,
            due_date: input.due_date,
        },
        input.items,
    )
    .await?;

    tracing::info!(invoice_id = %invoice.id, contract_id = %contract.id, total, "invoice issued");

    notify(
        db,
        hub,
        NewNotification::info(
            contract.client_id,
            format!("New invoice from {} for {:.2}", acting.name, total),
            Some(format!("/invoices/{}", invoice.id)),
        ),
    )
    .await;

    Ok(InvoiceResponse { invoice, items })
}

/// Replace the items and/or due date of an unpaid invoice. The total stays
/// as issued.
pub async fn update_invoice(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
    input: UpdateInvoice,
) -> Result<InvoiceResponse, AppError> {
    let invoice = load_invoice(db, id).await?;
    if invoice.issued_by != acting.id {
        return Err(AppError::Authorization(
            "Only the issuer can edit an invoice".to_string(),
        ));
    }
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::InvalidState(
            "Paid invoices cannot be edited".to_string(),
        ));
    }
    if let Some(items) = &input.items {
        validate_items(items)?;
    }

    let updated = invoice_db::update_invoice(db, invoice, input.items, input.due_date).await?;
    let items = invoice_db::get_items(db, id).await?;

    tracing::info!(invoice_id = %id, "invoice updated");
    Ok(InvoiceResponse {
        invoice: updated,
        items,
    })
}

/// Invoices the user issued, paid, or is billed for as contract client.
/// Runs the overdue sweep first.
pub async fn list_for_user(
    db: &DatabaseConnection,
    acting: &users::Model,
) -> Result<Vec<InvoiceResponse>, AppError> {
    sweep_overdue(db).await?;

    let client_contract_ids: Vec<Uuid> = contract_db::get_contracts_for_user(db, acting.id)
        .await?
        .into_iter()
        .filter(|c| c.client_id == acting.id)
        .map(|c| c.id)
        .collect();

    let invoices = invoice_db::get_invoices_for_user(db, acting.id, client_contract_ids).await?;
    let mut items = invoice_db::get_items_for_invoices(db, invoices.iter().map(|i| i.id).collect())
        .await?;

    Ok(invoices
        .into_iter()
        .map(|invoice| InvoiceResponse {
            items: items.remove(&invoice.id).unwrap_or_default(),
            invoice,
        })
        .collect())
}

/// Flip unpaid invoices past their due date to overdue.
pub async fn sweep_overdue(db: &DatabaseConnection) -> Result<u64, AppError> {
    let today = chrono::Utc::now().date_naive();
    let flipped = invoice_db::mark_overdue(db, today).await?;
    if flipped > 0 {
        tracing::info!(count = flipped, "invoices marked overdue");
    }
    Ok(flipped)
}

pub async fn get_invoice(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<InvoiceResponse, AppError> {
    let (invoice, _) = load_visible_invoice(db, acting, id).await?;
    let items = invoice_db::get_items(db, id).await?;
    Ok(InvoiceResponse { invoice, items })
}

/// Render the invoice document. Returns the invoice alongside the PDF bytes.
pub async fn invoice_pdf(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(invoices::Model, Vec<u8>), AppError> {
    let (invoice, _) = load_visible_invoice(db, acting, id).await?;
    let items = invoice_db::get_items(db, id).await?;

    let pdf = receipts::render_invoice_pdf(&invoice, &items)
        .map_err(|e| AppError::Internal(format!("Failed to render invoice: {e}")))?;
    Ok((invoice, pdf))
}

/// Manual paid-mark. Records no transaction.
pub async fn mark_paid(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<invoices::Model, AppError> {
    let (invoice, contract) = load_visible_invoice(db, acting, id).await?;
    if !contract.is_party(acting.id) && !is_admin(acting) {
        return Err(AppError::Authorization(
            "Only contract parties or an admin can mark an invoice paid".to_string(),
        ));
    }
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::Conflict("Invoice is already paid".to_string()));
    }

    let changed = invoice_db::mark_paid_if_unpaid(db, id, Some(acting.id), None).await?;
    if changed == 0 {
        return Err(AppError::Conflict("Invoice is already paid".to_string()));
    }

    tracing::info!(invoice_id = %id, marked_by = %acting.id, "invoice marked paid manually");
    load_invoice(db, id).await
}

/// Paid invoices are never deleted.
pub async fn delete_invoice(
    db: &DatabaseConnection,
    acting: &users::Model,
    id: Uuid,
) -> Result<(), AppError> {
    let invoice = load_invoice(db, id).await?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::Authorization(
            "Paid invoices cannot be deleted".to_string(),
        ));
    }
    if invoice.issued_by != acting.id && !is_admin(acting) {
        return Err(AppError::Authorization(
            "Only the issuer or an admin can delete an invoice".to_string(),
        ));
    }

    // A webhook may settle the invoice between the read above and the delete.
    let deleted = invoice_db::delete_unpaid_invoice(db, id).await?;
    if deleted == 0 {
        tracing::warn!(invoice_id = %id, "invoice was paid before it could be deleted");
        return Err(AppError::Authorization(
            "Paid invoices cannot be deleted".to_string(),
        ));
    }
    tracing::info!(invoice_id = %id, deleted_by = %acting.id, "invoice deleted");
    Ok(())
}

/// Ask the processor for a payment intent covering the invoice total.
/// The invoice itself is not modified.
pub async fn create_payment_intent(
    db: &DatabaseConnection,
    gateway: &Arc<dyn PaymentGateway>,
    currency: &str,
    acting: &users::Model,
    invoice_id: Uuid,
) -> Result<PaymentIntentResponse, AppError> {
    let (invoice, _) = load_visible_invoice(db, acting, invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(AppError::InvalidState("Invoice is already paid".to_string()));
    }

    let intent = gateway
        .create_payment_intent(PaymentIntentRequest {
            amount_minor: to_minor_units(invoice.total),
            currency: currency.to_string(),
            invoice_id,
            user_id: acting.id,
        })
        .await
        .map_err(|e| {
            tracing::error!(invoice_id = %invoice_id, error = %e, "payment intent request failed");
            AppError::Internal(format!("Payment processor error: {e}"))
        })?;

    tracing::info!(invoice_id = %invoice_id, payment_intent = %intent.id, "payment intent created");

    Ok(PaymentIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
        invoice_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32, unit_price: f64) -> InvoiceItemInput {
        InvoiceItemInput {
            description: "work".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn total_sums_quantity_times_price() {
        assert_eq!(compute_total(&[item(2, 50.0)]), 100.0);
        assert_eq!(compute_total(&[item(3, 10.0), item(1, 0.5)]), 30.5);
    }

    #[test]
    fn item_validation() {
        assert!(matches!(validate_items(&[]), Err(AppError::Validation(_))));
        assert!(matches!(validate_items(&[item(0, 10.0)]), Err(AppError::Validation(_))));
        assert!(matches!(validate_items(&[item(1, -1.0)]), Err(AppError::Validation(_))));
        assert!(validate_items(&[item(1, 0.0)]).is_ok());
    }
}
