use sea_orm::prelude::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::invoice_items;
use crate::models::invoices::{self, InvoiceItemInput, InvoiceStatus};

/// Values fixed when an invoice is issued.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub contract_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub issued_by: Uuid,
    pub total: f64,
    pub due_date: Option<chrono::NaiveDate>,
}

fn item_models(invoice_id: Uuid, items: Vec<InvoiceItemInput>) -> Vec<invoice_items::ActiveModel> {
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| invoice_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(invoice_id),
            position: Set(position as i32),
            description: Set(item.description),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
        })
        .collect()
}

/// Insert an unpaid invoice and its line items in one transaction.
pub async fn insert_invoice_with_items(
    db: &DatabaseConnection,
    input: NewInvoice,
    items: Vec<InvoiceItemInput>,
) -> Result<(invoices::Model, Vec<invoice_items::Model>), DbErr> {
    let txn = db.begin().await?;

    let invoice = invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        contract_id: Set(input.contract_id),
        milestone_id: Set(input.milestone_id),
        issued_by: Set(input.issued_by),
        paid_by: Set(None),
        total: Set(input.total),
        due_date: Set(input.due_date),
        status: Set(InvoiceStatus::Unpaid),
        paid_at: Set(None),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let mut saved = Vec::with_capacity(items.len());
    for item in item_models(invoice.id, items) {
        saved.push(item.insert(&txn).await?);
    }

    txn.commit().await?;
    Ok((invoice, saved))
}

/// Fetch a single invoice by ID. Usable inside a transaction.
pub async fn get_invoice_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<invoices::Model>, DbErr> {
    invoices::Entity::find_by_id(id).one(db).await
}

pub async fn get_items(
    db: &DatabaseConnection,
    invoice_id: Uuid,
) -> Result<Vec<invoice_items::Model>, DbErr> {
    invoice_items::Entity::find()
        .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
        .order_by_asc(invoice_items::Column::Position)
        .all(db)
        .await
}

/// Line items for many invoices, grouped by invoice id and kept in order.
pub async fn get_items_for_invoices(
    db: &DatabaseConnection,
    invoice_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<invoice_items::Model>>, DbErr> {
    if invoice_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = invoice_items::Entity::find()
        .filter(invoice_items::Column::InvoiceId.is_in(invoice_ids))
        .order_by_asc(invoice_items::Column::InvoiceId)
        .order_by_asc(invoice_items::Column::Position)
        .all(db)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<invoice_items::Model>> = HashMap::new();
    for row in rows {
        grouped.entry(row.invoice_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Invoices the user issued or paid, plus those billed on contracts they are client of.
pub async fn get_invoices_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    client_contract_ids: Vec<Uuid>,
) -> Result<Vec<invoices::Model>, DbErr> {
    let mut condition = Condition::any()
        .add(invoices::Column::IssuedBy.eq(user_id))
        .add(invoices::Column::PaidBy.eq(user_id));
    if !client_contract_ids.is_empty() {
        condition = condition.add(invoices::Column::ContractId.is_in(client_contract_ids));
    }

    invoices::Entity::find()
        .filter(condition)
        .order_by_desc(invoices::Column::CreatedAt)
        .all(db)
        .await
}

/// Replace line items and/or the due date. The billed total is left as issued.
pub async fn update_invoice(
    db: &DatabaseConnection,
    invoice: invoices::Model,
    items: Option<Vec<InvoiceItemInput>>,
    due_date: Option<chrono::NaiveDate>,
) -> Result<invoices::Model, DbErr> {
    let txn = db.begin().await?;
    let invoice_id = invoice.id;

    if let Some(items) = items {
        invoice_items::Entity::delete_many()
            .filter(invoice_items::Column::InvoiceId.eq(invoice_id))
            .exec(&txn)
            .await?;
        for item in item_models(invoice_id, items) {
            item.insert(&txn).await?;
        }
    }

    let mut active: invoices::ActiveModel = invoice.into();
    if let Some(due_date) = due_date {
        active.due_date = Set(Some(due_date));
    }
    active.updated_at = Set(Some(chrono::Utc::now()));
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Flip an invoice to paid unless it already is. Returns the number of rows
/// changed: `0` means another writer got there first.
///
/// `total` overrides the billed total when the processor reports the amount
/// it actually captured.
pub async fn mark_paid_if_unpaid<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    paid_by: Option<Uuid>,
    total: Option<f64>,
) -> Result<u64, DbErr> {
    let now = chrono::Utc::now();
    let mut update = invoices::Entity::update_many()
        .col_expr(invoices::Column::Status, Expr::value(InvoiceStatus::Paid))
        .col_expr(invoices::Column::PaidAt, Expr::value(now))
        .col_expr(invoices::Column::UpdatedAt, Expr::value(now));

    if let Some(paid_by) = paid_by {
        update = update.col_expr(invoices::Column::PaidBy, Expr::value(paid_by));
    }
    if let Some(total) = total {
        update = update.col_expr(invoices::Column::Total, Expr::value(total));
    }

    let result = update
        .filter(invoices::Column::Id.eq(id))
        .filter(invoices::Column::Status.ne(InvoiceStatus::Paid))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Move unpaid invoices whose due date has passed to overdue.
pub async fn mark_overdue(db: &DatabaseConnection, today: chrono::NaiveDate) -> Result<u64, DbErr> {
    let result = invoices::Entity::update_many()
        .col_expr(invoices::Column::Status, Expr::value(InvoiceStatus::Overdue))
        .filter(invoices::Column::Status.eq(InvoiceStatus::Unpaid))
        .filter(invoices::Column::DueDate.lt(today))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Delete an invoice and its items unless it has been paid. Returns the
/// number of invoices removed: `0` means the invoice was paid (or gone) by
/// the time the delete ran, and nothing was touched.
pub async fn delete_unpaid_invoice(db: &DatabaseConnection, id: Uuid) -> Result<u64, DbErr> {
    let txn = db.begin().await?;

    invoice_items::Entity::delete_many()
        .filter(invoice_items::Column::InvoiceId.eq(id))
        .exec(&txn)
        .await?;
    let result = invoices::Entity::delete_many()
        .filter(invoices::Column::Id.eq(id))
        .filter(invoices::Column::Status.ne(InvoiceStatus::Paid))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        txn.rollback().await?;
        return Ok(0);
    }

    txn.commit().await?;
    Ok(result.rows_affected)
}
