//! PDF documents for invoices and payment receipts.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::models::{invoice_items, invoices};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const LINE_HEIGHT: i64 = 18;

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Render the invoice as a single-page PDF.
pub fn render_invoice_pdf(
    invoice: &invoices::Model,
    items: &[invoice_items::Model],
) -> Result<Vec<u8>, ReceiptError> {
    let mut lines = vec![(18, "INVOICE".to_string())];
    lines.extend(invoice_lines(invoice, items));
    render(&lines)
}

/// Render a payment receipt for a paid invoice.
pub fn render_receipt_pdf(
    invoice: &invoices::Model,
    items: &[invoice_items::Model],
    payment_reference: &str,
) -> Result<Vec<u8>, ReceiptError> {
    let mut lines = vec![(18, "PAYMENT RECEIPT".to_string())];
    lines.extend(invoice_lines(invoice, items));
    lines.push((11, String::new()));
    lines.push((11, format!("Payment reference: {payment_reference}")));
    if let Some(paid_at) = invoice.paid_at {
        lines.push((11, format!("Paid at: {}", paid_at.format("%Y-%m-%d %H:%M UTC"))));
    }
    render(&lines)
}

fn invoice_lines(
    invoice: &invoices::Model,
    items: &[invoice_items::Model],
) -> Vec<(i64, String)> {
    let mut lines = vec![
        (11, format!("Invoice: {}", invoice.id)),
        (11, format!("Contract: {}", invoice.contract_id)),
        (11, format!("Issued: {}", invoice.created_at.format("%Y-%m-%d"))),
    ];
    if let Some(due) = invoice.due_date {
        lines.push((11, format!("Due: {due}")));
    }
    lines.push((11, format!("Status: {}", status_label(invoice.status))));
    lines.push((11, String::new()));

    for item in items {
        lines.push((
            11,
            format!(
                "{}. {}  {} x {:.2} = {:.2}",
                item.position + 1,
                item.description,
                item.quantity,
                item.unit_price,
                item.line_total()
            ),
        ));
    }

    lines.push((11, String::new()));
    lines.push((13, format!("Total: {:.2}", invoice.total)));
    lines
}

fn status_label(status: invoices::InvoiceStatus) -> &'static str {
    match status {
        invoices::InvoiceStatus::Unpaid => "UNPAID",
        invoices::InvoiceStatus::Paid => "PAID",
        invoices::InvoiceStatus::Overdue => "OVERDUE",
    }
}

fn render(lines: &[(i64, String)]) -> Result<Vec<u8>, ReceiptError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = Vec::with_capacity(lines.len() * 4);
    let mut y = PAGE_HEIGHT - MARGIN;
    for (size, text) in lines {
        // Overflowing lines are clipped; invoices are expected to fit one page.
        if y < MARGIN {
            break;
        }
        if !text.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), (*size).into()]));
            operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
            operations.push(Operation::new("ET", vec![]));
        }
        y -= LINE_HEIGHT.max(*size + 6);
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoices::InvoiceStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> (invoices::Model, Vec<invoice_items::Model>) {
        let invoice_id = Uuid::new_v4();
        let invoice = invoices::Model {
            id: invoice_id,
            contract_id: Uuid::new_v4(),
            milestone_id: None,
            issued_by: Uuid::new_v4(),
            paid_by: None,
            total: 150.0,
            due_date: None,
            status: InvoiceStatus::Unpaid,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let items = vec![
            invoice_items::Model {
                id: Uuid::new_v4(),
                invoice_id,
                position: 0,
                description: "Design".to_string(),
                quantity: 2,
                unit_price: 50.0,
            },
            invoice_items::Model {
                id: Uuid::new_v4(),
                invoice_id,
                position: 1,
                description: "Review".to_string(),
                quantity: 1,
                unit_price: 50.0,
            },
        ];
        (invoice, items)
    }

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    #[test]
    fn invoice_pdf_is_a_single_page_document() {
        let (invoice, items) = sample();
        let bytes = render_invoice_pdf(&invoice, &items).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
        assert!(contains(&bytes, "Total: 150.00"));
        assert!(contains(&bytes, "Design"));
    }

    #[test]
    fn receipt_carries_payment_reference() {
        let (mut invoice, items) = sample();
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(Utc::now());

        let bytes = render_receipt_pdf(&invoice, &items, "pi_123").unwrap();
        assert!(contains(&bytes, "PAYMENT RECEIPT"));
        assert!(contains(&bytes, "Payment reference: pi_123"));
    }
}
