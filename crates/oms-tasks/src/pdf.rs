//! PDF document rendering for invoices and credit memos.
//!
//! Documents are deliberately plain: a single US-letter page of Helvetica
//! text. Layout is not a contract here; the file naming convention is, and
//! lives in [`order_invoice_filename`] / [`credit_memo_filename`].

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

use oms_types::{Order, Return};

/// Errors that can occur while rendering a document.
#[derive(Debug, Error)]
pub enum PdfError {
	#[error("PDF generation error: {0}")]
	Render(String),
}

/// File name for an order invoice: `invoice_order_{number}_{YYYYMMDD_HHMMSS}.pdf`.
pub fn order_invoice_filename(order_number: &str, now: DateTime<Utc>) -> String {
	format!(
		"invoice_order_{}_{}.pdf",
		order_number,
		now.format("%Y%m%d_%H%M%S")
	)
}

/// File name for a credit memo: `credit_memo_return_{number}_{YYYYMMDD_HHMMSS}.pdf`.
pub fn credit_memo_filename(return_number: &str, now: DateTime<Utc>) -> String {
	format!(
		"credit_memo_return_{}_{}.pdf",
		return_number,
		now.format("%Y%m%d_%H%M%S")
	)
}

/// Renders the invoice for a shipped order.
pub fn render_order_invoice(order: &Order) -> Result<Vec<u8>, PdfError> {
	let mut lines = vec![
		format!("Invoice Number: {}", order.order_number),
		format!("Order Date: {}", order.created_at.format("%B %d, %Y")),
		format!(
			"Bill To: {} <{}>",
			order.customer_name, order.customer_email
		),
	];
	if let Some(shipped_at) = order.shipped_at {
		lines.push(format!("Shipped Date: {}", shipped_at.format("%B %d, %Y")));
	}
	lines.push(String::new());
	lines.push("Items".to_string());
	for item in &order.items {
		lines.push(format!(
			"{} ({}) x{} @ {} = {}",
			item.product_name, item.product_sku, item.quantity, item.unit_price, item.total_price
		));
	}
	lines.push(String::new());
	lines.push(format!("Subtotal: {}", order.subtotal));
	lines.push(format!("Tax: {}", order.tax));
	lines.push(format!("Shipping: {}", order.shipping_cost));
	lines.push(format!("TOTAL: {} {}", order.total, order.currency));
	lines.push(String::new());
	lines.push("Thank you for your business!".to_string());

	render_text_document("INVOICE", &lines)
}

/// Renders the credit memo for a processed return.
///
/// The parent order is optional; a memo is still produced if the order has
/// since been removed.
pub fn render_credit_memo(ret: &Return, order: Option<&Order>) -> Result<Vec<u8>, PdfError> {
	let mut lines = vec![
		format!("Credit Memo Number: {}", ret.return_number),
		format!("Return Date: {}", ret.created_at.format("%B %d, %Y")),
	];
	if let Some(order) = order {
		lines.push(format!("Original Order: {}", order.order_number));
		lines.push(format!(
			"Customer: {} <{}>",
			order.customer_name, order.customer_email
		));
	}
	if let Some(processed_at) = ret.processed_at {
		lines.push(format!(
			"Processed Date: {}",
			processed_at.format("%B %d, %Y")
		));
	}
	lines.push(String::new());
	lines.push("Returned Items".to_string());
	for item in &ret.items {
		lines.push(format!(
			"{} ({}) x{} refund {}",
			item.product_name, item.product_sku, item.quantity, item.refund_amount
		));
	}
	lines.push(String::new());
	lines.push(format!(
		"Total Refund Amount: {} {}",
		ret.refund_amount, ret.currency
	));

	render_text_document("CREDIT MEMO", &lines)
}

/// Builds a one-page text document with a title and body lines.
fn render_text_document(title: &str, lines: &[String]) -> Result<Vec<u8>, PdfError> {
	let mut doc = Document::with_version("1.5");

	let pages_id = doc.new_object_id();
	let font_id = doc.add_object(dictionary! {
		"Type" => "Font",
		"Subtype" => "Type1",
		"BaseFont" => "Helvetica",
	});
	let resources_id = doc.add_object(dictionary! {
		"Font" => dictionary! { "F1" => font_id },
	});

	let mut operations = vec![
		Operation::new("BT", vec![]),
		Operation::new("Tf", vec!["F1".into(), 18.into()]),
		Operation::new("Td", vec![72.into(), 720.into()]),
		Operation::new("Tj", vec![Object::string_literal(title)]),
		Operation::new("Tf", vec!["F1".into(), 10.into()]),
		Operation::new("Td", vec![0.into(), (-28).into()]),
	];
	for line in lines {
		operations.push(Operation::new(
			"Tj",
			vec![Object::string_literal(line.as_str())],
		));
		operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
	}
	operations.push(Operation::new("ET", vec![]));

	let content = Content { operations };
	let encoded = content
		.encode()
		.map_err(|e| PdfError::Render(e.to_string()))?;
	let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

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
		"MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
	};
	doc.objects.insert(pages_id, Object::Dictionary(pages));

	let catalog_id = doc.add_object(dictionary! {
		"Type" => "Catalog",
		"Pages" => pages_id,
	});
	doc.trailer.set("Root", catalog_id);

	let mut bytes = Vec::new();
	doc.save_to(&mut bytes)
		.map_err(|e| PdfError::Render(e.to_string()))?;
	Ok(bytes)
}
