//! Invoice record types.
//!
//! An invoice row records a PDF document generated by a background task,
//! referencing either an order (invoice) or a return (credit memo), never
//! both. Records are written once and not mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A generated invoice or credit memo document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
	/// Unique identifier for this record (UUID v4).
	pub id: String,
	/// Human-readable business number, e.g. `INV-20250101-3FA9C1D2`.
	pub invoice_number: String,
	/// Whether this documents an order or a return.
	pub invoice_type: InvoiceType,
	/// Set for order invoices, `None` for credit memos.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
	/// Set for credit memos, `None` for order invoices.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub return_id: Option<String>,
	/// Filesystem path of the generated PDF.
	pub file_path: String,
	/// Base name of the generated PDF.
	pub file_name: String,
	/// Size of the generated file in bytes.
	pub file_size: u64,
	/// Timestamp when the document was generated.
	pub created_at: DateTime<Utc>,
}

/// The kind of document an invoice record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
	/// Invoice generated when an order ships.
	Order,
	/// Credit memo generated when a return is processed.
	Return,
}

impl fmt::Display for InvoiceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvoiceType::Order => f.write_str("order"),
			InvoiceType::Return => f.write_str("return"),
		}
	}
}
