//! Invoice record queries.
//!
//! Invoice records are created by the background consumers; this service
//! only reads them.

use std::sync::Arc;

use oms_storage::StorageService;
use oms_types::{Invoice, InvoiceType, StorageKey};

use crate::OmsError;

/// Filters for listing invoice records.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
	/// Only records of this type.
	pub invoice_type: Option<InvoiceType>,
	/// Only records referencing this order.
	pub order_id: Option<String>,
	/// Only records referencing this return.
	pub return_id: Option<String>,
}

/// Read-side service for generated invoices.
pub struct InvoiceService {
	storage: Arc<StorageService>,
}

impl InvoiceService {
	/// Creates the service over the shared storage.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Gets an invoice record by id.
	pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, OmsError> {
		self.storage
			.retrieve(StorageKey::Invoices.as_str(), invoice_id)
			.await
			.map_err(|e| OmsError::from_storage("Invoice", invoice_id, e))
	}

	/// Lists invoice records, newest first, with optional filters.
	pub async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<Invoice>, OmsError> {
		let mut invoices: Vec<Invoice> = self
			.storage
			.list(StorageKey::Invoices.as_str())
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		invoices.retain(|invoice| {
			filter
				.invoice_type
				.is_none_or(|invoice_type| invoice.invoice_type == invoice_type)
				&& filter
					.order_id
					.as_deref()
					.is_none_or(|order_id| invoice.order_id.as_deref() == Some(order_id))
				&& filter
					.return_id
					.as_deref()
					.is_none_or(|return_id| invoice.return_id.as_deref() == Some(return_id))
		});
		invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(invoices)
	}
}
