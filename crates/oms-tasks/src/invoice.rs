//! Invoice and credit memo generation consumers.
//!
//! Both consumers are defensive against at-least-once delivery and stale
//! queues: they re-fetch the entity fresh, verify it is still in a
//! qualifying state, and skip when it is not. The PDF file is written
//! before the invoice record, so a crash in between leaves an orphaned
//! file but never a record pointing at a missing file.

use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use oms_storage::{StorageError, StorageService};
use oms_types::{
	business_number, truncate_id, Invoice, InvoiceType, Order, OrderStatus, Return, ReturnStatus,
	StorageKey,
};

use crate::pdf;
use crate::TaskOutcome;
use std::sync::Arc;

/// Generates PDF invoices for orders and credit memos for returns.
pub struct InvoiceGenerator {
	storage: Arc<StorageService>,
	invoices_dir: PathBuf,
}

impl InvoiceGenerator {
	/// Creates a generator writing documents into `invoices_dir`.
	pub fn new(storage: Arc<StorageService>, invoices_dir: PathBuf) -> Self {
		Self {
			storage,
			invoices_dir,
		}
	}

	/// Generates the invoice for a shipped order.
	pub async fn generate_order_invoice(&self, order_id: &str) -> TaskOutcome {
		let order: Order = match self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => order,
			Err(StorageError::NotFound) => {
				return TaskOutcome::Failed(format!("order {} not found", order_id));
			}
			Err(e) => return TaskOutcome::Failed(e.to_string()),
		};

		if order.status != OrderStatus::Shipped {
			return TaskOutcome::Skipped(format!(
				"order not in shipped state (current: {})",
				order.status
			));
		}

		if let Some(existing) = self.existing_invoice_for(order_id, InvoiceType::Order).await {
			return TaskOutcome::Skipped(format!(
				"invoice {} already generated for order",
				existing.invoice_number
			));
		}

		let now = Utc::now();
		let file_name = pdf::order_invoice_filename(&order.order_number, now);
		let bytes = match pdf::render_order_invoice(&order) {
			Ok(bytes) => bytes,
			Err(e) => return TaskOutcome::Failed(e.to_string()),
		};

		let record = Invoice {
			id: Uuid::new_v4().to_string(),
			invoice_number: business_number("INV", now),
			invoice_type: InvoiceType::Order,
			order_id: Some(order.id.clone()),
			return_id: None,
			file_path: self.invoices_dir.join(&file_name).display().to_string(),
			file_name,
			file_size: bytes.len() as u64,
			created_at: now,
		};

		match self.persist(record, bytes).await {
			Ok(invoice) => {
				tracing::info!(
					order_id = %truncate_id(order_id),
					order_number = %order.order_number,
					invoice_number = %invoice.invoice_number,
					path = %invoice.file_path,
					"Generated order invoice"
				);
				TaskOutcome::Success
			}
			Err(e) => TaskOutcome::Failed(e),
		}
	}

	/// Generates the credit memo for a processed (or refunded) return.
	pub async fn generate_return_invoice(&self, return_id: &str) -> TaskOutcome {
		let ret: Return = match self
			.storage
			.retrieve(StorageKey::Returns.as_str(), return_id)
			.await
		{
			Ok(ret) => ret,
			Err(StorageError::NotFound) => {
				return TaskOutcome::Failed(format!("return {} not found", return_id));
			}
			Err(e) => return TaskOutcome::Failed(e.to_string()),
		};

		if !matches!(ret.status, ReturnStatus::Processed | ReturnStatus::Refunded) {
			return TaskOutcome::Skipped(format!(
				"return not in completed state (current: {})",
				ret.status
			));
		}

		if let Some(existing) = self
			.existing_invoice_for(return_id, InvoiceType::Return)
			.await
		{
			return TaskOutcome::Skipped(format!(
				"credit memo {} already generated for return",
				existing.invoice_number
			));
		}

		// The memo references the parent order when it still exists.
		let order: Option<Order> = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), &ret.order_id)
			.await
			.ok();

		let now = Utc::now();
		let file_name = pdf::credit_memo_filename(&ret.return_number, now);
		let bytes = match pdf::render_credit_memo(&ret, order.as_ref()) {
			Ok(bytes) => bytes,
			Err(e) => return TaskOutcome::Failed(e.to_string()),
		};

		let record = Invoice {
			id: Uuid::new_v4().to_string(),
			invoice_number: business_number("INV", now),
			invoice_type: InvoiceType::Return,
			order_id: None,
			return_id: Some(ret.id.clone()),
			file_path: self.invoices_dir.join(&file_name).display().to_string(),
			file_name,
			file_size: bytes.len() as u64,
			created_at: now,
		};

		match self.persist(record, bytes).await {
			Ok(invoice) => {
				tracing::info!(
					return_id = %truncate_id(return_id),
					return_number = %ret.return_number,
					invoice_number = %invoice.invoice_number,
					path = %invoice.file_path,
					"Generated credit memo"
				);
				TaskOutcome::Success
			}
			Err(e) => TaskOutcome::Failed(e),
		}
	}

	/// Looks for an invoice record already referencing the entity.
	async fn existing_invoice_for(&self, entity_id: &str, kind: InvoiceType) -> Option<Invoice> {
		let invoices: Vec<Invoice> = self
			.storage
			.list(StorageKey::Invoices.as_str())
			.await
			.ok()?;
		invoices.into_iter().find(|invoice| {
			invoice.invoice_type == kind
				&& match kind {
					InvoiceType::Order => invoice.order_id.as_deref() == Some(entity_id),
					InvoiceType::Return => invoice.return_id.as_deref() == Some(entity_id),
				}
		})
	}

	/// Writes the PDF file, then the invoice record, in that order.
	async fn persist(&self, record: Invoice, bytes: Vec<u8>) -> Result<Invoice, String> {
		tokio::fs::create_dir_all(&self.invoices_dir)
			.await
			.map_err(|e| format!("failed to create invoices directory: {}", e))?;
		tokio::fs::write(&record.file_path, &bytes)
			.await
			.map_err(|e| format!("failed to write {}: {}", record.file_path, e))?;

		self.storage
			.store(StorageKey::Invoices.as_str(), &record.id, &record)
			.await
			.map_err(|e| format!("failed to store invoice record: {}", e))?;
		Ok(record)
	}
}
