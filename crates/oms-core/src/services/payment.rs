//! Payment orchestration service.
//!
//! Gateway interaction is simulated: processing marks the payment
//! completed and fabricates a transaction id. Refunds go through the
//! invariant-preserving rule in `oms-state`.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use oms_state::{process_refund, StateError};
use oms_storage::StorageService;
use oms_types::{
	business_number, truncate_id, CreatePaymentRequest, OmsEvent, Payment, PaymentEvent,
	PaymentStatus, StorageKey,
};

use crate::engine::EventBus;
use crate::OmsError;

/// Filters for listing payments.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
	/// Only payments for this order.
	pub order_id: Option<String>,
	/// Only payments currently in this status.
	pub status: Option<PaymentStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Service for payment business logic.
pub struct PaymentService {
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl PaymentService {
	/// Creates the service over its constructed dependencies.
	pub fn new(storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self { storage, event_bus }
	}

	/// Creates a new payment in `pending` state.
	pub async fn create_payment(&self, request: CreatePaymentRequest) -> Result<Payment, OmsError> {
		if request.amount <= Decimal::ZERO {
			return Err(OmsError::Validation(
				"payment amount must be positive".to_string(),
			));
		}

		// The order must exist before money is taken against it.
		if !self
			.storage
			.exists(StorageKey::Orders.as_str(), &request.order_id)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?
		{
			return Err(OmsError::Reference(format!(
				"order {} not found",
				request.order_id
			)));
		}

		let now = Utc::now();
		let payment = Payment {
			id: Uuid::new_v4().to_string(),
			payment_number: business_number("PAY", now),
			order_id: request.order_id,
			status: PaymentStatus::Pending,
			method: request.method,
			amount: request.amount,
			refunded_amount: Decimal::ZERO,
			currency: "USD".to_string(),
			transaction_id: request.transaction_id,
			created_at: now,
			updated_at: now,
			completed_at: None,
			refunded_at: None,
			version: 0,
		};

		self.storage
			.store(StorageKey::Payments.as_str(), &payment.id, &payment)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;
		self.storage
			.store(
				StorageKey::PaymentByNumber.as_str(),
				&payment.payment_number,
				&payment.id,
			)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		tracing::info!(
			payment_id = %truncate_id(&payment.id),
			payment_number = %payment.payment_number,
			amount = %payment.amount,
			"Created payment"
		);
		Ok(payment)
	}

	/// Gets a payment by id.
	pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, OmsError> {
		self.storage
			.retrieve(StorageKey::Payments.as_str(), payment_id)
			.await
			.map_err(|e| OmsError::from_storage("Payment", payment_id, e))
	}

	/// Lists payments, newest first, with optional filters.
	pub async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<Payment>, OmsError> {
		let mut payments: Vec<Payment> = self
			.storage
			.list(StorageKey::Payments.as_str())
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		payments.retain(|payment| {
			filter
				.order_id
				.as_deref()
				.is_none_or(|order_id| payment.order_id == order_id)
				&& filter.status.is_none_or(|status| payment.status == status)
		});
		payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		let offset = filter.offset.unwrap_or(0);
		let limit = filter.limit.unwrap_or(100);
		Ok(payments.into_iter().skip(offset).take(limit).collect())
	}

	/// Processes a pending payment through the simulated gateway.
	pub async fn process_payment(&self, payment_id: &str) -> Result<Payment, OmsError> {
		let mut payment = self.get_payment(payment_id).await?;
		if !matches!(
			payment.status,
			PaymentStatus::Pending | PaymentStatus::Processing
		) {
			return Err(OmsError::State(StateError::InvalidState(format!(
				"payment {} cannot be processed (current: {})",
				payment.payment_number, payment.status
			))));
		}

		let now = Utc::now();
		payment.status = PaymentStatus::Completed;
		payment.completed_at = Some(now);
		payment.updated_at = now;
		if payment.transaction_id.is_none() {
			payment.transaction_id = Some(format!(
				"TXN-{}",
				Uuid::new_v4().simple().to_string()[..16].to_uppercase()
			));
		}

		self.storage
			.update_versioned(StorageKey::Payments.as_str(), payment_id, &mut payment)
			.await
			.map_err(|e| OmsError::from_storage("Payment", payment_id, e))?;

		tracing::info!(
			payment_id = %truncate_id(payment_id),
			payment_number = %payment.payment_number,
			"Payment completed"
		);
		self.event_bus
			.publish(OmsEvent::Payment(PaymentEvent::Completed {
				payment_id: payment.id.clone(),
				order_id: payment.order_id.clone(),
			}))
			.ok();

		Ok(payment)
	}

	/// Refunds a completed payment, fully when `amount` is omitted.
	pub async fn refund(
		&self,
		payment_id: &str,
		amount: Option<Decimal>,
	) -> Result<Payment, OmsError> {
		let mut payment = self.get_payment(payment_id).await?;
		let now = Utc::now();

		let refunded = process_refund(&mut payment, amount, now)?;
		payment.updated_at = now;

		self.storage
			.update_versioned(StorageKey::Payments.as_str(), payment_id, &mut payment)
			.await
			.map_err(|e| OmsError::from_storage("Payment", payment_id, e))?;

		tracing::info!(
			payment_id = %truncate_id(payment_id),
			payment_number = %payment.payment_number,
			refunded = %refunded,
			status = %payment.status,
			"Refund processed"
		);
		self.event_bus
			.publish(OmsEvent::Payment(PaymentEvent::RefundProcessed {
				payment_id: payment.id.clone(),
				order_id: payment.order_id.clone(),
				amount: refunded,
				status: payment.status,
			}))
			.ok();

		Ok(payment)
	}
}
