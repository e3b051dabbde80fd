//! Return orchestration service.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use oms_state::{return_lifecycle, ActionContext};
use oms_storage::StorageService;
use oms_tasks::TaskQueue;
use oms_types::{
	business_number, truncate_id, CreateReturnRequest, OmsEvent, Return, ReturnEvent, ReturnItem,
	ReturnStatus, StorageKey, TaskMessage, UpdateReturnRequest,
};

use crate::engine::EventBus;
use crate::OmsError;

/// Filters for listing returns.
#[derive(Debug, Clone, Default)]
pub struct ReturnFilter {
	/// Only returns opened against this order.
	pub order_id: Option<String>,
	/// Only returns currently in this status.
	pub status: Option<ReturnStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Service for return business logic.
pub struct ReturnService {
	storage: Arc<StorageService>,
	queue: TaskQueue,
	event_bus: EventBus,
}

impl ReturnService {
	/// Creates the service over its constructed dependencies.
	pub fn new(storage: Arc<StorageService>, queue: TaskQueue, event_bus: EventBus) -> Self {
		Self {
			storage,
			queue,
			event_bus,
		}
	}

	/// Creates a new return request in `initiated` state.
	///
	/// The refund amount is computed here, exactly once, from the
	/// referenced order items: every item must belong to the target order,
	/// and the order itself must be in `delivered` or `returned` status.
	pub async fn create_return(&self, request: CreateReturnRequest) -> Result<Return, OmsError> {
		let order: oms_types::Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), &request.order_id)
			.await
			.map_err(|e| match e {
				oms_storage::StorageError::NotFound => OmsError::Reference(format!(
					"order {} not found",
					request.order_id
				)),
				other => OmsError::Storage(other.to_string()),
			})?;

		if !order.is_returnable() {
			return Err(OmsError::Reference(format!(
				"order {} is not eligible for return (current: {})",
				order.order_number, order.status
			)));
		}

		if request.items.is_empty() {
			return Err(OmsError::Validation(
				"return must contain at least one item".to_string(),
			));
		}

		let mut refund_amount = Decimal::ZERO;
		let mut items = Vec::with_capacity(request.items.len());
		for item in &request.items {
			if item.quantity == 0 {
				return Err(OmsError::Validation(format!(
					"quantity for order item {} must be positive",
					item.order_item_id
				)));
			}
			let Some(order_item) = order.find_item(&item.order_item_id) else {
				return Err(OmsError::Reference(format!(
					"order item {} does not exist or does not belong to order {}",
					item.order_item_id, order.order_number
				)));
			};

			let item_refund = order_item.unit_price * Decimal::from(item.quantity);
			refund_amount += item_refund;
			items.push(ReturnItem {
				id: Uuid::new_v4().to_string(),
				order_item_id: order_item.id.clone(),
				product_id: order_item.product_id,
				product_name: order_item.product_name.clone(),
				product_sku: order_item.product_sku.clone(),
				quantity: item.quantity,
				refund_amount: item_refund,
				condition: item.condition.clone(),
				condition_notes: item.condition_notes.clone(),
			});
		}

		let now = Utc::now();
		let ret = Return {
			id: Uuid::new_v4().to_string(),
			return_number: business_number("RET", now),
			order_id: order.id.clone(),
			status: ReturnStatus::Initiated,
			previous_status: None,
			reason: request.reason,
			reason_description: request.reason_description,
			refund_amount,
			currency: order.currency.clone(),
			items,
			rejection_reason: None,
			tracking_number: None,
			notes: request.notes,
			created_at: now,
			updated_at: now,
			approved_at: None,
			pickup_scheduled_at: None,
			received_at: None,
			processed_at: None,
			refunded_at: None,
			version: 0,
		};

		self.storage
			.store(StorageKey::Returns.as_str(), &ret.id, &ret)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;
		self.storage
			.store(
				StorageKey::ReturnByNumber.as_str(),
				&ret.return_number,
				&ret.id,
			)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		tracing::info!(
			return_id = %truncate_id(&ret.id),
			return_number = %ret.return_number,
			order_number = %order.order_number,
			refund_amount = %ret.refund_amount,
			"Created return"
		);
		self.event_bus
			.publish(OmsEvent::Return(ReturnEvent::Created {
				return_id: ret.id.clone(),
			}))
			.ok();

		Ok(ret)
	}

	/// Gets a return by id.
	pub async fn get_return(&self, return_id: &str) -> Result<Return, OmsError> {
		self.storage
			.retrieve(StorageKey::Returns.as_str(), return_id)
			.await
			.map_err(|e| OmsError::from_storage("Return", return_id, e))
	}

	/// Lists returns, newest first, with optional filters.
	pub async fn list_returns(&self, filter: ReturnFilter) -> Result<Vec<Return>, OmsError> {
		let mut returns: Vec<Return> = self
			.storage
			.list(StorageKey::Returns.as_str())
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		returns.retain(|ret| {
			filter
				.order_id
				.as_deref()
				.is_none_or(|order_id| ret.order_id == order_id)
				&& filter.status.is_none_or(|status| ret.status == status)
		});
		returns.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		let offset = filter.offset.unwrap_or(0);
		let limit = filter.limit.unwrap_or(100);
		Ok(returns.into_iter().skip(offset).take(limit).collect())
	}

	/// Updates mutable return fields.
	pub async fn update_return(
		&self,
		return_id: &str,
		request: UpdateReturnRequest,
	) -> Result<Return, OmsError> {
		let mut ret = self.get_return(return_id).await?;
		if let Some(tracking_number) = request.tracking_number {
			ret.tracking_number = Some(tracking_number);
		}
		if let Some(notes) = request.notes {
			ret.notes = Some(notes);
		}
		ret.updated_at = Utc::now();
		self.storage
			.update_versioned(StorageKey::Returns.as_str(), return_id, &mut ret)
			.await
			.map_err(|e| OmsError::from_storage("Return", return_id, e))?;
		Ok(ret)
	}

	/// Applies a lifecycle action to a return.
	///
	/// `reason` is only consulted by the reject effect, which stores it
	/// into `rejection_reason`. The credit memo task is enqueued strictly
	/// after the `process` transition commits.
	pub async fn transition(
		&self,
		return_id: &str,
		action: &str,
		reason: Option<String>,
	) -> Result<Return, OmsError> {
		let mut ret = self.get_return(return_id).await?;
		let from = ret.status;
		let now = Utc::now();

		let table = return_lifecycle();
		let ctx = ActionContext::new(now).with_reason(reason);
		let to = table.apply(&mut ret, action, &ctx)?;
		ret.updated_at = now;

		self.storage
			.update_versioned(StorageKey::Returns.as_str(), return_id, &mut ret)
			.await
			.map_err(|e| OmsError::from_storage("Return", return_id, e))?;

		let action = table.normalize(action);
		tracing::info!(
			return_id = %truncate_id(return_id),
			return_number = %ret.return_number,
			action = %action,
			from = %from,
			to = %to,
			"Return transitioned"
		);

		// Post-commit coupling: the credit memo is generated in the
		// background once the return has been processed.
		if action == "process" {
			self.queue
				.enqueue_logged(TaskMessage::GenerateReturnInvoice {
					return_id: ret.id.clone(),
				})
				.await;
		}

		self.event_bus
			.publish(OmsEvent::Return(ReturnEvent::StatusChanged {
				return_id: ret.id.clone(),
				order_id: ret.order_id.clone(),
				action,
				from,
				to,
				refund_amount: ret.refund_amount,
				occurred_at: now,
			}))
			.ok();

		Ok(ret)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::order::OrderService;
	use oms_config::PricingConfig;
	use oms_state::StateError;
	use oms_storage::implementations::memory::MemoryStorage;
	use oms_types::{CreateOrderRequest, Order, OrderItemRequest, ReturnItemRequest, ReturnReason};
	use tokio::sync::mpsc;

	struct Fixture {
		orders: OrderService,
		returns: ReturnService,
		rx: mpsc::UnboundedReceiver<oms_tasks::TaskEnvelope>,
	}

	fn fixture() -> Fixture {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let (queue, rx) = TaskQueue::new(storage.clone());
		let event_bus = EventBus::new(16);
		Fixture {
			orders: OrderService::new(
				storage.clone(),
				queue.clone(),
				event_bus.clone(),
				PricingConfig::default(),
			),
			returns: ReturnService::new(storage, queue, event_bus),
			rx,
		}
	}

	async fn delivered_order(fixture: &Fixture) -> Order {
		let order = fixture
			.orders
			.create_order(CreateOrderRequest {
				customer_id: 7,
				customer_email: "customer@example.com".to_string(),
				customer_name: "Test Customer".to_string(),
				items: vec![OrderItemRequest {
					product_id: 1,
					product_name: "Widget".to_string(),
					product_sku: "WID-1".to_string(),
					unit_price: Decimal::new(10000, 2), // 100.00
					quantity: 2,
				}],
				notes: None,
			})
			.await
			.unwrap();
		for action in ["confirm", "start_processing", "ship", "deliver"] {
			fixture.orders.transition(&order.id, action).await.unwrap();
		}
		fixture.orders.get_order(&order.id).await.unwrap()
	}

	fn return_request(order: &Order, quantity: u32) -> CreateReturnRequest {
		CreateReturnRequest {
			order_id: order.id.clone(),
			reason: ReturnReason::Defective,
			reason_description: None,
			items: vec![ReturnItemRequest {
				order_item_id: order.items[0].id.clone(),
				quantity,
				condition: Some("damaged".to_string()),
				condition_notes: None,
			}],
			notes: None,
		}
	}

	#[tokio::test]
	async fn test_refund_amount_computed_once_at_creation() {
		let mut fixture = fixture();
		let order = delivered_order(&fixture).await;
		while fixture.rx.try_recv().is_ok() {} // drain the ship enqueue

		let ret = fixture
			.returns
			.create_return(return_request(&order, 1))
			.await
			.unwrap();

		// unit_price 100.00 * quantity 1
		assert_eq!(ret.refund_amount, Decimal::new(10000, 2));
		assert_eq!(ret.items[0].refund_amount, Decimal::new(10000, 2));
		assert_eq!(ret.status, ReturnStatus::Initiated);
		assert!(ret.return_number.starts_with("RET-"));
	}

	#[tokio::test]
	async fn test_return_against_pending_order_is_rejected() {
		let fixture = fixture();
		let order = fixture
			.orders
			.create_order(CreateOrderRequest {
				customer_id: 7,
				customer_email: "customer@example.com".to_string(),
				customer_name: "Test Customer".to_string(),
				items: vec![OrderItemRequest {
					product_id: 1,
					product_name: "Widget".to_string(),
					product_sku: "WID-1".to_string(),
					unit_price: Decimal::new(10000, 2),
					quantity: 1,
				}],
				notes: None,
			})
			.await
			.unwrap();

		let err = fixture
			.returns
			.create_return(return_request(&order, 1))
			.await
			.unwrap_err();
		assert!(matches!(err, OmsError::Reference(_)));
	}

	#[tokio::test]
	async fn test_return_with_foreign_order_item_is_rejected() {
		let fixture = fixture();
		let order = delivered_order(&fixture).await;

		let mut request = return_request(&order, 1);
		request.items[0].order_item_id = "not-an-item-of-this-order".to_string();

		let err = fixture.returns.create_return(request).await.unwrap_err();
		assert!(matches!(err, OmsError::Reference(_)));
	}

	#[tokio::test]
	async fn test_return_against_missing_order_is_rejected() {
		let fixture = fixture();
		let err = fixture
			.returns
			.create_return(CreateReturnRequest {
				order_id: "missing".to_string(),
				reason: ReturnReason::Other,
				reason_description: None,
				items: vec![],
				notes: None,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, OmsError::Reference(_)));
	}

	#[tokio::test]
	async fn test_process_enqueues_credit_memo_exactly_once() {
		let mut fixture = fixture();
		let order = delivered_order(&fixture).await;
		let ret = fixture
			.returns
			.create_return(return_request(&order, 1))
			.await
			.unwrap();
		while fixture.rx.try_recv().is_ok() {} // drain the ship enqueue

		for action in ["approve", "schedule_pickup", "start_transit", "receive"] {
			fixture
				.returns
				.transition(&ret.id, action, None)
				.await
				.unwrap();
		}
		assert!(fixture.rx.try_recv().is_err());

		let processed = fixture
			.returns
			.transition(&ret.id, "process", None)
			.await
			.unwrap();
		assert_eq!(processed.status, ReturnStatus::Processed);
		assert!(processed.processed_at.is_some());

		let envelope = fixture.rx.try_recv().unwrap();
		assert_eq!(
			envelope.message,
			TaskMessage::GenerateReturnInvoice {
				return_id: ret.id.clone(),
			}
		);
		assert!(fixture.rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_reject_with_reason_is_stored() {
		let fixture = fixture();
		let order = delivered_order(&fixture).await;
		let ret = fixture
			.returns
			.create_return(return_request(&order, 1))
			.await
			.unwrap();

		let rejected = fixture
			.returns
			.transition(&ret.id, "reject", Some("outside return window".to_string()))
			.await
			.unwrap();
		assert_eq!(rejected.status, ReturnStatus::Rejected);
		assert_eq!(
			rejected.rejection_reason.as_deref(),
			Some("outside return window")
		);

		// Terminal: nothing further is allowed
		let err = fixture
			.returns
			.transition(&ret.id, "approve", None)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OmsError::State(StateError::InvalidTransition { .. })
		));
	}
}
