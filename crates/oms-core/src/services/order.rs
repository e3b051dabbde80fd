//! Order orchestration service.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use oms_config::PricingConfig;
use oms_state::{order_lifecycle, ActionContext};
use oms_storage::StorageService;
use oms_tasks::TaskQueue;
use oms_types::{
	business_number, truncate_id, CreateOrderRequest, OmsEvent, Order, OrderEvent, OrderItem,
	OrderStatus, StorageKey, TaskMessage, UpdateOrderRequest,
};

use crate::engine::EventBus;
use crate::OmsError;

/// Filters for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
	/// Only orders belonging to this customer.
	pub customer_id: Option<i64>,
	/// Only orders currently in this status.
	pub status: Option<OrderStatus>,
	/// Pagination offset.
	pub offset: Option<usize>,
	/// Pagination limit.
	pub limit: Option<usize>,
}

/// Service for order business logic.
pub struct OrderService {
	storage: Arc<StorageService>,
	queue: TaskQueue,
	event_bus: EventBus,
	pricing: PricingConfig,
}

impl OrderService {
	/// Creates the service over its constructed dependencies.
	pub fn new(
		storage: Arc<StorageService>,
		queue: TaskQueue,
		event_bus: EventBus,
		pricing: PricingConfig,
	) -> Self {
		Self {
			storage,
			queue,
			event_bus,
			pricing,
		}
	}

	/// Creates a new order in `pending` state.
	///
	/// Totals are computed here once: line totals from unit price and
	/// quantity, tax on the subtotal, a flat shipping cost, and
	/// `total = subtotal + tax + shipping_cost`.
	pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OmsError> {
		if request.items.is_empty() {
			return Err(OmsError::Validation(
				"order must contain at least one item".to_string(),
			));
		}

		let mut items = Vec::with_capacity(request.items.len());
		let mut subtotal = Decimal::ZERO;
		for item in &request.items {
			if item.quantity == 0 {
				return Err(OmsError::Validation(format!(
					"quantity for product {} must be positive",
					item.product_id
				)));
			}
			if item.unit_price < Decimal::ZERO {
				return Err(OmsError::Validation(format!(
					"unit price for product {} must not be negative",
					item.product_id
				)));
			}
			let total_price = item.unit_price * Decimal::from(item.quantity);
			subtotal += total_price;
			items.push(OrderItem {
				id: Uuid::new_v4().to_string(),
				product_id: item.product_id,
				product_name: item.product_name.clone(),
				product_sku: item.product_sku.clone(),
				unit_price: item.unit_price,
				quantity: item.quantity,
				total_price,
			});
		}

		let tax = (subtotal * self.pricing.tax_rate).round_dp(2);
		let shipping_cost = self.pricing.shipping_cost;
		let total = subtotal + tax + shipping_cost;

		let now = Utc::now();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			order_number: business_number("ORD", now),
			customer_id: request.customer_id,
			customer_email: request.customer_email,
			customer_name: request.customer_name,
			status: OrderStatus::Pending,
			previous_status: None,
			subtotal,
			tax,
			shipping_cost,
			total,
			currency: "USD".to_string(),
			items,
			notes: request.notes,
			created_at: now,
			updated_at: now,
			confirmed_at: None,
			shipped_at: None,
			delivered_at: None,
			cancelled_at: None,
			version: 0,
		};

		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;
		self.storage
			.store(
				StorageKey::OrderByNumber.as_str(),
				&order.order_number,
				&order.id,
			)
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		tracing::info!(
			order_id = %truncate_id(&order.id),
			order_number = %order.order_number,
			total = %order.total,
			"Created order"
		);
		self.event_bus
			.publish(OmsEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
			}))
			.ok();

		Ok(order)
	}

	/// Gets an order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OmsError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| OmsError::from_storage("Order", order_id, e))
	}

	/// Gets an order by its business number.
	pub async fn get_order_by_number(&self, order_number: &str) -> Result<Order, OmsError> {
		let order_id: String = self
			.storage
			.retrieve(StorageKey::OrderByNumber.as_str(), order_number)
			.await
			.map_err(|e| OmsError::from_storage("Order", order_number, e))?;
		self.get_order(&order_id).await
	}

	/// Lists orders, newest first, with optional filters.
	pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OmsError> {
		let mut orders: Vec<Order> = self
			.storage
			.list(StorageKey::Orders.as_str())
			.await
			.map_err(|e| OmsError::Storage(e.to_string()))?;

		orders.retain(|order| {
			filter
				.customer_id
				.is_none_or(|customer_id| order.customer_id == customer_id)
				&& filter.status.is_none_or(|status| order.status == status)
		});
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		let offset = filter.offset.unwrap_or(0);
		let limit = filter.limit.unwrap_or(100);
		Ok(orders.into_iter().skip(offset).take(limit).collect())
	}

	/// Updates mutable order fields.
	pub async fn update_order(
		&self,
		order_id: &str,
		request: UpdateOrderRequest,
	) -> Result<Order, OmsError> {
		let mut order = self.get_order(order_id).await?;
		if let Some(notes) = request.notes {
			order.notes = Some(notes);
		}
		order.updated_at = Utc::now();
		self.storage
			.update_versioned(StorageKey::Orders.as_str(), order_id, &mut order)
			.await
			.map_err(|e| OmsError::from_storage("Order", order_id, e))?;
		Ok(order)
	}

	/// Applies a lifecycle action to an order.
	///
	/// The entity is loaded fresh, the transition evaluated, and the
	/// result committed with a version check. Task enqueueing happens
	/// strictly after the commit and never fails the transition.
	pub async fn transition(&self, order_id: &str, action: &str) -> Result<Order, OmsError> {
		let mut order = self.get_order(order_id).await?;
		let from = order.status;
		let now = Utc::now();

		let table = order_lifecycle();
		let to = table.apply(&mut order, action, &ActionContext::new(now))?;
		order.updated_at = now;

		self.storage
			.update_versioned(StorageKey::Orders.as_str(), order_id, &mut order)
			.await
			.map_err(|e| OmsError::from_storage("Order", order_id, e))?;

		let action = table.normalize(action);
		tracing::info!(
			order_id = %truncate_id(order_id),
			order_number = %order.order_number,
			action = %action,
			from = %from,
			to = %to,
			"Order transitioned"
		);

		// Post-commit coupling: the invoice is generated in the background
		// once the order has shipped.
		if action == "ship" {
			self.queue
				.enqueue_logged(TaskMessage::GenerateOrderInvoice {
					order_id: order.id.clone(),
				})
				.await;
		}

		self.event_bus
			.publish(OmsEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				action,
				from,
				to,
				occurred_at: now,
			}))
			.ok();

		Ok(order)
	}
}
