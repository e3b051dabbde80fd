//! Engine wiring for the order management service.
//!
//! The engine owns the constructed dependencies (storage backend, task
//! queue, event bus, services) and the background machinery: the task
//! worker pool, startup recovery of persisted tasks, the notification
//! dispatcher consuming post-commit events, and the periodic storage
//! sweep. Lifecycle is owned by the process entry point; nothing here is
//! ambient global state.

pub mod event_bus;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};

use oms_config::Config;
use oms_storage::implementations::file::{FileStorage, TtlConfig};
use oms_storage::implementations::memory::MemoryStorage;
use oms_storage::{StorageInterface, StorageService};
use oms_tasks::{
	InvoiceGenerator, Notifier, TaskEnvelope, TaskQueue, TaskRouter, TaskWorker, WorkerConfig,
};
use oms_types::{
	OmsEvent, Order, OrderEvent, OrderStatus, ReturnEvent, ReturnStatus, StorageKey, TaskMessage,
	truncate_id,
};

use crate::services::{InvoiceService, OrderService, PaymentService, ReturnService};
use crate::OmsError;

pub use event_bus::EventBus;

/// Main engine coordinating services and background machinery.
pub struct OmsEngine {
	/// Service configuration.
	config: Config,
	/// Storage service shared by everything.
	storage: Arc<StorageService>,
	/// Order orchestration.
	orders: Arc<OrderService>,
	/// Return orchestration.
	returns: Arc<ReturnService>,
	/// Payment orchestration.
	payments: Arc<PaymentService>,
	/// Invoice record queries.
	invoices: Arc<InvoiceService>,
	/// Producer handle of the durable task queue.
	queue: TaskQueue,
	/// Event bus for post-commit events.
	event_bus: EventBus,
	/// Receiver side of the task queue, consumed by `run`.
	task_rx: Mutex<Option<mpsc::UnboundedReceiver<TaskEnvelope>>>,
}

impl OmsEngine {
	/// Runs the background machinery until interrupted.
	///
	/// This method:
	/// 1. Starts the task worker pool
	/// 2. Re-dispatches persisted tasks that never completed
	/// 3. Dispatches notification tasks off post-commit events
	/// 4. Periodically sweeps expired storage entries
	/// 5. Shuts down on ctrl-c
	pub async fn run(&self) -> Result<(), OmsError> {
		let rx = self
			.task_rx
			.lock()
			.await
			.take()
			.ok_or_else(|| OmsError::Validation("engine is already running".to_string()))?;

		let handler = Arc::new(TaskRouter::new(
			InvoiceGenerator::new(
				self.storage.clone(),
				PathBuf::from(&self.config.invoices.directory),
			),
			Notifier::new(),
		));
		let worker = Arc::new(TaskWorker::new(
			self.storage.clone(),
			handler,
			WorkerConfig {
				concurrency: self.config.service.worker_count,
				soft_time_limit: Duration::from_secs(self.config.service.task_soft_time_limit_secs),
				time_limit: Duration::from_secs(self.config.service.task_time_limit_secs),
			},
		));
		tokio::spawn(worker.run(rx));

		match self.queue.recover_pending().await {
			Ok(0) => {}
			Ok(recovered) => tracing::info!(recovered, "Re-dispatched persisted tasks"),
			Err(e) => tracing::warn!(error = %e, "Task recovery failed"),
		}

		let mut events = self.event_bus.subscribe();
		let mut cleanup = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));

		loop {
			tokio::select! {
				event = events.recv() => match event {
					Ok(event) => self.dispatch_notifications(event).await,
					Err(broadcast::error::RecvError::Lagged(missed)) => {
						tracing::warn!(missed, "Notification dispatcher lagged behind the event bus");
					}
					Err(broadcast::error::RecvError::Closed) => break,
				},

				_ = cleanup.tick() => {
					match self.storage.cleanup_expired().await {
						Ok(0) => {}
						Ok(removed) => tracing::info!(removed, "Swept expired storage entries"),
						Err(e) => tracing::warn!(error = %e, "Storage sweep failed"),
					}
				}

				_ = tokio::signal::ctrl_c() => break,
			}
		}

		Ok(())
	}

	/// Turns a post-commit event into notification tasks.
	///
	/// The customer email is resolved from the parent order at dispatch
	/// time; an order that has vanished in between just drops the
	/// notification with a warning.
	async fn dispatch_notifications(&self, event: OmsEvent) {
		match event {
			OmsEvent::Order(OrderEvent::StatusChanged { order_id, to, .. }) => {
				if !matches!(to, OrderStatus::Confirmed | OrderStatus::Shipped) {
					return;
				}
				let Some(customer_email) = self.customer_email(&order_id).await else {
					return;
				};
				let message = match to {
					OrderStatus::Confirmed => TaskMessage::SendOrderConfirmationEmail {
						order_id,
						customer_email,
					},
					_ => TaskMessage::SendOrderShipmentNotification {
						order_id,
						customer_email,
					},
				};
				self.queue.enqueue_logged(message).await;
			}
			OmsEvent::Return(ReturnEvent::StatusChanged {
				return_id,
				order_id,
				to,
				refund_amount,
				..
			}) => {
				let Some(customer_email) = self.customer_email(&order_id).await else {
					return;
				};
				match to {
					ReturnStatus::Approved => {
						self.queue
							.enqueue_logged(TaskMessage::SendReturnApprovalNotification {
								return_id,
								customer_email,
							})
							.await;
					}
					ReturnStatus::Refunded => {
						self.queue
							.enqueue_logged(TaskMessage::SendRefundConfirmation {
								return_id,
								customer_email,
								refund_amount,
							})
							.await;
					}
					_ => {}
				}
			}
			_ => {}
		}
	}

	/// Resolves the customer email for notification dispatch.
	async fn customer_email(&self, order_id: &str) -> Option<String> {
		match self
			.storage
			.retrieve::<Order>(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => Some(order.customer_email),
			Err(e) => {
				tracing::warn!(
					order_id = %truncate_id(order_id),
					error = %e,
					"Dropping notification, order could not be loaded"
				);
				None
			}
		}
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the order service.
	pub fn orders(&self) -> &Arc<OrderService> {
		&self.orders
	}

	/// Returns a reference to the return service.
	pub fn returns(&self) -> &Arc<ReturnService> {
		&self.returns
	}

	/// Returns a reference to the payment service.
	pub fn payments(&self) -> &Arc<PaymentService> {
		&self.payments
	}

	/// Returns a reference to the invoice service.
	pub fn invoices(&self) -> &Arc<InvoiceService> {
		&self.invoices
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}
}

/// Builder constructing an [`OmsEngine`] from configuration.
pub struct OmsBuilder {
	config: Config,
}

impl OmsBuilder {
	/// Creates a builder for the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine: storage backend, queue, event bus, services.
	pub fn build(self) -> Result<OmsEngine, OmsError> {
		let backend: Box<dyn StorageInterface> = match self.config.storage.backend.as_str() {
			"memory" => Box::new(MemoryStorage::new()),
			"file" => {
				let mut ttls = std::collections::HashMap::new();
				for (namespace, secs) in &self.config.storage.ttl_seconds {
					match namespace.parse::<StorageKey>() {
						Ok(key) => {
							ttls.insert(key, *secs);
						}
						Err(()) => {
							tracing::warn!(namespace = %namespace, "Ignoring TTL for unknown namespace");
						}
					}
				}
				Box::new(FileStorage::new(
					PathBuf::from(&self.config.storage.path),
					TtlConfig::new(ttls),
				))
			}
			other => {
				return Err(OmsError::Validation(format!(
					"unknown storage backend '{}'",
					other
				)));
			}
		};
		let storage = Arc::new(StorageService::new(backend));
		tracing::info!(backend = %self.config.storage.backend, "Loaded storage");

		let (queue, task_rx) = TaskQueue::new(storage.clone());
		let event_bus = EventBus::new(1000);

		let orders = Arc::new(OrderService::new(
			storage.clone(),
			queue.clone(),
			event_bus.clone(),
			self.config.pricing.clone(),
		));
		let returns = Arc::new(ReturnService::new(
			storage.clone(),
			queue.clone(),
			event_bus.clone(),
		));
		let payments = Arc::new(PaymentService::new(storage.clone(), event_bus.clone()));
		let invoices = Arc::new(InvoiceService::new(storage.clone()));

		Ok(OmsEngine {
			config: self.config,
			storage,
			orders,
			returns,
			payments,
			invoices,
			queue,
			event_bus,
			task_rx: Mutex::new(Some(task_rx)),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use oms_types::{CreateOrderRequest, OrderItemRequest};
	use rust_decimal::Decimal;

	fn memory_engine() -> OmsEngine {
		let config = oms_config::Config::from_toml_str("[storage]\nbackend = \"memory\"\n").unwrap();
		OmsBuilder::new(config).build().unwrap()
	}

	async fn create_order(engine: &OmsEngine) -> oms_types::Order {
		engine
			.orders()
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
			.unwrap()
	}

	#[tokio::test]
	async fn test_confirmation_event_enqueues_notification() {
		let engine = memory_engine();
		let order = create_order(&engine).await;
		let mut rx = engine.task_rx.lock().await.take().unwrap();

		engine
			.dispatch_notifications(OmsEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				action: "confirm".to_string(),
				from: OrderStatus::Pending,
				to: OrderStatus::Confirmed,
				occurred_at: Utc::now(),
			}))
			.await;

		let envelope = rx.try_recv().unwrap();
		assert_eq!(
			envelope.message,
			TaskMessage::SendOrderConfirmationEmail {
				order_id: order.id,
				customer_email: "customer@example.com".to_string(),
			}
		);
	}

	#[tokio::test]
	async fn test_refunded_return_event_enqueues_confirmation() {
		let engine = memory_engine();
		let order = create_order(&engine).await;
		let mut rx = engine.task_rx.lock().await.take().unwrap();

		engine
			.dispatch_notifications(OmsEvent::Return(ReturnEvent::StatusChanged {
				return_id: "ret-1".to_string(),
				order_id: order.id.clone(),
				action: "refund".to_string(),
				from: ReturnStatus::Processed,
				to: ReturnStatus::Refunded,
				refund_amount: Decimal::new(10000, 2),
				occurred_at: Utc::now(),
			}))
			.await;

		let envelope = rx.try_recv().unwrap();
		assert_eq!(
			envelope.message,
			TaskMessage::SendRefundConfirmation {
				return_id: "ret-1".to_string(),
				customer_email: "customer@example.com".to_string(),
				refund_amount: Decimal::new(10000, 2),
			}
		);
	}

	#[tokio::test]
	async fn test_notification_dropped_when_order_missing() {
		let engine = memory_engine();
		let mut rx = engine.task_rx.lock().await.take().unwrap();

		engine
			.dispatch_notifications(OmsEvent::Order(OrderEvent::StatusChanged {
				order_id: "missing".to_string(),
				action: "confirm".to_string(),
				from: OrderStatus::Pending,
				to: OrderStatus::Confirmed,
				occurred_at: Utc::now(),
			}))
			.await;

		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_intermediate_states_do_not_notify() {
		let engine = memory_engine();
		let order = create_order(&engine).await;
		let mut rx = engine.task_rx.lock().await.take().unwrap();

		engine
			.dispatch_notifications(OmsEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id,
				action: "start_processing".to_string(),
				from: OrderStatus::Confirmed,
				to: OrderStatus::Processing,
				occurred_at: Utc::now(),
			}))
			.await;

		assert!(rx.try_recv().is_err());
	}
}
