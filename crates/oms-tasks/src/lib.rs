//! Background task queue for the order management service.
//!
//! State transitions couple to their side effects (invoice generation,
//! notification dispatch) through this queue. Enqueueing happens strictly
//! after the originating write has committed and is fire-and-forget: a
//! failed enqueue is logged, never propagated back into the committed
//! transition. Envelopes are persisted before dispatch, so delivery is
//! at-least-once and every consumer must be idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use oms_storage::StorageService;
use oms_types::{StorageKey, TaskMessage};

/// Invoice and credit memo generation consumers.
pub mod invoice;
/// Notification (email) consumers.
pub mod notification;
/// PDF document rendering.
pub mod pdf;
/// Worker pool executing queued tasks.
pub mod worker;

pub use invoice::InvoiceGenerator;
pub use notification::Notifier;
pub use worker::{TaskWorker, WorkerConfig};

/// Errors that can occur while queueing tasks.
#[derive(Debug, Error)]
pub enum TaskError {
	/// Error from the storage backing the queue.
	#[error("Storage error: {0}")]
	Storage(String),
	/// The worker side of the queue has shut down.
	#[error("Task queue is closed")]
	QueueClosed,
}

/// Execution state of a persisted task envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
	/// Waiting to be executed (or executing right now).
	Pending,
	/// Terminally failed; kept for diagnosis, never retried.
	Failed,
}

/// A task message wrapped with queue bookkeeping, persisted durably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
	/// Unique identifier of this envelope (UUID v4).
	pub id: String,
	/// The message to deliver to a consumer.
	pub message: TaskMessage,
	/// Current execution state.
	pub status: TaskStatus,
	/// How many times execution has started.
	pub attempts: u32,
	/// When the envelope was enqueued.
	pub enqueued_at: DateTime<Utc>,
	/// Error recorded by the last failed attempt.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

/// Result of one consumer invocation.
///
/// Consumers report failure as a value instead of panicking or returning
/// `Err`; a failed task is terminal for that invocation only and never
/// unwinds the transition that enqueued it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
	/// The work was done.
	Success,
	/// The entity was no longer in a qualifying state; nothing to do.
	Skipped(String),
	/// The work could not be done.
	Failed(String),
}

/// A consumer capable of handling queued task messages.
#[async_trait]
pub trait TaskHandler: Send + Sync {
	/// Executes one task message to completion.
	async fn handle(&self, message: &TaskMessage) -> TaskOutcome;
}

/// Routes task messages to their consumers.
pub struct TaskRouter {
	invoices: InvoiceGenerator,
	notifier: Notifier,
}

impl TaskRouter {
	/// Creates a router over the two consumer groups.
	pub fn new(invoices: InvoiceGenerator, notifier: Notifier) -> Self {
		Self { invoices, notifier }
	}
}

#[async_trait]
impl TaskHandler for TaskRouter {
	async fn handle(&self, message: &TaskMessage) -> TaskOutcome {
		match message {
			TaskMessage::GenerateOrderInvoice { order_id } => {
				self.invoices.generate_order_invoice(order_id).await
			}
			TaskMessage::GenerateReturnInvoice { return_id } => {
				self.invoices.generate_return_invoice(return_id).await
			}
			TaskMessage::SendOrderConfirmationEmail {
				order_id,
				customer_email,
			} => {
				self.notifier
					.order_confirmation(order_id, customer_email)
					.await
			}
			TaskMessage::SendOrderShipmentNotification {
				order_id,
				customer_email,
			} => {
				self.notifier
					.shipment_notification(order_id, customer_email)
					.await
			}
			TaskMessage::SendReturnApprovalNotification {
				return_id,
				customer_email,
			} => {
				self.notifier
					.return_approval(return_id, customer_email)
					.await
			}
			TaskMessage::SendRefundConfirmation {
				return_id,
				customer_email,
				refund_amount,
			} => {
				self.notifier
					.refund_confirmation(return_id, customer_email, *refund_amount)
					.await
			}
		}
	}
}

/// Producer handle for the durable task queue.
///
/// Envelopes are written to storage first and only then pushed to the
/// dispatch channel; a crash between the two is recovered at startup by
/// [`TaskQueue::recover_pending`].
#[derive(Clone)]
pub struct TaskQueue {
	storage: Arc<StorageService>,
	tx: mpsc::UnboundedSender<TaskEnvelope>,
}

impl TaskQueue {
	/// Creates a queue and the receiver its worker will drain.
	pub fn new(storage: Arc<StorageService>) -> (Self, mpsc::UnboundedReceiver<TaskEnvelope>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { storage, tx }, rx)
	}

	/// Persists a task and hands it to the worker pool.
	pub async fn enqueue(&self, message: TaskMessage) -> Result<String, TaskError> {
		let envelope = TaskEnvelope {
			id: Uuid::new_v4().to_string(),
			message,
			status: TaskStatus::Pending,
			attempts: 0,
			enqueued_at: Utc::now(),
			last_error: None,
		};

		self.storage
			.store(StorageKey::Tasks.as_str(), &envelope.id, &envelope)
			.await
			.map_err(|e| TaskError::Storage(e.to_string()))?;

		self.tx
			.send(envelope.clone())
			.map_err(|_| TaskError::QueueClosed)?;

		Ok(envelope.id)
	}

	/// Enqueues a task, logging instead of propagating failures.
	///
	/// The originating state transition has already committed when this is
	/// called, so an enqueue failure must not bubble up and unwind it.
	pub async fn enqueue_logged(&self, message: TaskMessage) {
		let kind = message.kind();
		let entity_id = message.entity_id().to_string();
		match self.enqueue(message).await {
			Ok(task_id) => {
				tracing::info!(task = kind, entity_id = %entity_id, task_id = %task_id, "Queued task");
			}
			Err(e) => {
				tracing::error!(
					task = kind,
					entity_id = %entity_id,
					error = %e,
					"Failed to queue task; the committed transition is unaffected"
				);
			}
		}
	}

	/// Re-dispatches envelopes that were persisted but never completed.
	///
	/// Returns the number of envelopes put back on the channel. Consumers
	/// are idempotent, so re-delivering work that actually finished is
	/// harmless.
	pub async fn recover_pending(&self) -> Result<usize, TaskError> {
		let envelopes: Vec<TaskEnvelope> = self
			.storage
			.list(StorageKey::Tasks.as_str())
			.await
			.map_err(|e| TaskError::Storage(e.to_string()))?;

		let mut recovered = 0;
		for envelope in envelopes {
			if envelope.status != TaskStatus::Pending {
				continue;
			}
			tracing::info!(
				task = envelope.message.kind(),
				task_id = %envelope.id,
				"Recovered pending task"
			);
			self.tx.send(envelope).map_err(|_| TaskError::QueueClosed)?;
			recovered += 1;
		}
		Ok(recovered)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use oms_storage::implementations::memory::MemoryStorage;

	fn storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	#[tokio::test]
	async fn test_enqueue_persists_and_dispatches() {
		let storage = storage();
		let (queue, mut rx) = TaskQueue::new(storage.clone());

		let task_id = queue
			.enqueue(TaskMessage::GenerateOrderInvoice {
				order_id: "o-1".to_string(),
			})
			.await
			.unwrap();

		let dispatched = rx.recv().await.unwrap();
		assert_eq!(dispatched.id, task_id);
		assert_eq!(dispatched.attempts, 0);

		let stored: TaskEnvelope = storage
			.retrieve(StorageKey::Tasks.as_str(), &task_id)
			.await
			.unwrap();
		assert_eq!(stored.status, TaskStatus::Pending);
	}

	#[tokio::test]
	async fn test_recover_skips_failed_envelopes() {
		let storage = storage();
		let (queue, mut rx) = TaskQueue::new(storage.clone());

		let pending_id = queue
			.enqueue(TaskMessage::GenerateOrderInvoice {
				order_id: "o-1".to_string(),
			})
			.await
			.unwrap();
		rx.recv().await.unwrap(); // drain the original dispatch

		let failed = TaskEnvelope {
			id: "failed-task".to_string(),
			message: TaskMessage::GenerateReturnInvoice {
				return_id: "r-1".to_string(),
			},
			status: TaskStatus::Failed,
			attempts: 1,
			enqueued_at: Utc::now(),
			last_error: Some("boom".to_string()),
		};
		storage
			.store(StorageKey::Tasks.as_str(), &failed.id, &failed)
			.await
			.unwrap();

		let recovered = queue.recover_pending().await.unwrap();
		assert_eq!(recovered, 1);
		assert_eq!(rx.recv().await.unwrap().id, pending_id);
	}
}
