//! Worker pool draining the task queue.
//!
//! A single dispatcher loop receives envelopes and spawns each one onto
//! the runtime, bounded by a semaphore. Every execution carries two time
//! limits: crossing the soft limit logs a warning while the handler keeps
//! running; crossing the hard limit abandons the handler and marks the
//! envelope failed.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

use oms_storage::StorageService;
use oms_types::StorageKey;

use crate::{TaskEnvelope, TaskHandler, TaskOutcome, TaskStatus};

/// Tuning for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
	/// Maximum number of tasks executing concurrently.
	pub concurrency: usize,
	/// Soft execution limit; exceeded executions are logged and continue.
	pub soft_time_limit: Duration,
	/// Hard execution limit; exceeded executions are killed and failed.
	pub time_limit: Duration,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			concurrency: 4,
			soft_time_limit: Duration::from_secs(25 * 60),
			time_limit: Duration::from_secs(30 * 60),
		}
	}
}

/// Executes queued tasks against a [`TaskHandler`].
pub struct TaskWorker {
	storage: Arc<StorageService>,
	handler: Arc<dyn TaskHandler>,
	config: WorkerConfig,
}

impl TaskWorker {
	/// Creates a worker over the given handler.
	pub fn new(
		storage: Arc<StorageService>,
		handler: Arc<dyn TaskHandler>,
		config: WorkerConfig,
	) -> Self {
		Self {
			storage,
			handler,
			config,
		}
	}

	/// Drains the queue until the sending side is dropped.
	pub async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<TaskEnvelope>) {
		let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
		while let Some(envelope) = rx.recv().await {
			let permit = match semaphore.clone().acquire_owned().await {
				Ok(permit) => permit,
				Err(_) => break, // semaphore closed, shutting down
			};
			let worker = self.clone();
			tokio::spawn(async move {
				worker.execute(envelope).await;
				drop(permit);
			});
		}
	}

	/// Runs one envelope to an outcome and settles it in storage.
	async fn execute(&self, mut envelope: TaskEnvelope) {
		envelope.attempts += 1;
		let kind = envelope.message.kind();
		tracing::info!(
			task = kind,
			task_id = %envelope.id,
			attempt = envelope.attempts,
			"Executing task"
		);

		let outcome = {
			let fut = self.handler.handle(&envelope.message);
			tokio::pin!(fut);
			match timeout(self.config.soft_time_limit, &mut fut).await {
				Ok(outcome) => Some(outcome),
				Err(_) => {
					tracing::warn!(
						task = kind,
						task_id = %envelope.id,
						limit_secs = self.config.soft_time_limit.as_secs(),
						"Soft time limit exceeded, task still running"
					);
					let remaining = self
						.config
						.time_limit
						.saturating_sub(self.config.soft_time_limit);
					timeout(remaining, &mut fut).await.ok()
				}
			}
		};

		match outcome {
			Some(TaskOutcome::Success) => {
				self.ack(&envelope).await;
				tracing::info!(task = kind, task_id = %envelope.id, "Task completed");
			}
			Some(TaskOutcome::Skipped(reason)) => {
				self.ack(&envelope).await;
				tracing::info!(task = kind, task_id = %envelope.id, reason = %reason, "Task skipped");
			}
			Some(TaskOutcome::Failed(error)) => {
				self.fail(envelope, error).await;
			}
			None => {
				self.fail(envelope, "hard time limit exceeded".to_string())
					.await;
			}
		}
	}

	/// Removes a settled envelope from the durable queue.
	async fn ack(&self, envelope: &TaskEnvelope) {
		if let Err(e) = self
			.storage
			.remove(StorageKey::Tasks.as_str(), &envelope.id)
			.await
		{
			tracing::warn!(task_id = %envelope.id, error = %e, "Failed to ack task envelope");
		}
	}

	/// Records a terminal failure; the envelope is kept for diagnosis.
	async fn fail(&self, mut envelope: TaskEnvelope, error: String) {
		tracing::error!(
			task = envelope.message.kind(),
			task_id = %envelope.id,
			entity_id = %envelope.message.entity_id(),
			error = %error,
			"Task failed"
		);
		envelope.status = TaskStatus::Failed;
		envelope.last_error = Some(error);
		if let Err(e) = self
			.storage
			.store(StorageKey::Tasks.as_str(), &envelope.id, &envelope)
			.await
		{
			tracing::warn!(task_id = %envelope.id, error = %e, "Failed to record task failure");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::TaskQueue;
	use async_trait::async_trait;
	use oms_storage::implementations::memory::MemoryStorage;
	use oms_types::TaskMessage;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingHandler {
		calls: AtomicUsize,
		outcome: TaskOutcome,
	}

	#[async_trait]
	impl TaskHandler for CountingHandler {
		async fn handle(&self, _message: &TaskMessage) -> TaskOutcome {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.outcome.clone()
		}
	}

	struct SlowHandler;

	#[async_trait]
	impl TaskHandler for SlowHandler {
		async fn handle(&self, _message: &TaskMessage) -> TaskOutcome {
			tokio::time::sleep(Duration::from_secs(60)).await;
			TaskOutcome::Success
		}
	}

	fn storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	fn config(limits: (u64, u64)) -> WorkerConfig {
		WorkerConfig {
			concurrency: 2,
			soft_time_limit: Duration::from_millis(limits.0),
			time_limit: Duration::from_millis(limits.1),
		}
	}

	#[tokio::test]
	async fn test_successful_task_is_acked() {
		let storage = storage();
		let (queue, rx) = TaskQueue::new(storage.clone());
		let handler = Arc::new(CountingHandler {
			calls: AtomicUsize::new(0),
			outcome: TaskOutcome::Success,
		});
		let worker = Arc::new(TaskWorker::new(
			storage.clone(),
			handler.clone(),
			config((5_000, 10_000)),
		));

		let task_id = queue
			.enqueue(TaskMessage::GenerateOrderInvoice {
				order_id: "o-1".to_string(),
			})
			.await
			.unwrap();
		drop(queue); // close the channel so run() returns after draining

		worker.run(rx).await;
		// run() returns when the channel closes; give the spawned task a tick
		tokio::time::sleep(Duration::from_millis(50)).await;

		assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
		assert!(!storage
			.exists(StorageKey::Tasks.as_str(), &task_id)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_failed_task_is_recorded_not_retried() {
		let storage = storage();
		let (queue, rx) = TaskQueue::new(storage.clone());
		let handler = Arc::new(CountingHandler {
			calls: AtomicUsize::new(0),
			outcome: TaskOutcome::Failed("no such entity".to_string()),
		});
		let worker = Arc::new(TaskWorker::new(
			storage.clone(),
			handler.clone(),
			config((5_000, 10_000)),
		));

		let task_id = queue
			.enqueue(TaskMessage::GenerateReturnInvoice {
				return_id: "r-1".to_string(),
			})
			.await
			.unwrap();
		drop(queue);

		worker.run(rx).await;
		tokio::time::sleep(Duration::from_millis(50)).await;

		assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
		let envelope: TaskEnvelope = storage
			.retrieve(StorageKey::Tasks.as_str(), &task_id)
			.await
			.unwrap();
		assert_eq!(envelope.status, TaskStatus::Failed);
		assert_eq!(envelope.last_error.as_deref(), Some("no such entity"));
		assert_eq!(envelope.attempts, 1);
	}

	#[tokio::test]
	async fn test_hard_time_limit_kills_task() {
		let storage = storage();
		let (queue, rx) = TaskQueue::new(storage.clone());
		let worker = Arc::new(TaskWorker::new(
			storage.clone(),
			Arc::new(SlowHandler),
			config((20, 40)),
		));

		let task_id = queue
			.enqueue(TaskMessage::GenerateOrderInvoice {
				order_id: "o-1".to_string(),
			})
			.await
			.unwrap();
		drop(queue);

		worker.run(rx).await;
		tokio::time::sleep(Duration::from_millis(200)).await;

		let envelope: TaskEnvelope = storage
			.retrieve(StorageKey::Tasks.as_str(), &task_id)
			.await
			.unwrap();
		assert_eq!(envelope.status, TaskStatus::Failed);
		assert_eq!(
			envelope.last_error.as_deref(),
			Some("hard time limit exceeded")
		);
	}
}
